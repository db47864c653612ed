use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use cfgprof::{
    ErrorKind, ProfileError, ToolDescriptor, commands,
    paths::Paths,
    tools,
    ui::{ColorMode, Ui},
};

#[derive(Parser)]
#[command(name = "cfgprof")]
#[command(about = "Save, switch and track named profiles of tool configuration files")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory holding saved profiles [default: ~/.config/cfgprof]
    #[arg(long, global = true, value_name = "DIR", env = "CFGPROF_ROOT")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported tools and their config files
    Tools,

    /// List saved profiles of a tool
    List {
        /// Tool id (see `cfgprof tools`)
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,
    },

    /// Show the active profile: name, "name (modified)" or <custom>
    Current {
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,
    },

    /// Save the current config files as a profile
    Save {
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,

        /// Name of the profile to create
        name: String,

        /// Overwrite an existing profile
        #[arg(short, long)]
        force: bool,
    },

    /// Replace the live config files with a profile's copies
    Switch {
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,

        /// Name of the profile to activate
        name: String,
    },

    /// Delete a saved profile (live config files are left alone)
    Delete {
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,

        /// Name of the profile to delete
        name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the files stored in a profile
    Show {
        #[arg(value_parser = parse_tool)]
        tool: &'static ToolDescriptor,

        /// Name of the profile to inspect
        name: String,
    },

    /// Run diagnostics on every tool's profile store
    Doctor {
        /// Remove leftovers from interrupted switches
        #[arg(long)]
        clean: bool,
    },

    /// Print a shell completion script
    Completions {
        shell: Shell,
    },
}

fn parse_tool(id: &str) -> Result<&'static ToolDescriptor, String> {
    tools::find(id).map_err(|e| {
        let known: Vec<&str> = tools::all().iter().map(|t| t.id).collect();
        format!("{e} (known tools: {})", known.join(", "))
    })
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Exit status for a failed command
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<ProfileError>().map(ProfileError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        Some(ErrorKind::Integrity | ErrorKind::CorruptProfile) => 5,
        Some(ErrorKind::Rollback) => 6,
        Some(ErrorKind::Io) | None => 1,
    }
}

fn run(cli: Cli, ui: &Ui) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "cfgprof", &mut std::io::stdout());
        return Ok(());
    }

    let paths = Paths::new(cli.root)?;

    match cli.command {
        Commands::Tools => commands::list_tools(ui),
        Commands::List { tool } => commands::list(&paths, tool, ui),
        Commands::Current { tool } => commands::current(&paths, tool, ui),
        Commands::Save { tool, name, force } => commands::save(&paths, tool, &name, force, ui),
        Commands::Switch { tool, name } => commands::switch(&paths, tool, &name, ui),
        Commands::Delete { tool, name, yes } => commands::delete(&paths, tool, &name, yes, ui),
        Commands::Show { tool, name } => commands::show(&paths, tool, &name, ui),
        Commands::Doctor { clean } => commands::doctor(&paths, ui, clean),
        Commands::Completions { .. } => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let ui = Ui::new(cli.color, cli.no_color);

    match run(cli, &ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui.err(format!("{err:#}"));
            ExitCode::from(exit_code(&err))
        }
    }
}
