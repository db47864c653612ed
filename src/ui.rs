//! Terminal presentation for the cfgprof CLI.
//!
//! The profile core never prints; every user-facing line goes through [`Ui`],
//! which owns color detection, status labels, tables and the switch spinner.
//!
//! Colors are disabled by, in order: `--no-color`, a set `NO_COLOR`,
//! `TERM=dumb`, then the `--color` mode (`auto` needs a terminal on stdout).

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use clap::ValueEnum;
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};
use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use crate::status::CurrentStatus;

const SPINNER_TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Value of `--color`
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

/// Outcome marker shown before a message or table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Ok,
    Warn,
    Err,
    Info,
}

impl Mark {
    fn color(self) -> AnsiColor {
        match self {
            Self::Ok => AnsiColor::Green,
            Self::Warn => AnsiColor::Yellow,
            Self::Err => AnsiColor::Red,
            Self::Info => AnsiColor::Cyan,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Err => "ERROR",
            Self::Info => "INFO",
        }
    }

    fn glyph(self, color: bool) -> &'static str {
        match (self, color) {
            (Self::Ok, true) => "✓",
            (Self::Ok, false) => "[OK]",
            (Self::Warn, true) => "⚠",
            (Self::Warn, false) => "[!]",
            (Self::Err, true) => "✗",
            (Self::Err, false) => "[X]",
            (Self::Info, true) => "•",
            (Self::Info, false) => "-",
        }
    }
}

/// Resolved display settings for one CLI run
#[derive(Debug, Clone)]
pub struct Ui {
    pub color_enabled: bool,
    /// Spinners need both color and an interactive stdout
    pub spinner_enabled: bool,
}

impl Ui {
    pub fn new(mode: ColorMode, force_no_color: bool) -> Self {
        let is_tty = std::io::stdout().is_terminal();
        let color_enabled = color_wanted(
            mode,
            force_no_color,
            std::env::var_os("NO_COLOR").is_some(),
            std::env::var("TERM").ok().as_deref(),
            is_tty,
        );

        if !color_enabled {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color_enabled,
            spinner_enabled: color_enabled && is_tty,
        }
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color_enabled {
            format!("{style}{text}{style:#}")
        } else {
            text.to_string()
        }
    }

    fn labelled(&self, mark: Mark, msg: &str) -> String {
        let style = Style::new().fg_color(Some(Color::Ansi(mark.color()))).bold();
        format!("{} {msg}", self.paint(mark.label(), style))
    }

    pub fn ok(&self, msg: impl AsRef<str>) {
        println!("{}", self.labelled(Mark::Ok, msg.as_ref()));
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        println!("{}", self.labelled(Mark::Warn, msg.as_ref()));
    }

    /// Errors go to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        eprintln!("{}", self.labelled(Mark::Err, msg.as_ref()));
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        println!("{}", self.labelled(Mark::Info, msg.as_ref()));
    }

    pub fn dim(&self, s: impl AsRef<str>) -> String {
        self.paint(
            s.as_ref(),
            Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightBlack))),
        )
    }

    pub fn bold(&self, s: impl AsRef<str>) -> String {
        self.paint(s.as_ref(), Style::new().bold())
    }

    pub fn colored(&self, s: impl AsRef<str>, color: AnsiColor) -> String {
        self.paint(s.as_ref(), Style::new().fg_color(Some(Color::Ansi(color))))
    }

    /// Status line for `current`: green when active, yellow when modified
    pub fn status(&self, status: &CurrentStatus) -> String {
        let line = status.to_string();
        match status {
            CurrentStatus::Active(_) => self.colored(line, AnsiColor::Green),
            CurrentStatus::Modified(_) => self.colored(line, AnsiColor::Yellow),
            CurrentStatus::Custom => self.dim(line),
        }
    }

    /// Glyph for a mark, with an ASCII fallback when colors are off
    pub fn icon(&self, mark: Mark) -> &'static str {
        mark.glyph(self.color_enabled)
    }

    /// Borderless table that wraps to the terminal width
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::NOTHING)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(headers.iter().map(|h| self.header_cell(*h)));
        table
    }

    pub fn cell(&self, content: impl Into<String>) -> Cell {
        Cell::new(content.into())
    }

    fn header_cell(&self, content: &str) -> Cell {
        let cell = Cell::new(content);
        if self.color_enabled {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }

    /// Colored through comfy-table so column widths stay correct
    pub fn colored_cell(&self, content: impl Into<String>, color: AnsiColor) -> Cell {
        let cell = Cell::new(content.into());
        if self.color_enabled {
            cell.fg(table_color(color))
        } else {
            cell
        }
    }

    /// Spinner for the switch; hidden when spinners are disabled
    pub fn spinner(&self, message: impl Into<Cow<'static, str>>) -> ProgressBar {
        if !self.spinner_enabled {
            let pb = ProgressBar::hidden();
            pb.set_message(message);
            return pb;
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(SPINNER_TICKS)
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Replace the spinner with a final OK or ERROR line
    pub fn finish_spinner(&self, pb: &ProgressBar, mark: Mark, msg: impl Into<Cow<'static, str>>) {
        let msg = msg.into();
        if !self.spinner_enabled {
            pb.finish_and_clear();
            match mark {
                Mark::Err => self.err(msg),
                Mark::Warn => self.warn(msg),
                Mark::Info => self.info(msg),
                Mark::Ok => self.ok(msg),
            }
            return;
        }

        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            pb.set_style(style);
        }
        let icon = self.colored(self.icon(mark), mark.color());
        pb.finish_with_message(format!("{icon} {msg}"));
    }

    pub fn println(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    pub fn newline(&self) {
        println!();
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.bold(title));
    }
}

fn color_wanted(
    mode: ColorMode,
    force_no_color: bool,
    no_color_env: bool,
    term: Option<&str>,
    is_tty: bool,
) -> bool {
    if force_no_color || no_color_env || term == Some("dumb") {
        return false;
    }
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

fn table_color(color: AnsiColor) -> comfy_table::Color {
    match color {
        AnsiColor::Red | AnsiColor::BrightRed => comfy_table::Color::Red,
        AnsiColor::Green | AnsiColor::BrightGreen => comfy_table::Color::Green,
        AnsiColor::Yellow | AnsiColor::BrightYellow => comfy_table::Color::Yellow,
        AnsiColor::Cyan | AnsiColor::BrightCyan => comfy_table::Color::Cyan,
        AnsiColor::BrightBlack => comfy_table::Color::DarkGrey,
        _ => comfy_table::Color::Reset,
    }
}
