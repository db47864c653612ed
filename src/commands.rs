//! Command handlers behind the `cfgprof` subcommands.
//!
//! Each handler resolves the tool's [`ProfileStore`](crate::paths::ProfileStore),
//! calls into the profile core and renders the result through [`Ui`]. No
//! profile rules live here.

use anstyle::AnsiColor;
use anyhow::{Context, Result, bail};

use crate::doctor::run_doctor;
use crate::error::ProfileError;
use crate::paths::Paths;
use crate::profiles::{
    delete_profile,
    describe_profile,
    list_profiles,
    profile_exists,
    save_profile,
    validate_profile_name,
};
use crate::status::{CurrentStatus, current_status};
use crate::switch::switch_to_profile;
use crate::tools::{self, ToolDescriptor};
use crate::ui::{Mark, Ui};

/// List supported tools and the files they manage
pub fn list_tools(ui: &Ui) -> Result<()> {
    let mut table = ui.table(&["Tool", "Name", "Config files"]);

    for tool in tools::all() {
        table.add_row(vec![
            ui.cell(tool.id),
            ui.cell(tool.display_name),
            ui.cell(
                tool.config_paths
                    .iter()
                    .map(|p| format!("~/{p}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
    }

    ui.section("Tools");
    ui.println(table.to_string());
    Ok(())
}

/// List all saved profiles of a tool
pub fn list(paths: &Paths, tool: &'static ToolDescriptor, ui: &Ui) -> Result<()> {
    let store = paths.store(tool);
    let profiles = list_profiles(&store)?;

    if profiles.is_empty() {
        ui.warn(format!("No {} profiles found.", tool.display_name));
        ui.newline();
        ui.println("Create one with:");
        ui.println(format!("  {} save {} <name>", ui.bold("cfgprof"), tool.id));
        return Ok(());
    }

    let status = match current_status(&store) {
        Ok(status) => status,
        Err(e) => {
            ui.warn(format!("Could not determine current profile: {}", e));
            CurrentStatus::Custom
        }
    };

    let mut table = ui.table(&["", "Profile", "Status"]);

    for name in &profiles {
        let (icon, status_cell) = if status.profile() != Some(name.as_str()) {
            (" ", ui.cell("-"))
        } else if status.is_modified() {
            (ui.icon(Mark::Warn), ui.colored_cell("modified", AnsiColor::Yellow))
        } else {
            (ui.icon(Mark::Ok), ui.colored_cell("active", AnsiColor::Green))
        };

        table.add_row(vec![ui.cell(icon), ui.cell(name), status_cell]);
    }

    ui.section(format!("{} profiles", tool.display_name));
    ui.println(table.to_string());

    Ok(())
}

/// Print the current status line: name, `name (modified)` or `<custom>`
pub fn current(paths: &Paths, tool: &'static ToolDescriptor, ui: &Ui) -> Result<()> {
    let status = current_status(&paths.store(tool))?;
    ui.println(ui.status(&status));
    Ok(())
}

/// Save the live config as a profile
pub fn save(
    paths: &Paths,
    tool: &'static ToolDescriptor,
    name: &str,
    force: bool,
    ui: &Ui,
) -> Result<()> {
    save_profile(&paths.store(tool), name, force)?;
    ui.ok(format!("Saved {} profile '{}'", tool.display_name, name));
    Ok(())
}

/// Switch to a profile (activate it)
pub fn switch(paths: &Paths, tool: &'static ToolDescriptor, name: &str, ui: &Ui) -> Result<()> {
    let store = paths.store(tool);

    let spinner = ui.spinner(format!("Switching {} to '{}'...", tool.display_name, name));
    match switch_to_profile(&store, name) {
        Ok(outcome) => {
            let msg = match outcome.previous.as_ref().and_then(|m| m.active()) {
                Some(previous) if previous != name => {
                    format!("Switched {} from '{}' to '{}'", tool.display_name, previous, name)
                }
                _ => format!("Active {} profile: {}", tool.display_name, name),
            };
            ui.finish_spinner(&spinner, Mark::Ok, msg);
            Ok(())
        }
        Err(e) => {
            ui.finish_spinner(&spinner, Mark::Err, "Switch failed");
            if e.rollback_failure().is_some() {
                ui.warn("Restoring the previous configuration also failed; check these files by hand:");
                for path in store.live_files() {
                    ui.println(format!("  {}", path.display()));
                }
            }
            Err(e.into())
        }
    }
}

/// Delete a profile, asking for confirmation unless `yes`
pub fn delete(
    paths: &Paths,
    tool: &'static ToolDescriptor,
    name: &str,
    yes: bool,
    ui: &Ui,
) -> Result<()> {
    let store = paths.store(tool);
    validate_profile_name(name)?;
    if !profile_exists(&store, name)? {
        return Err(ProfileError::ProfileNotFound {
            name: name.to_string(),
        }
        .into());
    }

    if !yes {
        let confirm = inquire::Confirm::new(&format!(
            "Are you sure you want to delete {} profile '{}'?",
            tool.display_name, name
        ))
        .with_default(false)
        .with_help_message("Live config files are not touched")
        .prompt()
        .context("Confirmation cancelled")?;

        if !confirm {
            ui.warn("Deletion cancelled.");
            return Ok(());
        }
    }

    let cleared = delete_profile(&store, name)?;
    ui.ok(format!("Deleted profile '{}'", name));
    if cleared {
        ui.info("Deleted the active profile; current profile is now <custom>.");
    }
    Ok(())
}

/// Show the files stored in a profile
pub fn show(paths: &Paths, tool: &'static ToolDescriptor, name: &str, ui: &Ui) -> Result<()> {
    let info = describe_profile(&paths.store(tool), name)?;

    ui.section(format!("Profile: {}", info.name));
    if info.active {
        ui.println(ui.colored("active", AnsiColor::Green));
    }
    ui.newline();

    let mut table = ui.table(&["File", "Size", "Saved", "SHA-256"]);

    for file in &info.files {
        if !file.present {
            table.add_row(vec![
                ui.cell(&file.name),
                ui.colored_cell("missing", AnsiColor::Red),
                ui.cell("-"),
                ui.cell("-"),
            ]);
            continue;
        }
        let saved = file
            .modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        let digest = file
            .sha256
            .as_deref()
            .map(|d| d.chars().take(12).collect::<String>())
            .unwrap_or_default();
        table.add_row(vec![
            ui.cell(&file.name),
            ui.cell(format_bytes(file.size)),
            ui.cell(saved),
            ui.cell(digest),
        ]);
    }

    ui.println(table.to_string());

    if !info.is_complete() {
        ui.newline();
        ui.warn("This profile is incomplete; switching to it will fail. Re-save it with --force.");
    }
    Ok(())
}

/// Size with a binary unit, e.g. `2.00 KB`
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.2} {}", UNITS[unit])
}

/// Run diagnostics on every tool
pub fn doctor(paths: &Paths, ui: &Ui, clean: bool) -> Result<()> {
    if !run_doctor(paths, ui, clean) {
        bail!("doctor found issues");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::read_marker;
    use crate::test_utils::{TWO_FILE_TOOL, pair_store_with_live_files, setup_test_paths};
    use crate::ui::ColorMode;
    use tempfile::TempDir;

    fn test_ui() -> Ui {
        Ui::new(ColorMode::Never, false)
    }

    #[test]
    fn test_list_empty() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        assert!(list(&paths, &TWO_FILE_TOOL, &test_ui()).is_ok());
    }

    #[test]
    fn test_save_switch_list_current() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let store = pair_store_with_live_files(&temp_dir);
        let ui = test_ui();

        save(&paths, &TWO_FILE_TOOL, "work", false, &ui).unwrap();
        switch(&paths, &TWO_FILE_TOOL, "work", &ui).unwrap();
        assert!(list(&paths, &TWO_FILE_TOOL, &ui).is_ok());
        assert!(current(&paths, &TWO_FILE_TOOL, &ui).is_ok());
        assert!(show(&paths, &TWO_FILE_TOOL, "work", &ui).is_ok());
        assert_eq!(read_marker(&store).unwrap().active(), Some("work"));
    }

    #[test]
    fn test_save_duplicate() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        pair_store_with_live_files(&temp_dir);
        let ui = test_ui();

        save(&paths, &TWO_FILE_TOOL, "work", false, &ui).unwrap();
        let err = save(&paths, &TWO_FILE_TOOL, "work", false, &ui).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ProfileError>(),
            Some(ProfileError::ProfileAlreadyExists { .. })
        ));
    }

    #[test]
    fn test_switch_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        assert!(switch(&paths, &TWO_FILE_TOOL, "nonexistent", &test_ui()).is_err());
    }

    #[test]
    fn test_delete_with_yes() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let store = pair_store_with_live_files(&temp_dir);
        let ui = test_ui();

        save(&paths, &TWO_FILE_TOOL, "work", false, &ui).unwrap();
        delete(&paths, &TWO_FILE_TOOL, "work", true, &ui).unwrap();
        assert!(!store.exists("work").unwrap());
        assert!(delete(&paths, &TWO_FILE_TOOL, "work", true, &ui).is_err());
    }

    #[test]
    fn test_current_no_state() {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        assert!(current(&paths, &TWO_FILE_TOOL, &test_ui()).is_ok());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.00 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00 MB");
    }
}
