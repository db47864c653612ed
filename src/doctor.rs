//! Diagnostic tool for cfgprof.
//!
//! This module implements the `cfgprof doctor` command, which checks each
//! tool's profile store for common issues:
//! - Marker readability and dangling markers.
//! - Saved profiles missing one of their declared files.
//! - Live config files replaced by symlinks, directories or special files.
//! - Staged files and rollback directories left by an interrupted switch.
//!
//! Doctor never modifies profiles or live config. With `--clean` it removes
//! the stale leftovers it found.

use anstyle::AnsiColor;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{IoResultExt, ProfileError, Result};
use crate::fs_utils::{ATOMIC_TEMP_PREFIX, ensure_regular_file_if_exists};
use crate::paths::{Paths, ProfileStore};
use crate::state::read_marker;
use crate::profiles::ensure_profile_file;
use crate::switch::{ROLLBACK_PREFIX, STAGE_PREFIX};
use crate::tools;
use crate::ui::{Mark, Ui};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Ok,
    Info,
    Warn,
    Error,
}

/// One diagnostic result
#[derive(Debug, Clone)]
pub struct Finding {
    pub check: &'static str,
    pub severity: Severity,
    pub message: String,
}

impl Finding {
    fn new(check: &'static str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            check,
            severity,
            message: message.into(),
        }
    }
}

/// Run every check against one tool's store
pub fn diagnose(store: &ProfileStore) -> Vec<Finding> {
    let mut findings = Vec::new();
    check_store(store, &mut findings);
    check_marker(store, &mut findings);
    check_profiles(store, &mut findings);
    check_live_files(store, &mut findings);
    check_leftovers(store, &mut findings);
    findings
}

fn check_store(store: &ProfileStore, findings: &mut Vec<Finding>) {
    const CHECK: &str = "Store";
    if store.base_dir().is_dir() {
        findings.push(Finding::new(
            CHECK,
            Severity::Ok,
            format!("Store directory exists: {}", store.base_dir().display()),
        ));
    } else {
        findings.push(Finding::new(
            CHECK,
            Severity::Info,
            format!("No store yet (nothing saved): {}", store.base_dir().display()),
        ));
    }
}

fn check_marker(store: &ProfileStore, findings: &mut Vec<Finding>) {
    const CHECK: &str = "Marker";
    match read_marker(store) {
        Ok(marker) => match marker.active() {
            None => findings.push(Finding::new(CHECK, Severity::Info, "No active profile")),
            Some(name) => match store.exists(name) {
                Ok(true) => findings.push(Finding::new(
                    CHECK,
                    Severity::Ok,
                    format!("Active profile: {name}"),
                )),
                Ok(false) => findings.push(Finding::new(
                    CHECK,
                    Severity::Warn,
                    format!("Marker names '{name}' which no longer exists (treated as <custom>)"),
                )),
                Err(e) => findings.push(Finding::new(CHECK, Severity::Error, e.to_string())),
            },
        },
        Err(e) => findings.push(Finding::new(
            CHECK,
            Severity::Error,
            format!("Marker unreadable: {e}"),
        )),
    }
}

fn check_profiles(store: &ProfileStore, findings: &mut Vec<Finding>) {
    const CHECK: &str = "Profiles";
    let profiles = match store.list() {
        Ok(p) => p,
        Err(e) => {
            findings.push(Finding::new(
                CHECK,
                Severity::Error,
                format!("Failed to list profiles: {e}"),
            ));
            return;
        }
    };

    if profiles.is_empty() {
        findings.push(Finding::new(CHECK, Severity::Info, "No profiles saved"));
        return;
    }

    for name in profiles {
        let problems: Vec<ProfileError> = store
            .file_pairs(&name)
            .iter()
            .filter_map(|pair| ensure_profile_file(&name, &pair.profile).err())
            .collect();

        if problems.is_empty() {
            findings.push(Finding::new(CHECK, Severity::Ok, name));
        } else {
            let detail: Vec<String> = problems.iter().map(ToString::to_string).collect();
            findings.push(Finding::new(
                CHECK,
                Severity::Error,
                format!("{name}: {}", detail.join("; ")),
            ));
        }
    }
}

fn check_live_files(store: &ProfileStore, findings: &mut Vec<Finding>) {
    const CHECK: &str = "Live files";
    for path in store.live_files() {
        match ensure_regular_file_if_exists(&path) {
            Ok(true) => findings.push(Finding::new(
                CHECK,
                Severity::Ok,
                path.display().to_string(),
            )),
            Ok(false) => findings.push(Finding::new(
                CHECK,
                Severity::Warn,
                format!("{} is missing", path.display()),
            )),
            Err(e) => findings.push(Finding::new(CHECK, Severity::Error, e.to_string())),
        }
    }
}

fn check_leftovers(store: &ProfileStore, findings: &mut Vec<Finding>) {
    const CHECK: &str = "Leftovers";
    match stale_leftovers(store) {
        Ok(leftovers) if leftovers.is_empty() => {
            findings.push(Finding::new(CHECK, Severity::Ok, "No leftovers from interrupted switches"));
        }
        Ok(leftovers) => {
            for path in leftovers {
                findings.push(Finding::new(
                    CHECK,
                    Severity::Warn,
                    format!("Stale leftover: {}", path.display()),
                ));
            }
        }
        Err(e) => findings.push(Finding::new(CHECK, Severity::Error, e.to_string())),
    }
}

/// Temp files and rollback directories left by interrupted runs
pub fn stale_leftovers(store: &ProfileStore) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    for entry in read_dir_if_exists(store.base_dir())? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry.file_type().at(&entry.path())?;
        if (file_type.is_dir() && name.starts_with(ROLLBACK_PREFIX))
            || (file_type.is_file() && name.starts_with(ATOMIC_TEMP_PREFIX))
        {
            found.push(entry.path());
        }
    }

    let live_dirs: BTreeSet<PathBuf> = store
        .live_files()
        .iter()
        .filter_map(|p| p.parent().map(Path::to_path_buf))
        .collect();
    for dir in live_dirs {
        for entry in read_dir_if_exists(&dir)? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let file_type = entry.file_type().at(&entry.path())?;
            if file_type.is_file() && name.starts_with(STAGE_PREFIX) {
                found.push(entry.path());
            }
        }
    }

    found.sort();
    Ok(found)
}

fn read_dir_if_exists(dir: &Path) -> Result<Vec<fs::DirEntry>> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.collect::<io::Result<Vec<_>>>().at(dir),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(ProfileError::io(dir, e)),
    }
}

/// Remove leftovers found by [`stale_leftovers`]
pub fn clean_leftovers(leftovers: &[PathBuf]) -> Result<usize> {
    for path in leftovers {
        let meta = fs::symlink_metadata(path).at(path)?;
        if meta.is_dir() {
            fs::remove_dir_all(path).at(path)?;
        } else {
            fs::remove_file(path).at(path)?;
        }
    }
    Ok(leftovers.len())
}

/// Run the doctor diagnostics for every tool.
///
/// Returns `true` if no errors were found.
pub fn run_doctor(paths: &Paths, ui: &Ui, clean: bool) -> bool {
    ui.section("cfgprof Doctor");
    ui.newline();

    let mut healthy = true;
    for tool in tools::all() {
        let store = paths.store(tool);
        ui.println(ui.bold(format!("{} ({})", tool.display_name, tool.id)));

        let findings = diagnose(&store);
        let mut current_check = "";
        for finding in &findings {
            if finding.check != current_check {
                current_check = finding.check;
                ui.println(format!("  {}", ui.dim(current_check)));
            }
            let icon = ui.icon(match finding.severity {
                Severity::Ok => Mark::Ok,
                Severity::Info => Mark::Info,
                Severity::Warn => Mark::Warn,
                Severity::Error => Mark::Err,
            });
            ui.println(format!("    {} {}", icon, finding.message));
        }

        if findings.iter().any(|f| f.severity == Severity::Error) {
            healthy = false;
            ui.println(ui.colored("  Issues detected!", AnsiColor::Red));
        }

        if clean {
            match stale_leftovers(&store).and_then(|l| clean_leftovers(&l)) {
                Ok(0) => {}
                Ok(n) => ui.ok(format!("Removed {n} stale leftover(s)")),
                Err(e) => {
                    healthy = false;
                    ui.err(format!("Failed to clean leftovers: {e}"));
                }
            }
        }
        ui.newline();
    }

    healthy
}
