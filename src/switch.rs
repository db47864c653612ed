//! Profile switching logic.
//!
//! This module implements the core mechanism of `cfgprof`: replacing every
//! live config file of a tool with a profile's copies, all or nothing.
//!
//! A switch runs in phases:
//! 1. Remember the current marker (unknown if unreadable).
//! 2. Stage each profile file into a temp file beside its live target,
//!    creating missing live directories.
//! 3. Back up each live file into a rollback directory, or record that it
//!    did not exist.
//! 4. Commit by renaming each staged file over its live target.
//! 5. Write the new marker.
//!
//! A failure in phase 4 or 5 replays the rollback entries, restoring every
//! live file and the marker. Staged files and the rollback directory are
//! removed on every exit path, as are live directories created in phase 2
//! unless the switch completed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, warn};

use crate::error::{IoResultExt, ProfileError, Result, RollbackError};
use crate::fs_utils::{copy_file, copy_into, ensure_dir, ensure_regular_file_if_exists};
use crate::paths::{FilePair, ProfileStore};
use crate::state::{CurrentMarker, read_marker, write_marker};
use crate::profiles::{ensure_profile_file, validate_profile_name};

/// Prefix of staged files created beside live config files
pub const STAGE_PREFIX: &str = ".cfgprof-stage-";

/// Prefix of rollback directories created under a tool's base directory
pub const ROLLBACK_PREFIX: &str = "rollback-";

/// Result of a successful switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchOutcome {
    /// Marker before the switch; `None` if it could not be read
    pub previous: Option<CurrentMarker>,
    /// Marker after the switch
    pub current: CurrentMarker,
    /// Number of live files replaced
    pub files: usize,
}

/// A profile file copied next to its live target, removed on drop
struct StagedFile {
    live: PathBuf,
    temp: TempPath,
}

/// Live-side directories created while staging.
///
/// Removed again, innermost first, when dropped without [`CreatedDirs::keep`];
/// only empty directories are removed.
#[derive(Debug, Default)]
struct CreatedDirs {
    dirs: Vec<PathBuf>,
    keep: bool,
}

impl CreatedDirs {
    /// Create `dir` and any missing ancestors, recording each one created
    fn ensure(&mut self, dir: &Path) -> Result<()> {
        let mut missing = Vec::new();
        let mut cursor = Some(dir);
        while let Some(path) = cursor {
            if path.as_os_str().is_empty() {
                break;
            }
            match fs::symlink_metadata(path) {
                Err(e) if e.kind() == io::ErrorKind::NotFound => missing.push(path.to_path_buf()),
                _ => break,
            }
            cursor = path.parent();
        }
        if missing.is_empty() {
            return Ok(());
        }

        missing.reverse();
        self.dirs.extend(missing);
        ensure_dir(dir)
    }

    fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for CreatedDirs {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        for dir in self.dirs.iter().rev() {
            match fs::remove_dir(dir) {
                Ok(()) => debug!(path = %dir.display(), "removed directory created for switch"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %dir.display(), error = %e, "failed to remove directory created for switch"),
            }
        }
    }
}

/// Undo record for one live file
#[derive(Debug)]
struct RollbackEntry {
    target: PathBuf,
    /// Copy of the pre-switch content; `None` if the file did not exist
    backup: Option<PathBuf>,
}

/// Switch the live config of a tool to profile `name`.
///
/// On success every live file holds the profile's content and the marker
/// names the profile. On failure the live files and marker are as they were
/// before the call; if restoring them also failed, the returned
/// [`ProfileError::SwitchFailed`] carries both errors.
pub fn switch_to_profile(store: &ProfileStore, name: &str) -> Result<SwitchOutcome> {
    switch_with_commit(store, name, rename_staged)
}

fn rename_staged(staged: TempPath, live: &Path) -> io::Result<()> {
    staged.persist(live).map_err(|e| e.error)
}

/// Switch with a custom commit step moving a staged file onto its live path
pub(crate) fn switch_with_commit<F>(store: &ProfileStore, name: &str, mut commit: F) -> Result<SwitchOutcome>
where
    F: FnMut(TempPath, &Path) -> io::Result<()>,
{
    validate_profile_name(name)?;

    let previous = match read_marker(store) {
        Ok(marker) => Some(marker),
        Err(err) => {
            warn!(tool = store.tool().id, error = %err, "current marker unreadable, marker rollback disabled");
            None
        }
    };

    if !store.exists(name)? {
        return Err(ProfileError::ProfileNotFound {
            name: name.to_string(),
        });
    }

    let pairs = store.file_pairs(name);

    // Declared before the staged files so they are deleted first
    let mut created = CreatedDirs::default();
    debug!(tool = store.tool().id, profile = name, "staging profile files");
    let staged = stage_profile_files(name, &pairs, &mut created)?;

    ensure_dir(store.base_dir())?;
    let rollback_dir = tempfile::Builder::new()
        .prefix(ROLLBACK_PREFIX)
        .tempdir_in(store.base_dir())
        .at(store.base_dir())?;

    debug!(dir = %rollback_dir.path().display(), "backing up live files");
    let entries = backup_live_files(&pairs, rollback_dir.path())?;

    // Remaining staged files are dropped (and deleted) on early return
    for StagedFile { live, temp } in staged {
        debug!(path = %live.display(), "committing");
        if let Err(e) = commit(temp, &live) {
            let err = ProfileError::io(&live, e);
            return Err(fail_with_rollback(store, previous.as_ref(), &entries, err));
        }
    }

    let current = CurrentMarker::new(name);
    if let Err(err) = write_marker(store, &current) {
        return Err(fail_with_rollback(store, previous.as_ref(), &entries, err));
    }

    created.keep();
    info!(tool = store.tool().id, profile = name, "switched profile");
    Ok(SwitchOutcome {
        previous,
        current,
        files: pairs.len(),
    })
}

/// Copy each profile file into a temp file in its live target's directory
fn stage_profile_files(
    name: &str,
    pairs: &[FilePair],
    created: &mut CreatedDirs,
) -> Result<Vec<StagedFile>> {
    let mut staged = Vec::with_capacity(pairs.len());
    for pair in pairs {
        ensure_profile_file(name, &pair.profile)?;

        let dir = match pair.live.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        created.ensure(dir)?;
        let mut temp = tempfile::Builder::new()
            .prefix(STAGE_PREFIX)
            .tempfile_in(dir)
            .at(dir)?;
        let temp_name = temp.path().to_path_buf();
        copy_into(&pair.profile, temp.as_file_mut(), &temp_name)?;

        staged.push(StagedFile {
            live: pair.live.clone(),
            temp: temp.into_temp_path(),
        });
    }
    Ok(staged)
}

fn backup_live_files(pairs: &[FilePair], rollback_dir: &Path) -> Result<Vec<RollbackEntry>> {
    let mut entries = Vec::with_capacity(pairs.len());
    for (index, pair) in pairs.iter().enumerate() {
        if !ensure_regular_file_if_exists(&pair.live)? {
            entries.push(RollbackEntry {
                target: pair.live.clone(),
                backup: None,
            });
            continue;
        }

        let file_name = pair
            .live
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let backup = rollback_dir.join(format!("{index}-{file_name}"));
        copy_file(&pair.live, &backup)?;
        entries.push(RollbackEntry {
            target: pair.live.clone(),
            backup: Some(backup),
        });
    }
    Ok(entries)
}

fn fail_with_rollback(
    store: &ProfileStore,
    previous: Option<&CurrentMarker>,
    entries: &[RollbackEntry],
    err: ProfileError,
) -> ProfileError {
    warn!(tool = store.tool().id, error = %err, "switch failed, rolling back");

    let failures = roll_back(store, previous, entries);
    for failure in &failures {
        warn!(error = %failure, "rollback step failed");
    }

    ProfileError::SwitchFailed {
        source: Box::new(err),
        rollback: RollbackError::from_failures(failures),
    }
}

/// Restore every live file and the marker, collecting failures
fn roll_back(
    store: &ProfileStore,
    previous: Option<&CurrentMarker>,
    entries: &[RollbackEntry],
) -> Vec<ProfileError> {
    let mut failures = Vec::new();

    for entry in entries {
        match &entry.backup {
            Some(backup) => {
                if let Err(err) = copy_file(backup, &entry.target) {
                    failures.push(err);
                }
            }
            None => match fs::remove_file(&entry.target) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => failures.push(ProfileError::io(&entry.target, e)),
            },
        }
    }

    if let Some(marker) = previous {
        if let Err(err) = write_marker(store, marker) {
            failures.push(err);
        }
    }

    failures
}
