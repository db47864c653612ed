//! Drift detection: is the live config still what was last switched to?
//!
//! The status is computed fresh on every call from the marker and the files
//! on disk; nothing is cached.

use std::fmt;
use tracing::{debug, warn};

use crate::error::Result;
use crate::fs_utils::{ensure_regular_file_if_exists, files_equal};
use crate::paths::ProfileStore;
use crate::profiles::{
    CUSTOM_SENTINEL, MODIFIED_SUFFIX, ensure_profile_file, validate_profile_name,
};
use crate::state::{CurrentMarker, read_marker};

/// Relationship between the live config and the marked profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrentStatus {
    /// No marker, or the marked profile no longer exists
    Custom,
    /// Every live file matches the marked profile byte for byte
    Active(String),
    /// The marked profile exists but at least one live file differs or is gone
    Modified(String),
}

impl CurrentStatus {
    /// Name of the marked profile, unless custom
    pub fn profile(&self) -> Option<&str> {
        match self {
            Self::Custom => None,
            Self::Active(name) | Self::Modified(name) => Some(name),
        }
    }

    pub fn is_modified(&self) -> bool {
        matches!(self, Self::Modified(_))
    }
}

impl fmt::Display for CurrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Custom => f.write_str(CUSTOM_SENTINEL),
            Self::Active(name) => f.write_str(name),
            Self::Modified(name) => write!(f, "{name}{MODIFIED_SUFFIX}"),
        }
    }
}

/// Read the marker and compare the live config against it
pub fn current_status(store: &ProfileStore) -> Result<CurrentStatus> {
    let marker = read_marker(store)?;
    detect_drift(store, &marker)
}

/// Compare the live config against the profile named by `marker`.
///
/// # Errors
/// - [`ProfileMissingFile`](crate::error::ProfileError::ProfileMissingFile) if the stored profile lacks one of
///   its declared files
/// - an integrity error if a live file is a symlink, directory or special file
pub fn detect_drift(store: &ProfileStore, marker: &CurrentMarker) -> Result<CurrentStatus> {
    let Some(name) = marker.active() else {
        return Ok(CurrentStatus::Custom);
    };

    if let Err(err) = validate_profile_name(name) {
        warn!(tool = store.tool().id, error = %err, "ignoring marker with invalid profile name");
        return Ok(CurrentStatus::Custom);
    }

    if !store.exists(name)? {
        debug!(tool = store.tool().id, profile = name, "marked profile no longer exists");
        return Ok(CurrentStatus::Custom);
    }

    if live_matches_profile(store, name)? {
        Ok(CurrentStatus::Active(name.to_string()))
    } else {
        Ok(CurrentStatus::Modified(name.to_string()))
    }
}

/// Check every managed file, in declared order, against the profile's copy
fn live_matches_profile(store: &ProfileStore, name: &str) -> Result<bool> {
    for pair in store.file_pairs(name) {
        ensure_profile_file(name, &pair.profile)?;

        if !ensure_regular_file_if_exists(&pair.live)? {
            debug!(path = %pair.live.display(), "live file missing");
            return Ok(false);
        }
        if !files_equal(&pair.profile, &pair.live)? {
            debug!(path = %pair.live.display(), "live file differs from profile");
            return Ok(false);
        }
    }
    Ok(true)
}
