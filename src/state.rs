use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{IoResultExt, ProfileError, Result};
use crate::fs_utils::{FILE_MODE, ensure_regular_file_if_exists, write_file_atomic};
use crate::paths::ProfileStore;

/// Marker stored in <root>/<tool>/current.json.
///
/// An empty `profile` means no profile is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentMarker {
    /// Name of the profile the live config was last switched to
    #[serde(default)]
    pub profile: String,
}

impl CurrentMarker {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
        }
    }

    /// Marker with no active profile
    pub fn cleared() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.profile.is_empty()
    }

    /// The active profile name, if any
    pub fn active(&self) -> Option<&str> {
        if self.is_empty() {
            None
        } else {
            Some(&self.profile)
        }
    }

    /// Read a marker file, returning an empty marker if it doesn't exist
    pub fn read(path: &Path) -> Result<Self> {
        if !ensure_regular_file_if_exists(path)? {
            return Ok(Self::default());
        }

        let content = fs::read(path).at(path)?;
        serde_json::from_slice(&content).map_err(|source| ProfileError::MarkerParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the marker atomically, owner read/write only
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_vec(self).map_err(|source| ProfileError::MarkerSerialize {
            path: path.to_path_buf(),
            source,
        })?;
        write_file_atomic(path, &content, FILE_MODE)
    }
}

/// Read the marker for a tool
pub fn read_marker(store: &ProfileStore) -> Result<CurrentMarker> {
    CurrentMarker::read(&store.current_marker_path())
}

/// Replace the marker for a tool
pub fn write_marker(store: &ProfileStore, marker: &CurrentMarker) -> Result<()> {
    marker.write(&store.current_marker_path())
}
