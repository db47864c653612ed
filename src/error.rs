//! Error types for profile operations.
//!
//! Every failure the core can produce is a [`ProfileError`]. Façades use
//! [`ProfileError::kind`] to decide presentation (exit code, status line)
//! without matching on individual variants.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for profile operations
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Coarse classification of a [`ProfileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed profile name, rejected before any mutation
    Validation,
    /// Profile, tool or required config file does not exist
    NotFound,
    /// Profile already exists and overwrite was not requested
    Conflict,
    /// Symlink, directory or special file where a regular file was required
    Integrity,
    /// A saved profile is missing one of its declared files
    CorruptProfile,
    /// Any other operating system failure
    Io,
    /// A switch failed and restoring the previous state also failed
    Rollback,
}

impl ErrorKind {
    /// Stable identifier for façade responses
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Validation => "INVALID_NAME",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "ALREADY_EXISTS",
            Self::Integrity => "INTEGRITY",
            Self::CorruptProfile => "CORRUPT_PROFILE",
            Self::Io => "IO",
            Self::Rollback => "ROLLBACK_FAILED",
        }
    }
}

/// Errors that can occur while managing profiles
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("invalid profile name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },

    #[error("unknown tool '{id}'")]
    UnknownTool { id: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("profile '{name}' already exists (use --force to overwrite)")]
    ProfileAlreadyExists { name: String },

    #[error("config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("profile '{profile}' is missing file: {file}")]
    ProfileMissingFile { profile: String, file: String },

    #[error("path not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("symlink not allowed: {}", path.display())]
    Symlink { path: PathBuf },

    #[error("expected file but found directory: {}", path.display())]
    IsDirectory { path: PathBuf },

    #[error("expected regular file: {}", path.display())]
    NotRegular { path: PathBuf },

    #[error("post-write validation failed for {}: {source}", path.display())]
    PostWriteValidation {
        path: PathBuf,
        #[source]
        source: Box<ProfileError>,
    },

    #[error("failed to parse marker file {}: {source}", path.display())]
    MarkerParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize marker for {}: {source}", path.display())]
    MarkerSerialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to determine home directory")]
    HomeDirUnavailable,

    #[error("I/O error for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("switch failed: {source}{}", rollback_suffix(.rollback.as_ref()))]
    SwitchFailed {
        #[source]
        source: Box<ProfileError>,
        rollback: Option<RollbackError>,
    },
}

impl ProfileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_name(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify this error into the taxonomy façades report on
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidName { .. } => ErrorKind::Validation,
            Self::UnknownTool { .. }
            | Self::ProfileNotFound { .. }
            | Self::ConfigFileNotFound { .. }
            | Self::Missing { .. } => ErrorKind::NotFound,
            Self::ProfileAlreadyExists { .. } => ErrorKind::Conflict,
            Self::Symlink { .. }
            | Self::IsDirectory { .. }
            | Self::NotRegular { .. }
            | Self::PostWriteValidation { .. } => ErrorKind::Integrity,
            Self::ProfileMissingFile { .. } => ErrorKind::CorruptProfile,
            Self::MarkerParse { .. }
            | Self::MarkerSerialize { .. }
            | Self::HomeDirUnavailable
            | Self::Io { .. } => ErrorKind::Io,
            Self::SwitchFailed { source, rollback } => match rollback {
                Some(_) => ErrorKind::Rollback,
                None => source.kind(),
            },
        }
    }

    /// The failures hit while restoring state after a failed switch, if any
    #[must_use]
    pub fn rollback_failure(&self) -> Option<&RollbackError> {
        match self {
            Self::SwitchFailed { rollback, .. } => rollback.as_ref(),
            _ => None,
        }
    }
}

/// Every failure encountered while rolling back a switch.
///
/// Always reported next to the error that triggered the rollback. A non-empty
/// rollback error means the live config may need manual inspection.
#[derive(Debug)]
pub struct RollbackError {
    pub failures: Vec<ProfileError>,
}

impl RollbackError {
    /// Wrap accumulated failures, or `None` if rollback was clean
    pub(crate) fn from_failures(failures: Vec<ProfileError>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }
}

impl fmt::Display for RollbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rollback failed")?;
        for failure in &self.failures {
            write!(f, "; {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RollbackError {}

fn rollback_suffix(rollback: Option<&RollbackError>) -> String {
    match rollback {
        Some(err) => format!(" ({err}; manual recovery may be required)"),
        None => String::new(),
    }
}

/// Attach a path to a raw I/O result
pub(crate) trait IoResultExt<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|e| ProfileError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err = ProfileError::invalid_name("a/b", "bad");
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = ProfileError::Symlink {
            path: PathBuf::from("/x"),
        };
        assert_eq!(err.kind(), ErrorKind::Integrity);

        let err = ProfileError::ProfileMissingFile {
            profile: "work".into(),
            file: "auth.json".into(),
        };
        assert_eq!(err.kind(), ErrorKind::CorruptProfile);
        assert_eq!(err.kind().code(), "CORRUPT_PROFILE");
    }

    #[test]
    fn test_marker_errors_name_their_direction() {
        let parse = ProfileError::MarkerParse {
            path: PathBuf::from("/base/current.json"),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert!(parse.to_string().starts_with("failed to parse marker file"));

        let serialize = ProfileError::MarkerSerialize {
            path: PathBuf::from("/base/current.json"),
            source: serde_json::from_str::<serde_json::Value>("{").unwrap_err(),
        };
        assert!(serialize.to_string().starts_with("failed to serialize marker"));
        assert_eq!(serialize.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_switch_failed_reports_both_errors() {
        let err = ProfileError::SwitchFailed {
            source: Box::new(ProfileError::io("/live/config.toml", io::Error::other("rename"))),
            rollback: RollbackError::from_failures(vec![ProfileError::io(
                "/live/auth.json",
                io::Error::other("restore"),
            )]),
        };

        assert_eq!(err.kind(), ErrorKind::Rollback);
        assert!(err.rollback_failure().is_some());
        let msg = err.to_string();
        assert!(msg.contains("rename"));
        assert!(msg.contains("restore"));
    }

    #[test]
    fn test_switch_failed_without_rollback_keeps_source_kind() {
        let err = ProfileError::SwitchFailed {
            source: Box::new(ProfileError::IsDirectory {
                path: PathBuf::from("/base/current.json"),
            }),
            rollback: RollbackError::from_failures(Vec::new()),
        };

        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(err.rollback_failure().is_none());
        assert!(!err.to_string().contains("rollback"));
    }
}
