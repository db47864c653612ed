//! Core profile management logic.
//!
//! This module handles the "data model" of profiles:
//! - Validating profile names
//! - Saving the live config as a profile
//! - Deleting and listing profiles
//! - Describing a profile's stored files
//!
//! Switching lives in [`crate::switch`]; drift detection in [`crate::status`].

use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{IoResultExt, ProfileError, Result};
use crate::fs_utils::{DIR_MODE, copy_file, ensure_dir, ensure_regular_file, file_hash};
use crate::paths::ProfileStore;
use crate::state::{CurrentMarker, read_marker, write_marker};

/// Longest allowed profile name
pub const MAX_NAME_LEN: usize = 64;

/// Rendering of the "no active profile" state
pub const CUSTOM_SENTINEL: &str = "<custom>";

/// Suffix appended to the active profile's name when the live config drifted
pub const MODIFIED_SUFFIX: &str = " (modified)";

/// Validate profile name
///
/// Only allows ASCII alphanumeric characters, underscores, and hyphens, so a
/// name is always a single path segment and can never collide with the
/// reserved status renderings.
pub fn validate_profile_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ProfileError::invalid_name(name, "profile name cannot be empty"));
    }
    if name.trim() != name {
        return Err(ProfileError::invalid_name(
            name,
            "profile name cannot start or end with whitespace",
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ProfileError::invalid_name(
            name,
            format!("profile name too long (max {MAX_NAME_LEN} characters)"),
        ));
    }
    if name == CUSTOM_SENTINEL {
        return Err(ProfileError::invalid_name(name, "profile name is reserved"));
    }
    if name.ends_with(MODIFIED_SUFFIX) {
        return Err(ProfileError::invalid_name(
            name,
            format!("profile name cannot end with '{MODIFIED_SUFFIX}'"),
        ));
    }
    if name.starts_with('.') {
        return Err(ProfileError::invalid_name(name, "profile name cannot start with '.'"));
    }
    if !name.is_ascii() {
        return Err(ProfileError::invalid_name(name, "ASCII only"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ProfileError::invalid_name(name, "allowed: A-Z a-z 0-9 _ -"));
    }

    Ok(())
}

/// List available profiles in ascending order
pub fn list_profiles(store: &ProfileStore) -> Result<Vec<String>> {
    store.list()
}

/// Check if a profile exists
pub fn profile_exists(store: &ProfileStore, name: &str) -> Result<bool> {
    store.exists(name)
}

/// Save the live config files as profile `name`.
///
/// Without `force`, creating the profile directory is the existence check and
/// an existing profile yields [`ProfileError::ProfileAlreadyExists`]. With
/// `force`, an existing profile is removed and recreated. Every live file is
/// checked before anything is created, so a missing live file never leaves a
/// partial profile behind.
pub fn save_profile(store: &ProfileStore, name: &str, force: bool) -> Result<()> {
    validate_profile_name(name)?;

    let pairs = store.file_pairs(name);
    for pair in &pairs {
        ensure_regular_file(&pair.live).map_err(|err| match err {
            ProfileError::Missing { path } => ProfileError::ConfigFileNotFound { path },
            other => other,
        })?;
    }

    let profiles_dir = store.profiles_dir();
    ensure_dir(&profiles_dir)?;

    let profile_dir = store.profile_dir(name);
    if force {
        match fs::remove_dir_all(&profile_dir) {
            Ok(()) => debug!(profile = name, "removed existing profile for overwrite"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(ProfileError::io(&profile_dir, e)),
        }
    }

    create_profile_dir(&profile_dir).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            ProfileError::ProfileAlreadyExists {
                name: name.to_string(),
            }
        } else {
            ProfileError::io(&profile_dir, e)
        }
    })?;

    for pair in &pairs {
        if let Err(err) = copy_file(&pair.live, &pair.profile) {
            if let Err(cleanup) = fs::remove_dir_all(&profile_dir) {
                warn!(path = %profile_dir.display(), error = %cleanup, "failed to remove incomplete profile");
            }
            return Err(err);
        }
        debug!(src = %pair.live.display(), dst = %pair.profile.display(), "copied config file");
    }

    info!(tool = store.tool().id, profile = name, "saved profile");
    Ok(())
}

fn create_profile_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path)
}

/// A profile's stored file must be a regular file.
///
/// Missing or non-file entries mean the profile itself is damaged and are
/// reported as [`ProfileError::ProfileMissingFile`]; a symlink stays an
/// integrity error.
pub(crate) fn ensure_profile_file(name: &str, path: &Path) -> Result<()> {
    match ensure_regular_file(path) {
        Ok(()) => Ok(()),
        Err(
            ProfileError::Missing { .. }
            | ProfileError::IsDirectory { .. }
            | ProfileError::NotRegular { .. },
        ) => Err(ProfileError::ProfileMissingFile {
            profile: name.to_string(),
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }),
        Err(err) => Err(err),
    }
}

/// Delete profile `name`.
///
/// Returns `true` if it was the active profile, in which case the marker is
/// cleared. Live config files are never touched.
pub fn delete_profile(store: &ProfileStore, name: &str) -> Result<bool> {
    validate_profile_name(name)?;

    if !store.exists(name)? {
        return Err(ProfileError::ProfileNotFound {
            name: name.to_string(),
        });
    }

    let marker = read_marker(store)?;
    let was_current = marker.active() == Some(name);

    let profile_dir = store.profile_dir(name);
    fs::remove_dir_all(&profile_dir).at(&profile_dir)?;

    if was_current {
        write_marker(store, &CurrentMarker::cleared())?;
    }

    info!(tool = store.tool().id, profile = name, cleared = was_current, "deleted profile");
    Ok(was_current)
}

/// One declared file of a saved profile
#[derive(Debug, Clone)]
pub struct ProfileFileInfo {
    pub name: String,
    /// Whether a regular file is stored for this entry
    pub present: bool,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub sha256: Option<String>,
}

/// Summary of a saved profile
#[derive(Debug, Clone)]
pub struct ProfileInfo {
    pub name: String,
    /// Whether the marker names this profile
    pub active: bool,
    pub files: Vec<ProfileFileInfo>,
}

impl ProfileInfo {
    /// True when every declared file is stored
    pub fn is_complete(&self) -> bool {
        self.files.iter().all(|f| f.present)
    }
}

/// Describe the files stored in profile `name`
pub fn describe_profile(store: &ProfileStore, name: &str) -> Result<ProfileInfo> {
    validate_profile_name(name)?;

    if !store.exists(name)? {
        return Err(ProfileError::ProfileNotFound {
            name: name.to_string(),
        });
    }

    let mut files = Vec::new();
    for (pair, file_name) in store.file_pairs(name).iter().zip(store.tool().file_names()) {
        match ensure_profile_file(name, &pair.profile) {
            Ok(()) => {
                let meta = fs::symlink_metadata(&pair.profile).at(&pair.profile)?;
                files.push(ProfileFileInfo {
                    name: file_name,
                    present: true,
                    size: meta.len(),
                    modified: meta.modified().ok().map(DateTime::<Utc>::from),
                    sha256: Some(file_hash(&pair.profile)?),
                });
            }
            Err(ProfileError::ProfileMissingFile { .. }) => files.push(ProfileFileInfo {
                name: file_name,
                present: false,
                size: 0,
                modified: None,
                sha256: None,
            }),
            Err(err) => return Err(err),
        }
    }

    // An unreadable marker only affects the "active" flag
    let active = read_marker(store)
        .map(|m| m.active() == Some(name))
        .unwrap_or(false);

    Ok(ProfileInfo {
        name: name.to_string(),
        active,
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::test_utils::{TWO_FILE_TOOL, pair_store_with_live_files, setup_test_paths, write_file};
    use tempfile::TempDir;

    #[test]
    fn test_profile_name_validation() {
        assert!(validate_profile_name("work").is_ok());
        assert!(validate_profile_name("my-profile").is_ok());
        assert!(validate_profile_name("test_123").is_ok());
        assert!(validate_profile_name(&"a".repeat(MAX_NAME_LEN)).is_ok());

        for bad in [
            "",
            "   ",
            " work ",
            "work\n",
            ".work",
            "a/b",
            "a\\b",
            "..",
            "invalid name",
            "<custom>",
            "work (modified)",
            "emoji😊",
            "café",
            "a.b",
        ] {
            let err = validate_profile_name(bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{bad:?}");
        }
        assert!(validate_profile_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_save_copies_every_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);

        save_profile(&store, "personal", false).unwrap();

        let dir = store.profile_dir("personal");
        assert_eq!(
            fs::read_to_string(dir.join("config.toml")).unwrap(),
            r#"key = "value1""#
        );
        assert_eq!(
            fs::read_to_string(dir.join("auth.json")).unwrap(),
            r#"{"token":"abc"}"#
        );
    }

    #[test]
    fn test_save_duplicate_without_force() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);

        save_profile(&store, "work", false).unwrap();
        let err = save_profile(&store, "work", false).unwrap_err();
        assert!(matches!(err, ProfileError::ProfileAlreadyExists { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_save_force_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();

        fs::write(store.profile_dir("work").join("stale.txt"), "old").unwrap();
        write_file(&store.live_files()[0], "key = \"value2\"");
        save_profile(&store, "work", true).unwrap();

        let dir = store.profile_dir("work");
        assert!(!dir.join("stale.txt").exists());
        assert_eq!(
            fs::read_to_string(dir.join("config.toml")).unwrap(),
            "key = \"value2\""
        );
    }

    #[test]
    fn test_save_missing_live_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_paths(&temp_dir).store(&TWO_FILE_TOOL);
        write_file(&store.live_files()[0], "key = 1");

        let err = save_profile(&store, "work", false).unwrap_err();
        match err {
            ProfileError::ConfigFileNotFound { path } => assert_eq!(path, store.live_files()[1]),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!store.exists("work").unwrap());
    }

    #[test]
    fn test_save_force_keeps_old_profile_when_live_file_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();

        fs::remove_file(&store.live_files()[1]).unwrap();
        assert!(save_profile(&store, "work", true).is_err());
        assert!(store.profile_dir("work").join("auth.json").exists());
    }

    #[test]
    fn test_save_invalid_name_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);

        assert!(save_profile(&store, "../escape", false).is_err());
        assert!(!store.profiles_dir().exists());
    }

    #[test]
    fn test_list_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        for name in ["work", "personal", "alpha"] {
            save_profile(&store, name, false).unwrap();
        }
        assert_eq!(list_profiles(&store).unwrap(), vec!["alpha", "personal", "work"]);
    }

    #[test]
    fn test_delete_active_clears_marker() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();
        write_marker(&store, &CurrentMarker::new("work")).unwrap();

        assert!(delete_profile(&store, "work").unwrap());
        assert!(!profile_exists(&store, "work").unwrap());
        assert!(read_marker(&store).unwrap().is_empty());
        // Live files untouched
        assert!(store.live_files().iter().all(|p| p.exists()));
    }

    #[test]
    fn test_delete_inactive_keeps_marker() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();
        save_profile(&store, "home", false).unwrap();
        write_marker(&store, &CurrentMarker::new("work")).unwrap();

        assert!(!delete_profile(&store, "home").unwrap());
        assert_eq!(read_marker(&store).unwrap().active(), Some("work"));
    }

    #[test]
    fn test_delete_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        let err = delete_profile(&store, "ghost").unwrap_err();
        assert!(matches!(err, ProfileError::ProfileNotFound { .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_describe_profile() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();
        fs::remove_file(store.profile_dir("work").join("auth.json")).unwrap();

        let info = describe_profile(&store, "work").unwrap();
        assert!(!info.active);
        assert!(!info.is_complete());
        assert_eq!(info.files[0].name, "config.toml");
        assert_eq!(info.files[0].size, r#"key = "value1""#.len() as u64);
        assert!(info.files[0].sha256.is_some());
        assert!(!info.files[1].present);
    }

    #[test]
    fn test_describe_profile_with_directory_entry() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        save_profile(&store, "work", false).unwrap();

        let auth = store.profile_dir("work").join("auth.json");
        fs::remove_file(&auth).unwrap();
        fs::create_dir(&auth).unwrap();

        let info = describe_profile(&store, "work").unwrap();
        assert!(info.files[0].present);
        assert!(!info.files[1].present);
        assert!(info.files[1].sha256.is_none());
        assert!(!info.is_complete());
    }

    #[cfg(unix)]
    #[test]
    fn test_save_rejects_symlinked_live_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = pair_store_with_live_files(&temp_dir);
        let target = temp_dir.path().join("elsewhere.json");
        fs::write(&target, "secret").unwrap();

        let auth = &store.live_files()[1];
        fs::remove_file(auth).unwrap();
        std::os::unix::fs::symlink(&target, auth).unwrap();

        let err = save_profile(&store, "work", false).unwrap_err();
        assert!(matches!(err, ProfileError::Symlink { .. }));
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert!(!store.exists("work").unwrap());
        assert_eq!(fs::read_to_string(&target).unwrap(), "secret");
    }
}
