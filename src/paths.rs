use directories::BaseDirs;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{ProfileError, Result};
use crate::tools::{ToolDescriptor, file_name};

/// Directory under the home directory holding all profiles
const DEFAULT_ROOT: &str = ".config/cfgprof";

/// Root locations used by cfgprof
#[derive(Debug, Clone)]
pub struct Paths {
    /// User home; live config paths are relative to it
    pub home: PathBuf,
    /// ~/.config/cfgprof, one subdirectory per tool
    pub root: PathBuf,
}

impl Paths {
    /// Resolve paths from the user's home directory.
    ///
    /// `root` overrides the default profile root when given.
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let base_dirs = BaseDirs::new().ok_or(ProfileError::HomeDirUnavailable)?;
        let home = base_dirs.home_dir().to_path_buf();
        let root = root.unwrap_or_else(|| home.join(DEFAULT_ROOT));
        Ok(Self { home, root })
    }

    /// Paths for an explicit home directory with the default root
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let root = home.join(DEFAULT_ROOT);
        Self { home, root }
    }

    /// The profile store for one tool
    pub fn store(&self, tool: &'static ToolDescriptor) -> ProfileStore {
        ProfileStore {
            tool,
            base_dir: self.root.join(tool.id),
            home: self.home.clone(),
        }
    }
}

/// A live config file and its copy inside a profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePair {
    /// File inside the profile directory
    pub profile: PathBuf,
    /// Live file under the home directory
    pub live: PathBuf,
}

/// Filesystem layout of one tool's profiles.
///
/// ```text
/// <base>/profiles/<profile-name>/<basename of each config path>
/// <base>/current.json
/// ```
///
/// Path helpers do no I/O and do not validate profile names.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    tool: &'static ToolDescriptor,
    base_dir: PathBuf,
    home: PathBuf,
}

impl ProfileStore {
    pub fn tool(&self) -> &'static ToolDescriptor {
        self.tool
    }

    /// <root>/<tool-id>
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// <root>/<tool-id>/profiles
    pub fn profiles_dir(&self) -> PathBuf {
        self.base_dir.join("profiles")
    }

    /// <root>/<tool-id>/profiles/<name>
    pub fn profile_dir(&self, name: &str) -> PathBuf {
        self.profiles_dir().join(name)
    }

    /// <root>/<tool-id>/current.json
    pub fn current_marker_path(&self) -> PathBuf {
        self.base_dir.join("current.json")
    }

    /// Live config files in declared order
    pub fn live_files(&self) -> Vec<PathBuf> {
        self.tool.live_files(&self.home)
    }

    /// Pair each live file with its copy in the named profile
    pub fn file_pairs(&self, name: &str) -> Vec<FilePair> {
        let profile_dir = self.profile_dir(name);
        self.tool
            .config_paths
            .iter()
            .map(|rel| FilePair {
                profile: profile_dir.join(file_name(rel)),
                live: self.home.join(rel),
            })
            .collect()
    }

    /// Names of saved profiles in ascending order.
    ///
    /// A missing profiles directory yields an empty list.
    pub fn list(&self) -> Result<Vec<String>> {
        let profiles_dir = self.profiles_dir();
        let entries = match fs::read_dir(&profiles_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProfileError::io(&profiles_dir, e)),
        };

        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ProfileError::io(&profiles_dir, e))?;
            // DirEntry::file_type does not follow symlinks
            let file_type = entry
                .file_type()
                .map_err(|e| ProfileError::io(entry.path(), e))?;
            if file_type.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    profiles.push(name.to_string());
                }
            }
        }
        profiles.sort();
        Ok(profiles)
    }

    /// Whether a profile directory exists.
    ///
    /// Never errors for a missing profile; a symlink in place of the profile
    /// directory is an integrity error.
    pub fn exists(&self, name: &str) -> Result<bool> {
        let dir = self.profile_dir(name);
        match fs::symlink_metadata(&dir) {
            Ok(meta) if meta.file_type().is_symlink() => Err(ProfileError::Symlink { path: dir }),
            Ok(meta) => Ok(meta.is_dir()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ProfileError::io(&dir, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TWO_FILE_TOOL, setup_test_paths};
    use tempfile::TempDir;

    #[test]
    fn test_store_layout() {
        let paths = Paths::with_home("/home/u");
        let store = paths.store(&TWO_FILE_TOOL);

        assert_eq!(store.base_dir(), Path::new("/home/u/.config/cfgprof/test-pair"));
        assert!(store.profile_dir("work").ends_with("test-pair/profiles/work"));
        assert!(store.current_marker_path().ends_with("test-pair/current.json"));
    }

    #[test]
    fn test_file_pairs_use_base_names() {
        let paths = Paths::with_home("/home/u");
        let store = paths.store(&TWO_FILE_TOOL);
        let pairs = store.file_pairs("work");

        assert_eq!(pairs.len(), 2);
        assert!(pairs[0].profile.ends_with("profiles/work/config.toml"));
        assert_eq!(pairs[0].live, PathBuf::from("/home/u/.pair/config.toml"));
        assert!(pairs[1].profile.ends_with("profiles/work/auth.json"));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_paths(&temp_dir).store(&TWO_FILE_TOOL);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_sorted_dirs_only() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_paths(&temp_dir).store(&TWO_FILE_TOOL);
        let profiles_dir = store.profiles_dir();
        for name in ["work", "personal", "alpha"] {
            fs::create_dir_all(profiles_dir.join(name)).unwrap();
        }
        fs::write(profiles_dir.join("stray.txt"), "").unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha", "personal", "work"]);
    }

    #[test]
    fn test_exists() {
        let temp_dir = TempDir::new().unwrap();
        let store = setup_test_paths(&temp_dir).store(&TWO_FILE_TOOL);
        assert!(!store.exists("work").unwrap());

        fs::create_dir_all(store.profile_dir("work")).unwrap();
        assert!(store.exists("work").unwrap());
    }
}
