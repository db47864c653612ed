//! Tools whose configuration cfgprof can snapshot.
//!
//! A tool is plain data: an id, a display name and the config files it owns.
//! All profile logic is written once against [`ToolDescriptor`]; supporting a
//! new tool means adding an entry to [`TOOLS`].

use std::path::{Path, PathBuf};

use crate::error::{ProfileError, Result};

/// A tool whose config files are managed as one unit
#[derive(Debug, PartialEq, Eq)]
pub struct ToolDescriptor {
    /// Short identifier, also the directory name under the profile root
    pub id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Config files relative to the home directory, in declared order
    pub config_paths: &'static [&'static str],
}

pub static CLAUDE: ToolDescriptor = ToolDescriptor {
    id: "claude",
    display_name: "Claude Code",
    config_paths: &[".claude/settings.json"],
};

pub static CODEX: ToolDescriptor = ToolDescriptor {
    id: "codex",
    display_name: "Codex",
    config_paths: &[".codex/config.toml", ".codex/auth.json"],
};

/// Every supported tool
pub static TOOLS: &[&ToolDescriptor] = &[&CLAUDE, &CODEX];

/// All supported tools, in display order
pub fn all() -> &'static [&'static ToolDescriptor] {
    TOOLS
}

/// Look up a tool by id
pub fn find(id: &str) -> Result<&'static ToolDescriptor> {
    TOOLS
        .iter()
        .copied()
        .find(|tool| tool.id == id)
        .ok_or_else(|| ProfileError::UnknownTool { id: id.to_string() })
}

impl ToolDescriptor {
    /// Absolute paths of the live config files under `home`
    pub fn live_files(&self, home: &Path) -> Vec<PathBuf> {
        self.config_paths.iter().map(|rel| home.join(rel)).collect()
    }

    /// File names a profile directory holds, one per config path
    pub fn file_names(&self) -> Vec<String> {
        self.config_paths.iter().map(|rel| file_name(rel)).collect()
    }
}

/// Base name of a config-relative path
pub(crate) fn file_name(rel: &str) -> String {
    Path::new(rel)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| rel.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_known_tools() {
        assert_eq!(find("claude").unwrap().display_name, "Claude Code");
        assert_eq!(find("codex").unwrap().config_paths.len(), 2);
    }

    #[test]
    fn test_find_unknown_tool() {
        let err = find("vim").unwrap_err();
        assert!(matches!(err, ProfileError::UnknownTool { .. }));
    }

    #[test]
    fn test_every_tool_has_unique_file_names() {
        for tool in all() {
            assert!(!tool.config_paths.is_empty(), "{} has no files", tool.id);
            let mut names = tool.file_names();
            names.sort();
            names.dedup();
            assert_eq!(names.len(), tool.config_paths.len(), "{}", tool.id);
        }
    }

    #[test]
    fn test_live_files_under_home() {
        let files = CODEX.live_files(Path::new("/home/u"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/home/u/.codex/config.toml"),
                PathBuf::from("/home/u/.codex/auth.json"),
            ]
        );
        assert_eq!(CODEX.file_names(), vec!["config.toml", "auth.json"]);
    }
}
