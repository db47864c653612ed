//! Test utilities shared across test modules
//!
//! Every test gets its own home directory inside a `TempDir`; nothing reads
//! the real home or mutates the process environment.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::paths::{Paths, ProfileStore};
use crate::tools::ToolDescriptor;

/// A tool managing a single settings file
pub static ONE_FILE_TOOL: ToolDescriptor = ToolDescriptor {
    id: "test-single",
    display_name: "Test Single",
    config_paths: &[".single/settings.json"],
};

/// A tool managing a config file and a separate credentials file
pub static TWO_FILE_TOOL: ToolDescriptor = ToolDescriptor {
    id: "test-pair",
    display_name: "Test Pair",
    config_paths: &[".pair/config.toml", ".pair/auth.json"],
};

/// Create a Paths struct rooted in a temporary home directory
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    Paths::with_home(temp_dir.path().join("home"))
}

/// Write a file, creating its parent directories
pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Store for the two-file tool with `config.toml` and `auth.json` in place
pub fn pair_store_with_live_files(temp_dir: &TempDir) -> ProfileStore {
    let store = setup_test_paths(temp_dir).store(&TWO_FILE_TOOL);
    let live = store.live_files();
    write_file(&live[0], r#"key = "value1""#);
    write_file(&live[1], r#"{"token":"abc"}"#);
    store
}

/// Read a live file by index
pub fn read_live(store: &ProfileStore, index: usize) -> String {
    fs::read_to_string(&store.live_files()[index]).unwrap()
}
