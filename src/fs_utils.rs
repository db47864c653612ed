//! Filesystem safety primitives
//!
//! Every read and write of a managed path goes through this module. None of
//! these functions follow a symlink at the final path component: a symlink,
//! directory or special file where a regular file is expected is an error.

use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::{IoResultExt, ProfileError, Result};

/// Mode for directories created by cfgprof
pub const DIR_MODE: u32 = 0o700;

/// Mode for files created by cfgprof
pub const FILE_MODE: u32 = 0o600;

/// Prefix for temporary files written by [`write_file_atomic`]
pub const ATOMIC_TEMP_PREFIX: &str = ".cfgprof-";

/// Check that `path` is a regular file without following a final symlink.
///
/// # Errors
/// - [`ProfileError::Missing`] if nothing exists at `path`
/// - [`ProfileError::Symlink`], [`ProfileError::IsDirectory`] or
///   [`ProfileError::NotRegular`] for any other kind of node
pub fn ensure_regular_file(path: &Path) -> Result<()> {
    if ensure_regular_file_if_exists(path)? {
        Ok(())
    } else {
        Err(ProfileError::Missing {
            path: path.to_path_buf(),
        })
    }
}

/// Like [`ensure_regular_file`], but a missing path is `Ok(false)`.
///
/// Returns `Ok(true)` if a regular file exists at `path`.
pub fn ensure_regular_file_if_exists(path: &Path) -> Result<bool> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(ProfileError::io(path, e)),
    };

    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return Err(ProfileError::Symlink {
            path: path.to_path_buf(),
        });
    }
    if file_type.is_dir() {
        return Err(ProfileError::IsDirectory {
            path: path.to_path_buf(),
        });
    }
    if !file_type.is_file() {
        return Err(ProfileError::NotRegular {
            path: path.to_path_buf(),
        });
    }
    Ok(true)
}

/// Create a directory and its parents with owner-only permissions
pub fn ensure_dir(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(path).at(path)
}

/// Create the parent directory of `path` if it is missing
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Copy a regular file to `dst`, creating or truncating it.
///
/// The source must be a regular file. The destination's parent is created if
/// missing, and an existing destination must itself be a regular file, so a
/// copy can never write through a symlink or clobber a directory. New files
/// are created owner read/write only.
pub fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    ensure_regular_file(src)?;
    ensure_parent_dir(dst)?;
    ensure_regular_file_if_exists(dst)?;

    let mut input = File::open(src).at(src)?;
    let mut output = open_for_write(dst)?;
    io::copy(&mut input, &mut output).at(dst)?;
    output.flush().at(dst)
}

/// Stream a regular file into an already open handle and sync it to disk
pub fn copy_into(src: &Path, dst: &mut File, dst_path: &Path) -> Result<()> {
    ensure_regular_file(src)?;

    let mut input = File::open(src).at(src)?;
    io::copy(&mut input, dst).at(dst_path)?;
    dst.sync_all().at(dst_path)
}

fn open_for_write(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options.open(path).at(path)
}

/// Compare two regular files byte for byte.
///
/// Sizes are compared first; files of equal size are compared by SHA-256
/// digest.
pub fn files_equal(a: &Path, b: &Path) -> Result<bool> {
    ensure_regular_file(a)?;
    ensure_regular_file(b)?;

    let len_a = fs::symlink_metadata(a).at(a)?.len();
    let len_b = fs::symlink_metadata(b).at(b)?.len();
    if len_a != len_b {
        return Ok(false);
    }

    Ok(file_hash(a)? == file_hash(b)?)
}

/// Compute the hex SHA-256 digest of a regular file's contents
pub fn file_hash(path: &Path) -> Result<String> {
    ensure_regular_file(path)?;

    let mut file = File::open(path).at(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).at(path)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Atomically replace `path` with `data`.
///
/// The bytes go to a fresh temporary file in the destination directory, which
/// is synced, given `mode`, closed and renamed over `path`. The destination is
/// re-checked after the rename; if it is not a regular file at that point it
/// is removed and [`ProfileError::PostWriteValidation`] is returned.
pub fn write_file_atomic(path: &Path, data: &[u8], mode: u32) -> Result<()> {
    ensure_parent_dir(path)?;
    ensure_regular_file_if_exists(path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::Builder::new()
        .prefix(ATOMIC_TEMP_PREFIX)
        .tempfile_in(dir)
        .at(dir)?;
    temp.write_all(data).at(temp.path())?;
    temp.as_file().sync_all().at(temp.path())?;
    set_mode(temp.as_file(), mode).at(temp.path())?;

    // Closes the handle; the path is still removed on drop until persisted
    let temp_path = temp.into_temp_path();
    temp_path.persist(path).map_err(|e| ProfileError::io(path, e.error))?;

    if let Err(err) = ensure_regular_file(path) {
        let _ = fs::remove_file(path);
        return Err(ProfileError::PostWriteValidation {
            path: path.to_path_buf(),
            source: Box::new(err),
        });
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}
