//! Host filesystem and process primitives.
//!
//! Plain paths are handed to [`HostFs`] unchanged, and materialized archive
//! entries end up here too. [`ArchiveFs`](crate::ArchiveFs) implements
//! [`HostFs`] itself, so code written against the trait works with or
//! without the overlay.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Output;

use crate::{AccessMode, FsError, OpenFlags, Stats};

/// Ordinary filesystem operations.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self`.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn HostFs`.
pub trait HostFs: Send + Sync {
    /// Metadata for a path, following symlinks.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the path does not exist or cannot be read
    fn stat(&self, path: &Path) -> Result<Stats, FsError>;

    /// Metadata for a path without following a final symlink.
    fn lstat(&self, path: &Path) -> Result<Stats, FsError>;

    /// Entire file contents.
    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Exactly `len` bytes of an open file starting at `offset`.
    ///
    /// Positioned read; the file cursor is not shared state.
    fn read_at(&self, file: &File, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;

    /// Names of a directory's children.
    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError>;

    /// Canonical absolute form of a path.
    fn realpath(&self, path: &Path) -> Result<PathBuf, FsError>;

    /// Check accessibility of a path.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if any requested mode is refused
    fn access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError>;

    /// Returns `true` if the path exists. Never fails.
    fn exists(&self, path: &Path) -> bool;

    /// Open a file.
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<File, FsError>;

    /// Create a single directory.
    fn create_dir(&self, path: &Path) -> Result<(), FsError>;
}

/// Subprocess launching.
pub trait HostProcess: Send + Sync {
    /// Run `program` directly with `args` and collect its output.
    fn exec_file(&self, program: &Path, args: &[OsString]) -> Result<Output, FsError>;

    /// Run a command line through the platform shell and collect its output.
    fn exec(&self, command: &str) -> Result<Output, FsError>;
}
