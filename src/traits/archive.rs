//! Archive backend: opens containers and answers read-only queries.
//!
//! The container format itself (header, offset table, packed data) lives
//! behind these traits. The overlay only calls them.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::{EntryStats, FileInfo};

/// Opens archive containers.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the overlay shares one backend
/// across all requests.
///
/// # Example
///
/// ```rust
/// use anyfs_asar::{Archive, ArchiveBackend, EntryStats, FileInfo};
/// use std::fs::File;
/// use std::path::{Path, PathBuf};
///
/// struct Empty;
///
/// impl Archive for Empty {
///     fn stat(&self, _: &Path) -> Option<EntryStats> { None }
///     fn read_dir(&self, _: &Path) -> Option<Vec<String>> { None }
///     fn realpath(&self, _: &Path) -> Option<PathBuf> { None }
///     fn file_info(&self, _: &Path) -> Option<FileInfo> { None }
///     fn copy_file_out(&self, _: &Path) -> Option<PathBuf> { None }
///     fn file(&self) -> Option<&File> { None }
///     fn destroy(&self) {}
/// }
///
/// struct NeverOpens;
///
/// impl ArchiveBackend for NeverOpens {
///     type Archive = Empty;
///     fn open(&self, _: &Path) -> Option<Empty> { None }
/// }
/// ```
pub trait ArchiveBackend: Send + Sync {
    /// Handle type for one opened container.
    type Archive: Archive + 'static;

    /// Open the container at `archive`.
    ///
    /// Returns `None` when the container is missing, unreadable or malformed.
    fn open(&self, archive: &Path) -> Option<Self::Archive>;
}

/// One opened archive container.
///
/// Entry paths are relative to the container root; the empty path is the
/// root itself. Every query returns `None` when the entry does not exist.
pub trait Archive: Send + Sync {
    /// Describe an entry.
    fn stat(&self, entry: &Path) -> Option<EntryStats>;

    /// Names of a directory's children.
    ///
    /// Returns `None` if `entry` is missing or not a directory.
    fn read_dir(&self, entry: &Path) -> Option<Vec<String>>;

    /// Resolve links inside the archive, yielding an intra-archive path.
    fn realpath(&self, entry: &Path) -> Option<PathBuf>;

    /// Where a file's bytes are stored.
    fn file_info(&self, entry: &Path) -> Option<FileInfo>;

    /// Materialize an entry as a real file and return its host path.
    ///
    /// Unpacked entries return the path of the file stored next to the
    /// container; packed entries are extracted to a temporary location.
    fn copy_file_out(&self, entry: &Path) -> Option<PathBuf>;

    /// The container's open file, shared by every packed read.
    fn file(&self) -> Option<&File>;

    /// Release the container. Called once, when the handle leaves the cache.
    fn destroy(&self);
}
