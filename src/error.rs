//! Error types for the archive overlay.
//!
//! Archive faults are classified into four [`FaultKind`]s and mapped onto
//! [`FsError`] by [`FsError::fault`]. Host faults keep their `io::Error`
//! source so pass-through calls report the same conventional code the host
//! would have.

use std::io;
use std::path::{Path, PathBuf};

/// Abstract archive fault, independent of how it is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FaultKind {
    /// Entry absent from the archive.
    NotFound,
    /// A directory was required but the path denotes something else.
    NotDirectory,
    /// Write access requested against a read-only archive entry.
    NoAccess,
    /// The archive container itself could not be opened.
    InvalidArchive,
}

/// Filesystem error type returned by every overlay operation.
///
/// # Examples
///
/// ```rust
/// use anyfs_asar::{FaultKind, FsError};
/// use std::path::Path;
///
/// let err = FsError::fault(FaultKind::NotFound, Path::new("app.asar"), Path::new("missing.js"));
/// assert_eq!(err.code(), Some("ENOENT"));
/// assert_eq!(err.to_string(), "ENOENT, missing.js not found in app.asar");
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Entry does not exist inside the archive.
    #[error("ENOENT, {} not found in {}", path.display(), archive.display())]
    NotFound {
        /// The archive container that was searched.
        archive: PathBuf,
        /// The intra-archive path that was not found.
        path: PathBuf,
    },

    /// Expected a directory but found something else.
    #[error("ENOTDIR, not a directory")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Write access refused on a read-only archive entry.
    #[error("EACCES: permission denied, access '{}'", path.display())]
    AccessDenied {
        /// The intra-archive path access was requested for.
        path: PathBuf,
    },

    /// The archive container could not be opened or parsed.
    #[error("Invalid package {}", archive.display())]
    InvalidArchive {
        /// The archive container path.
        archive: PathBuf,
    },

    /// Entry contents are not in the requested encoding.
    #[error("invalid data: {} ({details})", path.display())]
    InvalidData {
        /// The path with invalid data.
        path: PathBuf,
        /// Details about the invalid data.
        details: String,
    },

    /// Entry contents could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Host I/O error with context.
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Map an archive fault onto the error reported to callers.
    ///
    /// `archive` is the container path and `entry` the intra-archive path;
    /// each kind only uses what its message needs.
    pub fn fault(kind: FaultKind, archive: &Path, entry: &Path) -> Self {
        match kind {
            FaultKind::NotFound => FsError::NotFound {
                archive: archive.to_path_buf(),
                path: entry.to_path_buf(),
            },
            FaultKind::NotDirectory => FsError::NotADirectory {
                path: archive.join(entry),
            },
            FaultKind::NoAccess => FsError::AccessDenied {
                path: entry.to_path_buf(),
            },
            FaultKind::InvalidArchive => FsError::InvalidArchive {
                archive: archive.to_path_buf(),
            },
        }
    }

    /// Wrap a host I/O error with the operation and path it came from.
    pub fn io(operation: &'static str, path: &Path, source: io::Error) -> Self {
        FsError::Io {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// The archive fault this error represents, if any.
    pub fn kind(&self) -> Option<FaultKind> {
        match self {
            FsError::NotFound { .. } => Some(FaultKind::NotFound),
            FsError::NotADirectory { .. } => Some(FaultKind::NotDirectory),
            FsError::AccessDenied { .. } => Some(FaultKind::NoAccess),
            FsError::InvalidArchive { .. } => Some(FaultKind::InvalidArchive),
            FsError::InvalidData { .. } | FsError::Deserialization(_) | FsError::Io { .. } => None,
        }
    }

    /// Conventional error code (`ENOENT`, `ENOTDIR`, ...).
    ///
    /// `InvalidArchive` carries no code, only a message.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            FsError::NotFound { .. } => Some("ENOENT"),
            FsError::NotADirectory { .. } => Some("ENOTDIR"),
            FsError::AccessDenied { .. } => Some("EACCES"),
            FsError::InvalidArchive { .. }
            | FsError::InvalidData { .. }
            | FsError::Deserialization(_) => None,
            FsError::Io { source, .. } => io_code(source),
        }
    }

    /// Negated errno matching [`code`](Self::code).
    pub fn errno(&self) -> Option<i32> {
        match self {
            FsError::NotFound { .. } => Some(-2),
            FsError::NotADirectory { .. } => Some(-20),
            FsError::AccessDenied { .. } => Some(-13),
            FsError::InvalidArchive { .. }
            | FsError::InvalidData { .. }
            | FsError::Deserialization(_) => None,
            FsError::Io { source, .. } => source.raw_os_error().map(|errno| -errno).or_else(|| {
                match io_code(source)? {
                    "ENOENT" => Some(-2),
                    "EACCES" => Some(-13),
                    "EEXIST" => Some(-17),
                    "ENOTDIR" => Some(-20),
                    _ => None,
                }
            }),
        }
    }
}

fn io_code(error: &io::Error) -> Option<&'static str> {
    match error.kind() {
        io::ErrorKind::NotFound => Some("ENOENT"),
        io::ErrorKind::PermissionDenied => Some("EACCES"),
        io::ErrorKind::AlreadyExists => Some("EEXIST"),
        io::ErrorKind::NotADirectory => Some("ENOTDIR"),
        io::ErrorKind::IsADirectory => Some("EISDIR"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fault(kind: FaultKind) -> FsError {
        FsError::fault(kind, Path::new("/opt/app.asar"), Path::new("lib/index.js"))
    }

    #[test]
    fn not_found_names_entry_and_archive() {
        let err = fault(FaultKind::NotFound);
        assert_eq!(
            err.to_string(),
            "ENOENT, lib/index.js not found in /opt/app.asar"
        );
        assert_eq!(err.code(), Some("ENOENT"));
        assert_eq!(err.errno(), Some(-2));
    }

    #[test]
    fn not_directory_has_fixed_message() {
        let err = fault(FaultKind::NotDirectory);
        assert_eq!(err.to_string(), "ENOTDIR, not a directory");
        assert_eq!(err.code(), Some("ENOTDIR"));
        assert_eq!(err.errno(), Some(-20));
    }

    #[test]
    fn no_access_quotes_entry() {
        let err = fault(FaultKind::NoAccess);
        assert_eq!(
            err.to_string(),
            "EACCES: permission denied, access 'lib/index.js'"
        );
        assert_eq!(err.code(), Some("EACCES"));
        assert_eq!(err.errno(), Some(-13));
    }

    #[test]
    fn invalid_archive_is_message_only() {
        let err = fault(FaultKind::InvalidArchive);
        assert_eq!(err.to_string(), "Invalid package /opt/app.asar");
        assert_eq!(err.code(), None);
        assert_eq!(err.errno(), None);
    }

    #[test]
    fn kind_round_trips_through_fault() {
        for kind in [
            FaultKind::NotFound,
            FaultKind::NotDirectory,
            FaultKind::NoAccess,
            FaultKind::InvalidArchive,
        ] {
            assert_eq!(fault(kind).kind(), Some(kind));
        }
    }

    #[test]
    fn io_error_keeps_host_code() {
        let err = FsError::io(
            "stat",
            Path::new("/missing"),
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), Some("ENOENT"));
        assert_eq!(err.errno(), Some(-2));
        assert_eq!(err.kind(), None);
        assert!(err.to_string().starts_with("stat failed for /missing"));
    }

    #[test]
    fn io_error_prefers_raw_os_errno() {
        let err = FsError::io("open", Path::new("/x"), io::Error::from_raw_os_error(13));
        assert_eq!(err.errno(), Some(-13));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<FsError>();
    }
}
