//! Core types shared by the archive backend, the host and the overlay.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Reserved suffix marking an archive container boundary.
pub const ARCHIVE_SUFFIX: &str = ".asar";

/// File type bits of [`Stats::mode`].
pub const S_IFMT: u32 = 0o170000;
/// Regular file type bit.
pub const S_IFREG: u32 = 0o100000;
/// Directory type bit.
pub const S_IFDIR: u32 = 0o040000;
/// Symbolic link type bit.
pub const S_IFLNK: u32 = 0o120000;

/// Type of an archive entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
}

impl FileType {
    /// The `S_IF*` bit for this type.
    #[inline]
    pub const fn mode_bits(self) -> u32 {
        match self {
            FileType::File => S_IFREG,
            FileType::Directory => S_IFDIR,
            FileType::Symlink => S_IFLNK,
        }
    }
}

/// Archive-native description of an entry.
///
/// Carries no device, inode or ownership data; those are synthesized when the
/// entry is translated into [`Stats`]. A `None` timestamp means the archive
/// did not record one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntryStats {
    /// Kind of entry.
    pub file_type: FileType,
    /// Size in bytes.
    pub size: u64,
    /// Last access time.
    pub accessed: Option<SystemTime>,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Last status change time.
    pub changed: Option<SystemTime>,
    /// Creation time.
    pub created: Option<SystemTime>,
}

impl EntryStats {
    /// Entry of the given type and size with no recorded timestamps.
    pub fn new(file_type: FileType, size: u64) -> Self {
        Self {
            file_type,
            size,
            accessed: None,
            modified: None,
            changed: None,
            created: None,
        }
    }
}

/// Location of a file's bytes inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FileInfo {
    /// Size in bytes.
    pub size: u64,
    /// Byte offset of the data within the container file.
    pub offset: u64,
    /// Stored as a real file next to the container instead of in the blob.
    pub unpacked: bool,
}

/// Host-shaped stat record.
///
/// Timestamps are milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Device id.
    pub dev: u64,
    /// Permission and type bits.
    pub mode: u32,
    /// Number of hard links.
    pub nlink: u64,
    /// Owner user id.
    pub uid: u32,
    /// Owner group id.
    pub gid: u32,
    /// Device id of a special file.
    pub rdev: u64,
    /// Preferred I/O block size, when known.
    pub blksize: Option<u64>,
    /// Inode number.
    pub ino: u64,
    /// Size in bytes.
    pub size: u64,
    /// Allocated blocks, when known.
    pub blocks: Option<u64>,
    /// Last access time.
    pub atime_ms: i64,
    /// Last modification time.
    pub mtime_ms: i64,
    /// Last status change time.
    pub ctime_ms: i64,
    /// Creation time.
    pub birthtime_ms: i64,
}

impl Stats {
    /// Type of the entry, derived from the mode bits.
    pub fn file_type(&self) -> Option<FileType> {
        match self.mode & S_IFMT {
            S_IFREG => Some(FileType::File),
            S_IFDIR => Some(FileType::Directory),
            S_IFLNK => Some(FileType::Symlink),
            _ => None,
        }
    }

    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type() == Some(FileType::File)
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == Some(FileType::Directory)
    }

    /// Returns `true` if this is a symbolic link.
    #[inline]
    pub fn is_symlink(&self) -> bool {
        self.file_type() == Some(FileType::Symlink)
    }

    /// Permission bits only.
    #[inline]
    pub fn permissions(&self) -> Permissions {
        Permissions::from_mode(self.mode)
    }

    /// Last modification time as a [`SystemTime`].
    pub fn modified(&self) -> SystemTime {
        from_millis(self.mtime_ms)
    }
}

/// Milliseconds since the Unix epoch, negative before it.
pub(crate) fn to_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => i64::try_from(before.duration().as_millis()).map_or(i64::MIN, |ms| -ms),
    }
}

fn from_millis(ms: i64) -> SystemTime {
    if ms >= 0 {
        UNIX_EPOCH + Duration::from_millis(ms as u64)
    } else {
        UNIX_EPOCH - Duration::from_millis(ms.unsigned_abs())
    }
}

/// Unix-style permissions stored as a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }

    /// Permissions reported for every archive entry (0o644 = rw-r--r--).
    ///
    /// The owner write bit is a formality; archives are never writable.
    #[inline]
    pub const fn archive_entry() -> Self {
        Self(0o644)
    }
}

/// Accessibility check mode, as in `access(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessMode(u32);

impl AccessMode {
    /// Existence only.
    pub const F_OK: Self = Self(0);
    /// Execute permission.
    pub const X_OK: Self = Self(1);
    /// Write permission.
    pub const W_OK: Self = Self(2);
    /// Read permission.
    pub const R_OK: Self = Self(4);

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if write access is requested.
    #[inline]
    pub const fn wants_write(self) -> bool {
        self.0 & Self::W_OK.0 != 0
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::F_OK
    }
}

impl std::ops::BitOr for AccessMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Flags for opening a file on the host.
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create file if it doesn't exist.
    pub create: bool,
    /// Truncate file to zero length.
    pub truncate: bool,
    /// Append to end of file.
    pub append: bool,
}

impl OpenFlags {
    /// Read-only access.
    pub const READ: Self = Self {
        read: true,
        write: false,
        create: false,
        truncate: false,
        append: false,
    };

    /// Write access with create and truncate.
    pub const WRITE: Self = Self {
        read: false,
        write: true,
        create: true,
        truncate: true,
        append: false,
    };

    /// Translate into [`std::fs::OpenOptions`].
    pub fn to_open_options(self) -> std::fs::OpenOptions {
        let mut options = std::fs::OpenOptions::new();
        options
            .read(self.read)
            .write(self.write)
            .create(self.create)
            .truncate(self.truncate)
            .append(self.append);
        options
    }
}

/// Result of the loader's cheap existence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleStat {
    /// Path is a regular file (or anything that is not a directory).
    File,
    /// Path is a directory.
    Directory,
    /// Path does not exist or its archive cannot be opened.
    Missing,
}
