//! Translation of archive entry descriptions into host stat records.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use crate::types::to_millis;
use crate::{EntryStats, Permissions, Stats};

/// Device id reported for every archive entry.
pub const ARCHIVE_DEV: u64 = 1;

/// Builds [`Stats`] for archive entries.
///
/// Fields the archive format does not carry are synthesized: a fixed device
/// id and link count, the effective uid/gid of the process, and an inode
/// number drawn from a counter that increases on every translation. Inode
/// numbers are unique for the lifetime of the translator and carry no other
/// meaning; two stats of the same entry get different numbers.
#[derive(Debug)]
pub struct StatsTranslator {
    uid: u32,
    gid: u32,
    fallback_ms: i64,
    next_ino: AtomicU64,
}

impl StatsTranslator {
    /// Create a translator owned by the current process.
    ///
    /// Timestamps the archive did not record are reported as the moment the
    /// translator was created.
    pub fn new() -> Self {
        let (uid, gid) = effective_ids();
        Self::with_owner(uid, gid)
    }

    /// Create a translator reporting the given owner.
    pub fn with_owner(uid: u32, gid: u32) -> Self {
        Self {
            uid,
            gid,
            fallback_ms: to_millis(SystemTime::now()),
            next_ino: AtomicU64::new(0),
        }
    }

    /// Translate one entry.
    pub fn to_host_stats(&self, entry: &EntryStats) -> Stats {
        let ms = |time: Option<SystemTime>| time.map_or(self.fallback_ms, to_millis);
        Stats {
            dev: ARCHIVE_DEV,
            mode: Permissions::archive_entry().mode() | entry.file_type.mode_bits(),
            nlink: 1,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: None,
            ino: self.next_ino.fetch_add(1, Ordering::Relaxed) + 1,
            size: entry.size,
            blocks: None,
            atime_ms: ms(entry.accessed),
            mtime_ms: ms(entry.modified),
            ctime_ms: ms(entry.changed),
            birthtime_ms: ms(entry.created),
        }
    }
}

impl Default for StatsTranslator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn effective_ids() -> (u32, u32) {
    // SAFETY: geteuid/getegid have no preconditions and cannot fail.
    unsafe { (libc::geteuid(), libc::getegid()) }
}

#[cfg(not(unix))]
fn effective_ids() -> (u32, u32) {
    (0, 0)
}
