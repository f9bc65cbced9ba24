//! Opt-in diagnostic log of packed archive reads.
//!
//! Each archive gets its own append-only file named
//! `{archive stem}-access-log.txt`; every packed read adds one
//! `"{offset}: {entry}"` line.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

/// Per-archive read log. Does nothing unless enabled.
#[derive(Debug)]
pub struct AccessLog {
    dir: Option<PathBuf>,
    files: Mutex<HashMap<PathBuf, File>>,
}

impl AccessLog {
    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self {
            dir: None,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// A log writing its files into `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if reads are being recorded.
    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Log file used for `archive`, if logging is enabled.
    pub fn log_path(&self, archive: &Path) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let stem = archive.file_stem().unwrap_or(archive.as_os_str());
        let mut name = stem.to_os_string();
        name.push("-access-log.txt");
        Some(dir.join(name))
    }

    /// Record a packed read of `entry` at `offset`.
    ///
    /// Write failures are reported through `tracing` and otherwise ignored;
    /// diagnostics never fail a read.
    pub fn record(&self, archive: &Path, entry: &Path, offset: u64) {
        let Some(log_path) = self.log_path(archive) else {
            return;
        };

        let mut files = self.files.lock();
        if !files.contains_key(archive) {
            match OpenOptions::new().create(true).append(true).open(&log_path) {
                Ok(file) => {
                    files.insert(archive.to_path_buf(), file);
                }
                Err(error) => {
                    tracing::warn!(log = %log_path.display(), %error, "cannot open archive access log");
                    return;
                }
            }
        }
        let Some(file) = files.get_mut(archive) else {
            return;
        };

        if let Err(error) = writeln!(file, "{offset}: {}", entry.display()) {
            tracing::warn!(log = %log_path.display(), %error, "cannot write archive access log");
        }
    }
}
