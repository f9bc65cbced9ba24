//! Metadata operations: stat, lstat, read_dir, realpath, exists, access.

use std::path::{Path, PathBuf};

use super::{ArchiveFs, not_found};
use crate::{
    AccessMode, Archive, ArchiveBackend, FaultKind, FileType, FsError, HostFs, ModuleStat,
    Settle, SplitResult, Stats,
};

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    /// Stat `path`, following links on the host.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the containing archive cannot be opened
    /// - `NotFound` if the entry is absent
    /// - `Io` from the host for ordinary paths
    pub fn stat(&self, path: &Path) -> Result<Stats, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => self.host.stat(path),
            SplitResult::Archive { archive, entry } => self.stat_entry(&archive, &entry),
        }
    }

    /// Stat `path` without following a final host link.
    ///
    /// Inside an archive this is the same as [`stat`](Self::stat).
    pub fn lstat(&self, path: &Path) -> Result<Stats, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => self.host.lstat(path),
            SplitResult::Archive { archive, entry } => self.stat_entry(&archive, &entry),
        }
    }

    /// Stat `path`, or `None` for any failure.
    pub fn stat_opt(&self, path: &Path) -> Option<Stats> {
        self.stat(path).ok()
    }

    fn stat_entry(&self, archive: &Path, entry: &Path) -> Result<Stats, FsError> {
        let handle = self.open_archive(archive)?;
        let stats = handle.stat(entry).ok_or_else(|| not_found(archive, entry))?;
        Ok(self.translator.to_host_stats(&stats))
    }

    /// [`stat`](Self::stat), delivered to `callback` on the next turn.
    pub fn stat_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<Stats, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.stat(path), callback);
    }

    /// [`stat`](Self::stat) as a future.
    pub fn stat_async(&self, path: &Path) -> Settle<Stats> {
        Settle::ready(self.stat(path))
    }

    /// [`lstat`](Self::lstat), delivered to `callback` on the next turn.
    pub fn lstat_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<Stats, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.lstat(path), callback);
    }

    /// [`lstat`](Self::lstat) as a future.
    pub fn lstat_async(&self, path: &Path) -> Settle<Stats> {
        Settle::ready(self.lstat(path))
    }

    /// Names of the children of directory `path`.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the containing archive cannot be opened
    /// - `NotFound` if the entry is absent or not a directory
    pub fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => self.host.read_dir(path),
            SplitResult::Archive { archive, entry } => {
                let handle = self.open_archive(&archive)?;
                handle
                    .read_dir(&entry)
                    .ok_or_else(|| not_found(&archive, &entry))
            }
        }
    }

    /// [`read_dir`](Self::read_dir), delivered to `callback` on the next turn.
    pub fn read_dir_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<Vec<String>, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.read_dir(path), callback);
    }

    /// [`read_dir`](Self::read_dir) as a future.
    pub fn read_dir_async(&self, path: &Path) -> Settle<Vec<String>> {
        Settle::ready(self.read_dir(path))
    }

    /// Canonical form of `path`.
    ///
    /// Inside an archive, links are resolved by the archive and the result is
    /// re-rooted at the archive's own canonical host path.
    pub fn realpath(&self, path: &Path) -> Result<PathBuf, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => self.host.realpath(path),
            SplitResult::Archive { archive, entry } => {
                let handle = self.open_archive(&archive)?;
                let target = handle
                    .realpath(&entry)
                    .ok_or_else(|| not_found(&archive, &entry))?;
                let real_archive = self.host.realpath(&archive)?;
                if target.as_os_str().is_empty() {
                    Ok(real_archive)
                } else {
                    Ok(real_archive.join(target))
                }
            }
        }
    }

    /// [`realpath`](Self::realpath), delivered to `callback` on the next turn.
    pub fn realpath_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<PathBuf, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.realpath(path), callback);
    }

    /// [`realpath`](Self::realpath) as a future.
    pub fn realpath_async(&self, path: &Path) -> Settle<PathBuf> {
        Settle::ready(self.realpath(path))
    }

    /// Whether `path` exists. An unopenable archive reads as absent.
    pub fn exists(&self, path: &Path) -> bool {
        self.entry_exists(path).unwrap_or(false)
    }

    /// [`exists`](Self::exists), delivered to `callback` on the next turn.
    pub fn exists_callback(&self, path: &Path, callback: impl FnOnce(bool) + Send + 'static) {
        let found = self.exists(path);
        self.ticks.defer(move || callback(found));
    }

    /// [`exists`](Self::exists) as a future.
    ///
    /// Unlike the other forms, an unopenable archive rejects with
    /// `InvalidArchive`.
    pub fn exists_async(&self, path: &Path) -> Settle<bool> {
        Settle::ready(self.entry_exists(path))
    }

    fn entry_exists(&self, path: &Path) -> Result<bool, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => Ok(self.host.exists(path)),
            SplitResult::Archive { archive, entry } => {
                let handle = self.open_archive(&archive)?;
                Ok(handle.stat(&entry).is_some())
            }
        }
    }

    /// Check whether `path` may be accessed with `mode`.
    ///
    /// Packed entries are readable and never writable. Unpacked entries are
    /// checked against their real file. Directories carry no file info and
    /// are treated like packed entries: `F_OK`/`R_OK` succeed.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the containing archive cannot be opened
    /// - `NotFound` if the entry is absent
    /// - `AccessDenied` if `mode` requests write access
    pub fn access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        let (archive, entry) = match self.resolver.split(path) {
            SplitResult::NotArchive => return self.host.access(path, mode),
            SplitResult::Archive { archive, entry } => (archive, entry),
        };
        let handle = self.open_archive(&archive)?;

        let unpacked = handle.file_info(&entry).is_some_and(|info| info.unpacked);
        if unpacked {
            let real = handle
                .copy_file_out(&entry)
                .ok_or_else(|| not_found(&archive, &entry))?;
            return self.host.access(&real, mode);
        }

        if handle.stat(&entry).is_none() {
            return Err(not_found(&archive, &entry));
        }
        if mode.wants_write() {
            return Err(FsError::fault(FaultKind::NoAccess, &archive, &entry));
        }
        Ok(())
    }

    /// [`access`](Self::access), delivered to `callback` on the next turn.
    pub fn access_callback(
        &self,
        path: &Path,
        mode: AccessMode,
        callback: impl FnOnce(Result<(), FsError>) + Send + 'static,
    ) {
        self.settle_later(self.access(path, mode), callback);
    }

    /// [`access`](Self::access) as a future.
    pub fn access_async(&self, path: &Path, mode: AccessMode) -> Settle<()> {
        Settle::ready(self.access(path, mode))
    }

    /// Cheap file/directory check used by module loaders. Never faults.
    pub fn module_stat(&self, path: &Path) -> ModuleStat {
        let file_type = match self.resolver.split(path) {
            SplitResult::NotArchive => self.host.stat(path).ok().and_then(|s| s.file_type()),
            SplitResult::Archive { archive, entry } => self
                .registry
                .get_or_create(&archive)
                .and_then(|handle| handle.stat(&entry))
                .map(|stats| stats.file_type),
        };
        match file_type {
            Some(FileType::Directory) => ModuleStat::Directory,
            Some(_) => ModuleStat::File,
            None => ModuleStat::Missing,
        }
    }
}
