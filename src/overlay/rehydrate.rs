//! Operations the host must perform on a real file: open, spawn, mkdir.

use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Output;

use super::{ArchiveFs, not_found};
use crate::{
    Archive, ArchiveBackend, FaultKind, FsError, HostFs, HostProcess, OpenFlags, Settle,
    SplitResult,
};

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    /// Host path holding the contents of `path`.
    ///
    /// Ordinary paths are returned unchanged. Archive entries are extracted
    /// (or, if unpacked, located next to the container) so native loaders and
    /// spawners can use them.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the containing archive cannot be opened
    /// - `NotFound` if the entry cannot be materialized
    pub fn materialize(&self, path: &Path) -> Result<PathBuf, FsError> {
        match self.resolver.split(path) {
            SplitResult::NotArchive => Ok(path.to_path_buf()),
            SplitResult::Archive { archive, entry } => {
                let handle = self.open_archive(&archive)?;
                let real = handle
                    .copy_file_out(&entry)
                    .ok_or_else(|| not_found(&archive, &entry))?;
                tracing::debug!(
                    archive = %archive.display(),
                    entry = %entry.display(),
                    real = %real.display(),
                    "materialized archive entry"
                );
                Ok(real)
            }
        }
    }

    /// Open `path` on the host, materializing archive entries first.
    pub fn open(&self, path: &Path, flags: OpenFlags) -> Result<File, FsError> {
        let real = self.materialize(path)?;
        self.host.open(&real, flags)
    }

    /// [`open`](Self::open), delivered to `callback` on the next turn.
    pub fn open_callback(
        &self,
        path: &Path,
        flags: OpenFlags,
        callback: impl FnOnce(Result<File, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.open(path, flags), callback);
    }

    /// [`open`](Self::open) as a future.
    pub fn open_async(&self, path: &Path, flags: OpenFlags) -> Settle<File> {
        Settle::ready(self.open(path, flags))
    }

    /// Create directory `path`.
    ///
    /// Archives are read-only. With `not_dir_on_create` set, creating a
    /// directory below an archive root reports `NotADirectory` instead of
    /// whatever the host would say about the archive file.
    pub fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        if self.not_dir_on_create {
            if let SplitResult::Archive { archive, entry } = self.resolver.split(path) {
                if !entry.as_os_str().is_empty() {
                    return Err(FsError::fault(FaultKind::NotDirectory, &archive, &entry));
                }
            }
        }
        self.host.create_dir(path)
    }

    /// [`create_dir`](Self::create_dir), delivered to `callback` on the next turn.
    pub fn create_dir_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<(), FsError>) + Send + 'static,
    ) {
        self.settle_later(self.create_dir(path), callback);
    }

    /// [`create_dir`](Self::create_dir) as a future.
    pub fn create_dir_async(&self, path: &Path) -> Settle<()> {
        Settle::ready(self.create_dir(path))
    }

    /// Run `f` with archive detection switched off.
    ///
    /// Detection resumes once `f` returns or unwinds and no other
    /// `without_archives` scope (nested or on another thread) is still open.
    pub fn without_archives<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.resolver.suppress();
        f()
    }
}

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + HostProcess + 'static,
{
    /// Run `program` with `args`, materializing it first if it lives in an
    /// archive.
    pub fn exec_file(&self, program: &Path, args: &[OsString]) -> Result<Output, FsError> {
        let real = self.materialize(program)?;
        self.host.exec_file(&real, args)
    }

    /// [`exec_file`](Self::exec_file), delivered to `callback` on the next turn.
    pub fn exec_file_callback(
        &self,
        program: &Path,
        args: &[OsString],
        callback: impl FnOnce(Result<Output, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.exec_file(program, args), callback);
    }

    /// [`exec_file`](Self::exec_file) as a future.
    pub fn exec_file_async(&self, program: &Path, args: &[OsString]) -> Settle<Output> {
        Settle::ready(self.exec_file(program, args))
    }

    /// Run a shell command line.
    ///
    /// The command text is opaque, so archive detection is switched off for
    /// the duration of the call.
    pub fn exec(&self, command: &str) -> Result<Output, FsError> {
        self.without_archives(|| self.host.exec(command))
    }

    /// [`exec`](Self::exec), delivered to `callback` on the next turn.
    pub fn exec_callback(
        &self,
        command: &str,
        callback: impl FnOnce(Result<Output, FsError>) + Send + 'static,
    ) {
        self.settle_later(self.exec(command), callback);
    }

    /// [`exec`](Self::exec) as a future.
    pub fn exec_async(&self, command: &str) -> Settle<Output> {
        Settle::ready(self.exec(command))
    }
}
