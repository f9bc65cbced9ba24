//! File content reads.
//!
//! A read is split in two: [`ArchiveFs::locate`] does the metadata work
//! (handle, file info, unpacked check) at call time, and
//! [`ReadSource::load`] fetches the bytes. The asynchronous forms defer only
//! the second half. A handle torn down in between is never read through;
//! the deferred read faults with `InvalidArchive` instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{ArchiveFs, not_found};
use crate::registry::Lease;
use crate::{Archive, ArchiveBackend, FaultKind, FsError, HostFs, Settle, SplitResult};

/// Where the bytes of a located file come from.
enum ReadSource<A> {
    /// Zero-length entry, nothing to read.
    Empty,
    /// A real file on the host.
    Host(PathBuf),
    /// A byte range of the shared container file.
    Packed {
        archive: Lease<A>,
        archive_path: PathBuf,
        offset: u64,
        len: usize,
    },
}

impl<A: Archive> ReadSource<A> {
    fn load<H: HostFs + ?Sized>(&self, host: &H) -> Result<Vec<u8>, FsError> {
        match self {
            ReadSource::Empty => Ok(Vec::new()),
            ReadSource::Host(path) => host.read_file(path),
            ReadSource::Packed {
                archive,
                archive_path,
                offset,
                len,
            } => {
                if !archive.is_live() {
                    tracing::debug!(archive = %archive_path.display(), "handle torn down before read");
                    return Err(FsError::fault(
                        FaultKind::InvalidArchive,
                        archive_path,
                        Path::new(""),
                    ));
                }
                let file = archive
                    .handle()
                    .file()
                    .ok_or_else(|| not_found(archive_path, Path::new("")))?;
                tracing::trace!(archive = %archive_path.display(), offset, len, "packed read");
                host.read_at(file, *offset, *len).map_err(|err| match err {
                    FsError::Io {
                        operation, source, ..
                    } => FsError::Io {
                        operation,
                        path: archive_path.clone(),
                        source,
                    },
                    other => other,
                })
            }
        }
    }
}

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    fn locate(&self, path: &Path) -> Result<ReadSource<B::Archive>, FsError> {
        let (archive_path, entry) = match self.resolver.split(path) {
            SplitResult::NotArchive => return Ok(ReadSource::Host(path.to_path_buf())),
            SplitResult::Archive { archive, entry } => (archive, entry),
        };
        let lease = self.lease_archive(&archive_path)?;
        let archive = lease.handle();
        let info = archive
            .file_info(&entry)
            .ok_or_else(|| not_found(&archive_path, &entry))?;

        if info.size == 0 {
            return Ok(ReadSource::Empty);
        }
        if info.unpacked {
            let real = archive
                .copy_file_out(&entry)
                .ok_or_else(|| not_found(&archive_path, &entry))?;
            return Ok(ReadSource::Host(real));
        }
        if archive.file().is_none() {
            return Err(not_found(&archive_path, &entry));
        }

        self.access_log.record(&archive_path, &entry, info.offset);
        let len = usize::try_from(info.size).map_err(|_| FsError::InvalidData {
            path: archive_path.join(&entry),
            details: format!("entry of {} bytes does not fit in memory", info.size),
        })?;
        Ok(ReadSource::Packed {
            archive: lease.clone(),
            archive_path,
            offset: info.offset,
            len,
        })
    }

    /// Read the whole of `path`.
    ///
    /// # Errors
    ///
    /// - `InvalidArchive` if the containing archive cannot be opened
    /// - `NotFound` if the entry is absent or has no backing data
    /// - `Io` if the host read fails
    pub fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        self.locate(path)?.load(&*self.host)
    }

    /// [`read_file`](Self::read_file), delivered to `callback` on the next turn.
    ///
    /// Lookup failures are known immediately; the byte read itself happens
    /// when the callback is delivered.
    pub fn read_file_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<Vec<u8>, FsError>) + Send + 'static,
    ) {
        match self.locate(path) {
            Ok(source) => {
                let host = Arc::clone(&self.host);
                self.ticks.defer(move || callback(source.load(&*host)));
            }
            Err(err) => self.settle_later(Err(err), callback),
        }
    }

    /// [`read_file`](Self::read_file) as a future. The byte read runs when
    /// the future settles.
    pub fn read_file_async(&self, path: &Path) -> Settle<Vec<u8>> {
        match self.locate(path) {
            Ok(source) => {
                let host = Arc::clone(&self.host);
                Settle::deferred(move || source.load(&*host))
            }
            Err(err) => Settle::ready(Err(err)),
        }
    }

    /// Read `path` as UTF-8 text.
    ///
    /// # Errors
    ///
    /// As [`read_file`](Self::read_file), plus `InvalidData` if the contents
    /// are not valid UTF-8.
    pub fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        decode_utf8(path, self.read_file(path)?)
    }

    /// [`read_to_string`](Self::read_to_string), delivered to `callback` on
    /// the next turn.
    pub fn read_to_string_callback(
        &self,
        path: &Path,
        callback: impl FnOnce(Result<String, FsError>) + Send + 'static,
    ) {
        let owned = path.to_path_buf();
        self.read_file_callback(path, move |result| {
            callback(result.and_then(|bytes| decode_utf8(&owned, bytes)))
        });
    }

    /// [`read_to_string`](Self::read_to_string) as a future.
    pub fn read_to_string_async(&self, path: &Path) -> Settle<String> {
        match self.locate(path) {
            Ok(source) => {
                let host = Arc::clone(&self.host);
                let owned = path.to_path_buf();
                Settle::deferred(move || decode_utf8(&owned, source.load(&*host)?))
            }
            Err(err) => Settle::ready(Err(err)),
        }
    }

    /// Source text for a module loader, or `None` if it cannot be read.
    ///
    /// Invalid UTF-8 is replaced rather than rejected.
    pub fn read_module_source(&self, path: &Path) -> Option<String> {
        let bytes = self.read_file(path).ok()?;
        Some(String::from_utf8_lossy(&bytes).into_owned())
    }
}

fn decode_utf8(path: &Path, bytes: Vec<u8>) -> Result<String, FsError> {
    String::from_utf8(bytes).map_err(|err| FsError::InvalidData {
        path: path.to_path_buf(),
        details: err.utf8_error().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::super::tests::{fixture, fixture_with};
    use super::*;
    use crate::{Config, FaultKind, FileInfo};
    use std::sync::atomic::Ordering;
    use std::sync::mpsc;

    #[test]
    fn packed_entry_reads_its_byte_range() {
        let fs = fixture();
        assert_eq!(fs.read_file(Path::new("/app.asar/index.js")).unwrap(), b"hello world!");
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_entry_skips_the_read() {
        let fs = fixture();
        assert!(fs.read_file(Path::new("/app.asar/lib/empty.js")).unwrap().is_empty());
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_entry_is_not_found() {
        let fs = fixture();
        let err = fs.read_file(Path::new("/app.asar/missing.js")).unwrap_err();
        assert_eq!(err.kind(), Some(FaultKind::NotFound));
        assert!(err.to_string().contains("missing.js"));
        assert!(err.to_string().contains("app.asar"));
    }

    #[test]
    fn unpacked_entry_is_read_from_host() {
        let fs = fixture_with(Config::default(), |archive| {
            archive.insert_file(
                "native.node",
                FileInfo {
                    size: 8,
                    offset: 0,
                    unpacked: true,
                },
            );
        });
        assert_eq!(fs.read_file(Path::new("/app.asar/native.node")).unwrap(), b"unpacked");
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn missing_container_file_is_not_found() {
        let fs = fixture_with(Config::default(), |archive| archive.detach_container());
        let err = fs.read_file(Path::new("/app.asar/index.js")).unwrap_err();
        assert_eq!(err.kind(), Some(FaultKind::NotFound));
    }

    #[test]
    fn read_to_string_rejects_invalid_utf8() {
        let fs = fixture_with(Config::default(), |archive| {
            archive.insert_file(
                "bad.txt",
                FileInfo {
                    size: 4,
                    offset: 16,
                    unpacked: false,
                },
            );
        });
        assert_eq!(fs.read_to_string(Path::new("/app.asar/index.js")).unwrap(), "hello world!");
        let err = fs.read_to_string(Path::new("/app.asar/bad.txt")).unwrap_err();
        assert!(matches!(err, FsError::InvalidData { .. }));
        let lossy = fs.read_module_source(Path::new("/app.asar/bad.txt")).unwrap();
        assert!(lossy.contains('\u{FFFD}'));
    }

    #[test]
    fn module_source_is_none_for_missing() {
        let fs = fixture();
        assert!(fs.read_module_source(Path::new("/app.asar/nope.js")).is_none());
        assert!(fs.read_module_source(Path::new("/broken.asar/a.js")).is_none());
    }

    #[test]
    fn callback_defers_the_byte_read() {
        let fs = fixture();
        let (tx, rx) = mpsc::channel();
        fs.read_file_callback(Path::new("/app.asar/index.js"), move |result| {
            tx.send(result.unwrap()).unwrap();
        });
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());

        fs.run_pending();
        assert_eq!(rx.try_recv().unwrap(), b"hello world!");
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn queued_read_faults_after_teardown() {
        let fs = fixture();
        let (tx, rx) = mpsc::channel();
        fs.read_file_callback(Path::new("/app.asar/index.js"), move |result| {
            tx.send(result.unwrap_err().kind()).unwrap();
        });
        fs.teardown();

        assert_eq!(fs.run_pending(), 1);
        assert_eq!(rx.try_recv().unwrap(), Some(FaultKind::InvalidArchive));
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 0);

        // A fresh lookup reopens the archive.
        assert_eq!(fs.read_file(Path::new("/app.asar/index.js")).unwrap(), b"hello world!");
    }

    #[test]
    fn callback_reports_lookup_failure_once() {
        let fs = fixture();
        let (tx, rx) = mpsc::channel();
        fs.read_to_string_callback(Path::new("/app.asar/missing.js"), move |result| {
            tx.send(result.unwrap_err().kind()).unwrap();
        });
        assert_eq!(fs.run_pending(), 1);
        assert_eq!(rx.try_recv().unwrap(), Some(FaultKind::NotFound));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn async_read_settles_with_contents() {
        let fs = fixture();
        let text = fs
            .read_to_string_async(Path::new("/app.asar/index.js"))
            .await
            .unwrap();
        assert_eq!(text, "hello world!");
        let err = fs.read_file_async(Path::new("/broken.asar/a")).await.unwrap_err();
        assert_eq!(err.kind(), Some(FaultKind::InvalidArchive));
    }

    #[tokio::test]
    async fn pending_future_faults_after_teardown() {
        let fs = fixture();
        let pending = fs.read_to_string_async(Path::new("/app.asar/index.js"));
        fs.teardown();

        let err = pending.await.unwrap_err();
        assert_eq!(err.kind(), Some(FaultKind::InvalidArchive));
        assert_eq!(fs.host().reads.load(Ordering::SeqCst), 0);
    }
}
