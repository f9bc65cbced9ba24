//! # Archive Overlay
//!
//! [`ArchiveFs`] routes every operation either into an archive or to the
//! host, depending on how the [`PathResolver`] classifies the path.
//!
//! ```text
//! op(path)
//!   └── split(path)
//!         ├── NotArchive               → host.op(path)
//!         └── Archive { archive, entry }
//!               └── registry.get_or_create(archive)
//!                     ├── None         → InvalidArchive
//!                     └── Some(handle) → handle query → translate / fault
//! ```
//!
//! Operations come in three shapes, see [`crate::settle`]. The synchronous
//! one is the implementation; `*_callback` and `*_async` wrap it.
//!
//! Entries the host must touch directly (open, spawn, native loading) are
//! materialized first: [`ArchiveFs::materialize`] extracts the entry and the
//! host operation is re-run against the real path.

mod metadata;
mod read;
mod rehydrate;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;

use crate::registry::Lease;
use crate::{
    AccessLog, AccessMode, ArchiveBackend, ArchiveRegistry, Config, FaultKind, FsError, HostFs,
    HostProcess, NativeHost, OpenFlags, PathResolver, SplitResult, Stats, StatsTranslator,
    TickQueue,
};

/// Filesystem facade that serves archive contents as ordinary files.
///
/// # Example
///
/// ```rust,ignore
/// use anyfs_asar::{ArchiveFs, Config};
/// use std::path::Path;
///
/// let fs = ArchiveFs::native(MyAsarBackend::new(), Config::default());
/// let source = fs.read_to_string(Path::new("/opt/app/resources/app.asar/index.js"))?;
/// let plain = fs.read_file(Path::new("/etc/hostname"))?; // passes straight to the host
/// ```
pub struct ArchiveFs<B: ArchiveBackend, H> {
    resolver: PathResolver,
    registry: ArchiveRegistry<B>,
    translator: StatsTranslator,
    access_log: AccessLog,
    host: Arc<H>,
    ticks: TickQueue,
    not_dir_on_create: bool,
}

impl<B: ArchiveBackend> ArchiveFs<B, NativeHost> {
    /// Overlay `backend` onto the real filesystem.
    pub fn native(backend: B, config: Config) -> Self {
        Self::new(backend, NativeHost, config)
    }
}

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    /// Overlay `backend` onto `host`.
    pub fn new(backend: B, host: H, config: Config) -> Self {
        let access_log = if config.log_reads {
            AccessLog::in_dir(&config.log_dir)
        } else {
            AccessLog::disabled()
        };
        Self {
            resolver: PathResolver::new(&config),
            registry: ArchiveRegistry::new(backend),
            translator: StatsTranslator::new(),
            access_log,
            host: Arc::new(host),
            ticks: TickQueue::new(),
            not_dir_on_create: config.not_dir_on_create,
        }
    }

    /// The path classifier.
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// The archive handle cache.
    pub fn registry(&self) -> &ArchiveRegistry<B> {
        &self.registry
    }

    /// The wrapped host.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Queue holding pending callback deliveries.
    pub fn ticks(&self) -> &TickQueue {
        &self.ticks
    }

    /// Deliver every pending callback. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.ticks.run_pending()
    }

    /// Destroy all open archive handles.
    ///
    /// Later calls reopen archives on demand.
    pub fn teardown(&self) {
        self.registry.teardown_all();
    }

    /// Cached handle for `archive`, or `InvalidArchive`.
    fn open_archive(&self, archive: &Path) -> Result<Arc<B::Archive>, FsError> {
        self.lease_archive(archive).map(|lease| Arc::clone(lease.handle()))
    }

    /// [`open_archive`](Self::open_archive) for work that may run after a
    /// teardown.
    fn lease_archive(&self, archive: &Path) -> Result<Lease<B::Archive>, FsError> {
        self.registry
            .lease(archive)
            .ok_or_else(|| FsError::fault(FaultKind::InvalidArchive, archive, Path::new("")))
    }

    /// Queue `callback(result)` for the next turn.
    fn settle_later<T: Send + 'static>(
        &self,
        result: Result<T, FsError>,
        callback: impl FnOnce(Result<T, FsError>) + Send + 'static,
    ) {
        self.ticks.defer(move || callback(result));
    }
}

fn not_found(archive: &Path, entry: &Path) -> FsError {
    FsError::fault(FaultKind::NotFound, archive, entry)
}

impl<B, H> HostFs for ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    fn stat(&self, path: &Path) -> Result<Stats, FsError> {
        ArchiveFs::stat(self, path)
    }

    fn lstat(&self, path: &Path) -> Result<Stats, FsError> {
        ArchiveFs::lstat(self, path)
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        ArchiveFs::read_file(self, path)
    }

    fn read_at(&self, file: &File, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        self.host.read_at(file, offset, len)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        ArchiveFs::read_dir(self, path)
    }

    fn realpath(&self, path: &Path) -> Result<PathBuf, FsError> {
        ArchiveFs::realpath(self, path)
    }

    fn access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        ArchiveFs::access(self, path, mode)
    }

    fn exists(&self, path: &Path) -> bool {
        ArchiveFs::exists(self, path)
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> Result<File, FsError> {
        ArchiveFs::open(self, path, flags)
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        ArchiveFs::create_dir(self, path)
    }
}

impl<B, H> HostProcess for ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + HostProcess + 'static,
{
    fn exec_file(&self, program: &Path, args: &[std::ffi::OsString]) -> Result<Output, FsError> {
        ArchiveFs::exec_file(self, program, args)
    }

    fn exec(&self, command: &str) -> Result<Output, FsError> {
        ArchiveFs::exec(self, command)
    }
}

impl<B: ArchiveBackend, H> std::fmt::Debug for ArchiveFs<B, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveFs")
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .field("pending", &self.ticks.len())
            .finish_non_exhaustive()
    }
}

impl<B, H> ArchiveFs<B, H>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    /// Split `path`, for callers that need to know where it would be served from.
    pub fn split(&self, path: &Path) -> SplitResult {
        self.resolver.split(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Archive, EntryStats, FileInfo, FileType};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use std::io::{self, Write};
    use std::process::ExitStatus;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Container bytes: a 4 byte header, `index.js`, then 4 invalid UTF-8 bytes.
    const CONTAINER: &[u8] = b"ASARhello world!\xff\xfe\xfd\xfc";

    #[derive(Clone)]
    pub(crate) struct MockArchive {
        entries: HashMap<PathBuf, EntryStats>,
        infos: HashMap<PathBuf, FileInfo>,
        children: HashMap<PathBuf, Vec<String>>,
        links: HashMap<PathBuf, PathBuf>,
        container: Option<Arc<File>>,
    }

    impl MockArchive {
        fn new(container: File) -> Self {
            let mut archive = Self {
                entries: HashMap::new(),
                infos: HashMap::new(),
                children: HashMap::new(),
                links: HashMap::new(),
                container: Some(Arc::new(container)),
            };
            archive.insert_dir("", &["index.js", "lib"]);
            archive.insert_dir("lib", &["empty.js"]);
            archive.insert_file(
                "index.js",
                FileInfo {
                    size: 12,
                    offset: 4,
                    unpacked: false,
                },
            );
            archive.insert_file(
                "lib/empty.js",
                FileInfo {
                    size: 0,
                    offset: 16,
                    unpacked: false,
                },
            );
            archive.entries.insert(
                PathBuf::from("link.js"),
                EntryStats::new(FileType::Symlink, 0),
            );
            archive
                .links
                .insert(PathBuf::from("link.js"), PathBuf::from("index.js"));
            archive
        }

        fn insert_dir(&mut self, entry: &str, children: &[&str]) {
            self.entries
                .insert(PathBuf::from(entry), EntryStats::new(FileType::Directory, 0));
            self.children.insert(
                PathBuf::from(entry),
                children.iter().map(|name| name.to_string()).collect(),
            );
        }

        pub(crate) fn insert_file(&mut self, entry: &str, info: FileInfo) {
            self.entries
                .insert(PathBuf::from(entry), EntryStats::new(FileType::File, info.size));
            self.infos.insert(PathBuf::from(entry), info);
        }

        pub(crate) fn detach_container(&mut self) {
            self.container = None;
        }
    }

    impl Archive for MockArchive {
        fn stat(&self, entry: &Path) -> Option<EntryStats> {
            self.entries.get(entry).cloned()
        }

        fn read_dir(&self, entry: &Path) -> Option<Vec<String>> {
            self.children.get(entry).cloned()
        }

        fn realpath(&self, entry: &Path) -> Option<PathBuf> {
            if let Some(target) = self.links.get(entry) {
                return Some(target.clone());
            }
            self.entries.contains_key(entry).then(|| entry.to_path_buf())
        }

        fn file_info(&self, entry: &Path) -> Option<FileInfo> {
            self.infos.get(entry).copied()
        }

        fn copy_file_out(&self, entry: &Path) -> Option<PathBuf> {
            self.infos
                .contains_key(entry)
                .then(|| Path::new("/unpacked").join(entry))
        }

        fn file(&self) -> Option<&File> {
            self.container.as_deref()
        }

        fn destroy(&self) {}
    }

    /// Opens `/app.asar` only.
    pub(crate) struct MockBackend {
        template: MockArchive,
    }

    impl ArchiveBackend for MockBackend {
        type Archive = MockArchive;

        fn open(&self, archive: &Path) -> Option<MockArchive> {
            (archive == Path::new("/app.asar")).then(|| self.template.clone())
        }
    }

    /// Host on which nothing exists except `/unpacked/*`, recording side effects.
    #[derive(Default)]
    pub(crate) struct StubHost {
        pub(crate) reads: AtomicUsize,
        pub(crate) opened: Mutex<Vec<PathBuf>>,
        pub(crate) spawned: Mutex<Vec<PathBuf>>,
        pub(crate) commands: Mutex<Vec<String>>,
        pub(crate) created: Mutex<Vec<PathBuf>>,
        /// Resolver consulted while `exec` runs; each call records how it
        /// classifies `/app.asar/index.js` at that moment.
        pub(crate) watch: Mutex<Option<PathResolver>>,
        pub(crate) seen_during_exec: Mutex<Vec<SplitResult>>,
        pub(crate) fail_exec: AtomicBool,
        pub(crate) panic_exec: AtomicBool,
    }

    fn missing(operation: &'static str, path: &Path) -> FsError {
        FsError::io(operation, path, io::ErrorKind::NotFound.into())
    }

    fn finished() -> Output {
        Output {
            status: ExitStatus::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    impl HostFs for StubHost {
        fn stat(&self, path: &Path) -> Result<Stats, FsError> {
            Err(missing("stat", path))
        }

        fn lstat(&self, path: &Path) -> Result<Stats, FsError> {
            Err(missing("lstat", path))
        }

        fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
            if path.starts_with("/unpacked") {
                Ok(b"unpacked".to_vec())
            } else {
                Err(missing("read", path))
            }
        }

        fn read_at(&self, file: &File, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            NativeHost.read_at(file, offset, len)
        }

        fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
            Err(missing("scandir", path))
        }

        fn realpath(&self, path: &Path) -> Result<PathBuf, FsError> {
            Ok(path.to_path_buf())
        }

        fn access(&self, path: &Path, _: AccessMode) -> Result<(), FsError> {
            Err(missing("access", path))
        }

        fn exists(&self, _: &Path) -> bool {
            false
        }

        fn open(&self, path: &Path, _: OpenFlags) -> Result<File, FsError> {
            self.opened.lock().push(path.to_path_buf());
            tempfile::tempfile().map_err(|e| FsError::io("open", path, e))
        }

        fn create_dir(&self, path: &Path) -> Result<(), FsError> {
            self.created.lock().push(path.to_path_buf());
            Ok(())
        }
    }

    impl HostProcess for StubHost {
        fn exec_file(&self, program: &Path, _: &[OsString]) -> Result<Output, FsError> {
            self.spawned.lock().push(program.to_path_buf());
            Ok(finished())
        }

        fn exec(&self, command: &str) -> Result<Output, FsError> {
            self.commands.lock().push(command.to_string());
            if let Some(resolver) = self.watch.lock().as_ref() {
                let split = resolver.split(Path::new("/app.asar/index.js"));
                self.seen_during_exec.lock().push(split);
            }
            if self.panic_exec.load(Ordering::SeqCst) {
                panic!("shell crashed");
            }
            if self.fail_exec.load(Ordering::SeqCst) {
                return Err(FsError::io(
                    "spawn",
                    Path::new("/bin/sh"),
                    io::ErrorKind::PermissionDenied.into(),
                ));
            }
            Ok(finished())
        }
    }

    pub(crate) fn fixture() -> ArchiveFs<MockBackend, StubHost> {
        fixture_with(Config::default(), |_| {})
    }

    pub(crate) fn fixture_with(
        config: Config,
        edit: impl FnOnce(&mut MockArchive),
    ) -> ArchiveFs<MockBackend, StubHost> {
        let mut container = tempfile::tempfile().unwrap();
        container.write_all(CONTAINER).unwrap();
        let mut template = MockArchive::new(container);
        edit(&mut template);
        ArchiveFs::new(MockBackend { template }, StubHost::default(), config)
    }

    #[test]
    fn archive_fs_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ArchiveFs<MockBackend, StubHost>>();
    }

    #[test]
    fn realpath_reroots_archive_targets() {
        let fs = fixture();
        assert_eq!(
            fs.realpath(Path::new("/app.asar/link.js")).unwrap(),
            Path::new("/app.asar/index.js")
        );
        assert_eq!(fs.realpath(Path::new("/app.asar")).unwrap(), Path::new("/app.asar"));
        assert!(fs.realpath(Path::new("/app.asar/nope")).is_err());
    }

    #[test]
    fn handles_are_opened_once_and_rebuilt_after_teardown() {
        let fs = fixture();
        fs.stat(Path::new("/app.asar/index.js")).unwrap();
        fs.read_file(Path::new("/app.asar/index.js")).unwrap();
        assert_eq!(fs.registry().len(), 1);
        fs.teardown();
        assert!(fs.registry().is_empty());
        fs.stat(Path::new("/app.asar/index.js")).unwrap();
        assert_eq!(fs.registry().len(), 1);
    }

    #[test]
    fn disabled_config_sends_archive_paths_to_host() {
        let fs = fixture_with(Config::default().with_disabled(true), |_| {});
        let err = fs.stat(Path::new("/app.asar/index.js")).unwrap_err();
        assert!(err.kind().is_none());
        assert_eq!(err.code(), Some("ENOENT"));
    }

    #[test]
    fn host_fs_impl_routes_through_overlay() {
        fn size_of<F: HostFs>(fs: &F, path: &Path) -> u64 {
            fs.stat(path).map(|s| s.size).unwrap_or(0)
        }
        let fs = fixture();
        assert_eq!(size_of(&fs, Path::new("/app.asar/index.js")), 12);
    }
}
