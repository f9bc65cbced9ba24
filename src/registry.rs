//! # Archive Registry
//!
//! Cache of open archive handles, keyed by the container path exactly as the
//! resolver produced it (no canonicalization).
//!
//! ```text
//! get_or_create("app.asar")
//!   ├── hit  → same Arc<Archive>
//!   └── miss → backend.open()
//!              ├── Some → cache + return
//!              └── None → return None, nothing cached
//! ```
//!
//! The lookup and the open happen under one lock, so two requests for the
//! same container never create two handles.
//!
//! Work that outlives the call which looked a handle up (a queued callback,
//! a pending future) holds a [`Lease`] and checks [`Lease::is_live`] before
//! touching the handle, since teardown may have destroyed it in between.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{Archive, ArchiveBackend};

/// Owns at most one live handle per archive path.
pub struct ArchiveRegistry<B: ArchiveBackend> {
    backend: B,
    archives: Mutex<HashMap<PathBuf, Lease<B::Archive>>>,
}

/// A cached handle together with its liveness flag.
///
/// The flag is cleared by [`ArchiveRegistry::teardown_all`] before the
/// handle is destroyed.
pub(crate) struct Lease<A> {
    handle: Arc<A>,
    live: Arc<AtomicBool>,
}

impl<A> Lease<A> {
    pub(crate) fn handle(&self) -> &Arc<A> {
        &self.handle
    }

    /// `false` once the registry has torn this handle down.
    pub(crate) fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl<A> Clone for Lease<A> {
    fn clone(&self) -> Self {
        Self {
            handle: Arc::clone(&self.handle),
            live: Arc::clone(&self.live),
        }
    }
}

impl<B: ArchiveBackend> ArchiveRegistry<B> {
    /// Create an empty registry over `backend`.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            archives: Mutex::new(HashMap::new()),
        }
    }

    /// The backend handles are opened with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Return the cached handle for `archive`, opening it on first use.
    ///
    /// Returns `None` if the container cannot be opened; the failure is not
    /// cached so a later call retries.
    pub fn get_or_create(&self, archive: &Path) -> Option<Arc<B::Archive>> {
        self.lease(archive).map(|lease| lease.handle)
    }

    /// [`get_or_create`](Self::get_or_create), keeping the liveness flag.
    pub(crate) fn lease(&self, archive: &Path) -> Option<Lease<B::Archive>> {
        let mut archives = self.archives.lock();
        if let Some(lease) = archives.get(archive) {
            return Some(lease.clone());
        }

        let Some(handle) = self.backend.open(archive) else {
            tracing::warn!(archive = %archive.display(), "failed to open archive");
            return None;
        };
        tracing::debug!(archive = %archive.display(), "opened archive");

        let lease = Lease {
            handle: Arc::new(handle),
            live: Arc::new(AtomicBool::new(true)),
        };
        archives.insert(archive.to_path_buf(), lease.clone());
        Some(lease)
    }

    /// Destroy every cached handle and empty the cache.
    ///
    /// Safe to call repeatedly. Runs automatically when the registry drops.
    pub fn teardown_all(&self) {
        let drained: Vec<_> = self.archives.lock().drain().collect();
        for (path, lease) in drained {
            tracing::debug!(archive = %path.display(), "destroying archive");
            lease.live.store(false, Ordering::Release);
            lease.handle.destroy();
        }
    }

    /// Number of cached handles.
    pub fn len(&self) -> usize {
        self.archives.lock().len()
    }

    /// Returns `true` if no handle is cached.
    pub fn is_empty(&self) -> bool {
        self.archives.lock().is_empty()
    }
}

impl<B: ArchiveBackend> Drop for ArchiveRegistry<B> {
    fn drop(&mut self) {
        self.teardown_all();
    }
}

impl<B: ArchiveBackend> std::fmt::Debug for ArchiveRegistry<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRegistry")
            .field("archives", &self.archives.lock().keys().collect::<Vec<_>>())
            .finish()
    }
}
