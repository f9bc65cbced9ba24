//! # Path Resolver
//!
//! Classifies a path as archive-backed or plain and splits archive-backed
//! paths into the container path and the intra-archive entry path.
//!
//! ## Algorithm
//!
//! ```text
//! "/opt/app.asar"                    → Archive { "/opt/app.asar", "" }
//! "/opt/app.asar/lib/../index.js"    → normalize → "/opt/app.asar/index.js"
//!                                    → Archive { "/opt/app.asar", "index.js" }
//! "/opt/a.asar/vendor/b.asar/x.js"   → Archive { "/opt/a.asar/vendor/b.asar", "x.js" }
//! "/opt/app/index.js"                → NotArchive
//! ```
//!
//! The search runs from the end so nested containers resolve to the innermost
//! one.

use std::path::{MAIN_SEPARATOR, Path, PathBuf, is_separator};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{ARCHIVE_SUFFIX, Config};

/// Outcome of [`PathResolver::split`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitResult {
    /// The path does not point into an archive.
    NotArchive,
    /// The path points into (or names) an archive.
    Archive {
        /// Container path, ending in the archive suffix.
        archive: PathBuf,
        /// Entry path relative to the container root; empty for the root.
        entry: PathBuf,
    },
}

impl SplitResult {
    /// Returns `true` for [`SplitResult::Archive`].
    #[inline]
    pub fn is_archive(&self) -> bool {
        matches!(self, SplitResult::Archive { .. })
    }
}

/// Splits paths at archive boundaries.
///
/// Holds the static disable switch from [`Config`] and a count of live
/// suppression scopes used while a command line runs (see
/// [`suppress`](Self::suppress)). Clones share that count.
///
/// # Example
///
/// ```rust
/// use anyfs_asar::{Config, PathResolver, SplitResult};
/// use std::path::{Path, PathBuf};
///
/// let resolver = PathResolver::new(&Config::default());
/// let split = resolver.split(Path::new("app.asar/lib/index.js"));
/// assert_eq!(
///     split,
///     SplitResult::Archive {
///         archive: PathBuf::from("app.asar"),
///         entry: PathBuf::from(format!("lib{}index.js", std::path::MAIN_SEPARATOR)),
///     }
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PathResolver {
    disabled: bool,
    depth: Arc<AtomicUsize>,
}

impl PathResolver {
    /// Create a resolver honoring the disable switches in `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            disabled: config.archives_disabled(),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Whether paths are currently classified at all.
    pub fn is_active(&self) -> bool {
        !self.disabled && self.depth.load(Ordering::Acquire) == 0
    }

    /// Classify `path` and split it at the innermost archive boundary.
    pub fn split(&self, path: &Path) -> SplitResult {
        if !self.is_active() {
            return SplitResult::NotArchive;
        }

        // Non-UTF-8 paths cannot carry the reserved suffix reliably.
        let Some(raw) = path.to_str() else {
            return SplitResult::NotArchive;
        };

        if raw.ends_with(ARCHIVE_SUFFIX) {
            return SplitResult::Archive {
                archive: PathBuf::from(raw),
                entry: PathBuf::new(),
            };
        }

        let normalized = normalize(raw);
        let boundary = format!("{ARCHIVE_SUFFIX}{MAIN_SEPARATOR}");
        let Some(index) = normalized.rfind(&boundary) else {
            return SplitResult::NotArchive;
        };

        SplitResult::Archive {
            archive: PathBuf::from(&normalized[..index + ARCHIVE_SUFFIX.len()]),
            entry: PathBuf::from(&normalized[index + boundary.len()..]),
        }
    }

    /// Turn classification off until the returned guard is dropped.
    ///
    /// Guards are counted, so classification resumes only once every
    /// outstanding guard is gone, whichever thread or nesting level
    /// created it.
    pub fn suppress(&self) -> SuppressGuard<'_> {
        self.depth.fetch_add(1, Ordering::AcqRel);
        SuppressGuard { depth: &self.depth }
    }
}

/// Ends one suppression scope on drop. See [`PathResolver::suppress`].
#[must_use = "the suppression scope ends as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SuppressGuard<'a> {
    depth: &'a AtomicUsize,
}

impl Drop for SuppressGuard<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Lexical normalization: collapses separators, drops `.`, resolves `..`.
///
/// Leading `..` of a relative path is kept, `..` above the root is dropped,
/// and a trailing separator survives. Output uses [`MAIN_SEPARATOR`].
fn normalize(raw: &str) -> String {
    let absolute = raw.starts_with(is_separator);
    let trailing = raw.len() > 1 && raw.ends_with(is_separator);

    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            name => parts.push(name),
        }
    }

    let mut out = String::with_capacity(raw.len());
    if absolute {
        out.push(MAIN_SEPARATOR);
    }
    out.push_str(&parts.join(&MAIN_SEPARATOR.to_string()));
    if out.is_empty() {
        out.push('.');
    }
    if trailing && !parts.is_empty() {
        out.push(MAIN_SEPARATOR);
    }
    out
}
