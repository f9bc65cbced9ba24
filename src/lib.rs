//! # anyfs-asar
//!
//! Read-only **archive overlay** for a host filesystem.
//!
//! Paths that cross a `.asar` container are served from inside the archive;
//! every other path passes straight through to the host. Callers see one
//! filesystem with the host's stat shapes and error codes.
//!
//! ---
//!
//! ## Quick Start
//!
//! Implement [`ArchiveBackend`] for the container format, then wrap the host:
//!
//! ```rust,ignore
//! use anyfs_asar::{ArchiveFs, Config, ProcessRole};
//! use std::path::Path;
//!
//! let fs = ArchiveFs::native(MyAsarBackend::new(), Config::from_env(ProcessRole::Auxiliary));
//!
//! let main = fs.read_to_string(Path::new("/opt/app/resources/app.asar/index.js"))?;
//! for name in fs.read_dir(Path::new("/opt/app/resources/app.asar/lib"))? {
//!     println!("{name}");
//! }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ArchiveFs`] | The overlay: routes each operation to an archive or the host |
//! | [`PathResolver`] | Splits a path into container and entry |
//! | [`ArchiveRegistry`] | At most one open handle per container |
//! | [`StatsTranslator`] | Archive entry metadata → host-shaped [`Stats`] |
//! | [`FsError`] | Error type with conventional codes (`ENOENT`, ...) |
//! | [`AccessLog`] | Opt-in per-archive read log |
//!
//! ---
//!
//! ## Seams
//!
//! ```text
//!            ┌──────────────────────────┐
//! caller ──▶ │ ArchiveFs                │ ──▶ HostFs / HostProcess (NativeHost)
//!            │  PathResolver            │
//!            │  ArchiveRegistry ────────┼──▶ ArchiveBackend → Archive
//!            │  StatsTranslator         │
//!            └──────────────────────────┘
//! ```
//!
//! [`ArchiveFs`] implements [`HostFs`] itself, so code written against the
//! host trait works unchanged on the overlay, and [`ArchiveLayer`] plugs it
//! into a [`LayerExt`] chain.
//!
//! ---
//!
//! ## Calling Conventions
//!
//! Each operation has a synchronous form returning `Result`, a `*_callback`
//! form delivered through [`TickQueue`] and a `*_async` form returning a
//! [`Settle`] future. See the [`settle`] module.
//!
//! ---
//!
//! ## Error Handling
//!
//! ```rust
//! use anyfs_asar::{FaultKind, FsError};
//! use std::path::Path;
//!
//! let err = FsError::fault(FaultKind::NoAccess, Path::new("/app.asar"), Path::new("index.js"));
//! assert_eq!(err.code(), Some("EACCES"));
//! assert_eq!(err.errno(), Some(-13));
//! ```
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for [`Config`], [`Stats`], [`EntryStats`], etc., and `FsExtJson` |

// Private modules
mod access_log;
mod config;
mod error;
mod ext;
mod layer;
mod native;
mod overlay;
mod path_resolver;
mod registry;
pub mod settle;
mod stats;
mod traits;
mod types;

// Public re-exports - error types
pub use error::{FaultKind, FsError};

// Public re-exports - core types
pub use types::{
    ARCHIVE_SUFFIX, AccessMode, EntryStats, FileInfo, FileType, ModuleStat, OpenFlags,
    Permissions, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG, Stats,
};

// Public re-exports - seams
pub use traits::{Archive, ArchiveBackend, HostFs, HostProcess};

// Public re-exports - overlay
pub use access_log::AccessLog;
pub use config::{Config, LOG_READS_ENV, NO_ASAR_ENV, ProcessRole};
pub use native::NativeHost;
pub use overlay::ArchiveFs;
pub use path_resolver::{PathResolver, SplitResult, SuppressGuard};
pub use registry::ArchiveRegistry;
pub use settle::{Settle, TickQueue};
pub use stats::{ARCHIVE_DEV, StatsTranslator};

// Public re-exports - infrastructure
pub use ext::FsExt;
pub use layer::{ArchiveLayer, Layer, LayerExt};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
