//! # Collaborator Traits
//!
//! The overlay sits between two collaborators it does not implement:
//!
//! ```text
//!                 ┌────────────────┐
//!   caller ─────▶ │   ArchiveFs    │
//!                 └───┬────────┬───┘
//!        archive path │        │ plain path / materialized entry
//!                     ▼        ▼
//!           ArchiveBackend    HostFs + HostProcess
//!           └─ Archive
//! ```
//!
//! | Trait | Role |
//! |-------|------|
//! | [`ArchiveBackend`] | Opens containers |
//! | [`Archive`] | Read-only queries against one container |
//! | [`HostFs`] | Real filesystem for plain paths |
//! | [`HostProcess`] | Subprocess launching |
//!
//! All traits require `Send + Sync` and take `&self`.

mod archive;
mod host;

pub use archive::{Archive, ArchiveBackend};
pub use host::{HostFs, HostProcess};
