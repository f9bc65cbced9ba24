//! # Layer Trait
//!
//! Tower-style composition: a [`Layer`] wraps a [`HostFs`] and returns a new
//! filesystem.
//!
//! ```text
//! Host ──▶ Layer::layer() ──▶ Wrapped Host
//! ```
//!
//! [`ArchiveLayer`] is the layer this crate ships: it turns any host into an
//! [`ArchiveFs`] serving archive contents.
//!
//! ## Example
//!
//! ```rust,ignore
//! use anyfs_asar::{ArchiveLayer, Config, LayerExt, NativeHost};
//!
//! let fs = NativeHost.layer(ArchiveLayer::new(MyAsarBackend::new(), Config::default()));
//! ```

use crate::{ArchiveBackend, ArchiveFs, Config, HostFs};

/// A layer that wraps a host filesystem to add functionality.
///
/// `layer(self, host)` consumes both the layer and the host.
///
/// # Example
///
/// ```rust
/// use anyfs_asar::Layer;
///
/// struct Counting<H> {
///     inner: H,
/// }
///
/// struct CountingLayer;
///
/// impl<H> Layer<H> for CountingLayer {
///     type Backend = Counting<H>;
///
///     fn layer(self, host: H) -> Self::Backend {
///         Counting { inner: host }
///     }
/// }
/// ```
pub trait Layer<H> {
    /// The resulting filesystem type.
    type Backend;

    /// Wrap `host` with this layer.
    fn layer(self, host: H) -> Self::Backend;
}

/// Fluent `.layer()` on any [`HostFs`].
///
/// # Example
///
/// ```rust
/// use anyfs_asar::{HostFs, Layer, LayerExt};
///
/// fn compose<H: HostFs, L: Layer<H>>(host: H, layer: L) -> L::Backend {
///     host.layer(layer)
/// }
/// ```
pub trait LayerExt: HostFs + Sized {
    /// Apply a layer to this host.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

impl<H: HostFs> LayerExt for H {}

/// Layer that overlays archives from `backend` onto a host.
#[derive(Debug)]
pub struct ArchiveLayer<B> {
    backend: B,
    config: Config,
}

impl<B: ArchiveBackend> ArchiveLayer<B> {
    /// Create a layer serving archives through `backend`.
    pub fn new(backend: B, config: Config) -> Self {
        Self { backend, config }
    }
}

impl<B, H> Layer<H> for ArchiveLayer<B>
where
    B: ArchiveBackend,
    H: HostFs + 'static,
{
    type Backend = ArchiveFs<B, H>;

    fn layer(self, host: H) -> Self::Backend {
        ArchiveFs::new(self.backend, host, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NativeHost;
    use crate::overlay::tests::{MockArchive, StubHost};
    use std::path::Path;

    struct NoArchives;

    impl ArchiveBackend for NoArchives {
        type Archive = MockArchive;

        fn open(&self, _: &Path) -> Option<MockArchive> {
            None
        }
    }

    #[test]
    fn layer_ext_is_auto_implemented() {
        fn _check<H: HostFs + LayerExt>() {}
        _check::<NativeHost>();
    }

    #[test]
    fn archive_layer_wraps_host() {
        let fs = StubHost::default().layer(ArchiveLayer::new(NoArchives, Config::default()));
        let err = fs.stat(Path::new("/app.asar/a")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid package /app.asar");

        fn _takes_host<T: HostFs>(_: &T) {}
        _takes_host(&fs);
    }

    #[test]
    fn layers_stack() {
        let fs = NativeHost
            .layer(ArchiveLayer::new(NoArchives, Config::default()))
            .layer(ArchiveLayer::new(NoArchives, Config::default()));
        assert!(!fs.exists(Path::new("/definitely/not/here.asar/x")));
    }
}
