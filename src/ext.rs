//! # Extension Traits
//!
//! Convenience methods with blanket implementations, so any [`HostFs`]
//! (including an [`ArchiveFs`](crate::ArchiveFs)) gets them for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FsExt::is_file) | Path is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Path is a directory |
//! | [`is_symlink`](FsExt::is_symlink) | Path is a symbolic link |
//! | [`file_size`](FsExt::file_size) | Size in bytes |
//!
//! With the `serde` feature, [`FsExtJson::read_json`] deserializes a JSON
//! file, such as a `package.json` inside an archive.

use std::path::Path;

use crate::{FsError, HostFs};

/// Extension methods for any filesystem.
///
/// # Example
///
/// ```rust
/// use anyfs_asar::{FsError, FsExt, HostFs};
/// use std::path::Path;
///
/// fn has_manifest<F: HostFs>(fs: &F) -> Result<bool, FsError> {
///     fs.is_file(Path::new("/opt/app/resources/app.asar/package.json"))
/// }
/// ```
pub trait FsExt: HostFs {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        absent_is_false(self.stat(path).map(|s| s.is_file()))
    }

    /// Check if the path points to a directory.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        absent_is_false(self.stat(path).map(|s| s.is_dir()))
    }

    /// Check if the path is a symbolic link, without following it.
    ///
    /// Returns `Ok(false)` if the path doesn't exist.
    fn is_symlink(&self, path: &Path) -> Result<bool, FsError> {
        absent_is_false(self.lstat(path).map(|s| s.is_symlink()))
    }

    /// Size of a file in bytes.
    ///
    /// # Errors
    ///
    /// `NotFound` (or a host `ENOENT`) if the path doesn't exist.
    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(self.stat(path)?.size)
    }
}

impl<F: HostFs + ?Sized> FsExt for F {}

fn absent_is_false(result: Result<bool, FsError>) -> Result<bool, FsError> {
    match result {
        Err(e) if e.code() == Some("ENOENT") => Ok(false),
        other => other,
    }
}

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::de::DeserializeOwned;

    /// JSON extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsExtJson: HostFs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - Any error from [`HostFs::read_file`]
        /// - `FsError::Deserialization` if parsing fails
        fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FsError> {
            let data = self.read_file(path)?;
            serde_json::from_slice(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }
    }

    impl<F: HostFs + ?Sized> FsExtJson for F {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::tests::fixture;

    #[test]
    fn is_file_and_is_dir_inside_archive() {
        let fs = fixture();
        assert!(fs.is_file(Path::new("/app.asar/index.js")).unwrap());
        assert!(!fs.is_dir(Path::new("/app.asar/index.js")).unwrap());
        assert!(fs.is_dir(Path::new("/app.asar/lib")).unwrap());
    }

    #[test]
    fn missing_paths_are_false_not_errors() {
        let fs = fixture();
        assert!(!fs.is_file(Path::new("/app.asar/missing")).unwrap());
        assert!(!fs.is_dir(Path::new("/elsewhere")).unwrap());
        assert!(!fs.is_symlink(Path::new("/app.asar/missing")).unwrap());
    }

    #[test]
    fn invalid_archive_is_still_an_error() {
        let fs = fixture();
        assert!(fs.is_file(Path::new("/broken.asar/a")).is_err());
    }

    #[test]
    fn symlink_and_size() {
        let fs = fixture();
        assert!(fs.is_symlink(Path::new("/app.asar/link.js")).unwrap());
        assert_eq!(fs.file_size(Path::new("/app.asar/index.js")).unwrap(), 12);
        assert!(fs.file_size(Path::new("/app.asar/missing")).is_err());
    }

    #[test]
    fn fs_ext_available_on_dyn_host() {
        let fs = crate::NativeHost;
        let host: &dyn HostFs = &fs;
        assert!(!host.is_file(Path::new("/definitely/not/a/file")).unwrap());
    }
}
