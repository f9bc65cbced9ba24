//! [`HostFs`] and [`HostProcess`] over the real operating system.

use std::ffi::OsString;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::types::to_millis;
use crate::{AccessMode, FsError, HostFs, HostProcess, OpenFlags, Stats};

/// The real filesystem and process table, via `std` and `libc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeHost;

impl NativeHost {
    /// Create a native host.
    pub fn new() -> Self {
        Self
    }
}

impl HostFs for NativeHost {
    fn stat(&self, path: &Path) -> Result<Stats, FsError> {
        fs::metadata(path)
            .map(|meta| convert_metadata(&meta))
            .map_err(|e| FsError::io("stat", path, e))
    }

    fn lstat(&self, path: &Path) -> Result<Stats, FsError> {
        fs::symlink_metadata(path)
            .map(|meta| convert_metadata(&meta))
            .map_err(|e| FsError::io("lstat", path, e))
    }

    fn read_file(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        fs::read(path).map_err(|e| FsError::io("read", path, e))
    }

    fn read_at(&self, file: &File, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let mut buf = vec![0; len];
        read_exact_at(file, &mut buf, offset).map_err(|e| FsError::io("read", Path::new(""), e))?;
        Ok(buf)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<String>, FsError> {
        let entries = fs::read_dir(path).map_err(|e| FsError::io("scandir", path, e))?;
        entries
            .map(|entry| {
                entry
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .map_err(|e| FsError::io("scandir", path, e))
            })
            .collect()
    }

    fn realpath(&self, path: &Path) -> Result<PathBuf, FsError> {
        fs::canonicalize(path).map_err(|e| FsError::io("realpath", path, e))
    }

    fn access(&self, path: &Path, mode: AccessMode) -> Result<(), FsError> {
        check_access(path, mode).map_err(|e| FsError::io("access", path, e))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn open(&self, path: &Path, flags: OpenFlags) -> Result<File, FsError> {
        flags
            .to_open_options()
            .open(path)
            .map_err(|e| FsError::io("open", path, e))
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir(path).map_err(|e| FsError::io("mkdir", path, e))
    }
}

impl HostProcess for NativeHost {
    fn exec_file(&self, program: &Path, args: &[OsString]) -> Result<Output, FsError> {
        Command::new(program)
            .args(args)
            .output()
            .map_err(|e| FsError::io("spawn", program, e))
    }

    fn exec(&self, command: &str) -> Result<Output, FsError> {
        let (shell, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("/bin/sh", "-c")
        };
        Command::new(shell)
            .arg(flag)
            .arg(command)
            .output()
            .map_err(|e| FsError::io("spawn", Path::new(shell), e))
    }
}

#[cfg(unix)]
fn convert_metadata(meta: &fs::Metadata) -> Stats {
    use std::os::unix::fs::MetadataExt;

    let ms = |secs: i64, nsecs: i64| secs * 1000 + nsecs / 1_000_000;
    let ctime_ms = ms(meta.ctime(), meta.ctime_nsec());
    Stats {
        dev: meta.dev(),
        mode: meta.mode(),
        nlink: meta.nlink(),
        uid: meta.uid(),
        gid: meta.gid(),
        rdev: meta.rdev(),
        blksize: Some(meta.blksize()),
        ino: meta.ino(),
        size: meta.size(),
        blocks: Some(meta.blocks()),
        atime_ms: ms(meta.atime(), meta.atime_nsec()),
        mtime_ms: ms(meta.mtime(), meta.mtime_nsec()),
        ctime_ms,
        birthtime_ms: meta.created().map_or(ctime_ms, to_millis),
    }
}

#[cfg(not(unix))]
fn convert_metadata(meta: &fs::Metadata) -> Stats {
    use crate::FileType;

    let file_type = meta.file_type();
    let type_bits = if file_type.is_dir() {
        FileType::Directory.mode_bits()
    } else if file_type.is_symlink() {
        FileType::Symlink.mode_bits()
    } else {
        FileType::File.mode_bits()
    };
    let perm_bits = if meta.permissions().readonly() { 0o444 } else { 0o666 };
    let ms = |time: std::io::Result<std::time::SystemTime>| time.map_or(0, to_millis);
    Stats {
        dev: 0,
        mode: type_bits | perm_bits,
        nlink: 1,
        uid: 0,
        gid: 0,
        rdev: 0,
        blksize: None,
        ino: 0,
        size: meta.len(),
        blocks: None,
        atime_ms: ms(meta.accessed()),
        mtime_ms: ms(meta.modified()),
        ctime_ms: ms(meta.modified()),
        birthtime_ms: ms(meta.created()),
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset)? {
            0 => return Err(std::io::ErrorKind::UnexpectedEof.into()),
            n => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn check_access(path: &Path, mode: AccessMode) -> std::io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    let rc = unsafe { libc::access(c_path.as_ptr(), mode.bits() as libc::c_int) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn check_access(path: &Path, mode: AccessMode) -> std::io::Result<()> {
    let meta = fs::metadata(path)?;
    if mode.wants_write() && meta.permissions().readonly() {
        return Err(std::io::ErrorKind::PermissionDenied.into());
    }
    Ok(())
}
