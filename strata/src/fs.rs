//! Filesystem access used for reading and writing configuration files.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// The filesystem operations the engine needs.
#[cfg_attr(test, mockall::automock)]
pub trait Filesystem: Send + Sync {
    /// Returns `true` if `path` exists and is a file.
    fn exists(&self, path: &Path) -> bool;

    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Writes `bytes` to `path`.
    ///
    /// With `overwrite` the file is created or truncated; without it the
    /// call fails with [`io::ErrorKind::AlreadyExists`] when the file exists.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    fn write(&self, path: &Path, bytes: &[u8], overwrite: bool) -> io::Result<()>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, bytes: &[u8], overwrite: bool) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.write(true);
        if overwrite {
            options.create(true).truncate(true);
        } else {
            options.create_new(true);
        }
        let mut file = options.open(path)?;
        file.write_all(bytes)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_exists_only_for_files() {
        let temp_dir = TempDir::new().unwrap();
        assert!(!OsFilesystem.exists(temp_dir.path()));

        let file = temp_dir.path().join("config.yaml");
        assert!(!OsFilesystem.exists(&file));
        fs::write(&file, "a: 1\n").unwrap();
        assert!(OsFilesystem.exists(&file));
    }

    #[test]
    fn test_write_overwrite_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.yaml");
        fs::write(&file, "a much longer previous content\n").unwrap();

        OsFilesystem.write(&file, b"a: 1\n", true).unwrap();
        assert_eq!(OsFilesystem.read(&file).unwrap(), b"a: 1\n");
    }

    #[test]
    fn test_write_safe_refuses_existing() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("config.yaml");
        OsFilesystem.write(&file, b"a: 1\n", false).unwrap();

        let err = OsFilesystem.write(&file, b"a: 2\n", false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&file).unwrap(), b"a: 1\n");
    }
}
