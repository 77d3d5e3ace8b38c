//! Filesystem capability.
//!
//! The pipeline never touches `std::fs` directly; it goes through
//! [`FileSystem`] so hosts (and tests) can substitute their own storage.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::FsError;

/// Storage used to read templates, bundles and assets and to write output.
pub trait FileSystem {
    fn read_text(&self, path: &Path) -> Result<String, FsError>;

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Write `bytes` to `path`, replacing any existing file.
    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), FsError>;

    /// Create `path` and all missing parents. Succeeds if it already exists.
    fn ensure_directory(&self, path: &Path) -> Result<(), FsError>;

    /// Remove a file if present. Missing files are not an error.
    fn remove_file(&self, _path: &Path) -> Result<(), FsError> {
        Ok(())
    }
}

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_text(&self, path: &Path) -> Result<String, FsError> {
        let bytes = self.read_binary(path)?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        std::fs::read(path).map_err(|e| FsError::from_io(path, e))
    }

    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), FsError> {
        std::fs::write(path, bytes).map_err(|e| FsError::from_io(path, e))
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), FsError> {
        std::fs::create_dir_all(path).map_err(|e| FsError::from_io(path, e))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }
}

/// An in-memory [`FileSystem`].
///
/// Files must be pre-populated with [`MemoryFileSystem::add`]. Directories are
/// tracked only so that [`FileSystem::ensure_directory`] can be observed and
/// made to fail for paths registered with [`MemoryFileSystem::deny_directory`].
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, Vec<u8>>>,
    directories: RwLock<HashSet<PathBuf>>,
    denied: RwLock<HashSet<PathBuf>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a file.
    pub fn add(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.write() {
            files.insert(path.into(), data.into());
        }
    }

    /// Make `ensure_directory` fail for `path`.
    pub fn deny_directory(&self, path: impl Into<PathBuf>) {
        if let Ok(mut denied) = self.denied.write() {
            denied.insert(path.into());
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files
            .read()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    pub fn has_directory(&self, path: &Path) -> bool {
        self.directories
            .read()
            .map(|dirs| dirs.contains(path))
            .unwrap_or(false)
    }

    /// Paths of every stored file, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default();
        paths.sort();
        paths
    }

    fn poisoned(path: &Path) -> FsError {
        FsError::Io {
            path: path.to_path_buf(),
            message: "lock poisoned".to_string(),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_text(&self, path: &Path) -> Result<String, FsError> {
        let bytes = self.read_binary(path)?;
        String::from_utf8(bytes).map_err(|_| FsError::InvalidUtf8(path.to_path_buf()))
    }

    fn read_binary(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        let files = self.files.read().map_err(|_| Self::poisoned(path))?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_path_buf()))
    }

    fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), FsError> {
        let mut files = self.files.write().map_err(|_| Self::poisoned(path))?;
        files.insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), FsError> {
        let denied = self.denied.read().map_err(|_| Self::poisoned(path))?;
        if denied.contains(path) {
            return Err(FsError::Io {
                path: path.to_path_buf(),
                message: "permission denied".to_string(),
            });
        }
        let mut dirs = self.directories.write().map_err(|_| Self::poisoned(path))?;
        dirs.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        let mut files = self.files.write().map_err(|_| Self::poisoned(path))?;
        files.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_roundtrip() {
        let fs = MemoryFileSystem::new();
        fs.add("/deck/card.html", "<div></div>");
        assert_eq!(
            fs.read_text(Path::new("/deck/card.html")).unwrap(),
            "<div></div>"
        );
        assert!(matches!(
            fs.read_text(Path::new("/deck/missing.html")),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn memory_denied_directory() {
        let fs = MemoryFileSystem::new();
        fs.deny_directory("/out");
        assert!(fs.ensure_directory(Path::new("/out")).is_err());
        assert!(fs.ensure_directory(Path::new("/other")).is_ok());
        assert!(fs.has_directory(Path::new("/other")));
    }
}
