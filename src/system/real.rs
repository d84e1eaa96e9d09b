//! Real system implementation using `std::fs`

use super::System;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Production implementation of System trait
///
/// Delegates directly to the standard library's filesystem functions.
#[derive(Debug, Clone, Copy)]
pub struct RealSystem;

impl RealSystem {
    /// Create a new `RealSystem` instance
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for RealSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for RealSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        fs::write(path, contents)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn read_dir_lists_direct_children() {
        let temp = TempDir::new().unwrap();
        let system = RealSystem::new();
        system.write(&temp.path().join("a.yml"), b"x: 1").unwrap();
        system.create_dir_all(&temp.path().join("nested/deeper")).unwrap();

        let mut entries = system.read_dir(temp.path()).unwrap();
        entries.sort();
        assert_eq!(entries.len(), 2);
        assert!(system.is_file(&entries[0]));
        assert!(system.is_dir(&entries[1]));
    }
}
