//! Mock system implementation for testing

use super::System;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// In-memory implementation of System trait for testing
///
/// `MockSystem` provides an in-memory filesystem, perfect for fast,
/// isolated unit tests without side effects. Clones share state.
///
/// # Example
/// ```
/// use foldconf::system::{MockSystem, System as _};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_file("/kits/starter.yml", b"name: Starter")
///     .with_dir("/kits/archive");
///
/// assert!(system.is_file(Path::new("/kits/starter.yml")));
/// assert!(system.is_dir(Path::new("/kits")));
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MockSystem {
    /// Create a new `MockSystem` containing only the root directory
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                files: HashMap::new(),
                dirs: HashSet::from([PathBuf::from("/")]),
            })),
        }
    }

    /// Add a file with contents (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> Self {
        let path_buf = path.as_ref().to_path_buf();
        {
            let mut state = self.state.write();
            if let Some(parent) = path_buf.parent() {
                Self::ensure_parent_dirs(&mut state.dirs, parent);
            }
            state.files.insert(path_buf, contents.to_vec());
        }
        self
    }

    /// Add a directory (builder pattern)
    #[must_use]
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> Self {
        {
            let mut state = self.state.write();
            Self::ensure_parent_dirs(&mut state.dirs, path.as_ref());
        }
        self
    }

    /// Paths of every file currently stored, sorted
    #[must_use]
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.state.read().files.keys().cloned().collect();
        files.sort();
        files
    }

    #[inline]
    fn ensure_parent_dirs(dirs: &mut HashSet<PathBuf>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor == Path::new("") {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }

    fn not_found(what: &str, path: &Path) -> io::Error {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{what} not found: {}", path.display()),
        )
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let state = self.state.read();
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| Self::not_found("File", path))
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self.state.write();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    #[inline]
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write();
        if state.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("A file exists at: {}", path.display()),
            ));
        }
        Self::ensure_parent_dirs(&mut state.dirs, path);
        Ok(())
    }

    #[inline]
    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut state = self.state.write();
        state
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("File", path))
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        let state = self.state.read();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.state.read().files.contains_key(path)
    }

    #[inline]
    fn is_dir(&self, path: &Path) -> bool {
        self.state.read().dirs.contains(path)
    }

    #[inline]
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self.state.read();

        if !state.dirs.contains(path) {
            return Err(Self::not_found("Directory", path));
        }

        let files = state
            .files
            .keys()
            .filter(|file| file.parent() == Some(path));
        let dirs = state
            .dirs
            .iter()
            .filter(|dir| dir.parent() == Some(path) && dir.as_path() != path);

        Ok(files.chain(dirs).cloned().collect())
    }
}
