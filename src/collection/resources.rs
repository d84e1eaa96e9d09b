//! Bundled default files used to seed an empty collection folder
//!
//! A resource directory contains an `index.txt` naming, one per line, the
//! files to copy. Blank lines and lines starting with `#` are ignored.

use crate::system::System;
use crate::utils::path::validate_path_safety;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Name of the file listing a resource directory's defaults
pub const INDEX_FILE: &str = "index.txt";

/// Read-only source of bundled files addressed by `/`-separated paths
pub trait ResourceProvider: Send + Sync {
    /// Contents of the resource, `None` when it does not exist
    fn resource(&self, path: &str) -> Option<Vec<u8>>;
}

/// File names listed by `<resource>/index.txt`
#[must_use]
pub fn index_entries(provider: &dyn ResourceProvider, resource: &str) -> Option<Vec<String>> {
    let index = provider.resource(&resource_path(resource, INDEX_FILE))?;
    let text = String::from_utf8_lossy(&index);
    Some(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(ToOwned::to_owned)
            .collect(),
    )
}

/// Join a resource directory and an entry name
#[must_use]
pub fn resource_path(resource: &str, name: &str) -> String {
    let base = resource.trim_end_matches('/');
    if base.is_empty() {
        name.to_owned()
    } else {
        format!("{base}/{name}")
    }
}

/// Resources read from a directory through a [`System`]
pub struct DirectoryResources {
    system: Arc<dyn System>,
    root: PathBuf,
}

impl DirectoryResources {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(system: Arc<dyn System>, root: P) -> Self {
        Self {
            system,
            root: root.into(),
        }
    }
}

impl ResourceProvider for DirectoryResources {
    fn resource(&self, path: &str) -> Option<Vec<u8>> {
        validate_path_safety(path).ok()?;
        self.system.read(&self.root.join(path)).ok()
    }
}

/// Resources held in memory, e.g. from `include_bytes!`
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResources {
    files: HashMap<String, Vec<u8>>,
}

impl EmbeddedResources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: &str, contents: &[u8]) -> Self {
        self.files.insert(path.to_owned(), contents.to_vec());
        self
    }
}

impl ResourceProvider for EmbeddedResources {
    fn resource(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn index_skips_blank_and_comment_lines() {
        let resources = EmbeddedResources::new()
            .with_file("defaults/index.txt", b"# bundled kits\nstarter.yml\n\n  pvp.yml  \n");

        let entries = index_entries(&resources, "defaults/").unwrap();
        assert_eq!(entries, vec!["starter.yml", "pvp.yml"]);
        assert!(index_entries(&resources, "missing").is_none());
    }

    #[test]
    fn directory_resources_stay_inside_root() {
        let system = MockSystem::new()
            .with_file("/bundle/defaults/a.yml", b"a: 1")
            .with_file("/secret.yml", b"s: 1");
        let resources = DirectoryResources::new(Arc::new(system), "/bundle");

        assert_eq!(resources.resource("defaults/a.yml"), Some(b"a: 1".to_vec()));
        assert_eq!(resources.resource("../secret.yml"), None);
        assert_eq!(resources.resource("defaults/none.yml"), None);
    }
}
