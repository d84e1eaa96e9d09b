//! YAML document loading and saving

use crate::error::ConfigError;
use crate::system::System;
use anyhow::{Context as _, Result};
use serde_yaml::Value;
use std::path::Path;

/// Load and parse a YAML document from file
///
/// An empty file parses as a null document.
pub fn load(system: &dyn System, path: &Path) -> Result<Value> {
    if !system.is_file(path) {
        return Err(ConfigError::filesystem(format!("Document not found: {}", path.display())).into());
    }

    let content = system.read_to_string(path).map_err(|e| {
        ConfigError::filesystem(format!("Failed to read document {}: {e}", path.display()))
    })?;

    parse(&content).with_context(|| format!("Failed to parse YAML document: {}", path.display()))
}

/// Parse YAML text into a document tree
pub fn parse(content: &str) -> Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::parse(e.to_string()).into())
}

/// Serialize a document tree and write it to file
pub fn save(system: &dyn System, value: &Value, path: &Path) -> Result<()> {
    let content = to_string(value)?;
    system
        .write(path, content.as_bytes())
        .with_context(|| format!("Failed to write document: {}", path.display()))
}

/// Render a document tree as YAML text
pub fn to_string(value: &Value) -> Result<String> {
    serde_yaml::to_string(value).context("Failed to serialize document as YAML")
}

/// Fresh empty document to write into
#[must_use]
pub const fn create_node() -> Value {
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    #[test]
    fn load_valid_document() {
        let system = MockSystem::new().with_file("/docs/a.yml", b"name: Alpha\nlevel: 3\n");
        let value = load(&system, Path::new("/docs/a.yml")).unwrap();
        assert_eq!(value["name"], Value::String("Alpha".to_owned()));
    }

    #[test]
    fn load_empty_document_is_null() {
        let system = MockSystem::new().with_file("/docs/empty.yml", b"  \n");
        assert_eq!(load(&system, Path::new("/docs/empty.yml")).unwrap(), Value::Null);
    }

    #[test]
    fn load_nonexistent_file() {
        let system = MockSystem::new();
        let err = load(&system, Path::new("/nope.yml")).unwrap_err();
        assert!(err.to_string().contains("Document not found"));
    }

    #[test]
    fn load_invalid_yaml() {
        let system = MockSystem::new().with_file("/docs/bad.yml", b"a: [1, 2\n");
        let err = load(&system, Path::new("/docs/bad.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML document"));
        let cause = err.downcast_ref::<ConfigError>().unwrap();
        assert_eq!(cause.exit_code(), 3);
    }

    #[test]
    fn save_then_load() {
        let system = MockSystem::new().with_dir("/docs");
        let value: Value = serde_yaml::from_str("a: 1\nb: [x, y]\n").unwrap();
        save(&system, &value, Path::new("/docs/out.yml")).unwrap();
        assert_eq!(load(&system, Path::new("/docs/out.yml")).unwrap(), value);
    }
}
