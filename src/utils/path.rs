//! Item id and file name helpers

use crate::error::ConfigError;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

/// Extensions recognised as item documents, in precedence order
pub const DOCUMENT_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

/// Extension used when a new item file is created
pub const NEW_FILE_EXTENSION: &str = "yml";

static SAFE_ID: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]+$").ok());

/// Whether `id` can be used as a file stem inside the collection folder
#[must_use]
pub fn is_safe_id(id: &str) -> bool {
    if id.is_empty() || id.contains("..") || id.contains('/') || id.contains('\\') {
        return false;
    }
    SAFE_ID.as_ref().is_some_and(|regex| regex.is_match(id))
}

/// Reject ids that could escape the collection folder
pub fn validate_item_id(id: &str) -> Result<(), ConfigError> {
    if is_safe_id(id) {
        Ok(())
    } else {
        Err(ConfigError::configuration(format!(
            "Invalid item id '{id}': ids must match [a-zA-Z0-9._-]+ and cannot contain '..' or path separators"
        )))
    }
}

/// Normalize a path by resolving `.` and `..` components
#[must_use]
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // leading '..' is kept so escapes stay visible
                if components.is_empty() || components.last() == Some(&Component::ParentDir) {
                    components.push(component);
                } else {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

/// Validate that a relative resource path stays inside its root
pub fn validate_path_safety(path: &str) -> Result<(), ConfigError> {
    let path_obj = Path::new(path);

    if path_obj.is_absolute() {
        return Err(ConfigError::configuration(format!(
            "Absolute paths are not allowed: '{path}'"
        )));
    }

    let normalized = normalize_path(path_obj);
    if normalized.starts_with("..") {
        return Err(ConfigError::configuration(format!(
            "Path contains unsafe directory traversal: '{path}' -> '{}'",
            normalized.display()
        )));
    }

    Ok(())
}

/// Extract file extension in lowercase
#[must_use]
pub fn get_file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
}

/// Check if a path has a specific extension (case-insensitive)
#[must_use]
pub fn has_extension(path: &Path, extension: &str) -> bool {
    get_file_extension(path).is_some_and(|ext| ext == extension.to_lowercase())
}

/// Whether a file name looks like an item document
#[must_use]
pub fn is_document_file(path: &Path) -> bool {
    DOCUMENT_EXTENSIONS
        .iter()
        .any(|extension| has_extension(path, extension))
}

/// Item id of a document file: the file name without its final extension
#[must_use]
pub fn item_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .map(ToOwned::to_owned)
}

/// Document files among `paths` backing item `id`, in precedence order
///
/// Extensions match case-insensitively; files of equal rank are ordered by
/// file name.
#[must_use]
pub fn item_files<I: IntoIterator<Item = PathBuf>>(paths: I, id: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = paths
        .into_iter()
        .filter(|path| is_document_file(path) && item_id(path).as_deref() == Some(id))
        .collect();
    files.sort_by(|a, b| {
        extension_rank(a)
            .cmp(&extension_rank(b))
            .then_with(|| a.file_name().cmp(&b.file_name()))
    });
    files
}

/// Rank of a document extension; lower wins when two files share an id
#[must_use]
pub fn extension_rank(path: &Path) -> usize {
    DOCUMENT_EXTENSIONS
        .iter()
        .position(|extension| has_extension(path, extension))
        .unwrap_or(DOCUMENT_EXTENSIONS.len())
}
