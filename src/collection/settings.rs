//! Declarative description of one folder collection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Special `order_by` value meaning "keep file name order"
pub const ORDER_BY_FILENAME: &str = "filename";

fn default_exclude_prefix() -> String {
    "_".to_owned()
}

/// Where a collection lives and how its items are keyed, ordered and filtered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSettings {
    /// Collection name, unique per item type
    pub name: String,

    /// Folder holding one document per item
    pub folder: PathBuf,

    /// Field that receives the item id; the schema's node-key field otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,

    /// Field to sort items by; `filename` or unset keeps file name order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,

    /// Boolean field deciding membership of the enabled view
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_field: Option<String>,

    /// Bundled resource directory seeded into an empty folder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Files starting with this prefix are ignored; empty disables
    #[serde(default = "default_exclude_prefix")]
    pub exclude_prefix: String,
}

impl CollectionSettings {
    #[must_use]
    pub fn new<N: Into<String>, P: Into<PathBuf>>(name: N, folder: P) -> Self {
        Self {
            name: name.into(),
            folder: folder.into(),
            id_field: None,
            order_by: None,
            enabled_field: None,
            resource: None,
            exclude_prefix: default_exclude_prefix(),
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, field: &str) -> Self {
        self.id_field = Some(field.to_owned());
        self
    }

    #[must_use]
    pub fn with_order_by(mut self, field: &str) -> Self {
        self.order_by = Some(field.to_owned());
        self
    }

    #[must_use]
    pub fn with_enabled_field(mut self, field: &str) -> Self {
        self.enabled_field = Some(field.to_owned());
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: &str) -> Self {
        self.resource = Some(resource.to_owned());
        self
    }

    #[must_use]
    pub fn with_exclude_prefix(mut self, prefix: &str) -> Self {
        prefix.clone_into(&mut self.exclude_prefix);
        self
    }

    /// Order-by field, unless file name order was requested
    #[must_use]
    pub fn sort_field(&self) -> Option<&str> {
        self.order_by
            .as_deref()
            .filter(|field| !field.is_empty() && *field != ORDER_BY_FILENAME)
    }

    /// Whether a file name is hidden by the exclude prefix
    #[must_use]
    pub fn is_excluded(&self, file_name: &str) -> bool {
        !self.exclude_prefix.is_empty() && file_name.starts_with(&self.exclude_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let settings: CollectionSettings = serde_yaml::from_str(
            "name: arenas\nfolder: data/arenas\norderBy: priority\nenabledField: enabled\n",
        )
        .unwrap();

        assert_eq!(settings.order_by.as_deref(), Some("priority"));
        assert_eq!(settings.enabled_field.as_deref(), Some("enabled"));
        assert_eq!(settings.exclude_prefix, "_");
        assert_eq!(settings.id_field, None);
    }

    #[test]
    fn filename_order_means_no_sort_field() {
        let settings = CollectionSettings::new("a", "a");
        assert_eq!(settings.sort_field(), None);
        assert_eq!(settings.clone().with_order_by("filename").sort_field(), None);
        assert_eq!(settings.with_order_by("priority").sort_field(), Some("priority"));
    }

    #[test]
    fn exclude_prefix() {
        let settings = CollectionSettings::new("a", "a");
        assert!(settings.is_excluded("_draft.yml"));
        assert!(!settings.is_excluded("live.yml"));

        let disabled = settings.with_exclude_prefix("");
        assert!(!disabled.is_excluded("_draft.yml"));
    }
}
