//! Schemaless item type used by the CLI

use crate::binding::{Bindable, Binder, Schema, TypeSerializerRegistry};
use serde_yaml::Value;

/// A whole document kept as its raw tree
///
/// Binds through the registry's `Value` serializer, so order-by and
/// enabled lookups read top-level keys of the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document(pub Value);

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Document> for Value {
    fn from(document: Document) -> Self {
        document.0
    }
}

impl Bindable for Document {
    fn schema() -> Schema<Self> {
        Schema::new()
    }
}

/// Binder that understands [`Document`]
#[must_use]
pub fn document_binder() -> Binder {
    let mut registry = TypeSerializerRegistry::defaults();
    registry.register_alias::<Document, Value>();
    Binder::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ConfigNode;

    #[test]
    fn binds_whole_document() {
        let value: Value = serde_yaml::from_str("priority: 3\nenabled: false\n").unwrap();
        let binder = document_binder();
        let document = binder.bind::<Document>(&ConfigNode::root(&value)).get().unwrap();

        assert_eq!(document.0, value);
        assert_eq!(binder.read_property(&document, "priority"), Some(Value::from(3)));
        assert_eq!(binder.read_property(&document, "missing"), None);
    }
}
