//! Document tree access
//!
//! Parsed documents are plain `serde_yaml::Value` trees. [`ConfigNode`] is a
//! read cursor that remembers where it is in the tree (so errors can name a
//! path) and can point at keys that do not exist. [`MutableConfigNode`] is
//! the matching write cursor, which creates structure as it is navigated.

pub mod hash;
pub mod yaml;

use crate::binding::serializer::TypeSerializerRegistry;
use crate::error::SerializationError;
use serde_yaml::{Mapping, Value};

/// Read-only view of one position in a document
///
/// A node is *virtual* when nothing exists at its position.
#[derive(Debug, Clone)]
pub struct ConfigNode<'doc> {
    value: Option<&'doc Value>,
    path: String,
}

impl<'doc> ConfigNode<'doc> {
    /// Node for the root of a document
    #[must_use]
    pub const fn root(value: &'doc Value) -> Self {
        Self {
            value: Some(value),
            path: String::new(),
        }
    }

    /// Node for a position that holds nothing
    #[must_use]
    pub fn virtual_at<S: Into<String>>(path: S) -> Self {
        Self {
            value: None,
            path: path.into(),
        }
    }

    /// Node at an explicit path inside some larger document
    #[must_use]
    pub fn at<S: Into<String>>(value: &'doc Value, path: S) -> Self {
        Self {
            value: Some(value),
            path: path.into(),
        }
    }

    /// The underlying value, `None` when virtual
    #[must_use]
    pub const fn raw(&self) -> Option<&'doc Value> {
        self.value
    }

    /// Dotted path from the document root; empty for the root itself
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub const fn is_virtual(&self) -> bool {
        self.value.is_none()
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self.value, Some(Value::Null))
    }

    /// Virtual or explicitly null
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self.value, None | Some(Value::Null))
    }

    #[must_use]
    pub const fn is_map(&self) -> bool {
        matches!(self.value, Some(Value::Mapping(_)))
    }

    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self.value, Some(Value::Sequence(_)))
    }

    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        matches!(
            self.value,
            Some(Value::Bool(_) | Value::Number(_) | Value::String(_))
        )
    }

    /// Child at `key`; virtual when this node is not a map or has no such key
    #[must_use]
    pub fn node(&self, key: &str) -> Self {
        let path = child_path(&self.path, key);
        match self.value {
            Some(Value::Mapping(map)) => Self {
                value: map.get(key),
                path,
            },
            _ => Self::virtual_at(path),
        }
    }

    /// Descend through several keys at once
    #[must_use]
    pub fn node_path(&self, keys: &[&str]) -> Self {
        keys.iter().fold(self.clone(), |node, key| node.node(key))
    }

    /// List element at `index`; virtual when out of range or not a list
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let path = index_path(&self.path, index);
        match self.value {
            Some(Value::Sequence(items)) => Self {
                value: items.get(index),
                path,
            },
            _ => Self::virtual_at(path),
        }
    }

    /// Map entries in document order, keys rendered as text
    #[must_use]
    pub fn children_map(&self) -> Vec<(String, Self)> {
        let Some(Value::Mapping(map)) = self.value else {
            return Vec::new();
        };
        map.iter()
            .map(|(key, value)| {
                let key = key_text(key);
                let path = child_path(&self.path, &key);
                (key, Self::at(value, path))
            })
            .collect()
    }

    /// List elements in document order
    #[must_use]
    pub fn children_list(&self) -> Vec<Self> {
        let Some(Value::Sequence(items)) = self.value else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, value)| Self::at(value, index_path(&self.path, index)))
            .collect()
    }

    /// Decode this node with whatever serializer the registry holds for `T`
    ///
    /// # Errors
    ///
    /// Returns an error if no serializer is registered for `T` or the node
    /// cannot be converted.
    pub fn get<T: 'static>(&self, registry: &TypeSerializerRegistry) -> Result<T, SerializationError> {
        let serializer = registry.get_with_inheritance::<T>().ok_or_else(|| {
            SerializationError::new(format!(
                "no serializer registered for {}",
                core::any::type_name::<T>()
            ))
        })?;
        serializer.deserialize(self)
    }
}

/// Write cursor into a document
///
/// Navigating with [`MutableConfigNode::node`] or
/// [`MutableConfigNode::append_list_item`] replaces whatever non-matching
/// value was there with an empty map or list.
#[derive(Debug)]
pub struct MutableConfigNode<'doc> {
    value: &'doc mut Value,
}

impl<'doc> MutableConfigNode<'doc> {
    #[must_use]
    pub const fn new(value: &'doc mut Value) -> Self {
        Self { value }
    }

    /// Replace the value at this position
    pub fn set<V: Into<Value>>(&mut self, value: V) {
        *self.value = value.into();
    }

    /// Reset this position to null
    pub fn clear(&mut self) {
        *self.value = Value::Null;
    }

    /// Child at `key`, created as null if absent
    pub fn node(&mut self, key: &str) -> MutableConfigNode<'_> {
        let map = ensure_mapping(self.value);
        let child = map
            .entry(Value::String(key.to_owned()))
            .or_insert(Value::Null);
        MutableConfigNode::new(child)
    }

    /// Drop the child at `key`; no-op unless this is a map
    pub fn remove(&mut self, key: &str) {
        if let Value::Mapping(map) = self.value {
            map.remove(key);
        }
    }

    /// Push a null element onto this list and return a cursor to it
    pub fn append_list_item(&mut self) -> MutableConfigNode<'_> {
        let items = ensure_sequence(self.value);
        let index = items.len();
        items.push(Value::Null);
        MutableConfigNode::new(&mut items[index])
    }

    /// Current value at this position
    #[must_use]
    pub fn value(&self) -> &Value {
        self.value
    }

    /// Read view of this position
    #[must_use]
    pub fn as_node(&self) -> ConfigNode<'_> {
        ConfigNode::root(self.value)
    }
}

fn ensure_mapping(value: &mut Value) -> &mut Mapping {
    if !value.is_mapping() {
        *value = Value::Mapping(Mapping::new());
    }
    match value {
        Value::Mapping(map) => map,
        _ => unreachable!("value was just replaced with a mapping"),
    }
}

fn ensure_sequence(value: &mut Value) -> &mut Vec<Value> {
    if !value.is_sequence() {
        *value = Value::Sequence(Vec::new());
    }
    match value {
        Value::Sequence(items) => items,
        _ => unreachable!("value was just replaced with a sequence"),
    }
}

/// Join a parent path and a key with `.`
#[must_use]
pub fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_owned()
    } else {
        format!("{parent}.{key}")
    }
}

fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Text form of a map key
#[must_use]
pub fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_owned())
            .unwrap_or_default(),
    }
}

/// Short human name of a value's kind, for error messages
#[must_use]
pub const fn describe(value: &Value) -> &'static str {
    match *value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}
