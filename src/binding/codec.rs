//! Value codecs: how one field's type maps onto a document node
//!
//! A schema field pairs an accessor with a codec. Codecs compose, so
//! `list(nested::<Reward>())` reads a list of nested objects and
//! `optional(registered::<u16>())` reads an optional port.

use super::Bindable;
use super::binder::Binder;
use super::result::BindingError;
use super::validation::{ValidationError, Validator};
use crate::node::{ConfigNode, MutableConfigNode, child_path, describe};
use serde_yaml::{Mapping, Value};
use std::any::type_name;
use std::collections::{BTreeMap, BTreeSet};
use std::marker::PhantomData;

/// Converts one field value to and from a document node
pub trait ValueCodec<F>: Send + Sync {
    /// Decode a present (non-null) node
    ///
    /// # Errors
    ///
    /// Returns every problem found, each tied to its document path.
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<F, Vec<BindingError>>;

    /// Encode `value` into `node`; `path` names the node in error reports
    ///
    /// # Errors
    ///
    /// Returns every part of the value that could not be written.
    fn encode(
        &self,
        value: &F,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>>;

    /// Value a field takes when cleared, if the type has an empty form
    fn empty(&self) -> Option<F> {
        None
    }

    /// Whether the value should be left out of the document entirely
    fn is_absent(&self, _value: &F) -> bool {
        false
    }

    /// Run nested validation for values that carry their own schema
    fn validate(
        &self,
        _value: &F,
        _path: &str,
        _validator: &Validator,
        _binder: &Binder,
        _out: &mut Vec<ValidationError>,
    ) {
    }
}

fn short_type_name<F>() -> &'static str {
    let full = type_name::<F>();
    full.rsplit("::").next().unwrap_or(full)
}

fn found(node: &ConfigNode<'_>) -> &'static str {
    node.raw().map_or("nothing", describe)
}

/// Values handled by a serializer in the binder's registry
pub struct Registered<F> {
    marker: PhantomData<fn() -> F>,
}

/// Codec using the registry serializer for `F`
#[must_use]
pub const fn registered<F: 'static>() -> Registered<F> {
    Registered {
        marker: PhantomData,
    }
}

impl<F: 'static> ValueCodec<F> for Registered<F> {
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<F, Vec<BindingError>> {
        decode_registered::<F>(node, binder)
            .unwrap_or_else(|| Err(vec![missing_serializer::<F>(node.path())]))
    }

    fn encode(
        &self,
        value: &F,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        encode_registered(value, node, path, binder)
            .unwrap_or_else(|| Err(vec![missing_serializer::<F>(path)]))
    }
}

fn missing_serializer<F>(path: &str) -> BindingError {
    BindingError::new(
        path,
        short_type_name::<F>(),
        format!("no serializer registered for {}", type_name::<F>()),
    )
}

/// `None` when the registry has nothing for `F`
pub(crate) fn decode_registered<F: 'static>(
    node: &ConfigNode<'_>,
    binder: &Binder,
) -> Option<Result<F, Vec<BindingError>>> {
    let serializer = binder.registry().get_with_inheritance::<F>()?;
    Some(serializer.deserialize(node).map_err(|e| {
        vec![
            BindingError::new(
                node.path(),
                short_type_name::<F>(),
                format!("cannot convert to {}", short_type_name::<F>()),
            )
            .with_cause(e),
        ]
    }))
}

pub(crate) fn encode_registered<F: 'static>(
    value: &F,
    node: MutableConfigNode<'_>,
    path: &str,
    binder: &Binder,
) -> Option<Result<(), Vec<BindingError>>> {
    let serializer = binder.registry().get_with_inheritance::<F>()?;
    Some(serializer.serialize(value, node).map_err(|e| {
        vec![
            BindingError::new(
                path,
                short_type_name::<F>(),
                format!("cannot write {}", short_type_name::<F>()),
            )
            .with_cause(e),
        ]
    }))
}

/// Nested objects described by their own schema
///
/// A serializer registered for the type takes precedence over the schema.
pub struct Nested<F> {
    marker: PhantomData<fn() -> F>,
}

/// Codec binding `F` as a nested object graph
#[must_use]
pub const fn nested<F: Bindable>() -> Nested<F> {
    Nested {
        marker: PhantomData,
    }
}

impl<F: Bindable> ValueCodec<F> for Nested<F> {
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<F, Vec<BindingError>> {
        decode_registered::<F>(node, binder).unwrap_or_else(|| binder.bind_nested::<F>(node))
    }

    fn encode(
        &self,
        value: &F,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        match binder.registry().get_with_inheritance::<F>() {
            Some(_) => encode_registered(value, node, path, binder).unwrap_or(Ok(())),
            None => binder.unbind_at(value, node, path),
        }
    }

    fn validate(
        &self,
        value: &F,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        if binder.registry().get_with_inheritance::<F>().is_none() {
            validator.validate_at(value, path, binder, out);
        }
    }
}

fn decode_elements<E, C: ValueCodec<E>>(
    codec: &C,
    node: &ConfigNode<'_>,
    binder: &Binder,
) -> Result<Vec<E>, Vec<BindingError>> {
    if !node.is_list() {
        return Err(vec![BindingError::new(
            node.path(),
            "list",
            format!("expected list, found {}", found(node)),
        )]);
    }

    let mut items = Vec::new();
    let mut errors = Vec::new();
    for child in node.children_list() {
        match codec.decode(&child, binder) {
            Ok(item) => items.push(item),
            Err(mut problems) => errors.append(&mut problems),
        }
    }

    if errors.is_empty() {
        Ok(items)
    } else {
        Err(errors)
    }
}

fn encode_elements<'v, E: 'v, C: ValueCodec<E>>(
    codec: &C,
    items: impl Iterator<Item = &'v E>,
    mut node: MutableConfigNode<'_>,
    path: &str,
    binder: &Binder,
) -> Result<(), Vec<BindingError>> {
    node.set(Value::Sequence(Vec::new()));
    let mut errors = Vec::new();
    for (index, item) in items.enumerate() {
        let item_path = format!("{path}[{index}]");
        if let Err(mut problems) = codec.encode(item, node.append_list_item(), &item_path, binder) {
            errors.append(&mut problems);
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Lists, element order preserved
pub struct ListOf<C> {
    element: C,
}

#[must_use]
pub const fn list<C>(element: C) -> ListOf<C> {
    ListOf { element }
}

impl<E, C: ValueCodec<E>> ValueCodec<Vec<E>> for ListOf<C> {
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<Vec<E>, Vec<BindingError>> {
        decode_elements(&self.element, node, binder)
    }

    fn encode(
        &self,
        value: &Vec<E>,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        encode_elements(&self.element, value.iter(), node, path, binder)
    }

    fn empty(&self) -> Option<Vec<E>> {
        Some(Vec::new())
    }

    fn validate(
        &self,
        value: &Vec<E>,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        for (index, item) in value.iter().enumerate() {
            self.element
                .validate(item, &format!("{path}[{index}]"), validator, binder, out);
        }
    }
}

/// Sets, read from lists; document order is not kept
pub struct SetOf<C> {
    element: C,
}

#[must_use]
pub const fn set<C>(element: C) -> SetOf<C> {
    SetOf { element }
}

impl<E: Ord, C: ValueCodec<E>> ValueCodec<BTreeSet<E>> for SetOf<C> {
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<BTreeSet<E>, Vec<BindingError>> {
        decode_elements(&self.element, node, binder).map(|items| items.into_iter().collect())
    }

    fn encode(
        &self,
        value: &BTreeSet<E>,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        encode_elements(&self.element, value.iter(), node, path, binder)
    }

    fn empty(&self) -> Option<BTreeSet<E>> {
        Some(BTreeSet::new())
    }
}

/// String-keyed maps
pub struct MapOf<C> {
    value: C,
}

#[must_use]
pub const fn map<C>(value: C) -> MapOf<C> {
    MapOf { value }
}

impl<E, C: ValueCodec<E>> ValueCodec<BTreeMap<String, E>> for MapOf<C> {
    fn decode(
        &self,
        node: &ConfigNode<'_>,
        binder: &Binder,
    ) -> Result<BTreeMap<String, E>, Vec<BindingError>> {
        if !node.is_map() {
            return Err(vec![BindingError::new(
                node.path(),
                "map",
                format!("expected map, found {}", found(node)),
            )]);
        }

        let mut entries = BTreeMap::new();
        let mut errors = Vec::new();
        for (key, child) in node.children_map() {
            match self.value.decode(&child, binder) {
                Ok(item) => {
                    entries.insert(key, item);
                }
                Err(mut problems) => errors.append(&mut problems),
            }
        }

        if errors.is_empty() {
            Ok(entries)
        } else {
            Err(errors)
        }
    }

    fn encode(
        &self,
        value: &BTreeMap<String, E>,
        mut node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        node.set(Value::Mapping(Mapping::new()));
        let mut errors = Vec::new();
        for (key, item) in value {
            let item_path = child_path(path, key);
            if let Err(mut problems) = self.value.encode(item, node.node(key), &item_path, binder) {
                errors.append(&mut problems);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn empty(&self) -> Option<BTreeMap<String, E>> {
        Some(BTreeMap::new())
    }

    fn validate(
        &self,
        value: &BTreeMap<String, E>,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        for (key, item) in value {
            self.value
                .validate(item, &child_path(path, key), validator, binder, out);
        }
    }
}

/// Optional values; `None` is left out of written documents
pub struct OptionOf<C> {
    inner: C,
}

#[must_use]
pub const fn optional<C>(inner: C) -> OptionOf<C> {
    OptionOf { inner }
}

impl<E, C: ValueCodec<E>> ValueCodec<Option<E>> for OptionOf<C> {
    fn decode(&self, node: &ConfigNode<'_>, binder: &Binder) -> Result<Option<E>, Vec<BindingError>> {
        if node.is_missing() {
            return Ok(None);
        }
        self.inner.decode(node, binder).map(Some)
    }

    fn encode(
        &self,
        value: &Option<E>,
        mut node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        match value.as_ref() {
            Some(inner) => self.inner.encode(inner, node, path, binder),
            None => {
                node.clear();
                Ok(())
            }
        }
    }

    fn empty(&self) -> Option<Option<E>> {
        Some(None)
    }

    fn is_absent(&self, value: &Option<E>) -> bool {
        value.is_none()
    }

    fn validate(
        &self,
        value: &Option<E>,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        if let Some(inner) = value.as_ref() {
            self.inner.validate(inner, path, validator, binder, out);
        }
    }
}
