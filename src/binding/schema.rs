//! Explicit description of how a type binds to a document
//!
//! Instead of discovering fields at runtime, each bindable type lists its
//! fields once: name, accessors, codec and per-field options. The binder
//! caches the resulting [`Schema`] per type.
//!
//! ```
//! use foldconf::binding::{Bindable, Binder, Field, Schema};
//! use foldconf::node::ConfigNode;
//!
//! #[derive(Debug, Default)]
//! struct Arena {
//!     name: String,
//!     max_players: u32,
//! }
//!
//! impl Bindable for Arena {
//!     fn schema() -> Schema<Self> {
//!         Schema::new()
//!             .field(Field::new("name", |a: &Self| &a.name, |a: &mut Self| &mut a.name))
//!             .field(
//!                 Field::new("max_players", |a: &Self| &a.max_players, |a: &mut Self| &mut a.max_players)
//!                     .default_value("16"),
//!             )
//!     }
//! }
//!
//! let doc = serde_yaml::from_str("name: Dunes").unwrap();
//! let arena = Binder::default().bind::<Arena>(&ConfigNode::root(&doc)).get().unwrap();
//! assert_eq!(arena.max_players, 16);
//! ```

use super::binder::Binder;
use super::codec::{self, ValueCodec};
use super::result::BindingError;
use super::validation::{Constraint, ValidationError, Validator};
use crate::node::{ConfigNode, MutableConfigNode};
use std::collections::{BTreeMap, BTreeSet};

/// A type that can be bound from and unbound to documents
pub trait Bindable: Sized + Send + Sync + 'static {
    /// Field layout, construction and constraints of this type
    fn schema() -> Schema<Self>;
}

type BuildFn<T> = Box<dyn Fn(&ConstructorArgs<'_>) -> Result<T, BindingError> + Send + Sync>;

/// Field layout of one bindable type
pub struct Schema<T> {
    default_ctor: Option<fn() -> T>,
    constructor: Option<BuildFn<T>>,
    fields: Vec<Box<dyn FieldBinding<T>>>,
    constraints: Vec<Constraint>,
}

impl<T: 'static> Schema<T> {
    /// Schema for a type built with `Default` before its fields are bound
    #[must_use]
    pub fn new() -> Self
    where
        T: Default,
    {
        Self {
            default_ctor: Some(T::default),
            ..Self::without_constructor()
        }
    }

    /// Schema for a type built from named constructor parameters
    ///
    /// Used only when the binder has constructor binding enabled.
    #[must_use]
    pub fn constructed<B>(build: B) -> Self
    where
        B: Fn(&ConstructorArgs<'_>) -> Result<T, BindingError> + Send + Sync + 'static,
    {
        Self::without_constructor().constructor(build)
    }

    /// Schema for a type that can only be bound into an existing value
    #[must_use]
    pub fn without_constructor() -> Self {
        Self {
            default_ctor: None,
            constructor: None,
            fields: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Set (or replace) the parameter constructor
    #[must_use]
    pub fn constructor<B>(mut self, build: B) -> Self
    where
        B: Fn(&ConstructorArgs<'_>) -> Result<T, BindingError> + Send + Sync + 'static,
    {
        self.constructor = Some(Box::new(build));
        self
    }

    #[must_use]
    pub fn field<F: 'static>(mut self, field: Field<T, F>) -> Self {
        self.fields.push(Box::new(field));
        self
    }

    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Declared field names in declaration order
    #[must_use]
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|field| field.name()).collect()
    }

    pub(crate) const fn default_ctor(&self) -> Option<fn() -> T> {
        self.default_ctor
    }

    pub(crate) fn build_fn(&self) -> Option<&BuildFn<T>> {
        self.constructor.as_ref()
    }

    pub(crate) fn fields(&self) -> &[Box<dyn FieldBinding<T>>] {
        &self.fields
    }

    pub(crate) fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Field by Rust name or by explicit key
    pub(crate) fn find_field(&self, name: &str) -> Option<&dyn FieldBinding<T>> {
        self.fields
            .iter()
            .find(|field| field.name() == name || field.explicit_key() == Some(name))
            .map(|field| &**field)
    }

    /// First field marked as holding the item's node key
    pub(crate) fn node_key_field(&self) -> Option<&dyn FieldBinding<T>> {
        self.fields
            .iter()
            .find(|field| field.is_node_key())
            .map(|field| &**field)
    }
}

/// One field of a bindable type
pub struct Field<T, F> {
    name: String,
    key: Option<String>,
    default_value: Option<String>,
    node_key: bool,
    hidden: bool,
    get: fn(&T) -> &F,
    get_mut: fn(&mut T) -> &mut F,
    codec: Box<dyn ValueCodec<F>>,
}

impl<T, F: 'static> Field<T, F> {
    /// Field with an explicit codec
    #[must_use]
    pub fn with_codec<C>(name: &str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F, codec: C) -> Self
    where
        C: ValueCodec<F> + 'static,
    {
        Self {
            name: name.to_owned(),
            key: None,
            default_value: None,
            node_key: false,
            hidden: false,
            get,
            get_mut,
            codec: Box::new(codec),
        }
    }

    /// Field converted by the registry serializer for `F`
    #[must_use]
    pub fn new(name: &str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self::with_codec(name, get, get_mut, codec::registered::<F>())
    }

    /// Use `key` in documents instead of the naming strategy's output
    #[must_use]
    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_owned());
        self
    }

    /// YAML text used when the document has no value for this field
    #[must_use]
    pub fn default_value(mut self, text: &str) -> Self {
        self.default_value = Some(text.to_owned());
        self
    }

    /// Mark this field as receiving the item's id; it is never written out
    #[must_use]
    pub const fn node_key(mut self) -> Self {
        self.node_key = true;
        self
    }

    /// Bind this field but never write it out
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

impl<T, F: Bindable> Field<T, F> {
    /// Field holding a nested object with its own schema
    #[must_use]
    pub fn nested(name: &str, get: fn(&T) -> &F, get_mut: fn(&mut T) -> &mut F) -> Self {
        Self::with_codec(name, get, get_mut, codec::nested::<F>())
    }
}

impl<T, E: 'static> Field<T, Vec<E>> {
    /// List of registry-serialized values
    #[must_use]
    pub fn list(name: &str, get: fn(&T) -> &Vec<E>, get_mut: fn(&mut T) -> &mut Vec<E>) -> Self {
        Self::with_codec(name, get, get_mut, codec::list(codec::registered::<E>()))
    }
}

impl<T, E: Bindable> Field<T, Vec<E>> {
    /// List of nested objects
    #[must_use]
    pub fn list_nested(name: &str, get: fn(&T) -> &Vec<E>, get_mut: fn(&mut T) -> &mut Vec<E>) -> Self {
        Self::with_codec(name, get, get_mut, codec::list(codec::nested::<E>()))
    }
}

impl<T, E: Ord + 'static> Field<T, BTreeSet<E>> {
    /// Set of registry-serialized values
    #[must_use]
    pub fn set(
        name: &str,
        get: fn(&T) -> &BTreeSet<E>,
        get_mut: fn(&mut T) -> &mut BTreeSet<E>,
    ) -> Self {
        Self::with_codec(name, get, get_mut, codec::set(codec::registered::<E>()))
    }
}

impl<T, E: 'static> Field<T, BTreeMap<String, E>> {
    /// Map of registry-serialized values
    #[must_use]
    pub fn map(
        name: &str,
        get: fn(&T) -> &BTreeMap<String, E>,
        get_mut: fn(&mut T) -> &mut BTreeMap<String, E>,
    ) -> Self {
        Self::with_codec(name, get, get_mut, codec::map(codec::registered::<E>()))
    }
}

impl<T, E: Bindable> Field<T, BTreeMap<String, E>> {
    /// Map of nested objects
    #[must_use]
    pub fn map_nested(
        name: &str,
        get: fn(&T) -> &BTreeMap<String, E>,
        get_mut: fn(&mut T) -> &mut BTreeMap<String, E>,
    ) -> Self {
        Self::with_codec(name, get, get_mut, codec::map(codec::nested::<E>()))
    }
}

impl<T, E: 'static> Field<T, Option<E>> {
    /// Optional registry-serialized value
    #[must_use]
    pub fn optional(name: &str, get: fn(&T) -> &Option<E>, get_mut: fn(&mut T) -> &mut Option<E>) -> Self {
        Self::with_codec(name, get, get_mut, codec::optional(codec::registered::<E>()))
    }
}

impl<T, E: Bindable> Field<T, Option<E>> {
    /// Optional nested object
    #[must_use]
    pub fn optional_nested(
        name: &str,
        get: fn(&T) -> &Option<E>,
        get_mut: fn(&mut T) -> &mut Option<E>,
    ) -> Self {
        Self::with_codec(name, get, get_mut, codec::optional(codec::nested::<E>()))
    }
}

/// Type-erased view of a [`Field`] used by the binder
pub(crate) trait FieldBinding<T>: Send + Sync {
    fn name(&self) -> &str;
    fn explicit_key(&self) -> Option<&str>;
    fn default_value(&self) -> Option<&str>;
    fn is_node_key(&self) -> bool;
    fn is_hidden(&self) -> bool;
    fn decode_into(&self, target: &mut T, node: &ConfigNode<'_>, binder: &Binder) -> Result<(), Vec<BindingError>>;
    /// Reset to the codec's empty value; `false` when the type has none
    fn clear(&self, target: &mut T) -> bool;
    fn encode_from(
        &self,
        source: &T,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>>;
    fn is_absent(&self, source: &T) -> bool;
    fn validate_nested(
        &self,
        source: &T,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    );
}

impl<T, F: 'static> FieldBinding<T> for Field<T, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn explicit_key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    fn is_node_key(&self) -> bool {
        self.node_key
    }

    fn is_hidden(&self) -> bool {
        self.hidden
    }

    fn decode_into(&self, target: &mut T, node: &ConfigNode<'_>, binder: &Binder) -> Result<(), Vec<BindingError>> {
        let value = self.codec.decode(node, binder)?;
        *(self.get_mut)(target) = value;
        Ok(())
    }

    fn clear(&self, target: &mut T) -> bool {
        match self.codec.empty() {
            Some(empty) => {
                *(self.get_mut)(target) = empty;
                true
            }
            None => false,
        }
    }

    fn encode_from(
        &self,
        source: &T,
        node: MutableConfigNode<'_>,
        path: &str,
        binder: &Binder,
    ) -> Result<(), Vec<BindingError>> {
        self.codec.encode((self.get)(source), node, path, binder)
    }

    fn is_absent(&self, source: &T) -> bool {
        self.codec.is_absent((self.get)(source))
    }

    fn validate_nested(
        &self,
        source: &T,
        path: &str,
        validator: &Validator,
        binder: &Binder,
        out: &mut Vec<ValidationError>,
    ) {
        self.codec
            .validate((self.get)(source), path, validator, binder, out);
    }
}

/// Named parameters available to a schema constructor
///
/// Each parameter name goes through the binder's naming strategy to find
/// its key. A missing or unconvertible parameter is an error; constructors
/// are expected to propagate it with `?`.
pub struct ConstructorArgs<'a> {
    node: &'a ConfigNode<'a>,
    binder: &'a Binder,
}

impl<'a> ConstructorArgs<'a> {
    pub(crate) const fn new(node: &'a ConfigNode<'a>, binder: &'a Binder) -> Self {
        Self { node, binder }
    }

    /// Required parameter converted by the registry
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is missing or cannot be converted.
    pub fn get<P: 'static>(&self, param: &str) -> Result<P, BindingError> {
        self.get_with(param, &codec::registered::<P>())
    }

    /// Required parameter bound as a nested object
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is missing or fails to bind.
    pub fn get_nested<P: Bindable>(&self, param: &str) -> Result<P, BindingError> {
        self.get_with(param, &codec::nested::<P>())
    }

    /// Optional parameter; `None` when absent
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is present but cannot be converted.
    pub fn get_optional<P: 'static>(&self, param: &str) -> Result<Option<P>, BindingError> {
        let child = self.child(param);
        if child.is_missing() {
            return Ok(None);
        }
        codec::registered::<P>()
            .decode(&child, self.binder)
            .map(Some)
            .map_err(|errors| merge(param, errors))
    }

    /// Required parameter with an explicit codec
    ///
    /// # Errors
    ///
    /// Returns an error if the parameter is missing or cannot be converted.
    pub fn get_with<P, C: ValueCodec<P>>(&self, param: &str, codec: &C) -> Result<P, BindingError> {
        let child = self.child(param);
        if child.is_missing() {
            return Err(BindingError::new(
                child.path(),
                param,
                format!("missing value for constructor parameter '{param}'"),
            ));
        }
        codec
            .decode(&child, self.binder)
            .map_err(|errors| merge(param, errors))
    }

    fn child(&self, param: &str) -> ConfigNode<'a> {
        self.node.node(&self.binder.naming_strategy().apply(param))
    }
}

/// Collapse several problems into the single error a constructor reports
fn merge(param: &str, errors: Vec<BindingError>) -> BindingError {
    let count = errors.len();
    let mut iter = errors.into_iter();
    match (iter.next(), count) {
        (Some(first), 1) => first,
        (Some(first), _) => BindingError {
            message: format!("{} (and {} more problems)", first.message, count - 1),
            ..first
        },
        (None, _) => BindingError::new("", param, "constructor parameter failed to bind"),
    }
}
