//! Bidirectional mapping between documents and typed values

use super::codec;
use super::naming::NamingStrategy;
use super::result::{BindingError, BindingResult};
use super::schema::{Bindable, ConstructorArgs, FieldBinding, Schema};
use super::serializer::TypeSerializerRegistry;
use super::validation::{ValidationResult, Validator};
use crate::node::{ConfigNode, MutableConfigNode, child_path, describe, yaml};
use parking_lot::RwLock;
use serde_yaml::{Mapping, Value};
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

/// Binds documents onto [`Bindable`] types and writes them back
///
/// Bind problems are collected rather than stopping at the first one, so a
/// single pass reports everything wrong with a document.
pub struct Binder {
    registry: TypeSerializerRegistry,
    naming: NamingStrategy,
    implicit_defaults: bool,
    constructor_binding: bool,
    validator: Option<Validator>,
    schemas: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Default for Binder {
    /// Default serializers, snake_case keys, implicit defaults, constructor
    /// binding and validation all on
    fn default() -> Self {
        Self::new(TypeSerializerRegistry::defaults()).with_validator(Validator::new())
    }
}

impl Binder {
    /// Binder over `registry` without a validator
    #[must_use]
    pub fn new(registry: TypeSerializerRegistry) -> Self {
        Self {
            registry,
            naming: NamingStrategy::default(),
            implicit_defaults: true,
            constructor_binding: true,
            validator: None,
            schemas: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn with_naming_strategy(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// When on, fields missing from a document keep their constructed value;
    /// when off, they are cleared (or reported missing if they cannot be)
    #[must_use]
    pub const fn with_implicit_defaults(mut self, enabled: bool) -> Self {
        self.implicit_defaults = enabled;
        self
    }

    #[must_use]
    pub const fn with_constructor_binding(mut self, enabled: bool) -> Self {
        self.constructor_binding = enabled;
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    #[must_use]
    pub fn without_validator(mut self) -> Self {
        self.validator = None;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &TypeSerializerRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn naming_strategy(&self) -> NamingStrategy {
        self.naming
    }

    #[must_use]
    pub const fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    /// Construct a `T` and populate it from `node`
    ///
    /// A serializer registered for `T` takes precedence over its schema.
    pub fn bind<T: Bindable>(&self, node: &ConfigNode<'_>) -> BindingResult<T> {
        if let Some(decoded) = codec::decode_registered::<T>(node, self) {
            return match decoded {
                Ok(value) => {
                    let validation_errors = self.validate(&value).into_errors();
                    BindingResult::new(Some(value), Vec::new(), validation_errors)
                }
                Err(errors) => BindingResult::failure(errors),
            };
        }

        let schema = self.schema::<T>();
        let instance = match self.construct(&schema, node) {
            Ok(instance) => instance,
            Err(error) => return BindingResult::failure(vec![error]),
        };
        self.finish(&schema, instance, node)
    }

    /// Populate an existing value from `node` without constructing one
    pub fn bind_existing<T: Bindable>(&self, node: &ConfigNode<'_>, instance: T) -> BindingResult<T> {
        let schema = self.schema::<T>();
        self.finish(&schema, instance, node)
    }

    /// Write every visible field of `value` into `node`
    ///
    /// Fields that fail to serialize are left out of the output and
    /// reported; everything else is still written.
    #[must_use]
    pub fn unbind<T: Bindable>(&self, value: &T, node: MutableConfigNode<'_>) -> Vec<BindingError> {
        let outcome = if self.registry.get_with_inheritance::<T>().is_some() {
            codec::encode_registered(value, node, "", self).unwrap_or(Ok(()))
        } else {
            self.unbind_at(value, node, "")
        };
        outcome.err().unwrap_or_default()
    }

    /// Unbind into a fresh document
    ///
    /// # Errors
    ///
    /// Returns the fields that could not be written.
    pub fn to_document<T: Bindable>(&self, value: &T) -> Result<Value, Vec<BindingError>> {
        let mut document = yaml::create_node();
        let errors = self.unbind(value, MutableConfigNode::new(&mut document));
        if errors.is_empty() {
            Ok(document)
        } else {
            Err(errors)
        }
    }

    /// Independent copy made by unbinding then rebinding
    ///
    /// `None` when either direction fails. Validation problems do not
    /// prevent a copy. Node-key fields are not carried over.
    #[must_use]
    pub fn copy<T: Bindable>(&self, value: &T) -> Option<T> {
        let document = self.to_document(value).ok()?;
        let result = self.bind::<T>(&ConfigNode::root(&document));
        if result.is_success() {
            result.into_value()
        } else {
            None
        }
    }

    /// A field's current value in document form
    ///
    /// `name` is a Rust field name or explicit key. When the schema has no
    /// such field the whole value is unbound and `name` looked up as a key,
    /// which lets schemaless documents be ordered and filtered too.
    #[must_use]
    pub fn read_property<T: Bindable>(&self, value: &T, name: &str) -> Option<Value> {
        let schema = self.schema::<T>();
        if let Some(field) = schema.find_field(name) {
            let mut scratch = Value::Null;
            field
                .encode_from(value, MutableConfigNode::new(&mut scratch), name, self)
                .ok()?;
            return Some(scratch);
        }

        let mut document = Value::Null;
        let _partial = self.unbind(value, MutableConfigNode::new(&mut document));
        let root = ConfigNode::root(&document);
        let direct = root.node(name);
        let found = if direct.is_virtual() {
            root.node(&self.naming.apply(name))
        } else {
            direct
        };
        found.raw().cloned()
    }

    /// Set the item key on `value`
    ///
    /// Uses the field called `field_name` when given, else the first field
    /// marked as node key. Returns `false` when there is no such field or
    /// the key cannot be converted to the field's type.
    pub fn inject_key<T: Bindable>(&self, value: &mut T, field_name: Option<&str>, key: &str) -> bool {
        let schema = self.schema::<T>();
        let field = match field_name {
            Some(name) => schema.find_field(name),
            None => schema.node_key_field(),
        };
        let Some(field) = field else {
            return false;
        };
        let key_value = Value::String(key.to_owned());
        let node = ConfigNode::at(&key_value, self.key_for(field));
        field.decode_into(value, &node, self).is_ok()
    }

    /// Validate with the configured validator; empty when none is set
    #[must_use]
    pub fn validate<T: Bindable>(&self, value: &T) -> ValidationResult {
        self.validator
            .as_ref()
            .map_or_else(ValidationResult::default, |validator| validator.validate(value, self))
    }

    /// Document key of a field
    pub(crate) fn key_for<T>(&self, field: &dyn FieldBinding<T>) -> String {
        field
            .explicit_key()
            .map_or_else(|| self.naming.apply(field.name()), ToOwned::to_owned)
    }

    /// Cached schema for `T`, built on first use
    pub(crate) fn schema<T: Bindable>(&self) -> Arc<Schema<T>> {
        let type_id = TypeId::of::<T>();
        if let Some(schema) = self.cached_schema::<T>(type_id) {
            return schema;
        }

        // built outside the lock: schema() may be arbitrary user code
        let built: Arc<Schema<T>> = Arc::new(T::schema());
        let mut schemas = self.schemas.write();
        let entry = schemas
            .entry(type_id)
            .or_insert_with(|| built.clone() as Arc<dyn Any + Send + Sync>)
            .clone();
        drop(schemas);
        entry.downcast::<Schema<T>>().unwrap_or(built)
    }

    fn cached_schema<T: Bindable>(&self, type_id: TypeId) -> Option<Arc<Schema<T>>> {
        let cached = self.schemas.read().get(&type_id).cloned()?;
        cached.downcast::<Schema<T>>().ok()
    }

    /// Bind a nested object; validation is left to the outermost bind
    pub(crate) fn bind_nested<T: Bindable>(&self, node: &ConfigNode<'_>) -> Result<T, Vec<BindingError>> {
        let schema = self.schema::<T>();
        let mut instance = self.construct(&schema, node).map_err(|error| vec![error])?;
        let errors = self.bind_fields(&schema, &mut instance, node);
        if errors.is_empty() {
            Ok(instance)
        } else {
            Err(errors)
        }
    }

    pub(crate) fn unbind_at<T: Bindable>(
        &self,
        value: &T,
        mut node: MutableConfigNode<'_>,
        path: &str,
    ) -> Result<(), Vec<BindingError>> {
        let schema = self.schema::<T>();
        if !node.value().is_mapping() {
            node.set(Value::Mapping(Mapping::new()));
        }

        let mut errors = Vec::new();
        for field in schema.fields() {
            if field.is_hidden() || field.is_node_key() || field.is_absent(value) {
                continue;
            }
            let key = self.key_for(&**field);
            let field_path = child_path(path, &key);
            if let Err(mut problems) = field.encode_from(value, node.node(&key), &field_path, self) {
                node.remove(&key);
                errors.append(&mut problems);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn construct<T: Bindable>(&self, schema: &Schema<T>, node: &ConfigNode<'_>) -> Result<T, BindingError> {
        if let Some(default_ctor) = schema.default_ctor() {
            return Ok(default_ctor());
        }
        if self.constructor_binding
            && let Some(build) = schema.build_fn()
        {
            return build(&ConstructorArgs::new(node, self));
        }
        Err(BindingError::new(
            node.path(),
            type_name::<T>(),
            "no suitable constructor found",
        ))
    }

    fn finish<T: Bindable>(&self, schema: &Schema<T>, mut instance: T, node: &ConfigNode<'_>) -> BindingResult<T> {
        let binding_errors = self.bind_fields(schema, &mut instance, node);
        let validation_errors = if binding_errors.is_empty() {
            self.validate(&instance).into_errors()
        } else {
            Vec::new()
        };
        BindingResult::new(Some(instance), binding_errors, validation_errors)
    }

    fn bind_fields<T: Bindable>(&self, schema: &Schema<T>, instance: &mut T, node: &ConfigNode<'_>) -> Vec<BindingError> {
        if !node.is_missing() && !node.is_map() {
            let found = node.raw().map_or("nothing", describe);
            return vec![BindingError::new(
                node.path(),
                type_name::<T>(),
                format!("expected map, found {found}"),
            )];
        }

        let mut errors = Vec::new();
        for field in schema.fields() {
            let field = &**field;
            let child = node.node(&self.key_for(field));
            let outcome = if child.is_missing() {
                self.bind_missing(field, instance, &child)
            } else {
                field.decode_into(instance, &child, self)
            };
            if let Err(mut problems) = outcome {
                errors.append(&mut problems);
            }
        }
        errors
    }

    fn bind_missing<T>(
        &self,
        field: &dyn FieldBinding<T>,
        instance: &mut T,
        child: &ConfigNode<'_>,
    ) -> Result<(), Vec<BindingError>> {
        if let Some(text) = field.default_value() {
            let default = yaml::parse(text).map_err(|e| {
                vec![BindingError::new(child.path(), field.name(), "invalid default value").with_cause(e)]
            })?;
            return field.decode_into(instance, &ConfigNode::at(&default, child.path()), self);
        }

        if self.implicit_defaults || field.is_node_key() || field.clear(instance) {
            return Ok(());
        }

        Err(vec![BindingError::new(
            child.path(),
            field.name(),
            "missing value",
        )])
    }
}
