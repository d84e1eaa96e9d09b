//! Pluggable scalar and object codecs keyed by target type
//!
//! A [`TypeSerializerRegistry`] maps a Rust type to the [`TypeSerializer`]
//! that converts it to and from a document node. Rust has no class
//! hierarchy to search, so "closest supertype" lookup is expressed through
//! representation aliases: a wrapper type declares the type it converts
//! to and from, and inherits that type's serializer.

use crate::error::SerializationError;
use crate::node::{ConfigNode, MutableConfigNode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Alias chains longer than this are treated as cycles
const MAX_ALIAS_DEPTH: usize = 16;

/// Converts one type to and from document nodes
pub trait TypeSerializer<T>: Send + Sync {
    /// Build a value from `node`
    ///
    /// # Errors
    ///
    /// Returns an error if the node holds data of the wrong shape.
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<T, SerializationError>;

    /// Write `value` into `node`
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented.
    fn serialize(&self, value: &T, node: MutableConfigNode<'_>) -> Result<(), SerializationError>;
}

type AliasResolver<T> =
    Arc<dyn Fn(&TypeSerializerRegistry, usize) -> Option<Arc<dyn TypeSerializer<T>>> + Send + Sync>;

/// Registry of serializers
///
/// Cloning (or [`TypeSerializerRegistry::copy`]) gives an independent
/// registry; serializers themselves are shared.
#[derive(Clone, Default)]
pub struct TypeSerializerRegistry {
    serializers: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
    aliases: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TypeSerializerRegistry {
    /// Empty registry
    #[must_use]
    pub fn create() -> Self {
        Self::default()
    }

    /// Registry preloaded with serializers for primitives, `String`,
    /// `PathBuf`, `Duration` and raw `serde_yaml::Value`
    #[must_use]
    pub fn defaults() -> Self {
        let mut registry = Self::create();
        registry.register::<bool, _>(BoolSerializer);
        registry.register::<i8, _>(IntSerializer::<i8>::new());
        registry.register::<i16, _>(IntSerializer::<i16>::new());
        registry.register::<i32, _>(IntSerializer::<i32>::new());
        registry.register::<i64, _>(IntSerializer::<i64>::new());
        registry.register::<isize, _>(IntSerializer::<isize>::new());
        registry.register::<u8, _>(IntSerializer::<u8>::new());
        registry.register::<u16, _>(IntSerializer::<u16>::new());
        registry.register::<u32, _>(IntSerializer::<u32>::new());
        registry.register::<u64, _>(IntSerializer::<u64>::new());
        registry.register::<usize, _>(IntSerializer::<usize>::new());
        registry.register::<f32, _>(FloatSerializer);
        registry.register::<f64, _>(FloatSerializer);
        registry.register::<char, _>(CharSerializer);
        registry.register::<String, _>(StringSerializer);
        registry.register::<PathBuf, _>(PathSerializer);
        registry.register::<Duration, _>(DurationSerializer);
        registry.register::<Value, _>(ValueSerializer);
        registry
    }

    /// Independent copy of this registry
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Register (or replace) the serializer for `T`
    pub fn register<T, S>(&mut self, serializer: S) -> &mut Self
    where
        T: 'static,
        S: TypeSerializer<T> + 'static,
    {
        let shared: Arc<dyn TypeSerializer<T>> = Arc::new(serializer);
        self.serializers.insert(TypeId::of::<T>(), Arc::new(shared));
        self
    }

    /// Let `T` use the serializer of its representation type `Repr`
    ///
    /// Used for newtypes and wrappers. Lookups through
    /// [`TypeSerializerRegistry::get_with_inheritance`] follow alias
    /// chains until a registered serializer is found.
    pub fn register_alias<T, Repr>(&mut self) -> &mut Self
    where
        T: From<Repr> + Clone + 'static,
        Repr: From<T> + 'static,
    {
        let resolver: AliasResolver<T> = Arc::new(|registry: &Self, depth: usize| {
            let inner = registry.resolve::<Repr>(depth + 1)?;
            let adapted: Arc<dyn TypeSerializer<T>> = Arc::new(AliasSerializer::<T, Repr> {
                inner,
                marker: PhantomData,
            });
            Some(adapted)
        });
        self.aliases.insert(TypeId::of::<T>(), Arc::new(resolver));
        self
    }

    /// Exact serializer for `T`
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Arc<dyn TypeSerializer<T>>> {
        self.serializers
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.downcast_ref::<Arc<dyn TypeSerializer<T>>>())
            .cloned()
    }

    /// Exact serializer for `T`, else the closest one reachable through
    /// representation aliases
    #[must_use]
    pub fn get_with_inheritance<T: 'static>(&self) -> Option<Arc<dyn TypeSerializer<T>>> {
        self.resolve::<T>(0)
    }

    /// Whether anything (exact or aliased) can serialize `T`
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.serializers.contains_key(&TypeId::of::<T>())
            || self.aliases.contains_key(&TypeId::of::<T>())
    }

    fn resolve<T: 'static>(&self, depth: usize) -> Option<Arc<dyn TypeSerializer<T>>> {
        if let Some(exact) = self.get::<T>() {
            return Some(exact);
        }
        if depth >= MAX_ALIAS_DEPTH {
            return None;
        }
        let resolver = self
            .aliases
            .get(&TypeId::of::<T>())?
            .downcast_ref::<AliasResolver<T>>()?;
        resolver(self, depth)
    }
}

struct AliasSerializer<T, Repr> {
    inner: Arc<dyn TypeSerializer<Repr>>,
    marker: PhantomData<fn() -> T>,
}

impl<T, Repr> TypeSerializer<T> for AliasSerializer<T, Repr>
where
    T: From<Repr> + Clone,
    Repr: From<T>,
{
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<T, SerializationError> {
        self.inner.deserialize(node).map(T::from)
    }

    fn serialize(&self, value: &T, node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        self.inner.serialize(&Repr::from(value.clone()), node)
    }
}

fn present<'a>(node: &ConfigNode<'a>, expected: &str) -> Result<&'a Value, SerializationError> {
    node.raw()
        .filter(|value| !value.is_null())
        .ok_or_else(|| SerializationError::type_mismatch(expected, &Value::Null))
}

/// `true`/`false`, also accepted as strings
#[derive(Debug, Clone, Copy)]
pub struct BoolSerializer;

impl TypeSerializer<bool> for BoolSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<bool, SerializationError> {
        match present(node, "boolean")? {
            Value::Bool(b) => Ok(*b),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            other => Err(SerializationError::type_mismatch("boolean", other)),
        }
    }

    fn serialize(&self, value: &bool, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(*value);
        Ok(())
    }
}

/// Integers of any width; numeric strings are accepted, out-of-range
/// values rejected
#[derive(Debug, Clone, Copy)]
pub struct IntSerializer<N> {
    marker: PhantomData<fn() -> N>,
}

impl<N> IntSerializer<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<N> Default for IntSerializer<N> {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! int_serializer {
    ($($ty:ty),*) => {$(
        impl TypeSerializer<$ty> for IntSerializer<$ty> {
            fn deserialize(&self, node: &ConfigNode<'_>) -> Result<$ty, SerializationError> {
                let out_of_range = |text: String| {
                    SerializationError::new(format!(
                        "{text} is out of range for {}",
                        stringify!($ty)
                    ))
                };
                match present(node, "integer")? {
                    Value::Number(n) => {
                        if let Some(i) = n.as_i64() {
                            <$ty>::try_from(i).map_err(|_| out_of_range(i.to_string()))
                        } else if let Some(u) = n.as_u64() {
                            <$ty>::try_from(u).map_err(|_| out_of_range(u.to_string()))
                        } else {
                            Err(SerializationError::new(format!("expected integer, found {n}")))
                        }
                    }
                    Value::String(s) => s.trim().parse::<$ty>().map_err(|e| {
                        SerializationError::new(format!("cannot parse '{s}' as integer: {e}"))
                    }),
                    other => Err(SerializationError::type_mismatch("integer", other)),
                }
            }

            fn serialize(&self, value: &$ty, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
                node.set(*value);
                Ok(())
            }
        }
    )*};
}

int_serializer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Floating point numbers; integers and numeric strings are accepted
#[derive(Debug, Clone, Copy)]
pub struct FloatSerializer;

fn float_from(node: &ConfigNode<'_>) -> Result<f64, SerializationError> {
    match present(node, "number")? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| SerializationError::new(format!("expected number, found {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| SerializationError::new(format!("cannot parse '{s}' as number: {e}"))),
        other => Err(SerializationError::type_mismatch("number", other)),
    }
}

impl TypeSerializer<f64> for FloatSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<f64, SerializationError> {
        float_from(node)
    }

    fn serialize(&self, value: &f64, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(*value);
        Ok(())
    }
}

impl TypeSerializer<f32> for FloatSerializer {
    #[expect(clippy::cast_possible_truncation, reason = "f32 fields accept the precision loss")]
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<f32, SerializationError> {
        float_from(node).map(|f| f as f32)
    }

    fn serialize(&self, value: &f32, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(f64::from(*value));
        Ok(())
    }
}

/// A single-character string
#[derive(Debug, Clone, Copy)]
pub struct CharSerializer;

impl TypeSerializer<char> for CharSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<char, SerializationError> {
        let text = scalar_text(present(node, "character")?)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(SerializationError::new(format!(
                "expected a single character, found '{text}'"
            ))),
        }
    }

    fn serialize(&self, value: &char, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(value.to_string());
        Ok(())
    }
}

fn scalar_text(value: &Value) -> Result<String, SerializationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(SerializationError::type_mismatch("string", other)),
    }
}

/// Any scalar, stringified
#[derive(Debug, Clone, Copy)]
pub struct StringSerializer;

impl TypeSerializer<String> for StringSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<String, SerializationError> {
        scalar_text(present(node, "string")?)
    }

    fn serialize(&self, value: &String, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(value.as_str());
        Ok(())
    }
}

/// Filesystem paths written as strings
#[derive(Debug, Clone, Copy)]
pub struct PathSerializer;

impl TypeSerializer<PathBuf> for PathSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<PathBuf, SerializationError> {
        match present(node, "path")? {
            Value::String(s) => Ok(PathBuf::from(s)),
            other => Err(SerializationError::type_mismatch("path", other)),
        }
    }

    fn serialize(&self, value: &PathBuf, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        let text = value.to_str().ok_or_else(|| {
            SerializationError::new(format!("path is not valid UTF-8: {}", value.display()))
        })?;
        node.set(text);
        Ok(())
    }
}

/// Durations as a number of seconds (fractions allowed)
#[derive(Debug, Clone, Copy)]
pub struct DurationSerializer;

impl TypeSerializer<Duration> for DurationSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<Duration, SerializationError> {
        let seconds = float_from(node)?;
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| SerializationError::new(format!("invalid duration {seconds}: {e}")))
    }

    fn serialize(&self, value: &Duration, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        if value.subsec_nanos() == 0 {
            node.set(value.as_secs());
        } else {
            node.set(value.as_secs_f64());
        }
        Ok(())
    }
}

/// The raw document subtree, unchanged
#[derive(Debug, Clone, Copy)]
pub struct ValueSerializer;

impl TypeSerializer<Value> for ValueSerializer {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<Value, SerializationError> {
        Ok(node.raw().cloned().unwrap_or(Value::Null))
    }

    fn serialize(&self, value: &Value, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        node.set(value.clone());
        Ok(())
    }
}

/// Adapter for any type that already implements serde's traits
///
/// ```
/// use foldconf::binding::serializer::{SerdeSerializer, TypeSerializerRegistry};
///
/// #[derive(serde::Serialize, serde::Deserialize)]
/// enum Mode { Fast, Safe }
///
/// let mut registry = TypeSerializerRegistry::defaults();
/// registry.register::<Mode, _>(SerdeSerializer::<Mode>::new());
/// assert!(registry.get::<Mode>().is_some());
/// ```
pub struct SerdeSerializer<T> {
    marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSerializer<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeSerializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Serialize + DeserializeOwned> TypeSerializer<T> for SerdeSerializer<T> {
    fn deserialize(&self, node: &ConfigNode<'_>) -> Result<T, SerializationError> {
        let value = node.raw().cloned().unwrap_or(Value::Null);
        serde_yaml::from_value(value).map_err(|e| SerializationError::new(e.to_string()))
    }

    fn serialize(&self, value: &T, mut node: MutableConfigNode<'_>) -> Result<(), SerializationError> {
        let value = serde_yaml::to_value(value).map_err(|e| SerializationError::new(e.to_string()))?;
        node.set(value);
        Ok(())
    }
}
