//! Typed binding between documents and Rust values
//!
//! Types describe themselves through a [`Schema`]; the [`Binder`] walks it
//! in both directions and the [`Validator`] checks declared constraints
//! once a value is bound.

pub mod binder;
pub mod codec;
pub mod naming;
pub mod result;
pub mod schema;
pub mod serializer;
pub mod validation;

pub use binder::Binder;
pub use codec::ValueCodec;
pub use naming::NamingStrategy;
pub use result::{BindingError, BindingResult};
pub use schema::{Bindable, ConstructorArgs, Field, Schema};
pub use serializer::{SerdeSerializer, TypeSerializer, TypeSerializerRegistry};
pub use validation::{Constraint, ValidationError, ValidationResult, Validator};
