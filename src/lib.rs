//! `foldconf` - typed, hot-reloadable YAML document collections
//!
//! A collection is a folder of YAML documents, one item per file. Documents
//! are bound onto Rust types through explicit schemas, hashed canonically so
//! reloads can tell what changed, and published as immutable snapshots that
//! readers access without locking.
//!
//! - [`node`]: document cursors, loading and canonical hashing
//! - [`binding`]: serializers, schemas, the binder and the validator
//! - [`collection`]: folder collections, snapshots, change events, editing
//! - [`system`]: filesystem abstraction with an in-memory implementation

pub mod binding;
pub mod cli;
pub mod collection;
pub mod error;
pub mod node;
pub mod system;
pub mod utils;
