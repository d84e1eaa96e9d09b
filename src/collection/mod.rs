//! Folder-backed, hot-reloadable collections of typed items
//!
//! Each collection maps a folder of YAML documents onto items of one
//! [`Bindable`](crate::binding::Bindable) type. The file stem is the item
//! id. Readers take lock-free snapshots; reloads and edits publish new
//! snapshots and report per-item changes to listeners.

pub mod change;
pub mod edit;
pub mod editor;
pub mod entry;
pub mod reference;
pub mod registry;
pub mod resources;
pub mod settings;
pub mod snapshot;

pub use change::{ChangeKind, CollectionItemChange};
pub use edit::EditResult;
pub use editor::ConfigCollectionEditor;
pub use entry::{CollectionEntry, ItemMeta};
pub use reference::{ConfigCollectionRef, ListenerId};
pub use registry::CollectionRegistry;
pub use resources::{DirectoryResources, EmbeddedResources, ResourceProvider};
pub use settings::CollectionSettings;
pub use snapshot::ConfigCollectionSnapshot;
