//! Collections looked up by item type and name

use super::editor::ConfigCollectionEditor;
use super::entry::CollectionEntry;
use super::reference::ConfigCollectionRef;
use super::resources::ResourceProvider;
use super::settings::CollectionSettings;
use super::snapshot::ConfigCollectionSnapshot;
use crate::binding::{Bindable, Binder};
use crate::error::ConfigError;
use crate::system::System;
use parking_lot::RwLock;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

trait Reloadable: Send + Sync {
    fn reload(&self) -> usize;
}

impl<T: Bindable> Reloadable for CollectionEntry<T> {
    fn reload(&self) -> usize {
        self.reload_all().len()
    }
}

struct Registered {
    entry: Arc<dyn Any + Send + Sync>,
    reloadable: Arc<dyn Reloadable>,
}

type Key = (TypeId, String);

/// Owner of every registered collection
///
/// Asking for a collection that was never registered is a programming
/// error and is reported as [`ConfigError::NotRegistered`].
pub struct CollectionRegistry {
    system: Arc<dyn System>,
    binder: Arc<Binder>,
    resources: Option<Arc<dyn ResourceProvider>>,
    entries: RwLock<HashMap<Key, Registered>>,
}

impl CollectionRegistry {
    #[must_use]
    pub fn new(system: Arc<dyn System>, binder: Arc<Binder>) -> Self {
        Self {
            system,
            binder,
            resources: None,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Resource provider handed to every collection registered afterwards
    #[must_use]
    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(resources);
        self
    }

    /// Create, initialize and register a collection of `T`
    ///
    /// # Errors
    ///
    /// Fails if a collection of `T` with the same name is already registered.
    pub fn register<T: Bindable>(&self, settings: CollectionSettings) -> Result<Arc<CollectionEntry<T>>, ConfigError> {
        let key: Key = (TypeId::of::<T>(), settings.name.clone());
        if self.entries.read().contains_key(&key) {
            return Err(already_registered::<T>(&settings.name));
        }

        let mut entry = CollectionEntry::new(Arc::clone(&self.system), Arc::clone(&self.binder), settings);
        if let Some(resources) = &self.resources {
            entry = entry.with_resources(Arc::clone(resources));
        }
        let entry = Arc::new(entry);
        entry.initialize();

        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(already_registered::<T>(&key.1));
        }
        debug!("Registered collection '{}' of {}", key.1, type_name::<T>());
        entries.insert(
            key,
            Registered {
                entry: Arc::clone(&entry) as Arc<dyn Any + Send + Sync>,
                reloadable: Arc::clone(&entry) as Arc<dyn Reloadable>,
            },
        );
        Ok(entry)
    }

    /// Registered collection entry
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotRegistered`] for unknown type and name pairs.
    pub fn entry<T: Bindable>(&self, name: &str) -> Result<Arc<CollectionEntry<T>>, ConfigError> {
        let key: Key = (TypeId::of::<T>(), name.to_owned());
        let entry = self
            .entries
            .read()
            .get(&key)
            .map(|registered| Arc::clone(&registered.entry))
            .ok_or_else(|| ConfigError::not_registered(type_name::<T>(), name))?;
        entry
            .downcast::<CollectionEntry<T>>()
            .map_err(|_| ConfigError::not_registered(type_name::<T>(), name))
    }

    /// Current snapshot of a collection
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotRegistered`] for unknown type and name pairs.
    pub fn get<T: Bindable>(&self, name: &str) -> Result<Arc<ConfigCollectionSnapshot<T>>, ConfigError> {
        Ok(self.entry::<T>(name)?.snapshot())
    }

    /// Live reference to a collection
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotRegistered`] for unknown type and name pairs.
    pub fn get_ref<T: Bindable>(&self, name: &str) -> Result<Arc<ConfigCollectionRef<T>>, ConfigError> {
        Ok(self.entry::<T>(name)?.reference())
    }

    /// Editor for a collection
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotRegistered`] for unknown type and name pairs.
    pub fn editor<T: Bindable>(&self, name: &str) -> Result<ConfigCollectionEditor<T>, ConfigError> {
        Ok(ConfigCollectionEditor::new(self.entry::<T>(name)?))
    }

    /// Reload every collection; returns the number of changes emitted
    pub fn reload_all(&self) -> usize {
        let reloadables: Vec<Arc<dyn Reloadable>> = self
            .entries
            .read()
            .values()
            .map(|registered| Arc::clone(&registered.reloadable))
            .collect();
        reloadables.iter().map(|entry| entry.reload()).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn already_registered<T>(name: &str) -> ConfigError {
    ConfigError::configuration(format!(
        "Collection '{name}' for type {} is already registered",
        type_name::<T>()
    ))
}
