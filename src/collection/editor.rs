//! Write access to a collection

use super::edit::EditResult;
use super::entry::CollectionEntry;
use crate::binding::Bindable;
use std::sync::Arc;

/// Create, update and delete items of one collection
///
/// Every change goes to disk first and is then reloaded, so the snapshot
/// always reflects what binding the written file produces.
pub struct ConfigCollectionEditor<T: Bindable> {
    entry: Arc<CollectionEntry<T>>,
}

impl<T: Bindable> Clone for ConfigCollectionEditor<T> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

impl<T: Bindable> ConfigCollectionEditor<T> {
    #[must_use]
    pub const fn new(entry: Arc<CollectionEntry<T>>) -> Self {
        Self { entry }
    }

    /// Save a new item; fails if `id` already exists
    pub fn create(&self, id: &str, value: &T) -> EditResult<Arc<T>> {
        self.entry.create_item(id, value)
    }

    /// Save an item, replacing any existing one
    pub fn save(&self, id: &str, value: &T) -> EditResult<Arc<T>> {
        self.entry.save_item(id, value)
    }

    /// Modify a copy of an existing item and save the result
    ///
    /// The mutator receives an independent copy with its id set; returning
    /// `None` cancels the update.
    pub fn update<F>(&self, id: &str, mutator: F) -> EditResult<Arc<T>>
    where
        F: FnOnce(T) -> Option<T>,
    {
        let Some(current) = self.entry.snapshot().find(id) else {
            return EditResult::failure(format!("Item not found: {id}"));
        };
        let Some(mut copy) = self.entry.copy_item(&current) else {
            return EditResult::failure(format!("Item '{id}' could not be copied for editing"));
        };
        self.entry.inject_id(&mut copy, id);

        match mutator(copy) {
            Some(updated) => self.entry.save_item(id, &updated),
            None => EditResult::failure(format!("Update of '{id}' was cancelled")),
        }
    }

    pub fn delete(&self, id: &str) -> EditResult<Arc<T>> {
        self.entry.delete_item(id)
    }

    /// Independent copy of an item; `None` if it cannot be round-tripped
    #[must_use]
    pub fn copy(&self, item: &T) -> Option<T> {
        self.entry.copy_item(item)
    }
}
