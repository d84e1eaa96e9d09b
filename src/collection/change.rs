//! Change events emitted when a collection's contents move

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// One item appearing, changing or disappearing
///
/// `old_item` is `None` for additions and `new_item` is `None` for removals.
#[derive(Debug)]
pub struct CollectionItemChange<T> {
    pub kind: ChangeKind,
    pub collection: String,
    pub item_type: &'static str,
    pub id: String,
    pub old_item: Option<Arc<T>>,
    pub new_item: Option<Arc<T>>,
}

impl<T> Clone for CollectionItemChange<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            collection: self.collection.clone(),
            item_type: self.item_type,
            id: self.id.clone(),
            old_item: self.old_item.clone(),
            new_item: self.new_item.clone(),
        }
    }
}

impl<T> CollectionItemChange<T> {
    #[must_use]
    pub fn added(collection: &str, item_type: &'static str, id: &str, item: Arc<T>) -> Self {
        Self::new(ChangeKind::Added, collection, item_type, id, None, Some(item))
    }

    #[must_use]
    pub fn modified(collection: &str, item_type: &'static str, id: &str, old: Arc<T>, new: Arc<T>) -> Self {
        Self::new(ChangeKind::Modified, collection, item_type, id, Some(old), Some(new))
    }

    #[must_use]
    pub fn removed(collection: &str, item_type: &'static str, id: &str, old: Arc<T>) -> Self {
        Self::new(ChangeKind::Removed, collection, item_type, id, Some(old), None)
    }

    fn new(
        kind: ChangeKind,
        collection: &str,
        item_type: &'static str,
        id: &str,
        old_item: Option<Arc<T>>,
        new_item: Option<Arc<T>>,
    ) -> Self {
        Self {
            kind,
            collection: collection.to_owned(),
            item_type,
            id: id.to_owned(),
            old_item,
            new_item,
        }
    }
}
