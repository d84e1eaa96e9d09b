//! Immutable view of a collection at one point in time

use std::collections::HashMap;
use std::sync::Arc;

/// Items of a collection as of one load or edit
///
/// Snapshots never change once published; readers holding one keep a
/// consistent view while newer snapshots replace it.
#[derive(Debug)]
pub struct ConfigCollectionSnapshot<T> {
    name: String,
    item_type: &'static str,
    items: HashMap<String, Arc<T>>,
    ids: Vec<String>,
    values: Arc<Vec<Arc<T>>>,
    enabled: Arc<Vec<Arc<T>>>,
}

impl<T> ConfigCollectionSnapshot<T> {
    /// Build a snapshot; `ids` and `values` are in collection order
    ///
    /// Pass `None` for `enabled` when the collection has no enabled field;
    /// the enabled view then shares the values list.
    #[must_use]
    pub fn new(
        name: &str,
        item_type: &'static str,
        ordered: Vec<(String, Arc<T>)>,
        enabled: Option<Vec<Arc<T>>>,
    ) -> Self {
        let items = ordered
            .iter()
            .map(|(id, item)| (id.clone(), Arc::clone(item)))
            .collect();
        let (ids, values): (Vec<String>, Vec<Arc<T>>) = ordered.into_iter().unzip();
        let values = Arc::new(values);
        let enabled = enabled.map_or_else(|| Arc::clone(&values), Arc::new);

        Self {
            name: name.to_owned(),
            item_type,
            items,
            ids,
            values,
            enabled,
        }
    }

    #[must_use]
    pub fn empty(name: &str, item_type: &'static str) -> Self {
        Self::new(name, item_type, Vec::new(), None)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<T>> {
        self.items.get(id)
    }

    /// Owned handle to an item
    #[must_use]
    pub fn find(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Ids in collection order
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// All items in collection order
    #[must_use]
    pub fn values(&self) -> &Arc<Vec<Arc<T>>> {
        &self.values
    }

    /// Enabled items in collection order
    #[must_use]
    pub fn enabled(&self) -> &Arc<Vec<Arc<T>>> {
        &self.enabled
    }

    /// `(id, item)` pairs in collection order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Arc<T>)> {
        self.ids.iter().map(String::as_str).zip(self.values.iter())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn item_type(&self) -> &'static str {
        self.item_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ordered() -> Vec<(String, Arc<u32>)> {
        vec![("b".to_owned(), Arc::new(2)), ("a".to_owned(), Arc::new(1))]
    }

    #[test]
    fn keeps_order_and_lookup() {
        let snapshot = ConfigCollectionSnapshot::new("nums", "u32", ordered(), None);
        assert_eq!(snapshot.ids(), ["b", "a"]);
        assert_eq!(snapshot.values().iter().map(|v| **v).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(snapshot.find("a").as_deref(), Some(&1));
        assert!(snapshot.contains("b"));
        assert_eq!(snapshot.size(), 2);
    }

    #[test]
    fn enabled_shares_values_without_filter() {
        let snapshot = ConfigCollectionSnapshot::new("nums", "u32", ordered(), None);
        assert!(Arc::ptr_eq(snapshot.values(), snapshot.enabled()));

        let filtered = ConfigCollectionSnapshot::new("nums", "u32", ordered(), Some(Vec::new()));
        assert!(!Arc::ptr_eq(filtered.values(), filtered.enabled()));
        assert!(filtered.enabled().is_empty());
    }

    #[test]
    fn empty_snapshot() {
        let snapshot = ConfigCollectionSnapshot::<u32>::empty("nums", "u32");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.name(), "nums");
        assert!(snapshot.get("x").is_none());
    }
}
