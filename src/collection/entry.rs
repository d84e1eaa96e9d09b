//! Folder-backed collection: loading, diffing and editing one item type

use super::change::CollectionItemChange;
use super::edit::EditResult;
use super::reference::ConfigCollectionRef;
use super::resources::{INDEX_FILE, ResourceProvider, index_entries, resource_path};
use super::settings::CollectionSettings;
use super::snapshot::ConfigCollectionSnapshot;
use crate::binding::{Bindable, Binder};
use crate::node::{ConfigNode, MutableConfigNode, hash, yaml};
use crate::system::System;
use crate::utils::path::{
    NEW_FILE_EXTENSION, extension_rank, is_document_file, is_safe_id, item_files, item_id, validate_item_id,
};
use parking_lot::Mutex;
use serde_yaml::Value;
use std::any::type_name;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bookkeeping kept per loaded item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMeta {
    /// SHA-256 of the item's canonical document
    pub hash: String,
    /// Backing file name inside the collection folder
    pub file_name: String,
}

struct EntryState<T> {
    items: HashMap<String, Arc<T>>,
    meta: HashMap<String, ItemMeta>,
}

impl<T> Default for EntryState<T> {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            meta: HashMap::new(),
        }
    }
}

struct LoadedItem<T> {
    item: Arc<T>,
    meta: ItemMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveMode {
    Upsert,
    CreateOnly,
}

/// One collection of `T` items, one document per file
///
/// Reads go through the published snapshot and never block. Every
/// operation that changes the collection holds the entry's writer lock
/// while it touches disk and bookkeeping; listeners run after the lock is
/// released.
pub struct CollectionEntry<T: Bindable> {
    system: Arc<dyn System>,
    binder: Arc<Binder>,
    settings: CollectionSettings,
    resources: Option<Arc<dyn ResourceProvider>>,
    state: Mutex<EntryState<T>>,
    reference: Arc<ConfigCollectionRef<T>>,
}

impl<T: Bindable> CollectionEntry<T> {
    #[must_use]
    pub fn new(system: Arc<dyn System>, binder: Arc<Binder>, settings: CollectionSettings) -> Self {
        let empty = ConfigCollectionSnapshot::empty(&settings.name, type_name::<T>());
        Self {
            system,
            binder,
            settings,
            resources: None,
            state: Mutex::new(EntryState::default()),
            reference: Arc::new(ConfigCollectionRef::new(empty)),
        }
    }

    /// Source of the default files named by `settings.resource`
    #[must_use]
    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = Some(resources);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.settings.name
    }

    #[must_use]
    pub const fn settings(&self) -> &CollectionSettings {
        &self.settings
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.settings.folder
    }

    #[must_use]
    pub fn reference(&self) -> Arc<ConfigCollectionRef<T>> {
        Arc::clone(&self.reference)
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigCollectionSnapshot<T>> {
        self.reference.get()
    }

    /// Hash and file name recorded for an item
    #[must_use]
    pub fn item_meta(&self, id: &str) -> Option<ItemMeta> {
        self.state.lock().meta.get(id).cloned()
    }

    /// Create the folder, seed bundled defaults into it when empty, then load
    pub fn initialize(&self) {
        let folder = self.folder();
        let mut seed = false;

        if self.system.is_dir(folder) {
            seed = self
                .system
                .read_dir(folder)
                .map(|children| children.is_empty())
                .unwrap_or(false);
        } else {
            match self.system.create_dir_all(folder) {
                Ok(()) => {
                    info!("Created collection folder: {}", folder.display());
                    seed = true;
                }
                Err(e) => warn!("Failed to create collection folder {}: {}", folder.display(), e),
            }
        }

        if seed {
            self.seed_defaults();
        }
        self.load_all();
    }

    fn seed_defaults(&self) {
        let (Some(resource), Some(resources)) = (self.settings.resource.as_deref(), self.resources.as_deref())
        else {
            return;
        };

        let Some(entries) = index_entries(resources, resource) else {
            warn!("No {} found for resource '{}'", INDEX_FILE, resource);
            return;
        };

        for name in entries {
            if !is_safe_id(&name) {
                warn!("Skipping unsafe default file name: {}", name);
                continue;
            }
            let Some(contents) = resources.resource(&resource_path(resource, &name)) else {
                warn!("Default file '{}' listed but missing from resource '{}'", name, resource);
                continue;
            };
            let target = self.folder().join(&name);
            match self.system.write(&target, &contents) {
                Ok(()) => info!("Copied default {} into {}", name, self.folder().display()),
                Err(e) => warn!("Failed to copy default {}: {}", name, e),
            }
        }
    }

    /// Rescan the whole folder and publish a fresh snapshot
    ///
    /// Emits no change events; see [`Self::reload_all`].
    pub fn load_all(&self) {
        let mut state = self.state.lock();
        self.load_all_locked(&mut state);
    }

    /// Rescan the folder and notify listeners of what changed
    pub fn reload_all(&self) -> Vec<CollectionItemChange<T>> {
        let changes = {
            let mut state = self.state.lock();
            let old_items = std::mem::take(&mut state.items);
            let old_meta = std::mem::take(&mut state.meta);
            self.load_all_locked(&mut state);
            self.diff(&old_items, &old_meta, &state)
        };

        for change in &changes {
            self.reference.notify_listeners(change);
        }
        changes
    }

    /// Re-read the file backing one item
    pub fn reload_item(&self, id: &str) -> Option<CollectionItemChange<T>> {
        if !is_safe_id(id) {
            warn!("Ignoring reload of unsafe item id: {}", id);
            return None;
        }

        let change = {
            let mut state = self.state.lock();
            self.reload_item_locked(&mut state, id)
        };

        if let Some(change) = &change {
            self.reference.notify_listeners(change);
        }
        change
    }

    fn reload_item_locked(&self, state: &mut EntryState<T>, id: &str) -> Option<CollectionItemChange<T>> {
        let existing = state.items.get(id).cloned();

        let visible = self.existing_file(id).filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| !self.settings.is_excluded(name))
        });
        let Some(path) = visible else {
            let old = existing?;
            state.items.remove(id);
            state.meta.remove(id);
            self.publish(state);
            return Some(CollectionItemChange::removed(self.name(), type_name::<T>(), id, old));
        };

        let loaded = match self.load_file(&path, id) {
            Ok(loaded) => loaded,
            Err(message) => {
                warn!("Keeping previous state of '{}': {}", id, message);
                return None;
            }
        };

        let change = match existing {
            None => CollectionItemChange::added(self.name(), type_name::<T>(), id, Arc::clone(&loaded.item)),
            Some(old) => {
                let unchanged = state
                    .meta
                    .get(id)
                    .is_some_and(|meta| meta.hash == loaded.meta.hash);
                if unchanged {
                    return None;
                }
                CollectionItemChange::modified(self.name(), type_name::<T>(), id, old, Arc::clone(&loaded.item))
            }
        };

        state.items.insert(id.to_owned(), loaded.item);
        state.meta.insert(id.to_owned(), loaded.meta);
        self.publish(state);
        Some(change)
    }

    /// Write `value` as item `id`, then reload it from disk
    ///
    /// The returned item is the one bound back from the written file, not
    /// `value` itself.
    pub fn save_item(&self, id: &str, value: &T) -> EditResult<Arc<T>> {
        self.save(id, value, SaveMode::Upsert)
    }

    /// Like [`Self::save_item`] but fails when `id` already exists
    pub fn create_item(&self, id: &str, value: &T) -> EditResult<Arc<T>> {
        self.save(id, value, SaveMode::CreateOnly)
    }

    fn save(&self, id: &str, value: &T, mode: SaveMode) -> EditResult<Arc<T>> {
        if let Err(e) = validate_item_id(id) {
            return EditResult::failure(e.to_string());
        }
        if self.settings.is_excluded(&format!("{id}.{NEW_FILE_EXTENSION}")) {
            return EditResult::failure(format!(
                "Item id '{id}' starts with the excluded prefix '{}'",
                self.settings.exclude_prefix
            ));
        }

        let outcome = {
            let mut state = self.state.lock();
            self.save_locked(&mut state, id, value, mode)
        };

        match outcome {
            Ok(change) => {
                self.reference.notify_listeners(&change);
                change
                    .new_item
                    .map_or_else(EditResult::success_empty, EditResult::success)
            }
            Err(failure) => failure,
        }
    }

    fn save_locked(
        &self,
        state: &mut EntryState<T>,
        id: &str,
        value: &T,
        mode: SaveMode,
    ) -> Result<CollectionItemChange<T>, EditResult<Arc<T>>> {
        let existing = state.items.get(id).cloned();
        if mode == SaveMode::CreateOnly && existing.is_some() {
            return Err(EditResult::failure(format!("Item already exists: {id}")));
        }

        let mut document = yaml::create_node();
        let errors = self
            .binder
            .unbind(value, MutableConfigNode::new(&mut document));
        if !errors.is_empty() {
            return Err(EditResult::failure_with_errors(
                format!("Failed to serialize item '{id}'"),
                errors.iter().map(ToString::to_string).collect(),
            ));
        }

        let path = self
            .existing_file(id)
            .unwrap_or_else(|| self.folder().join(format!("{id}.{NEW_FILE_EXTENSION}")));
        if let Err(e) = self.system.create_dir_all(self.folder()) {
            return Err(EditResult::failure(format!(
                "Failed to create folder {}: {e}",
                self.folder().display()
            )));
        }
        if let Err(e) = yaml::save(self.system.as_ref(), &document, &path) {
            return Err(EditResult::failure(format!("Failed to write item '{id}': {e:#}")));
        }

        let loaded = self.load_file(&path, id).map_err(|message| {
            EditResult::failure(format!("Item '{id}' was written but could not be reloaded: {message}"))
        })?;

        let item = Arc::clone(&loaded.item);
        state.items.insert(id.to_owned(), loaded.item);
        state.meta.insert(id.to_owned(), loaded.meta);
        self.publish(state);

        Ok(match existing {
            Some(old) => CollectionItemChange::modified(self.name(), type_name::<T>(), id, old, item),
            None => CollectionItemChange::added(self.name(), type_name::<T>(), id, item),
        })
    }

    /// Delete the file backing `id` and drop the item
    pub fn delete_item(&self, id: &str) -> EditResult<Arc<T>> {
        if let Err(e) = validate_item_id(id) {
            return EditResult::failure(e.to_string());
        }

        let outcome = {
            let mut state = self.state.lock();
            self.delete_locked(&mut state, id)
        };

        match outcome {
            Ok(change) => {
                self.reference.notify_listeners(&change);
                change
                    .old_item
                    .map_or_else(EditResult::success_empty, EditResult::success)
            }
            Err(failure) => failure,
        }
    }

    fn delete_locked(
        &self,
        state: &mut EntryState<T>,
        id: &str,
    ) -> Result<CollectionItemChange<T>, EditResult<Arc<T>>> {
        let Some(old) = state.items.get(id).cloned() else {
            return Err(EditResult::failure(format!("Item not found: {id}")));
        };

        // every twin goes, not only the loaded file
        let mut paths = self.files_for(id);
        if let Some(meta) = state.meta.get(id) {
            let recorded = self.folder().join(&meta.file_name);
            if !paths.contains(&recorded) {
                paths.push(recorded);
            }
        }
        for path in paths {
            if self.system.exists(&path)
                && let Err(e) = self.system.remove_file(&path)
            {
                return Err(EditResult::failure(format!(
                    "Failed to delete {}: {e}",
                    path.display()
                )));
            }
        }

        state.items.remove(id);
        state.meta.remove(id);
        self.publish(state);
        Ok(CollectionItemChange::removed(self.name(), type_name::<T>(), id, old))
    }

    /// Deep copy through a document round trip; `None` if it cannot be made
    #[must_use]
    pub fn copy_item(&self, item: &T) -> Option<T> {
        self.binder.copy(item)
    }

    /// Set the id of `item` the way freshly loaded items receive it
    pub fn inject_id(&self, item: &mut T, id: &str) -> bool {
        self.binder
            .inject_key(item, self.settings.id_field.as_deref(), id)
    }

    fn load_all_locked(&self, state: &mut EntryState<T>) {
        let mut next = EntryState::default();

        for path in self.candidate_files() {
            let Some(id) = item_id(&path) else {
                continue;
            };
            match self.load_file(&path, &id) {
                Ok(loaded) => {
                    debug!("Loaded '{}' into collection '{}'", id, self.name());
                    next.items.insert(id.clone(), loaded.item);
                    next.meta.insert(id, loaded.meta);
                }
                Err(message) => warn!("Skipping {}: {}", path.display(), message),
            }
        }

        *state = next;
        self.publish(state);
    }

    /// Document files directly in the folder, sorted by file name
    fn candidate_files(&self) -> Vec<PathBuf> {
        let folder = self.folder();
        if !self.system.is_dir(folder) {
            return Vec::new();
        }

        let children = match self.system.read_dir(folder) {
            Ok(children) => children,
            Err(e) => {
                warn!("Failed to read collection folder {}: {}", folder.display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = children
            .into_iter()
            .filter(|path| self.system.is_file(path) && is_document_file(path))
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| !self.settings.is_excluded(name))
            })
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        let mut chosen: HashMap<String, PathBuf> = HashMap::new();
        for path in files {
            let Some(id) = item_id(&path) else {
                continue;
            };
            match chosen.get(&id) {
                Some(current) if extension_rank(current) <= extension_rank(&path) => {
                    warn!("Ignoring {}: {} has precedence", path.display(), current.display());
                }
                Some(current) => {
                    warn!("Ignoring {}: {} has precedence", current.display(), path.display());
                    chosen.insert(id, path);
                }
                None => {
                    chosen.insert(id, path);
                }
            }
        }

        let mut files: Vec<PathBuf> = chosen.into_values().collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        files
    }

    /// File currently backing `id`, `.yaml` before `.yml`
    fn existing_file(&self, id: &str) -> Option<PathBuf> {
        self.files_for(id).into_iter().next()
    }

    /// Every document file named after `id`, in precedence order
    fn files_for(&self, id: &str) -> Vec<PathBuf> {
        let folder = self.folder();
        if !self.system.is_dir(folder) {
            return Vec::new();
        }
        match self.system.read_dir(folder) {
            Ok(children) => item_files(children.into_iter().filter(|path| self.system.is_file(path)), id),
            Err(e) => {
                warn!("Failed to read collection folder {}: {}", folder.display(), e);
                Vec::new()
            }
        }
    }

    fn load_file(&self, path: &Path, id: &str) -> Result<LoadedItem<T>, String> {
        let document = yaml::load(self.system.as_ref(), path).map_err(|e| format!("{e:#}"))?;
        let root = ConfigNode::root(&document);

        let (value, binding_errors, validation_errors) = self.binder.bind::<T>(&root).into_parts();
        if !binding_errors.is_empty() {
            let details: Vec<String> = binding_errors.iter().map(ToString::to_string).collect();
            return Err(format!("binding failed: {}", details.join("; ")));
        }
        let Some(mut item) = value else {
            return Err("binding produced no value".to_owned());
        };

        for problem in &validation_errors {
            warn!("Validation problem in '{}' of collection '{}': {}", id, self.name(), problem);
        }

        if !self.inject_id(&mut item, id) && self.settings.id_field.is_some() {
            warn!("Could not set id field on '{}' in collection '{}'", id, self.name());
        }

        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(LoadedItem {
            item: Arc::new(item),
            meta: ItemMeta {
                hash: hash::sha256(&root),
                file_name,
            },
        })
    }

    /// Order, filter and publish the current bookkeeping
    fn publish(&self, state: &EntryState<T>) {
        let mut ids: Vec<&String> = state.items.keys().collect();
        ids.sort_by(|a, b| {
            let name_a = state.meta.get(*a).map(|meta| meta.file_name.as_str());
            let name_b = state.meta.get(*b).map(|meta| meta.file_name.as_str());
            name_a.cmp(&name_b).then_with(|| a.cmp(b))
        });

        let mut ordered: Vec<(String, Arc<T>)> = ids
            .into_iter()
            .filter_map(|id| state.items.get(id).map(|item| (id.clone(), Arc::clone(item))))
            .collect();

        if let Some(field) = self.settings.sort_field() {
            self.sort_by_field(&mut ordered, field);
        }

        let enabled = self.settings.enabled_field.as_deref().map(|field| {
            ordered
                .iter()
                .filter(|(_, item)| self.binder.read_property(&**item, field) != Some(Value::Bool(false)))
                .map(|(_, item)| Arc::clone(item))
                .collect()
        });

        self.reference.set_snapshot(ConfigCollectionSnapshot::new(
            self.name(),
            type_name::<T>(),
            ordered,
            enabled,
        ));
    }

    fn sort_by_field(&self, ordered: &mut Vec<(String, Arc<T>)>, field: &str) {
        let keys: Vec<SortKey> = ordered
            .iter()
            .map(|(_, item)| SortKey::of(self.binder.read_property(&**item, field)))
            .collect();
        let kind = keys.iter().find_map(SortKey::kind);

        let mut keyed: Vec<(SortKey, (String, Arc<T>))> = keys
            .into_iter()
            .map(|key| key.within(kind))
            .zip(ordered.drain(..))
            .collect();
        keyed.sort_by(|(a, _), (b, _)| a.compare(b));
        ordered.extend(keyed.into_iter().map(|(_, entry)| entry));
    }

    fn diff(
        &self,
        old_items: &HashMap<String, Arc<T>>,
        old_meta: &HashMap<String, ItemMeta>,
        state: &EntryState<T>,
    ) -> Vec<CollectionItemChange<T>> {
        let mut changes = Vec::new();

        let mut removed: Vec<&String> = old_items
            .keys()
            .filter(|id| !state.items.contains_key(*id))
            .collect();
        removed.sort();
        for id in removed {
            if let Some(old) = old_items.get(id) {
                changes.push(CollectionItemChange::removed(self.name(), type_name::<T>(), id, Arc::clone(old)));
            }
        }

        let snapshot = self.reference.get();
        for (id, item) in snapshot.entries() {
            match old_items.get(id) {
                None => changes.push(CollectionItemChange::added(self.name(), type_name::<T>(), id, Arc::clone(item))),
                Some(old) => {
                    let before = old_meta.get(id).map(|meta| meta.hash.as_str());
                    let after = state.meta.get(id).map(|meta| meta.hash.as_str());
                    if before != after {
                        changes.push(CollectionItemChange::modified(
                            self.name(),
                            type_name::<T>(),
                            id,
                            Arc::clone(old),
                            Arc::clone(item),
                        ));
                    }
                }
            }
        }

        changes
    }
}

/// Ordering key read from an item's order-by field
///
/// Only values of the same kind compare. The kind is taken from the first
/// comparable value in file order; everything else sorts last, keeping file
/// order among itself.
#[derive(Debug, Clone, PartialEq)]
enum SortKey {
    Number(f64),
    Text(String),
    Flag(bool),
    Unordered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortKind {
    Number,
    Text,
    Flag,
}

impl SortKey {
    fn of(value: Option<Value>) -> Self {
        match value {
            Some(Value::Number(n)) => n.as_f64().map_or(Self::Unordered, Self::Number),
            Some(Value::String(s)) => Self::Text(s),
            Some(Value::Bool(b)) => Self::Flag(b),
            _ => Self::Unordered,
        }
    }

    const fn kind(&self) -> Option<SortKind> {
        match self {
            Self::Number(_) => Some(SortKind::Number),
            Self::Text(_) => Some(SortKind::Text),
            Self::Flag(_) => Some(SortKind::Flag),
            Self::Unordered => None,
        }
    }

    fn within(self, kind: Option<SortKind>) -> Self {
        if self.kind().is_some() && self.kind() == kind {
            self
        } else {
            Self::Unordered
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Flag(a), Self::Flag(b)) => a.cmp(b),
            (Self::Unordered, Self::Unordered) => Ordering::Equal,
            (Self::Unordered, _) => Ordering::Greater,
            _ => Ordering::Less,
        }
    }
}
