//! Folder collection behaviour against the in-memory filesystem

use foldconf::binding::{Bindable, Binder, Constraint, Field, Schema};
use foldconf::collection::{ChangeKind, CollectionEntry, CollectionSettings, EmbeddedResources};
use foldconf::system::{MockSystem, System as _};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
struct Arena {
    id: String,
    name: String,
    priority: i32,
    enabled: bool,
    max_players: u32,
}

impl Bindable for Arena {
    fn schema() -> Schema<Self> {
        Schema::new()
            .field(Field::new("id", |a: &Self| &a.id, |a: &mut Self| &mut a.id).node_key())
            .field(Field::new("name", |a: &Self| &a.name, |a: &mut Self| &mut a.name))
            .field(Field::new("priority", |a: &Self| &a.priority, |a: &mut Self| &mut a.priority))
            .field(Field::new("enabled", |a: &Self| &a.enabled, |a: &mut Self| &mut a.enabled).default_value("true"))
            .field(
                Field::new("max_players", |a: &Self| &a.max_players, |a: &mut Self| &mut a.max_players)
                    .default_value("16"),
            )
            .constraint(Constraint::field("max_players").min(2))
    }
}

fn arena(name: &str, priority: i32) -> Arena {
    Arena {
        name: name.to_owned(),
        priority,
        enabled: true,
        max_players: 16,
        ..Arena::default()
    }
}

fn entry(system: &MockSystem, settings: CollectionSettings) -> CollectionEntry<Arena> {
    CollectionEntry::new(Arc::new(system.clone()), Arc::new(Binder::default()), settings)
}

fn settings() -> CollectionSettings {
    CollectionSettings::new("arenas", "/data/arenas")
}

fn read(system: &MockSystem, path: &str) -> String {
    system.read_to_string(Path::new(path)).unwrap()
}

#[test]
fn test_loads_items_with_injected_ids() {
    let system = MockSystem::new()
        .with_file("/data/arenas/dunes.yml", b"name: Dunes\npriority: 2\n")
        .with_file("/data/arenas/tundra.yaml", b"name: Tundra\n");
    let entry = entry(&system, settings());
    entry.load_all();

    let snapshot = entry.snapshot();
    assert_eq!(snapshot.ids(), ["dunes", "tundra"]);
    let dunes = snapshot.find("dunes").unwrap();
    assert_eq!(dunes.id, "dunes");
    assert_eq!(dunes.max_players, 16);
    assert!(dunes.enabled);
    assert_eq!(snapshot.name(), "arenas");
}

#[test]
fn test_order_by_field() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yml", b"name: A\npriority: 10\n")
        .with_file("/data/arenas/b.yml", b"name: B\npriority: 1\n");
    let entry = entry(&system, settings().with_order_by("priority"));
    entry.load_all();

    assert_eq!(entry.snapshot().ids(), ["b", "a"]);
}

#[test]
fn test_order_by_filename_keeps_file_order() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yml", b"name: A\npriority: 10\n")
        .with_file("/data/arenas/b.yml", b"name: B\npriority: 1\n");
    let entry = entry(&system, settings().with_order_by("filename"));
    entry.load_all();

    assert_eq!(entry.snapshot().ids(), ["a", "b"]);
}

#[test]
fn test_enabled_filter() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yml", b"name: A\nenabled: true\n")
        .with_file("/data/arenas/b.yml", b"name: B\nenabled: false\n");

    let filtered = entry(&system, settings().with_enabled_field("enabled"));
    filtered.load_all();
    let snapshot = filtered.snapshot();
    assert_eq!(snapshot.size(), 2);
    assert_eq!(snapshot.enabled().len(), 1);
    assert_eq!(snapshot.enabled()[0].name, "A");

    let unfiltered = entry(&system, settings());
    unfiltered.load_all();
    let snapshot = unfiltered.snapshot();
    assert!(Arc::ptr_eq(snapshot.values(), snapshot.enabled()));
}

#[test]
fn test_skips_excluded_and_foreign_files() {
    let system = MockSystem::new()
        .with_file("/data/arenas/live.yml", b"name: Live\n")
        .with_file("/data/arenas/_template.yml", b"name: Template\n")
        .with_file("/data/arenas/readme.md", b"# arenas\n")
        .with_file("/data/arenas/nested/deep.yml", b"name: Deep\n");
    let entry = entry(&system, settings());
    entry.load_all();

    assert_eq!(entry.snapshot().ids(), ["live"]);
}

#[test]
fn test_broken_files_are_skipped_but_invalid_values_kept() {
    let system = MockSystem::new()
        .with_file("/data/arenas/good.yml", b"name: Good\n")
        .with_file("/data/arenas/syntax.yml", b"name: [unclosed\n")
        .with_file("/data/arenas/types.yml", b"name: Types\npriority: high\n")
        .with_file("/data/arenas/tiny.yml", b"name: Tiny\nmax_players: 1\n");
    let entry = entry(&system, settings());
    entry.load_all();

    assert_eq!(entry.snapshot().ids(), ["good", "tiny"]);
    assert_eq!(entry.snapshot().find("tiny").unwrap().max_players, 1);
}

#[test]
fn test_missing_folder_gives_empty_snapshot() {
    let system = MockSystem::new();
    let entry = entry(&system, settings());
    entry.load_all();

    assert!(entry.snapshot().is_empty());
    assert!(!system.exists(Path::new("/data/arenas")));
}

#[test]
fn test_yaml_extension_has_precedence() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yaml", b"name: From yaml\n")
        .with_file("/data/arenas/a.yml", b"name: From yml\n");
    let entry = entry(&system, settings());
    entry.load_all();

    let snapshot = entry.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.find("a").unwrap().name, "From yaml");
    assert_eq!(entry.item_meta("a").unwrap().file_name, "a.yaml");

    let saved = entry.save_item("a", &arena("Rewritten", 0));
    assert!(saved.is_success());
    assert!(read(&system, "/data/arenas/a.yaml").contains("Rewritten"));
    assert!(read(&system, "/data/arenas/a.yml").contains("From yml"));
}

#[test]
fn test_reload_all_reports_removed_item() {
    let system = MockSystem::new()
        .with_file("/data/arenas/item1.yml", b"name: One\n")
        .with_file("/data/arenas/item2.yml", b"name: Two\n");
    let entry = entry(&system, settings());
    entry.load_all();

    system.remove_file(Path::new("/data/arenas/item1.yml")).unwrap();
    let changes = entry.reload_all();

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind, ChangeKind::Removed);
    assert_eq!(changes[0].id, "item1");
    assert_eq!(changes[0].old_item.as_ref().unwrap().name, "One");
    assert!(changes[0].new_item.is_none());
    assert!(entry.snapshot().find("item1").is_none());
}

#[test]
fn test_reload_all_diffs_by_content_hash() {
    let system = MockSystem::new()
        .with_file("/data/arenas/same.yml", b"name: Same\npriority: 1\n")
        .with_file("/data/arenas/edit.yml", b"name: Edit\n");
    let entry = entry(&system, settings());
    entry.load_all();

    // same content with different key order and formatting
    system
        .write(Path::new("/data/arenas/same.yml"), b"priority: 1\nname: 'Same'\n")
        .unwrap();
    system.write(Path::new("/data/arenas/edit.yml"), b"name: Edited\n").unwrap();
    system.write(Path::new("/data/arenas/new.yml"), b"name: New\n").unwrap();

    let changes = entry.reload_all();
    let summary: Vec<(ChangeKind, &str)> = changes.iter().map(|c| (c.kind, c.id.as_str())).collect();
    assert_eq!(
        summary,
        vec![(ChangeKind::Modified, "edit"), (ChangeKind::Added, "new")]
    );
    assert_eq!(changes[0].old_item.as_ref().unwrap().name, "Edit");
    assert_eq!(changes[0].new_item.as_ref().unwrap().name, "Edited");

    assert!(entry.reload_all().is_empty());
}

#[test]
fn test_reload_item_lifecycle() {
    let system = MockSystem::new().with_dir("/data/arenas");
    let entry = entry(&system, settings());
    entry.load_all();

    assert!(entry.reload_item("solo").is_none());

    system.write(Path::new("/data/arenas/solo.yml"), b"name: Solo\n").unwrap();
    let added = entry.reload_item("solo").unwrap();
    assert_eq!(added.kind, ChangeKind::Added);
    assert_eq!(entry.snapshot().find("solo").unwrap().id, "solo");

    assert!(entry.reload_item("solo").is_none());

    system.write(Path::new("/data/arenas/solo.yml"), b"name: Solo 2\n").unwrap();
    let modified = entry.reload_item("solo").unwrap();
    assert_eq!(modified.kind, ChangeKind::Modified);

    system.remove_file(Path::new("/data/arenas/solo.yml")).unwrap();
    let removed = entry.reload_item("solo").unwrap();
    assert_eq!(removed.kind, ChangeKind::Removed);
    assert!(entry.snapshot().is_empty());
}

#[test]
fn test_reload_item_keeps_previous_state_on_broken_file() {
    let system = MockSystem::new().with_file("/data/arenas/a.yml", b"name: A\n");
    let entry = entry(&system, settings());
    entry.load_all();

    system.write(Path::new("/data/arenas/a.yml"), b"name: [\n").unwrap();
    assert!(entry.reload_item("a").is_none());
    assert_eq!(entry.snapshot().find("a").unwrap().name, "A");
}

#[test]
fn test_save_item_round_trips_through_disk() {
    let system = MockSystem::new().with_dir("/data");
    let entry = entry(&system, settings());
    entry.load_all();

    let mut value = arena("Crater", 4);
    value.id = "ignored".to_owned();
    let saved = entry.save_item("crater", &value).into_value().unwrap();

    assert_eq!(saved.id, "crater");
    assert_eq!(saved.name, "Crater");
    let written = read(&system, "/data/arenas/crater.yml");
    assert!(written.contains("name: Crater"));
    assert!(!written.contains("id:"));
    assert!(Arc::ptr_eq(&saved, &entry.snapshot().find("crater").unwrap()));
}

#[test]
fn test_save_item_is_idempotent() {
    let system = MockSystem::new().with_dir("/data/arenas");
    let entry = entry(&system, settings());
    entry.load_all();

    let value = arena("Repeat", 1);
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    entry.reference().subscribe(move |change| sink.lock().push(change.kind));

    assert!(entry.save_item("repeat", &value).is_success());
    let first = read(&system, "/data/arenas/repeat.yml");
    let first_hash = entry.item_meta("repeat").unwrap().hash;

    assert!(entry.save_item("repeat", &value).is_success());
    assert_eq!(read(&system, "/data/arenas/repeat.yml"), first);
    assert_eq!(entry.item_meta("repeat").unwrap().hash, first_hash);
    assert_eq!(*events.lock(), vec![ChangeKind::Added, ChangeKind::Modified]);
}

#[test]
fn test_unsafe_ids_are_rejected_without_touching_disk() {
    let system = MockSystem::new().with_file("/data/arenas/a.yml", b"name: A\n");
    let entry = entry(&system, settings());
    entry.load_all();
    let before = system.files();

    for id in ["", "../escape", "a/b", "a\\b", "a..b", "semi;colon"] {
        let saved = entry.save_item(id, &arena("Evil", 0));
        assert!(!saved.is_success(), "save accepted {id:?}");
        assert!(saved.message().unwrap().contains("Invalid item id"));

        let deleted = entry.delete_item(id);
        assert!(!deleted.is_success(), "delete accepted {id:?}");
    }

    assert_eq!(system.files(), before);
}

#[test]
fn test_delete_item() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yml", b"name: A\n")
        .with_file("/data/arenas/b.yml", b"name: B\n");
    let entry = entry(&system, settings());
    entry.load_all();

    let missing = entry.delete_item("missing");
    assert_eq!(missing.message(), Some("Item not found: missing"));

    let deleted = entry.delete_item("a").into_value().unwrap();
    assert_eq!(deleted.name, "A");
    assert!(!system.exists(Path::new("/data/arenas/a.yml")));
    assert_eq!(entry.snapshot().ids(), ["b"]);
}

#[test]
fn test_delete_removes_ignored_twin() {
    let system = MockSystem::new()
        .with_file("/data/arenas/a.yaml", b"name: From yaml\n")
        .with_file("/data/arenas/a.yml", b"name: From yml\n");
    let entry = entry(&system, settings());
    entry.load_all();

    assert!(entry.delete_item("a").is_success());
    assert!(!system.exists(Path::new("/data/arenas/a.yaml")));
    assert!(!system.exists(Path::new("/data/arenas/a.yml")));
    assert!(entry.reload_all().is_empty());
    assert!(entry.snapshot().is_empty());
}

#[test]
fn test_save_rejects_excluded_ids() {
    let system = MockSystem::new().with_dir("/data/arenas");
    let entry = entry(&system, settings());
    entry.load_all();

    let saved = entry.save_item("_draft", &arena("Draft", 0));
    assert!(!saved.is_success());
    assert!(saved.message().unwrap().contains("excluded prefix"));
    assert!(!entry.create_item("_draft", &arena("Draft", 0)).is_success());

    assert!(system.files().is_empty());
    assert!(entry.snapshot().is_empty());
    assert!(entry.reload_all().is_empty());
}

#[test]
fn test_uppercase_extension_is_tracked_by_single_item_paths() {
    let system = MockSystem::new().with_file("/data/arenas/dunes.YML", b"name: Dunes\n");
    let entry = entry(&system, settings());
    entry.load_all();
    assert!(entry.snapshot().contains("dunes"));

    assert!(entry.reload_item("dunes").is_none());
    assert!(entry.snapshot().contains("dunes"));

    system.write(Path::new("/data/arenas/dunes.YML"), b"name: Dunes 2\n").unwrap();
    let change = entry.reload_item("dunes").unwrap();
    assert_eq!(change.kind, ChangeKind::Modified);

    assert!(entry.save_item("dunes", &arena("Dunes 3", 0)).is_success());
    assert_eq!(system.files(), vec![Path::new("/data/arenas/dunes.YML").to_path_buf()]);
    assert!(read(&system, "/data/arenas/dunes.YML").contains("Dunes 3"));

    assert!(entry.delete_item("dunes").is_success());
    assert!(system.files().is_empty());
}

#[test]
fn test_save_fails_when_value_cannot_be_written() {
    #[derive(Default)]
    struct Opaque;

    #[derive(Default)]
    struct Holder {
        name: String,
        opaque: Opaque,
    }

    impl Bindable for Holder {
        fn schema() -> Schema<Self> {
            Schema::new()
                .field(Field::new("name", |h: &Self| &h.name, |h: &mut Self| &mut h.name))
                .field(Field::new("opaque", |h: &Self| &h.opaque, |h: &mut Self| &mut h.opaque))
        }
    }

    let system = MockSystem::new().with_dir("/data/holders");
    let entry: CollectionEntry<Holder> = CollectionEntry::new(
        Arc::new(system.clone()),
        Arc::new(Binder::default()),
        CollectionSettings::new("holders", "/data/holders"),
    );

    let result = entry.save_item("h", &Holder::default());
    assert!(!result.is_success());
    assert_eq!(result.errors().len(), 1);
    assert!(!system.exists(Path::new("/data/holders/h.yml")));
}

#[test]
fn test_id_field_setting() {
    let system = MockSystem::new().with_file("/data/arenas/dunes.yml", b"priority: 1\n");
    let entry = entry(&system, settings().with_id_field("name"));
    entry.load_all();

    let dunes = entry.snapshot().find("dunes").unwrap();
    assert_eq!(dunes.name, "dunes");
    assert_eq!(dunes.id, "");
}

#[test]
fn test_copy_item_is_independent() {
    let system = MockSystem::new().with_file("/data/arenas/a.yml", b"name: A\n");
    let entry = entry(&system, settings());
    entry.load_all();

    let original = entry.snapshot().find("a").unwrap();
    let mut copy = entry.copy_item(&original).unwrap();
    copy.name.push_str(" (copy)");

    assert_eq!(original.name, "A");
    assert_eq!(copy.name, "A (copy)");
}

#[test]
fn test_listener_panic_does_not_block_others() {
    let system = MockSystem::new().with_dir("/data/arenas");
    let entry = entry(&system, settings());
    entry.load_all();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let reference = entry.reference();
    reference.subscribe(|_| panic!("broken listener"));
    let sink = Arc::clone(&seen);
    reference.subscribe(move |change| sink.lock().push(change.id.clone()));

    system.write(Path::new("/data/arenas/x.yml"), b"name: X\n").unwrap();
    system.write(Path::new("/data/arenas/y.yml"), b"name: Y\n").unwrap();
    let changes = entry.reload_all();

    assert_eq!(changes.len(), 2);
    assert_eq!(*seen.lock(), vec!["x".to_owned(), "y".to_owned()]);
}

#[test]
fn test_listeners_see_published_snapshot() {
    let system = MockSystem::new().with_dir("/data/arenas");
    let entry = Arc::new(entry(&system, settings()));
    entry.load_all();

    let observed = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&observed);
    let reader = Arc::clone(&entry);
    entry.reference().subscribe(move |change| {
        *sink.lock() = Some(reader.snapshot().contains(&change.id));
    });

    assert!(entry.save_item("fresh", &arena("Fresh", 0)).is_success());
    assert_eq!(*observed.lock(), Some(true));
}

#[test]
fn test_initialize_seeds_defaults_into_new_folder() {
    let system = MockSystem::new();
    let resources = EmbeddedResources::new()
        .with_file(
            "defaults/arenas/index.txt",
            b"# shipped arenas\nstarter.yml\n../escape.yml\nmissing.yml\n",
        )
        .with_file("defaults/arenas/starter.yml", b"name: Starter\n");
    let entry = entry(&system, settings().with_resource("defaults/arenas")).with_resources(Arc::new(resources));

    entry.initialize();

    assert!(system.is_dir(Path::new("/data/arenas")));
    assert_eq!(system.files(), vec![Path::new("/data/arenas/starter.yml").to_path_buf()]);
    assert_eq!(entry.snapshot().find("starter").unwrap().name, "Starter");
}

#[test]
fn test_initialize_leaves_populated_folder_alone() {
    let system = MockSystem::new().with_file("/data/arenas/mine.yml", b"name: Mine\n");
    let resources = EmbeddedResources::new()
        .with_file("defaults/index.txt", b"starter.yml\n")
        .with_file("defaults/starter.yml", b"name: Starter\n");
    let entry = entry(&system, settings().with_resource("defaults")).with_resources(Arc::new(resources));

    entry.initialize();

    assert_eq!(entry.snapshot().ids(), ["mine"]);
    assert!(!system.exists(Path::new("/data/arenas/starter.yml")));
}
