//! CLI command implementations

use super::args::{Args, Command, ListArgs, OutputFormat};
use super::document::{Document, document_binder};
use crate::collection::{CollectionEntry, CollectionSettings};
use crate::error::ConfigError;
use crate::node::{ConfigNode, hash, yaml};
use crate::system::System;
use crate::utils::path::{extension_rank, is_document_file, item_id};
use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Run the parsed command against `system`, printing results to stdout
pub fn run(args: &Args, system: Arc<dyn System>) -> Result<()> {
    match &args.command {
        Command::List(list) => {
            let format = list
                .format
                .parse::<OutputFormat>()
                .map_err(ConfigError::configuration)?;
            let items = list_items(list, system)?;
            println!("{}", render_items(&items, format)?);
            Ok(())
        }
        Command::Hash { file } => {
            let document = yaml::load(system.as_ref(), file)?;
            println!("{}", hash::sha256(&ConfigNode::root(&document)));
            Ok(())
        }
        Command::Canonical { file } => {
            let document = yaml::load(system.as_ref(), file)?;
            println!("{}", hash::canonicalize(&ConfigNode::root(&document)));
            Ok(())
        }
        Command::Check {
            folder,
            exclude_prefix,
        } => check_folder(system.as_ref(), folder, exclude_prefix),
    }
}

/// One line of `foldconf list` output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedItem {
    pub id: String,
    pub file: String,
    pub hash: String,
    pub enabled: bool,
}

/// Load a folder as a collection of raw documents
pub fn list_items(list: &ListArgs, system: Arc<dyn System>) -> Result<Vec<ListedItem>> {
    if !system.is_dir(&list.folder) {
        return Err(ConfigError::filesystem(format!(
            "Collection folder not found: {}",
            list.folder.display()
        ))
        .into());
    }

    let mut settings = CollectionSettings::new("cli", list.folder.clone()).with_exclude_prefix(&list.exclude_prefix);
    settings.order_by.clone_from(&list.order_by);
    settings.enabled_field.clone_from(&list.enabled_field);

    let entry = CollectionEntry::<Document>::new(system, Arc::new(document_binder()), settings);
    entry.load_all();
    let snapshot = entry.snapshot();

    let items = snapshot
        .entries()
        .filter_map(|(id, item)| {
            let enabled = snapshot.enabled().iter().any(|candidate| Arc::ptr_eq(candidate, item));
            if list.enabled_only && !enabled {
                return None;
            }
            let meta = entry.item_meta(id)?;
            Some(ListedItem {
                id: id.to_owned(),
                file: meta.file_name,
                hash: meta.hash,
                enabled,
            })
        })
        .collect();
    Ok(items)
}

/// Render listed items in the requested format
pub fn render_items(items: &[ListedItem], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(items)?),
        OutputFormat::Text => Ok(items
            .iter()
            .map(|item| {
                let marker = if item.enabled { "" } else { " (disabled)" };
                format!("{}  {}{marker}", item.id, item.hash)
            })
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// Parse every candidate document in `folder`, failing if any is broken
pub fn check_folder(system: &dyn System, folder: &Path, exclude_prefix: &str) -> Result<()> {
    if !system.is_dir(folder) {
        return Err(ConfigError::filesystem(format!("Collection folder not found: {}", folder.display())).into());
    }

    let mut files: Vec<PathBuf> = system
        .read_dir(folder)?
        .into_iter()
        .filter(|path| system.is_file(path) && is_document_file(path))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| exclude_prefix.is_empty() || !name.starts_with(exclude_prefix))
        })
        .collect();
    files.sort();

    let mut seen: HashMap<String, &Path> = HashMap::new();
    let mut failures = 0_usize;
    for path in &files {
        if let Some(id) = item_id(path) {
            if let Some(other) = seen.get(&id) {
                let (kept, ignored) = if extension_rank(other) <= extension_rank(path) {
                    (*other, path.as_path())
                } else {
                    (path.as_path(), *other)
                };
                warn!("{} is ignored: {} has precedence", ignored.display(), kept.display());
            }
            seen.entry(id).or_insert(path.as_path());
        }

        match yaml::load(system, path) {
            Ok(_) => println!("ok     {}", path.display()),
            Err(err) => {
                failures += 1;
                println!("error  {}: {err:#}", path.display());
            }
        }
    }

    if failures > 0 {
        return Err(ConfigError::configuration(format!(
            "{failures} of {} documents failed to load",
            files.len()
        ))
        .into());
    }

    info!("All {} documents loaded", files.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::MockSystem;

    fn list_args(folder: &str) -> ListArgs {
        ListArgs {
            folder: PathBuf::from(folder),
            order_by: None,
            enabled_field: None,
            exclude_prefix: "_".to_owned(),
            format: "text".to_owned(),
            enabled_only: false,
        }
    }

    fn system() -> Arc<dyn System> {
        Arc::new(
            MockSystem::new()
                .with_file("/arenas/a.yml", b"priority: 5\nenabled: true\n")
                .with_file("/arenas/b.yml", b"priority: 1\nenabled: false\n")
                .with_file("/arenas/c.yaml", b"priority: 3\n")
                .with_file("/arenas/_draft.yml", b"priority: 0\n")
                .with_file("/arenas/notes.txt", b"ignore me"),
        )
    }

    #[test]
    fn lists_in_file_order_by_default() {
        let items = list_items(&list_args("/arenas"), system()).unwrap();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(items.iter().all(|item| item.enabled));
        assert_eq!(items[2].file, "c.yaml");
    }

    #[test]
    fn orders_and_filters() {
        let mut args = list_args("/arenas");
        args.order_by = Some("priority".to_owned());
        args.enabled_field = Some("enabled".to_owned());

        let items = list_items(&args, system()).unwrap();
        let ids: Vec<&str> = items.iter().map(|item| item.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(!items[0].enabled);

        args.enabled_only = true;
        let enabled = list_items(&args, system()).unwrap();
        assert_eq!(enabled.len(), 2);
    }

    #[test]
    fn missing_folder_is_filesystem_error() {
        let err = list_items(&list_args("/nope"), system()).unwrap_err();
        assert_eq!(err.downcast_ref::<ConfigError>().unwrap().exit_code(), 5);
    }

    #[test]
    fn renders_text_and_json() {
        let items = vec![ListedItem {
            id: "a".to_owned(),
            file: "a.yml".to_owned(),
            hash: "abc".to_owned(),
            enabled: false,
        }];
        assert_eq!(render_items(&items, OutputFormat::Text).unwrap(), "a  abc (disabled)");
        let json = render_items(&items, OutputFormat::Json).unwrap();
        assert!(json.contains("\"file\": \"a.yml\""));
    }

    #[test]
    fn check_reports_broken_documents() {
        let system = MockSystem::new()
            .with_file("/kits/good.yml", b"a: 1\n")
            .with_file("/kits/bad.yml", b"a: [1\n");
        let err = check_folder(&system, Path::new("/kits"), "_").unwrap_err();
        assert!(err.to_string().contains("1 of 2 documents failed to load"));

        let clean = MockSystem::new().with_file("/kits/good.yml", b"a: 1\n");
        check_folder(&clean, Path::new("/kits"), "_").unwrap();
    }
}
