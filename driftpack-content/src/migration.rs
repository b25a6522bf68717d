//! Legacy export migration.
//!
//! Exports made before descriptor files existed hold bare `*.<Type>.xml`
//! files with the document's uuid and name embedded in the XML itself.
//! When a tree contains no `.node` file at all, this pass synthesizes the
//! descriptors and renames the data files to the canonical
//! `name.type.uuid.*` convention, so the main import can treat the tree
//! like any other. Everything here is best effort: failures are logged and
//! skipped, never fatal.

use crate::file_name::file_prefix;
use crate::node_file::{NODE_EXTENSION, NodeFile};
use driftpack_types::DocRef;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LEGACY_EXTENSION: &str = "xml";

/// Migrates a legacy tree in place. A no-op when the tree already contains
/// descriptors.
pub fn migrate(dir: &Path) {
    if has_node_files(dir) {
        return;
    }
    info!(dir = %dir.display(), "no descriptors found; migrating legacy export tree");
    migrate_dir(dir, dir);
}

fn has_node_files(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if has_node_files(&path) {
                return true;
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(NODE_EXTENSION))
        {
            return true;
        }
    }
    false
}

fn migrate_dir(root: &Path, dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            warn!(dir = %dir.display(), %error, "cannot read directory during migration");
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
    paths.sort();

    for path in paths {
        if path.is_dir() {
            migrate_dir(root, &path);
        } else {
            migrate_file(root, dir, &path);
        }
    }
}

/// Handles one candidate legacy file: `<base>.<Type>.xml`.
fn migrate_file(root: &Path, dir: &Path, file: &Path) {
    let Some(name) = file.file_name().and_then(|n| n.to_str()) else {
        return;
    };
    let parts: Vec<&str> = name.split('.').collect();
    // Canonical files have four segments (name.type.uuid.ext); legacy data
    // files have exactly three.
    if parts.len() != 3 || parts[2] != LEGACY_EXTENSION {
        return;
    }
    let (base, doc_type) = (parts[0], parts[1]);

    let content = match fs::read_to_string(file) {
        Ok(content) => content,
        Err(error) => {
            warn!(file = %file.display(), %error, "cannot read legacy file; skipping");
            return;
        }
    };
    let Some(uuid) = extract_tag(&content, "uuid") else {
        debug!(file = %file.display(), "no embedded uuid; not a legacy document file");
        return;
    };
    let doc_name = extract_tag(&content, "name").unwrap_or_else(|| base.to_string());

    let doc_ref = DocRef::new(doc_type, uuid, doc_name);
    let prefix = file_prefix(&doc_ref);

    // Rename the data file to the canonical convention.
    let renamed = dir.join(format!("{prefix}.{LEGACY_EXTENSION}"));
    if renamed != file {
        if let Err(error) = fs::rename(file, &renamed) {
            warn!(file = %file.display(), %error, "cannot rename legacy file; skipping");
            return;
        }
    }

    // Synthesize the descriptor beside it.
    let rel_path = relative_path(root, dir);
    let node_file = NodeFile::from_doc(&doc_ref, rel_path, BTreeSet::new());
    let descriptor = dir.join(format!("{prefix}{NODE_EXTENSION}"));
    if let Err(error) = node_file.write(&descriptor) {
        warn!(file = %descriptor.display(), %error, "cannot write synthesized descriptor");
    } else {
        debug!(doc = %doc_ref, file = %descriptor.display(), "synthesized descriptor");
    }
}

/// Extracts the text between `<tag>` and `</tag>` by plain substring scan.
/// Legacy payloads embedded these fields as simple one-line elements.
fn extract_tag(content: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = content.find(&open)? + open.len();
    let end = content[start..].find(&close)? + start;
    let value = content[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn relative_path(root: &Path, dir: &Path) -> String {
    dir.strip_prefix(root)
        .unwrap_or(Path::new(""))
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn legacy_xml(uuid: &str, name: &str) -> String {
        format!("<feed>\n  <uuid>{uuid}</uuid>\n  <name>{name}</name>\n</feed>\n")
    }

    #[test]
    fn synthesizes_descriptor_and_renames() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("Reference");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("Raw.Feed.xml"), legacy_xml("u1", "Raw Events")).unwrap();

        migrate(dir.path());

        let descriptor = sub.join("Raw Events.Feed.u1.node");
        let node = NodeFile::read(&descriptor).unwrap();
        assert_eq!(node.uuid, "u1");
        assert_eq!(node.doc_type, "Feed");
        assert_eq!(node.name.as_deref(), Some("Raw Events"));
        assert_eq!(node.path, "Reference");

        assert!(sub.join("Raw Events.Feed.u1.xml").is_file());
        assert!(!sub.join("Raw.Feed.xml").exists());
    }

    #[test]
    fn tree_with_descriptors_is_untouched() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Raw.Feed.u1.node"), b"uuid=u1\ntype=Feed\n").unwrap();
        fs::write(dir.path().join("Old.Feed.xml"), legacy_xml("u2", "Old")).unwrap();

        migrate(dir.path());

        // The legacy file is left alone because the tree already has a
        // descriptor somewhere.
        assert!(dir.path().join("Old.Feed.xml").is_file());
    }

    #[test]
    fn file_without_uuid_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("notes.Feed.xml"), "<feed><name>x</name></feed>").unwrap();
        migrate(dir.path());
        assert!(dir.path().join("notes.Feed.xml").is_file());
    }

    #[test]
    fn name_falls_back_to_file_base() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("Fallback.Feed.xml"),
            "<feed><uuid>u3</uuid></feed>",
        )
        .unwrap();
        migrate(dir.path());
        assert!(dir.path().join("Fallback.Feed.u3.node").is_file());
    }
}
