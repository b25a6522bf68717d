//! Export: serializing a slice of the hierarchy onto disk.

use crate::file_name::{MAX_FILE_NAME_LENGTH, file_prefix, to_safe_file_name};
use crate::node_file::{NODE_EXTENSION, NodeFile};
use crate::serializer::ContentSerializer;
use crate::summary::ExportSummary;
use crate::{ContentError, ContentResult};
use driftpack_explorer::ExplorerNode;
use driftpack_types::{DocRef, Message, Severity};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

impl ContentSerializer<'_> {
    /// Exports documents to `dir` as a descriptor tree.
    ///
    /// `doc_refs` selects the roots to export (`None` exports everything
    /// below the hierarchy root); each root is expanded to its full
    /// descendant set, filtered by view permission and the ignored type
    /// set. Directories mirror folder names, sanitized and length-capped.
    /// Per-document failures are collected into the summary without
    /// stopping the rest of the export.
    pub fn write(
        &mut self,
        dir: &Path,
        doc_refs: Option<&BTreeSet<DocRef>>,
        types_to_ignore: &BTreeSet<String>,
        omit_audit: bool,
    ) -> ContentResult<ExportSummary> {
        debug!(dir = %dir.display(), "exporting content tree");

        let expanded = self.expand_doc_refs(doc_refs, types_to_ignore);
        if expanded.is_empty() {
            return Err(ContentError::NoDocumentsToExport);
        }

        let mut summary = ExportSummary::default();
        // Keyed by node identity, not path: two documents sharing an
        // ancestor only get that ancestor's directory and descriptor once.
        let mut visited_folders: BTreeSet<String> = BTreeSet::new();

        for doc_ref in &expanded {
            match self.export_doc(dir, doc_ref, omit_audit, &mut visited_folders, &mut summary) {
                Ok(()) => {
                    summary.add_success(&doc_ref.doc_type);
                    self.event_log.export_document(doc_ref, None);
                }
                Err(error) => {
                    summary.add_failure(&doc_ref.doc_type);
                    summary.add_message(
                        Severity::Error,
                        format!("error exporting '{doc_ref}': {error}"),
                    );
                    self.event_log
                        .export_document(doc_ref, Some(&error.to_string()));
                }
            }
        }

        Ok(summary)
    }

    /// Expands the requested roots into every exportable descendant,
    /// including handler-reported externally-owned documents.
    fn expand_doc_refs(
        &self,
        doc_refs: Option<&BTreeSet<DocRef>>,
        types_to_ignore: &BTreeSet<String>,
    ) -> BTreeSet<DocRef> {
        let mut expanded = BTreeSet::new();
        match doc_refs {
            None => self.add_descendants(&self.tree.root().doc_ref.clone(), types_to_ignore, &mut expanded),
            Some(set) => {
                for doc_ref in set {
                    if types_to_ignore.contains(&doc_ref.doc_type) {
                        continue;
                    }
                    self.add_doc_ref(doc_ref, &mut expanded);
                    self.add_descendants(doc_ref, types_to_ignore, &mut expanded);
                }
            }
        }
        expanded
    }

    fn add_descendants(
        &self,
        parent: &DocRef,
        types_to_ignore: &BTreeSet<String>,
        out: &mut BTreeSet<DocRef>,
    ) {
        for child in self.tree.children(parent) {
            if types_to_ignore.contains(&child.doc_ref.doc_type) {
                continue;
            }
            self.add_doc_ref(&child.doc_ref, out);
            if child.is_folder() {
                self.add_descendants(&child.doc_ref.clone(), types_to_ignore, out);
            }
        }
    }

    /// Adds one reference, plus any externally-owned documents its handler
    /// reports, view permission allowing. Folders are always placeable;
    /// other types need a registered handler.
    fn add_doc_ref(&self, doc_ref: &DocRef, out: &mut BTreeSet<DocRef>) {
        if !self.permissions.has_view(doc_ref) {
            debug!(doc = %doc_ref, "no view permission; excluding from export");
            return;
        }
        if doc_ref.is_folder() {
            out.insert(doc_ref.clone());
            return;
        }
        if let Some(handler) = self.registry.get(&doc_ref.doc_type) {
            out.insert(doc_ref.clone());
            for associated in handler.associated_doc_refs(doc_ref) {
                if self.permissions.has_view(&associated) {
                    out.insert(associated);
                }
            }
        } else {
            warn!(doc = %doc_ref, "no handler; excluding from export");
        }
    }

    /// Exports one document: directory chain, folder descriptors, the
    /// document's own descriptor, and its handler payload files.
    fn export_doc(
        &mut self,
        dir: &Path,
        doc_ref: &DocRef,
        omit_audit: bool,
        visited_folders: &mut BTreeSet<String>,
        summary: &mut ExportSummary,
    ) -> ContentResult<()> {
        // Externally-owned documents export at their nearest hierarchy
        // location, under their handler-provided name.
        let handler = self.registry.get(&doc_ref.doc_type);
        let (location_ref, export_ref) = match handler.and_then(|h| h.owner_lookup()) {
            Some(owner) => {
                let nearest = owner
                    .nearest_explorer_ref(doc_ref)
                    .ok_or_else(|| ContentError::MissingOwner(doc_ref.to_string()))?;
                let export_name = owner.export_name(doc_ref).or_else(|| doc_ref.name.clone());
                let export_ref = DocRef {
                    doc_type: doc_ref.doc_type.clone(),
                    uuid: doc_ref.uuid.clone(),
                    name: export_name,
                };
                (nearest, export_ref)
            }
            None => {
                // Prefer the node's current name over the caller-supplied one.
                let current = self
                    .tree
                    .get_node(doc_ref)
                    .map(|node| node.doc_ref.clone())
                    .unwrap_or_else(|| doc_ref.clone());
                (current.clone(), current)
            }
        };

        let folder_chain: Vec<ExplorerNode> = self
            .tree
            .get_path(&location_ref)
            .into_iter()
            .filter(|node| node.is_folder())
            .cloned()
            .collect();

        let mut parent_dir = dir.to_path_buf();
        let mut ancestor_names: Vec<String> = Vec::new();
        for folder in &folder_chain {
            self.export_folder(&parent_dir, folder, &ancestor_names, visited_folders)?;
            parent_dir = parent_dir.join(to_safe_file_name(folder.name(), MAX_FILE_NAME_LENGTH));
            if !parent_dir.is_dir() {
                fs::create_dir_all(&parent_dir)?;
            }
            ancestor_names.push(folder.name().to_string());
        }

        if export_ref.is_folder() {
            // A folder selected directly: its own descriptor and directory.
            if let Some(node) = self.tree.get_node(&export_ref) {
                let node = node.clone();
                self.export_folder(&parent_dir, &node, &ancestor_names, visited_folders)?;
            }
            return Ok(());
        }

        // The document's descriptor, with the tags its node carries.
        let tags = self
            .tree
            .get_node(&export_ref)
            .map(|node| node.tags.clone())
            .unwrap_or_default();
        let node_file = NodeFile::from_doc(&export_ref, ancestor_names.join("/"), tags);
        let descriptor_path = parent_dir.join(format!("{}{NODE_EXTENSION}", file_prefix(&export_ref)));
        node_file.write(&descriptor_path)?;

        // The payload companion files.
        let handler = handler.ok_or_else(|| ContentError::MissingHandler(doc_ref.doc_type.clone()))?;
        let mut messages: Vec<Message> = Vec::new();
        let data = handler.export_document(doc_ref, omit_audit, &mut messages)?;
        summary.extend_messages(messages);

        for (key, bytes) in data {
            let file_path = parent_dir.join(format!("{}.{key}", file_prefix(&export_ref)));
            write_payload(&file_path, &bytes)?;
        }

        Ok(())
    }

    /// Writes a folder's descriptor (once per node) into its parent
    /// directory.
    fn export_folder(
        &self,
        parent_dir: &Path,
        folder: &ExplorerNode,
        ancestor_names: &[String],
        visited_folders: &mut BTreeSet<String>,
    ) -> ContentResult<()> {
        if !visited_folders.insert(folder.doc_ref.uuid.clone()) {
            return Ok(());
        }
        if !self.permissions.has_view(&folder.doc_ref) {
            return Ok(());
        }
        let node_file = NodeFile::from_doc(
            &folder.doc_ref,
            ancestor_names.join("/"),
            folder.tags.clone(),
        );
        let descriptor_path: PathBuf =
            parent_dir.join(format!("{}{NODE_EXTENSION}", file_prefix(&folder.doc_ref)));
        if !parent_dir.is_dir() {
            fs::create_dir_all(parent_dir)?;
        }
        node_file.write(&descriptor_path)?;
        Ok(())
    }
}

/// Writes payload bytes, appending a trailing newline when the content
/// lacks one.
fn write_payload(path: &Path, bytes: &[u8]) -> ContentResult<()> {
    if bytes.last() == Some(&b'\n') {
        fs::write(path, bytes)?;
    } else {
        let mut owned = bytes.to_vec();
        owned.push(b'\n');
        fs::write(path, owned)?;
    }
    Ok(())
}
