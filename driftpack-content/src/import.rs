//! Import: reconciling an on-disk descriptor tree into the live hierarchy.

use crate::file_name::file_prefix;
use crate::node_file::{NODE_EXTENSION, NodeFile};
use crate::serializer::ContentSerializer;
use crate::{ContentError, ContentResult, migration};
use driftpack_explorer::ExplorerNode;
use driftpack_model::{ImportHandler, ImportMode, ImportSettings, ImportState, State};
use driftpack_types::{DocRef, FOLDER_TYPE, Severity, append_path, split_path};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

const GIT_DIRECTORY: &str = ".git";

/// What happened to one descriptor.
enum Outcome {
    /// Processed (or previewed); the reference belongs in the touched set.
    Imported(DocRef),
    /// The import mode does not call for action on this item yet.
    Skipped(DocRef),
}

impl ContentSerializer<'_> {
    /// Reads a serialized content tree and reconciles it into the
    /// hierarchy.
    ///
    /// `import_states` carries per-item decisions between confirmation
    /// passes: it is keyed into a confirm map on entry and rebuilt from it
    /// on exit. Returns the references actually touched, always including
    /// the hierarchy root.
    pub fn read(
        &mut self,
        dir: &Path,
        import_states: &mut Vec<ImportState>,
        settings: &ImportSettings,
    ) -> ContentResult<BTreeSet<DocRef>> {
        debug!(dir = %dir.display(), mode = ?settings.import_mode, "importing content tree");

        if settings.import_mode == ImportMode::IgnoreConfirmation {
            import_states.clear();
        }

        // Pre-descriptor legacy trees get descriptors synthesized first.
        migration::migrate(dir);

        let mut confirm_map: BTreeMap<DocRef, ImportState> = import_states
            .drain(..)
            .map(|state| (state.doc_ref.clone(), state))
            .collect();

        let mut touched = BTreeSet::new();
        self.walk(dir, &mut confirm_map, settings, &mut touched);

        import_states.extend(confirm_map.into_values());
        touched.insert(self.tree.root().doc_ref.clone());
        Ok(touched)
    }

    /// Depth-first walk over the tree. One descriptor failing is logged and
    /// recorded but never stops the walk.
    fn walk(
        &mut self,
        dir: &Path,
        confirm_map: &mut BTreeMap<DocRef, ImportState>,
        settings: &ImportSettings,
        touched: &mut BTreeSet<DocRef>,
    ) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) => {
                error!(dir = %dir.display(), %error, "cannot read directory");
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries.flatten().map(|entry| entry.path()).collect();
        paths.sort();

        // Descriptors in this directory go first so that folder nodes exist
        // (with their exported uuids) before anything beneath them is
        // resolved by name.
        for path in paths.iter().filter(|p| !p.is_dir()) {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_name.ends_with(NODE_EXTENSION) && !file_name.starts_with('.') {
                match self.import_descriptor(path, confirm_map, settings) {
                    Ok(Some(doc_ref)) => {
                        touched.insert(doc_ref);
                    }
                    Ok(None) => {}
                    Err(error) => {
                        error!(file = %path.display(), %error, "failed to import descriptor; continuing");
                    }
                }
            }
        }

        for path in paths.iter().filter(|p| p.is_dir()) {
            let Some(dir_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if dir_name != GIT_DIRECTORY {
                self.walk(path, confirm_map, settings, touched);
            }
        }
    }

    /// Processes one `.node` descriptor.
    fn import_descriptor(
        &mut self,
        node_path: &Path,
        confirm_map: &mut BTreeMap<DocRef, ImportState>,
        settings: &ImportSettings,
    ) -> ContentResult<Option<DocRef>> {
        let node_file = NodeFile::read(node_path)?;
        let doc_ref = node_file.doc_ref();
        debug!(file = %node_path.display(), doc = %doc_ref, "read descriptor");

        let import_path = self.resolve_path(&node_file.path, settings);
        let source_path = append_path(&node_file.path, doc_ref.name_or_uuid());
        let mut state = confirm_map
            .remove(&doc_ref)
            .unwrap_or_else(|| ImportState::new(doc_ref.clone(), source_path));

        let data = match self.gather_payload(node_path, &doc_ref) {
            Ok(data) => data,
            Err(error) => {
                state.add_message(Severity::Error, error.to_string());
                confirm_map.insert(doc_ref, state);
                return Err(error);
            }
        };

        let handler = self.registry.get(&doc_ref.doc_type);
        let result = match handler {
            Some(h) => match h.owner_lookup() {
                Some(owner) => self.import_owned(
                    h, owner, &doc_ref, &node_file, &import_path, &data, &mut state, settings,
                ),
                None => self.import_explorer(
                    Some(h), &doc_ref, &node_file, &import_path, &data, &mut state, settings,
                ),
            },
            None => self.import_explorer(
                None, &doc_ref, &node_file, &import_path, &data, &mut state, settings,
            ),
        };

        match result {
            Ok(Outcome::Imported(imported)) => {
                confirm_map.insert(doc_ref, state);
                Ok(Some(imported))
            }
            Ok(Outcome::Skipped(skipped)) => {
                // Nothing to confirm for this item; drop its state.
                debug!(doc = %skipped, "import mode does not call for action; skipping");
                Ok(Some(skipped))
            }
            Err(ContentError::Permission(reason)) => {
                warn!(doc = %doc_ref, %reason, "permission denied");
                state.add_message(Severity::Error, &reason);
                confirm_map.insert(doc_ref, state);
                Ok(None)
            }
            Err(error) => {
                state.add_message(Severity::Error, error.to_string());
                self.event_log
                    .import_document(&doc_ref, Some(&error.to_string()));
                confirm_map.insert(doc_ref, state);
                Err(error)
            }
        }
    }

    /// Re-roots a descriptor path under the settings' root reference, when
    /// one is set and resolves to a known node.
    fn resolve_path(&self, path: &str, settings: &ImportSettings) -> String {
        let Some(root_ref) = &settings.root_doc_ref else {
            return path.to_string();
        };
        let Some(root_node) = self.tree.get_node(root_ref) else {
            return path.to_string();
        };
        if root_node.doc_ref.uuid == self.tree.root().doc_ref.uuid {
            return path.to_string();
        }
        let prefix = append_path(
            &self.tree.parent_path(&root_node.doc_ref),
            root_node.name(),
        );
        if path.is_empty() {
            prefix
        } else {
            append_path(&prefix, path)
        }
    }

    /// Gathers the companion files sharing the descriptor's filename
    /// prefix, keyed by suffix.
    fn gather_payload(
        &self,
        node_path: &Path,
        doc_ref: &DocRef,
    ) -> ContentResult<BTreeMap<String, Vec<u8>>> {
        let prefix = format!("{}.", file_prefix(doc_ref));
        let dir = node_path.parent().unwrap_or_else(|| Path::new("."));

        let mut data = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_file()
                && path != node_path
                && !name.starts_with('.')
                && name.starts_with(&prefix)
            {
                let key = name[prefix.len()..].to_string();
                if !key.is_empty() {
                    data.insert(key, fs::read(&path)?);
                }
            }
        }
        Ok(data)
    }

    /// Imports a document owned by another document. Its location is the
    /// owner's; no hierarchy node is created for it.
    #[allow(clippy::too_many_arguments)]
    fn import_owned(
        &mut self,
        handler: &dyn ImportHandler,
        owner: &dyn driftpack_model::OwnerLookup,
        doc_ref: &DocRef,
        node_file: &NodeFile,
        import_path: &str,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ContentResult<Outcome> {
        let owner_ref = owner
            .owner_document(doc_ref, data)
            .ok_or_else(|| ContentError::MissingOwner(doc_ref.to_string()))?;
        debug!(doc = %doc_ref, owner = %owner_ref, "importing externally-owned document");

        let mut dest_path = import_path.to_string();
        let mut dest_name = owner_ref.name_or_uuid().to_string();
        if let Some(node) = self.tree.get_node(&owner_ref) {
            if !settings.use_import_names {
                dest_name = node.name().to_string();
            }
            if !settings.use_import_folders {
                dest_path = self.tree.parent_path(&node.doc_ref);
            }
        }

        // Owned documents of one owner are disambiguated in confirmation
        // lists by their own type and uuid.
        let suffix = format!(" - ({} {})", doc_ref.doc_type, doc_ref.uuid);
        state.source_path = format!(
            "{}{suffix}",
            append_path(&node_file.path, owner_ref.name_or_uuid())
        );
        state.dest_path = Some(format!("{}{suffix}", append_path(&dest_path, &dest_name)));

        if should_invoke_handler(settings, state) {
            let imported = handler.import_document(doc_ref, data, state, settings)?;
            if settings.ok(state) {
                self.event_log.import_document(&imported, None);
            }
            Ok(Outcome::Imported(doc_ref.clone()))
        } else {
            Ok(Outcome::Skipped(doc_ref.clone()))
        }
    }

    /// Imports a hierarchy-resident document: decides NEW vs UPDATE,
    /// resolves the destination parent chain, invokes the handler, then
    /// creates, renames, and/or moves the node to match.
    #[allow(clippy::too_many_arguments)]
    fn import_explorer(
        &mut self,
        handler: Option<&dyn ImportHandler>,
        doc_ref: &DocRef,
        node_file: &NodeFile,
        import_path: &str,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ContentResult<Outcome> {
        // Uuid lookup first; for folders fall back to a name match so trees
        // exported before descriptors existed (with regenerated folder
        // uuids) still reconcile onto the same folders.
        let mut existing: Option<ExplorerNode> = self.tree.get_node(doc_ref).cloned();
        if existing.is_none() && doc_ref.is_folder() {
            existing = self.find_folder_by_name(import_path, doc_ref.name_or_uuid());
        }

        let doc_exists = existing.is_some();
        if doc_exists {
            if !self.permissions.has_edit(doc_ref) {
                return Err(ContentError::Permission(format!(
                    "you do not have permission to update '{doc_ref}'"
                )));
            }
            state.state = Some(State::Update);
        } else {
            state.state = Some(State::New);
        }

        let mut dest_path = import_path.to_string();
        let mut dest_name = doc_ref.name_or_uuid().to_string();
        let mut moving = false;
        if let Some(node) = &existing {
            let current_path = self.tree.parent_path(&node.doc_ref);
            if !settings.use_import_names {
                dest_name = node.name().to_string();
            }
            if !settings.use_import_folders {
                dest_path = current_path.clone();
            }
            moving = dest_path != current_path;
        }
        state.dest_path = Some(append_path(&dest_path, &dest_name));

        // New and moving documents need their destination parent chain,
        // with create permission checked at each level.
        let mut parent_ref: Option<DocRef> = None;
        if !doc_exists || moving {
            let parent = self.get_or_create_parent_folder(&dest_path, settings.ok(state))?;
            if !self.permissions.has_create(&parent, &doc_ref.doc_type) {
                return Err(ContentError::Permission(format!(
                    "you do not have permission to create '{doc_ref}' in '{parent}'"
                )));
            }
            parent_ref = Some(parent);
        }

        if !should_invoke_handler(settings, state) {
            return Ok(Outcome::Skipped(doc_ref.clone()));
        }

        let imported_ref = if doc_ref.is_folder() {
            // Folders carry no payload; the node itself is the document.
            match &existing {
                Some(node) => node.doc_ref.clone(),
                None => doc_ref.clone(),
            }
        } else {
            let handler = handler
                .ok_or_else(|| ContentError::MissingHandler(doc_ref.doc_type.clone()))?;
            handler.import_document(doc_ref, data, state, settings)?
        };

        if settings.ok(state) {
            match &existing {
                None => {
                    if let Some(parent) = &parent_ref {
                        self.tree
                            .create_node(imported_ref.clone(), parent, node_file.tags.clone())?;
                    }
                }
                Some(node) => {
                    let node_ref = node.doc_ref.clone();
                    self.tree.update_tags(&node_ref, node_file.tags.clone())?;
                    if settings.use_import_names
                        && let Some(name) = &doc_ref.name
                        && node.name() != name.as_str()
                    {
                        self.tree.rename(&node_ref, name.clone())?;
                    }
                    if moving && let Some(parent) = &parent_ref {
                        self.tree.move_node(&node_ref, parent)?;
                    }
                }
            }
            self.event_log.import_document(&imported_ref, None);
        }

        Ok(Outcome::Imported(imported_ref))
    }

    /// Resolves an existing folder by walking the path's names from the
    /// root; `None` as soon as any segment is missing.
    fn find_folder_by_name(&self, path: &str, name: &str) -> Option<ExplorerNode> {
        let mut parent = self.tree.root().doc_ref.clone();
        for segment in split_path(path) {
            let next = self
                .tree
                .children_by_name(&parent, segment)
                .into_iter()
                .find(|n| n.is_folder())
                .map(|n| n.doc_ref.clone())?;
            parent = next;
        }
        self.tree
            .children_by_name(&parent, name)
            .into_iter()
            .find(|n| n.is_folder())
            .cloned()
    }

    /// Walks the destination path, reusing existing folders by name and
    /// creating missing ones (when `create` holds). Create permission is
    /// verified for every level that would need creating, so a preview pass
    /// surfaces permission problems without touching the tree.
    fn get_or_create_parent_folder(
        &mut self,
        path: &str,
        create: bool,
    ) -> ContentResult<DocRef> {
        let mut parent = self.tree.root().doc_ref.clone();
        let segments: Vec<String> = split_path(path).map(str::to_string).collect();
        for segment in segments {
            let found = self
                .tree
                .children_by_name(&parent, &segment)
                .into_iter()
                .find(|n| n.is_folder())
                .map(|n| n.doc_ref.clone());
            match found {
                Some(folder) => parent = folder,
                None => {
                    if !self.permissions.has_create(&parent, FOLDER_TYPE) {
                        return Err(ContentError::Permission(format!(
                            "you do not have permission to create a folder in '{parent}'"
                        )));
                    }
                    if create {
                        let folder = DocRef::generate(FOLDER_TYPE, &segment);
                        self.tree.create_node(folder.clone(), &parent, BTreeSet::new())?;
                        parent = folder;
                    }
                }
            }
        }
        Ok(parent)
    }
}

/// Whether this run should invoke the handler for this item at all: both
/// confirmation-free and preview runs do (the preview is a validating dry
/// run), the apply pass only for ticked items.
fn should_invoke_handler(settings: &ImportSettings, state: &ImportState) -> bool {
    matches!(
        settings.import_mode,
        ImportMode::CreateConfirmation | ImportMode::IgnoreConfirmation
    ) || (state.action && state.state != Some(State::Ignore))
}
