use driftpack_content::{ContentSerializer, NodeFile, RecordingEventLog};
use driftpack_explorer::{DocumentPermissions, ExplorerTree, PermitAll};
use driftpack_model::{
    Document, DocumentStore, HandlerRegistry, ImportHandler, ImportMode, ImportSettings,
    ImportState, JsonDocumentHandler, ModelError, ModelResult, OwnerLookup, State,
};
use driftpack_types::{DocRef, FOLDER_TYPE, Message};
use pretty_assertions::assert_eq;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// One side of an import/export run: handlers, store, tree, audit log.
struct Fixture {
    registry: HandlerRegistry,
    store: Arc<DocumentStore>,
    tree: ExplorerTree,
    permissions: Box<dyn DocumentPermissions>,
    log: RecordingEventLog,
}

impl Fixture {
    fn new(doc_types: &[&str]) -> Self {
        let store = Arc::new(DocumentStore::new());
        let mut registry = HandlerRegistry::new();
        for doc_type in doc_types {
            registry.register(Box::new(JsonDocumentHandler::new(*doc_type, store.clone())));
        }
        Self {
            registry,
            store,
            tree: ExplorerTree::new(),
            permissions: Box::new(PermitAll),
            log: RecordingEventLog::new(),
        }
    }

    fn read(
        &mut self,
        dir: &Path,
        states: &mut Vec<ImportState>,
        settings: &ImportSettings,
    ) -> BTreeSet<DocRef> {
        let mut serializer = ContentSerializer::new(
            &self.registry,
            &mut self.tree,
            self.permissions.as_ref(),
            &self.log,
        );
        serializer.read(dir, states, settings).unwrap()
    }

    fn write_all(&mut self, dir: &Path) -> driftpack_content::ExportSummary {
        let mut serializer = ContentSerializer::new(
            &self.registry,
            &mut self.tree,
            self.permissions.as_ref(),
            &self.log,
        );
        serializer.write(dir, None, &BTreeSet::new(), false).unwrap()
    }

    /// Seeds a folder chain and returns the deepest folder's reference.
    fn seed_folders(&mut self, names: &[&str]) -> DocRef {
        let mut parent = self.tree.root().doc_ref.clone();
        for (index, name) in names.iter().enumerate() {
            let folder = DocRef::new(FOLDER_TYPE, format!("folder-{index}-{name}"), *name);
            self.tree
                .create_node(folder.clone(), &parent, BTreeSet::new())
                .unwrap();
            parent = folder;
        }
        parent
    }

    /// Seeds a document into both the store and the tree.
    fn seed_doc(&mut self, doc_ref: &DocRef, parent: &DocRef, data: serde_json::Value) {
        self.store.put(Document::new(doc_ref, data));
        self.tree
            .create_node(doc_ref.clone(), parent, BTreeSet::new())
            .unwrap();
    }
}

/// Writes a descriptor plus json payload into `dir` (flat layout; the
/// importer follows the descriptor's `path` key, not the directory shape).
fn write_doc(dir: &Path, doc_ref: &DocRef, path_key: &str, data: serde_json::Value) {
    let prefix = driftpack_content::file_prefix(doc_ref);
    NodeFile::from_doc(doc_ref, path_key, BTreeSet::new())
        .write(&dir.join(format!("{prefix}.node")))
        .unwrap();
    let document = Document::new(doc_ref, data);
    fs::write(
        dir.join(format!("{prefix}.json")),
        serde_json::to_vec_pretty(&document).unwrap(),
    )
    .unwrap();
}

fn write_folder(dir: &Path, doc_ref: &DocRef, path_key: &str) {
    let prefix = driftpack_content::file_prefix(doc_ref);
    NodeFile::from_doc(doc_ref, path_key, BTreeSet::new())
        .write(&dir.join(format!("{prefix}.node")))
        .unwrap();
}

// ── Round trip ───────────────────────────────────────────────────

#[test]
fn export_then_import_reproduces_documents() {
    let mut source = Fixture::new(&["Feed", "Pipeline"]);
    let feeds = source.seed_folders(&["Reference", "Feeds"]);
    let reference = source.tree.get_path(&feeds)[1].doc_ref.clone();
    let feed = DocRef::new("Feed", "feed-1", "Raw Events");
    let pipeline = DocRef::new("Pipeline", "pipe-1", "Events");
    source.seed_doc(&feed, &feeds, serde_json::json!({"retention": 30}));
    source.seed_doc(&pipeline, &reference, serde_json::json!({"layers": 2}));

    let export_dir = TempDir::new().unwrap();
    let summary = source.write_all(export_dir.path());
    assert_eq!(summary.failure_count(), 0);

    let mut target = Fixture::new(&["Feed", "Pipeline"]);
    let mut states = Vec::new();
    let touched = target.read(export_dir.path(), &mut states, &ImportSettings::apply_all());

    // Same documents, same identity.
    assert!(touched.contains(&feed));
    assert!(touched.contains(&pipeline));
    assert_eq!(target.store.get("feed-1").unwrap().name, "Raw Events");
    assert_eq!(
        target.store.get("feed-1").unwrap().data,
        serde_json::json!({"retention": 30})
    );

    // Same placement, folder uuids included.
    assert_eq!(target.tree.parent_path(&feed), "Reference/Feeds");
    assert_eq!(target.tree.parent_path(&pipeline), "Reference");
    assert!(target.tree.get_node(&feeds).is_some());

    // No errors reported anywhere.
    for state in &states {
        assert!(!state.has_errors(), "errors on {:?}", state.doc_ref);
    }
}

#[test]
fn export_mirrors_folders_and_appends_trailing_newline() {
    let mut source = Fixture::new(&["Feed"]);
    let folder = source.seed_folders(&["Ops Data"]);
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    source.seed_doc(&feed, &folder, serde_json::json!({}));

    let export_dir = TempDir::new().unwrap();
    source.write_all(export_dir.path());

    let payload = export_dir.path().join("Ops Data/Raw.Feed.feed-1.json");
    let bytes = fs::read(&payload).unwrap();
    assert_eq!(bytes.last(), Some(&b'\n'));

    let descriptor =
        NodeFile::read(&export_dir.path().join("Ops Data/Raw.Feed.feed-1.node")).unwrap();
    assert_eq!(descriptor.path, "Ops Data");

    // The folder has its own descriptor in the parent directory.
    let folder_node = NodeFile::read(
        &export_dir
            .path()
            .join(format!("{}.node", driftpack_content::file_prefix(&folder))),
    )
    .unwrap();
    assert_eq!(folder_node.doc_type, FOLDER_TYPE);
}

// ── Rename / move precedence ─────────────────────────────────────

#[test]
fn rename_without_move() {
    let mut fixture = Fixture::new(&["Feed"]);
    let folder = fixture.seed_folders(&["Feeds"]);
    let feed = DocRef::new("Feed", "feed-1", "Old Name");
    fixture.seed_doc(&feed, &folder, serde_json::json!({}));

    let import_dir = TempDir::new().unwrap();
    let renamed = feed.with_name("New Name");
    write_doc(import_dir.path(), &renamed, "Feeds", serde_json::json!({}));

    let settings = ImportSettings {
        import_mode: ImportMode::IgnoreConfirmation,
        use_import_names: true,
        use_import_folders: false,
        root_doc_ref: None,
    };
    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &settings);

    let node = fixture.tree.get_node(&feed).unwrap();
    assert_eq!(node.name(), "New Name");
    // Parent unchanged.
    assert_eq!(fixture.tree.parent_path(&feed), "Feeds");
}

#[test]
fn descriptor_path_wins_when_use_import_folders() {
    let mut fixture = Fixture::new(&["Feed"]);
    let folder = fixture.seed_folders(&["Old Home"]);
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    fixture.seed_doc(&feed, &folder, serde_json::json!({}));

    let import_dir = TempDir::new().unwrap();
    write_doc(import_dir.path(), &feed, "New Home", serde_json::json!({}));

    let settings = ImportSettings {
        import_mode: ImportMode::IgnoreConfirmation,
        use_import_folders: true,
        ..ImportSettings::default()
    };
    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &settings);

    assert_eq!(fixture.tree.parent_path(&feed), "New Home");
}

#[test]
fn existing_location_kept_when_not_using_import_folders() {
    let mut fixture = Fixture::new(&["Feed"]);
    let folder = fixture.seed_folders(&["Old Home"]);
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    fixture.seed_doc(&feed, &folder, serde_json::json!({"v": 1}));

    let import_dir = TempDir::new().unwrap();
    write_doc(import_dir.path(), &feed, "New Home", serde_json::json!({"v": 2}));

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::apply_all());

    // Document updated but left where it was; descriptor folder not created.
    assert_eq!(fixture.tree.parent_path(&feed), "Old Home");
    assert_eq!(
        fixture.store.get("feed-1").unwrap().data,
        serde_json::json!({"v": 2})
    );
    assert!(fixture.tree.children_by_name(&fixture.tree.root().doc_ref.clone(), "New Home").is_empty());
}

// ── Confirmation modes ───────────────────────────────────────────

#[test]
fn preview_reports_new_without_writing() {
    let mut fixture = Fixture::new(&["Feed"]);
    let import_dir = TempDir::new().unwrap();
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    write_doc(import_dir.path(), &feed, "Feeds", serde_json::json!({}));

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::preview());

    assert_eq!(states.len(), 1);
    assert_eq!(states[0].state, Some(State::New));
    assert_eq!(states[0].dest_path.as_deref(), Some("Feeds/Raw"));
    assert!(fixture.store.is_empty());
    assert_eq!(fixture.tree.len(), 1);
}

#[test]
fn action_pass_applies_only_ticked_items() {
    let mut fixture = Fixture::new(&["Feed"]);
    let import_dir = TempDir::new().unwrap();
    let wanted = DocRef::new("Feed", "feed-1", "Wanted");
    let unwanted = DocRef::new("Feed", "feed-2", "Unwanted");
    write_doc(import_dir.path(), &wanted, "", serde_json::json!({}));
    write_doc(import_dir.path(), &unwanted, "", serde_json::json!({}));

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::preview());
    assert_eq!(states.len(), 2);

    for state in &mut states {
        state.action = state.doc_ref == wanted;
    }

    let settings = ImportSettings {
        import_mode: ImportMode::ActionConfirmation,
        ..ImportSettings::default()
    };
    fixture.read(import_dir.path(), &mut states, &settings);

    assert!(fixture.store.exists("feed-1"));
    assert!(!fixture.store.exists("feed-2"));
    // The skipped item's record is dropped from the state list.
    assert!(states.iter().all(|s| s.doc_ref != unwanted));
}

// ── Permissions ──────────────────────────────────────────────────

/// Denies document creation inside any folder named "Secret".
struct DenySecretFolder;

impl DocumentPermissions for DenySecretFolder {
    fn has_view(&self, _doc_ref: &DocRef) -> bool {
        true
    }
    fn has_edit(&self, _doc_ref: &DocRef) -> bool {
        true
    }
    fn has_create(&self, parent: &DocRef, _child_type: &str) -> bool {
        parent.name.as_deref() != Some("Secret")
    }
}

#[test]
fn permission_denial_records_error_and_walk_continues() {
    let mut fixture = Fixture::new(&["Feed"]);
    fixture.permissions = Box::new(DenySecretFolder);

    let import_dir = TempDir::new().unwrap();
    let allowed = DocRef::new("Feed", "feed-1", "Allowed");
    let denied = DocRef::new("Feed", "feed-2", "Denied");
    write_doc(import_dir.path(), &allowed, "", serde_json::json!({}));
    write_doc(import_dir.path(), &denied, "Secret", serde_json::json!({}));

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::apply_all());

    assert!(fixture.store.exists("feed-1"));
    assert!(!fixture.store.exists("feed-2"));

    let denied_state = states.iter().find(|s| s.doc_ref == denied).unwrap();
    assert!(denied_state.has_errors());
    assert!(
        denied_state.messages[0].text.contains("permission"),
        "unexpected message: {}",
        denied_state.messages[0].text
    );
}

// ── Folder uuid drift ────────────────────────────────────────────

#[test]
fn folder_descriptor_reuses_same_named_folder_with_other_uuid() {
    let mut fixture = Fixture::new(&["Feed"]);
    let existing_folder = fixture.seed_folders(&["Reference"]);

    let import_dir = TempDir::new().unwrap();
    let descriptor_folder = DocRef::new(FOLDER_TYPE, "regenerated-uuid", "Reference");
    write_folder(import_dir.path(), &descriptor_folder, "");
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    write_doc(import_dir.path(), &feed, "Reference", serde_json::json!({}));

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::apply_all());

    // No second "Reference" folder appeared.
    let root = fixture.tree.root().doc_ref.clone();
    assert_eq!(fixture.tree.children_by_name(&root, "Reference").len(), 1);
    assert!(fixture.tree.get_node(&descriptor_folder).is_none());
    // The feed landed under the original folder.
    assert!(fixture.tree.get_node(&existing_folder).is_some());
    assert_eq!(fixture.tree.parent_path(&feed), "Reference");
}

// ── Re-rooting ───────────────────────────────────────────────────

#[test]
fn root_doc_ref_reroots_descriptor_paths() {
    let mut fixture = Fixture::new(&["Feed"]);
    let target = fixture.seed_folders(&["Target"]);

    let import_dir = TempDir::new().unwrap();
    let feed = DocRef::new("Feed", "feed-1", "Raw");
    write_doc(import_dir.path(), &feed, "Sub", serde_json::json!({}));

    let settings = ImportSettings {
        import_mode: ImportMode::IgnoreConfirmation,
        root_doc_ref: Some(target.clone()),
        ..ImportSettings::default()
    };
    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &settings);

    assert_eq!(fixture.tree.parent_path(&feed), "Target/Sub");
}

// ── Externally-owned documents ───────────────────────────────────

/// Handler for processor-filter-like documents owned by a pipeline.
struct FilterHandler {
    store: Arc<DocumentStore>,
}

impl ImportHandler for FilterHandler {
    fn doc_type(&self) -> &str {
        "ProcessorFilter"
    }

    fn import_document(
        &self,
        doc_ref: &DocRef,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ModelResult<DocRef> {
        let bytes = data.get("json").ok_or_else(|| ModelError::MissingPayload {
            doc_ref: doc_ref.to_string(),
            key: "json".to_string(),
        })?;
        let document: Document = serde_json::from_slice(bytes)?;
        if settings.ok(state) {
            self.store.put(document);
        }
        Ok(doc_ref.clone())
    }

    fn export_document(
        &self,
        doc_ref: &DocRef,
        _omit_audit: bool,
        _messages: &mut Vec<Message>,
    ) -> ModelResult<BTreeMap<String, Vec<u8>>> {
        let document = self.store.require(doc_ref)?;
        Ok(BTreeMap::from([(
            "json".to_string(),
            serde_json::to_vec_pretty(&document)?,
        )]))
    }

    fn owner_lookup(&self) -> Option<&dyn OwnerLookup> {
        Some(self)
    }
}

impl OwnerLookup for FilterHandler {
    fn owner_document(
        &self,
        _doc_ref: &DocRef,
        data: &BTreeMap<String, Vec<u8>>,
    ) -> Option<DocRef> {
        let document: Document = serde_json::from_slice(data.get("json")?).ok()?;
        let owner = document.data.get("owner")?.as_str()?.to_string();
        Some(DocRef::unnamed("Pipeline", owner))
    }

    fn nearest_explorer_ref(&self, doc_ref: &DocRef) -> Option<DocRef> {
        let document = self.store.get(&doc_ref.uuid)?;
        let owner = document.data.get("owner")?.as_str()?.to_string();
        Some(DocRef::unnamed("Pipeline", owner))
    }

    fn export_name(&self, _doc_ref: &DocRef) -> Option<String> {
        Some("Filter".to_string())
    }
}

#[test]
fn owned_document_imports_at_owner_location_without_a_node() {
    let mut fixture = Fixture::new(&["Pipeline"]);
    let filter_store = Arc::new(DocumentStore::new());
    fixture.registry.register(Box::new(FilterHandler {
        store: filter_store.clone(),
    }));

    let pipelines = fixture.seed_folders(&["Pipelines"]);
    let pipeline = DocRef::new("Pipeline", "pipe-1", "Events");
    fixture.seed_doc(&pipeline, &pipelines, serde_json::json!({}));

    let import_dir = TempDir::new().unwrap();
    let filter = DocRef::unnamed("ProcessorFilter", "filter-1");
    let prefix = driftpack_content::file_prefix(&filter);
    NodeFile::from_doc(&filter, "Anywhere", BTreeSet::new())
        .write(&import_dir.path().join(format!("{prefix}.node")))
        .unwrap();
    let payload = Document::new(&filter, serde_json::json!({"owner": "pipe-1", "priority": 10}));
    fs::write(
        import_dir.path().join(format!("{prefix}.json")),
        serde_json::to_vec_pretty(&payload).unwrap(),
    )
    .unwrap();

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::apply_all());

    // The payload was imported, but no hierarchy node was created for it.
    assert!(filter_store.exists("filter-1"));
    assert!(fixture.tree.get_node(&filter).is_none());

    // Source and destination are disambiguated with the filter's identity,
    // and the destination tracks the owner's real location.
    let state = states
        .iter()
        .find(|s| s.doc_ref.uuid == "filter-1")
        .unwrap();
    assert!(state.source_path.ends_with("- (ProcessorFilter filter-1)"));
    assert_eq!(
        state.dest_path.as_deref(),
        Some("Pipelines/Events - (ProcessorFilter filter-1)")
    );
}

#[test]
fn owned_document_exports_at_nearest_explorer_location() {
    let mut fixture = Fixture::new(&["Pipeline"]);
    let filter_store = Arc::new(DocumentStore::new());
    fixture.registry.register(Box::new(FilterHandler {
        store: filter_store.clone(),
    }));

    let pipelines = fixture.seed_folders(&["Pipelines"]);
    let pipeline = DocRef::new("Pipeline", "pipe-1", "Events");
    fixture.seed_doc(&pipeline, &pipelines, serde_json::json!({}));

    let filter = DocRef::unnamed("ProcessorFilter", "filter-1");
    filter_store.put(Document::new(
        &filter,
        serde_json::json!({"owner": "pipe-1", "priority": 10}),
    ));

    let export_dir = TempDir::new().unwrap();
    let mut serializer = ContentSerializer::new(
        &fixture.registry,
        &mut fixture.tree,
        fixture.permissions.as_ref(),
        &fixture.log,
    );
    let summary = serializer
        .write(
            export_dir.path(),
            Some(&BTreeSet::from([filter.clone()])),
            &BTreeSet::new(),
            true,
        )
        .unwrap();
    assert_eq!(summary.failure_count(), 0);

    // The filter lands in the owning pipeline's folder under its handler
    // name, alongside its payload.
    let descriptor = export_dir
        .path()
        .join("Pipelines/Filter.ProcessorFilter.filter-1.node");
    let node = NodeFile::read(&descriptor).unwrap();
    assert_eq!(node.path, "Pipelines");
    assert_eq!(node.name.as_deref(), Some("Filter"));
    assert!(
        export_dir
            .path()
            .join("Pipelines/Filter.ProcessorFilter.filter-1.json")
            .is_file()
    );
}

// ── Legacy trees ─────────────────────────────────────────────────

/// Feed handler for legacy payloads: raw XML under the `xml` suffix.
struct XmlFeedHandler {
    store: Arc<DocumentStore>,
}

impl ImportHandler for XmlFeedHandler {
    fn doc_type(&self) -> &str {
        "Feed"
    }

    fn import_document(
        &self,
        doc_ref: &DocRef,
        data: &BTreeMap<String, Vec<u8>>,
        state: &mut ImportState,
        settings: &ImportSettings,
    ) -> ModelResult<DocRef> {
        let bytes = data.get("xml").ok_or_else(|| ModelError::MissingPayload {
            doc_ref: doc_ref.to_string(),
            key: "xml".to_string(),
        })?;
        if settings.ok(state) {
            let content = String::from_utf8_lossy(bytes).into_owned();
            self.store.put(Document::new(
                doc_ref,
                serde_json::json!({"xml": content}),
            ));
        }
        Ok(doc_ref.clone())
    }

    fn export_document(
        &self,
        doc_ref: &DocRef,
        _omit_audit: bool,
        _messages: &mut Vec<Message>,
    ) -> ModelResult<BTreeMap<String, Vec<u8>>> {
        let document = self.store.require(doc_ref)?;
        let content = document
            .data
            .get("xml")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        Ok(BTreeMap::from([(
            "xml".to_string(),
            content.as_bytes().to_vec(),
        )]))
    }
}

#[test]
fn legacy_tree_imports_like_a_canonical_one() {
    let mut fixture = Fixture::new(&[]);
    let store = Arc::new(DocumentStore::new());
    fixture
        .registry
        .register(Box::new(XmlFeedHandler { store: store.clone() }));

    // A pre-descriptor export: bare name.Type.xml files, uuid and name
    // embedded in the XML.
    let import_dir = TempDir::new().unwrap();
    let sub = import_dir.path().join("Reference");
    fs::create_dir(&sub).unwrap();
    fs::write(
        sub.join("Raw.Feed.xml"),
        "<feed><uuid>legacy-1</uuid><name>Raw Events</name></feed>\n",
    )
    .unwrap();

    let mut states = Vec::new();
    fixture.read(import_dir.path(), &mut states, &ImportSettings::apply_all());

    let feed = DocRef::new("Feed", "legacy-1", "Raw Events");
    assert!(store.exists("legacy-1"));
    assert_eq!(fixture.tree.parent_path(&feed), "Reference");
    for state in &states {
        assert!(!state.has_errors());
    }
}
