//! The in-memory hierarchy service.

use crate::{ExplorerError, ExplorerNode, ExplorerResult};
use driftpack_types::{DocRef, SYSTEM_TYPE};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Uuid of the fixed hierarchy root.
pub const ROOT_UUID: &str = "0";

#[derive(Debug, Clone)]
struct NodeEntry {
    node: ExplorerNode,
    /// Parent uuid; `None` only for the root.
    parent: Option<String>,
}

/// The live folder tree. Nodes are keyed by uuid so lookups survive
/// renames; parent relations are per-entry lookups, not ownership.
///
/// The reconciler creates, renames, and moves nodes but never destroys
/// them; deletion is a separate concern handled elsewhere.
#[derive(Debug, Clone)]
pub struct ExplorerTree {
    nodes: BTreeMap<String, NodeEntry>,
}

impl ExplorerTree {
    /// Creates a tree holding only the `System` root.
    #[must_use]
    pub fn new() -> Self {
        let root = ExplorerNode::new(DocRef::new(SYSTEM_TYPE, ROOT_UUID, "System"));
        let mut nodes = BTreeMap::new();
        nodes.insert(
            ROOT_UUID.to_string(),
            NodeEntry {
                node: root,
                parent: None,
            },
        );
        Self { nodes }
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> &ExplorerNode {
        // The root is inserted in new() and never removed.
        &self.nodes[ROOT_UUID].node
    }

    /// Looks a node up by the reference's uuid. The reference's name is
    /// deliberately ignored so renamed documents are still found.
    #[must_use]
    pub fn get_node(&self, doc_ref: &DocRef) -> Option<&ExplorerNode> {
        self.nodes.get(&doc_ref.uuid).map(|entry| &entry.node)
    }

    /// The ancestors of a node, root first, excluding the node itself.
    /// Empty when the node is unknown or is the root.
    #[must_use]
    pub fn get_path(&self, doc_ref: &DocRef) -> Vec<&ExplorerNode> {
        let mut path = Vec::new();
        let Some(mut entry) = self.nodes.get(&doc_ref.uuid) else {
            return path;
        };
        while let Some(parent_uuid) = &entry.parent {
            let Some(parent) = self.nodes.get(parent_uuid) else {
                break;
            };
            path.push(&parent.node);
            entry = parent;
        }
        path.reverse();
        path
    }

    /// The slash-joined folder path of a node, excluding the root segment.
    #[must_use]
    pub fn parent_path(&self, doc_ref: &DocRef) -> String {
        self.get_path(doc_ref)
            .iter()
            .filter(|node| node.doc_ref.uuid != ROOT_UUID)
            .map(|node| node.name())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Direct children of a node, sorted by name then uuid.
    #[must_use]
    pub fn children(&self, parent: &DocRef) -> Vec<&ExplorerNode> {
        let mut children: Vec<&ExplorerNode> = self
            .nodes
            .values()
            .filter(|entry| entry.parent.as_deref() == Some(parent.uuid.as_str()))
            .map(|entry| &entry.node)
            .collect();
        children.sort_by(|a, b| a.name().cmp(b.name()).then(a.doc_ref.uuid.cmp(&b.doc_ref.uuid)));
        children
    }

    /// Direct children with the given name.
    #[must_use]
    pub fn children_by_name(&self, parent: &DocRef, name: &str) -> Vec<&ExplorerNode> {
        self.children(parent)
            .into_iter()
            .filter(|node| node.name() == name)
            .collect()
    }

    /// Every node below the given one (or below the root when `None`),
    /// depth first.
    #[must_use]
    pub fn descendants(&self, doc_ref: Option<&DocRef>) -> Vec<&ExplorerNode> {
        let start = doc_ref
            .map(|r| r.uuid.clone())
            .unwrap_or_else(|| ROOT_UUID.to_string());
        let mut result = Vec::new();
        self.collect_descendants(&start, &mut result);
        result
    }

    fn collect_descendants<'a>(&'a self, uuid: &str, out: &mut Vec<&'a ExplorerNode>) {
        let parent_ref = match self.nodes.get(uuid) {
            Some(entry) => entry.node.doc_ref.clone(),
            None => return,
        };
        for child in self.children(&parent_ref) {
            out.push(child);
            self.collect_descendants(&child.doc_ref.uuid, out);
        }
    }

    /// Creates a node under a parent.
    pub fn create_node(
        &mut self,
        doc_ref: DocRef,
        parent: &DocRef,
        tags: BTreeSet<String>,
    ) -> ExplorerResult<()> {
        if doc_ref.uuid == ROOT_UUID {
            return Err(ExplorerError::RootImmutable);
        }
        if self.nodes.contains_key(&doc_ref.uuid) {
            return Err(ExplorerError::Duplicate(doc_ref.uuid));
        }
        if !self.nodes.contains_key(&parent.uuid) {
            return Err(ExplorerError::NotFound(parent.to_string()));
        }
        debug!(node = %doc_ref, parent = %parent, "creating hierarchy node");
        self.nodes.insert(
            doc_ref.uuid.clone(),
            NodeEntry {
                node: ExplorerNode::with_tags(doc_ref, tags),
                parent: Some(parent.uuid.clone()),
            },
        );
        Ok(())
    }

    /// Renames a node in place.
    pub fn rename(&mut self, doc_ref: &DocRef, new_name: impl Into<String>) -> ExplorerResult<()> {
        if doc_ref.uuid == ROOT_UUID {
            return Err(ExplorerError::RootImmutable);
        }
        let entry = self
            .nodes
            .get_mut(&doc_ref.uuid)
            .ok_or_else(|| ExplorerError::NotFound(doc_ref.to_string()))?;
        let new_name = new_name.into();
        debug!(node = %entry.node.doc_ref, new_name = %new_name, "renaming hierarchy node");
        entry.node.doc_ref.name = Some(new_name);
        Ok(())
    }

    /// Moves a node under a new parent.
    pub fn move_node(&mut self, doc_ref: &DocRef, new_parent: &DocRef) -> ExplorerResult<()> {
        if doc_ref.uuid == ROOT_UUID {
            return Err(ExplorerError::RootImmutable);
        }
        if !self.nodes.contains_key(&doc_ref.uuid) {
            return Err(ExplorerError::NotFound(doc_ref.to_string()));
        }
        if !self.nodes.contains_key(&new_parent.uuid) {
            return Err(ExplorerError::NotFound(new_parent.to_string()));
        }
        // Reject moves into the node's own subtree.
        let mut cursor = Some(new_parent.uuid.clone());
        while let Some(uuid) = cursor {
            if uuid == doc_ref.uuid {
                return Err(ExplorerError::MoveIntoSelf(doc_ref.to_string()));
            }
            cursor = self.nodes.get(&uuid).and_then(|e| e.parent.clone());
        }

        debug!(node = %doc_ref, new_parent = %new_parent, "moving hierarchy node");
        if let Some(entry) = self.nodes.get_mut(&doc_ref.uuid) {
            entry.parent = Some(new_parent.uuid.clone());
        }
        Ok(())
    }

    /// Replaces a node's tags.
    pub fn update_tags(&mut self, doc_ref: &DocRef, tags: BTreeSet<String>) -> ExplorerResult<()> {
        let entry = self
            .nodes
            .get_mut(&doc_ref.uuid)
            .ok_or_else(|| ExplorerError::NotFound(doc_ref.to_string()))?;
        entry.node.tags = tags;
        Ok(())
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for ExplorerTree {
    fn default() -> Self {
        Self::new()
    }
}
