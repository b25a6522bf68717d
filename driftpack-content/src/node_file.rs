//! `.node` descriptor files.
//!
//! One descriptor per document: `uuid`, `type`, `name`, `path` (slash-joined
//! ancestor folder names, no leading slash), optional `tags`, optional
//! `version` marker distinguishing format generations.

use crate::{ContentError, ContentResult, properties};
use driftpack_types::DocRef;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Extension of descriptor files.
pub const NODE_EXTENSION: &str = ".node";

/// Version marker written by current exports.
pub const V2_VERSION: &str = "V2";

const UUID_KEY: &str = "uuid";
const TYPE_KEY: &str = "type";
const NAME_KEY: &str = "name";
const PATH_KEY: &str = "path";
const TAGS_KEY: &str = "tags";
const VERSION_KEY: &str = "version";
const TAG_DELIMITER: &str = ",";

/// The parsed identity record of one serialized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFile {
    pub uuid: String,
    pub doc_type: String,
    /// Absent for nameless documents such as processor filters.
    pub name: Option<String>,
    /// Slash-joined ancestor folder names.
    pub path: String,
    pub tags: BTreeSet<String>,
    pub version: Option<String>,
}

impl NodeFile {
    /// Builds a descriptor for a document at the given hierarchy path.
    #[must_use]
    pub fn from_doc(doc_ref: &DocRef, path: impl Into<String>, tags: BTreeSet<String>) -> Self {
        Self {
            uuid: doc_ref.uuid.clone(),
            doc_type: doc_ref.doc_type.clone(),
            name: doc_ref.name.clone(),
            path: path.into(),
            tags,
            version: Some(V2_VERSION.to_string()),
        }
    }

    /// The reference this descriptor names.
    #[must_use]
    pub fn doc_ref(&self) -> DocRef {
        DocRef {
            doc_type: self.doc_type.clone(),
            uuid: self.uuid.clone(),
            name: self.name.clone(),
        }
    }

    /// Reads and validates a descriptor file. `uuid` and `type` are
    /// required; everything else is optional.
    pub fn read(file: &Path) -> ContentResult<Self> {
        let properties = properties::read(&fs::read(file)?);
        let require = |key: &str| -> ContentResult<String> {
            properties
                .get(key)
                .cloned()
                .ok_or_else(|| ContentError::NodeFile {
                    path: file.display().to_string(),
                    reason: format!("missing '{key}'"),
                })
        };

        Ok(Self {
            uuid: require(UUID_KEY)?,
            doc_type: require(TYPE_KEY)?,
            name: properties.get(NAME_KEY).cloned(),
            path: properties.get(PATH_KEY).cloned().unwrap_or_default(),
            tags: properties
                .get(TAGS_KEY)
                .map(|raw| parse_tags(raw))
                .unwrap_or_default(),
            version: properties.get(VERSION_KEY).cloned(),
        })
    }

    /// Writes the descriptor to a file.
    pub fn write(&self, file: &Path) -> ContentResult<()> {
        let mut properties = BTreeMap::new();
        properties.insert(UUID_KEY.to_string(), self.uuid.clone());
        properties.insert(TYPE_KEY.to_string(), self.doc_type.clone());
        if let Some(name) = &self.name {
            properties.insert(NAME_KEY.to_string(), name.clone());
        }
        properties.insert(PATH_KEY.to_string(), self.path.clone());
        if !self.tags.is_empty() {
            properties.insert(
                TAGS_KEY.to_string(),
                self.tags.iter().cloned().collect::<Vec<_>>().join(TAG_DELIMITER),
            );
        }
        if let Some(version) = &self.version {
            properties.insert(VERSION_KEY.to_string(), version.clone());
        }
        fs::write(file, properties::write(&properties))?;
        Ok(())
    }
}

fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Raw.Feed.u1.node");
        let node = NodeFile::from_doc(
            &DocRef::new("Feed", "u1", "Raw"),
            "Reference/Feeds",
            BTreeSet::from(["ingest".to_string(), "reference".to_string()]),
        );
        node.write(&file).unwrap();

        let back = NodeFile::read(&file).unwrap();
        assert_eq!(back, node);
        assert_eq!(back.version.as_deref(), Some(V2_VERSION));
    }

    #[test]
    fn missing_uuid_is_rejected() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("bad.node");
        std::fs::write(&file, b"type=Feed\nname=Raw\n").unwrap();
        let err = NodeFile::read(&file).unwrap_err();
        assert!(matches!(err, ContentError::NodeFile { .. }));
    }

    #[test]
    fn nameless_descriptor_round_trips() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("f.node");
        let node = NodeFile::from_doc(
            &DocRef::unnamed("ProcessorFilter", "u9"),
            "Pipelines",
            BTreeSet::new(),
        );
        node.write(&file).unwrap();
        let back = NodeFile::read(&file).unwrap();
        assert!(back.name.is_none());
        assert_eq!(back.doc_ref(), DocRef::unnamed("ProcessorFilter", "u9"));
    }
}
