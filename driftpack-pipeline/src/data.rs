//! Pipeline configuration data types.
//!
//! These are plain value types: a layer is immutable once built, and the
//! merged output ([`PipelineData`]) is a flat, serializable snapshot.

use driftpack_types::DocRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Id and type of the implicit source element present in every merged
/// pipeline.
pub const SOURCE_ELEMENT_ID: &str = "Source";
pub const SOURCE_ELEMENT_TYPE: &str = "Source";

/// Behavioral roles an element type declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    /// The element originates the stream; nothing links into it.
    Source,
    /// The element can have outbound links.
    HasTargets,
    /// Shown without configuration detail in simple views.
    SimpleVisibility,
}

/// One processing element in a pipeline graph, identified by a unique id.
///
/// Two elements sharing an id within a merge must share a type; the merger
/// rejects the stack otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineElement {
    pub id: String,
    #[serde(rename = "type")]
    pub element_type: String,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub roles: BTreeSet<ElementRole>,
}

impl PipelineElement {
    #[must_use]
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            roles: BTreeSet::new(),
        }
    }

    /// The implicit `Source` element injected when no layer defines one.
    #[must_use]
    pub fn source() -> Self {
        Self {
            id: SOURCE_ELEMENT_ID.to_string(),
            element_type: SOURCE_ELEMENT_TYPE.to_string(),
            roles: BTreeSet::from([
                ElementRole::Source,
                ElementRole::HasTargets,
                ElementRole::SimpleVisibility,
            ]),
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i64),
    String(String),
    /// A reference to another document (a feed, an index, ...).
    Entity(DocRef),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

/// A property on an element, keyed by (element id, property name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineProperty {
    pub element_id: String,
    pub name: String,
    pub value: PropertyValue,
}

impl PipelineProperty {
    #[must_use]
    pub fn new(
        element_id: impl Into<String>,
        name: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            element_id: element_id.into(),
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named reference from an element to another document.
///
/// References accumulate across layers into an ordered, value-deduplicated
/// list per (element id, reference name).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineReference {
    pub element_id: String,
    pub name: String,
    pub value: DocRef,
}

impl PipelineReference {
    #[must_use]
    pub fn new(element_id: impl Into<String>, name: impl Into<String>, value: DocRef) -> Self {
        Self {
            element_id: element_id.into(),
            name: name.into(),
            value,
        }
    }
}

/// A directed edge between two elements.
///
/// After a merge every element has at most one inbound link.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PipelineLink {
    pub from: String,
    pub to: String,
}

impl PipelineLink {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// One source document's contribution to a merged pipeline: added and
/// removed elements, properties, references, and links.
///
/// Layers are immutable once built; construct them with the `add_*` /
/// `remove_*` builder methods and hand the finished stack to
/// [`crate::PipelineMerger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineLayer {
    /// The document this layer came from, recorded as provenance on merged
    /// values.
    pub source: DocRef,
    pub(crate) elements_added: Vec<PipelineElement>,
    pub(crate) elements_removed: Vec<PipelineElement>,
    pub(crate) properties_added: Vec<PipelineProperty>,
    pub(crate) properties_removed: Vec<PipelineProperty>,
    pub(crate) references_added: Vec<PipelineReference>,
    pub(crate) references_removed: Vec<PipelineReference>,
    pub(crate) links_added: Vec<PipelineLink>,
    pub(crate) links_removed: Vec<PipelineLink>,
}

impl PipelineLayer {
    #[must_use]
    pub fn new(source: DocRef) -> Self {
        Self {
            source,
            elements_added: Vec::new(),
            elements_removed: Vec::new(),
            properties_added: Vec::new(),
            properties_removed: Vec::new(),
            references_added: Vec::new(),
            references_removed: Vec::new(),
            links_added: Vec::new(),
            links_removed: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_element(mut self, element: PipelineElement) -> Self {
        self.elements_added.push(element);
        self
    }

    #[must_use]
    pub fn remove_element(mut self, element: PipelineElement) -> Self {
        self.elements_removed.push(element);
        self
    }

    #[must_use]
    pub fn add_property(mut self, property: PipelineProperty) -> Self {
        self.properties_added.push(property);
        self
    }

    #[must_use]
    pub fn remove_property(mut self, property: PipelineProperty) -> Self {
        self.properties_removed.push(property);
        self
    }

    #[must_use]
    pub fn add_reference(mut self, reference: PipelineReference) -> Self {
        self.references_added.push(reference);
        self
    }

    #[must_use]
    pub fn remove_reference(mut self, reference: PipelineReference) -> Self {
        self.references_removed.push(reference);
        self
    }

    #[must_use]
    pub fn add_link(mut self, link: PipelineLink) -> Self {
        self.links_added.push(link);
        self
    }

    #[must_use]
    pub fn remove_link(mut self, link: PipelineLink) -> Self {
        self.links_removed.push(link);
        self
    }
}

/// The flattened result of a merge: every element, property, reference, and
/// link of the effective pipeline, in deterministic order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineData {
    pub elements: Vec<PipelineElement>,
    pub properties: Vec<PipelineProperty>,
    pub references: Vec<PipelineReference>,
    pub links: Vec<PipelineLink>,
}
