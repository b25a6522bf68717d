//! Folds an ordered stack of pipeline layers into one effective pipeline.

use crate::data::{
    PipelineData, PipelineElement, PipelineLayer, PipelineLink, PipelineProperty,
    PipelineReference, SOURCE_ELEMENT_ID,
};
use crate::{MergeResult, PipelineMergeError};
use driftpack_types::DocRef;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Merges pipeline layer stacks.
///
/// Stateless entry point: each call builds its own context, merges, and
/// returns the result, so there is no cross-call state to leak.
pub struct PipelineMerger;

impl PipelineMerger {
    /// Merges `layers` in priority order (later layers win).
    ///
    /// Fails only when an element id is redefined with a conflicting type;
    /// dangling properties, references, and links are dropped.
    pub fn merge(layers: &[PipelineLayer]) -> MergeResult<MergedPipeline> {
        let mut ctx = MergeContext::default();
        ctx.merge_elements(layers)?;
        ctx.merge_properties(layers);
        ctx.merge_references(layers);
        ctx.merge_links(layers);
        ctx.attach_source();
        Ok(ctx.finish())
    }
}

/// Per-merge working state. Built, filled by the four passes, then
/// converted into the read-only [`MergedPipeline`].
#[derive(Default)]
struct MergeContext {
    elements: BTreeMap<String, PipelineElement>,
    properties: BTreeMap<String, BTreeMap<String, PipelineProperty>>,
    property_sources: BTreeMap<(String, String), DocRef>,
    references: BTreeMap<String, BTreeMap<String, Vec<PipelineReference>>>,
    reference_sources: BTreeMap<PipelineReference, DocRef>,
    links: BTreeMap<String, Vec<PipelineLink>>,
    /// Whether any layer added an element literally named `Source`, even if
    /// a later layer removed it again.
    source_supplied: bool,
}

impl MergeContext {
    /// Pass 1: elements. Later layers may re-add an element with the same
    /// type (skipped) but not with a different one (error). Removals only
    /// touch the running map.
    fn merge_elements(&mut self, layers: &[PipelineLayer]) -> MergeResult<()> {
        for layer in layers {
            for element in &layer.elements_added {
                if element.id == SOURCE_ELEMENT_ID {
                    self.source_supplied = true;
                }
                match self.elements.get(&element.id) {
                    None => {
                        self.elements.insert(element.id.clone(), element.clone());
                    }
                    Some(existing) if existing.element_type == element.element_type => {}
                    Some(existing) => {
                        return Err(PipelineMergeError::ElementTypeConflict {
                            id: element.id.clone(),
                            existing: existing.element_type.clone(),
                            incoming: element.element_type.clone(),
                        });
                    }
                }
            }
            for element in &layer.elements_removed {
                self.elements.remove(&element.id);
            }
        }

        if !self.source_supplied {
            self.elements
                .entry(SOURCE_ELEMENT_ID.to_string())
                .or_insert_with(PipelineElement::source);
        }
        Ok(())
    }

    /// Pass 2: properties. Keyed by (element, name); later layers replace
    /// earlier values, removals delete the key so a later layer may re-add
    /// it. Properties of undefined elements are dropped.
    fn merge_properties(&mut self, layers: &[PipelineLayer]) {
        for layer in layers {
            for property in &layer.properties_added {
                if !self.element_defined(&property.element_id) {
                    debug!(
                        element = %property.element_id,
                        property = %property.name,
                        "dropping property of undefined element"
                    );
                    continue;
                }
                self.properties
                    .entry(property.element_id.clone())
                    .or_default()
                    .insert(property.name.clone(), property.clone());
                self.property_sources.insert(
                    (property.element_id.clone(), property.name.clone()),
                    layer.source.clone(),
                );
            }
            for property in &layer.properties_removed {
                if let Some(by_name) = self.properties.get_mut(&property.element_id) {
                    by_name.remove(&property.name);
                    if by_name.is_empty() {
                        self.properties.remove(&property.element_id);
                    }
                }
                self.property_sources
                    .remove(&(property.element_id.clone(), property.name.clone()));
            }
        }
    }

    /// Pass 3: references. Ordered list per (element, name), deduplicated
    /// by value; provenance is recorded for the layer that first added each
    /// value.
    fn merge_references(&mut self, layers: &[PipelineLayer]) {
        for layer in layers {
            for reference in &layer.references_added {
                if !self.element_defined(&reference.element_id) {
                    debug!(
                        element = %reference.element_id,
                        reference = %reference.name,
                        "dropping reference of undefined element"
                    );
                    continue;
                }
                let list = self
                    .references
                    .entry(reference.element_id.clone())
                    .or_default()
                    .entry(reference.name.clone())
                    .or_default();
                if !list.contains(reference) {
                    list.push(reference.clone());
                    self.reference_sources
                        .insert(reference.clone(), layer.source.clone());
                }
            }
            for reference in &layer.references_removed {
                if let Some(by_name) = self.references.get_mut(&reference.element_id) {
                    if let Some(list) = by_name.get_mut(&reference.name) {
                        list.retain(|r| r != reference);
                        if list.is_empty() {
                            by_name.remove(&reference.name);
                        }
                    }
                    if by_name.is_empty() {
                        self.references.remove(&reference.element_id);
                    }
                }
                self.reference_sources.remove(reference);
            }
        }
    }

    /// Pass 4: links. All adds are gathered into one candidate list with
    /// removals struck out by value as each layer is folded in, links with
    /// an undefined endpoint are dropped, and targets are then deduplicated
    /// once for the whole merge: the first link listed for a target wins
    /// and later ones are discarded.
    fn merge_links(&mut self, layers: &[PipelineLayer]) {
        let mut candidates: Vec<PipelineLink> = Vec::new();
        for layer in layers {
            candidates.extend(layer.links_added.iter().cloned());
            for removed in &layer.links_removed {
                candidates.retain(|link| link != removed);
            }
        }

        candidates.retain(|link| {
            let keep = self.element_defined(&link.from) && self.element_defined(&link.to);
            if !keep {
                debug!(from = %link.from, to = %link.to, "dropping link with undefined endpoint");
            }
            keep
        });

        let mut claimed_targets = BTreeSet::new();
        for link in candidates {
            if claimed_targets.insert(link.to.clone()) {
                self.links.entry(link.from.clone()).or_default().push(link);
            } else {
                debug!(from = %link.from, to = %link.to, "dropping link to already-claimed target");
            }
        }
    }

    /// Post-pass: when no layer defined its own `Source`, make sure the
    /// implicit one is wired in. If nothing links out of `Source`, locate a
    /// parser element, walk its inbound-link chain to the root-most
    /// ancestor, and link `Source` to that.
    fn attach_source(&mut self) {
        if self.source_supplied || self.links.contains_key(SOURCE_ELEMENT_ID) {
            return;
        }

        let Some(parser_id) = self
            .elements
            .values()
            .find(|e| e.element_type.to_lowercase().contains("parser"))
            .map(|e| e.id.clone())
        else {
            return;
        };

        // Inbound map is unambiguous: targets are unique after pass 4.
        let inbound: BTreeMap<&str, &str> = self
            .links
            .values()
            .flatten()
            .map(|link| (link.to.as_str(), link.from.as_str()))
            .collect();

        let mut ancestor = parser_id.as_str();
        let mut visited = BTreeSet::new();
        while let Some(parent) = inbound.get(ancestor) {
            if !visited.insert(ancestor) {
                debug!(element = ancestor, "link chain loops; stopping ancestor walk");
                break;
            }
            ancestor = parent;
        }

        let link = PipelineLink::new(SOURCE_ELEMENT_ID, ancestor);
        debug!(to = %link.to, "linking implicit Source to parser chain root");
        self.links
            .entry(SOURCE_ELEMENT_ID.to_string())
            .or_default()
            .push(link);
    }

    fn element_defined(&self, id: &str) -> bool {
        self.elements
            .get(id)
            .is_some_and(|e| !e.element_type.is_empty())
    }

    fn finish(self) -> MergedPipeline {
        MergedPipeline {
            elements: self.elements,
            properties: self.properties,
            property_sources: self.property_sources,
            references: self.references,
            reference_sources: self.reference_sources,
            links: self.links,
        }
    }
}

/// The read-only result of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedPipeline {
    elements: BTreeMap<String, PipelineElement>,
    properties: BTreeMap<String, BTreeMap<String, PipelineProperty>>,
    property_sources: BTreeMap<(String, String), DocRef>,
    references: BTreeMap<String, BTreeMap<String, Vec<PipelineReference>>>,
    reference_sources: BTreeMap<PipelineReference, DocRef>,
    links: BTreeMap<String, Vec<PipelineLink>>,
}

impl MergedPipeline {
    /// Elements by id.
    #[must_use]
    pub fn elements(&self) -> &BTreeMap<String, PipelineElement> {
        &self.elements
    }

    /// Properties by element id, then property name.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, BTreeMap<String, PipelineProperty>> {
        &self.properties
    }

    /// References by element id, then reference name.
    #[must_use]
    pub fn references(&self) -> &BTreeMap<String, BTreeMap<String, Vec<PipelineReference>>> {
        &self.references
    }

    /// Links bucketed by their `from` element.
    #[must_use]
    pub fn links(&self) -> &BTreeMap<String, Vec<PipelineLink>> {
        &self.links
    }

    /// The document that supplied the merged value of a property, if the
    /// property survived the merge.
    #[must_use]
    pub fn property_source(&self, element_id: &str, name: &str) -> Option<&DocRef> {
        self.property_sources
            .get(&(element_id.to_string(), name.to_string()))
    }

    /// The document that first added a reference value, if it survived the
    /// merge.
    #[must_use]
    pub fn reference_source(&self, reference: &PipelineReference) -> Option<&DocRef> {
        self.reference_sources.get(reference)
    }

    /// Flattens the merged maps into a [`PipelineData`] snapshot in
    /// deterministic order.
    #[must_use]
    pub fn to_pipeline_data(&self) -> PipelineData {
        PipelineData {
            elements: self.elements.values().cloned().collect(),
            properties: self
                .properties
                .values()
                .flat_map(|by_name| by_name.values().cloned())
                .collect(),
            references: self
                .references
                .values()
                .flat_map(|by_name| by_name.values().flatten().cloned())
                .collect(),
            links: self.links.values().flatten().cloned().collect(),
        }
    }
}
