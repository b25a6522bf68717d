//! Pipeline configuration model and merge engine for Driftpack.
//!
//! A pipeline is edited as a stack of [`PipelineLayer`]s, each contributed by
//! one source document: an independent set of added/removed elements,
//! properties, references, and links. [`PipelineMerger`] folds an ordered
//! stack into one effective configuration, where later layers override
//! earlier ones.
//!
//! The merge satisfies:
//! - **Idempotence**: merging the same stack twice yields identical output.
//! - **Override law**: a property's merged value is the value from the
//!   highest-priority layer that set it and was not later removed.
//! - **Link uniqueness**: no two merged links share a target element.
//!
//! The only hard failure is redefining an element id with a conflicting
//! type; all other malformed input (references to undefined elements, etc.)
//! is dropped, tolerating partially-valid layer stacks assembled from
//! independently-edited documents.

mod data;
mod merger;

pub use data::{
    ElementRole, PipelineData, PipelineElement, PipelineLayer, PipelineLink, PipelineProperty,
    PipelineReference, PropertyValue, SOURCE_ELEMENT_ID, SOURCE_ELEMENT_TYPE,
};
pub use merger::{MergedPipeline, PipelineMerger};

/// Result type alias for merge operations.
pub type MergeResult<T> = std::result::Result<T, PipelineMergeError>;

/// Errors raised while merging pipeline layers.
#[derive(Debug, thiserror::Error)]
pub enum PipelineMergeError {
    /// An element id was added with two different types across the stack.
    /// The merge aborts; callers must not read partial results.
    #[error("element '{id}' redefined with conflicting type: '{existing}' vs '{incoming}'")]
    ElementTypeConflict {
        id: String,
        existing: String,
        incoming: String,
    },
}
