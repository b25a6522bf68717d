//! Import run configuration.

use crate::{ImportState, State};
use driftpack_types::DocRef;
use serde::{Deserialize, Serialize};

/// How an import run treats the documents it finds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// First pass: work out NEW/UPDATE per document and report back for
    /// confirmation, without persisting anything.
    #[default]
    CreateConfirmation,
    /// Second pass: apply only the items the user ticked.
    ActionConfirmation,
    /// Apply everything without asking.
    IgnoreConfirmation,
}

/// The knobs controlling one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSettings {
    pub import_mode: ImportMode,
    /// When true the descriptor's name wins over an existing document's
    /// name; when false existing documents keep theirs.
    pub use_import_names: bool,
    /// When true the descriptor's path wins over an existing document's
    /// location; when false existing documents stay put.
    pub use_import_folders: bool,
    /// Re-roots every descriptor path under this existing location.
    pub root_doc_ref: Option<DocRef>,
}

impl ImportSettings {
    /// Settings for a confirmation-free import that applies everything.
    #[must_use]
    pub fn apply_all() -> Self {
        Self {
            import_mode: ImportMode::IgnoreConfirmation,
            ..Self::default()
        }
    }

    /// Settings for the initial preview pass.
    #[must_use]
    pub fn preview() -> Self {
        Self::default()
    }

    /// True when the run should actually persist this item now: either the
    /// run is confirmation-free, or it is the apply pass and the user
    /// ticked this item (and did not mark it ignored).
    #[must_use]
    pub fn ok(&self, state: &ImportState) -> bool {
        match self.import_mode {
            ImportMode::IgnoreConfirmation => true,
            ImportMode::ActionConfirmation => {
                state.action && state.state != Some(State::Ignore)
            }
            ImportMode::CreateConfirmation => false,
        }
    }
}
