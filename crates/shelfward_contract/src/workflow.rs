//! Workflow definitions.
//!
//! A workflow is an ordered sequence of steps guiding item creation for
//! a contract. Step definitions are passive data here; sequencing,
//! normalization, and failure handling live in the workflow runner.
//!
//! A workflow that references a field key absent from its contract is
//! not rejected at construction time. The runner detects the missing
//! field when the step is entered and surfaces a recoverable error,
//! so a stale workflow degrades to a visible warning, not a crash.

use serde::{Deserialize, Serialize};

/// One unit of workflow behavior.
///
/// Closed tagged variant: each tag has exactly one handler in the
/// runner, so adding a step type is a compile-time-checked extension
/// point rather than a silent fallthrough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStep {
    /// Prompt the user for a single field value
    Prompt { field: String },

    /// Prompt for several fields; at least one must be filled in
    PromptAny { fields: Vec<String> },

    /// Query external metadata providers using identifiers derived
    /// from the accumulated attributes. Empty `providers` means all
    /// enabled providers.
    LookupMetadata {
        #[serde(default)]
        providers: Vec<String>,
    },

    /// Let the user apply a subset of the lookup's suggested values
    ApplyMetadata,

    /// Let the user pick a cover image (provider asset or local file)
    SelectImage,

    /// Review accumulated attributes and persist the item
    SaveItem,
}

impl WorkflowStep {
    /// Short tag for logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowStep::Prompt { .. } => "PROMPT",
            WorkflowStep::PromptAny { .. } => "PROMPT_ANY",
            WorkflowStep::LookupMetadata { .. } => "LOOKUP_METADATA",
            WorkflowStep::ApplyMetadata => "APPLY_METADATA",
            WorkflowStep::SelectImage => "SELECT_IMAGE",
            WorkflowStep::SaveItem => "SAVE_ITEM",
        }
    }
}

/// An ordered sequence of steps guiding item intake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique key within the contract
    pub key: String,

    /// Human-readable label
    pub label: String,

    /// Steps in execution order
    pub steps: Vec<WorkflowStep>,
}

impl Workflow {
    pub fn new(key: impl Into<String>, label: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            steps,
        }
    }
}
