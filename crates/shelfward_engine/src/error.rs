//! Workflow and persistence errors.
//!
//! Everything here is recoverable: a workflow error keeps the session
//! on its current step with a message for the user, and a save error
//! leaves the session on the save step so the user can retry or back
//! out. Nothing in this subsystem is fatal to the process.

use shelfward_contract::Item;
use shelfward_protocol::{LookupError, ServiceError};
use thiserror::Error;

/// Recoverable failures inside a workflow session.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Contract has no workflow '{0}'")]
    UnknownWorkflow(String),

    #[error("Step expects {expected}, session is on {actual}")]
    StepMismatch {
        expected: &'static str,
        actual: String,
    },

    /// A step references a field key the contract no longer declares.
    /// Surfaced as a visible warning; the session stays on the step.
    #[error("Workflow references unknown field '{field}'")]
    MissingField { field: String },

    /// Lookup was requested but no accumulated attribute carries an
    /// identifier value yet.
    #[error("No identifier values available for metadata lookup")]
    NoIdentifiers,

    /// A PROMPT_ANY submission where every listed field is empty.
    #[error("At least one field must be filled in")]
    NothingEntered,

    /// APPLY_METADATA entered without a stored lookup result.
    #[error("No metadata lookup result to apply")]
    NoLookup,

    /// A deprecated lifecycle state was requested for a new item.
    #[error("State '{0}' is not selectable for new items")]
    StateNotSelectable(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Failures while persisting the reviewed item.
#[derive(Debug, Error)]
pub enum SaveError {
    /// The session transitioned after `begin_save`; the draft was
    /// withdrawn and nothing was sent to the service.
    #[error("Save abandoned: the session moved on before the item was sent")]
    StaleSession,

    /// Item creation failed; nothing was persisted, safe to retry.
    #[error("Item creation failed: {0}")]
    Create(#[from] ServiceError),

    /// The item was created but the image attach failed. The item is
    /// NOT rolled back; it exists server-side without its image and
    /// the workflow does not retry on its own.
    #[error("Item saved but image attach failed: {source}")]
    ImageAttach {
        item: Box<Item>,
        #[source]
        source: ServiceError,
    },
}
