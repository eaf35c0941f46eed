//! Contract-Driven Intake Engine
//!
//! # Philosophy: the contract is the only source of behavior
//!
//! Nothing in this crate knows what a "book" or a "record" is. Every
//! form, validation rule, and wizard step is interpreted from a module
//! contract at runtime:
//!
//! 1. **Validation**: pure `(field, value) -> issue-or-none` functions
//! 2. **Forms**: a headless model holding values and inline errors,
//!    dispatching one control per field type
//! 3. **Workflows**: an explicit state machine sequencing prompt,
//!    lookup, merge, image, and save steps, pausing at every await
//! 4. **Lookup & merge**: provider fan-out results folded into one
//!    suggestion map, diffed against what the user already entered
//!
//! The runner never talks to the network itself. Remote calls go
//! through the ports in `shelfward_protocol`, and every await
//! resumption is guarded by a session token so results arriving after
//! the session moved on are discarded, not applied.
//!
//! # Modules
//!
//! - [`validate`]: Field validation engine
//! - [`form`]: Headless dynamic form model
//! - [`lookup`]: Merge precedence and suggestion diffing
//! - [`workflow`]: The workflow runner state machine
//! - [`error`]: Workflow and save error taxonomy

pub mod error;
pub mod form;
pub mod lookup;
pub mod validate;
pub mod workflow;

pub use error::{SaveError, WorkflowError};
pub use form::{control_for, FieldControl, FormModel};
pub use lookup::{diff, merge_results, DiffEntry};
pub use validate::{validate, validate_all, IssueKind, ValidationIssue};
pub use workflow::{ImageChoice, SessionToken, WorkflowRunner, WorkflowSession};
