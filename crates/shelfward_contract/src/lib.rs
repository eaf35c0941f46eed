//! Module Contract Model
//!
//! A module contract is the schema for one catalog item type: its typed
//! fields, lifecycle states, metadata providers, and intake workflows.
//!
//! # Lifecycle
//!
//! 1. An operator defines a contract (fields, states, workflows)
//! 2. The contract is fetched once per module selection and is
//!    immutable for the lifetime of the consumer that loaded it
//! 3. The form engine, workflow runner, and query fallback all
//!    interpret the same contract - no per-type code anywhere
//!
//! Contracts are versioned by `(key, version)`. Version compatibility
//! is the responsibility of the store, not enforced here.
//!
//! # Modules
//!
//! - [`contract`]: The [`Contract`] aggregate and its lookup helpers
//! - [`field`]: Typed field definitions, flags, constraints, UI hints
//! - [`workflow`]: Workflow definitions and the tagged step variants
//! - [`item`]: Catalog items and external identifiers

pub mod contract;
pub mod field;
pub mod item;
pub mod workflow;

pub use contract::{Contract, LifecycleState, ProviderRef};
pub use field::{
    Field, FieldConstraints, FieldFlags, FieldType, FieldUi, IdentifierKind,
};
pub use item::{Attributes, Identifier, Item, ItemId};
pub use workflow::{Workflow, WorkflowStep};
