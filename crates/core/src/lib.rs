//! # Switchyard Core
//!
//! Domain types, error taxonomy and events for the Switchyard profile
//! routing engine. Every other crate in the workspace depends inward on
//! this one; it has no knowledge of configuration, storage or transport.
//!
//! - [`profile`]: the specialist profile schema and its invariants
//! - [`task`]: immutable task requests
//! - [`error`]: the error taxonomy shared by every component
//! - [`event`]: broadcast bus for routing and handoff events
//! - [`text`]: word tokenization used for tags and requests

pub mod error;
pub mod event;
pub mod profile;
pub mod task;
pub mod text;

// Re-export key types at crate root for ergonomics
pub use error::{EntityKind, Error, Result};
pub use event::{DomainEvent, EventBus};
pub use profile::{
    CategoryRanking, CollaborationContract, Profile, RankedOption, TemplateSection, normalize_key,
};
pub use task::{TaskId, TaskRequest};
pub use text::tokenize;
