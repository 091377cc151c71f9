//! # Switchyard Handoff
//!
//! Sequences a routed task through its delivery phases. Tasks with several
//! active profiles pass through `Collaboration`, which holds them until every
//! participant's contract requirements are provided by a peer (or supplied
//! from outside). The [`Dispatcher`] owns the task records and is what the
//! gateway and CLI talk to.

pub mod contract;
pub mod coordinator;
pub mod dispatcher;
pub mod phase;

pub use contract::ContractStatus;
pub use coordinator::{Advance, HandoffState, PhaseTransition};
pub use dispatcher::{Condition, Dispatcher, Submission, TaskSnapshot, TaskStatus};
pub use phase::Phase;
