//! Convention Lifecycle Engine
//!
//! The lifecycle of a convention is a guarded state machine. Every legal
//! edge lives in one explicit table ([`TRANSITIONS`]); nothing else in the
//! workspace decides whether a status change is allowed.
//!
//! - [`TransitionEngine`] is a pure function from the current aggregate and
//!   a requested status to the next status or a typed error.
//! - [`SignatureTracker`] records signatures and asks the engine for the
//!   automatic `PARTIALLY_SIGNED` / `IN_REVIEW` advancement.
//!
//! Neither performs I/O. Callers persist the resulting aggregate.

#![deny(unsafe_code)]

mod errors;
mod permissions;
mod signature_tracker;
mod transition_engine;
mod transition_table;

pub use errors::*;
pub use permissions::*;
pub use signature_tracker::*;
pub use transition_engine::*;
pub use transition_table::*;
