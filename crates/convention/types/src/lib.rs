//! Convention Domain Types
//!
//! A **Convention** is the placement agreement between a beneficiary, a
//! hosting establishment and a supervising agency. This crate holds the
//! vocabulary shared by every layer of the lifecycle engine.
//!
//! # Key Concepts
//!
//! - **Role**: the closed set of parties that can act on a convention.
//!   Every role except `backoffice-admin` is scoped to one convention
//!   through a capability token.
//! - **ConventionStatus**: the lifecycle state. `VALIDATED`, `REJECTED`
//!   and `CANCELLED` are terminal.
//! - **Signatory**: a party whose signature is required before review.
//! - **ConventionAggregate**: the record itself, carrying a `token_version`
//!   counter that invalidates previously issued links whenever the status
//!   or the draft content changes.
//!
//! # Design Principles
//!
//! 1. The aggregate never decides whether a status change is legal; that is
//!    the transition engine's job. It only applies the side effects.
//! 2. `signed_at` is set once per signatory and only cleared by a
//!    modification request back to `DRAFT`.
//! 3. Aggregates are never deleted; terminal states are kept for audit.

#![deny(unsafe_code)]

mod aggregate;
mod content;
mod errors;
mod ids;
mod role;
mod signatory;
mod status;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use aggregate::*;
pub use content::*;
pub use errors::*;
pub use ids::*;
pub use role::*;
pub use signatory::*;
pub use status::*;
