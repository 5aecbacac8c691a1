//! Convention Service - the use-case layer of the lifecycle engine
//!
//! Collaborators (an HTTP layer, a worker, the `conventionctl` binary) call
//! [`ConventionService`]; nothing above this crate touches the engine or the
//! repository directly.
//!
//! # Key Concepts
//!
//! - **AuthorizedContext**: the outcome of verifying a magic-link token or a
//!   backoffice credential: a role on one convention, plus the aggregate as
//!   read at that moment.
//! - **Bounded retry**: every write is a compare-and-swap on the persistence
//!   version. A lost race reloads and recomputes; exhausting the attempts
//!   surfaces [`ServiceError::Conflict`].
//! - **Ports**: notifications, the magic-link mailer and the agency
//!   directory are traits with in-memory implementations.
//!
//! # Design Principles
//!
//! 1. Notification failures never roll back a saved change
//! 2. Renewal links go to the address on file, never to a caller-supplied one
//! 3. Feature flags arrive through [`ServiceConfig`], not global state

#![deny(unsafe_code)]

mod config;
mod error;
mod guard;
mod links;
mod ports;
mod service;

pub use self::config::*;
pub use error::*;
pub use guard::*;
pub use links::*;
pub use ports::*;
pub use service::*;
