//! Convention persistence.
//!
//! The repository is the only shared mutable resource of the lifecycle
//! engine. Every stored aggregate carries a persistence version; `save`
//! succeeds only when the caller presents the version it read, so two
//! requests working from the same snapshot cannot both win.
//!
//! Adapters:
//! - [`memory::InMemoryConventionRepository`] for tests and local runs
//! - `postgres::PostgresConventionRepository` behind the `postgres` feature

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{RepositoryError, RepositoryResult};
pub use memory::InMemoryConventionRepository;
pub use traits::{ConventionRepository, Versioned};
