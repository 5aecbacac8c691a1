use crate::RepositoryResult;
use async_trait::async_trait;
use convention_types::{ConventionAggregate, ConventionId};

/// An aggregate together with the persistence version it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub aggregate: ConventionAggregate,
    pub version: u64,
}

/// Storage contract for convention aggregates.
///
/// The persistence version is distinct from the aggregate's
/// `token_version`: it moves on every successful save, including
/// signatures that leave the status unchanged.
#[async_trait]
pub trait ConventionRepository: Send + Sync {
    /// Insert a new aggregate. Returns its initial version.
    async fn create(&self, aggregate: ConventionAggregate) -> RepositoryResult<u64>;

    /// Load the current aggregate and its version.
    async fn load(&self, id: &ConventionId) -> RepositoryResult<Versioned>;

    /// Replace the aggregate if the stored version still equals
    /// `expected_version`. Returns the new version.
    async fn save(
        &self,
        aggregate: ConventionAggregate,
        expected_version: u64,
    ) -> RepositoryResult<u64>;
}
