use convention_types::ConventionId;
use thiserror::Error;

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Repository errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("convention {0} not found")]
    NotFound(ConventionId),

    #[error("convention {0} already exists")]
    AlreadyExists(ConventionId),

    /// The stored version moved on since the caller loaded the aggregate
    #[error("concurrent modification of convention {id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        id: ConventionId,
        expected: u64,
        actual: u64,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl RepositoryError {
    /// Whether reloading and recomputing may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RepositoryError::ConcurrentModification { .. })
    }
}
