//! In-memory convention repository.
//!
//! Deterministic and test-friendly. The version check and the write happen
//! under one write lock, which is what makes `save` a compare-and-swap.

use crate::traits::{ConventionRepository, Versioned};
use crate::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use convention_types::{ConventionAggregate, ConventionId};
use std::collections::HashMap;
use std::sync::RwLock;

/// Version assigned to a freshly created aggregate.
pub const INITIAL_VERSION: u64 = 1;

/// In-memory convention store.
#[derive(Default)]
pub struct InMemoryConventionRepository {
    conventions: RwLock<HashMap<ConventionId, Versioned>>,
}

impl InMemoryConventionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conventions.
    pub fn len(&self) -> RepositoryResult<usize> {
        let guard = self
            .conventions
            .read()
            .map_err(|_| RepositoryError::Backend("conventions lock poisoned".to_string()))?;
        Ok(guard.len())
    }

    pub fn is_empty(&self) -> RepositoryResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ConventionRepository for InMemoryConventionRepository {
    async fn create(&self, aggregate: ConventionAggregate) -> RepositoryResult<u64> {
        let mut guard = self
            .conventions
            .write()
            .map_err(|_| RepositoryError::Backend("conventions lock poisoned".to_string()))?;

        if guard.contains_key(&aggregate.id) {
            return Err(RepositoryError::AlreadyExists(aggregate.id));
        }
        guard.insert(
            aggregate.id.clone(),
            Versioned {
                aggregate,
                version: INITIAL_VERSION,
            },
        );
        Ok(INITIAL_VERSION)
    }

    async fn load(&self, id: &ConventionId) -> RepositoryResult<Versioned> {
        let guard = self
            .conventions
            .read()
            .map_err(|_| RepositoryError::Backend("conventions lock poisoned".to_string()))?;
        guard
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))
    }

    async fn save(
        &self,
        aggregate: ConventionAggregate,
        expected_version: u64,
    ) -> RepositoryResult<u64> {
        let mut guard = self
            .conventions
            .write()
            .map_err(|_| RepositoryError::Backend("conventions lock poisoned".to_string()))?;
        let stored = guard
            .get_mut(&aggregate.id)
            .ok_or_else(|| RepositoryError::NotFound(aggregate.id.clone()))?;

        if stored.version != expected_version {
            tracing::debug!(
                convention_id = %aggregate.id,
                expected = expected_version,
                actual = stored.version,
                "stale save rejected"
            );
            return Err(RepositoryError::ConcurrentModification {
                id: aggregate.id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.version += 1;
        stored.aggregate = aggregate;
        Ok(stored.version)
    }
}
