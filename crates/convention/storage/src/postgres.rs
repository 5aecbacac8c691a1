//! PostgreSQL adapter for convention storage.
//!
//! The aggregate is stored as JSONB next to a few projected columns used for
//! operations queries. Optimistic concurrency is a conditional `UPDATE` on
//! the `version` column.

use crate::traits::{ConventionRepository, Versioned};
use crate::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use convention_types::{ConventionAggregate, ConventionId};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

/// Version assigned to a freshly created aggregate.
const INITIAL_VERSION: i64 = 1;

/// PostgreSQL-backed convention repository.
#[derive(Clone)]
pub struct PostgresConventionRepository {
    pool: PgPool,
}

impl PostgresConventionRepository {
    /// Connect to PostgreSQL and initialize required schema.
    pub async fn connect(database_url: &str) -> RepositoryResult<Self> {
        Self::connect_with_options(database_url, 10, 5).await
    }

    /// Connect with explicit pool parameters.
    pub async fn connect_with_options(
        database_url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> RepositoryResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(std::time::Duration::from_secs(connect_timeout_secs))
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::Backend(format!("failed to connect postgres: {e}")))?;
        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: PgPool) -> RepositoryResult<Self> {
        let repo = Self { pool };
        repo.init_schema().await?;
        Ok(repo)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn init_schema(&self) -> RepositoryResult<()> {
        let ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS conventions (
                id TEXT PRIMARY KEY,
                version BIGINT NOT NULL,
                status TEXT NOT NULL,
                agency_id TEXT NOT NULL,
                token_version BIGINT NOT NULL,
                aggregate JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
            "CREATE INDEX IF NOT EXISTS conventions_status_idx ON conventions (status)",
            "CREATE INDEX IF NOT EXISTS conventions_agency_idx ON conventions (agency_id)",
        ];

        for stmt in ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    async fn current_version(&self, id: &ConventionId) -> RepositoryResult<Option<u64>> {
        let row = sqlx::query("SELECT version FROM conventions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        row.map(|r| {
            r.try_get::<i64, _>("version")
                .map_err(|e| RepositoryError::Backend(e.to_string()))
                .and_then(from_db_version)
        })
        .transpose()
    }
}

#[async_trait]
impl ConventionRepository for PostgresConventionRepository {
    async fn create(&self, aggregate: ConventionAggregate) -> RepositoryResult<u64> {
        let json = serde_json::to_value(&aggregate)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO conventions
                (id, version, status, agency_id, token_version, aggregate, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(aggregate.id.as_str())
        .bind(INITIAL_VERSION)
        .bind(aggregate.status.as_str())
        .bind(aggregate.agency_id.as_str())
        .bind(to_db_version(aggregate.token_version)?)
        .bind(json)
        .bind(aggregate.created_at)
        .bind(aggregate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|err| map_sqlx_conflict(err, &aggregate.id))?;

        from_db_version(INITIAL_VERSION)
    }

    async fn load(&self, id: &ConventionId) -> RepositoryResult<Versioned> {
        let row = sqlx::query("SELECT version, aggregate FROM conventions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepositoryError::Backend(e.to_string()))?
            .ok_or_else(|| RepositoryError::NotFound(id.clone()))?;

        let version: i64 = row
            .try_get("version")
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        let json: serde_json::Value = row
            .try_get("aggregate")
            .map_err(|e| RepositoryError::Backend(e.to_string()))?;
        let aggregate = serde_json::from_value(json)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        Ok(Versioned {
            aggregate,
            version: from_db_version(version)?,
        })
    }

    async fn save(
        &self,
        aggregate: ConventionAggregate,
        expected_version: u64,
    ) -> RepositoryResult<u64> {
        let json = serde_json::to_value(&aggregate)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE conventions
               SET version = version + 1,
                   status = $3,
                   token_version = $4,
                   aggregate = $5,
                   updated_at = $6
             WHERE id = $1 AND version = $2
            "#,
        )
        .bind(aggregate.id.as_str())
        .bind(to_db_version(expected_version)?)
        .bind(aggregate.status.as_str())
        .bind(to_db_version(aggregate.token_version)?)
        .bind(json)
        .bind(aggregate.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return match self.current_version(&aggregate.id).await? {
                Some(actual) => Err(RepositoryError::ConcurrentModification {
                    id: aggregate.id,
                    expected: expected_version,
                    actual,
                }),
                None => Err(RepositoryError::NotFound(aggregate.id)),
            };
        }

        Ok(expected_version + 1)
    }
}

fn map_sqlx_conflict(err: sqlx::Error, id: &ConventionId) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return RepositoryError::AlreadyExists(id.clone());
        }
    }
    RepositoryError::Backend(err.to_string())
}

fn to_db_version(value: u64) -> RepositoryResult<i64> {
    i64::try_from(value)
        .map_err(|_| RepositoryError::Backend(format!("version {value} exceeds BIGINT")))
}

fn from_db_version(value: i64) -> RepositoryResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepositoryError::Backend(format!("negative version {value} in database")))
}
