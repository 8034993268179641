use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::time::Instant;

use case_store::{DistributedLock, LockGuard, StoreError};

use crate::config::PostgresConfig;
use crate::migrations;

/// Retry interval when polling for lock acquisition.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// PostgreSQL-backed implementation of [`DistributedLock`].
///
/// Uses row-based locking in the `locks` table. Expired locks are cleaned up
/// before each acquire attempt so stale entries do not block new acquisitions.
/// Used both for the per-case advisory lock (name = `case:{id}`) and the
/// scheduler's leader-lease sweeps (name = the job's name).
pub struct PostgresDistributedLock {
    pool: PgPool,
}

impl PostgresDistributedLock {
    /// Create a new `PostgresDistributedLock` from the provided configuration.
    ///
    /// Connects to `PostgreSQL`, creates the connection pool, and runs
    /// migrations to ensure the required tables exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Connection`] if pool creation fails, or
    /// [`StoreError::Backend`] if migrations fail.
    pub async fn new(config: PostgresConfig) -> Result<Self, StoreError> {
        let connect_options = crate::store::build_connect_options(&config)?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        migrations::run_migrations(&pool).await.map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Create a `PostgresDistributedLock` from an existing pool, sharing it
    /// with a [`crate::store::PostgresCaseStore`].
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove expired lock entries from the locks table.
    async fn clean_expired_locks(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM locks WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DistributedLock for PostgresDistributedLock {
    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        self.clean_expired_locks().await?;

        let owner = uuid::Uuid::new_v4().to_string();
        let expires_at = chrono::Utc::now() + ttl;

        let result = sqlx::query(
            "INSERT INTO locks (name, owner, expires_at) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(&owner)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() > 0 {
            Ok(Some(Box::new(PostgresLockGuard {
                pool: self.pool.clone(),
                name: name.to_owned(),
                owner,
            })))
        } else {
            Ok(None)
        }
    }

    async fn acquire(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }

            if Instant::now() >= deadline {
                return Err(StoreError::Timeout(timeout));
            }

            let remaining = deadline - Instant::now();
            let sleep_dur = LOCK_POLL_INTERVAL.min(remaining);
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// A held distributed lock backed by `PostgreSQL`.
///
/// Dropping the guard without calling [`release`](LockGuard::release) is safe;
/// the lock will expire after its TTL. Explicit release is preferred for
/// prompt cleanup so a waiting acquirer does not need to wait out the TTL.
pub struct PostgresLockGuard {
    pool: PgPool,
    name: String,
    owner: String,
}

#[async_trait]
impl LockGuard for PostgresLockGuard {
    async fn extend(&self, duration: Duration) -> Result<(), StoreError> {
        let new_expires_at = chrono::Utc::now() + duration;

        let result = sqlx::query(
            "UPDATE locks SET expires_at = $1 WHERE name = $2 AND owner = $3 AND expires_at > NOW()",
        )
        .bind(new_expires_at)
        .bind(&self.name)
        .bind(&self.owner)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() > 0 {
            Ok(())
        } else {
            Err(StoreError::LockExpired(self.name.clone()))
        }
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM locks WHERE name = $1 AND owner = $2")
            .bind(&self.name)
            .bind(&self.owner)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        let row: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM locks WHERE name = $1 AND owner = $2 AND expires_at > NOW()")
                .bind(&self.name)
                .bind(&self.owner)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(row.is_some())
    }
}
