//! Wiring for the store/lock backend and the outbound provider registry:
//! turn a loaded [`CaseRuntimeConfig`](crate::config::CaseRuntimeConfig)
//! into the handles [`case_runtime::dispatch`] and
//! [`case_runtime::post_decision`] need.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use case_provider::ProviderRegistry;
use case_runtime::{SharedLock, SharedStore};
use case_store::{DistributedLock, LockGuard, StoreError};

use crate::config::{CaseRuntimeConfig, StoreBackend};
use crate::error::ServerError;

/// Build the store and lock handles for the configured backend.
pub async fn build_store(config: &CaseRuntimeConfig) -> Result<(SharedStore, SharedLock), ServerError> {
    match config.store.backend {
        StoreBackend::Memory => {
            Ok((Arc::new(case_store::InMemoryCaseStore::new()), Arc::new(InMemoryLock::default())))
        }
        #[cfg(feature = "postgres")]
        StoreBackend::Postgres => {
            let pg_config: case_store_postgres::PostgresConfig = (&config.store).into();
            let store = case_store_postgres::PostgresCaseStore::new(pg_config.clone()).await?;
            let lock = case_store_postgres::PostgresDistributedLock::new(pg_config).await?;
            Ok((Arc::new(store), Arc::new(lock)))
        }
        #[cfg(not(feature = "postgres"))]
        StoreBackend::Postgres => Err(ServerError::Config(
            "store.backend = \"postgres\" but case-server was built without the postgres feature".to_string(),
        )),
    }
}

/// Register the email and portal providers under the names
/// [`case_runtime`]'s proposal executor looks them up by.
pub fn build_provider_registry(config: &CaseRuntimeConfig) -> Result<ProviderRegistry, ServerError> {
    let mut registry = ProviderRegistry::new();

    let smtp_config = config.email.to_smtp_config();
    let email_provider =
        case_email::EmailProvider::new(&smtp_config).map_err(|e| ServerError::Config(e.to_string()))?;
    registry.register(Arc::new(email_provider));

    let portal_config: case_portal::PortalConfig = (&config.portal).into();
    registry.register(Arc::new(case_portal::PortalProvider::new(portal_config)));

    Ok(registry)
}

/// A process-local [`DistributedLock`] backed by a held-names set. Suitable
/// for the `memory` store backend (development, tests, a single replica);
/// it provides no cross-process exclusion.
#[derive(Default)]
struct InMemoryLock {
    held: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl DistributedLock for InMemoryLock {
    async fn try_acquire(&self, name: &str, _ttl: Duration) -> Result<Option<Box<dyn LockGuard>>, StoreError> {
        let mut held = self.held.lock().expect("lock mutex poisoned");
        if held.insert(name.to_string()) {
            Ok(Some(Box::new(InMemoryLockGuard { name: name.to_string(), held: self.held.clone() })))
        } else {
            Ok(None)
        }
    }

    async fn acquire(&self, name: &str, ttl: Duration, timeout: Duration) -> Result<Box<dyn LockGuard>, StoreError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(guard) = self.try_acquire(name, ttl).await? {
                return Ok(guard);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(StoreError::Timeout(timeout));
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

struct InMemoryLockGuard {
    name: String,
    held: Arc<Mutex<HashSet<String>>>,
}

#[async_trait]
impl LockGuard for InMemoryLockGuard {
    async fn extend(&self, _duration: Duration) -> Result<(), StoreError> {
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<(), StoreError> {
        self.held.lock().expect("lock mutex poisoned").remove(&self.name);
        Ok(())
    }

    async fn is_held(&self) -> Result<bool, StoreError> {
        Ok(self.held.lock().expect("lock mutex poisoned").contains(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn try_acquire_then_release_allows_reacquire() {
        let lock = InMemoryLock::default();
        let guard = lock.try_acquire("case:1", Duration::from_secs(10)).await.unwrap().unwrap();
        assert!(lock.try_acquire("case:1", Duration::from_secs(10)).await.unwrap().is_none());
        guard.release().await.unwrap();
        assert!(lock.try_acquire("case:1", Duration::from_secs(10)).await.unwrap().is_some());
    }
}
