//! Pooled session source.

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::PgPool;
use tracing::info;

use tenancy_core::persistence::{SessionSource, StoreSession};
use tenancy_core::{ConnectionDescriptor, DomainError};
use tenancy_shared::config::DatabaseSettings;

use super::descriptor::to_pg_options;
use super::session::PgStoreSession;
use crate::database::connection::pool_options;

/// Keeps one pool per distinct connection descriptor and hands out sessions
/// on it. Pools are shared across requests; sessions never are.
pub struct PgSessionSource {
    settings: DatabaseSettings,
    pools: DashMap<ConnectionDescriptor, PgPool>,
}

impl PgSessionSource {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self {
            settings,
            pools: DashMap::new(),
        }
    }

    /// Registers an already connected pool, typically the master pool
    /// created eagerly at startup.
    pub fn with_pool(self, descriptor: ConnectionDescriptor, pool: PgPool) -> Self {
        self.pools.insert(descriptor, pool);
        self
    }

    /// The pool behind `descriptor`. New pools connect lazily on first use.
    pub fn pool(&self, descriptor: &ConnectionDescriptor) -> Result<PgPool, DomainError> {
        if let Some(pool) = self.pools.get(descriptor) {
            return Ok(pool.clone());
        }

        let options = to_pg_options(descriptor)?;
        let pool = self
            .pools
            .entry(descriptor.clone())
            .or_insert_with(|| {
                info!(descriptor = %descriptor, "Creating connection pool");
                pool_options(&self.settings).connect_lazy_with(options)
            })
            .clone();
        Ok(pool)
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }
}

#[async_trait]
impl SessionSource for PgSessionSource {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn StoreSession>, DomainError> {
        Ok(Box::new(PgStoreSession::new(self.pool(descriptor)?)))
    }
}
