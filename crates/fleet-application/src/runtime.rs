// ============================================================================
// Fleet Application - Runtime
// File: crates/fleet-application/src/runtime.rs
// ============================================================================
//! Composition root: wires the store, router, registry and dispatcher.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tenancy_core::cancellation::CancellationToken;
use tenancy_core::{
    ConnectionDescriptor, ContextProvider, CredentialHasher, Dispatcher, DomainError, Entity, MemorySessionSource,
    SessionSource, ShardAssigner, ShardConnectionRouter, ShardedContextProvider, StoreTenantDirectory, TenantDirectory,
    TenantKey, TenantRecord, TenantResolver,
};
use tenancy_infrastructure::{create_pool, ensure_document_tables, to_pg_options, BcryptHasher, PgSessionSource};
use tenancy_shared::config::{AppConfig, ShardingSettings};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Person, Vehicle};
use crate::registration::build_registry;

/// Document tables of the master database.
pub const MASTER_TABLES: &[&str] = &[TenantRecord::TABLE];
/// Document tables of every shard database.
pub const SHARD_TABLES: &[&str] = &[Person::TABLE, Vehicle::TABLE];

const IN_MEMORY_MASTER: &str = "Server=memory;Database=Master;";

pub struct FleetRuntime {
    dispatcher: Dispatcher,
    contexts: Arc<ShardedContextProvider>,
    directory: Arc<dyn TenantDirectory>,
    hasher: Arc<dyn CredentialHasher>,
}

impl FleetRuntime {
    /// Connects to PostgreSQL, creating missing document tables on the master
    /// and on every shard.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let master = ConnectionDescriptor::new(config.database.master_connection.as_str());
        let router = ShardConnectionRouter::new(&config.sharding)?;

        let master_pool = create_pool(to_pg_options(&master)?, &config.database)
            .await
            .with_context(|| format!("connecting to master database ({})", master))?;
        ensure_document_tables(&master_pool, MASTER_TABLES)
            .await
            .context("bootstrapping master tables")?;

        let source = PgSessionSource::new(config.database.clone()).with_pool(master.clone(), master_pool);
        for shard in 1..=config.sharding.total_shards {
            let pool = source.pool(&router.route(shard))?;
            ensure_document_tables(&pool, SHARD_TABLES)
                .await
                .with_context(|| format!("bootstrapping shard {}", shard))?;
        }
        info!(shards = config.sharding.total_shards, "Database bootstrap complete");

        Ok(Self::assemble(
            master,
            router,
            &config.sharding,
            Arc::new(source),
            Arc::new(BcryptHasher::new()),
        )?)
    }

    /// Runtime over in-memory stores, one per database.
    pub fn in_memory(sharding: &ShardingSettings) -> Result<Self, DomainError> {
        Self::with_session_source(
            ConnectionDescriptor::new(IN_MEMORY_MASTER),
            sharding,
            Arc::new(MemorySessionSource::new()),
            Arc::new(BcryptHasher::new()),
        )
    }

    pub fn with_session_source(
        master: ConnectionDescriptor,
        sharding: &ShardingSettings,
        source: Arc<dyn SessionSource>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, DomainError> {
        let router = ShardConnectionRouter::new(sharding)?;
        Self::assemble(master, router, sharding, source, hasher)
    }

    fn assemble(
        master: ConnectionDescriptor,
        router: ShardConnectionRouter,
        sharding: &ShardingSettings,
        source: Arc<dyn SessionSource>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> Result<Self, DomainError> {
        let contexts = Arc::new(ShardedContextProvider::new(master, router, source));
        let registry = build_registry(hasher.clone(), ShardAssigner::new(sharding))?;
        for (request, shape) in registry.describe() {
            info!(request, pipeline = %shape, "Registered handler");
        }

        Ok(Self {
            dispatcher: Dispatcher::new(Arc::new(registry), contexts.clone()),
            directory: Arc::new(StoreTenantDirectory::new(contexts.clone())),
            contexts,
            hasher,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn contexts(&self) -> Arc<dyn ContextProvider> {
        self.contexts.clone()
    }

    pub fn router(&self) -> &ShardConnectionRouter {
        self.contexts.router()
    }

    /// A fresh resolver for one request.
    pub fn resolver(&self) -> TenantResolver {
        TenantResolver::for_request(self.directory.clone())
    }

    /// Request boundary: parses the tenant header value, resolves the tenant
    /// and runs `fut` with its context in scope.
    pub async fn run_as<F>(&self, tenant_header: &str, fut: F) -> Result<F::Output, DomainError>
    where
        F: Future,
    {
        self.run_as_with_cancel(tenant_header, CancellationToken::new(), fut).await
    }

    pub async fn run_as_with_cancel<F>(
        &self,
        tenant_header: &str,
        cancel: CancellationToken,
        fut: F,
    ) -> Result<F::Output, DomainError>
    where
        F: Future,
    {
        let key = TenantKey::parse(tenant_header)?;
        TenantResolver::with_cancellation(self.directory.clone(), cancel)
            .run_scoped(key, fut)
            .await
    }

    /// Checks a username/password pair against the master store and returns
    /// the tenant's sync id when they match.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Option<Uuid>, DomainError> {
        let Some(record) = self.directory.find_by_username(username).await? else {
            warn!(username, "Login for unknown username");
            return Ok(None);
        };

        let hasher = self.hasher.clone();
        let (password, hash) = (password.to_string(), record.password_hash.clone());
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| DomainError::InternalError(format!("password verification task failed: {}", e)))??;

        if matches {
            info!(tenant_id = ?record.id, "Credentials verified");
            Ok(Some(record.sync_id))
        } else {
            warn!(username, "Login with wrong password");
            Ok(None)
        }
    }
}
