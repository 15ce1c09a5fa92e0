// ============================================================================
// Tenancy Core - Tenant Resolver
// File: crates/tenancy-core/src/services/tenant_resolver.rs
// ============================================================================
//! Resolves tenant identifiers to tenant contexts.
//!
//! One resolver is created per request. Resolutions are memoized for the
//! resolver's lifetime, so repeated lookups within a request always agree.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tenancy_shared::TenantId;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancellation::{cancellable, CancellationToken};
use crate::context::TenantContext;
use crate::domain::{TenantKey, TenantRecord};
use crate::error::DomainError;
use crate::repositories::TenantDirectory;

pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    memo: Mutex<HashMap<TenantKey, TenantContext>>,
    cancel: CancellationToken,
}

impl TenantResolver {
    pub fn for_request(directory: Arc<dyn TenantDirectory>) -> Self {
        Self::with_cancellation(directory, CancellationToken::new())
    }

    pub fn with_cancellation(directory: Arc<dyn TenantDirectory>, cancel: CancellationToken) -> Self {
        Self {
            directory,
            memo: Mutex::new(HashMap::new()),
            cancel,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub async fn resolve_by_id(&self, id: TenantId) -> Result<TenantContext, DomainError> {
        self.resolve(TenantKey::Id(id)).await
    }

    pub async fn resolve_by_sync_id(&self, sync_id: Uuid) -> Result<TenantContext, DomainError> {
        self.resolve(TenantKey::SyncId(sync_id)).await
    }

    /// Looks the tenant up in the master store and returns its context.
    ///
    /// Unknown tenants fail with [`DomainError::TenantNotFound`].
    pub async fn resolve(&self, key: TenantKey) -> Result<TenantContext, DomainError> {
        let memoized = self.memo.lock().get(&key).copied();
        if let Some(ctx) = memoized {
            debug!(tenant = %key, "Tenant resolved from request memo");
            return Ok(ctx);
        }

        let record = cancellable(&self.cancel, self.lookup(key)).await?.ok_or_else(|| {
            warn!(tenant = %key, "Tenant not found");
            DomainError::TenantNotFound(key.to_string())
        })?;

        let ctx = context_of(&record)?;
        self.memo.lock().insert(key, ctx);
        info!(tenant_id = ?ctx.tenant_id, shard_id = ?ctx.shard_id, "Tenant resolved");
        Ok(ctx)
    }

    /// Resolves `key`, then runs `fut` with the resolved context in scope.
    ///
    /// `fut` is never polled when resolution fails.
    pub async fn run_scoped<F>(&self, key: TenantKey, fut: F) -> Result<F::Output, DomainError>
    where
        F: Future,
    {
        let ctx = self.resolve(key).await?;
        Ok(TenantContext::scope(ctx, fut).await)
    }

    async fn lookup(&self, key: TenantKey) -> Result<Option<TenantRecord>, DomainError> {
        match key {
            TenantKey::Id(id) => self.directory.find_by_id(id).await,
            TenantKey::SyncId(sync_id) => self.directory.find_by_sync_id(&sync_id).await,
        }
    }
}

fn context_of(record: &TenantRecord) -> Result<TenantContext, DomainError> {
    let id = record
        .id
        .ok_or_else(|| DomainError::InternalError("tenant record loaded without id".into()))?;
    if record.shard_id == 0 {
        return Err(DomainError::InternalError(format!("tenant {} has no shard assigned", id)));
    }
    Ok(TenantContext::resolved(id, record.shard_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockTenantDirectory;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn record(id: TenantId, shard_id: u32) -> TenantRecord {
        let mut record = TenantRecord::new("alice", "hash", shard_id);
        record.id = Some(id);
        record
    }

    #[tokio::test]
    async fn test_resolve_by_id() {
        let mut directory = MockTenantDirectory::new();
        directory
            .expect_find_by_id()
            .withf(|id| *id == 42)
            .times(1)
            .returning(|_| Ok(Some(record(42, 3))));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        assert_eq!(resolver.resolve_by_id(42).await.unwrap(), TenantContext::resolved(42, 3));
    }

    #[tokio::test]
    async fn test_resolve_by_sync_id() {
        let target = record(42, 3);
        let sync_id = target.sync_id;
        let mut directory = MockTenantDirectory::new();
        directory
            .expect_find_by_sync_id()
            .withf(move |s| *s == sync_id)
            .returning(move |_| Ok(Some(target.clone())));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        assert_eq!(resolver.resolve_by_sync_id(sync_id).await.unwrap(), TenantContext::resolved(42, 3));
    }

    #[tokio::test]
    async fn test_repeated_resolution_is_memoized() {
        let mut directory = MockTenantDirectory::new();
        directory.expect_find_by_id().times(1).returning(|_| Ok(Some(record(42, 3))));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        let first = resolver.resolve_by_id(42).await.unwrap();
        let second = resolver.resolve_by_id(42).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_unknown_tenant_never_reaches_scoped_work() {
        let mut directory = MockTenantDirectory::new();
        directory.expect_find_by_id().returning(|_| Ok(None));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        let ran = AtomicBool::new(false);
        let result = resolver
            .run_scoped(TenantKey::Id(99), async {
                ran.store(true, Ordering::SeqCst);
            })
            .await;

        assert!(matches!(result, Err(DomainError::TenantNotFound(_))));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_run_scoped_exposes_context() {
        let mut directory = MockTenantDirectory::new();
        directory.expect_find_by_id().returning(|_| Ok(Some(record(42, 3))));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        let seen = resolver
            .run_scoped(TenantKey::Id(42), async { TenantContext::current() })
            .await
            .unwrap();
        assert_eq!(seen, TenantContext::resolved(42, 3));
        assert_eq!(TenantContext::current(), TenantContext::empty());
    }

    #[tokio::test]
    async fn test_cancelled_lookup() {
        let directory = MockTenantDirectory::new();
        let token = CancellationToken::new();
        token.cancel();
        let resolver = TenantResolver::with_cancellation(Arc::new(directory), token);
        assert!(matches!(resolver.resolve_by_id(1).await, Err(DomainError::Cancelled)));
    }

    #[tokio::test]
    async fn test_lookup_errors_propagate() {
        let mut directory = MockTenantDirectory::new();
        directory
            .expect_find_by_id()
            .returning(|_| Err(DomainError::DatabaseError("connection refused".into())));

        let resolver = TenantResolver::for_request(Arc::new(directory));
        assert!(matches!(resolver.resolve_by_id(1).await, Err(DomainError::DatabaseError(_))));
    }
}
