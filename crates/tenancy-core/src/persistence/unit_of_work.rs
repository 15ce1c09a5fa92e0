//! Unit of work.
//!
//! Owns the data contexts opened while serving one dispatch, at most one per
//! [`ContextKind`], and applies the cross-cutting write rules at save time:
//!
//! * added auditable entities get `created_by`/`created_at`;
//! * modified auditable entities get `updated_by`/`updated_at`;
//! * deleted auditable entities are turned into updates with
//!   `is_deleted = true` instead of being removed.
//!
//! The acting identity is the tenant id of the ambient
//! [`TenantContext`] (none while provisioning).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tenancy_shared::TenantId;
use tracing::{debug, error, warn};

use super::data_context::{ContextKind, DataContext, EntryState, TrackedEntry};
use crate::cancellation::CancellationToken;
use crate::context::TenantContext;
use crate::error::DomainError;

/// Creates data contexts on demand.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Opens a context of `kind` whose filters are fixed from `tenant`.
    async fn create(&self, kind: ContextKind, tenant: TenantContext) -> Result<DataContext, DomainError>;
}

pub struct UnitOfWork {
    provider: Arc<dyn ContextProvider>,
    contexts: Vec<DataContext>,
    transaction: Option<ContextKind>,
    cancel: CancellationToken,
}

impl UnitOfWork {
    pub fn new(provider: Arc<dyn ContextProvider>) -> Self {
        Self::with_cancellation(provider, CancellationToken::new())
    }

    pub fn with_cancellation(provider: Arc<dyn ContextProvider>, cancel: CancellationToken) -> Self {
        Self {
            provider,
            contexts: Vec::new(),
            transaction: None,
            cancel,
        }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// The context of `kind`, opened on first use and reused afterwards.
    pub async fn context(&mut self, kind: ContextKind) -> Result<&mut DataContext, DomainError> {
        if self.cancel.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        if let Some(index) = self.contexts.iter().position(|c| c.kind() == kind) {
            return Ok(&mut self.contexts[index]);
        }

        let tenant = TenantContext::current();
        debug!(context = %kind, tenant = %tenant, "Opening data context");
        let ctx = self
            .provider
            .create(kind, tenant)
            .await?
            .with_cancellation(self.cancel.clone());

        let index = self.contexts.len();
        self.contexts.push(ctx);
        Ok(&mut self.contexts[index])
    }

    pub async fn master(&mut self) -> Result<&mut DataContext, DomainError> {
        self.context(ContextKind::Master).await
    }

    /// The shard context of the ambient tenant.
    pub async fn shard(&mut self) -> Result<&mut DataContext, DomainError> {
        let shard = TenantContext::current().require_shard()?;
        self.context(ContextKind::Shard(shard)).await
    }

    pub fn owned_contexts(&self) -> impl Iterator<Item = ContextKind> + '_ {
        self.contexts.iter().map(DataContext::kind)
    }

    pub fn has_contexts(&self) -> bool {
        !self.contexts.is_empty()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.contexts.iter().any(DataContext::has_pending_changes)
    }

    /// Stamps and saves every owned context. Returns the total affected row count.
    pub async fn save_changes(&mut self) -> Result<u64, DomainError> {
        let (actor, now) = (TenantContext::current().tenant_id, Utc::now());
        let mut total = 0;
        for ctx in &mut self.contexts {
            stamp_audit(ctx.entries_mut(), actor, now);
            total += ctx.save_changes().await?;
        }
        Ok(total)
    }

    /// Stamps and saves only the context of `kind`, if it is open.
    pub async fn save_context(&mut self, kind: ContextKind) -> Result<u64, DomainError> {
        let (actor, now) = (TenantContext::current().tenant_id, Utc::now());
        match self.contexts.iter_mut().find(|c| c.kind() == kind) {
            Some(ctx) => {
                stamp_audit(ctx.entries_mut(), actor, now);
                ctx.save_changes().await
            }
            None => Ok(0),
        }
    }

    /// Begins a transaction on the first context this unit of work opened.
    pub async fn begin_transaction(&mut self) -> Result<(), DomainError> {
        if let Some(kind) = self.transaction {
            return Err(DomainError::InvalidUsage(format!(
                "a transaction is already active on the {} context",
                kind
            )));
        }
        let ctx = self.contexts.first_mut().ok_or_else(|| {
            DomainError::InvalidUsage("cannot begin a transaction before any context is open".into())
        })?;
        ctx.begin_transaction().await?;
        self.transaction = Some(ctx.kind());
        debug!(context = %ctx.kind(), "Transaction started");
        Ok(())
    }

    /// Saves all pending changes, then commits the active transaction.
    ///
    /// On failure the transaction is rolled back and the original error is
    /// returned.
    pub async fn commit(&mut self) -> Result<u64, DomainError> {
        let kind = self
            .transaction
            .ok_or_else(|| DomainError::InvalidUsage("no active transaction to commit".into()))?;

        let saved = self.save_changes().await;
        let committed = match saved {
            Ok(rows) => match self.transaction_context(kind) {
                Some(ctx) => ctx.commit_transaction().await.map(|_| rows),
                None => Ok(rows),
            },
            Err(e) => Err(e),
        };

        match committed {
            Ok(rows) => {
                self.transaction = None;
                debug!(context = %kind, rows, "Transaction committed");
                Ok(rows)
            }
            Err(e) => {
                error!(context = %kind, "Commit failed, rolling back: {}", e);
                if let Err(rollback_err) = self.rollback().await {
                    error!(context = %kind, "Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    pub async fn rollback(&mut self) -> Result<(), DomainError> {
        let kind = self
            .transaction
            .take()
            .ok_or_else(|| DomainError::InvalidUsage("no active transaction to roll back".into()))?;
        for ctx in &mut self.contexts {
            ctx.discard_changes();
        }
        match self.transaction_context(kind) {
            Some(ctx) if ctx.in_transaction() => ctx.rollback_transaction().await,
            _ => Ok(()),
        }
    }

    pub fn has_active_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    /// Ends the unit of work. A transaction left open is rolled back.
    pub async fn finish(mut self) -> Result<(), DomainError> {
        if let Some(kind) = self.transaction {
            warn!(context = %kind, "Unit of work finished with an open transaction; rolling back");
            self.rollback().await?;
        }
        Ok(())
    }

    fn transaction_context(&mut self, kind: ContextKind) -> Option<&mut DataContext> {
        self.contexts.iter_mut().find(|c| c.kind() == kind)
    }
}

fn stamp_audit(entries: &mut [TrackedEntry], actor: Option<TenantId>, now: DateTime<Utc>) {
    for entry in entries {
        match entry.state {
            EntryState::Added => {
                if let Some(audit) = entry.entity.audit_mut() {
                    audit.stamp_created(actor, now);
                }
            }
            EntryState::Modified => {
                if let Some(audit) = entry.entity.audit_mut() {
                    audit.stamp_updated(actor, now);
                }
            }
            EntryState::Deleted => {
                if let Some(audit) = entry.entity.audit_mut() {
                    audit.mark_deleted(actor, now);
                    entry.state = EntryState::Modified;
                }
            }
            EntryState::Unchanged | EntryState::Detached => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::EntityQuery;
    use crate::testing::{memory_provider, Note, Setting, MASTER};
    use crate::sharding::{ConnectionDescriptor, ShardedContextProvider};

    fn shard_ctx(tenant: i64) -> TenantContext {
        TenantContext::resolved(tenant, 1)
    }

    #[tokio::test]
    async fn test_context_is_memoized_per_kind() {
        let (source, provider) = memory_provider(2);
        TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            uow.shard().await.unwrap();
            uow.context(ContextKind::Shard(1)).await.unwrap();
            uow.master().await.unwrap();
            assert_eq!(uow.owned_contexts().count(), 2);
        })
        .await;
        assert_eq!(source.store_count(), 2);
    }

    #[tokio::test]
    async fn test_shard_requires_resolved_tenant() {
        let (_, provider) = memory_provider(2);
        let mut uow = UnitOfWork::new(provider);
        assert!(matches!(uow.shard().await, Err(DomainError::TenantNotResolved(_))));
        assert!(!uow.has_contexts());
    }

    #[tokio::test]
    async fn test_insert_stamps_created_only() {
        let (_, provider) = memory_provider(1);
        TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            let key = uow.shard().await.unwrap().add(Note::new(42, "first")).unwrap();
            assert_eq!(uow.save_changes().await.unwrap(), 1);

            let note = uow.shard().await.unwrap().entity::<Note>(key).cloned().unwrap();
            assert_eq!(note.audit.created_by, Some(42));
            assert!(note.audit.created_at.is_some());
            assert_eq!(note.audit.updated_by, None);
            assert!(!note.audit.is_deleted);
        })
        .await;
    }

    #[tokio::test]
    async fn test_update_stamps_updated_and_keeps_created() {
        let (_, provider) = memory_provider(1);
        TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            let shard = uow.shard().await.unwrap();
            let key = shard.add(Note::new(42, "first")).unwrap();
            uow.save_changes().await.unwrap();

            let shard = uow.shard().await.unwrap();
            let mut note = shard.entity::<Note>(key).cloned().unwrap();
            let created_at = note.audit.created_at;
            note.text = "second".into();
            shard.update(note.clone()).unwrap();
            assert_eq!(uow.save_changes().await.unwrap(), 1);

            let stored = uow.shard().await.unwrap().find::<Note>(note.id.unwrap()).await.unwrap().unwrap();
            assert_eq!(stored.text, "second");
            assert_eq!(stored.audit.created_by, Some(42));
            assert_eq!(stored.audit.created_at, created_at);
            assert_eq!(stored.audit.updated_by, Some(42));
        })
        .await;
    }

    #[tokio::test]
    async fn test_delete_of_auditable_entity_is_soft() {
        let (source, provider) = memory_provider(1);
        TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            let key = uow.shard().await.unwrap().add(Note::new(42, "gone")).unwrap();
            uow.save_changes().await.unwrap();
            let note = uow.shard().await.unwrap().entity::<Note>(key).cloned().unwrap();
            let id = note.id.unwrap();

            uow.shard().await.unwrap().remove(note).unwrap();
            uow.save_changes().await.unwrap();

            let shard = uow.shard().await.unwrap();
            assert!(shard.find::<Note>(id).await.unwrap().is_none());
            let deleted = shard.find_including_deleted::<Note>(id).await.unwrap().unwrap();
            assert!(deleted.audit.is_deleted);
            assert_eq!(deleted.audit.updated_by, Some(42));
        })
        .await;

        let rows = source.store(&ConnectionDescriptor::new("Server=x;Database=Shard1;")).rows("notes");
        assert_eq!(rows.len(), 1);
        assert!(rows[0].is_deleted);
    }

    #[tokio::test]
    async fn test_delete_of_plain_entity_is_physical() {
        let (source, provider) = memory_provider(1);
        let mut uow = UnitOfWork::new(provider);
        let master = uow.master().await.unwrap();
        let key = master.add(Setting { id: None, key: "theme".into() }).unwrap();
        uow.save_changes().await.unwrap();
        let setting = uow.master().await.unwrap().entity::<Setting>(key).cloned().unwrap();
        uow.master().await.unwrap().remove(setting).unwrap();
        assert_eq!(uow.save_changes().await.unwrap(), 1);
        assert_eq!(source.store(&ConnectionDescriptor::new(MASTER)).row_count("settings"), 0);
    }

    #[tokio::test]
    async fn test_transaction_lifecycle_faults() {
        let (_, provider) = memory_provider(1);
        let mut uow = UnitOfWork::new(provider);
        assert!(matches!(uow.begin_transaction().await, Err(DomainError::InvalidUsage(_))));
        assert!(matches!(uow.commit().await, Err(DomainError::InvalidUsage(_))));
        assert!(matches!(uow.rollback().await, Err(DomainError::InvalidUsage(_))));

        uow.master().await.unwrap();
        uow.begin_transaction().await.unwrap();
        assert!(matches!(uow.begin_transaction().await, Err(DomainError::InvalidUsage(_))));
        uow.commit().await.unwrap();
        assert!(!uow.has_active_transaction());
        assert!(matches!(uow.commit().await, Err(DomainError::InvalidUsage(_))));
    }

    #[tokio::test]
    async fn test_rollback_leaves_store_untouched() {
        let (source, provider) = memory_provider(1);
        let mut uow = UnitOfWork::new(provider);
        uow.master().await.unwrap();
        uow.begin_transaction().await.unwrap();
        uow.master().await.unwrap().add(Setting { id: None, key: "k".into() }).unwrap();
        uow.save_changes().await.unwrap();
        uow.rollback().await.unwrap();
        assert_eq!(source.store(&ConnectionDescriptor::new(MASTER)).row_count("settings"), 0);
    }

    #[tokio::test]
    async fn test_finish_rolls_back_open_transaction() {
        let (source, provider) = memory_provider(1);
        let mut uow = UnitOfWork::new(provider);
        uow.master().await.unwrap();
        uow.begin_transaction().await.unwrap();
        uow.master().await.unwrap().add(Setting { id: None, key: "k".into() }).unwrap();
        uow.save_changes().await.unwrap();
        uow.finish().await.unwrap();
        assert_eq!(source.store(&ConnectionDescriptor::new(MASTER)).row_count("settings"), 0);
    }

    #[tokio::test]
    async fn test_cannot_write_other_tenants_entity() {
        let (_, provider) = memory_provider(1);
        TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            let shard = uow.shard().await.unwrap();
            assert!(matches!(shard.add(Note::new(7, "x")), Err(DomainError::TenantIsolation(_))));
        })
        .await;
    }

    async fn saved_note(provider: Arc<ShardedContextProvider>, tenant: i64, text: &str) -> Note {
        TenantContext::scope(shard_ctx(tenant), async {
            let mut uow = UnitOfWork::new(provider);
            let key = uow.shard().await.unwrap().add(Note::new(tenant, text)).unwrap();
            uow.save_changes().await.unwrap();
            uow.shard().await.unwrap().entity::<Note>(key).cloned().unwrap()
        })
        .await
    }

    #[tokio::test]
    async fn test_forged_update_leaves_foreign_row_alone() {
        let (source, provider) = memory_provider(1);
        let original = saved_note(provider.clone(), 7, "bob's").await;
        let id = original.id.unwrap();

        let written = TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider.clone());
            let mut forged = Note::new(42, "HIJACKED");
            forged.id = Some(id);
            uow.shard().await.unwrap().update(forged).unwrap();
            uow.save_changes().await.unwrap()
        })
        .await;
        assert_eq!(written, 0);

        let rows = source.store(&ConnectionDescriptor::new("Server=x;Database=Shard1;")).rows("notes");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].owner_id, Some(7));
        assert_eq!(rows[0].body["text"], "bob's");

        let seen = TenantContext::scope(shard_ctx(7), async {
            let mut uow = UnitOfWork::new(provider);
            uow.shard().await.unwrap().find::<Note>(id).await.unwrap()
        })
        .await;
        assert_eq!(seen.map(|n| n.text), Some("bob's".to_string()));
    }

    #[tokio::test]
    async fn test_forged_remove_leaves_foreign_row_alone() {
        let (source, provider) = memory_provider(1);
        let original = saved_note(provider.clone(), 7, "bob's").await;
        let id = original.id.unwrap();

        let written = TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider.clone());
            let mut forged = original.clone();
            forged.tenant_id = 42;
            uow.shard().await.unwrap().remove(forged).unwrap();
            uow.save_changes().await.unwrap()
        })
        .await;
        assert_eq!(written, 0);

        let rows = source.store(&ConnectionDescriptor::new("Server=x;Database=Shard1;")).rows("notes");
        assert_eq!(rows[0].owner_id, Some(7));
        assert!(!rows[0].is_deleted);

        let seen = TenantContext::scope(shard_ctx(7), async {
            let mut uow = UnitOfWork::new(provider);
            uow.shard().await.unwrap().find::<Note>(id).await.unwrap()
        })
        .await;
        assert!(seen.is_some());
    }

    #[tokio::test]
    async fn test_query_is_scoped_to_tenant() {
        let (_, provider) = memory_provider(1);
        for (tenant, text) in [(42, "a"), (42, "b"), (7, "c")] {
            let provider = provider.clone();
            TenantContext::scope(shard_ctx(tenant), async move {
                let mut uow = UnitOfWork::new(provider);
                uow.shard().await.unwrap().add(Note::new(tenant, text)).unwrap();
                uow.save_changes().await.unwrap();
            })
            .await;
        }

        let page = TenantContext::scope(shard_ctx(42), async {
            let mut uow = UnitOfWork::new(provider);
            uow.shard().await.unwrap().query::<Note>(EntityQuery::new()).await.unwrap()
        })
        .await;
        assert_eq!(page.total_count, 2);
        assert!(page.items.iter().all(|n| n.tenant_id == 42 && n.id.is_some()));
    }

    #[tokio::test]
    async fn test_cancelled_unit_of_work_fails_fast() {
        let (_, provider) = memory_provider(1);
        let token = CancellationToken::new();
        let mut uow = UnitOfWork::with_cancellation(provider, token.clone());
        uow.master().await.unwrap().add(Setting { id: None, key: "k".into() }).unwrap();
        token.cancel();
        assert!(matches!(uow.save_changes().await, Err(DomainError::Cancelled)));
        assert!(matches!(uow.master().await, Err(DomainError::Cancelled)));
    }
}
