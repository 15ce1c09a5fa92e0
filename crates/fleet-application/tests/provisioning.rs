//! Master/shard provisioning when the shard side fails.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::*;
use fleet_application::ProvisionTenant;
use tenancy_core::persistence::{RowQuery, RowValues, StoreSession, StoredRow};
use tenancy_core::{ConnectionDescriptor, DomainError, MemorySessionSource, SessionSource};
use tenancy_shared::{EntityId, TenantId};

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
    shard_open: bool,
    shard_insert: bool,
    master_delete: bool,
}

/// Memory source that injects faults by database name.
struct FaultySource {
    inner: Arc<MemorySessionSource>,
    faults: Faults,
}

#[async_trait]
impl SessionSource for FaultySource {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn StoreSession>, DomainError> {
        let is_shard = descriptor.database().is_some_and(|db| db.starts_with("Shard"));
        if is_shard && self.faults.shard_open {
            return Err(DomainError::DatabaseError("shard unreachable".into()));
        }
        let inner = self.inner.open(descriptor).await?;
        Ok(Box::new(FaultySession {
            inner,
            fail_insert: is_shard && self.faults.shard_insert,
            fail_delete: !is_shard && self.faults.master_delete,
        }))
    }
}

struct FaultySession {
    inner: Box<dyn StoreSession>,
    fail_insert: bool,
    fail_delete: bool,
}

#[async_trait]
impl StoreSession for FaultySession {
    async fn find(&mut self, table: &str, id: EntityId) -> Result<Option<StoredRow>, DomainError> {
        self.inner.find(table, id).await
    }

    async fn query(&mut self, table: &str, query: &RowQuery) -> Result<Vec<StoredRow>, DomainError> {
        self.inner.query(table, query).await
    }

    async fn count(&mut self, table: &str, query: &RowQuery) -> Result<u64, DomainError> {
        self.inner.count(table, query).await
    }

    async fn insert(&mut self, table: &str, values: RowValues) -> Result<EntityId, DomainError> {
        if self.fail_insert {
            return Err(DomainError::DatabaseError(format!("insert into {} rejected", table)));
        }
        self.inner.insert(table, values).await
    }

    async fn update(
        &mut self,
        table: &str,
        id: EntityId,
        owner: Option<TenantId>,
        values: RowValues,
    ) -> Result<u64, DomainError> {
        self.inner.update(table, id, owner, values).await
    }

    async fn delete(&mut self, table: &str, id: EntityId, owner: Option<TenantId>) -> Result<u64, DomainError> {
        if self.fail_delete {
            return Err(DomainError::DatabaseError(format!("delete from {} rejected", table)));
        }
        self.inner.delete(table, id, owner).await
    }

    async fn begin(&mut self) -> Result<(), DomainError> {
        self.inner.begin().await
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        self.inner.commit().await
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        self.inner.rollback().await
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }
}

fn faulty_runtime(faults: Faults) -> (Arc<MemorySessionSource>, fleet_application::FleetRuntime) {
    let memory = Arc::new(MemorySessionSource::new());
    let source = Arc::new(FaultySource { inner: memory.clone(), faults });
    (memory, runtime(source, &sharding(2)))
}

#[tokio::test]
async fn test_failed_shard_insert_removes_master_row() {
    let (memory, runtime) = faulty_runtime(Faults { shard_insert: true, ..Faults::default() });

    let result = runtime.dispatcher().dispatch(ProvisionTenant::new("alice", PASSWORD)).await;

    assert!(matches!(result, Err(DomainError::DatabaseError(ref msg)) if msg.contains("persons")));
    assert_eq!(master_store(&memory).row_count("tenants"), 0);
    for shard in [1, 2] {
        assert_eq!(shard_store(&memory, shard).row_count("persons"), 0);
    }
}

#[tokio::test]
async fn test_unreachable_shard_removes_master_row() {
    let (memory, runtime) = faulty_runtime(Faults { shard_open: true, ..Faults::default() });

    let result = runtime.dispatcher().dispatch(ProvisionTenant::new("alice", PASSWORD)).await;

    assert!(matches!(result, Err(DomainError::DatabaseError(ref msg)) if msg == "shard unreachable"));
    assert_eq!(master_store(&memory).row_count("tenants"), 0);
}

#[tokio::test]
async fn test_failed_cleanup_still_reports_shard_fault() {
    let (memory, runtime) = faulty_runtime(Faults {
        shard_insert: true,
        master_delete: true,
        ..Faults::default()
    });

    let result = runtime.dispatcher().dispatch(ProvisionTenant::new("alice", PASSWORD)).await;

    assert!(matches!(result, Err(DomainError::DatabaseError(ref msg)) if msg.contains("persons")));
    // Cleanup is best effort; the orphaned master row is left for an operator.
    assert_eq!(master_store(&memory).row_count("tenants"), 1);
}

#[tokio::test]
async fn test_username_is_free_again_after_cleanup() {
    let memory = Arc::new(MemorySessionSource::new());
    let failing = runtime(
        Arc::new(FaultySource {
            inner: memory.clone(),
            faults: Faults { shard_insert: true, ..Faults::default() },
        }),
        &sharding(2),
    );
    assert!(failing.dispatcher().dispatch(ProvisionTenant::new("alice", PASSWORD)).await.is_err());

    let healthy = runtime(memory.clone(), &sharding(2));
    let retried = healthy.dispatcher().dispatch(ProvisionTenant::new("alice", PASSWORD)).await.unwrap();
    assert!(retried.is_success());
    assert_eq!(master_store(&memory).row_count("tenants"), 1);
}
