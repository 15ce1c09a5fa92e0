//! Tenant directory (port) and its store-backed implementation

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tenancy_shared::TenantId;
use tracing::error;
use uuid::Uuid;

use crate::context::TenantContext;
use crate::domain::TenantRecord;
use crate::error::DomainError;
use crate::persistence::{ContextKind, ContextProvider};

/// Read access to the master store's tenant table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<TenantRecord>, DomainError>;
    async fn find_by_sync_id(&self, sync_id: &Uuid) -> Result<Option<TenantRecord>, DomainError>;
    async fn find_by_username(&self, username: &str) -> Result<Option<TenantRecord>, DomainError>;
}

/// Looks tenants up through a master data context.
pub struct StoreTenantDirectory {
    contexts: Arc<dyn ContextProvider>,
}

impl StoreTenantDirectory {
    pub fn new(contexts: Arc<dyn ContextProvider>) -> Self {
        Self { contexts }
    }

    async fn find_matching(&self, matching: serde_json::Value) -> Result<Option<TenantRecord>, DomainError> {
        let mut master = self.contexts.create(ContextKind::Master, TenantContext::empty()).await?;
        master.first::<TenantRecord>(matching).await.map_err(|e| {
            error!("Tenant lookup failed: {}", e);
            e
        })
    }
}

#[async_trait]
impl TenantDirectory for StoreTenantDirectory {
    async fn find_by_id(&self, id: TenantId) -> Result<Option<TenantRecord>, DomainError> {
        let mut master = self.contexts.create(ContextKind::Master, TenantContext::empty()).await?;
        master.find::<TenantRecord>(id).await
    }

    async fn find_by_sync_id(&self, sync_id: &Uuid) -> Result<Option<TenantRecord>, DomainError> {
        self.find_matching(json!({ "sync_id": sync_id })).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<TenantRecord>, DomainError> {
        self.find_matching(json!({ "username": username })).await
    }
}
