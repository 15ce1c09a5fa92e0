//! Master-store tenant row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_shared::{EntityId, ShardId, TenantId};
use uuid::Uuid;

use crate::context::TenantContext;
use crate::persistence::Entity;

/// Maps a tenant to its shard. The shard never changes after provisioning.
///
/// Not tenant scoped: the master store is read before any tenant is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TenantRecord {
    #[serde(skip)]
    pub id: Option<TenantId>,
    pub sync_id: Uuid,
    pub shard_id: ShardId,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TenantRecord {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>, shard_id: ShardId) -> Self {
        Self {
            id: None,
            sync_id: Uuid::now_v7(),
            shard_id,
            username: username.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Context of this tenant, once it has been saved.
    pub fn context(&self) -> Option<TenantContext> {
        self.id.map(|id| TenantContext::resolved(id, self.shard_id))
    }
}

impl Entity for TenantRecord {
    const TABLE: &'static str = "tenants";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}
