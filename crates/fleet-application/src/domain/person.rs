// ============================================================================
// Fleet Application - Person Entity
// File: crates/fleet-application/src/domain/person.rs
// Description: Tenant profile stored on the tenant's shard
// ============================================================================

use serde::{Deserialize, Serialize};
use tenancy_core::Entity;
use tenancy_shared::{AuditFields, EntityId, TenantId};
use uuid::Uuid;

/// Shard-side profile of a tenant, written once while provisioning.
///
/// Shares its `sync_id` with the master [`TenantRecord`](tenancy_core::TenantRecord).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub tenant_id: TenantId,
    pub sync_id: Uuid,
    pub name: String,

    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Person {
    pub fn new(tenant_id: TenantId, sync_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: None,
            tenant_id,
            sync_id,
            name: name.into(),
            audit: AuditFields::default(),
        }
    }
}

impl Entity for Person {
    const TABLE: &'static str = "persons";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn audit(&self) -> Option<&AuditFields> {
        Some(&self.audit)
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        Some(&mut self.audit)
    }

    fn owner(&self) -> Option<TenantId> {
        Some(self.tenant_id)
    }
}
