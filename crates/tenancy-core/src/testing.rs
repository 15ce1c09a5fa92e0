//! Fixtures shared by the unit tests.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tenancy_shared::config::ShardingSettings;
use tenancy_shared::{AuditFields, EntityId, TenantId};

use crate::persistence::{Entity, MemorySessionSource};
use crate::sharding::{ConnectionDescriptor, ShardConnectionRouter, ShardedContextProvider};

pub(crate) const MASTER: &str = "Server=x;Database=Master;";

/// Tenant-scoped, auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Note {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub tenant_id: TenantId,
    pub text: String,
    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Note {
    pub fn new(tenant_id: TenantId, text: &str) -> Self {
        Self { id: None, tenant_id, text: text.into(), audit: AuditFields::default() }
    }
}

impl Entity for Note {
    const TABLE: &'static str = "notes";

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

/// Neither scoped nor auditable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Setting {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub key: String,
}

impl Entity for Setting {
    const TABLE: &'static str = "settings";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }
}

pub(crate) fn memory_provider(total_shards: u32) -> (Arc<MemorySessionSource>, Arc<ShardedContextProvider>) {
    let source = Arc::new(MemorySessionSource::new());
    let router = ShardConnectionRouter::new(&ShardingSettings::new("Server=x;", total_shards))
        .expect("valid sharding settings");
    let provider = ShardedContextProvider::new(ConnectionDescriptor::new(MASTER), router, source.clone());
    (source, Arc::new(provider))
}
