//! Persisted entity contract and capability declarations.

use std::any::Any;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tenancy_shared::{AuditFields, EntityId, TenantId};

use crate::error::DomainError;

/// A row type stored in a master or shard context.
///
/// Capabilities are opt-in. An entity becomes *auditable* by returning its
/// [`AuditFields`] from [`Entity::audit`] / [`Entity::audit_mut`], and
/// *tenant scoped* by returning its owner from [`Entity::owner`]. Nothing else
/// is required for the soft-delete and tenant filters or for audit stamping
/// to apply.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Backing table name. Lowercase ascii, digits and underscores only.
    const TABLE: &'static str;

    fn id(&self) -> Option<EntityId>;

    fn set_id(&mut self, id: EntityId);

    fn audit(&self) -> Option<&AuditFields> {
        None
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        None
    }

    /// Owning tenant of a tenant-scoped entity.
    fn owner(&self) -> Option<TenantId> {
        None
    }

    fn is_deleted(&self) -> bool {
        self.audit().map(|a| a.is_deleted).unwrap_or(false)
    }
}

/// Object-safe view of an [`Entity`] held by a change tracker.
pub(crate) trait TrackedEntity: Send + Sync {
    fn table(&self) -> &'static str;
    fn id(&self) -> Option<EntityId>;
    fn set_id(&mut self, id: EntityId);
    fn owner(&self) -> Option<TenantId>;
    fn audit_mut(&mut self) -> Option<&mut AuditFields>;
    fn is_deleted(&self) -> bool;
    fn to_body(&self) -> Result<Value, DomainError>;
    fn as_any(&self) -> &dyn Any;
}

impl<E: Entity> TrackedEntity for E {
    fn table(&self) -> &'static str {
        E::TABLE
    }

    fn id(&self) -> Option<EntityId> {
        Entity::id(self)
    }

    fn set_id(&mut self, id: EntityId) {
        Entity::set_id(self, id)
    }

    fn owner(&self) -> Option<TenantId> {
        Entity::owner(self)
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        Entity::audit_mut(self)
    }

    fn is_deleted(&self) -> bool {
        Entity::is_deleted(self)
    }

    fn to_body(&self) -> Result<Value, DomainError> {
        Ok(serde_json::to_value(self)?)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Table names are lowercase ASCII letters, digits and underscores.
pub fn validate_table_name(table: &str) -> Result<(), DomainError> {
    let valid = !table.is_empty()
        && table
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(DomainError::Configuration(format!("invalid table name: {:?}", table)))
    }
}
