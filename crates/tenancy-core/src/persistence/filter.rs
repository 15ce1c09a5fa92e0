//! Always-on read filters.
//!
//! Every data context carries an [`EntityFilter`] fixed at construction from
//! the ambient [`TenantContext`](crate::TenantContext):
//!
//! * **tenant filter**: rows of tenant-scoped entities must be owned by the
//!   current tenant. The filter is bypassed only when no tenant is set, which
//!   happens in exactly one flow: provisioning, where the first write for a new
//!   tenant happens before its id exists. It is not a general escape hatch.
//! * **soft-delete filter**: rows flagged `is_deleted` are hidden unless the
//!   caller asks for them explicitly.
//!
//! Both predicates are pushed down to the store (see
//! [`RowQuery`](super::session::RowQuery)) and re-checked on the decoded
//! entity, so an entity type inherits them as soon as it declares the
//! capability.

use tenancy_shared::TenantId;

use super::entity::Entity;
use super::session::StoredRow;
use crate::context::TenantContext;
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityFilter {
    tenant: Option<TenantId>,
}

impl EntityFilter {
    pub fn for_context(ctx: &TenantContext) -> Self {
        Self { tenant: ctx.tenant_id }
    }

    pub fn tenant(&self) -> Option<TenantId> {
        self.tenant
    }

    /// True when the tenant predicate is bypassed (provisioning only).
    pub fn is_bypassed(&self) -> bool {
        self.tenant.is_none()
    }

    pub fn admits_row(&self, row: &StoredRow, include_deleted: bool) -> bool {
        self.owner_visible(row.owner_id) && (include_deleted || !row.is_deleted)
    }

    pub fn admits<E: Entity>(&self, entity: &E, include_deleted: bool) -> bool {
        self.owner_visible(entity.owner()) && (include_deleted || !entity.is_deleted())
    }

    /// Rejects mutations of entities owned by another tenant.
    pub fn guard_write<E: Entity>(&self, entity: &E) -> Result<(), DomainError> {
        if self.owner_visible(entity.owner()) {
            Ok(())
        } else {
            Err(DomainError::TenantIsolation(format!(
                "{} row owned by tenant {:?} is not writable by tenant {:?}",
                E::TABLE,
                entity.owner(),
                self.tenant
            )))
        }
    }

    fn owner_visible(&self, owner: Option<TenantId>) -> bool {
        match (self.tenant, owner) {
            (None, _) => true,
            (Some(_), None) => true,
            (Some(current), Some(owner)) => current == owner,
        }
    }
}
