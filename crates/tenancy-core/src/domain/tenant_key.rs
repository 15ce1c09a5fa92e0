//! Tenant identifier as received at the request boundary.

use std::fmt;
use std::str::FromStr;

use tenancy_shared::TenantId;
use uuid::Uuid;

use crate::error::DomainError;

/// Either the integer tenant id or the tenant's sync id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenantKey {
    Id(TenantId),
    SyncId(Uuid),
}

impl TenantKey {
    /// Parses a header value. Integers must be positive; anything else must be
    /// a UUID.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DomainError::InvalidTenantKey("empty tenant identifier".into()));
        }
        if let Ok(id) = raw.parse::<TenantId>() {
            return if id > 0 {
                Ok(TenantKey::Id(id))
            } else {
                Err(DomainError::InvalidTenantKey(format!("tenant id must be positive: {}", id)))
            };
        }
        Uuid::parse_str(raw)
            .map(TenantKey::SyncId)
            .map_err(|_| DomainError::InvalidTenantKey(format!("not an id or sync id: {:?}", raw)))
    }
}

impl FromStr for TenantKey {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenantKey::Id(id) => write!(f, "{}", id),
            TenantKey::SyncId(sync_id) => write!(f, "{}", sync_id),
        }
    }
}

impl From<TenantId> for TenantKey {
    fn from(id: TenantId) -> Self {
        TenantKey::Id(id)
    }
}

impl From<Uuid> for TenantKey {
    fn from(sync_id: Uuid) -> Self {
        TenantKey::SyncId(sync_id)
    }
}
