//! Common types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tenant row in the master store.
pub type TenantId = i64;
/// One-based shard number, always within `[1, total_shards]`.
pub type ShardId = u32;
/// Store-assigned row identifier.
pub type EntityId = i64;

/// Audit columns carried by every auditable entity.
///
/// These are stamped by the unit of work at save time, never by handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditFields {
    pub created_by: Option<TenantId>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_by: Option<TenantId>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
}

impl AuditFields {
    pub fn stamp_created(&mut self, by: Option<TenantId>, at: DateTime<Utc>) {
        self.created_by = by;
        self.created_at = Some(at);
        self.is_deleted = false;
    }

    pub fn stamp_updated(&mut self, by: Option<TenantId>, at: DateTime<Utc>) {
        self.updated_by = by;
        self.updated_at = Some(at);
    }

    pub fn mark_deleted(&mut self, by: Option<TenantId>, at: DateTime<Utc>) {
        self.is_deleted = true;
        self.stamp_updated(by, at);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, super::constants::MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 1, per_page: super::constants::DEFAULT_PAGE_SIZE }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page: u32,
    pub per_page: u32,
}
