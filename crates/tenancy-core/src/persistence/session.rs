//! Store session port.
//!
//! Entities are persisted as documents: every table has the same shape
//! (`id`, `owner_id`, `is_deleted`, `body`), so the filters can be expressed
//! once for every entity type.

use async_trait::async_trait;
use serde_json::Value;
use tenancy_shared::{EntityId, TenantId};

use crate::error::DomainError;
use crate::sharding::ConnectionDescriptor;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: EntityId,
    pub owner_id: Option<TenantId>,
    pub is_deleted: bool,
    pub body: Value,
}

/// Column values written on insert or update.
#[derive(Debug, Clone, PartialEq)]
pub struct RowValues {
    pub owner_id: Option<TenantId>,
    pub is_deleted: bool,
    pub body: Value,
}

/// Case-insensitive substring match on one top-level string field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    pub field: String,
    pub needle: String,
}

/// Row selection pushed down to the store.
///
/// `owner` restricts rows to `owner_id IS NULL OR owner_id = owner`; rows of
/// entities without an owner always pass. `matching` is a JSON object the
/// body must contain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    pub owner: Option<TenantId>,
    pub include_deleted: bool,
    pub matching: Option<Value>,
    pub search: Option<TextSearch>,
    pub offset: u64,
    pub limit: Option<u64>,
}

impl RowQuery {
    /// Applies `owner`, `include_deleted`, `matching` and `search`. Paging is
    /// left to the caller.
    pub fn selects(&self, row: &StoredRow) -> bool {
        owner_admits(self.owner, row.owner_id)
            && (self.include_deleted || !row.is_deleted)
            && self.matching.as_ref().map_or(true, |m| json_contains(&row.body, m))
            && self.search.as_ref().map_or(true, |s| {
                row.body
                    .get(&s.field)
                    .and_then(Value::as_str)
                    .map_or(false, |v| v.to_lowercase().contains(&s.needle.to_lowercase()))
            })
    }
}

/// `owner_id IS NULL OR owner_id = owner`, with no restriction when `owner`
/// is unset.
pub fn owner_admits(owner: Option<TenantId>, row_owner: Option<TenantId>) -> bool {
    match (owner, row_owner) {
        (Some(owner), Some(row_owner)) => owner == row_owner,
        _ => true,
    }
}

/// JSON containment with the semantics of PostgreSQL's `@>` for objects and scalars.
pub fn json_contains(haystack: &Value, needle: &Value) -> bool {
    match (haystack, needle) {
        (Value::Object(h), Value::Object(n)) => n
            .iter()
            .all(|(k, v)| h.get(k).map_or(false, |hv| json_contains(hv, v))),
        (Value::Array(h), Value::Array(n)) => n.iter().all(|nv| h.iter().any(|hv| json_contains(hv, nv))),
        (h, n) => h == n,
    }
}

/// One open connection (or connection-pool handle) to a single database.
///
/// A session is exclusively owned by one data context; at most one
/// transaction is open on it at a time.
#[async_trait]
pub trait StoreSession: Send + Sync {
    async fn find(&mut self, table: &str, id: EntityId) -> Result<Option<StoredRow>, DomainError>;

    async fn query(&mut self, table: &str, query: &RowQuery) -> Result<Vec<StoredRow>, DomainError>;

    async fn count(&mut self, table: &str, query: &RowQuery) -> Result<u64, DomainError>;

    async fn insert(&mut self, table: &str, values: RowValues) -> Result<EntityId, DomainError>;

    /// Returns the number of rows updated. A row owned by someone other than
    /// `owner` is left alone and counts as missing.
    async fn update(
        &mut self,
        table: &str,
        id: EntityId,
        owner: Option<TenantId>,
        values: RowValues,
    ) -> Result<u64, DomainError>;

    /// Physical delete, guarded by `owner` like [`StoreSession::update`].
    /// Only reached for entities without audit columns.
    async fn delete(&mut self, table: &str, id: EntityId, owner: Option<TenantId>) -> Result<u64, DomainError>;

    async fn begin(&mut self) -> Result<(), DomainError>;

    async fn commit(&mut self) -> Result<(), DomainError>;

    async fn rollback(&mut self) -> Result<(), DomainError>;

    fn in_transaction(&self) -> bool;
}

/// Opens store sessions for connection descriptors.
///
/// Implementations may pool connections per descriptor and share the pools
/// across requests; the sessions they hand out are never shared.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn StoreSession>, DomainError>;
}
