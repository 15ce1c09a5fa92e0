//! Data context: one store session plus its change tracker.
//!
//! Handlers stage mutations with [`DataContext::add`], [`DataContext::update`]
//! and [`DataContext::remove`]; nothing reaches the store until the owning
//! [`UnitOfWork`](super::UnitOfWork) saves. Reads go straight to the store
//! through the context's [`EntityFilter`].

use serde_json::Value;
use tenancy_shared::{EntityId, PagedResult, Pagination, ShardId};
use tracing::{debug, error, warn};

use super::entity::{validate_table_name, Entity, TrackedEntity};
use super::filter::EntityFilter;
use super::session::{RowQuery, RowValues, StoreSession, TextSearch};
use crate::cancellation::{cancellable, CancellationToken};
use crate::error::DomainError;
use crate::sharding::ConnectionDescriptor;

/// Which database a context talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextKind {
    Master,
    Shard(ShardId),
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextKind::Master => write!(f, "master"),
            ContextKind::Shard(id) => write!(f, "shard {}", id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
    Unchanged,
    /// Added and then removed before it was ever saved.
    Detached,
}

/// Handle to a tracked entry, valid for the lifetime of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryKey(usize);

pub(crate) struct TrackedEntry {
    pub(crate) state: EntryState,
    pub(crate) entity: Box<dyn TrackedEntity>,
}

/// Read options for [`DataContext::query`].
#[derive(Debug, Clone, Default)]
pub struct EntityQuery {
    matching: Option<Value>,
    search: Option<TextSearch>,
    pagination: Option<Pagination>,
    include_deleted: bool,
}

impl EntityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body must contain this JSON object.
    pub fn matching(mut self, matching: Value) -> Self {
        self.matching = Some(matching);
        self
    }

    pub fn search(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        if !needle.trim().is_empty() {
            self.search = Some(TextSearch { field: field.into(), needle: needle.trim().to_string() });
        }
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Overrides the soft-delete filter. The tenant filter cannot be overridden.
    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }
}

pub struct DataContext {
    kind: ContextKind,
    descriptor: ConnectionDescriptor,
    filter: EntityFilter,
    session: Box<dyn StoreSession>,
    entries: Vec<TrackedEntry>,
    cancel: CancellationToken,
}

impl DataContext {
    pub fn new(
        kind: ContextKind,
        descriptor: ConnectionDescriptor,
        filter: EntityFilter,
        session: Box<dyn StoreSession>,
    ) -> Self {
        Self {
            kind,
            descriptor,
            filter,
            session,
            entries: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    pub fn filter(&self) -> &EntityFilter {
        &self.filter
    }

    pub async fn find<E: Entity>(&mut self, id: EntityId) -> Result<Option<E>, DomainError> {
        self.find_with(id, false).await
    }

    /// Like [`DataContext::find`] but also returns soft-deleted rows.
    pub async fn find_including_deleted<E: Entity>(&mut self, id: EntityId) -> Result<Option<E>, DomainError> {
        self.find_with(id, true).await
    }

    async fn find_with<E: Entity>(&mut self, id: EntityId, include_deleted: bool) -> Result<Option<E>, DomainError> {
        validate_table_name(E::TABLE)?;
        let row = cancellable(&self.cancel, self.session.find(E::TABLE, id)).await?;
        let Some(row) = row else {
            return Ok(None);
        };
        if !self.filter.admits_row(&row, include_deleted) {
            return Ok(None);
        }
        let entity = decode::<E>(row.id, row.body)?;
        Ok(self.filter.admits(&entity, include_deleted).then_some(entity))
    }

    pub async fn query<E: Entity>(&mut self, query: EntityQuery) -> Result<PagedResult<E>, DomainError> {
        validate_table_name(E::TABLE)?;
        let pagination = query.pagination.unwrap_or_default();
        let mut rows_query = RowQuery {
            owner: self.filter.tenant(),
            include_deleted: query.include_deleted,
            matching: query.matching,
            search: query.search,
            offset: 0,
            limit: None,
        };

        let total_count = cancellable(&self.cancel, self.session.count(E::TABLE, &rows_query)).await?;
        if query.pagination.is_some() {
            rows_query.offset = pagination.offset();
            rows_query.limit = Some(u64::from(pagination.per_page));
        }
        let rows = cancellable(&self.cancel, self.session.query(E::TABLE, &rows_query)).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            if !self.filter.admits_row(&row, rows_query.include_deleted) {
                continue;
            }
            let entity = decode::<E>(row.id, row.body)?;
            if self.filter.admits(&entity, rows_query.include_deleted) {
                items.push(entity);
            }
        }

        Ok(PagedResult {
            items,
            total_count,
            page: pagination.page,
            per_page: pagination.per_page,
        })
    }

    /// First visible entity whose body contains `matching`.
    pub async fn first<E: Entity>(&mut self, matching: Value) -> Result<Option<E>, DomainError> {
        let page = self
            .query::<E>(EntityQuery::new().matching(matching).paginate(Pagination::new(1, 1)))
            .await?;
        Ok(page.items.into_iter().next())
    }

    pub fn add<E: Entity>(&mut self, entity: E) -> Result<EntryKey, DomainError> {
        validate_table_name(E::TABLE)?;
        self.filter.guard_write(&entity)?;
        self.entries.push(TrackedEntry { state: EntryState::Added, entity: Box::new(entity) });
        Ok(EntryKey(self.entries.len() - 1))
    }

    pub fn update<E: Entity>(&mut self, entity: E) -> Result<EntryKey, DomainError> {
        self.track_existing(entity, EntryState::Modified)
    }

    /// Stages a delete. Auditable entities are soft deleted at save time.
    pub fn remove<E: Entity>(&mut self, entity: E) -> Result<EntryKey, DomainError> {
        self.track_existing(entity, EntryState::Deleted)
    }

    fn track_existing<E: Entity>(&mut self, entity: E, state: EntryState) -> Result<EntryKey, DomainError> {
        validate_table_name(E::TABLE)?;
        self.filter.guard_write(&entity)?;
        let id = Entity::id(&entity).ok_or_else(|| {
            DomainError::InvalidUsage(format!("cannot {:?} a {} row that has no id", state, E::TABLE))
        })?;

        let existing = self
            .entries
            .iter()
            .position(|e| e.entity.table() == E::TABLE && e.entity.id() == Some(id));

        match existing {
            Some(index) => {
                let entry = &mut self.entries[index];
                entry.state = match (entry.state, state) {
                    (EntryState::Added, EntryState::Modified) => EntryState::Added,
                    (EntryState::Added, EntryState::Deleted) => EntryState::Detached,
                    (_, next) => next,
                };
                entry.entity = Box::new(entity);
                Ok(EntryKey(index))
            }
            None => {
                self.entries.push(TrackedEntry { state, entity: Box::new(entity) });
                Ok(EntryKey(self.entries.len() - 1))
            }
        }
    }

    /// Tracked copy of an entity, including store-assigned ids after save.
    pub fn entity<E: Entity>(&self, key: EntryKey) -> Option<&E> {
        self.entries.get(key.0).and_then(|e| e.entity.as_any().downcast_ref::<E>())
    }

    pub fn state(&self, key: EntryKey) -> Option<EntryState> {
        self.entries.get(key.0).map(|e| e.state)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending_count() > 0
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.state, EntryState::Added | EntryState::Modified | EntryState::Deleted))
            .count()
    }

    /// Drops every staged mutation without touching the store.
    pub fn discard_changes(&mut self) {
        self.entries.retain(|e| e.state == EntryState::Unchanged);
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [TrackedEntry] {
        &mut self.entries
    }

    pub fn in_transaction(&self) -> bool {
        self.session.in_transaction()
    }

    pub(crate) async fn begin_transaction(&mut self) -> Result<(), DomainError> {
        cancellable(&self.cancel, self.session.begin()).await
    }

    pub(crate) async fn commit_transaction(&mut self) -> Result<(), DomainError> {
        cancellable(&self.cancel, self.session.commit()).await
    }

    pub(crate) async fn rollback_transaction(&mut self) -> Result<(), DomainError> {
        // Rollback must run even when the request was cancelled.
        self.session.rollback().await
    }

    /// Writes every staged mutation as-is and returns the affected row count.
    ///
    /// Audit stamping is not applied here; that is the unit of work's job.
    /// When no transaction is open, the flush runs in its own transaction so a
    /// context is always written all-or-nothing.
    pub(crate) async fn save_changes(&mut self) -> Result<u64, DomainError> {
        if !self.has_pending_changes() {
            return Ok(0);
        }

        let own_transaction = !self.session.in_transaction();
        if own_transaction {
            self.begin_transaction().await?;
        }

        let flushed = self.flush().await;
        let flushed = match flushed {
            Ok(flushed) if own_transaction => self.commit_transaction().await.map(|_| flushed),
            other => other,
        };

        match flushed {
            Ok((affected, assigned)) => {
                for (index, id) in assigned {
                    self.entries[index].entity.set_id(id);
                }
                for entry in &mut self.entries {
                    entry.state = match entry.state {
                        EntryState::Deleted | EntryState::Detached => EntryState::Detached,
                        _ => EntryState::Unchanged,
                    };
                }
                debug!(context = %self.kind, rows = affected, "Flushed changes");
                Ok(affected)
            }
            Err(e) => {
                error!(context = %self.kind, "Failed to flush changes: {}", e);
                if own_transaction && self.session.in_transaction() {
                    if let Err(rollback_err) = self.rollback_transaction().await {
                        error!(context = %self.kind, "Rollback after failed flush failed: {}", rollback_err);
                    }
                }
                Err(e)
            }
        }
    }

    async fn flush(&mut self) -> Result<(u64, Vec<(usize, EntityId)>), DomainError> {
        let Self { entries, session, cancel, filter, kind, .. } = self;
        // Rows of other tenants never match, whatever owner the entity claims.
        let owner = filter.tenant();
        let mut affected = 0u64;
        let mut assigned = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let table = entry.entity.table();
            match entry.state {
                EntryState::Added => {
                    let values = row_values(entry.entity.as_ref())?;
                    let id = cancellable(cancel, session.insert(table, values)).await?;
                    assigned.push((index, id));
                    affected += 1;
                }
                EntryState::Modified => {
                    let id = require_id(entry.entity.as_ref())?;
                    let values = row_values(entry.entity.as_ref())?;
                    let rows = cancellable(cancel, session.update(table, id, owner, values)).await?;
                    if rows == 0 {
                        warn!(context = %kind, table, id, "Update matched no visible row");
                    }
                    affected += rows;
                }
                EntryState::Deleted => {
                    let id = require_id(entry.entity.as_ref())?;
                    let rows = cancellable(cancel, session.delete(table, id, owner)).await?;
                    if rows == 0 {
                        warn!(context = %kind, table, id, "Delete matched no visible row");
                    }
                    affected += rows;
                }
                EntryState::Unchanged | EntryState::Detached => {}
            }
        }

        Ok((affected, assigned))
    }
}

fn require_id(entity: &dyn TrackedEntity) -> Result<EntityId, DomainError> {
    entity
        .id()
        .ok_or_else(|| DomainError::InvalidUsage(format!("{} row has no id", entity.table())))
}

fn row_values(entity: &dyn TrackedEntity) -> Result<RowValues, DomainError> {
    Ok(RowValues {
        owner_id: entity.owner(),
        is_deleted: entity.is_deleted(),
        body: entity.to_body()?,
    })
}

fn decode<E: Entity>(id: EntityId, body: Value) -> Result<E, DomainError> {
    let mut entity: E = serde_json::from_value(body)?;
    Entity::set_id(&mut entity, id);
    Ok(entity)
}
