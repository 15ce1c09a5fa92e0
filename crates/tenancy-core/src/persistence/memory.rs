//! In-memory document store.
//!
//! Used by tests and by the in-memory runtime. Each connection descriptor maps
//! to its own [`MemoryStore`], so a master database and N shard databases
//! behave like separate servers. Transactions work on a private snapshot and
//! replay their writes on commit; a rolled-back or abandoned transaction
//! leaves the store untouched.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tenancy_shared::{EntityId, TenantId};
use tracing::debug;

use super::session::{owner_admits, RowQuery, RowValues, SessionSource, StoreSession, StoredRow};
use crate::error::DomainError;
use crate::sharding::ConnectionDescriptor;

type Table = BTreeMap<EntityId, StoredRow>;

#[derive(Debug, Clone, Default)]
struct Tables(HashMap<String, Table>);

impl Tables {
    fn table(&self, name: &str) -> Option<&Table> {
        self.0.get(name)
    }

    fn apply(&mut self, op: &WriteOp) -> u64 {
        match op {
            WriteOp::Insert { table, row } => {
                self.0.entry(table.clone()).or_default().insert(row.id, row.clone());
                1
            }
            WriteOp::Update { table, id, owner, values } => {
                match self.0.get_mut(table).and_then(|t| t.get_mut(id)) {
                    Some(row) if owner_admits(*owner, row.owner_id) => {
                        row.owner_id = values.owner_id;
                        row.is_deleted = values.is_deleted;
                        row.body = values.body.clone();
                        1
                    }
                    _ => 0,
                }
            }
            WriteOp::Delete { table, id, owner } => match self.0.get_mut(table) {
                Some(t) if t.get(id).is_some_and(|row| owner_admits(*owner, row.owner_id)) => {
                    t.remove(id);
                    1
                }
                _ => 0,
            },
        }
    }
}

#[derive(Debug, Clone)]
enum WriteOp {
    Insert { table: String, row: StoredRow },
    Update { table: String, id: EntityId, owner: Option<TenantId>, values: RowValues },
    Delete { table: String, id: EntityId, owner: Option<TenantId> },
}

/// One in-memory database.
#[derive(Debug)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    next_id: AtomicI64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Every committed row of `table`, ignoring all filters.
    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.tables
            .lock()
            .table(table)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.lock().table(table).map_or(0, BTreeMap::len)
    }

    /// Writes `row` as committed data, keeping its id. Later inserts get ids
    /// above every seeded one.
    pub fn seed(&self, table: &str, row: StoredRow) {
        self.next_id.fetch_max(row.id + 1, Ordering::SeqCst);
        self.tables
            .lock()
            .apply(&WriteOp::Insert { table: table.to_string(), row });
    }

    fn allocate_id(&self) -> EntityId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

struct MemoryTransaction {
    snapshot: Tables,
    log: Vec<WriteOp>,
}

pub struct MemorySession {
    store: Arc<MemoryStore>,
    transaction: Option<MemoryTransaction>,
}

impl MemorySession {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store, transaction: None }
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        match &self.transaction {
            Some(tx) => f(&tx.snapshot),
            None => f(&*self.store.tables.lock()),
        }
    }

    fn write(&mut self, op: WriteOp) -> u64 {
        match &mut self.transaction {
            Some(tx) => {
                let affected = tx.snapshot.apply(&op);
                tx.log.push(op);
                affected
            }
            None => self.store.tables.lock().apply(&op),
        }
    }

    fn selected(&self, table: &str, query: &RowQuery) -> Vec<StoredRow> {
        self.read(|tables| {
            tables
                .table(table)
                .map(|t| t.values().filter(|row| query.selects(row)).cloned().collect())
                .unwrap_or_default()
        })
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn find(&mut self, table: &str, id: EntityId) -> Result<Option<StoredRow>, DomainError> {
        Ok(self.read(|tables| tables.table(table).and_then(|t| t.get(&id)).cloned()))
    }

    async fn query(&mut self, table: &str, query: &RowQuery) -> Result<Vec<StoredRow>, DomainError> {
        let rows = self.selected(table, query).into_iter().skip(query.offset as usize);
        Ok(match query.limit {
            Some(limit) => rows.take(limit as usize).collect(),
            None => rows.collect(),
        })
    }

    async fn count(&mut self, table: &str, query: &RowQuery) -> Result<u64, DomainError> {
        Ok(self.selected(table, query).len() as u64)
    }

    async fn insert(&mut self, table: &str, values: RowValues) -> Result<EntityId, DomainError> {
        let id = self.store.allocate_id();
        let row = StoredRow {
            id,
            owner_id: values.owner_id,
            is_deleted: values.is_deleted,
            body: values.body,
        };
        self.write(WriteOp::Insert { table: table.to_string(), row });
        Ok(id)
    }

    async fn update(
        &mut self,
        table: &str,
        id: EntityId,
        owner: Option<TenantId>,
        values: RowValues,
    ) -> Result<u64, DomainError> {
        Ok(self.write(WriteOp::Update { table: table.to_string(), id, owner, values }))
    }

    async fn delete(&mut self, table: &str, id: EntityId, owner: Option<TenantId>) -> Result<u64, DomainError> {
        Ok(self.write(WriteOp::Delete { table: table.to_string(), id, owner }))
    }

    async fn begin(&mut self) -> Result<(), DomainError> {
        if self.transaction.is_some() {
            return Err(DomainError::InvalidUsage("transaction already open on session".into()));
        }
        let snapshot = self.store.tables.lock().clone();
        self.transaction = Some(MemoryTransaction { snapshot, log: Vec::new() });
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| DomainError::InvalidUsage("no transaction open on session".into()))?;
        let mut tables = self.store.tables.lock();
        for op in &tx.log {
            tables.apply(op);
        }
        debug!(writes = tx.log.len(), "Memory transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        self.transaction = None;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }
}

/// Hands out sessions on one [`MemoryStore`] per connection descriptor.
#[derive(Default)]
pub struct MemorySessionSource {
    stores: DashMap<String, Arc<MemoryStore>>,
}

impl MemorySessionSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store behind `descriptor`, created empty on first use.
    pub fn store(&self, descriptor: &ConnectionDescriptor) -> Arc<MemoryStore> {
        self.stores
            .entry(descriptor.as_str().to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new()))
            .clone()
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }
}

#[async_trait]
impl SessionSource for MemorySessionSource {
    async fn open(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn StoreSession>, DomainError> {
        Ok(Box::new(MemorySession::new(self.store(descriptor))))
    }
}
