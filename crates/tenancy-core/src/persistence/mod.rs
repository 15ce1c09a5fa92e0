//! Persistence: entities, filters, data contexts and the unit of work.

pub mod data_context;
pub mod entity;
pub mod filter;
pub mod memory;
pub mod session;
pub mod unit_of_work;

pub use data_context::{ContextKind, DataContext, EntityQuery, EntryKey, EntryState};
pub use entity::{validate_table_name, Entity};
pub use filter::EntityFilter;
pub use memory::{MemorySession, MemorySessionSource, MemoryStore};
pub use session::{RowQuery, RowValues, SessionSource, StoreSession, StoredRow, TextSearch};
pub use unit_of_work::{ContextProvider, UnitOfWork};
