//! Database module (PostgreSQL adapters)

pub mod connection;
pub mod postgres;
pub mod schema;

pub use connection::{create_pool, pool_options};
pub use postgres::{to_pg_options, PgSessionSource, PgStoreSession};
pub use schema::ensure_document_tables;
