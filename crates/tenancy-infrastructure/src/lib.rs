//! # Tenancy Infrastructure
//!
//! PostgreSQL store sessions, connection pooling, schema bootstrap and
//! credential hashing (adapters).

pub mod database;
pub mod security;

pub use database::{create_pool, ensure_document_tables, to_pg_options, PgSessionSource, PgStoreSession};
pub use security::BcryptHasher;
