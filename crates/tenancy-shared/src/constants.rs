//! Application-wide constants

/// Request header carrying the tenant identifier (integer id or sync id).
pub const TENANT_HEADER_NAME: &str = "personId";
/// Default database-name prefix for shard databases (`Shard1`, `Shard2`, ...).
pub const DEFAULT_SHARD_DATABASE_PREFIX: &str = "Shard";
/// Connection-string key holding the database name.
pub const DATABASE_KEY: &str = "Database";
pub const DEFAULT_TOTAL_SHARDS: u32 = 1;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 3;
