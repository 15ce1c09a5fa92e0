#![allow(dead_code)]

use std::sync::Arc;

use fleet_application::FleetRuntime;
use tenancy_core::persistence::StoredRow;
use tenancy_core::{ConnectionDescriptor, Entity, MemorySessionSource, SessionSource, TenantRecord};
use tenancy_infrastructure::BcryptHasher;
use tenancy_shared::config::ShardingSettings;
use tenancy_shared::{ShardId, TenantId};

pub const MASTER: &str = "Server=x;Database=Master;";
pub const TEMPLATE: &str = "Server=x;";
pub const PASSWORD: &str = "Str0ng!pass";

pub fn sharding(total_shards: u32) -> ShardingSettings {
    ShardingSettings::new(TEMPLATE, total_shards)
}

pub fn runtime(source: Arc<dyn SessionSource>, sharding: &ShardingSettings) -> FleetRuntime {
    FleetRuntime::with_session_source(
        ConnectionDescriptor::new(MASTER),
        sharding,
        source,
        Arc::new(BcryptHasher::with_cost(4)),
    )
    .expect("runtime assembles")
}

pub fn memory_runtime(total_shards: u32) -> (Arc<MemorySessionSource>, FleetRuntime) {
    let source = Arc::new(MemorySessionSource::new());
    let runtime = runtime(source.clone(), &sharding(total_shards));
    (source, runtime)
}

/// Writes a tenant straight into the master store with a fixed id.
pub fn seed_tenant(source: &MemorySessionSource, id: TenantId, shard_id: ShardId, username: &str) -> TenantRecord {
    let mut record = TenantRecord::new(username, "unused", shard_id);
    record.id = Some(id);
    let row = StoredRow {
        id,
        owner_id: None,
        is_deleted: false,
        body: serde_json::to_value(&record).expect("tenant record serializes"),
    };
    source.store(&ConnectionDescriptor::new(MASTER)).seed(TenantRecord::TABLE, row);
    record
}

pub fn shard_store(source: &MemorySessionSource, shard: ShardId) -> Arc<tenancy_core::persistence::MemoryStore> {
    source.store(&ConnectionDescriptor::new(format!("{}Database=Shard{};", TEMPLATE, shard)))
}

pub fn master_store(source: &MemorySessionSource) -> Arc<tenancy_core::persistence::MemoryStore> {
    source.store(&ConnectionDescriptor::new(MASTER))
}
