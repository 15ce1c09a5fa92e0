//! New-tenant shard placement.

use rand::Rng;
use tenancy_shared::config::ShardingSettings;
use tenancy_shared::ShardId;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ShardAssigner {
    total_shards: u32,
    hot_shard: Option<ShardId>,
}

impl ShardAssigner {
    pub fn new(settings: &ShardingSettings) -> Self {
        Self {
            total_shards: settings.total_shards.max(1),
            hot_shard: settings.effective_hot_shard(),
        }
    }

    /// Picks the shard for a new tenant.
    ///
    /// An in-range hot shard takes every new tenant; otherwise the shard is
    /// uniform over `[1, total_shards]`.
    pub fn assign(&self) -> ShardId {
        self.assign_with(&mut rand::rng())
    }

    pub fn assign_with<R: Rng>(&self, rng: &mut R) -> ShardId {
        let shard = match self.hot_shard {
            Some(hot) => hot,
            None => rng.random_range(1..=self.total_shards),
        };
        debug!(shard, "Assigned shard for new tenant");
        shard
    }
}
