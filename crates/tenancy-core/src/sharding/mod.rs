//! Shard routing, placement and context construction.

pub mod assignment;
pub mod factory;
pub mod router;

pub use assignment::ShardAssigner;
pub use factory::{ShardContextFactory, ShardedContextProvider};
pub use router::{ConnectionDescriptor, ShardConnectionRouter};
