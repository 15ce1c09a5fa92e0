//! # Tenancy Core
//!
//! Tenant context resolution, shard-routed units of work and the command/query
//! dispatch pipeline.
//!
//! A request flows through the crate like this:
//!
//! 1. the request boundary parses a [`TenantKey`] and asks a
//!    [`TenantResolver`] for the tenant's shard;
//! 2. the resolved [`TenantContext`] is put in task-local scope;
//! 3. business code calls [`Dispatcher::dispatch`], which runs the
//!    decorator pipeline registered for the command type inside a fresh
//!    [`ExecutionScope`];
//! 4. handlers reach the master or shard database through the scope's
//!    [`UnitOfWork`], which stamps audit columns and converts deletes into
//!    soft deletes at save time.

pub mod cancellation;
pub mod context;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod persistence;
pub mod repositories;
pub mod services;
pub mod sharding;

#[cfg(test)]
pub(crate) mod testing;

pub use cancellation::CancellationToken;
pub use context::TenantContext;
pub use domain::{TenantKey, TenantRecord};
pub use error::DomainError;
pub use messaging::{
    Command, CommandHandler, CommandResult, DecoratorKind, Dispatcher, ExecutionScope, FailureKind,
    HandlerRegistry, HandlerRegistryBuilder, Query, QueryHandler,
};
pub use persistence::{
    ContextKind, ContextProvider, DataContext, Entity, EntityQuery, MemorySessionSource, SessionSource, UnitOfWork,
};
pub use repositories::{CredentialHasher, StoreTenantDirectory, TenantDirectory};
pub use services::TenantResolver;
pub use sharding::{ConnectionDescriptor, ShardAssigner, ShardConnectionRouter, ShardedContextProvider};
