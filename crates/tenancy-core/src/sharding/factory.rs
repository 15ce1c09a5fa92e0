//! Data context construction for master and shard databases.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::router::{ConnectionDescriptor, ShardConnectionRouter};
use crate::context::TenantContext;
use crate::error::DomainError;
use crate::persistence::{ContextKind, ContextProvider, DataContext, EntityFilter, SessionSource};

/// Opens a data context for a connection descriptor with the tenant and
/// soft-delete filters fixed from the given tenant context.
#[derive(Clone)]
pub struct ShardContextFactory {
    source: Arc<dyn SessionSource>,
}

impl ShardContextFactory {
    pub fn new(source: Arc<dyn SessionSource>) -> Self {
        Self { source }
    }

    pub async fn create(
        &self,
        descriptor: ConnectionDescriptor,
        kind: ContextKind,
        tenant: TenantContext,
    ) -> Result<DataContext, DomainError> {
        let session = self.source.open(&descriptor).await?;
        let filter = EntityFilter::for_context(&tenant);
        debug!(context = %kind, descriptor = %descriptor, bypassed = filter.is_bypassed(), "Created data context");
        Ok(DataContext::new(kind, descriptor, filter, session))
    }
}

/// [`ContextProvider`] that sends master contexts to the master database and
/// shard contexts to the routed shard database.
#[derive(Clone)]
pub struct ShardedContextProvider {
    master: ConnectionDescriptor,
    router: ShardConnectionRouter,
    factory: ShardContextFactory,
}

impl ShardedContextProvider {
    pub fn new(master: ConnectionDescriptor, router: ShardConnectionRouter, source: Arc<dyn SessionSource>) -> Self {
        Self {
            master,
            router,
            factory: ShardContextFactory::new(source),
        }
    }

    pub fn master_descriptor(&self) -> &ConnectionDescriptor {
        &self.master
    }

    pub fn router(&self) -> &ShardConnectionRouter {
        &self.router
    }

    pub fn descriptor_for(&self, kind: ContextKind) -> ConnectionDescriptor {
        match kind {
            ContextKind::Master => self.master.clone(),
            ContextKind::Shard(shard) => self.router.route(shard),
        }
    }
}

#[async_trait]
impl ContextProvider for ShardedContextProvider {
    async fn create(&self, kind: ContextKind, tenant: TenantContext) -> Result<DataContext, DomainError> {
        self.factory.create(self.descriptor_for(kind), kind, tenant).await
    }
}
