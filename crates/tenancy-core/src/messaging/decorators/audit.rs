//! Records who invoked a request and how it ended.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::DomainError;
use crate::messaging::handler::{Command, CommandHandler, ExecutionScope, Query, QueryHandler};
use crate::messaging::result::CommandResult;

pub struct AuditDecorator<H: ?Sized> {
    inner: Arc<H>,
}

impl<H: ?Sized> AuditDecorator<H> {
    pub fn new(inner: Arc<H>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Command> CommandHandler<C> for AuditDecorator<dyn CommandHandler<C>> {
    async fn handle(&self, command: C, scope: &mut ExecutionScope) -> Result<CommandResult<C::Output>, DomainError> {
        let tenant = scope.tenant();
        info!(
            target: "audit",
            command = C::NAME,
            tenant_id = ?tenant.tenant_id,
            shard_id = ?tenant.shard_id,
            "Command invoked"
        );
        let result = self.inner.handle(command, scope).await;
        let outcome = match &result {
            Ok(r) if r.is_success() => "success",
            Ok(_) => "failure",
            Err(_) => "fault",
        };
        info!(target: "audit", command = C::NAME, tenant_id = ?tenant.tenant_id, outcome, "Command completed");
        result
    }

    fn describe(&self) -> String {
        format!("Audit({})", self.inner.describe())
    }
}

#[async_trait]
impl<Q: Query> QueryHandler<Q> for AuditDecorator<dyn QueryHandler<Q>> {
    async fn handle(&self, query: Q, scope: &mut ExecutionScope) -> Result<Q::Output, DomainError> {
        let tenant = scope.tenant();
        info!(
            target: "audit",
            query = Q::NAME,
            tenant_id = ?tenant.tenant_id,
            shard_id = ?tenant.shard_id,
            "Query invoked"
        );
        let result = self.inner.handle(query, scope).await;
        let outcome = if result.is_ok() { "success" } else { "fault" };
        info!(target: "audit", query = Q::NAME, tenant_id = ?tenant.tenant_id, outcome, "Query completed");
        result
    }

    fn describe(&self) -> String {
        format!("Audit({})", self.inner.describe())
    }
}
