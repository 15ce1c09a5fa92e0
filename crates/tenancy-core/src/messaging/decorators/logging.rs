//! Logs request type before invocation and the outcome after.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::error::DomainError;
use crate::messaging::handler::{Command, CommandHandler, ExecutionScope, Query, QueryHandler};
use crate::messaging::result::CommandResult;

pub struct LoggingDecorator<H: ?Sized> {
    inner: Arc<H>,
}

impl<H: ?Sized> LoggingDecorator<H> {
    pub fn new(inner: Arc<H>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Command> CommandHandler<C> for LoggingDecorator<dyn CommandHandler<C>> {
    async fn handle(&self, command: C, scope: &mut ExecutionScope) -> Result<CommandResult<C::Output>, DomainError> {
        info!(command = C::NAME, "Handling command");
        let started = Instant::now();
        let result = self.inner.handle(command, scope).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(outcome) if outcome.is_success() => {
                info!(command = C::NAME, elapsed_ms, "Command succeeded")
            }
            Ok(outcome) => warn!(
                command = C::NAME,
                elapsed_ms,
                kind = ?outcome.failure_kind(),
                "Command failed: {}",
                outcome.error().unwrap_or_default()
            ),
            Err(e) => error!(command = C::NAME, elapsed_ms, "Command faulted: {}", e),
        }
        result
    }

    fn describe(&self) -> String {
        format!("Logging({})", self.inner.describe())
    }
}

#[async_trait]
impl<Q: Query> QueryHandler<Q> for LoggingDecorator<dyn QueryHandler<Q>> {
    async fn handle(&self, query: Q, scope: &mut ExecutionScope) -> Result<Q::Output, DomainError> {
        info!(query = Q::NAME, "Handling query");
        let started = Instant::now();
        let result = self.inner.handle(query, scope).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(query = Q::NAME, elapsed_ms, "Query succeeded"),
            Err(e) => error!(query = Q::NAME, elapsed_ms, "Query failed: {}", e),
        }
        result
    }

    fn describe(&self) -> String {
        format!("Logging({})", self.inner.describe())
    }
}
