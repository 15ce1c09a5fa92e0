//! Request dispatch.
//!
//! Every dispatch runs in its own [`ExecutionScope`]: a fresh unit of work is
//! created for it and discarded when the pipeline returns, so contexts are
//! never shared between two dispatches, even within one request.

use std::sync::Arc;

use tracing::{debug, error};

use super::handler::{Command, ExecutionScope, Query};
use super::registry::HandlerRegistry;
use super::result::CommandResult;
use crate::cancellation::CancellationToken;
use crate::error::DomainError;
use crate::persistence::ContextProvider;

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<HandlerRegistry>,
    contexts: Arc<dyn ContextProvider>,
}

impl Dispatcher {
    pub fn new(registry: Arc<HandlerRegistry>, contexts: Arc<dyn ContextProvider>) -> Self {
        Self { registry, contexts }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub async fn dispatch<C: Command>(&self, command: C) -> Result<CommandResult<C::Output>, DomainError> {
        self.dispatch_with_cancel(command, CancellationToken::new()).await
    }

    pub async fn dispatch_with_cancel<C: Command>(
        &self,
        command: C,
        cancel: CancellationToken,
    ) -> Result<CommandResult<C::Output>, DomainError> {
        let pipeline = self.registry.resolve_command::<C>().map_err(|e| {
            error!(command = C::NAME, "{}", e);
            e
        })?;
        debug!(command = C::NAME, "Dispatching");

        let mut scope = ExecutionScope::new(self.contexts.clone(), cancel);
        let result = pipeline.handle(command, &mut scope).await;
        close(scope, result).await
    }

    pub async fn query<Q: Query>(&self, query: Q) -> Result<Q::Output, DomainError> {
        self.query_with_cancel(query, CancellationToken::new()).await
    }

    pub async fn query_with_cancel<Q: Query>(&self, query: Q, cancel: CancellationToken) -> Result<Q::Output, DomainError> {
        let pipeline = self.registry.resolve_query::<Q>().map_err(|e| {
            error!(query = Q::NAME, "{}", e);
            e
        })?;
        debug!(query = Q::NAME, "Dispatching");

        let mut scope = ExecutionScope::new(self.contexts.clone(), cancel);
        let result = pipeline.handle(query, &mut scope).await;
        close(scope, result).await
    }
}

/// Finishes the scope and returns the pipeline's result unchanged, unless the
/// scope itself failed to close.
async fn close<T>(scope: ExecutionScope, result: Result<T, DomainError>) -> Result<T, DomainError> {
    let finished = scope.finish().await;
    match (result, finished) {
        (Err(e), _) => Err(e),
        (Ok(_), Err(e)) => {
            error!("Failed to close execution scope: {}", e);
            Err(e)
        }
        (Ok(value), Ok(())) => Ok(value),
    }
}
