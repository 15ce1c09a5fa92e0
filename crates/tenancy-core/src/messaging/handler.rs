//! Command/query contracts and the per-dispatch execution scope.

use std::sync::Arc;

use async_trait::async_trait;
use validator::Validate;

use super::pipeline::DecoratorKind;
use super::result::CommandResult;
use crate::cancellation::CancellationToken;
use crate::context::TenantContext;
use crate::error::DomainError;
use crate::persistence::{ContextProvider, UnitOfWork};

/// An intended state change.
pub trait Command: Validate + Send + Sync + 'static {
    /// Name used in logs and registry diagnostics.
    const NAME: &'static str;
    type Output: Send + 'static;
}

/// A read with a declared result type.
pub trait Query: Validate + Send + Sync + 'static {
    const NAME: &'static str;
    type Output: Send + 'static;
}

#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: C, scope: &mut ExecutionScope) -> Result<CommandResult<C::Output>, DomainError>;

    /// Shape of the pipeline behind this handler, e.g. `Logging(Validation(CreateVehicleHandler))`.
    fn describe(&self) -> String {
        short_type_name::<Self>().to_string()
    }

    /// Decorators wrapping this handler, outermost first.
    fn decorators() -> &'static [DecoratorKind]
    where
        Self: Sized,
    {
        &[]
    }
}

#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: Q, scope: &mut ExecutionScope) -> Result<Q::Output, DomainError>;

    fn describe(&self) -> String {
        short_type_name::<Self>().to_string()
    }

    /// Decorators wrapping this handler, outermost first.
    fn decorators() -> &'static [DecoratorKind]
    where
        Self: Sized,
    {
        &[]
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

/// State owned by exactly one dispatch: its unit of work and cancellation
/// signal.
pub struct ExecutionScope {
    uow: UnitOfWork,
    cancel: CancellationToken,
}

impl ExecutionScope {
    pub fn new(contexts: Arc<dyn ContextProvider>, cancel: CancellationToken) -> Self {
        Self {
            uow: UnitOfWork::with_cancellation(contexts, cancel.clone()),
            cancel,
        }
    }

    pub fn uow(&mut self) -> &mut UnitOfWork {
        &mut self.uow
    }

    /// The ambient tenant context of the dispatch.
    pub fn tenant(&self) -> TenantContext {
        TenantContext::current()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ends the scope, rolling back any transaction the pipeline left open.
    pub async fn finish(self) -> Result<(), DomainError> {
        self.uow.finish().await
    }
}
