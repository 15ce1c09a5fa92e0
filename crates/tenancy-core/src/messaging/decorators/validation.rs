//! Structural validation ahead of the handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use validator::ValidationErrors;

use crate::error::DomainError;
use crate::messaging::handler::{Command, CommandHandler, ExecutionScope, Query, QueryHandler};
use crate::messaging::result::{CommandResult, FailureKind};

/// Rejects invalid requests without calling the wrapped handler.
///
/// Commands get a [`FailureKind::Validation`] result; queries, which have no
/// result envelope, get [`DomainError::Validation`].
pub struct ValidationDecorator<H: ?Sized> {
    inner: Arc<H>,
}

impl<H: ?Sized> ValidationDecorator<H> {
    pub fn new(inner: Arc<H>) -> Self {
        Self { inner }
    }
}

/// Flattens field errors into one message, sorted by field.
pub fn describe_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: {}", field, e.code),
            })
        })
        .collect();
    messages.sort();
    format!("Validation failed: {}", messages.join("; "))
}

#[async_trait]
impl<C: Command> CommandHandler<C> for ValidationDecorator<dyn CommandHandler<C>> {
    async fn handle(&self, command: C, scope: &mut ExecutionScope) -> Result<CommandResult<C::Output>, DomainError> {
        if let Err(errors) = command.validate() {
            let message = describe_errors(&errors);
            warn!(command = C::NAME, "{}", message);
            return Ok(CommandResult::failure(FailureKind::Validation, message));
        }
        self.inner.handle(command, scope).await
    }

    fn describe(&self) -> String {
        format!("Validation({})", self.inner.describe())
    }
}

#[async_trait]
impl<Q: Query> QueryHandler<Q> for ValidationDecorator<dyn QueryHandler<Q>> {
    async fn handle(&self, query: Q, scope: &mut ExecutionScope) -> Result<Q::Output, DomainError> {
        if let Err(errors) = query.validate() {
            let message = describe_errors(&errors);
            warn!(query = Q::NAME, "{}", message);
            return Err(DomainError::Validation(message));
        }
        self.inner.handle(query, scope).await
    }

    fn describe(&self) -> String {
        format!("Validation({})", self.inner.describe())
    }
}
