//! Saves the unit of work after a successful handler.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::error::DomainError;
use crate::messaging::handler::{Command, CommandHandler, ExecutionScope};
use crate::messaging::result::{CommandResult, FailureKind};

pub const SAVE_FAILED_MESSAGE: &str = "Failed to save changes to database";

/// Commits the handler's staged changes when, and only when, the handler
/// succeeds.
///
/// A successful handler is expected to have written at least one row; zero
/// affected rows turn the outcome into a [`FailureKind::Persistence`]
/// failure. Failed outcomes are never saved, and a fault from the handler or
/// the store rolls back any active transaction before it is returned.
pub struct TransactionDecorator<H: ?Sized> {
    inner: Arc<H>,
}

impl<H: ?Sized> TransactionDecorator<H> {
    pub fn new(inner: Arc<H>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Command> CommandHandler<C> for TransactionDecorator<dyn CommandHandler<C>> {
    async fn handle(&self, command: C, scope: &mut ExecutionScope) -> Result<CommandResult<C::Output>, DomainError> {
        let outcome = match self.inner.handle(command, scope).await {
            Ok(outcome) => outcome,
            Err(e) => {
                rollback_active(scope, C::NAME).await;
                return Err(e);
            }
        };

        if !outcome.is_success() {
            rollback_active(scope, C::NAME).await;
            return Ok(outcome);
        }

        let uow = scope.uow();
        let rows = if !uow.has_contexts() {
            0
        } else {
            if !uow.has_active_transaction() {
                uow.begin_transaction().await?;
            }
            uow.commit().await?
        };

        if rows == 0 {
            warn!(command = C::NAME, "Handler succeeded but no rows were written");
            return Ok(CommandResult::failure(FailureKind::Persistence, SAVE_FAILED_MESSAGE));
        }
        debug!(command = C::NAME, rows, "Changes saved");
        Ok(outcome)
    }

    fn describe(&self) -> String {
        format!("Transaction({})", self.inner.describe())
    }
}

async fn rollback_active(scope: &mut ExecutionScope, name: &str) {
    let uow = scope.uow();
    if uow.has_active_transaction() {
        if let Err(e) = uow.rollback().await {
            error!(command = name, "Rollback failed: {}", e);
        }
    }
}
