//! Decorator pipeline construction.
//!
//! Decorators are declared outermost first: `[Logging, Validation]` means
//! Logging runs, then Validation, then the handler. The builder constructs
//! the chain innermost first by wrapping the bare handler in the declared
//! decorators taken in reverse.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::decorators::{AuditDecorator, LoggingDecorator, TransactionDecorator, ValidationDecorator};
use super::handler::{Command, CommandHandler, Query, QueryHandler};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorKind {
    Logging,
    Validation,
    Audit,
    /// Commands only.
    Transaction,
}

impl fmt::Display for DecoratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecoratorKind::Logging => "Logging",
            DecoratorKind::Validation => "Validation",
            DecoratorKind::Audit => "Audit",
            DecoratorKind::Transaction => "Transaction",
        };
        f.write_str(name)
    }
}

pub struct DecoratorPipelineBuilder;

impl DecoratorPipelineBuilder {
    pub fn command<C: Command>(
        handler: Arc<dyn CommandHandler<C>>,
        decorators: &[DecoratorKind],
    ) -> Result<Arc<dyn CommandHandler<C>>, DomainError> {
        Self::command_with(handler, decorators, decorate_command::<C>)
    }

    /// Builds the chain with `wrap` applying each decorator around its inner handler.
    pub(crate) fn command_with<C, F>(
        handler: Arc<dyn CommandHandler<C>>,
        decorators: &[DecoratorKind],
        wrap: F,
    ) -> Result<Arc<dyn CommandHandler<C>>, DomainError>
    where
        C: Command,
        F: Fn(DecoratorKind, Arc<dyn CommandHandler<C>>) -> Arc<dyn CommandHandler<C>>,
    {
        ensure_unique(C::NAME, decorators)?;
        Ok(decorators.iter().rev().fold(handler, |inner, kind| wrap(*kind, inner)))
    }

    pub fn query<Q: Query>(
        handler: Arc<dyn QueryHandler<Q>>,
        decorators: &[DecoratorKind],
    ) -> Result<Arc<dyn QueryHandler<Q>>, DomainError> {
        ensure_unique(Q::NAME, decorators)?;
        decorators.iter().rev().try_fold(handler, |inner, kind| match kind {
            DecoratorKind::Logging => Ok(Arc::new(LoggingDecorator::new(inner)) as Arc<dyn QueryHandler<Q>>),
            DecoratorKind::Validation => Ok(Arc::new(ValidationDecorator::new(inner)) as Arc<dyn QueryHandler<Q>>),
            DecoratorKind::Audit => Ok(Arc::new(AuditDecorator::new(inner)) as Arc<dyn QueryHandler<Q>>),
            DecoratorKind::Transaction => Err(DomainError::Configuration(format!(
                "{} is a query; Transaction can only wrap command handlers",
                Q::NAME
            ))),
        })
    }
}

fn decorate_command<C: Command>(kind: DecoratorKind, inner: Arc<dyn CommandHandler<C>>) -> Arc<dyn CommandHandler<C>> {
    match kind {
        DecoratorKind::Logging => Arc::new(LoggingDecorator::new(inner)),
        DecoratorKind::Validation => Arc::new(ValidationDecorator::new(inner)),
        DecoratorKind::Audit => Arc::new(AuditDecorator::new(inner)),
        DecoratorKind::Transaction => Arc::new(TransactionDecorator::new(inner)),
    }
}

fn ensure_unique(request: &str, decorators: &[DecoratorKind]) -> Result<(), DomainError> {
    let mut seen = HashSet::new();
    for kind in decorators {
        if !seen.insert(kind) {
            return Err(DomainError::Configuration(format!(
                "{} declares the {} decorator more than once",
                request, kind
            )));
        }
    }
    Ok(())
}
