//! Startup-time handler registration.
//!
//! Every command and query type is bound to its constructed pipeline once,
//! while the application wires itself up. The resulting [`HandlerRegistry`]
//! is immutable and shared by every dispatcher.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use super::handler::{Command, CommandHandler, Query, QueryHandler};
use super::pipeline::{DecoratorKind, DecoratorPipelineBuilder};
use crate::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RequestKind {
    Command,
    Query,
}

struct Registration {
    name: &'static str,
    shape: String,
    pipeline: Box<dyn Any + Send + Sync>,
}

#[derive(Default)]
pub struct HandlerRegistryBuilder {
    entries: HashMap<(TypeId, RequestKind), Registration>,
}

impl HandlerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `C` with the decorators it declares.
    pub fn register_command<C, H>(self, handler: H) -> Result<Self, DomainError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        self.register_command_with(handler, H::decorators())
    }

    /// Registers `handler` for `C` with an explicit decorator list, outermost first.
    pub fn register_command_with<C, H>(mut self, handler: H, decorators: &[DecoratorKind]) -> Result<Self, DomainError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let pipeline = DecoratorPipelineBuilder::command::<C>(Arc::new(handler), decorators)?;
        self.insert(TypeId::of::<C>(), RequestKind::Command, C::NAME, pipeline.describe(), Box::new(pipeline))?;
        Ok(self)
    }

    pub fn register_query<Q, H>(self, handler: H) -> Result<Self, DomainError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        self.register_query_with(handler, H::decorators())
    }

    pub fn register_query_with<Q, H>(mut self, handler: H, decorators: &[DecoratorKind]) -> Result<Self, DomainError>
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
    {
        let pipeline = DecoratorPipelineBuilder::query::<Q>(Arc::new(handler), decorators)?;
        self.insert(TypeId::of::<Q>(), RequestKind::Query, Q::NAME, pipeline.describe(), Box::new(pipeline))?;
        Ok(self)
    }

    fn insert(
        &mut self,
        type_id: TypeId,
        kind: RequestKind,
        name: &'static str,
        shape: String,
        pipeline: Box<dyn Any + Send + Sync>,
    ) -> Result<(), DomainError> {
        if self.entries.contains_key(&(type_id, kind)) {
            return Err(DomainError::Configuration(format!("{} is registered more than once", name)));
        }
        info!(request = name, pipeline = %shape, "Registered handler");
        self.entries.insert((type_id, kind), Registration { name, shape, pipeline });
        Ok(())
    }

    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry { entries: self.entries }
    }
}

pub struct HandlerRegistry {
    entries: HashMap<(TypeId, RequestKind), Registration>,
}

impl HandlerRegistry {
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::new()
    }

    pub fn resolve_command<C: Command>(&self) -> Result<Arc<dyn CommandHandler<C>>, DomainError> {
        self.entries
            .get(&(TypeId::of::<C>(), RequestKind::Command))
            .and_then(|r| r.pipeline.downcast_ref::<Arc<dyn CommandHandler<C>>>())
            .cloned()
            .ok_or(DomainError::HandlerNotRegistered(C::NAME))
    }

    pub fn resolve_query<Q: Query>(&self) -> Result<Arc<dyn QueryHandler<Q>>, DomainError> {
        self.entries
            .get(&(TypeId::of::<Q>(), RequestKind::Query))
            .and_then(|r| r.pipeline.downcast_ref::<Arc<dyn QueryHandler<Q>>>())
            .cloned()
            .ok_or(DomainError::HandlerNotRegistered(Q::NAME))
    }

    /// `(request name, pipeline shape)` pairs sorted by name.
    pub fn describe(&self) -> Vec<(&'static str, String)> {
        let mut rows: Vec<_> = self.entries.values().map(|r| (r.name, r.shape.clone())).collect();
        rows.sort();
        rows
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use validator::Validate;

    use crate::messaging::handler::ExecutionScope;
    use crate::messaging::result::CommandResult;

    #[derive(Debug, Validate)]
    struct Rename {
        #[validate(length(min = 1))]
        name: String,
    }

    impl Command for Rename {
        const NAME: &'static str = "Rename";
        type Output = String;
    }

    struct RenameHandler;

    #[async_trait]
    impl CommandHandler<Rename> for RenameHandler {
        async fn handle(&self, command: Rename, _scope: &mut ExecutionScope) -> Result<CommandResult<String>, DomainError> {
            Ok(CommandResult::success(command.name))
        }

        fn decorators() -> &'static [DecoratorKind] {
            &[DecoratorKind::Logging, DecoratorKind::Validation]
        }
    }

    #[derive(Debug, Validate)]
    struct Unregistered {
        #[validate(length(min = 1))]
        name: String,
    }

    impl Command for Unregistered {
        const NAME: &'static str = "Unregistered";
        type Output = ();
    }

    #[test]
    fn test_resolve_registered_pipeline() {
        let registry = HandlerRegistry::builder().register_command(RenameHandler).unwrap().build();
        let pipeline = registry.resolve_command::<Rename>().unwrap();
        assert_eq!(pipeline.describe(), "Logging(Validation(RenameHandler))");
        assert_eq!(registry.describe(), vec![("Rename", "Logging(Validation(RenameHandler))".to_string())]);
    }

    #[test]
    fn test_unregistered_request_is_fatal() {
        let registry = HandlerRegistry::builder().build();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.resolve_command::<Unregistered>(),
            Err(DomainError::HandlerNotRegistered("Unregistered"))
        ));
    }

    #[test]
    fn test_double_registration_is_rejected() {
        let result = HandlerRegistry::builder()
            .register_command(RenameHandler)
            .and_then(|b| b.register_command(RenameHandler));
        assert!(matches!(result, Err(DomainError::Configuration(_))));
    }
}
