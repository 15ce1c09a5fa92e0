//! Command/query messaging: contracts, decorator pipelines, registry and
//! dispatcher.

pub mod decorators;
pub mod dispatcher;
pub mod handler;
pub mod pipeline;
pub mod registry;
pub mod result;

pub use dispatcher::Dispatcher;
pub use handler::{Command, CommandHandler, ExecutionScope, Query, QueryHandler};
pub use pipeline::{DecoratorKind, DecoratorPipelineBuilder};
pub use registry::{HandlerRegistry, HandlerRegistryBuilder};
pub use result::{CommandResult, FailureKind};
