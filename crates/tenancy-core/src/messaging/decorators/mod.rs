//! Standard pipeline decorators.
//!
//! Each decorator implements the same handler trait as the link it wraps, so
//! a pipeline of any depth is itself just a handler.

pub mod audit;
pub mod logging;
pub mod transaction;
pub mod validation;

pub use audit::AuditDecorator;
pub use logging::LoggingDecorator;
pub use transaction::TransactionDecorator;
pub use validation::ValidationDecorator;
