//! Domain errors

use thiserror::Error;

/// Faults raised by the tenancy core.
///
/// Business-rule failures are not represented here; they travel as
/// [`CommandResult`](crate::messaging::CommandResult) values.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    #[error("Tenant context not resolved: {0}")]
    TenantNotResolved(String),

    #[error("Invalid tenant identifier: {0}")]
    InvalidTenantKey(String),

    #[error("No handler registered for {0}")]
    HandlerNotRegistered(&'static str),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tenant isolation violation: {0}")]
    TenantIsolation(String),

    #[error("Invalid unit of work usage: {0}")]
    InvalidUsage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Store and runtime faults that propagate through the pipeline.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            DomainError::DatabaseError(_)
                | DomainError::Serialization(_)
                | DomainError::Cancelled
                | DomainError::InternalError(_)
        )
    }

    /// Misconfiguration that is fatal at startup or first use.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DomainError::Configuration(_) | DomainError::HandlerNotRegistered(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}

impl From<tenancy_shared::AppError> for DomainError {
    fn from(e: tenancy_shared::AppError) -> Self {
        DomainError::Configuration(e.to_string())
    }
}
