//! Command outcome type.

use serde::Serialize;

/// Category of an expected business-rule failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Validation,
    NotFound,
    Unauthorized,
    Conflict,
    /// The store accepted the request but nothing was written.
    Persistence,
    Business,
}

/// Outcome of handling a command.
///
/// Expected failures are values of this type. Infrastructure faults never
/// are: they travel as `Err(DomainError)` next to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandResult<T = ()> {
    Success { value: T },
    Failure { kind: FailureKind, error: String },
}

impl CommandResult<()> {
    pub fn ok() -> Self {
        CommandResult::Success { value: () }
    }
}

impl<T> CommandResult<T> {
    pub fn success(value: T) -> Self {
        CommandResult::Success { value }
    }

    pub fn failure(kind: FailureKind, error: impl Into<String>) -> Self {
        CommandResult::Failure { kind, error: error.into() }
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::failure(FailureKind::NotFound, error)
    }

    pub fn unauthorized(error: impl Into<String>) -> Self {
        Self::failure(FailureKind::Unauthorized, error)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CommandResult::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            CommandResult::Failure { error, .. } => Some(error),
            CommandResult::Success { .. } => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CommandResult::Failure { kind, .. } => Some(*kind),
            CommandResult::Success { .. } => None,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            CommandResult::Success { value } => Some(value),
            CommandResult::Failure { .. } => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            CommandResult::Success { value } => Some(value),
            CommandResult::Failure { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_and_failure() {
        let ok = CommandResult::success(5);
        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&5));
        assert_eq!(ok.error(), None);

        let failed: CommandResult<i32> = CommandResult::unauthorized("not your vehicle");
        assert!(!failed.is_success());
        assert_eq!(failed.failure_kind(), Some(FailureKind::Unauthorized));
        assert_eq!(failed.error(), Some("not your vehicle"));
        assert_eq!(failed.into_value(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let failed: CommandResult = CommandResult::failure(FailureKind::Validation, "bad");
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failure", "kind": "validation", "error": "bad"})
        );
    }
}
