// ============================================================================
// Fleet Application - Tenant Provisioning
// File: crates/fleet-application/src/commands/provision_tenant.rs
// ============================================================================
//! Creates a tenant across the master store and its assigned shard.
//!
//! The two writes cannot share a transaction. The master row is committed
//! first; if the shard write then fails, the master row is deleted again on a
//! best-effort basis and the original fault is returned.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tenancy_core::{
    Command, CommandHandler, CommandResult, ContextKind, CredentialHasher, DecoratorKind, DomainError,
    ExecutionScope, FailureKind, ShardAssigner, TenantContext, TenantRecord, UnitOfWork,
};
use tenancy_shared::{ShardId, TenantId};
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::domain::Person;

pub const USERNAME_TAKEN: &str = "Username is already taken";

#[derive(Clone, Validate)]
pub struct ProvisionTenant {
    #[validate(length(min = 3, max = 50, message = "Username must be between 3 and 50 characters"))]
    pub username: String,

    #[validate(
        length(min = 8, max = 100, message = "Password must be between 8 and 100 characters"),
        custom(function = "strong_password")
    )]
    pub password: String,
}

impl ProvisionTenant {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for ProvisionTenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionTenant")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Command for ProvisionTenant {
    const NAME: &'static str = "ProvisionTenant";
    type Output = ProvisionedTenant;
}

/// Requires at least one uppercase letter, lowercase letter, digit and symbol.
fn strong_password(password: &str) -> Result<(), ValidationError> {
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace());

    if has_upper && has_lower && has_digit && has_symbol {
        Ok(())
    } else {
        Err(ValidationError::new("strong_password").with_message(Cow::Borrowed(
            "Password must contain uppercase, lowercase, number, and special character",
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedTenant {
    pub tenant_id: TenantId,
    pub sync_id: Uuid,
    pub shard_id: ShardId,
}

pub struct ProvisionTenantHandler {
    hasher: Arc<dyn CredentialHasher>,
    assigner: ShardAssigner,
}

impl ProvisionTenantHandler {
    pub fn new(hasher: Arc<dyn CredentialHasher>, assigner: ShardAssigner) -> Self {
        Self { hasher, assigner }
    }
}

#[async_trait]
impl CommandHandler<ProvisionTenant> for ProvisionTenantHandler {
    async fn handle(
        &self,
        command: ProvisionTenant,
        scope: &mut ExecutionScope,
    ) -> Result<CommandResult<ProvisionedTenant>, DomainError> {
        let uow = scope.uow();

        let taken = uow
            .master()
            .await?
            .first::<TenantRecord>(json!({ "username": &command.username }))
            .await?;
        if taken.is_some() {
            return Ok(CommandResult::failure(FailureKind::Conflict, USERNAME_TAKEN));
        }

        let password_hash = hash_off_runtime(self.hasher.clone(), command.password).await?;
        let shard_id = self.assigner.assign();

        let key = uow
            .master()
            .await?
            .add(TenantRecord::new(&command.username, password_hash, shard_id))?;
        uow.save_context(ContextKind::Master).await?;

        let record = uow
            .master()
            .await?
            .entity::<TenantRecord>(key)
            .cloned()
            .ok_or_else(|| DomainError::InternalError("tenant record not tracked after save".into()))?;
        let tenant = record
            .context()
            .ok_or_else(|| DomainError::InternalError("tenant record saved without id".into()))?;
        let tenant_id = tenant.require_tenant()?;
        info!(tenant_id, shard_id, "Tenant written to master store");

        let person = Person::new(tenant_id, record.sync_id, &command.username);
        let profile = TenantContext::scope(tenant, write_profile(uow, person)).await;
        match profile {
            Ok(_) => {
                info!(tenant_id, shard_id, "Tenant provisioned");
                Ok(CommandResult::success(ProvisionedTenant {
                    tenant_id,
                    sync_id: record.sync_id,
                    shard_id,
                }))
            }
            Err(e) => {
                error!(tenant_id, shard_id, "Shard write failed, removing master row: {}", e);
                compensate(uow, record).await;
                Err(e)
            }
        }
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging, DecoratorKind::Validation]
    }
}

/// Bcrypt is CPU bound; keep it off the async worker threads.
async fn hash_off_runtime(hasher: Arc<dyn CredentialHasher>, password: String) -> Result<String, DomainError> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| DomainError::InternalError(format!("password hashing task failed: {}", e)))?
}

/// Writes the tenant's profile to the shard of the ambient tenant context.
async fn write_profile(uow: &mut UnitOfWork, person: Person) -> Result<u64, DomainError> {
    let shard = TenantContext::current().require_shard()?;
    uow.shard().await?.add(person)?;
    match uow.save_context(ContextKind::Shard(shard)).await? {
        0 => Err(DomainError::DatabaseError("tenant profile was not written".into())),
        rows => Ok(rows),
    }
}

/// Deletes the master row of a half-provisioned tenant. Failures are logged
/// and swallowed so the caller still sees the original fault.
async fn compensate(uow: &mut UnitOfWork, record: TenantRecord) {
    let tenant_id = record.id;
    let removed = async {
        uow.master().await?.remove(record)?;
        uow.save_context(ContextKind::Master).await
    }
    .await;

    match removed {
        Ok(rows) => warn!(?tenant_id, rows, "Compensated half-provisioned tenant"),
        Err(e) => error!(?tenant_id, "Compensation failed, master row left behind: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_rules() {
        assert!(ProvisionTenant::new("alice", "Str0ng!pass").validate().is_ok());
        assert!(ProvisionTenant::new("al", "Str0ng!pass").validate().is_err());
        assert!(ProvisionTenant::new("alice", "S0!a").validate().is_err());
        assert!(ProvisionTenant::new("alice", "weakpassword").validate().is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let rendered = format!("{:?}", ProvisionTenant::new("alice", "Str0ng!pass"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("Str0ng!pass"));
    }
}
