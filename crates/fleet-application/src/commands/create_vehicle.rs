//! Registers a vehicle for the current tenant.

use async_trait::async_trait;
use tenancy_core::{
    Command, CommandHandler, CommandResult, DecoratorKind, DomainError, ExecutionScope, FailureKind,
};
use validator::Validate;

use crate::domain::{Vehicle, VehicleType};

#[derive(Debug, Clone, Validate)]
pub struct CreateVehicle {
    pub vehicle_type: VehicleType,

    #[validate(length(min = 1, max = 20, message = "License plate must be between 1 and 20 characters"))]
    pub license_plate: String,
}

impl CreateVehicle {
    pub fn new(vehicle_type: VehicleType, license_plate: impl Into<String>) -> Self {
        Self {
            vehicle_type,
            license_plate: license_plate.into(),
        }
    }
}

impl Command for CreateVehicle {
    const NAME: &'static str = "CreateVehicle";
    type Output = ();
}

/// Stages the new vehicle on the tenant's shard; the transaction decorator
/// saves it.
pub struct CreateVehicleHandler;

#[async_trait]
impl CommandHandler<CreateVehicle> for CreateVehicleHandler {
    async fn handle(&self, command: CreateVehicle, scope: &mut ExecutionScope) -> Result<CommandResult, DomainError> {
        let owner = scope.tenant().require_tenant()?;
        if command.license_plate.trim().is_empty() {
            return Ok(CommandResult::failure(FailureKind::Validation, "License plate must not be blank"));
        }

        scope
            .uow()
            .shard()
            .await?
            .add(Vehicle::new(owner, command.vehicle_type, &command.license_plate))?;
        Ok(CommandResult::ok())
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging, DecoratorKind::Validation, DecoratorKind::Transaction]
    }
}
