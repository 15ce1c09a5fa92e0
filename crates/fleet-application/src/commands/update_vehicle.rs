//! Changes the type or plate of one of the current tenant's vehicles.

use async_trait::async_trait;
use tenancy_core::messaging::decorators::transaction::SAVE_FAILED_MESSAGE;
use tenancy_core::{
    Command, CommandHandler, CommandResult, DecoratorKind, DomainError, ExecutionScope, FailureKind,
};
use tenancy_shared::EntityId;
use tracing::warn;
use validator::Validate;

use super::VEHICLE_NOT_FOUND;
use crate::domain::{Vehicle, VehicleType};

#[derive(Debug, Clone, Validate)]
pub struct UpdateVehicle {
    #[validate(range(min = 1, message = "Vehicle id must be positive"))]
    pub id: EntityId,

    pub vehicle_type: VehicleType,

    #[validate(length(min = 1, max = 20, message = "License plate must be between 1 and 20 characters"))]
    pub license_plate: String,
}

impl Command for UpdateVehicle {
    const NAME: &'static str = "UpdateVehicle";
    type Output = ();
}

/// Saves through the unit of work itself; no transaction decorator.
pub struct UpdateVehicleHandler;

#[async_trait]
impl CommandHandler<UpdateVehicle> for UpdateVehicleHandler {
    async fn handle(&self, command: UpdateVehicle, scope: &mut ExecutionScope) -> Result<CommandResult, DomainError> {
        let actor = scope.tenant().require_tenant()?;
        let uow = scope.uow();
        let shard = uow.shard().await?;

        let Some(mut vehicle) = shard.find::<Vehicle>(command.id).await? else {
            return Ok(CommandResult::not_found(VEHICLE_NOT_FOUND));
        };
        if vehicle.person_id != actor {
            warn!(vehicle_id = command.id, actor, owner = vehicle.person_id, "Rejected update of foreign vehicle");
            return Ok(CommandResult::unauthorized("Unauthorized to update this vehicle"));
        }

        vehicle.vehicle_type = command.vehicle_type;
        vehicle.license_plate = command.license_plate.trim().to_string();
        shard.update(vehicle)?;

        if uow.save_changes().await? == 0 {
            return Ok(CommandResult::failure(FailureKind::Persistence, SAVE_FAILED_MESSAGE));
        }
        Ok(CommandResult::ok())
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging, DecoratorKind::Validation]
    }
}
