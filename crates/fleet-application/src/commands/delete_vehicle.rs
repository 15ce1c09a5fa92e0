//! Soft-deletes one of the current tenant's vehicles.

use async_trait::async_trait;
use tenancy_core::messaging::decorators::transaction::SAVE_FAILED_MESSAGE;
use tenancy_core::{
    Command, CommandHandler, CommandResult, DecoratorKind, DomainError, ExecutionScope, FailureKind,
};
use tenancy_shared::EntityId;
use tracing::warn;
use validator::Validate;

use super::VEHICLE_NOT_FOUND;
use crate::domain::Vehicle;

#[derive(Debug, Clone, Validate)]
pub struct DeleteVehicle {
    pub id: EntityId,
}

impl DeleteVehicle {
    pub fn new(id: EntityId) -> Self {
        Self { id }
    }
}

impl Command for DeleteVehicle {
    const NAME: &'static str = "DeleteVehicle";
    type Output = ();
}

pub struct DeleteVehicleHandler;

#[async_trait]
impl CommandHandler<DeleteVehicle> for DeleteVehicleHandler {
    async fn handle(&self, command: DeleteVehicle, scope: &mut ExecutionScope) -> Result<CommandResult, DomainError> {
        let actor = scope.tenant().require_tenant()?;
        let uow = scope.uow();
        let shard = uow.shard().await?;

        let Some(vehicle) = shard.find::<Vehicle>(command.id).await? else {
            return Ok(CommandResult::not_found(VEHICLE_NOT_FOUND));
        };
        if vehicle.person_id != actor {
            warn!(vehicle_id = command.id, actor, owner = vehicle.person_id, "Rejected delete of foreign vehicle");
            return Ok(CommandResult::unauthorized("Unauthorized to delete this vehicle"));
        }

        shard.remove(vehicle)?;
        if uow.save_changes().await? == 0 {
            return Ok(CommandResult::failure(FailureKind::Persistence, SAVE_FAILED_MESSAGE));
        }
        Ok(CommandResult::ok())
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging, DecoratorKind::Audit]
    }
}
