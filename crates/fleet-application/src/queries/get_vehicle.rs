//! Single vehicle lookup.

use async_trait::async_trait;
use tenancy_core::{DecoratorKind, DomainError, ExecutionScope, Query, QueryHandler};
use tenancy_shared::EntityId;
use validator::Validate;

use crate::domain::{Vehicle, VehicleDto};

#[derive(Debug, Clone, Validate)]
pub struct GetVehicle {
    pub id: EntityId,
}

impl Query for GetVehicle {
    const NAME: &'static str = "GetVehicle";
    type Output = Option<VehicleDto>;
}

/// Vehicles of other tenants and deleted vehicles read as absent.
pub struct GetVehicleHandler;

#[async_trait]
impl QueryHandler<GetVehicle> for GetVehicleHandler {
    async fn handle(&self, query: GetVehicle, scope: &mut ExecutionScope) -> Result<Option<VehicleDto>, DomainError> {
        let vehicle = scope.uow().shard().await?.find::<Vehicle>(query.id).await?;
        Ok(vehicle.map(VehicleDto::from))
    }

    fn decorators() -> &'static [DecoratorKind] {
        &[DecoratorKind::Logging]
    }
}
