//! Handler registration for every fleet command and query.

use std::sync::Arc;

use tenancy_core::{CredentialHasher, DomainError, HandlerRegistry, ShardAssigner};

use crate::commands::{
    CreateVehicle, CreateVehicleHandler, DeleteVehicle, DeleteVehicleHandler, ProvisionTenant,
    ProvisionTenantHandler, UpdateVehicle, UpdateVehicleHandler,
};
use crate::queries::{GetVehicle, GetVehicleHandler, GetVehicles, GetVehiclesHandler};

/// Builds the registry with each handler wrapped in the decorators it declares.
pub fn build_registry(
    hasher: Arc<dyn CredentialHasher>,
    assigner: ShardAssigner,
) -> Result<HandlerRegistry, DomainError> {
    Ok(HandlerRegistry::builder()
        .register_command::<ProvisionTenant, _>(ProvisionTenantHandler::new(hasher, assigner))?
        .register_command::<CreateVehicle, _>(CreateVehicleHandler)?
        .register_command::<UpdateVehicle, _>(UpdateVehicleHandler)?
        .register_command::<DeleteVehicle, _>(DeleteVehicleHandler)?
        .register_query::<GetVehicles, _>(GetVehiclesHandler)?
        .register_query::<GetVehicle, _>(GetVehicleHandler)?
        .build())
}
