//! State-changing requests and their handlers.

pub mod create_vehicle;
pub mod delete_vehicle;
pub mod provision_tenant;
pub mod update_vehicle;

pub use create_vehicle::{CreateVehicle, CreateVehicleHandler};
pub use delete_vehicle::{DeleteVehicle, DeleteVehicleHandler};
pub use provision_tenant::{ProvisionTenant, ProvisionTenantHandler, ProvisionedTenant};
pub use update_vehicle::{UpdateVehicle, UpdateVehicleHandler};

pub const VEHICLE_NOT_FOUND: &str = "Vehicle not found";
