//! Read-only requests over the current tenant's shard.

pub mod get_vehicle;
pub mod get_vehicles;

pub use get_vehicle::{GetVehicle, GetVehicleHandler};
pub use get_vehicles::{GetVehicles, GetVehiclesHandler};
