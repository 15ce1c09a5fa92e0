//! # Fleet Application
//!
//! Vehicle and person management on top of the tenancy core: tenant
//! provisioning, vehicle commands and queries, handler registration and the
//! runtime that wires them to a store.

pub mod commands;
pub mod domain;
pub mod queries;
pub mod registration;
pub mod runtime;

pub use commands::{CreateVehicle, DeleteVehicle, ProvisionTenant, ProvisionedTenant, UpdateVehicle};
pub use domain::{Person, Vehicle, VehicleDto, VehicleType};
pub use queries::{GetVehicle, GetVehicles};
pub use registration::build_registry;
pub use runtime::FleetRuntime;
