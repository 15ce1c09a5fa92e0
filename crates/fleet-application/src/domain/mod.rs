//! Shard-resident business entities.

pub mod person;
pub mod vehicle;

pub use person::Person;
pub use vehicle::{Vehicle, VehicleDto, VehicleType};
