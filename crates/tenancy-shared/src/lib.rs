//! # Tenancy Shared
//!
//! Configuration, telemetry and primitive types shared by the tenancy crates.

pub mod constants;
pub mod types;
pub mod telemetry;
pub mod config;
pub mod error;

pub use types::*;
pub use error::AppError;
