// ============================================================================
// Fleet Application - Vehicle Entity
// File: crates/fleet-application/src/domain/vehicle.rs
// Description: Tenant-owned vehicle and its read model
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tenancy_core::Entity;
use tenancy_shared::{AuditFields, EntityId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Car,
    Motorcycle,
    Truck,
    Bus,
    Van,
    Other,
}

impl VehicleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Car => "car",
            VehicleType::Motorcycle => "motorcycle",
            VehicleType::Truck => "truck",
            VehicleType::Bus => "bus",
            VehicleType::Van => "van",
            VehicleType::Other => "other",
        }
    }
}

impl std::fmt::Display for VehicleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle entity, owned by the tenant in `person_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    #[serde(skip)]
    pub id: Option<EntityId>,
    pub person_id: TenantId,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub license_plate: String,

    #[serde(flatten)]
    pub audit: AuditFields,
}

impl Vehicle {
    pub fn new(person_id: TenantId, vehicle_type: VehicleType, license_plate: &str) -> Self {
        Self {
            id: None,
            person_id,
            vehicle_type,
            license_plate: license_plate.trim().to_string(),
            audit: AuditFields::default(),
        }
    }
}

impl Entity for Vehicle {
    const TABLE: &'static str = "vehicles";

    fn id(&self) -> Option<EntityId> {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = Some(id);
    }

    fn audit(&self) -> Option<&AuditFields> {
        Some(&self.audit)
    }

    fn audit_mut(&mut self) -> Option<&mut AuditFields> {
        Some(&mut self.audit)
    }

    fn owner(&self) -> Option<TenantId> {
        Some(self.person_id)
    }
}

/// Vehicle as returned by queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDto {
    pub id: EntityId,
    pub person_id: TenantId,
    #[serde(rename = "type")]
    pub vehicle_type: VehicleType,
    pub license_plate: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<Vehicle> for VehicleDto {
    fn from(vehicle: Vehicle) -> Self {
        Self {
            id: vehicle.id.unwrap_or_default(),
            person_id: vehicle.person_id,
            vehicle_type: vehicle.vehicle_type,
            license_plate: vehicle.license_plate,
            created_at: vehicle.audit.created_at,
        }
    }
}
