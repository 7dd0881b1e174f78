//! Vehicle store: the persistence collaborator for live vehicle state.
//!
//! DESIGN
//! ======
//! The tracking core only needs four things from storage: write a vehicle's
//! live location, read one vehicle, read every vehicle, read every stop.
//! `VehicleStore` captures exactly that so the services can run against
//! Postgres in production and an in-memory map in tests and local runs.
//!
//! ERROR HANDLING
//! ==============
//! `update` of an unknown id is `StoreError::NotFound`, never a silent no-op,
//! so the caller can refuse to broadcast.

use std::collections::HashMap;

use sqlx::PgPool;
use tokio::sync::RwLock;

use crate::models::{Stop, VehicleId, VehicleSnapshot, VehicleStatus};
use crate::services::location::LocationUpdate;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("vehicle not found: {0}")]
    NotFound(VehicleId),
    #[error("invalid stored row: {0}")]
    InvalidRow(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl crate::frame::ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_VEHICLE_NOT_FOUND",
            Self::InvalidRow(_) | Self::Database(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

#[async_trait::async_trait]
pub trait VehicleStore: Send + Sync {
    /// Write the live location columns for one vehicle and return the new
    /// snapshot. `recorded_at` becomes the snapshot's `updated_at`.
    async fn update(&self, update: &LocationUpdate, recorded_at: i64) -> Result<VehicleSnapshot, StoreError>;

    async fn get(&self, vehicle_id: &str) -> Result<Option<VehicleSnapshot>, StoreError>;

    async fn snapshot_all(&self) -> Result<Vec<VehicleSnapshot>, StoreError>;

    async fn stops(&self) -> Result<Vec<Stop>, StoreError>;
}

// =============================================================================
// POSTGRES
// =============================================================================

type VehicleRow = (String, String, Option<f64>, Option<f64>, String, i16, i64);

const VEHICLE_COLUMNS: &str = "id, name, current_lat, current_lng, status, battery_level, updated_at";

pub struct PgVehicleStore {
    pool: PgPool,
}

impl PgVehicleStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn snapshot_from_row(row: VehicleRow) -> Result<VehicleSnapshot, StoreError> {
    let (id, name, lat, lng, status, battery_level, updated_at) = row;
    let status = status
        .parse::<VehicleStatus>()
        .map_err(|e| StoreError::InvalidRow(format!("vehicle {id}: {e}")))?;
    let battery_level =
        u8::try_from(battery_level).map_err(|_| StoreError::InvalidRow(format!("vehicle {id}: battery {battery_level}")))?;
    Ok(VehicleSnapshot { id, name, lat, lng, status, battery_level, updated_at })
}

#[async_trait::async_trait]
impl VehicleStore for PgVehicleStore {
    async fn update(&self, update: &LocationUpdate, recorded_at: i64) -> Result<VehicleSnapshot, StoreError> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!(
            "UPDATE vehicles \
             SET current_lat = $2, current_lng = $3, status = $4, battery_level = $5, updated_at = $6 \
             WHERE id = $1 \
             RETURNING {VEHICLE_COLUMNS}"
        ))
        .bind(&update.vehicle_id)
        .bind(update.lat)
        .bind(update.lng)
        .bind(update.status.as_str())
        .bind(i16::from(update.battery_level))
        .bind(recorded_at)
        .fetch_optional(&self.pool)
        .await?;

        let row = row.ok_or_else(|| StoreError::NotFound(update.vehicle_id.clone()))?;
        snapshot_from_row(row)
    }

    async fn get(&self, vehicle_id: &str) -> Result<Option<VehicleSnapshot>, StoreError> {
        let row = sqlx::query_as::<_, VehicleRow>(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1"))
            .bind(vehicle_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(snapshot_from_row).transpose()
    }

    async fn snapshot_all(&self) -> Result<Vec<VehicleSnapshot>, StoreError> {
        let rows = sqlx::query_as::<_, VehicleRow>(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles ORDER BY id"))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(snapshot_from_row).collect()
    }

    async fn stops(&self) -> Result<Vec<Stop>, StoreError> {
        let rows = sqlx::query_as::<_, (String, String, String, Option<f64>, Option<f64>)>(
            "SELECT id, location_name, address, lat, lng FROM stops ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, address, lat, lng)| Stop { id, name, address, lat, lng })
            .collect())
    }
}

// =============================================================================
// IN-MEMORY
// =============================================================================

/// Map-backed store for tests and database-less local runs.
#[derive(Default)]
pub struct MemoryVehicleStore {
    vehicles: RwLock<HashMap<VehicleId, VehicleSnapshot>>,
    stops: RwLock<Vec<Stop>>,
}

impl MemoryVehicleStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_vehicle(&self, snapshot: VehicleSnapshot) {
        self.vehicles.write().await.insert(snapshot.id.clone(), snapshot);
    }

    pub async fn insert_stop(&self, stop: Stop) {
        self.stops.write().await.push(stop);
    }
}

#[async_trait::async_trait]
impl VehicleStore for MemoryVehicleStore {
    async fn update(&self, update: &LocationUpdate, recorded_at: i64) -> Result<VehicleSnapshot, StoreError> {
        let mut vehicles = self.vehicles.write().await;
        let Some(vehicle) = vehicles.get_mut(&update.vehicle_id) else {
            return Err(StoreError::NotFound(update.vehicle_id.clone()));
        };
        vehicle.lat = Some(update.lat);
        vehicle.lng = Some(update.lng);
        vehicle.status = update.status;
        vehicle.battery_level = update.battery_level;
        vehicle.updated_at = recorded_at;
        Ok(vehicle.clone())
    }

    async fn get(&self, vehicle_id: &str) -> Result<Option<VehicleSnapshot>, StoreError> {
        Ok(self.vehicles.read().await.get(vehicle_id).cloned())
    }

    async fn snapshot_all(&self) -> Result<Vec<VehicleSnapshot>, StoreError> {
        let mut all: Vec<VehicleSnapshot> = self.vehicles.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn stops(&self) -> Result<Vec<Stop>, StoreError> {
        Ok(self.stops.read().await.clone())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
