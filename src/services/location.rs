//! Location update processor: validate, persist, then broadcast.
//!
//! DESIGN
//! ======
//! Updates for one vehicle are serialized by a per-vehicle async lock held
//! across the store write and the fan-out. Updates for different vehicles
//! proceed in parallel. The lock also carries the last timestamp handed out
//! for that vehicle so broadcast timestamps never go backwards, even when
//! the wall clock does.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is returned to the caller, which reports it to the sender
//! only. A rejected update changes nothing and broadcasts nothing. Store
//! writes are never cancelled once started.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::frame::{ErrorCode, RawLocationUpdate};
use crate::models::{LocationReport, VehicleId, VehicleStatus, now_ms};
use crate::services::rooms::ClientId;
use crate::services::store::StoreError;
use crate::state::AppState;

/// Battery level assumed when a report omits it.
pub const DEFAULT_BATTERY_LEVEL: u8 = 100;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("invalid location update: {0}")]
    Validation(String),
    #[error("vehicle not found: {0}")]
    NotFound(VehicleId),
    #[error("store error: {0}")]
    Store(StoreError),
}

impl ErrorCode for LocationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::NotFound(_) => "E_VEHICLE_NOT_FOUND",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.retryable())
    }
}

impl From<StoreError> for LocationError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

/// A validated position report, ready for the store.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub vehicle_id: VehicleId,
    pub lat: f64,
    pub lng: f64,
    pub status: VehicleStatus,
    pub battery_level: u8,
}

impl LocationUpdate {
    /// Check required fields, coordinate ranges, status and battery.
    ///
    /// # Errors
    ///
    /// `LocationError::Validation` naming the first offending field.
    pub fn validate(raw: &RawLocationUpdate) -> Result<Self, LocationError> {
        let vehicle_id = raw
            .vehicle_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| invalid("vehicle_id is required"))?;
        let lat = raw.lat.ok_or_else(|| invalid("lat is required"))?;
        let lng = raw.lng.ok_or_else(|| invalid("lng is required"))?;

        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(invalid(format!("lat must be within [-90, 90], got {lat}")));
        }
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(invalid(format!("lng must be within [-180, 180], got {lng}")));
        }

        let status = raw
            .status
            .as_deref()
            .ok_or_else(|| invalid("status is required"))?
            .parse::<VehicleStatus>()
            .map_err(|e| invalid(e.to_string()))?;

        let battery_level = match raw.battery_level {
            None => DEFAULT_BATTERY_LEVEL,
            Some(level) => battery_from_f64(level)?,
        };

        Ok(Self { vehicle_id: vehicle_id.to_owned(), lat, lng, status, battery_level })
    }
}

fn invalid(message: impl Into<String>) -> LocationError {
    LocationError::Validation(message.into())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn battery_from_f64(level: f64) -> Result<u8, LocationError> {
    if !level.is_finite() || !(0.0..=100.0).contains(&level) || level.fract() != 0.0 {
        return Err(invalid(format!("battery_level must be an integer within [0, 100], got {level}")));
    }
    // Range and integrality checked above.
    Ok(level as u8)
}

// =============================================================================
// PER-VEHICLE LOCKS
// =============================================================================

/// Per-vehicle serialization points. Each entry holds the last timestamp
/// issued for that vehicle.
#[derive(Debug, Clone, Default)]
pub struct VehicleLocks {
    inner: Arc<StdMutex<HashMap<VehicleId, Arc<Mutex<i64>>>>>,
}

impl VehicleLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock for one vehicle, created on first use.
    #[must_use]
    pub fn handle(&self, vehicle_id: &str) -> Arc<Mutex<i64>> {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(map.entry(vehicle_id.to_owned()).or_default())
    }

    /// Drop the entry for a vehicle nobody else is holding. Used for ids the
    /// store rejected so unknown ids do not accumulate.
    pub fn forget_if_idle(&self, vehicle_id: &str) {
        let mut map = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if map.get(vehicle_id).is_some_and(|h| Arc::strong_count(h) == 1) {
            map.remove(vehicle_id);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// PROCESSING
// =============================================================================

/// Validate, persist and broadcast one `update-location` from `client_id`.
///
/// The returned report is exactly what was broadcast.
///
/// # Errors
///
/// `Validation` for a malformed payload, `NotFound` when the store does not
/// know the vehicle, `Store` for any other store failure. No broadcast
/// happens on error.
pub async fn process_update(
    state: &AppState,
    client_id: ClientId,
    raw: &RawLocationUpdate,
) -> Result<LocationReport, LocationError> {
    let update = LocationUpdate::validate(raw).inspect_err(|e| {
        warn!(%client_id, error = %e, "location: rejected update");
    })?;

    let handle = state.vehicle_locks.handle(&update.vehicle_id);
    let mut last_ts = handle.lock().await;
    let timestamp = now_ms().max(*last_ts);

    let snapshot = match state.store.update(&update, timestamp).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(%client_id, vehicle_id = %update.vehicle_id, error = %e, "location: store update failed");
            let not_found = matches!(e, StoreError::NotFound(_));
            drop(last_ts);
            drop(handle);
            if not_found {
                state.vehicle_locks.forget_if_idle(&update.vehicle_id);
            }
            return Err(e.into());
        }
    };
    *last_ts = timestamp;

    let report = LocationReport {
        vehicle_id: snapshot.id,
        lat: update.lat,
        lng: update.lng,
        status: update.status,
        battery_level: update.battery_level,
        timestamp,
    };

    let stats = state.hub.read().await.fan_out(&report);
    debug!(
        vehicle_id = %report.vehicle_id,
        room = stats.room_delivered,
        global = stats.global_delivered,
        dropped = stats.dropped,
        "location: broadcast"
    );

    Ok(report)
}

#[cfg(test)]
#[path = "location_test.rs"]
mod tests;
