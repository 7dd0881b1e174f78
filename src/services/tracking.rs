//! Tracking service: connection admission and room membership over `AppState`.
//!
//! These are the async entry points used by the socket and HTTP handlers.
//! Each takes the hub lock for as short a time as possible and never holds
//! it across a store call.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

use crate::frame::ServerFrame;
use crate::models::VehicleId;
use crate::services::auth::Identity;
use crate::services::hub::UnknownClient;
use crate::services::rooms::ClientId;
use crate::services::store::StoreError;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error(transparent)]
    UnknownClient(#[from] UnknownClient),
    #[error("vehicle_id must not be empty")]
    InvalidVehicleId,
    #[error("vehicle not found: {0}")]
    VehicleNotFound(VehicleId),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl crate::frame::ErrorCode for TrackingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownClient(_) => "E_UNKNOWN_CLIENT",
            Self::InvalidVehicleId => "E_VALIDATION",
            Self::VehicleNotFound(_) => "E_VEHICLE_NOT_FOUND",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Store(StoreError::Database(_)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrackingStats {
    pub connections: usize,
    pub rooms: usize,
}

// =============================================================================
// CONNECTIONS
// =============================================================================

/// Register an authenticated connection and create its outbound queue.
pub async fn admit_client(state: &AppState, identity: Identity) -> (ClientId, mpsc::Receiver<ServerFrame>) {
    let (tx, rx) = mpsc::channel(state.config.client_channel_capacity);
    let client_id = state.hub.write().await.admit(identity, tx);
    (client_id, rx)
}

/// Remove a connection and all of its room memberships. Returns false if it
/// was already gone.
pub async fn remove_client(state: &AppState, client_id: ClientId) -> bool {
    state.hub.write().await.remove(client_id).is_some()
}

// =============================================================================
// ROOMS
// =============================================================================

/// Subscribe a connection to one vehicle. Returns false when it was already
/// subscribed.
///
/// # Errors
///
/// `InvalidVehicleId` for a blank id, `UnknownClient` for an unregistered
/// connection, and `VehicleNotFound`/`Store` when known-vehicle checking is
/// enabled and the lookup fails.
pub async fn track_vehicle(state: &AppState, client_id: ClientId, vehicle_id: &str) -> Result<bool, TrackingError> {
    let vehicle_id = normalize_vehicle_id(vehicle_id)?;

    if state.config.require_known_vehicle && state.store.get(vehicle_id).await?.is_none() {
        return Err(TrackingError::VehicleNotFound(vehicle_id.to_owned()));
    }

    let mut hub = state.hub.write().await;
    let joined = hub.join(client_id, vehicle_id)?;
    info!(
        %client_id,
        %vehicle_id,
        joined,
        trackers = hub.count_subscribers(vehicle_id),
        "tracking: client tracking vehicle"
    );
    Ok(joined)
}

/// Unsubscribe a connection from one vehicle. Returns false when it was not
/// subscribed.
///
/// # Errors
///
/// `InvalidVehicleId` for a blank id, `UnknownClient` for an unregistered
/// connection.
pub async fn stop_tracking(state: &AppState, client_id: ClientId, vehicle_id: &str) -> Result<bool, TrackingError> {
    let vehicle_id = normalize_vehicle_id(vehicle_id)?;

    let mut hub = state.hub.write().await;
    let left = hub.leave(client_id, vehicle_id)?;
    info!(
        %client_id,
        %vehicle_id,
        left,
        trackers = hub.count_subscribers(vehicle_id),
        "tracking: client stopped tracking vehicle"
    );
    Ok(left)
}

/// Subscriber count under the same id normalisation as `track_vehicle`.
/// A blank id has no room and counts zero.
pub async fn tracker_count(state: &AppState, vehicle_id: &str) -> usize {
    match normalize_vehicle_id(vehicle_id) {
        Ok(vehicle_id) => state.hub.read().await.count_subscribers(vehicle_id),
        Err(_) => 0,
    }
}

pub async fn stats(state: &AppState) -> TrackingStats {
    let hub = state.hub.read().await;
    TrackingStats { connections: hub.connection_count(), rooms: hub.room_count() }
}

fn normalize_vehicle_id(vehicle_id: &str) -> Result<&str, TrackingError> {
    let trimmed = vehicle_id.trim();
    if trimmed.is_empty() {
        return Err(TrackingError::InvalidVehicleId);
    }
    Ok(trimmed)
}

#[cfg(test)]
#[path = "tracking_test.rs"]
mod tests;
