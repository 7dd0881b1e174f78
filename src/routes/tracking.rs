//! Tracking query routes.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::routes::auth::Authenticated;
use crate::services::tracking::{self, TrackingStats};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TrackerCount {
    pub vehicle_id: String,
    pub tracker_count: usize,
}

/// `GET /tracking/vehicle/{id}/trackers`: live subscriber count for a vehicle.
pub async fn vehicle_trackers(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(vehicle_id): Path<String>,
) -> Json<TrackerCount> {
    let tracker_count = tracking::tracker_count(&state, &vehicle_id).await;
    Json(TrackerCount { vehicle_id: vehicle_id.trim().to_owned(), tracker_count })
}

/// `GET /tracking/stats`
pub async fn stats(State(state): State<AppState>, _auth: Authenticated) -> Json<TrackingStats> {
    Json(tracking::stats(&state).await)
}
