//! Proximity query routes: nearby vehicles and nearest stop.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::frame::ErrorCode;
use crate::geo::Point;
use crate::routes::auth::Authenticated;
use crate::services::proximity::{self, NearbyVehicle, NearestStops};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProximityQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
}

impl ProximityQuery {
    fn origin(&self) -> Result<Point, Response> {
        let origin = Point::new(self.lat, self.lng);
        if !origin.is_valid() {
            return Err(bad_request("lat must be within [-90, 90] and lng within [-180, 180]"));
        }
        Ok(origin)
    }

    fn radius(&self) -> Result<Option<f64>, Response> {
        match self.radius {
            Some(r) if !r.is_finite() || r < 0.0 => Err(bad_request("radius must be a non-negative number")),
            other => Ok(other),
        }
    }
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "code": "E_VALIDATION", "message": message }))).into_response()
}

fn store_failure(err: &impl ErrorCode) -> Response {
    warn!(error = %err, "proximity: store read failed");
    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "code": err.error_code(), "message": err.to_string() })))
        .into_response()
}

/// `GET /vehicles/nearby?lat&lng&radius`: online vehicles within the radius.
pub async fn nearby_vehicles(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ProximityQuery>,
) -> Result<Json<Vec<NearbyVehicle>>, Response> {
    let origin = query.origin()?;
    let radius = query.radius()?.unwrap_or(state.config.nearby_default_radius_km);

    proximity::nearby_vehicles(state.store.as_ref(), origin, radius)
        .await
        .map(Json)
        .map_err(|e| store_failure(&e))
}

/// `GET /stops/nearest?lat&lng[&radius]`: nearest stop and the ranked list.
pub async fn nearest_stop(
    State(state): State<AppState>,
    _auth: Authenticated,
    Query(query): Query<ProximityQuery>,
) -> Result<Json<NearestStops>, Response> {
    let origin = query.origin()?;
    let radius = query.radius()?;

    proximity::nearest_stops(state.store.as_ref(), origin, radius)
        .await
        .map(Json)
        .map_err(|e| store_failure(&e))
}
