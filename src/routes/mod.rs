//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the tracking socket and the HTTP query endpoints under a single
//! Axum router. Every route except `/healthz` requires a credential.

pub mod auth;
pub mod proximity;
pub mod tracking;
pub mod ws;

use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::get;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(state.config.frontend_url.as_deref());

    Router::new()
        .route("/tracking/ws", get(ws::handle_ws))
        .route("/tracking/vehicle/{id}/trackers", get(tracking::vehicle_trackers))
        .route("/tracking/stats", get(tracking::stats))
        .route("/vehicles/nearby", get(proximity::nearby_vehicles))
        .route("/stops/nearest", get(proximity::nearest_stop))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(frontend_url: Option<&str>) -> CorsLayer {
    let origin = match frontend_url.map(HeaderValue::from_str) {
        Some(Ok(origin)) => AllowOrigin::exact(origin),
        Some(Err(e)) => {
            warn!(error = %e, "FRONTEND_URL is not a valid origin; allowing any origin");
            AllowOrigin::from(Any)
        }
        None => AllowOrigin::from(Any),
    };

    CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
