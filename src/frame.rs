//! Frame: the wire envelope for the tracking socket.
//!
//! ARCHITECTURE
//! ============
//! Every socket message is a JSON object `{"event": "...", "data": {...}}`.
//! Inbound frames decode into `ClientFrame`, one variant per event the
//! client may send; anything that does not decode is answered with an
//! `error` frame and never reaches the services. Outbound frames are
//! `ServerFrame` values pushed through each connection's channel.
//!
//! DESIGN
//! ======
//! - Event names are kebab-case on the wire (`track-vehicle`,
//!   `location-updated`).
//! - `update-location` keeps every field optional at decode time so that a
//!   missing field surfaces as a validation error with a useful message
//!   instead of a generic decode failure. A frame with no `data` at all
//!   decodes as an empty payload for the same reason.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{LocationReport, VehicleId};

/// Error code for frames that are not valid JSON or name no known event.
pub const E_INVALID_FRAME: &str = "E_INVALID_FRAME";

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// INBOUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientFrame {
    TrackVehicle(VehicleRef),
    StopTracking(VehicleRef),
    UpdateLocation(Option<RawLocationUpdate>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VehicleRef {
    pub vehicle_id: VehicleId,
}

/// Unvalidated `update-location` payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawLocationUpdate {
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub battery_level: Option<f64>,
}

impl ClientFrame {
    /// Decode one inbound text message.
    ///
    /// # Errors
    ///
    /// Returns the decode error for malformed JSON or unknown events.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::TrackVehicle(_) => "track-vehicle",
            Self::StopTracking(_) => "stop-tracking",
            Self::UpdateLocation(_) => "update-location",
        }
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerFrame {
    /// Sent once after the handshake is accepted.
    Connected { client_id: Uuid, subject: String },
    /// Delivered to the vehicle's room.
    LocationUpdated(LocationReport),
    /// Delivered to every connection.
    VehicleLocationUpdated(LocationReport),
    /// Sender-only failure report.
    Error(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ServerFrame {
    /// Create an error frame from a plain code and message.
    #[must_use]
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error(ErrorBody { code: code.to_owned(), message: message.into(), retryable: false })
    }

    /// Create a structured error frame from a typed error.
    #[must_use]
    pub fn error_from(err: &(impl ErrorCode + ?Sized)) -> Self {
        Self::Error(ErrorBody {
            code: err.error_code().to_owned(),
            message: err.to_string(),
            retryable: err.retryable(),
        })
    }

    #[must_use]
    pub fn event(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::LocationUpdated(_) => "location-updated",
            Self::VehicleLocationUpdated(_) => "vehicle-location-updated",
            Self::Error(_) => "error",
        }
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
