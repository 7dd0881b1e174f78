//! Fleet domain types shared by the tracking services and the wire protocol.
//!
//! DESIGN
//! ======
//! Vehicles and stops are owned by the store collaborator; this crate only
//! reads snapshots of them and writes the live location columns. Location
//! reports are ephemeral: built once per accepted update, broadcast, dropped.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::geo::{Located, Point};

/// Opaque vehicle identifier as issued by the store.
pub type VehicleId = String;

// =============================================================================
// VEHICLE STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    Online,
    Offline,
    OnRoute,
    AtSpot,
    Maintenance,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 5] = [
        VehicleStatus::Online,
        VehicleStatus::Offline,
        VehicleStatus::OnRoute,
        VehicleStatus::AtSpot,
        VehicleStatus::Maintenance,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
            Self::OnRoute => "on_route",
            Self::AtSpot => "at_spot",
            Self::Maintenance => "maintenance",
        }
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown vehicle status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for VehicleStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_owned()))
    }
}

// =============================================================================
// LOCATION REPORT
// =============================================================================

/// A validated, persisted position report as delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    pub vehicle_id: VehicleId,
    pub lat: f64,
    pub lng: f64,
    pub status: VehicleStatus,
    pub battery_level: u8,
    /// Server-assigned, milliseconds since Unix epoch.
    pub timestamp: i64,
}

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// Current state of one vehicle as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub status: VehicleStatus,
    pub battery_level: u8,
    pub updated_at: i64,
}

impl Located for VehicleSnapshot {
    fn id(&self) -> &str {
        &self.id
    }

    fn point(&self) -> Option<Point> {
        Some(Point::new(self.lat?, self.lng?))
    }
}

/// A selling stop. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub address: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
}

impl Located for Stop {
    fn id(&self) -> &str {
        &self.id
    }

    fn point(&self) -> Option<Point> {
        Some(Point::new(self.lat?, self.lng?))
    }
}

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}
