//! Proximity queries against the store's current snapshot.
//!
//! Ranking math lives in `geo`; this layer only picks the candidate set
//! (online vehicles, all stops) and shapes results for the HTTP surface.

use serde::Serialize;

use crate::geo::{self, Point, Ranked};
use crate::models::{Stop, VehicleSnapshot, VehicleStatus};
use crate::services::store::{StoreError, VehicleStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyVehicle {
    #[serde(flatten)]
    pub vehicle: VehicleSnapshot,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedStop {
    #[serde(flatten)]
    pub stop: Stop,
    pub distance_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestStops {
    pub nearest: Option<RankedStop>,
    pub stops: Vec<RankedStop>,
}

/// Online vehicles within `radius_km` of `origin`, nearest first.
///
/// # Errors
///
/// Propagates store read failures.
pub async fn nearby_vehicles(
    store: &dyn VehicleStore,
    origin: Point,
    radius_km: f64,
) -> Result<Vec<NearbyVehicle>, StoreError> {
    let online: Vec<VehicleSnapshot> = store
        .snapshot_all()
        .await?
        .into_iter()
        .filter(|v| v.status == VehicleStatus::Online)
        .collect();

    Ok(geo::nearest_within_radius(origin, &online, radius_km)
        .into_iter()
        .map(|Ranked { item, distance_km }| NearbyVehicle { vehicle: item.clone(), distance_km })
        .collect())
}

/// Every stop with coordinates ranked by distance, optionally limited to
/// `radius_km`, plus the single nearest.
///
/// # Errors
///
/// Propagates store read failures.
pub async fn nearest_stops(
    store: &dyn VehicleStore,
    origin: Point,
    radius_km: Option<f64>,
) -> Result<NearestStops, StoreError> {
    let all = store.stops().await?;
    let ranked = match radius_km {
        Some(radius) => geo::nearest_within_radius(origin, &all, radius),
        None => geo::rank_by_distance(origin, &all),
    };

    let to_ranked_stop = |Ranked { item, distance_km }: Ranked<'_, Stop>| RankedStop { stop: item.clone(), distance_km };
    let nearest = geo::nearest(origin, &all, radius_km).map(to_ranked_stop);
    let stops = ranked.into_iter().map(to_ranked_stop).collect();
    Ok(NearestStops { nearest, stops })
}

#[cfg(test)]
#[path = "proximity_test.rs"]
mod tests;
