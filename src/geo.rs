//! Great-circle distance and nearest-candidate ranking.
//!
//! DESIGN
//! ======
//! Pure functions only. Candidates expose an id and optional coordinates via
//! `Located`; anything without a usable point is skipped rather than treated
//! as infinitely far away. Ranking is ascending by distance with ties broken
//! by id so results are deterministic.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub lat: f64,
    pub lng: f64,
}

impl Point {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and inside WGS84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    #[must_use]
    pub fn distance_km(&self, other: &Point) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine distance in kilometres between two lat/lng pairs in degrees.
#[must_use]
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push `a` a hair past 1 for antipodal points.
    let a = a.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

// =============================================================================
// RANKING
// =============================================================================

/// Anything that can be ranked by distance.
pub trait Located {
    fn id(&self) -> &str;
    fn point(&self) -> Option<Point>;
}

/// A candidate paired with its distance from the query origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked<'a, T> {
    pub item: &'a T,
    pub distance_km: f64,
}

fn by_distance_then_id<T: Located>(a: &Ranked<'_, T>, b: &Ranked<'_, T>) -> Ordering {
    a.distance_km
        .total_cmp(&b.distance_km)
        .then_with(|| a.item.id().cmp(b.item.id()))
}

/// Every candidate with usable coordinates, nearest first.
pub fn rank_by_distance<T: Located>(origin: Point, candidates: &[T]) -> Vec<Ranked<'_, T>> {
    let mut ranked: Vec<Ranked<'_, T>> = candidates
        .iter()
        .filter_map(|item| {
            let point = item.point().filter(Point::is_valid)?;
            Some(Ranked { item, distance_km: origin.distance_km(&point) })
        })
        .collect();
    ranked.sort_by(by_distance_then_id);
    ranked
}

/// Candidates within `radius_km` of `origin` (inclusive), nearest first.
pub fn nearest_within_radius<T: Located>(origin: Point, candidates: &[T], radius_km: f64) -> Vec<Ranked<'_, T>> {
    let mut ranked = rank_by_distance(origin, candidates);
    ranked.retain(|r| r.distance_km <= radius_km);
    ranked
}

/// The single nearest candidate, or `None` when nothing has coordinates or
/// `radius_km` excludes every candidate.
pub fn nearest<T: Located>(origin: Point, candidates: &[T], radius_km: Option<f64>) -> Option<Ranked<'_, T>> {
    candidates
        .iter()
        .filter_map(|item| {
            let point = item.point().filter(Point::is_valid)?;
            Some(Ranked { item, distance_km: origin.distance_km(&point) })
        })
        .filter(|r| radius_km.is_none_or(|radius| r.distance_km <= radius))
        .min_by(by_distance_then_id)
}

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;
