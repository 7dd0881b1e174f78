//! Subscription directory: which connections follow which vehicle.
//!
//! DESIGN
//! ======
//! A room is the set of connections tracking one vehicle. The directory
//! keeps two indices that must always agree: vehicle → members and
//! connection → vehicles. The reverse index lets a disconnect leave every
//! room in one pass without scanning all rooms.
//!
//! Rooms exist only while non-empty. Joining twice is a no-op; leaving a
//! room you are not in is a no-op.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use crate::models::VehicleId;

pub type ClientId = Uuid;

#[derive(Debug, Default)]
pub struct SubscriptionDirectory {
    rooms: HashMap<VehicleId, HashSet<ClientId>>,
    memberships: HashMap<ClientId, HashSet<VehicleId>>,
}

impl SubscriptionDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `client_id` to the vehicle's room. Returns false when it was
    /// already a member.
    pub fn join(&mut self, client_id: ClientId, vehicle_id: &str) -> bool {
        let added = self.rooms.entry(vehicle_id.to_owned()).or_default().insert(client_id);
        if added {
            self.memberships.entry(client_id).or_default().insert(vehicle_id.to_owned());
        }
        added
    }

    /// Remove `client_id` from the vehicle's room. Returns false when it was
    /// not a member.
    pub fn leave(&mut self, client_id: ClientId, vehicle_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(vehicle_id) else {
            return false;
        };
        if !members.remove(&client_id) {
            return false;
        }
        if members.is_empty() {
            self.rooms.remove(vehicle_id);
        }

        if let Some(vehicles) = self.memberships.get_mut(&client_id) {
            vehicles.remove(vehicle_id);
            if vehicles.is_empty() {
                self.memberships.remove(&client_id);
            }
        }
        true
    }

    /// Drop every membership held by `client_id`. Returns the vehicles it
    /// was tracking.
    pub fn remove_connection(&mut self, client_id: ClientId) -> Vec<VehicleId> {
        let Some(vehicles) = self.memberships.remove(&client_id) else {
            return Vec::new();
        };

        for vehicle_id in &vehicles {
            if let Some(members) = self.rooms.get_mut(vehicle_id) {
                members.remove(&client_id);
                if members.is_empty() {
                    self.rooms.remove(vehicle_id);
                }
            }
        }

        let mut vehicles: Vec<VehicleId> = vehicles.into_iter().collect();
        vehicles.sort();
        vehicles
    }

    #[must_use]
    pub fn count_subscribers(&self, vehicle_id: &str) -> usize {
        self.rooms.get(vehicle_id).map_or(0, HashSet::len)
    }

    /// Members of one room, in no particular order.
    pub fn members(&self, vehicle_id: &str) -> impl Iterator<Item = &ClientId> {
        self.rooms.get(vehicle_id).into_iter().flatten()
    }

    /// Number of non-empty rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Vehicles tracked by one connection, sorted.
    #[must_use]
    pub fn tracked_by(&self, client_id: ClientId) -> Vec<VehicleId> {
        let mut vehicles: Vec<VehicleId> = self
            .memberships
            .get(&client_id)
            .map(|v| v.iter().cloned().collect())
            .unwrap_or_default();
        vehicles.sort();
        vehicles
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
