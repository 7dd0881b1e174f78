//! Tracking hub: client registry and subscription directory under one lock.
//!
//! ARCHITECTURE
//! ============
//! `AppState` holds the hub behind a single `RwLock`. Mutations (admit,
//! remove, join, leave) take the write half; fan-out and counts take the
//! read half. Because removal and room cleanup happen inside one write
//! section, a fan-out either runs entirely before a disconnect or never
//! sees the connection at all.
//!
//! DELIVERY
//! ========
//! Outbound queues are bounded. Fan-out uses `try_send`: a full queue drops
//! the newest event for that connection only, a closed queue is ignored.
//! Neither case blocks delivery to anyone else.

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::frame::ServerFrame;
use crate::models::{LocationReport, VehicleId};
use crate::services::auth::Identity;
use crate::services::registry::{ClientRegistry, ConnectedClient};
use crate::services::rooms::{ClientId, SubscriptionDirectory};

#[derive(Debug, thiserror::Error)]
#[error("client not registered: {0}")]
pub struct UnknownClient(pub ClientId);

/// Per-fan-out delivery counts, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub room_delivered: usize,
    pub global_delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
pub struct TrackingHub {
    registry: ClientRegistry,
    directory: SubscriptionDirectory,
}

impl TrackingHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub fn admit(&mut self, identity: Identity, tx: mpsc::Sender<ServerFrame>) -> ClientId {
        let subject = identity.subject.clone();
        let client_id = self.registry.register(identity, tx);
        info!(%client_id, %subject, connections = self.registry.len(), "hub: client admitted");
        client_id
    }

    /// Unregister a connection and drop all its room memberships. Safe to
    /// call more than once; later calls return `None`.
    pub fn remove(&mut self, client_id: ClientId) -> Option<ConnectedClient> {
        let client = self.registry.unregister(client_id)?;
        let left = self.directory.remove_connection(client_id);
        info!(
            %client_id,
            rooms_left = left.len(),
            connections = self.registry.len(),
            "hub: client removed"
        );
        Some(client)
    }

    // =========================================================================
    // ROOMS
    // =========================================================================

    /// Join a vehicle room. Returns false when already a member.
    ///
    /// # Errors
    ///
    /// `UnknownClient` when the connection is not registered.
    pub fn join(&mut self, client_id: ClientId, vehicle_id: &str) -> Result<bool, UnknownClient> {
        if !self.registry.contains(client_id) {
            return Err(UnknownClient(client_id));
        }
        Ok(self.directory.join(client_id, vehicle_id))
    }

    /// Leave a vehicle room. Returns false when not a member.
    ///
    /// # Errors
    ///
    /// `UnknownClient` when the connection is not registered.
    pub fn leave(&mut self, client_id: ClientId, vehicle_id: &str) -> Result<bool, UnknownClient> {
        if !self.registry.contains(client_id) {
            return Err(UnknownClient(client_id));
        }
        Ok(self.directory.leave(client_id, vehicle_id))
    }

    #[must_use]
    pub fn count_subscribers(&self, vehicle_id: &str) -> usize {
        self.directory.count_subscribers(vehicle_id)
    }

    #[must_use]
    pub fn tracked_by(&self, client_id: ClientId) -> Vec<VehicleId> {
        self.directory.tracked_by(client_id)
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.directory.room_count()
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    /// Deliver `location-updated` to the vehicle's room and
    /// `vehicle-location-updated` to every connection.
    pub fn fan_out(&self, report: &LocationReport) -> DeliveryStats {
        let mut stats = DeliveryStats::default();

        let room_frame = ServerFrame::LocationUpdated(report.clone());
        for client_id in self.directory.members(&report.vehicle_id) {
            let Some(client) = self.registry.get(*client_id) else {
                continue;
            };
            if deliver(*client_id, client, room_frame.clone()) {
                stats.room_delivered += 1;
            } else {
                stats.dropped += 1;
            }
        }

        let global_frame = ServerFrame::VehicleLocationUpdated(report.clone());
        for (client_id, client) in self.registry.iter() {
            if deliver(*client_id, client, global_frame.clone()) {
                stats.global_delivered += 1;
            } else {
                stats.dropped += 1;
            }
        }

        stats
    }
}

fn deliver(client_id: ClientId, client: &ConnectedClient, frame: ServerFrame) -> bool {
    match client.tx.try_send(frame) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(frame)) => {
            debug!(%client_id, event = frame.event(), "hub: outbound queue full; dropping event");
            false
        }
        Err(mpsc::error::TrySendError::Closed(frame)) => {
            debug!(%client_id, event = frame.event(), "hub: outbound queue closed; dropping event");
            false
        }
    }
}

#[cfg(test)]
#[path = "hub_test.rs"]
mod tests;
