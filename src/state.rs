//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor and
//! passed explicitly to every service call; there are no globals. It holds
//! the tracking hub (registry and rooms under one lock), the per-vehicle
//! update locks, and the two external collaborators: the vehicle store and
//! the credential verifier. Tests build a fresh state each time.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::TrackingConfig;
use crate::services::auth::AuthVerifier;
use crate::services::hub::TrackingHub;
use crate::services::location::VehicleLocks;
use crate::services::store::VehicleStore;

// =============================================================================
// APP STATE
// =============================================================================

/// Clone is required by Axum; every field is Arc-wrapped or cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TrackingConfig>,
    pub hub: Arc<RwLock<TrackingHub>>,
    pub vehicle_locks: VehicleLocks,
    pub store: Arc<dyn VehicleStore>,
    pub verifier: Arc<dyn AuthVerifier>,
}

impl AppState {
    #[must_use]
    pub fn new(config: TrackingConfig, store: Arc<dyn VehicleStore>, verifier: Arc<dyn AuthVerifier>) -> Self {
        Self {
            config: Arc::new(config),
            hub: Arc::new(RwLock::new(TrackingHub::new())),
            vehicle_locks: VehicleLocks::new(),
            store,
            verifier,
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
