use super::*;
use crate::frame::ServerFrame;
use crate::services::store::VehicleStore;
use crate::services::tracking;
use crate::state::test_helpers::{self, assert_no_event, recv_event};

fn raw(vehicle_id: &str, lat: f64, lng: f64, status: &str) -> RawLocationUpdate {
    RawLocationUpdate {
        vehicle_id: Some(vehicle_id.into()),
        lat: Some(lat),
        lng: Some(lng),
        status: Some(status.into()),
        battery_level: None,
    }
}

fn expect_report(frame: ServerFrame) -> LocationReport {
    match frame {
        ServerFrame::LocationUpdated(report) | ServerFrame::VehicleLocationUpdated(report) => report,
        other => panic!("expected a location event, got {other:?}"),
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn validate_accepts_complete_report_and_defaults_battery() {
    let update = LocationUpdate::validate(&raw("V1", 12.9716, 77.5946, "on_route")).expect("valid");
    assert_eq!(update.vehicle_id, "V1");
    assert_eq!(update.status, VehicleStatus::OnRoute);
    assert_eq!(update.battery_level, DEFAULT_BATTERY_LEVEL);
}

#[test]
fn validate_keeps_explicit_zero_battery() {
    let mut payload = raw("V1", 0.0, 0.0, "online");
    payload.battery_level = Some(0.0);
    assert_eq!(LocationUpdate::validate(&payload).expect("valid").battery_level, 0);
}

#[test]
fn validate_accepts_range_boundaries() {
    assert!(LocationUpdate::validate(&raw("V1", 90.0, 180.0, "online")).is_ok());
    assert!(LocationUpdate::validate(&raw("V1", -90.0, -180.0, "online")).is_ok());
}

#[test]
fn validate_rejects_out_of_range_coordinates() {
    for (lat, lng) in [(91.0, 0.0), (-90.5, 0.0), (0.0, 180.1), (0.0, -181.0), (f64::NAN, 0.0)] {
        let err = LocationUpdate::validate(&raw("V1", lat, lng, "online")).unwrap_err();
        assert!(matches!(err, LocationError::Validation(_)), "({lat}, {lng}) should be rejected");
    }
}

#[test]
fn validate_rejects_unknown_status() {
    let err = LocationUpdate::validate(&raw("V1", 0.0, 0.0, "parked")).unwrap_err();
    assert!(matches!(err, LocationError::Validation(ref m) if m.contains("parked")));
}

#[test]
fn validate_rejects_missing_fields() {
    let mut payload = raw("V1", 0.0, 0.0, "online");
    payload.lng = None;
    assert!(LocationUpdate::validate(&payload).is_err());

    let mut payload = raw("V1", 0.0, 0.0, "online");
    payload.status = None;
    assert!(LocationUpdate::validate(&payload).is_err());

    let payload = raw("   ", 0.0, 0.0, "online");
    assert!(LocationUpdate::validate(&payload).is_err());

    assert!(LocationUpdate::validate(&RawLocationUpdate::default()).is_err());
}

#[test]
fn validate_rejects_bad_battery() {
    for level in [-1.0, 100.5, 101.0, 42.5] {
        let mut payload = raw("V1", 0.0, 0.0, "online");
        payload.battery_level = Some(level);
        assert!(LocationUpdate::validate(&payload).is_err(), "battery {level} should be rejected");
    }
}

#[test]
fn error_codes() {
    assert_eq!(LocationError::Validation("x".into()).error_code(), "E_VALIDATION");
    assert_eq!(LocationError::from(StoreError::NotFound("V1".into())).error_code(), "E_VEHICLE_NOT_FOUND");
    assert_eq!(LocationError::from(StoreError::InvalidRow("x".into())).error_code(), "E_STORE");
    assert!(!LocationError::Validation("x".into()).retryable());
}

// =============================================================================
// PROCESSING
// =============================================================================

#[tokio::test]
async fn valid_update_reaches_room_and_global_listeners() {
    let (state, store) = test_helpers::test_app_state();
    store.insert_vehicle(test_helpers::vehicle("V1", None)).await;

    let (a, mut rx_a) = test_helpers::register_client(&state).await;
    let (b, mut rx_b) = test_helpers::register_client(&state).await;
    let (_c, mut rx_c) = test_helpers::register_client(&state).await;
    tracking::track_vehicle(&state, a, "V1").await.expect("join");
    tracking::track_vehicle(&state, b, "V1").await.expect("join");

    let report = process_update(&state, a, &raw("V1", 12.9716, 77.5946, "online"))
        .await
        .expect("processed");

    let room_a = recv_event(&mut rx_a).await;
    let room_b = recv_event(&mut rx_b).await;
    assert_eq!(room_a.event(), "location-updated");
    assert_eq!(room_a, room_b);
    assert_eq!(expect_report(room_a), report);

    for rx in [&mut rx_a, &mut rx_b, &mut rx_c] {
        let global = recv_event(rx).await;
        assert_eq!(global, ServerFrame::VehicleLocationUpdated(report.clone()));
    }
    assert_no_event(&mut rx_c).await;

    let stored = store.get("V1").await.expect("get").expect("present");
    assert_eq!(stored.lat, Some(12.9716));
    assert_eq!(stored.updated_at, report.timestamp);
}

#[tokio::test]
async fn invalid_update_changes_nothing() {
    let (state, store) = test_helpers::test_app_state();
    store.insert_vehicle(test_helpers::vehicle("V1", Some((1.0, 1.0)))).await;

    let (a, mut rx_a) = test_helpers::register_client(&state).await;
    tracking::track_vehicle(&state, a, "V1").await.expect("join");
    let before = tracking::tracker_count(&state, "V1").await;

    let err = process_update(&state, a, &raw("V1", 91.0, 0.0, "online")).await.unwrap_err();
    assert!(matches!(err, LocationError::Validation(_)));

    assert_no_event(&mut rx_a).await;
    assert_eq!(tracking::tracker_count(&state, "V1").await, before);
    let stored = store.get("V1").await.expect("get").expect("present");
    assert_eq!(stored.lat, Some(1.0));
}

#[tokio::test]
async fn unknown_vehicle_is_not_broadcast() {
    let (state, _store) = test_helpers::test_app_state();
    let (a, mut rx_a) = test_helpers::register_client(&state).await;

    let err = process_update(&state, a, &raw("ghost", 0.0, 0.0, "online")).await.unwrap_err();
    assert!(matches!(err, LocationError::NotFound(ref id) if id == "ghost"));
    assert_no_event(&mut rx_a).await;
    assert!(state.vehicle_locks.is_empty());
}

#[tokio::test]
async fn store_failure_is_sender_local() {
    struct BrokenStore;

    #[async_trait::async_trait]
    impl VehicleStore for BrokenStore {
        async fn update(&self, _: &LocationUpdate, _: i64) -> Result<crate::models::VehicleSnapshot, StoreError> {
            Err(StoreError::InvalidRow("disk on fire".into()))
        }
        async fn get(&self, _: &str) -> Result<Option<crate::models::VehicleSnapshot>, StoreError> {
            Ok(None)
        }
        async fn snapshot_all(&self) -> Result<Vec<crate::models::VehicleSnapshot>, StoreError> {
            Ok(Vec::new())
        }
        async fn stops(&self) -> Result<Vec<crate::models::Stop>, StoreError> {
            Ok(Vec::new())
        }
    }

    let (mut state, _store) = test_helpers::test_app_state();
    state.store = std::sync::Arc::new(BrokenStore);
    let (a, mut rx_a) = test_helpers::register_client(&state).await;

    let err = process_update(&state, a, &raw("V1", 0.0, 0.0, "online")).await.unwrap_err();
    assert_eq!(err.error_code(), "E_STORE");
    assert_no_event(&mut rx_a).await;
}

#[tokio::test]
async fn timestamps_never_decrease_for_a_vehicle() {
    let (state, store) = test_helpers::test_app_state();
    store.insert_vehicle(test_helpers::vehicle("V1", None)).await;

    // Pretend an earlier update was stamped in the future.
    let future = now_ms() + 60_000;
    *state.vehicle_locks.handle("V1").lock().await = future;

    let (a, _rx) = test_helpers::register_client(&state).await;
    let report = process_update(&state, a, &raw("V1", 0.0, 0.0, "online")).await.expect("processed");
    assert_eq!(report.timestamp, future);
}

#[tokio::test]
async fn concurrent_updates_for_one_vehicle_arrive_in_order() {
    let (state, store) = test_helpers::test_app_state();
    store.insert_vehicle(test_helpers::vehicle("V1", None)).await;
    store.insert_vehicle(test_helpers::vehicle("V2", None)).await;

    let (watcher, mut rx) = test_helpers::register_client(&state).await;
    tracking::track_vehicle(&state, watcher, "V1").await.expect("join");

    let mut tasks = Vec::new();
    for i in 0..20_u32 {
        let state = state.clone();
        let vehicle = if i % 2 == 0 { "V1" } else { "V2" };
        tasks.push(tokio::spawn(async move {
            process_update(&state, watcher, &raw(vehicle, f64::from(i), 0.0, "on_route")).await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("processed");
    }

    let mut last_by_vehicle = std::collections::HashMap::new();
    let mut room_events = 0;
    while let Ok(Some(frame)) = tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await {
        let room = frame.event() == "location-updated";
        let report = expect_report(frame);
        if room {
            room_events += 1;
            assert_eq!(report.vehicle_id, "V1");
        }
        let key = (room, report.vehicle_id.clone());
        let last = last_by_vehicle.entry(key).or_insert(i64::MIN);
        assert!(report.timestamp >= *last, "timestamps went backwards for {}", report.vehicle_id);
        *last = report.timestamp;
    }
    assert_eq!(room_events, 10);
}

