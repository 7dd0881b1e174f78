use super::*;
use crate::config::TrackingConfig;
use crate::frame::ErrorCode;
use crate::state::test_helpers::{self, assert_no_event};

#[tokio::test]
async fn track_and_stop_tracking_update_counts() {
    let (state, _store) = test_helpers::test_app_state();
    let (a, _rx_a) = test_helpers::register_client(&state).await;
    let (b, _rx_b) = test_helpers::register_client(&state).await;

    assert!(track_vehicle(&state, a, "V1").await.expect("join"));
    assert!(track_vehicle(&state, b, "V1").await.expect("join"));
    assert!(!track_vehicle(&state, b, "V1").await.expect("rejoin"));
    assert_eq!(tracker_count(&state, "V1").await, 2);

    assert!(stop_tracking(&state, a, "V1").await.expect("leave"));
    assert!(!stop_tracking(&state, a, "V1").await.expect("leave again"));
    assert_eq!(tracker_count(&state, "V1").await, 1);
}

#[tokio::test]
async fn padded_ids_join_and_count_the_same_room() {
    let (state, _store) = test_helpers::test_app_state();
    let (a, _rx) = test_helpers::register_client(&state).await;

    assert!(track_vehicle(&state, a, " V1 ").await.expect("join"));
    assert_eq!(tracker_count(&state, " V1 ").await, 1);
    assert_eq!(tracker_count(&state, "V1").await, 1);
    assert_eq!(tracker_count(&state, "   ").await, 0);

    assert!(stop_tracking(&state, a, "V1 ").await.expect("leave"));
    assert_eq!(tracker_count(&state, " V1 ").await, 0);
}

#[tokio::test]
async fn unknown_vehicle_is_trackable_by_default() {
    let (state, _store) = test_helpers::test_app_state();
    let (a, _rx) = test_helpers::register_client(&state).await;

    assert!(track_vehicle(&state, a, "not-in-store").await.expect("join"));
    assert_eq!(tracker_count(&state, "not-in-store").await, 1);
}

#[tokio::test]
async fn unknown_vehicle_is_rejected_when_required() {
    let config = TrackingConfig { require_known_vehicle: true, ..TrackingConfig::default() };
    let (state, store) = test_helpers::test_app_state_with(config);
    store.insert_vehicle(test_helpers::vehicle("V1", None)).await;
    let (a, _rx) = test_helpers::register_client(&state).await;

    let err = track_vehicle(&state, a, "ghost").await.unwrap_err();
    assert_eq!(err.error_code(), "E_VEHICLE_NOT_FOUND");
    assert_eq!(tracker_count(&state, "ghost").await, 0);

    assert!(track_vehicle(&state, a, "V1").await.expect("known vehicle"));
}

#[tokio::test]
async fn blank_vehicle_id_is_rejected() {
    let (state, _store) = test_helpers::test_app_state();
    let (a, _rx) = test_helpers::register_client(&state).await;

    let err = track_vehicle(&state, a, "  ").await.unwrap_err();
    assert!(matches!(err, TrackingError::InvalidVehicleId));
    assert_eq!(stats(&state).await.rooms, 0);
}

#[tokio::test]
async fn unregistered_client_cannot_join() {
    let (state, _store) = test_helpers::test_app_state();
    let err = track_vehicle(&state, uuid::Uuid::new_v4(), "V1").await.unwrap_err();
    assert_eq!(err.error_code(), "E_UNKNOWN_CLIENT");
}

#[tokio::test]
async fn disconnect_drops_count_by_one_per_room() {
    let (state, store) = test_helpers::test_app_state();
    store.insert_vehicle(test_helpers::vehicle("V1", None)).await;
    let (a, mut rx_a) = test_helpers::register_client(&state).await;
    let (b, _rx_b) = test_helpers::register_client(&state).await;
    for vehicle in ["V1", "V2"] {
        track_vehicle(&state, a, vehicle).await.expect("join");
    }
    track_vehicle(&state, b, "V1").await.expect("join");

    assert!(remove_client(&state, a).await);
    assert!(!remove_client(&state, a).await);

    assert_eq!(tracker_count(&state, "V1").await, 1);
    assert_eq!(tracker_count(&state, "V2").await, 0);
    assert_eq!(stats(&state).await, TrackingStats { connections: 1, rooms: 1 });

    let raw = crate::frame::RawLocationUpdate {
        vehicle_id: Some("V1".into()),
        lat: Some(1.0),
        lng: Some(1.0),
        status: Some("online".into()),
        battery_level: None,
    };
    crate::services::location::process_update(&state, b, &raw).await.expect("processed");
    assert_no_event(&mut rx_a).await;
}
