use super::*;
use crate::models::VehicleStatus;
use crate::state::test_helpers::{assert_no_event, recv_event};

fn identity(subject: &str) -> Identity {
    Identity { subject: subject.into(), name: None }
}

fn report(vehicle_id: &str) -> LocationReport {
    LocationReport {
        vehicle_id: vehicle_id.into(),
        lat: 12.9716,
        lng: 77.5946,
        status: VehicleStatus::Online,
        battery_level: 90,
        timestamp: 1,
    }
}

#[tokio::test]
async fn fan_out_isolates_rooms() {
    let mut hub = TrackingHub::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, mut rx_b) = mpsc::channel(8);
    let a = hub.admit(identity("a"), tx_a);
    let b = hub.admit(identity("b"), tx_b);
    hub.join(a, "V1").expect("join");
    hub.join(b, "V2").expect("join");

    let stats = hub.fan_out(&report("V1"));
    assert_eq!(stats, DeliveryStats { room_delivered: 1, global_delivered: 2, dropped: 0 });

    assert_eq!(recv_event(&mut rx_a).await.event(), "location-updated");
    assert_eq!(recv_event(&mut rx_a).await.event(), "vehicle-location-updated");
    assert_eq!(recv_event(&mut rx_b).await.event(), "vehicle-location-updated");
    assert_no_event(&mut rx_b).await;
}

#[tokio::test]
async fn removed_client_receives_nothing_further() {
    let mut hub = TrackingHub::new();
    let (tx_a, mut rx_a) = mpsc::channel(8);
    let (tx_b, _rx_b) = mpsc::channel(8);
    let a = hub.admit(identity("a"), tx_a);
    let b = hub.admit(identity("b"), tx_b);
    hub.join(a, "V1").expect("join");
    hub.join(b, "V1").expect("join");
    assert_eq!(hub.count_subscribers("V1"), 2);

    assert!(hub.remove(a).is_some());
    assert_eq!(hub.count_subscribers("V1"), 1);
    assert_eq!(hub.connection_count(), 1);

    hub.fan_out(&report("V1"));
    assert_no_event(&mut rx_a).await;
}

#[test]
fn remove_is_idempotent() {
    let mut hub = TrackingHub::new();
    let (tx, _rx) = mpsc::channel(8);
    let a = hub.admit(identity("a"), tx);
    hub.join(a, "V1").expect("join");

    assert!(hub.remove(a).is_some());
    assert!(hub.remove(a).is_none());
    assert_eq!(hub.count_subscribers("V1"), 0);
    assert_eq!(hub.room_count(), 0);
}

#[test]
fn join_and_leave_require_registration() {
    let mut hub = TrackingHub::new();
    let ghost = uuid::Uuid::new_v4();
    assert!(hub.join(ghost, "V1").is_err());
    assert!(hub.leave(ghost, "V1").is_err());
    assert_eq!(hub.count_subscribers("V1"), 0);
}

#[test]
fn join_leave_symmetry() {
    let mut hub = TrackingHub::new();
    let (tx, _rx) = mpsc::channel(8);
    let a = hub.admit(identity("a"), tx);

    assert_eq!(hub.join(a, "V1").ok(), Some(true));
    assert_eq!(hub.join(a, "V1").ok(), Some(false));
    assert_eq!(hub.tracked_by(a), vec!["V1"]);
    assert_eq!(hub.leave(a, "V1").ok(), Some(true));
    assert_eq!(hub.leave(a, "V1").ok(), Some(false));
    assert_eq!(hub.count_subscribers("V1"), 0);
}

#[tokio::test]
async fn full_queue_drops_newest_without_blocking_others() {
    let mut hub = TrackingHub::new();
    let (tx_slow, mut rx_slow) = mpsc::channel(1);
    let (tx_fast, mut rx_fast) = mpsc::channel(8);
    let slow = hub.admit(identity("slow"), tx_slow);
    let fast = hub.admit(identity("fast"), tx_fast);
    hub.join(slow, "V1").expect("join");
    hub.join(fast, "V1").expect("join");

    let stats = hub.fan_out(&report("V1"));
    // Slow queue takes the room event, then rejects the global one.
    assert_eq!(stats.dropped, 1);

    assert_eq!(recv_event(&mut rx_slow).await.event(), "location-updated");
    assert_no_event(&mut rx_slow).await;

    assert_eq!(recv_event(&mut rx_fast).await.event(), "location-updated");
    assert_eq!(recv_event(&mut rx_fast).await.event(), "vehicle-location-updated");
}

#[test]
fn closed_queue_is_swallowed() {
    let mut hub = TrackingHub::new();
    let (tx, rx) = mpsc::channel(8);
    let a = hub.admit(identity("a"), tx);
    hub.join(a, "V1").expect("join");
    drop(rx);

    let stats = hub.fan_out(&report("V1"));
    assert_eq!(stats.room_delivered + stats.global_delivered, 0);
    assert_eq!(stats.dropped, 2);
}
