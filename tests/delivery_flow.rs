//! End-to-end flows across the public API against the in-memory backend

use std::sync::Arc;

use lastmile::route::MoveDirection;
use lastmile::{
    FleetAggregator, InMemoryBackend, RejectionKind, RouteSequencer, ScanClassifier, ScanState,
    Session,
};

async fn depot_day() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.add_driver(1, "Marcus").await;
    backend.add_driver(2, "Salma").await;

    backend.add_parcel(1, 101, "CN101", "Bd Zerktouni", Some((33.589, -7.632))).await;
    backend.add_parcel(1, 102, "CN102", "Rue Allal Ben Abdellah", Some((33.594, -7.617))).await;
    backend.add_parcel(1, 103, "CN103", "Bd d'Anfa", Some((33.591, -7.640))).await;
    backend.add_parcel(2, 201, "CN201", "Ain Sebaa", Some((33.605, -7.531))).await;
    backend.add_parcel(2, 202, "CN202", "Sidi Bernoussi", Some((33.607, -7.498))).await;
    backend
}

#[tokio::test]
async fn test_sort_then_deliver_then_reorder() {
    let backend = depot_day().await;

    // morning: driver loads route so bag positions exist
    let mut driver = RouteSequencer::new(Session::new(1), backend.clone());
    driver.reload().await.unwrap();
    assert_eq!(driver.tracker().total(), 3);

    // sorting station classifies the driver's parcels
    let mut station = ScanClassifier::new(Session::new(50), backend.clone());
    for tracking in ["CN101", "CN102", "CN103"] {
        station.scan(tracking).await;
        assert!(matches!(station.state(), ScanState::Success(_)));
        station.acknowledge();
    }
    assert_eq!(station.today_count(), 3);

    station.scan("CN102").await;
    assert_eq!(station.current_error().map(|e| e.kind), Some(RejectionKind::AlreadySorted));
    station.acknowledge();
    assert_eq!(station.today_count(), 3);

    // before leaving: swap the last two stops
    driver.begin_reorder();
    assert!(driver.move_stop(2, MoveDirection::Up));
    let committed = driver.commit().await.unwrap();

    assert_eq!(committed.parcel_ids(), vec![101, 103, 102]);
    assert_eq!(driver.tracker().cursor(), 0);
    assert_eq!(driver.route(), Some(&committed));

    // on the road: first stop delivered
    driver.advance();
    assert_eq!(driver.tracker().current().unwrap().tracking_no, "CN103");
    assert_eq!(driver.tracker().progress_percent(), 33);

    // dispatcher sees the recomputed distance
    let snapshot = FleetAggregator::new(backend.clone()).aggregate(&[1, 2]).await;
    assert_eq!(snapshot.present_count(), 2);
    assert_eq!(snapshot.route(1), Some(&committed));
}

#[tokio::test]
async fn test_fleet_partial_outage() {
    let backend = depot_day().await;
    backend.fail_route_for(2, "optimizer unavailable").await;

    let aggregator = FleetAggregator::new(backend.clone());
    let snapshot = aggregator.aggregate_active().await.unwrap();

    let only = snapshot.route(1).unwrap().total_distance_km;
    assert_eq!(snapshot.absent_drivers(), vec![2]);
    assert!((snapshot.total_distance_km - only).abs() < 1e-9);
}
