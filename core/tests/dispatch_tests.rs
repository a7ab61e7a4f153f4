// tests/dispatch_tests.rs
mod common;

use cartline::{haversine_km, FulfillmentError, GeoPoint, RiderStatus};
use common::*;
use uuid::Uuid;

#[test]
fn haversine_one_degree_of_longitude_at_equator() {
  let a = GeoPoint::new(0.0, 0.0);
  let b = GeoPoint::new(0.0, 1.0);
  let d = haversine_km(a, b);
  // ~111.2 km, within 1%.
  assert!((d - 111.2).abs() < 1.112, "got {}", d);
}

#[tokio::test]
async fn nearest_eligible_rider_wins() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);

  let near = rider_in_zone(zone, GeoPoint::new(0.0, 0.05)); // ~5.6 km
  let far = rider_in_zone(zone, GeoPoint::new(0.0, 0.1)); // ~11.1 km
  world.hub.riders.upsert(near.clone());
  world.hub.riders.upsert(far.clone());

  let delivery = pending_delivery(&world, pickup).await;
  let assigned = world.hub.dispatch.auto_assign(delivery.id).unwrap().expect("assigned");

  assert_eq!(assigned.rider_id, Some(near.id));
  let claimed = world.hub.riders.get(near.id).unwrap();
  assert_eq!(claimed.status, RiderStatus::Busy);
  assert!(!claimed.available);
  // The loser is untouched.
  assert_eq!(world.hub.riders.get(far.id).unwrap().status, RiderStatus::Available);
}

#[tokio::test]
async fn distance_ties_break_on_lowest_rider_id() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);

  let spot = GeoPoint::new(0.0, 0.05);
  let mut a = rider_in_zone(zone, spot);
  let mut b = rider_in_zone(zone, spot);
  a.id = Uuid::new_v4();
  b.id = Uuid::new_v4();
  let expected = a.id.min(b.id);
  world.hub.riders.upsert(a);
  world.hub.riders.upsert(b);

  let delivery = pending_delivery(&world, pickup).await;
  let assigned = world.hub.dispatch.auto_assign(delivery.id).unwrap().expect("assigned");
  assert_eq!(assigned.rider_id, Some(expected));
}

#[tokio::test]
async fn ineligible_riders_are_never_matched() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);

  let mut unverified = rider_in_zone(zone, GeoPoint::new(0.0, 0.01));
  unverified.verified = false;
  let mut off_duty = rider_in_zone(zone, GeoPoint::new(0.0, 0.02));
  off_duty.status = RiderStatus::OffDuty;
  let mut paused = rider_in_zone(zone, GeoPoint::new(0.0, 0.03));
  paused.available = false;
  let eligible = rider_in_zone(zone, GeoPoint::new(0.0, 0.2)); // farthest, yet the only candidate
  world.hub.riders.upsert(unverified);
  world.hub.riders.upsert(off_duty);
  world.hub.riders.upsert(paused);
  world.hub.riders.upsert(eligible.clone());

  let delivery = pending_delivery(&world, pickup).await;
  let assigned = world.hub.dispatch.auto_assign(delivery.id).unwrap().expect("assigned");
  assert_eq!(assigned.rider_id, Some(eligible.id));
}

#[tokio::test]
async fn rider_beyond_zone_ceiling_leaves_delivery_pending() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 100.0, 30.0);
  world.hub.riders.upsert(rider_in_zone(zone, GeoPoint::new(0.0, 0.5))); // ~55.6 km

  let delivery = pending_delivery(&world, pickup).await;
  let outcome = world.hub.dispatch.auto_assign(delivery.id).unwrap();
  assert!(outcome.is_none());

  // Still discoverable by self-claiming riders near the pickup.
  let feed = world.hub.available_deliveries(GeoPoint::new(0.0, 0.05), 10.0);
  assert_eq!(feed.len(), 1);
  assert_eq!(feed[0].id, delivery.id);
}

#[tokio::test]
async fn no_covering_zone_leaves_delivery_pending() {
  let world = build_world();
  // The only zone is far away from the pickup point.
  seed_zone(&world, GeoPoint::new(40.0, 40.0), 10.0, 5.0);

  let delivery = pending_delivery(&world, GeoPoint::new(0.0, 0.0)).await;
  let outcome = world.hub.dispatch.auto_assign(delivery.id).unwrap();
  assert!(outcome.is_none());
}

#[tokio::test]
async fn manual_assignment_validates_rider_eligibility() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);

  let mut off_duty = rider_in_zone(zone, pickup);
  off_duty.status = RiderStatus::OffDuty;
  world.hub.riders.upsert(off_duty.clone());

  let delivery = pending_delivery(&world, pickup).await;
  let err = world.hub.assign_delivery(delivery.id, off_duty.id).unwrap_err();
  assert!(matches!(err, FulfillmentError::Validation(_)));

  // A busy-but-on-duty rider can still be forced in manually.
  let mut busy = rider_in_zone(zone, pickup);
  busy.status = RiderStatus::Busy;
  busy.available = false;
  world.hub.riders.upsert(busy.clone());
  let assigned = world.hub.assign_delivery(delivery.id, busy.id).unwrap();
  assert_eq!(assigned.rider_id, Some(busy.id));
}

#[tokio::test]
async fn assigning_a_non_pending_delivery_is_rejected() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);
  let first = rider_in_zone(zone, pickup);
  let second = rider_in_zone(zone, pickup);
  world.hub.riders.upsert(first.clone());
  world.hub.riders.upsert(second.clone());

  let delivery = pending_delivery(&world, pickup).await;
  world.hub.assign_delivery(delivery.id, first.id).unwrap();

  let reclaim = world.hub.assign_delivery(delivery.id, second.id).unwrap_err();
  assert!(matches!(reclaim, FulfillmentError::Conflict(_)));

  let auto = world.hub.dispatch.auto_assign(delivery.id).unwrap_err();
  assert!(matches!(auto, FulfillmentError::Conflict(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_auto_assignments_never_double_book_a_rider() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);
  let rider = rider_in_zone(zone, pickup);
  world.hub.riders.upsert(rider.clone());

  let mut deliveries = Vec::new();
  for _ in 0..6 {
    deliveries.push(pending_delivery(&world, pickup).await);
  }

  let mut handles = Vec::new();
  for delivery in &deliveries {
    let hub = world.hub.clone();
    let delivery_id = delivery.id;
    handles.push(tokio::spawn(async move {
      hub.dispatch.auto_assign(delivery_id).unwrap().is_some()
    }));
  }

  let mut wins = 0;
  for handle in handles {
    if handle.await.unwrap() {
      wins += 1;
    }
  }
  assert_eq!(wins, 1);

  let booked: Vec<_> = deliveries
    .iter()
    .filter(|d| world.hub.deliveries.get(d.id).unwrap().rider_id == Some(rider.id))
    .collect();
  assert_eq!(booked.len(), 1);
}

#[tokio::test]
async fn rider_directory_updates_feed_back_into_matching() {
  let world = build_world();
  let pickup = GeoPoint::new(0.0, 0.0);
  let zone = seed_zone(&world, pickup, 50.0, 30.0);
  let rider = rider_in_zone(zone, GeoPoint::new(0.0, 0.4)); // outside the 30 km ceiling
  world.hub.riders.upsert(rider.clone());

  let delivery = pending_delivery(&world, pickup).await;
  assert!(world.hub.dispatch.auto_assign(delivery.id).unwrap().is_none());

  // The rider moves into range but pauses auto-dispatch.
  world.hub.riders.update_location(rider.id, GeoPoint::new(0.0, 0.05)).unwrap();
  world.hub.riders.set_available(rider.id, false).unwrap();
  assert!(world.hub.dispatch.auto_assign(delivery.id).unwrap().is_none());

  world.hub.riders.set_available(rider.id, true).unwrap();
  let assigned = world.hub.dispatch.auto_assign(delivery.id).unwrap().expect("assigned");
  assert_eq!(assigned.rider_id, Some(rider.id));
}

#[tokio::test]
async fn self_claim_feed_filters_by_radius_and_status() {
  let world = build_world();
  let near_pickup = GeoPoint::new(0.0, 0.0);
  let far_pickup = GeoPoint::new(5.0, 5.0);
  let near = pending_delivery(&world, near_pickup).await;
  let _far = pending_delivery(&world, far_pickup).await;

  let feed = world.hub.available_deliveries(GeoPoint::new(0.0, 0.05), 25.0);
  assert_eq!(feed.len(), 1);
  assert_eq!(feed[0].id, near.id);

  // Assigned deliveries drop out of the feed.
  let zone = seed_zone(&world, near_pickup, 50.0, 30.0);
  let rider = rider_in_zone(zone, near_pickup);
  world.hub.riders.upsert(rider.clone());
  world.hub.assign_delivery(near.id, rider.id).unwrap();
  assert!(world.hub.available_deliveries(GeoPoint::new(0.0, 0.05), 25.0).is_empty());
}
