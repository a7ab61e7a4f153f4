// core/src/dispatch/mod.rs

//! Zone/geo-based rider matching.
//!
//! Auto-assignment ranks eligible riders by great-circle distance to the
//! pickup point and claims the closest one within the zone's match ceiling.
//! When nothing matches the delivery stays PENDING and remains discoverable
//! through the radius-filtered self-claim feed.

pub mod directory;
pub mod geo;

pub use directory::{RiderDirectory, ZoneDirectory};
pub use geo::haversine_km;

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::delivery::DeliveryService;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::model::delivery::{DeliveryOrder, DeliveryStatus};
use crate::model::rider::Rider;

pub struct DispatchEngine {
  zones: Arc<ZoneDirectory>,
  riders: Arc<RiderDirectory>,
  deliveries: Arc<DeliveryService>,
}

impl DispatchEngine {
  pub fn new(zones: Arc<ZoneDirectory>, riders: Arc<RiderDirectory>, deliveries: Arc<DeliveryService>) -> Self {
    DispatchEngine {
      zones,
      riders,
      deliveries,
    }
  }

  /// Finds the nearest eligible, available rider within the pickup point's
  /// service zone and assigns the delivery to them. Returns `None` when no
  /// rider qualifies; the delivery stays PENDING for manual assignment or
  /// rider self-claim.
  #[instrument(skip(self))]
  pub fn auto_assign(&self, delivery_order_id: Uuid) -> FulfillmentResult<Option<DeliveryOrder>> {
    let delivery = self.deliveries.get(delivery_order_id)?;
    if delivery.status != DeliveryStatus::Pending {
      return Err(FulfillmentError::Conflict(format!(
        "delivery {} is {:?}, auto-assignment applies to pending deliveries only",
        delivery_order_id, delivery.status
      )));
    }

    let Some(zone) = self.zones.resolve(delivery.pickup_location) else {
      info!(delivery_order_id = %delivery_order_id, "no active zone covers the pickup point; left pending");
      return Ok(None);
    };

    let mut candidates: Vec<(f64, Uuid)> = self
      .riders
      .in_zone(zone.id)
      .into_iter()
      .filter(Rider::is_dispatchable)
      .filter_map(|r| {
        let position = r.location?;
        Some((haversine_km(position, delivery.pickup_location), r.id))
      })
      .filter(|(distance_km, _)| *distance_km <= zone.max_match_distance_km)
      .collect();
    // Deterministic ranking: distance first, lowest rider id on ties.
    candidates.sort_by(|(da, ida), (db, idb)| da.total_cmp(db).then_with(|| ida.cmp(idb)));

    for (distance_km, rider_id) in candidates {
      // The snapshot above may be stale; the claim re-checks eligibility
      // atomically. A losing race just moves on to the next candidate.
      if !self.riders.try_claim(rider_id)? {
        continue;
      }
      match self.deliveries.assign(delivery_order_id, rider_id) {
        Ok(updated) => {
          info!(delivery_order_id = %delivery_order_id, %rider_id, distance_km, "rider auto-assigned");
          return Ok(Some(updated));
        }
        Err(e) => {
          self.riders.mark_released(rider_id);
          return Err(e);
        }
      }
    }

    info!(delivery_order_id = %delivery_order_id, zone_id = %zone.id, "no claimable rider within the match ceiling; left pending");
    Ok(None)
  }

  /// Merchant-initiated assignment. Skips distance ranking but still
  /// requires an eligible rider (verified, not off duty); assigning onto a
  /// non-PENDING delivery is rejected by the lifecycle.
  #[instrument(skip(self))]
  pub fn manual_assign(&self, delivery_order_id: Uuid, rider_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    let rider = self.riders.get(rider_id)?;
    if !rider.is_manually_assignable() {
      return Err(FulfillmentError::Validation(format!(
        "rider {} is not eligible for assignment (verified: {}, status: {:?})",
        rider_id, rider.verified, rider.status
      )));
    }
    let updated = self.deliveries.assign(delivery_order_id, rider_id)?;
    self.riders.mark_engaged(rider_id)?;
    Ok(updated)
  }
}
