// core/src/dispatch/directory.rs

//! Injected registries for riders and service zones. These stand in for the
//! identity and geo subsystems the dispatcher matches against.

use std::collections::HashMap;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::dispatch::geo::haversine_km;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::model::geo::GeoPoint;
use crate::model::rider::{Rider, RiderStatus, ServiceZone};

#[derive(Default)]
pub struct RiderDirectory {
  riders: RwLock<HashMap<Uuid, Rider>>,
}

impl RiderDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn upsert(&self, rider: Rider) {
    self.riders.write().insert(rider.id, rider);
  }

  pub fn get(&self, rider_id: Uuid) -> FulfillmentResult<Rider> {
    self
      .riders
      .read()
      .get(&rider_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))
  }

  pub fn update_location(&self, rider_id: Uuid, location: GeoPoint) -> FulfillmentResult<()> {
    let mut guard = self.riders.write();
    let rider = guard
      .get_mut(&rider_id)
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))?;
    rider.location = Some(location);
    Ok(())
  }

  pub fn set_status(&self, rider_id: Uuid, status: RiderStatus) -> FulfillmentResult<()> {
    let mut guard = self.riders.write();
    let rider = guard
      .get_mut(&rider_id)
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))?;
    rider.status = status;
    Ok(())
  }

  pub fn set_available(&self, rider_id: Uuid, available: bool) -> FulfillmentResult<()> {
    let mut guard = self.riders.write();
    let rider = guard
      .get_mut(&rider_id)
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))?;
    rider.available = available;
    Ok(())
  }

  pub fn in_zone(&self, zone_id: Uuid) -> Vec<Rider> {
    self
      .riders
      .read()
      .values()
      .filter(|r| r.zone_id == Some(zone_id))
      .cloned()
      .collect()
  }

  /// Atomic claim used by auto-dispatch: re-checks eligibility and engages
  /// the rider in one critical section, so two racing dispatches can never
  /// book the same rider. Returns false when someone else got there first.
  pub(crate) fn try_claim(&self, rider_id: Uuid) -> FulfillmentResult<bool> {
    let mut guard = self.riders.write();
    let rider = guard
      .get_mut(&rider_id)
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))?;
    if !rider.is_dispatchable() {
      return Ok(false);
    }
    rider.status = RiderStatus::Busy;
    rider.available = false;
    Ok(true)
  }

  /// Unconditional engagement for merchant-initiated assignment: busy and
  /// withdrawn from auto-dispatch.
  pub(crate) fn mark_engaged(&self, rider_id: Uuid) -> FulfillmentResult<()> {
    let mut guard = self.riders.write();
    let rider = guard
      .get_mut(&rider_id)
      .ok_or_else(|| FulfillmentError::not_found("Rider", rider_id))?;
    rider.status = RiderStatus::Busy;
    rider.available = false;
    Ok(())
  }

  /// Restores availability once the rider's delivery reaches a terminal
  /// state. An off-duty rider stays off duty.
  pub(crate) fn mark_released(&self, rider_id: Uuid) {
    let mut guard = self.riders.write();
    if let Some(rider) = guard.get_mut(&rider_id) {
      if rider.status == RiderStatus::Busy {
        rider.status = RiderStatus::Available;
      }
      rider.available = rider.status == RiderStatus::Available;
    }
  }
}

#[derive(Default)]
pub struct ZoneDirectory {
  zones: RwLock<HashMap<Uuid, ServiceZone>>,
}

impl ZoneDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn upsert(&self, zone: ServiceZone) {
    self.zones.write().insert(zone.id, zone);
  }

  pub fn get(&self, zone_id: Uuid) -> FulfillmentResult<ServiceZone> {
    self
      .zones
      .read()
      .get(&zone_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::not_found("ServiceZone", zone_id))
  }

  /// The applicable zone for a point: the nearest active zone whose radius
  /// covers it.
  pub fn resolve(&self, point: GeoPoint) -> Option<ServiceZone> {
    let guard = self.zones.read();
    guard
      .values()
      .filter(|z| z.active)
      .filter_map(|z| {
        let d = haversine_km(z.center, point);
        (d <= z.radius_km).then_some((d, z))
      })
      .min_by(|(da, _), (db, _)| da.total_cmp(db))
      .map(|(_, z)| z.clone())
  }
}
