// core/src/model/rider.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiderStatus {
  Available,
  Busy,
  OffDuty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
  pub id: Uuid,
  pub name: String,
  pub status: RiderStatus,
  pub verified: bool,
  pub zone_id: Option<Uuid>,
  pub location: Option<GeoPoint>,
  /// Quick availability toggle, separate from `status` so a rider can flip
  /// it without going off duty.
  pub available: bool,
}

impl Rider {
  /// Eligibility for automatic dispatch.
  pub fn is_dispatchable(&self) -> bool {
    self.verified && self.available && self.status == RiderStatus::Available
  }

  /// Weaker check used by merchant-initiated manual assignment: the rider
  /// must be verified and on duty, but may have paused auto-dispatch.
  pub fn is_manually_assignable(&self) -> bool {
    self.verified && self.status != RiderStatus::OffDuty
  }
}

/// Geographic and pricing boundary riders and deliveries are matched within.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceZone {
  pub id: Uuid,
  pub city: String,
  pub center: GeoPoint,
  pub radius_km: f64,
  pub base_fee_cents: i64,
  pub per_km_fee_cents: i64,
  /// Riders farther than this from the pickup are never auto-assigned.
  pub max_match_distance_km: f64,
  pub active: bool,
}
