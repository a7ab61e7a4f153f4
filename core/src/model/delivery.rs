// core/src/model/delivery.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
  Pending,
  Assigned,
  PickedUp,
  InTransit,
  Delivered,
  Failed,
  Returned,
}

impl DeliveryStatus {
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Returned
    )
  }

  /// FAILED and RETURNED may be rescheduled back to PENDING; DELIVERED may not.
  pub fn is_reschedulable(self) -> bool {
    matches!(self, DeliveryStatus::Failed | DeliveryStatus::Returned)
  }
}

/// The physical-delivery side of an order. One-to-one with its order: a
/// prior delivery order must be terminal before a new one exists, except via
/// reschedule, which reuses the same id and bumps `version`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOrder {
  pub id: Uuid,
  pub store_id: Uuid,
  pub order_id: Uuid,
  pub rider_id: Option<Uuid>,
  pub pickup_address: String,
  pub pickup_location: GeoPoint,
  pub delivery_address: String,
  pub delivery_location: GeoPoint,
  pub status: DeliveryStatus,
  pub fee_cents: i64,
  pub currency: String,
  pub version: u32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Append-only event history of a delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTrackingEvent {
  pub id: Uuid,
  pub delivery_order_id: Uuid,
  pub status: DeliveryStatus,
  pub location: Option<GeoPoint>,
  pub note: Option<String>,
  pub created_at: DateTime<Utc>,
}
