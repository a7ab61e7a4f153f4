// core/src/model/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Pending,
  Paid,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  Refunded,
}

/// A single order line. `unit_price_cents` is a snapshot taken at checkout
/// time and is never recomputed from the catalog afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
  pub id: Uuid,
  pub order_id: Uuid,
  pub variant_id: Uuid,
  pub location_id: Uuid,
  pub title: String,
  pub sku: String,
  pub quantity: u32,
  pub unit_price_cents: i64,
  pub total_price_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
  pub id: Uuid,
  pub store_id: Uuid,
  pub customer_id: Uuid,
  /// Unique per store, assigned by an atomic per-store sequence.
  pub order_number: String,
  pub status: OrderStatus,
  pub currency: String,
  /// Invariant: equals the sum of `items[i].total_price_cents`.
  pub total_amount_cents: i64,
  pub delivery_address: Option<String>,
  pub delivery_location: Option<GeoPoint>,
  pub items: Vec<OrderItem>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_paid_or_later(&self) -> bool {
    !matches!(self.status, OrderStatus::Pending | OrderStatus::Cancelled)
  }
}
