// core/src/model/payment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
  Pending,
  Initiated,
  Success,
  Failed,
  Cancelled,
  Refunded,
}

impl PaymentStatus {
  /// Terminal states are never re-processed by `verify`.
  pub fn is_terminal(self) -> bool {
    matches!(
      self,
      PaymentStatus::Success | PaymentStatus::Cancelled | PaymentStatus::Refunded
    )
  }
}

/// One payment attempt against an order. An order may accumulate several
/// transactions across retries; at most one reaches `Success`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentTransaction {
  pub id: Uuid,
  pub store_id: Uuid,
  pub order_id: Option<Uuid>,
  pub amount_cents: i64,
  pub currency: String,
  pub status: PaymentStatus,
  pub gateway: String,
  /// Provider-side reference, set once `initiate` succeeds.
  pub gateway_reference: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
