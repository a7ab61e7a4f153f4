// core/src/model/inventory.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock counters for one (variant, location) pair.
/// Invariant: `quantity_available` never goes negative; a deduction that
/// would violate this fails atomically without side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
  pub id: Uuid,
  pub variant_id: Uuid,
  pub location_id: Uuid,
  pub quantity_available: i64,
  pub quantity_reserved: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
  Sale,
  Restock,
  Return,
  Adjustment,
}

/// Append-only audit row for every stock change. Never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryMovement {
  pub id: Uuid,
  pub item_id: Uuid,
  pub delta: i64,
  pub movement_type: MovementType,
  pub reference_type: String,
  pub reference_id: Uuid,
  pub created_at: DateTime<Utc>,
}
