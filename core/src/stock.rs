// core/src/stock.rs

//! Per (variant, location) stock counters with an append-only movement log.
//!
//! The ledger is the primary shared mutable resource of the pipeline:
//! concurrent checkouts touching the same pair serialize through a single
//! conditional decrement performed under one write lock. There is no
//! separate read-then-write path anywhere in this module.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::model::inventory::{InventoryItem, InventoryMovement, MovementType};

/// One requested deduction within a checkout batch.
#[derive(Debug, Clone, Copy)]
pub struct DeductLine {
  pub variant_id: Uuid,
  pub location_id: Uuid,
  pub quantity: u32,
}

struct LedgerInner {
  items: HashMap<(Uuid, Uuid), InventoryItem>,
  movements: Vec<InventoryMovement>,
}

pub struct StockLedger {
  inner: RwLock<LedgerInner>,
}

impl StockLedger {
  pub fn new() -> Self {
    StockLedger {
      inner: RwLock::new(LedgerInner {
        items: HashMap::new(),
        movements: Vec::new(),
      }),
    }
  }

  /// Seeds or replaces the counters for a pair. Intended for wiring and
  /// restock flows, not the checkout hot path.
  pub fn set_stock(&self, variant_id: Uuid, location_id: Uuid, available: i64) -> FulfillmentResult<()> {
    if available < 0 {
      return Err(FulfillmentError::Validation(
        "available quantity cannot be negative".to_string(),
      ));
    }
    let mut guard = self.inner.write();
    let entry = guard
      .items
      .entry((variant_id, location_id))
      .or_insert_with(|| InventoryItem {
        id: Uuid::new_v4(),
        variant_id,
        location_id,
        quantity_available: 0,
        quantity_reserved: 0,
      });
    entry.quantity_available = available;
    Ok(())
  }

  /// Read-only availability. Unknown pairs report zero.
  pub fn available_quantity(&self, variant_id: Uuid, location_id: Uuid) -> i64 {
    self
      .inner
      .read()
      .items
      .get(&(variant_id, location_id))
      .map(|i| i.quantity_available)
      .unwrap_or(0)
  }

  /// Conditional decrement: verifies `available >= qty` and decrements in
  /// the same critical section, appending a Sale movement. Fails with
  /// `InsufficientStock` and no side effects otherwise.
  pub fn deduct(
    &self,
    variant_id: Uuid,
    location_id: Uuid,
    quantity: u32,
    reference_type: &str,
    reference_id: Uuid,
  ) -> FulfillmentResult<()> {
    let line = DeductLine {
      variant_id,
      location_id,
      quantity,
    };
    self.deduct_all(&[line], reference_type, reference_id)
  }

  /// All-or-nothing batch deduction used by checkout. Every line is verified
  /// under the write lock before any line is applied, so a failing line
  /// leaves the whole batch untouched.
  pub fn deduct_all(&self, lines: &[DeductLine], reference_type: &str, reference_id: Uuid) -> FulfillmentResult<()> {
    if lines.iter().any(|l| l.quantity == 0) {
      return Err(FulfillmentError::Validation("deduction quantity must be positive".to_string()));
    }

    let mut guard = self.inner.write();

    // Verify phase. Unknown pairs count as zero stock.
    for line in lines {
      let available = guard
        .items
        .get(&(line.variant_id, line.location_id))
        .map(|i| i.quantity_available)
        .unwrap_or(0);
      if available < line.quantity as i64 {
        warn!(
          variant_id = %line.variant_id,
          location_id = %line.location_id,
          requested = line.quantity,
          available,
          "stock deduction rejected"
        );
        return Err(FulfillmentError::InsufficientStock {
          variant_id: line.variant_id,
          location_id: line.location_id,
          requested: line.quantity,
          available,
        });
      }
    }

    // Apply phase, still under the same write lock.
    for line in lines {
      let item = guard
        .items
        .get_mut(&(line.variant_id, line.location_id))
        .expect("verified above");
      item.quantity_available -= line.quantity as i64;
      let item_id = item.id;
      guard.movements.push(InventoryMovement {
        id: Uuid::new_v4(),
        item_id,
        delta: -(line.quantity as i64),
        movement_type: MovementType::Sale,
        reference_type: reference_type.to_string(),
        reference_id,
        created_at: Utc::now(),
      });
      debug!(variant_id = %line.variant_id, location_id = %line.location_id, qty = line.quantity, "stock deducted");
    }

    Ok(())
  }

  /// Unconditional add/subtract for restocks, returns and corrections.
  /// Outside the checkout hot path, but still refuses to drive a counter
  /// negative.
  pub fn adjust(
    &self,
    variant_id: Uuid,
    location_id: Uuid,
    delta: i64,
    movement_type: MovementType,
    reference_type: &str,
    reference_id: Uuid,
  ) -> FulfillmentResult<()> {
    let mut guard = self.inner.write();
    let entry = guard
      .items
      .entry((variant_id, location_id))
      .or_insert_with(|| InventoryItem {
        id: Uuid::new_v4(),
        variant_id,
        location_id,
        quantity_available: 0,
        quantity_reserved: 0,
      });
    if entry.quantity_available + delta < 0 {
      return Err(FulfillmentError::Validation(format!(
        "adjustment of {} would drive stock below zero (available {})",
        delta, entry.quantity_available
      )));
    }
    entry.quantity_available += delta;
    let item_id = entry.id;
    guard.movements.push(InventoryMovement {
      id: Uuid::new_v4(),
      item_id,
      delta,
      movement_type,
      reference_type: reference_type.to_string(),
      reference_id,
      created_at: Utc::now(),
    });
    Ok(())
  }

  /// Audit read of the append-only movement log for one pair.
  pub fn movements(&self, variant_id: Uuid, location_id: Uuid) -> Vec<InventoryMovement> {
    let guard = self.inner.read();
    let Some(item) = guard.items.get(&(variant_id, location_id)) else {
      return Vec::new();
    };
    let item_id = item.id;
    guard.movements.iter().filter(|m| m.item_id == item_id).cloned().collect()
  }
}

impl Default for StockLedger {
  fn default() -> Self {
    Self::new()
  }
}
