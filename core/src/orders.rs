// core/src/orders.rs

//! Order persistence and the narrow slice of the order lifecycle this core
//! owns: creation at checkout and the PENDING -> PAID transition driven by
//! payment verification. Every other transition is merchant-initiated and
//! lives outside this crate.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::model::order::{Order, OrderStatus};

/// Atomic per-store sequence for order numbers. Never derived from a row
/// count: counting is a race under concurrent checkouts.
pub struct OrderNumberGenerator {
  prefix: String,
  counters: Mutex<HashMap<Uuid, u64>>,
}

impl OrderNumberGenerator {
  pub fn new(prefix: impl Into<String>) -> Self {
    OrderNumberGenerator {
      prefix: prefix.into(),
      counters: Mutex::new(HashMap::new()),
    }
  }

  pub fn next(&self, store_id: Uuid) -> String {
    let mut guard = self.counters.lock();
    let counter = guard.entry(store_id).or_insert(0);
    *counter += 1;
    format!("{}-{:06}", self.prefix, *counter)
  }
}

pub struct OrderStore {
  orders: RwLock<HashMap<Uuid, Order>>,
}

impl OrderStore {
  pub fn new() -> Self {
    OrderStore {
      orders: RwLock::new(HashMap::new()),
    }
  }

  /// Persists a new order. A duplicate order number within the same store is
  /// a Conflict (the generator makes this unreachable in normal operation,
  /// but external writers share this store).
  pub fn insert(&self, order: Order) -> FulfillmentResult<()> {
    let mut guard = self.orders.write();
    let duplicate = guard
      .values()
      .any(|o| o.store_id == order.store_id && o.order_number == order.order_number);
    if duplicate {
      return Err(FulfillmentError::Conflict(format!(
        "order number {} already exists for store {}",
        order.order_number, order.store_id
      )));
    }
    debug!(order_id = %order.id, order_number = %order.order_number, "order persisted");
    guard.insert(order.id, order);
    Ok(())
  }

  pub fn get(&self, order_id: Uuid) -> FulfillmentResult<Order> {
    self
      .orders
      .read()
      .get(&order_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::not_found("Order", order_id))
  }

  pub fn orders_for_store(&self, store_id: Uuid) -> Vec<Order> {
    self
      .orders
      .read()
      .values()
      .filter(|o| o.store_id == store_id)
      .cloned()
      .collect()
  }

  /// Checkout rollback: removes an order whose stock deduction failed after
  /// the insert. Removing an unknown id is a no-op.
  pub fn remove(&self, order_id: Uuid) {
    self.orders.write().remove(&order_id);
  }

  /// The one lifecycle transition owned by the core. Idempotent against the
  /// webhook/poll race: an already-PAID order is returned unchanged.
  pub fn mark_paid(&self, order_id: Uuid) -> FulfillmentResult<Order> {
    let mut guard = self.orders.write();
    let order = guard
      .get_mut(&order_id)
      .ok_or_else(|| FulfillmentError::not_found("Order", order_id))?;
    match order.status {
      OrderStatus::Paid => {}
      OrderStatus::Pending => {
        order.status = OrderStatus::Paid;
        order.updated_at = Utc::now();
        info!(order_id = %order.id, order_number = %order.order_number, "order marked paid");
      }
      other => {
        return Err(FulfillmentError::Conflict(format!(
          "order {} cannot move to paid from {:?}",
          order_id, other
        )));
      }
    }
    Ok(order.clone())
  }
}

impl Default for OrderStore {
  fn default() -> Self {
    Self::new()
  }
}
