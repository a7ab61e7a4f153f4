// core/src/events.rs

//! In-process domain event bus.
//!
//! Side effects hanging off a transition (rider notification, analytics)
//! consume these events instead of running inside the triggering call.
//! Publishing is fire-and-forget: a bus with no subscribers is not an
//! error and never unwinds the publisher.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

use crate::model::delivery::DeliveryStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
  OrderPaid {
    order_id: Uuid,
    store_id: Uuid,
  },
  DeliveryStatusChanged {
    delivery_order_id: Uuid,
    order_id: Uuid,
    rider_id: Option<Uuid>,
    status: DeliveryStatus,
  },
  /// Emitted when a deduction leaves a (variant, location) pair at zero.
  StockDepleted {
    variant_id: Uuid,
    location_id: Uuid,
  },
}

pub struct EventBus {
  sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity);
    EventBus { sender }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
    self.sender.subscribe()
  }

  pub fn publish(&self, event: DomainEvent) {
    trace!(?event, "publishing domain event");
    // Err means no live subscribers; the publisher does not care.
    let _ = self.sender.send(event);
  }
}

impl Default for EventBus {
  fn default() -> Self {
    EventBus::new(256)
  }
}
