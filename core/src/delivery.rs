// core/src/delivery.rs

//! Delivery-order entity, its status state machine, and reschedule rules.
//!
//! ```text
//! PENDING --assign(rider)--> ASSIGNED
//! ASSIGNED --pickup--> PICKED_UP --depart--> IN_TRANSIT --deliver--> DELIVERED
//! PICKED_UP/IN_TRANSIT --fail--> FAILED
//! IN_TRANSIT --return--> RETURNED
//! FAILED|RETURNED --reschedule--> PENDING   (rider cleared, version bumped)
//! ```
//!
//! Every transition appends a tracking event and publishes
//! `DeliveryStatusChanged` on the bus; delivery orders are never destroyed,
//! only transitioned.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::dispatch::directory::{RiderDirectory, ZoneDirectory};
use crate::dispatch::geo::haversine_km;
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::events::{DomainEvent, EventBus};
use crate::model::delivery::{DeliveryOrder, DeliveryStatus, DeliveryTrackingEvent};
use crate::model::geo::GeoPoint;
use crate::orders::OrderStore;

#[derive(Debug, Clone)]
pub struct CreateDelivery {
  pub store_id: Uuid,
  pub order_id: Uuid,
  pub pickup_address: String,
  pub pickup_location: GeoPoint,
  pub delivery_address: String,
  pub delivery_location: GeoPoint,
}

struct DeliveryInner {
  deliveries: HashMap<Uuid, DeliveryOrder>,
  tracking: Vec<DeliveryTrackingEvent>,
}

pub struct DeliveryService {
  inner: RwLock<DeliveryInner>,
  orders: Arc<OrderStore>,
  zones: Arc<ZoneDirectory>,
  riders: Arc<RiderDirectory>,
  bus: Arc<EventBus>,
}

impl DeliveryService {
  pub fn new(orders: Arc<OrderStore>, zones: Arc<ZoneDirectory>, riders: Arc<RiderDirectory>, bus: Arc<EventBus>) -> Self {
    DeliveryService {
      inner: RwLock::new(DeliveryInner {
        deliveries: HashMap::new(),
        tracking: Vec::new(),
      }),
      orders,
      zones,
      riders,
      bus,
    }
  }

  /// Creates the delivery order for a paid order. At most one non-terminal
  /// delivery may exist per order; a prior terminal one does not block a new
  /// request (reschedule is the preferred path for FAILED/RETURNED).
  #[instrument(skip(self, request), fields(order_id = %request.order_id))]
  pub fn create(&self, request: CreateDelivery) -> FulfillmentResult<DeliveryOrder> {
    let order = self.orders.get(request.order_id)?;
    if !order.is_paid_or_later() {
      return Err(FulfillmentError::Conflict(format!(
        "order {} is {:?}; deliveries require a paid order",
        order.id, order.status
      )));
    }

    let fee_cents = match self.zones.resolve(request.pickup_location) {
      Some(zone) => {
        let km = haversine_km(request.pickup_location, request.delivery_location);
        zone.base_fee_cents + (zone.per_km_fee_cents as f64 * km).round() as i64
      }
      None => {
        warn!(order_id = %order.id, "pickup point outside every active zone; fee defaults to zero");
        0
      }
    };

    let now = Utc::now();
    let delivery = DeliveryOrder {
      id: Uuid::new_v4(),
      store_id: request.store_id,
      order_id: request.order_id,
      rider_id: None,
      pickup_address: request.pickup_address,
      pickup_location: request.pickup_location,
      delivery_address: request.delivery_address,
      delivery_location: request.delivery_location,
      status: DeliveryStatus::Pending,
      fee_cents,
      currency: order.currency.clone(),
      version: 1,
      created_at: now,
      updated_at: now,
    };

    {
      let mut guard = self.inner.write();
      let active_exists = guard
        .deliveries
        .values()
        .any(|d| d.order_id == request.order_id && !d.status.is_terminal());
      if active_exists {
        return Err(FulfillmentError::Conflict(format!(
          "order {} already has an active delivery order",
          request.order_id
        )));
      }
      guard.deliveries.insert(delivery.id, delivery.clone());
      guard.tracking.push(tracking_event(&delivery, None, Some("created".to_string())));
    }

    self.publish_status(&delivery);
    info!(delivery_order_id = %delivery.id, fee_cents, "delivery order created");
    Ok(delivery)
  }

  pub fn get(&self, delivery_order_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    self
      .inner
      .read()
      .deliveries
      .get(&delivery_order_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::not_found("DeliveryOrder", delivery_order_id))
  }

  pub fn tracking_events(&self, delivery_order_id: Uuid) -> Vec<DeliveryTrackingEvent> {
    self
      .inner
      .read()
      .tracking
      .iter()
      .filter(|e| e.delivery_order_id == delivery_order_id)
      .cloned()
      .collect()
  }

  /// PENDING -> ASSIGNED. Assigning onto any other status is rejected; an
  /// already-assigned delivery reports Conflict so a racing claim reads as
  /// "someone got there first" rather than a bad request. Engaging the
  /// rider is the caller's job (the dispatcher claims before calling in).
  #[instrument(skip(self))]
  pub fn assign(&self, delivery_order_id: Uuid, rider_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    // Resolve the rider up front so an unknown id cannot leave the delivery
    // half-assigned.
    self.riders.get(rider_id)?;
    let updated = {
      let mut guard = self.inner.write();
      let delivery = guard
        .deliveries
        .get_mut(&delivery_order_id)
        .ok_or_else(|| FulfillmentError::not_found("DeliveryOrder", delivery_order_id))?;
      if delivery.status != DeliveryStatus::Pending {
        return Err(FulfillmentError::Conflict(format!(
          "delivery {} is {:?}, only pending deliveries can be assigned",
          delivery_order_id, delivery.status
        )));
      }
      delivery.rider_id = Some(rider_id);
      delivery.status = DeliveryStatus::Assigned;
      delivery.updated_at = Utc::now();
      let snapshot = delivery.clone();
      guard
        .tracking
        .push(tracking_event(&snapshot, None, Some(format!("assigned to rider {}", rider_id))));
      snapshot
    };

    self.publish_status(&updated);
    info!(delivery_order_id = %delivery_order_id, %rider_id, "delivery assigned");
    Ok(updated)
  }

  pub fn mark_picked_up(&self, id: Uuid, location: Option<GeoPoint>) -> FulfillmentResult<DeliveryOrder> {
    self.transition(id, "pickup", DeliveryStatus::PickedUp, &[DeliveryStatus::Assigned], location, None)
  }

  pub fn mark_in_transit(&self, id: Uuid, location: Option<GeoPoint>) -> FulfillmentResult<DeliveryOrder> {
    self.transition(id, "depart", DeliveryStatus::InTransit, &[DeliveryStatus::PickedUp], location, None)
  }

  pub fn mark_delivered(&self, id: Uuid, location: Option<GeoPoint>) -> FulfillmentResult<DeliveryOrder> {
    self.transition(id, "deliver", DeliveryStatus::Delivered, &[DeliveryStatus::InTransit], location, None)
  }

  pub fn mark_failed(&self, id: Uuid, note: Option<String>) -> FulfillmentResult<DeliveryOrder> {
    self.transition(
      id,
      "fail",
      DeliveryStatus::Failed,
      &[DeliveryStatus::PickedUp, DeliveryStatus::InTransit],
      None,
      note,
    )
  }

  pub fn mark_returned(&self, id: Uuid, note: Option<String>) -> FulfillmentResult<DeliveryOrder> {
    self.transition(id, "return", DeliveryStatus::Returned, &[DeliveryStatus::InTransit], None, note)
  }

  /// FAILED|RETURNED -> PENDING: same delivery order id, rider cleared,
  /// version incremented. Rejected from every other status.
  #[instrument(skip(self))]
  pub fn reschedule(&self, delivery_order_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    let (updated, released_rider) = {
      let mut guard = self.inner.write();
      let delivery = guard
        .deliveries
        .get_mut(&delivery_order_id)
        .ok_or_else(|| FulfillmentError::not_found("DeliveryOrder", delivery_order_id))?;
      if !delivery.status.is_reschedulable() {
        return Err(FulfillmentError::InvalidTransition {
          from: delivery.status,
          action: "reschedule",
        });
      }
      let released_rider = delivery.rider_id.take();
      delivery.status = DeliveryStatus::Pending;
      delivery.version += 1;
      delivery.updated_at = Utc::now();
      let snapshot = delivery.clone();
      guard
        .tracking
        .push(tracking_event(&snapshot, None, Some("rescheduled".to_string())));
      (snapshot, released_rider)
    };

    if let Some(rider_id) = released_rider {
      self.riders.mark_released(rider_id);
    }
    self.publish_status(&updated);
    info!(delivery_order_id = %delivery_order_id, version = updated.version, "delivery rescheduled");
    Ok(updated)
  }

  /// PENDING, unassigned deliveries whose pickup lies within `radius_km` of
  /// `point` — the self-claim discovery feed for riders.
  pub fn available_deliveries(&self, point: GeoPoint, radius_km: f64) -> Vec<DeliveryOrder> {
    self
      .inner
      .read()
      .deliveries
      .values()
      .filter(|d| d.status == DeliveryStatus::Pending && d.rider_id.is_none())
      .filter(|d| haversine_km(d.pickup_location, point) <= radius_km)
      .cloned()
      .collect()
  }

  fn transition(
    &self,
    delivery_order_id: Uuid,
    action: &'static str,
    to: DeliveryStatus,
    allowed_from: &[DeliveryStatus],
    location: Option<GeoPoint>,
    note: Option<String>,
  ) -> FulfillmentResult<DeliveryOrder> {
    let updated = {
      let mut guard = self.inner.write();
      let delivery = guard
        .deliveries
        .get_mut(&delivery_order_id)
        .ok_or_else(|| FulfillmentError::not_found("DeliveryOrder", delivery_order_id))?;
      if !allowed_from.contains(&delivery.status) {
        return Err(FulfillmentError::InvalidTransition {
          from: delivery.status,
          action,
        });
      }
      delivery.status = to;
      delivery.updated_at = Utc::now();
      let snapshot = delivery.clone();
      guard.tracking.push(tracking_event(&snapshot, location, note));
      snapshot
    };

    if to.is_terminal() {
      if let Some(rider_id) = updated.rider_id {
        self.riders.mark_released(rider_id);
      }
    }
    self.publish_status(&updated);
    info!(delivery_order_id = %delivery_order_id, status = ?to, "delivery transitioned");
    Ok(updated)
  }

  fn publish_status(&self, delivery: &DeliveryOrder) {
    self.bus.publish(DomainEvent::DeliveryStatusChanged {
      delivery_order_id: delivery.id,
      order_id: delivery.order_id,
      rider_id: delivery.rider_id,
      status: delivery.status,
    });
  }
}

fn tracking_event(delivery: &DeliveryOrder, location: Option<GeoPoint>, note: Option<String>) -> DeliveryTrackingEvent {
  DeliveryTrackingEvent {
    id: Uuid::new_v4(),
    delivery_order_id: delivery.id,
    status: delivery.status,
    location,
    note,
    created_at: Utc::now(),
  }
}
