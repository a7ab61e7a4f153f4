// core/src/checkout.rs

//! Cart -> order conversion: the all-or-nothing front half of the pipeline.
//!
//! Ordering inside `create_order_from_cart` is deliberate: validate first,
//! persist the order, then run the batch stock deduction, and clear the cart
//! last. A deduction failure after the order insert rolls the order back so
//! no partially-applied checkout is ever observable.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::events::{DomainEvent, EventBus};
use crate::model::cart::Cart;
use crate::model::geo::GeoPoint;
use crate::model::order::{Order, OrderItem, OrderStatus};
use crate::orders::{OrderNumberGenerator, OrderStore};
use crate::payment::{PaymentInit, PaymentService};
use crate::services::{Catalog, CartStore};
use crate::stock::{DeductLine, StockLedger};

/// Destination details captured at checkout when the customer wants
/// physical delivery.
#[derive(Debug, Clone)]
pub struct DeliveryDetails {
  pub address: String,
  pub location: GeoPoint,
}

pub struct CheckoutOrchestrator {
  ledger: Arc<StockLedger>,
  catalog: Arc<dyn Catalog>,
  carts: Arc<dyn CartStore>,
  orders: Arc<OrderStore>,
  order_numbers: Arc<OrderNumberGenerator>,
  payments: Arc<PaymentService>,
  bus: Arc<EventBus>,
}

impl CheckoutOrchestrator {
  pub fn new(
    ledger: Arc<StockLedger>,
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartStore>,
    orders: Arc<OrderStore>,
    order_numbers: Arc<OrderNumberGenerator>,
    payments: Arc<PaymentService>,
    bus: Arc<EventBus>,
  ) -> Self {
    CheckoutOrchestrator {
      ledger,
      catalog,
      carts,
      orders,
      order_numbers,
      payments,
      bus,
    }
  }

  #[instrument(skip(self), fields(%store_id, %customer_id, %cart_id))]
  pub async fn create_order_from_cart(
    &self,
    store_id: Uuid,
    customer_id: Uuid,
    cart_id: Uuid,
    delivery: Option<DeliveryDetails>,
  ) -> FulfillmentResult<Order> {
    let cart = self
      .carts
      .get(cart_id)
      .await?
      .ok_or_else(|| FulfillmentError::not_found("Cart", cart_id))?;
    self.validate_cart(&cart, store_id, cart_id)?;

    // Pre-check every line before mutating anything, naming the first
    // offending line. The authoritative check is the conditional batch
    // deduction below; this one exists to fail cheap and early.
    for line in &cart.lines {
      let available = self.ledger.available_quantity(line.variant_id, line.location_id);
      if available < line.quantity as i64 {
        return Err(FulfillmentError::InsufficientStock {
          variant_id: line.variant_id,
          location_id: line.location_id,
          requested: line.quantity,
          available,
        });
      }
    }

    let order_id = Uuid::new_v4();
    let mut items = Vec::with_capacity(cart.lines.len());
    let mut currency: Option<String> = None;
    let mut total_cents: i64 = 0;

    for line in &cart.lines {
      let info = self
        .catalog
        .variant(line.variant_id)
        .await?
        .ok_or_else(|| FulfillmentError::not_found("Variant", line.variant_id))?;
      match &currency {
        None => currency = Some(info.currency.clone()),
        Some(c) if *c != info.currency => {
          return Err(FulfillmentError::Validation(format!(
            "cart mixes currencies ({} and {})",
            c, info.currency
          )));
        }
        Some(_) => {}
      }
      let line_total = info.unit_price_cents * line.quantity as i64;
      total_cents += line_total;
      items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id,
        variant_id: line.variant_id,
        location_id: line.location_id,
        title: info.title,
        sku: info.sku,
        quantity: line.quantity,
        unit_price_cents: info.unit_price_cents,
        total_price_cents: line_total,
      });
    }
    let currency = currency.expect("cart verified non-empty");

    let now = Utc::now();
    let order = Order {
      id: order_id,
      store_id,
      customer_id,
      order_number: self.order_numbers.next(store_id),
      status: OrderStatus::Pending,
      currency,
      total_amount_cents: total_cents,
      delivery_address: delivery.as_ref().map(|d| d.address.clone()),
      delivery_location: delivery.as_ref().map(|d| d.location),
      items,
      created_at: now,
      updated_at: now,
    };
    self.orders.insert(order.clone())?;

    let deduct_lines: Vec<DeductLine> = cart
      .lines
      .iter()
      .map(|l| DeductLine {
        variant_id: l.variant_id,
        location_id: l.location_id,
        quantity: l.quantity,
      })
      .collect();

    if let Err(e) = self.ledger.deduct_all(&deduct_lines, "order", order_id) {
      // All-or-nothing: the batch itself applied no deductions, so only the
      // order insert needs undoing.
      self.orders.remove(order_id);
      return Err(e);
    }

    for line in &deduct_lines {
      if self.ledger.available_quantity(line.variant_id, line.location_id) == 0 {
        self.bus.publish(DomainEvent::StockDepleted {
          variant_id: line.variant_id,
          location_id: line.location_id,
        });
      }
    }

    self.carts.clear(cart_id).await?;
    info!(order_id = %order.id, order_number = %order.order_number, total_cents, "checkout completed");
    Ok(order)
  }

  /// Checkout composed with payment initiation. A gateway failure leaves
  /// the order in place with its transaction pending and retriable; the
  /// error is surfaced to the caller.
  #[allow(clippy::too_many_arguments)]
  #[instrument(skip(self, email, callback_url), fields(%store_id, %cart_id))]
  pub async fn create_order_and_initiate_payment(
    &self,
    store_id: Uuid,
    customer_id: Uuid,
    cart_id: Uuid,
    email: &str,
    callback_url: &str,
    gateway: Option<&str>,
    delivery: Option<DeliveryDetails>,
  ) -> FulfillmentResult<(Order, PaymentInit)> {
    let order = self
      .create_order_from_cart(store_id, customer_id, cart_id, delivery)
      .await?;
    let init = self.payments.initiate(&order, email, callback_url, gateway).await?;
    Ok((order, init))
  }

  fn validate_cart(&self, cart: &Cart, store_id: Uuid, cart_id: Uuid) -> FulfillmentResult<()> {
    if cart.store_id != store_id {
      return Err(FulfillmentError::Validation(format!(
        "cart {} belongs to another store",
        cart_id
      )));
    }
    if cart.is_empty() {
      return Err(FulfillmentError::EmptyCart { cart_id });
    }
    if cart.lines.iter().any(|l| l.quantity == 0) {
      return Err(FulfillmentError::Validation("cart line quantity must be positive".to_string()));
    }
    Ok(())
  }
}
