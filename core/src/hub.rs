// core/src/hub.rs

//! Lifecycle-scoped wiring of the whole pipeline into one injectable
//! object. Nothing in the core reaches for ambient global state; embedding
//! applications construct a hub per process (or per test) and share it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::checkout::{CheckoutOrchestrator, DeliveryDetails};
use crate::config::CoreConfig;
use crate::delivery::{CreateDelivery, DeliveryService};
use crate::dispatch::{DispatchEngine, RiderDirectory, ZoneDirectory};
use crate::error::{FulfillmentError, FulfillmentResult};
use crate::events::EventBus;
use crate::model::delivery::DeliveryOrder;
use crate::model::geo::GeoPoint;
use crate::model::order::Order;
use crate::model::payment::PaymentTransaction;
use crate::orders::{OrderNumberGenerator, OrderStore};
use crate::payment::{DeliveryAutoCreate, GatewayRegistry, PaymentInit, PaymentService};
use crate::rider_channel::{spawn_delivery_forwarder, RiderChannel, RiderChannelRegistry};
use crate::services::{CartStore, Catalog, StoreDirectory};
use crate::stock::StockLedger;

/// Glue between payment confirmation and delivery creation: builds the
/// delivery order from the store's pickup point and runs auto-dispatch.
struct AutoDeliveryHook {
  deliveries: Arc<DeliveryService>,
  dispatch: Arc<DispatchEngine>,
  stores: Arc<dyn StoreDirectory>,
}

#[async_trait]
impl DeliveryAutoCreate for AutoDeliveryHook {
  async fn create_for_paid_order(&self, order: &Order) -> FulfillmentResult<DeliveryOrder> {
    let pickup = self
      .stores
      .pickup_point(order.store_id)
      .await?
      .ok_or_else(|| FulfillmentError::not_found("Store pickup point", order.store_id))?;
    let delivery_address = order
      .delivery_address
      .clone()
      .ok_or_else(|| FulfillmentError::Validation("order carries no delivery address".to_string()))?;
    let delivery_location = order
      .delivery_location
      .ok_or_else(|| FulfillmentError::Validation("order carries no delivery coordinates".to_string()))?;

    let delivery = self.deliveries.create(CreateDelivery {
      store_id: order.store_id,
      order_id: order.id,
      pickup_address: pickup.address,
      pickup_location: pickup.location,
      delivery_address,
      delivery_location,
    })?;

    // Assignment is opportunistic; a delivery nobody matches stays PENDING
    // in the self-claim feed.
    match self.dispatch.auto_assign(delivery.id) {
      Ok(Some(assigned)) => Ok(assigned),
      Ok(None) => Ok(delivery),
      Err(e) => {
        warn!(delivery_order_id = %delivery.id, error = %e, "auto-assignment failed after delivery creation");
        Ok(delivery)
      }
    }
  }
}

pub struct FulfillmentHub {
  pub config: CoreConfig,
  pub bus: Arc<EventBus>,
  pub ledger: Arc<StockLedger>,
  pub catalog: Arc<dyn Catalog>,
  pub carts: Arc<dyn CartStore>,
  pub stores: Arc<dyn StoreDirectory>,
  pub orders: Arc<OrderStore>,
  pub order_numbers: Arc<OrderNumberGenerator>,
  pub payments: Arc<PaymentService>,
  pub checkout: Arc<CheckoutOrchestrator>,
  pub zones: Arc<ZoneDirectory>,
  pub riders: Arc<RiderDirectory>,
  pub deliveries: Arc<DeliveryService>,
  pub dispatch: Arc<DispatchEngine>,
  pub rider_channels: Arc<RiderChannelRegistry>,
}

impl FulfillmentHub {
  pub fn new(
    config: CoreConfig,
    catalog: Arc<dyn Catalog>,
    carts: Arc<dyn CartStore>,
    stores: Arc<dyn StoreDirectory>,
    mut gateways: GatewayRegistry,
  ) -> Arc<Self> {
    // The configured default wins over whatever the registry was built with.
    gateways.set_default(config.default_gateway.clone());

    let bus = Arc::new(EventBus::default());
    let ledger = Arc::new(StockLedger::new());
    let orders = Arc::new(OrderStore::new());
    let order_numbers = Arc::new(OrderNumberGenerator::new(config.order_number_prefix.clone()));
    let zones = Arc::new(ZoneDirectory::new());
    let riders = Arc::new(RiderDirectory::new());
    let deliveries = Arc::new(DeliveryService::new(
      orders.clone(),
      zones.clone(),
      riders.clone(),
      bus.clone(),
    ));
    let dispatch = Arc::new(DispatchEngine::new(zones.clone(), riders.clone(), deliveries.clone()));

    let hook: Arc<dyn DeliveryAutoCreate> = Arc::new(AutoDeliveryHook {
      deliveries: deliveries.clone(),
      dispatch: dispatch.clone(),
      stores: stores.clone(),
    });
    let payments = Arc::new(PaymentService::new(gateways, orders.clone(), bus.clone(), Some(hook)));

    let checkout = Arc::new(CheckoutOrchestrator::new(
      ledger.clone(),
      catalog.clone(),
      carts.clone(),
      orders.clone(),
      order_numbers.clone(),
      payments.clone(),
      bus.clone(),
    ));

    let rider_channels = Arc::new(RiderChannelRegistry::new(
      config.rider_channel_idle_timeout,
      config.rider_channel_buffer,
    ));

    info!("fulfillment hub wired");
    Arc::new(FulfillmentHub {
      config,
      bus,
      ledger,
      catalog,
      carts,
      stores,
      orders,
      order_numbers,
      payments,
      checkout,
      zones,
      riders,
      deliveries,
      dispatch,
      rider_channels,
    })
  }

  // --- exposed operations -------------------------------------------------

  pub async fn create_order(
    &self,
    store_id: Uuid,
    customer_id: Uuid,
    cart_id: Uuid,
    delivery: Option<DeliveryDetails>,
  ) -> FulfillmentResult<Order> {
    self
      .checkout
      .create_order_from_cart(store_id, customer_id, cart_id, delivery)
      .await
  }

  #[allow(clippy::too_many_arguments)]
  pub async fn create_order_and_pay(
    &self,
    store_id: Uuid,
    customer_id: Uuid,
    cart_id: Uuid,
    email: &str,
    callback_url: &str,
    gateway: Option<&str>,
    delivery: Option<DeliveryDetails>,
  ) -> FulfillmentResult<(Order, PaymentInit)> {
    self
      .checkout
      .create_order_and_initiate_payment(store_id, customer_id, cart_id, email, callback_url, gateway, delivery)
      .await
  }

  /// Idempotent: safe for client polls and webhooks alike.
  pub async fn verify_payment(&self, transaction_id: Uuid) -> FulfillmentResult<PaymentTransaction> {
    self.payments.verify(transaction_id).await
  }

  /// Creates a delivery order for a paid order; optionally dispatches it
  /// immediately.
  pub fn create_delivery(&self, request: CreateDelivery, auto_assign: bool) -> FulfillmentResult<DeliveryOrder> {
    let delivery = self.deliveries.create(request)?;
    if auto_assign {
      if let Some(assigned) = self.dispatch.auto_assign(delivery.id)? {
        return Ok(assigned);
      }
    }
    Ok(delivery)
  }

  pub fn assign_delivery(&self, delivery_order_id: Uuid, rider_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    self.dispatch.manual_assign(delivery_order_id, rider_id)
  }

  pub fn reschedule_delivery(&self, delivery_order_id: Uuid) -> FulfillmentResult<DeliveryOrder> {
    self.deliveries.reschedule(delivery_order_id)
  }

  pub fn available_deliveries(&self, point: GeoPoint, radius_km: f64) -> Vec<DeliveryOrder> {
    self.deliveries.available_deliveries(point, radius_km)
  }

  /// Opens a courier push subscription. Pair with
  /// [`start_rider_forwarder`](Self::start_rider_forwarder) to feed it from
  /// the bus.
  pub fn subscribe_rider(&self, rider_id: Uuid) -> RiderChannel {
    self.rider_channels.register(rider_id)
  }

  /// Bridges delivery status events onto rider push channels. Call once per
  /// process after constructing the hub.
  pub fn start_rider_forwarder(&self) -> tokio::task::JoinHandle<()> {
    spawn_delivery_forwarder(self.rider_channels.clone(), &self.bus)
  }
}
