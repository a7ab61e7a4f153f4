// tests/common/mod.rs
#![allow(dead_code)] // Allow unused helpers in this shared fixture module

use std::sync::Arc;

use cartline::{
  Cart, CartLine, CoreConfig, DeliveryOrder, FulfillmentHub, GatewayRegistry, GeoPoint, InMemoryCartStore,
  InMemoryCatalog, InMemoryStoreDirectory, MockGateway, Order, PickupPoint, Rider, RiderStatus, ServiceZone,
  VariantInfo,
};
use tracing::Level;
use uuid::Uuid;

/// Fully wired hub plus handles onto the in-memory collaborators so tests
/// can seed catalog entries, carts and pickup points directly.
pub struct TestWorld {
  pub hub: Arc<FulfillmentHub>,
  pub catalog: Arc<InMemoryCatalog>,
  pub carts: Arc<InMemoryCartStore>,
  pub stores: Arc<InMemoryStoreDirectory>,
  pub gateway: Arc<MockGateway>,
  pub store_id: Uuid,
  pub customer_id: Uuid,
}

pub fn build_world() -> TestWorld {
  setup_tracing();

  let catalog = Arc::new(InMemoryCatalog::new());
  let carts = Arc::new(InMemoryCartStore::new());
  let stores = Arc::new(InMemoryStoreDirectory::new());
  let gateway = Arc::new(MockGateway::new("mock"));

  let mut gateways = GatewayRegistry::new("mock");
  gateways.register(gateway.clone());

  let hub = FulfillmentHub::new(
    CoreConfig::default(),
    catalog.clone(),
    carts.clone(),
    stores.clone(),
    gateways,
  );

  TestWorld {
    hub,
    catalog,
    carts,
    stores,
    gateway,
    store_id: Uuid::new_v4(),
    customer_id: Uuid::new_v4(),
  }
}

pub fn seed_variant(world: &TestWorld, unit_price_cents: i64, currency: &str) -> Uuid {
  let variant_id = Uuid::new_v4();
  world.catalog.upsert(VariantInfo {
    variant_id,
    title: format!("Variant {}", variant_id.simple()),
    sku: format!("SKU-{}", variant_id.simple()),
    unit_price_cents,
    currency: currency.to_string(),
  });
  variant_id
}

pub fn seed_stock(world: &TestWorld, variant_id: Uuid, location_id: Uuid, quantity: i64) {
  world
    .hub
    .ledger
    .set_stock(variant_id, location_id, quantity)
    .expect("seeding stock");
}

pub fn seed_cart(world: &TestWorld, lines: &[(Uuid, Uuid, u32)]) -> Uuid {
  let cart_id = Uuid::new_v4();
  world.carts.put(Cart {
    id: cart_id,
    store_id: world.store_id,
    customer_id: world.customer_id,
    lines: lines
      .iter()
      .map(|&(variant_id, location_id, quantity)| CartLine {
        variant_id,
        location_id,
        quantity,
      })
      .collect(),
  });
  cart_id
}

pub fn seed_zone(world: &TestWorld, center: GeoPoint, radius_km: f64, max_match_distance_km: f64) -> Uuid {
  let zone_id = Uuid::new_v4();
  world.hub.zones.upsert(ServiceZone {
    id: zone_id,
    city: "Testville".to_string(),
    center,
    radius_km,
    base_fee_cents: 500,
    per_km_fee_cents: 100,
    max_match_distance_km,
    active: true,
  });
  zone_id
}

pub fn rider_in_zone(zone_id: Uuid, location: GeoPoint) -> Rider {
  Rider {
    id: Uuid::new_v4(),
    name: "Test Rider".to_string(),
    status: RiderStatus::Available,
    verified: true,
    zone_id: Some(zone_id),
    location: Some(location),
    available: true,
  }
}

pub fn set_pickup_point(world: &TestWorld, location: GeoPoint) {
  world.stores.set_pickup_point(
    world.store_id,
    PickupPoint {
      address: "1 Warehouse Way".to_string(),
      location,
    },
  );
}

/// Checkout a one-line cart and mark the order paid, ready for delivery
/// creation.
pub async fn paid_order(world: &TestWorld) -> Order {
  let variant = seed_variant(world, 1000, "USD");
  let location = Uuid::new_v4();
  seed_stock(world, variant, location, 10);
  let cart_id = seed_cart(world, &[(variant, location, 1)]);
  let order = world
    .hub
    .create_order(world.store_id, world.customer_id, cart_id, None)
    .await
    .expect("checkout");
  world.hub.orders.mark_paid(order.id).expect("mark paid")
}

/// A PENDING delivery order at the given pickup point, dropoff 0.1 degrees
/// east.
pub async fn pending_delivery(world: &TestWorld, pickup: GeoPoint) -> DeliveryOrder {
  let order = paid_order(world).await;
  world
    .hub
    .deliveries
    .create(cartline::CreateDelivery {
      store_id: world.store_id,
      order_id: order.id,
      pickup_address: "1 Warehouse Way".to_string(),
      pickup_location: pickup,
      delivery_address: "2 Customer Close".to_string(),
      delivery_location: GeoPoint::new(pickup.lat, pickup.lng + 0.1),
    })
    .expect("delivery created")
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer() // Important for tests to capture output
    .try_init()
    .ok(); // Allow multiple initializations in tests (ok if fails)
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}
