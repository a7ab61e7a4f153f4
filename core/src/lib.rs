// src/lib.rs

//! Cartline: the fulfillment core of a multi-tenant commerce platform.
//!
//! The crate owns the cart-to-courier pipeline:
//!  - checkout with all-or-nothing stock reservation (`checkout`, `stock`);
//!  - a pluggable payment gateway contract with idempotent confirmation
//!    (`payment`);
//!  - the order PENDING -> PAID transition (`orders`);
//!  - the delivery-order state machine and reschedule rules (`delivery`);
//!  - zone/geo rider matching (`dispatch`);
//!  - best-effort courier push channels (`rider_channel`).
//!
//! Catalog, cart persistence and store lookup are external collaborators
//! reached through the traits in `services`; `hub::FulfillmentHub` wires
//! everything into one injectable object.

pub mod checkout;
pub mod config;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod hub;
pub mod model;
pub mod orders;
pub mod payment;
pub mod rider_channel;
pub mod services;
pub mod stock;

// --- Re-exports for the Public API ---

pub use crate::checkout::{CheckoutOrchestrator, DeliveryDetails};
pub use crate::config::CoreConfig;
pub use crate::delivery::{CreateDelivery, DeliveryService};
pub use crate::dispatch::{haversine_km, DispatchEngine, RiderDirectory, ZoneDirectory};
pub use crate::error::{FulfillmentError, FulfillmentResult};
pub use crate::events::{DomainEvent, EventBus};
pub use crate::hub::FulfillmentHub;
pub use crate::model::{
  Cart, CartLine, DeliveryOrder, DeliveryStatus, DeliveryTrackingEvent, GeoPoint, InventoryItem, InventoryMovement,
  MovementType, Order, OrderItem, OrderStatus, PaymentStatus, PaymentTransaction, Rider, RiderStatus, ServiceZone,
};
pub use crate::orders::{OrderNumberGenerator, OrderStore};
pub use crate::payment::{
  GatewayInitResponse, GatewayRefundResponse, GatewayRegistry, GatewayVerifyResponse, InitiateRequest, MockGateway,
  PaymentGateway, PaymentInit, PaymentService,
};
pub use crate::rider_channel::{spawn_delivery_forwarder, RiderChannel, RiderChannelRegistry};
pub use crate::services::{
  Catalog, CartStore, InMemoryCartStore, InMemoryCatalog, InMemoryStoreDirectory, PickupPoint, StoreDirectory,
  VariantInfo,
};
pub use crate::stock::{DeductLine, StockLedger};
