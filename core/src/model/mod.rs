// core/src/model/mod.rs

//! Wire-visible domain entities shared across the fulfillment pipeline.

pub mod cart;
pub mod delivery;
pub mod geo;
pub mod inventory;
pub mod order;
pub mod payment;
pub mod rider;

pub use cart::{Cart, CartLine};
pub use delivery::{DeliveryOrder, DeliveryStatus, DeliveryTrackingEvent};
pub use geo::GeoPoint;
pub use inventory::{InventoryItem, InventoryMovement, MovementType};
pub use order::{Order, OrderItem, OrderStatus};
pub use payment::{PaymentStatus, PaymentTransaction};
pub use rider::{Rider, RiderStatus, ServiceZone};
