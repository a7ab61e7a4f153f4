// core/src/services/mod.rs

//! Narrow seams to external collaborators (catalog, cart persistence).
//! The fulfillment core only ever touches these through the traits here;
//! in-memory implementations back tests and single-process deployments.

pub mod cart;
pub mod catalog;
pub mod stores;

pub use cart::{CartStore, InMemoryCartStore};
pub use catalog::{Catalog, InMemoryCatalog, VariantInfo};
pub use stores::{InMemoryStoreDirectory, PickupPoint, StoreDirectory};
