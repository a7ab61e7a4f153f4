// core/src/services/stores.rs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::FulfillmentResult;
use crate::model::geo::GeoPoint;

/// Where a store hands parcels to couriers. Auto-created deliveries use
/// this as their pickup side.
#[derive(Debug, Clone)]
pub struct PickupPoint {
  pub address: String,
  pub location: GeoPoint,
}

#[async_trait]
pub trait StoreDirectory: Send + Sync {
  async fn pickup_point(&self, store_id: Uuid) -> FulfillmentResult<Option<PickupPoint>>;
}

#[derive(Default)]
pub struct InMemoryStoreDirectory {
  pickup_points: RwLock<HashMap<Uuid, PickupPoint>>,
}

impl InMemoryStoreDirectory {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn set_pickup_point(&self, store_id: Uuid, point: PickupPoint) {
    self.pickup_points.write().insert(store_id, point);
  }
}

#[async_trait]
impl StoreDirectory for InMemoryStoreDirectory {
  async fn pickup_point(&self, store_id: Uuid) -> FulfillmentResult<Option<PickupPoint>> {
    Ok(self.pickup_points.read().get(&store_id).cloned())
  }
}
