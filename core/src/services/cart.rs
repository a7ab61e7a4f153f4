// core/src/services/cart.rs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::FulfillmentResult;
use crate::model::cart::Cart;

#[async_trait]
pub trait CartStore: Send + Sync {
  async fn get(&self, cart_id: Uuid) -> FulfillmentResult<Option<Cart>>;
  /// Empties the cart's lines. Called by checkout only after every stock
  /// deduction in the batch has succeeded.
  async fn clear(&self, cart_id: Uuid) -> FulfillmentResult<()>;
}

#[derive(Default)]
pub struct InMemoryCartStore {
  carts: RwLock<HashMap<Uuid, Cart>>,
}

impl InMemoryCartStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, cart: Cart) {
    self.carts.write().insert(cart.id, cart);
  }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
  async fn get(&self, cart_id: Uuid) -> FulfillmentResult<Option<Cart>> {
    Ok(self.carts.read().get(&cart_id).cloned())
  }

  async fn clear(&self, cart_id: Uuid) -> FulfillmentResult<()> {
    if let Some(cart) = self.carts.write().get_mut(&cart_id) {
      cart.lines.clear();
    }
    Ok(())
  }
}
