// core/src/model/cart.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
  pub variant_id: Uuid,
  pub location_id: Uuid,
  pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
  pub id: Uuid,
  pub store_id: Uuid,
  pub customer_id: Uuid,
  pub lines: Vec<CartLine>,
}

impl Cart {
  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }
}
