// core/src/services/catalog.rs

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::FulfillmentResult;

/// Price/title/SKU snapshot source for a purchasable variant. Checkout
/// copies these values into order items; later catalog changes never touch
/// an existing order.
#[derive(Debug, Clone)]
pub struct VariantInfo {
  pub variant_id: Uuid,
  pub title: String,
  pub sku: String,
  pub unit_price_cents: i64,
  pub currency: String,
}

#[async_trait]
pub trait Catalog: Send + Sync {
  async fn variant(&self, variant_id: Uuid) -> FulfillmentResult<Option<VariantInfo>>;
}

#[derive(Default)]
pub struct InMemoryCatalog {
  variants: RwLock<HashMap<Uuid, VariantInfo>>,
}

impl InMemoryCatalog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn upsert(&self, info: VariantInfo) {
    self.variants.write().insert(info.variant_id, info);
  }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
  async fn variant(&self, variant_id: Uuid) -> FulfillmentResult<Option<VariantInfo>> {
    Ok(self.variants.read().get(&variant_id).cloned())
  }
}
