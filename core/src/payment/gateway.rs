// core/src/payment/gateway.rs

//! Uniform contract over interchangeable external payment providers.
//! Providers are selected by name at call time; an omitted or unrecognized
//! name falls back to the configured default.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::error::FulfillmentResult;

#[derive(Debug, Clone)]
pub struct InitiateRequest {
  pub email: String,
  pub amount_cents: i64,
  pub currency: String,
  /// Our side's reference (the transaction id); providers echo it back.
  pub reference: String,
  pub callback_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayInitResponse {
  pub success: bool,
  pub gateway_reference: String,
  pub authorization_url: Option<String>,
  pub message: String,
}

#[derive(Debug, Clone)]
pub struct GatewayVerifyResponse {
  pub success: bool,
  pub status: String,
  pub amount_cents: i64,
  pub message: String,
}

#[derive(Debug, Clone)]
pub struct GatewayRefundResponse {
  pub success: bool,
  pub refund_reference: Option<String>,
  pub message: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn name(&self) -> &str;

  async fn initiate(&self, request: InitiateRequest) -> FulfillmentResult<GatewayInitResponse>;

  /// May be called any number of times for the same reference; callers own
  /// the idempotency of downstream side effects.
  async fn verify(&self, gateway_reference: &str) -> FulfillmentResult<GatewayVerifyResponse>;

  async fn refund(
    &self,
    gateway_reference: &str,
    amount_cents: i64,
    reason: &str,
  ) -> FulfillmentResult<GatewayRefundResponse>;
}

pub struct GatewayRegistry {
  gateways: HashMap<String, Arc<dyn PaymentGateway>>,
  default_name: String,
}

impl GatewayRegistry {
  pub fn new(default_name: impl Into<String>) -> Self {
    GatewayRegistry {
      gateways: HashMap::new(),
      default_name: default_name.into(),
    }
  }

  pub fn register(&mut self, gateway: Arc<dyn PaymentGateway>) {
    self.gateways.insert(gateway.name().to_string(), gateway);
  }

  /// Re-keys the fallback provider. The hub calls this with the configured
  /// default so the registry and the config can never disagree.
  pub fn set_default(&mut self, name: impl Into<String>) {
    self.default_name = name.into();
  }

  /// Resolves by name with default fallback. Returns the resolved provider
  /// name alongside the handle so transactions record what actually ran.
  pub fn resolve(&self, name: Option<&str>) -> Option<(String, Arc<dyn PaymentGateway>)> {
    if let Some(requested) = name {
      if let Some(gw) = self.gateways.get(requested) {
        return Some((requested.to_string(), gw.clone()));
      }
      warn!(requested, default = %self.default_name, "unknown payment gateway requested, using default");
    }
    self
      .gateways
      .get(&self.default_name)
      .map(|gw| (self.default_name.clone(), gw.clone()))
  }
}
