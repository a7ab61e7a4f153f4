// core/src/config.rs

use std::env;
use std::time::Duration;

use crate::error::{FulfillmentError, FulfillmentResult};

/// Tunables for the fulfillment core. Everything has a default so tests and
/// embedded callers can just use `CoreConfig::default()`.
#[derive(Debug, Clone)]
pub struct CoreConfig {
  /// Gateway used when a caller omits or names an unknown provider.
  pub default_gateway: String,
  /// Prefix for generated per-store order numbers.
  pub order_number_prefix: String,
  /// Idle time after which a rider push channel is pruned.
  pub rider_channel_idle_timeout: Duration,
  /// Bounded buffer per rider push channel; full buffer counts as a failed
  /// write and prunes the handle.
  pub rider_channel_buffer: usize,
}

impl Default for CoreConfig {
  fn default() -> Self {
    CoreConfig {
      default_gateway: "mock".to_string(),
      order_number_prefix: "ORD".to_string(),
      rider_channel_idle_timeout: Duration::from_secs(300),
      rider_channel_buffer: 32,
    }
  }
}

impl CoreConfig {
  pub fn from_env() -> FulfillmentResult<Self> {
    let defaults = CoreConfig::default();

    let default_gateway = env::var("DEFAULT_PAYMENT_GATEWAY").unwrap_or(defaults.default_gateway);
    let order_number_prefix = env::var("ORDER_NUMBER_PREFIX").unwrap_or(defaults.order_number_prefix);

    let rider_channel_idle_timeout = match env::var("RIDER_CHANNEL_IDLE_TIMEOUT_SECS") {
      Ok(raw) => {
        let secs = raw
          .parse::<u64>()
          .map_err(|e| FulfillmentError::Config(format!("Invalid RIDER_CHANNEL_IDLE_TIMEOUT_SECS: {}", e)))?;
        Duration::from_secs(secs)
      }
      Err(_) => defaults.rider_channel_idle_timeout,
    };

    let rider_channel_buffer = match env::var("RIDER_CHANNEL_BUFFER") {
      Ok(raw) => raw
        .parse::<usize>()
        .map_err(|e| FulfillmentError::Config(format!("Invalid RIDER_CHANNEL_BUFFER: {}", e)))?,
      Err(_) => defaults.rider_channel_buffer,
    };

    if rider_channel_buffer == 0 {
      return Err(FulfillmentError::Config(
        "RIDER_CHANNEL_BUFFER must be at least 1".to_string(),
      ));
    }

    tracing::info!("Fulfillment core configuration loaded.");
    Ok(CoreConfig {
      default_gateway,
      order_number_prefix,
      rider_channel_idle_timeout,
      rider_channel_buffer,
    })
  }
}
