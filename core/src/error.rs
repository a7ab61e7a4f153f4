// core/src/error.rs

use anyhow::Error as AnyhowError;
use thiserror::Error;
use uuid::Uuid;

use crate::model::delivery::DeliveryStatus;

#[derive(Debug, Error)]
pub enum FulfillmentError {
  /// Malformed input, rejected before any mutation.
  #[error("Validation error: {0}")]
  Validation(String),

  #[error("Cart {cart_id} has no lines")]
  EmptyCart { cart_id: Uuid },

  /// Raised by the conditional stock decrement; never leaves partial state.
  #[error(
    "Insufficient stock for variant {variant_id} at location {location_id}: requested {requested}, available {available}"
  )]
  InsufficientStock {
    variant_id: Uuid,
    location_id: Uuid,
    requested: u32,
    available: i64,
  },

  #[error("Invalid delivery transition: cannot {action} from {from:?}")]
  InvalidTransition {
    from: DeliveryStatus,
    action: &'static str,
  },

  #[error("{entity} not found: {id}")]
  NotFound { entity: &'static str, id: String },

  /// Payment provider failure. The owning transaction is left retriable.
  #[error("Gateway '{gateway}' error: {message}")]
  Gateway { gateway: String, message: String },

  /// Duplicate order number, re-claim of an assigned delivery, and similar
  /// write-write races.
  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Internal error: {source}")]
  Internal {
    #[source]
    source: AnyhowError,
  },
}

impl FulfillmentError {
  pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
    FulfillmentError::NotFound {
      entity,
      id: id.to_string(),
    }
  }
}

// The key conversion for external/infrastructure errors surfaced through
// collaborator seams.
impl From<AnyhowError> for FulfillmentError {
  fn from(err: AnyhowError) -> Self {
    FulfillmentError::Internal { source: err }
  }
}

pub type FulfillmentResult<T, E = FulfillmentError> = std::result::Result<T, E>;
