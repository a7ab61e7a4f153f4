// core/src/payment/mod.rs

//! Payment orchestration: transaction records, provider selection, and the
//! idempotent confirmation path shared by client polls and webhooks.

pub mod gateway;
pub mod mock;

pub use gateway::{
  GatewayInitResponse, GatewayRefundResponse, GatewayRegistry, GatewayVerifyResponse, InitiateRequest, PaymentGateway,
};
pub use mock::MockGateway;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::events::{DomainEvent, EventBus};
use crate::model::delivery::DeliveryOrder;
use crate::model::order::Order;
use crate::model::payment::{PaymentStatus, PaymentTransaction};
use crate::orders::OrderStore;

/// Downstream hook invoked once, best-effort, when a verification first
/// lands a transaction in Success and the order wants physical delivery.
/// Failures here are logged for manual follow-up, never surfaced to the
/// payment caller.
#[async_trait]
pub trait DeliveryAutoCreate: Send + Sync {
  async fn create_for_paid_order(&self, order: &Order) -> FulfillmentResult<DeliveryOrder>;
}

/// Result of `PaymentService::initiate`.
#[derive(Debug, Clone)]
pub struct PaymentInit {
  pub transaction: PaymentTransaction,
  pub authorization_url: Option<String>,
  pub message: String,
}

struct TxnStore {
  by_id: HashMap<Uuid, PaymentTransaction>,
  by_reference: HashMap<String, Uuid>,
}

pub struct PaymentService {
  gateways: GatewayRegistry,
  transactions: RwLock<TxnStore>,
  orders: Arc<OrderStore>,
  bus: Arc<EventBus>,
  delivery_hook: Option<Arc<dyn DeliveryAutoCreate>>,
}

impl PaymentService {
  pub fn new(
    gateways: GatewayRegistry,
    orders: Arc<OrderStore>,
    bus: Arc<EventBus>,
    delivery_hook: Option<Arc<dyn DeliveryAutoCreate>>,
  ) -> Self {
    PaymentService {
      gateways,
      transactions: RwLock::new(TxnStore {
        by_id: HashMap::new(),
        by_reference: HashMap::new(),
      }),
      orders,
      bus,
      delivery_hook,
    }
  }

  pub fn get(&self, transaction_id: Uuid) -> FulfillmentResult<PaymentTransaction> {
    self
      .transactions
      .read()
      .by_id
      .get(&transaction_id)
      .cloned()
      .ok_or_else(|| FulfillmentError::not_found("PaymentTransaction", transaction_id))
  }

  /// Creates a Pending transaction for the order and asks the provider to
  /// open a payment session. On provider failure the transaction stays
  /// Pending and retriable; the gateway error is surfaced.
  #[instrument(skip(self, order), fields(order_id = %order.id, amount = order.total_amount_cents))]
  pub async fn initiate(
    &self,
    order: &Order,
    email: &str,
    callback_url: &str,
    gateway_name: Option<&str>,
  ) -> FulfillmentResult<PaymentInit> {
    let (resolved_name, gateway) = self
      .gateways
      .resolve(gateway_name)
      .ok_or_else(|| FulfillmentError::Config("no default payment gateway registered".to_string()))?;

    let now = Utc::now();
    let txn = PaymentTransaction {
      id: Uuid::new_v4(),
      store_id: order.store_id,
      order_id: Some(order.id),
      amount_cents: order.total_amount_cents,
      currency: order.currency.clone(),
      status: PaymentStatus::Pending,
      gateway: resolved_name.clone(),
      gateway_reference: None,
      created_at: now,
      updated_at: now,
    };
    let txn_id = txn.id;
    self.transactions.write().by_id.insert(txn_id, txn);

    let request = InitiateRequest {
      email: email.to_string(),
      amount_cents: order.total_amount_cents,
      currency: order.currency.clone(),
      reference: txn_id.to_string(),
      callback_url: callback_url.to_string(),
    };

    let response = gateway.initiate(request).await?;
    if !response.success {
      return Err(FulfillmentError::Gateway {
        gateway: resolved_name,
        message: response.message,
      });
    }

    let updated = {
      let mut guard = self.transactions.write();
      guard.by_reference.insert(response.gateway_reference.clone(), txn_id);
      let txn = guard.by_id.get_mut(&txn_id).expect("inserted above");
      txn.status = PaymentStatus::Initiated;
      txn.gateway_reference = Some(response.gateway_reference.clone());
      txn.updated_at = Utc::now();
      txn.clone()
    };
    info!(transaction_id = %txn_id, gateway = %updated.gateway, "payment initiated");

    Ok(PaymentInit {
      transaction: updated,
      authorization_url: response.authorization_url,
      message: response.message,
    })
  }

  /// Idempotent confirmation. Client polls and asynchronous webhooks both
  /// land here, possibly concurrently and more than once: a transaction
  /// already in Success is returned unchanged and no side effect re-runs.
  #[instrument(skip(self))]
  pub async fn verify(&self, transaction_id: Uuid) -> FulfillmentResult<PaymentTransaction> {
    let snapshot = self.get(transaction_id)?;

    if snapshot.status.is_terminal() {
      info!(transaction_id = %transaction_id, status = ?snapshot.status, "verify short-circuit on terminal transaction");
      return Ok(snapshot);
    }

    let reference = snapshot
      .gateway_reference
      .clone()
      .ok_or_else(|| FulfillmentError::Validation("transaction has no gateway reference; initiate first".to_string()))?;

    let (_, gateway) = self
      .gateways
      .resolve(Some(&snapshot.gateway))
      .ok_or_else(|| FulfillmentError::Config("no default payment gateway registered".to_string()))?;

    // A transport error propagates with the transaction untouched, so the
    // caller can retry.
    let response = gateway.verify(&reference).await?;

    let (updated, first_success) = {
      let mut guard = self.transactions.write();
      let txn = guard
        .by_id
        .get_mut(&transaction_id)
        .ok_or_else(|| FulfillmentError::not_found("PaymentTransaction", transaction_id))?;
      // A concurrent verify may have won the race while we awaited the
      // provider. Absorb the duplicate.
      if txn.status.is_terminal() {
        return Ok(txn.clone());
      }
      let first_success = response.success;
      txn.status = if response.success {
        PaymentStatus::Success
      } else {
        PaymentStatus::Failed
      };
      txn.updated_at = Utc::now();
      (txn.clone(), first_success)
    };

    if first_success {
      // The money already moved; from here every downstream step is
      // best-effort bookkeeping and must not unwind the committed Success.
      if let Err(e) = self.apply_success_side_effects(&updated).await {
        warn!(transaction_id = %transaction_id, error = %e, "post-payment side effects failed; flagged for manual follow-up");
      }
    } else {
      warn!(transaction_id = %transaction_id, status = %response.status, "payment verification reported failure");
    }

    Ok(updated)
  }

  /// Webhook entry point: looks the transaction up by the provider-side
  /// reference and runs the same idempotent verification.
  pub async fn verify_by_reference(&self, gateway_reference: &str) -> FulfillmentResult<PaymentTransaction> {
    let txn_id = self
      .transactions
      .read()
      .by_reference
      .get(gateway_reference)
      .copied()
      .ok_or_else(|| FulfillmentError::not_found("PaymentTransaction", gateway_reference))?;
    self.verify(txn_id).await
  }

  async fn apply_success_side_effects(&self, txn: &PaymentTransaction) -> FulfillmentResult<()> {
    let Some(order_id) = txn.order_id else {
      return Ok(());
    };

    let order = self.orders.mark_paid(order_id)?;
    self.bus.publish(DomainEvent::OrderPaid {
      order_id: order.id,
      store_id: order.store_id,
    });

    // Best-effort: a failure here must not unwind the already-committed
    // payment confirmation.
    if order.delivery_address.is_some() {
      if let Some(hook) = &self.delivery_hook {
        match hook.create_for_paid_order(&order).await {
          Ok(delivery) => {
            info!(order_id = %order.id, delivery_order_id = %delivery.id, "delivery order auto-created");
          }
          Err(e) => {
            warn!(order_id = %order.id, error = %e, "delivery auto-creation failed; flagged for manual follow-up");
          }
        }
      }
    }
    Ok(())
  }

  /// Refunds a successful transaction, full amount by default.
  #[instrument(skip(self))]
  pub async fn refund(
    &self,
    transaction_id: Uuid,
    amount_cents: Option<i64>,
    reason: &str,
  ) -> FulfillmentResult<PaymentTransaction> {
    let snapshot = self.get(transaction_id)?;
    if snapshot.status != PaymentStatus::Success {
      return Err(FulfillmentError::Conflict(format!(
        "transaction {} is {:?}, only successful transactions are refundable",
        transaction_id, snapshot.status
      )));
    }
    let amount = amount_cents.unwrap_or(snapshot.amount_cents);
    if amount <= 0 || amount > snapshot.amount_cents {
      return Err(FulfillmentError::Validation(format!(
        "refund amount {} out of range (transaction amount {})",
        amount, snapshot.amount_cents
      )));
    }
    let reference = snapshot
      .gateway_reference
      .clone()
      .ok_or_else(|| FulfillmentError::Validation("transaction has no gateway reference".to_string()))?;
    let (_, gateway) = self
      .gateways
      .resolve(Some(&snapshot.gateway))
      .ok_or_else(|| FulfillmentError::Config("no default payment gateway registered".to_string()))?;

    let response = gateway.refund(&reference, amount, reason).await?;
    if !response.success {
      return Err(FulfillmentError::Gateway {
        gateway: snapshot.gateway.clone(),
        message: response.message,
      });
    }

    let mut guard = self.transactions.write();
    let txn = guard
      .by_id
      .get_mut(&transaction_id)
      .ok_or_else(|| FulfillmentError::not_found("PaymentTransaction", transaction_id))?;
    txn.status = PaymentStatus::Refunded;
    txn.updated_at = Utc::now();
    info!(transaction_id = %transaction_id, amount, "transaction refunded");
    Ok(txn.clone())
  }
}
