// core/src/payment/mock.rs

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::error::{FulfillmentError, FulfillmentResult};
use crate::payment::gateway::{
  GatewayInitResponse, GatewayRefundResponse, GatewayVerifyResponse, InitiateRequest, PaymentGateway,
};

/// Scriptable in-process provider used by tests and single-process wiring.
/// Flags flip the next call's outcome; `verify_calls` counts invocations so
/// idempotency tests can assert how often the provider was actually hit.
pub struct MockGateway {
  name: String,
  pub decline_payments: AtomicBool,
  pub fail_transport: AtomicBool,
  pub verify_calls: AtomicUsize,
}

impl MockGateway {
  pub fn new(name: impl Into<String>) -> Self {
    MockGateway {
      name: name.into(),
      decline_payments: AtomicBool::new(false),
      fail_transport: AtomicBool::new(false),
      verify_calls: AtomicUsize::new(0),
    }
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  fn name(&self) -> &str {
    &self.name
  }

  async fn initiate(&self, request: InitiateRequest) -> FulfillmentResult<GatewayInitResponse> {
    if request.amount_cents <= 0 {
      return Err(FulfillmentError::Validation(
        "amount must be greater than zero".to_string(),
      ));
    }
    if self.fail_transport.load(Ordering::SeqCst) {
      return Err(FulfillmentError::Gateway {
        gateway: self.name.clone(),
        message: "simulated transport failure".to_string(),
      });
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await; // Simulate network latency

    let reference = format!("mock_ref_{}", Uuid::new_v4().simple());
    info!(gateway = %self.name, %reference, "mock payment initiated");
    Ok(GatewayInitResponse {
      success: true,
      gateway_reference: reference.clone(),
      authorization_url: Some(format!("https://pay.mock.test/authorize/{}", reference)),
      message: "initiated".to_string(),
    })
  }

  async fn verify(&self, gateway_reference: &str) -> FulfillmentResult<GatewayVerifyResponse> {
    self.verify_calls.fetch_add(1, Ordering::SeqCst);
    if self.fail_transport.load(Ordering::SeqCst) {
      return Err(FulfillmentError::Gateway {
        gateway: self.name.clone(),
        message: "simulated transport failure".to_string(),
      });
    }
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    if self.decline_payments.load(Ordering::SeqCst) {
      info!(gateway = %self.name, %gateway_reference, "mock payment declined");
      return Ok(GatewayVerifyResponse {
        success: false,
        status: "declined".to_string(),
        amount_cents: 0,
        message: "card declined".to_string(),
      });
    }
    Ok(GatewayVerifyResponse {
      success: true,
      status: "succeeded".to_string(),
      amount_cents: 0,
      message: "payment confirmed".to_string(),
    })
  }

  async fn refund(
    &self,
    gateway_reference: &str,
    amount_cents: i64,
    reason: &str,
  ) -> FulfillmentResult<GatewayRefundResponse> {
    if self.fail_transport.load(Ordering::SeqCst) {
      return Err(FulfillmentError::Gateway {
        gateway: self.name.clone(),
        message: "simulated transport failure".to_string(),
      });
    }
    info!(gateway = %self.name, %gateway_reference, amount_cents, reason, "mock refund issued");
    Ok(GatewayRefundResponse {
      success: true,
      refund_reference: Some(format!("mock_rf_{}", Uuid::new_v4().simple())),
      message: "refunded".to_string(),
    })
  }
}
