// tests/stock_tests.rs
mod common;

use std::sync::Arc;

use cartline::{FulfillmentError, MovementType, StockLedger};
use common::setup_tracing;
use uuid::Uuid;

#[test]
fn deduct_decrements_and_appends_movement() {
  setup_tracing();
  let ledger = StockLedger::new();
  let (variant, location) = (Uuid::new_v4(), Uuid::new_v4());
  ledger.set_stock(variant, location, 10).unwrap();

  let order_ref = Uuid::new_v4();
  ledger.deduct(variant, location, 4, "order", order_ref).unwrap();

  assert_eq!(ledger.available_quantity(variant, location), 6);
  let movements = ledger.movements(variant, location);
  assert_eq!(movements.len(), 1);
  assert_eq!(movements[0].delta, -4);
  assert_eq!(movements[0].movement_type, MovementType::Sale);
  assert_eq!(movements[0].reference_id, order_ref);
}

#[test]
fn deduct_beyond_available_fails_without_side_effects() {
  setup_tracing();
  let ledger = StockLedger::new();
  let (variant, location) = (Uuid::new_v4(), Uuid::new_v4());
  ledger.set_stock(variant, location, 2).unwrap();

  let err = ledger.deduct(variant, location, 3, "order", Uuid::new_v4()).unwrap_err();
  match err {
    FulfillmentError::InsufficientStock {
      requested, available, ..
    } => {
      assert_eq!(requested, 3);
      assert_eq!(available, 2);
    }
    other => panic!("expected InsufficientStock, got {:?}", other),
  }

  // Nothing moved, nothing logged.
  assert_eq!(ledger.available_quantity(variant, location), 2);
  assert!(ledger.movements(variant, location).is_empty());
}

#[test]
fn available_quantity_never_goes_negative() {
  setup_tracing();
  let ledger = StockLedger::new();
  let (variant, location) = (Uuid::new_v4(), Uuid::new_v4());
  ledger.set_stock(variant, location, 3).unwrap();

  let mut successes = 0;
  for _ in 0..10 {
    if ledger.deduct(variant, location, 1, "order", Uuid::new_v4()).is_ok() {
      successes += 1;
    }
    assert!(ledger.available_quantity(variant, location) >= 0);
  }
  assert_eq!(successes, 3);
  assert_eq!(ledger.available_quantity(variant, location), 0);
}

#[test]
fn unknown_pair_reports_zero_stock() {
  setup_tracing();
  let ledger = StockLedger::new();
  assert_eq!(ledger.available_quantity(Uuid::new_v4(), Uuid::new_v4()), 0);
}

#[test]
fn adjust_restocks_but_refuses_to_go_negative() {
  setup_tracing();
  let ledger = StockLedger::new();
  let (variant, location) = (Uuid::new_v4(), Uuid::new_v4());

  ledger
    .adjust(variant, location, 5, MovementType::Restock, "restock", Uuid::new_v4())
    .unwrap();
  assert_eq!(ledger.available_quantity(variant, location), 5);

  let err = ledger
    .adjust(variant, location, -10, MovementType::Adjustment, "correction", Uuid::new_v4())
    .unwrap_err();
  assert!(matches!(err, FulfillmentError::Validation(_)));
  assert_eq!(ledger.available_quantity(variant, location), 5);
}

#[test]
fn batch_deduction_is_all_or_nothing() {
  setup_tracing();
  let ledger = StockLedger::new();
  let location = Uuid::new_v4();
  let (plenty, scarce) = (Uuid::new_v4(), Uuid::new_v4());
  ledger.set_stock(plenty, location, 100).unwrap();
  ledger.set_stock(scarce, location, 1).unwrap();

  let lines = [
    cartline::DeductLine {
      variant_id: plenty,
      location_id: location,
      quantity: 5,
    },
    cartline::DeductLine {
      variant_id: scarce,
      location_id: location,
      quantity: 2,
    },
  ];
  let err = ledger.deduct_all(&lines, "order", Uuid::new_v4()).unwrap_err();
  assert!(matches!(err, FulfillmentError::InsufficientStock { .. }));

  // The healthy line must not have been touched.
  assert_eq!(ledger.available_quantity(plenty, location), 100);
  assert_eq!(ledger.available_quantity(scarce, location), 1);
  assert!(ledger.movements(plenty, location).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_deductions_never_oversell() {
  setup_tracing();
  let ledger = Arc::new(StockLedger::new());
  let (variant, location) = (Uuid::new_v4(), Uuid::new_v4());
  ledger.set_stock(variant, location, 5).unwrap();

  let mut handles = Vec::new();
  for _ in 0..12 {
    let ledger = ledger.clone();
    handles.push(tokio::spawn(async move {
      ledger.deduct(variant, location, 1, "order", Uuid::new_v4()).is_ok()
    }));
  }

  let mut successes = 0;
  for handle in handles {
    if handle.await.unwrap() {
      successes += 1;
    }
  }

  assert_eq!(successes, 5);
  assert_eq!(ledger.available_quantity(variant, location), 0);
  assert_eq!(ledger.movements(variant, location).len(), 5);
}
