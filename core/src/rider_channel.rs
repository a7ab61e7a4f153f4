// core/src/rider_channel.rs

//! Best-effort push fan-out to couriers.
//!
//! Delivery is at-most-once: no queueing, no persistence, no redelivery on
//! reconnect. A rider may hold several concurrent handles (multi-device);
//! each send serializes the event once and writes to every open handle. A
//! failed or full write prunes that handle only and never blocks the
//! sender. Idle handles expire after the configured timeout and must be
//! re-established by the client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::events::{DomainEvent, EventBus};

/// One open push channel, handed to the subscribing client. Dropping the
/// handle (or its receiver) causes the registry to prune it on the next
/// write.
pub struct RiderChannel {
  pub rider_id: Uuid,
  pub receiver: mpsc::Receiver<String>,
}

struct Handle {
  tx: mpsc::Sender<String>,
  last_active: Instant,
}

pub struct RiderChannelRegistry {
  channels: Mutex<HashMap<Uuid, Vec<Handle>>>,
  idle_timeout: Duration,
  buffer: usize,
}

impl RiderChannelRegistry {
  pub fn new(idle_timeout: Duration, buffer: usize) -> Self {
    RiderChannelRegistry {
      channels: Mutex::new(HashMap::new()),
      idle_timeout,
      buffer,
    }
  }

  /// Opens a push channel for the rider. Existing handles stay open;
  /// multi-device is expected.
  pub fn register(&self, rider_id: Uuid) -> RiderChannel {
    let (tx, rx) = mpsc::channel(self.buffer);
    let mut guard = self.channels.lock();
    Self::prune_idle(&mut guard, self.idle_timeout);
    guard.entry(rider_id).or_default().push(Handle {
      tx,
      last_active: Instant::now(),
    });
    debug!(%rider_id, "rider channel registered");
    RiderChannel { rider_id, receiver: rx }
  }

  /// Serializes `event` once and fire-and-forgets it to every open handle
  /// for the rider. Returns how many handles accepted the write.
  pub fn send<E: Serialize>(&self, rider_id: Uuid, event: &E) -> usize {
    let payload = match serde_json::to_string(event) {
      Ok(p) => p,
      Err(e) => {
        warn!(%rider_id, error = %e, "dropping unserializable rider event");
        return 0;
      }
    };

    let mut guard = self.channels.lock();
    Self::prune_idle(&mut guard, self.idle_timeout);
    let Some(handles) = guard.get_mut(&rider_id) else {
      trace!(%rider_id, "no open channels for rider");
      return 0;
    };

    let mut delivered = 0;
    // Self-pruning: a closed or full handle is removed, never retried.
    handles.retain_mut(|handle| match handle.tx.try_send(payload.clone()) {
      Ok(()) => {
        handle.last_active = Instant::now();
        delivered += 1;
        true
      }
      Err(e) => {
        debug!(%rider_id, error = %e, "pruning dead rider channel");
        false
      }
    });
    if handles.is_empty() {
      guard.remove(&rider_id);
    }
    delivered
  }

  pub fn open_channels(&self, rider_id: Uuid) -> usize {
    self.channels.lock().get(&rider_id).map(Vec::len).unwrap_or(0)
  }

  fn prune_idle(channels: &mut HashMap<Uuid, Vec<Handle>>, idle_timeout: Duration) {
    channels.retain(|_, handles| {
      handles.retain(|h| h.last_active.elapsed() < idle_timeout);
      !handles.is_empty()
    });
  }
}

/// Bridges the domain event bus onto per-rider push channels: every
/// delivery status change with an assigned rider is forwarded to that
/// rider's open handles. Runs until the bus is dropped.
pub fn spawn_delivery_forwarder(registry: Arc<RiderChannelRegistry>, bus: &EventBus) -> tokio::task::JoinHandle<()> {
  let mut receiver = bus.subscribe();
  tokio::spawn(async move {
    loop {
      match receiver.recv().await {
        Ok(event) => {
          if let DomainEvent::DeliveryStatusChanged { rider_id: Some(rider), .. } = &event {
            registry.send(*rider, &event);
          }
        }
        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
          // Best-effort channel: dropped events are acceptable by contract.
          warn!(missed, "rider event forwarder lagged behind the bus");
        }
        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
      }
    }
  })
}
