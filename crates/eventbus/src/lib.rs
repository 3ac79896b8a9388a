// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed in-process publish/subscribe bus.
//!
//! Subscribers register a callback per event kind; publishing synchronously
//! invokes each callback in registration order. Delivery within one kind is
//! in publication order; there is no ordering guarantee across kinds.
//! Subscriber panics are caught and logged rather than propagated, so one
//! broken subscriber never prevents the rest of the fan-out.

use std::collections::HashMap;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A value-typed event payload that can be fanned out to many subscribers.
///
/// Implementors are typically a closed enum (one variant per event shape)
/// with a small `Kind` discriminant enum used to route subscriptions
/// without requiring subscribers to match on the full payload.
pub trait Event: Clone + Send + Sync + 'static {
    type Kind: Copy + Eq + Hash + Send + Sync + std::fmt::Debug + 'static;

    fn kind(&self) -> Self::Kind;
}

/// An event plus the metadata the bus stamps on every publish.
#[derive(Debug, Clone)]
pub struct Envelope<E: Event> {
    pub payload: E,
    pub category: E::Kind,
    pub timestamp_epoch_ms: u64,
}

fn now_epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

struct Subscriber<E: Event> {
    id: u64,
    callback: Arc<dyn Fn(&Envelope<E>) + Send + Sync>,
}

/// Synchronous typed pub/sub bus for one event payload type.
pub struct EventBus<E: Event> {
    subscribers: Mutex<HashMap<E::Kind, Vec<Subscriber<E>>>>,
    next_id: AtomicU64,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self { subscribers: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0) }
    }

    /// Register `callback` to run, in registration order relative to other
    /// subscribers of the same kind, whenever a matching event publishes.
    pub fn subscribe(
        &self,
        kind: E::Kind,
        callback: impl Fn(&Envelope<E>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self.subscribers.lock();
        subscribers.entry(kind).or_default().push(Subscriber { id, callback: Arc::new(callback) });
        SubscriptionId(id)
    }

    /// Remove a subscription. Idempotent: unsubscribing an id that is
    /// already gone (or was never registered for this kind) is a no-op.
    pub fn unsubscribe(&self, kind: E::Kind, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock();
        if let Some(list) = subscribers.get_mut(&kind) {
            list.retain(|s| s.id != id.0);
        }
    }

    /// Number of live subscribers for a kind (test/diagnostic helper).
    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.subscribers.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Publish an event, synchronously invoking every subscriber of its
    /// kind in registration order. The subscriber list is snapshotted
    /// before invocation so a callback that subscribes or unsubscribes
    /// during dispatch cannot deadlock or affect this publish's fan-out.
    pub fn publish(&self, payload: E) {
        let kind = payload.kind();
        let envelope = Envelope { payload, category: kind, timestamp_epoch_ms: now_epoch_ms() };

        let callbacks: Vec<Arc<dyn Fn(&Envelope<E>) + Send + Sync>> = {
            let subscribers = self.subscribers.lock();
            subscribers.get(&kind).map(|list| list.iter().map(|s| Arc::clone(&s.callback)).collect()).unwrap_or_default()
        };

        for callback in callbacks {
            let envelope = &envelope;
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(envelope)));
            if let Err(panic) = result {
                let message = panic_message(&panic);
                tracing::error!(kind = ?kind, error = %message, "event bus subscriber panicked");
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
