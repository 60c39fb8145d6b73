// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-socket outbound delivery queue (§4.6, §5, §7 `QueueOverflow`).
//!
//! Bounded and absorptive: a pending position update (`bus:update` /
//! `eta:update`) for a given bus is replaced by a newer one of the same kind
//! for the same bus rather than queuing both. Status transitions
//! (`bus:status`, `route:buses`) are never dropped. If the queue is still
//! full after coalescing, the push fails and the caller is expected to close
//! the socket (§7).

use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// A single outbound message, tagged so the queue knows which ones may be
/// coalesced and which may not.
#[derive(Debug, Clone)]
pub enum OutboundEvent {
    /// `bus:status` — never dropped.
    BusStatus(Value),
    /// `bus:update` — absorptive per `bus_id`.
    BusUpdate { bus_id: String, payload: Value },
    /// `route:buses` — never dropped.
    RouteBuses(Value),
    /// `eta:update` — absorptive per `bus_id`.
    EtaUpdate { bus_id: String, payload: Value },
    /// A direct procedural reply (`driver:*:success`/`driver:*:error`) —
    /// addressed to this one socket only, never dropped.
    Ack(Value),
}

impl OutboundEvent {
    fn coalesce_key(&self) -> Option<(u8, &str)> {
        match self {
            Self::BusUpdate { bus_id, .. } => Some((0, bus_id.as_str())),
            Self::EtaUpdate { bus_id, .. } => Some((1, bus_id.as_str())),
            Self::BusStatus(_) | Self::RouteBuses(_) | Self::Ack(_) => None,
        }
    }

    pub fn into_json(self) -> Value {
        match self {
            Self::BusStatus(v) | Self::RouteBuses(v) | Self::Ack(v) => v,
            Self::BusUpdate { payload, .. } | Self::EtaUpdate { payload, .. } => payload,
        }
    }
}

/// Bounded, absorptive, multi-producer single-consumer delivery queue for one
/// socket.
pub struct FanoutQueue {
    inner: Mutex<VecDeque<OutboundEvent>>,
    notify: Notify,
    capacity: usize,
    closed: AtomicBool,
}

impl FanoutQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            notify: Notify::new(),
            capacity,
            closed: AtomicBool::new(false),
        }
    }

    /// Push an event. Returns `true` if accepted, `false` if the queue
    /// overflowed and the caller should close the socket (§7 `QueueOverflow`).
    pub fn push(&self, event: OutboundEvent) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if queue.len() < self.capacity {
            queue.push_back(event);
            drop(queue);
            self.notify.notify_one();
            return true;
        }

        if let Some((kind, bus_id)) = event.coalesce_key() {
            if let Some(slot) = queue.iter_mut().find(|existing| {
                existing.coalesce_key().map(|(k, b)| (k, b == bus_id)) == Some((kind, true))
            }) {
                *slot = event;
                drop(queue);
                self.notify.notify_one();
                return true;
            }
        }

        false
    }

    /// Wait for and pop the next event. Returns `None` once [`close`] has
    /// been called and the queue has drained.
    pub async fn recv(&self) -> Option<OutboundEvent> {
        loop {
            {
                let mut queue = self.inner.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(event) = queue.pop_front() {
                    return Some(event);
                }
                if self.closed.load(Ordering::Acquire) {
                    return None;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Mark the queue closed. Already-queued events are dropped; any blocked
    /// or future [`recv`] call returns `None`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}
