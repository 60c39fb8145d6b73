// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcaster (C7, §4.6).
//!
//! Consumes the Bus State Store's change stream and, for each event, looks up
//! the subscribed sockets in the [`SubscriptionRegistry`] and pushes a public
//! payload onto each one's outbound queue. The same [`Broadcaster::deliver_to_rooms`]
//! path is reused directly by the ETA worker (C11), which composes `eta:update`
//! payloads outside the change stream (§4.10, §9 design note #3).

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::Bus;
use crate::outbound::OutboundEvent;
use crate::registry::SubscriptionRegistry;
use crate::store::{ChangeEvent, ChangeKind};

/// `bus:status` payload (§6.2): sent on subscribe and on every `online`
/// transition.
pub fn bus_status_payload(bus: &Bus) -> Value {
    json!({
        "type": "bus:status",
        "busId": bus.bus_id,
        "routeId": bus.route_id,
        "online": bus.online,
        "lastOnlineAt": bus.last_online_at,
        "lastUpdateAt": bus.last_update_at,
        "timestamp": Utc::now(),
    })
}

/// `bus:update` payload (§6.2): sent on every accepted sample.
pub fn bus_update_payload(bus: &Bus) -> Value {
    json!({
        "type": "bus:update",
        "busId": bus.bus_id,
        "routeId": bus.route_id,
        "location": bus.location.map(|c| json!({"lng": c.lng, "lat": c.lat})),
        "speed": bus.speed,
        "heading": bus.heading,
        "lastUpdateAt": bus.last_update_at,
        "timestamp": Utc::now(),
    })
}

/// `route:buses` payload (§6.2): sent once on route subscribe.
pub fn route_buses_payload(route_id: &str, buses: &[Bus]) -> Value {
    json!({
        "type": "route:buses",
        "routeId": route_id,
        "buses": buses,
        "timestamp": Utc::now(),
    })
}

/// Fans change-stream events out to subscribed sockets.
pub struct Broadcaster {
    registry: Arc<SubscriptionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `event` to every socket subscribed to `bus:<bus_id>` or
    /// `route:<route_id>`. A socket whose queue is still full after
    /// coalescing is closed (§4.6, §7 `QueueOverflow`).
    pub fn deliver_to_rooms(&self, bus_id: &str, route_id: &str, event: OutboundEvent) {
        for socket_id in self.registry.members_of(bus_id, route_id) {
            let Some(queue) = self.registry.queue_for(socket_id) else { continue };
            if !queue.push(event.clone()) {
                tracing::warn!(socket_id, bus_id, "outbound queue overflowed, closing socket");
                queue.close();
            }
        }
    }

    fn handle_change(&self, event: ChangeEvent) {
        let outbound = match event.kind {
            ChangeKind::Status | ChangeKind::Stale => {
                OutboundEvent::BusStatus(bus_status_payload(&event.snapshot))
            }
            ChangeKind::Update => OutboundEvent::BusUpdate {
                bus_id: event.bus_id.clone(),
                payload: bus_update_payload(&event.snapshot),
            },
        };
        self.deliver_to_rooms(&event.bus_id, &event.route_id, outbound);
    }

    /// Spawn the task consuming `rx` until cancelled. A lagged reader
    /// tolerates dropped events (§4.4: clients reconcile on next subscribe or
    /// accepted update); a closed stream ends the task, logged at error level.
    pub fn spawn(self: Arc<Self>, mut rx: broadcast::Receiver<ChangeEvent>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    received = rx.recv() => match received {
                        Ok(event) => self.handle_change(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "change stream reader lagged, events dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::error!("change stream closed, broadcaster stopping");
                            break;
                        }
                    },
                }
            }
        })
    }
}
