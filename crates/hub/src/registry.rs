// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription Registry (C6, §4.6).
//!
//! Tracks which sockets are members of `bus:<busId>` and `route:<routeId>`
//! rooms, and owns each socket's outbound delivery queue so the Broadcaster
//! can look up "who do I deliver to" without touching the socket itself.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::outbound::FanoutQueue;

/// Opaque per-connection identifier, assigned on registration.
pub type SocketId = u64;

#[derive(Default)]
struct Rooms {
    /// `busId -> set(socketId)`.
    by_bus: HashMap<String, HashSet<SocketId>>,
    /// `routeId -> set(socketId)`.
    by_route: HashMap<String, HashSet<SocketId>>,
}

/// Process-local, in-memory subscription registry shared by driver ingress,
/// passenger ingress, and the Broadcaster.
pub struct SubscriptionRegistry {
    next_id: AtomicU64,
    queues: RwLock<HashMap<SocketId, Arc<FanoutQueue>>>,
    rooms: RwLock<Rooms>,
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            queues: RwLock::new(HashMap::new()),
            rooms: RwLock::new(Rooms::default()),
        }
    }
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new socket's outbound queue and return its id.
    pub fn register(&self, queue: Arc<FanoutQueue>) -> SocketId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.queues.write().unwrap_or_else(|e| e.into_inner()).insert(id, queue);
        id
    }

    /// Remove a socket and all of its room memberships (disconnect, §4.6).
    pub fn deregister(&self, socket_id: SocketId) {
        self.queues.write().unwrap_or_else(|e| e.into_inner()).remove(&socket_id);
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        rooms.by_bus.retain(|_, members| {
            members.remove(&socket_id);
            !members.is_empty()
        });
        rooms.by_route.retain(|_, members| {
            members.remove(&socket_id);
            !members.is_empty()
        });
    }

    pub fn join_bus(&self, socket_id: SocketId, bus_id: &str) {
        self.rooms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .by_bus
            .entry(bus_id.to_owned())
            .or_default()
            .insert(socket_id);
    }

    pub fn join_route(&self, socket_id: SocketId, route_id: &str) {
        self.rooms
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .by_route
            .entry(route_id.to_owned())
            .or_default()
            .insert(socket_id);
    }

    pub fn leave_bus(&self, socket_id: SocketId, bus_id: &str) {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        if let Some(members) = rooms.by_bus.get_mut(bus_id) {
            members.remove(&socket_id);
            if members.is_empty() {
                rooms.by_bus.remove(bus_id);
            }
        }
    }

    pub fn leave_route(&self, socket_id: SocketId, route_id: &str) {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        if let Some(members) = rooms.by_route.get_mut(route_id) {
            members.remove(&socket_id);
            if members.is_empty() {
                rooms.by_route.remove(route_id);
            }
        }
    }

    /// Union of sockets subscribed to `bus:<bus_id>` or `route:<route_id>`,
    /// deduplicated, for the Broadcaster's fan-out (§4.6 step 1).
    pub fn members_of(&self, bus_id: &str, route_id: &str) -> HashSet<SocketId> {
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        let mut members = HashSet::new();
        if let Some(set) = rooms.by_bus.get(bus_id) {
            members.extend(set.iter().copied());
        }
        if let Some(set) = rooms.by_route.get(route_id) {
            members.extend(set.iter().copied());
        }
        members
    }

    pub fn queue_for(&self, socket_id: SocketId) -> Option<Arc<FanoutQueue>> {
        self.queues.read().unwrap_or_else(|e| e.into_inner()).get(&socket_id).cloned()
    }
}
