// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory, lock-per-key [`BusStore`] implementation.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use super::{BusStore, ChangeEvent, ChangeKind};
use crate::domain::{Bus, Coordinate};
use crate::error::CoreError;

const CHANGE_STREAM_CAPACITY: usize = 1024;

/// In-process, in-memory implementation of [`BusStore`]. Per-`bus_id`
/// mutation lock, with a single broadcast channel fanning out [`ChangeEvent`]s
/// in write order per key (§4.4, §5).
pub struct InMemoryBusStore {
    buses: RwLock<HashMap<String, Arc<Mutex<Bus>>>>,
    change_tx: broadcast::Sender<ChangeEvent>,
}

impl Default for InMemoryBusStore {
    fn default() -> Self {
        let (change_tx, _) = broadcast::channel(CHANGE_STREAM_CAPACITY);
        Self { buses: RwLock::new(HashMap::new()), change_tx }
    }
}

impl InMemoryBusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the per-bus lock, creating a fresh offline record if absent.
    fn slot(&self, bus_id: &str, route_id: &str, now: DateTime<Utc>) -> Arc<Mutex<Bus>> {
        if let Some(slot) = self.buses.read().unwrap_or_else(|e| e.into_inner()).get(bus_id) {
            return Arc::clone(slot);
        }
        let mut guard = self.buses.write().unwrap_or_else(|e| e.into_inner());
        Arc::clone(
            guard
                .entry(bus_id.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(Bus::new(bus_id, route_id, now)))),
        )
    }

    fn emit(&self, kind: ChangeKind, driver_id: Option<String>, snapshot: Bus, now: DateTime<Utc>) {
        let event = ChangeEvent {
            bus_id: snapshot.bus_id.clone(),
            route_id: snapshot.route_id.clone(),
            driver_id,
            kind,
            snapshot,
            mutation_instant: now,
        };
        // broadcast::Sender::send is synchronous and non-blocking; it is safe
        // to call while still holding the per-key lock, which is how
        // same-`bus_id` ordering is guaranteed without extra bookkeeping (§5).
        let _ = self.change_tx.send(event);
    }
}

impl BusStore for InMemoryBusStore {
    fn upsert_toggle(
        &self,
        driver_id: &str,
        bus_id: &str,
        route_id: &str,
        online: bool,
        now: DateTime<Utc>,
    ) -> Result<Bus, CoreError> {
        let slot = self.slot(bus_id, route_id, now);
        let mut bus = slot.lock().unwrap_or_else(|e| e.into_inner());
        bus.apply_toggle(driver_id, route_id, online, now);
        let snapshot = bus.clone();
        drop(bus);
        self.emit(ChangeKind::Status, Some(driver_id.to_owned()), snapshot.clone(), now);
        Ok(snapshot)
    }

    fn upsert_sample(
        &self,
        driver_id: &str,
        bus_id: &str,
        route_id: &str,
        location: Coordinate,
        speed: f64,
        heading: f64,
        now: DateTime<Utc>,
    ) -> Result<Bus, CoreError> {
        let slot = self.slot(bus_id, route_id, now);
        let mut bus = slot.lock().unwrap_or_else(|e| e.into_inner());
        bus.apply_sample(driver_id, route_id, location, speed, heading, now);
        let snapshot = bus.clone();
        drop(bus);
        self.emit(ChangeKind::Update, Some(driver_id.to_owned()), snapshot.clone(), now);
        Ok(snapshot)
    }

    fn mark_stale(&self, bus_id: &str, stale_at: DateTime<Utc>) -> Result<Option<Bus>, CoreError> {
        let slot = match self.buses.read().unwrap_or_else(|e| e.into_inner()).get(bus_id) {
            Some(s) => Arc::clone(s),
            None => return Ok(None),
        };
        let mut bus = slot.lock().unwrap_or_else(|e| e.into_inner());
        bus.apply_stale(stale_at);
        let snapshot = bus.clone();
        let driver_id = snapshot.driver_id.clone();
        drop(bus);
        self.emit(ChangeKind::Stale, driver_id, snapshot.clone(), stale_at);
        Ok(Some(snapshot))
    }

    fn get(&self, bus_id: &str) -> Option<Bus> {
        let slot = Arc::clone(self.buses.read().unwrap_or_else(|e| e.into_inner()).get(bus_id)?);
        Some(slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn list_online_on_route(&self, route_id: &str) -> Vec<Bus> {
        self.list_all().into_iter().filter(|b| b.online && b.route_id == route_id).collect()
    }

    fn list_online(&self) -> Vec<Bus> {
        self.list_all().into_iter().filter(|b| b.online).collect()
    }

    fn list_all(&self) -> Vec<Bus> {
        self.buses
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|slot| slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }

    fn subscribe_change_stream(&self) -> broadcast::Receiver<ChangeEvent> {
        self.change_tx.subscribe()
    }
}
