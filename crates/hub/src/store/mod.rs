// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus State Store (C4, §4.4) and its change stream.
//!
//! The store is the sole mutable durable shared resource (§5). This module
//! defines the interface the core expects from persistence (§6.3); [`memory`]
//! ships the one concrete implementation (in-process, in-memory, lock-per-key)
//! this specification requires. A durable engine with a native change feed,
//! or an external pub/sub topic, can implement [`BusStore`] without any other
//! component changing (§9).

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::domain::{Bus, Coordinate};
use crate::error::CoreError;

/// The kind of mutation that produced a [`ChangeEvent`], per §4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// An online/offline transition from `driver:toggle`.
    Status,
    /// A location/speed/heading sample from `driver:move`.
    Update,
    /// A demotion by the staleness worker.
    Stale,
}

/// An observable mutation of a single [`Bus`] record, delivered in write
/// order per `bus_id` (§4.4, §5).
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub bus_id: String,
    pub route_id: String,
    pub driver_id: Option<String>,
    pub kind: ChangeKind,
    pub snapshot: Bus,
    pub mutation_instant: DateTime<Utc>,
}

/// The persistence interface the core expects (§6.3). All writes for a given
/// `bus_id` must be serialized; reads may be eventually consistent but must
/// never observe a write that violates the §3 invariants.
pub trait BusStore: Send + Sync {
    fn upsert_toggle(
        &self,
        driver_id: &str,
        bus_id: &str,
        route_id: &str,
        online: bool,
        now: DateTime<Utc>,
    ) -> Result<Bus, CoreError>;

    #[allow(clippy::too_many_arguments)]
    fn upsert_sample(
        &self,
        driver_id: &str,
        bus_id: &str,
        route_id: &str,
        location: Coordinate,
        speed: f64,
        heading: f64,
        now: DateTime<Utc>,
    ) -> Result<Bus, CoreError>;

    fn mark_stale(&self, bus_id: &str, stale_at: DateTime<Utc>) -> Result<Option<Bus>, CoreError>;

    fn get(&self, bus_id: &str) -> Option<Bus>;

    fn list_online_on_route(&self, route_id: &str) -> Vec<Bus>;

    /// All online buses, for the geo index (C5) and staleness worker (C10).
    fn list_online(&self) -> Vec<Bus>;

    /// All buses regardless of online status, for the read API (C12, §6.4).
    fn list_all(&self) -> Vec<Bus>;

    fn subscribe_change_stream(&self) -> broadcast::Receiver<ChangeEvent>;
}
