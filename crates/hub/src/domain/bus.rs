// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A longitude/latitude pair, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        (-180.0..=180.0).contains(&self.lng) && (-90.0..=90.0).contains(&self.lat)
    }
}

/// Coarse operational state of a bus, independent of the `online` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    Idle,
    Moving,
    Stopped,
    Maintenance,
    Inactive,
}

/// The canonical live state of a single physical vehicle.
///
/// This is the sole writable record of the tracking core. It is mutated only
/// by driver ingress and the staleness worker (§4.4, §4.9 of the
/// specification); every other component reads snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub bus_id: String,
    pub route_id: String,
    pub driver_id: Option<String>,
    pub online: bool,
    pub location: Option<Coordinate>,
    pub speed: f64,
    pub heading: f64,
    pub last_online_at: DateTime<Utc>,
    pub last_update_at: DateTime<Utc>,
    pub status: BusStatus,
}

impl Bus {
    /// Construct the initial record for a `busId` seen for the first time.
    pub fn new(bus_id: impl Into<String>, route_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            bus_id: bus_id.into(),
            route_id: route_id.into(),
            driver_id: None,
            online: false,
            location: None,
            speed: 0.0,
            heading: 0.0,
            last_online_at: now,
            last_update_at: now,
            status: BusStatus::Inactive,
        }
    }

    /// Apply a `driver:toggle` mutation in place.
    pub fn apply_toggle(
        &mut self,
        driver_id: &str,
        route_id: &str,
        online: bool,
        now: DateTime<Utc>,
    ) {
        self.driver_id = Some(driver_id.to_owned());
        self.route_id = route_id.to_owned();
        self.online = online;
        if online {
            self.last_online_at = now;
            if self.status == BusStatus::Inactive {
                self.status = BusStatus::Idle;
            }
        } else {
            self.status = BusStatus::Inactive;
        }
        self.last_update_at = now;
    }

    /// Apply a `driver:move` mutation in place. Caller has already validated ranges.
    pub fn apply_sample(
        &mut self,
        driver_id: &str,
        route_id: &str,
        location: Coordinate,
        speed: f64,
        heading: f64,
        now: DateTime<Utc>,
    ) {
        self.driver_id = Some(driver_id.to_owned());
        self.route_id = route_id.to_owned();
        self.online = true;
        self.location = Some(location);
        self.speed = speed;
        self.heading = heading;
        self.status = if speed > 1.0 { BusStatus::Moving } else { BusStatus::Stopped };
        self.last_online_at = now;
        self.last_update_at = now;
    }

    /// Apply staleness demotion in place. Idempotent: calling this twice with
    /// the same `stale_at` produces the same record.
    pub fn apply_stale(&mut self, stale_at: DateTime<Utc>) {
        self.online = false;
        self.status = BusStatus::Inactive;
        self.last_online_at = stale_at;
    }
}

/// Validated ranges for a driver sample, per §3 invariants.
pub fn speed_in_range(speed: f64) -> bool {
    (0.0..=200.0).contains(&speed)
}

pub fn heading_in_range(heading: f64) -> bool {
    (0.0..360.0).contains(&heading)
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
