// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Location Throttle (C3, §4.3).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::Coordinate;
use crate::geo::haversine_meters;

struct Entry {
    accepted_at: DateTime<Utc>,
    accepted_coord: Coordinate,
}

/// Per-driver filter eliminating samples too close in time or space to the
/// last accepted one. Process-local and non-durable: after a restart the
/// first sample from any driver is always accepted (§4.3 rationale).
pub struct LocationThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    last_accepted: Mutex<HashMap<String, Entry>>,
}

impl LocationThrottle {
    pub fn new(min_interval: Duration, min_distance_m: f64) -> Self {
        Self { min_interval, min_distance_m, last_accepted: Mutex::new(HashMap::new()) }
    }

    /// Decide whether to accept a sample at `coord`/`client_ts` for
    /// `driver_id`, and atomically record it as the new baseline if accepted.
    pub fn should_accept(
        &self,
        driver_id: &str,
        coord: Coordinate,
        client_ts: DateTime<Utc>,
    ) -> bool {
        let mut guard = self.last_accepted.lock().unwrap_or_else(|e| e.into_inner());

        let accept = match guard.get(driver_id) {
            None => true,
            Some(prev) => {
                client_ts - prev.accepted_at >= self.min_interval
                    && haversine_meters(prev.accepted_coord, coord) >= self.min_distance_m
            }
        };

        if accept {
            guard.insert(driver_id.to_owned(), Entry { accepted_at: client_ts, accepted_coord: coord });
        }
        accept
    }

    /// Evict a driver's throttle state, e.g. on disconnect (§4.3, §4.7).
    pub fn evict(&self, driver_id: &str) {
        self.last_accepted.lock().unwrap_or_else(|e| e.into_inner()).remove(driver_id);
    }
}
