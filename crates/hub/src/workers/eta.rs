// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ETA Worker (C11, §4.10).
//!
//! "Next stop" is resolved as the stop closest to the bus's current location
//! by straight-line distance, per the open question recorded in the crate's
//! design notes: the source's own nearest-stop logic never guarantees the
//! stop is still ahead of the bus, so this worker accepts the same
//! limitation rather than attempting route-progress inference the source
//! itself doesn't have.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::broadcaster::Broadcaster;
use crate::domain::{Bus, Route};
use crate::geo::haversine_meters;
use crate::outbound::OutboundEvent;
use crate::route_store::RouteDirectory;
use crate::store::BusStore;

const SPEED_FLOOR_KMH: f64 = 1.0;

/// Spawn the ETA worker, ticking every `tick_interval` until `cancel` fires.
#[allow(clippy::too_many_arguments)]
pub fn spawn(
    store: Arc<dyn BusStore>,
    routes: Arc<dyn RouteDirectory>,
    broadcaster: Arc<Broadcaster>,
    tick_interval: Duration,
    smoothing_alpha: f64,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.tick().await;
        // Smoothed speed per bus, owned exclusively by this task — no other
        // task reads or writes it, so a plain local avoids an unneeded lock.
        let mut smoothed: HashMap<String, f64> = HashMap::new();

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => run_once(
                    store.as_ref(),
                    routes.as_ref(),
                    &broadcaster,
                    smoothing_alpha,
                    &mut smoothed,
                ),
            }
        }
    })
}

fn run_once(
    store: &dyn BusStore,
    routes: &dyn RouteDirectory,
    broadcaster: &Broadcaster,
    alpha: f64,
    smoothed: &mut HashMap<String, f64>,
) {
    let online = store.list_online();
    let online_ids: HashSet<&str> = online.iter().map(|b| b.bus_id.as_str()).collect();
    smoothed.retain(|bus_id, _| online_ids.contains(bus_id.as_str()));

    for bus in &online {
        let Some(location) = bus.location else { continue };
        let Some(route) = routes.get(&bus.route_id) else { continue };
        if route.stops.is_empty() {
            continue;
        }

        let Some((closest_index, distance_m)) = closest_stop(&route, location) else { continue };
        let next_stop = &route.stops[closest_index];

        let prev = *smoothed.entry(bus.bus_id.clone()).or_insert(bus.speed);
        let smoothed_speed = (alpha * bus.speed + (1.0 - alpha) * prev).max(SPEED_FLOOR_KMH);
        smoothed.insert(bus.bus_id.clone(), smoothed_speed);

        let eta_minutes = ((distance_m / 1000.0) / (smoothed_speed / 60.0)).ceil().max(1.0) as i64;
        let route_progress = closest_index as f64 / (route.stops.len().saturating_sub(1)).max(1) as f64;
        let now = Utc::now();

        let payload = json!({
            "type": "eta:update",
            "busId": bus.bus_id,
            "routeId": bus.route_id,
            "nextStop": {
                "stopId": next_stop.id,
                "name": next_stop.name,
                "distance": distance_m,
                "eta": eta_minutes,
            },
            "routeProgress": route_progress,
            "estimatedArrival": now + chrono::Duration::minutes(eta_minutes),
            "timestamp": now,
        });

        broadcaster.deliver_to_rooms(
            &bus.bus_id,
            &bus.route_id,
            OutboundEvent::EtaUpdate { bus_id: bus.bus_id.clone(), payload },
        );
    }
}

/// Index and straight-line distance (m) of the stop nearest `location`.
fn closest_stop(route: &Route, location: crate::domain::Coordinate) -> Option<(usize, f64)> {
    route
        .stops
        .iter()
        .map(|stop| haversine_meters(location, stop.location))
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
}
