// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Geo Index (C5, §4.5).
//!
//! Answers "buses within radius R of point P" over the Bus State Store's
//! online snapshots. No separate spatial structure is maintained: at the
//! scale of a single fleet, scanning `list_online()` and ranking by Haversine
//! distance is the straightforward implementation, and it keeps the store the
//! single source of truth rather than a second index that could drift (§6.3
//! notes a spatial index is expected of a production persistence engine;
//! this in-memory store folds that into a linear scan).

use crate::domain::{Bus, Coordinate};
use crate::error::CoreError;
use crate::geo::{haversine_meters, sort_by_distance_then_id, RankedById};
use crate::store::BusStore;

/// Default/maximum result count for a `near` query, per §4.5 and §4.11.
pub const MAX_RESULTS: usize = 50;

/// `near(centerLng, centerLat, radiusMeters, maxResults)` per §4.5.
/// `radius_m` must be in `(0, radius_max_m]`; out-of-range fails with
/// [`CoreError::BadRange`].
pub fn near(
    store: &dyn BusStore,
    center: Coordinate,
    radius_m: f64,
    radius_max_m: f64,
    max_results: usize,
) -> Result<Vec<RankedById<Bus>>, CoreError> {
    if !(radius_m > 0.0 && radius_m <= radius_max_m) {
        return Err(CoreError::BadRange);
    }

    let mut ranked: Vec<RankedById<Bus>> = store
        .list_online()
        .into_iter()
        .filter_map(|bus| {
            let location = bus.location?;
            let distance_m = haversine_meters(center, location);
            (distance_m <= radius_m)
                .then(|| RankedById { id: bus.bus_id.clone(), distance_m, item: bus })
        })
        .collect();

    sort_by_distance_then_id(&mut ranked);
    ranked.truncate(max_results.min(MAX_RESULTS));
    Ok(ranked)
}
