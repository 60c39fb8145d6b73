// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Haversine distance and the "near" ranking shared by the throttle (C3), the
//! geo index (C5), and the ETA worker (C11).

use crate::domain::Coordinate;

/// Earth radius in metres, per §4.3/§4.5.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in metres.
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// A candidate with its precomputed distance from a query point, used to
/// produce the §4.5/§4.11 sort order: ascending distance, ties broken by id.
#[derive(Debug, Clone)]
pub struct RankedById<T> {
    pub id: String,
    pub distance_m: f64,
    pub item: T,
}

/// Sort candidates by ascending distance, breaking ties by lexicographic id.
pub fn sort_by_distance_then_id<T>(items: &mut [RankedById<T>]) {
    items.sort_by(|a, b| {
        a.distance_m
            .partial_cmp(&b.distance_m)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}
