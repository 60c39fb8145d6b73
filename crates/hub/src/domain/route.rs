// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::domain::bus::Coordinate;

/// A named path with polyline geometry and an ordered sequence of stops.
///
/// Invariant: `polyline` has at least two points; stops are listed in travel
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub polyline: Vec<Coordinate>,
    pub stops: Vec<Stop>,
}

impl Route {
    /// Whether this route satisfies the data-model invariants.
    pub fn is_valid(&self) -> bool {
        self.polyline.len() >= 2 && self.stops.iter().all(|s| s.location.is_valid())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_offset_minutes: Option<u32>,
}
