// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Near Query / read API (C12, §4.11, §6.4).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Bus, Coordinate};
use crate::error::CoreError;
use crate::geoindex::{self, MAX_RESULTS};
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: usize = 50;
const MAX_LIST_LIMIT: usize = 200;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /healthz`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Deserialize)]
pub struct NearQuery {
    pub lng: f64,
    pub lat: f64,
    pub r: f64,
}

#[derive(Debug, Serialize)]
pub struct NearResult {
    #[serde(flatten)]
    pub bus: BusWithLastSeen,
    #[serde(rename = "distanceMeters")]
    pub distance_meters: f64,
}

/// `GET /buses/near?lng=&lat=&r=` (§4.11): each result is enriched with the
/// same `lastSeen` descriptor as `GET /buses/{busId}`.
pub async fn near(State(state): State<Arc<AppState>>, Query(query): Query<NearQuery>) -> impl IntoResponse {
    let center = Coordinate::new(query.lng, query.lat);
    match geoindex::near(state.store.as_ref(), center, query.r, state.config.near_radius_max_m, MAX_RESULTS) {
        Ok(ranked) => Json(
            ranked
                .into_iter()
                .map(|r| NearResult { bus: with_last_seen(r.item), distance_meters: r.distance_m })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => err.to_http_response("invalid radius").into_response(),
    }
}

/// `GET /buses/{busId}` (§6.4).
pub async fn get_bus(State(state): State<Arc<AppState>>, Path(bus_id): Path<String>) -> impl IntoResponse {
    match state.store.get(&bus_id) {
        Some(bus) => Json(with_last_seen(bus)).into_response(),
        None => CoreError::BusNotFound.to_http_response("bus not found").into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub online: Option<bool>,
    #[serde(rename = "routeId")]
    pub route_id: Option<String>,
    pub limit: Option<usize>,
}

/// `GET /buses?online=&routeId=&limit=` (§6.4).
pub async fn list_buses(State(state): State<Arc<AppState>>, Query(query): Query<ListQuery>) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);

    let buses: Vec<_> = state
        .store
        .list_all()
        .into_iter()
        .filter(|b| query.online.is_none_or(|want| b.online == want))
        .filter(|b| query.route_id.as_deref().is_none_or(|rid| b.route_id == rid))
        .take(limit)
        .map(with_last_seen)
        .collect();

    Json(buses)
}

#[derive(Debug, Serialize)]
pub struct LastSeen {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "minutesAgo")]
    pub minutes_ago: i64,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BusWithLastSeen {
    #[serde(flatten)]
    pub bus: Bus,
    #[serde(rename = "lastSeen")]
    pub last_seen: LastSeen,
}

/// Enrich a snapshot with the `lastSeen` descriptor from §4.11.
fn with_last_seen(bus: Bus) -> BusWithLastSeen {
    let timestamp = bus.last_update_at.max(bus.last_online_at);
    let minutes_ago = (Utc::now() - timestamp).num_minutes();
    let status = if minutes_ago < 0 {
        "unknown"
    } else if minutes_ago < 5 {
        "very_recent"
    } else if minutes_ago < 30 {
        "recent"
    } else if minutes_ago < 120 {
        "moderate"
    } else {
        "old"
    };

    BusWithLastSeen { bus, last_seen: LastSeen { timestamp, minutes_ago, status } }
}
