// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport: driver ingress (C8), passenger ingress (C9),
//! and the near/read API (C12).

pub mod driver_ws;
pub mod http;
pub mod passenger_ws;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the axum `Router` wiring together the driver socket, the passenger
/// socket, and the read API (§6).
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(http::health))
        .route("/buses/near", get(http::near))
        .route("/buses/{bus_id}", get(http::get_bus))
        .route("/buses", get(http::list_buses))
        .route("/ws/driver", get(driver_ws::ws_handler))
        .route("/ws/passenger", get(passenger_ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
