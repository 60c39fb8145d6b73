// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! transithub: the real-time backend of a bus-tracking platform.
//!
//! Drivers stream GPS samples over an authenticated WebSocket; passengers
//! subscribe to live position and status updates for a bus or route over an
//! anonymous one. This crate owns the real-time tracking pipeline: identity
//! verification, assignment gating, location throttling, the canonical bus
//! state store and its change stream, the subscription registry and
//! broadcaster, the staleness and ETA background workers, and the
//! geospatial "near" read API. Administrative CRUD, signup, and TLS
//! termination are external collaborators (see crate root docs in the
//! design ledger).

pub mod assignment_resolver;
pub mod auth;
pub mod broadcaster;
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod geoindex;
pub mod outbound;
pub mod registry;
pub mod route_store;
pub mod session;
pub mod state;
pub mod store;
pub mod transport;
pub mod workers;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::assignment_resolver::InMemoryAssignmentStore;
use crate::auth::InMemoryDriverDirectory;
use crate::config::Config;
use crate::route_store::InMemoryRouteDirectory;
use crate::state::AppState;
use crate::store::memory::InMemoryBusStore;
use crate::store::BusStore;

/// Run the tracking backend until a shutdown signal is received.
///
/// Wires the root [`AppState`], spawns the change-stream consumer (C7) and
/// the two background workers (C10, C11), then serves the router with
/// graceful shutdown (§4.0, §5).
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let shutdown = CancellationToken::new();

    let config = Arc::new(config);
    let store: Arc<dyn BusStore> = Arc::new(InMemoryBusStore::new());
    let assignments = Arc::new(InMemoryAssignmentStore::new());
    let routes = Arc::new(InMemoryRouteDirectory::new());
    let drivers = Arc::new(InMemoryDriverDirectory::new());

    let state = Arc::new(AppState::new(
        Arc::clone(&config),
        Arc::clone(&store),
        assignments,
        routes.clone(),
        drivers,
    ));

    let change_rx = store.subscribe_change_stream();
    Arc::clone(&state.broadcaster).spawn(change_rx, shutdown.clone());

    workers::staleness::spawn(
        Arc::clone(&store),
        config.stale_tick_interval(),
        config.stale_window(),
        shutdown.clone(),
    );
    workers::eta::spawn(
        Arc::clone(&store),
        routes,
        Arc::clone(&state.broadcaster),
        config.eta_tick_interval(),
        config.eta_smoothing_alpha,
        shutdown.clone(),
    );

    let router = transport::build_router(Arc::clone(&state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "transithub listening");

    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal(shutdown)).await?;
    Ok(())
}

/// Resolve once either a process signal (Ctrl-C / SIGTERM) arrives or the
/// token is cancelled directly (tests), then cancel the token so every
/// background loop stops cooperatively (§5).
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        else {
            return;
        };
        sig.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = token.cancelled() => {}
    }
    token.cancel();
}
