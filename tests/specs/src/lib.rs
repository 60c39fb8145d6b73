// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box test harness for end-to-end scenarios (§8).
//!
//! Builds a real [`AppState`] wired to in-memory backing stores, spawns it
//! behind a loopback `axum::serve` task (no subprocess), and exposes small
//! WebSocket/HTTP helpers so scenario tests read close to the specification
//! prose in §8.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use transithub::assignment_resolver::{AssignmentStore, InMemoryAssignmentStore};
use transithub::auth::{DriverDirectory, InMemoryDriverDirectory};
use transithub::config::Config;
use transithub::domain::{Assignment, AssignmentStatus, Driver, Role, Route};
use transithub::route_store::{InMemoryRouteDirectory, RouteDirectory};
use transithub::state::AppState;
use transithub::store::memory::InMemoryBusStore;
use transithub::store::BusStore;

pub const AUTH_SECRET: &str = "test-secret";
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// Seeds and wires a fresh [`AppState`] for a single test, mirroring the
/// CLI flags a real deployment would pass (§6.5), fixed to values that make
/// scenario timing deterministic.
pub struct Fixture {
    pub state: Arc<AppState>,
    pub drivers: Arc<InMemoryDriverDirectory>,
    pub assignments: Arc<InMemoryAssignmentStore>,
    pub routes: Arc<InMemoryRouteDirectory>,
    /// Cancelled on drop's moral equivalent — tests don't need to stop the
    /// broadcaster consumer explicitly, but scenarios that spawn the
    /// staleness/ETA workers with [`Fixture::spawn_workers`] can shut them
    /// down via this token.
    pub shutdown: CancellationToken,
}

impl Fixture {
    pub fn new() -> Self {
        let config = Arc::new(test_config());
        let store: Arc<dyn BusStore> = Arc::new(InMemoryBusStore::new());
        let assignments = Arc::new(InMemoryAssignmentStore::new());
        let routes = Arc::new(InMemoryRouteDirectory::new());
        let drivers = Arc::new(InMemoryDriverDirectory::new());

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&store),
            Arc::clone(&assignments) as Arc<dyn AssignmentStore>,
            Arc::clone(&routes) as Arc<dyn RouteDirectory>,
            Arc::clone(&drivers) as Arc<dyn DriverDirectory>,
        ));

        let shutdown = CancellationToken::new();
        // The production binary wires this same change-stream -> broadcaster
        // consumer in `transithub::run`; black-box tests need it too, or a
        // passenger subscribed to a bus would only ever see the initial
        // subscribe-time snapshot.
        Arc::clone(&state.broadcaster).spawn(store.subscribe_change_stream(), shutdown.clone());

        Self { state, drivers, assignments, routes, shutdown }
    }

    /// Start the staleness and ETA workers at the given cadence, for
    /// scenarios that exercise their real tick-driven behavior rather than
    /// calling into the store directly.
    pub fn spawn_workers(&self, tick_interval: Duration, stale_window: chrono::Duration, eta_alpha: f64) {
        transithub::workers::staleness::spawn(
            self.state.store.clone(),
            tick_interval,
            stale_window,
            self.shutdown.clone(),
        );
        transithub::workers::eta::spawn(
            self.state.store.clone(),
            self.state.routes.clone(),
            Arc::clone(&self.state.broadcaster),
            tick_interval,
            eta_alpha,
            self.shutdown.clone(),
        );
    }

    /// Register a driver and an assignment covering `now`, returning a
    /// signed token for that driver (§4.1, §4.2).
    pub fn seed_driver_with_assignment(
        &self,
        driver_id: &str,
        bus_id: &str,
        route_id: &str,
        now: DateTime<Utc>,
    ) -> String {
        let driver = Driver {
            id: driver_id.to_owned(),
            phone: format!("+1{driver_id}"),
            role: Role::Driver,
            credential_hash: "unused".into(),
        };
        self.drivers.insert(driver.clone());
        self.assignments.insert(Assignment {
            id: format!("A-{driver_id}-{bus_id}"),
            driver_id: driver_id.to_owned(),
            bus_id: bus_id.to_owned(),
            route_id: route_id.to_owned(),
            shift_start: now - chrono::Duration::hours(1),
            shift_end: now + chrono::Duration::hours(8),
            status: AssignmentStatus::Active,
            active: true,
        });
        transithub::auth::sign(AUTH_SECRET, &driver, now + chrono::Duration::hours(8))
    }

    pub fn insert_route(&self, route: Route) {
        self.routes.insert(route);
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

fn test_config() -> Config {
    use clap::Parser;
    Config::parse_from([
        "transithub",
        "--auth-token-secret",
        AUTH_SECRET,
        "--throttle-min-interval-ms",
        "2000",
        "--throttle-min-distance-m",
        "20",
        "--stale-window-s",
        "60",
    ])
}

/// Spawn the real router on a loopback port, returning its address and the
/// server task's join handle.
pub async fn spawn_server(state: Arc<AppState>) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let router = transithub::transport::build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok((addr, handle))
}

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsTx = futures_util::stream::SplitSink<WsStream, WsMessage>;
pub type WsRx = futures_util::stream::SplitStream<WsStream>;

pub async fn connect_driver(addr: &SocketAddr, token: &str) -> anyhow::Result<(WsTx, WsRx)> {
    let url = format!("ws://{addr}/ws/driver?token={token}");
    let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
    Ok(stream.split())
}

pub async fn connect_passenger(addr: &SocketAddr) -> anyhow::Result<(WsTx, WsRx)> {
    let url = format!("ws://{addr}/ws/passenger");
    let (stream, _) = tokio_tungstenite::connect_async(&url).await?;
    Ok(stream.split())
}

pub async fn send_json(tx: &mut WsTx, value: &serde_json::Value) -> anyhow::Result<()> {
    tx.send(WsMessage::Text(serde_json::to_string(value)?.into())).await?;
    Ok(())
}

pub async fn recv_json(rx: &mut WsRx, timeout: Duration) -> anyhow::Result<serde_json::Value> {
    let msg = tokio::time::timeout(timeout, rx.next())
        .await?
        .ok_or_else(|| anyhow::anyhow!("ws stream ended"))??;
    match msg {
        WsMessage::Text(text) => Ok(serde_json::from_str(&text)?),
        other => anyhow::bail!("expected text ws message, got: {other:?}"),
    }
}
