// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Integration tests for the read API (§4.11, §6.4).
//!
//! Uses `axum_test::TestServer` — no real TCP needed.

use axum_test::TestServer;
use chrono::Utc;

use transithub::domain::Coordinate;
use transithub::store::BusStore;
use transithub::transport::build_router;
use transithub_specs::Fixture;

fn test_server(fixture: &Fixture) -> TestServer {
    let router = build_router(fixture.state.clone());
    TestServer::new(router).expect("failed to create test server")
}

#[tokio::test]
async fn healthz_returns_ok() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let server = test_server(&fixture);

    let resp = server.get("/healthz").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
async fn get_bus_reports_not_found_for_unknown_bus() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let server = test_server(&fixture);

    let resp = server.get("/buses/GHOST").await;
    resp.assert_status_not_found();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"], "BUS_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn get_bus_enriches_with_last_seen() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    fixture.state.store.upsert_sample(
        "D1",
        "BUS001",
        "RT1",
        Coordinate::new(1.0, 2.0),
        10.0,
        90.0,
        now,
    )?;
    let server = test_server(&fixture);

    let resp = server.get("/buses/BUS001").await;
    resp.assert_status_ok();
    let body: serde_json::Value = resp.json();
    assert_eq!(body["busId"], "BUS001");
    assert_eq!(body["lastSeen"]["status"], "very_recent");
    Ok(())
}

#[tokio::test]
async fn list_buses_filters_by_route_and_online() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    fixture
        .state
        .store
        .upsert_sample("D1", "BUS001", "RT1", Coordinate::new(0.0, 0.0), 10.0, 0.0, now)?;
    fixture
        .state
        .store
        .upsert_sample("D2", "BUS002", "RT2", Coordinate::new(0.0, 0.0), 10.0, 0.0, now)?;
    fixture.state.store.upsert_toggle("D1", "BUS001", "RT1", false, now)?;
    let server = test_server(&fixture);

    let resp = server.get("/buses").add_query_param("routeId", "RT2").await;
    resp.assert_status_ok();
    let list: Vec<serde_json::Value> = resp.json();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["busId"], "BUS002");
    Ok(())
}

#[tokio::test]
async fn near_rejects_radius_above_configured_maximum() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let server = test_server(&fixture);

    let resp = server
        .get("/buses/near")
        .add_query_param("lng", 0.0)
        .add_query_param("lat", 0.0)
        .add_query_param("r", 1_000_000.0)
        .await;
    resp.assert_status_bad_request();
    Ok(())
}
