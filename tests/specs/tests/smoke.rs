// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenario tests (§8) driven over real loopback WebSocket/HTTP
//! connections against an in-process server — no subprocess involved.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;

use transithub_specs::{
    connect_driver, connect_passenger, recv_json, send_json, spawn_server, Fixture, RECV_TIMEOUT,
};

// -- S1: toggle online, passengers before and after see it ------------------

#[tokio::test]
async fn s1_toggle_online_reaches_pre_and_post_subscribers() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    let token = fixture.seed_driver_with_assignment("D1", "BUS001", "RT1", now);
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let (_dtx, _drx) = connect_driver(&addr, &token).await?;
    let (mut ptx, mut prx) = connect_passenger(&addr).await?;
    send_json(&mut ptx, &json!({"type": "subscribe:bus", "busId": "BUS001"})).await?;
    // Initial subscribe snapshot: bus not yet created, so nothing is sent
    // until the toggle lands. Drop straight into driving the toggle.

    let (mut dtx, mut drx) = connect_driver(&addr, &token).await?;
    send_json(&mut dtx, &json!({"type": "driver:toggle", "busId": "BUS001", "online": true})).await?;
    let ack = recv_json(&mut drx, RECV_TIMEOUT).await?;
    assert_eq!(ack["type"], "driver:toggle:success");

    let status = recv_json(&mut prx, RECV_TIMEOUT).await?;
    assert_eq!(status["busId"], "BUS001");
    assert_eq!(status["online"], true);

    // A passenger subscribing *after* the toggle also gets online:true.
    let (mut qtx, mut qrx) = connect_passenger(&addr).await?;
    send_json(&mut qtx, &json!({"type": "subscribe:bus", "busId": "BUS001"})).await?;
    let snapshot = recv_json(&mut qrx, RECV_TIMEOUT).await?;
    assert_eq!(snapshot["online"], true);

    Ok(())
}

// -- S2: throttle rejects the too-soon sample --------------------------------

#[tokio::test]
async fn s2_throttle_drops_sample_inside_min_interval() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    let token = fixture.seed_driver_with_assignment("D1", "BUS001", "RT1", now);
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let (mut dtx, mut drx) = connect_driver(&addr, &token).await?;
    let (mut ptx, mut prx) = connect_passenger(&addr).await?;
    send_json(&mut ptx, &json!({"type": "subscribe:bus", "busId": "BUS001"})).await?;

    let t0 = Utc::now();
    send_json(
        &mut dtx,
        &json!({"type": "driver:move", "busId": "BUS001", "lng": 0.0, "lat": 0.0, "speed": 20.0, "heading": 90.0, "ts": t0}),
    )
    .await?;
    let ack1 = recv_json(&mut drx, RECV_TIMEOUT).await?;
    assert_eq!(ack1["type"], "driver:move:success");
    let update1 = recv_json(&mut prx, RECV_TIMEOUT).await?;
    assert_eq!(update1["busId"], "BUS001");

    // 1s later, ~110m away — rejected because minInterval is 2000ms.
    let t1 = t0 + chrono::Duration::seconds(1);
    send_json(
        &mut dtx,
        &json!({"type": "driver:move", "busId": "BUS001", "lng": 0.001, "lat": 0.0, "speed": 20.0, "heading": 90.0, "ts": t1}),
    )
    .await?;

    // 3s later, well past minInterval and far enough away — accepted.
    let t2 = t0 + chrono::Duration::seconds(3);
    send_json(
        &mut dtx,
        &json!({"type": "driver:move", "busId": "BUS001", "lng": 0.002, "lat": 0.0, "speed": 20.0, "heading": 90.0, "ts": t2}),
    )
    .await?;
    let ack2 = recv_json(&mut drx, RECV_TIMEOUT).await?;
    assert_eq!(ack2["type"], "driver:move:success");

    let update2 = recv_json(&mut prx, RECV_TIMEOUT).await?;
    assert_eq!(update2["location"]["lng"], 0.002);

    // No third update should be pending — the middle sample was silently dropped.
    let nothing_more = tokio::time::timeout(Duration::from_millis(300), async {
        transithub_specs::recv_json(&mut prx, Duration::from_millis(300)).await
    })
    .await;
    assert!(nothing_more.is_err() || nothing_more.unwrap().is_err());

    Ok(())
}

// -- S3 (pipeline slice): a direct stale demotion still reaches subscribers --

#[tokio::test]
async fn stale_demotion_broadcasts_to_bus_and_route_subscribers() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    let token = fixture.seed_driver_with_assignment("D1", "BUS001", "RT1", now);
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let (mut dtx, mut drx) = connect_driver(&addr, &token).await?;
    send_json(&mut dtx, &json!({"type": "driver:toggle", "busId": "BUS001", "online": true})).await?;
    recv_json(&mut drx, RECV_TIMEOUT).await?;

    let (mut ptx, mut prx) = connect_passenger(&addr).await?;
    send_json(&mut ptx, &json!({"type": "subscribe:route", "routeId": "RT1"})).await?;
    recv_json(&mut prx, RECV_TIMEOUT).await?; // route:buses snapshot

    // Drive the demotion directly (the real worker cadence is 60s — too slow
    // for a unit-scoped test — but the store/broadcaster pipeline it drives
    // through is identical to the production path).
    fixture.state.store.mark_stale("BUS001", Utc::now())?;

    let status = recv_json(&mut prx, RECV_TIMEOUT).await?;
    assert_eq!(status["busId"], "BUS001");
    assert_eq!(status["online"], false);

    Ok(())
}

// -- S4: near query orders by distance -------------------------------------

#[tokio::test]
async fn s4_near_query_orders_by_distance() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let now = Utc::now();
    fixture.state.store.upsert_sample("D1", "BUS001", "RT1", transithub::domain::Coordinate::new(77.67, 27.49), 10.0, 0.0, now)?;
    fixture.state.store.upsert_sample("D2", "BUS002", "RT1", transithub::domain::Coordinate::new(77.675, 27.49), 10.0, 0.0, now)?;
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let resp = reqwest::get(format!("http://{addr}/buses/near?lng=77.67&lat=27.49&r=1000")).await?;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await?;
    let arr = body.as_array().expect("array");
    assert_eq!(arr[0]["busId"], "BUS001");
    assert!(arr[0]["distanceMeters"].as_f64().expect("number") < 5.0);
    assert_eq!(arr[1]["busId"], "BUS002");

    Ok(())
}

#[tokio::test]
async fn near_query_rejects_out_of_range_radius() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let resp = reqwest::get(format!("http://{addr}/buses/near?lng=0&lat=0&r=60000")).await?;
    assert_eq!(resp.status(), 400);

    Ok(())
}

// -- S6: driver without an active assignment is rejected, store untouched ---

#[tokio::test]
async fn s6_no_active_assignment_rejects_move_without_writing() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let driver = transithub::domain::Driver {
        id: "D2".into(),
        phone: "+1D2".into(),
        role: transithub::domain::Role::Driver,
        credential_hash: "unused".into(),
    };
    fixture.drivers.insert(driver.clone());
    let token = transithub::auth::sign(
        transithub_specs::AUTH_SECRET,
        &driver,
        Utc::now() + chrono::Duration::hours(1),
    );
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let (mut dtx, mut drx) = connect_driver(&addr, &token).await?;
    send_json(
        &mut dtx,
        &json!({"type": "driver:move", "busId": "BUS001", "lng": 0.0, "lat": 0.0, "speed": 10.0, "heading": 0.0, "ts": Utc::now()}),
    )
    .await?;

    let err = recv_json(&mut drx, RECV_TIMEOUT).await?;
    assert_eq!(err["type"], "driver:move:error");
    assert_eq!(err["error"], "NO_ACTIVE_ASSIGNMENT");
    assert!(fixture.state.store.get("BUS001").is_none());

    Ok(())
}

// -- auth handshake ----------------------------------------------------------

#[tokio::test]
async fn invalid_token_rejects_handshake() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let result = connect_driver(&addr, "not-a-real-token").await;
    assert!(result.is_err());

    Ok(())
}

// -- healthz -------------------------------------------------------------

#[tokio::test]
async fn healthz_reports_ok() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    let (addr, _server) = spawn_server(fixture.state.clone()).await?;

    let resp: serde_json::Value = reqwest::get(format!("http://{addr}/healthz")).await?.json().await?;
    assert_eq!(resp["status"], "ok");

    Ok(())
}
