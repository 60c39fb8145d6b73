// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver Ingress (C8, §4.7). WebSocket channel carrying authenticated
//! driver identity from the handshake; accepts `driver:toggle`/`driver:move`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;

use crate::assignment_resolver::resolve_active;
use crate::auth;
use crate::domain::{heading_in_range, speed_in_range, Coordinate};
use crate::error::CoreError;
use crate::outbound::OutboundEvent;
use crate::session::DriverSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DriverQuery {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum DriverInbound {
    #[serde(rename = "driver:toggle", rename_all = "camelCase")]
    Toggle { bus_id: String, online: bool },
    #[serde(rename = "driver:move", rename_all = "camelCase")]
    Move { bus_id: String, lng: f64, lat: f64, speed: f64, heading: f64, ts: DateTime<Utc> },
}

/// `GET /ws/driver?token=` — WebSocket upgrade for a driver connection.
pub async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DriverQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let identity = match auth::verify(
        &state.config.auth_token_secret,
        &query.token,
        Utc::now(),
        state.drivers.as_ref(),
    ) {
        Ok(identity) => identity,
        Err(err) => return err.to_http_response("handshake rejected").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, identity)).into_response()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, identity: auth::Identity) {
    let queue = Arc::new(crate::outbound::FanoutQueue::new(state.config.socket_outbound_queue));
    let socket_id = state.registry.register(Arc::clone(&queue));
    let mut session = DriverSession::new(socket_id, identity);
    let send_timeout = state.config.send_timeout();

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            outbound = queue.recv() => {
                let Some(event) = outbound else { break };
                let text = serde_json::to_string(&event.into_json()).unwrap_or_default();
                if tokio::time::timeout(send_timeout, ws_tx.send(Message::Text(text.into()))).await.is_err() {
                    tracing::debug!(socket_id, "driver send timed out, closing");
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&text, &state, &mut session, &queue).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    disconnect(&state, session).await;
}

async fn handle_inbound(
    text: &str,
    state: &AppState,
    session: &mut DriverSession,
    queue: &crate::outbound::FanoutQueue,
) {
    let Ok(inbound) = serde_json::from_str::<DriverInbound>(text) else {
        queue.push(OutboundEvent::Ack(
            json!({"error": "driver:error", "message": "malformed message"}),
        ));
        return;
    };

    match inbound {
        DriverInbound::Toggle { bus_id, online } => handle_toggle(state, session, queue, bus_id, online).await,
        DriverInbound::Move { bus_id, lng, lat, speed, heading, ts } => {
            handle_move(state, session, queue, bus_id, lng, lat, speed, heading, ts).await
        }
    }
}

/// `driver:toggle` procedure (§4.7).
async fn handle_toggle(
    state: &AppState,
    session: &mut DriverSession,
    queue: &crate::outbound::FanoutQueue,
    bus_id: String,
    online: bool,
) {
    let now = Utc::now();
    let assignment = match resolve_active(state.assignments.as_ref(), session.driver_id(), &bus_id, now) {
        Ok(a) => a,
        Err(err) => {
            queue.push(ack_error("driver:toggle:error", err));
            return;
        }
    };

    match state.store.upsert_toggle(session.driver_id(), &bus_id, &assignment.route_id, online, now) {
        Ok(_) => {
            state.registry.join_bus(session.socket_id, &bus_id);
            state.registry.join_route(session.socket_id, &assignment.route_id);
            session.set_rooms(bus_id.clone(), assignment.route_id.clone());

            queue.push(OutboundEvent::Ack(json!({
                "type": "driver:toggle:success",
                "busId": bus_id,
                "online": online,
                "timestamp": now,
            })));
        }
        Err(err) => queue.push(ack_error("driver:toggle:error", err)),
    };
}

/// `driver:move` procedure (§4.7).
#[allow(clippy::too_many_arguments)]
async fn handle_move(
    state: &AppState,
    session: &mut DriverSession,
    queue: &crate::outbound::FanoutQueue,
    bus_id: String,
    lng: f64,
    lat: f64,
    speed: f64,
    heading: f64,
    ts: DateTime<Utc>,
) {
    let coord = Coordinate::new(lng, lat);
    if !state.throttle.should_accept(session.driver_id(), coord, ts) {
        // Silently dropped: no acknowledgement, no error (§4.7).
        return;
    }

    let now = Utc::now();
    let assignment =
        match resolve_active(state.assignments.as_ref(), session.driver_id(), &bus_id, now) {
            Ok(a) => a,
            Err(err) => {
                queue.push(ack_error("driver:move:error", err));
                return;
            }
        };

    if !coord.is_valid() {
        queue.push(ack_error("driver:move:error", CoreError::InvalidCoord));
        return;
    }
    if !speed_in_range(speed) {
        queue.push(ack_error("driver:move:error", CoreError::InvalidSpeed));
        return;
    }
    if !heading_in_range(heading) {
        queue.push(ack_error("driver:move:error", CoreError::InvalidHeading));
        return;
    }

    match state.store.upsert_sample(
        session.driver_id(),
        &bus_id,
        &assignment.route_id,
        coord,
        speed,
        heading,
        now,
    ) {
        Ok(_) => {
            session.last_bus_id = Some(bus_id.clone());
            queue.push(OutboundEvent::Ack(json!({
                "type": "driver:move:success",
                "busId": bus_id,
                "timestamp": now,
            })));
        }
        Err(err) => queue.push(ack_error("driver:move:error", err)),
    };
}

fn ack_error(event: &str, err: CoreError) -> OutboundEvent {
    OutboundEvent::Ack(json!({"type": event, "error": err.as_str()}))
}

/// Best-effort offline toggle and throttle eviction on disconnect (§4.7).
async fn disconnect(state: &AppState, session: DriverSession) {
    state.registry.deregister(session.socket_id);
    state.throttle.evict(session.driver_id());

    if let Some(bus_id) = session.last_bus_id.as_deref() {
        if let Some(bus) = state.store.get(bus_id) {
            if let Err(err) =
                state.store.upsert_toggle(session.driver_id(), bus_id, &bus.route_id, false, Utc::now())
            {
                tracing::warn!(bus_id, %err, "best-effort offline toggle failed on disconnect");
            }
        }
    }
}
