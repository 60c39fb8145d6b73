// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Passenger Ingress (C9, §4.8). Anonymous WebSocket channel accepting
//! `subscribe:bus`/`subscribe:route` and their symmetric unsubscribes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::broadcaster::{bus_status_payload, route_buses_payload};
use crate::outbound::{FanoutQueue, OutboundEvent};
use crate::registry::SocketId;
use crate::session::PassengerSession;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum PassengerInbound {
    #[serde(rename = "subscribe:bus", rename_all = "camelCase")]
    SubscribeBus { bus_id: String },
    #[serde(rename = "subscribe:route", rename_all = "camelCase")]
    SubscribeRoute { route_id: String },
    #[serde(rename = "unsubscribe:bus", rename_all = "camelCase")]
    UnsubscribeBus { bus_id: String },
    #[serde(rename = "unsubscribe:route", rename_all = "camelCase")]
    UnsubscribeRoute { route_id: String },
}

/// `GET /ws/passenger` — anonymous WebSocket upgrade.
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state)).into_response()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let queue = Arc::new(FanoutQueue::new(state.config.socket_outbound_queue));
    let socket_id = state.registry.register(Arc::clone(&queue));
    let mut session = PassengerSession::new();
    let send_timeout = state.config.send_timeout();

    let (mut ws_tx, mut ws_rx) = socket.split();

    loop {
        tokio::select! {
            outbound = queue.recv() => {
                let Some(event) = outbound else { break };
                let text = serde_json::to_string(&event.into_json()).unwrap_or_default();
                if tokio::time::timeout(send_timeout, ws_tx.send(Message::Text(text.into()))).await.is_err() {
                    tracing::debug!(socket_id, "passenger send timed out, closing");
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_inbound(&text, &state, socket_id, &mut session, &queue);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    state.registry.deregister(socket_id);
}

fn handle_inbound(
    text: &str,
    state: &AppState,
    socket_id: SocketId,
    session: &mut PassengerSession,
    queue: &FanoutQueue,
) {
    let Ok(inbound) = serde_json::from_str::<PassengerInbound>(text) else { return };

    match inbound {
        PassengerInbound::SubscribeBus { bus_id } => {
            state.registry.join_bus(socket_id, &bus_id);
            session.subscribe_bus(bus_id.clone());
            if let Some(bus) = state.store.get(&bus_id) {
                queue.push(OutboundEvent::BusStatus(bus_status_payload(&bus)));
            }
        }
        PassengerInbound::SubscribeRoute { route_id } => {
            state.registry.join_route(socket_id, &route_id);
            session.subscribe_route(route_id.clone());
            let buses = state.store.list_online_on_route(&route_id);
            queue.push(OutboundEvent::RouteBuses(route_buses_payload(&route_id, &buses)));
        }
        PassengerInbound::UnsubscribeBus { bus_id } => {
            state.registry.leave_bus(socket_id, &bus_id);
            session.unsubscribe_bus(&bus_id);
        }
        PassengerInbound::UnsubscribeRoute { route_id } => {
            state.registry.leave_route(socket_id, &route_id);
            session.unsubscribe_route(&route_id);
        }
    }
}
