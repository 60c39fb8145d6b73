// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Staleness Worker (C10, §4.9).

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::store::BusStore;

/// Spawn the staleness worker, ticking every `tick_interval` until `cancel`
/// fires. For each online bus whose `lastUpdateAt` predates `now - stale_window`,
/// demotes it via [`BusStore::mark_stale`] (idempotent, §4.4/§8 property 7).
pub fn spawn(
    store: Arc<dyn BusStore>,
    tick_interval: Duration,
    stale_window: chrono::Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        // The first tick fires immediately; skip it so a freshly started
        // process doesn't demote buses before any sample has had a chance
        // to arrive within the window.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => run_once(store.as_ref(), stale_window),
            }
        }
    })
}

fn run_once(store: &dyn BusStore, stale_window: chrono::Duration) {
    let now = Utc::now();
    let cutoff = now - stale_window;

    for bus in store.list_online() {
        if bus.last_update_at < cutoff {
            match store.mark_stale(&bus.bus_id, bus.last_update_at) {
                Ok(_) => tracing::debug!(bus_id = %bus.bus_id, "demoted stale bus"),
                Err(err) => {
                    tracing::warn!(bus_id = %bus.bus_id, %err, "failed to demote stale bus, will retry next tick")
                }
            }
        }
    }
}
