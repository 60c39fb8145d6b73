// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Root application state (§9 design note: no process-wide mutable state —
//! every shared value is owned here and handed out as an `Arc`).

use std::sync::Arc;

use crate::assignment_resolver::AssignmentStore;
use crate::auth::DriverDirectory;
use crate::broadcaster::Broadcaster;
use crate::config::Config;
use crate::registry::SubscriptionRegistry;
use crate::route_store::RouteDirectory;
use crate::store::BusStore;
use crate::throttle::LocationThrottle;

/// Everything a connection handler or HTTP route needs, behind `Arc`s so it
/// can be cloned cheaply into every task.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn BusStore>,
    pub throttle: Arc<LocationThrottle>,
    pub registry: Arc<SubscriptionRegistry>,
    pub broadcaster: Arc<Broadcaster>,
    pub assignments: Arc<dyn AssignmentStore>,
    pub routes: Arc<dyn RouteDirectory>,
    pub drivers: Arc<dyn DriverDirectory>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn BusStore>,
        assignments: Arc<dyn AssignmentStore>,
        routes: Arc<dyn RouteDirectory>,
        drivers: Arc<dyn DriverDirectory>,
    ) -> Self {
        let throttle = Arc::new(LocationThrottle::new(
            config.throttle_min_interval(),
            config.throttle_min_distance_m,
        ));
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&registry)));

        Self { config, store, throttle, registry, broadcaster, assignments, routes, drivers }
    }
}
