// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only route/stop geometry, as the admin CRUD surface (out of scope,
//! §1) would expose it to the ETA worker (C11).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::Route;

pub trait RouteDirectory: Send + Sync {
    fn get(&self, route_id: &str) -> Option<Route>;
}

#[derive(Default)]
pub struct InMemoryRouteDirectory {
    routes: RwLock<HashMap<String, Route>>,
}

impl InMemoryRouteDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, route: Route) {
        self.routes.write().unwrap_or_else(|e| e.into_inner()).insert(route.id.clone(), route);
    }
}

impl RouteDirectory for InMemoryRouteDirectory {
    fn get(&self, route_id: &str) -> Option<Route> {
        self.routes.read().unwrap_or_else(|e| e.into_inner()).get(route_id).cloned()
    }
}
