// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Assignment Resolver (C2, §4.2).

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::Assignment;
use crate::error::CoreError;

/// Read-only access to assignments, as the admin CRUD surface (out of scope,
/// §1) would expose them to the core.
pub trait AssignmentStore: Send + Sync {
    /// All assignments binding `driver_id` to `bus_id`, in any order.
    fn for_driver_bus(&self, driver_id: &str, bus_id: &str) -> Vec<Assignment>;
}

/// Resolve the single "current" assignment for `(driver_id, bus_id)` at
/// `now`, per §4.2. If more than one candidate matches (an operator error),
/// the one with the greatest `shift_start` wins; the conflict is logged at
/// warn level, not treated as a resolver error.
pub fn resolve_active(
    store: &dyn AssignmentStore,
    driver_id: &str,
    bus_id: &str,
    now: DateTime<Utc>,
) -> Result<Assignment, CoreError> {
    let candidates: Vec<Assignment> =
        store.for_driver_bus(driver_id, bus_id).into_iter().filter(|a| a.covers(now)).collect();

    if candidates.len() > 1 {
        tracing::warn!(
            driver_id,
            bus_id,
            count = candidates.len(),
            "multiple active assignments matched; picking greatest shift_start"
        );
    }

    candidates.into_iter().max_by_key(|a| a.shift_start).ok_or(CoreError::NoActiveAssignment)
}

/// In-memory assignment store, seeded by the (out-of-scope) admin surface or
/// by tests.
#[derive(Default)]
pub struct InMemoryAssignmentStore {
    assignments: RwLock<HashMap<String, Assignment>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, assignment: Assignment) {
        self.assignments
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(assignment.id.clone(), assignment);
    }
}

impl AssignmentStore for InMemoryAssignmentStore {
    fn for_driver_bus(&self, driver_id: &str, bus_id: &str) -> Vec<Assignment> {
        self.assignments
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|a| a.driver_id == driver_id && a.bus_id == bus_id)
            .cloned()
            .collect()
    }
}
