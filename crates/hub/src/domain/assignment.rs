// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operator-facing status of a shift binding. Independent of `active`: the
/// core only ever gates on `active` plus the shift window, but downstream
/// admin listings also read `status` (see resolver tie-break notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

/// A time-bounded binding of a driver to a bus on a route.
///
/// Created and destroyed by the administrative CRUD surface, which is out of
/// scope for this core; the core only reads assignments to gate driver
/// ingress (§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub driver_id: String,
    pub bus_id: String,
    pub route_id: String,
    pub shift_start: DateTime<Utc>,
    pub shift_end: DateTime<Utc>,
    pub status: AssignmentStatus,
    pub active: bool,
}

impl Assignment {
    /// Whether this assignment is the "current" one at `now`: active and
    /// inside its shift window (inclusive on both ends).
    pub fn covers(&self, now: DateTime<Utc>) -> bool {
        self.active && self.shift_start <= now && now <= self.shift_end
    }

    /// Whether the assignment satisfies the data-model invariant
    /// `shiftEnd > shiftStart`.
    pub fn is_valid(&self) -> bool {
        self.shift_end > self.shift_start
    }
}
