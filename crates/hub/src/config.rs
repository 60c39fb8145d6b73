// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: hard-coded defaults below, overridable by env var,
//! overridable again by CLI flag (CLI > env > default), per §6.5.

use std::time::Duration;

/// Tunables for the real-time tracking core.
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "transithub", about = "Real-time bus tracking backend")]
pub struct Config {
    /// Host to bind on.
    #[arg(long, default_value = "127.0.0.1", env = "TRANSITHUB_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 8080, env = "TRANSITHUB_PORT")]
    pub port: u16,

    /// Minimum milliseconds between accepted driver samples (§4.3).
    #[arg(long, default_value_t = 2000, env = "TRANSITHUB_THROTTLE_MIN_INTERVAL_MS")]
    pub throttle_min_interval_ms: i64,

    /// Minimum metres between accepted driver samples (§4.3).
    #[arg(long, default_value_t = 20.0, env = "TRANSITHUB_THROTTLE_MIN_DISTANCE_M")]
    pub throttle_min_distance_m: f64,

    /// Seconds of silence before a bus is demoted stale (§4.9).
    #[arg(long, default_value_t = 60, env = "TRANSITHUB_STALE_WINDOW_S")]
    pub stale_window_s: i64,

    /// Cadence of the staleness worker, in seconds (§4.9).
    #[arg(long, default_value_t = 60, env = "TRANSITHUB_STALE_TICK_INTERVAL_S")]
    pub stale_tick_interval_s: u64,

    /// Cadence of the ETA worker, in seconds (§4.10).
    #[arg(long, default_value_t = 10, env = "TRANSITHUB_ETA_TICK_INTERVAL_S")]
    pub eta_tick_interval_s: u64,

    /// EWMA weight applied to the newest speed sample (§4.10).
    #[arg(long, default_value_t = 0.3, env = "TRANSITHUB_ETA_SMOOTHING_ALPHA")]
    pub eta_smoothing_alpha: f64,

    /// Per-socket bounded outbound queue size (§5).
    #[arg(long, default_value_t = 64, env = "TRANSITHUB_SOCKET_OUTBOUND_QUEUE")]
    pub socket_outbound_queue: usize,

    /// Cap on the radius accepted by the near query, in metres (§4.5).
    #[arg(long, default_value_t = 50_000.0, env = "TRANSITHUB_NEAR_RADIUS_MAX_M")]
    pub near_radius_max_m: f64,

    /// HMAC secret used to verify driver identity tokens (§4.1). Required.
    #[arg(long, env = "TRANSITHUB_AUTH_TOKEN_SECRET")]
    pub auth_token_secret: String,

    /// Per-send timeout on socket I/O, in milliseconds (§5).
    #[arg(long, default_value_t = 5000, env = "TRANSITHUB_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: u64,
}

impl Config {
    pub fn throttle_min_interval(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.throttle_min_interval_ms)
    }

    pub fn stale_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.stale_window_s)
    }

    pub fn stale_tick_interval(&self) -> Duration {
        Duration::from_secs(self.stale_tick_interval_s)
    }

    pub fn eta_tick_interval(&self) -> Duration {
        Duration::from_secs(self.eta_tick_interval_s)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
