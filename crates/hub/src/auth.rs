// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity Verifier (C1, §4.1).
//!
//! Tokens are opaque to callers but are HMAC-SHA256 signed so the core can
//! trust the `driverId`/`role`/expiry they carry without a round trip to the
//! identity provider. Issuance is out of scope (§1); [`sign`] exists only so
//! tests and local tooling can mint tokens the same way the real issuer would.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::{Driver, Role};
use crate::error::CoreError;

/// Claims carried by a driver identity token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Claims {
    driver_id: String,
    phone: String,
    role: Role,
    /// Expiry, as Unix seconds.
    exp: i64,
}

/// The verified identity handed to driver ingress on a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub driver_id: String,
    pub phone: String,
    pub role: Role,
}

/// Sign a token for `driver`, valid until `expires_at`.
///
/// Not part of the core's runtime surface (issuance is an external
/// collaborator, §1) but kept alongside [`verify`] since both sides must
/// agree on the wire format.
pub fn sign(secret: &str, driver: &Driver, expires_at: DateTime<Utc>) -> String {
    let claims = Claims {
        driver_id: driver.id.clone(),
        phone: driver.phone.clone(),
        role: driver.role,
        exp: expires_at.timestamp(),
    };
    let payload = serde_json::to_vec(&claims).unwrap_or_default();
    let payload_b64 = URL_SAFE_NO_PAD.encode(&payload);

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(tag.as_ref());

    format!("{payload_b64}.{sig_b64}")
}

/// Verify `token`'s signature and expiry, then resolve the driver against
/// `directory`. Expired/malformed tokens fail with [`CoreError::AuthInvalid`];
/// a well-formed, unexpired token naming an unknown driver fails with
/// [`CoreError::AuthUnknown`].
pub fn verify(
    secret: &str,
    token: &str,
    now: DateTime<Utc>,
    directory: &dyn DriverDirectory,
) -> Result<Identity, CoreError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(CoreError::AuthInvalid)?;

    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let sig = URL_SAFE_NO_PAD.decode(sig_b64).map_err(|_| CoreError::AuthInvalid)?;
    hmac::verify(&key, payload_b64.as_bytes(), &sig).map_err(|_| CoreError::AuthInvalid)?;

    let payload = URL_SAFE_NO_PAD.decode(payload_b64).map_err(|_| CoreError::AuthInvalid)?;
    let claims: Claims = serde_json::from_slice(&payload).map_err(|_| CoreError::AuthInvalid)?;

    if claims.exp < now.timestamp() {
        return Err(CoreError::AuthInvalid);
    }

    match directory.find(&claims.driver_id) {
        Some(driver) if driver.phone == claims.phone => {
            Ok(Identity { driver_id: driver.id, phone: driver.phone, role: claims.role })
        }
        Some(_) | None => Err(CoreError::AuthUnknown),
    }
}

/// Read-only directory of known drivers. Driver lifecycle (signup, password
/// hashing, role management) lives entirely in the external identity
/// provider (§1); the core only needs to confirm a token's subject still
/// exists.
pub trait DriverDirectory: Send + Sync {
    fn find(&self, driver_id: &str) -> Option<Driver>;
}

/// In-memory directory, seeded at startup or by tests. Stands in for the
/// external identity provider's read interface.
#[derive(Default)]
pub struct InMemoryDriverDirectory {
    drivers: RwLock<HashMap<String, Driver>>,
}

impl InMemoryDriverDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, driver: Driver) {
        self.drivers.write().unwrap_or_else(|e| e.into_inner()).insert(driver.id.clone(), driver);
    }
}

impl DriverDirectory for InMemoryDriverDirectory {
    fn find(&self, driver_id: &str) -> Option<Driver> {
        self.drivers.read().unwrap_or_else(|e| e.into_inner()).get(driver_id).cloned()
    }
}
