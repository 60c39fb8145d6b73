// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The closed error enum from §7, mapped to HTTP status and to the
//! machine-readable `code` string sent in WS `*:error` payloads and HTTP JSON
//! bodies.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error kinds the core distinguishes, per §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoreError {
    AuthInvalid,
    AuthUnknown,
    NoActiveAssignment,
    InvalidCoord,
    InvalidSpeed,
    InvalidHeading,
    BadRange,
    StoreUnavailable,
    StreamLost,
    QueueOverflow,
    BusNotFound,
    Internal,
}

impl CoreError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::AuthInvalid | Self::AuthUnknown => StatusCode::UNAUTHORIZED,
            Self::NoActiveAssignment => StatusCode::FORBIDDEN,
            Self::InvalidCoord | Self::InvalidSpeed | Self::InvalidHeading | Self::BadRange => {
                StatusCode::BAD_REQUEST
            }
            Self::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::StreamLost | Self::QueueOverflow => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BusNotFound => StatusCode::NOT_FOUND,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthInvalid => "AUTH_INVALID",
            Self::AuthUnknown => "AUTH_UNKNOWN",
            Self::NoActiveAssignment => "NO_ACTIVE_ASSIGNMENT",
            Self::InvalidCoord => "INVALID_COORD",
            Self::InvalidSpeed => "INVALID_SPEED",
            Self::InvalidHeading => "INVALID_HEADING",
            Self::BadRange => "BAD_RANGE",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::StreamLost => "STREAM_LOST",
            Self::QueueOverflow => "QUEUE_OVERFLOW",
            Self::BusNotFound => "BUS_NOT_FOUND",
            Self::Internal => "INTERNAL",
        }
    }

    /// Structured log level this error should be recorded at.
    pub fn log_level(&self) -> tracing::Level {
        match self {
            Self::Internal | Self::StreamLost | Self::QueueOverflow => tracing::Level::ERROR,
            Self::StoreUnavailable | Self::AuthInvalid | Self::AuthUnknown => tracing::Level::WARN,
            _ => tracing::Level::DEBUG,
        }
    }

    /// JSON body shape shared by WS `*:error` payloads and HTTP error
    /// responses: `{"error": "CODE", "message": "..."}`.
    pub fn to_body(&self, message: impl Into<String>) -> ErrorBody {
        ErrorBody { error: self.as_str().to_owned(), message: message.into() }
    }

    pub fn to_http_response(&self, message: impl Into<String>) -> Response {
        (self.http_status(), Json(self.to_body(message))).into_response()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for CoreError {}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        self.to_http_response(self.as_str())
    }
}
