// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Named status check and per-iteration outcomes.

use serde::{Deserialize, Serialize};

/// A named assertion on the response status.
#[derive(Debug, Clone)]
pub struct StatusCheck {
    name: String,
    accepted: Vec<u16>,
}

impl StatusCheck {
    pub fn new(name: impl Into<String>, accepted: Vec<u16>) -> Self {
        Self {
            name: name.into(),
            accepted,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True iff `status` is exactly one of the accepted codes.
    pub fn passes(&self, status: u16) -> bool {
        self.accepted.contains(&status)
    }
}

impl Default for StatusCheck {
    fn default() -> Self {
        Self::new("status is 200 or 201", vec![200, 201])
    }
}

/// Kind of transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Other,
}

impl TransportErrorKind {
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect
        } else {
            Self::Other
        }
    }
}

impl std::fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "request timed out"),
            Self::Connect => write!(f, "connection failed"),
            Self::Other => write!(f, "transport error"),
        }
    }
}

/// Outcome of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Response status was accepted
    Passed { status: u16 },
    /// Response arrived with a status outside the accepted set
    UnexpectedStatus {
        status: u16,
        /// Error code from the service's JSON error body, if any
        error_code: Option<String>,
    },
    /// No response was received
    Transport { kind: TransportErrorKind },
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, Self::Passed { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Passed { status } | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Transport { .. } => None,
        }
    }
}

/// Error body returned by the service: `{"error": {"code", "message"}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceErrorResponse {
    pub error: ServiceError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Extract the error code from a response body, ignoring anything malformed.
pub fn parse_error_code(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ServiceErrorResponse>(body)
        .ok()
        .map(|resp| resp.error.code)
}
