// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for run setup.
//!
//! Per-iteration failures are never errors; they are recorded as
//! [`crate::check::CheckOutcome`] values.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a load run from starting or its report from being saved.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid base URL {url}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported URL scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to encode summary: {0}")]
    SummaryEncode(serde_json::Error),

    #[error("Failed to write summary to {path}: {source}")]
    SummaryWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LoadError>;
