// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for a load run.
//!
//! Values are layered: built-in defaults, then an optional JSON config
//! file, then environment variables, then command-line flags (applied by
//! the binary).

use crate::error::{LoadError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for a load run against the pull request create endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadConfig {
    /// Base URL of the target service (default: http://localhost:8080)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Number of concurrent virtual users (default: 10)
    #[serde(default = "default_vus")]
    pub vus: usize,

    /// Total iterations shared across all virtual users (default: 100)
    #[serde(default = "default_iterations")]
    pub iterations: usize,

    /// Per-request timeout in milliseconds (default: 60000)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Constant author id sent with every request (default: "5")
    #[serde(default = "default_author_id")]
    pub author_id: String,

    /// Constant pull request name sent with every request
    #[serde(default = "default_pull_request_name")]
    pub pull_request_name: String,

    /// Status codes that pass the check (default: 200, 201)
    #[serde(default = "default_accepted_statuses")]
    pub accepted_statuses: Vec<u16>,

    /// Name the check is reported under
    #[serde(default = "default_check_name")]
    pub check_name: String,

    /// Stop claiming new iterations after this many seconds
    #[serde(default)]
    pub max_duration_secs: Option<u64>,

    /// Minimum pass ratio (0.0-1.0) for the run to be considered successful
    #[serde(default)]
    pub min_pass_ratio: Option<f64>,
}

// Default value functions
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_vus() -> usize {
    10
}

fn default_iterations() -> usize {
    100
}

fn default_request_timeout_ms() -> u64 {
    60_000
}

fn default_author_id() -> String {
    "5".to_string()
}

fn default_pull_request_name() -> String {
    "Load test k6".to_string()
}

fn default_accepted_statuses() -> Vec<u16> {
    vec![200, 201]
}

fn default_check_name() -> String {
    "status is 200 or 201".to_string()
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            vus: default_vus(),
            iterations: default_iterations(),
            request_timeout_ms: default_request_timeout_ms(),
            author_id: default_author_id(),
            pull_request_name: default_pull_request_name(),
            accepted_statuses: default_accepted_statuses(),
            check_name: default_check_name(),
            max_duration_secs: None,
            min_pass_ratio: None,
        }
    }
}

impl LoadConfig {
    /// Load a config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| LoadError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| LoadError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override fields from environment variables.
    ///
    /// - `TARGET_BASE_URL`, `VUS`, `ITERATIONS`, `REQUEST_TIMEOUT_MS`
    /// - `AUTHOR_ID`, `PULL_REQUEST_NAME`
    /// - `MAX_DURATION_SECS`, `MIN_PASS_RATIO`
    ///
    /// Unparseable numeric values are ignored.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("TARGET_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = var("VUS").and_then(|v| v.parse().ok()) {
            self.vus = v;
        }
        if let Some(v) = var("ITERATIONS").and_then(|v| v.parse().ok()) {
            self.iterations = v;
        }
        if let Some(v) = var("REQUEST_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.request_timeout_ms = v;
        }
        if let Some(v) = var("AUTHOR_ID") {
            self.author_id = v;
        }
        if let Some(v) = var("PULL_REQUEST_NAME") {
            self.pull_request_name = v;
        }
        if let Some(v) = var("MAX_DURATION_SECS").and_then(|v| v.parse().ok()) {
            self.max_duration_secs = Some(v);
        }
        if let Some(v) = var("MIN_PASS_RATIO").and_then(|v| v.parse().ok()) {
            self.min_pass_ratio = Some(v);
        }
    }

    /// Reject values that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(LoadError::InvalidConfig(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.accepted_statuses.is_empty() {
            return Err(LoadError::InvalidConfig(
                "accepted_statuses must not be empty".to_string(),
            ));
        }
        if let Some(ratio) = self.min_pass_ratio {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(LoadError::InvalidConfig(format!(
                    "min_pass_ratio must be within 0.0-1.0, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    /// Get the per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Get the run duration cap, if any
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }
}
