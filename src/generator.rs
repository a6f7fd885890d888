// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request generator: one iteration is generate id, POST, check status.
//!
//! Failures never propagate out of [`RequestGenerator::iterate`]; they are
//! folded into the returned [`IterationRecord`] so the caller can move on to
//! the next iteration.

use crate::check::{parse_error_code, CheckOutcome, StatusCheck, TransportErrorKind};
use crate::config::LoadConfig;
use crate::error::{LoadError, Result};
use crate::payload::CreatePullRequest;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Path of the create endpoint, relative to the base URL.
pub const CREATE_PATH: &str = "pullRequest/create";

/// Result of a single iteration.
#[derive(Debug, Clone)]
pub struct IterationRecord {
    /// Virtual user that ran the iteration
    pub vu: usize,
    /// Global iteration index (0-based)
    pub iteration: usize,
    /// Identifier sent in the payload
    pub pull_request_id: String,
    pub outcome: CheckOutcome,
    /// Time from send until the response body was read or the request failed
    pub latency: Duration,
}

/// Issues create requests against a fixed endpoint.
#[derive(Debug, Clone)]
pub struct RequestGenerator {
    client: Client,
    endpoint: Url,
    author_id: String,
    pull_request_name: String,
    check: StatusCheck,
}

impl RequestGenerator {
    /// Build a generator with its own HTTP client.
    pub fn new(config: &LoadConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Self::with_client(client, config)
    }

    /// Build a generator around an existing client.
    pub fn with_client(client: Client, config: &LoadConfig) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: create_endpoint(&config.base_url)?,
            author_id: config.author_id.clone(),
            pull_request_name: config.pull_request_name.clone(),
            check: StatusCheck::new(config.check_name.clone(), config.accepted_statuses.clone()),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn check(&self) -> &StatusCheck {
        &self.check
    }

    /// Run one iteration: generate, send, evaluate.
    pub async fn iterate(&self, vu: usize, iteration: usize) -> IterationRecord {
        let payload = CreatePullRequest::generate(&self.author_id, &self.pull_request_name);

        let start = Instant::now();
        let sent = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await;

        let outcome = match sent {
            Ok(response) => {
                let status = response.status().as_u16();
                // Drain the body so the connection goes back to the pool.
                // The check is on status alone, so a failed read still counts.
                let body = match response.bytes().await {
                    Ok(body) => body,
                    Err(err) => {
                        debug!(vu, iteration, status, error = %err, "Failed to read response body");
                        Default::default()
                    }
                };
                if self.check.passes(status) {
                    CheckOutcome::Passed { status }
                } else {
                    CheckOutcome::UnexpectedStatus {
                        status,
                        error_code: parse_error_code(&body),
                    }
                }
            }
            Err(err) => {
                debug!(vu, iteration, error = %err, "Request failed");
                CheckOutcome::Transport {
                    kind: TransportErrorKind::classify(&err),
                }
            }
        };
        let latency = start.elapsed();

        debug!(
            vu,
            iteration,
            pull_request_id = %payload.pull_request_id,
            status = ?outcome.status(),
            passed = outcome.passed(),
            latency_us = latency.as_micros() as u64,
            "Iteration complete"
        );

        IterationRecord {
            vu,
            iteration,
            pull_request_id: payload.pull_request_id,
            outcome,
            latency,
        }
    }
}

/// Resolve `<base_url>/pullRequest/create`.
///
/// A path prefix on the base URL is kept whether or not it ends in `/`.
pub fn create_endpoint(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url.trim()).map_err(|source| LoadError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })?;

    match base.scheme() {
        "http" | "https" => {}
        scheme => return Err(LoadError::UnsupportedScheme(scheme.to_string())),
    }

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(CREATE_PATH).map_err(|source| LoadError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_endpoint() {
        let url = create_endpoint("http://localhost:8080").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pullRequest/create");

        let url = create_endpoint("http://localhost:8080/").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/pullRequest/create");
    }

    #[test]
    fn test_create_endpoint_keeps_prefix() {
        let url = create_endpoint("https://api.example.com/v1").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/pullRequest/create");
    }

    #[test]
    fn test_create_endpoint_rejects_bad_urls() {
        assert!(matches!(
            create_endpoint("not-a-url"),
            Err(LoadError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            create_endpoint("ftp://files.example.com"),
            Err(LoadError::UnsupportedScheme(_))
        ));
    }
}
