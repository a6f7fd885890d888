// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pull Request Load Generator
//!
//! Drives synthetic load against the `POST /pullRequest/create` endpoint of
//! the pull request service:
//!
//! - Unique `PR-<epoch ms>-<5 alphanumeric>` id per request
//! - Fixed-shape JSON payload with constant author and name
//! - Named status check (200 or 201 by default)
//! - Pool of virtual users sharing a total iteration budget
//! - End-of-run summary with pass ratio, status breakdown and latency

pub mod check;
pub mod config;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod payload;
pub mod runner;

pub use check::{CheckOutcome, StatusCheck};
pub use config::LoadConfig;
pub use error::{LoadError, Result};
pub use generator::{IterationRecord, RequestGenerator};
pub use metrics::{RunMetrics, RunReport};
pub use runner::{Runner, StopHandle};
