// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Aggregation of iteration results into an end-of-run summary.

use crate::check::{CheckOutcome, TransportErrorKind};
use crate::generator::IterationRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Collects iteration results during a run.
#[derive(Debug, Default)]
pub struct RunMetrics {
    /// Name of the check being aggregated
    check_name: String,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    /// Count of iterations by outcome
    outcomes: HashMap<Outcome, usize>,
    /// Count of responses by HTTP status
    status_codes: HashMap<u16, usize>,
    /// Count of failed responses by service error code
    error_codes: HashMap<String, usize>,
    /// Count of iterations by virtual user
    iterations_per_vu: HashMap<usize, usize>,
    /// Latency samples (microseconds)
    latencies: Vec<u64>,
    /// Virtual user tasks that ended abnormally
    failed_vus: usize,
}

/// Possible outcomes for an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Passed,
    UnexpectedStatus,
    Timeout,
    ConnectError,
    TransportError,
}

impl From<&CheckOutcome> for Outcome {
    fn from(outcome: &CheckOutcome) -> Self {
        match outcome {
            CheckOutcome::Passed { .. } => Self::Passed,
            CheckOutcome::UnexpectedStatus { .. } => Self::UnexpectedStatus,
            CheckOutcome::Transport { kind } => match kind {
                TransportErrorKind::Timeout => Self::Timeout,
                TransportErrorKind::Connect => Self::ConnectError,
                TransportErrorKind::Other => Self::TransportError,
            },
        }
    }
}

impl RunMetrics {
    /// Create a new metrics collector for the named check.
    pub fn new(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            ..Self::default()
        }
    }

    /// Mark the start of the run.
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Mark the end of the run.
    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Record an iteration result.
    pub fn record(&mut self, record: &IterationRecord) {
        *self.outcomes.entry(Outcome::from(&record.outcome)).or_insert(0) += 1;
        match &record.outcome {
            CheckOutcome::Passed { status } => {
                *self.status_codes.entry(*status).or_insert(0) += 1;
            }
            CheckOutcome::UnexpectedStatus { status, error_code } => {
                *self.status_codes.entry(*status).or_insert(0) += 1;
                if let Some(code) = error_code {
                    *self.error_codes.entry(code.clone()).or_insert(0) += 1;
                }
            }
            CheckOutcome::Transport { .. } => {}
        }
        *self.iterations_per_vu.entry(record.vu).or_insert(0) += 1;
        self.latencies.push(record.latency.as_micros() as u64);
    }

    /// Record a virtual user task that panicked or was cancelled.
    pub fn record_vu_failure(&mut self) {
        self.failed_vus += 1;
    }

    /// Get total iteration count.
    pub fn total_iterations(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Get count for a specific outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn passed(&self) -> usize {
        self.count(Outcome::Passed)
    }

    pub fn failed(&self) -> usize {
        self.total_iterations() - self.passed()
    }

    /// Get duration of the run.
    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Get iterations per second.
    pub fn iterations_per_second(&self) -> f64 {
        let secs = self.duration().as_secs_f64();
        if secs > 0.0 {
            self.total_iterations() as f64 / secs
        } else {
            0.0
        }
    }

    /// Get pass ratio (passed / total, 0 for an empty run).
    pub fn pass_ratio(&self) -> f64 {
        let total = self.total_iterations();
        if total == 0 {
            return 0.0;
        }
        self.passed() as f64 / total as f64
    }

    /// Get a latency percentile (0.0-1.0) in microseconds.
    pub fn latency_percentile_us(&self, quantile: f64) -> u64 {
        if self.latencies.is_empty() {
            return 0;
        }
        let mut sorted = self.latencies.clone();
        sorted.sort_unstable();
        let idx = (sorted.len() as f64 * quantile) as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    /// Get number of virtual users that completed at least one iteration.
    pub fn active_vus(&self) -> usize {
        self.iterations_per_vu.len()
    }

    /// Generate a summary report.
    pub fn report(&self) -> RunReport {
        RunReport {
            check_name: self.check_name.clone(),
            total_iterations: self.total_iterations(),
            passed: self.passed(),
            failed: self.failed(),
            unexpected_status: self.count(Outcome::UnexpectedStatus),
            timeouts: self.count(Outcome::Timeout),
            connect_errors: self.count(Outcome::ConnectError),
            transport_errors: self.count(Outcome::TransportError),
            status_codes: self.status_codes.iter().map(|(k, v)| (*k, *v)).collect(),
            error_codes: self
                .error_codes
                .iter()
                .map(|(k, v)| (k.clone(), *v))
                .collect(),
            pass_ratio: self.pass_ratio(),
            duration_ms: self.duration().as_millis() as u64,
            iterations_per_second: self.iterations_per_second(),
            median_latency_us: self.latency_percentile_us(0.5),
            p95_latency_us: self.latency_percentile_us(0.95),
            p99_latency_us: self.latency_percentile_us(0.99),
            max_latency_us: self.latencies.iter().copied().max().unwrap_or(0),
            active_vus: self.active_vus(),
            failed_vus: self.failed_vus,
        }
    }
}

/// Summary report of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub check_name: String,
    pub total_iterations: usize,
    pub passed: usize,
    pub failed: usize,
    pub unexpected_status: usize,
    pub timeouts: usize,
    pub connect_errors: usize,
    pub transport_errors: usize,
    pub status_codes: BTreeMap<u16, usize>,
    pub error_codes: BTreeMap<String, usize>,
    pub pass_ratio: f64,
    pub duration_ms: u64,
    pub iterations_per_second: f64,
    pub median_latency_us: u64,
    pub p95_latency_us: u64,
    pub p99_latency_us: u64,
    pub max_latency_us: u64,
    pub active_vus: usize,
    pub failed_vus: usize,
}

impl RunReport {
    /// True when every iteration passed the check (vacuously true when empty).
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// True when the pass ratio meets `min_ratio`.
    pub fn meets(&self, min_ratio: f64) -> bool {
        self.pass_ratio >= min_ratio
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Load Run Report ===")?;
        writeln!(f, "Duration:          {} ms", self.duration_ms)?;
        writeln!(f, "Iterations:        {}", self.total_iterations)?;
        writeln!(f, "Iterations/sec:    {:.2}", self.iterations_per_second)?;
        writeln!(f, "Active VUs:        {}", self.active_vus)?;
        if self.failed_vus > 0 {
            writeln!(f, "Failed VUs:        {}", self.failed_vus)?;
        }
        writeln!(f)?;
        writeln!(f, "--- Checks ---")?;
        let mark = if self.all_passed() { '✓' } else { '✗' };
        writeln!(
            f,
            "{} {}: {:.1}% ({} passed, {} failed)",
            mark,
            self.check_name,
            self.pass_ratio * 100.0,
            self.passed,
            self.failed
        )?;
        writeln!(f)?;
        writeln!(f, "--- Failures ---")?;
        writeln!(f, "Unexpected Status: {}", self.unexpected_status)?;
        writeln!(f, "Timeouts:          {}", self.timeouts)?;
        writeln!(f, "Connect Errors:    {}", self.connect_errors)?;
        writeln!(f, "Other Transport:   {}", self.transport_errors)?;
        if !self.status_codes.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Status Codes ---")?;
            for (status, count) in &self.status_codes {
                writeln!(f, "{:<19}{}", format!("{status}:"), count)?;
            }
        }
        if !self.error_codes.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Service Error Codes ---")?;
            for (code, count) in &self.error_codes {
                writeln!(f, "{:<19}{}", format!("{code}:"), count)?;
            }
        }
        writeln!(f)?;
        writeln!(f, "--- Latency ---")?;
        writeln!(f, "Median:            {} us", self.median_latency_us)?;
        writeln!(f, "P95:               {} us", self.p95_latency_us)?;
        writeln!(f, "P99:               {} us", self.p99_latency_us)?;
        writeln!(f, "Max:               {} us", self.max_latency_us)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(vu: usize, outcome: CheckOutcome, latency_us: u64) -> IterationRecord {
        IterationRecord {
            vu,
            iteration: 0,
            pull_request_id: "PR-1-abcde".to_string(),
            outcome,
            latency: Duration::from_micros(latency_us),
        }
    }

    #[test]
    fn test_metrics_collection() {
        let mut metrics = RunMetrics::new("status is 200 or 201");
        metrics.start();

        metrics.record(&record(0, CheckOutcome::Passed { status: 200 }, 100));
        metrics.record(&record(1, CheckOutcome::Passed { status: 201 }, 150));
        metrics.record(&record(
            1,
            CheckOutcome::UnexpectedStatus {
                status: 409,
                error_code: Some("PR_EXISTS".to_string()),
            },
            50,
        ));
        metrics.record(&record(
            2,
            CheckOutcome::Transport {
                kind: TransportErrorKind::Connect,
            },
            10,
        ));

        metrics.finish();

        assert_eq!(metrics.total_iterations(), 4);
        assert_eq!(metrics.passed(), 2);
        assert_eq!(metrics.failed(), 2);
        assert_eq!(metrics.count(Outcome::ConnectError), 1);
        assert_eq!(metrics.active_vus(), 3);

        let report = metrics.report();
        assert_eq!(report.passed + report.failed, report.total_iterations);
        assert_eq!(report.status_codes.get(&200), Some(&1));
        assert_eq!(report.status_codes.get(&409), Some(&1));
        assert_eq!(report.error_codes.get("PR_EXISTS"), Some(&1));
        assert_eq!(report.max_latency_us, 150);
        assert!(!report.all_passed());
    }

    #[test]
    fn test_pass_ratio() {
        let mut metrics = RunMetrics::new("check");
        for _ in 0..3 {
            metrics.record(&record(0, CheckOutcome::Passed { status: 201 }, 0));
        }
        for _ in 0..7 {
            metrics.record(&record(
                0,
                CheckOutcome::UnexpectedStatus {
                    status: 500,
                    error_code: None,
                },
                0,
            ));
        }

        assert!((metrics.pass_ratio() - 0.3).abs() < 0.01);
        let report = metrics.report();
        assert!(report.meets(0.3));
        assert!(!report.meets(0.5));
    }

    #[test]
    fn test_empty_run() {
        let metrics = RunMetrics::new("check");
        let report = metrics.report();
        assert_eq!(report.total_iterations, 0);
        assert_eq!(report.pass_ratio, 0.0);
        assert_eq!(report.median_latency_us, 0);
        assert!(report.all_passed());
        // Rendering an empty report must not divide by zero.
        assert!(report.to_string().contains("0.0%"));
    }

    #[test]
    fn test_report_display_marks_check() {
        let mut metrics = RunMetrics::new("status is 200 or 201");
        metrics.record(&record(0, CheckOutcome::Passed { status: 201 }, 0));
        let text = metrics.report().to_string();
        assert!(text.contains("✓ status is 200 or 201: 100.0% (1 passed, 0 failed)"));

        metrics.record(&record(
            0,
            CheckOutcome::Transport {
                kind: TransportErrorKind::Timeout,
            },
            0,
        ));
        let text = metrics.report().to_string();
        assert!(text.contains("✗ status is 200 or 201: 50.0%"));
        assert!(text.contains("Timeouts:          1"));
    }

    #[test]
    fn test_report_json_shape() {
        let mut metrics = RunMetrics::new("status is 200 or 201");
        metrics.record(&record(0, CheckOutcome::Passed { status: 201 }, 200));
        metrics.record(&record(
            1,
            CheckOutcome::UnexpectedStatus {
                status: 404,
                error_code: Some("NOT_FOUND".to_string()),
            },
            400,
        ));

        let json = serde_json::to_value(metrics.report()).unwrap();

        assert_eq!(json["check_name"], "status is 200 or 201");
        assert_eq!(json["total_iterations"], 2);
        assert_eq!(json["passed"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(json["unexpected_status"], 1);
        assert_eq!(json["pass_ratio"], 0.5);
        assert_eq!(json["status_codes"]["201"], 1);
        assert_eq!(json["status_codes"]["404"], 1);
        assert_eq!(json["error_codes"]["NOT_FOUND"], 1);
        assert_eq!(json["max_latency_us"], 400);
        assert_eq!(json["active_vus"], 2);
        assert_eq!(json["failed_vus"], 0);
    }
}
