// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Virtual user pool.
//!
//! Each virtual user is a tokio task that claims iteration indices from a
//! shared atomic budget until it is exhausted, so the run issues exactly the
//! configured number of requests however the work ends up split between
//! tasks. Results flow to a single collector over a channel.

use crate::config::LoadConfig;
use crate::generator::{IterationRecord, RequestGenerator};
use crate::metrics::{Outcome, RunMetrics, RunReport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Iterations shared by all virtual users.
#[derive(Debug)]
struct IterationBudget {
    next: AtomicUsize,
    total: usize,
    deadline: Option<Instant>,
    stop: Arc<AtomicBool>,
}

impl IterationBudget {
    /// Claim the next iteration index, or `None` once the run is over.
    fn claim(&self) -> Option<usize> {
        if self.stop.load(Ordering::Relaxed) {
            return None;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return None;
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        (idx < self.total).then_some(idx)
    }
}

/// Handle that stops a run from outside. In-flight requests still complete.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs a fixed iteration budget across a pool of virtual users.
pub struct Runner {
    generator: Arc<RequestGenerator>,
    vus: usize,
    iterations: usize,
    max_duration: Option<Duration>,
    stop: StopHandle,
}

impl Runner {
    pub fn new(generator: RequestGenerator, config: &LoadConfig) -> Self {
        Self {
            generator: Arc::new(generator),
            vus: config.vus,
            iterations: config.iterations,
            max_duration: config.max_duration(),
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Number of tasks actually spawned: at least one, never more than the
    /// iteration budget (so none for an empty budget).
    pub fn effective_vus(&self) -> usize {
        self.vus.max(1).min(self.iterations)
    }

    /// Run to completion and summarize.
    pub async fn run(&self) -> RunReport {
        let mut metrics = RunMetrics::new(self.generator.check().name());
        let vus = self.effective_vus();

        info!(
            endpoint = %self.generator.endpoint(),
            vus,
            iterations = self.iterations,
            max_duration_secs = ?self.max_duration.map(|d| d.as_secs()),
            "Starting load run"
        );

        metrics.start();

        let budget = Arc::new(IterationBudget {
            next: AtomicUsize::new(0),
            total: self.iterations,
            // A cap too large to represent is no cap.
            deadline: self
                .max_duration
                .and_then(|d| Instant::now().checked_add(d)),
            stop: self.stop.0.clone(),
        });

        let (tx, rx) = mpsc::unbounded_channel();
        let handles: Vec<_> = (0..vus)
            .map(|vu| {
                let generator = self.generator.clone();
                let budget = budget.clone();
                let tx = tx.clone();
                tokio::spawn(virtual_user(vu, generator, budget, tx))
            })
            .collect();
        drop(tx);

        collect(rx, handles, &mut metrics).await;

        metrics.finish();
        let report = metrics.report();

        info!(
            iterations = report.total_iterations,
            passed = report.passed,
            failed = report.failed,
            failed_vus = report.failed_vus,
            pass_ratio = report.pass_ratio,
            duration_ms = report.duration_ms,
            stopped_early = report.total_iterations < self.iterations,
            "Load run finished"
        );

        report
    }
}

/// Drain records until every sender is gone, then join the tasks.
///
/// A task that panicked is logged and counted; the records it sent before
/// failing are kept.
async fn collect(
    mut rx: mpsc::UnboundedReceiver<IterationRecord>,
    handles: Vec<JoinHandle<()>>,
    metrics: &mut RunMetrics,
) {
    while let Some(record) = rx.recv().await {
        metrics.record(&record);
    }

    for (vu, handle) in handles.into_iter().enumerate() {
        if let Err(err) = handle.await {
            error!(vu, error = %err, "Virtual user task failed");
            metrics.record_vu_failure();
        }
    }
}

async fn virtual_user(
    vu: usize,
    generator: Arc<RequestGenerator>,
    budget: Arc<IterationBudget>,
    tx: mpsc::UnboundedSender<IterationRecord>,
) {
    // Log each kind of failure once per virtual user.
    let mut reported: HashSet<Outcome> = HashSet::new();

    while let Some(iteration) = budget.claim() {
        let record = generator.iterate(vu, iteration).await;

        let outcome = Outcome::from(&record.outcome);
        if outcome != Outcome::Passed && reported.insert(outcome) {
            warn!(
                vu,
                iteration,
                pull_request_id = %record.pull_request_id,
                outcome = ?record.outcome,
                "Check failed"
            );
        }

        if tx.send(record).is_err() {
            break;
        }
    }
}
