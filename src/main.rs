// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pull Request Load Generator
//!
//! Sends `POST /pullRequest/create` requests from a pool of virtual users
//! and reports how many passed the status check.
//!
//! ## Configuration
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults (10 VUs, 100 iterations, http://localhost:8080)
//! 2. JSON config file given with `--config`
//! 3. Environment variables (`TARGET_BASE_URL`, `VUS`, `ITERATIONS`,
//!    `REQUEST_TIMEOUT_MS`, `AUTHOR_ID`, `PULL_REQUEST_NAME`,
//!    `MAX_DURATION_SECS`, `MIN_PASS_RATIO`)
//! 4. Command-line flags
//!
//! ## Exit status
//!
//! 0 when the run completes (failed checks included), 99 when
//! `--min-pass-ratio` is set and not met, 1 on setup errors.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pr_loadgen::{
    config::LoadConfig, error::LoadError, generator::RequestGenerator, metrics::RunReport,
    runner::Runner,
};

/// Exit status when the pass ratio threshold is not met.
const THRESHOLD_FAILED_EXIT: u8 = 99;

#[derive(Parser)]
#[command(
    name = "pr-loadgen",
    version,
    about = "Load generator for the pull request create endpoint"
)]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Base URL of the target service
    #[arg(long)]
    base_url: Option<String>,

    /// Number of concurrent virtual users
    #[arg(long)]
    vus: Option<usize>,

    /// Total iterations shared across virtual users
    #[arg(long)]
    iterations: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Author id sent with every request
    #[arg(long)]
    author_id: Option<String>,

    /// Pull request name sent with every request
    #[arg(long)]
    pr_name: Option<String>,

    /// Stop starting new iterations after this many seconds
    #[arg(long)]
    max_duration_secs: Option<u64>,

    /// Fail the run (exit 99) when the pass ratio is below this value
    #[arg(long)]
    min_pass_ratio: Option<f64>,

    /// Write the summary as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

impl Args {
    fn apply(&self, config: &mut LoadConfig) {
        if let Some(v) = &self.base_url {
            config.base_url = v.clone();
        }
        if let Some(v) = self.vus {
            config.vus = v;
        }
        if let Some(v) = self.iterations {
            config.iterations = v;
        }
        if let Some(v) = self.timeout_ms {
            config.request_timeout_ms = v;
        }
        if let Some(v) = &self.author_id {
            config.author_id = v.clone();
        }
        if let Some(v) = &self.pr_name {
            config.pull_request_name = v.clone();
        }
        if let Some(v) = self.max_duration_secs {
            config.max_duration_secs = Some(v);
        }
        if let Some(v) = self.min_pass_ratio {
            config.min_pass_ratio = Some(v);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;
    info!(
        base_url = %config.base_url,
        vus = config.vus,
        iterations = config.iterations,
        request_timeout_ms = config.request_timeout_ms,
        "Loaded configuration"
    );

    let generator = RequestGenerator::new(&config)?;
    let runner = Runner::new(generator, &config);

    // Ctrl-C stops new iterations; the partial report is still printed
    let stop = runner.stop_handle();
    let interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing in-flight requests");
            interrupt.stop();
        }
    });

    let report = runner.run().await;
    if stop.is_stopped() {
        warn!(
            completed = report.total_iterations,
            iterations = config.iterations,
            "Run stopped early, report is partial"
        );
    }
    println!("{report}");

    if let Some(path) = &args.summary_json {
        write_summary(&report, path)?;
        info!(path = %path.display(), "Wrote JSON summary");
    }

    if let Some(min_ratio) = config.min_pass_ratio {
        if !report.meets(min_ratio) {
            warn!(
                pass_ratio = report.pass_ratio,
                min_pass_ratio = min_ratio,
                "Pass ratio threshold not met"
            );
            return Ok(ExitCode::from(THRESHOLD_FAILED_EXIT));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Layer defaults, config file, environment and flags.
fn load_config(args: &Args) -> Result<LoadConfig, LoadError> {
    let mut config = match &args.config {
        Some(path) => LoadConfig::from_file(path)?,
        None => LoadConfig::default(),
    };
    config.apply_env();
    args.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn write_summary(report: &RunReport, path: &Path) -> Result<(), LoadError> {
    let json = serde_json::to_string_pretty(report).map_err(LoadError::SummaryEncode)?;
    std::fs::write(path, json).map_err(|source| LoadError::SummaryWrite {
        path: path.to_path_buf(),
        source,
    })
}
