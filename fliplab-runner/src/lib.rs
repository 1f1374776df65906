//! FlipLab Runner: experiment orchestration on top of `fliplab-core`.
//!
//! This crate provides:
//! - Multi-trial experiments with deterministic per-trial seeding, on rayon
//! - Welford running statistics and interval-return statistics
//! - CSV interval streams and JSON experiment reports

pub mod experiment;
pub mod report;
pub mod stats;

pub use experiment::{
    run_experiment, run_experiment_with_progress, run_trial, summarize, ExperimentConfig,
    ExperimentError, ExperimentSummary, SuccessSummary, TrialOutcome,
};
pub use report::{read_summary, summary_json, write_summary, CsvIntervalWriter};
pub use stats::{IntervalStats, MetricSummary, RunningStats};
