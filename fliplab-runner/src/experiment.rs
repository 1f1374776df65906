//! Multi-trial experiments: many independent simulations, aggregated.
//!
//! Each trial builds a fresh simulator at parity, seeded from the RNG
//! hierarchy by `(label, trial)`, runs `iterations` flips and records the end
//! state of both portfolios. Trials run on rayon by default; aggregation
//! always folds outcomes in trial order, so parallel and sequential runs
//! produce identical summaries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use fliplab_core::{ConfigError, FlipSimulator, RngHierarchy, SimConfig};

use crate::stats::{IntervalStats, MetricSummary, RunningStats};

// ─── Config types ────────────────────────────────────────────────────

/// Complete experiment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub sim: SimConfig,
    pub trials: usize,
    pub master_seed: u64,
    /// Seed namespace; different labels give unrelated trials.
    pub label: String,
    pub parallel: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            trials: 100,
            master_seed: 42,
            label: "trials".to_string(),
            parallel: true,
        }
    }
}

/// Errors from the experiment runner.
#[derive(Debug, Error)]
pub enum ExperimentError {
    #[error("experiment needs at least one trial")]
    NoTrials,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ─── Result types ────────────────────────────────────────────────────

/// End state of a single trial.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub trial: usize,
    pub g_bh: f64,
    pub value_bh: f64,
    pub g_wave: f64,
    pub value_wave: f64,
    pub rebalances: u64,
    /// Binary flip models only.
    pub excess: Option<i64>,
    /// Binary flip models only.
    pub successes: Option<i64>,
    pub intervals: IntervalStats,
}

/// Observed vs expected fair-coin success counts across trials.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuccessSummary {
    pub total: i64,
    pub mean: f64,
    pub std_dev: f64,
    pub expected_mean: f64,
    pub expected_std_dev: f64,
}

/// Aggregated experiment result, serialized as the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub timestamp: DateTime<Utc>,
    pub label: String,
    pub master_seed: u64,
    pub flip_model: String,
    pub stocks: usize,
    pub flips_per_trial: u64,
    pub trials: usize,
    pub bh_g: MetricSummary,
    pub bh_value: MetricSummary,
    pub wave_g: MetricSummary,
    pub wave_value: MetricSummary,
    pub wave_num_rebalances: u64,
    pub successes: Option<SuccessSummary>,
    pub bh_interval_return: Option<MetricSummary>,
    pub wave_interval_return: Option<MetricSummary>,
    pub duration_secs: f64,
}

// ─── Execution ───────────────────────────────────────────────────────

/// Run one trial of `config`.
pub fn run_trial(
    config: &ExperimentConfig,
    hierarchy: &RngHierarchy,
    trial: usize,
) -> Result<TrialOutcome, ExperimentError> {
    let rng = hierarchy.rng_for(&config.label, trial as u64);
    let mut sim = FlipSimulator::with_rng(config.sim.clone(), rng)?;
    let mut intervals = IntervalStats::default();
    sim.simulate_with(config.sim.iterations, &mut intervals);

    let binary = config.sim.flip_model.is_binary();
    let outcome = TrialOutcome {
        trial,
        g_bh: sim.g(sim.buy_and_hold()),
        value_bh: sim.total_value(sim.buy_and_hold()),
        g_wave: sim.g(sim.wave()),
        value_wave: sim.total_value(sim.wave()),
        rebalances: sim.rebalances(),
        excess: binary.then(|| sim.excess()),
        successes: binary.then(|| sim.successes(config.sim.iterations)),
        intervals,
    };
    debug!(
        trial,
        g_bh = outcome.g_bh,
        g_wave = outcome.g_wave,
        rebalances = outcome.rebalances,
        "trial complete"
    );
    Ok(outcome)
}

/// Run every trial and aggregate.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentSummary, ExperimentError> {
    run_experiment_with_progress(config, |_, _| {})
}

/// Run every trial, invoking `progress(completed, total)` as trials finish.
pub fn run_experiment_with_progress<F>(
    config: &ExperimentConfig,
    progress: F,
) -> Result<ExperimentSummary, ExperimentError>
where
    F: Fn(usize, usize) + Send + Sync,
{
    if config.trials == 0 {
        return Err(ExperimentError::NoTrials);
    }
    config.sim.validate()?;

    info!(
        trials = config.trials,
        flips = config.sim.iterations,
        stocks = config.sim.num_stocks,
        model = config.sim.flip_model.name(),
        parallel = config.parallel,
        "starting experiment"
    );

    let start = Instant::now();
    let hierarchy = RngHierarchy::new(config.master_seed);
    let total = config.trials;
    let completed = AtomicUsize::new(0);

    let run = |trial: usize| -> Result<TrialOutcome, ExperimentError> {
        let outcome = run_trial(config, &hierarchy, trial)?;
        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
        progress(done, total);
        Ok(outcome)
    };

    let outcomes: Vec<TrialOutcome> = if config.parallel {
        (0..total)
            .into_par_iter()
            .map(run)
            .collect::<Result<Vec<_>, _>>()?
    } else {
        (0..total).map(run).collect::<Result<Vec<_>, _>>()?
    };

    let summary = summarize(config, &outcomes, start.elapsed().as_secs_f64());
    info!(
        bh_g = summary.bh_g.mean,
        wave_g = summary.wave_g.mean,
        rebalances = summary.wave_num_rebalances,
        secs = summary.duration_secs,
        "experiment finished"
    );
    Ok(summary)
}

/// Fold trial outcomes (in slice order) into a summary.
pub fn summarize(
    config: &ExperimentConfig,
    outcomes: &[TrialOutcome],
    duration_secs: f64,
) -> ExperimentSummary {
    let mut bh_g = RunningStats::new();
    let mut bh_value = RunningStats::new();
    let mut wave_g = RunningStats::new();
    let mut wave_value = RunningStats::new();
    let mut success_stats = RunningStats::new();
    let mut success_total = 0i64;
    let mut intervals = IntervalStats::default();
    let mut rebalances = 0u64;

    for outcome in outcomes {
        bh_g.update(outcome.g_bh);
        bh_value.update(outcome.value_bh);
        wave_g.update(outcome.g_wave);
        wave_value.update(outcome.value_wave);
        rebalances += outcome.rebalances;
        if let Some(successes) = outcome.successes {
            success_stats.update(successes as f64);
            success_total += successes;
        }
        intervals.merge(&outcome.intervals);
    }

    let n = config.sim.iterations;
    let successes = (success_stats.count() > 0).then(|| SuccessSummary {
        total: success_total,
        mean: success_stats.mean(),
        std_dev: success_stats.std_dev(),
        expected_mean: (n / 2) as f64,
        expected_std_dev: (n as f64 * 0.25).sqrt(),
    });
    let interval_summary = |stats: &RunningStats| {
        (!intervals.is_empty()).then(|| MetricSummary::from(stats))
    };

    ExperimentSummary {
        timestamp: Utc::now(),
        label: config.label.clone(),
        master_seed: config.master_seed,
        flip_model: config.sim.flip_model.name().to_string(),
        stocks: config.sim.num_stocks,
        flips_per_trial: n,
        trials: outcomes.len(),
        bh_g: MetricSummary::from(&bh_g),
        bh_value: MetricSummary::from(&bh_value),
        wave_g: MetricSummary::from(&wave_g),
        wave_value: MetricSummary::from(&wave_value),
        wave_num_rebalances: rebalances,
        successes,
        bh_interval_return: interval_summary(&intervals.bh),
        wave_interval_return: interval_summary(&intervals.wave),
        duration_secs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fliplab_core::FlipModel;

    fn small() -> ExperimentConfig {
        ExperimentConfig {
            sim: SimConfig {
                iterations: 500,
                flip_model: FlipModel::Coupled,
                ..SimConfig::default()
            },
            trials: 8,
            ..ExperimentConfig::default()
        }
    }

    #[test]
    fn zero_trials_rejected() {
        let config = ExperimentConfig {
            trials: 0,
            ..small()
        };
        assert!(matches!(
            run_experiment(&config),
            Err(ExperimentError::NoTrials)
        ));
    }

    #[test]
    fn invalid_sim_config_rejected() {
        let mut config = small();
        config.sim.num_stocks = 4;
        assert!(matches!(
            run_experiment(&config),
            Err(ExperimentError::Config(ConfigError::CoupledBasket(4)))
        ));
    }

    #[test]
    fn trial_is_reproducible() {
        let config = small();
        let hierarchy = RngHierarchy::new(config.master_seed);
        let a = run_trial(&config, &hierarchy, 3).unwrap();
        let b = run_trial(&config, &hierarchy, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn gaussian_trials_have_no_successes() {
        let config = ExperimentConfig {
            sim: SimConfig {
                iterations: 200,
                flip_model: FlipModel::Geometric {
                    mu: 0.0,
                    sigma: 0.004,
                    dt: 1.0,
                },
                ..SimConfig::default()
            },
            trials: 4,
            ..ExperimentConfig::default()
        };
        let summary = run_experiment(&config).unwrap();
        assert!(summary.successes.is_none());
        assert_eq!(summary.flip_model, "geometric");
    }

    #[test]
    fn summary_counts_every_trial() {
        let summary = run_experiment(&small()).unwrap();
        assert_eq!(summary.trials, 8);
        assert_eq!(summary.bh_g.count, 8);
        let successes = summary.successes.unwrap();
        assert_eq!(successes.expected_mean, 250.0);
        assert!(summary.bh_interval_return.is_none());
    }
}
