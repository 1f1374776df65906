//! FlipLab CLI: flip simulations, multi-trial experiments and enumeration.
//!
//! Commands:
//! - `simulate`: one run; prints the summary line, optionally an interval CSV stream
//! - `trials`: many seeded runs in parallel; prints a JSON summary
//! - `integrate`: enumerates the expected buy-and-hold growth metric
//!
//! Logs go to stderr (`RUST_LOG`, default `info`); results go to stdout.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

use fliplab_core::{Enumerator, FlipModel, FlipSimulator, SimConfig, CONVERGENCE_CUTOFF};
use fliplab_runner::{
    run_experiment_with_progress, summary_json, write_summary, CsvIntervalWriter,
    ExperimentConfig,
};

#[derive(Parser)]
#[command(
    name = "fliplab",
    about = "FlipLab: buy-and-hold vs constant-mix rebalancing under coin-flip prices"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation and print the end state.
    Simulate {
        #[command(flatten)]
        sim: SimArgs,

        /// RNG seed. Defaults to the current time.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the interval CSV stream here instead of stdout. Implies
        /// `--print-interval-status`.
        #[arg(long)]
        interval_csv: Option<PathBuf>,
    },
    /// Run many independent trials and print aggregate statistics as JSON.
    Trials {
        #[command(flatten)]
        sim: SimArgs,

        /// Number of trials.
        #[arg(long, default_value_t = 100)]
        trials: usize,

        /// Master seed for per-trial seeding.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Run trials on one thread.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Also write the JSON summary to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Enumerate E[g(buy-and-hold)] over binomial flip counts.
    Integrate {
        #[command(flatten)]
        sim: SimArgs,

        /// Stop a walk once a step contributes less than this.
        #[arg(long, default_value_t = CONVERGENCE_CUTOFF)]
        cutoff: f64,

        /// Give up after this many steps per direction.
        #[arg(long)]
        max_steps: Option<u64>,
    },
}

/// Simulation parameters shared by every command. Flags override the
/// `--config` file, which overrides the defaults.
#[derive(Args, Debug, Clone)]
struct SimArgs {
    /// TOML file with simulation parameters.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Multiplicative step size per flip.
    #[arg(long)]
    delta: Option<f64>,

    /// Fractional imbalance that triggers rebalancing.
    #[arg(long)]
    threshold: Option<f64>,

    /// Flips per run.
    #[arg(long)]
    iterations: Option<u64>,

    /// Basket size.
    #[arg(long)]
    num_stocks: Option<usize>,

    /// Coupled flips: one stock up, the other down (2 stocks only).
    #[arg(long, default_value_t = false)]
    remove_common_flips: bool,

    /// Disable wave rebalancing.
    #[arg(long, default_value_t = false)]
    no_rebalance: bool,

    /// Rolling window size for interval reports.
    #[arg(long)]
    interval: Option<usize>,

    /// Emit a report every `interval` samples.
    #[arg(long, default_value_t = false)]
    print_interval_status: bool,
}

impl SimArgs {
    fn resolve(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(delta) = self.delta {
            config.delta = delta;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(num_stocks) = self.num_stocks {
            config.num_stocks = num_stocks;
        }
        if let Some(interval) = self.interval {
            config.interval = interval;
        }
        if self.remove_common_flips {
            if !config.flip_model.is_binary() {
                bail!(
                    "--remove-common-flips conflicts with the {} flip model in the config",
                    config.flip_model.name()
                );
            }
            config.flip_model = FlipModel::Coupled;
        }
        if self.no_rebalance {
            config.rebalance = false;
        }
        if self.print_interval_status {
            config.print_interval_status = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            sim,
            seed,
            interval_csv,
        } => run_simulate(&sim, seed, interval_csv),
        Commands::Trials {
            sim,
            trials,
            seed,
            sequential,
            output,
        } => run_trials(&sim, trials, seed, sequential, output),
        Commands::Integrate {
            sim,
            cutoff,
            max_steps,
        } => run_integrate(&sim, cutoff, max_steps),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the config for `simulate`; an interval CSV path turns reporting on.
fn simulate_config(args: &SimArgs, interval_csv: Option<&Path>) -> Result<SimConfig> {
    let mut config = args.resolve()?;
    if interval_csv.is_some() && !config.print_interval_status {
        config.print_interval_status = true;
        config.validate()?;
    }
    Ok(config)
}

fn run_simulate(args: &SimArgs, seed: Option<u64>, interval_csv: Option<PathBuf>) -> Result<()> {
    let config = simulate_config(args, interval_csv.as_deref())?;
    let seed = seed.unwrap_or_else(time_seed);
    info!(seed, flips = config.iterations, model = config.flip_model.name(), "simulating");

    let samples = config.iterations;
    let reporting = config.print_interval_status;
    let mut sim = FlipSimulator::new(config, seed)?;

    if !reporting {
        sim.simulate(samples);
    } else if let Some(path) = interval_csv {
        let file = File::create(&path)?;
        let mut writer = CsvIntervalWriter::new(BufWriter::new(file));
        sim.simulate_with(samples, &mut writer);
        let rows = writer.finish()?;
        info!(rows, path = %path.display(), "interval CSV written");
    } else {
        let mut writer = CsvIntervalWriter::new(std::io::stdout().lock());
        sim.simulate_with(samples, &mut writer);
        writer.finish()?;
    }

    println!("{sim}");
    info!(rebalances = sim.rebalances(), "done");
    Ok(())
}

fn run_trials(
    args: &SimArgs,
    trials: usize,
    seed: u64,
    sequential: bool,
    output: Option<PathBuf>,
) -> Result<()> {
    let config = ExperimentConfig {
        sim: args.resolve()?,
        trials,
        master_seed: seed,
        parallel: !sequential,
        ..ExperimentConfig::default()
    };

    let step = (trials / 10).max(1);
    let summary = run_experiment_with_progress(&config, |done, total| {
        if done % step == 0 || done == total {
            info!("trials: {done}/{total}");
        }
    })?;

    println!("{}", summary_json(&summary)?);

    if let Some(path) = output {
        write_summary(&path, &summary)?;
        info!(path = %path.display(), "summary saved");
    }
    Ok(())
}

fn run_integrate(args: &SimArgs, cutoff: f64, max_steps: Option<u64>) -> Result<()> {
    if !(cutoff > 0.0) {
        bail!("--cutoff must be positive, got {cutoff}");
    }
    let config = args.resolve()?;

    let mut enumerator = Enumerator::new(config)?.with_cutoff(cutoff);
    if let Some(max_steps) = max_steps {
        enumerator = enumerator.with_max_steps(max_steps);
    }
    let result = enumerator.run()?;

    info!(
        n_flips = result.n_flips,
        up_steps = result.up_steps,
        down_steps = result.down_steps,
        "enumeration converged"
    );
    println!("{}", result.total);
    Ok(())
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate_args(argv: &[&str]) -> (SimArgs, Option<PathBuf>) {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Commands::Simulate {
                sim, interval_csv, ..
            } => (sim, interval_csv),
            _ => panic!("expected simulate"),
        }
    }

    #[test]
    fn interval_csv_enables_reporting() {
        let (sim, csv) = simulate_args(&["fliplab", "simulate", "--interval-csv", "out.csv"]);
        assert!(!sim.print_interval_status);
        let config = simulate_config(&sim, csv.as_deref()).unwrap();
        assert!(config.print_interval_status);
    }

    #[test]
    fn interval_csv_still_validates_interval() {
        let (sim, csv) = simulate_args(&[
            "fliplab",
            "simulate",
            "--interval",
            "0",
            "--interval-csv",
            "out.csv",
        ]);
        assert!(simulate_config(&sim, csv.as_deref()).is_err());
    }

    #[test]
    fn no_csv_leaves_reporting_off() {
        let (sim, csv) = simulate_args(&["fliplab", "simulate"]);
        let config = simulate_config(&sim, csv.as_deref()).unwrap();
        assert!(!config.print_interval_status);
    }

    #[test]
    fn vanishing_delta_is_rejected() {
        let (sim, _) = simulate_args(&["fliplab", "simulate", "--delta", "1e-17"]);
        assert!(sim.resolve().is_err());
    }
}
