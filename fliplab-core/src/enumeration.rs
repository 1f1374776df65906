//! Exact expectation of the buy-and-hold growth metric by enumeration.
//!
//! Instead of sampling, walk every reachable excess state of a 2-stock
//! coupled basket outward from parity, two directed flips per step, summing
//! `g(bh)` weighted by each state's fair-coin binomial likelihood. The walk in
//! each direction stops once a step contributes less than the cutoff, which
//! the decaying binomial tail guarantees for a fixed `delta`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{ConfigError, SimConfig};
use crate::flip::FlipModel;
use crate::simulator::FlipSimulator;

/// A step contributing less than this ends the walk.
pub const CONVERGENCE_CUTOFF: f64 = 1e-20;

/// Upper bound on steps per direction.
pub const DEFAULT_MAX_STEPS: u64 = 10_000_000;

#[derive(Debug, Error)]
pub enum EnumerationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("enumeration needs a binary flip model, got {0}")]
    UnsupportedModel(&'static str),

    #[error("enumeration walks a 2-stock basket, got {0} stocks")]
    UnsupportedBasket(usize),

    #[error("weighted values stayed above {cutoff:e} for {max_steps} steps")]
    NoConvergence { cutoff: f64, max_steps: u64 },
}

/// Outcome of a full enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnumerationResult {
    /// Estimated `E[g(bh)]` after `n_flips` flips.
    pub total: f64,
    /// Weighted value of the parity state.
    pub parity_value: f64,
    pub up_steps: u64,
    pub down_steps: u64,
    pub n_flips: u64,
}

/// Enumeration settings; `n_flips` comes from `config.iterations`.
#[derive(Debug, Clone)]
pub struct Enumerator {
    config: SimConfig,
    cutoff: f64,
    max_steps: u64,
}

impl Enumerator {
    pub fn new(config: SimConfig) -> Result<Self, EnumerationError> {
        config.validate()?;
        if !config.flip_model.is_binary() {
            return Err(EnumerationError::UnsupportedModel(config.flip_model.name()));
        }
        if config.num_stocks != 2 {
            return Err(EnumerationError::UnsupportedBasket(config.num_stocks));
        }
        Ok(Self {
            config: SimConfig {
                flip_model: FlipModel::Coupled,
                ..config
            },
            cutoff: CONVERGENCE_CUTOFF,
            max_steps: DEFAULT_MAX_STEPS,
        })
    }

    pub fn with_cutoff(mut self, cutoff: f64) -> Self {
        self.cutoff = cutoff;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn run(&self) -> Result<EnumerationResult, EnumerationError> {
        let n_flips = self.config.iterations;
        let parity_value = self.parity()?.weighted_value(n_flips);
        let (up_total, up_steps) = self.walk(true)?;
        let (down_total, down_steps) = self.walk(false)?;

        let total = parity_value + up_total + down_total;
        debug!(n_flips, up_steps, down_steps, total, "enumeration finished");

        Ok(EnumerationResult {
            total,
            parity_value,
            up_steps,
            down_steps,
            n_flips,
        })
    }

    fn parity(&self) -> Result<FlipSimulator, ConfigError> {
        FlipSimulator::new(self.config.clone(), 0)
    }

    /// Walk away from parity in one direction; returns (sum, steps taken).
    fn walk(&self, up: bool) -> Result<(f64, u64), EnumerationError> {
        let n_flips = self.config.iterations;
        let mut sim = self.parity()?;
        let mut total = 0.0;
        let mut steps = 0;

        loop {
            if steps >= self.max_steps {
                warn!(up, steps, "enumeration hit the step cap");
                return Err(EnumerationError::NoConvergence {
                    cutoff: self.cutoff,
                    max_steps: self.max_steps,
                });
            }
            // Imbalance comes from a pair of flips going the same way.
            sim.flip_direction(up);
            sim.flip_direction(up);
            steps += 1;

            let value = sim.weighted_value(n_flips);
            total += value;
            if value < self.cutoff {
                break;
            }
        }

        Ok((total, steps))
    }
}

/// Enumerate `E[g(bh)]` for `config` with the default cutoff.
pub fn expected_buy_and_hold_g(config: &SimConfig) -> Result<EnumerationResult, EnumerationError> {
    Enumerator::new(config.clone())?.run()
}
