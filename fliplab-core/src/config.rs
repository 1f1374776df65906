//! Simulation configuration.
//!
//! Every simulator is constructed from an explicit [`SimConfig`]. Configs can
//! be built in code, parsed from TOML, or loaded from a file; missing TOML keys
//! fall back to the defaults below.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::flip::FlipModel;

/// Errors from config loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("delta must be finite with 1 + delta > 1, got {0}")]
    InvalidDelta(f64),

    #[error("threshold must be non-negative and finite, got {0}")]
    InvalidThreshold(f64),

    #[error("num_stocks must be at least 1")]
    EmptyBasket,

    #[error("coupled flips move exactly 2 stocks, basket has {0}")]
    CoupledBasket(usize),

    #[error("interval must be at least 1 when interval reporting is enabled")]
    ZeroInterval,

    #[error("gaussian flip model needs sigma >= 0 and dt > 0 (sigma = {sigma}, dt = {dt})")]
    InvalidGaussian { sigma: f64, dt: f64 },

    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Parameters for one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Multiplicative step size per flip.
    pub delta: f64,
    /// Fractional imbalance that triggers a wave rebalance.
    pub threshold: f64,
    /// Number of flips per run (also `n_flips` for enumeration).
    pub iterations: u64,
    /// Basket size.
    pub num_stocks: usize,
    /// How each flip moves prices.
    pub flip_model: FlipModel,
    /// Whether the wave portfolio rebalances at all.
    pub rebalance: bool,
    /// Rolling window size for interval reporting.
    pub interval: usize,
    /// Emit an interval status every `interval` samples.
    pub print_interval_status: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            delta: 0.001,
            threshold: 0.005,
            iterations: 1_000_000,
            num_stocks: 2,
            flip_model: FlipModel::Independent,
            rebalance: true,
            interval: 1000,
            print_interval_status: false,
        }
    }
}

impl SimConfig {
    /// Load a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a config from a TOML string and validate it.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulator cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A delta lost to rounding makes every flip a no-op.
        if !(self.delta.is_finite() && self.step_ratio() > 1.0) {
            return Err(ConfigError::InvalidDelta(self.delta));
        }
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.num_stocks == 0 {
            return Err(ConfigError::EmptyBasket);
        }
        if self.print_interval_status && self.interval == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        match self.flip_model {
            FlipModel::Coupled if self.num_stocks != 2 => {
                Err(ConfigError::CoupledBasket(self.num_stocks))
            }
            FlipModel::Additive { sigma, dt, .. } | FlipModel::Geometric { sigma, dt, .. }
                if !(sigma >= 0.0 && dt > 0.0 && sigma.is_finite() && dt.is_finite()) =>
            {
                Err(ConfigError::InvalidGaussian { sigma, dt })
            }
            _ => Ok(()),
        }
    }

    /// Growth ratio of one flip, `1 + delta`.
    pub fn step_ratio(&self) -> f64 {
        1.0 + self.delta
    }
}
