//! FlipLab Core: price baskets, flip models and the buy-and-hold vs
//! constant-mix simulator.
//!
//! This crate contains:
//! - Explicit simulation configuration with eager validation
//! - Flip models (independent, coupled, additive and geometric Gaussian)
//! - `FlipSimulator`: flips, valuation, threshold rebalancing, the
//!   price-to-binomial mapping and likelihood-weighted values
//! - Rolling-window interval reporting
//! - Exact enumeration of the expected buy-and-hold growth metric
//! - Deterministic per-trial RNG seeding

pub mod config;
pub mod domain;
pub mod enumeration;
pub mod flip;
pub mod probability;
pub mod rng;
pub mod simulator;
pub mod window;

pub use config::{ConfigError, SimConfig};
pub use domain::{growth_metric, PortfolioWeights, PriceVector};
pub use enumeration::{
    expected_buy_and_hold_g, EnumerationError, EnumerationResult, Enumerator,
    CONVERGENCE_CUTOFF,
};
pub use flip::{FlipModel, MIN_ADDITIVE_FACTOR};
pub use probability::fair_coin_pmf;
pub use rng::RngHierarchy;
pub use simulator::{FlipSimulator, SimulationSummary};
pub use window::{IntervalObserver, IntervalStatus, RollingWindow};
