//! Flip models: how a single simulation step moves the price basket.
//!
//! The binary models move each price by a fixed ratio `1 + delta`, which is
//! what lets [`crate::FlipSimulator::excess`] recover a discrete flip count
//! from a price. The Gaussian models are alternative price processes and
//! never the default.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

/// Smallest one-step multiplier the additive model applies.
pub const MIN_ADDITIVE_FACTOR: f64 = 1e-12;

/// Flip-generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlipModel {
    /// A fair coin per instrument.
    #[default]
    Independent,
    /// One fair coin for a 2-stock basket: one instrument up, the other down.
    /// Cancels the common component of simultaneous moves.
    Coupled,
    /// Additive Gaussian shock: `p += p * (mu*dt + sigma*sqrt(dt)*z)`.
    ///
    /// A shock of -100% or worse would leave a non-positive price, which has
    /// no logarithm. The one-step factor is floored at [`MIN_ADDITIVE_FACTOR`]
    /// so prices stay strictly positive.
    Additive { mu: f64, sigma: f64, dt: f64 },
    /// Geometric Brownian motion: `p *= exp((mu - sigma^2/2)*dt + sigma*sqrt(dt)*z)`.
    Geometric { mu: f64, sigma: f64, dt: f64 },
}

impl FlipModel {
    /// True for the fixed-ratio up/down models.
    pub fn is_binary(&self) -> bool {
        matches!(self, FlipModel::Independent | FlipModel::Coupled)
    }

    /// Short lowercase label used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            FlipModel::Independent => "independent",
            FlipModel::Coupled => "coupled",
            FlipModel::Additive { .. } => "additive",
            FlipModel::Geometric { .. } => "geometric",
        }
    }

    /// Draw one outcome and apply it to `prices` in place.
    pub fn apply<R: Rng>(&self, prices: &mut [f64], delta: f64, rng: &mut R) {
        match *self {
            FlipModel::Independent => {
                for price in prices.iter_mut() {
                    *price = step(*price, rng.gen_bool(0.5), delta);
                }
            }
            FlipModel::Coupled => {
                let up = rng.gen_bool(0.5);
                apply_coupled(prices, up, delta);
            }
            FlipModel::Additive { mu, sigma, dt } => {
                let drift = mu * dt;
                let scale = sigma * dt.sqrt();
                for price in prices.iter_mut() {
                    let z: f64 = StandardNormal.sample(rng);
                    *price *= (1.0 + drift + scale * z).max(MIN_ADDITIVE_FACTOR);
                }
            }
            FlipModel::Geometric { mu, sigma, dt } => {
                let drift = (mu - sigma * sigma / 2.0) * dt;
                let scale = sigma * dt.sqrt();
                for price in prices.iter_mut() {
                    let z: f64 = StandardNormal.sample(rng);
                    *price *= (drift + scale * z).exp();
                }
            }
        }
    }
}

/// Move one price a single fixed-ratio step.
#[inline]
pub fn step(price: f64, up: bool, delta: f64) -> f64 {
    if up {
        price * (1.0 + delta)
    } else {
        price / (1.0 + delta)
    }
}

/// Coupled move: instrument 0 goes `up`, instrument 1 the opposite way.
///
/// Only the first two instruments move; a single-instrument basket moves
/// instrument 0 alone.
pub fn apply_coupled(prices: &mut [f64], up: bool, delta: f64) {
    if let Some(first) = prices.get_mut(0) {
        *first = step(*first, up, delta);
    }
    if let Some(second) = prices.get_mut(1) {
        *second = step(*second, !up, delta);
    }
}
