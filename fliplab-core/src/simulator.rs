//! Buy-and-hold vs constant-mix flip simulator.
//!
//! A [`FlipSimulator`] owns one price basket and two portfolios. The
//! buy-and-hold portfolio never trades; the wave portfolio is reset to equal
//! dollar value per instrument whenever its largest position drifts more
//! than `threshold` above the equal-weight target.
//!
//! Under the binary flip models every price is `(1 + delta)^k` for an
//! integer `k`, so the simulator can also map its state back onto a fair-coin
//! binomial count ([`FlipSimulator::excess`], [`FlipSimulator::successes`])
//! and weight the buy-and-hold growth metric by that state's likelihood.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::{ConfigError, SimConfig};
use crate::domain::{growth_metric, PortfolioWeights, PriceVector};
use crate::flip::apply_coupled;
use crate::probability::fair_coin_pmf;
use crate::window::{IntervalObserver, IntervalStatus, IntervalTracker};

/// One simulation state: prices, a static portfolio and a rebalanced one.
#[derive(Debug, Clone)]
pub struct FlipSimulator {
    config: SimConfig,
    prices: PriceVector,
    buy_and_hold: PortfolioWeights,
    wave: PortfolioWeights,
    rng: StdRng,
    flips: u64,
    rebalances: u64,
}

/// End-of-run snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub prices: Vec<f64>,
    pub wave_weights: Vec<f64>,
    pub bh_value: f64,
    pub wave_value: f64,
    /// wave value / buy-and-hold value
    pub ratio: f64,
    pub g_bh: f64,
    pub g_wave: f64,
    pub flips: u64,
    pub rebalances: u64,
}

impl FlipSimulator {
    /// Create a simulator at parity with an RNG seeded from `seed`.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Create a simulator at parity drawing flips from `rng`.
    pub fn with_rng(config: SimConfig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let prices = PriceVector::parity(config.num_stocks);
        let buy_and_hold = PortfolioWeights::inverse_of(&prices);
        let wave = PortfolioWeights::parity(config.num_stocks);
        Ok(Self {
            config,
            prices,
            buy_and_hold,
            wave,
            rng,
            flips: 0,
            rebalances: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn prices(&self) -> &PriceVector {
        &self.prices
    }

    pub fn buy_and_hold(&self) -> &PortfolioWeights {
        &self.buy_and_hold
    }

    pub fn wave(&self) -> &PortfolioWeights {
        &self.wave
    }

    /// Flips applied so far, random or directed.
    pub fn flips(&self) -> u64 {
        self.flips
    }

    /// Threshold-triggered rebalances fired by `simulate`.
    pub fn rebalances(&self) -> u64 {
        self.rebalances
    }

    // ── Price moves ──────────────────────────────────────────────────

    /// One random step of the configured flip model.
    pub fn flip(&mut self) {
        self.config
            .flip_model
            .apply(self.prices.as_mut_slice(), self.config.delta, &mut self.rng);
        self.flips += 1;
    }

    /// Deterministic coupled step: `up` moves instrument 0 up and
    /// instrument 1 down, `!up` the reverse.
    pub fn flip_direction(&mut self, up: bool) {
        apply_coupled(self.prices.as_mut_slice(), up, self.config.delta);
        self.flips += 1;
    }

    // ── Valuation ────────────────────────────────────────────────────

    /// Inner product of `weights` and the current prices.
    pub fn total_value(&self, weights: &PortfolioWeights) -> f64 {
        weights.value_at(&self.prices)
    }

    /// Geometric mean over instruments of `total_value / price_i`.
    pub fn g(&self, weights: &PortfolioWeights) -> f64 {
        growth_metric(weights, &self.prices)
    }

    /// How far the largest wave position sits above the equal-weight target,
    /// as a fraction of the target.
    pub fn imbalance(&self) -> f64 {
        let target = self.total_value(&self.wave) / self.config.num_stocks as f64;
        let largest = self
            .wave
            .position_values(&self.prices)
            .fold(f64::NEG_INFINITY, f64::max);
        largest / target - 1.0
    }

    // ── Rebalancing ──────────────────────────────────────────────────

    /// Reset the wave portfolio to equal dollar value per instrument.
    pub fn rebalance(&mut self) {
        self.wave.equalize(&self.prices);
    }

    /// Rebalance if the imbalance exceeds `threshold`. Returns whether it fired.
    pub fn rebalance_if_needed(&mut self) -> bool {
        if self.imbalance() > self.config.threshold {
            self.rebalance();
            self.rebalances += 1;
            true
        } else {
            false
        }
    }

    /// Run `samples` flips, rebalancing by threshold when enabled.
    pub fn simulate(&mut self, samples: u64) {
        self.simulate_with(samples, &mut |_: &IntervalStatus| {});
    }

    /// Like [`simulate`](Self::simulate), reporting to `observer` every
    /// `interval` samples when `print_interval_status` is set.
    pub fn simulate_with<O>(&mut self, samples: u64, observer: &mut O)
    where
        O: IntervalObserver + ?Sized,
    {
        let mut tracker = self.config.print_interval_status.then(|| {
            IntervalTracker::new(
                self.config.interval,
                self.total_value(&self.buy_and_hold),
                self.total_value(&self.wave),
            )
        });

        for sample in 1..=samples {
            self.flip();
            if self.config.rebalance {
                self.rebalance_if_needed();
            }
            if let Some(tracker) = tracker.as_mut() {
                let bh_value = self.total_value(&self.buy_and_hold);
                let wave_value = self.total_value(&self.wave);
                if let Some(status) = tracker.record(sample, bh_value, wave_value) {
                    observer.on_interval(&status);
                }
            }
        }
    }

    // ── Binomial mapping ─────────────────────────────────────────────

    /// Net up-flips of instrument 0 implied by its price,
    /// `round(log_{1+delta}(price_0))`.
    pub fn excess(&self) -> i64 {
        let price = self.prices.as_slice().first().copied().unwrap_or(1.0);
        (price.ln() / self.config.step_ratio().ln()).round() as i64
    }

    /// Up outcomes consistent with the current excess after `n_flips` flips:
    /// `n_flips / 2 + floor(excess / 2)`.
    pub fn successes(&self, n_flips: u64) -> i64 {
        (n_flips / 2) as i64 + self.excess().div_euclid(2)
    }

    /// Fair-coin binomial likelihood of the current state after `n_flips`.
    pub fn probability_density(&self, n_flips: u64) -> f64 {
        fair_coin_pmf(n_flips, self.successes(n_flips))
    }

    /// Buy-and-hold growth metric weighted by the state's likelihood.
    pub fn weighted_value(&self, n_flips: u64) -> f64 {
        self.g(&self.buy_and_hold) * self.probability_density(n_flips)
    }

    // ── Reporting ────────────────────────────────────────────────────

    pub fn summary(&self) -> SimulationSummary {
        let bh_value = self.total_value(&self.buy_and_hold);
        let wave_value = self.total_value(&self.wave);
        SimulationSummary {
            prices: self.prices.as_slice().to_vec(),
            wave_weights: self.wave.as_slice().to_vec(),
            bh_value,
            wave_value,
            ratio: wave_value / bh_value,
            g_bh: self.g(&self.buy_and_hold),
            g_wave: self.g(&self.wave),
            flips: self.flips,
            rebalances: self.rebalances,
        }
    }
}

impl fmt::Display for SimulationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Flipper(prices={}, bh=({:.3}), wave={}({:.3}), ratio={:.3}, g_bh={:.3}, g_wave={:.3})",
            fmt_list(&self.prices),
            self.bh_value,
            fmt_list(&self.wave_weights),
            self.wave_value,
            self.ratio,
            self.g_bh,
            self.g_wave,
        )
    }
}

impl fmt::Display for FlipSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.summary().fmt(f)
    }
}

fn fmt_list(values: &[f64]) -> String {
    let items: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flip::FlipModel;

    fn coupled(delta: f64) -> SimConfig {
        SimConfig {
            delta,
            flip_model: FlipModel::Coupled,
            ..SimConfig::default()
        }
    }

    #[test]
    fn starts_at_parity() {
        let sim = FlipSimulator::new(SimConfig::default(), 0).unwrap();
        assert_eq!(sim.prices().as_slice(), &[1.0, 1.0]);
        assert_eq!(sim.total_value(sim.buy_and_hold()), 2.0);
        assert_eq!(sim.total_value(sim.wave()), 2.0);
        assert!((sim.g(sim.buy_and_hold()) - 2.0).abs() < 1e-12);
        assert_eq!(sim.excess(), 0);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            num_stocks: 3,
            flip_model: FlipModel::Coupled,
            ..SimConfig::default()
        };
        assert!(FlipSimulator::new(config, 0).is_err());
    }

    #[test]
    fn ten_up_moves_give_excess_ten() {
        let mut sim = FlipSimulator::new(coupled(0.001), 0).unwrap();
        for _ in 0..10 {
            sim.flip_direction(true);
        }
        assert_eq!(sim.excess(), 10);
        let expected = 1.001f64.powi(10);
        assert!((sim.prices().as_slice()[0] - expected).abs() < 1e-12);
        assert!((sim.prices().as_slice()[1] - 1.0 / expected).abs() < 1e-12);
        assert_eq!(sim.flips(), 10);
    }

    #[test]
    fn down_moves_give_negative_excess() {
        let mut sim = FlipSimulator::new(coupled(0.001), 0).unwrap();
        for _ in 0..3 {
            sim.flip_direction(false);
        }
        assert_eq!(sim.excess(), -3);
        // floor(-3 / 2) = -2
        assert_eq!(sim.successes(100), 48);
    }

    #[test]
    fn successes_at_parity_is_half() {
        let sim = FlipSimulator::new(coupled(0.001), 0).unwrap();
        assert_eq!(sim.successes(1000), 500);
        assert_eq!(sim.successes(1001), 500);
    }

    #[test]
    fn rebalance_equalizes_and_is_idempotent() {
        let mut sim = FlipSimulator::new(coupled(0.01), 0).unwrap();
        for _ in 0..7 {
            sim.flip_direction(true);
        }
        sim.rebalance();
        let total = sim.total_value(sim.wave());
        for value in sim.wave().position_values(sim.prices()) {
            assert!((value - total / 2.0).abs() < 1e-12);
        }
        let once = sim.wave().clone();
        sim.rebalance();
        for (a, b) in once.as_slice().iter().zip(sim.wave().as_slice()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn threshold_triggers_rebalance() {
        let config = SimConfig {
            threshold: 0.015,
            ..coupled(0.01)
        };
        let mut sim = FlipSimulator::new(config, 0).unwrap();
        sim.flip_direction(true);
        // One step: largest position about 1% over target.
        assert!(!sim.rebalance_if_needed());
        sim.flip_direction(true);
        assert!(sim.rebalance_if_needed());
        assert!(sim.imbalance().abs() < 1e-12);
        assert_eq!(sim.rebalances(), 1);
    }

    #[test]
    fn simulate_runs_exact_sample_count() {
        let mut sim = FlipSimulator::new(coupled(0.001), 5).unwrap();
        sim.simulate(1234);
        assert_eq!(sim.flips(), 1234);
        // Coupled moves keep price_0 an exact power of the step ratio.
        let k = sim.excess();
        let expected = 1.001f64.powi(k as i32);
        assert!((sim.prices().as_slice()[0] / expected - 1.0).abs() < 1e-9);
    }

    #[test]
    fn wave_never_exceeds_threshold_after_simulate() {
        let config = SimConfig {
            threshold: 0.005,
            ..coupled(0.001)
        };
        let mut sim = FlipSimulator::new(config, 17).unwrap();
        sim.simulate(10_000);
        assert!(sim.imbalance() <= 0.005 + 1e-12);
    }

    #[test]
    fn disabled_rebalance_leaves_wave_alone() {
        let config = SimConfig {
            rebalance: false,
            ..coupled(0.01)
        };
        let mut sim = FlipSimulator::new(config, 3).unwrap();
        sim.simulate(500);
        assert_eq!(sim.wave().as_slice(), &[1.0, 1.0]);
        assert_eq!(sim.rebalances(), 0);
    }

    #[test]
    fn same_seed_same_path() {
        let mut a = FlipSimulator::new(SimConfig::default(), 99).unwrap();
        let mut b = FlipSimulator::new(SimConfig::default(), 99).unwrap();
        a.simulate(1000);
        b.simulate(1000);
        assert_eq!(a.prices(), b.prices());
        assert_eq!(a.wave(), b.wave());
    }

    #[test]
    fn interval_reports_fire_every_interval() {
        let config = SimConfig {
            interval: 10,
            print_interval_status: true,
            ..coupled(0.001)
        };
        let mut sim = FlipSimulator::new(config, 1).unwrap();
        let mut samples = Vec::new();
        sim.simulate_with(35, &mut |s: &IntervalStatus| samples.push(s.sample));
        assert_eq!(samples, vec![10, 20, 30]);
    }

    #[test]
    fn interval_reports_off_by_default() {
        let mut sim = FlipSimulator::new(coupled(0.001), 1).unwrap();
        let mut count = 0;
        sim.simulate_with(100, &mut |_: &IntervalStatus| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn weighted_value_at_parity() {
        let sim = FlipSimulator::new(coupled(0.001), 0).unwrap();
        let expected = 2.0 * fair_coin_pmf(10, 5);
        assert!((sim.weighted_value(10) - expected).abs() < 1e-12);
    }

    #[test]
    fn summary_line_format() {
        let sim = FlipSimulator::new(SimConfig::default(), 0).unwrap();
        assert_eq!(
            sim.to_string(),
            "Flipper(prices=[1.000, 1.000], bh=(2.000), wave=[1.000, 1.000](2.000), \
             ratio=1.000, g_bh=2.000, g_wave=2.000)"
        );
    }
}
