//! Streaming statistics using Welford's algorithm.
//!
//! Single-pass mean and variance without storing observations. Partial
//! accumulators merge exactly (Chan et al.), so per-trial statistics can be
//! combined in any grouping.

use fliplab_core::{IntervalObserver, IntervalStatus};
use serde::{Deserialize, Serialize};

/// Welford running mean/variance accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * self.count as f64 * other.count as f64 / count as f64;
        self.count = count;
        self.mean = mean;
        self.m2 = m2;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance.
    pub fn variance(&self) -> f64 {
        self.m2 / self.count.max(1) as f64
    }

    /// Unbiased (n - 1) variance.
    pub fn sample_variance(&self) -> f64 {
        self.m2 / self.count.saturating_sub(1).max(1) as f64
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<f64> for RunningStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = RunningStats::new();
        for value in iter {
            stats.update(value);
        }
        stats
    }
}

/// Serializable view of a [`RunningStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub count: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub sample_variance: f64,
}

impl From<&RunningStats> for MetricSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
            sample_variance: stats.sample_variance(),
        }
    }
}

/// Statistics of interval returns for both portfolios.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntervalStats {
    pub bh: RunningStats,
    pub wave: RunningStats,
}

impl IntervalStats {
    pub fn merge(&mut self, other: &IntervalStats) {
        self.bh.merge(&other.bh);
        self.wave.merge(&other.wave);
    }

    pub fn is_empty(&self) -> bool {
        self.bh.count() == 0
    }
}

impl IntervalObserver for IntervalStats {
    fn on_interval(&mut self, status: &IntervalStatus) {
        self.bh.update(status.bh_return);
        self.wave.update(status.wave_return);
    }
}
