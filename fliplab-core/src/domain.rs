//! Price basket and portfolio share counts.

use serde::{Deserialize, Serialize};

/// Current price per instrument. Always the basket's length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceVector(Vec<f64>);

impl PriceVector {
    /// Every instrument at 1.0.
    pub fn parity(num_stocks: usize) -> Self {
        Self(vec![1.0; num_stocks])
    }

    pub fn from_vec(prices: Vec<f64>) -> Self {
        Self(prices)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Number of shares held per instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioWeights(Vec<f64>);

impl PortfolioWeights {
    /// One share of every instrument.
    pub fn parity(num_stocks: usize) -> Self {
        Self(vec![1.0; num_stocks])
    }

    /// One dollar of every instrument at the given prices.
    pub fn inverse_of(prices: &PriceVector) -> Self {
        Self(prices.as_slice().iter().map(|p| 1.0 / p).collect())
    }

    pub fn from_vec(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Inner product with `prices`.
    pub fn value_at(&self, prices: &PriceVector) -> f64 {
        self.0
            .iter()
            .zip(prices.as_slice())
            .map(|(w, p)| w * p)
            .sum()
    }

    /// Dollar value held in each instrument.
    pub fn position_values<'a>(
        &'a self,
        prices: &'a PriceVector,
    ) -> impl Iterator<Item = f64> + 'a {
        self.0.iter().zip(prices.as_slice()).map(|(w, p)| w * p)
    }

    /// Reset to equal dollar value per instrument with the same total.
    pub fn equalize(&mut self, prices: &PriceVector) {
        let per_stock = self.value_at(prices) / prices.len() as f64;
        for (w, p) in self.0.iter_mut().zip(prices.as_slice()) {
            *w = per_stock / p;
        }
    }
}

/// Geometric mean over instruments of `total / price_i`, where `total` is the
/// portfolio value at `prices`. Scale-free comparison of strategies.
pub fn growth_metric(weights: &PortfolioWeights, prices: &PriceVector) -> f64 {
    let total = weights.value_at(prices);
    // Summing logs keeps extreme prices from overflowing the product.
    let log_sum: f64 = prices
        .as_slice()
        .iter()
        .map(|price| (total / price).ln())
        .sum();
    (log_sum / prices.len() as f64).exp()
}
