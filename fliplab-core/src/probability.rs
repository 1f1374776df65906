//! Fair-coin binomial probabilities.

use statrs::distribution::{Binomial, Discrete};

/// `P(X = k)` for `X ~ Binomial(n, 0.5)`.
///
/// Counts outside `[0, n]` have zero mass. Very large `n` may underflow to
/// 0.0; that is the expected tail behavior, not an error.
pub fn fair_coin_pmf(n: u64, k: i64) -> f64 {
    if k < 0 || k as u64 > n {
        return 0.0;
    }
    match Binomial::new(0.5, n) {
        Ok(dist) => dist.pmf(k as u64),
        Err(_) => 0.0,
    }
}
