//! Numerical helpers shared by the prior and likelihood modules.
//!
//! Log-space combinatorial primitives (factorial, binomial, multiset,
//! multinomial, Poisson PMF) and the integer-partition logarithm `log_q`
//! used by the uniform-hyper priors. Everything here operates in log space
//! to keep the joint scores of §4 numerically stable for the graph sizes
//! the prior tree is expected to reach.

use std::cell::RefCell;
use std::collections::HashMap;
use std::f64::consts::PI;

/// `ln(n!)`, computed by direct summation.
///
/// Direct summation is adequate here: the prior tree only ever evaluates
/// this on edge counts and degrees, which stay small relative to a
/// factorial-table cache's break-even point.
#[must_use]
pub fn log_factorial(n: u64) -> f64 {
    (1..=n).map(|i| (i as f64).ln()).sum()
}

/// `ln C(n, k)`, the log binomial coefficient. Returns `-inf` when `k > n`.
#[must_use]
pub fn log_binomial_coefficient(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    log_factorial(n) - log_factorial(k) - log_factorial(n - k)
}

/// `ln` of the multiset coefficient `((n, k))  = C(n + k - 1, k)`: the number
/// of ways to choose `k` items with repetition from `n` categories.
///
/// Returns `-inf` when `n == 0` and `k > 0` (no categories to draw from).
#[must_use]
pub fn log_multiset_coefficient(n: u64, k: u64) -> f64 {
    if n == 0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    log_binomial_coefficient(n + k - 1, k)
}

/// `ln` of the multinomial coefficient `n! / (c_1! c_2! ... c_m!)` where
/// `n = sum(counts)`.
#[must_use]
pub fn log_multinomial_coefficient(n: u64, counts: &[u64]) -> f64 {
    log_factorial(n) - counts.iter().map(|&c| log_factorial(c)).sum::<f64>()
}

/// `ln P(X = k)` for `X ~ Poisson(mean)`.
#[must_use]
pub fn log_poisson_pmf(k: u64, mean: f64) -> f64 {
    if mean <= 0.0 {
        return if k == 0 { 0.0 } else { f64::NEG_INFINITY };
    }
    (k as f64) * mean.ln() - mean - log_factorial(k)
}

/// `ln P(X = k | X >= 1)` for `X ~ Poisson(mean)`, `k >= 1`.
#[must_use]
pub fn log_zero_truncated_poisson_pmf(k: u64, mean: f64) -> f64 {
    if k == 0 {
        return f64::NEG_INFINITY;
    }
    log_poisson_pmf(k, mean) - (-(-mean).exp()).ln_1p()
}

thread_local! {
    static Q_CACHE: RefCell<HashMap<(u64, u64), f64>> = RefCell::new(HashMap::new());
}

/// Exact count of partitions of `n` into at most `k` parts, via the standard
/// recursion `q(n, k) = q(n, k-1) + q(n-k, k)`.
fn q_rec(n: i64, k: i64) -> f64 {
    if n == 0 || k == 1 {
        return 1.0;
    }
    if n < 1 || k < 1 {
        return 0.0;
    }
    let k = k.min(n);
    let key = (n as u64, k as u64);
    if let Some(hit) = Q_CACHE.with(|c| c.borrow().get(&key).copied()) {
        return hit;
    }
    let value = q_rec(n, k - 1) + q_rec(n - k, k);
    Q_CACHE.with(|c| c.borrow_mut().insert(key, value));
    value
}

/// Small-`k` asymptotic for `log_q`, valid when `k < n^(1/4)`.
fn log_q_approx_small(n: u64, k: u64) -> f64 {
    log_binomial_coefficient(n - 1, k - 1) - log_factorial(k)
}

/// Large-`n` Hardy–Ramanujan-style asymptotic for `log_q`.
fn log_q_approx_big(n: u64, k: u64) -> f64 {
    let n_f = n as f64;
    let k_f = k as f64;
    let c = PI * (2.0 / 3.0).sqrt();
    let mut s = c * n_f.sqrt() - (4.0 * 3.0_f64.sqrt() * n_f).ln();
    if k < n {
        let x = k_f / n_f.sqrt() - n_f.ln() / c;
        s -= (2.0 / c) * (-c * x / 2.0).exp();
    }
    s
}

fn log_q_approx(n: u64, k: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    if (k as f64) < (n as f64).powf(0.25) {
        log_q_approx_small(n, k)
    } else {
        log_q_approx_big(n, k)
    }
}

/// `ln q(n, k)`, the log-count of partitions of `n` into at most `k` parts.
///
/// `exact` selects the memoised recursion; otherwise an asymptotic
/// approximation is used. Callers evaluating small `(n, k)` (as in the
/// uniform-hyper degree prior's exact-likelihood tests) should pass
/// `exact = true`.
#[must_use]
pub fn log_q(n: u64, k: u64, exact: bool) -> f64 {
    if exact {
        q_rec(n as i64, k as i64).ln()
    } else {
        log_q_approx(n, k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factorial_matches_known_values() {
        assert!((log_factorial(0) - 0.0).abs() < 1e-12);
        assert!((log_factorial(5).exp() - 120.0).abs() < 1e-6);
    }

    #[test]
    fn binomial_rejects_k_greater_than_n() {
        assert_eq!(log_binomial_coefficient(3, 5), f64::NEG_INFINITY);
    }

    #[test]
    fn multiset_coefficient_matches_stars_and_bars() {
        // ((3, 2)) = C(4, 2) = 6
        assert!((log_multiset_coefficient(3, 2).exp() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn zero_category_multiset_requires_zero_draws() {
        assert_eq!(log_multiset_coefficient(0, 1), f64::NEG_INFINITY);
        assert_eq!(log_multiset_coefficient(0, 0), 0.0);
    }

    #[test]
    fn log_q_exact_matches_small_partition_counts() {
        // partitions of 4 into at most 2 parts: 4, 3+1, 2+2 -> 3
        assert!((log_q(4, 2, true).exp() - 3.0).abs() < 1e-9);
        // partitions of 5 into at most 5 parts: p(5) = 7
        assert!((log_q(5, 5, true).exp() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn log_q_zero_n_is_one_partition() {
        assert!((log_q(0, 3, true).exp() - 1.0).abs() < 1e-9);
    }
}
