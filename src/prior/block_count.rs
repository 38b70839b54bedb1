//! Block-count prior (C2).
//!
//! Flat variants hold a single positive integer `B`. The nested variant
//! holds a vector `B_0, B_1, ..., B_{D-1}` with strictly decreasing positive
//! entries and a terminal `1`; "depth" is the first index after which the
//! sequence is constantly `1`.

use crate::error::{DepletedMethodError, SafetyError};
use crate::numeric::log_zero_truncated_poisson_pmf;
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

/// `B` fixed to a constant.
#[derive(Debug, Clone)]
pub struct BlockCountDeltaPrior {
    id: PriorId,
    state: u64,
}

impl BlockCountDeltaPrior {
    #[must_use]
    pub fn new(block_count: u64) -> Self {
        Self { id: PriorId::next(), state: block_count }
    }

    pub fn check_safety(&self) -> Result<(), SafetyError> {
        if self.state == 0 {
            return Err(SafetyError::InvalidField {
                node: "BlockCountDeltaPrior",
                field: "state",
                reason: "must be >= 1",
            });
        }
        Ok(())
    }
}

/// `B ~ ZeroTruncatedPoisson(mean)`.
#[derive(Debug, Clone)]
pub struct BlockCountPoissonPrior {
    id: PriorId,
    mean: f64,
    state: u64,
}

impl BlockCountPoissonPrior {
    #[must_use]
    pub fn new(mean: f64) -> Self {
        Self { id: PriorId::next(), mean, state: 1 }
    }
}

/// `B ~ Uniform[min, max]`.
#[derive(Debug, Clone)]
pub struct BlockCountUniformPrior {
    id: PriorId,
    min: u64,
    max: u64,
    state: u64,
}

impl BlockCountUniformPrior {
    #[must_use]
    pub fn new(min: u64, max: u64) -> Self {
        Self { id: PriorId::next(), min, max, state: min }
    }
}

/// Tagged union of flat block-count prior variants.
#[derive(Debug, Clone)]
pub enum BlockCountPrior {
    Delta(BlockCountDeltaPrior),
    Poisson(BlockCountPoissonPrior),
    Uniform(BlockCountUniformPrior),
}

impl BlockCountPrior {
    #[must_use]
    pub fn id(&self) -> PriorId {
        match self {
            Self::Delta(p) => p.id,
            Self::Poisson(p) => p.id,
            Self::Uniform(p) => p.id,
        }
    }

    #[must_use]
    pub fn state(&self) -> u64 {
        match self {
            Self::Delta(p) => p.state,
            Self::Poisson(p) => p.state,
            Self::Uniform(p) => p.state,
        }
    }

    pub fn set_state(&mut self, state: u64) {
        match self {
            Self::Delta(p) => p.state = state,
            Self::Poisson(p) => p.state = state,
            Self::Uniform(p) => p.state = state,
        }
    }

    /// Sets the state from `max(partition) + 1`.
    pub fn set_state_from_partition(&mut self, max_label: u64) {
        self.set_state(max_label + 1);
    }

    pub fn sample_state(&mut self, rng: &mut dyn Rng) {
        match self {
            Self::Delta(_) => {}
            Self::Poisson(p) => {
                // Rejection sampling for the zero-truncated case: cheap given
                // typical block-count means stay well above 1.
                loop {
                    let draw = rng.poisson(p.mean);
                    if draw >= 1 {
                        p.state = draw;
                        break;
                    }
                }
            }
            Self::Uniform(p) => {
                p.state = p.min + rng.uniform_usize(0, (p.max - p.min + 1) as usize) as u64;
            }
        }
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    #[must_use]
    pub fn log_likelihood_from_state(&self, state: u64) -> f64 {
        match self {
            Self::Delta(p) => {
                if state == p.state {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Poisson(p) => log_zero_truncated_poisson_pmf(state, p.mean),
            Self::Uniform(p) => {
                if state < p.min || state > p.max {
                    f64::NEG_INFINITY
                } else {
                    -((p.max - p.min + 1) as f64).ln()
                }
            }
        }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood_from_state(self.state())
    }

    /// `_applyLabelMove` is not meaningful for a bare block-count prior: the
    /// owning block prior is the one that updates `B` after a label move.
    pub fn apply_label_move(&self) -> Result<(), DepletedMethodError> {
        Err(DepletedMethodError::NotSupported {
            type_name: "BlockCountPrior",
            method: "apply_label_move",
        })
    }
}

impl PriorNode for BlockCountPrior {
    fn id(&self) -> PriorId {
        Self::id(self)
    }

    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id(), (), |_| {});
    }
}

/// Nested block-count prior: `B_0 > B_1 > ... > B_{D-1} = 1`, strictly
/// decreasing until the terminal `1`.
#[derive(Debug, Clone)]
pub struct NestedBlockCountPrior {
    id: PriorId,
    counts: Vec<u64>,
}

impl NestedBlockCountPrior {
    /// Builds a nested block-count prior from an explicit, strictly
    /// decreasing sequence. The caller must supply a terminal `1`.
    #[must_use]
    pub fn new(counts: Vec<u64>) -> Self {
        Self { id: PriorId::next(), counts }
    }

    #[must_use]
    pub fn id(&self) -> PriorId {
        self.id
    }

    #[must_use]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Depth: the first index after which the sequence is constantly `1`.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.counts.iter().position(|&b| b == 1).map_or(self.counts.len(), |i| i + 1)
    }

    #[must_use]
    pub fn block_count_at(&self, level: usize) -> Option<u64> {
        self.counts.get(level).copied()
    }

    pub fn check_safety(&self) -> Result<(), SafetyError> {
        if self.counts.is_empty() {
            return Err(SafetyError::InvalidField {
                node: "NestedBlockCountPrior",
                field: "counts",
                reason: "must not be empty",
            });
        }
        if *self.counts.last().expect("checked non-empty above") != 1 {
            return Err(SafetyError::InvalidField {
                node: "NestedBlockCountPrior",
                field: "counts",
                reason: "must terminate at 1",
            });
        }
        for window in self.counts.windows(2) {
            if window[1] != 1 && window[0] <= window[1] {
                return Err(SafetyError::InvalidField {
                    node: "NestedBlockCountPrior",
                    field: "counts",
                    reason: "must be strictly decreasing before reaching 1",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_prior_rejects_out_of_range_states() {
        let prior = BlockCountPrior::Uniform(BlockCountUniformPrior::new(2, 5));
        assert!(prior.log_likelihood_from_state(1).is_infinite());
        assert!(prior.log_likelihood_from_state(6).is_infinite());
        assert!((prior.log_likelihood_from_state(3) + (4.0_f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn poisson_prior_rejects_zero() {
        let prior = BlockCountPrior::Poisson(BlockCountPoissonPrior::new(4.0));
        assert_eq!(prior.log_likelihood_from_state(0), f64::NEG_INFINITY);
    }

    #[test]
    fn nested_depth_is_first_constant_one_index() {
        let prior = NestedBlockCountPrior::new(vec![12, 4, 1, 1]);
        assert_eq!(prior.depth(), 3);
        prior.check_safety().expect("valid sequence");
    }

    #[test]
    fn nested_safety_rejects_non_decreasing_sequences() {
        let prior = NestedBlockCountPrior::new(vec![3, 3, 1]);
        assert!(prior.check_safety().is_err());
    }
}
