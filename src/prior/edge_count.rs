//! Edge-count prior (C2).
//!
//! State is a single non-negative integer `E`. `_getLogPrior` is always `0`
//! (edge count has no parent in this chain) and `_applyGraphMove` just
//! updates `E` by the move's delta, so all of the interesting behaviour
//! lives in `getLogLikelihoodFromState`.

use crate::error::InvalidMoveError;
use crate::moves::GraphMove;
use crate::numeric::log_poisson_pmf;
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

fn state_after_move(state: u64, mv: &GraphMove) -> Result<u64, InvalidMoveError> {
    let delta = mv.edge_count_delta();
    let next = state as i64 + delta;
    if next < 0 {
        return Err(InvalidMoveError::NegativeEdgeCount { got: next });
    }
    Ok(next as u64)
}

/// Edge count fixed to a constant `e0`.
#[derive(Debug, Clone)]
pub struct EdgeCountDeltaPrior {
    id: PriorId,
    e0: u64,
}

impl EdgeCountDeltaPrior {
    #[must_use]
    pub fn new(e0: u64) -> Self {
        Self { id: PriorId::next(), e0 }
    }
}

/// `E ~ Poisson(mean)`.
#[derive(Debug, Clone)]
pub struct EdgeCountPoissonPrior {
    id: PriorId,
    mean: f64,
    state: u64,
}

impl EdgeCountPoissonPrior {
    #[must_use]
    pub fn new(mean: f64) -> Self {
        Self { id: PriorId::next(), mean, state: 0 }
    }
}

/// `E ~ Geometric(p)` with `p = 1 / (mean + 1)`, i.e. mean `mean`.
#[derive(Debug, Clone)]
pub struct EdgeCountExponentialPrior {
    id: PriorId,
    mean: f64,
    state: u64,
}

impl EdgeCountExponentialPrior {
    #[must_use]
    pub fn new(mean: f64) -> Self {
        Self { id: PriorId::next(), mean, state: 0 }
    }
}

/// Tagged union of edge-count prior variants, matching the "collapse the
/// inheritance hierarchy into a tagged variant" design-note guidance.
#[derive(Debug, Clone)]
pub enum EdgeCountPrior {
    Delta(EdgeCountDeltaPrior),
    Poisson(EdgeCountPoissonPrior),
    Exponential(EdgeCountExponentialPrior),
}

impl EdgeCountPrior {
    #[must_use]
    pub fn id(&self) -> PriorId {
        match self {
            Self::Delta(p) => p.id,
            Self::Poisson(p) => p.id,
            Self::Exponential(p) => p.id,
        }
    }

    #[must_use]
    pub fn state(&self) -> u64 {
        match self {
            Self::Delta(p) => p.e0,
            Self::Poisson(p) => p.state,
            Self::Exponential(p) => p.state,
        }
    }

    pub fn set_state(&mut self, state: u64) {
        match self {
            Self::Delta(p) => p.e0 = state,
            Self::Poisson(p) => p.state = state,
            Self::Exponential(p) => p.state = state,
        }
    }

    pub fn sample_state(&mut self, rng: &mut dyn Rng) {
        match self {
            Self::Delta(_) => {}
            Self::Poisson(p) => p.state = rng.poisson(p.mean),
            Self::Exponential(p) => {
                let prob = 1.0 / (p.mean + 1.0);
                p.state = rng.geometric(prob);
            }
        }
    }

    /// `sample()` rule: `_samplePriors()` (guarded, a no-op here since edge
    /// count has no parent) then `sampleState()`.
    pub fn sample(&mut self, rng: &mut dyn Rng, visited: &mut VisitGuard) {
        self.sample_priors(rng, visited);
        self.sample_state(rng);
    }

    /// `_getLogPrior`: edge count has no parent contribution.
    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    #[must_use]
    pub fn log_likelihood_from_state(&self, state: u64) -> f64 {
        match self {
            Self::Delta(p) => {
                if state == p.e0 {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Poisson(p) => log_poisson_pmf(state, p.mean),
            Self::Exponential(p) => {
                let prob = 1.0 / (p.mean + 1.0);
                (state as f64) * (1.0 - prob).ln() + prob.ln()
            }
        }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood_from_state(self.state())
    }

    #[must_use]
    pub fn log_joint(&self) -> f64 {
        self.log_likelihood() + self.log_prior()
    }

    pub fn state_after_graph_move(&self, mv: &GraphMove) -> Result<u64, InvalidMoveError> {
        state_after_move(self.state(), mv)
    }

    pub fn apply_graph_move(&mut self, mv: &GraphMove) -> Result<(), InvalidMoveError> {
        let next = self.state_after_graph_move(mv)?;
        self.set_state(next);
        Ok(())
    }

    /// `_getLogPriorRatioFromGraphMove`: always `0` (no parent contribution).
    #[must_use]
    pub fn log_prior_ratio_from_graph_move(&self, _mv: &GraphMove) -> f64 {
        0.0
    }

    #[must_use]
    pub fn log_likelihood_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
        match self.state_after_graph_move(mv) {
            Err(_) => f64::NEG_INFINITY,
            Ok(next) => self.log_likelihood_from_state(next) - self.log_likelihood(),
        }
    }

    #[must_use]
    pub fn log_joint_ratio_from_graph_move(&self, mv: &GraphMove) -> f64 {
        self.log_likelihood_ratio_from_graph_move(mv) + self.log_prior_ratio_from_graph_move(mv)
    }
}

impl PriorNode for EdgeCountPrior {
    fn id(&self) -> PriorId {
        Self::id(self)
    }

    /// No parent: edge count has no parent contribution.
    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id(), (), |_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::GraphMove;

    #[test]
    fn delta_prior_rejects_any_other_state() {
        let prior = EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(5));
        assert_eq!(prior.log_likelihood_from_state(5), 0.0);
        assert_eq!(prior.log_likelihood_from_state(4), f64::NEG_INFINITY);
    }

    #[test]
    fn delta_prior_ratio_is_zero_for_balanced_moves() {
        let prior = EdgeCountPrior::Delta(EdgeCountDeltaPrior::new(5));
        let balanced = GraphMove::new(vec![(0, 1)], vec![(0, 2)]);
        assert_eq!(prior.log_likelihood_ratio_from_graph_move(&balanced), 0.0);
        let unbalanced = GraphMove::new(vec![], vec![(0, 2)]);
        assert_eq!(
            prior.log_likelihood_ratio_from_graph_move(&unbalanced),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn negative_state_is_rejected() {
        let mut prior = EdgeCountPrior::Poisson(EdgeCountPoissonPrior::new(3.0));
        prior.set_state(0);
        let removal_only = GraphMove::new(vec![(0, 1)], vec![]);
        assert_eq!(
            prior.log_likelihood_ratio_from_graph_move(&removal_only),
            f64::NEG_INFINITY
        );
        assert!(prior.apply_graph_move(&removal_only).is_err());
    }

    #[test]
    fn poisson_apply_updates_state() {
        let mut prior = EdgeCountPrior::Poisson(EdgeCountPoissonPrior::new(3.0));
        prior.set_state(2);
        let mv = GraphMove::new(vec![], vec![(0, 1), (2, 3)]);
        prior.apply_graph_move(&mv).expect("move is valid");
        assert_eq!(prior.state(), 4);
    }
}
