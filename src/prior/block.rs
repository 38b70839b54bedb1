//! Block (partition) prior (C3) — flat case.
//!
//! State is a partition `b: {0..N-1} -> N` of vertices into integer labels.
//! The block-count `B` used in the likelihood/ratio formulae is always the
//! *parent* block-count prior's current value, passed in by the caller at
//! use time rather than cached, per the "explicit borrow relationships"
//! redesign note (no raw back-pointer to the parent).

use crate::error::InvalidMoveError;
use crate::moves::LabelMove;
use crate::numeric::{log_binomial_coefficient, log_factorial, log_multinomial_coefficient};
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

/// Per-label vertex counts, indexed `0..=max(labels)`.
#[must_use]
pub fn vertex_counts(labels: &[usize]) -> Vec<u64> {
    let max = labels.iter().copied().max().unwrap_or(0);
    let mut counts = vec![0u64; max + 1];
    for &b in labels {
        counts[b] += 1;
    }
    counts
}

/// Number of non-empty labels.
#[must_use]
pub fn effective_block_count(labels: &[usize]) -> usize {
    vertex_counts(labels).iter().filter(|&&c| c > 0).count()
}

/// `max(labels) + 1`.
#[must_use]
pub fn max_block_count(labels: &[usize]) -> usize {
    labels.iter().copied().max().map_or(0, |m| m + 1)
}

/// Relabels `labels` to first-occurrence order over `{0, ..., B_eff - 1}`,
/// dropping empty labels. Idempotent: reducing a reduced partition returns
/// it unchanged.
#[must_use]
pub fn reduce_partition(labels: &[usize]) -> Vec<usize> {
    let mut next_id = 0usize;
    let mut remap = std::collections::HashMap::new();
    labels
        .iter()
        .map(|&b| {
            *remap.entry(b).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            })
        })
        .collect()
}

/// Fixed partition `b0`.
#[derive(Debug, Clone)]
pub struct BlockDeltaPrior {
    id: PriorId,
    labels: Vec<usize>,
}

impl BlockDeltaPrior {
    #[must_use]
    pub fn new(labels: Vec<usize>) -> Self {
        Self { id: PriorId::next(), labels }
    }
}

/// Each vertex independently uniform over `{0, ..., B-1}`.
#[derive(Debug, Clone)]
pub struct BlockUniformPrior {
    id: PriorId,
    labels: Vec<usize>,
}

impl BlockUniformPrior {
    #[must_use]
    pub fn new(labels: Vec<usize>) -> Self {
        Self { id: PriorId::next(), labels }
    }
}

/// Draws a vertex-count composition of `N` into `B` parts uniformly, then
/// uniformly permutes vertices across those counts.
#[derive(Debug, Clone)]
pub struct BlockUniformHyperPrior {
    id: PriorId,
    labels: Vec<usize>,
}

impl BlockUniformHyperPrior {
    #[must_use]
    pub fn new(labels: Vec<usize>) -> Self {
        Self { id: PriorId::next(), labels }
    }
}

/// Tagged union of flat partition-prior variants.
#[derive(Debug, Clone)]
pub enum BlockPrior {
    Delta(BlockDeltaPrior),
    Uniform(BlockUniformPrior),
    UniformHyper(BlockUniformHyperPrior),
}

impl BlockPrior {
    #[must_use]
    pub fn id(&self) -> PriorId {
        match self {
            Self::Delta(p) => p.id,
            Self::Uniform(p) => p.id,
            Self::UniformHyper(p) => p.id,
        }
    }

    #[must_use]
    pub fn labels(&self) -> &[usize] {
        match self {
            Self::Delta(p) => &p.labels,
            Self::Uniform(p) => &p.labels,
            Self::UniformHyper(p) => &p.labels,
        }
    }

    pub fn set_labels(&mut self, labels: Vec<usize>) {
        match self {
            Self::Delta(p) => p.labels = labels,
            Self::Uniform(p) => p.labels = labels,
            Self::UniformHyper(p) => p.labels = labels,
        }
    }

    #[must_use]
    pub fn vertex_counts(&self) -> Vec<u64> {
        vertex_counts(self.labels())
    }

    #[must_use]
    pub fn effective_block_count(&self) -> usize {
        effective_block_count(self.labels())
    }

    #[must_use]
    pub fn max_block_count(&self) -> usize {
        max_block_count(self.labels())
    }

    /// Samples a partition of `n` vertices into `block_count` labels.
    pub fn sample_state(&mut self, rng: &mut dyn Rng, n: usize, block_count: u64) {
        let labels = match self {
            Self::Delta(_) => return,
            Self::Uniform(_) => (0..n).map(|_| rng.uniform_usize(0, block_count as usize)).collect(),
            Self::UniformHyper(_) => {
                let counts = crate::generators::sample_random_weak_composition(rng, n as u64, block_count);
                let mut pool: Vec<usize> = Vec::with_capacity(n);
                for (label, &count) in counts.iter().enumerate() {
                    pool.extend(std::iter::repeat(label).take(count as usize));
                }
                crate::generators::shuffle(rng, &mut pool);
                pool
            }
        };
        self.set_labels(labels);
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    #[must_use]
    pub fn log_likelihood_from_state(&self, labels: &[usize], block_count: u64) -> f64 {
        let n = labels.len() as f64;
        match self {
            Self::Delta(p) => {
                if labels == p.labels.as_slice() {
                    0.0
                } else {
                    f64::NEG_INFINITY
                }
            }
            Self::Uniform(_) => -n * (block_count as f64).ln(),
            Self::UniformHyper(_) => {
                let counts = vertex_counts(labels);
                let total: u64 = counts.iter().sum();
                -log_multinomial_coefficient(total, &counts) - log_binomial_coefficient(n as u64 - 1, block_count - 1)
            }
        }
    }

    #[must_use]
    pub fn log_likelihood(&self, block_count: u64) -> f64 {
        self.log_likelihood_from_state(self.labels(), block_count)
    }

    /// Applies a label move: the moving vertex's entry changes from
    /// `prev_label` to `next_label`.
    pub fn apply_label_move(&mut self, mv: &LabelMove) -> Result<(), InvalidMoveError> {
        let labels = match self {
            Self::Delta(p) => &mut p.labels,
            Self::Uniform(p) => &mut p.labels,
            Self::UniformHyper(p) => &mut p.labels,
        };
        labels[mv.vertex] = mv.next_label;
        Ok(())
    }

    /// `_getLogPriorRatioFromLabelMove`: §4.3 formulae, parameterised by the
    /// block count and `ΔB` *before* the move is applied.
    #[must_use]
    pub fn log_likelihood_ratio_from_label_move(&self, mv: &LabelMove, block_count: u64) -> f64 {
        if mv.is_identity() {
            return 0.0;
        }
        let n = self.labels().len() as f64;
        let delta_b = mv.added_labels.as_i64();
        let next_block_count = block_count as i64 + delta_b;
        if next_block_count < 1 {
            return f64::NEG_INFINITY;
        }
        match self {
            Self::Delta(_) => f64::NEG_INFINITY,
            Self::Uniform(_) => -n * ((next_block_count as f64).ln() - (block_count as f64).ln()),
            Self::UniformHyper(_) => {
                let counts = vertex_counts(self.labels());
                let n_r = counts.get(mv.prev_label).copied().unwrap_or(0);
                let n_s = counts.get(mv.next_label).copied().unwrap_or(0);
                let term_counts = log_factorial(n_s + 1) + log_factorial(n_r.saturating_sub(1))
                    - log_factorial(n_s)
                    - log_factorial(n_r);
                let term_binom = log_binomial_coefficient(n as u64 - 1, (next_block_count - 1) as u64)
                    - log_binomial_coefficient(n as u64 - 1, block_count - 1);
                term_counts - term_binom
            }
        }
    }
}

impl PriorNode for BlockPrior {
    fn id(&self) -> PriorId {
        Self::id(self)
    }

    /// No parent: the partition's block count is read from whatever the
    /// owning model passes to `sample_state`, not cached from a held prior.
    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id(), (), |_| {});
    }
}
