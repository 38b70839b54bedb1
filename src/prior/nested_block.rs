//! Nested partition prior (C3).
//!
//! State is a vector of partitions `b^(0), b^(1), ..., b^(D-1)`: `b^(0)`
//! partitions the `N` vertices, and `b^(l+1)` partitions the *labels* of
//! level `l` (so `levels[l+1].len() == block_count_at(l)`). A vertex's
//! label at level `l` is the composition of `levels[0..=l]`.

use crate::error::InvalidMoveError;
use crate::moves::LabelMove;
use crate::numeric::{log_binomial_coefficient, log_factorial, log_multinomial_coefficient};
use crate::prior::block::{max_block_count, vertex_counts};
use crate::prior::{process_once, PriorId, PriorNode, VisitGuard};
use crate::rng::Rng;

/// Which flat identity (§4.3) each level of the nested partition follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedBlockVariant {
    Uniform,
    UniformHyper,
}

#[derive(Debug, Clone)]
pub struct NestedBlockPrior {
    id: PriorId,
    variant: NestedBlockVariant,
    levels: Vec<Vec<usize>>,
}

impl NestedBlockPrior {
    /// Builds a nested partition prior from an explicit level stack.
    /// `levels[0]` has length `n`; `levels[l]` has length
    /// `block_count_at(l - 1)` for `l >= 1`.
    #[must_use]
    pub fn new(variant: NestedBlockVariant, levels: Vec<Vec<usize>>) -> Self {
        Self { id: PriorId::next(), variant, levels }
    }

    #[must_use]
    pub fn id(&self) -> PriorId {
        self.id
    }

    #[must_use]
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    #[must_use]
    pub fn variant(&self) -> NestedBlockVariant {
        self.variant
    }

    pub fn set_levels(&mut self, levels: Vec<Vec<usize>>) {
        self.levels = levels;
    }

    /// First index after which every remaining level has exactly one block.
    #[must_use]
    pub fn depth(&self) -> usize {
        for (i, level) in self.levels.iter().enumerate() {
            if max_block_count(level) <= 1 {
                return i + 1;
            }
        }
        self.levels.len()
    }

    #[must_use]
    pub fn block_count_at(&self, level: usize) -> usize {
        self.levels.get(level).map_or(1, |l| max_block_count(l))
    }

    /// A vertex's label at `level`, composing `levels[0..=level]`.
    #[must_use]
    pub fn label_at(&self, vertex: usize, level: usize) -> usize {
        let mut idx = vertex;
        for l in &self.levels[..=level] {
            idx = l[idx];
        }
        idx
    }

    /// Flattened labels at `level` for every vertex in `levels[0]`'s domain.
    #[must_use]
    pub fn labels_at(&self, level: usize, n_vertices: usize) -> Vec<usize> {
        (0..n_vertices).map(|v| self.label_at(v, level)).collect()
    }

    /// Samples a fresh level stack: level 0 over `n` vertices with
    /// `block_counts[0]` blocks, each subsequent level over
    /// `block_counts[l-1]` items with `block_counts[l]` blocks.
    pub fn sample_state(&mut self, rng: &mut dyn Rng, n: usize, block_counts: &[usize]) {
        let mut levels = Vec::with_capacity(block_counts.len());
        let mut prev_size = n;
        for &b in block_counts {
            let level = match self.variant {
                NestedBlockVariant::Uniform => (0..prev_size).map(|_| rng.uniform_usize(0, b)).collect(),
                NestedBlockVariant::UniformHyper => {
                    let counts = crate::generators::sample_random_weak_composition(rng, prev_size as u64, b as u64);
                    let mut pool: Vec<usize> = Vec::with_capacity(prev_size);
                    for (label, &c) in counts.iter().enumerate() {
                        pool.extend(std::iter::repeat(label).take(c as usize));
                    }
                    crate::generators::shuffle(rng, &mut pool);
                    pool
                }
            };
            prev_size = b;
            levels.push(level);
        }
        self.levels = levels;
    }

    #[must_use]
    pub fn log_prior(&self) -> f64 {
        0.0
    }

    fn level_log_likelihood(&self, level: &[usize], block_count: u64) -> f64 {
        let n = level.len() as f64;
        match self.variant {
            NestedBlockVariant::Uniform => -n * (block_count as f64).ln(),
            NestedBlockVariant::UniformHyper => {
                let counts = vertex_counts(level);
                let total: u64 = counts.iter().sum();
                -log_multinomial_coefficient(total, &counts) - log_binomial_coefficient(n as u64 - 1, block_count - 1)
            }
        }
    }

    #[must_use]
    pub fn log_likelihood(&self) -> f64 {
        self.levels
            .iter()
            .map(|level| self.level_log_likelihood(level, max_block_count(level) as u64))
            .sum()
    }

    /// Applies a label move at `mv.level`, updating only that level's entry.
    pub fn apply_label_move(&mut self, mv: &LabelMove) -> Result<(), InvalidMoveError> {
        let depth = self.depth();
        if mv.level >= depth {
            return Err(InvalidMoveError::UnsupportedLevel { level: mv.level, depth });
        }
        self.levels[mv.level][mv.vertex] = mv.next_label;
        Ok(())
    }

    /// Ratio contribution from a single-level move: the other levels are
    /// untouched by construction, so only `mv.level`'s flat identity
    /// changes.
    #[must_use]
    pub fn log_likelihood_ratio_from_label_move(&self, mv: &LabelMove, next_block_count: u64) -> f64 {
        if mv.is_identity() {
            return 0.0;
        }
        let level = &self.levels[mv.level];
        let block_count = max_block_count(level) as u64;
        let before = self.level_log_likelihood(level, block_count);
        let mut moved = level.clone();
        moved[mv.vertex] = mv.next_label;
        let after = self.level_log_likelihood(&moved, next_block_count);
        after - before
    }
}

impl PriorNode for NestedBlockPrior {
    fn id(&self) -> PriorId {
        self.id
    }

    fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
        process_once(visited, self.id, (), |_| {});
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::LabelDelta;

    #[test]
    fn depth_stops_at_first_singleton_level() {
        let prior = NestedBlockPrior::new(
            NestedBlockVariant::Uniform,
            vec![vec![0, 0, 1, 1], vec![0, 0], vec![0]],
        );
        assert_eq!(prior.depth(), 3);
    }

    #[test]
    fn label_at_composes_levels() {
        let prior = NestedBlockPrior::new(
            NestedBlockVariant::Uniform,
            vec![vec![0, 1, 2, 2], vec![0, 0, 1]],
        );
        assert_eq!(prior.label_at(3, 0), 2);
        assert_eq!(prior.label_at(3, 1), 1);
        assert_eq!(prior.label_at(0, 1), 0);
    }

    #[test]
    fn ratio_matches_direct_recomputation_for_uniform_level() {
        let prior = NestedBlockPrior::new(NestedBlockVariant::Uniform, vec![vec![0, 0, 1]]);
        let mv = LabelMove::new(0, 0, 1, LabelDelta::Unchanged, 0);
        let ratio = prior.log_likelihood_ratio_from_label_move(&mv, 2);
        let before = prior.log_likelihood();
        let mut next = prior.clone();
        next.apply_label_move(&mv).expect("valid move");
        let after = next.log_likelihood();
        assert!((ratio - (after - before)).abs() < 1e-9);
    }
}
