//! Prior-tree protocol (C1).
//!
//! A prior is a node exposing `sample`, `score`, `apply move`, and
//! `score ratio`. The source models shared sub-priors with a per-node
//! `isProcessed` boolean cleared by the outermost recursive call; per the
//! redesign notes that is replaced here with a visitor-owned
//! [`VisitGuard`] threaded by `&mut` through the recursion. The guard is a
//! local variable at the outermost call site, so it is dropped (and hence
//! "cleared") on every exit path, including panics, without an explicit
//! `computationFinished` step.
//!
//! Each concrete prior is assigned a [`PriorId`] at construction, per the
//! "stable index" alternative noted in the design notes, rather than
//! pointer identity.

pub mod block;
pub mod block_count;
pub mod degree;
pub mod edge_count;
pub mod label_graph;
pub mod nested_block;
pub mod nested_label_graph;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::rng::Rng;

/// Stable identity assigned to a prior node at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PriorId(u64);

static NEXT_PRIOR_ID: AtomicU64 = AtomicU64::new(1);

impl PriorId {
    /// Allocates a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_PRIOR_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// The visited-node set owned by the outermost call of a recursive
/// traversal (`sample`, `get_log_prior`, `apply_*`, `*_ratio_from_*`).
pub type VisitGuard = HashSet<PriorId>;

/// Runs `body` exactly once per `id` per traversal: if `id` has already been
/// visited in `guard`, returns `default` instead of invoking `body`. This is
/// the direct replacement for the source's `processRecursiveFunction` /
/// `processRecursiveConstFunction`, minus the boolean-flag bookkeeping.
pub fn process_once<T>(guard: &mut VisitGuard, id: PriorId, default: T, body: impl FnOnce(&mut VisitGuard) -> T) -> T {
    if !guard.insert(id) {
        return default;
    }
    body(guard)
}

/// The uniform node interface from the prior-tree protocol: every concrete
/// prior implements this directly on its tagged-variant enum. `sample_priors`
/// is the `_samplePriors` half of the `sample()` rule — it recursively
/// samples this node's own parent priors (none, for every leaf prior in this
/// crate) and is itself guarded by [`process_once`] so a sub-prior shared by
/// more than one owner is still sampled exactly once per traversal.
///
/// Model types are the "outermost call": each owns one [`VisitGuard`] for
/// the duration of its own `sample()`/`log_joint()`/`apply_*` call and
/// passes it by `&mut` to every prior it holds, per §4.1's "outermost call
/// owns the set" rule.
pub trait PriorNode {
    fn id(&self) -> PriorId;

    fn sample_priors(&mut self, rng: &mut dyn Rng, visited: &mut VisitGuard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_once_skips_repeat_visits() {
        let mut guard = VisitGuard::new();
        let id = PriorId::next();
        let first = process_once(&mut guard, id, 0, |_| 1);
        let second = process_once(&mut guard, id, 0, |_| 1);
        assert_eq!(first, 1);
        assert_eq!(second, 0);
    }

    #[test]
    fn distinct_ids_are_independent() {
        let mut guard = VisitGuard::new();
        let a = PriorId::next();
        let b = PriorId::next();
        assert_eq!(process_once(&mut guard, a, 0, |_| 1), 1);
        assert_eq!(process_once(&mut guard, b, 0, |_| 2), 2);
    }

    /// A prior shared by two owners (the diamond case the guard exists for):
    /// both hold the same [`PriorId`] and a shared `times_sampled` counter.
    struct SharedCounterPrior {
        id: PriorId,
        times_sampled: std::rc::Rc<std::cell::Cell<u32>>,
    }

    impl PriorNode for SharedCounterPrior {
        fn id(&self) -> PriorId {
            self.id
        }

        fn sample_priors(&mut self, _rng: &mut dyn Rng, visited: &mut VisitGuard) {
            process_once(visited, self.id, (), |_| {
                self.times_sampled.set(self.times_sampled.get() + 1);
            });
        }
    }

    #[test]
    fn shared_prior_sampled_once_per_traversal_via_prior_node() {
        use crate::rng::StdRngSource;

        let counter = std::rc::Rc::new(std::cell::Cell::new(0));
        let id = PriorId::next();
        let mut owner_a = SharedCounterPrior { id, times_sampled: counter.clone() };
        let mut owner_b = SharedCounterPrior { id, times_sampled: counter.clone() };
        let mut rng = StdRngSource::seeded(1);
        let mut visited = VisitGuard::new();

        owner_a.sample_priors(&mut rng, &mut visited);
        owner_b.sample_priors(&mut rng, &mut visited);

        assert_eq!(counter.get(), 1);
    }
}
