use rand::Rng;
use tracing::debug;

use super::{BranchingRule, BranchingSet, Repair, SearchStats};
use crate::ordering::{Ordering, Policy};

/// Take back the last `c` placements and refill those slots contiguously.
///
/// Works on either policy. Candidates are the removed vertices plus, unless
/// `only_reorder`, every unplaced vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastC {
    pub c: usize,
    pub only_reorder: bool,
    pub rule: BranchingRule,
}

impl Default for LastC {
    fn default() -> Self {
        Self {
            c: 4,
            only_reorder: false,
            rule: BranchingRule::ByDistance,
        }
    }
}

impl<P: Policy> Repair<P> for LastC {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, P>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        assert!(!ord.is_extendable(), "last-c: ordering is already extendable");
        let problem = ord.last_placed();
        let mut removed = Vec::with_capacity(self.c);
        while removed.len() < self.c && ord.last_placed().is_some() {
            removed.push(ord.unplace());
        }
        let mut set = if self.only_reorder {
            BranchingSet::new(self.rule, ord.graph(), problem, removed.iter().copied())
        } else {
            BranchingSet::new(self.rule, ord.graph(), problem, ord.free_vertices())
        };
        debug!(
            c = self.c,
            window = removed.len(),
            candidates = set.len(),
            "last-c window"
        );

        if fill(ord, &mut set, 0, removed.len(), rng, stats) {
            debug!("last-c repaired");
            return true;
        }
        for &v in removed.iter().rev() {
            ord.place(v);
        }
        debug!("last-c exhausted");
        false
    }
}

fn fill<P: Policy, R: Rng + ?Sized>(
    ord: &mut Ordering<'_, P>,
    set: &mut BranchingSet,
    depth: usize,
    window: usize,
    rng: &mut R,
    stats: &mut SearchStats,
) -> bool {
    stats.node();
    if depth == window {
        stats.leaf(depth);
        return ord.is_extendable();
    }
    let mut choices = set.candidates(rng);
    if ord.cfg().restrict_to_component {
        let component = ord.focus_component();
        choices.retain(|v| component.contains(v));
    }
    let mut descended = false;
    for u in choices {
        let mut trial = ord.trial_place(u);
        if !trial.is_extendable() {
            continue;
        }
        descended = true;
        set.remove(u);
        if fill(&mut *trial, set, depth + 1, window, rng, stats) {
            trial.commit();
            return true;
        }
        set.insert(u);
    }
    if !descended {
        stats.leaf(depth);
    }
    false
}
