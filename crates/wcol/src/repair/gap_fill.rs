use std::collections::{BTreeSet, HashSet};

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, trace};

use super::{BranchingRule, BranchingSet, Repair, SearchStats};
use crate::ordering::{Append, Ordering};

/// Where [`GapFill`] draws its window positions from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Pool {
    /// Placed vertices within graph distance `r` of an overflowing vertex.
    #[default]
    RadiusNeighbourhood,
    /// Placed vertices in the reach of an overflowing vertex.
    ReachUnion,
}

/// Empty `c` randomly chosen slots near the overflow and refill them, one
/// slot at a time in position order, while everything else stays put.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GapFill {
    pub pool: Pool,
    pub c: usize,
    pub only_reorder: bool,
    pub rule: BranchingRule,
    /// Independent random windows tried before giving up.
    pub attempts: usize,
}

impl Default for GapFill {
    fn default() -> Self {
        Self {
            pool: Pool::RadiusNeighbourhood,
            c: 4,
            only_reorder: false,
            rule: BranchingRule::Random,
            attempts: 10,
        }
    }
}

impl GapFill {
    fn window_pool(&self, ord: &Ordering<'_, Append>) -> Vec<usize> {
        let sources: Vec<usize> = if ord.too_full().is_empty() {
            ord.last_placed().into_iter().collect()
        } else {
            ord.too_full().iter().copied().collect()
        };
        let mut pool = BTreeSet::new();
        for v in sources {
            match self.pool {
                Pool::RadiusNeighbourhood => pool.extend(ord.graph().ball(v, ord.radius())),
                Pool::ReachUnion => pool.extend(ord.reach(v).iter().copied()),
            }
        }
        pool.into_iter().filter_map(|v| ord.position(v)).collect()
    }
}

impl Repair<Append> for GapFill {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        assert!(!ord.is_extendable(), "gap-fill: ordering is already extendable");
        let problem = ord.last_placed();
        let mut positions = self.window_pool(ord);
        debug!(pool = ?self.pool, positions = positions.len(), "gap-fill pool");

        for attempt in 0..self.attempts {
            positions.shuffle(rng);
            let mut window: Vec<usize> = positions.iter().copied().take(self.c).collect();
            window.sort_unstable();

            let originals: Vec<(usize, usize)> = window
                .iter()
                .rev()
                .map(|&pos| (pos, ord.unplace_at(pos)))
                .collect();
            let mut set = if self.only_reorder {
                BranchingSet::new(self.rule, ord.graph(), problem, originals.iter().map(|&(_, v)| v))
            } else {
                BranchingSet::new(self.rule, ord.graph(), problem, ord.free_vertices())
            };

            if fill_gaps(ord, &window, 0, &mut set, rng, stats) {
                debug!(attempt, window = window.len(), "gap-fill repaired");
                return true;
            }
            for &(pos, v) in originals.iter().rev() {
                ord.place_at(v, pos);
            }
            trace!(attempt, "gap-fill window failed");
        }
        debug!(attempts = self.attempts, "gap-fill exhausted");
        false
    }
}

fn fill_gaps<R: Rng + ?Sized>(
    ord: &mut Ordering<'_, Append>,
    window: &[usize],
    depth: usize,
    set: &mut BranchingSet,
    rng: &mut R,
    stats: &mut SearchStats,
) -> bool {
    stats.node();
    let Some((&pos, rest)) = window.split_first() else {
        stats.leaf(depth);
        return ord.is_extendable();
    };
    let choices = set.candidates(rng);
    let k = ord.k();
    // reach from the fixed prefix left of pos is already too large
    for &u in &choices {
        if ord.reach_size(u) > k {
            let fixed = 1 + ord
                .reach(u)
                .iter()
                .filter(|&&w| ord.position(w).is_some_and(|p| p < pos))
                .count();
            if fixed > k {
                stats.leaf(depth);
                return false;
            }
        }
    }
    let open: HashSet<usize> = choices.iter().copied().collect();
    let mut descended = false;
    for u in choices {
        let mut edit = ord.edit_place_at(u, pos);
        if !edit.too_full().iter().all(|v| open.contains(v)) {
            continue;
        }
        descended = true;
        set.remove(u);
        if fill_gaps(&mut *edit, rest, depth + 1, set, rng, stats) {
            edit.commit();
            return true;
        }
        set.insert(u);
    }
    if !descended {
        stats.leaf(depth);
    }
    false
}
