use std::collections::BTreeSet;

use rand::Rng;
use tracing::{debug, trace};

use super::{Repair, SearchStats};
use crate::ordering::{Append, Ordering};

/// Randomized hill climbing: repeatedly pick a vertex with one of the
/// largest reach sets and swap it left until its reach shrinks to a random
/// target; kick the ordering with random swaps when progress stalls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapLocalSearch {
    /// Steps without fewer overflowing vertices before a kick.
    pub stagnation: usize,
    /// Random swaps per kick.
    pub kicks: usize,
    /// Vertices are picked among this many largest reach sets.
    pub top: usize,
    /// Total step budget; on exhaustion the pre-call ordering is restored.
    pub max_steps: usize,
}

impl Default for SwapLocalSearch {
    fn default() -> Self {
        Self {
            stagnation: 50,
            kicks: 20,
            top: 10,
            max_steps: 10_000,
        }
    }
}

/// Vertices ordered by current reach size, refreshed from the engine's
/// changed set.
struct SizeQueue {
    order: BTreeSet<(usize, usize)>,
    key: Vec<usize>,
    touched: BTreeSet<usize>,
}

impl SizeQueue {
    fn new(ord: &Ordering<'_, Append>) -> Self {
        let key: Vec<usize> = (0..ord.n()).map(|v| ord.reach_size(v)).collect();
        Self {
            order: key.iter().enumerate().map(|(v, &s)| (s, v)).collect(),
            key,
            touched: BTreeSet::new(),
        }
    }

    fn refresh(&mut self, ord: &mut Ordering<'_, Append>) {
        for w in ord.take_changed() {
            self.order.remove(&(self.key[w], w));
            self.key[w] = ord.reach_size(w);
            self.order.insert((self.key[w], w));
            self.touched.insert(w);
        }
    }

    /// Uniform pick among the `top` largest entries.
    fn pick<R: Rng + ?Sized>(&self, top: usize, rng: &mut R) -> Option<usize> {
        let span = top.min(self.order.len());
        if span == 0 {
            return None;
        }
        let skip = rng.gen_range(0..span);
        self.order.iter().rev().nth(skip).map(|&(_, v)| v)
    }
}

fn left_slot(ord: &Ordering<'_, Append>, v: usize) -> Option<usize> {
    match ord.position(v) {
        Some(0) => None,
        Some(p) => Some(p - 1),
        None => ord.slots().len().checked_sub(1),
    }
}

impl SwapLocalSearch {
    fn kick<R: Rng + ?Sized>(&self, ord: &mut Ordering<'_, Append>, queue: &SizeQueue, rng: &mut R) {
        for _ in 0..self.kicks {
            if ord.is_extendable() {
                return;
            }
            let v = if ord.too_full().is_empty() {
                queue.pick(self.top, rng)
            } else {
                let pick = rng.gen_range(0..ord.too_full().len());
                ord.too_full().iter().nth(pick).copied()
            };
            let Some(v) = v else {
                return;
            };
            // slot 0 has nothing to its left; counts as a spent kick
            let Some(left) = left_slot(ord, v) else {
                continue;
            };
            let pos = rng.gen_range(0..=left);
            if let Some(u) = ord.slots()[pos] {
                ord.swap(u, v);
            }
        }
    }
}

impl Repair<Append> for SwapLocalSearch {
    /// Each step counts as a node; each kick, and the final state, ends a
    /// leaf whose depth is the number of steps since the previous kick.
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        let saved = ord.slots().to_vec();
        let mut queue = SizeQueue::new(ord);
        // changes from before the call still belong to the driver
        queue.touched.extend(ord.take_changed());

        let mut best = ord.too_full().len();
        let mut idle = 0;
        let mut steps = 0;
        let mut since_kick = 0;
        while !ord.is_extendable() {
            if steps >= self.max_steps {
                stats.leaf(since_kick);
                debug!(steps, "swap-local-search budget spent, restoring");
                ord.reset_to(&saved);
                ord.note_changed(queue.touched);
                return false;
            }
            steps += 1;
            since_kick += 1;
            stats.node();

            if ord.too_full().len() < best {
                best = ord.too_full().len();
                idle = 0;
            }
            if idle > self.stagnation {
                trace!(steps, best, "swap-local-search kick");
                stats.leaf(since_kick);
                since_kick = 0;
                self.kick(ord, &queue, rng);
                queue.refresh(ord);
                if ord.is_extendable() {
                    break;
                }
                best = ord.too_full().len();
                idle = 0;
            }

            let Some(v) = queue.pick(self.top, rng) else {
                break;
            };
            let target = ord.reach_size(v).saturating_sub(1 + rng.gen_range(0..3)).max(1);
            while ord.reach_size(v) > target {
                let Some(left) = left_slot(ord, v) else {
                    break;
                };
                let Some(u) = ord.slots()[left] else {
                    break;
                };
                ord.swap(u, v);
            }
            queue.refresh(ord);
            idle += 1;
        }

        let repaired = ord.is_extendable();
        if since_kick > 0 {
            stats.leaf(since_kick);
        }
        if repaired {
            ord.note_changed(queue.touched);
        } else {
            ord.reset_to(&saved);
        }
        debug!(steps, repaired, "swap-local-search done");
        repaired
    }
}
