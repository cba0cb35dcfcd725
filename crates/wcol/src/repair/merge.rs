use std::collections::BTreeSet;

use rand::seq::{index, SliceRandom};
use rand::Rng;
use tracing::{debug, trace};

use super::{Repair, SearchStats};
use crate::ordering::{Append, Ordering};

/// Pull a vertex set `S` out of the ordering, pad the remaining order with
/// `|S|` empty slots around every vertex, and insert the members of `S` one
/// by one at breakpoints: the rightmost free slot before the next placed
/// vertex they would reach. Each inserted vertex bounds the next ones to its
/// left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Merge {
    /// Size of the extracted set.
    pub c: usize,
    pub attempts: usize,
}

impl Default for Merge {
    fn default() -> Self {
        Self { c: 4, attempts: 10 }
    }
}

impl Merge {
    /// Build a complete ordering from scratch: every vertex goes into the
    /// extracted set, whatever its current status, and is inserted into an
    /// ordering with nothing else in it. `c` is ignored. On failure the
    /// engine is back in its pre-call state.
    pub fn solve<R: Rng + ?Sized>(
        &self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        let everyone: Vec<usize> = (0..ord.n()).collect();
        for attempt in 0..self.attempts.max(1) {
            if run(ord, &everyone, rng, stats) {
                debug!(attempt, n = everyone.len(), "merge built a full ordering");
                return true;
            }
            trace!(attempt, "merge from scratch failed");
        }
        debug!(attempts = self.attempts, "merge from scratch exhausted");
        false
    }
}

impl Repair<Append> for Merge {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        assert!(!ord.is_extendable(), "merge: ordering is already extendable");
        // with unplaced overflow ignored, overflowing vertices are placed and
        // always go into the extracted set
        let take_overfull = ord.cfg().ignore_unplaced_overflow;
        let too_full: Vec<usize> = ord.too_full().iter().copied().collect();

        let mut near = BTreeSet::new();
        if too_full.is_empty() {
            if let Some(v) = ord.last_placed() {
                near.extend(ord.reach(v).iter().copied());
            }
        }
        for &v in &too_full {
            near.extend(ord.reach(v).iter().copied());
        }
        if take_overfull {
            for v in &too_full {
                near.remove(v);
            }
        }
        let rest: Vec<usize> = (0..ord.n())
            .filter(|v| !near.contains(v) && !(take_overfull && too_full.contains(v)))
            .collect();
        let mut near: Vec<usize> = near.into_iter().collect();
        debug!(near = near.len(), rest = rest.len(), c = self.c, "merge pools");

        for attempt in 0..self.attempts {
            near.shuffle(rng);
            let mut chosen: Vec<usize> = if take_overfull { too_full.clone() } else { Vec::new() };
            let room = self.c.saturating_sub(chosen.len());
            chosen.extend(near.iter().take(room).copied());
            let room = self.c.saturating_sub(chosen.len()).min(rest.len());
            chosen.extend(index::sample(rng, rest.len(), room).into_iter().map(|i| rest[i]));

            if run(ord, &chosen, rng, stats) {
                debug!(attempt, extracted = chosen.len(), "merge repaired");
                return true;
            }
            trace!(attempt, "merge attempt failed");
        }
        debug!(attempts = self.attempts, "merge exhausted");
        false
    }
}

fn run<R: Rng + ?Sized>(
    ord: &mut Ordering<'_, Append>,
    chosen: &[usize],
    rng: &mut R,
    stats: &mut SearchStats,
) -> bool {
    let saved = ord.slots().to_vec();
    for &v in chosen {
        ord.park(v);
    }
    ord.spread(chosen.len());
    let mut remaining = chosen.to_vec();
    remaining.shuffle(rng);
    if insert(ord, &mut remaining, None, 0, stats) {
        ord.compact();
        true
    } else {
        ord.reset_to(&saved);
        false
    }
}

/// Place every vertex of `remaining` left of `bound`, backtracking over
/// which vertex goes next and over its breakpoint segment.
fn insert(
    ord: &mut Ordering<'_, Append>,
    remaining: &mut Vec<usize>,
    bound: Option<usize>,
    depth: usize,
    stats: &mut SearchStats,
) -> bool {
    stats.node();
    if remaining.is_empty() {
        stats.leaf(depth);
        return ord.is_extendable();
    }
    let mut descended = false;
    let k = ord.k();
    for i in 0..remaining.len() {
        let v = remaining.remove(i);
        let limit = bound.unwrap_or(ord.slots().len());
        let mut from = 0;
        loop {
            let breakpoint = ord.first_breakpoint(v, from);
            let ceiling = breakpoint.map_or(limit, |b| b.min(limit));
            if let Some(slot) = ord.last_hole_in(from, ceiling) {
                let mut edit = ord.edit_place_at(v, slot);
                let size = edit.reach_size(v);
                if edit.is_extendable() {
                    descended = true;
                    if insert(&mut *edit, remaining, Some(slot), depth + 1, stats) {
                        edit.commit();
                        return true;
                    }
                }
                if size >= k {
                    break;
                }
            }
            match breakpoint {
                Some(b) if b < limit => from = b + 1,
                _ => break,
            }
        }
        remaining.insert(i, v);
    }
    if !descended {
        stats.leaf(depth);
    }
    false
}
