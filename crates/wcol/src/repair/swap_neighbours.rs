use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::{debug, trace};

use super::{Repair, SearchStats};
use crate::ordering::{Append, Ordering};

/// Iterative deepening over adjacent swaps that move an overflowing vertex
/// (or the nearest movable vertex to its left) one slot further left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapNeighbours {
    /// Depth limits `1..max_depth` are tried in turn.
    pub max_depth: usize,
}

impl Default for SwapNeighbours {
    fn default() -> Self {
        Self { max_depth: 100 }
    }
}

/// `forced[v]` holds the vertices `v` was swapped past; swapping them back is
/// not allowed further down the same branch.
type Forced = HashMap<usize, HashSet<usize>>;

impl Repair<Append> for SwapNeighbours {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        let mut forced = Forced::new();
        for limit in 1..self.max_depth {
            trace!(limit, "swap-neighbours deepening");
            if descend(ord, &mut forced, 0, limit, rng, stats) {
                debug!(limit, "swap-neighbours repaired");
                return true;
            }
        }
        debug!(max_depth = self.max_depth, "swap-neighbours exhausted");
        false
    }
}

fn is_forced(forced: &Forced, left: usize, right: usize) -> bool {
    forced.get(&left).is_some_and(|s| s.contains(&right))
}

/// Vertex directly left of `v`: its left slot when placed, the last placed
/// vertex when free. `None` at slot 0 or next to an empty slot.
fn left_of(ord: &Ordering<'_, Append>, v: usize) -> Option<usize> {
    match ord.position(v) {
        Some(0) => None,
        Some(p) => ord.slots()[p - 1],
        None => ord.last_placed(),
    }
}

fn descend<R: Rng + ?Sized>(
    ord: &mut Ordering<'_, Append>,
    forced: &mut Forced,
    depth: usize,
    limit: usize,
    rng: &mut R,
    stats: &mut SearchStats,
) -> bool {
    stats.node();
    if ord.is_extendable() {
        stats.leaf(depth);
        return true;
    }
    if depth >= limit || ord.too_full().is_empty() {
        stats.leaf(depth);
        return false;
    }
    let pick = rng.gen_range(0..ord.too_full().len());
    let Some(v) = ord.too_full().iter().nth(pick).copied() else {
        stats.leaf(depth);
        return false;
    };
    let Some(vleft) = left_of(ord, v) else {
        stats.leaf(depth);
        return false;
    };

    let mut moves = Vec::with_capacity(2);
    if !is_forced(forced, vleft, v) {
        moves.push(v);
    }
    if let Some(start) = ord.position(vleft) {
        let slots = ord.slots();
        for i in (1..=start).rev() {
            let (Some(a), Some(b)) = (slots[i - 1], slots[i]) else {
                break;
            };
            if !is_forced(forced, a, b) {
                if b != v {
                    moves.push(b);
                }
                break;
            }
        }
    }

    if moves.is_empty() {
        stats.leaf(depth);
    }
    for w in moves {
        let Some(wl) = left_of(ord, w) else {
            continue;
        };
        forced.entry(w).or_default().insert(wl);
        let mut edit = ord.edit_swap(wl, w);
        if descend(&mut *edit, forced, depth + 1, limit, rng, stats) {
            edit.commit();
            return true;
        }
        drop(edit);
        if let Some(s) = forced.get_mut(&w) {
            s.remove(&wl);
        }
    }
    false
}
