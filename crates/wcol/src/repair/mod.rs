//! Repair strategies: bounded backtracking over an infeasible ordering.
//!
//! Purpose
//! - When a driver's ordering stops being extendable, a strategy detaches a
//!   window of placed vertices and searches for a reassignment that makes the
//!   ordering extendable again.
//!
//! Why this design
//! - Every strategy talks to the engine only through its public mutation API
//!   and the scoped guards ([`crate::ordering::Trial`] and
//!   [`crate::ordering::Edit`]). Each tentative move is undone when its guard
//!   drops, so early returns cannot leave a half-reverted window.
//! - On failure every strategy restores the exact pre-call state; on success
//!   the new assignment stays committed.
//! - Randomness comes from the caller's generator, never a global one.
//!
//! Strategies
//! - [`LastC`]: re-place the last `c` vertices, contiguously.
//! - [`GapFill`]: refill `c` random slots near the overflow.
//! - [`SwapNeighbours`]: iterative deepening over adjacent swaps.
//! - [`SwapLocalSearch`]: randomized hill climbing by left swaps.
//! - [`Merge`]: pull a vertex set out and re-insert it at breakpoints;
//!   [`Merge::solve`] does the same with every vertex to build an ordering
//!   from nothing.

mod gap_fill;
mod last_c;
mod local_search;
mod merge;
mod swap_neighbours;

pub use gap_fill::{GapFill, Pool};
pub use last_c::LastC;
pub use local_search::SwapLocalSearch;
pub use merge::Merge;
pub use swap_neighbours::SwapNeighbours;

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::graph::Graph;
use crate::ordering::{Append, Ordering, Policy};

/// Shape of one backtracking search.
///
/// A node is one visited search state. A leaf is a state the search did not
/// descend from, either because it was the target depth or because no child
/// stayed extendable; `depth_sum` adds up the depths of those leaves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub leaves: u64,
    pub depth_sum: u64,
}

impl SearchStats {
    pub fn node(&mut self) {
        self.nodes += 1;
    }

    pub fn leaf(&mut self, depth: usize) {
        self.leaves += 1;
        self.depth_sum += depth as u64;
    }

    pub fn mean_leaf_depth(&self) -> f64 {
        if self.leaves == 0 {
            0.0
        } else {
            self.depth_sum as f64 / self.leaves as f64
        }
    }
}

impl std::ops::AddAssign for SearchStats {
    fn add_assign(&mut self, rhs: Self) {
        self.nodes += rhs.nodes;
        self.leaves += rhs.leaves;
        self.depth_sum += rhs.depth_sum;
    }
}

/// One repair attempt on an ordering that is not extendable.
pub trait Repair<P: Policy> {
    /// Returns `true` with the repaired ordering committed, or `false` with
    /// the engine back in its pre-call state. Search effort is added to
    /// `stats`.
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, P>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool;

    fn repair<R: Rng + ?Sized>(&mut self, ord: &mut Ordering<'_, P>, rng: &mut R) -> bool {
        self.search(ord, rng, &mut SearchStats::default())
    }
}

/// How a [`BranchingSet`] enumerates its candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BranchingRule {
    /// Fresh uniform shuffle per enumeration.
    #[default]
    Random,
    /// Closest to the problem vertex first, ties by id.
    ByDistance,
}

/// Candidate vertices for one backtracking search.
#[derive(Clone, Debug)]
pub enum BranchingSet {
    Shuffled(BTreeSet<usize>),
    ByDistance {
        order: BTreeSet<(u32, usize)>,
        dist: Vec<u32>,
    },
}

impl BranchingSet {
    /// `problem` anchors the distance order; without it every vertex is at
    /// distance zero and the order falls back to ids.
    pub fn new(
        rule: BranchingRule,
        graph: &Graph,
        problem: Option<usize>,
        items: impl IntoIterator<Item = usize>,
    ) -> Self {
        match rule {
            BranchingRule::Random => Self::Shuffled(items.into_iter().collect()),
            BranchingRule::ByDistance => {
                let dist = match problem {
                    Some(p) => graph.distances_from(p),
                    None => vec![0; graph.n()],
                };
                let order = items.into_iter().map(|v| (dist[v], v)).collect();
                Self::ByDistance { order, dist }
            }
        }
    }

    pub fn insert(&mut self, v: usize) {
        match self {
            Self::Shuffled(set) => {
                set.insert(v);
            }
            Self::ByDistance { order, dist } => {
                order.insert((dist[v], v));
            }
        }
    }

    pub fn remove(&mut self, v: usize) {
        match self {
            Self::Shuffled(set) => {
                set.remove(&v);
            }
            Self::ByDistance { order, dist } => {
                order.remove(&(dist[v], v));
            }
        }
    }

    pub fn contains(&self, v: usize) -> bool {
        match self {
            Self::Shuffled(set) => set.contains(&v),
            Self::ByDistance { order, dist } => order.contains(&(dist[v], v)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Shuffled(set) => set.len(),
            Self::ByDistance { order, .. } => order.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current candidates in branching order.
    pub fn candidates<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<usize> {
        match self {
            Self::Shuffled(set) => {
                let mut out: Vec<usize> = set.iter().copied().collect();
                out.shuffle(rng);
                out
            }
            Self::ByDistance { order, .. } => order.iter().map(|&(_, v)| v).collect(),
        }
    }
}

/// Any strategy usable on the append engine, for drivers that pick one at
/// runtime.
#[derive(Clone, Debug)]
pub enum Strategy {
    LastC(LastC),
    GapFill(GapFill),
    SwapNeighbours(SwapNeighbours),
    SwapLocalSearch(SwapLocalSearch),
    Merge(Merge),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LastC(_) => "last-c",
            Self::GapFill(g) => match g.pool {
                Pool::RadiusNeighbourhood => "radius-neighbourhood",
                Pool::ReachUnion => "reach-union",
            },
            Self::SwapNeighbours(_) => "swap-neighbours",
            Self::SwapLocalSearch(_) => "swap-local-search",
            Self::Merge(_) => "merge",
        }
    }
}

impl Repair<Append> for Strategy {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, Append>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        match self {
            Self::LastC(s) => s.search(ord, rng, stats),
            Self::GapFill(s) => s.search(ord, rng, stats),
            Self::SwapNeighbours(s) => s.search(ord, rng, stats),
            Self::SwapLocalSearch(s) => s.search(ord, rng, stats),
            Self::Merge(s) => s.search(ord, rng, stats),
        }
    }
}

#[cfg(test)]
mod tests;
