//! Ordering engine: exact incremental weak-reachability bookkeeping.
//!
//! Purpose
//! - Maintain a partial linear ordering of a graph together with, for every
//!   vertex `x`, the set `reach[x]` of vertices that `x` weakly `r`-reaches and
//!   the transpose `reach_inv[u]`. The transpose of a placed vertex is
//!   `reach_right(u)`: everything reachable from `u` by a path of length at
//!   most `r` whose vertices all sit at or after `u`.
//! - Keep `too_full` (vertices whose reach size exceeds `k`) current after
//!   every mutation so search code can prune with [`Ordering::is_extendable`].
//!
//! Why this design
//! - Every reach mutation funnels through `add`/`remove` (see `reach.rs`), so
//!   the transpose invariant holds after each primitive, not only after each
//!   public call.
//! - One engine, two insertion policies. [`Append`] grows the ordering left
//!   to right and treats unplaced vertices as lying after every placed one; it
//!   also supports holes, swaps and parking. [`Prepend`] grows right to left,
//!   treats unplaced vertices as lying before every placed one, and splits
//!   reach into an actual part and a potential part.
//!
//! References
//! - `lower_bound` for the peeling bounds consulted by `is_extendable`.
//! - `repair` for the backtracking strategies built on top of this API.

mod active;
mod append;
mod prepend;
mod reach;
mod verify;

pub use active::ActiveSubgraph;
pub use append::{Append, Edit};
pub use prepend::Prepend;
pub use verify::weak_coloring_number;

use std::cmp::Reverse;
use std::collections::BTreeSet;
use std::fmt::Debug;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

use crate::graph::Graph;
use crate::lower_bound::{self, PeelGraph};

use reach::ReachSets;

/// Placement state of a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Free,
    Placed(usize),
    /// Taken out of play: before every other vertex, blocks every path,
    /// and never counts towards `too_full`.
    Parked,
}

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineCfg {
    pub radius: usize,
    /// Largest admissible reach size. `usize::MAX` disables the threshold.
    pub k: usize,
    /// Flag pairs of unplaced vertices that both sit at exactly `k` and reach
    /// each other; placing either one overflows the other.
    pub look_ahead: bool,
    /// Let `is_extendable` also consult a lower bound on the free region.
    pub lower_bound: bool,
    /// Keep neighbours sorted by position so BFS can stop early.
    pub sorted_adjacency: bool,
    /// Only placed vertices count towards `too_full`.
    pub ignore_unplaced_overflow: bool,
    /// Repair and driver choices stay inside the active component of the last
    /// placed vertex.
    pub restrict_to_component: bool,
}

impl Default for EngineCfg {
    fn default() -> Self {
        Self {
            radius: 1,
            k: usize::MAX,
            look_ahead: false,
            lower_bound: false,
            sorted_adjacency: false,
            ignore_unplaced_overflow: false,
            restrict_to_component: false,
        }
    }
}

/// Insertion policy of an [`Ordering`].
pub trait Policy: Sized {
    /// Policy-specific bookkeeping carried by the engine.
    type State: Clone + Debug + Default;

    /// Rank of a free vertex; placed vertices rank `pos + 1`, parked ones `0`.
    const FREE_RANK: u64;
    /// Whether an overflowing unplaced vertex already makes the ordering
    /// infeasible.
    const FREE_OVERFLOW: bool;

    fn check_cfg(cfg: &EngineCfg);
    fn init(ord: &mut Ordering<'_, Self>);
    fn place(ord: &mut Ordering<'_, Self>, v: usize);
    fn unplace(ord: &mut Ordering<'_, Self>) -> usize;
    fn last_placed(ord: &Ordering<'_, Self>) -> Option<usize>;
    fn bound_exceeded(ord: &Ordering<'_, Self>) -> bool;
    fn expected_potential(ord: &Ordering<'_, Self>) -> Vec<BTreeSet<usize>> {
        vec![BTreeSet::new(); ord.n()]
    }
}

/// Full comparable state, used by tests and rollback checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub status: Vec<Status>,
    pub slots: Vec<Option<usize>>,
    pub reach: Vec<BTreeSet<usize>>,
    pub reach_inv: Vec<BTreeSet<usize>>,
    pub potential: Vec<BTreeSet<usize>>,
    pub too_full: BTreeSet<usize>,
    pub full_neighbours: BTreeSet<usize>,
}

type SortedAdj = Vec<BTreeSet<(Reverse<u64>, usize)>>;

pub struct Ordering<'g, P: Policy = Append> {
    graph: &'g Graph,
    cfg: EngineCfg,
    status: Vec<Status>,
    slots: Vec<Option<usize>>,
    at: usize,
    placed: usize,
    active: ActiveSubgraph,
    sets: ReachSets,
    sorted: Option<SortedAdj>,
    changed: BTreeSet<usize>,
    extra: P::State,
    _policy: PhantomData<P>,
}

impl<'g, P: Policy> Ordering<'g, P> {
    /// Fresh engine: everything unplaced, `reach[v] = {v}`.
    pub fn new(graph: &'g Graph, cfg: EngineCfg) -> Self {
        assert!(cfg.radius >= 1, "radius must be positive");
        assert!(cfg.k >= 1, "threshold k must be at least 1");
        assert!(
            !(cfg.look_ahead && cfg.ignore_unplaced_overflow),
            "look-ahead tracking requires unplaced overflow to count"
        );
        P::check_cfg(&cfg);
        let n = graph.n();
        let counted = P::FREE_OVERFLOW && !cfg.ignore_unplaced_overflow;
        let sorted = cfg.sorted_adjacency.then(|| {
            (0..n)
                .map(|v| {
                    graph
                        .neighbours(v)
                        .iter()
                        .map(|&w| (Reverse(P::FREE_RANK), w))
                        .collect()
                })
                .collect()
        });
        let mut ord = Self {
            graph,
            cfg,
            status: vec![Status::Free; n],
            slots: Vec::new(),
            at: 0,
            placed: 0,
            active: ActiveSubgraph::new(graph),
            sets: ReachSets::new(n, cfg.k, counted, cfg.look_ahead),
            sorted,
            changed: BTreeSet::new(),
            extra: P::State::default(),
            _policy: PhantomData,
        };
        P::init(&mut ord);
        ord
    }

    // ----- mutation ---------------------------------------------------------

    /// Place `v` at the next slot of the policy. Panics if `v` is not free.
    pub fn place(&mut self, v: usize) {
        P::place(self, v);
    }

    /// Undo the most recent placement and return the vertex.
    pub fn unplace(&mut self) -> usize {
        P::unplace(self)
    }

    /// Place `v` and get a guard that unplaces it again unless committed.
    pub fn trial_place(&mut self, v: usize) -> Trial<'_, 'g, P> {
        self.place(v);
        Trial {
            ord: self,
            armed: true,
        }
    }

    /// Recompute `reach_right(u)` and apply only the differences.
    pub fn update_reach(&mut self, u: usize) {
        let fresh: BTreeSet<usize> = self.reach_right(u).into_iter().collect();
        let current = &self.sets.reach_inv[u];
        let stale: Vec<usize> = current.difference(&fresh).copied().collect();
        let added: Vec<usize> = fresh.difference(current).copied().collect();
        for x in stale {
            self.remove(x, u);
        }
        for x in added {
            self.add(x, u);
        }
    }

    /// Drain the set of vertices touched since the last call.
    pub fn take_changed(&mut self) -> BTreeSet<usize> {
        std::mem::take(&mut self.changed)
    }

    /// Put vertices back into the changed set, e.g. after a strategy drained
    /// it for its own bookkeeping.
    pub fn note_changed(&mut self, vs: impl IntoIterator<Item = usize>) {
        self.changed.extend(vs);
    }

    // ----- queries ----------------------------------------------------------

    pub fn graph(&self) -> &'g Graph {
        self.graph
    }

    pub fn cfg(&self) -> &EngineCfg {
        &self.cfg
    }

    pub fn n(&self) -> usize {
        self.graph.n()
    }

    pub fn radius(&self) -> usize {
        self.cfg.radius
    }

    pub fn k(&self) -> usize {
        self.cfg.k
    }

    pub fn status(&self, v: usize) -> Status {
        self.status[v]
    }

    pub fn position(&self, v: usize) -> Option<usize> {
        match self.status[v] {
            Status::Placed(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_free(&self, v: usize) -> bool {
        self.status[v] == Status::Free
    }

    pub fn is_placed(&self, v: usize) -> bool {
        matches!(self.status[v], Status::Placed(_))
    }

    /// Vertices `x` weakly reaches (always contains `x`).
    pub fn reach(&self, x: usize) -> &BTreeSet<usize> {
        &self.sets.reach[x]
    }

    pub fn reach_inv(&self, u: usize) -> &BTreeSet<usize> {
        &self.sets.reach_inv[u]
    }

    /// Unplaced vertices that are bound to join `reach[x]`; empty for
    /// [`Append`].
    pub fn potential(&self, x: usize) -> &BTreeSet<usize> {
        &self.sets.potential[x]
    }

    pub fn reach_size(&self, x: usize) -> usize {
        self.sets.size(x)
    }

    pub fn too_full(&self) -> &BTreeSet<usize> {
        &self.sets.too_full
    }

    /// Unplaced vertices currently flagged by look-ahead tracking.
    pub fn full_neighbours(&self) -> &BTreeSet<usize> {
        &self.sets.flagged
    }

    /// Slot array; `None` marks an empty slot.
    pub fn slots(&self) -> &[Option<usize>] {
        &self.slots
    }

    /// Next append slot for [`Append`], number of free leading slots for
    /// [`Prepend`].
    pub fn at(&self) -> usize {
        self.at
    }

    pub fn placed_count(&self) -> usize {
        self.placed
    }

    pub fn last_placed(&self) -> Option<usize> {
        P::last_placed(self)
    }

    pub fn free_vertices(&self) -> impl Iterator<Item = usize> + '_ {
        self.active.members().iter().copied()
    }

    pub fn active(&self) -> &ActiveSubgraph {
        &self.active
    }

    /// Active component containing `seed` (empty if `seed` is not free).
    pub fn active_component(&self, seed: usize) -> BTreeSet<usize> {
        self.active.component(seed)
    }

    /// Placed vertices in slot order.
    pub fn current_ordering(&self) -> Vec<usize> {
        self.slots.iter().flatten().copied().collect()
    }

    pub fn max_reach_size(&self) -> usize {
        (0..self.n()).map(|v| self.sets.size(v)).max().unwrap_or(0)
    }

    pub fn is_extendable(&self) -> bool {
        self.sets.too_full.is_empty()
            && self.sets.flagged.is_empty()
            && !(self.cfg.lower_bound && P::bound_exceeded(self))
    }

    pub fn is_complete(&self) -> bool {
        self.placed == self.n() && self.is_extendable()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            status: self.status.clone(),
            slots: self.slots.clone(),
            reach: self.sets.reach.clone(),
            reach_inv: self.sets.reach_inv.clone(),
            potential: self.sets.potential.clone(),
            too_full: self.sets.too_full.clone(),
            full_neighbours: self.sets.flagged.clone(),
        }
    }

    /// Component hint used by component-restricted choices: the active
    /// component of the first free neighbour of the last placed vertex, or of
    /// any free vertex.
    pub fn focus_component(&self) -> BTreeSet<usize> {
        let seed = self
            .last_placed()
            .and_then(|v| {
                self.graph
                    .neighbours(v)
                    .iter()
                    .copied()
                    .find(|&w| self.is_free(w))
            })
            .or_else(|| self.active.members().first().copied());
        seed.map(|s| self.active.component(s)).unwrap_or_default()
    }

    // ----- lower bounds -----------------------------------------------------

    fn peel_graph(&self) -> PeelGraph {
        PeelGraph::new(
            self.active.members().iter().copied(),
            |v| self.active.neighbours(v).iter().copied(),
            |v| self.sets.reach[v].len(),
        )
    }

    fn contraction_budget(&self) -> usize {
        (self.cfg.radius - 1) / 2
    }

    /// Degeneracy peeling of the free region weighted by reach size.
    pub fn degeneracy_lower_bound(&self) -> usize {
        lower_bound::degeneracy(&self.peel_graph(), None)
    }

    /// Contraction peeling with the vertex-count proxy for branch-set radius.
    pub fn contraction_lower_bound(&self) -> usize {
        lower_bound::contraction(&self.peel_graph(), self.contraction_budget(), None)
    }

    /// Contraction peeling that checks the true diameter of each branch set.
    pub fn contraction_lower_bound_exact(&self) -> usize {
        lower_bound::contraction_exact(&self.peel_graph(), self.contraction_budget(), None)
    }

    pub fn degeneracy_exceeds(&self, target: usize) -> bool {
        lower_bound::degeneracy(&self.peel_graph(), Some(target)) > target
    }

    pub fn contraction_exceeds(&self, target: usize) -> bool {
        lower_bound::contraction(&self.peel_graph(), self.contraction_budget(), Some(target))
            > target
    }

    pub fn contraction_exact_exceeds(&self, target: usize) -> bool {
        lower_bound::contraction_exact(&self.peel_graph(), self.contraction_budget(), Some(target))
            > target
    }

    // ----- internals --------------------------------------------------------

    #[inline]
    fn rank(&self, v: usize) -> u64 {
        match self.status[v] {
            Status::Free => P::FREE_RANK,
            Status::Placed(p) => p as u64 + 1,
            Status::Parked => 0,
        }
    }

    /// Change the status of `v`, keeping sorted adjacency and `too_full`
    /// eligibility in step.
    fn set_status(&mut self, v: usize, status: Status) {
        let old = self.rank(v);
        self.status[v] = status;
        let new = self.rank(v);
        if let Some(sorted) = self.sorted.as_mut() {
            if old != new {
                for &w in self.graph.neighbours(v) {
                    sorted[w].remove(&(Reverse(old), v));
                    sorted[w].insert((Reverse(new), v));
                }
            }
        }
        let counted = match status {
            Status::Placed(_) => true,
            Status::Free => P::FREE_OVERFLOW && !self.cfg.ignore_unplaced_overflow,
            Status::Parked => false,
        };
        self.sets.set_counted(v, counted);
        self.changed.insert(v);
    }
}

/// Guard returned by [`Ordering::trial_place`]; unplaces on drop unless
/// [`Trial::commit`] was called.
pub struct Trial<'a, 'g, P: Policy> {
    ord: &'a mut Ordering<'g, P>,
    armed: bool,
}

impl<P: Policy> Trial<'_, '_, P> {
    pub fn commit(mut self) {
        self.armed = false;
    }
}

impl<'g, P: Policy> Deref for Trial<'_, 'g, P> {
    type Target = Ordering<'g, P>;
    fn deref(&self) -> &Self::Target {
        self.ord
    }
}

impl<P: Policy> DerefMut for Trial<'_, '_, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ord
    }
}

impl<P: Policy> Drop for Trial<'_, '_, P> {
    fn drop(&mut self) {
        if self.armed {
            self.ord.unplace();
        }
    }
}

#[cfg(test)]
mod tests;
