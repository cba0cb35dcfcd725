//! Reach sets, their transpose, and the only primitives that mutate them.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet};

use super::{Ordering, Policy, Status};

#[derive(Clone, Debug)]
pub(super) struct ReachSets {
    k: usize,
    pub(super) reach: Vec<BTreeSet<usize>>,
    pub(super) reach_inv: Vec<BTreeSet<usize>>,
    pub(super) potential: Vec<BTreeSet<usize>>,
    pub(super) counted: Vec<bool>,
    pub(super) too_full: BTreeSet<usize>,
    /// Look-ahead partners per vertex; `None` when tracking is off.
    pub(super) partners: Option<Vec<BTreeSet<usize>>>,
    pub(super) flagged: BTreeSet<usize>,
}

impl ReachSets {
    pub(super) fn new(n: usize, k: usize, counted: bool, look_ahead: bool) -> Self {
        let singletons: Vec<BTreeSet<usize>> = (0..n).map(|v| BTreeSet::from([v])).collect();
        Self {
            k,
            reach: singletons.clone(),
            reach_inv: singletons,
            potential: vec![BTreeSet::new(); n],
            counted: vec![counted; n],
            too_full: BTreeSet::new(),
            partners: look_ahead.then(|| vec![BTreeSet::new(); n]),
            flagged: BTreeSet::new(),
        }
    }

    #[inline]
    pub(super) fn size(&self, v: usize) -> usize {
        self.reach[v].len() + self.potential[v].len()
    }

    pub(super) fn set_counted(&mut self, v: usize, counted: bool) {
        self.counted[v] = counted;
        self.refresh(v);
    }

    fn refresh(&mut self, v: usize) {
        if self.counted[v] && self.size(v) > self.k {
            self.too_full.insert(v);
        } else {
            self.too_full.remove(&v);
        }
    }

    fn unpair(&mut self, v: usize) {
        let Some(partners) = self.partners.as_mut() else {
            return;
        };
        for w in std::mem::take(&mut partners[v]) {
            partners[w].remove(&v);
            if partners[w].is_empty() {
                self.flagged.remove(&w);
            }
        }
        self.flagged.remove(&v);
    }
}

impl<P: Policy> Ordering<'_, P> {
    /// Insert `source` into `reach[target]`.
    pub(super) fn add(&mut self, target: usize, source: usize) {
        let fresh = self.sets.reach[target].insert(source);
        assert!(fresh, "add: {source} already in reach[{target}]");
        self.sets.reach_inv[source].insert(target);
        self.changed.insert(target);
        self.sets.refresh(target);
        if self.sets.partners.is_some()
            && self.sets.size(target) == self.cfg.k
            && self.status[target] == Status::Free
        {
            self.pair_full_neighbours(target);
        }
    }

    /// Exact inverse of [`Ordering::add`].
    pub(super) fn remove(&mut self, target: usize, source: usize) {
        let present = self.sets.reach[target].remove(&source);
        assert!(present, "remove: {source} not in reach[{target}]");
        self.sets.reach_inv[source].remove(&target);
        self.changed.insert(target);
        self.sets.refresh(target);
        if self.sets.partners.is_some()
            && self.sets.size(target) + 1 == self.cfg.k
            && self.status[target] == Status::Free
        {
            self.sets.unpair(target);
        }
    }

    pub(super) fn add_potential(&mut self, target: usize, other: usize) -> bool {
        if !self.sets.potential[target].insert(other) {
            return false;
        }
        self.changed.insert(target);
        self.sets.refresh(target);
        true
    }

    pub(super) fn remove_potential(&mut self, target: usize, other: usize) -> bool {
        if !self.sets.potential[target].remove(&other) {
            return false;
        }
        self.changed.insert(target);
        self.sets.refresh(target);
        true
    }

    /// `target` just reached exactly `k`: pair it with every free vertex it
    /// reaches that is already at `k` or above.
    fn pair_full_neighbours(&mut self, target: usize) {
        let k = self.cfg.k;
        let heavy: Vec<usize> = self
            .reach_right(target)
            .into_iter()
            .filter(|&w| w != target && self.sets.size(w) >= k)
            .collect();
        let Some(partners) = self.sets.partners.as_mut() else {
            return;
        };
        for w in heavy {
            partners[w].insert(target);
            partners[target].insert(w);
            self.sets.flagged.insert(w);
            self.sets.flagged.insert(target);
        }
    }

    /// BFS of depth `r` from `src` through vertices ranked at or after it.
    pub(super) fn reach_right(&self, src: usize) -> Vec<usize> {
        self.reach_right_ranked(src, self.rank(src))
    }

    /// Like [`Ordering::reach_right`] but pretending `src` sits at `pos`
    /// (before whatever currently occupies it).
    pub fn reach_right_from(&self, src: usize, pos: usize) -> Vec<usize> {
        self.reach_right_ranked(src, pos as u64 + 1)
    }

    fn reach_right_ranked(&self, src: usize, src_rank: u64) -> Vec<usize> {
        let mut out = vec![src];
        let mut seen = HashSet::from([src]);
        let mut frontier = vec![src];
        for _ in 0..self.cfg.radius {
            let mut next = Vec::new();
            for &x in &frontier {
                match &self.sorted {
                    Some(sorted) => {
                        for &(Reverse(rank), y) in &sorted[x] {
                            if rank < src_rank {
                                break;
                            }
                            if seen.insert(y) {
                                next.push(y);
                            }
                        }
                    }
                    None => {
                        for &y in self.graph.neighbours(x) {
                            if self.rank(y) >= src_rank && seen.insert(y) {
                                next.push(y);
                            }
                        }
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            out.extend_from_slice(&next);
            frontier = next;
        }
        out
    }

    /// BFS of depth `r` from a free `src` inside the active subgraph.
    pub(super) fn reach_in_unplaced(&self, src: usize) -> Vec<usize> {
        let mut out = vec![src];
        let mut seen = HashSet::from([src]);
        let mut frontier = vec![src];
        for _ in 0..self.cfg.radius {
            let mut next = Vec::new();
            for &x in &frontier {
                for &y in self.active.neighbours(x) {
                    if seen.insert(y) {
                        next.push(y);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            out.extend_from_slice(&next);
            frontier = next;
        }
        out
    }
}
