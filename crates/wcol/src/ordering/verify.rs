//! From-scratch consistency check of the whole engine state.

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{Ordering, Policy, Status};
use crate::graph::Graph;

/// Cost of a complete ordering computed without the engine: walk the order,
/// credit every vertex within distance `radius` of the current one in the
/// graph that is still left, then delete the current vertex. `None` unless
/// `order` is a permutation of the vertices.
pub fn weak_coloring_number(graph: &Graph, radius: usize, order: &[usize]) -> Option<usize> {
    let n = graph.n();
    if order.len() != n {
        return None;
    }
    let mut removed = vec![false; n];
    let mut seen_in_order = vec![false; n];
    for &v in order {
        if v >= n || std::mem::replace(&mut seen_in_order[v], true) {
            return None;
        }
    }
    let mut credit = vec![0usize; n];
    for &v in order {
        let mut seen = HashSet::from([v]);
        let mut queue = VecDeque::from([(v, 0)]);
        while let Some((u, d)) = queue.pop_front() {
            credit[u] += 1;
            if d == radius {
                continue;
            }
            for &w in graph.neighbours(u) {
                if !removed[w] && seen.insert(w) {
                    queue.push_back((w, d + 1));
                }
            }
        }
        removed[v] = true;
    }
    Some(credit.into_iter().max().unwrap_or(0))
}

impl<P: Policy> Ordering<'_, P> {
    /// Recompute every derived structure from positions alone and panic on
    /// the first mismatch. Slow; meant for tests and `--verify` runs.
    pub fn assert_consistent(&self) {
        let n = self.n();

        for u in 0..n {
            for &x in &self.sets.reach_inv[u] {
                assert!(
                    self.sets.reach[x].contains(&u),
                    "transpose: {x} in reach_inv[{u}] but {u} not in reach[{x}]"
                );
            }
            for &x in &self.sets.reach[u] {
                assert!(
                    self.sets.reach_inv[x].contains(&u),
                    "transpose: {x} in reach[{u}] but {u} not in reach_inv[{x}]"
                );
            }
        }

        let mut expected_reach = vec![BTreeSet::new(); n];
        for u in 0..n {
            let right = if self.is_placed(u) {
                self.plain_reach_right(u)
            } else {
                BTreeSet::from([u])
            };
            assert_eq!(
                self.sets.reach_inv[u], right,
                "reach_inv[{u}] differs from a fresh BFS (status {:?})",
                self.status[u]
            );
            for x in right {
                expected_reach[x].insert(u);
            }
        }
        for (x, want) in expected_reach.iter().enumerate() {
            assert_eq!(&self.sets.reach[x], want, "reach[{x}] differs");
        }

        let expected_potential = P::expected_potential(self);
        for (x, want) in expected_potential.iter().enumerate() {
            assert_eq!(&self.sets.potential[x], want, "potential[{x}] differs");
        }

        let too_full: BTreeSet<usize> = (0..n)
            .filter(|&v| {
                let counted = match self.status[v] {
                    Status::Placed(_) => true,
                    Status::Free => P::FREE_OVERFLOW && !self.cfg.ignore_unplaced_overflow,
                    Status::Parked => false,
                };
                counted && self.sets.size(v) > self.cfg.k
            })
            .collect();
        assert_eq!(self.sets.too_full, too_full, "too_full differs");

        let mut placed = 0;
        for (pos, slot) in self.slots.iter().enumerate() {
            if let Some(v) = *slot {
                assert_eq!(self.status[v], Status::Placed(pos), "slot {pos} holds {v}");
                placed += 1;
            }
        }
        assert_eq!(self.placed, placed, "placed count");
        for v in 0..n {
            if let Status::Placed(pos) = self.status[v] {
                assert_eq!(self.slots.get(pos).copied().flatten(), Some(v), "position of {v}");
            }
        }

        for v in 0..n {
            let free = self.is_free(v);
            assert_eq!(self.active.contains(v), free, "active membership of {v}");
            let want: BTreeSet<usize> = if free {
                self.graph
                    .neighbours(v)
                    .iter()
                    .copied()
                    .filter(|&w| self.is_free(w))
                    .collect()
            } else {
                BTreeSet::new()
            };
            assert_eq!(self.active.neighbours(v), &want, "active adjacency of {v}");
        }

        if let Some(sorted) = &self.sorted {
            for v in 0..n {
                let want: BTreeSet<(Reverse<u64>, usize)> = self
                    .graph
                    .neighbours(v)
                    .iter()
                    .map(|&w| (Reverse(self.rank(w)), w))
                    .collect();
                assert_eq!(sorted[v], want, "sorted adjacency of {v}");
            }
        }
    }

    /// `reach_right` without sorted adjacency or any other cached state.
    fn plain_reach_right(&self, src: usize) -> BTreeSet<usize> {
        let floor = self.rank(src);
        let mut seen = HashSet::from([src]);
        let mut queue = VecDeque::from([(src, 0)]);
        while let Some((u, d)) = queue.pop_front() {
            if d == self.cfg.radius {
                continue;
            }
            for &w in self.graph.neighbours(u) {
                if self.rank(w) >= floor && seen.insert(w) {
                    queue.push_back((w, d + 1));
                }
            }
        }
        seen.into_iter().collect()
    }
}
