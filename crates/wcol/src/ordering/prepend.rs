//! Right-to-left policy with split actual/potential reach.
//!
//! The first placed vertex takes the last slot. Unplaced vertices rank before
//! every placed vertex and block paths, so `reach[x]` of a placed `x` only
//! holds placed vertices. What an unplaced `y` will contribute is known in
//! advance: once `y` is placed it sits left of everything placed now, so it
//! reaches every placed `x` within distance `r` through placed vertices.
//! Those `y` form `potential[x]`, and the reach size is the sum of both parts.
//!
//! Potential edits are recorded per placement and replayed backwards on
//! [`Ordering::unplace`], which keeps undo exact without recomputation.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::{EngineCfg, Ordering, Policy, Status};

/// Right-to-left insertion: the next vertex goes to slot `at - 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prepend;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PotentialEdit {
    Added(usize, usize),
    Removed(usize, usize),
}

/// One frame of potential edits per placement, innermost last.
pub type Trail = Vec<Vec<PotentialEdit>>;

impl Policy for Prepend {
    type State = Trail;

    const FREE_RANK: u64 = 0;
    const FREE_OVERFLOW: bool = false;

    fn check_cfg(cfg: &EngineCfg) {
        assert!(
            !cfg.look_ahead,
            "look-ahead tracking needs unplaced overflow, which the front engine never counts"
        );
    }

    fn init(ord: &mut Ordering<'_, Self>) {
        let n = ord.n();
        ord.slots = vec![None; n];
        ord.at = n;
        if ord.cfg.lower_bound {
            for v in 0..n {
                for &w in ord.graph.neighbours(v) {
                    ord.add_potential(v, w);
                }
            }
        }
    }

    fn place(ord: &mut Ordering<'_, Self>, v: usize) {
        assert!(ord.is_free(v), "place: vertex {v} is not free");
        assert!(ord.at > 0, "place: no free slot left");
        let slot = ord.at - 1;
        ord.set_status(v, Status::Placed(slot));
        ord.slots[slot] = Some(v);
        ord.at = slot;
        ord.placed += 1;
        ord.active.deactivate(v);

        let r = ord.cfg.radius;
        let tracking = ord.cfg.lower_bound;
        let (inner, outer) = ord.layers(v);
        let mut frame = Vec::new();

        if tracking {
            let partners: Vec<usize> = ord.sets.potential[v]
                .iter()
                .copied()
                .filter(|&w| ord.is_free(w))
                .collect();
            for w in partners {
                if ord.remove_potential(w, v) {
                    frame.push(PotentialEdit::Removed(w, v));
                }
            }
        }

        for r1 in 0..=r {
            for &x in &inner[r1] {
                for r2 in 1..=r - r1 {
                    for &y in &outer[r2] {
                        if ord.add_potential(x, y) {
                            frame.push(PotentialEdit::Added(x, y));
                        }
                    }
                }
                if x != v {
                    ord.add(x, v);
                    if ord.remove_potential(x, v) {
                        frame.push(PotentialEdit::Removed(x, v));
                    }
                }
            }
            if tracking {
                // unplaced pairs now joined by a placed path through v
                for &y1 in &outer[r1] {
                    for r2 in 1..=r - r1 {
                        for &y2 in &outer[r2] {
                            if y1 != y2 && ord.add_potential(y1, y2) {
                                frame.push(PotentialEdit::Added(y1, y2));
                            }
                        }
                    }
                }
            }
        }
        ord.extra.push(frame);
    }

    fn unplace(ord: &mut Ordering<'_, Self>) -> usize {
        let Some(v) = ord.slots.get(ord.at).copied().flatten() else {
            panic!("unplace: nothing placed");
        };
        let frame = ord.extra.pop().unwrap_or_default();
        for edit in frame.into_iter().rev() {
            match edit {
                PotentialEdit::Added(a, b) => {
                    ord.remove_potential(a, b);
                }
                PotentialEdit::Removed(a, b) => {
                    ord.add_potential(a, b);
                }
            }
        }
        let targets: Vec<usize> = ord.sets.reach_inv[v]
            .iter()
            .copied()
            .filter(|&u| u != v)
            .collect();
        for u in targets {
            ord.remove(u, v);
        }
        ord.slots[ord.at] = None;
        ord.at += 1;
        ord.placed -= 1;
        ord.set_status(v, Status::Free);
        ord.active.activate(ord.graph, v);
        v
    }

    fn last_placed(ord: &Ordering<'_, Self>) -> Option<usize> {
        ord.slots.get(ord.at).copied().flatten()
    }

    fn bound_exceeded(ord: &Ordering<'_, Self>) -> bool {
        ord.potential_degeneracy_exceeds(ord.cfg.k)
    }

    fn expected_potential(ord: &Ordering<'_, Self>) -> Vec<BTreeSet<usize>> {
        (0..ord.n())
            .map(|x| {
                if ord.is_placed(x) || ord.cfg.lower_bound {
                    ord.unplaced_within(x)
                } else {
                    BTreeSet::new()
                }
            })
            .collect()
    }
}

impl Ordering<'_, Prepend> {
    /// Layered BFS from `v` expanding only placed vertices. `inner[d]` holds
    /// placed vertices at distance `d`, `outer[d]` unplaced ones (reached but
    /// not expanded). Both have `r + 1` layers.
    fn layers(&self, v: usize) -> (Vec<Vec<usize>>, Vec<Vec<usize>>) {
        let r = self.cfg.radius;
        let mut inner = vec![Vec::new(); r + 1];
        let mut outer = vec![Vec::new(); r + 1];
        inner[0].push(v);
        let mut seen = HashSet::from([v]);
        for d in 0..r {
            let frontier = std::mem::take(&mut inner[d]);
            for &x in &frontier {
                for &y in self.graph.neighbours(x) {
                    if !seen.insert(y) {
                        continue;
                    }
                    if self.is_placed(y) {
                        inner[d + 1].push(y);
                    } else {
                        outer[d + 1].push(y);
                    }
                }
            }
            inner[d] = frontier;
        }
        (inner, outer)
    }

    /// Unplaced vertices other than `x` within distance `r` of `x` along
    /// paths whose interior is placed.
    fn unplaced_within(&self, x: usize) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        let mut seen = HashSet::from([x]);
        let mut queue = VecDeque::from([(x, 0)]);
        while let Some((u, d)) = queue.pop_front() {
            if d == self.cfg.radius {
                continue;
            }
            for &w in self.graph.neighbours(u) {
                if !seen.insert(w) {
                    continue;
                }
                if self.is_placed(w) {
                    queue.push_back((w, d + 1));
                } else {
                    found.insert(w);
                }
            }
        }
        found
    }

    /// Degeneracy of the potential graph among unplaced vertices, each
    /// weighted by its own reach.
    pub fn potential_degeneracy(&self) -> usize {
        crate::lower_bound::degeneracy(&self.potential_peel_graph(), None)
    }

    pub fn potential_degeneracy_exceeds(&self, target: usize) -> bool {
        crate::lower_bound::degeneracy(&self.potential_peel_graph(), Some(target)) > target
    }

    fn potential_peel_graph(&self) -> crate::lower_bound::PeelGraph {
        crate::lower_bound::PeelGraph::new(
            self.active.members().iter().copied(),
            |v| {
                self.sets.potential[v]
                    .iter()
                    .copied()
                    .filter(|&w| self.is_free(w))
            },
            |v| self.sets.reach[v].len(),
        )
    }
}
