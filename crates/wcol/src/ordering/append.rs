//! Left-to-right policy with holes, swaps and parking.
//!
//! Unplaced vertices rank after every placed vertex, so a placed vertex can
//! route paths through the free region and free vertices collect reach from
//! the placed prefix. Slots below `at` may be empty; filling and emptying them
//! refreshes exactly the placed vertices whose `reach_right` can change.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use super::{EngineCfg, Ordering, Policy, Status};

/// Left-to-right insertion: the next vertex goes to slot `at`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Append;

impl Policy for Append {
    type State = ();

    const FREE_RANK: u64 = u64::MAX;
    const FREE_OVERFLOW: bool = true;

    fn check_cfg(_cfg: &EngineCfg) {}

    fn init(ord: &mut Ordering<'_, Self>) {
        ord.slots = Vec::with_capacity(ord.n());
        ord.at = 0;
    }

    fn place(ord: &mut Ordering<'_, Self>, v: usize) {
        assert!(ord.is_free(v), "place: vertex {v} is not free");
        let reached = ord.reach_in_unplaced(v);
        let slot = ord.slots.len();
        ord.set_status(v, Status::Placed(slot));
        ord.slots.push(Some(v));
        ord.at = ord.slots.len();
        ord.placed += 1;
        for u in reached {
            if u != v {
                ord.add(u, v);
            }
        }
        ord.active.deactivate(v);
    }

    fn unplace(ord: &mut Ordering<'_, Self>) -> usize {
        let v = match ord.slots.last() {
            Some(&Some(v)) => v,
            _ => panic!("unplace: last slot is empty"),
        };
        let targets: Vec<usize> = ord.sets.reach_inv[v]
            .iter()
            .copied()
            .filter(|&u| u != v)
            .collect();
        for u in targets {
            ord.remove(u, v);
        }
        ord.slots.pop();
        ord.at = ord.slots.len();
        ord.placed -= 1;
        ord.set_status(v, Status::Free);
        ord.active.activate(ord.graph, v);
        v
    }

    fn last_placed(ord: &Ordering<'_, Self>) -> Option<usize> {
        ord.slots.last().copied().flatten()
    }

    fn bound_exceeded(ord: &Ordering<'_, Self>) -> bool {
        ord.contraction_exceeds(ord.cfg.k)
    }
}

impl<'g> Ordering<'g, Append> {
    fn assert_no_look_ahead(&self, op: &str) {
        assert!(
            !self.cfg.look_ahead,
            "{op}: not supported while look-ahead tracking is enabled"
        );
    }

    /// Placed vertices strictly right of `pos` that are members of `set`,
    /// scanning whichever of the two candidate sources is smaller.
    fn placed_right_of_in(&self, pos: usize, set: &BTreeSet<usize>) -> Vec<usize> {
        let span = self.slots.len().saturating_sub(pos + 1);
        if span <= set.len() {
            self.slots[pos + 1..]
                .iter()
                .flatten()
                .copied()
                .filter(|u| set.contains(u))
                .collect()
        } else {
            set.iter()
                .copied()
                .filter(|&u| matches!(self.status[u], Status::Placed(p) if p > pos))
                .collect()
        }
    }

    /// Fill the empty slot `pos` with a free or parked vertex.
    pub fn place_at(&mut self, v: usize, pos: usize) {
        self.assert_no_look_ahead("place_at");
        assert!(
            pos < self.slots.len() && self.slots[pos].is_none(),
            "place_at: slot {pos} is not an empty slot before at"
        );
        let recompute: Vec<usize> = match self.status[v] {
            // placed vertices right of pos lose v as a path vertex
            Status::Free => self.placed_right_of_in(pos, &self.sets.reach[v]),
            // placed vertices left of pos may now route through v
            Status::Parked => self
                .graph
                .ball(v, self.cfg.radius)
                .into_iter()
                .filter(|&u| matches!(self.status[u], Status::Placed(p) if p < pos))
                .collect(),
            Status::Placed(p) => panic!("place_at: vertex {v} already placed at {p}"),
        };
        if self.status[v] == Status::Free {
            self.active.deactivate(v);
        }
        self.set_status(v, Status::Placed(pos));
        self.slots[pos] = Some(v);
        self.placed += 1;
        for u in self.reach_right(v) {
            if u != v {
                self.add(u, v);
            }
        }
        for u in recompute {
            self.update_reach(u);
        }
    }

    /// Empty slot `pos`; its vertex becomes free. Returns that vertex.
    pub fn unplace_at(&mut self, pos: usize) -> usize {
        self.assert_no_look_ahead("unplace_at");
        let Some(v) = self.slots.get(pos).copied().flatten() else {
            panic!("unplace_at: slot {pos} is empty");
        };
        let recompute = self.placed_right_of_in(pos, &self.sets.reach_inv[v]);
        self.set_status(v, Status::Free);
        self.slots[pos] = None;
        self.placed -= 1;
        self.detach_sources(v);
        self.active.activate(self.graph, v);
        for u in recompute {
            self.update_reach(u);
        }
        v
    }

    /// Take `v` out of play: it leaves the ordering (its slot stays empty)
    /// and stops taking part in any path until placed again with
    /// [`Ordering::place_at`].
    pub fn park(&mut self, v: usize) {
        self.assert_no_look_ahead("park");
        // everyone currently reaching v may have routed through it
        let recompute: Vec<usize> = self.sets.reach[v]
            .iter()
            .copied()
            .filter(|&u| u != v)
            .collect();
        match self.status[v] {
            Status::Placed(pos) => {
                self.set_status(v, Status::Parked);
                self.slots[pos] = None;
                self.placed -= 1;
                self.detach_sources(v);
            }
            Status::Free => {
                self.set_status(v, Status::Parked);
                self.active.deactivate(v);
            }
            Status::Parked => panic!("park: vertex {v} already parked"),
        }
        for u in recompute {
            self.update_reach(u);
        }
    }

    fn detach_sources(&mut self, v: usize) {
        let targets: Vec<usize> = self.sets.reach_inv[v]
            .iter()
            .copied()
            .filter(|&u| u != v)
            .collect();
        for u in targets {
            self.remove(u, v);
        }
    }

    /// Exchange two vertices.
    ///
    /// Either both are placed with `position(a) < position(b)`, or `a` is
    /// placed and `b` free, in which case `b` takes over `a`'s slot and `a`
    /// becomes free.
    pub fn swap(&mut self, a: usize, b: usize) {
        self.assert_no_look_ahead("swap");
        match (self.status[a], self.status[b]) {
            (Status::Placed(pa), Status::Free) => {
                self.unplace_at(pa);
                self.place_at(b, pa);
            }
            (Status::Placed(pa), Status::Placed(pb)) => {
                assert!(pa < pb, "swap: {a} at {pa} must precede {b} at {pb}");
                self.swap_placed(a, b, pa, pb);
            }
            (sa, sb) => panic!("swap: unsupported statuses {sa:?} / {sb:?}"),
        }
    }

    fn swap_placed(&mut self, left: usize, right: usize, pl: usize, pr: usize) {
        self.changed.insert(left);
        self.changed.insert(right);
        let inv_left = &self.sets.reach_inv[left];
        let reach_right = &self.sets.reach[right];
        let mut recompute = BTreeSet::new();
        let mut redo_left = false;
        let mut redo_right = false;
        if pr - pl - 1 <= inv_left.len() + reach_right.len() {
            for u in self.slots[pl + 1..pr].iter().flatten().copied() {
                let in_left = inv_left.contains(&u);
                let in_right = reach_right.contains(&u);
                redo_left |= in_left;
                redo_right |= in_right;
                if in_left || in_right {
                    recompute.insert(u);
                }
            }
        } else {
            let between = |u: usize| matches!(self.status[u], Status::Placed(p) if pl < p && p < pr);
            for &u in reach_right.iter().filter(|&&u| between(u)) {
                redo_right = true;
                recompute.insert(u);
            }
            for &u in inv_left.iter().filter(|&&u| between(u)) {
                redo_left = true;
                recompute.insert(u);
            }
        }
        if reach_right.contains(&left) {
            redo_left = true;
            redo_right = true;
        }
        if redo_left {
            recompute.insert(left);
        }
        if redo_right {
            recompute.insert(right);
        }

        self.slots.swap(pl, pr);
        self.set_status(left, Status::Placed(pr));
        self.set_status(right, Status::Placed(pl));
        for u in recompute {
            self.update_reach(u);
        }
    }

    /// Re-lay the placed vertices with `gap` empty slots before each of them
    /// and after the last one. Relative order, and so every reach set, is
    /// unchanged.
    pub fn spread(&mut self, gap: usize) {
        let order = self.current_ordering();
        let len = gap * (order.len() + 1) + order.len();
        self.slots = vec![None; len];
        for (i, &v) in order.iter().enumerate() {
            let pos = (i + 1) * gap + i;
            self.slots[pos] = Some(v);
            self.set_status(v, Status::Placed(pos));
        }
        self.at = len;
    }

    /// Squeeze out every empty slot.
    pub fn compact(&mut self) {
        let order = self.current_ordering();
        self.slots = order.iter().copied().map(Some).collect();
        for (pos, &v) in order.iter().enumerate() {
            self.set_status(v, Status::Placed(pos));
        }
        self.at = self.slots.len();
    }

    /// Rebuild the whole state from a slot list (holes allowed).
    pub fn reset_to(&mut self, slots: &[Option<usize>]) {
        *self = Ordering::new(self.graph, self.cfg);
        for &slot in slots {
            match slot {
                Some(v) => self.place(v),
                None => {
                    self.slots.push(None);
                    self.at = self.slots.len();
                }
            }
        }
        self.changed = (0..self.n()).collect();
    }

    /// Smallest position of a placed vertex that `v` would reach if it sat
    /// just before slot `from`.
    pub fn first_breakpoint(&self, v: usize, from: usize) -> Option<usize> {
        self.reach_right_from(v, from)
            .into_iter()
            .filter(|&u| u != v)
            .filter_map(|u| self.position(u))
            .min()
    }

    /// Largest empty slot in `from..until`.
    pub fn last_hole_in(&self, from: usize, until: usize) -> Option<usize> {
        let until = until.min(self.slots.len());
        (from..until).rev().find(|&p| self.slots[p].is_none())
    }

    pub fn edit_place_at(&mut self, v: usize, pos: usize) -> Edit<'_, 'g> {
        let undo = match self.status[v] {
            Status::Parked => Undo::Park(v),
            _ => Undo::UnplaceAt(pos),
        };
        self.place_at(v, pos);
        Edit {
            ord: self,
            undo: Some(undo),
        }
    }

    pub fn edit_swap(&mut self, a: usize, b: usize) -> Edit<'_, 'g> {
        self.swap(a, b);
        Edit {
            ord: self,
            undo: Some(Undo::Swap(b, a)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Undo {
    UnplaceAt(usize),
    Park(usize),
    Swap(usize, usize),
}

/// Guard for a hole placement or a swap; reverted on drop unless committed.
pub struct Edit<'a, 'g> {
    ord: &'a mut Ordering<'g, Append>,
    undo: Option<Undo>,
}

impl Edit<'_, '_> {
    pub fn commit(mut self) {
        self.undo = None;
    }
}

impl<'g> Deref for Edit<'_, 'g> {
    type Target = Ordering<'g, Append>;
    fn deref(&self) -> &Self::Target {
        self.ord
    }
}

impl DerefMut for Edit<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ord
    }
}

impl Drop for Edit<'_, '_> {
    fn drop(&mut self) {
        match self.undo.take() {
            Some(Undo::UnplaceAt(pos)) => {
                self.ord.unplace_at(pos);
            }
            Some(Undo::Park(v)) => self.ord.park(v),
            Some(Undo::Swap(a, b)) => self.ord.swap(a, b),
            None => {}
        }
    }
}
