//! Peeling lower bounds on the threshold any completion must reach.
//!
//! Purpose
//! - Given the free region of an engine (or the whole graph for an empty
//!   engine), compute a value that every completed ordering's maximum reach
//!   size is at least.
//!
//! Why this design
//! - All three bounds run on a detached [`PeelGraph`] snapshot, so callers
//!   never mutate committed engine state and nothing needs restoring.
//! - A vertex's peeling key is its current degree plus a base weight (its
//!   reach size in the engine). Contractions keep the larger base.
//! - Branch sets whose diameter stays at most `(r-1)/2` give a shallow minor;
//!   the vertex of a branch set with the rightmost representative then
//!   reaches every neighbouring branch set's representative within `r`.
//!
//! Every function takes an optional cutoff and returns as soon as the running
//! bound exceeds it, which is all `is_extendable` needs.

use std::collections::{BTreeSet, HashMap};

use nalgebra::DMatrix;

use crate::dsu::UnionFind;
use crate::graph::Graph;

/// Induced subgraph with per-vertex base weights, in local ids `0..len`.
#[derive(Clone, Debug, Default)]
pub struct PeelGraph {
    adj: Vec<Vec<usize>>,
    base: Vec<usize>,
}

impl PeelGraph {
    /// Build from a vertex set, an adjacency oracle and a base weight oracle.
    /// Neighbours outside the vertex set are dropped.
    pub fn new<I, A, N, B>(vertices: I, adj: A, base: B) -> Self
    where
        I: IntoIterator<Item = usize>,
        A: Fn(usize) -> N,
        N: IntoIterator<Item = usize>,
        B: Fn(usize) -> usize,
    {
        let ids: Vec<usize> = vertices.into_iter().collect();
        let local: HashMap<usize, usize> = ids.iter().enumerate().map(|(i, &v)| (v, i)).collect();
        let adj = ids
            .iter()
            .map(|&v| {
                let mut row: Vec<usize> = adj(v)
                    .into_iter()
                    .filter_map(|w| local.get(&w).copied())
                    .filter(|&w| w != local[&v])
                    .collect();
                row.sort_unstable();
                row.dedup();
                row
            })
            .collect();
        let base = ids.iter().map(|&v| base(v)).collect();
        Self { adj, base }
    }

    pub fn len(&self) -> usize {
        self.adj.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adj.is_empty()
    }
}

/// All three bounds for the whole graph, i.e. for an empty ordering, where
/// every vertex starts with a reach of one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraphBounds {
    pub degeneracy: usize,
    pub contraction: usize,
    pub contraction_exact: usize,
}

impl GraphBounds {
    pub fn of(graph: &Graph, radius: usize) -> Self {
        let g = PeelGraph::new(0..graph.n(), |v| graph.neighbours(v).iter().copied(), |_| 1);
        let budget = radius.saturating_sub(1) / 2;
        Self {
            degeneracy: degeneracy(&g, None),
            contraction: contraction(&g, budget, None),
            contraction_exact: contraction_exact(&g, budget, None),
        }
    }

    /// The strongest of the three; an ordering of this cost is optimal.
    pub fn best(&self) -> usize {
        self.degeneracy
            .max(self.contraction)
            .max(self.contraction_exact)
    }
}

fn past(lb: usize, cutoff: Option<usize>) -> bool {
    cutoff.is_some_and(|c| lb > c)
}

/// Repeatedly delete the vertex minimising degree plus base; the largest key
/// seen is the bound.
pub fn degeneracy(g: &PeelGraph, cutoff: Option<usize>) -> usize {
    let n = g.len();
    let mut deg: Vec<usize> = g.adj.iter().map(Vec::len).collect();
    let mut gone = vec![false; n];
    let mut queue: BTreeSet<(usize, usize)> = (0..n).map(|v| (deg[v] + g.base[v], v)).collect();
    let mut lb = 0;
    while let Some((key, v)) = queue.pop_first() {
        lb = lb.max(key);
        if past(lb, cutoff) {
            return lb;
        }
        gone[v] = true;
        for &w in &g.adj[v] {
            if gone[w] {
                continue;
            }
            queue.remove(&(deg[w] + g.base[w], w));
            deg[w] -= 1;
            queue.insert((deg[w] + g.base[w], w));
        }
    }
    lb
}

/// Mutable peeling state shared by both contraction variants. Only roots
/// (surviving merged vertices) carry adjacency and keys.
struct Peeler {
    adj: Vec<BTreeSet<usize>>,
    weight: Vec<usize>,
    queue: BTreeSet<(usize, usize)>,
}

impl Peeler {
    fn new(g: &PeelGraph) -> Self {
        let adj: Vec<BTreeSet<usize>> = g.adj.iter().map(|row| row.iter().copied().collect()).collect();
        let queue = (0..g.len()).map(|v| (adj[v].len() + g.base[v], v)).collect();
        Self {
            adj,
            weight: g.base.clone(),
            queue,
        }
    }

    fn key(&self, v: usize) -> (usize, usize) {
        (self.adj[v].len() + self.weight[v], v)
    }

    fn delete(&mut self, v: usize) {
        for w in std::mem::take(&mut self.adj[v]) {
            self.queue.remove(&self.key(w));
            self.adj[w].remove(&v);
            self.queue.insert(self.key(w));
        }
    }

    /// Merge `w` into `v`; `v` must already be out of the queue.
    fn contract(&mut self, v: usize, w: usize) {
        self.queue.remove(&self.key(w));
        self.adj[v].remove(&w);
        for x in std::mem::take(&mut self.adj[w]) {
            if x == v {
                continue;
            }
            self.queue.remove(&self.key(x));
            self.adj[x].remove(&w);
            self.adj[x].insert(v);
            self.adj[v].insert(x);
            self.queue.insert(self.key(x));
        }
        self.weight[v] = self.weight[v].max(self.weight[w]);
        self.queue.insert(self.key(v));
    }

    /// Neighbour of `v` accepted by `allowed` with the smallest key; the
    /// first one wins ties.
    fn best_partner(&self, v: usize, mut allowed: impl FnMut(usize) -> bool) -> Option<usize> {
        let mut best: Option<(usize, usize)> = None;
        for &w in &self.adj[v] {
            let cost = self.adj[w].len() + self.weight[w];
            if best.is_some_and(|(c, _)| cost >= c) {
                continue;
            }
            if allowed(w) {
                best = Some((cost, w));
            }
        }
        best.map(|(_, w)| w)
    }
}

/// Peeling with contractions, using the number of merged vertices as a proxy
/// for branch-set diameter: a merge is allowed while the merged set has at
/// most `budget + 1` vertices.
pub fn contraction(g: &PeelGraph, budget: usize, cutoff: Option<usize>) -> usize {
    let mut p = Peeler::new(g);
    let mut count = vec![1usize; g.len()];
    let mut lb = 0;
    while let Some((key, v)) = p.queue.pop_first() {
        lb = lb.max(key);
        if past(lb, cutoff) {
            return lb;
        }
        let partner = p.best_partner(v, |w| count[v] + count[w] - 1 <= budget);
        match partner {
            Some(w) => {
                count[v] += count[w];
                p.contract(v, w);
            }
            None => p.delete(v),
        }
    }
    lb
}

/// Like [`contraction`] but a merge is allowed only if the merged branch set
/// has diameter at most `budget` inside the original graph.
pub fn contraction_exact(g: &PeelGraph, budget: usize, cutoff: Option<usize>) -> usize {
    let mut p = Peeler::new(g);
    let mut sets = UnionFind::new(g.len());
    // member lists live at union-find roots
    let mut members: Vec<Vec<usize>> = (0..g.len()).map(|v| vec![v]).collect();
    let mut lb = 0;
    while let Some((key, v)) = p.queue.pop_first() {
        lb = lb.max(key);
        if past(lb, cutoff) {
            return lb;
        }
        let rv = sets.find(v);
        let partner = p.best_partner(v, |w| {
            let rw = sets.find(w);
            if members[rv].len() + members[rw].len() - 1 <= budget {
                return true;
            }
            let merged: Vec<usize> = members[rv].iter().chain(&members[rw]).copied().collect();
            diameter(g, &merged) <= budget
        });
        match partner {
            Some(w) => {
                let rw = sets.find(w);
                let mut merged = std::mem::take(&mut members[rv]);
                merged.append(&mut members[rw]);
                if let Some(root) = sets.union(rv, rw) {
                    members[root] = merged;
                }
                p.contract(v, w);
            }
            None => p.delete(v),
        }
    }
    lb
}

/// Diameter of the subgraph of `g` induced by `set`, via Floyd-Warshall.
/// Disconnected sets report `usize::MAX`.
fn diameter(g: &PeelGraph, set: &[usize]) -> usize {
    const INF: u32 = u32::MAX / 2;
    let s = set.len();
    let index: HashMap<usize, usize> = set.iter().enumerate().map(|(i, &v)| (v, i)).collect();
    let mut dist = DMatrix::<u32>::from_element(s, s, INF);
    for (i, &v) in set.iter().enumerate() {
        dist[(i, i)] = 0;
        for w in &g.adj[v] {
            if let Some(&j) = index.get(w) {
                dist[(i, j)] = 1;
            }
        }
    }
    for m in 0..s {
        for i in 0..s {
            let dim = dist[(i, m)];
            if dim == INF {
                continue;
            }
            for j in 0..s {
                let through = dim + dist[(m, j)];
                if through < dist[(i, j)] {
                    dist[(i, j)] = through;
                }
            }
        }
    }
    let worst = dist.iter().copied().max().unwrap_or(0);
    if worst >= INF {
        usize::MAX
    } else {
        worst as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn whole(g: &Graph) -> PeelGraph {
        PeelGraph::new(0..g.n(), |v| g.neighbours(v).iter().copied(), |_| 1)
    }

    #[test]
    fn degeneracy_of_small_families() {
        assert_eq!(degeneracy(&whole(&Graph::path(6)), None), 2);
        assert_eq!(degeneracy(&whole(&Graph::cycle(6)), None), 3);
        assert_eq!(degeneracy(&whole(&Graph::complete(5)), None), 5);
        assert_eq!(degeneracy(&whole(&Graph::star(4)), None), 2);
        assert_eq!(degeneracy(&PeelGraph::default(), None), 0);
    }

    #[test]
    fn graph_bounds_match_small_families() {
        let path = GraphBounds::of(&Graph::path(5), 1);
        assert_eq!(path.degeneracy, 2);
        assert_eq!(path.best(), 2);
        assert_eq!(GraphBounds::of(&Graph::star(4), 1).best(), 2);
        assert_eq!(GraphBounds::of(&Graph::complete(4), 3).best(), 4);
        assert_eq!(GraphBounds::of(&Graph::default(), 2).best(), 0);
    }

    #[test]
    fn cutoff_returns_early_past_target() {
        let g = whole(&Graph::complete(6));
        assert!(degeneracy(&g, Some(3)) > 3);
        assert!(contraction(&g, 1, Some(3)) > 3);
        assert!(contraction_exact(&g, 1, Some(3)) > 3);
    }

    #[test]
    fn zero_budget_contraction_is_degeneracy() {
        let g = whole(&Graph::grid(4, 5));
        assert_eq!(contraction(&g, 0, None), degeneracy(&g, None));
        assert_eq!(contraction_exact(&g, 0, None), degeneracy(&g, None));
    }

    #[test]
    fn contraction_beats_degeneracy_on_long_cycle() {
        // contracting a cycle keeps it a cycle, so the bound never drops
        let g = whole(&Graph::cycle(12));
        assert_eq!(degeneracy(&g, None), 3);
        assert!(contraction(&g, 1, None) >= 3);
        assert!(contraction_exact(&g, 2, None) >= 3);
    }

    #[test]
    fn grid_contractions_dominate_degeneracy() {
        let g = whole(&Graph::grid(6, 6));
        let d = degeneracy(&g, None);
        assert_eq!(d, 3);
        assert!(contraction(&g, 1, None) >= d);
        assert!(contraction_exact(&g, 2, None) >= d);
    }

    #[test]
    fn diameter_of_induced_sets() {
        let g = whole(&Graph::path(5));
        assert_eq!(diameter(&g, &[0, 1, 2]), 2);
        assert_eq!(diameter(&g, &[0, 2]), usize::MAX);
        assert_eq!(diameter(&g, &[3]), 0);
    }

    #[test]
    fn outside_neighbours_are_dropped() {
        let g = Graph::path(4);
        let peel = PeelGraph::new([1, 2], |v| g.neighbours(v).iter().copied(), |_| 1);
        assert_eq!(peel.len(), 2);
        assert_eq!(degeneracy(&peel, None), 2);
    }
}
