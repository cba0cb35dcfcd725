//! Induced subgraph on the currently unplaced vertices.

use std::collections::{BTreeSet, VecDeque};

use crate::graph::Graph;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSubgraph {
    adj: Vec<BTreeSet<usize>>,
    members: BTreeSet<usize>,
}

impl ActiveSubgraph {
    /// Every vertex starts active.
    pub fn new(graph: &Graph) -> Self {
        Self {
            adj: (0..graph.n())
                .map(|v| graph.neighbours(v).iter().copied().collect())
                .collect(),
            members: (0..graph.n()).collect(),
        }
    }

    /// Re-add `v` with its edges to every currently active neighbour.
    pub fn activate(&mut self, graph: &Graph, v: usize) {
        assert!(self.members.insert(v), "activate: vertex {v} already active");
        for &w in graph.neighbours(v) {
            if self.members.contains(&w) {
                self.adj[w].insert(v);
                self.adj[v].insert(w);
            }
        }
    }

    pub fn deactivate(&mut self, v: usize) {
        assert!(self.members.remove(&v), "deactivate: vertex {v} not active");
        for w in std::mem::take(&mut self.adj[v]) {
            self.adj[w].remove(&v);
        }
    }

    #[inline]
    pub fn contains(&self, v: usize) -> bool {
        self.members.contains(&v)
    }

    #[inline]
    pub fn neighbours(&self, v: usize) -> &BTreeSet<usize> {
        &self.adj[v]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.adj[v].len()
    }

    pub fn members(&self) -> &BTreeSet<usize> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Connected component of `seed` inside the active region.
    pub fn component(&self, seed: usize) -> BTreeSet<usize> {
        let mut comp = BTreeSet::new();
        if !self.contains(seed) {
            return comp;
        }
        let mut queue = VecDeque::from([seed]);
        comp.insert(seed);
        while let Some(u) = queue.pop_front() {
            for &w in &self.adj[u] {
                if comp.insert(w) {
                    queue.push_back(w);
                }
            }
        }
        comp
    }
}
