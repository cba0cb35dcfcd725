//! Immutable undirected simple graph on vertices `0..n`.
//!
//! Adjacency lists are sorted and deduplicated; self-loops never enter the
//! structure. Positions and every other per-run attribute live in the
//! ordering engine, so one `Graph` can back any number of engines.

use std::collections::VecDeque;

/// Distance value used for "not reachable" in BFS results.
pub const UNREACHABLE: u32 = u32::MAX;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Graph {
    adj: Vec<Vec<usize>>,
    m: usize,
}

impl Graph {
    /// Build a graph with `n` vertices from an edge list.
    ///
    /// Self-loops are dropped and parallel edges merged. Panics if an endpoint
    /// is `>= n`.
    pub fn from_edges(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut adj = vec![Vec::new(); n];
        for (u, v) in edges {
            assert!(u < n && v < n, "edge ({u}, {v}) out of range for n = {n}");
            if u == v {
                continue;
            }
            adj[u].push(v);
            adj[v].push(u);
        }
        let mut m = 0;
        for list in adj.iter_mut() {
            list.sort_unstable();
            list.dedup();
            m += list.len();
        }
        Self { adj, m: m / 2 }
    }

    /// Path `0-1-...-(n-1)`.
    pub fn path(n: usize) -> Self {
        Self::from_edges(n, (1..n).map(|v| (v - 1, v)))
    }

    /// Cycle on `n >= 3` vertices.
    pub fn cycle(n: usize) -> Self {
        Self::from_edges(n, (0..n).map(|v| (v, (v + 1) % n)))
    }

    /// Star with center `0` and leaves `1..=leaves`.
    pub fn star(leaves: usize) -> Self {
        Self::from_edges(leaves + 1, (1..=leaves).map(|v| (0, v)))
    }

    pub fn complete(n: usize) -> Self {
        Self::from_edges(n, (0..n).flat_map(|u| (u + 1..n).map(move |v| (u, v))))
    }

    /// `rows x cols` grid, vertex `(i, j)` has id `i * cols + j`.
    pub fn grid(rows: usize, cols: usize) -> Self {
        let id = |i: usize, j: usize| i * cols + j;
        let mut edges = Vec::new();
        for i in 0..rows {
            for j in 0..cols {
                if i + 1 < rows {
                    edges.push((id(i, j), id(i + 1, j)));
                }
                if j + 1 < cols {
                    edges.push((id(i, j), id(i, j + 1)));
                }
            }
        }
        Self::from_edges(rows * cols, edges)
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.adj.len()
    }

    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    #[inline]
    pub fn neighbours(&self, v: usize) -> &[usize] {
        &self.adj[v]
    }

    #[inline]
    pub fn degree(&self, v: usize) -> usize {
        self.adj[v].len()
    }

    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adj[u].binary_search(&v).is_ok()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adj
            .iter()
            .enumerate()
            .flat_map(|(u, list)| list.iter().filter(move |&&v| u < v).map(move |&v| (u, v)))
    }

    /// BFS distances from `src`; [`UNREACHABLE`] for other components.
    pub fn distances_from(&self, src: usize) -> Vec<u32> {
        let mut dist = vec![UNREACHABLE; self.n()];
        let mut queue = VecDeque::new();
        dist[src] = 0;
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            for &w in &self.adj[u] {
                if dist[w] == UNREACHABLE {
                    dist[w] = dist[u] + 1;
                    queue.push_back(w);
                }
            }
        }
        dist
    }

    /// Every vertex within distance `radius` of `src` (including `src`),
    /// ignoring any ordering.
    pub fn ball(&self, src: usize, radius: usize) -> Vec<usize> {
        let mut dist = vec![UNREACHABLE; self.n()];
        let mut queue = VecDeque::new();
        let mut out = vec![src];
        dist[src] = 0;
        queue.push_back(src);
        while let Some(u) = queue.pop_front() {
            if dist[u] as usize == radius {
                continue;
            }
            for &w in &self.adj[u] {
                if dist[w] == UNREACHABLE {
                    dist[w] = dist[u] + 1;
                    out.push(w);
                    queue.push_back(w);
                }
            }
        }
        out
    }
}
