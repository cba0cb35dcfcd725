//! Disjoint-set forest with path compression and union by size.

#[derive(Clone, Debug)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
}

impl UnionFind {
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    pub fn find(&mut self, v: usize) -> usize {
        let mut root = v;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = v;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`; returns the new root, or `None` if they
    /// were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> Option<usize> {
        let (mut ra, mut rb) = (self.find(a), self.find(b));
        if ra == rb {
            return None;
        }
        if self.size[ra] < self.size[rb] {
            std::mem::swap(&mut ra, &mut rb);
        }
        self.parent[rb] = ra;
        self.size[ra] += self.size[rb];
        Some(ra)
    }

    #[cfg(test)]
    fn connected(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    #[cfg(test)]
    fn set_size(&mut self, v: usize) -> usize {
        let r = self.find(v);
        self.size[r]
    }

    #[cfg(test)]
    fn count(&mut self) -> usize {
        let n = self.parent.len();
        (0..n).filter(|&v| self.find(v) == v).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_and_find() {
        let mut uf = UnionFind::new(5);
        assert_eq!(uf.count(), 5);
        assert!(uf.union(0, 1).is_some());
        assert!(uf.union(3, 4).is_some());
        assert!(uf.union(1, 0).is_none());
        assert!(uf.connected(0, 1));
        assert!(!uf.connected(1, 3));
        uf.union(1, 4);
        assert!(uf.connected(0, 3));
        assert_eq!(uf.set_size(3), 4);
        assert_eq!(uf.count(), 2);
    }
}
