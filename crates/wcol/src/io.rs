//! Plain-text edge-list reader.
//!
//! Format: one edge per line as two whitespace-separated labels. Lines that
//! are empty or start with `#` are skipped. Labels are arbitrary tokens and
//! are remapped to `0..n` in sorted label order, so the same file always
//! yields the same ids. Self-loop lines are dropped before their labels are
//! registered, so a label that only ever appears in a self-loop is no vertex.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use thiserror::Error;

use crate::graph::Graph;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("reading graph input: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected two vertex labels, got {found:?}")]
    Malformed { line: usize, found: String },
}

/// A graph together with the original label of every vertex id.
#[derive(Clone, Debug)]
pub struct LabeledGraph {
    pub graph: Graph,
    pub labels: Vec<String>,
}

impl LabeledGraph {
    pub fn label(&self, v: usize) -> &str {
        &self.labels[v]
    }
}

pub fn read_edge_list<R: BufRead>(reader: R) -> Result<LabeledGraph, GraphError> {
    let mut raw = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut parts = trimmed.split_whitespace();
        let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
            return Err(GraphError::Malformed {
                line: idx + 1,
                found: trimmed.to_string(),
            });
        };
        if a == b {
            continue;
        }
        raw.push((a.to_string(), b.to_string()));
    }

    let mut ids: BTreeMap<&str, usize> = BTreeMap::new();
    for (a, b) in &raw {
        ids.insert(a.as_str(), 0);
        ids.insert(b.as_str(), 0);
    }
    for (next, id) in ids.values_mut().enumerate() {
        *id = next;
    }
    let labels: Vec<String> = ids.keys().map(|s| s.to_string()).collect();
    let edges: Vec<(usize, usize)> = raw
        .iter()
        .map(|(a, b)| (ids[a.as_str()], ids[b.as_str()]))
        .collect();
    let graph = Graph::from_edges(labels.len(), edges);
    Ok(LabeledGraph { graph, labels })
}

pub fn read_edge_list_file<P: AsRef<Path>>(path: P) -> Result<LabeledGraph, GraphError> {
    let file = std::fs::File::open(path)?;
    read_edge_list(std::io::BufReader::new(file))
}
