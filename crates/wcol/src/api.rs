//! Curated internal API (UNSTABLE).
//!
//! A convenience surface for the CLI and benches. Breaking changes are
//! allowed and expected.

// Graphs
pub use crate::graph::{Graph, UNREACHABLE};
pub use crate::io::{read_edge_list, read_edge_list_file, GraphError, LabeledGraph};
// Engine
pub use crate::ordering::{
    weak_coloring_number, ActiveSubgraph, Append, EngineCfg, Ordering, Policy, Prepend, Snapshot,
    Status,
};
// Bounds
pub use crate::dsu::UnionFind;
pub use crate::lower_bound::{contraction, contraction_exact, degeneracy, GraphBounds, PeelGraph};
// Repair and drivers
pub use crate::greedy::{
    by_degree, by_potential, by_reach, drive, run, Outcome, Picker, PotentialQueue, RepairRecord,
    Rule, Run, RunStats,
};
pub use crate::repair::{
    BranchingRule, BranchingSet, GapFill, LastC, Merge, Pool, Repair, SearchStats, Strategy,
    SwapLocalSearch, SwapNeighbours,
};
// Improvement loop
pub use crate::anytime::{improve, AnytimeCfg, AnytimeError, Attempt, Progress, Stop};
