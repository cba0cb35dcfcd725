//! Weak coloring number orderings.
//!
//! Builds linear orderings of a graph whose weak `r`-reachability sets stay at
//! most `k` large, with exact incremental bookkeeping and backtracking repair.
//!
//! Layout
//! - `graph`, `io`: the immutable graph and the edge-list loader.
//! - `ordering`: the engine, generic over an insertion policy.
//! - `lower_bound`, `dsu`: peeling bounds and the union-find they use.
//! - `repair`: strategies that restore an extendable ordering.
//! - `greedy`: online drivers tying engine and repair together.
//! - `anytime`: the loop that keeps lowering the threshold of a driver.
//!
//! API Policy
//! - The crate is internal to this workspace. There is no stable public API;
//!   breaking changes are fine when they improve the design.

pub mod anytime;
pub mod api;
pub mod dsu;
pub mod graph;
pub mod greedy;
pub mod io;
pub mod lower_bound;
pub mod ordering;
pub mod repair;

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use graph::Graph;
pub use ordering::{Append, EngineCfg, Ordering, Prepend};

/// Common exports for quick imports in callers.
pub mod prelude {
    pub use crate::graph::Graph;
    pub use crate::greedy::{by_degree, by_potential, by_reach, Outcome, Run};
    pub use crate::ordering::{Append, EngineCfg, Ordering, Policy, Prepend};
    pub use crate::repair::{Repair, Strategy};
}
