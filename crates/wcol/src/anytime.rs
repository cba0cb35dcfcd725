//! Anytime improvement: keep tightening the threshold until the budget runs
//! out or the lower bound is met.
//!
//! Purpose
//! - Start from an unbounded greedy ordering of cost `k`. Ask for `k - 1`
//!   with the smallest repair window `c = 1`, and widen the window one step
//!   per failed attempt. Every success restarts the window at one below the
//!   new cost.
//! - Every ordering that is accepted is re-checked with
//!   [`weak_coloring_number`], independently of the engine.
//!
//! Why this design
//! - The loop does not know how an attempt is built. The caller passes a
//!   closure that runs one greedy pass for a given `(k, c)`, so any driver,
//!   policy and strategy combination can be improved the same way.
//!
//! References
//! - `greedy` for the runs handed back by the closure.
//! - `lower_bound::GraphBounds` for the value that stops the loop early.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::graph::Graph;
use crate::greedy::{Outcome, Run};
use crate::ordering::weak_coloring_number;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnytimeError {
    #[error("the initial unbounded run did not finish")]
    NoInitialOrdering,
    #[error("ordering claimed cost {claimed} but recomputes to {actual:?}")]
    Mismatch { claimed: usize, actual: Option<usize> },
}

/// Budget of one improvement loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnytimeCfg {
    /// Checked between attempts; a running attempt is never interrupted.
    pub time_limit: Option<Duration>,
    /// Largest window tried per threshold; `None` means the vertex count.
    pub max_c: Option<usize>,
    /// Stop as soon as the cost reaches this value.
    pub lower_bound: usize,
}

impl Default for AnytimeCfg {
    fn default() -> Self {
        Self {
            time_limit: Some(Duration::from_secs(60)),
            max_c: None,
            lower_bound: 0,
        }
    }
}

/// Why the loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stop {
    /// The best cost equals the lower bound.
    Optimal,
    TimeLimit,
    /// Every window up to the limit failed for the current threshold.
    WindowExhausted,
}

/// One call of the attempt closure.
#[derive(Clone, Debug)]
pub struct Attempt {
    /// Threshold asked for; `None` for the initial unbounded run.
    pub k: Option<usize>,
    pub c: usize,
    /// Time since the loop started, taken when the attempt returned.
    pub at: Duration,
    pub run: Run,
}

#[derive(Clone, Debug)]
pub struct Progress {
    pub cost: usize,
    pub ordering: Vec<usize>,
    pub improvements: Vec<Attempt>,
    pub failures: Vec<Attempt>,
    pub stop: Stop,
}

/// Run the improvement loop. `attempt(k, c)` must build and run one greedy
/// pass; `k = None` asks for the initial pass without a threshold.
pub fn improve<F>(
    graph: &Graph,
    radius: usize,
    cfg: AnytimeCfg,
    mut attempt: F,
) -> Result<Progress, AnytimeError>
where
    F: FnMut(Option<usize>, usize) -> Run,
{
    let start = Instant::now();
    let max_c = cfg.max_c.unwrap_or(graph.n());

    let run = attempt(None, 0);
    let Outcome::Solved { ordering, cost } = run.outcome.clone() else {
        return Err(AnytimeError::NoInitialOrdering);
    };
    check(graph, radius, &ordering, cost)?;
    info!(cost, "initial ordering");
    let mut progress = Progress {
        cost,
        ordering,
        improvements: vec![Attempt {
            k: None,
            c: 0,
            at: start.elapsed(),
            run,
        }],
        failures: Vec::new(),
        stop: Stop::WindowExhausted,
    };

    'tighten: loop {
        if progress.cost <= cfg.lower_bound.max(1) {
            progress.stop = Stop::Optimal;
            break;
        }
        let k = progress.cost - 1;
        for c in 1..=max_c {
            if cfg.time_limit.is_some_and(|limit| start.elapsed() >= limit) {
                progress.stop = Stop::TimeLimit;
                break 'tighten;
            }
            let run = attempt(Some(k), c);
            let done = Attempt {
                k: Some(k),
                c,
                at: start.elapsed(),
                run,
            };
            match done.run.outcome.clone() {
                Outcome::Solved { ordering, cost } => {
                    check(graph, radius, &ordering, cost)?;
                    info!(cost, k, c, elapsed_ms = done.at.as_millis() as u64, "improved");
                    progress.cost = cost;
                    progress.ordering = ordering;
                    progress.improvements.push(done);
                    continue 'tighten;
                }
                Outcome::Stuck { placed, .. } => {
                    debug!(k, c, placed, "no ordering at this window");
                    progress.failures.push(done);
                }
            }
        }
        progress.stop = Stop::WindowExhausted;
        break;
    }
    info!(cost = progress.cost, stop = ?progress.stop, "anytime loop finished");
    Ok(progress)
}

fn check(graph: &Graph, radius: usize, ordering: &[usize], claimed: usize) -> Result<(), AnytimeError> {
    let actual = weak_coloring_number(graph, radius, ordering);
    if actual == Some(claimed) {
        Ok(())
    } else {
        Err(AnytimeError::Mismatch { claimed, actual })
    }
}
