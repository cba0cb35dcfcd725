use anyhow::{ensure, Context, Result};
use clap::{Args, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;
use wcol::api::{
    by_degree, by_potential, by_reach, improve, read_edge_list_file, AnytimeCfg, Append,
    Attempt, BranchingRule, EngineCfg, GapFill, Graph, GraphBounds, LastC, Merge, Ordering,
    Outcome, Policy, Pool, Prepend, Progress, Repair, RepairRecord, Run, RunStats, SearchStats,
    Stop, Strategy, SwapLocalSearch, SwapNeighbours,
};

use crate::provenance::{self, Payload};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyArg {
    LastC,
    RadiusNeighbourhood,
    ReachUnion,
    SwapNeighbours,
    SwapLocalSearch,
    Merge,
}

impl StrategyArg {
    fn name(self) -> &'static str {
        match self {
            Self::LastC => "last-c",
            Self::RadiusNeighbourhood => "radius-neighbourhood",
            Self::ReachUnion => "reach-union",
            Self::SwapNeighbours => "swap-neighbours",
            Self::SwapLocalSearch => "swap-local-search",
            Self::Merge => "merge",
        }
    }

    fn uses_c(self) -> bool {
        matches!(
            self,
            Self::LastC | Self::RadiusNeighbourhood | Self::ReachUnion | Self::Merge
        )
    }
}

#[derive(Args, Clone, Debug, Serialize)]
pub struct SolveArgs {
    /// Edge list, one `u v` pair per line
    #[arg(long)]
    pub input: PathBuf,
    #[arg(long)]
    pub radius: usize,
    /// Largest admissible reach size; required with --strategy
    #[arg(long)]
    pub k: Option<usize>,
    /// Window size for last-c, the gap strategies and merge
    #[arg(long)]
    pub c: Option<usize>,
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,
    /// Refill windows only with the vertices taken out of them
    #[arg(long)]
    pub only_reorder: bool,
    /// Keep choices inside the component of the last placed vertex
    #[arg(long)]
    pub components: bool,
    /// Also prune with a lower bound on the unplaced region
    #[arg(long)]
    pub lower_bound: bool,
    #[arg(long)]
    pub sorted_adjacency: bool,
    /// Only placed vertices count as overflowing
    #[arg(long)]
    pub ignore_right: bool,
    /// Grow the ordering right to left
    #[arg(long)]
    pub front: bool,
    /// With --front, pick the vertex with the fewest potential reachers
    #[arg(long)]
    pub potential: bool,
    /// With --strategy merge, insert every vertex into an empty ordering
    /// instead of running a greedy pass
    #[arg(long)]
    pub from_scratch: bool,
    /// Keep lowering k from an unbounded first run, widening c after every
    /// failure, until the time limit or the lower bound
    #[arg(long)]
    pub anytime: bool,
    /// Seconds for --anytime; checked between attempts
    #[arg(long, default_value_t = 60)]
    pub time_limit: u64,
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
    /// Re-derive every reach set from scratch after the run
    #[arg(long)]
    pub verify: bool,
    /// Write a JSON result here, with a provenance sidecar next to it
    #[arg(long)]
    pub out: Option<PathBuf>,
}

impl SolveArgs {
    /// Reject flag combinations before any work starts.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.radius > 0, "--radius must be positive");
        if let Some(k) = self.k {
            ensure!(k >= 1, "--k must be at least 1");
        }
        if let Some(c) = self.c {
            ensure!(c >= 1, "--c must be at least 1");
        }
        if self.anytime {
            ensure!(self.strategy.is_some(), "--anytime needs a --strategy");
            ensure!(self.k.is_none(), "--anytime picks --k itself");
            ensure!(self.c.is_none(), "--anytime picks --c itself");
        } else {
            match self.strategy {
                None => {
                    ensure!(self.k.is_none(), "--k needs a --strategy");
                    ensure!(self.c.is_none(), "--c needs a --strategy");
                }
                Some(s) => {
                    ensure!(self.k.is_some(), "--strategy {} needs --k", s.name());
                    if self.needs_c() {
                        ensure!(self.c.is_some(), "--strategy {} needs --c", s.name());
                    } else {
                        ensure!(self.c.is_none(), "--strategy {} takes no --c", s.name());
                    }
                }
            }
        }
        if self.strategy.is_none() {
            ensure!(!self.lower_bound, "--lower-bound needs a --strategy");
        }
        if matches!(self.strategy, None | Some(StrategyArg::LastC)) {
            ensure!(
                !self.sorted_adjacency,
                "--sorted-adjacency needs a strategy other than last-c"
            );
            ensure!(
                !self.ignore_right,
                "--ignore-right needs a strategy other than last-c"
            );
        }
        if self.front {
            ensure!(
                matches!(self.strategy, None | Some(StrategyArg::LastC)),
                "--front only supports the last-c strategy"
            );
        }
        ensure!(!self.potential || self.front, "--potential needs --front");
        if self.from_scratch {
            ensure!(
                self.strategy == Some(StrategyArg::Merge),
                "--from-scratch needs --strategy merge"
            );
        }
        Ok(())
    }

    /// Whether this run takes a window size.
    fn needs_c(&self) -> bool {
        self.strategy.is_some_and(StrategyArg::uses_c) && !self.from_scratch
    }

    /// Engine settings for a pass at threshold `k`; `None` is the plain
    /// unbounded pass without any strategy-specific tracking.
    pub fn engine_cfg(&self, k: Option<usize>) -> EngineCfg {
        let Some(k) = k else {
            return EngineCfg {
                radius: self.radius,
                restrict_to_component: self.components,
                ..EngineCfg::default()
            };
        };
        EngineCfg {
            radius: self.radius,
            k,
            look_ahead: self.strategy == Some(StrategyArg::LastC)
                && !self.only_reorder
                && !self.front,
            lower_bound: self.lower_bound,
            sorted_adjacency: self.sorted_adjacency,
            ignore_unplaced_overflow: self.ignore_right,
            restrict_to_component: self.components,
        }
    }

    fn last_c(&self, c: usize) -> LastC {
        LastC {
            c,
            only_reorder: self.only_reorder,
            rule: BranchingRule::ByDistance,
        }
    }

    fn gap_fill(&self, pool: Pool, c: usize) -> GapFill {
        GapFill {
            pool,
            c,
            only_reorder: self.only_reorder,
            rule: BranchingRule::Random,
            ..GapFill::default()
        }
    }

    fn strategy(&self, c: usize) -> Option<Strategy> {
        let strategy = match self.strategy? {
            StrategyArg::LastC => Strategy::LastC(self.last_c(c)),
            StrategyArg::RadiusNeighbourhood => {
                Strategy::GapFill(self.gap_fill(Pool::RadiusNeighbourhood, c))
            }
            StrategyArg::ReachUnion => Strategy::GapFill(self.gap_fill(Pool::ReachUnion, c)),
            StrategyArg::SwapNeighbours => Strategy::SwapNeighbours(SwapNeighbours::default()),
            StrategyArg::SwapLocalSearch => Strategy::SwapLocalSearch(SwapLocalSearch::default()),
            StrategyArg::Merge => Strategy::Merge(Merge {
                c,
                ..Merge::default()
            }),
        };
        Some(strategy)
    }

    /// One full pass at threshold `k` with window `c`. Without `k` the pass
    /// is unbounded and no strategy runs.
    fn attempt(&self, graph: &Graph, k: Option<usize>, c: usize, rng: &mut StdRng) -> Run {
        let cfg = self.engine_cfg(k);
        if self.front {
            let mut ord: Ordering<'_, Prepend> = Ordering::new(graph, cfg);
            let mut repair = k.and(self.strategy).map(|_| Logged::new("last-c", self.last_c(c)));
            let run = if self.potential {
                by_potential(&mut ord, repair.as_mut(), rng)
            } else {
                by_degree(&mut ord, repair.as_mut(), rng)
            };
            if self.verify {
                ord.assert_consistent();
            }
            return run;
        }
        let mut ord: Ordering<'_, Append> = Ordering::new(graph, cfg);
        if self.from_scratch && k.is_some() {
            return merge_from_scratch(&mut ord, rng, self.verify);
        }
        let mut repair = k
            .and_then(|_| self.strategy(c))
            .map(|s| Logged::new(s.name(), s));
        let run = by_reach(&mut ord, repair.as_mut(), rng);
        if self.verify {
            ord.assert_consistent();
        }
        run
    }
}

/// Whole-graph merge wrapped up as a run with a single repair record.
fn merge_from_scratch(ord: &mut Ordering<'_, Append>, rng: &mut StdRng, verify: bool) -> Run {
    let start = Instant::now();
    let mut search = SearchStats::default();
    let ok = Merge::default().solve(ord, rng, &mut search);
    let elapsed = start.elapsed();
    info!(ok, nodes = search.nodes, "merge from scratch");
    if verify {
        ord.assert_consistent();
    }
    let outcome = if ok {
        Outcome::Solved {
            ordering: ord.current_ordering(),
            cost: ord.max_reach_size(),
        }
    } else {
        Outcome::Stuck {
            at: ord.at(),
            placed: ord.placed_count(),
            repairs: 1,
        }
    };
    let record = RepairRecord {
        ok,
        placed: 0,
        n: ord.n(),
        search,
        elapsed,
    };
    Run {
        outcome,
        stats: RunStats {
            repairs: 1,
            repair_time: elapsed,
            elapsed,
            search,
            log: vec![record],
        },
    }
}

/// Emits one event per repair call.
struct Logged<S> {
    name: &'static str,
    inner: S,
    calls: usize,
}

impl<S> Logged<S> {
    fn new(name: &'static str, inner: S) -> Self {
        Self {
            name,
            inner,
            calls: 0,
        }
    }
}

impl<P: Policy, S: Repair<P>> Repair<P> for Logged<S> {
    fn search<R: Rng + ?Sized>(
        &mut self,
        ord: &mut Ordering<'_, P>,
        rng: &mut R,
        stats: &mut SearchStats,
    ) -> bool {
        self.calls += 1;
        let ok = self.inner.search(ord, rng, stats);
        info!(
            strategy = self.name,
            call = self.calls,
            ok,
            placed = ord.placed_count(),
            nodes = stats.nodes,
            "repair"
        );
        ok
    }
}

/// One repair call in the output, after the shape of [`RepairRecord`].
#[derive(Debug, Serialize)]
struct SearchReport {
    ok: bool,
    nodes: u64,
    leaves: u64,
    depth_sum: u64,
    placed: usize,
    n: usize,
    ms: f64,
}

impl From<&RepairRecord> for SearchReport {
    fn from(r: &RepairRecord) -> Self {
        Self {
            ok: r.ok,
            nodes: r.search.nodes,
            leaves: r.search.leaves,
            depth_sum: r.search.depth_sum,
            placed: r.placed,
            n: r.n,
            ms: r.elapsed.as_secs_f64() * 1e3,
        }
    }
}

#[derive(Debug, Serialize)]
struct SolveReport {
    solved: bool,
    cost: Option<usize>,
    ordering: Option<Vec<String>>,
    /// Strongest whole-graph lower bound.
    lower_bound: usize,
    /// The cost meets the lower bound.
    optimal: bool,
    stuck_at: Option<usize>,
    placed: usize,
    repairs: usize,
    repair_ms: u64,
    elapsed_ms: u64,
    nodes: u64,
    searches: Vec<SearchReport>,
    anytime: Option<AnytimeReport>,
}

impl SolveReport {
    fn new(run: &Run, labels: &[String], lower_bound: usize) -> Self {
        let (cost, ordering, stuck_at, placed) = match &run.outcome {
            Outcome::Solved { ordering, cost } => (
                Some(*cost),
                Some(ordering.iter().map(|&v| labels[v].clone()).collect::<Vec<_>>()),
                None,
                ordering.len(),
            ),
            Outcome::Stuck { at, placed, .. } => (None, None, Some(*at), *placed),
        };
        Self {
            solved: run.is_solved(),
            cost,
            ordering,
            lower_bound,
            optimal: cost == Some(lower_bound),
            stuck_at,
            placed,
            repairs: run.stats.repairs,
            repair_ms: run.stats.repair_time.as_millis() as u64,
            elapsed_ms: run.stats.elapsed.as_millis() as u64,
            nodes: run.stats.search.nodes,
            searches: run.stats.log.iter().map(SearchReport::from).collect(),
            anytime: None,
        }
    }

    fn from_progress(progress: &Progress, labels: &[String], lower_bound: usize, elapsed: Duration) -> Self {
        let last = progress.improvements.last().map(|a| &a.run);
        let attempts = progress.improvements.iter().chain(&progress.failures);
        Self {
            solved: true,
            cost: Some(progress.cost),
            ordering: Some(progress.ordering.iter().map(|&v| labels[v].clone()).collect()),
            lower_bound,
            optimal: progress.cost == lower_bound,
            stuck_at: None,
            placed: progress.ordering.len(),
            repairs: attempts.clone().map(|a| a.run.stats.repairs).sum(),
            repair_ms: attempts
                .clone()
                .map(|a| a.run.stats.repair_time)
                .sum::<Duration>()
                .as_millis() as u64,
            elapsed_ms: elapsed.as_millis() as u64,
            nodes: attempts.map(|a| a.run.stats.search.nodes).sum(),
            searches: last
                .map(|run| run.stats.log.iter().map(SearchReport::from).collect())
                .unwrap_or_default(),
            anytime: Some(AnytimeReport::new(progress)),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnytimeReport {
    stop: &'static str,
    improvements: Vec<AttemptReport>,
    failures: Vec<AttemptReport>,
}

impl AnytimeReport {
    fn new(progress: &Progress) -> Self {
        let stop = match progress.stop {
            Stop::Optimal => "optimal",
            Stop::TimeLimit => "time-limit",
            Stop::WindowExhausted => "window-exhausted",
        };
        Self {
            stop,
            improvements: progress.improvements.iter().map(AttemptReport::from).collect(),
            failures: progress.failures.iter().map(AttemptReport::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AttemptReport {
    k: Option<usize>,
    c: usize,
    cost: Option<usize>,
    total_ms: u64,
    repairs: usize,
    repair_ms: u64,
    searches: Vec<SearchReport>,
}

impl From<&Attempt> for AttemptReport {
    fn from(a: &Attempt) -> Self {
        Self {
            k: a.k,
            c: a.c,
            cost: a.run.cost(),
            total_ms: a.at.as_millis() as u64,
            repairs: a.run.stats.repairs,
            repair_ms: a.run.stats.repair_time.as_millis() as u64,
            searches: a.run.stats.log.iter().map(SearchReport::from).collect(),
        }
    }
}

pub fn solve(args: SolveArgs) -> Result<()> {
    args.validate()?;
    let loaded = read_edge_list_file(&args.input)
        .with_context(|| format!("loading graph {}", args.input.display()))?;
    let graph = &loaded.graph;
    info!(
        input = %args.input.display(),
        n = graph.n(),
        m = graph.m(),
        radius = args.radius,
        k = ?args.k,
        strategy = ?args.strategy.map(StrategyArg::name),
        front = args.front,
        anytime = args.anytime,
        seed = args.seed,
        "solve"
    );
    let bounds = GraphBounds::of(graph, args.radius);
    let lower_bound = bounds.best();
    info!(
        degeneracy = bounds.degeneracy,
        contraction = bounds.contraction,
        contraction_exact = bounds.contraction_exact,
        "lower bounds"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let report = if args.anytime {
        let start = Instant::now();
        let cfg = AnytimeCfg {
            time_limit: Some(Duration::from_secs(args.time_limit)),
            max_c: None,
            lower_bound,
        };
        let progress = improve(graph, args.radius, cfg, |k, c| args.attempt(graph, k, c, &mut rng))?;
        SolveReport::from_progress(&progress, &loaded.labels, lower_bound, start.elapsed())
    } else {
        let run = args.attempt(graph, args.k, args.c.unwrap_or(LastC::default().c), &mut rng);
        SolveReport::new(&run, &loaded.labels, lower_bound)
    };

    match (&report.cost, &report.ordering) {
        (Some(cost), Some(ordering)) => {
            println!("cost: {cost}");
            println!("ordering: {}", ordering.join(" "));
        }
        _ => println!("stuck: {} of {} vertices placed", report.placed, graph.n()),
    }
    println!("lower_bound: {}", report.lower_bound);
    println!("optimal: {}", report.optimal);
    println!("repairs: {}", report.repairs);
    println!("time_ms: {}", report.elapsed_ms);

    if let Some(out) = &args.out {
        write_result(out, &args, &report)?;
    }
    ensure!(
        report.solved,
        "no ordering with reach sizes at most {} found",
        args.k.unwrap_or(usize::MAX)
    );
    Ok(())
}

fn write_result(out: &Path, args: &SolveArgs, report: &SolveReport) -> Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating output dir {}", parent.display()))?;
        }
    }
    fs::write(out, serde_json::to_vec_pretty(report)?)
        .with_context(|| format!("writing {}", out.display()))?;
    let sidecar = provenance::write_sidecar(out, Payload::new("solve", serde_json::to_value(args)?))?;
    info!(result = %out.display(), provenance = %sidecar.display(), "wrote result");
    Ok(())
}
