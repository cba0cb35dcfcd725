//! Greedy drivers that build a full ordering online.
//!
//! A driver keeps a priority queue over the unplaced vertices, places the
//! best one, re-keys only what the engine reports as changed, and hands the
//! engine to a repair strategy whenever the ordering stops being extendable.
//!
//! Three selection rules exist. [`by_reach`] and [`by_degree`] key vertices
//! on the driven engine itself. [`by_potential`] keys them on a shadow
//! right-to-left engine that always tracks potential reach, kept in step with
//! the driven engine after every placement and every repair.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::ordering::{Append, EngineCfg, Ordering, Policy, Prepend};
use crate::repair::{Repair, SearchStats};

/// Vertex selection rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rule {
    /// Largest reach first, then largest degree, then smallest id.
    MaxReach,
    /// Smallest degree first, then largest id.
    MinDegree,
    /// Fewest potential reachers first, then smallest degree, then smallest
    /// id. Only meaningful on an engine that tracks potential reach for
    /// unplaced vertices.
    MinPotential,
}

type Key = (i64, i64, i64);

impl Rule {
    fn key<P: Policy>(self, ord: &Ordering<'_, P>, v: usize) -> Key {
        let deg = ord.graph().degree(v) as i64;
        let id = v as i64;
        match self {
            Rule::MaxReach => (-(ord.reach_size(v) as i64), -deg, id),
            Rule::MinDegree => (deg, -id, 0),
            Rule::MinPotential => (ord.potential(v).len() as i64, deg, id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Solved { ordering: Vec<usize>, cost: usize },
    /// A repair failed with `placed` of the vertices in the ordering; `at` is
    /// the engine's slot cursor at that moment.
    Stuck { at: usize, placed: usize, repairs: usize },
}

/// One repair call as seen by the driver.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RepairRecord {
    pub ok: bool,
    /// Vertices placed when the repair was called.
    pub placed: usize,
    pub n: usize,
    pub search: SearchStats,
    pub elapsed: Duration,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunStats {
    pub repairs: usize,
    pub repair_time: Duration,
    pub elapsed: Duration,
    /// Sum over every repair call.
    pub search: SearchStats,
    pub log: Vec<RepairRecord>,
}

#[derive(Clone, Debug)]
pub struct Run {
    pub outcome: Outcome,
    pub stats: RunStats,
}

impl Run {
    pub fn is_solved(&self) -> bool {
        matches!(self.outcome, Outcome::Solved { .. })
    }

    pub fn cost(&self) -> Option<usize> {
        match self.outcome {
            Outcome::Solved { cost, .. } => Some(cost),
            Outcome::Stuck { .. } => None,
        }
    }
}

/// Source of the next vertex to place.
pub trait Picker<P: Policy> {
    /// Catch up with everything the engine changed since the last call.
    fn refresh(&mut self, ord: &mut Ordering<'_, P>);
    fn next(&self, ord: &Ordering<'_, P>) -> Option<usize>;
}

/// Priority queue over unplaced vertices with their current keys.
struct Queue {
    rule: Rule,
    order: BTreeSet<(Key, usize)>,
    key: Vec<Option<Key>>,
}

impl Queue {
    fn new<P: Policy>(rule: Rule, ord: &Ordering<'_, P>) -> Self {
        let mut q = Self {
            rule,
            order: BTreeSet::new(),
            key: vec![None; ord.n()],
        };
        for v in 0..ord.n() {
            q.rekey(ord, v);
        }
        q
    }

    fn rekey<P: Policy>(&mut self, ord: &Ordering<'_, P>, v: usize) {
        if let Some(old) = self.key[v].take() {
            self.order.remove(&(old, v));
        }
        if ord.is_free(v) {
            let key = self.rule.key(ord, v);
            self.order.insert((key, v));
            self.key[v] = Some(key);
        }
    }

    fn drain_changed<P: Policy>(&mut self, ord: &mut Ordering<'_, P>) {
        for v in ord.take_changed() {
            self.rekey(ord, v);
        }
    }

    fn best<P: Policy>(&self, ord: &Ordering<'_, P>) -> Option<usize> {
        if ord.cfg().restrict_to_component {
            let component = ord.focus_component();
            if let Some(&(_, v)) = self.order.iter().find(|(_, v)| component.contains(v)) {
                return Some(v);
            }
        }
        self.order.first().map(|&(_, v)| v)
    }
}

impl<P: Policy> Picker<P> for Queue {
    fn refresh(&mut self, ord: &mut Ordering<'_, P>) {
        self.drain_changed(ord);
    }

    fn next(&self, ord: &Ordering<'_, P>) -> Option<usize> {
        self.best(ord)
    }
}

/// Keys vertices by potential-reach size on a shadow right-to-left engine
/// with potential tracking and no threshold.
pub struct PotentialQueue<'g> {
    shadow: Ordering<'g, Prepend>,
    queue: Queue,
}

impl<'g> PotentialQueue<'g> {
    pub fn new(ord: &Ordering<'g, Prepend>) -> Self {
        let cfg = EngineCfg {
            radius: ord.radius(),
            lower_bound: true,
            restrict_to_component: ord.cfg().restrict_to_component,
            ..EngineCfg::default()
        };
        let mut shadow = Ordering::new(ord.graph(), cfg);
        let mut queue = Queue::new(Rule::MinPotential, &shadow);
        sync(&mut shadow, ord);
        queue.drain_changed(&mut shadow);
        Self { shadow, queue }
    }

    pub fn shadow(&self) -> &Ordering<'g, Prepend> {
        &self.shadow
    }
}

impl Picker<Prepend> for PotentialQueue<'_> {
    fn refresh(&mut self, ord: &mut Ordering<'_, Prepend>) {
        ord.take_changed();
        sync(&mut self.shadow, ord);
        self.queue.drain_changed(&mut self.shadow);
    }

    fn next(&self, _ord: &Ordering<'_, Prepend>) -> Option<usize> {
        self.queue.best(&self.shadow)
    }
}

/// Make `shadow` hold the same placements as `ord`: unplace down to the
/// longest common suffix, then replay the rest.
fn sync(shadow: &mut Ordering<'_, Prepend>, ord: &Ordering<'_, Prepend>) {
    let diverged = {
        let (mine, theirs) = (shadow.slots(), ord.slots());
        (0..mine.len()).rev().find(|&i| mine[i] != theirs[i])
    };
    if let Some(i) = diverged {
        while shadow.at() <= i {
            shadow.unplace();
        }
    }
    while shadow.at() > ord.at() {
        let Some(v) = ord.slots()[shadow.at() - 1] else {
            break;
        };
        shadow.place(v);
    }
}

/// Build an ordering with `rule`, calling `repair` whenever the ordering
/// stops being extendable. Without a repair strategy the run is stuck at the
/// first violation.
pub fn run<P, S, R>(ord: &mut Ordering<'_, P>, rule: Rule, repair: Option<&mut S>, rng: &mut R) -> Run
where
    P: Policy,
    S: Repair<P>,
    R: Rng + ?Sized,
{
    let mut queue = Queue::new(rule, ord);
    ord.take_changed();
    drive(ord, &mut queue, repair, rng)
}

/// The driver loop over any [`Picker`].
pub fn drive<P, Q, S, R>(
    ord: &mut Ordering<'_, P>,
    picker: &mut Q,
    mut repair: Option<&mut S>,
    rng: &mut R,
) -> Run
where
    P: Policy,
    Q: Picker<P>,
    S: Repair<P>,
    R: Rng + ?Sized,
{
    let start = Instant::now();
    let mut stats = RunStats::default();

    let outcome = loop {
        if ord.placed_count() == ord.n() && ord.is_extendable() {
            break Outcome::Solved {
                ordering: ord.current_ordering(),
                cost: ord.max_reach_size(),
            };
        }
        if ord.is_extendable() {
            let Some(v) = picker.next(ord) else {
                break stuck(ord, &stats);
            };
            ord.place(v);
            picker.refresh(ord);
            if ord.is_extendable() {
                continue;
            }
        }

        let Some(strategy) = repair.as_deref_mut() else {
            break stuck(ord, &stats);
        };
        stats.repairs += 1;
        let placed = ord.placed_count();
        let mut search = SearchStats::default();
        let t = Instant::now();
        let ok = strategy.search(ord, rng, &mut search);
        let elapsed = t.elapsed();
        stats.repair_time += elapsed;
        stats.search += search;
        stats.log.push(RepairRecord {
            ok,
            placed,
            n: ord.n(),
            search,
            elapsed,
        });
        debug!(
            repair = stats.repairs,
            ok,
            placed = ord.placed_count(),
            nodes = search.nodes,
            leaves = search.leaves,
            "repair call"
        );
        picker.refresh(ord);
        if !ok || !ord.is_extendable() {
            break stuck(ord, &stats);
        }
    };

    stats.elapsed = start.elapsed();
    info!(
        solved = matches!(outcome, Outcome::Solved { .. }),
        repairs = stats.repairs,
        nodes = stats.search.nodes,
        elapsed_ms = stats.elapsed.as_millis() as u64,
        "greedy run finished"
    );
    Run { outcome, stats }
}

fn stuck<P: Policy>(ord: &Ordering<'_, P>, stats: &RunStats) -> Outcome {
    Outcome::Stuck {
        at: ord.at(),
        placed: ord.placed_count(),
        repairs: stats.repairs,
    }
}

/// Left-to-right greedy by largest reach.
pub fn by_reach<S, R>(ord: &mut Ordering<'_, Append>, repair: Option<&mut S>, rng: &mut R) -> Run
where
    S: Repair<Append>,
    R: Rng + ?Sized,
{
    run(ord, Rule::MaxReach, repair, rng)
}

/// Right-to-left greedy by smallest degree.
pub fn by_degree<S, R>(ord: &mut Ordering<'_, Prepend>, repair: Option<&mut S>, rng: &mut R) -> Run
where
    S: Repair<Prepend>,
    R: Rng + ?Sized,
{
    run(ord, Rule::MinDegree, repair, rng)
}

/// Right-to-left greedy by fewest potential reachers.
pub fn by_potential<S, R>(ord: &mut Ordering<'_, Prepend>, repair: Option<&mut S>, rng: &mut R) -> Run
where
    S: Repair<Prepend>,
    R: Rng + ?Sized,
{
    let mut queue = PotentialQueue::new(ord);
    ord.take_changed();
    drive(ord, &mut queue, repair, rng)
}
