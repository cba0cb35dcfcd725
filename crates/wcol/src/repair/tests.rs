use super::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ordering::{weak_coloring_number, EngineCfg, Prepend};

fn cfg(radius: usize, k: usize) -> EngineCfg {
    EngineCfg {
        radius,
        k,
        ..EngineCfg::default()
    }
}

/// Path `0-1-2` at radius 2 with `k = 2` after placing `0, 2`: vertex 1 is
/// reached by both and overflows. Only orders starting with 1 are feasible.
fn overflowing_path(g: &Graph) -> Ordering<'_> {
    let mut ord: Ordering = Ordering::new(g, cfg(2, 2));
    ord.place(0);
    ord.place(2);
    assert_eq!(ord.too_full(), &BTreeSet::from([1]));
    ord
}

fn finish<P: Policy>(ord: &mut Ordering<'_, P>) {
    let rest: Vec<usize> = ord.free_vertices().collect();
    for v in rest {
        ord.place(v);
    }
    ord.assert_consistent();
    assert!(ord.is_complete(), "ordering {:?}", ord.current_ordering());
}

#[test]
fn branching_by_distance_starts_at_the_problem() {
    let g = Graph::path(5);
    let mut set = BranchingSet::new(BranchingRule::ByDistance, &g, Some(2), 0..5);
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(set.candidates(&mut rng), vec![2, 1, 3, 0, 4]);
    set.remove(1);
    assert!(!set.contains(1));
    assert_eq!(set.candidates(&mut rng), vec![2, 3, 0, 4]);
    set.insert(1);
    assert_eq!(set.len(), 5);

    let plain = BranchingSet::new(BranchingRule::ByDistance, &g, None, [4, 0, 3]);
    assert_eq!(plain.candidates(&mut rng), vec![0, 3, 4]);
}

#[test]
fn branching_shuffle_keeps_membership() {
    let g = Graph::path(6);
    let mut set = BranchingSet::new(BranchingRule::Random, &g, None, 0..6);
    let mut rng = StdRng::seed_from_u64(5);
    let mut seen = set.candidates(&mut rng);
    seen.sort_unstable();
    assert_eq!(seen, (0..6).collect::<Vec<_>>());
    for v in 0..6 {
        set.remove(v);
    }
    assert!(set.is_empty());
    assert!(set.candidates(&mut rng).is_empty());
}

#[test]
fn last_c_reorders_the_tail() {
    let g = Graph::path(3);
    let mut ord = overflowing_path(&g);
    let mut rng = StdRng::seed_from_u64(0);
    let mut strategy = LastC {
        c: 2,
        ..LastC::default()
    };
    assert!(strategy.repair(&mut ord, &mut rng));
    // distance order tries 2 first, then backtracks to lead with 1
    assert_eq!(ord.current_ordering(), vec![1, 2]);
    finish(&mut ord);
}

#[test]
fn last_c_only_reorder_keeps_the_removed_vertices() {
    let g = Graph::path(3);
    let mut ord = overflowing_path(&g);
    let mut rng = StdRng::seed_from_u64(0);
    let mut strategy = LastC {
        c: 2,
        only_reorder: true,
        rule: BranchingRule::Random,
    };
    // 1 was never placed, so no permutation of {0, 2} helps
    let before = ord.snapshot();
    assert!(!strategy.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);
}

#[test]
fn last_c_repairs_the_front_engine() {
    let g = Graph::star(3);
    let mut ord = Ordering::<Prepend>::new(&g, cfg(1, 2));
    ord.place(1);
    ord.place(0);
    assert!(!ord.is_extendable());
    let mut rng = StdRng::seed_from_u64(2);
    assert!(LastC::default().repair(&mut ord, &mut rng));
    assert!(ord.is_extendable());
    ord.assert_consistent();
}

#[test]
fn gap_fill_refills_both_pools() {
    for pool in [Pool::RadiusNeighbourhood, Pool::ReachUnion] {
        for seed in 0..4 {
            let g = Graph::path(3);
            let mut ord = overflowing_path(&g);
            let mut rng = StdRng::seed_from_u64(seed);
            let mut strategy = GapFill {
                pool,
                ..GapFill::default()
            };
            assert!(strategy.repair(&mut ord, &mut rng), "{pool:?} seed {seed}");
            assert_eq!(ord.slots()[0], Some(1));
            finish(&mut ord);
        }
    }
}

#[test]
fn swap_neighbours_moves_the_overflow_left() {
    let g = Graph::path(3);
    let mut ord = overflowing_path(&g);
    let mut rng = StdRng::seed_from_u64(0);
    assert!(SwapNeighbours::default().repair(&mut ord, &mut rng));
    assert_eq!(ord.current_ordering(), vec![1, 0]);
    finish(&mut ord);
}

#[test]
fn local_search_finds_a_feasible_prefix() {
    for seed in 0..4 {
        let g = Graph::path(3);
        let mut ord = overflowing_path(&g);
        let mut rng = StdRng::seed_from_u64(seed);
        assert!(SwapLocalSearch::default().repair(&mut ord, &mut rng), "seed {seed}");
        ord.assert_consistent();
        finish(&mut ord);
    }
}

#[test]
fn merge_reinserts_at_breakpoints() {
    for seed in 0..4 {
        let g = Graph::path(3);
        let mut ord = overflowing_path(&g);
        let mut rng = StdRng::seed_from_u64(seed);
        assert!(Merge::default().repair(&mut ord, &mut rng), "seed {seed}");
        // merge pulled 1 in as well and left no holes behind
        assert_eq!(ord.placed_count(), 3);
        assert_eq!(ord.slots().len(), 3);
        assert_eq!(ord.slots()[0], Some(1));
        finish(&mut ord);
    }
}

#[test]
fn merge_builds_an_ordering_from_nothing() {
    let g = Graph::path(5);
    for seed in 0..4 {
        let mut ord: Ordering = Ordering::new(&g, cfg(1, 2));
        let mut rng = StdRng::seed_from_u64(seed);
        let mut stats = SearchStats::default();
        assert!(Merge::default().solve(&mut ord, &mut rng, &mut stats), "seed {seed}");
        ord.assert_consistent();
        assert!(ord.is_complete());
        let order = ord.current_ordering();
        assert_eq!(ord.slots().len(), 5);
        assert_eq!(weak_coloring_number(&g, 1, &order), Some(ord.max_reach_size()));
        assert!(ord.max_reach_size() <= 2);
        assert!(stats.nodes >= 6);
        assert!(stats.leaves >= 1);
    }
}

#[test]
fn merge_from_nothing_also_takes_placed_vertices() {
    let g = Graph::star(3);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, 2));
    ord.place(1);
    ord.place(2);
    let mut rng = StdRng::seed_from_u64(1);
    assert!(Merge::default().solve(&mut ord, &mut rng, &mut SearchStats::default()));
    assert!(ord.is_complete());
    ord.assert_consistent();
}

#[test]
fn merge_from_nothing_fails_cleanly_on_a_triangle() {
    let g = Graph::complete(3);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, 2));
    let fresh = ord.snapshot();
    let mut rng = StdRng::seed_from_u64(0);
    let mut stats = SearchStats::default();
    let merge = Merge {
        attempts: 2,
        ..Merge::default()
    };
    assert!(!merge.solve(&mut ord, &mut rng, &mut stats));
    assert_eq!(ord.snapshot(), fresh);
    // every attempt dead-ends once the third vertex goes in
    assert!(stats.leaves >= 2);
}

#[test]
fn search_stats_count_the_last_c_tree() {
    let g = Graph::path(3);
    let mut ord = overflowing_path(&g);
    let mut rng = StdRng::seed_from_u64(0);
    let mut stats = SearchStats::default();
    let mut strategy = LastC {
        c: 2,
        ..LastC::default()
    };
    assert!(strategy.search(&mut ord, &mut rng, &mut stats));
    assert!(stats.nodes >= 3);
    assert!(stats.leaves >= 1);
    assert!(stats.mean_leaf_depth() <= 2.0);
}

#[test]
fn strategy_dispatch_and_names() {
    let strategies = [
        (Strategy::LastC(LastC::default()), "last-c"),
        (Strategy::GapFill(GapFill::default()), "radius-neighbourhood"),
        (
            Strategy::GapFill(GapFill {
                pool: Pool::ReachUnion,
                ..GapFill::default()
            }),
            "reach-union",
        ),
        (Strategy::SwapNeighbours(SwapNeighbours::default()), "swap-neighbours"),
        (Strategy::SwapLocalSearch(SwapLocalSearch::default()), "swap-local-search"),
        (Strategy::Merge(Merge::default()), "merge"),
    ];
    for (mut strategy, name) in strategies {
        assert_eq!(strategy.name(), name);
        let g = Graph::path(3);
        let mut ord = overflowing_path(&g);
        let mut rng = StdRng::seed_from_u64(9);
        assert!(strategy.repair(&mut ord, &mut rng), "{name}");
        finish(&mut ord);
    }
}
