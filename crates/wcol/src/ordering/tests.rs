use super::*;
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::greedy;
use crate::lower_bound::GraphBounds;
use crate::repair::{GapFill, LastC, Merge, Repair, SwapLocalSearch, SwapNeighbours};

fn cfg(radius: usize, k: usize) -> EngineCfg {
    EngineCfg {
        radius,
        k,
        ..EngineCfg::default()
    }
}

fn set(vs: &[usize]) -> BTreeSet<usize> {
    vs.iter().copied().collect()
}

// ----- path ------------------------------------------------------------------

#[test]
fn engine_free_cost_of_a_path() {
    let g = Graph::path(5);
    assert_eq!(weak_coloring_number(&g, 1, &[0, 1, 2, 3, 4]), Some(2));
    // the middle vertex comes last and is reached from both sides
    assert_eq!(weak_coloring_number(&g, 1, &[0, 4, 1, 3, 2]), Some(3));
    assert_eq!(weak_coloring_number(&g, 4, &[2, 0, 1, 3, 4]), Some(3));
    assert_eq!(weak_coloring_number(&g, 1, &[0, 1, 2, 3]), None);
    assert_eq!(weak_coloring_number(&g, 1, &[0, 1, 2, 3, 3]), None);
    assert_eq!(weak_coloring_number(&g, 1, &[0, 1, 2, 3, 7]), None);
}

#[test]
fn path_placed_in_order_reaches_one_step() {
    let g = Graph::path(5);
    let mut ord = Ordering::<Prepend>::new(&g, cfg(1, usize::MAX));
    for v in 0..5 {
        ord.place(v);
        ord.assert_consistent();
    }
    assert_eq!(ord.reach(0), &set(&[0, 1]));
    assert_eq!(ord.reach(1), &set(&[1, 2]));
    assert_eq!(ord.reach(2), &set(&[2, 3]));
    assert_eq!(ord.reach(3), &set(&[3, 4]));
    assert_eq!(ord.reach(4), &set(&[4]));
    assert_eq!(ord.max_reach_size(), 2);
    assert_eq!(ord.current_ordering(), vec![4, 3, 2, 1, 0]);
}

#[test]
fn path_append_mirrors_prepend() {
    let g = Graph::path(5);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, usize::MAX));
    for v in 0..5 {
        ord.place(v);
    }
    ord.assert_consistent();
    assert_eq!(ord.reach(0), &set(&[0]));
    assert_eq!(ord.reach(1), &set(&[0, 1]));
    assert_eq!(ord.reach(4), &set(&[3, 4]));
    assert_eq!(ord.reach_inv(2), &set(&[2, 3]));
    assert_eq!(ord.max_reach_size(), 2);
}

#[test]
fn prepend_counts_pending_neighbours_as_potential() {
    let g = Graph::path(5);
    let mut ord = Ordering::<Prepend>::new(&g, cfg(1, usize::MAX));
    ord.place(0);
    assert_eq!(ord.potential(0), &set(&[1]));
    assert_eq!(ord.reach_size(0), 2);
    ord.place(1);
    assert!(ord.potential(0).is_empty());
    assert_eq!(ord.potential(1), &set(&[2]));
    ord.assert_consistent();
}

#[test]
fn radius_two_sees_through_later_vertices() {
    let g = Graph::path(4);
    let mut ord: Ordering = Ordering::new(&g, cfg(2, usize::MAX));
    // order 1, 3, 0, 2: 1 reaches 3 through 2, which comes later
    for v in [1, 3, 0, 2] {
        ord.place(v);
    }
    ord.assert_consistent();
    assert_eq!(ord.reach_inv(1), &set(&[0, 1, 2, 3]));
    assert_eq!(ord.reach_inv(3), &set(&[2, 3]));
    assert_eq!(ord.reach_inv(0), &set(&[0]));
    assert_eq!(ord.reach(2), &set(&[1, 2, 3]));
}

// ----- star ------------------------------------------------------------------

#[test]
fn star_leaf_first_is_extendable() {
    let g = Graph::star(4);
    for leaf in 1..=4 {
        let mut ord = Ordering::<Prepend>::new(&g, cfg(1, 2));
        ord.place(leaf);
        assert!(ord.is_extendable());
    }
}

#[test]
fn star_centre_first_overflows_and_last_c_puts_it_last() {
    let g = Graph::star(4);
    let mut ord = Ordering::<Prepend>::new(&g, cfg(1, 2));
    ord.place(0);
    assert_eq!(ord.too_full(), &set(&[0]));
    assert_eq!(ord.reach_size(0), 5);

    let mut rng = StdRng::seed_from_u64(7);
    let mut strategy = LastC {
        c: 5,
        ..LastC::default()
    };
    assert!(strategy.repair(&mut ord, &mut rng));
    assert!(ord.is_extendable());
    ord.assert_consistent();

    let run = greedy::by_degree(&mut ord, Some(&mut strategy), &mut rng);
    assert!(run.is_solved(), "{:?}", run.outcome);
    assert!(ord.is_complete());
    // placed last means leftmost for the front engine
    assert_eq!(ord.current_ordering()[0], 0);
    assert_eq!(ord.max_reach_size(), 2);
}

#[test]
fn star_append_centre_after_one_leaf() {
    let g = Graph::star(4);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, 2));
    ord.place(1);
    ord.place(0);
    // the centre reaches each unplaced leaf, and the first leaf reaches the centre
    assert!(ord.is_extendable());
    ord.place(2);
    ord.place(3);
    assert_eq!(ord.reach(0), &set(&[0, 1]));
    assert_eq!(ord.reach_size(4), 2);
    ord.assert_consistent();
}

// ----- triangle --------------------------------------------------------------

fn triangle_after_first_placement(g: &Graph) -> Ordering<'_> {
    let mut ord: Ordering = Ordering::new(g, cfg(2, 1));
    ord.place(0);
    assert!(!ord.is_extendable());
    ord
}

#[test]
fn triangle_is_infeasible_by_degeneracy() {
    let g = Graph::complete(3);
    let ord: Ordering = Ordering::new(&g, cfg(2, 1));
    assert!(ord.degeneracy_lower_bound() >= 2);
    let front = Ordering::<Prepend>::new(&g, cfg(2, 1));
    assert!(front.degeneracy_lower_bound() >= 2);
}

#[test]
fn triangle_failed_repairs_restore_the_engine() {
    let g = Graph::complete(3);
    let mut rng = StdRng::seed_from_u64(11);

    let mut ord = triangle_after_first_placement(&g);
    let before = ord.snapshot();
    let mut last_c = LastC {
        c: 3,
        ..LastC::default()
    };
    assert!(!last_c.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);

    let mut gap = GapFill {
        c: 3,
        attempts: 3,
        ..GapFill::default()
    };
    assert!(!gap.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);

    let mut swaps = SwapNeighbours { max_depth: 6 };
    assert!(!swaps.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);

    let mut local = SwapLocalSearch {
        max_steps: 200,
        ..SwapLocalSearch::default()
    };
    assert!(!local.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);

    let mut merge = Merge { c: 3, attempts: 3 };
    assert!(!merge.repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);
    ord.assert_consistent();
}

#[test]
fn triangle_front_last_c_fails_cleanly() {
    let g = Graph::complete(3);
    let mut ord = Ordering::<Prepend>::new(&g, cfg(2, 1));
    ord.place(0);
    assert!(!ord.is_extendable());
    let before = ord.snapshot();
    let mut rng = StdRng::seed_from_u64(1);
    assert!(!LastC::default().repair(&mut ord, &mut rng));
    assert_eq!(ord.snapshot(), before);
}

// ----- guards, look-ahead, bounds -------------------------------------------

#[test]
fn trial_unplaces_unless_committed() {
    let g = Graph::cycle(5);
    let mut ord: Ordering = Ordering::new(&g, cfg(2, usize::MAX));
    let before = ord.snapshot();
    {
        let trial = ord.trial_place(3);
        assert!(trial.is_placed(3));
    }
    assert_eq!(ord.snapshot(), before);
    ord.trial_place(3).commit();
    assert_eq!(ord.position(3), Some(0));
}

#[test]
fn edit_reverts_hole_fill_on_drop() {
    let g = Graph::path(4);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, usize::MAX));
    for v in 0..4 {
        ord.place(v);
    }
    let v = ord.unplace_at(1);
    let before = ord.snapshot();
    {
        let edit = ord.edit_place_at(v, 1);
        assert_eq!(edit.position(v), Some(1));
    }
    assert_eq!(ord.snapshot(), before);
}

#[test]
fn look_ahead_flags_pairs_that_cannot_both_stay() {
    let g = Graph::from_edges(4, [(0, 2), (1, 3), (2, 3)]);
    let mut ord: Ordering = Ordering::new(
        &g,
        EngineCfg {
            look_ahead: true,
            ..cfg(1, 2)
        },
    );
    ord.place(0);
    assert!(ord.is_extendable());
    ord.place(1);
    assert!(ord.too_full().is_empty());
    assert_eq!(ord.full_neighbours(), &set(&[2, 3]));
    assert!(!ord.is_extendable());
    ord.unplace();
    assert!(ord.full_neighbours().is_empty());
    assert!(ord.is_extendable());
}

#[test]
fn lower_bound_mode_rejects_hopeless_starts() {
    let g = Graph::complete(3);
    let tight = EngineCfg {
        lower_bound: true,
        ..cfg(2, 1)
    };
    let ord: Ordering = Ordering::new(&g, tight);
    assert!(!ord.is_extendable());
    let front = Ordering::<Prepend>::new(&g, tight);
    assert!(!front.is_extendable());
    front.assert_consistent();

    let loose: Ordering = Ordering::new(
        &g,
        EngineCfg {
            lower_bound: true,
            ..cfg(2, 3)
        },
    );
    assert!(loose.is_extendable());
}

#[test]
fn ignoring_unplaced_overflow_only_counts_placed() {
    let g = Graph::star(4);
    let mut ord: Ordering = Ordering::new(
        &g,
        EngineCfg {
            ignore_unplaced_overflow: true,
            ..cfg(1, 1)
        },
    );
    ord.place(0);
    assert_eq!(ord.reach_size(1), 2);
    assert!(ord.is_extendable());
    ord.place(1);
    assert_eq!(ord.too_full(), &set(&[1]));
}

#[test]
#[should_panic(expected = "not free")]
fn placing_twice_panics() {
    let g = Graph::path(3);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, 2));
    ord.place(1);
    ord.place(1);
}

#[test]
#[should_panic(expected = "look-ahead")]
fn front_engine_rejects_look_ahead() {
    let g = Graph::path(3);
    let _ = Ordering::<Prepend>::new(
        &g,
        EngineCfg {
            look_ahead: true,
            ..cfg(1, 2)
        },
    );
}

#[test]
fn parked_vertices_block_paths() {
    let g = Graph::path(3);
    let mut ord: Ordering = Ordering::new(&g, cfg(2, usize::MAX));
    ord.place(0);
    assert_eq!(ord.reach_inv(0), &set(&[0, 1, 2]));
    ord.park(1);
    assert_eq!(ord.status(1), Status::Parked);
    assert_eq!(ord.reach_inv(0), &set(&[0]));
    assert!(!ord.active().contains(1));
    ord.assert_consistent();
}

#[test]
fn component_focus_follows_the_last_placement() {
    let g = Graph::from_edges(6, [(0, 1), (1, 2), (3, 4), (4, 5)]);
    let mut ord: Ordering = Ordering::new(&g, cfg(1, usize::MAX));
    ord.place(4);
    assert_eq!(ord.focus_component(), set(&[3]));
    ord.place(3);
    // no free neighbour left: any free vertex seeds the component
    assert_eq!(ord.focus_component(), set(&[0, 1, 2]));
}

// ----- properties ------------------------------------------------------------

/// Small random graph, a placement order over all its vertices, a radius.
fn instance() -> impl Strategy<Value = (Graph, Vec<usize>, usize)> {
    (2usize..9).prop_flat_map(|n| {
        (
            prop::collection::vec((0..n, 0..n), 0..2 * n),
            Just((0..n).collect::<Vec<usize>>()).prop_shuffle(),
            1usize..4,
        )
            .prop_map(move |(edges, order, r)| (Graph::from_edges(n, edges), order, r))
    })
}

proptest! {
    #[test]
    fn append_stays_consistent((g, order, r) in instance(), sorted in any::<bool>()) {
        let mut ord: Ordering = Ordering::new(&g, EngineCfg { sorted_adjacency: sorted, ..cfg(r, usize::MAX) });
        for &v in &order {
            ord.place(v);
            ord.assert_consistent();
        }
        prop_assert_eq!(ord.current_ordering(), order.clone());
        prop_assert_eq!(weak_coloring_number(&g, r, &order), Some(ord.max_reach_size()));
    }

    #[test]
    fn prepend_stays_consistent((g, order, r) in instance(), lower_bound in any::<bool>()) {
        let mut ord = Ordering::<Prepend>::new(&g, EngineCfg { lower_bound, ..cfg(r, usize::MAX) });
        let fresh = ord.snapshot();
        for &v in &order {
            ord.place(v);
            ord.assert_consistent();
        }
        while ord.placed_count() > 0 {
            ord.unplace();
            ord.assert_consistent();
        }
        prop_assert_eq!(ord.snapshot(), fresh);
    }

    #[test]
    fn unplace_inverts_place((g, order, r) in instance(), cut in any::<prop::sample::Index>()) {
        let prefix = cut.index(order.len());
        let mut ord: Ordering = Ordering::new(&g, cfg(r, 3));
        for &v in &order[..prefix] {
            ord.place(v);
        }
        let before = ord.snapshot();
        ord.place(order[prefix]);
        prop_assert_eq!(ord.unplace(), order[prefix]);
        prop_assert_eq!(ord.snapshot(), before);
    }

    #[test]
    fn swap_round_trip((g, order, r) in instance(), i in any::<prop::sample::Index>(), j in any::<prop::sample::Index>()) {
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order {
            ord.place(v);
        }
        let (a, b) = (i.index(order.len()), j.index(order.len()));
        prop_assume!(a != b);
        let (pl, pr) = (a.min(b), a.max(b));
        let (left, right) = (order[pl], order[pr]);
        let before = ord.snapshot();
        ord.swap(left, right);
        ord.assert_consistent();
        prop_assert_eq!(ord.position(left), Some(pr));
        ord.swap(right, left);
        prop_assert_eq!(ord.snapshot(), before);
    }

    #[test]
    fn swap_with_free_vertex((g, order, r) in instance(), cut in any::<prop::sample::Index>(), i in any::<prop::sample::Index>()) {
        let prefix = cut.index(order.len());
        prop_assume!(prefix > 0);
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order[..prefix] {
            ord.place(v);
        }
        let a = order[i.index(prefix)];
        let b = order[prefix];
        let pos = ord.position(a);
        ord.swap(a, b);
        ord.assert_consistent();
        prop_assert!(ord.is_free(a));
        prop_assert_eq!(ord.position(b), pos);
    }

    #[test]
    fn hole_round_trip((g, order, r) in instance(), i in any::<prop::sample::Index>()) {
        let last = order.len() - 1;
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order[..last] {
            ord.place(v);
        }
        let pos = i.index(last);
        let before = ord.snapshot();
        let v = ord.unplace_at(pos);
        ord.assert_consistent();
        // the vertex that was never placed borrows the hole for a moment
        ord.place_at(order[last], pos);
        ord.assert_consistent();
        ord.unplace_at(pos);
        ord.place_at(v, pos);
        prop_assert_eq!(ord.snapshot(), before);
    }

    #[test]
    fn park_round_trip((g, order, r) in instance(), i in any::<prop::sample::Index>(), park_free in any::<bool>()) {
        let last = order.len() - 1;
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order[..last] {
            ord.place(v);
        }
        if park_free {
            let v = order[last];
            ord.park(v);
            ord.assert_consistent();
            ord.spread(1);
            ord.assert_consistent();
            let hole = ord.last_hole_in(0, ord.slots().len()).unwrap();
            ord.place_at(v, hole);
            ord.assert_consistent();
            prop_assert_eq!(ord.current_ordering(), order);
        } else {
            let pos = i.index(last);
            let before = ord.snapshot();
            ord.park(order[pos]);
            ord.assert_consistent();
            ord.place_at(order[pos], pos);
            prop_assert_eq!(ord.snapshot(), before);
        }
    }

    #[test]
    fn spread_and_compact_keep_reach((g, order, r) in instance(), gap in 1usize..4) {
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order {
            ord.place(v);
        }
        let before = ord.snapshot();
        ord.spread(gap);
        ord.assert_consistent();
        let spread = ord.snapshot();
        prop_assert_eq!(&spread.reach, &before.reach);
        prop_assert_eq!(&spread.reach_inv, &before.reach_inv);
        prop_assert_eq!(ord.current_ordering(), order);
        ord.compact();
        prop_assert_eq!(ord.snapshot(), before);
    }

    #[test]
    fn reset_to_matches_incremental_history((g, order, r) in instance(), i in any::<prop::sample::Index>()) {
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        for &v in &order {
            ord.place(v);
        }
        ord.unplace_at(i.index(order.len()));
        let slots = ord.slots().to_vec();
        let before = ord.snapshot();
        ord.reset_to(&slots);
        ord.assert_consistent();
        prop_assert_eq!(ord.snapshot(), before);
    }

    #[test]
    fn threshold_is_monotone((g, order, r) in instance(), k in 1usize..6, extra in 0usize..4, cut in any::<prop::sample::Index>(), lower_bound in any::<bool>()) {
        let prefix = cut.index(order.len() + 1);
        let mut tight: Ordering = Ordering::new(&g, EngineCfg { lower_bound, ..cfg(r, k) });
        let mut loose: Ordering = Ordering::new(&g, EngineCfg { lower_bound, ..cfg(r, k + extra) });
        for &v in &order[..prefix] {
            tight.place(v);
            loose.place(v);
        }
        if tight.is_extendable() {
            prop_assert!(loose.is_extendable());
        }
    }

    #[test]
    fn lower_bounds_are_sound((g, _order, r) in instance(), seed in any::<u64>()) {
        let mut ord: Ordering = Ordering::new(&g, cfg(r, usize::MAX));
        let degeneracy = ord.degeneracy_lower_bound();
        let contraction = ord.contraction_lower_bound();
        let exact = ord.contraction_lower_bound_exact();
        prop_assert!(degeneracy <= contraction);
        prop_assert!(degeneracy <= exact);

        let mut rng = StdRng::seed_from_u64(seed);
        let run = greedy::by_reach(&mut ord, None::<&mut LastC>, &mut rng);
        let greedy::Outcome::Solved { cost, .. } = run.outcome else {
            return Err(TestCaseError::fail("unbounded run must finish"));
        };
        prop_assert!(contraction <= cost);
        prop_assert!(exact <= cost);

        let whole = GraphBounds::of(&g, r);
        prop_assert_eq!(whole.degeneracy, degeneracy);
        prop_assert_eq!(whole.contraction, contraction);
        prop_assert_eq!(whole.contraction_exact, exact);
        prop_assert!(whole.best() <= cost);
    }

    #[test]
    fn sorted_adjacency_changes_nothing((g, order, r) in instance(), i in any::<prop::sample::Index>()) {
        let mut plain: Ordering = Ordering::new(&g, cfg(r, 3));
        let mut sorted: Ordering = Ordering::new(&g, EngineCfg { sorted_adjacency: true, ..cfg(r, 3) });
        for &v in &order {
            plain.place(v);
            sorted.place(v);
        }
        let pos = i.index(order.len());
        plain.unplace_at(pos);
        sorted.unplace_at(pos);
        prop_assert_eq!(plain.snapshot(), sorted.snapshot());
        let (a, b) = (order[0], order[order.len() - 1]);
        if plain.is_placed(a) && plain.is_placed(b) && a != b {
            plain.swap(a, b);
            sorted.swap(a, b);
            prop_assert_eq!(plain.snapshot(), sorted.snapshot());
        }
    }
}
