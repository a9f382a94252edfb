//! End-to-end solver scenarios.

use std::collections::BTreeSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::models::{scale_to_user_cost, Eval, JobType};
use crate::solver::local_search::operator::{LsCtx, Operator};
use crate::solver::local_search::two_opt::TwoOpt;
use crate::solver::local_search::LocalSearch;
use crate::solver::route::Route;
use crate::solver::state::SolutionState;
use crate::solver::testing::*;
use crate::solver::tw_route::TwRoute;
use crate::solver::{solve, SolveOptions};
use crate::utils::route_eval_for_vehicle;

fn single_threaded() -> SolveOptions {
    SolveOptions {
        nb_searches: 4,
        depth: 2,
        nb_threads: 1,
        timeout: None,
    }
}

#[test]
fn two_jobs_one_vehicle_metric_matrix() {
    let input = two_singles_input();
    let solution = solve(&input, &single_threaded()).unwrap();

    assert!(solution.unassigned.is_empty());
    let route = &solution.routes[0];
    assert!(route == &vec![0, 1] || route == &vec![1, 0]);
    assert_eq!(scale_to_user_cost(solution.indicators.eval.cost), 45);
}

#[test]
fn pickup_delivery_with_tight_capacity() {
    // Capacity [1]: the shipment interval cannot hold the single job.
    let input = {
        let matrix = depot_matrix_3();
        let single = JobSpec {
            delivery: vec![1],
            ..JobSpec::single(1, 1)
        }
        .build(1);
        let pickup = JobSpec {
            id: 2,
            job_type: JobType::Pickup,
            pickup: vec![1],
            ..JobSpec::single(2, 1)
        }
        .build(1);
        let delivery = JobSpec {
            id: 2,
            job_type: JobType::Delivery,
            location: 2,
            delivery: vec![1],
            ..JobSpec::single(2, 2)
        }
        .build(1);
        build_input(
            vec![single, pickup, delivery],
            vec![VehicleSpec::depot(1, vec![1]).build(matrix)],
            1,
        )
    };

    let solution = solve(&input, &single_threaded()).unwrap();
    assert!(solution.unassigned.is_empty());

    let route = &solution.routes[0];
    let p = route.iter().position(|&j| j == 1).unwrap();
    let d = route.iter().position(|&j| j == 2).unwrap();
    let s = route.iter().position(|&j| j == 0).unwrap();
    assert_eq!(d, p + 1);
    assert!(s < p || d < s);
}

#[test]
fn skill_filtering_routes_jobs_to_matching_vehicles() {
    let input = skills_input();
    let solution = solve(&input, &single_threaded()).unwrap();

    assert!(solution.unassigned.is_empty());
    assert_eq!(solution.routes[0], vec![0]);
    assert_eq!(solution.routes[1], vec![1]);
}

#[test]
fn time_window_infeasibility_leaves_job_unassigned() {
    let input = tw_infeasible_input();
    let solution = solve(&input, &single_threaded()).unwrap();

    assert!(solution.routes[0].is_empty());
    assert_eq!(solution.unassigned.len(), 1);
}

#[test]
fn break_max_load_never_sits_inside_the_shipment() {
    let input = break_max_load_input();
    let solution = solve(&input, &single_threaded()).unwrap();

    assert!(solution.unassigned.is_empty());
    let jobs = &solution.routes[0];

    let mut tw = TwRoute::new(&input, 0);
    tw.set_route(&input, jobs.clone());

    let p = jobs.iter().position(|&j| j == 1).unwrap();
    let d = jobs.iter().position(|&j| j == 2).unwrap();

    // With 5 units on board between pickup and delivery, the 3-unit break
    // cap forbids any break in that window.
    for slot in (p + 1)..=d {
        assert_eq!(
            tw.breaks_at_rank[slot], 0,
            "break scheduled inside the overloaded stretch"
        );
    }
}

#[test]
fn two_opt_finds_and_applies_the_tail_swap() {
    let input = cross_routes_input();
    let mut routes = vec![TwRoute::new(&input, 0), TwRoute::new(&input, 1)];
    routes[0].set_route(&input, vec![0, 1]);
    routes[1].set_route(&input, vec![2, 3]);

    let mut state = SolutionState::new(&input);
    state.setup(&input, &routes);

    let mut op = TwoOpt::new(0, 0, 1, 0);
    let (upper, gain, valid) = {
        let ctx = LsCtx {
            input: &input,
            state: &state,
            routes: &routes,
        };
        (
            <TwoOpt as Operator<TwRoute>>::gain_upper_bound(&mut op, &ctx),
            <TwoOpt as Operator<TwRoute>>::gain(&mut op, &ctx),
            <TwoOpt as Operator<TwRoute>>::is_valid(&mut op, &ctx),
        )
    };

    assert!(valid);
    assert!(gain > Eval::default());
    assert!(gain <= upper);

    let before = route_eval_for_vehicle(&input, 0, routes[0].jobs())
        + route_eval_for_vehicle(&input, 1, routes[1].jobs());
    op.apply(&input, &mut routes);
    let after = route_eval_for_vehicle(&input, 0, routes[0].jobs())
        + route_eval_for_vehicle(&input, 1, routes[1].jobs());

    // Applying then recomputing from scratch reproduces the announced gain.
    assert_eq!(before - after, gain);
    assert_eq!(routes[0].jobs(), &[0, 3]);
    assert_eq!(routes[1].jobs(), &[2, 1]);
}

#[test]
fn local_search_driver_reaches_the_crossed_optimum() {
    let input = cross_routes_input();
    let mut routes = vec![TwRoute::new(&input, 0), TwRoute::new(&input, 1)];
    routes[0].set_route(&input, vec![0, 1]);
    routes[1].set_route(&input, vec![2, 3]);

    let ls = LocalSearch::new(
        &input,
        routes,
        BTreeSet::new(),
        0,
        None,
        ChaCha8Rng::seed_from_u64(0),
    );
    let (final_routes, _, indicators, log) = ls.run();

    assert_eq!(scale_to_user_cost(indicators.eval.cost), 50);
    assert!(!log.is_empty());
    let total: usize = final_routes.iter().map(|r| r.size()).sum();
    assert_eq!(total, 4);
}

#[test]
fn single_thread_runs_are_reproducible() {
    let input = small_pd_input();
    let a = solve(&input, &single_threaded()).unwrap();
    let b = solve(&input, &single_threaded()).unwrap();

    assert_eq!(a.routes, b.routes);
    assert_eq!(a.unassigned, b.unassigned);
    assert_eq!(a.indicators, b.indicators);
}

#[test]
fn every_route_mutation_keeps_capacity_invariants() {
    let input = small_pd_input();
    let solution = solve(&input, &single_threaded()).unwrap();

    for (v, jobs) in solution.routes.iter().enumerate() {
        let mut tw = TwRoute::new(&input, v);
        tw.set_route(&input, jobs.clone());

        for s in 0..=jobs.len() + 1 {
            assert!(tw.raw.load_at_step(s) <= &input.vehicles[v].capacity);
        }
        for i in 0..jobs.len() {
            assert!(tw.earliest[i] <= tw.latest[i]);
        }
        // Every pickup has its delivery later in the same route.
        for (i, &j) in jobs.iter().enumerate() {
            if input.jobs[j].job_type == JobType::Pickup {
                let d = jobs.iter().position(|&other| other == j + 1);
                assert!(matches!(d, Some(rank) if i < rank));
            }
        }
    }
}

/// Two vehicles and a matrix shaped so swapping tails strictly improves:
/// A pairs with D, C pairs with B.
pub fn cross_routes_input() -> crate::models::Input {
    let matrix = symmetric_matrix(vec![
        vec![0, 10, 10, 10, 10],
        vec![10, 0, 100, 50, 5],
        vec![10, 100, 0, 5, 50],
        vec![10, 50, 5, 0, 100],
        vec![10, 5, 50, 100, 0],
    ]);

    let jobs = (0..4)
        .map(|i| {
            JobSpec {
                delivery: vec![1],
                ..JobSpec::single(i as u64 + 1, i + 1)
            }
            .build(1)
        })
        .collect();

    let vehicles = vec![
        VehicleSpec::depot(1, vec![10]).build(matrix.clone()),
        VehicleSpec::depot(2, vec![10]).build(matrix),
    ];

    build_input(jobs, vehicles, 1)
}
