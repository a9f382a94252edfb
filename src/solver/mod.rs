pub mod heuristics;
pub mod indicators;
pub mod local_search;
pub mod raw_route;
pub mod route;
pub mod sequence;
pub mod state;
#[cfg(test)]
pub mod testing;
#[cfg(test)]
mod tests;
pub mod tsp;
pub mod tw_route;

use std::collections::{BTreeSet, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, span, Level};

use crate::config;
use crate::error::{Error, Result};
use crate::models::Input;

use self::heuristics::{Heuristic, HeuristicParameters, Init, Sort};
use self::indicators::SolutionIndicators;
use self::local_search::{LocalSearch, SearchLogEntry};
use self::raw_route::RawRoute;
use self::route::Route;
use self::tw_route::TwRoute;

/// Solver-internal result, later formatted into the output document.
pub struct InternalSolution {
    pub routes: Vec<Vec<usize>>,
    pub unassigned: BTreeSet<usize>,
    pub indicators: SolutionIndicators,
    pub search_log: Vec<(usize, SearchLogEntry)>,
}

#[derive(Clone, Copy)]
pub struct SolveOptions {
    pub nb_searches: usize,
    pub depth: usize,
    pub nb_threads: usize,
    pub timeout: Option<Duration>,
}

impl Default for SolveOptions {
    fn default() -> Self {
        SolveOptions {
            nb_searches: config::NB_SEARCHES,
            depth: config::DEPTH,
            nb_threads: config::NB_THREADS,
            timeout: None,
        }
    }
}

const LAMBDA_TABLE: [f64; 32] = [
    0.3, 0.4, 0.2, 0.3, 0.4, 0.5, 0.4, 0.5, 0.1, 0.6, 0.2, 0.7, 0.2, 0.7, 1.4, 0.1, 0.0, 0.1,
    0.3, 0.8, 0.5, 0.8, 2.4, 1.2, 1.0, 1.3, 0.0, 0.3, 2.0, 0.0, 0.9, 1.0,
];

const INIT_TABLE: [Init; 32] = [
    Init::HigherAmount,
    Init::HigherAmount,
    Init::EarliestDeadline,
    Init::Furthest,
    Init::None,
    Init::HigherAmount,
    Init::Furthest,
    Init::Furthest,
    Init::HigherAmount,
    Init::HigherAmount,
    Init::Furthest,
    Init::Furthest,
    Init::HigherAmount,
    Init::HigherAmount,
    Init::HigherAmount,
    Init::Furthest,
    Init::None,
    Init::None,
    Init::None,
    Init::None,
    Init::EarliestDeadline,
    Init::EarliestDeadline,
    Init::EarliestDeadline,
    Init::Furthest,
    Init::None,
    Init::HigherAmount,
    Init::EarliestDeadline,
    Init::EarliestDeadline,
    Init::EarliestDeadline,
    Init::Furthest,
    Init::Furthest,
    Init::Furthest,
];

fn parameter_table(heuristic: Heuristic) -> Vec<HeuristicParameters> {
    INIT_TABLE
        .iter()
        .zip(LAMBDA_TABLE.iter())
        .map(|(&init, &lambda)| HeuristicParameters::new(heuristic, init, lambda))
        .collect()
}

/// Multi-start orchestrator: run up to `nb_searches` parameter sets on a
/// bounded pool, deduplicate heuristic outcomes by indicator equality and
/// keep the overall best by indicator order.
pub fn solve(input: &Input, options: &SolveOptions) -> Result<InternalSolution> {
    if input.has_tw_constraints() {
        run_solve::<TwRoute>(input, options)
    } else {
        run_solve::<RawRoute>(input, options)
    }
}

fn run_solve<R: Route + Send + Sync>(
    input: &Input,
    options: &SolveOptions,
) -> Result<InternalSolution> {
    let solve_span = span!(Level::INFO, "solve");
    let _guard = solve_span.enter();

    // Initial routes: empty per vehicle, or the user-supplied plan.
    let mut init_assigned: HashSet<usize> = HashSet::new();
    let mut init_sol: Vec<R> = (0..input.vehicles.len())
        .map(|v| R::new(input, v))
        .collect();
    if input.has_initial_routes() {
        heuristics::set_initial_routes(input, &mut init_sol, &mut init_assigned)?;
    }

    let unassigned: BTreeSet<usize> = (0..input.jobs.len())
        .filter(|j| !init_assigned.contains(j))
        .collect();
    let vehicles_ranks: Vec<usize> = (0..input.vehicles.len()).collect();

    let heuristic = if input.has_homogeneous_locations() {
        Heuristic::Basic
    } else {
        Heuristic::Dynamic
    };
    let parameters = parameter_table(heuristic);
    let nb_searches = options.nb_searches.clamp(1, parameters.len());
    let nb_threads = options.nb_threads.clamp(1, nb_searches);

    // Per-candidate budget: total timeout split by solves per thread.
    let search_time = options.timeout.map(|timeout| {
        let rounds = nb_searches.div_ceil(nb_threads) as u32;
        timeout / rounds
    });

    info!(
        nb_searches,
        nb_threads,
        depth = options.depth,
        ?search_time,
        "starting multi-start search"
    );

    let heuristic_indicators: Mutex<BTreeSet<SolutionIndicators>> = Mutex::new(BTreeSet::new());
    let first_failure: Mutex<Option<String>> = Mutex::new(None);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nb_threads)
        .build()
        .map_err(|e| Error::Internal(format!("thread pool setup failed: {e}")))?;

    let results: Vec<Option<SearchOutcome>> = pool.install(|| {
        (0..nb_searches)
            .into_par_iter()
            .map(|rank| {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    run_single_search(
                        input,
                        &parameters[rank],
                        rank,
                        options.depth,
                        search_time,
                        &init_sol,
                        &unassigned,
                        &vehicles_ranks,
                        &heuristic_indicators,
                    )
                }));
                match outcome {
                    Ok(result) => Some(result),
                    Err(payload) => {
                        let message = payload
                            .downcast_ref::<&str>()
                            .map(|s| s.to_string())
                            .or_else(|| payload.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "search worker panicked".to_string());
                        let mut slot = first_failure.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(message);
                        }
                        None
                    }
                }
            })
            .collect()
    });

    if let Some(message) = first_failure.into_inner().unwrap() {
        return Err(Error::Internal(message));
    }

    let best = results
        .into_iter()
        .flatten()
        .min_by(|a, b| a.indicators.cmp(&b.indicators))
        .ok_or_else(|| Error::Internal("no search produced a solution".to_string()))?;

    info!(
        cost = best.indicators.eval.cost,
        assigned = best.indicators.assigned,
        unassigned = best.unassigned.len(),
        "search done"
    );

    Ok(InternalSolution {
        routes: best.routes,
        unassigned: best.unassigned,
        indicators: best.indicators,
        search_log: best.search_log,
    })
}

struct SearchOutcome {
    routes: Vec<Vec<usize>>,
    unassigned: BTreeSet<usize>,
    indicators: SolutionIndicators,
    search_log: Vec<(usize, SearchLogEntry)>,
}

#[allow(clippy::too_many_arguments)]
fn run_single_search<R: Route>(
    input: &Input,
    params: &HeuristicParameters,
    rank: usize,
    depth: usize,
    search_time: Option<Duration>,
    init_sol: &[R],
    unassigned: &BTreeSet<usize>,
    vehicles_ranks: &[usize],
    heuristic_indicators: &Mutex<BTreeSet<SolutionIndicators>>,
) -> SearchOutcome {
    let search_span = span!(Level::DEBUG, "search", rank);
    let _guard = search_span.enter();

    let heuristic_start = Instant::now();

    let mut routes: Vec<R> = init_sol.to_vec();
    let h_eval = run_heuristic(
        input,
        &mut routes,
        unassigned.clone(),
        vehicles_ranks.to_vec(),
        params,
        params.sort,
    );

    if (!input.has_homogeneous_costs() || !input.has_homogeneous_profiles())
        && params.sort == Sort::Availability
    {
        // A cost-ordered pass is worth a try on heterogeneous fleets.
        let mut other_routes: Vec<R> = init_sol.to_vec();
        let other_eval = run_heuristic(
            input,
            &mut other_routes,
            unassigned.clone(),
            vehicles_ranks.to_vec(),
            params,
            Sort::Cost,
        );
        if other_eval < h_eval {
            routes = other_routes;
        }
    }

    let indicators = SolutionIndicators::new(input, &routes);

    let duplicate = {
        let mut seen = heuristic_indicators.lock().unwrap();
        !seen.insert(indicators)
    };

    let remaining_unassigned: BTreeSet<usize> = collect_unassigned(input, &routes);

    if duplicate {
        // Same heuristic outcome as another candidate: skip local search.
        debug!(rank, "duplicate heuristic solution");
        return SearchOutcome {
            routes: routes.iter().map(|r| r.jobs().to_vec()).collect(),
            unassigned: remaining_unassigned,
            indicators,
            search_log: Vec::new(),
        };
    }

    let deadline = search_time.and_then(|budget| {
        let heuristic_time = heuristic_start.elapsed();
        (heuristic_time < budget).then(|| Instant::now() + (budget - heuristic_time))
    });
    if search_time.is_some() && deadline.is_none() {
        // The heuristic ate the whole budget.
        return SearchOutcome {
            routes: routes.iter().map(|r| r.jobs().to_vec()).collect(),
            unassigned: remaining_unassigned,
            indicators,
            search_log: Vec::new(),
        };
    }

    let rng = ChaCha8Rng::seed_from_u64(config::SEED.wrapping_add(rank as u64));
    let ls = LocalSearch::new(input, routes, remaining_unassigned, depth, deadline, rng);
    let (final_routes, final_unassigned, final_indicators, log) = ls.run();

    SearchOutcome {
        routes: final_routes.iter().map(|r| r.jobs().to_vec()).collect(),
        unassigned: final_unassigned,
        indicators: final_indicators,
        search_log: log.into_iter().map(|entry| (rank, entry)).collect(),
    }
}

fn run_heuristic<R: Route>(
    input: &Input,
    routes: &mut [R],
    unassigned: BTreeSet<usize>,
    vehicles_ranks: Vec<usize>,
    params: &HeuristicParameters,
    sort: Sort,
) -> crate::models::Eval {
    match params.heuristic {
        Heuristic::Basic => heuristics::basic(
            input,
            routes,
            unassigned,
            vehicles_ranks,
            params.init,
            params.regret_coeff,
            sort,
        ),
        Heuristic::Dynamic => heuristics::dynamic_vehicle_choice(
            input,
            routes,
            unassigned,
            vehicles_ranks,
            params.init,
            params.regret_coeff,
            sort,
        ),
    }
}

fn collect_unassigned<R: Route>(input: &Input, routes: &[R]) -> BTreeSet<usize> {
    let assigned: HashSet<usize> = routes
        .iter()
        .flat_map(|r| r.jobs().iter().copied())
        .collect();
    (0..input.jobs.len())
        .filter(|j| !assigned.contains(j))
        .collect()
}
