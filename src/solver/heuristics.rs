use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::error::{Error, Result};
use crate::models::{Cost, Duration, Eval, Input, JobType, StepType};
use crate::utils::{
    addition_cost, in_place_pd_addition_cost, max_edge_eval, route_eval_for_vehicle,
};

use super::route::Route;

/// Seeding strategy for empty routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Init {
    None,
    HigherAmount,
    EarliestDeadline,
    Furthest,
    Nearest,
}

/// Vehicle ordering applied before filling routes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    Availability,
    Cost,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Heuristic {
    Basic,
    Dynamic,
}

#[derive(Clone, Copy, Debug)]
pub struct HeuristicParameters {
    pub heuristic: Heuristic,
    pub init: Init,
    pub regret_coeff: f64,
    pub sort: Sort,
}

impl HeuristicParameters {
    pub const fn new(heuristic: Heuristic, init: Init, regret_coeff: f64) -> Self {
        HeuristicParameters {
            heuristic,
            init,
            regret_coeff,
            sort: Sort::Availability,
        }
    }
}

/// Add a seed job to an empty route when the init strategy asks for one.
fn seed_route<R: Route>(
    input: &Input,
    route: &mut R,
    init: Init,
    evals: &[Vec<Eval>],
    unassigned: &mut BTreeSet<usize>,
    job_not_ok: impl Fn(usize) -> bool,
) {
    debug_assert!(route.empty() && init != Init::None);

    let v_rank = route.v_rank();
    let vehicle = &input.vehicles[v_rank];

    let mut init_ok = false;
    let mut higher_amount = input.zero_amount().clone();
    let mut furthest_cost: Cost = 0;
    let mut nearest_cost: Cost = Cost::MAX;
    let mut earliest_deadline: Duration = Duration::MAX;
    let mut best_job_rank = 0;

    for &job_rank in unassigned.iter() {
        let current_job = &input.jobs[job_rank];

        if !input.vehicle_ok_with_job(v_rank, job_rank)
            || current_job.job_type == JobType::Delivery
            || job_not_ok(job_rank)
        {
            continue;
        }

        let is_pickup = current_job.job_type == JobType::Pickup;

        if route.size() + (if is_pickup { 2 } else { 1 }) > vehicle.max_tasks {
            continue;
        }

        let try_validity = match init {
            Init::None => false,
            Init::HigherAmount => {
                higher_amount.lex_lt(&current_job.pickup)
                    || higher_amount.lex_lt(&current_job.delivery)
            }
            Init::EarliestDeadline => {
                let current_deadline = if is_pickup {
                    input.jobs[job_rank + 1].tws.last().unwrap().end
                } else {
                    current_job.tws.last().unwrap().end
                };
                current_deadline < earliest_deadline
            }
            Init::Furthest => furthest_cost < evals[job_rank][v_rank].cost,
            Init::Nearest => evals[job_rank][v_rank].cost < nearest_cost,
        };

        if !try_validity {
            continue;
        }

        let mut is_valid = vehicle.ok_for_range_bounds(&evals[job_rank][v_rank])
            && route.raw().is_valid_addition_for_capacity(
                &current_job.pickup,
                &current_job.delivery,
                0,
            );
        if is_pickup {
            let p_d = [job_rank, job_rank + 1];
            is_valid = is_valid
                && route.is_valid_seq_addition_for_tw(
                    input,
                    input.zero_amount(),
                    &p_d[..],
                    0,
                    0,
                    true,
                );
        } else {
            debug_assert!(current_job.job_type == JobType::Single);
            is_valid = is_valid && route.is_valid_addition_for_tw(input, job_rank, 0);
        }

        if is_valid {
            init_ok = true;
            best_job_rank = job_rank;

            match init {
                Init::None => unreachable!(),
                Init::HigherAmount => {
                    if higher_amount.lex_lt(&current_job.pickup) {
                        higher_amount = current_job.pickup.clone();
                    }
                    if higher_amount.lex_lt(&current_job.delivery) {
                        higher_amount = current_job.delivery.clone();
                    }
                }
                Init::EarliestDeadline => {
                    earliest_deadline = if is_pickup {
                        input.jobs[job_rank + 1].tws.last().unwrap().end
                    } else {
                        current_job.tws.last().unwrap().end
                    };
                }
                Init::Furthest => furthest_cost = evals[job_rank][v_rank].cost,
                Init::Nearest => nearest_cost = evals[job_rank][v_rank].cost,
            }
        }
    }

    if init_ok {
        match input.jobs[best_job_rank].job_type {
            JobType::Single => {
                route.add(input, best_job_rank, 0);
                unassigned.remove(&best_job_rank);
            }
            JobType::Pickup => {
                let p_d = [best_job_rank, best_job_rank + 1];
                route.replace(input, input.zero_amount(), &p_d[..], 0, 0);
                unassigned.remove(&best_job_rank);
                unassigned.remove(&(best_job_rank + 1));
            }
            JobType::Delivery => unreachable!(),
        }
        trace!(v_rank, seed = input.jobs[best_job_rank].id, "seeded route");
    }
}

/// Lower bounds on insertion costs, used to prune candidates inside
/// `fill_route` without scanning every position.
struct UnassignedCosts {
    max_edge_cost: Cost,
    min_route_to_unassigned: Vec<Cost>,
    min_unassigned_to_route: Vec<Cost>,
}

impl UnassignedCosts {
    fn new<R: Route>(input: &Input, route: &R, unassigned: &BTreeSet<usize>) -> Self {
        let vehicle = &input.vehicles[route.v_rank()];
        let mut costs = UnassignedCosts {
            max_edge_cost: max_edge_eval(input, vehicle, route.jobs()).cost,
            min_route_to_unassigned: vec![Cost::MAX; input.jobs.len()],
            min_unassigned_to_route: vec![Cost::MAX; input.jobs.len()],
        };

        for &job_rank in unassigned {
            let unassigned_index = input.jobs[job_rank].index();

            if let Some(start) = &vehicle.start {
                costs.min_route_to_unassigned[job_rank] =
                    vehicle.eval(start.index(), unassigned_index).cost;
            }
            if let Some(end) = &vehicle.end {
                costs.min_unassigned_to_route[job_rank] =
                    vehicle.eval(unassigned_index, end.index()).cost;
            }

            for &j in route.jobs() {
                let job_index = input.jobs[j].index();

                let to_unassigned = vehicle.eval(job_index, unassigned_index).cost;
                costs.min_route_to_unassigned[job_rank] =
                    costs.min_route_to_unassigned[job_rank].min(to_unassigned);

                let from_unassigned = vehicle.eval(unassigned_index, job_index).cost;
                costs.min_unassigned_to_route[job_rank] =
                    costs.min_unassigned_to_route[job_rank].min(from_unassigned);
            }
        }

        costs
    }

    fn insertion_lower_bound(&self, j: usize) -> f64 {
        (self.min_route_to_unassigned[j] + self.min_unassigned_to_route[j] - self.max_edge_cost)
            as f64
    }

    fn pd_insertion_lower_bound(&self, input: &Input, vehicle_rank: usize, p: usize) -> f64 {
        debug_assert!(input.jobs[p].job_type == JobType::Pickup);
        let vehicle = &input.vehicles[vehicle_rank];

        // Pickup and delivery inserted apart.
        let apart_insertion = (self.min_route_to_unassigned[p]
            + self.min_unassigned_to_route[p]
            + self.min_route_to_unassigned[p + 1]
            + self.min_unassigned_to_route[p + 1]
            - 2 * self.max_edge_cost) as f64;

        // Delivery inserted right after the pickup.
        let next_insertion = (self.min_route_to_unassigned[p]
            + self.min_unassigned_to_route[p + 1]
            + vehicle
                .eval(input.jobs[p].index(), input.jobs[p + 1].index())
                .cost
            - self.max_edge_cost) as f64;

        apart_insertion.min(next_insertion)
    }

    fn update_max_edge<R: Route>(&mut self, input: &Input, route: &R) {
        let vehicle = &input.vehicles[route.v_rank()];
        self.max_edge_cost = max_edge_eval(input, vehicle, route.jobs()).cost;
    }

    fn update_min_costs(
        &mut self,
        input: &Input,
        vehicle_rank: usize,
        unassigned: &BTreeSet<usize>,
        inserted_index: usize,
    ) {
        let vehicle = &input.vehicles[vehicle_rank];
        for &j in unassigned {
            let unassigned_index = input.jobs[j].index();

            let to_unassigned = vehicle.eval(inserted_index, unassigned_index).cost;
            self.min_route_to_unassigned[j] = self.min_route_to_unassigned[j].min(to_unassigned);

            let from_unassigned = vehicle.eval(unassigned_index, inserted_index).cost;
            self.min_unassigned_to_route[j] =
                self.min_unassigned_to_route[j].min(from_unassigned);
        }
    }
}

/// Greedy insertion loop for one vehicle, Solomon-I1 style with a regret
/// term. Never fails: what cannot be inserted stays unassigned.
fn fill_route<R: Route>(
    input: &Input,
    route: &mut R,
    unassigned: &mut BTreeSet<usize>,
    regrets: &[Cost],
    lambda: f64,
) -> Eval {
    let v_rank = route.v_rank();
    let vehicle = &input.vehicles[v_rank];

    let init_route_is_empty = route.empty();
    let mut route_eval = route_eval_for_vehicle(input, v_rank, route.jobs());

    let mut unassigned_costs = UnassignedCosts::new(input, route, unassigned);

    let mut keep_going = true;
    while keep_going {
        keep_going = false;
        let mut best_cost = f64::MAX;
        let mut best_job_rank = 0;
        let mut best_r = 0;
        let mut best_pickup_r = 0;
        let mut best_delivery_r = 0;
        let mut best_modified_delivery = input.zero_amount().clone();
        let mut best_eval = Eval::default();

        for &job_rank in unassigned.iter() {
            if !input.vehicle_ok_with_job(v_rank, job_rank) {
                continue;
            }

            let current_job = &input.jobs[job_rank];

            if current_job.job_type == JobType::Delivery {
                continue;
            }

            let regret_term = lambda * regrets[job_rank] as f64;

            if current_job.job_type == JobType::Single
                && route.size() + 1 <= vehicle.max_tasks
            {
                if best_cost < unassigned_costs.insertion_lower_bound(job_rank) - regret_term {
                    // No position can beat the current best.
                    continue;
                }

                for r in 0..=route.size() {
                    let current_eval =
                        addition_cost(input, job_rank, vehicle, route.jobs(), r);
                    let current_cost = current_eval.cost as f64 - regret_term;

                    if current_cost < best_cost
                        && vehicle.ok_for_range_bounds(&(route_eval + current_eval))
                        && route.raw().is_valid_addition_for_capacity(
                            &current_job.pickup,
                            &current_job.delivery,
                            r,
                        )
                        && route.is_valid_addition_for_tw(input, job_rank, r)
                    {
                        best_cost = current_cost;
                        best_job_rank = job_rank;
                        best_r = r;
                        best_eval = current_eval;
                    }
                }
            }

            if current_job.job_type == JobType::Pickup
                && route.size() + 2 <= vehicle.max_tasks
            {
                if best_cost
                    < unassigned_costs.pd_insertion_lower_bound(input, v_rank, job_rank)
                        - regret_term
                {
                    continue;
                }

                // Pre-compute delivery insertion data for every rank.
                let mut d_adds = Vec::with_capacity(route.size() + 1);
                let mut valid_delivery_insertions = Vec::with_capacity(route.size() + 1);
                for d_rank in 0..=route.size() {
                    d_adds.push(addition_cost(
                        input,
                        job_rank + 1,
                        vehicle,
                        route.jobs(),
                        d_rank,
                    ));
                    valid_delivery_insertions.push(
                        route.is_valid_addition_for_tw_without_max_load(
                            input,
                            job_rank + 1,
                            d_rank,
                        ),
                    );
                }

                for pickup_r in 0..=route.size() {
                    let p_add = addition_cost(input, job_rank, vehicle, route.jobs(), pickup_r);

                    if !route
                        .raw()
                        .is_valid_addition_for_load(&current_job.pickup, pickup_r)
                        || !route.is_valid_addition_for_tw_without_max_load(
                            input,
                            job_rank,
                            pickup_r,
                        )
                    {
                        continue;
                    }

                    // Replacement sequence for the current insertion.
                    let mut modified_with_pd = Vec::with_capacity(route.size() - pickup_r + 2);
                    modified_with_pd.push(job_rank);

                    let mut modified_delivery = input.zero_amount().clone();

                    for delivery_r in pickup_r..=route.size() {
                        if pickup_r < delivery_r {
                            let modified_job = route.jobs()[delivery_r - 1];
                            modified_with_pd.push(modified_job);
                            if input.jobs[modified_job].job_type == JobType::Single {
                                modified_delivery += &input.jobs[modified_job].delivery;
                            }
                        }

                        if !valid_delivery_insertions[delivery_r] {
                            continue;
                        }

                        let current_eval = if pickup_r == delivery_r {
                            in_place_pd_addition_cost(
                                input,
                                job_rank,
                                vehicle,
                                route.jobs(),
                                pickup_r,
                            )
                        } else {
                            p_add + d_adds[delivery_r]
                        };

                        let current_cost = current_eval.cost as f64 - regret_term;

                        if current_cost < best_cost {
                            modified_with_pd.push(job_rank + 1);

                            let valid = vehicle
                                .ok_for_range_bounds(&(route_eval + current_eval))
                                && route.raw().is_valid_addition_for_capacity_inclusion(
                                    input,
                                    &modified_delivery,
                                    &modified_with_pd[..],
                                    pickup_r,
                                    delivery_r,
                                )
                                && route.is_valid_seq_addition_for_tw(
                                    input,
                                    &modified_delivery,
                                    &modified_with_pd[..],
                                    pickup_r,
                                    delivery_r,
                                    true,
                                );

                            modified_with_pd.pop();

                            if valid {
                                best_cost = current_cost;
                                best_job_rank = job_rank;
                                best_pickup_r = pickup_r;
                                best_delivery_r = delivery_r;
                                best_modified_delivery = modified_delivery.clone();
                                best_eval = current_eval;
                            }
                        }
                    }
                }
            }
        }

        if best_cost < f64::MAX {
            let best_job_type = input.jobs[best_job_rank].job_type;
            match best_job_type {
                JobType::Single => {
                    route.add(input, best_job_rank, best_r);
                    unassigned.remove(&best_job_rank);
                    keep_going = true;

                    unassigned_costs.update_max_edge(input, route);
                    unassigned_costs.update_min_costs(
                        input,
                        v_rank,
                        unassigned,
                        input.jobs[best_job_rank].index(),
                    );
                }
                JobType::Pickup => {
                    let mut modified_with_pd =
                        Vec::with_capacity(best_delivery_r - best_pickup_r + 2);
                    modified_with_pd.push(best_job_rank);
                    modified_with_pd
                        .extend_from_slice(&route.jobs()[best_pickup_r..best_delivery_r]);
                    modified_with_pd.push(best_job_rank + 1);

                    route.replace(
                        input,
                        &best_modified_delivery,
                        &modified_with_pd[..],
                        best_pickup_r,
                        best_delivery_r,
                    );
                    unassigned.remove(&best_job_rank);
                    unassigned.remove(&(best_job_rank + 1));
                    keep_going = true;

                    unassigned_costs.update_max_edge(input, route);
                    unassigned_costs.update_min_costs(
                        input,
                        v_rank,
                        unassigned,
                        input.jobs[best_job_rank].index(),
                    );
                    unassigned_costs.update_min_costs(
                        input,
                        v_rank,
                        unassigned,
                        input.jobs[best_job_rank + 1].index(),
                    );
                }
                JobType::Delivery => unreachable!(),
            }

            route_eval += best_eval;
        }
    }

    if init_route_is_empty && !route.empty() {
        // Fixed cost is charged exactly once, when a previously-empty route
        // gets its first task.
        route_eval.cost += vehicle.fixed_cost();
    }

    route_eval
}

fn sort_vehicles(input: &Input, vehicles_ranks: &mut [usize], sort: Sort) {
    match sort {
        Sort::Availability => {
            vehicles_ranks.sort_by(|&lhs, &rhs| {
                input.vehicles[lhs].cmp_availability(&input.vehicles[rhs])
            });
        }
        Sort::Cost => {
            vehicles_ranks
                .sort_by(|&lhs, &rhs| input.vehicles[lhs].cmp_cost(&input.vehicles[rhs]));
        }
    }
}

/// Solomon-I1 variant with a fixed vehicle order.
pub fn basic<R: Route>(
    input: &Input,
    routes: &mut [R],
    mut unassigned: BTreeSet<usize>,
    mut vehicles_ranks: Vec<usize>,
    init: Init,
    lambda: f64,
    sort: Sort,
) -> Eval {
    let nb_vehicles = vehicles_ranks.len();
    sort_vehicles(input, &mut vehicles_ranks, sort);

    let evals = input.jobs_vehicles_evals();

    // regrets[v][j]: min cost of serving j in an empty route across
    // vehicles strictly after v in the order.
    let mut regrets = vec![vec![0 as Cost; input.jobs.len()]; nb_vehicles];

    // Use own cost for the last vehicle.
    for &j in &unassigned {
        regrets[nb_vehicles - 1][j] = evals[j][vehicles_ranks[nb_vehicles - 1]].cost;
    }

    for rev_v in 0..nb_vehicles.saturating_sub(1) {
        let v = nb_vehicles - 2 - rev_v;

        let mut all_compatible_jobs_later_undoable = true;
        for &j in &unassigned {
            regrets[v][j] = regrets[v + 1][j].min(evals[j][vehicles_ranks[v + 1]].cost);
            if input.vehicle_ok_with_job(vehicles_ranks[v], j)
                && regrets[v][j] < input.get_cost_upper_bound()
            {
                all_compatible_jobs_later_undoable = false;
            }
        }

        if all_compatible_jobs_later_undoable {
            // All-sentinel regrets would make lambda meaningless, so fall
            // back to own costs like for the last vehicle.
            for &j in &unassigned {
                regrets[v][j] = evals[j][vehicles_ranks[v]].cost;
            }
        }
    }

    let mut sol_eval = Eval::default();

    for v in 0..nb_vehicles {
        if unassigned.is_empty() {
            break;
        }
        let v_rank = vehicles_ranks[v];

        if routes[v_rank].empty() && init != Init::None {
            seed_route(
                input,
                &mut routes[v_rank],
                init,
                evals,
                &mut unassigned,
                |_| false,
            );
        }

        sol_eval += fill_route(input, &mut routes[v_rank], &mut unassigned, &regrets[v], lambda);
    }

    sol_eval
}

/// Variant that picks the next vehicle dynamically: the one closest to the
/// most unassigned jobs among the remaining fleet.
pub fn dynamic_vehicle_choice<R: Route>(
    input: &Input,
    routes: &mut [R],
    mut unassigned: BTreeSet<usize>,
    mut vehicles_ranks: Vec<usize>,
    init: Init,
    lambda: f64,
    sort: Sort,
) -> Eval {
    let evals = input.jobs_vehicles_evals();
    let mut sol_eval = Eval::default();

    while !vehicles_ranks.is_empty() && !unassigned.is_empty() {
        // Min and second-min empty-route cost per job across remaining
        // vehicles.
        let mut jobs_min_costs = vec![input.get_cost_upper_bound(); input.jobs.len()];
        let mut jobs_second_min_costs = vec![input.get_cost_upper_bound(); input.jobs.len()];
        for &j in &unassigned {
            for &v in &vehicles_ranks {
                if evals[j][v].cost <= jobs_min_costs[j] {
                    jobs_second_min_costs[j] = jobs_min_costs[j];
                    jobs_min_costs[j] = evals[j][v].cost;
                } else if evals[j][v].cost < jobs_second_min_costs[j] {
                    jobs_second_min_costs[j] = evals[j][v].cost;
                }
            }
        }

        let mut closest_jobs_count = vec![0usize; input.vehicles.len()];
        for &j in &unassigned {
            for &v in &vehicles_ranks {
                if evals[j][v].cost == jobs_min_costs[j] {
                    closest_jobs_count[v] += 1;
                }
            }
        }

        let chosen_pos = (0..vehicles_ranks.len())
            .min_by(|&a, &b| {
                let (lhs, rhs) = (vehicles_ranks[a], vehicles_ranks[b]);
                closest_jobs_count[rhs]
                    .cmp(&closest_jobs_count[lhs])
                    .then_with(|| match sort {
                        Sort::Availability => {
                            input.vehicles[lhs].cmp_availability(&input.vehicles[rhs])
                        }
                        Sort::Cost => input.vehicles[lhs].cmp_cost(&input.vehicles[rhs]),
                    })
            })
            .unwrap();
        let v_rank = vehicles_ranks.remove(chosen_pos);

        let mut regrets = vec![input.get_cost_upper_bound(); input.jobs.len()];
        let mut all_compatible_jobs_later_undoable = true;
        for &j in &unassigned {
            regrets[j] = if jobs_min_costs[j] < evals[j][v_rank].cost {
                jobs_min_costs[j]
            } else {
                jobs_second_min_costs[j]
            };

            if input.vehicle_ok_with_job(v_rank, j) && regrets[j] < input.get_cost_upper_bound()
            {
                all_compatible_jobs_later_undoable = false;
            }
        }

        if all_compatible_jobs_later_undoable {
            for &j in &unassigned {
                regrets[j] = evals[j][v_rank].cost;
            }
        }

        if routes[v_rank].empty() && init != Init::None {
            let jobs_min_costs_ref = &jobs_min_costs;
            seed_route(
                input,
                &mut routes[v_rank],
                init,
                evals,
                &mut unassigned,
                |job_rank| {
                    // Skip jobs some remaining vehicle is closer to.
                    jobs_min_costs_ref[job_rank] < evals[job_rank][v_rank].cost
                },
            );
        }

        sol_eval += fill_route(input, &mut routes[v_rank], &mut unassigned, &regrets, lambda);
    }

    sol_eval
}

/// Install user-defined vehicle steps as initial routes, validating
/// capacity, skills, precedence, max_tasks, range and time windows.
pub fn set_initial_routes<R: Route>(
    input: &Input,
    routes: &mut [R],
    assigned: &mut HashSet<usize>,
) -> Result<()> {
    for v_rank in 0..input.vehicles.len() {
        set_route(input, &mut routes[v_rank], assigned)?;
    }
    Ok(())
}

fn set_route<R: Route>(input: &Input, route: &mut R, assigned: &mut HashSet<usize>) -> Result<()> {
    debug_assert!(route.empty());
    let vehicle = &input.vehicles[route.v_rank()];
    if vehicle.steps.is_empty() {
        return Ok(());
    }

    // Startup load is the sum of single-job deliveries in the route.
    let mut single_jobs_deliveries = input.zero_amount().clone();
    for step in &vehicle.steps {
        if step.step_type == StepType::Job {
            let job = &input.jobs[step.rank];
            if job.job_type == JobType::Single {
                single_jobs_deliveries += &job.delivery;
            }
        }
    }
    if !(single_jobs_deliveries <= vehicle.capacity) {
        return Err(Error::Input(format!(
            "route over capacity for vehicle {}",
            vehicle.id
        )));
    }

    let mut current_load = single_jobs_deliveries.clone();
    let mut eval_sum = Eval::default();
    let mut previous_index = vehicle.start.as_ref().map(|s| s.index());

    let mut job_ranks: Vec<usize> = Vec::with_capacity(vehicle.steps.len());
    let mut expected_delivery_ranks: HashSet<usize> = HashSet::new();

    for step in &vehicle.steps {
        if step.step_type != StepType::Job {
            continue;
        }

        let job_rank = step.rank;
        let job = &input.jobs[job_rank];
        job_ranks.push(job_rank);

        if assigned.contains(&job_rank) {
            return Err(Error::Input(format!(
                "job {} assigned to more than one route",
                job.id
            )));
        }
        assigned.insert(job_rank);

        if !input.vehicle_ok_with_job(route.v_rank(), job_rank) {
            return Err(Error::Input(format!(
                "missing skill or step out of reach for vehicle {} and job {}",
                vehicle.id, job.id
            )));
        }

        if let Some(p) = previous_index {
            eval_sum += vehicle.eval(p, job.index());
        }
        previous_index = Some(job.index());

        match job.job_type {
            JobType::Single => {
                current_load += &job.pickup;
                current_load -= &job.delivery;
            }
            JobType::Pickup => {
                expected_delivery_ranks.insert(job_rank + 1);
                current_load += &job.pickup;
            }
            JobType::Delivery => {
                if !expected_delivery_ranks.remove(&job_rank) {
                    return Err(Error::Input(format!(
                        "invalid shipment in route for vehicle {}",
                        vehicle.id
                    )));
                }
                current_load -= &job.delivery;
            }
        }

        if !(current_load <= vehicle.capacity) {
            return Err(Error::Input(format!(
                "route over capacity for vehicle {}",
                vehicle.id
            )));
        }
    }

    if let (Some(end), false) = (&vehicle.end, job_ranks.is_empty()) {
        eval_sum += vehicle.eval(previous_index.unwrap(), end.index());
    }
    if !vehicle.ok_for_travel_time(eval_sum.duration) {
        return Err(Error::Input(format!(
            "route over max_travel_time for vehicle {}",
            vehicle.id
        )));
    }
    if !vehicle.ok_for_distance(eval_sum.distance) {
        return Err(Error::Input(format!(
            "route over max_distance for vehicle {}",
            vehicle.id
        )));
    }
    if vehicle.max_tasks < job_ranks.len() {
        return Err(Error::Input(format!(
            "too many tasks for vehicle {}",
            vehicle.id
        )));
    }
    if !expected_delivery_ranks.is_empty() {
        return Err(Error::Input(format!(
            "invalid shipment in route for vehicle {}",
            vehicle.id
        )));
    }

    if !job_ranks.is_empty() {
        if !route.is_valid_seq_addition_for_tw(
            input,
            &single_jobs_deliveries,
            &job_ranks[..],
            0,
            0,
            true,
        ) {
            return Err(Error::Input(format!(
                "infeasible route for vehicle {}",
                vehicle.id
            )));
        }

        route.replace(input, &single_jobs_deliveries, &job_ranks[..], 0, 0);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::raw_route::RawRoute;
    use crate::solver::testing::{skills_input, small_pd_input, tw_infeasible_input, two_singles_input};
    use crate::solver::tw_route::TwRoute;

    fn all_unassigned(input: &Input) -> BTreeSet<usize> {
        (0..input.jobs.len()).collect()
    }

    #[test]
    fn basic_assigns_both_jobs_of_scenario_one() {
        let input = two_singles_input();
        let mut routes = vec![RawRoute::new(&input, 0)];

        let eval = basic(
            &input,
            &mut routes,
            all_unassigned(&input),
            vec![0],
            Init::None,
            0.0,
            Sort::Availability,
        );

        assert_eq!(routes[0].size(), 2);
        // Cost 45 in user units: 10 + 15 + 20 either way round.
        assert_eq!(crate::models::scale_to_user_cost(eval.cost), 45);
    }

    #[test]
    fn pd_pair_is_inserted_together() {
        let input = small_pd_input();
        let mut routes = vec![RawRoute::new(&input, 0)];

        basic(
            &input,
            &mut routes,
            all_unassigned(&input),
            vec![0],
            Init::None,
            0.3,
            Sort::Availability,
        );

        let jobs = &routes[0].jobs;
        assert_eq!(jobs.len(), 3);
        let p = jobs.iter().position(|&j| j == 1).unwrap();
        let d = jobs.iter().position(|&j| j == 2).unwrap();
        assert!(p < d);
        // The extra single (capacity 1 of 2 used by the shipment at peak)
        // cannot sit inside the pickup..delivery interval.
        let s = jobs.iter().position(|&j| j == 0).unwrap();
        assert!(s < p || d < s);
    }

    #[test]
    fn skills_route_jobs_to_matching_vehicles() {
        let input = skills_input();
        let mut routes = vec![RawRoute::new(&input, 0), RawRoute::new(&input, 1)];

        basic(
            &input,
            &mut routes,
            all_unassigned(&input),
            vec![0, 1],
            Init::None,
            0.0,
            Sort::Availability,
        );

        assert_eq!(routes[0].jobs, vec![0]);
        assert_eq!(routes[1].jobs, vec![1]);
    }

    #[test]
    fn unreachable_tw_job_stays_unassigned() {
        let input = tw_infeasible_input();
        let mut routes = vec![TwRoute::new(&input, 0)];

        let mut unassigned = all_unassigned(&input);
        let eval = fill_route(&input, &mut routes[0], &mut unassigned, &[0], 0.0);

        assert!(routes[0].empty());
        assert!(unassigned.contains(&0));
        assert_eq!(eval, Eval::default());
    }

    #[test]
    fn seeding_prefers_higher_amount() {
        let input = two_singles_input();
        let mut route = RawRoute::new(&input, 0);
        let mut unassigned = all_unassigned(&input);

        seed_route(
            &input,
            &mut route,
            Init::HigherAmount,
            input.jobs_vehicles_evals(),
            &mut unassigned,
            |_| false,
        );

        assert_eq!(route.size(), 1);
        assert_eq!(unassigned.len(), 1);
    }
}
