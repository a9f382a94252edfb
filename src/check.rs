use std::collections::{BTreeSet, HashSet};

use tracing::info;

use crate::models::{
    scale_to_user_cost, scale_to_user_duration, Amount, Duration, Input, JobType, StepType,
};
use crate::solution::{
    ComputingTimes, Route, Solution, Step, Summary, UnassignedJob, Violation, ViolationCause,
};
use crate::utils::route_eval_for_vehicle;

use crate::io::output::Timings;

/// Check mode: score user-provided fully-specified routes instead of
/// solving. Violations are collected per step and surfaced on routes and
/// the summary; infeasibility is reported, never fatal.
pub fn check_routes(input: &Input, timings: Timings) -> Solution {
    let mut routes = Vec::new();
    let mut assigned: HashSet<usize> = HashSet::new();
    let mut summary_delivery = Amount::zero(input.amount_size());
    let mut summary_pickup = Amount::zero(input.amount_size());

    let mut summary = Summary {
        cost: 0,
        routes: 0,
        unassigned: 0,
        delivery: Vec::new(),
        pickup: Vec::new(),
        setup: 0,
        service: 0,
        duration: 0,
        waiting_time: 0,
        priority: 0,
        distance: input.report_distances().then_some(0),
        violations: Vec::new(),
        computing_times: ComputingTimes {
            loading: timings.loading_ms,
            solving: timings.solving_ms,
            routing: timings.routing_ms,
        },
    };

    for v_rank in 0..input.vehicles.len() {
        if input.vehicles[v_rank].steps.is_empty() {
            continue;
        }
        let route = check_single_route(input, v_rank, &mut assigned);

        summary.cost += route.cost;
        summary.routes += 1;
        summary.setup += route.setup;
        summary.service += route.service;
        summary.duration += route.duration;
        summary.waiting_time += route.waiting_time;
        summary.priority += route.priority;
        if let (Some(total), Some(d)) = (summary.distance.as_mut(), route.distance) {
            *total += d;
        }
        summary_delivery += &Amount::from_vec(route.delivery.clone());
        summary_pickup += &Amount::from_vec(route.pickup.clone());
        for violation in &route.violations {
            if !summary.violations.contains(violation) {
                summary.violations.push(violation.clone());
            }
        }

        routes.push(route);
    }

    let unassigned: BTreeSet<usize> = (0..input.jobs.len())
        .filter(|j| !assigned.contains(j))
        .collect();
    summary.unassigned = unassigned.len();
    summary.delivery = summary_delivery.components().to_vec();
    summary.pickup = summary_pickup.components().to_vec();

    info!(
        routes = routes.len(),
        violations = summary.violations.len(),
        "check done"
    );

    Solution {
        code: 0,
        summary,
        routes,
        unassigned: unassigned
            .iter()
            .map(|&j| {
                let job = &input.jobs[j];
                UnassignedJob {
                    id: job.id,
                    job_type: match job.job_type {
                        JobType::Single => "job",
                        JobType::Pickup => "pickup",
                        JobType::Delivery => "delivery",
                    }
                    .to_string(),
                    location: job.location.coords(),
                    location_index: Some(job.index()),
                    description: (!job.description.is_empty())
                        .then(|| job.description.clone()),
                }
            })
            .collect(),
    }
}

fn check_single_route(input: &Input, v_rank: usize, assigned: &mut HashSet<usize>) -> Route {
    let vehicle = &input.vehicles[v_rank];

    let job_ranks: Vec<usize> = vehicle
        .steps
        .iter()
        .filter(|s| s.step_type == StepType::Job)
        .map(|s| s.rank)
        .collect();

    let mut route_violations: Vec<Violation> = Vec::new();
    let push_route_violation = |violations: &mut Vec<Violation>, v: Violation| {
        if !violations.contains(&v) {
            violations.push(v);
        }
    };

    if vehicle.max_tasks < job_ranks.len() {
        push_route_violation(&mut route_violations, Violation::new(ViolationCause::MaxTasks));
    }

    // Startup load and precedence bookkeeping.
    let mut current_load = Amount::zero(input.amount_size());
    for &j in &job_ranks {
        if input.jobs[j].job_type == JobType::Single {
            current_load += &input.jobs[j].delivery;
        }
    }
    // Open shipments, with the pickup's service start for lifetime checks.
    let mut open_pickups: std::collections::HashMap<usize, Duration> =
        std::collections::HashMap::new();

    let mut steps: Vec<Step> = Vec::new();
    let mut setup_sum = 0u32;
    let mut service_sum = 0u32;
    let mut waiting_sum = 0u32;
    let mut travel_sum: Duration = 0;
    let mut distance_sum: i64 = 0;

    let mut current_time: Duration = vehicle.tw.start;
    let mut previous_index: Option<usize> = None;

    for step in &vehicle.steps {
        match step.step_type {
            StepType::Start => {
                if let Some(start) = &vehicle.start {
                    previous_index = Some(start.index());
                    steps.push(Step {
                        step_type: "start".to_string(),
                        id: None,
                        description: None,
                        location: start.coords(),
                        location_index: Some(start.index()),
                        arrival: scale_to_user_duration(current_time),
                        duration: 0,
                        setup: 0,
                        service: 0,
                        waiting_time: 0,
                        distance: input.report_distances().then_some(0),
                        load: current_load.components().to_vec(),
                        violations: Vec::new(),
                    });
                }
            }
            StepType::Break => {
                let b = &vehicle.breaks[step.rank];
                let mut violations = Vec::new();

                let service_start = match b.tws.iter().find(|tw| current_time <= tw.end) {
                    Some(tw) => current_time.max(tw.start),
                    None => {
                        violations.push(Violation::new(ViolationCause::MissingBreak));
                        current_time
                    }
                };
                if !b.is_valid_for_load(&current_load) {
                    violations.push(Violation::new(ViolationCause::MaxLoad));
                }

                let waiting = service_start - current_time;
                steps.push(Step {
                    step_type: "break".to_string(),
                    id: Some(b.id),
                    description: (!b.description.is_empty()).then(|| b.description.clone()),
                    location: None,
                    location_index: None,
                    arrival: scale_to_user_duration(current_time),
                    duration: scale_to_user_duration(travel_sum),
                    setup: 0,
                    service: scale_to_user_duration(b.service),
                    waiting_time: scale_to_user_duration(waiting),
                    distance: input.report_distances().then_some(distance_sum as u32),
                    load: current_load.components().to_vec(),
                    violations: violations.clone(),
                });
                for v in violations {
                    push_route_violation(&mut route_violations, v);
                }

                waiting_sum += scale_to_user_duration(waiting);
                service_sum += scale_to_user_duration(b.service);
                current_time = service_start + b.service;
            }
            StepType::Job => {
                let job = &input.jobs[step.rank];
                let mut violations = Vec::new();

                if !assigned.insert(step.rank) {
                    violations.push(Violation::new(ViolationCause::Precedence));
                }

                if !job.skills.is_subset(&vehicle.skills) {
                    violations.push(Violation::new(ViolationCause::Skills));
                }

                let travel = previous_index
                    .map(|p| vehicle.duration(p, job.index()))
                    .unwrap_or(0);
                let leg_distance = previous_index
                    .map(|p| vehicle.cost_wrapper.distance(p, job.index()))
                    .unwrap_or(0);
                let arrival = current_time + travel;
                travel_sum += travel;
                distance_sum += leg_distance;

                let action = if previous_index == Some(job.index()) {
                    job.services[vehicle.vtype]
                } else {
                    job.setups[vehicle.vtype] + job.services[vehicle.vtype]
                };
                let service = job.services[vehicle.vtype];

                let (service_start, delay) = match job.tws.iter().find(|tw| arrival <= tw.end) {
                    Some(tw) => (arrival.max(tw.start), 0),
                    None => (arrival, arrival - job.tws.last().unwrap().end),
                };
                if delay > 0 {
                    violations.push(Violation::timed(
                        ViolationCause::Delay,
                        scale_to_user_duration(delay),
                    ));
                }

                match job.job_type {
                    JobType::Single => {
                        current_load += &job.pickup;
                        current_load -= &job.delivery;
                    }
                    JobType::Pickup => {
                        open_pickups.insert(step.rank, service_start);
                        current_load += &job.pickup;
                    }
                    JobType::Delivery => {
                        match open_pickups.remove(&(step.rank - 1)) {
                            None => {
                                violations.push(Violation::new(ViolationCause::Precedence));
                            }
                            Some(pickup_start) => {
                                // Cargo lifetime: delivery must start within
                                // the cap after the pickup's service start.
                                if let Some(max_lifetime) =
                                    input.jobs[step.rank - 1].max_lifetime
                                {
                                    if service_start - pickup_start > max_lifetime {
                                        violations.push(Violation::timed(
                                            ViolationCause::Delay,
                                            scale_to_user_duration(
                                                service_start - pickup_start - max_lifetime,
                                            ),
                                        ));
                                    }
                                }
                            }
                        }
                        current_load -= &job.delivery;
                    }
                }
                if !(current_load <= vehicle.capacity) {
                    violations.push(Violation::new(ViolationCause::Load));
                }

                let waiting = service_start - arrival;
                steps.push(Step {
                    step_type: match job.job_type {
                        JobType::Single => "job",
                        JobType::Pickup => "pickup",
                        JobType::Delivery => "delivery",
                    }
                    .to_string(),
                    id: Some(job.id),
                    description: (!job.description.is_empty())
                        .then(|| job.description.clone()),
                    location: job.location.coords(),
                    location_index: Some(job.index()),
                    arrival: scale_to_user_duration(arrival),
                    duration: scale_to_user_duration(travel_sum),
                    setup: scale_to_user_duration(action - service),
                    service: scale_to_user_duration(service),
                    waiting_time: scale_to_user_duration(waiting),
                    distance: input.report_distances().then_some(distance_sum as u32),
                    load: current_load.components().to_vec(),
                    violations: violations.clone(),
                });
                for v in violations {
                    push_route_violation(&mut route_violations, v);
                }

                setup_sum += scale_to_user_duration(action - service);
                service_sum += scale_to_user_duration(service);
                waiting_sum += scale_to_user_duration(waiting);
                current_time = service_start + action;
                previous_index = Some(job.index());
            }
            StepType::End => {
                if let Some(end) = &vehicle.end {
                    let travel = previous_index
                        .map(|p| vehicle.duration(p, end.index()))
                        .unwrap_or(0);
                    let leg_distance = previous_index
                        .map(|p| vehicle.cost_wrapper.distance(p, end.index()))
                        .unwrap_or(0);
                    let arrival = current_time + travel;
                    travel_sum += travel;
                    distance_sum += leg_distance;
                    current_time = arrival;

                    let mut violations = Vec::new();
                    if arrival > vehicle.tw.end {
                        violations.push(Violation::timed(
                            ViolationCause::Delay,
                            scale_to_user_duration(arrival - vehicle.tw.end),
                        ));
                    }

                    steps.push(Step {
                        step_type: "end".to_string(),
                        id: None,
                        description: None,
                        location: end.coords(),
                        location_index: Some(end.index()),
                        arrival: scale_to_user_duration(arrival),
                        duration: scale_to_user_duration(travel_sum),
                        setup: 0,
                        service: 0,
                        waiting_time: 0,
                        distance: input.report_distances().then_some(distance_sum as u32),
                        load: current_load.components().to_vec(),
                        violations: violations.clone(),
                    });
                    for v in violations {
                        push_route_violation(&mut route_violations, v);
                    }
                }
            }
        }
    }

    if !open_pickups.is_empty() {
        push_route_violation(&mut route_violations, Violation::new(ViolationCause::Precedence));
    }
    if !vehicle.ok_for_travel_time(travel_sum) {
        push_route_violation(
            &mut route_violations,
            Violation::new(ViolationCause::MaxTravelTime),
        );
    }
    if !vehicle.ok_for_distance(distance_sum) {
        push_route_violation(
            &mut route_violations,
            Violation::new(ViolationCause::MaxDistance),
        );
    }

    // Breaks declared on the vehicle but absent from the plan.
    let listed_breaks: HashSet<usize> = vehicle
        .steps
        .iter()
        .filter(|s| s.step_type == StepType::Break)
        .map(|s| s.rank)
        .collect();
    if listed_breaks.len() < vehicle.breaks.len() {
        push_route_violation(
            &mut route_violations,
            Violation::new(ViolationCause::MissingBreak),
        );
    }

    let eval = route_eval_for_vehicle(input, v_rank, &job_ranks);

    Route {
        vehicle: vehicle.id,
        steps,
        cost: scale_to_user_cost(eval.cost),
        setup: setup_sum,
        service: service_sum,
        duration: scale_to_user_duration(travel_sum),
        waiting_time: waiting_sum,
        priority: crate::utils::priority_sum_for_route(input, &job_ranks),
        delivery: job_ranks
            .iter()
            .fold(Amount::zero(input.amount_size()), |mut acc, &j| {
                if input.jobs[j].job_type != JobType::Pickup {
                    acc += &input.jobs[j].delivery;
                }
                acc
            })
            .components()
            .to_vec(),
        pickup: job_ranks
            .iter()
            .fold(Amount::zero(input.amount_size()), |mut acc, &j| {
                if input.jobs[j].job_type != JobType::Delivery {
                    acc += &input.jobs[j].pickup;
                }
                acc
            })
            .components()
            .to_vec(),
        distance: input.report_distances().then_some(distance_sum as u32),
        geometry: None,
        description: (!vehicle.description.is_empty())
            .then(|| vehicle.description.clone()),
        violations: route_violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StepType, VehicleStep};
    use crate::solver::testing::two_singles_input;

    fn with_steps(mut input: Input, v_rank: usize, steps: Vec<VehicleStep>) -> Input {
        input.vehicles[v_rank].steps = steps;
        input
    }

    fn job_step(rank: usize, id: u64) -> VehicleStep {
        let mut step = VehicleStep::new(StepType::Job, id);
        step.rank = rank;
        step.job_type = Some(crate::models::JobType::Single);
        step
    }

    #[test]
    fn feasible_plan_reports_no_violations() {
        let input = two_singles_input();
        let input = with_steps(
            input,
            0,
            vec![
                VehicleStep::new(StepType::Start, 0),
                job_step(0, 1),
                job_step(1, 2),
                VehicleStep::new(StepType::End, 0),
            ],
        );

        let solution = check_routes(&input, Timings::default());
        assert_eq!(solution.routes.len(), 1);
        assert!(solution.routes[0].violations.is_empty());
        assert!(solution.summary.violations.is_empty());
        assert_eq!(solution.summary.unassigned, 0);
    }

    #[test]
    fn overload_and_double_assignment_are_tagged() {
        let input = two_singles_input();
        // Same job served twice: load stays fine but precedence trips.
        let input = with_steps(
            input,
            0,
            vec![
                VehicleStep::new(StepType::Start, 0),
                job_step(0, 1),
                job_step(0, 1),
                VehicleStep::new(StepType::End, 0),
            ],
        );

        let solution = check_routes(&input, Timings::default());
        let causes: Vec<&str> = solution.routes[0]
            .violations
            .iter()
            .map(|v| v.cause)
            .collect();
        assert!(causes.contains(&"precedence"));
    }
}
