use std::collections::BTreeSet;
use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{
    scale_to_user_cost, scale_to_user_duration, Amount, Duration, Input, JobType, UserDuration,
};
use crate::routing::Router;
use crate::solution::{ComputingTimes, Route, Solution, Step, Summary, UnassignedJob};
use crate::solver::route::Route as _;
use crate::solver::tw_route::TwRoute;
use crate::utils::route_eval_for_vehicle;

#[derive(Clone, Copy, Default)]
pub struct Timings {
    pub loading_ms: u64,
    pub solving_ms: u64,
    pub routing_ms: u64,
}

fn amount_components(a: &Amount) -> Vec<i64> {
    a.components().to_vec()
}

/// Render the solver result as the external solution document, re-deriving
/// per-step schedules from a time-window-aware rebuild of each route.
pub fn format_solution(
    input: &Input,
    routes: &[Vec<usize>],
    unassigned: &BTreeSet<usize>,
    timings: Timings,
) -> Solution {
    let mut out_routes = Vec::new();
    let mut summary_delivery = Amount::zero(input.amount_size());
    let mut summary_pickup = Amount::zero(input.amount_size());
    let mut summary = Summary {
        cost: 0,
        routes: 0,
        unassigned: unassigned.len(),
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

    for (v_rank, jobs) in routes.iter().enumerate() {
        if jobs.is_empty() {
            continue;
        }
        let route = format_route(input, v_rank, jobs);

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

        out_routes.push(route);
    }

    summary.delivery = amount_components(&summary_delivery);
    summary.pickup = amount_components(&summary_pickup);

    let unassigned_jobs = unassigned
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
        .collect();

    debug!(
        routes = out_routes.len(),
        unassigned = unassigned.len(),
        cost = summary.cost,
        "solution formatted"
    );

    Solution {
        code: 0,
        summary,
        routes: out_routes,
        unassigned: unassigned_jobs,
    }
}

/// Forward schedule for one route: earliest service dates with breaks
/// interleaved the way the route state machine ordered them.
fn format_route(input: &Input, v_rank: usize, jobs: &[usize]) -> Route {
    let vehicle = &input.vehicles[v_rank];

    // Rebuild the time-window state to recover service dates and the break
    // placement; with default windows this degrades to plain accumulation.
    let mut tw = TwRoute::new(input, v_rank);
    tw.set_route(input, jobs.to_vec());

    let eval = route_eval_for_vehicle(input, v_rank, jobs);

    let mut steps: Vec<Step> = Vec::new();
    let mut setup_sum: UserDuration = 0;
    let mut service_sum: UserDuration = 0;
    let mut waiting_sum: UserDuration = 0;
    let mut travel_sum: Duration = 0;
    let mut distance_sum: i64 = 0;

    let mut current_time: Duration = tw.v_start;
    let mut previous_index: Option<usize> = vehicle.start.as_ref().map(|s| s.index());

    if let Some(start) = &vehicle.start {
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
            load: amount_components(tw.raw.load_at_step(0)),
            violations: Vec::new(),
        });
    }

    for i in 0..=jobs.len() {
        // Travel pending towards the next location; waiting before breaks
        // eats into it.
        let next_index = if i < jobs.len() {
            Some(input.jobs[jobs[i]].index())
        } else {
            vehicle.end.as_ref().map(|e| e.index())
        };
        let mut remaining_travel = match (previous_index, next_index) {
            (Some(p), Some(n)) => vehicle.duration(p, n),
            _ => 0,
        };
        let leg_distance = match (previous_index, next_index) {
            (Some(p), Some(n)) => vehicle.cost_wrapper.distance(p, n),
            _ => 0,
        };

        let mut break_rank = tw.breaks_counts[i] - tw.breaks_at_rank[i];
        for _ in 0..tw.breaks_at_rank[i] {
            let b = &vehicle.breaks[break_rank];
            let b_tw = b
                .tws
                .iter()
                .find(|tw| current_time <= tw.end)
                .unwrap_or_else(|| b.tws.last().unwrap());

            let service_start = current_time.max(b_tw.start);
            let waiting = service_start - current_time;
            if waiting < remaining_travel {
                remaining_travel -= waiting;
            } else {
                remaining_travel = 0;
            }

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
                load: amount_components(tw.raw.load_at_step(i)),
                violations: Vec::new(),
            });

            waiting_sum += scale_to_user_duration(waiting);
            service_sum += scale_to_user_duration(b.service);
            current_time = service_start + b.service;
            break_rank += 1;
        }

        current_time += remaining_travel;
        travel_sum += remaining_travel;
        distance_sum += leg_distance;

        if i < jobs.len() {
            let job = &input.jobs[jobs[i]];
            let service_start = tw.earliest[i];
            let waiting = (service_start - current_time).max(0);
            let action = tw.action_time[i];
            let service = job.services[vehicle.vtype];
            let setup = action - service;

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
                arrival: scale_to_user_duration(current_time),
                duration: scale_to_user_duration(travel_sum),
                setup: scale_to_user_duration(setup),
                service: scale_to_user_duration(service),
                waiting_time: scale_to_user_duration(waiting),
                distance: input.report_distances().then_some(distance_sum as u32),
                load: amount_components(tw.raw.load_at_step(i + 1)),
                violations: Vec::new(),
            });

            setup_sum += scale_to_user_duration(setup);
            service_sum += scale_to_user_duration(service);
            waiting_sum += scale_to_user_duration(waiting);
            current_time = service_start + action;
            previous_index = Some(job.index());
        } else if let Some(end) = &vehicle.end {
            steps.push(Step {
                step_type: "end".to_string(),
                id: None,
                description: None,
                location: end.coords(),
                location_index: Some(end.index()),
                arrival: scale_to_user_duration(current_time),
                duration: scale_to_user_duration(travel_sum),
                setup: 0,
                service: 0,
                waiting_time: 0,
                distance: input.report_distances().then_some(distance_sum as u32),
                load: amount_components(tw.raw.load_at_step(jobs.len() + 1)),
                violations: Vec::new(),
            });
        }
    }

    Route {
        vehicle: vehicle.id,
        steps,
        cost: scale_to_user_cost(eval.cost),
        setup: setup_sum,
        service: service_sum,
        duration: scale_to_user_duration(travel_sum),
        waiting_time: waiting_sum,
        priority: crate::utils::priority_sum_for_route(input, jobs),
        delivery: amount_components(tw.raw.job_deliveries_sum()),
        pickup: amount_components(tw.raw.job_pickups_sum()),
        distance: input.report_distances().then_some(distance_sum as u32),
        geometry: None,
        description: (!vehicle.description.is_empty())
            .then(|| vehicle.description.clone()),
        violations: Vec::new(),
    }
}

/// Augment each route with a polyline from the routing layer.
pub async fn add_geometries(
    solution: &mut Solution,
    input: &Input,
    routers: &HashMap<String, Router>,
) -> Result<()> {
    for route in &mut solution.routes {
        let vehicle = input
            .vehicles
            .iter()
            .find(|v| v.id == route.vehicle)
            .ok_or_else(|| Error::Internal("route for unknown vehicle".to_string()))?;
        let router = routers.get(&vehicle.profile).ok_or_else(|| {
            Error::Routing(format!("no routing layer for profile {}", vehicle.profile))
        })?;

        let coords: Vec<[f64; 2]> = route
            .steps
            .iter()
            .filter_map(|step| step.location)
            .collect();
        if coords.len() >= 2 {
            route.geometry = Some(router.route_geometry(&coords).await?);
        }
    }
    Ok(())
}

pub fn solution_to_json(solution: &Solution) -> serde_json::Value {
    serde_json::to_value(solution).unwrap_or_else(|_| {
        Error::Internal("solution serialisation failed".to_string()).to_json()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::testing::{break_max_load_input, two_singles_input};

    #[test]
    fn formats_two_job_route_with_expected_cost() {
        let input = two_singles_input();
        let routes = vec![vec![0, 1]];
        let unassigned = BTreeSet::new();

        let solution = format_solution(&input, &routes, &unassigned, Timings::default());

        assert_eq!(solution.code, 0);
        assert_eq!(solution.summary.routes, 1);
        assert_eq!(solution.summary.unassigned, 0);
        // 10 + 15 + 20 on the metric matrix at 3600/h.
        assert_eq!(solution.summary.cost, 45);

        let route = &solution.routes[0];
        let kinds: Vec<&str> = route.steps.iter().map(|s| s.step_type.as_str()).collect();
        assert_eq!(kinds, vec!["start", "job", "job", "end"]);
        assert_eq!(route.steps[1].arrival, 10);
        assert_eq!(route.steps[2].arrival, 25);
        assert_eq!(route.duration, 45);
    }

    #[test]
    fn break_steps_are_emitted_in_schedule_order() {
        let input = break_max_load_input();
        // Deliver the single, then run the shipment: the break slots in
        // wherever the state machine scheduled it.
        let routes = vec![vec![0, 1, 2]];
        let unassigned = BTreeSet::new();

        let solution = format_solution(&input, &routes, &unassigned, Timings::default());
        let route = &solution.routes[0];

        assert_eq!(
            route
                .steps
                .iter()
                .filter(|s| s.step_type == "break")
                .count(),
            1
        );
        // Arrivals never decrease along the route.
        let arrivals: Vec<u32> = route.steps.iter().map(|s| s.arrival).collect();
        assert!(arrivals.windows(2).all(|w| w[0] <= w[1]));
    }
}
