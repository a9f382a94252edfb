use std::time::Instant;

use crate::models::{Eval, Input, JobType, SquareMatrix, NO_GAIN};
use crate::utils::route_eval_for_vehicle;

use super::super::route::Route;
use super::super::tsp::tsp_solve;
use super::operator::{range_bounds_ok, seq_delivery, LsCtx, Operator};

/// Re-solve a single route as a TSP through the external sub-solver and
/// keep the result when it beats the current order. Restricted to routes
/// without shipments, whose order carries no precedence.
pub struct RouteFix {
    vehicle: usize,
    deadline: Option<Instant>,
    new_jobs: Vec<usize>,
    stored_gain: Eval,
    found: bool,
    searched: bool,
}

impl RouteFix {
    pub fn new(vehicle: usize, deadline: Option<Instant>) -> Self {
        RouteFix {
            vehicle,
            deadline,
            new_jobs: Vec::new(),
            stored_gain: NO_GAIN,
            found: false,
            searched: false,
        }
    }

    fn search<R: Route>(&mut self, ctx: &LsCtx<R>) {
        self.searched = true;

        let input = ctx.input;
        let route = &ctx.routes[self.vehicle];
        let jobs = route.jobs();
        let vehicle = &input.vehicles[self.vehicle];

        debug_assert!(jobs
            .iter()
            .all(|&j| input.jobs[j].job_type == JobType::Single));

        // Cost matrix over [start?] + jobs + [end?] from this vehicle's
        // wrapper.
        let mut indices: Vec<usize> = Vec::with_capacity(jobs.len() + 2);
        let start_node = vehicle.start.as_ref().map(|s| {
            indices.push(s.index());
            0usize
        });
        let job_offset = indices.len();
        for &j in jobs {
            indices.push(input.jobs[j].index());
        }
        let end_node = vehicle.end.as_ref().map(|e| {
            indices.push(e.index());
            indices.len() - 1
        });

        let n = indices.len();
        let mut matrix = SquareMatrix::new(n, 0);
        for i in 0..n {
            for j in 0..n {
                matrix.set(i, j, vehicle.cost(indices[i], indices[j]));
            }
        }

        let order = tsp_solve(&matrix, start_node, end_node, self.deadline);

        self.new_jobs = order
            .iter()
            .map(|&node| jobs[node - job_offset])
            .collect();

        let new_eval = route_eval_for_vehicle(input, self.vehicle, &self.new_jobs);
        self.stored_gain = ctx.state.route_evals[self.vehicle] - new_eval;
        self.found = !self.new_jobs.is_empty();
    }
}

impl<R: Route> Operator<R> for RouteFix {
    fn name(&self) -> &'static str {
        "route_fix"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.searched {
            self.search(ctx);
        }
        if self.found {
            self.stored_gain
        } else {
            NO_GAIN
        }
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.searched {
            self.search(ctx);
        }
        if !self.found {
            return false;
        }

        let input = ctx.input;
        let route = &ctx.routes[self.vehicle];
        let delivery = seq_delivery(input, &self.new_jobs[..]);
        let size = route.size();

        route.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &delivery,
            &self.new_jobs[..],
            0,
            size,
        ) && route.is_valid_seq_addition_for_tw(
            input,
            &delivery,
            &self.new_jobs[..],
            0,
            size,
            true,
        ) && range_bounds_ok(ctx, self.vehicle, self.stored_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        routes[self.vehicle].set_route(input, self.new_jobs.clone());
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
