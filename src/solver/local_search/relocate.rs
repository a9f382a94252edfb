use crate::models::{Eval, Input};
use crate::utils::addition_cost;

use super::super::route::Route;
use super::operator::{range_bounds_ok, two_routes_mut, LsCtx, Operator};

/// Move a single task from the source route into the target route.
pub struct Relocate {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    s_gain: Eval,
    t_gain: Eval,
    gain_computed: bool,
}

impl Relocate {
    pub fn new(s_vehicle: usize, s_rank: usize, t_vehicle: usize, t_rank: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        Relocate {
            s_vehicle,
            s_rank,
            t_vehicle,
            t_rank,
            s_gain: Eval::default(),
            t_gain: Eval::default(),
            gain_computed: false,
        }
    }

    fn compute_gain<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let job_rank = ctx.routes[self.s_vehicle].jobs()[self.s_rank];

        self.s_gain = ctx.state.node_gains[self.s_vehicle][self.s_rank];
        self.t_gain = -addition_cost(
            ctx.input,
            job_rank,
            &ctx.input.vehicles[self.t_vehicle],
            ctx.routes[self.t_vehicle].jobs(),
            self.t_rank,
        );
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for Relocate {
    fn name(&self) -> &'static str {
        "relocate"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        // Removal gain alone bounds the move: insertion can only cost.
        ctx.state.node_gains[self.s_vehicle][self.s_rank]
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gain(ctx);
        }
        self.s_gain + self.t_gain
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute_gain(ctx);
        }

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let job_rank = source.jobs()[self.s_rank];
        let job = &input.jobs[job_rank];

        target.size() + 1 <= input.vehicles[self.t_vehicle].max_tasks
            && target
                .raw()
                .is_valid_addition_for_capacity(&job.pickup, &job.delivery, self.t_rank)
            && target.is_valid_addition_for_tw(input, job_rank, self.t_rank)
            && source.is_valid_removal(input, self.s_rank, 1)
            && range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let job_rank = source.jobs()[self.s_rank];

        target.add(input, job_rank, self.t_rank);
        source.remove(input, self.s_rank, 1);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
