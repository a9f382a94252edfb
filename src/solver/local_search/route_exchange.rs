use crate::models::{Eval, Input};
use crate::utils::route_eval_for_vehicle;

use super::super::route::Route;
use super::operator::{seq_delivery, two_routes_mut, LsCtx, Operator};

/// Swap two entire routes between vehicles; pays off on heterogeneous
/// fleets where capacities or cost schedules differ.
pub struct RouteExchange {
    s_vehicle: usize,
    t_vehicle: usize,
    s_gain: Eval,
    t_gain: Eval,
    gain_computed: bool,
}

impl RouteExchange {
    pub fn new(s_vehicle: usize, t_vehicle: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        RouteExchange {
            s_vehicle,
            t_vehicle,
            s_gain: Eval::default(),
            t_gain: Eval::default(),
            gain_computed: false,
        }
    }

    fn compute_gain<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();

        self.s_gain = ctx.state.route_evals[self.s_vehicle]
            - route_eval_for_vehicle(ctx.input, self.s_vehicle, t_jobs);
        self.t_gain = ctx.state.route_evals[self.t_vehicle]
            - route_eval_for_vehicle(ctx.input, self.t_vehicle, s_jobs);
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for RouteExchange {
    fn name(&self) -> &'static str {
        "route_exchange"
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
        let s_vehicle = &input.vehicles[self.s_vehicle];
        let t_vehicle = &input.vehicles[self.t_vehicle];

        // Full-route skill compatibility both ways.
        if ctx.state.fwd_skill_rank[self.s_vehicle][self.t_vehicle] < source.size()
            || ctx.state.fwd_skill_rank[self.t_vehicle][self.s_vehicle] < target.size()
        {
            return false;
        }

        if s_vehicle.max_tasks < target.size()
            || t_vehicle.max_tasks < source.size()
            || !(source.raw().max_load() <= &t_vehicle.capacity)
            || !(target.raw().max_load() <= &s_vehicle.capacity)
        {
            return false;
        }

        let s_delivery = seq_delivery(input, source.jobs());
        let t_delivery = seq_delivery(input, target.jobs());
        let s_size = source.size();
        let t_size = target.size();

        source.is_valid_seq_addition_for_tw(input, &t_delivery, target.jobs(), 0, s_size, true)
            && target.is_valid_seq_addition_for_tw(
                input,
                &s_delivery,
                source.jobs(),
                0,
                t_size,
                true,
            )
            && super::operator::range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && super::operator::range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_jobs: Vec<usize> = source.jobs().to_vec();
        let t_jobs: Vec<usize> = target.jobs().to_vec();

        source.set_route(input, t_jobs);
        target.set_route(input, s_jobs);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
