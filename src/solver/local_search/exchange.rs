use crate::models::{Eval, Input};

use super::super::route::Route;
use super::operator::{splice_gain, two_routes_mut, LsCtx, Operator};

/// Swap two single tasks across routes.
pub struct Exchange {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    s_gain: Eval,
    t_gain: Eval,
    gain_computed: bool,
}

impl Exchange {
    pub fn new(s_vehicle: usize, s_rank: usize, t_vehicle: usize, t_rank: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        Exchange {
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
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();
        let s_job = s_jobs[self.s_rank];
        let t_job = t_jobs[self.t_rank];

        self.s_gain = splice_gain(
            ctx.input,
            &ctx.input.vehicles[self.s_vehicle],
            s_jobs,
            self.s_rank,
            self.s_rank + 1,
            &[t_job][..],
        );
        self.t_gain = splice_gain(
            ctx.input,
            &ctx.input.vehicles[self.t_vehicle],
            t_jobs,
            self.t_rank,
            self.t_rank + 1,
            &[s_job][..],
        );
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for Exchange {
    fn name(&self) -> &'static str {
        "exchange"
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

        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let s_job = &ctx.input.jobs[source.jobs()[self.s_rank]];
        let t_job = &ctx.input.jobs[target.jobs()[self.t_rank]];

        super::operator::range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && super::operator::range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
            && target.raw().is_valid_addition_for_capacity_margins(
                &s_job.pickup,
                &s_job.delivery,
                self.t_rank,
                self.t_rank + 1,
            )
            && source.raw().is_valid_addition_for_capacity_margins(
                &t_job.pickup,
                &t_job.delivery,
                self.s_rank,
                self.s_rank + 1,
            )
            && target.is_valid_seq_addition_for_tw(
                ctx.input,
                &s_job.delivery,
                &[source.jobs()[self.s_rank]][..],
                self.t_rank,
                self.t_rank + 1,
                true,
            )
            && source.is_valid_seq_addition_for_tw(
                ctx.input,
                &t_job.delivery,
                &[target.jobs()[self.t_rank]][..],
                self.s_rank,
                self.s_rank + 1,
                true,
            )
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_job = source.jobs()[self.s_rank];
        let t_job = target.jobs()[self.t_rank];

        source.replace(
            input,
            &input.jobs[t_job].delivery.clone(),
            &[t_job][..],
            self.s_rank,
            self.s_rank + 1,
        );
        target.replace(
            input,
            &input.jobs[s_job].delivery.clone(),
            &[s_job][..],
            self.t_rank,
            self.t_rank + 1,
        );
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
