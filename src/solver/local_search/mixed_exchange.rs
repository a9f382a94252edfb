use crate::models::{Eval, Input, NO_GAIN};

use super::super::route::Route;
use super::super::sequence::Reversed;
use super::operator::{
    range_bounds_ok, seq_delivery, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Swap a single task in the source route with a consecutive-task edge in
/// the target route, optionally reversing the edge on its way in.
pub struct MixedExchange {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    check_t_reverse: bool,

    s_gain_normal: Eval,
    s_gain_reverse: Eval,
    t_gain: Eval,
    s_is_normal_valid: bool,
    s_is_reverse_valid: bool,
    pub reverse_t_edge: bool,
    gain_computed: bool,
}

impl MixedExchange {
    pub fn new(
        s_vehicle: usize,
        s_rank: usize,
        t_vehicle: usize,
        t_rank: usize,
        check_t_reverse: bool,
    ) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        MixedExchange {
            s_vehicle,
            s_rank,
            t_vehicle,
            t_rank,
            check_t_reverse,
            s_gain_normal: NO_GAIN,
            s_gain_reverse: NO_GAIN,
            t_gain: Eval::default(),
            s_is_normal_valid: false,
            s_is_reverse_valid: false,
            reverse_t_edge: false,
            gain_computed: false,
        }
    }

    fn compute_gains<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let input = ctx.input;
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();

        let t_edge = &t_jobs[self.t_rank..self.t_rank + 2];
        let s_job = s_jobs[self.s_rank];

        self.s_gain_normal = splice_gain(
            input,
            &input.vehicles[self.s_vehicle],
            s_jobs,
            self.s_rank,
            self.s_rank + 1,
            t_edge,
        );
        if self.check_t_reverse {
            self.s_gain_reverse = splice_gain(
                input,
                &input.vehicles[self.s_vehicle],
                s_jobs,
                self.s_rank,
                self.s_rank + 1,
                &Reversed(t_edge),
            );
        }

        self.t_gain = splice_gain(
            input,
            &input.vehicles[self.t_vehicle],
            t_jobs,
            self.t_rank,
            self.t_rank + 2,
            &[s_job][..],
        );

        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for MixedExchange {
    fn name(&self) -> &'static str {
        "mixed_exchange"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        self.s_gain_normal.max(self.s_gain_reverse) + self.t_gain
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        let s_best = match (self.s_is_normal_valid, self.s_is_reverse_valid) {
            (true, true) => {
                if self.s_gain_normal < self.s_gain_reverse {
                    self.reverse_t_edge = true;
                    self.s_gain_reverse
                } else {
                    self.reverse_t_edge = false;
                    self.s_gain_normal
                }
            }
            (true, false) => {
                self.reverse_t_edge = false;
                self.s_gain_normal
            }
            (false, true) => {
                self.reverse_t_edge = true;
                self.s_gain_reverse
            }
            (false, false) => return NO_GAIN,
        };
        s_best + self.t_gain
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let s_jobs = source.jobs();
        let t_jobs = target.jobs();
        let t_edge = &t_jobs[self.t_rank..self.t_rank + 2];
        let s_job = &input.jobs[s_jobs[self.s_rank]];

        let t_delivery = seq_delivery(input, t_edge);

        if !source.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &t_delivery,
            t_edge,
            self.s_rank,
            self.s_rank + 1,
        ) || !target.raw().is_valid_addition_for_capacity_margins(
            &s_job.pickup,
            &s_job.delivery,
            self.t_rank,
            self.t_rank + 2,
        ) {
            return false;
        }

        self.s_is_normal_valid = source.is_valid_seq_addition_for_tw(
            input,
            &t_delivery,
            t_edge,
            self.s_rank,
            self.s_rank + 1,
            true,
        );
        self.s_is_reverse_valid = self.check_t_reverse
            && source.is_valid_seq_addition_for_tw(
                input,
                &t_delivery,
                &Reversed(t_edge),
                self.s_rank,
                self.s_rank + 1,
                true,
            );

        (self.s_is_normal_valid || self.s_is_reverse_valid)
            && target.is_valid_seq_addition_for_tw(
                input,
                &s_job.delivery,
                &[s_jobs[self.s_rank]][..],
                self.t_rank,
                self.t_rank + 2,
                true,
            )
            && range_bounds_ok(
                ctx,
                self.s_vehicle,
                self.s_gain_normal.max(self.s_gain_reverse),
            )
            && range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_job = source.jobs()[self.s_rank];
        let t_edge: Vec<usize> = target.jobs()[self.t_rank..self.t_rank + 2].to_vec();
        let t_delivery = seq_delivery(input, &t_edge[..]);
        let s_delivery = input.jobs[s_job].delivery.clone();

        if self.reverse_t_edge {
            source.replace(
                input,
                &t_delivery,
                &Reversed(&t_edge),
                self.s_rank,
                self.s_rank + 1,
            );
        } else {
            source.replace(input, &t_delivery, &t_edge[..], self.s_rank, self.s_rank + 1);
        }

        target.replace(input, &s_delivery, &[s_job][..], self.t_rank, self.t_rank + 2);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
