use crate::models::{Eval, Input, NO_GAIN};

use super::super::route::Route;
use super::super::sequence::Reversed;
use super::operator::{
    range_bounds_ok, seq_delivery, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Move a consecutive-task edge from the source route into the target
/// route, optionally reversed.
pub struct OrOpt {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    check_reverse: bool,

    s_gain: Eval,
    t_gain_normal: Eval,
    t_gain_reverse: Eval,
    is_normal_valid: bool,
    is_reverse_valid: bool,
    pub reverse_edge: bool,
    gain_computed: bool,
}

impl OrOpt {
    pub fn new(
        s_vehicle: usize,
        s_rank: usize,
        t_vehicle: usize,
        t_rank: usize,
        check_reverse: bool,
    ) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        OrOpt {
            s_vehicle,
            s_rank,
            t_vehicle,
            t_rank,
            check_reverse,
            s_gain: Eval::default(),
            t_gain_normal: NO_GAIN,
            t_gain_reverse: NO_GAIN,
            is_normal_valid: false,
            is_reverse_valid: false,
            reverse_edge: false,
            gain_computed: false,
        }
    }

    fn compute_gain<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let input = ctx.input;
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();
        let edge = &s_jobs[self.s_rank..self.s_rank + 2];

        self.s_gain = ctx.state.edge_gains[self.s_vehicle][self.s_rank];

        self.t_gain_normal = splice_gain(
            input,
            &input.vehicles[self.t_vehicle],
            t_jobs,
            self.t_rank,
            self.t_rank,
            edge,
        );
        if self.check_reverse {
            self.t_gain_reverse = splice_gain(
                input,
                &input.vehicles[self.t_vehicle],
                t_jobs,
                self.t_rank,
                self.t_rank,
                &Reversed(edge),
            );
        }
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for OrOpt {
    fn name(&self) -> &'static str {
        "or_opt"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        // Insertion in the target only adds cost.
        ctx.state.edge_gains[self.s_vehicle][self.s_rank]
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gain(ctx);
        }
        let t_best = match (self.is_normal_valid, self.is_reverse_valid) {
            (true, true) => {
                if self.t_gain_normal < self.t_gain_reverse {
                    self.reverse_edge = true;
                    self.t_gain_reverse
                } else {
                    self.reverse_edge = false;
                    self.t_gain_normal
                }
            }
            (true, false) => {
                self.reverse_edge = false;
                self.t_gain_normal
            }
            (false, true) => {
                self.reverse_edge = true;
                self.t_gain_reverse
            }
            (false, false) => return NO_GAIN,
        };
        self.s_gain + t_best
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute_gain(ctx);
        }

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let edge = &source.jobs()[self.s_rank..self.s_rank + 2];
        let edge_delivery = seq_delivery(input, edge);

        if target.size() + 2 > input.vehicles[self.t_vehicle].max_tasks
            || !target.raw().is_valid_addition_for_capacity_inclusion(
                input,
                &edge_delivery,
                edge,
                self.t_rank,
                self.t_rank,
            )
            || !source.is_valid_removal(input, self.s_rank, 2)
        {
            return false;
        }

        self.is_normal_valid = target.is_valid_seq_addition_for_tw(
            input,
            &edge_delivery,
            edge,
            self.t_rank,
            self.t_rank,
            true,
        );
        self.is_reverse_valid = self.check_reverse
            && target.is_valid_seq_addition_for_tw(
                input,
                &edge_delivery,
                &Reversed(edge),
                self.t_rank,
                self.t_rank,
                true,
            );

        (self.is_normal_valid || self.is_reverse_valid)
            && range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && range_bounds_ok(
                ctx,
                self.t_vehicle,
                self.t_gain_normal.max(self.t_gain_reverse),
            )
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let edge: Vec<usize> = source.jobs()[self.s_rank..self.s_rank + 2].to_vec();
        let edge_delivery = seq_delivery(input, &edge[..]);

        if self.reverse_edge {
            target.replace(
                input,
                &edge_delivery,
                &Reversed(&edge),
                self.t_rank,
                self.t_rank,
            );
        } else {
            target.replace(input, &edge_delivery, &edge[..], self.t_rank, self.t_rank);
        }
        source.remove(input, self.s_rank, 2);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
