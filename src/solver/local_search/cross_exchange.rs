use crate::models::{Eval, Input, NO_GAIN};

use super::super::route::Route;
use super::super::sequence::Reversed;
use super::operator::{
    range_bounds_ok, seq_delivery, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Swap two consecutive-task edges across routes, optionally reversing
/// either moved edge.
pub struct CrossExchange {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    check_s_reverse: bool,
    check_t_reverse: bool,

    s_gain_normal: Eval,
    s_gain_reverse: Eval,
    t_gain_normal: Eval,
    t_gain_reverse: Eval,
    s_is_normal_valid: bool,
    s_is_reverse_valid: bool,
    t_is_normal_valid: bool,
    t_is_reverse_valid: bool,
    pub reverse_s_edge: bool,
    pub reverse_t_edge: bool,
    gain_computed: bool,
}

impl CrossExchange {
    pub fn new(
        s_vehicle: usize,
        s_rank: usize,
        t_vehicle: usize,
        t_rank: usize,
        check_s_reverse: bool,
        check_t_reverse: bool,
    ) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        CrossExchange {
            s_vehicle,
            s_rank,
            t_vehicle,
            t_rank,
            check_s_reverse,
            check_t_reverse,
            s_gain_normal: NO_GAIN,
            s_gain_reverse: NO_GAIN,
            t_gain_normal: NO_GAIN,
            t_gain_reverse: NO_GAIN,
            s_is_normal_valid: false,
            s_is_reverse_valid: false,
            t_is_normal_valid: false,
            t_is_reverse_valid: false,
            reverse_s_edge: false,
            reverse_t_edge: false,
            gain_computed: false,
        }
    }

    fn compute_gains<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let input = ctx.input;
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();
        let s_vehicle = &input.vehicles[self.s_vehicle];
        let t_vehicle = &input.vehicles[self.t_vehicle];

        let t_edge = &t_jobs[self.t_rank..self.t_rank + 2];
        let s_edge = &s_jobs[self.s_rank..self.s_rank + 2];

        // Source side receives the target edge.
        self.s_gain_normal = splice_gain(
            input,
            s_vehicle,
            s_jobs,
            self.s_rank,
            self.s_rank + 2,
            t_edge,
        );
        if self.check_t_reverse {
            self.s_gain_reverse = splice_gain(
                input,
                s_vehicle,
                s_jobs,
                self.s_rank,
                self.s_rank + 2,
                &Reversed(t_edge),
            );
        }

        // Target side receives the source edge.
        self.t_gain_normal = splice_gain(
            input,
            t_vehicle,
            t_jobs,
            self.t_rank,
            self.t_rank + 2,
            s_edge,
        );
        if self.check_s_reverse {
            self.t_gain_reverse = splice_gain(
                input,
                t_vehicle,
                t_jobs,
                self.t_rank,
                self.t_rank + 2,
                &Reversed(s_edge),
            );
        }

        self.gain_computed = true;
    }

    fn best_valid_gain(&mut self) -> Eval {
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
            (false, false) => NO_GAIN,
        };

        let t_best = match (self.t_is_normal_valid, self.t_is_reverse_valid) {
            (true, true) => {
                if self.t_gain_normal < self.t_gain_reverse {
                    self.reverse_s_edge = true;
                    self.t_gain_reverse
                } else {
                    self.reverse_s_edge = false;
                    self.t_gain_normal
                }
            }
            (true, false) => {
                self.reverse_s_edge = false;
                self.t_gain_normal
            }
            (false, true) => {
                self.reverse_s_edge = true;
                self.t_gain_reverse
            }
            (false, false) => NO_GAIN,
        };

        if s_best == NO_GAIN || t_best == NO_GAIN {
            NO_GAIN
        } else {
            s_best + t_best
        }
    }
}

impl<R: Route> Operator<R> for CrossExchange {
    fn name(&self) -> &'static str {
        "cross_exchange"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        let s_best = self.s_gain_normal.max(self.s_gain_reverse);
        let t_best = self.t_gain_normal.max(self.t_gain_reverse);
        s_best + t_best
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        self.best_valid_gain()
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
        let s_edge = &s_jobs[self.s_rank..self.s_rank + 2];
        let t_edge = &t_jobs[self.t_rank..self.t_rank + 2];

        let t_delivery = seq_delivery(input, t_edge);
        let s_delivery = seq_delivery(input, s_edge);

        // Capacity for the replacement fragments.
        let s_capacity_ok = source.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &t_delivery,
            t_edge,
            self.s_rank,
            self.s_rank + 2,
        );
        let t_capacity_ok = target.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &s_delivery,
            s_edge,
            self.t_rank,
            self.t_rank + 2,
        );
        if !s_capacity_ok || !t_capacity_ok {
            return false;
        }

        // Timing per orientation.
        self.s_is_normal_valid = source.is_valid_seq_addition_for_tw(
            input,
            &t_delivery,
            t_edge,
            self.s_rank,
            self.s_rank + 2,
            true,
        );
        self.s_is_reverse_valid = self.check_t_reverse
            && source.is_valid_seq_addition_for_tw(
                input,
                &t_delivery,
                &Reversed(t_edge),
                self.s_rank,
                self.s_rank + 2,
                true,
            );

        self.t_is_normal_valid = target.is_valid_seq_addition_for_tw(
            input,
            &s_delivery,
            s_edge,
            self.t_rank,
            self.t_rank + 2,
            true,
        );
        self.t_is_reverse_valid = self.check_s_reverse
            && target.is_valid_seq_addition_for_tw(
                input,
                &s_delivery,
                &Reversed(s_edge),
                self.t_rank,
                self.t_rank + 2,
                true,
            );

        // Range bounds against the best gains per side.
        let s_best = self.s_gain_normal.max(self.s_gain_reverse);
        let t_best = self.t_gain_normal.max(self.t_gain_reverse);

        (self.s_is_normal_valid || self.s_is_reverse_valid)
            && (self.t_is_normal_valid || self.t_is_reverse_valid)
            && range_bounds_ok(ctx, self.s_vehicle, s_best)
            && range_bounds_ok(ctx, self.t_vehicle, t_best)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_edge: Vec<usize> = source.jobs()[self.s_rank..self.s_rank + 2].to_vec();
        let t_edge: Vec<usize> = target.jobs()[self.t_rank..self.t_rank + 2].to_vec();
        let s_delivery = seq_delivery(input, &s_edge[..]);
        let t_delivery = seq_delivery(input, &t_edge[..]);

        if self.reverse_t_edge {
            source.replace(
                input,
                &t_delivery,
                &Reversed(&t_edge),
                self.s_rank,
                self.s_rank + 2,
            );
        } else {
            source.replace(input, &t_delivery, &t_edge[..], self.s_rank, self.s_rank + 2);
        }

        if self.reverse_s_edge {
            target.replace(
                input,
                &s_delivery,
                &Reversed(&s_edge),
                self.t_rank,
                self.t_rank + 2,
            );
        } else {
            target.replace(input, &s_delivery, &s_edge[..], self.t_rank, self.t_rank + 2);
        }
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
