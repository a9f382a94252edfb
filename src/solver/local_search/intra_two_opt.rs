use crate::models::{Eval, Input};

use super::super::route::Route;
use super::super::sequence::Reversed;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Reverse the segment [s_rank; t_rank] of a route.
pub struct IntraTwoOpt {
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    stored_gain: Eval,
    gain_computed: bool,
}

impl IntraTwoOpt {
    pub fn new(vehicle: usize, s_rank: usize, t_rank: usize) -> Self {
        debug_assert!(s_rank < t_rank);
        IntraTwoOpt {
            vehicle,
            s_rank,
            t_rank,
            stored_gain: Eval::default(),
            gain_computed: false,
        }
    }
}

impl<R: Route> Operator<R> for IntraTwoOpt {
    fn name(&self) -> &'static str {
        "intra_two_opt"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            let jobs = ctx.routes[self.vehicle].jobs();
            let segment = &jobs[self.s_rank..=self.t_rank];
            self.stored_gain = splice_gain(
                ctx.input,
                &ctx.input.vehicles[self.vehicle],
                jobs,
                self.s_rank,
                self.t_rank + 1,
                &Reversed(segment),
            );
            self.gain_computed = true;
        }
        self.stored_gain
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.gain(ctx);
        }
        let jobs = ctx.routes[self.vehicle].jobs();
        let segment = &jobs[self.s_rank..=self.t_rank];

        intra_splice_valid(
            ctx,
            self.vehicle,
            self.s_rank,
            self.t_rank + 1,
            &Reversed(segment),
        ) && range_bounds_ok(ctx, self.vehicle, self.stored_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let segment: Vec<usize> = route.jobs()[self.s_rank..=self.t_rank].to_vec();
        let delivery = super::operator::seq_delivery(input, &segment[..]);
        route.replace(
            input,
            &delivery,
            &Reversed(&segment),
            self.s_rank,
            self.t_rank + 1,
        );
    }

    fn addition_candidates(&self) -> Vec<usize> {
        Vec::new()
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
