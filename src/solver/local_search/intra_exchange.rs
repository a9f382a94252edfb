use crate::models::{Eval, Input};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Swap two tasks within one route.
pub struct IntraExchange {
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    seq: Vec<usize>,
    stored_gain: Eval,
    gain_computed: bool,
}

impl IntraExchange {
    pub fn new(vehicle: usize, s_rank: usize, t_rank: usize) -> Self {
        debug_assert!(s_rank + 2 <= t_rank);
        IntraExchange {
            vehicle,
            s_rank,
            t_rank,
            seq: Vec::new(),
            stored_gain: Eval::default(),
            gain_computed: false,
        }
    }

    fn build_seq<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let jobs = ctx.routes[self.vehicle].jobs();
        self.seq = jobs[self.s_rank..=self.t_rank].to_vec();
        let len = self.seq.len();
        self.seq.swap(0, len - 1);
    }
}

impl<R: Route> Operator<R> for IntraExchange {
    fn name(&self) -> &'static str {
        "intra_exchange"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.build_seq(ctx);
            self.stored_gain = splice_gain(
                ctx.input,
                &ctx.input.vehicles[self.vehicle],
                ctx.routes[self.vehicle].jobs(),
                self.s_rank,
                self.t_rank + 1,
                &self.seq[..],
            );
            self.gain_computed = true;
        }
        self.stored_gain
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.gain(ctx);
        }
        intra_splice_valid(ctx, self.vehicle, self.s_rank, self.t_rank + 1, &self.seq[..])
            && range_bounds_ok(ctx, self.vehicle, self.stored_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let delivery = super::operator::seq_delivery(input, &self.seq[..]);
        route.replace(input, &delivery, &self.seq[..], self.s_rank, self.t_rank + 1);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        Vec::new()
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
