use crate::models::{Eval, Input};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Move one task to another position of the same route.
pub struct IntraRelocate {
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    first_rank: usize,
    last_rank: usize,
    seq: Vec<usize>,
    stored_gain: Eval,
    gain_computed: bool,
}

impl IntraRelocate {
    pub fn new(vehicle: usize, s_rank: usize, t_rank: usize) -> Self {
        debug_assert!(s_rank != t_rank);
        let (first_rank, last_rank) = if t_rank < s_rank {
            (t_rank, s_rank + 1)
        } else {
            (s_rank, t_rank + 1)
        };
        IntraRelocate {
            vehicle,
            s_rank,
            t_rank,
            first_rank,
            last_rank,
            seq: Vec::new(),
            stored_gain: Eval::default(),
            gain_computed: false,
        }
    }

    fn build_seq<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let jobs = ctx.routes[self.vehicle].jobs();
        let moved = jobs[self.s_rank];
        if self.t_rank < self.s_rank {
            self.seq = Vec::with_capacity(self.last_rank - self.first_rank);
            self.seq.push(moved);
            self.seq.extend_from_slice(&jobs[self.t_rank..self.s_rank]);
        } else {
            self.seq = jobs[self.s_rank + 1..=self.t_rank].to_vec();
            self.seq.push(moved);
        }
    }
}

impl<R: Route> Operator<R> for IntraRelocate {
    fn name(&self) -> &'static str {
        "intra_relocate"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.build_seq(ctx);
            self.stored_gain = splice_gain(
                ctx.input,
                &ctx.input.vehicles[self.vehicle],
                ctx.routes[self.vehicle].jobs(),
                self.first_rank,
                self.last_rank,
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
        intra_splice_valid(ctx, self.vehicle, self.first_rank, self.last_rank, &self.seq[..])
            && range_bounds_ok(ctx, self.vehicle, self.stored_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let delivery = super::operator::seq_delivery(input, &self.seq[..]);
        route.replace(input, &delivery, &self.seq[..], self.first_rank, self.last_rank);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        Vec::new()
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
