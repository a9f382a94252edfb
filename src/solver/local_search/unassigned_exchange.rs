use crate::models::{Eval, Input, Priority};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Swap one unassigned job against a route task, reinserting the newcomer
/// at its best position, improving priority or cost.
pub struct UnassignedExchange {
    u: usize,
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    first_rank: usize,
    last_rank: usize,
    removed: usize,
    seq: Vec<usize>,
    stored_gain: Eval,
    gain_computed: bool,
}

impl UnassignedExchange {
    /// `s_rank` is the task to evict, `t_rank` the insertion position for
    /// the unassigned job in the original route coordinates.
    pub fn new(u: usize, vehicle: usize, s_rank: usize, t_rank: usize) -> Self {
        let (first_rank, last_rank) = if t_rank <= s_rank {
            (t_rank, s_rank + 1)
        } else {
            (s_rank, t_rank)
        };
        UnassignedExchange {
            u,
            vehicle,
            s_rank,
            t_rank,
            first_rank,
            last_rank,
            removed: 0,
            seq: Vec::new(),
            stored_gain: Eval::default(),
            gain_computed: false,
        }
    }

    fn compute<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let jobs = ctx.routes[self.vehicle].jobs();
        self.removed = jobs[self.s_rank];

        self.seq = Vec::with_capacity(self.last_rank - self.first_rank);
        if self.t_rank <= self.s_rank {
            self.seq.push(self.u);
            self.seq.extend_from_slice(&jobs[self.t_rank..self.s_rank]);
        } else {
            self.seq.extend_from_slice(&jobs[self.s_rank + 1..self.t_rank]);
            self.seq.push(self.u);
        }

        self.stored_gain = splice_gain(
            ctx.input,
            &ctx.input.vehicles[self.vehicle],
            jobs,
            self.first_rank,
            self.last_rank,
            &self.seq[..],
        );
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for UnassignedExchange {
    fn name(&self) -> &'static str {
        "unassigned_exchange"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute(ctx);
        }
        self.stored_gain
    }

    fn priority_gain(&mut self, ctx: &LsCtx<R>) -> Priority {
        if !self.gain_computed {
            self.compute(ctx);
        }
        let u_priority = ctx.input.jobs[self.u].priority;
        let removed_priority = ctx.input.jobs[self.removed].priority;
        u_priority.saturating_sub(removed_priority)
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute(ctx);
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
        vec![self.vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }

    fn required_unassigned(&self) -> Vec<usize> {
        vec![self.u]
    }

    fn unassigned_changes(&self) -> (Vec<usize>, Vec<usize>) {
        (vec![self.u], vec![self.removed])
    }
}
