use crate::models::{Eval, Input, Priority, NO_GAIN};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Evict a low-priority stretch at one end of a route to admit an
/// unassigned higher-priority job.
pub struct PriorityReplace {
    u: usize,
    vehicle: usize,
    s_rank: usize,
    start_gain: Eval,
    end_gain: Eval,
    start_priority_gain: Priority,
    end_priority_gain: Priority,
    start_valid: bool,
    end_valid: bool,
    pub replace_start: bool,
    evicted: Vec<usize>,
    gain_computed: bool,
    validity_computed: bool,
}

impl PriorityReplace {
    pub fn new(u: usize, vehicle: usize, s_rank: usize) -> Self {
        PriorityReplace {
            u,
            vehicle,
            s_rank,
            start_gain: NO_GAIN,
            end_gain: NO_GAIN,
            start_priority_gain: 0,
            end_priority_gain: 0,
            start_valid: false,
            end_valid: false,
            replace_start: false,
            evicted: Vec::new(),
            gain_computed: false,
            validity_computed: false,
        }
    }

    fn compute<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let input = ctx.input;
        let jobs = ctx.routes[self.vehicle].jobs();
        let u_priority = input.jobs[self.u].priority;

        // Replace the head [0; s_rank] with u.
        let head_priority = ctx.state.fwd_priority[self.vehicle][self.s_rank];
        if head_priority < u_priority {
            self.start_priority_gain = u_priority - head_priority;
            self.start_gain = splice_gain(
                input,
                &input.vehicles[self.vehicle],
                jobs,
                0,
                self.s_rank + 1,
                &[self.u][..],
            );
        }

        // Replace the tail [s_rank; n) with u.
        let tail_priority = ctx.state.bwd_priority[self.vehicle][self.s_rank];
        if tail_priority < u_priority {
            self.end_priority_gain = u_priority - tail_priority;
            self.end_gain = splice_gain(
                input,
                &input.vehicles[self.vehicle],
                jobs,
                self.s_rank,
                jobs.len(),
                &[self.u][..],
            );
        }

        self.gain_computed = true;
    }

    fn choose(&mut self) -> (Priority, Eval) {
        match (self.start_valid, self.end_valid) {
            (true, true) => {
                if (self.end_priority_gain, self.end_gain)
                    > (self.start_priority_gain, self.start_gain)
                {
                    self.replace_start = false;
                    (self.end_priority_gain, self.end_gain)
                } else {
                    self.replace_start = true;
                    (self.start_priority_gain, self.start_gain)
                }
            }
            (true, false) => {
                self.replace_start = true;
                (self.start_priority_gain, self.start_gain)
            }
            (false, true) => {
                self.replace_start = false;
                (self.end_priority_gain, self.end_gain)
            }
            (false, false) => (0, NO_GAIN),
        }
    }
}

impl<R: Route> Operator<R> for PriorityReplace {
    fn name(&self) -> &'static str {
        "priority_replace"
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute(ctx);
        }
        self.choose().1
    }

    fn priority_gain(&mut self, ctx: &LsCtx<R>) -> Priority {
        if !self.gain_computed {
            self.compute(ctx);
        }
        self.choose().0
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute(ctx);
        }
        if self.validity_computed {
            return self.start_valid || self.end_valid;
        }

        let n = ctx.routes[self.vehicle].size();

        self.start_valid = self.start_priority_gain > 0
            && !ctx.routes[self.vehicle]
                .raw()
                .has_pending_delivery_after_rank(self.s_rank)
            && intra_splice_valid(ctx, self.vehicle, 0, self.s_rank + 1, &[self.u][..])
            && range_bounds_ok(ctx, self.vehicle, self.start_gain);

        self.end_valid = self.end_priority_gain > 0
            && (self.s_rank == 0
                || !ctx.routes[self.vehicle]
                    .raw()
                    .has_pending_delivery_after_rank(self.s_rank - 1))
            && intra_splice_valid(ctx, self.vehicle, self.s_rank, n, &[self.u][..])
            && range_bounds_ok(ctx, self.vehicle, self.end_gain);

        self.validity_computed = true;
        self.start_valid || self.end_valid
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let delivery = input.jobs[self.u].delivery.clone();
        if self.replace_start {
            self.evicted = route.jobs()[..=self.s_rank].to_vec();
            route.replace(input, &delivery, &[self.u][..], 0, self.s_rank + 1);
        } else {
            let n = route.size();
            self.evicted = route.jobs()[self.s_rank..].to_vec();
            route.replace(input, &delivery, &[self.u][..], self.s_rank, n);
        }
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
        (vec![self.u], self.evicted.clone())
    }
}
