use crate::models::{Eval, Input};

use super::super::route::Route;
use super::super::sequence::Reversed;
use super::operator::{
    range_bounds_ok, seq_delivery, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Exchange route portions with a direction flip: the source tail, reversed,
/// lands at the head of the target while the target head, reversed, extends
/// the source.
pub struct ReverseTwoOpt {
    s_vehicle: usize,
    s_rank: usize,
    t_vehicle: usize,
    t_rank: usize,
    s_gain: Eval,
    t_gain: Eval,
    gain_computed: bool,
}

impl ReverseTwoOpt {
    pub fn new(s_vehicle: usize, s_rank: usize, t_vehicle: usize, t_rank: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        ReverseTwoOpt {
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
        let input = ctx.input;
        let s_jobs = ctx.routes[self.s_vehicle].jobs();
        let t_jobs = ctx.routes[self.t_vehicle].jobs();

        let s_tail = &s_jobs[self.s_rank + 1..];
        let t_head = &t_jobs[..=self.t_rank];

        // Source tail gets replaced by the reversed target head.
        self.s_gain = splice_gain(
            input,
            &input.vehicles[self.s_vehicle],
            s_jobs,
            self.s_rank + 1,
            s_jobs.len(),
            &Reversed(t_head),
        );
        // Target head gets replaced by the reversed source tail.
        self.t_gain = splice_gain(
            input,
            &input.vehicles[self.t_vehicle],
            t_jobs,
            0,
            self.t_rank + 1,
            &Reversed(s_tail),
        );
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for ReverseTwoOpt {
    fn name(&self) -> &'static str {
        "reverse_two_opt"
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
        let s_jobs = source.jobs();
        let t_jobs = target.jobs();
        let s_tail = &s_jobs[self.s_rank + 1..];
        let t_head = &t_jobs[..=self.t_rank];

        // Exchanged portions must fit the other vehicle's skills.
        if ctx.state.bwd_skill_rank[self.s_vehicle][self.t_vehicle] > self.s_rank + 1
            || ctx.state.fwd_skill_rank[self.t_vehicle][self.s_vehicle] <= self.t_rank
        {
            return false;
        }

        let new_s_size = self.s_rank + 1 + t_head.len();
        let new_t_size = t_jobs.len() - t_head.len() + s_tail.len();
        if input.vehicles[self.s_vehicle].max_tasks < new_s_size
            || input.vehicles[self.t_vehicle].max_tasks < new_t_size
        {
            return false;
        }

        let t_head_delivery = seq_delivery(input, t_head);
        let s_tail_delivery = seq_delivery(input, s_tail);

        source.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &t_head_delivery,
            &Reversed(t_head),
            self.s_rank + 1,
            s_jobs.len(),
        ) && target.raw().is_valid_addition_for_capacity_inclusion(
            input,
            &s_tail_delivery,
            &Reversed(s_tail),
            0,
            self.t_rank + 1,
        ) && source.is_valid_seq_addition_for_tw(
            input,
            &t_head_delivery,
            &Reversed(t_head),
            self.s_rank + 1,
            s_jobs.len(),
            true,
        ) && target.is_valid_seq_addition_for_tw(
            input,
            &s_tail_delivery,
            &Reversed(s_tail),
            0,
            self.t_rank + 1,
            true,
        ) && range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_tail: Vec<usize> = source.jobs()[self.s_rank + 1..].to_vec();
        let t_head: Vec<usize> = target.jobs()[..=self.t_rank].to_vec();

        let s_len = source.size();
        let t_head_delivery = seq_delivery(input, &t_head[..]);
        let s_tail_delivery = seq_delivery(input, &s_tail[..]);

        source.replace(
            input,
            &t_head_delivery,
            &Reversed(&t_head),
            self.s_rank + 1,
            s_len,
        );
        target.replace(
            input,
            &s_tail_delivery,
            &Reversed(&s_tail),
            0,
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
