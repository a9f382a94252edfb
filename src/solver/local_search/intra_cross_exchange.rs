use crate::models::{Eval, Input, NO_GAIN};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Swap two consecutive-task edges within one route, optionally reversing
/// either.
pub struct IntraCrossExchange {
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    check_s_reverse: bool,
    check_t_reverse: bool,
    // Candidate sequences indexed by (reverse_s, reverse_t).
    seqs: Vec<(bool, bool, Vec<usize>)>,
    gains: Vec<Eval>,
    valids: Vec<bool>,
    chosen: usize,
    gain_computed: bool,
}

impl IntraCrossExchange {
    pub fn new(
        vehicle: usize,
        s_rank: usize,
        t_rank: usize,
        check_s_reverse: bool,
        check_t_reverse: bool,
    ) -> Self {
        debug_assert!(s_rank + 2 <= t_rank);
        IntraCrossExchange {
            vehicle,
            s_rank,
            t_rank,
            check_s_reverse,
            check_t_reverse,
            seqs: Vec::new(),
            gains: Vec::new(),
            valids: Vec::new(),
            chosen: 0,
            gain_computed: false,
        }
    }

    fn compute<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let jobs = ctx.routes[self.vehicle].jobs();
        let s_edge = [jobs[self.s_rank], jobs[self.s_rank + 1]];
        let t_edge = [jobs[self.t_rank], jobs[self.t_rank + 1]];
        let middle = &jobs[self.s_rank + 2..self.t_rank];

        let mut variants: Vec<(bool, bool)> = vec![(false, false)];
        if self.check_s_reverse {
            variants.push((true, false));
        }
        if self.check_t_reverse {
            variants.push((false, true));
        }
        if self.check_s_reverse && self.check_t_reverse {
            variants.push((true, true));
        }

        let input = ctx.input;
        let vehicle = &input.vehicles[self.vehicle];
        for (rev_s, rev_t) in variants {
            let mut seq = Vec::with_capacity(self.t_rank + 2 - self.s_rank);
            if rev_t {
                seq.extend([t_edge[1], t_edge[0]]);
            } else {
                seq.extend(t_edge);
            }
            seq.extend_from_slice(middle);
            if rev_s {
                seq.extend([s_edge[1], s_edge[0]]);
            } else {
                seq.extend(s_edge);
            }

            let gain = splice_gain(
                input,
                vehicle,
                jobs,
                self.s_rank,
                self.t_rank + 2,
                &seq[..],
            );
            self.seqs.push((rev_s, rev_t, seq));
            self.gains.push(gain);
            self.valids.push(false);
        }

        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for IntraCrossExchange {
    fn name(&self) -> &'static str {
        "intra_cross_exchange"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute(ctx);
        }
        *self.gains.iter().max().unwrap()
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute(ctx);
        }
        let mut best = NO_GAIN;
        for i in 0..self.gains.len() {
            if self.valids[i] && best < self.gains[i] {
                best = self.gains[i];
                self.chosen = i;
            }
        }
        best
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute(ctx);
        }

        let mut any = false;
        let mut best_gain = NO_GAIN;
        for i in 0..self.seqs.len() {
            let valid = intra_splice_valid(
                ctx,
                self.vehicle,
                self.s_rank,
                self.t_rank + 2,
                &self.seqs[i].2[..],
            );
            self.valids[i] = valid;
            if valid {
                any = true;
                best_gain = best_gain.max(self.gains[i]);
            }
        }

        any && range_bounds_ok(ctx, self.vehicle, best_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let seq = &self.seqs[self.chosen].2;
        let delivery = super::operator::seq_delivery(input, &seq[..]);
        route.replace(input, &delivery, &seq[..], self.s_rank, self.t_rank + 2);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        Vec::new()
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
