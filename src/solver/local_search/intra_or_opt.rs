use crate::models::{Eval, Input, NO_GAIN};

use super::super::route::Route;
use super::operator::{intra_splice_valid, range_bounds_ok, splice_gain, LsCtx, Operator};

/// Move a consecutive-task edge to another position of the same route,
/// optionally reversed.
pub struct IntraOrOpt {
    vehicle: usize,
    s_rank: usize,
    t_rank: usize,
    check_reverse: bool,
    first_rank: usize,
    last_rank: usize,
    seq_normal: Vec<usize>,
    seq_reverse: Vec<usize>,
    gain_normal: Eval,
    gain_reverse: Eval,
    is_normal_valid: bool,
    is_reverse_valid: bool,
    pub reverse_edge: bool,
    gain_computed: bool,
}

impl IntraOrOpt {
    /// `t_rank` is the insertion position in the original route, outside
    /// [s_rank; s_rank + 2].
    pub fn new(vehicle: usize, s_rank: usize, t_rank: usize, check_reverse: bool) -> Self {
        debug_assert!(t_rank < s_rank || s_rank + 2 < t_rank);
        let (first_rank, last_rank) = if t_rank < s_rank {
            (t_rank, s_rank + 2)
        } else {
            (s_rank, t_rank)
        };
        IntraOrOpt {
            vehicle,
            s_rank,
            t_rank,
            check_reverse,
            first_rank,
            last_rank,
            seq_normal: Vec::new(),
            seq_reverse: Vec::new(),
            gain_normal: NO_GAIN,
            gain_reverse: NO_GAIN,
            is_normal_valid: false,
            is_reverse_valid: false,
            reverse_edge: false,
            gain_computed: false,
        }
    }

    fn build_seqs<R: Route>(&mut self, ctx: &LsCtx<R>) {
        let jobs = ctx.routes[self.vehicle].jobs();
        let edge = [jobs[self.s_rank], jobs[self.s_rank + 1]];

        self.seq_normal = Vec::with_capacity(self.last_rank - self.first_rank);
        if self.t_rank < self.s_rank {
            self.seq_normal.extend_from_slice(&edge);
            self.seq_normal
                .extend_from_slice(&jobs[self.t_rank..self.s_rank]);
        } else {
            self.seq_normal
                .extend_from_slice(&jobs[self.s_rank + 2..self.t_rank]);
            self.seq_normal.extend_from_slice(&edge);
        }

        if self.check_reverse {
            self.seq_reverse = self.seq_normal.clone();
            let at = if self.t_rank < self.s_rank {
                0
            } else {
                self.seq_reverse.len() - 2
            };
            self.seq_reverse.swap(at, at + 1);
        }
    }

    fn compute_gains<R: Route>(&mut self, ctx: &LsCtx<R>) {
        self.build_seqs(ctx);
        let input = ctx.input;
        let vehicle = &input.vehicles[self.vehicle];
        let jobs = ctx.routes[self.vehicle].jobs();

        self.gain_normal = splice_gain(
            input,
            vehicle,
            jobs,
            self.first_rank,
            self.last_rank,
            &self.seq_normal[..],
        );
        if self.check_reverse {
            self.gain_reverse = splice_gain(
                input,
                vehicle,
                jobs,
                self.first_rank,
                self.last_rank,
                &self.seq_reverse[..],
            );
        }
        self.gain_computed = true;
    }
}

impl<R: Route> Operator<R> for IntraOrOpt {
    fn name(&self) -> &'static str {
        "intra_or_opt"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        self.gain_normal.max(self.gain_reverse)
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }
        match (self.is_normal_valid, self.is_reverse_valid) {
            (true, true) => {
                if self.gain_normal < self.gain_reverse {
                    self.reverse_edge = true;
                    self.gain_reverse
                } else {
                    self.reverse_edge = false;
                    self.gain_normal
                }
            }
            (true, false) => {
                self.reverse_edge = false;
                self.gain_normal
            }
            (false, true) => {
                self.reverse_edge = true;
                self.gain_reverse
            }
            (false, false) => NO_GAIN,
        }
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.gain_computed {
            self.compute_gains(ctx);
        }

        self.is_normal_valid = intra_splice_valid(
            ctx,
            self.vehicle,
            self.first_rank,
            self.last_rank,
            &self.seq_normal[..],
        );
        self.is_reverse_valid = self.check_reverse
            && intra_splice_valid(
                ctx,
                self.vehicle,
                self.first_rank,
                self.last_rank,
                &self.seq_reverse[..],
            );

        (self.is_normal_valid || self.is_reverse_valid)
            && range_bounds_ok(ctx, self.vehicle, self.gain_normal.max(self.gain_reverse))
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let route = &mut routes[self.vehicle];
        let seq = if self.reverse_edge {
            &self.seq_reverse
        } else {
            &self.seq_normal
        };
        let delivery = super::operator::seq_delivery(input, &seq[..]);
        route.replace(input, &delivery, &seq[..], self.first_rank, self.last_rank);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        Vec::new()
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.vehicle]
    }
}
