use crate::models::{Eval, Input, JobType, Vehicle, NO_GAIN};

use super::super::route::Route;
use super::operator::{
    intra_splice_valid, range_bounds_ok, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Best pair swap between two routes: remove one task from each side and
/// reinsert both at their locally-best positions in the other route.
pub struct SwapStar {
    s_vehicle: usize,
    t_vehicle: usize,

    best_s_rank: usize,
    best_t_rank: usize,
    best_s_insertion: usize,
    best_t_insertion: usize,
    stored_gain: Eval,
    found: bool,
    searched: bool,
}

struct SwapChoice {
    window_first: usize,
    window_last: usize,
    seq: Vec<usize>,
    gain: Eval,
}

/// Candidate splice for removing the task at `remove_rank` and inserting
/// `added_job` at `insert_rank` (original route coordinates).
fn swap_choice(
    input: &Input,
    vehicle: &Vehicle,
    jobs: &[usize],
    remove_rank: usize,
    added_job: usize,
    insert_rank: usize,
) -> SwapChoice {
    let (first, last) = if insert_rank <= remove_rank {
        (insert_rank, remove_rank + 1)
    } else {
        (remove_rank, insert_rank)
    };

    let mut seq = Vec::with_capacity(last - first);
    if insert_rank <= remove_rank {
        seq.push(added_job);
        seq.extend_from_slice(&jobs[insert_rank..remove_rank]);
    } else {
        seq.extend_from_slice(&jobs[remove_rank + 1..insert_rank]);
        seq.push(added_job);
    }

    let gain = splice_gain(input, vehicle, jobs, first, last, &seq[..]);
    SwapChoice {
        window_first: first,
        window_last: last,
        seq,
        gain,
    }
}

impl SwapStar {
    pub fn new(s_vehicle: usize, t_vehicle: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        SwapStar {
            s_vehicle,
            t_vehicle,
            best_s_rank: 0,
            best_t_rank: 0,
            best_s_insertion: 0,
            best_t_insertion: 0,
            stored_gain: NO_GAIN,
            found: false,
            searched: false,
        }
    }

    fn search<R: Route>(&mut self, ctx: &LsCtx<R>) {
        self.searched = true;

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let s_jobs = source.jobs();
        let t_jobs = target.jobs();

        for s_rank in 0..s_jobs.len() {
            if input.jobs[s_jobs[s_rank]].job_type != JobType::Single
                || !input.vehicle_ok_with_job(self.t_vehicle, s_jobs[s_rank])
            {
                continue;
            }

            for t_rank in 0..t_jobs.len() {
                if input.jobs[t_jobs[t_rank]].job_type != JobType::Single
                    || !input.vehicle_ok_with_job(self.s_vehicle, t_jobs[t_rank])
                {
                    continue;
                }

                // Cheap bound: both removal gains with free reinsertion.
                let upper = ctx.state.node_gains[self.s_vehicle][s_rank]
                    + ctx.state.node_gains[self.t_vehicle][t_rank];
                if upper <= self.stored_gain {
                    continue;
                }

                for s_insertion in 0..=s_jobs.len() {
                    let s_choice = swap_choice(
                        input,
                        &input.vehicles[self.s_vehicle],
                        s_jobs,
                        s_rank,
                        t_jobs[t_rank],
                        s_insertion,
                    );

                    for t_insertion in 0..=t_jobs.len() {
                        let t_choice = swap_choice(
                            input,
                            &input.vehicles[self.t_vehicle],
                            t_jobs,
                            t_rank,
                            s_jobs[s_rank],
                            t_insertion,
                        );

                        let total = s_choice.gain + t_choice.gain;
                        if total <= self.stored_gain {
                            continue;
                        }

                        let valid = intra_splice_valid(
                            ctx,
                            self.s_vehicle,
                            s_choice.window_first,
                            s_choice.window_last,
                            &s_choice.seq[..],
                        ) && intra_splice_valid(
                            ctx,
                            self.t_vehicle,
                            t_choice.window_first,
                            t_choice.window_last,
                            &t_choice.seq[..],
                        ) && range_bounds_ok(ctx, self.s_vehicle, s_choice.gain)
                            && range_bounds_ok(ctx, self.t_vehicle, t_choice.gain);

                        if valid {
                            self.stored_gain = total;
                            self.best_s_rank = s_rank;
                            self.best_t_rank = t_rank;
                            self.best_s_insertion = s_insertion;
                            self.best_t_insertion = t_insertion;
                            self.found = true;
                        }
                    }
                }
            }
        }
    }
}

impl<R: Route> Operator<R> for SwapStar {
    fn name(&self) -> &'static str {
        "swap_star"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        // Best removal gains on both sides bound any achievable swap.
        let s_best = (0..ctx.routes[self.s_vehicle].size())
            .map(|r| ctx.state.node_gains[self.s_vehicle][r])
            .max()
            .unwrap_or(NO_GAIN);
        let t_best = (0..ctx.routes[self.t_vehicle].size())
            .map(|r| ctx.state.node_gains[self.t_vehicle][r])
            .max()
            .unwrap_or(NO_GAIN);
        if s_best == NO_GAIN || t_best == NO_GAIN {
            return NO_GAIN;
        }
        s_best + t_best
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.searched {
            self.search(ctx);
        }
        if self.found {
            self.stored_gain
        } else {
            NO_GAIN
        }
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.searched {
            self.search(ctx);
        }
        self.found
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let s_job = source.jobs()[self.best_s_rank];
        let t_job = target.jobs()[self.best_t_rank];

        let s_choice = swap_choice(
            input,
            &input.vehicles[self.s_vehicle],
            source.jobs(),
            self.best_s_rank,
            t_job,
            self.best_s_insertion,
        );
        let t_choice = swap_choice(
            input,
            &input.vehicles[self.t_vehicle],
            target.jobs(),
            self.best_t_rank,
            s_job,
            self.best_t_insertion,
        );

        let s_delivery = super::operator::seq_delivery(input, &s_choice.seq[..]);
        source.replace(
            input,
            &s_delivery,
            &s_choice.seq[..],
            s_choice.window_first,
            s_choice.window_last,
        );
        let t_delivery = super::operator::seq_delivery(input, &t_choice.seq[..]);
        target.replace(
            input,
            &t_delivery,
            &t_choice.seq[..],
            t_choice.window_first,
            t_choice.window_last,
        );
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
