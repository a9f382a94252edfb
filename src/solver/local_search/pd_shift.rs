use crate::models::{Amount, Eval, Input, JobType, NO_EVAL, NO_GAIN};
use crate::utils::{addition_cost, in_place_pd_addition_cost};

use super::super::route::Route;
use super::operator::{
    range_bounds_ok, seq_delivery, splice_gain, two_routes_mut, LsCtx, Operator,
};

/// Move a pickup-delivery pair from the source route into the target route,
/// re-optimising the insertion positions.
pub struct PdShift {
    s_vehicle: usize,
    s_p_rank: usize,
    s_d_rank: usize,
    t_vehicle: usize,

    s_gain: Eval,
    t_gain: Eval,
    best_t_pickup_rank: usize,
    best_t_delivery_rank: usize,
    best_t_delivery: Amount,
    found: bool,
    searched: bool,
}

impl PdShift {
    pub fn new(s_vehicle: usize, s_p_rank: usize, s_d_rank: usize, t_vehicle: usize) -> Self {
        debug_assert!(s_vehicle != t_vehicle);
        debug_assert!(s_p_rank < s_d_rank);
        PdShift {
            s_vehicle,
            s_p_rank,
            s_d_rank,
            t_vehicle,
            s_gain: Eval::default(),
            t_gain: NO_GAIN,
            best_t_pickup_rank: 0,
            best_t_delivery_rank: 0,
            best_t_delivery: Amount::default(),
            found: false,
            searched: false,
        }
    }

    fn search<R: Route>(&mut self, ctx: &LsCtx<R>) {
        self.searched = true;

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let target = &ctx.routes[self.t_vehicle];
        let vehicle = &input.vehicles[self.t_vehicle];
        let s_jobs = source.jobs();
        let p_rank = s_jobs[self.s_p_rank];
        let pickup_job = &input.jobs[p_rank];

        // Source side: splice out the pair, keeping what sits in between.
        let kept: Vec<usize> = s_jobs[self.s_p_rank + 1..self.s_d_rank].to_vec();
        self.s_gain = splice_gain(
            input,
            &input.vehicles[self.s_vehicle],
            s_jobs,
            self.s_p_rank,
            self.s_d_rank + 1,
            &kept[..],
        );

        if target.size() + 2 > vehicle.max_tasks {
            return;
        }

        // Target side: cheapest valid insertion, pickup first.
        let t_jobs = target.jobs();
        let mut d_adds = Vec::with_capacity(t_jobs.len() + 1);
        let mut valid_delivery_insertions = Vec::with_capacity(t_jobs.len() + 1);
        for d_rank in 0..=t_jobs.len() {
            d_adds.push(addition_cost(input, p_rank + 1, vehicle, t_jobs, d_rank));
            valid_delivery_insertions.push(
                target.is_valid_addition_for_tw_without_max_load(input, p_rank + 1, d_rank),
            );
        }

        let mut best_eval = NO_EVAL;

        for pickup_r in 0..=t_jobs.len() {
            let p_add = addition_cost(input, p_rank, vehicle, t_jobs, pickup_r);

            if !target
                .raw()
                .is_valid_addition_for_load(&pickup_job.pickup, pickup_r)
                || !target.is_valid_addition_for_tw_without_max_load(input, p_rank, pickup_r)
            {
                continue;
            }

            let mut modified_with_pd = Vec::with_capacity(t_jobs.len() - pickup_r + 2);
            modified_with_pd.push(p_rank);
            let mut modified_delivery = input.zero_amount().clone();

            for delivery_r in pickup_r..=t_jobs.len() {
                if pickup_r < delivery_r {
                    let modified_job = t_jobs[delivery_r - 1];
                    modified_with_pd.push(modified_job);
                    if input.jobs[modified_job].job_type == JobType::Single {
                        modified_delivery += &input.jobs[modified_job].delivery;
                    }
                }

                if !valid_delivery_insertions[delivery_r] {
                    continue;
                }

                let current_eval = if pickup_r == delivery_r {
                    in_place_pd_addition_cost(input, p_rank, vehicle, t_jobs, pickup_r)
                } else {
                    p_add + d_adds[delivery_r]
                };

                if current_eval < best_eval {
                    modified_with_pd.push(p_rank + 1);

                    let valid = target.raw().is_valid_addition_for_capacity_inclusion(
                        input,
                        &modified_delivery,
                        &modified_with_pd[..],
                        pickup_r,
                        delivery_r,
                    ) && target.is_valid_seq_addition_for_tw(
                        input,
                        &modified_delivery,
                        &modified_with_pd[..],
                        pickup_r,
                        delivery_r,
                        true,
                    );

                    modified_with_pd.pop();

                    if valid {
                        best_eval = current_eval;
                        self.best_t_pickup_rank = pickup_r;
                        self.best_t_delivery_rank = delivery_r;
                        self.best_t_delivery = modified_delivery.clone();
                        self.found = true;
                    }
                }
            }
        }

        if self.found {
            self.t_gain = -best_eval;
        }
    }
}

impl<R: Route> Operator<R> for PdShift {
    fn name(&self) -> &'static str {
        "pd_shift"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        ctx.state.pd_gains[self.s_vehicle][self.s_p_rank]
    }

    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval {
        if !self.searched {
            self.search(ctx);
        }
        if !self.found {
            return NO_GAIN;
        }
        self.s_gain + self.t_gain
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool {
        if !self.searched {
            self.search(ctx);
        }
        if !self.found {
            return false;
        }

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let kept: Vec<usize> = source.jobs()[self.s_p_rank + 1..self.s_d_rank].to_vec();
        let kept_delivery = seq_delivery(input, &kept[..]);

        source.is_valid_seq_addition_for_tw(
            input,
            &kept_delivery,
            &kept[..],
            self.s_p_rank,
            self.s_d_rank + 1,
            true,
        ) && range_bounds_ok(ctx, self.s_vehicle, self.s_gain)
            && range_bounds_ok(ctx, self.t_vehicle, self.t_gain)
    }

    fn apply(&mut self, input: &Input, routes: &mut [R]) {
        let (source, target) = two_routes_mut(routes, self.s_vehicle, self.t_vehicle);
        let p_rank = source.jobs()[self.s_p_rank];

        let mut modified_with_pd =
            Vec::with_capacity(self.best_t_delivery_rank - self.best_t_pickup_rank + 2);
        modified_with_pd.push(p_rank);
        modified_with_pd.extend_from_slice(
            &target.jobs()[self.best_t_pickup_rank..self.best_t_delivery_rank],
        );
        modified_with_pd.push(p_rank + 1);

        target.replace(
            input,
            &self.best_t_delivery,
            &modified_with_pd[..],
            self.best_t_pickup_rank,
            self.best_t_delivery_rank,
        );

        let kept: Vec<usize> = source.jobs()[self.s_p_rank + 1..self.s_d_rank].to_vec();
        let kept_delivery = seq_delivery(input, &kept[..]);
        source.replace(
            input,
            &kept_delivery,
            &kept[..],
            self.s_p_rank,
            self.s_d_rank + 1,
        );
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.t_vehicle]
    }
}
