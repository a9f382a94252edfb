use crate::models::{Eval, Input, NO_EVAL, NO_GAIN};
use crate::utils::route_eval_for_vehicle;

use super::super::route::Route;
use super::operator::{seq_delivery, LsCtx, Operator};

/// Split one route in two, dispatching each half to a currently-empty
/// vehicle; the best split point minimises the sum of the two new route
/// evaluations.
pub struct RouteSplit {
    s_vehicle: usize,
    empty_route_ranks: Vec<usize>,

    split_rank: usize,
    v_begin: usize,
    v_end: usize,
    stored_gain: Eval,
    found: bool,
    searched: bool,
}

impl RouteSplit {
    pub fn new(s_vehicle: usize, empty_route_ranks: Vec<usize>) -> Self {
        RouteSplit {
            s_vehicle,
            empty_route_ranks,
            split_rank: 0,
            v_begin: 0,
            v_end: 0,
            stored_gain: NO_GAIN,
            found: false,
            searched: false,
        }
    }

    fn search<R: Route>(&mut self, ctx: &LsCtx<R>) {
        self.searched = true;

        let input = ctx.input;
        let source = &ctx.routes[self.s_vehicle];
        let jobs = source.jobs();
        let init_eval = ctx.state.route_evals[self.s_vehicle];

        // Splitting in two "real" routes, so start at 1.
        for r in 1..source.size() {
            if source.raw().has_pending_delivery_after_rank(r - 1) {
                continue;
            }

            let end_half = &jobs[r..];
            let end_max_load = source.raw().sub_route_max_load_after(r);
            let end_delivery = source.raw().delivery_in_range(r, source.size());

            // Best and second-best vehicle for the end half.
            let mut first_end = (NO_EVAL, 0usize);
            let mut second_end = (NO_EVAL, 0usize);

            for (v_pos, &v) in self.empty_route_ranks.iter().enumerate() {
                let end_v = &input.vehicles[v];

                if ctx.state.bwd_skill_rank[self.s_vehicle][v] > r
                    || !(&end_max_load <= &end_v.capacity)
                    || end_v.max_tasks < end_half.len()
                {
                    continue;
                }

                let current_end_eval = route_eval_for_vehicle(input, v, end_half);
                if !end_v.ok_for_range_bounds(&current_end_eval) {
                    continue;
                }

                if current_end_eval < second_end.0 {
                    let empty: R = Route::new(input, v);
                    if empty.is_valid_seq_addition_for_tw(
                        input,
                        &end_delivery,
                        end_half,
                        0,
                        0,
                        true,
                    ) {
                        if current_end_eval < first_end.0 {
                            second_end = first_end;
                            first_end = (current_end_eval, v_pos);
                        } else {
                            second_end = (current_end_eval, v_pos);
                        }
                    }
                }
            }

            if first_end.0 == NO_EVAL {
                continue;
            }

            if init_eval - first_end.0 <= self.stored_gain {
                // The begin half can only lower the gain further.
                continue;
            }

            let begin_half = &jobs[..r];
            let begin_max_load = source.raw().sub_route_max_load_before(r);
            let begin_delivery = source.raw().delivery_in_range(0, r);

            let mut first_begin = (NO_EVAL, 0usize);
            let mut second_begin = (NO_EVAL, 0usize);

            for (v_pos, &v) in self.empty_route_ranks.iter().enumerate() {
                let begin_v = &input.vehicles[v];

                if ctx.state.fwd_skill_rank[self.s_vehicle][v] < r
                    || !(&begin_max_load <= &begin_v.capacity)
                    || begin_v.max_tasks < r
                {
                    continue;
                }

                let current_begin_eval = route_eval_for_vehicle(input, v, begin_half);
                if !begin_v.ok_for_range_bounds(&current_begin_eval) {
                    continue;
                }

                if current_begin_eval < second_begin.0 {
                    let empty: R = Route::new(input, v);
                    if empty.is_valid_seq_addition_for_tw(
                        input,
                        &begin_delivery,
                        begin_half,
                        0,
                        0,
                        true,
                    ) {
                        if current_begin_eval < first_begin.0 {
                            second_begin = first_begin;
                            first_begin = (current_begin_eval, v_pos);
                        } else {
                            second_begin = (current_begin_eval, v_pos);
                        }
                    }
                }
            }

            if first_begin.0 == NO_EVAL {
                continue;
            }

            // Use distinct vehicles for the two halves.
            let (begin_eval, begin_pos, end_eval, end_pos) =
                if first_begin.1 != first_end.1 {
                    (first_begin.0, first_begin.1, first_end.0, first_end.1)
                } else {
                    let use_second_begin = second_begin.0 != NO_EVAL
                        && (second_end.0 == NO_EVAL
                            || second_begin.0 - first_begin.0 <= second_end.0 - first_end.0);
                    if use_second_begin {
                        (second_begin.0, second_begin.1, first_end.0, first_end.1)
                    } else if second_end.0 != NO_EVAL {
                        (first_begin.0, first_begin.1, second_end.0, second_end.1)
                    } else {
                        continue;
                    }
                };

            let gain = init_eval - begin_eval - end_eval;
            if self.stored_gain < gain {
                self.stored_gain = gain;
                self.split_rank = r;
                self.v_begin = self.empty_route_ranks[begin_pos];
                self.v_end = self.empty_route_ranks[end_pos];
                self.found = true;
            }
        }
    }
}

impl<R: Route> Operator<R> for RouteSplit {
    fn name(&self) -> &'static str {
        "route_split"
    }

    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        // Emptying the route entirely bounds any split.
        ctx.state.route_evals[self.s_vehicle]
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
        let jobs: Vec<usize> = routes[self.s_vehicle].jobs().to_vec();
        let (begin_half, end_half) = jobs.split_at(self.split_rank);

        let begin_delivery = seq_delivery(input, begin_half);
        routes[self.v_begin].replace(input, &begin_delivery, begin_half, 0, 0);

        let end_delivery = seq_delivery(input, end_half);
        routes[self.v_end].replace(input, &end_delivery, end_half, 0, 0);

        let source_size = routes[self.s_vehicle].size();
        routes[self.s_vehicle].remove(input, 0, source_size);
    }

    fn addition_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.v_begin, self.v_end]
    }

    fn update_candidates(&self) -> Vec<usize> {
        vec![self.s_vehicle, self.v_begin, self.v_end]
    }
}
