pub mod cross_exchange;
pub mod exchange;
pub mod intra_cross_exchange;
pub mod intra_exchange;
pub mod intra_mixed_exchange;
pub mod intra_or_opt;
pub mod intra_relocate;
pub mod intra_two_opt;
pub mod mixed_exchange;
pub mod operator;
pub mod or_opt;
pub mod pd_shift;
pub mod priority_replace;
pub mod relocate;
pub mod reverse_two_opt;
pub mod route_exchange;
pub mod route_fix;
pub mod route_split;
pub mod swap_star;
pub mod two_opt;
pub mod unassigned_exchange;

use std::collections::BTreeSet;
use std::time::Instant;

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::config;
use crate::models::{Amount, Eval, Input, JobType, Priority};
use crate::utils::{addition_cost, in_place_pd_addition_cost};

use self::cross_exchange::CrossExchange;
use self::exchange::Exchange;
use self::intra_cross_exchange::IntraCrossExchange;
use self::intra_exchange::IntraExchange;
use self::intra_mixed_exchange::IntraMixedExchange;
use self::intra_or_opt::IntraOrOpt;
use self::intra_relocate::IntraRelocate;
use self::intra_two_opt::IntraTwoOpt;
use self::mixed_exchange::MixedExchange;
use self::operator::{both_single, movable_edge, LsCtx, Operator};
use self::or_opt::OrOpt;
use self::pd_shift::PdShift;
use self::priority_replace::PriorityReplace;
use self::relocate::Relocate;
use self::reverse_two_opt::ReverseTwoOpt;
use self::route_exchange::RouteExchange;
use self::route_fix::RouteFix;
use self::route_split::RouteSplit;
use self::swap_star::SwapStar;
use self::two_opt::TwoOpt;
use self::unassigned_exchange::UnassignedExchange;

use super::indicators::SolutionIndicators;
use super::route::Route;
use super::state::SolutionState;

/// One improvement recorded for the optional search log.
#[derive(Clone, Debug)]
pub struct SearchLogEntry {
    pub iteration: usize,
    pub operator: &'static str,
    pub gain_cost: i64,
}

type BoxedOp<R> = Box<dyn Operator<R>>;
type MoveKey = (Priority, Eval);

const NO_MOVE: MoveKey = (
    0,
    Eval {
        cost: 0,
        duration: 0,
        distance: 0,
        task_duration: 0,
    },
);

/// Neighbourhood-based local search: best-move steps over a per-vehicle-pair
/// candidate cache, job additions when moves dry up, and ruin-and-recreate
/// perturbation with a doubling removal count.
pub struct LocalSearch<'a, R: Route> {
    input: &'a Input,
    routes: Vec<R>,
    unassigned: BTreeSet<usize>,
    state: SolutionState,
    depth: usize,
    deadline: Option<Instant>,
    rng: ChaCha8Rng,

    // best_moves[s][t] caches the best candidate for the (s, t) vehicle
    // pair: intra families and unassigned-based moves on the diagonal,
    // symmetric families for s < t, asymmetric ones on ordered pairs.
    best_moves: Vec<Vec<Option<(MoveKey, BoxedOp<R>)>>>,
    dirty: Vec<Vec<bool>>,

    best_routes: Vec<R>,
    best_unassigned: BTreeSet<usize>,
    best_indicators: SolutionIndicators,

    iteration: usize,
    pub log: Vec<SearchLogEntry>,
}

impl<'a, R: Route> LocalSearch<'a, R> {
    pub fn new(
        input: &'a Input,
        routes: Vec<R>,
        unassigned: BTreeSet<usize>,
        depth: usize,
        deadline: Option<Instant>,
        rng: ChaCha8Rng,
    ) -> Self {
        let nb_vehicles = input.vehicles.len();
        let mut state = SolutionState::new(input);
        state.setup(input, &routes);

        let best_indicators = SolutionIndicators::new(input, &routes);

        LocalSearch {
            input,
            best_routes: routes.clone(),
            best_unassigned: unassigned.clone(),
            routes,
            unassigned,
            state,
            depth,
            deadline,
            rng,
            best_moves: (0..nb_vehicles)
                .map(|_| (0..nb_vehicles).map(|_| None).collect())
                .collect(),
            dirty: vec![vec![true; nb_vehicles]; nb_vehicles],
            best_indicators,
            iteration: 0,
            log: Vec::new(),
        }
    }

    fn out_of_time(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Main loop: best-move descent, then perturbation rounds with the
    /// removal count doubling on failure and halving on success, bounded by
    /// the exploration depth and the deadline.
    pub fn run(
        mut self,
    ) -> (Vec<R>, BTreeSet<usize>, SolutionIndicators, Vec<SearchLogEntry>) {
        self.run_ls_step();
        self.checkpoint();

        let max_nb_jobs_removal = 1usize << self.depth;
        let mut nb_removal = 1;

        while self.depth > 0 && !self.out_of_time() {
            self.remove_jobs(nb_removal);
            self.mark_all_dirty();
            self.try_job_additions();
            self.run_ls_step();

            let indicators = SolutionIndicators::new(self.input, &self.routes);
            if indicators < self.best_indicators {
                self.best_indicators = indicators;
                self.best_routes = self.routes.clone();
                self.best_unassigned = self.unassigned.clone();
                nb_removal = (nb_removal / 2).max(1);
                debug!(
                    cost = self.best_indicators.eval.cost,
                    assigned = self.best_indicators.assigned,
                    "new best from perturbation"
                );
            } else {
                if nb_removal == max_nb_jobs_removal {
                    break;
                }
                nb_removal = (2 * nb_removal).min(max_nb_jobs_removal);
            }
        }

        (
            self.best_routes,
            self.best_unassigned,
            self.best_indicators,
            self.log,
        )
    }

    fn checkpoint(&mut self) {
        let indicators = SolutionIndicators::new(self.input, &self.routes);
        if indicators < self.best_indicators {
            self.best_indicators = indicators;
            self.best_routes = self.routes.clone();
            self.best_unassigned = self.unassigned.clone();
        }
    }

    fn mark_all_dirty(&mut self) {
        for row in self.dirty.iter_mut() {
            for d in row.iter_mut() {
                *d = true;
            }
        }
    }

    /// Invalidate cached pair moves after vehicles in `updated` changed:
    /// structurally for pairs involving them, and through the stored
    /// operators' own `invalidated_by` / `required_unassigned` answers.
    fn invalidate(&mut self, updated: &[usize], unassigned_changed: bool) {
        let nb = self.routes.len();
        for s in 0..nb {
            for t in 0..nb {
                let mut stale = updated.iter().any(|&u| u == s || u == t);
                if !stale {
                    if let Some((_, op)) = &self.best_moves[s][t] {
                        stale = updated.iter().any(|&u| op.invalidated_by(u))
                            || op
                                .required_unassigned()
                                .iter()
                                .any(|j| !self.unassigned.contains(j));
                    }
                }
                if unassigned_changed && s == t {
                    // Diagonal buckets hold the unassigned-based families.
                    stale = true;
                }
                if stale {
                    self.dirty[s][t] = true;
                    self.best_moves[s][t] = None;
                }
            }
        }
    }

    /// Apply best-gain valid moves until none improves, trying job
    /// additions whenever the move pool dries up.
    fn run_ls_step(&mut self) {
        self.mark_all_dirty();

        loop {
            self.refresh_dirty_buckets();

            let chosen = self.pick_best_pair();

            match chosen {
                Some((s, t)) => {
                    let (_, mut op) = self.best_moves[s][t].take().expect("picked empty bucket");
                    self.iteration += 1;
                    let gain = {
                        let ctx = LsCtx {
                            input: self.input,
                            state: &self.state,
                            routes: &self.routes,
                        };
                        op.gain(&ctx)
                    };
                    trace!(operator = op.name(), gain = gain.cost, "applying move");
                    self.log.push(SearchLogEntry {
                        iteration: self.iteration,
                        operator: op.name(),
                        gain_cost: gain.cost,
                    });

                    op.apply(self.input, &mut self.routes);

                    let (now_assigned, now_unassigned) = op.unassigned_changes();
                    let unassigned_changed =
                        !now_assigned.is_empty() || !now_unassigned.is_empty();
                    for j in now_assigned {
                        self.unassigned.remove(&j);
                    }
                    for j in now_unassigned {
                        self.unassigned.insert(j);
                    }

                    let updated = op.update_candidates();
                    for &v in &updated {
                        self.refresh_vehicle(v);
                    }
                    self.invalidate(&updated, unassigned_changed);

                    if self.out_of_time() {
                        self.checkpoint();
                        return;
                    }
                }
                None => {
                    // Local optimum for moves: fall back to job additions.
                    if !self.try_job_additions() || self.out_of_time() {
                        break;
                    }
                }
            }
        }
        self.checkpoint();
    }

    fn refresh_dirty_buckets(&mut self) {
        let nb = self.routes.len();
        for s in 0..nb {
            for t in 0..nb {
                if !self.dirty[s][t] {
                    continue;
                }
                self.best_moves[s][t] = self.compute_bucket(s, t);
                self.dirty[s][t] = false;
            }
        }
    }

    fn pick_best_pair(&self) -> Option<(usize, usize)> {
        let mut best_key = NO_MOVE;
        let mut chosen = None;
        for (s, row) in self.best_moves.iter().enumerate() {
            for (t, entry) in row.iter().enumerate() {
                if let Some((key, _)) = entry {
                    if *key > best_key {
                        best_key = *key;
                        chosen = Some((s, t));
                    }
                }
            }
        }
        chosen
    }

    fn refresh_vehicle(&mut self, v: usize) {
        self.state.update_route(self.input, &self.routes, v);
        for other in 0..self.routes.len() {
            if other != v {
                self.state
                    .update_cheapest_job_rank_in_routes(self.input, &self.routes, v, other);
                self.state
                    .update_cheapest_job_rank_in_routes(self.input, &self.routes, other, v);
            }
        }
    }

    fn pair_applicable(&self, v1: usize, v2: usize) -> bool {
        if !self.input.vehicle_ok_with_vehicle(v1, v2) {
            return false;
        }
        if self.input.all_locations_have_coords() {
            return self.state.route_bbox[v1].intersects(&self.state.route_bbox[v2]);
        }
        true
    }

    /// Best candidate of the (s, t) bucket, enumerating its families in
    /// fixed order so ties stay deterministic.
    fn compute_bucket(&self, s_v: usize, t_v: usize) -> Option<(MoveKey, BoxedOp<R>)> {
        let ctx = LsCtx {
            input: self.input,
            state: &self.state,
            routes: &self.routes,
        };

        let mut best: Option<(MoveKey, BoxedOp<R>)> = None;

        if s_v == t_v {
            self.diagonal_bucket(&ctx, s_v, &mut best);
        } else {
            if !self.pair_applicable(s_v, t_v) {
                return None;
            }
            self.inter_bucket(&ctx, s_v, t_v, &mut best);
        }

        best
    }

    /// Intra-route, unassigned-based and whole-route families for one
    /// vehicle.
    fn diagonal_bucket(
        &self,
        ctx: &LsCtx<R>,
        v: usize,
        best: &mut Option<(MoveKey, BoxedOp<R>)>,
    ) {
        let input = self.input;
        let size = self.routes[v].size();
        let nb_vehicles = self.routes.len();

        // Unassigned-based families carry priority gains, try them first.
        for &u in self.unassigned.iter() {
            if input.jobs[u].job_type != JobType::Single
                || !input.vehicle_ok_with_job(v, u)
                || self.routes[v].empty()
            {
                continue;
            }
            for s_rank in 0..size {
                if input.jobs[self.routes[v].jobs()[s_rank]].job_type != JobType::Single {
                    continue;
                }
                for t_rank in 0..=size {
                    if t_rank == s_rank + 1 {
                        // Same spot as the in-place swap at s_rank.
                        continue;
                    }
                    consider(ctx, Box::new(UnassignedExchange::new(u, v, s_rank, t_rank)), best);
                }
            }

            if input.jobs[u].priority > 0 {
                for s_rank in 0..size {
                    consider(ctx, Box::new(PriorityReplace::new(u, v, s_rank)), best);
                }
            }
        }

        let jobs: Vec<usize> = self.routes[v].jobs().to_vec();

        for s_rank in 0..size {
            let s_single = input.jobs[jobs[s_rank]].job_type == JobType::Single;

            if s_single {
                for t_rank in (s_rank + 2)..size {
                    if input.jobs[jobs[t_rank]].job_type == JobType::Single {
                        consider(ctx, Box::new(IntraExchange::new(v, s_rank, t_rank)), best);
                    }
                }
                for t_rank in 0..size {
                    if t_rank != s_rank {
                        consider(ctx, Box::new(IntraRelocate::new(v, s_rank, t_rank)), best);
                    }
                }
                for t_rank in (s_rank + 2)..size.saturating_sub(1) {
                    if movable_edge(input, &jobs, t_rank) {
                        consider(
                            ctx,
                            Box::new(IntraMixedExchange::new(
                                v,
                                s_rank,
                                t_rank,
                                both_single(input, &jobs, t_rank),
                            )),
                            best,
                        );
                    }
                }
                // Edge earlier in the route, task later.
                for t_rank in 0..s_rank.saturating_sub(1) {
                    if movable_edge(input, &jobs, t_rank) {
                        consider(
                            ctx,
                            Box::new(IntraMixedExchange::new(
                                v,
                                s_rank,
                                t_rank,
                                both_single(input, &jobs, t_rank),
                            )),
                            best,
                        );
                    }
                }
                // Segment reversal over all-single stretches.
                for t_rank in (s_rank + 1)..size {
                    if all_single(input, &jobs[s_rank..=t_rank]) {
                        consider(ctx, Box::new(IntraTwoOpt::new(v, s_rank, t_rank)), best);
                    }
                }
            }

            if s_rank + 1 < size && movable_edge(input, &jobs, s_rank) {
                let rev = both_single(input, &jobs, s_rank);
                for t_rank in 0..=size {
                    if t_rank < s_rank || s_rank + 2 < t_rank {
                        consider(
                            ctx,
                            Box::new(IntraOrOpt::new(v, s_rank, t_rank, rev)),
                            best,
                        );
                    }
                }
                for t_rank in (s_rank + 2)..size.saturating_sub(1) {
                    if movable_edge(input, &jobs, t_rank) {
                        consider(
                            ctx,
                            Box::new(IntraCrossExchange::new(
                                v,
                                s_rank,
                                t_rank,
                                rev,
                                both_single(input, &jobs, t_rank),
                            )),
                            best,
                        );
                    }
                }
            }
        }

        // Whole-route families.
        let empty_ranks: Vec<usize> = (0..nb_vehicles)
            .filter(|&other| other != v && self.routes[other].empty())
            .collect();
        if size >= 2 && !empty_ranks.is_empty() {
            consider(ctx, Box::new(RouteSplit::new(v, empty_ranks)), best);
        }
        if self.depth >= config::ROUTE_FIX_DEPTH && size >= 4 && all_single(input, &jobs) {
            consider(ctx, Box::new(RouteFix::new(v, self.deadline)), best);
        }
    }

    /// Inter-route families for an ordered vehicle pair; symmetric families
    /// are enumerated once, on s < t.
    fn inter_bucket(
        &self,
        ctx: &LsCtx<R>,
        s_v: usize,
        t_v: usize,
        best: &mut Option<(MoveKey, BoxedOp<R>)>,
    ) {
        let input = self.input;
        let s_size = self.routes[s_v].size();
        let t_size = self.routes[t_v].size();
        let s_jobs: Vec<usize> = self.routes[s_v].jobs().to_vec();
        let t_jobs: Vec<usize> = self.routes[t_v].jobs().to_vec();

        if s_v < t_v {
            for s_rank in 0..s_size {
                if input.jobs[s_jobs[s_rank]].job_type != JobType::Single
                    || !input.vehicle_ok_with_job(t_v, s_jobs[s_rank])
                {
                    continue;
                }
                for t_rank in 0..t_size {
                    if input.jobs[t_jobs[t_rank]].job_type != JobType::Single
                        || !input.vehicle_ok_with_job(s_v, t_jobs[t_rank])
                    {
                        continue;
                    }
                    consider(ctx, Box::new(Exchange::new(s_v, s_rank, t_v, t_rank)), best);
                }
            }

            for s_rank in 0..s_size.saturating_sub(1) {
                if !movable_edge(input, &s_jobs, s_rank)
                    || !fragment_ok(input, t_v, &s_jobs[s_rank..s_rank + 2])
                {
                    continue;
                }
                for t_rank in 0..t_size.saturating_sub(1) {
                    if !movable_edge(input, &t_jobs, t_rank)
                        || !fragment_ok(input, s_v, &t_jobs[t_rank..t_rank + 2])
                    {
                        continue;
                    }
                    consider(
                        ctx,
                        Box::new(CrossExchange::new(
                            s_v,
                            s_rank,
                            t_v,
                            t_rank,
                            both_single(input, &s_jobs, s_rank),
                            both_single(input, &t_jobs, t_rank),
                        )),
                        best,
                    );
                }
            }

            // Tail swaps need clean cuts on both sides.
            for s_rank in 0..s_size {
                if self.routes[s_v].raw().has_pending_delivery_after_rank(s_rank) {
                    continue;
                }
                for t_rank in 0..t_size {
                    if self.routes[t_v].raw().has_pending_delivery_after_rank(t_rank) {
                        continue;
                    }
                    consider(ctx, Box::new(TwoOpt::new(s_v, s_rank, t_v, t_rank)), best);
                }
            }

            if !self.routes[s_v].empty() || !self.routes[t_v].empty() {
                consider(ctx, Box::new(RouteExchange::new(s_v, t_v)), best);
            }

            if s_size >= 2 && t_size >= 2 {
                consider(ctx, Box::new(SwapStar::new(s_v, t_v)), best);
            }
        }

        // Asymmetric families on the ordered pair.
        for s_rank in 0..s_size {
            if input.jobs[s_jobs[s_rank]].job_type != JobType::Single
                || !input.vehicle_ok_with_job(t_v, s_jobs[s_rank])
            {
                continue;
            }
            for t_rank in 0..=t_size {
                consider(ctx, Box::new(Relocate::new(s_v, s_rank, t_v, t_rank)), best);
            }
            for t_rank in 0..t_size.saturating_sub(1) {
                if !movable_edge(input, &t_jobs, t_rank)
                    || !fragment_ok(input, s_v, &t_jobs[t_rank..t_rank + 2])
                {
                    continue;
                }
                consider(
                    ctx,
                    Box::new(MixedExchange::new(
                        s_v,
                        s_rank,
                        t_v,
                        t_rank,
                        both_single(input, &t_jobs, t_rank),
                    )),
                    best,
                );
            }
        }

        for s_rank in 0..s_size.saturating_sub(1) {
            if !movable_edge(input, &s_jobs, s_rank)
                || !fragment_ok(input, t_v, &s_jobs[s_rank..s_rank + 2])
            {
                continue;
            }
            let rev = both_single(input, &s_jobs, s_rank);
            for t_rank in 0..=t_size {
                consider(ctx, Box::new(OrOpt::new(s_v, s_rank, t_v, t_rank, rev)), best);
            }
        }

        // Reversed portion exchange: all-single fragments only.
        for s_rank in 0..s_size {
            if !all_single(input, &s_jobs[s_rank + 1..])
                || !fragment_ok(input, t_v, &s_jobs[s_rank + 1..])
            {
                continue;
            }
            for t_rank in 0..t_size {
                if !all_single(input, &t_jobs[..=t_rank])
                    || !fragment_ok(input, s_v, &t_jobs[..=t_rank])
                {
                    continue;
                }
                consider(
                    ctx,
                    Box::new(ReverseTwoOpt::new(s_v, s_rank, t_v, t_rank)),
                    best,
                );
            }
        }

        // Pickup-delivery pair shifts.
        for (s_p_rank, &j) in s_jobs.iter().enumerate() {
            if input.jobs[j].job_type != JobType::Pickup || !input.vehicle_ok_with_job(t_v, j) {
                continue;
            }
            let s_d_rank = self.state.matching_delivery_rank[s_v][s_p_rank];
            consider(
                ctx,
                Box::new(PdShift::new(s_v, s_p_rank, s_d_rank, t_v)),
                best,
            );
        }
    }

    /// Insert unassigned jobs at their cheapest feasible spot, best
    /// (priority, cost) first, until nothing fits anymore. Returns whether
    /// anything was added.
    fn try_job_additions(&mut self) -> bool {
        let input = self.input;
        let mut added_any = false;

        loop {
            let mut best: Option<Addition> = None;

            for &job_rank in self.unassigned.iter() {
                let job = &input.jobs[job_rank];
                if job.job_type == JobType::Delivery {
                    continue;
                }

                for (v, route) in self.routes.iter().enumerate() {
                    if !input.vehicle_ok_with_job(v, job_rank) {
                        continue;
                    }
                    let vehicle = &input.vehicles[v];

                    match job.job_type {
                        JobType::Single => {
                            if route.size() + 1 > vehicle.max_tasks {
                                continue;
                            }
                            for rank in 0..=route.size() {
                                let eval =
                                    addition_cost(input, job_rank, vehicle, route.jobs(), rank);
                                if !better_addition(&best, job.priority, eval) {
                                    continue;
                                }
                                let new_eval = self.state.route_evals[v] + eval;
                                if vehicle.ok_for_range_bounds(&new_eval)
                                    && route.raw().is_valid_addition_for_capacity(
                                        &job.pickup,
                                        &job.delivery,
                                        rank,
                                    )
                                    && route.is_valid_addition_for_tw(input, job_rank, rank)
                                {
                                    best = Some(Addition {
                                        job_rank,
                                        priority: job.priority,
                                        eval,
                                        vehicle: v,
                                        pickup_rank: rank,
                                        delivery_rank: rank,
                                        seq: vec![job_rank],
                                        delivery: job.delivery.clone(),
                                    });
                                }
                            }
                        }
                        JobType::Pickup => {
                            if route.size() + 2 > vehicle.max_tasks {
                                continue;
                            }
                            let pair_priority = job.priority + input.jobs[job_rank + 1].priority;
                            for pickup_r in 0..=route.size() {
                                if !route
                                    .raw()
                                    .is_valid_addition_for_load(&job.pickup, pickup_r)
                                    || !route.is_valid_addition_for_tw_without_max_load(
                                        input, job_rank, pickup_r,
                                    )
                                {
                                    continue;
                                }
                                let p_add = addition_cost(
                                    input,
                                    job_rank,
                                    vehicle,
                                    route.jobs(),
                                    pickup_r,
                                );

                                let mut seq = vec![job_rank];
                                let mut seq_delivery = input.zero_amount().clone();

                                for delivery_r in pickup_r..=route.size() {
                                    if pickup_r < delivery_r {
                                        let passed = route.jobs()[delivery_r - 1];
                                        seq.push(passed);
                                        if input.jobs[passed].job_type == JobType::Single {
                                            seq_delivery += &input.jobs[passed].delivery;
                                        }
                                    }

                                    let eval = if pickup_r == delivery_r {
                                        in_place_pd_addition_cost(
                                            input,
                                            job_rank,
                                            vehicle,
                                            route.jobs(),
                                            pickup_r,
                                        )
                                    } else {
                                        p_add
                                            + addition_cost(
                                                input,
                                                job_rank + 1,
                                                vehicle,
                                                route.jobs(),
                                                delivery_r,
                                            )
                                    };
                                    if !better_addition(&best, pair_priority, eval) {
                                        continue;
                                    }

                                    seq.push(job_rank + 1);
                                    let new_eval = self.state.route_evals[v] + eval;
                                    let valid = vehicle.ok_for_range_bounds(&new_eval)
                                        && route.raw().is_valid_addition_for_capacity_inclusion(
                                            input,
                                            &seq_delivery,
                                            &seq[..],
                                            pickup_r,
                                            delivery_r,
                                        )
                                        && route.is_valid_seq_addition_for_tw(
                                            input,
                                            &seq_delivery,
                                            &seq[..],
                                            pickup_r,
                                            delivery_r,
                                            true,
                                        );
                                    seq.pop();

                                    if valid {
                                        let mut full_seq = seq.clone();
                                        full_seq.push(job_rank + 1);
                                        best = Some(Addition {
                                            job_rank,
                                            priority: pair_priority,
                                            eval,
                                            vehicle: v,
                                            pickup_rank: pickup_r,
                                            delivery_rank: delivery_r,
                                            seq: full_seq,
                                            delivery: seq_delivery.clone(),
                                        });
                                    }
                                }
                            }
                        }
                        JobType::Delivery => unreachable!(),
                    }
                }
            }

            match best {
                Some(addition) => {
                    let v = addition.vehicle;
                    let route = &mut self.routes[v];
                    match input.jobs[addition.job_rank].job_type {
                        JobType::Single => {
                            route.add(input, addition.job_rank, addition.pickup_rank);
                            self.unassigned.remove(&addition.job_rank);
                        }
                        JobType::Pickup => {
                            route.replace(
                                input,
                                &addition.delivery,
                                &addition.seq[..],
                                addition.pickup_rank,
                                addition.delivery_rank,
                            );
                            self.unassigned.remove(&addition.job_rank);
                            self.unassigned.remove(&(addition.job_rank + 1));
                        }
                        JobType::Delivery => unreachable!(),
                    }
                    self.refresh_vehicle(v);
                    self.invalidate(&[v], true);
                    added_any = true;
                    trace!(
                        job = input.jobs[addition.job_rank].id,
                        vehicle = v,
                        "job addition"
                    );
                }
                None => break,
            }

            if self.out_of_time() {
                break;
            }
        }

        added_any
    }

    /// Ruin phase: drop `count` jobs, picked with probability proportional
    /// to their removal gain; both halves of any shipment go together.
    fn remove_jobs(&mut self, count: usize) {
        for _ in 0..count {
            let mut candidates: Vec<(usize, usize, u64)> = Vec::new();
            for (v, route) in self.routes.iter().enumerate() {
                for rank in 0..route.size() {
                    let job = &self.input.jobs[route.jobs()[rank]];
                    let gain = match job.job_type {
                        JobType::Single => self.state.node_gains[v][rank],
                        JobType::Pickup => self.state.pd_gains[v][rank],
                        JobType::Delivery => continue,
                    };
                    let weight = gain.cost.max(1) as u64;
                    candidates.push((v, rank, weight));
                }
            }

            if candidates.is_empty() {
                return;
            }

            let total: u64 = candidates.iter().map(|c| c.2).sum();
            let mut ticket = self.rng.gen_range(0..total);
            let mut chosen = candidates.len() - 1;
            for (i, c) in candidates.iter().enumerate() {
                if ticket < c.2 {
                    chosen = i;
                    break;
                }
                ticket -= c.2;
            }

            let (v, rank, _) = candidates[chosen];
            let job_rank = self.routes[v].jobs()[rank];
            match self.input.jobs[job_rank].job_type {
                JobType::Single => {
                    if !self.routes[v].is_valid_removal(self.input, rank, 1) {
                        continue;
                    }
                    self.routes[v].remove(self.input, rank, 1);
                    self.unassigned.insert(job_rank);
                }
                JobType::Pickup => {
                    let d_rank = self.state.matching_delivery_rank[v][rank];
                    let kept: Vec<usize> = self.routes[v].jobs()[rank + 1..d_rank].to_vec();
                    let kept_delivery = seq_singles_delivery(self.input, &kept);
                    if !self.routes[v].is_valid_seq_addition_for_tw(
                        self.input,
                        &kept_delivery,
                        &kept[..],
                        rank,
                        d_rank + 1,
                        true,
                    ) {
                        continue;
                    }
                    self.routes[v].replace(
                        self.input,
                        &kept_delivery,
                        &kept[..],
                        rank,
                        d_rank + 1,
                    );
                    self.unassigned.insert(job_rank);
                    self.unassigned.insert(job_rank + 1);
                }
                JobType::Delivery => unreachable!(),
            }
            self.refresh_vehicle(v);
        }
    }
}

struct Addition {
    job_rank: usize,
    priority: Priority,
    eval: Eval,
    vehicle: usize,
    pickup_rank: usize,
    delivery_rank: usize,
    seq: Vec<usize>,
    delivery: Amount,
}

/// Keep the strictly-better of the bucket's current best and a fresh
/// candidate, pruning through the gain upper bound when no priority gain is
/// in play.
fn consider<R: Route>(
    ctx: &LsCtx<R>,
    mut op: BoxedOp<R>,
    best: &mut Option<(MoveKey, BoxedOp<R>)>,
) {
    let current_key = best.as_ref().map(|(k, _)| *k).unwrap_or(NO_MOVE);
    let p_gain = op.priority_gain(ctx);
    if p_gain == 0 && (0, op.gain_upper_bound(ctx)) <= current_key {
        return;
    }
    if !op.is_valid(ctx) {
        return;
    }
    let key = (p_gain, op.gain(ctx));
    if key > current_key && key > NO_MOVE {
        *best = Some((key, op));
    }
}

fn better_addition(best: &Option<Addition>, priority: Priority, eval: Eval) -> bool {
    match best {
        None => true,
        Some(b) => (priority, -eval.cost) > (b.priority, -b.eval.cost),
    }
}

fn seq_singles_delivery(input: &Input, jobs: &[usize]) -> Amount {
    let mut delivery = input.zero_amount().clone();
    for &j in jobs {
        if input.jobs[j].job_type == JobType::Single {
            delivery += &input.jobs[j].delivery;
        }
    }
    delivery
}

fn all_single(input: &Input, jobs: &[usize]) -> bool {
    jobs.iter()
        .all(|&j| input.jobs[j].job_type == JobType::Single)
}

fn fragment_ok(input: &Input, vehicle: usize, fragment: &[usize]) -> bool {
    fragment
        .iter()
        .all(|&j| input.vehicle_ok_with_job(vehicle, j))
}
