use crate::models::{Eval, Input, Priority, Vehicle};

use super::super::route::Route;
use super::super::sequence::JobSequence;
use super::super::state::SolutionState;

/// Read-only context handed to operators while they evaluate a move.
pub struct LsCtx<'a, R: Route> {
    pub input: &'a Input,
    pub state: &'a SolutionState,
    pub routes: &'a [R],
}

/// Local-search move. An operator is a small value object carrying integer
/// ranks into the driver-owned routes vector, created per candidate and
/// never stored past the step that applies it.
///
/// Contract: `gain_upper_bound` never underestimates the real gain,
/// `is_valid` is side-effect-free on route state and must be checked before
/// `apply`, and the candidate lists tell the driver which vehicles need
/// cache refresh or can now take job additions.
pub trait Operator<R: Route> {
    fn name(&self) -> &'static str;

    /// Cheap optimistic bound used to short-circuit enumeration; defaults
    /// to the exact gain.
    fn gain_upper_bound(&mut self, ctx: &LsCtx<R>) -> Eval {
        self.gain(ctx)
    }

    /// Exact gain (old eval minus new eval, positive means improvement).
    /// May commit the operator to a variant (e.g. reversing an edge), so
    /// call it after `is_valid`.
    fn gain(&mut self, ctx: &LsCtx<R>) -> Eval;

    /// Priority improvement for moves trading assigned tasks against
    /// unassigned ones.
    fn priority_gain(&mut self, _ctx: &LsCtx<R>) -> Priority {
        0
    }

    fn is_valid(&mut self, ctx: &LsCtx<R>) -> bool;

    /// Mutate the routes. Only call when `is_valid` returned true.
    fn apply(&mut self, input: &Input, routes: &mut [R]);

    /// Vehicles whose routes may now accept currently-unassigned jobs.
    fn addition_candidates(&self) -> Vec<usize>;

    /// Vehicles whose caches must be refreshed after `apply`.
    fn update_candidates(&self) -> Vec<usize>;

    /// Unassigned job ranks this move relies on; the driver drops stored
    /// moves whose requirements got assigned elsewhere.
    fn required_unassigned(&self) -> Vec<usize> {
        Vec::new()
    }

    /// Unassigned-set bookkeeping the driver performs after `apply`:
    /// (jobs becoming assigned, jobs becoming unassigned).
    fn unassigned_changes(&self) -> (Vec<usize>, Vec<usize>) {
        (Vec::new(), Vec::new())
    }

    /// Whether a change on the given vehicle makes this stored move stale.
    fn invalidated_by(&self, v_rank: usize) -> bool {
        self.update_candidates().contains(&v_rank)
    }
}

/// Disjoint mutable access to two routes of the driver-owned vector.
pub fn two_routes_mut<R>(routes: &mut [R], a: usize, b: usize) -> (&mut R, &mut R) {
    debug_assert!(a != b);
    if a < b {
        let (left, right) = routes.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = routes.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

pub fn eval_opt(vehicle: &Vehicle, from: Option<usize>, to: Option<usize>) -> Eval {
    match (from, to) {
        (Some(f), Some(t)) => vehicle.eval(f, t),
        _ => Eval::default(),
    }
}

/// Location index right before `rank` in the route (vehicle start for rank
/// zero, when it exists).
pub fn location_before(
    input: &Input,
    vehicle: &Vehicle,
    jobs: &[usize],
    rank: usize,
) -> Option<usize> {
    if rank == 0 {
        vehicle.start.as_ref().map(|s| s.index())
    } else {
        Some(input.jobs[jobs[rank - 1]].index())
    }
}

/// Location index of the step following the range ending at `rank`
/// (exclusive), falling back to the vehicle end.
pub fn location_after(
    input: &Input,
    vehicle: &Vehicle,
    jobs: &[usize],
    rank: usize,
) -> Option<usize> {
    if rank < jobs.len() {
        Some(input.jobs[jobs[rank]].index())
    } else {
        vehicle.end.as_ref().map(|e| e.index())
    }
}

/// Edge evaluation of an inserted sequence plus its boundary edges.
pub fn seq_edge_eval<S: JobSequence + ?Sized>(
    input: &Input,
    vehicle: &Vehicle,
    prev: Option<usize>,
    next: Option<usize>,
    seq: &S,
) -> Eval {
    if seq.is_empty() {
        return eval_opt(vehicle, prev, next);
    }

    let mut eval = Eval::default();
    let first_index = input.jobs[seq.job_at(0)].index();
    if let Some(p) = prev {
        eval += vehicle.eval(p, first_index);
    }
    let mut current = first_index;
    for i in 1..seq.len() {
        let index = input.jobs[seq.job_at(i)].index();
        eval += vehicle.eval(current, index);
        current = index;
    }
    if let Some(n) = next {
        eval += vehicle.eval(current, n);
    }

    eval
}

/// Exact edge gain of splicing `seq` over [first_rank; last_rank) in the
/// route of `vehicle`.
pub fn splice_gain<S: JobSequence + ?Sized>(
    input: &Input,
    vehicle: &Vehicle,
    jobs: &[usize],
    first_rank: usize,
    last_rank: usize,
    seq: &S,
) -> Eval {
    let prev = location_before(input, vehicle, jobs, first_rank);
    let next = location_after(input, vehicle, jobs, last_rank);
    let old = seq_edge_eval(input, vehicle, prev, next, &jobs[first_rank..last_rank]);
    let new = seq_edge_eval(input, vehicle, prev, next, seq);
    old - new
}

/// Range-bound feasibility of a route after subtracting a gain from its
/// cached evaluation.
pub fn range_bounds_ok<R: Route>(ctx: &LsCtx<R>, v_rank: usize, gain: Eval) -> bool {
    let new_eval = ctx.state.route_evals[v_rank] - gain;
    ctx.input.vehicles[v_rank]
        .ok_for_range_bounds(&Eval::new(0, new_eval.duration.max(0), new_eval.distance.max(0)))
}

/// Single-job deliveries carried by a job-rank sequence.
pub fn seq_delivery<S: JobSequence + ?Sized>(input: &Input, seq: &S) -> crate::models::Amount {
    let mut delivery = input.zero_amount().clone();
    for i in 0..seq.len() {
        let job = &input.jobs[seq.job_at(i)];
        if job.job_type == crate::models::JobType::Single {
            delivery += &job.delivery;
        }
    }
    delivery
}

/// Capacity and timing validity of splicing `seq` over a window of a single
/// route. Covers removal side effects since the window spans the whole
/// modified region.
pub fn intra_splice_valid<R: Route, S: JobSequence + ?Sized>(
    ctx: &LsCtx<R>,
    v_rank: usize,
    first_rank: usize,
    last_rank: usize,
    seq: &S,
) -> bool {
    let route = &ctx.routes[v_rank];
    let delivery = seq_delivery(ctx.input, seq);
    route.raw().is_valid_addition_for_capacity_inclusion(
        ctx.input,
        &delivery,
        seq,
        first_rank,
        last_rank,
    ) && route.is_valid_seq_addition_for_tw(
        ctx.input,
        &delivery,
        seq,
        first_rank,
        last_rank,
        true,
    )
}

/// True when the two consecutive route positions form a movable fragment:
/// two singles, or a pickup directly followed by its delivery.
pub fn movable_edge(input: &Input, jobs: &[usize], rank: usize) -> bool {
    use crate::models::JobType;
    let a = &input.jobs[jobs[rank]];
    let b = &input.jobs[jobs[rank + 1]];
    (a.job_type == JobType::Single && b.job_type == JobType::Single)
        || (a.job_type == JobType::Pickup && jobs[rank + 1] == jobs[rank] + 1)
}

/// True when both positions hold single jobs (reversal candidates).
pub fn both_single(input: &Input, jobs: &[usize], rank: usize) -> bool {
    use crate::models::JobType;
    input.jobs[jobs[rank]].job_type == JobType::Single
        && input.jobs[jobs[rank + 1]].job_type == JobType::Single
}
