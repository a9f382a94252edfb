use std::ops::Deref;

use crate::models::{Amount, Break, Capacity, Duration, Input, Job, JobType, TimeWindow, Vehicle};

use super::raw_route::RawRoute;
use super::route::Route;
use super::sequence::JobSequence;

/// Earliest end date, travel time and location of the step right before a
/// walk position.
#[derive(Clone, Copy)]
struct PreviousInfo {
    earliest: Duration,
    travel: Duration,
    location_index: Option<usize>,
}

/// Latest start date for the step right after a walk position, and travel
/// time to it.
#[derive(Clone, Copy)]
struct NextInfo {
    latest: Duration,
    travel: Duration,
}

/// Outcome of the break/task ordering policy at one walk position.
struct OrderChoice {
    add_job_first: bool,
    add_break_first: bool,
    j_tw: Option<usize>,
    b_tw: Option<usize>,
}

fn first_tw_from(tws: &[TimeWindow], earliest: Duration) -> Option<usize> {
    tws.iter().position(|tw| earliest <= tw.end)
}

fn last_tw_until(tws: &[TimeWindow], latest: Duration) -> Option<usize> {
    tws.iter().rposition(|tw| tw.start <= latest)
}

fn action_time_for(job: &Job, vtype: usize, previous_location: Option<usize>) -> Duration {
    if previous_location == Some(job.index()) {
        job.services[vtype]
    } else {
        job.setups[vtype] + job.services[vtype]
    }
}

/// Time-window-aware route: extends the raw sweeps with earliest/latest
/// feasible service dates per rank, an interleaved break schedule and break
/// load-margin sweeps.
#[derive(Clone)]
pub struct TwRoute {
    pub raw: RawRoute,

    pub v_start: Duration,
    pub v_end: Duration,

    // Feasible service-start bounds per rank, possibly derived from
    // different time windows in multi-TW situations.
    pub earliest: Vec<Duration>,
    pub latest: Vec<Duration>,

    // Total time spent at each rank: service, plus setup when the previous
    // location differs.
    pub action_time: Vec<Duration>,

    pub earliest_end: Duration,

    // breaks_at_rank[i] counts breaks taken right before the job at rank i
    // (rank size() meaning right before route end); breaks_counts holds the
    // prefix sums.
    pub breaks_at_rank: Vec<usize>,
    pub breaks_counts: Vec<usize>,

    pub break_earliest: Vec<Duration>,
    pub break_latest: Vec<Duration>,

    // Component-wise minimum of (break max_load - load) across breaks up to
    // / after each break rank.
    pub fwd_smallest_breaks_load_margin: Vec<Amount>,
    pub bwd_smallest_breaks_load_margin: Vec<Amount>,
}

impl Deref for TwRoute {
    type Target = RawRoute;

    fn deref(&self) -> &RawRoute {
        &self.raw
    }
}

impl TwRoute {
    pub fn new(input: &Input, v_rank: usize) -> Self {
        let raw = RawRoute::new(input, v_rank);
        let v = &input.vehicles[v_rank];
        let nb_breaks = v.breaks.len();
        let amount_size = input.amount_size();

        let mut route = TwRoute {
            raw,
            v_start: v.tw.start,
            v_end: v.tw.end,
            earliest: Vec::new(),
            latest: Vec::new(),
            action_time: Vec::new(),
            earliest_end: v.tw.start,
            breaks_at_rank: vec![nb_breaks],
            breaks_counts: vec![nb_breaks],
            break_earliest: vec![0; nb_breaks],
            break_latest: vec![0; nb_breaks],
            fwd_smallest_breaks_load_margin: vec![Amount::max_value(amount_size); nb_breaks],
            bwd_smallest_breaks_load_margin: vec![Amount::max_value(amount_size); nb_breaks],
        };

        // Input loading already vetted break schedules, so these walks are
        // total.
        let mut previous_earliest = route.v_start;
        let mut fwd_smallest = Amount::max_value(amount_size);
        for (i, b) in v.breaks.iter().enumerate() {
            let b_tw = first_tw_from(&b.tws, previous_earliest)
                .expect("inconsistent breaks past input validation");
            route.break_earliest[i] = previous_earliest.max(b.tws[b_tw].start);
            previous_earliest = route.break_earliest[i] + b.service;

            if let Some(max_load) = &b.max_load {
                fwd_smallest.min_with(max_load);
            }
            route.fwd_smallest_breaks_load_margin[i] = fwd_smallest.clone();
        }

        let mut next_latest = route.v_end;
        let mut bwd_smallest = Amount::max_value(amount_size);
        for (i, b) in v.breaks.iter().enumerate().rev() {
            debug_assert!(b.service <= next_latest);
            next_latest -= b.service;
            let b_tw = last_tw_until(&b.tws, next_latest)
                .expect("inconsistent breaks past input validation");
            route.break_latest[i] = next_latest.min(b.tws[b_tw].end);
            next_latest = route.break_latest[i];
            debug_assert!(route.break_earliest[i] <= route.break_latest[i]);

            if let Some(max_load) = &b.max_load {
                bwd_smallest.min_with(max_load);
            }
            route.bwd_smallest_breaks_load_margin[i] = bwd_smallest.clone();
        }

        route
    }

    fn previous_info(&self, input: &Input, job_rank: usize, rank: usize) -> PreviousInfo {
        let v = &input.vehicles[self.raw.v_rank];
        let job = &input.jobs[job_rank];

        let mut previous = PreviousInfo {
            earliest: self.v_start,
            travel: 0,
            location_index: None,
        };
        if rank > 0 {
            let previous_job = &input.jobs[self.raw.jobs[rank - 1]];
            previous.earliest = self.earliest[rank - 1] + self.action_time[rank - 1];
            previous.travel = v.duration(previous_job.index(), job.index());
            previous.location_index = Some(previous_job.index());
        } else if let Some(start) = &v.start {
            previous.location_index = Some(start.index());
            previous.travel = v.duration(start.index(), job.index());
        }

        previous
    }

    fn next_info(&self, input: &Input, job_rank: usize, rank: usize) -> NextInfo {
        let v = &input.vehicles[self.raw.v_rank];
        let job = &input.jobs[job_rank];

        let mut next = NextInfo {
            latest: self.v_end,
            travel: 0,
        };
        if rank == self.raw.jobs.len() {
            if let Some(end) = &v.end {
                next.travel = v.duration(job.index(), end.index());
            }
        } else {
            next.latest = self.latest[rank];
            next.travel = v.duration(job.index(), input.jobs[self.raw.jobs[rank]].index());
        }

        next
    }

    /// Forward earliest-date propagation from rank, stopping as soon as a
    /// recomputed value matches the stored one.
    fn fwd_update_earliest_from(&mut self, input: &Input, rank: usize) {
        let v = &input.vehicles[self.raw.v_rank];

        let mut current_earliest = self.earliest[rank];
        let mut handle_last_breaks = true;

        for i in (rank + 1)..self.raw.jobs.len() {
            let next_j = &input.jobs[self.raw.jobs[i]];
            let mut remaining_travel_time =
                v.duration(input.jobs[self.raw.jobs[i - 1]].index(), next_j.index());
            let mut previous_action_time = self.action_time[i - 1];

            debug_assert!(self.breaks_at_rank[i] <= self.breaks_counts[i]);
            let mut break_rank = self.breaks_counts[i] - self.breaks_at_rank[i];

            for _ in 0..self.breaks_at_rank[i] {
                let b = &v.breaks[break_rank];

                current_earliest += previous_action_time;

                let b_tw_rank = first_tw_from(&b.tws, current_earliest)
                    .expect("no valid break time window during propagation");
                let b_tw = &b.tws[b_tw_rank];

                if current_earliest < b_tw.start {
                    let margin = b_tw.start - current_earliest;
                    if margin < remaining_travel_time {
                        remaining_travel_time -= margin;
                    } else {
                        remaining_travel_time = 0;
                    }
                    current_earliest = b_tw.start;
                }

                self.break_earliest[break_rank] = current_earliest;
                previous_action_time = b.service;
                break_rank += 1;
            }

            // Back to the job after breaks.
            current_earliest += previous_action_time + remaining_travel_time;

            let j_tw_rank = first_tw_from(&next_j.tws, current_earliest)
                .expect("no valid job time window during propagation");
            current_earliest = current_earliest.max(next_j.tws[j_tw_rank].start);

            // Consistency holds unless the latest date was reset to zero to
            // force backward propagation right after this call.
            debug_assert!(
                current_earliest <= self.latest[i] || (i == rank + 1 && self.latest[i] == 0)
            );
            if current_earliest == self.earliest[i] {
                handle_last_breaks = false;
                break;
            }

            self.earliest[i] = current_earliest;
        }

        if handle_last_breaks {
            // Breaks right before route end.
            let i = self.raw.jobs.len();
            let mut remaining_travel_time = match &v.end {
                Some(end) => v.duration(input.jobs[self.raw.jobs[i - 1]].index(), end.index()),
                None => 0,
            };
            let mut previous_action_time = self.action_time[i - 1];

            debug_assert!(self.breaks_at_rank[i] <= self.breaks_counts[i]);
            let mut break_rank = self.breaks_counts[i] - self.breaks_at_rank[i];

            for _ in 0..self.breaks_at_rank[i] {
                let b = &v.breaks[break_rank];
                current_earliest += previous_action_time;

                let b_tw_rank = first_tw_from(&b.tws, current_earliest)
                    .expect("no valid break time window during propagation");
                let b_tw = &b.tws[b_tw_rank];

                if current_earliest < b_tw.start {
                    let margin = b_tw.start - current_earliest;
                    if margin < remaining_travel_time {
                        remaining_travel_time -= margin;
                    } else {
                        remaining_travel_time = 0;
                    }
                    current_earliest = b_tw.start;
                }

                self.break_earliest[break_rank] = current_earliest;
                previous_action_time = b.service;
                break_rank += 1;
            }

            self.earliest_end = current_earliest + previous_action_time + remaining_travel_time;
            debug_assert!(self.earliest_end <= self.v_end);
        }
    }

    /// Backward latest-date propagation from rank, with the same monotone
    /// stop criterion.
    fn bwd_update_latest_from(&mut self, input: &Input, rank: usize) {
        let v = &input.vehicles[self.raw.v_rank];

        let mut current_latest = self.latest[rank];
        let mut handle_first_breaks = true;

        for next_i in (1..=rank).rev() {
            let previous_j = &input.jobs[self.raw.jobs[next_i - 1]];
            let mut remaining_travel_time =
                v.duration(previous_j.index(), input.jobs[self.raw.jobs[next_i]].index());

            debug_assert!(self.breaks_at_rank[next_i] <= self.breaks_counts[next_i]);
            let mut break_rank = self.breaks_counts[next_i];

            for _ in 0..self.breaks_at_rank[next_i] {
                break_rank -= 1;

                let b = &v.breaks[break_rank];
                debug_assert!(b.service <= current_latest);
                current_latest -= b.service;

                let b_tw_rank = last_tw_until(&b.tws, current_latest)
                    .expect("no valid break time window during propagation");
                let b_tw = &b.tws[b_tw_rank];

                if b_tw.end < current_latest {
                    let margin = current_latest - b_tw.end;
                    if margin < remaining_travel_time {
                        remaining_travel_time -= margin;
                    } else {
                        remaining_travel_time = 0;
                    }
                    current_latest = b_tw.end;
                }

                self.break_latest[break_rank] = current_latest;
            }

            let gap = self.action_time[next_i - 1] + remaining_travel_time;
            debug_assert!(gap <= current_latest);
            current_latest -= gap;

            let j_tw_rank = last_tw_until(&previous_j.tws, current_latest)
                .expect("no valid job time window during propagation");
            current_latest = current_latest.min(previous_j.tws[j_tw_rank].end);

            debug_assert!(self.earliest[next_i - 1] <= current_latest);
            if current_latest == self.latest[next_i - 1] {
                handle_first_breaks = false;
                break;
            }

            self.latest[next_i - 1] = current_latest;
        }

        if handle_first_breaks {
            // Breaks right before the first job.
            let next_i = 0;
            debug_assert!(self.breaks_at_rank[next_i] <= self.breaks_counts[next_i]);
            let mut break_rank = self.breaks_counts[next_i];

            for _ in 0..self.breaks_at_rank[next_i] {
                break_rank -= 1;
                let b = &v.breaks[break_rank];

                debug_assert!(b.service <= current_latest);
                current_latest -= b.service;

                let b_tw_rank = last_tw_until(&b.tws, current_latest)
                    .expect("no valid break time window during propagation");
                if b.tws[b_tw_rank].end < current_latest {
                    current_latest = b.tws[b_tw_rank].end;
                }

                self.break_latest[break_rank] = current_latest;
            }
        }
    }

    fn update_last_latest_date(&mut self, input: &Input) {
        debug_assert!(!self.raw.jobs.is_empty());

        let v = &input.vehicles[self.raw.v_rank];
        let last_rank = self.raw.jobs.len();
        let mut next = self.next_info(input, self.raw.jobs[last_rank - 1], last_rank);

        let mut break_rank = self.breaks_counts[last_rank];
        for _ in 0..self.breaks_at_rank[last_rank] {
            break_rank -= 1;
            let b = &v.breaks[break_rank];

            debug_assert!(b.service <= next.latest);
            next.latest -= b.service;

            let b_tw_rank = last_tw_until(&b.tws, next.latest)
                .expect("no valid break time window during propagation");
            let b_tw = &b.tws[b_tw_rank];

            if b_tw.end < next.latest {
                let margin = next.latest - b_tw.end;
                if margin < next.travel {
                    next.travel -= margin;
                } else {
                    next.travel = 0;
                }
                next.latest = b_tw.end;
            }

            self.break_latest[break_rank] = next.latest;
        }

        let job = &input.jobs[self.raw.jobs[last_rank - 1]];
        let gap = *self.action_time.last().unwrap() + next.travel;
        debug_assert!(gap <= next.latest);
        next.latest -= gap;

        let j_tw_rank = last_tw_until(&job.tws, next.latest)
            .expect("no valid job time window during propagation");
        *self.latest.last_mut().unwrap() = next.latest.min(job.tws[j_tw_rank].end);
    }

    fn fwd_update_action_time_from(&mut self, input: &Input, rank: usize) {
        let mut current_index = input.jobs[self.raw.jobs[rank]].index();

        for i in (rank + 1)..self.raw.jobs.len() {
            let next_j = &input.jobs[self.raw.jobs[i]];
            let next_index = next_j.index();

            self.action_time[i] = if next_index == current_index {
                next_j.services[self.raw.vtype]
            } else {
                next_j.setups[self.raw.vtype] + next_j.services[self.raw.vtype]
            };
            current_index = next_index;
        }
    }

    fn fwd_update_breaks_load_margin_from(&mut self, input: &Input, rank: usize) {
        let v = &input.vehicles[self.raw.v_rank];

        let mut fwd_smallest = if self.breaks_counts[rank] == 0 {
            Amount::max_value(input.amount_size())
        } else {
            self.fwd_smallest_breaks_load_margin[self.breaks_counts[rank] - 1].clone()
        };

        for i in rank..=self.raw.jobs.len() {
            if self.breaks_at_rank[i] == 0 {
                continue;
            }
            let current_load = self.raw.load_at_step(i).clone();

            for break_rank in
                (self.breaks_counts[i] - self.breaks_at_rank[i])..self.breaks_counts[i]
            {
                let b = &v.breaks[break_rank];
                debug_assert!(b.is_valid_for_load(&current_load));
                let current_margin = match &b.max_load {
                    Some(max_load) => max_load - &current_load,
                    None => Amount::max_value(input.amount_size()),
                };
                fwd_smallest.min_with(&current_margin);
                debug_assert!(*input.zero_amount() <= fwd_smallest);
                self.fwd_smallest_breaks_load_margin[break_rank] = fwd_smallest.clone();
            }
        }
    }

    fn bwd_update_breaks_load_margin_from(&mut self, input: &Input, rank: usize) {
        let v = &input.vehicles[self.raw.v_rank];

        let mut bwd_smallest = if self.breaks_counts[rank] == *self.breaks_counts.last().unwrap()
        {
            Amount::max_value(input.amount_size())
        } else {
            self.bwd_smallest_breaks_load_margin[self.breaks_counts[rank]].clone()
        };

        for i in (0..=rank).rev() {
            if self.breaks_at_rank[i] == 0 {
                continue;
            }
            let current_load = self.raw.load_at_step(i).clone();

            for bwd_break_count in 0..self.breaks_at_rank[i] {
                let break_rank = self.breaks_counts[i] - 1 - bwd_break_count;
                let b = &v.breaks[break_rank];
                debug_assert!(b.is_valid_for_load(&current_load));
                let current_margin = match &b.max_load {
                    Some(max_load) => max_load - &current_load,
                    None => Amount::max_value(input.amount_size()),
                };
                bwd_smallest.min_with(&current_margin);
                debug_assert!(*input.zero_amount() <= bwd_smallest);
                self.bwd_smallest_breaks_load_margin[break_rank] = bwd_smallest.clone();
            }
        }
    }

    /// Global policy deciding whether the job or the break goes first when
    /// both are due at the same point of a walk.
    #[allow(clippy::too_many_arguments)]
    fn order_choice(
        &self,
        input: &Input,
        job_rank: usize,
        job_action_time: Duration,
        b: &Break,
        previous: &PreviousInfo,
        next: &NextInfo,
        current_load: &Amount,
        check_max_load: bool,
    ) -> OrderChoice {
        let v = &input.vehicles[self.raw.v_rank];
        let job = &input.jobs[job_rank];

        let mut oc = OrderChoice {
            add_job_first: false,
            add_break_first: false,
            j_tw: first_tw_from(&job.tws, previous.earliest + previous.travel),
            b_tw: first_tw_from(&b.tws, previous.earliest),
        };

        let (Some(j_tw_rank), Some(b_tw_rank)) = (oc.j_tw, oc.b_tw) else {
            // If either the job or the break can't fit first then no
            // ordering is valid.
            return oc;
        };
        let j_tw = &job.tws[j_tw_rank];
        let b_tw = &b.tws[b_tw_rank];

        // Try job first, then break.
        let earliest_job_end =
            (previous.earliest + previous.travel).max(j_tw.start) + job_action_time;
        let mut job_then_break_margin = 0;

        let Some(new_b_tw_rank) = first_tw_from(&b.tws, earliest_job_end) else {
            // Break does not fit after the job, only option is break first
            // if its load cap allows.
            oc.add_break_first = !check_max_load || b.is_valid_for_load(current_load);
            return oc;
        };
        let new_b_tw = &b.tws[new_b_tw_rank];

        let mut travel_after_break = next.travel;
        let job_then_break_end;
        if earliest_job_end < new_b_tw.start {
            job_then_break_margin = new_b_tw.start - earliest_job_end;
            if job_then_break_margin < travel_after_break {
                travel_after_break -= job_then_break_margin;
            } else {
                travel_after_break = 0;
            }
            job_then_break_end = new_b_tw.start + b.service;
        } else {
            job_then_break_end = earliest_job_end + b.service;
        }

        if job_then_break_end + travel_after_break > next.latest {
            // Starting the break is possible but then the next step is not.
            oc.add_break_first = true;
            return oc;
        }

        if check_max_load
            && job.job_type == JobType::Single
            && !(job.pickup
                <= self.bwd_smallest_breaks_load_margin[v.break_rank(b.id)])
        {
            // Break won't fit after the job for load reasons.
            oc.add_break_first = b.is_valid_for_load(current_load);
            return oc;
        }

        // Try break first, then job.
        if check_max_load && !b.is_valid_for_load(current_load) {
            oc.add_job_first = true;
            return oc;
        }

        let mut travel_after_break = previous.travel;
        let mut earliest_job_start = previous.earliest;

        if previous.earliest < b_tw.start {
            let margin = b_tw.start - previous.earliest;
            if margin < travel_after_break {
                travel_after_break -= margin;
            } else {
                travel_after_break = 0;
            }
            earliest_job_start = b_tw.start;
        }

        earliest_job_start += b.service + travel_after_break;

        let Some(new_j_tw_rank) = first_tw_from(&job.tws, earliest_job_start) else {
            // Job does not fit after the break.
            oc.add_job_first = true;
            return oc;
        };
        let break_then_job_end =
            earliest_job_start.max(job.tws[new_j_tw_rank].start) + job_action_time;

        if break_then_job_end + next.travel > next.latest {
            oc.add_job_first = true;
            return oc;
        }

        // Both orderings are doable timing-wise.

        // A pickup goes first only if its matching delivery can still fit
        // afterwards, either around or after the break; otherwise a forced
        // pickup -> break choice could discard valid
        // break -> pickup -> delivery schedules.
        if job.job_type == JobType::Pickup {
            let matching_d = &input.jobs[job_rank + 1];
            debug_assert!(matching_d.job_type == JobType::Delivery);

            // Try pickup -> break -> delivery.
            let mut delivery_travel = v.duration(job.index(), matching_d.index());
            if job_then_break_margin < delivery_travel {
                delivery_travel -= job_then_break_margin;
            } else {
                delivery_travel = 0;
            }
            let pb_d_candidate = job_then_break_end + delivery_travel;
            if first_tw_from(&matching_d.tws, pb_d_candidate).is_some()
                && (!check_max_load
                    || b.is_valid_for_load(&(current_load + &job.pickup)))
            {
                oc.add_job_first = true;
                return oc;
            }

            // Try pickup -> delivery -> break.
            let delivery_candidate =
                earliest_job_end + v.duration(job.index(), matching_d.index());
            if let Some(d_tw_rank) = first_tw_from(&matching_d.tws, delivery_candidate) {
                let matching_d_action_time = if matching_d.index() == job.index() {
                    matching_d.services[self.raw.vtype]
                } else {
                    matching_d.setups[self.raw.vtype] + matching_d.services[self.raw.vtype]
                };
                let break_candidate = delivery_candidate
                    .max(matching_d.tws[d_tw_rank].start)
                    + matching_d_action_time;

                if first_tw_from(&b.tws, break_candidate).is_some() {
                    oc.add_job_first = true;
                    return oc;
                }
            }

            // Pickup first leads to infeasible options.
            oc.add_break_first = true;
            return oc;
        }

        // Pick the ordering minimising the pair's completion time. On ties
        // prefer the task first except for deliveries: postponing a
        // wide-window delivery can stretch waiting between zero-load breaks.
        if break_then_job_end < job_then_break_end {
            oc.add_break_first = true;
        } else if break_then_job_end == job_then_break_end {
            if job.job_type == JobType::Delivery || j_tw.end <= b_tw.end {
                oc.add_job_first = true;
            } else {
                oc.add_break_first = true;
            }
        } else {
            oc.add_job_first = true;
        }

        oc
    }

    /// Non-mutating simulation of splicing seq over [first_rank; last_rank).
    #[allow(clippy::too_many_arguments)]
    pub fn is_valid_seq_addition_for_tw_impl<S: JobSequence + ?Sized>(
        &self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
        check_max_load: bool,
    ) -> bool {
        debug_assert!(first_rank <= last_rank);

        let v = &input.vehicles[self.raw.v_rank];
        let check_max_load = check_max_load && v.has_break_max_load;

        let mut current;
        let mut next;

        if !seq.is_empty() {
            current = self.previous_info(input, seq.job_at(0), first_rank);
            next = self.next_info(input, seq.job_at(seq.len() - 1), last_rank);
        } else {
            // Plain removal, no jobs inserted.
            current = PreviousInfo {
                earliest: self.v_start,
                travel: 0,
                location_index: None,
            };
            next = NextInfo {
                latest: self.v_end,
                travel: 0,
            };

            if first_rank > 0 {
                let previous_job = &input.jobs[self.raw.jobs[first_rank - 1]];
                current.earliest =
                    self.earliest[first_rank - 1] + self.action_time[first_rank - 1];
                current.location_index = Some(previous_job.index());

                if last_rank < self.raw.jobs.len() {
                    next.latest = self.latest[last_rank];
                    next.travel = v.duration(
                        previous_job.index(),
                        input.jobs[self.raw.jobs[last_rank]].index(),
                    );
                } else if let Some(end) = &v.end {
                    next.travel = v.duration(previous_job.index(), end.index());
                }
            } else if last_rank < self.raw.jobs.len() {
                next.latest = self.latest[last_rank];
                if let Some(start) = &v.start {
                    current.location_index = Some(start.index());
                    next.travel = v.duration(
                        start.index(),
                        input.jobs[self.raw.jobs[last_rank]].index(),
                    );
                }
            } else {
                // Emptying the whole route is always valid.
                return true;
            }
        }

        let mut current_break =
            self.breaks_counts[first_rank] - self.breaks_at_rank[first_rank];
        let last_break = self.breaks_counts[last_rank];

        // Running load across the insertion range, when break max_load
        // checks apply.
        let mut current_load = input.zero_amount().clone();
        if check_max_load {
            let previous_init_load = if self.raw.jobs.is_empty() {
                input.zero_amount().clone()
            } else {
                self.raw.load_at_step(first_rank).clone()
            };
            debug_assert!(
                self.raw.delivery_in_range(first_rank, last_rank) <= previous_init_load
            );
            let delta_delivery = delivery - &self.raw.delivery_in_range(first_rank, last_rank);

            if current_break != 0
                && !(delta_delivery
                    <= self.fwd_smallest_breaks_load_margin[current_break - 1])
            {
                return false;
            }

            current_load = &previous_init_load + &delta_delivery;
        }

        // Service starts of open max_lifetime pickups inside the range.
        let mut open_lifetimes: Vec<(usize, Duration)> = Vec::new();

        // Propagate earliest dates across the insertion range.
        let mut job_i = 0;
        while job_i < seq.len() || current_break != last_break {
            if job_i == seq.len() {
                // Break after the last inserted jobs.
                let b = &v.breaks[current_break];

                let Some(b_tw_rank) = first_tw_from(&b.tws, current.earliest) else {
                    return false;
                };
                let b_tw = &b.tws[b_tw_rank];

                if check_max_load && !b.is_valid_for_load(&current_load) {
                    return false;
                }

                if current.earliest < b_tw.start {
                    let margin = b_tw.start - current.earliest;
                    if margin < next.travel {
                        next.travel -= margin;
                    } else {
                        next.travel = 0;
                    }
                    current.earliest = b_tw.start;
                }

                current.earliest += b.service;

                current_break += 1;
                continue;
            }

            let job_rank = seq.job_at(job_i);
            let job = &input.jobs[job_rank];

            if current_break == last_break {
                // Job after the last inserted breaks.
                current.earliest += current.travel;

                let Some(j_tw_rank) = first_tw_from(&job.tws, current.earliest) else {
                    return false;
                };
                let job_action_time =
                    action_time_for(job, self.raw.vtype, current.location_index);
                current.location_index = Some(job.index());
                let service_start = current.earliest.max(job.tws[j_tw_rank].start);
                if !self.lifetime_ok(input, job_rank, service_start, &mut open_lifetimes) {
                    return false;
                }
                current.earliest = service_start + job_action_time;

                if check_max_load {
                    debug_assert!(job.delivery <= current_load);
                    current_load += &job.pickup;
                    current_load -= &job.delivery;
                }

                job_i += 1;
                if job_i < seq.len() {
                    current.travel =
                        v.duration(job.index(), input.jobs[seq.job_at(job_i)].index());
                }
                continue;
            }

            // Both a job and a break are due: decide on ordering.
            let b = &v.breaks[current_break];
            let job_action_time = action_time_for(job, self.raw.vtype, current.location_index);

            // Tighter next bound while further jobs remain to insert.
            let mut tighter_next = next;
            if job_i + 1 < seq.len() {
                let next_j = &input.jobs[seq.job_at(job_i + 1)];
                debug_assert!(next.travel <= next.latest);
                tighter_next.latest =
                    (next.latest - next.travel).min(next_j.tws.last().unwrap().end);
                tighter_next.travel = v.duration(job.index(), next_j.index());
            }

            let oc = self.order_choice(
                input,
                job_rank,
                job_action_time,
                b,
                &current,
                &tighter_next,
                &current_load,
                check_max_load,
            );

            if !oc.add_job_first && !oc.add_break_first {
                return false;
            }
            debug_assert!(oc.add_job_first != oc.add_break_first);

            if oc.add_break_first {
                if check_max_load && !b.is_valid_for_load(&current_load) {
                    return false;
                }

                let b_tw = &b.tws[oc.b_tw.unwrap()];
                if current.earliest < b_tw.start {
                    let margin = b_tw.start - current.earliest;
                    if margin < current.travel {
                        current.travel -= margin;
                    } else {
                        current.travel = 0;
                    }
                    current.earliest = b_tw.start;
                }

                current.earliest += b.service;

                current_break += 1;
            }
            if oc.add_job_first {
                current.location_index = Some(job.index());

                let j_tw = &job.tws[oc.j_tw.unwrap()];
                let service_start = (current.earliest + current.travel).max(j_tw.start);
                if !self.lifetime_ok(input, job_rank, service_start, &mut open_lifetimes) {
                    return false;
                }
                current.earliest = service_start + job_action_time;

                if check_max_load {
                    debug_assert!(job.delivery <= current_load);
                    current_load += &job.pickup;
                    current_load -= &job.delivery;
                }

                job_i += 1;
                if job_i < seq.len() {
                    current.travel =
                        v.duration(job.index(), input.jobs[seq.job_at(job_i)].index());
                }
            }
        }

        if check_max_load && last_break < v.breaks.len() {
            let previous_final_load = if self.raw.jobs.is_empty() {
                input.zero_amount().clone()
            } else {
                self.raw.load_at_step(last_rank).clone()
            };
            let delta_pickup = &current_load - &previous_final_load;

            if !(delta_pickup <= self.bwd_smallest_breaks_load_margin[last_break]) {
                return false;
            }
        }

        if last_rank < self.raw.jobs.len()
            && Some(input.jobs[self.raw.jobs[last_rank]].index()) != current.location_index
        {
            // The task right after the splice has a new predecessor
            // location, so setup may now apply where it previously did not.
            let j_after = &input.jobs[self.raw.jobs[last_rank]];
            let mut new_action_time =
                j_after.setups[self.raw.vtype] + j_after.services[self.raw.vtype];
            if self.action_time[last_rank] < new_action_time {
                // Shifting the earliest date with the extra setup may break
                // downstream feasibility even when the margin check below
                // would pass.
                let mut earliest_after = current.earliest + next.travel;
                let Some(j_after_tw_rank) = first_tw_from(&j_after.tws, earliest_after) else {
                    return false;
                };
                earliest_after = earliest_after.max(j_after.tws[j_after_tw_rank].start);

                let mut next_after =
                    self.next_info(input, self.raw.jobs[last_rank], last_rank + 1);

                let mut break_rank =
                    self.breaks_counts[last_rank + 1] - self.breaks_at_rank[last_rank + 1];
                for _ in 0..self.breaks_at_rank[last_rank + 1] {
                    let b = &v.breaks[break_rank];

                    earliest_after += new_action_time;

                    let Some(b_tw_rank) = first_tw_from(&b.tws, earliest_after) else {
                        return false;
                    };
                    let b_tw = &b.tws[b_tw_rank];

                    if earliest_after < b_tw.start {
                        let margin = b_tw.start - earliest_after;
                        if margin < next_after.travel {
                            next_after.travel -= margin;
                        } else {
                            next_after.travel = 0;
                        }
                        earliest_after = b_tw.start;
                    }

                    new_action_time = b.service;
                    break_rank += 1;
                }

                if earliest_after + new_action_time + next_after.travel > next_after.latest {
                    return false;
                }
            }
        }

        current.earliest + next.travel <= next.latest
    }

    /// Record pickups carrying a lifetime cap and check matched deliveries
    /// against it while walking an insertion range.
    fn lifetime_ok(
        &self,
        input: &Input,
        job_rank: usize,
        service_start: Duration,
        open_lifetimes: &mut Vec<(usize, Duration)>,
    ) -> bool {
        let job = &input.jobs[job_rank];
        match job.job_type {
            JobType::Pickup => {
                if job.max_lifetime.is_some() {
                    open_lifetimes.push((job_rank, service_start));
                }
                true
            }
            JobType::Delivery => {
                let pickup_rank = job_rank - 1;
                match open_lifetimes.iter().position(|&(r, _)| r == pickup_rank) {
                    Some(pos) => {
                        let (_, pickup_start) = open_lifetimes.swap_remove(pos);
                        let max_lifetime = input.jobs[pickup_rank]
                            .max_lifetime
                            .expect("lifetime recorded without a cap");
                        service_start - pickup_start <= max_lifetime
                    }
                    None => true,
                }
            }
            JobType::Single => true,
        }
    }

    /// Mutating splice: install seq over [first_rank; last_rank), then
    /// propagate earliest dates forward and latest dates backward from the
    /// first changed rank, stopping on monotone convergence. Must only be
    /// called with a splice `is_valid_seq_addition_for_tw` accepted.
    pub fn replace_impl<S: JobSequence + ?Sized>(
        &mut self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
    ) {
        debug_assert!(first_rank <= last_rank);

        let v = &input.vehicles[self.raw.v_rank];
        let amount_size = input.amount_size();

        let mut current;
        let mut next;

        if !seq.is_empty() {
            current = self.previous_info(input, seq.job_at(0), first_rank);
            next = self.next_info(input, seq.job_at(seq.len() - 1), last_rank);
        } else {
            current = PreviousInfo {
                earliest: self.v_start,
                travel: 0,
                location_index: None,
            };
            next = NextInfo {
                latest: self.v_end,
                travel: 0,
            };

            if first_rank > 0 {
                let previous_job = &input.jobs[self.raw.jobs[first_rank - 1]];
                let previous_index = previous_job.index();
                current.earliest =
                    self.earliest[first_rank - 1] + self.action_time[first_rank - 1];
                current.location_index = Some(previous_index);

                if last_rank < self.raw.jobs.len() {
                    next.latest = self.latest[last_rank];
                    next.travel = v.duration(
                        previous_index,
                        input.jobs[self.raw.jobs[last_rank]].index(),
                    );
                } else if let Some(end) = &v.end {
                    next.travel = v.duration(previous_index, end.index());
                }
            } else if last_rank < self.raw.jobs.len() {
                next.latest = self.latest[last_rank];
                if let Some(start) = &v.start {
                    current.location_index = Some(start.index());
                    next.travel = v.duration(
                        start.index(),
                        input.jobs[self.raw.jobs[last_rank]].index(),
                    );
                }
            }
        }

        let mut current_break =
            self.breaks_counts[first_rank] - self.breaks_at_rank[first_rank];
        let last_break = self.breaks_counts[last_rank];

        let previous_init_load = if self.raw.jobs.is_empty() {
            input.zero_amount().clone()
        } else {
            self.raw.load_at_step(first_rank).clone()
        };
        let previous_final_load = if self.raw.jobs.is_empty() {
            input.zero_amount().clone()
        } else {
            self.raw.load_at_step(last_rank).clone()
        };
        let range_delivery = self.raw.delivery_in_range(first_rank, last_rank);
        debug_assert!(range_delivery <= previous_init_load);
        let delta_delivery = delivery - &range_delivery;
        let mut current_load = &previous_init_load + &delta_delivery;

        // Deliveries added before the range shrink every margin prior to it.
        // Saturate rather than overflow when a margin sits at the numeric
        // ceiling.
        debug_assert!(
            current_break == 0
                || delta_delivery <= self.fwd_smallest_breaks_load_margin[current_break - 1]
        );
        for i in 0..current_break {
            debug_assert!(delta_delivery <= self.fwd_smallest_breaks_load_margin[i]);
            for a in 0..amount_size {
                let margin = self.fwd_smallest_breaks_load_margin[i][a];
                if -delta_delivery[a] <= Capacity::MAX - margin {
                    self.fwd_smallest_breaks_load_margin[i][a] = margin - delta_delivery[a];
                } else {
                    self.fwd_smallest_breaks_load_margin[i][a] = Capacity::MAX;
                }
            }
        }

        let mut previous_breaks_counts = if first_rank != 0 {
            self.breaks_counts[first_rank - 1]
        } else {
            0
        };

        // Resize bookkeeping vectors; dummy values and stale entries in the
        // insertion range are overwritten below. Old earliest/latest values
        // must be clobbered so they can't accidentally match recomputed ones
        // and stop propagation early.
        let erase_count = last_rank - first_rank;
        let add_count = seq.len();

        if add_count < erase_count {
            let to_erase = erase_count - add_count;
            self.raw.jobs.drain(first_rank..first_rank + to_erase);
            self.earliest.drain(first_rank..first_rank + to_erase);
            self.latest.drain(first_rank..first_rank + to_erase);
            self.action_time.drain(first_rank..first_rank + to_erase);
            self.breaks_at_rank.drain(first_rank..first_rank + to_erase);
            self.breaks_counts.drain(first_rank..first_rank + to_erase);

            for r in first_rank..first_rank + add_count {
                self.earliest[r] = Duration::MAX;
                self.latest[r] = 0;
            }
        } else {
            for r in first_rank..first_rank + erase_count {
                self.earliest[r] = Duration::MAX;
                self.latest[r] = 0;
            }

            let to_insert = add_count - erase_count;
            insert_n(&mut self.raw.jobs, first_rank, to_insert, 0);
            insert_n(&mut self.earliest, first_rank, to_insert, 0);
            insert_n(&mut self.latest, first_rank, to_insert, 0);
            insert_n(&mut self.action_time, first_rank, to_insert, 0);
            insert_n(&mut self.breaks_at_rank, first_rank, to_insert, 0);
            insert_n(&mut self.breaks_counts, first_rank, to_insert, 0);
        }

        let mut current_job_rank = first_rank;
        let mut breaks_before = 0usize;

        let mut job_i = 0;
        while job_i < seq.len() || current_break != last_break {
            if job_i == seq.len() {
                // Break after the last inserted jobs.
                let b = &v.breaks[current_break];
                debug_assert!(b.is_valid_for_load(&current_load));

                let b_tw_rank = first_tw_from(&b.tws, current.earliest)
                    .expect("invalid break window in accepted splice");
                let b_tw = &b.tws[b_tw_rank];

                if current.earliest < b_tw.start {
                    let margin = b_tw.start - current.earliest;
                    if margin < next.travel {
                        next.travel -= margin;
                    } else {
                        next.travel = 0;
                    }
                    current.earliest = b_tw.start;
                }
                self.break_earliest[current_break] = current.earliest;

                current.earliest += b.service;

                self.update_fwd_break_margin(current_break, &current_load, amount_size, v);

                breaks_before += 1;
                current_break += 1;
                continue;
            }

            let job_rank = seq.job_at(job_i);
            let job = &input.jobs[job_rank];

            if current_break == last_break {
                // Job after the last inserted breaks.
                current.earliest += current.travel;

                let j_tw_rank = first_tw_from(&job.tws, current.earliest)
                    .expect("invalid job window in accepted splice");

                current.earliest = current.earliest.max(job.tws[j_tw_rank].start);

                self.raw.jobs[current_job_rank] = job_rank;
                self.earliest[current_job_rank] = current.earliest;
                self.breaks_at_rank[current_job_rank] = breaks_before;
                self.breaks_counts[current_job_rank] = previous_breaks_counts + breaks_before;

                self.action_time[current_job_rank] =
                    action_time_for(job, self.raw.vtype, current.location_index);
                current.location_index = Some(job.index());
                current.earliest += self.action_time[current_job_rank];

                current_job_rank += 1;
                previous_breaks_counts += breaks_before;
                breaks_before = 0;

                debug_assert!(job.delivery <= current_load);
                current_load += &job.pickup;
                current_load -= &job.delivery;

                job_i += 1;
                if job_i < seq.len() {
                    current.travel =
                        v.duration(job.index(), input.jobs[seq.job_at(job_i)].index());
                }
                continue;
            }

            // Both a job and a break remain: decide on ordering.
            let b = &v.breaks[current_break];
            let job_action_time = action_time_for(job, self.raw.vtype, current.location_index);

            let mut tighter_next = next;
            if job_i + 1 < seq.len() {
                let next_j = &input.jobs[seq.job_at(job_i + 1)];
                debug_assert!(next.travel <= next.latest);
                tighter_next.latest =
                    (next.latest - next.travel).min(next_j.tws.last().unwrap().end);
                tighter_next.travel = v.duration(job.index(), next_j.index());
            }

            let oc = self.order_choice(
                input,
                job_rank,
                job_action_time,
                b,
                &current,
                &tighter_next,
                &current_load,
                true,
            );

            debug_assert!(oc.add_job_first != oc.add_break_first);
            if oc.add_break_first {
                debug_assert!(b.is_valid_for_load(&current_load));

                let b_tw = &b.tws[oc.b_tw.unwrap()];
                if current.earliest < b_tw.start {
                    let margin = b_tw.start - current.earliest;
                    if margin < current.travel {
                        current.travel -= margin;
                    } else {
                        current.travel = 0;
                    }
                    current.earliest = b_tw.start;
                }
                self.break_earliest[current_break] = current.earliest;

                current.earliest += b.service;

                self.update_fwd_break_margin(current_break, &current_load, amount_size, v);

                breaks_before += 1;
                current_break += 1;
            }
            if oc.add_job_first {
                let j_tw = &job.tws[oc.j_tw.unwrap()];
                current.earliest = (current.earliest + current.travel).max(j_tw.start);

                self.raw.jobs[current_job_rank] = job_rank;
                self.earliest[current_job_rank] = current.earliest;
                self.breaks_at_rank[current_job_rank] = breaks_before;
                self.breaks_counts[current_job_rank] = previous_breaks_counts + breaks_before;

                self.action_time[current_job_rank] = job_action_time;
                current.earliest += job_action_time;
                current.location_index = Some(job.index());

                current_job_rank += 1;
                previous_breaks_counts += breaks_before;
                breaks_before = 0;

                debug_assert!(job.delivery <= current_load);
                current_load += &job.pickup;
                current_load -= &job.delivery;

                job_i += 1;
                if job_i < seq.len() {
                    current.travel =
                        v.duration(job.index(), input.jobs[seq.job_at(job_i)].index());
                }
            }
        }

        debug_assert!(current_job_rank == first_rank + add_count);

        // Pickups added inside the range shrink every margin after it.
        let delta_pickup = &current_load - &previous_final_load;
        for i in last_break..v.breaks.len() {
            debug_assert!(delta_pickup <= self.bwd_smallest_breaks_load_margin[i]);
            for a in 0..amount_size {
                let margin = self.bwd_smallest_breaks_load_margin[i][a];
                if -delta_pickup[a] <= Capacity::MAX - margin {
                    self.bwd_smallest_breaks_load_margin[i][a] = margin - delta_pickup[a];
                } else {
                    self.bwd_smallest_breaks_load_margin[i][a] = Capacity::MAX;
                }
            }
        }

        // Remaining breaks due before the next unchanged step.
        self.breaks_at_rank[current_job_rank] = breaks_before;
        debug_assert!(
            previous_breaks_counts + self.breaks_at_rank[current_job_rank]
                == self.breaks_counts[current_job_rank]
        );

        if !self.raw.jobs.is_empty() {
            let mut valid_latest_date_rank = current_job_rank;
            let mut valid_earliest_date_rank = 0;
            let replace_last_jobs = current_job_rank == self.raw.jobs.len();
            let mut do_update_last_latest_date = false;

            if replace_last_jobs {
                self.earliest_end = current.earliest + next.travel;
                do_update_last_latest_date = true;
                valid_latest_date_rank = self.raw.jobs.len() - 1;
            } else {
                // current_job_rank is the first non-replaced job.
                let job = &input.jobs[self.raw.jobs[current_job_rank]];

                let new_action_time =
                    action_time_for(job, self.raw.vtype, current.location_index);
                debug_assert!(
                    self.action_time[current_job_rank] == job.services[self.raw.vtype]
                        || self.action_time[current_job_rank]
                            == job.services[self.raw.vtype] + job.setups[self.raw.vtype]
                );

                let current_action_time_changed =
                    new_action_time != self.action_time[current_job_rank];
                if current_action_time_changed {
                    // Time spent at the first non-replaced task changed, so
                    // its latest date must be refreshed, either directly at
                    // route end or by backward propagation from the next
                    // task. Zero the stored latest so propagation cannot
                    // stop on a stale match.
                    if current_job_rank == self.raw.jobs.len() - 1 {
                        do_update_last_latest_date = true;
                    } else {
                        valid_latest_date_rank = current_job_rank + 1;
                        self.latest[current_job_rank] = 0;
                    }
                }

                if current_job_rank == 0 {
                    // Route head was erased without replacement: refresh the
                    // new first job in place.
                    current.earliest += next.travel;
                    let j_tw_rank = first_tw_from(&job.tws, current.earliest)
                        .expect("invalid job window in accepted splice");

                    self.earliest[0] = current.earliest.max(job.tws[j_tw_rank].start);
                    debug_assert!(
                        self.earliest[0] <= self.latest[0]
                            || (current_action_time_changed
                                && self.latest[current_job_rank] == 0)
                    );
                    self.action_time[0] = new_action_time;
                } else {
                    valid_earliest_date_rank = current_job_rank - 1;
                    if current_action_time_changed {
                        // Same trick for forward propagation.
                        self.earliest[current_job_rank] = Duration::MAX;
                    }
                }
            }

            if !replace_last_jobs {
                self.fwd_update_action_time_from(input, valid_earliest_date_rank);
                self.fwd_update_earliest_from(input, valid_earliest_date_rank);
            }

            if do_update_last_latest_date {
                self.update_last_latest_date(input);
            }
            self.bwd_update_latest_from(input, valid_latest_date_rank);
        }

        self.raw.update_amounts(input);

        if last_break < v.breaks.len() {
            self.fwd_update_breaks_load_margin_from(input, current_job_rank);
        }
        if last_break > 0 {
            self.bwd_update_breaks_load_margin_from(input, current_job_rank);
        }
    }

    fn update_fwd_break_margin(
        &mut self,
        current_break: usize,
        current_load: &Amount,
        amount_size: usize,
        v: &Vehicle,
    ) {
        let current_margin = match &v.breaks[current_break].max_load {
            Some(max_load) => max_load - current_load,
            None => Amount::max_value(amount_size),
        };
        if current_break == 0 {
            self.fwd_smallest_breaks_load_margin[0] = current_margin;
        } else {
            let mut margin = self.fwd_smallest_breaks_load_margin[current_break - 1].clone();
            margin.min_with(&current_margin);
            self.fwd_smallest_breaks_load_margin[current_break] = margin;
        }
    }
}

fn insert_n<T: Clone>(v: &mut Vec<T>, at: usize, count: usize, value: T) {
    v.splice(at..at, std::iter::repeat(value).take(count));
}

impl Route for TwRoute {
    fn new(input: &Input, v_rank: usize) -> Self {
        TwRoute::new(input, v_rank)
    }

    fn raw(&self) -> &RawRoute {
        &self.raw
    }

    fn set_route(&mut self, input: &Input, jobs: Vec<usize>) {
        let mut delivery = input.zero_amount().clone();
        for &j in &jobs {
            if input.jobs[j].job_type == JobType::Single {
                delivery += &input.jobs[j].delivery;
            }
        }
        let size = self.size();
        self.replace_impl(input, &delivery, &jobs[..], 0, size);
    }

    fn add(&mut self, input: &Input, job_rank: usize, rank: usize) {
        debug_assert!(rank <= self.size());
        debug_assert!(input.jobs[job_rank].job_type == JobType::Single);
        let delivery = input.jobs[job_rank].delivery.clone();
        self.replace_impl(input, &delivery, &[job_rank][..], rank, rank);
    }

    fn remove(&mut self, input: &Input, rank: usize, count: usize) {
        debug_assert!(rank + count <= self.size());
        let zero = input.zero_amount().clone();
        let empty: [usize; 0] = [];
        self.replace_impl(input, &zero, &empty[..], rank, rank + count);
    }

    fn replace<S: JobSequence + ?Sized>(
        &mut self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
    ) {
        self.replace_impl(input, delivery, seq, first_rank, last_rank);
    }

    fn is_valid_addition_for_tw(&self, input: &Input, job_rank: usize, rank: usize) -> bool {
        debug_assert!(rank <= self.size());
        debug_assert!(input.jobs[job_rank].job_type == JobType::Single);
        self.is_valid_seq_addition_for_tw_impl(
            input,
            &input.jobs[job_rank].delivery,
            &[job_rank][..],
            rank,
            rank,
            true,
        )
    }

    fn is_valid_addition_for_tw_without_max_load(
        &self,
        input: &Input,
        job_rank: usize,
        rank: usize,
    ) -> bool {
        debug_assert!(rank <= self.size());
        self.is_valid_seq_addition_for_tw_impl(
            input,
            &input.jobs[job_rank].delivery,
            &[job_rank][..],
            rank,
            rank,
            false,
        )
    }

    fn is_valid_seq_addition_for_tw<S: JobSequence + ?Sized>(
        &self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
        check_max_load: bool,
    ) -> bool {
        self.is_valid_seq_addition_for_tw_impl(
            input,
            delivery,
            seq,
            first_rank,
            last_rank,
            check_max_load,
        )
    }

    /// Removal can invalidate a route on its own: dropping a task may make
    /// setup time apply downstream where it previously did not.
    fn is_valid_removal(&self, input: &Input, rank: usize, count: usize) -> bool {
        debug_assert!(!self.empty());
        debug_assert!(rank + count <= self.size());
        let empty: [usize; 0] = [];
        self.is_valid_seq_addition_for_tw_impl(
            input,
            input.zero_amount(),
            &empty[..],
            rank,
            rank + count,
            true,
        )
    }
}
