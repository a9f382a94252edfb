use crate::models::{Eval, Input, Priority, Vehicle};

/// Full evaluation of a route for a vehicle: travel legs, task durations
/// (setup applies when the previous location differs) and the fixed cost
/// once the route is non-empty.
pub fn route_eval_for_vehicle(input: &Input, v_rank: usize, jobs: &[usize]) -> Eval {
    let v = &input.vehicles[v_rank];
    let mut eval = Eval::default();

    if jobs.is_empty() {
        return eval;
    }

    eval.cost += v.fixed_cost();

    let mut previous_index: Option<usize> = v.start.as_ref().map(|s| s.index());
    for &j in jobs {
        let job = &input.jobs[j];
        if let Some(p) = previous_index {
            eval += v.eval(p, job.index());
        }
        let action_time = if previous_index == Some(job.index()) {
            job.services[v.vtype]
        } else {
            job.setups[v.vtype] + job.services[v.vtype]
        };
        eval += v.task_eval(action_time);
        previous_index = Some(job.index());
    }
    if let Some(end) = &v.end {
        if let Some(p) = previous_index {
            eval += v.eval(p, end.index());
        }
    }

    eval
}

/// Biggest single leg in the route, used as the slack term in insertion
/// lower bounds.
pub fn max_edge_eval(input: &Input, vehicle: &Vehicle, jobs: &[usize]) -> Eval {
    let mut max = Eval::default();

    let mut previous_index: Option<usize> = vehicle.start.as_ref().map(|s| s.index());
    for &j in jobs {
        let index = input.jobs[j].index();
        if let Some(p) = previous_index {
            max = max.max(vehicle.eval(p, index));
        }
        previous_index = Some(index);
    }
    if let (Some(p), Some(end)) = (previous_index, &vehicle.end) {
        max = max.max(vehicle.eval(p, end.index()));
    }

    max
}

/// Travel delta for inserting a single job at `rank`.
pub fn addition_cost(
    input: &Input,
    job_rank: usize,
    vehicle: &Vehicle,
    jobs: &[usize],
    rank: usize,
) -> Eval {
    debug_assert!(rank <= jobs.len());

    let job_index = input.jobs[job_rank].index();
    let mut previous_eval = Eval::default();
    let mut next_eval = Eval::default();
    let mut old_edge_eval = Eval::default();

    if rank == jobs.len() {
        if rank == 0 {
            // Adding to an empty route.
            if let Some(start) = &vehicle.start {
                previous_eval = vehicle.eval(start.index(), job_index);
            }
            if let Some(end) = &vehicle.end {
                next_eval = vehicle.eval(job_index, end.index());
            }
        } else {
            // Adding past the end of an existing route.
            let p_index = input.jobs[jobs[rank - 1]].index();
            previous_eval = vehicle.eval(p_index, job_index);
            if let Some(end) = &vehicle.end {
                old_edge_eval = vehicle.eval(p_index, end.index());
                next_eval = vehicle.eval(job_index, end.index());
            }
        }
    } else {
        let n_index = input.jobs[jobs[rank]].index();
        next_eval = vehicle.eval(job_index, n_index);

        if rank == 0 {
            if let Some(start) = &vehicle.start {
                previous_eval = vehicle.eval(start.index(), job_index);
                old_edge_eval = vehicle.eval(start.index(), n_index);
            }
        } else {
            let p_index = input.jobs[jobs[rank - 1]].index();
            previous_eval = vehicle.eval(p_index, job_index);
            old_edge_eval = vehicle.eval(p_index, n_index);
        }
    }

    previous_eval + next_eval - old_edge_eval
}

/// Travel delta for inserting a pickup at `rank` with its delivery directly
/// after it.
pub fn in_place_pd_addition_cost(
    input: &Input,
    pickup_rank: usize,
    vehicle: &Vehicle,
    jobs: &[usize],
    rank: usize,
) -> Eval {
    let p_index = input.jobs[pickup_rank].index();
    let d_index = input.jobs[pickup_rank + 1].index();

    let mut previous_eval = Eval::default();
    let mut next_eval = Eval::default();
    let mut old_edge_eval = Eval::default();

    if rank == 0 {
        if let Some(start) = &vehicle.start {
            previous_eval = vehicle.eval(start.index(), p_index);
            if !jobs.is_empty() {
                old_edge_eval = vehicle.eval(start.index(), input.jobs[jobs[0]].index());
            }
        }
    } else {
        let before_index = input.jobs[jobs[rank - 1]].index();
        previous_eval = vehicle.eval(before_index, p_index);
        if rank < jobs.len() {
            old_edge_eval = vehicle.eval(before_index, input.jobs[jobs[rank]].index());
        } else if let Some(end) = &vehicle.end {
            old_edge_eval = vehicle.eval(before_index, end.index());
        }
    }

    if rank == jobs.len() {
        if let Some(end) = &vehicle.end {
            next_eval = vehicle.eval(d_index, end.index());
        }
    } else {
        next_eval = vehicle.eval(d_index, input.jobs[jobs[rank]].index());
    }

    previous_eval + vehicle.eval(p_index, d_index) + next_eval - old_edge_eval
}

pub fn priority_sum_for_route(input: &Input, jobs: &[usize]) -> Priority {
    jobs.iter().map(|&j| input.jobs[j].priority).sum()
}

/// FNV-1a over the little-endian bytes, for the route-sizes hash in
/// solution indicators.
pub fn get_vector_hash(values: &[u32]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for v in values {
        for byte in v.to_le_bytes() {
            hash ^= u32::from(byte);
            hash = hash.wrapping_mul(0x0100_0193);
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::testing::two_singles_input;

    #[test]
    fn addition_cost_matches_route_eval_delta() {
        let input = two_singles_input();
        let v = &input.vehicles[0];

        let before = route_eval_for_vehicle(&input, 0, &[0]);
        let delta = addition_cost(&input, 1, v, &[0], 1);
        let after = route_eval_for_vehicle(&input, 0, &[0, 1]);

        assert_eq!(after, before + delta);
    }

    #[test]
    fn vector_hash_separates_permutations() {
        assert_eq!(get_vector_hash(&[1, 2, 3]), get_vector_hash(&[1, 2, 3]));
        assert_ne!(get_vector_hash(&[1, 2, 3]), get_vector_hash(&[1, 3, 2]));
        assert_ne!(get_vector_hash(&[]), get_vector_hash(&[0]));
    }
}
