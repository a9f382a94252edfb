use crate::models::{Eval, Input, Priority};
use crate::utils::route_eval_for_vehicle;

use super::route::Route;

/// Axis-aligned bounding box over route task coordinates. Routes without
/// coordinates keep an empty box, which intersects everything.
#[derive(Clone, Copy, Debug)]
pub struct BBox {
    min: [f64; 2],
    max: [f64; 2],
}

impl Default for BBox {
    fn default() -> Self {
        BBox {
            min: [f64::MAX, f64::MAX],
            max: [f64::MIN, f64::MIN],
        }
    }
}

impl BBox {
    pub fn extend(&mut self, c: [f64; 2]) {
        self.min[0] = self.min[0].min(c[0]);
        self.min[1] = self.min[1].min(c[1]);
        self.max[0] = self.max[0].max(c[0]);
        self.max[1] = self.max[1].max(c[1]);
    }

    pub fn is_empty(&self) -> bool {
        self.max[0] < self.min[0]
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        if self.is_empty() || other.is_empty() {
            return true;
        }
        self.min[0] <= other.max[0]
            && other.min[0] <= self.max[0]
            && self.min[1] <= other.max[1]
            && other.min[1] <= self.max[1]
    }
}

/// Per-route derived caches, rebuilt on demand from `(input, routes)`.
/// Never authoritative: any operator application invalidates the caches of
/// the vehicles it touched, which the driver then recomputes.
pub struct SolutionState {
    nb_vehicles: usize,

    // fwd_evals[v][new_v][i]: cumulated evaluation of route v edges from
    // rank 0 up to rank i, seen through new_v's cost wrapper. bwd_evals is
    // the same with all edges reversed.
    pub fwd_evals: Vec<Vec<Vec<Eval>>>,
    pub bwd_evals: Vec<Vec<Vec<Eval>>>,

    // fwd_skill_rank[v1][v2]: max rank r such that v2 can handle jobs of
    // route v1 strictly before r. bwd_skill_rank[v1][v2]: min rank r such
    // that v2 can handle all jobs from r on.
    pub fwd_skill_rank: Vec<Vec<usize>>,
    pub bwd_skill_rank: Vec<Vec<usize>>,

    // Priority prefix/suffix sums per route.
    pub fwd_priority: Vec<Vec<Priority>>,
    pub bwd_priority: Vec<Vec<Priority>>,

    // Edge sums around single nodes/edges and the matching removal gains.
    pub edge_evals_around_node: Vec<Vec<Eval>>,
    pub node_gains: Vec<Vec<Eval>>,
    pub edge_evals_around_edge: Vec<Vec<Eval>>,
    pub edge_gains: Vec<Vec<Eval>>,

    // Gain of removing the pickup at rank i together with its delivery.
    pub pd_gains: Vec<Vec<Eval>>,

    pub matching_delivery_rank: Vec<Vec<usize>>,
    pub matching_pickup_rank: Vec<Vec<usize>>,

    // cheapest_job_rank_in_routes_from[v1][v2][r]: rank in route v2
    // minimising the cost (from v2's perspective) of an edge leaving job at
    // rank r of route v1; _to is the symmetric table for incoming edges.
    pub cheapest_job_rank_in_routes_from: Vec<Vec<Vec<usize>>>,
    pub cheapest_job_rank_in_routes_to: Vec<Vec<Vec<usize>>>,

    pub route_evals: Vec<Eval>,
    pub route_bbox: Vec<BBox>,
}

impl SolutionState {
    pub fn new(input: &Input) -> Self {
        let nb_vehicles = input.vehicles.len();
        SolutionState {
            nb_vehicles,
            fwd_evals: vec![vec![Vec::new(); nb_vehicles]; nb_vehicles],
            bwd_evals: vec![vec![Vec::new(); nb_vehicles]; nb_vehicles],
            fwd_skill_rank: vec![vec![0; nb_vehicles]; nb_vehicles],
            bwd_skill_rank: vec![vec![0; nb_vehicles]; nb_vehicles],
            fwd_priority: vec![Vec::new(); nb_vehicles],
            bwd_priority: vec![Vec::new(); nb_vehicles],
            edge_evals_around_node: vec![Vec::new(); nb_vehicles],
            node_gains: vec![Vec::new(); nb_vehicles],
            edge_evals_around_edge: vec![Vec::new(); nb_vehicles],
            edge_gains: vec![Vec::new(); nb_vehicles],
            pd_gains: vec![Vec::new(); nb_vehicles],
            matching_delivery_rank: vec![Vec::new(); nb_vehicles],
            matching_pickup_rank: vec![Vec::new(); nb_vehicles],
            cheapest_job_rank_in_routes_from: vec![vec![Vec::new(); nb_vehicles]; nb_vehicles],
            cheapest_job_rank_in_routes_to: vec![vec![Vec::new(); nb_vehicles]; nb_vehicles],
            route_evals: vec![Eval::default(); nb_vehicles],
            route_bbox: vec![BBox::default(); nb_vehicles],
        }
    }

    pub fn setup<R: Route>(&mut self, input: &Input, routes: &[R]) {
        for v in 0..self.nb_vehicles {
            self.update_route(input, routes, v);
        }
        for v1 in 0..self.nb_vehicles {
            for v2 in 0..self.nb_vehicles {
                if v1 != v2 {
                    self.update_cheapest_job_rank_in_routes(input, routes, v1, v2);
                }
            }
        }
    }

    /// Refresh every cache tied to one vehicle's route.
    pub fn update_route<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        self.update_costs(input, routes, v);
        self.update_skills(input, routes, v);
        self.update_priorities(input, routes, v);
        self.set_pd_matching_ranks(input, routes, v);
        self.set_node_gains(input, routes, v);
        self.set_edge_gains(input, routes, v);
        self.set_pd_gains(input, routes, v);
        self.update_route_eval(input, routes, v);
        self.update_route_bbox(input, routes, v);
    }

    fn update_costs<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let jobs = routes[v].jobs();
        let n = jobs.len();

        for new_v in 0..self.nb_vehicles {
            let vehicle = &input.vehicles[new_v];
            let fwd = &mut self.fwd_evals[v][new_v];
            let bwd = &mut self.bwd_evals[v][new_v];
            fwd.clear();
            bwd.clear();
            fwd.reserve(n);
            bwd.reserve(n);

            let mut fwd_sum = Eval::default();
            let mut bwd_sum = Eval::default();
            for i in 0..n {
                if i > 0 {
                    let from = input.jobs[jobs[i - 1]].index();
                    let to = input.jobs[jobs[i]].index();
                    fwd_sum += vehicle.eval(from, to);
                    bwd_sum += vehicle.eval(to, from);
                }
                fwd.push(fwd_sum);
                bwd.push(bwd_sum);
            }
        }
    }

    fn update_skills<R: Route>(&mut self, input: &Input, routes: &[R], v1: usize) {
        let jobs = routes[v1].jobs();
        for v2 in 0..self.nb_vehicles {
            if v1 == v2 {
                self.fwd_skill_rank[v1][v2] = jobs.len();
                self.bwd_skill_rank[v1][v2] = 0;
                continue;
            }

            let fwd = jobs
                .iter()
                .position(|&j| !input.vehicle_ok_with_job(v2, j))
                .unwrap_or(jobs.len());
            self.fwd_skill_rank[v1][v2] = fwd;

            let bwd = jobs
                .iter()
                .rposition(|&j| !input.vehicle_ok_with_job(v2, j))
                .map(|r| r + 1)
                .unwrap_or(0);
            self.bwd_skill_rank[v1][v2] = bwd;
        }
    }

    fn update_priorities<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let jobs = routes[v].jobs();

        self.fwd_priority[v].clear();
        let mut sum: Priority = 0;
        for &j in jobs {
            sum += input.jobs[j].priority;
            self.fwd_priority[v].push(sum);
        }

        self.bwd_priority[v].clear();
        self.bwd_priority[v].resize(jobs.len(), 0);
        let mut sum: Priority = 0;
        for i in (0..jobs.len()).rev() {
            sum += input.jobs[jobs[i]].priority;
            self.bwd_priority[v][i] = sum;
        }
    }

    fn set_pd_matching_ranks<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let jobs = routes[v].jobs();
        self.matching_delivery_rank[v].clear();
        self.matching_delivery_rank[v].resize(jobs.len(), 0);
        self.matching_pickup_rank[v].clear();
        self.matching_pickup_rank[v].resize(jobs.len(), 0);

        for (i, &j) in jobs.iter().enumerate() {
            match input.jobs[j].job_type {
                crate::models::JobType::Pickup => {
                    let d_job = j + 1;
                    let d_rank = jobs
                        .iter()
                        .position(|&other| other == d_job)
                        .expect("pickup without matching delivery in route");
                    self.matching_delivery_rank[v][i] = d_rank;
                    self.matching_pickup_rank[v][d_rank] = i;
                }
                _ => {}
            }
        }
    }

    // Edge evaluation between two route positions, including the absent-edge
    // cases at route ends.
    fn edge_eval<R: Route>(
        &self,
        input: &Input,
        routes: &[R],
        v: usize,
        from_rank: Option<usize>,
        to_rank: Option<usize>,
    ) -> Eval {
        let vehicle = &input.vehicles[v];
        let jobs = routes[v].jobs();

        let from_index = match from_rank {
            Some(r) => Some(input.jobs[jobs[r]].index()),
            None => vehicle.start.as_ref().map(|s| s.index()),
        };
        let to_index = match to_rank {
            Some(r) => Some(input.jobs[jobs[r]].index()),
            None => vehicle.end.as_ref().map(|e| e.index()),
        };

        match (from_index, to_index) {
            (Some(f), Some(t)) => vehicle.eval(f, t),
            _ => Eval::default(),
        }
    }

    fn task_eval<R: Route>(&self, input: &Input, routes: &[R], v: usize, rank: usize) -> Eval {
        let vehicle = &input.vehicles[v];
        let jobs = routes[v].jobs();
        let job = &input.jobs[jobs[rank]];

        let previous_index = if rank == 0 {
            vehicle.start.as_ref().map(|s| s.index())
        } else {
            Some(input.jobs[jobs[rank - 1]].index())
        };
        let action = if previous_index == Some(job.index()) {
            job.services[vehicle.vtype]
        } else {
            job.setups[vehicle.vtype] + job.services[vehicle.vtype]
        };
        vehicle.task_eval(action)
    }

    fn set_node_gains<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let n = routes[v].size();
        self.edge_evals_around_node[v].clear();
        self.edge_evals_around_node[v].resize(n, Eval::default());
        self.node_gains[v].clear();
        self.node_gains[v].resize(n, Eval::default());

        for i in 0..n {
            let previous = self.edge_eval(input, routes, v, i.checked_sub(1), Some(i));
            let next = if i + 1 < n {
                self.edge_eval(input, routes, v, Some(i), Some(i + 1))
            } else {
                self.edge_eval(input, routes, v, Some(i), None)
            };
            let new_edge = match (i.checked_sub(1), i + 1 < n) {
                (Some(p), true) => self.edge_eval(input, routes, v, Some(p), Some(i + 1)),
                (Some(p), false) => self.edge_eval(input, routes, v, Some(p), None),
                (None, true) => self.edge_eval(input, routes, v, None, Some(i + 1)),
                (None, false) => {
                    // Removing the only job: the start -> end edge does not
                    // appear since the route becomes empty.
                    Eval::default()
                }
            };

            self.edge_evals_around_node[v][i] = previous + next;
            self.node_gains[v][i] =
                previous + next - new_edge + self.task_eval(input, routes, v, i);
        }
    }

    fn set_edge_gains<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let n = routes[v].size();
        let count = n.saturating_sub(1);
        self.edge_evals_around_edge[v].clear();
        self.edge_evals_around_edge[v].resize(count, Eval::default());
        self.edge_gains[v].clear();
        self.edge_gains[v].resize(count, Eval::default());

        for i in 0..count {
            let previous = self.edge_eval(input, routes, v, i.checked_sub(1), Some(i));
            let next = if i + 2 < n {
                self.edge_eval(input, routes, v, Some(i + 1), Some(i + 2))
            } else {
                self.edge_eval(input, routes, v, Some(i + 1), None)
            };
            let new_edge = match (i.checked_sub(1), i + 2 < n) {
                (Some(p), true) => self.edge_eval(input, routes, v, Some(p), Some(i + 2)),
                (Some(p), false) => self.edge_eval(input, routes, v, Some(p), None),
                (None, true) => self.edge_eval(input, routes, v, None, Some(i + 2)),
                (None, false) => Eval::default(),
            };

            self.edge_evals_around_edge[v][i] = previous + next;
            self.edge_gains[v][i] = previous + next - new_edge
                + self.task_eval(input, routes, v, i)
                + self.task_eval(input, routes, v, i + 1);
        }
    }

    fn set_pd_gains<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let jobs: Vec<usize> = routes[v].jobs().to_vec();
        let n = jobs.len();
        self.pd_gains[v].clear();
        self.pd_gains[v].resize(n, Eval::default());

        for i in 0..n {
            if input.jobs[jobs[i]].job_type != crate::models::JobType::Pickup {
                continue;
            }
            let d_rank = self.matching_delivery_rank[v][i];

            self.pd_gains[v][i] = if d_rank == i + 1 {
                // Adjacent pair, from the edge cache.
                self.edge_gains[v][i]
            } else {
                self.node_gains[v][i] + self.node_gains[v][d_rank]
            };
        }
    }

    pub fn update_cheapest_job_rank_in_routes<R: Route>(
        &mut self,
        input: &Input,
        routes: &[R],
        v1: usize,
        v2: usize,
    ) {
        let route_1 = routes[v1].jobs();
        let route_2 = routes[v2].jobs();
        let vehicle_2 = &input.vehicles[v2];

        let from = &mut self.cheapest_job_rank_in_routes_from[v1][v2];
        let to = &mut self.cheapest_job_rank_in_routes_to[v1][v2];
        from.clear();
        from.resize(route_1.len(), 0);
        to.clear();
        to.resize(route_1.len(), 0);

        for (r1, &j1) in route_1.iter().enumerate() {
            let index_1 = input.jobs[j1].index();
            let mut best_from = crate::models::Cost::MAX;
            let mut best_to = crate::models::Cost::MAX;

            for (r2, &j2) in route_2.iter().enumerate() {
                let index_2 = input.jobs[j2].index();

                let cost_from = vehicle_2.cost(index_1, index_2);
                if cost_from < best_from {
                    best_from = cost_from;
                    from[r1] = r2;
                }

                let cost_to = vehicle_2.cost(index_2, index_1);
                if cost_to < best_to {
                    best_to = cost_to;
                    to[r1] = r2;
                }
            }
        }
    }

    fn update_route_eval<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        self.route_evals[v] = route_eval_for_vehicle(input, v, routes[v].jobs());
    }

    fn update_route_bbox<R: Route>(&mut self, input: &Input, routes: &[R], v: usize) {
        let mut bbox = BBox::default();
        for &j in routes[v].jobs() {
            if let Some(c) = input.jobs[j].location.coords() {
                bbox.extend(c);
            }
        }
        self.route_bbox[v] = bbox;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::raw_route::RawRoute;
    use crate::solver::testing::{skills_input, small_pd_input, two_singles_input};
    use crate::utils::route_eval_for_vehicle;

    #[test]
    fn node_gain_matches_removal_delta() {
        let input = two_singles_input();
        let mut r = RawRoute::new(&input, 0);
        r.set_route(&input, vec![0, 1]);
        let routes = vec![r];

        let mut state = SolutionState::new(&input);
        state.setup(&input, &routes);

        for rank in 0..2 {
            let mut shorter = routes[0].jobs.clone();
            shorter.remove(rank);
            let removal_delta = route_eval_for_vehicle(&input, 0, &routes[0].jobs)
                - route_eval_for_vehicle(&input, 0, &shorter);
            assert_eq!(removal_delta, state.node_gains[0][rank]);
        }
    }

    #[test]
    fn skill_frontiers() {
        let input = skills_input();
        let mut r0 = RawRoute::new(&input, 0);
        r0.set_route(&input, vec![0]);
        let r1 = RawRoute::new(&input, 1);
        let routes = vec![r0, r1];

        let mut state = SolutionState::new(&input);
        state.setup(&input, &routes);

        // Vehicle 1 cannot take the job of route 0 at all.
        assert_eq!(state.fwd_skill_rank[0][1], 0);
        assert_eq!(state.bwd_skill_rank[0][1], 1);
    }

    #[test]
    fn pd_gain_for_adjacent_pair_is_edge_gain() {
        let input = small_pd_input();
        let mut r = RawRoute::new(&input, 0);
        r.set_route(&input, vec![1, 2]);
        let routes = vec![r];

        let mut state = SolutionState::new(&input);
        state.setup(&input, &routes);

        assert_eq!(state.pd_gains[0][0], state.edge_gains[0][0]);
    }
}
