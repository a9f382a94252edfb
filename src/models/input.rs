use std::collections::HashMap;

use tracing::debug;

use crate::error::{Error, Result};

use super::{Amount, Cost, Eval, Id, Job, JobType, Vehicle};

/// Frozen problem description: jobs, fleet and every derived table the
/// solver needs. Built once per solve, never mutated afterwards.
#[derive(Debug)]
pub struct Input {
    pub jobs: Vec<Job>,
    pub vehicles: Vec<Vehicle>,

    pub job_id_to_rank: HashMap<Id, usize>,
    pub pickup_id_to_rank: HashMap<Id, usize>,
    pub delivery_id_to_rank: HashMap<Id, usize>,

    zero: Amount,
    amount_size: usize,

    has_tw: bool,
    has_skills: bool,
    has_jobs: bool,
    has_shipments: bool,
    has_initial_routes: bool,
    homogeneous_locations: bool,
    homogeneous_profiles: bool,
    homogeneous_costs: bool,
    all_locations_have_coords: bool,
    geometry: bool,
    report_distances: bool,

    vehicle_to_job_compat: Vec<Vec<bool>>,
    vehicle_to_vehicle_compat: Vec<Vec<bool>>,
    jobs_vehicles_evals: Vec<Vec<Eval>>,
    cost_upper_bound: Cost,
}

impl Input {
    pub fn new(
        jobs: Vec<Job>,
        vehicles: Vec<Vehicle>,
        amount_size: usize,
        geometry: bool,
        report_distances: bool,
    ) -> Result<Self> {
        if vehicles.is_empty() {
            return Err(Error::Input("no vehicle defined".to_string()));
        }

        let mut input = Input {
            zero: Amount::zero(amount_size),
            amount_size,
            has_tw: false,
            has_skills: false,
            has_jobs: false,
            has_shipments: false,
            has_initial_routes: false,
            homogeneous_locations: true,
            homogeneous_profiles: true,
            homogeneous_costs: true,
            all_locations_have_coords: true,
            geometry,
            report_distances,
            job_id_to_rank: HashMap::new(),
            pickup_id_to_rank: HashMap::new(),
            delivery_id_to_rank: HashMap::new(),
            vehicle_to_job_compat: Vec::new(),
            vehicle_to_vehicle_compat: Vec::new(),
            jobs_vehicles_evals: Vec::new(),
            cost_upper_bound: 0,
            jobs,
            vehicles,
        };

        input.resolve_vehicle_types();
        input.run_basic_checks()?;
        input.set_id_maps();
        input.set_flags();
        input.set_cost_upper_bound();
        input.set_skills_compatibility();
        input.set_extra_compatibility();
        input.set_vehicles_compatibility();
        input.set_jobs_vehicles_evals();

        debug!(
            jobs = input.jobs.len(),
            vehicles = input.vehicles.len(),
            has_tw = input.has_tw,
            homogeneous_costs = input.homogeneous_costs,
            "input frozen"
        );

        Ok(input)
    }

    fn resolve_vehicle_types(&mut self) {
        let mut type_names: Vec<String> = Vec::new();
        for v in &mut self.vehicles {
            let rank = match type_names.iter().position(|t| *t == v.type_str) {
                Some(r) => r,
                None => {
                    type_names.push(v.type_str.clone());
                    type_names.len() - 1
                }
            };
            v.vtype = rank;
        }
        for job in &mut self.jobs {
            job.resolve_type_durations(&type_names);
        }
    }

    fn run_basic_checks(&self) -> Result<()> {
        for job in &self.jobs {
            self.check_amount_size(&job.pickup, "job pickup")?;
            self.check_amount_size(&job.delivery, "job delivery")?;
            for w in job.tws.windows(2) {
                if w[1].start <= w[0].end {
                    return Err(Error::Input(format!(
                        "unsorted or overlapping time windows for task {}",
                        job.id
                    )));
                }
            }
        }

        for v in &self.vehicles {
            self.check_amount_size(&v.capacity, "vehicle capacity")?;
            for b in &v.breaks {
                if let Some(max_load) = &b.max_load {
                    self.check_amount_size(max_load, "break max_load")?;
                }
                for w in b.tws.windows(2) {
                    if w[1].start <= w[0].end {
                        return Err(Error::Input(format!(
                            "unsorted or overlapping time windows for break {} of vehicle {}",
                            b.id, v.id
                        )));
                    }
                }
            }
            self.check_vehicle_breaks(v)?;
        }

        // Pickup-delivery pairing: delivery sits right after its pickup.
        for (rank, job) in self.jobs.iter().enumerate() {
            match job.job_type {
                JobType::Pickup => {
                    let next_ok = self
                        .jobs
                        .get(rank + 1)
                        .is_some_and(|d| d.job_type == JobType::Delivery);
                    if !next_ok {
                        return Err(Error::Input(format!(
                            "pickup {} is missing its matching delivery",
                            job.id
                        )));
                    }
                }
                JobType::Delivery => {
                    let prev_ok = rank > 0 && self.jobs[rank - 1].job_type == JobType::Pickup;
                    if !prev_ok {
                        return Err(Error::Input(format!(
                            "delivery {} is missing its matching pickup",
                            job.id
                        )));
                    }
                }
                JobType::Single => {}
            }
        }

        Ok(())
    }

    fn check_amount_size(&self, amount: &Amount, what: &str) -> Result<()> {
        if amount.len() != self.amount_size {
            return Err(Error::Input(format!(
                "inconsistent {} length: {} instead of {}",
                what,
                amount.len(),
                self.amount_size
            )));
        }
        Ok(())
    }

    /// A vehicle's breaks must admit at least one feasible schedule inside
    /// its own time window, even with an empty route.
    fn check_vehicle_breaks(&self, v: &Vehicle) -> Result<()> {
        let break_error = || Error::Input(format!("inconsistent breaks for vehicle {}", v.id));

        let mut previous_earliest = v.tw.start;
        let mut earliest = Vec::with_capacity(v.breaks.len());
        for b in &v.breaks {
            let tw = b
                .tws
                .iter()
                .find(|tw| previous_earliest <= tw.end)
                .ok_or_else(break_error)?;
            let e = previous_earliest.max(tw.start);
            earliest.push(e);
            previous_earliest = e + b.service;
        }

        let mut next_latest = v.tw.end;
        for (i, b) in v.breaks.iter().enumerate().rev() {
            if next_latest < b.service {
                return Err(break_error());
            }
            next_latest -= b.service;
            let tw = b
                .tws
                .iter()
                .rev()
                .find(|tw| tw.start <= next_latest)
                .ok_or_else(break_error)?;
            next_latest = next_latest.min(tw.end);
            if next_latest < earliest[i] {
                return Err(break_error());
            }
        }

        Ok(())
    }

    fn set_id_maps(&mut self) {
        for (rank, job) in self.jobs.iter().enumerate() {
            match job.job_type {
                JobType::Single => {
                    self.job_id_to_rank.insert(job.id, rank);
                }
                JobType::Pickup => {
                    self.pickup_id_to_rank.insert(job.id, rank);
                }
                JobType::Delivery => {
                    self.delivery_id_to_rank.insert(job.id, rank);
                }
            }
        }
    }

    fn set_flags(&mut self) {
        self.has_jobs = self.jobs.iter().any(|j| j.job_type == JobType::Single);
        self.has_shipments = self.jobs.iter().any(|j| j.job_type == JobType::Pickup);
        self.has_skills = self.jobs.iter().any(|j| !j.skills.is_empty());
        self.has_initial_routes = self.vehicles.iter().any(|v| !v.steps.is_empty());

        self.has_tw = self.jobs.iter().any(|j| {
            j.tws.iter().any(|tw| !tw.is_default()) || j.max_lifetime.is_some()
        }) || self
            .vehicles
            .iter()
            .any(|v| !v.tw.is_default() || !v.breaks.is_empty());

        let first = &self.vehicles[0];
        self.homogeneous_locations = self
            .vehicles
            .iter()
            .all(|v| v.has_same_locations(first));
        self.homogeneous_profiles = self.vehicles.iter().all(|v| v.has_same_profile(first));
        self.homogeneous_costs = self.vehicles.iter().all(|v| {
            v.costs == first.costs && v.cost_wrapper.has_same_variable_costs(&first.cost_wrapper)
        });

        self.all_locations_have_coords = self
            .jobs
            .iter()
            .map(|j| &j.location)
            .chain(self.vehicles.iter().flat_map(|v| v.start.iter()))
            .chain(self.vehicles.iter().flat_map(|v| v.end.iter()))
            .all(|l| l.has_coords());
    }

    fn set_cost_upper_bound(&mut self) {
        // Loose bound exceeding any start -> job -> end evaluation, used as
        // the "no later vehicle can take this job" sentinel in regrets.
        let mut max_edge_cost: Cost = 0;
        for v in &self.vehicles {
            let n = v.cost_wrapper.matrix_size();
            for i in 0..n {
                for j in 0..n {
                    max_edge_cost = max_edge_cost.max(v.cost(i, j));
                }
            }
        }
        let max_fixed = self
            .vehicles
            .iter()
            .map(|v| v.fixed_cost())
            .max()
            .unwrap_or(0);
        self.cost_upper_bound = 2 * max_edge_cost + max_fixed + 1;
    }

    fn set_skills_compatibility(&mut self) {
        self.vehicle_to_job_compat = self
            .vehicles
            .iter()
            .map(|v| {
                self.jobs
                    .iter()
                    .map(|j| j.skills.is_subset(&v.skills))
                    .collect()
            })
            .collect();
    }

    /// Prune job/vehicle pairs that can never work out: capacity too small,
    /// max_tasks zero, or the job unreachable within the vehicle TW.
    fn set_extra_compatibility(&mut self) {
        for (v_rank, v) in self.vehicles.iter().enumerate() {
            for (j_rank, job) in self.jobs.iter().enumerate() {
                if !self.vehicle_to_job_compat[v_rank][j_rank] {
                    continue;
                }

                let mut ok = v.max_tasks > 0
                    && job.pickup <= v.capacity
                    && job.delivery <= v.capacity;

                if ok {
                    let arrival = v.tw.start
                        + v.start
                            .as_ref()
                            .map(|s| v.duration(s.index(), job.index()))
                            .unwrap_or(0);
                    match job.tws.iter().find(|tw| arrival <= tw.end) {
                        None => ok = false,
                        Some(tw) => {
                            let action =
                                job.setups[v.vtype] + job.services[v.vtype];
                            let done = arrival.max(tw.start) + action;
                            let back = v
                                .end
                                .as_ref()
                                .map(|e| v.duration(job.index(), e.index()))
                                .unwrap_or(0);
                            ok = done + back <= v.tw.end;
                        }
                    }
                }

                self.vehicle_to_job_compat[v_rank][j_rank] = ok;
            }
        }

        // A pickup is only doable if its delivery is, and conversely.
        for v_rank in 0..self.vehicles.len() {
            for j_rank in 0..self.jobs.len() {
                if self.jobs[j_rank].job_type == JobType::Pickup {
                    let both = self.vehicle_to_job_compat[v_rank][j_rank]
                        && self.vehicle_to_job_compat[v_rank][j_rank + 1];
                    self.vehicle_to_job_compat[v_rank][j_rank] = both;
                    self.vehicle_to_job_compat[v_rank][j_rank + 1] = both;
                }
            }
        }
    }

    fn set_vehicles_compatibility(&mut self) {
        let nb = self.vehicles.len();
        self.vehicle_to_vehicle_compat = vec![vec![false; nb]; nb];
        for v1 in 0..nb {
            self.vehicle_to_vehicle_compat[v1][v1] = true;
            for v2 in (v1 + 1)..nb {
                let common = (0..self.jobs.len()).any(|j| {
                    self.vehicle_to_job_compat[v1][j] && self.vehicle_to_job_compat[v2][j]
                });
                self.vehicle_to_vehicle_compat[v1][v2] = common;
                self.vehicle_to_vehicle_compat[v2][v1] = common;
            }
        }
    }

    fn set_jobs_vehicles_evals(&mut self) {
        let bound = Eval {
            cost: self.cost_upper_bound,
            duration: 0,
            distance: 0,
            task_duration: 0,
        };
        self.jobs_vehicles_evals = (0..self.jobs.len())
            .map(|j_rank| {
                (0..self.vehicles.len())
                    .map(|v_rank| {
                        if !self.vehicle_to_job_compat[v_rank][j_rank] {
                            return bound;
                        }
                        let v = &self.vehicles[v_rank];
                        let job_index = self.jobs[j_rank].index();
                        let mut e = Eval::default();
                        if let Some(start) = &v.start {
                            e += v.eval(start.index(), job_index);
                        }
                        if let Some(end) = &v.end {
                            e += v.eval(job_index, end.index());
                        }
                        e
                    })
                    .collect()
            })
            .collect();
    }

    pub fn zero_amount(&self) -> &Amount {
        &self.zero
    }

    pub fn amount_size(&self) -> usize {
        self.amount_size
    }

    pub fn vehicle_ok_with_job(&self, v_rank: usize, j_rank: usize) -> bool {
        self.vehicle_to_job_compat[v_rank][j_rank]
    }

    /// True iff both vehicles share at least one candidate job.
    pub fn vehicle_ok_with_vehicle(&self, v1: usize, v2: usize) -> bool {
        self.vehicle_to_vehicle_compat[v1][v2]
    }

    pub fn jobs_vehicles_evals(&self) -> &Vec<Vec<Eval>> {
        &self.jobs_vehicles_evals
    }

    pub fn get_cost_upper_bound(&self) -> Cost {
        self.cost_upper_bound
    }

    pub fn has_tw_constraints(&self) -> bool {
        self.has_tw
    }

    pub fn has_skills(&self) -> bool {
        self.has_skills
    }

    pub fn has_jobs(&self) -> bool {
        self.has_jobs
    }

    pub fn has_shipments(&self) -> bool {
        self.has_shipments
    }

    pub fn has_initial_routes(&self) -> bool {
        self.has_initial_routes
    }

    pub fn has_homogeneous_locations(&self) -> bool {
        self.homogeneous_locations
    }

    pub fn has_homogeneous_profiles(&self) -> bool {
        self.homogeneous_profiles
    }

    pub fn has_homogeneous_costs(&self) -> bool {
        self.homogeneous_costs
    }

    pub fn all_locations_have_coords(&self) -> bool {
        self.all_locations_have_coords
    }

    pub fn geometry(&self) -> bool {
        self.geometry
    }

    pub fn report_distances(&self) -> bool {
        self.report_distances
    }

    /// Matching delivery rank for a pickup rank (and conversely).
    pub fn matching_rank(&self, job_rank: usize) -> usize {
        match self.jobs[job_rank].job_type {
            JobType::Pickup => job_rank + 1,
            JobType::Delivery => job_rank - 1,
            JobType::Single => job_rank,
        }
    }
}
