use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config;
use crate::error::{Error, Result};
use crate::models::{
    Amount, Break, CostWrapper, Id, Input, Job, JobType, Location, Priority, ProfileMatrices,
    Skills, SquareMatrix, StepType, TimeWindow, UserCost, UserDistance, UserDuration, Vehicle,
    VehicleCosts, VehicleStep, MAX_PRIORITY, NO_TYPE,
};
use crate::routing::Router;

#[derive(Deserialize)]
struct RawProblem {
    #[serde(default)]
    jobs: Vec<RawJob>,
    #[serde(default)]
    shipments: Vec<RawShipment>,
    vehicles: Vec<RawVehicle>,
    #[serde(default)]
    matrices: HashMap<String, RawMatrix>,
}

#[derive(Deserialize)]
struct RawJob {
    id: Id,
    location: Option<[f64; 2]>,
    location_index: Option<usize>,
    #[serde(default)]
    setup: UserDuration,
    #[serde(default)]
    service: UserDuration,
    delivery: Option<Vec<i64>>,
    pickup: Option<Vec<i64>>,
    #[serde(default)]
    skills: Vec<u32>,
    #[serde(default)]
    priority: u32,
    time_windows: Option<Vec<[UserDuration; 2]>>,
    description: Option<String>,
    #[serde(default)]
    setup_per_type: HashMap<String, UserDuration>,
    #[serde(default)]
    service_per_type: HashMap<String, UserDuration>,
}

#[derive(Deserialize)]
struct RawShipmentEnd {
    id: Id,
    location: Option<[f64; 2]>,
    location_index: Option<usize>,
    #[serde(default)]
    setup: UserDuration,
    #[serde(default)]
    service: UserDuration,
    time_windows: Option<Vec<[UserDuration; 2]>>,
    description: Option<String>,
    #[serde(default)]
    setup_per_type: HashMap<String, UserDuration>,
    #[serde(default)]
    service_per_type: HashMap<String, UserDuration>,
}

#[derive(Deserialize)]
struct RawShipment {
    pickup: RawShipmentEnd,
    delivery: RawShipmentEnd,
    amount: Option<Vec<i64>>,
    #[serde(default)]
    skills: Vec<u32>,
    #[serde(default)]
    priority: u32,
    max_lifetime: Option<UserDuration>,
}

#[derive(Deserialize)]
struct RawCosts {
    #[serde(default)]
    fixed: UserCost,
    per_hour: Option<UserCost>,
    per_km: Option<UserCost>,
    per_task_hour: Option<UserCost>,
}

#[derive(Deserialize)]
struct RawBreak {
    id: Id,
    time_windows: Option<Vec<[UserDuration; 2]>>,
    #[serde(default)]
    service: UserDuration,
    description: Option<String>,
    max_load: Option<Vec<i64>>,
}

#[derive(Deserialize)]
struct RawVehicleStep {
    #[serde(rename = "type")]
    step_type: String,
    id: Option<Id>,
}

#[derive(Deserialize)]
struct RawVehicle {
    id: Id,
    profile: Option<String>,
    start: Option<[f64; 2]>,
    start_index: Option<usize>,
    end: Option<[f64; 2]>,
    end_index: Option<usize>,
    capacity: Option<Vec<i64>>,
    #[serde(default)]
    skills: Vec<u32>,
    time_window: Option<[UserDuration; 2]>,
    #[serde(default)]
    breaks: Vec<RawBreak>,
    costs: Option<RawCosts>,
    speed_factor: Option<f64>,
    max_tasks: Option<usize>,
    max_travel_time: Option<UserDuration>,
    max_distance: Option<UserDistance>,
    #[serde(default)]
    steps: Vec<RawVehicleStep>,
    #[serde(rename = "type")]
    vehicle_type: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct RawMatrix {
    durations: Option<Vec<Vec<UserDuration>>>,
    distances: Option<Vec<Vec<UserDistance>>>,
    costs: Option<Vec<Vec<UserCost>>>,
}

/// Frozen input plus the per-profile routers kept around for geometry
/// enrichment, and the per-vehicle geometries already gathered when sparse
/// matrices were used.
#[derive(Debug)]
pub struct LoadedProblem {
    pub input: Input,
    pub routers: HashMap<String, Router>,
    pub vehicles_geometry: Vec<String>,
}

/// Interns coordinates, handing out matrix indices.
struct LocationRegistry {
    index_mode: bool,
    locations: Vec<Location>,
    by_coords: HashMap<(u64, u64), usize>,
}

impl LocationRegistry {
    fn new(index_mode: bool) -> Self {
        LocationRegistry {
            index_mode,
            locations: Vec::new(),
            by_coords: HashMap::new(),
        }
    }

    fn resolve(
        &mut self,
        what: &str,
        coords: Option<[f64; 2]>,
        index: Option<usize>,
    ) -> Result<Location> {
        if self.index_mode {
            let index = index.ok_or_else(|| {
                Error::Input(format!(
                    "custom matrices require a location_index for {what}"
                ))
            })?;
            if self.locations.len() <= index {
                self.locations
                    .resize(index + 1, Location::new(index, None));
            }
            let location = Location::new(index, coords);
            self.locations[index] = location;
            Ok(location)
        } else {
            let coords = coords.ok_or_else(|| {
                Error::Input(format!("missing location coordinates for {what}"))
            })?;
            let key = (coords[0].to_bits(), coords[1].to_bits());
            let next = self.locations.len();
            let index = *self.by_coords.entry(key).or_insert(next);
            if index == next {
                self.locations.push(Location::new(index, Some(coords)));
            }
            Ok(Location::new(index, Some(coords)))
        }
    }
}

fn parse_time_windows(
    raw: &Option<Vec<[UserDuration; 2]>>,
    what: &str,
) -> Result<Vec<TimeWindow>> {
    match raw {
        None => Ok(vec![TimeWindow::default()]),
        Some(windows) => windows
            .iter()
            .map(|w| {
                if w[1] < w[0] {
                    Err(Error::Input(format!("invalid time window for {what}")))
                } else {
                    Ok(TimeWindow::new(w[0], w[1]))
                }
            })
            .collect(),
    }
}

fn check_priority(priority: Priority, what: &str) -> Result<()> {
    if priority > MAX_PRIORITY {
        return Err(Error::Input(format!("invalid priority for {what}")));
    }
    Ok(())
}

fn amount_or_zero(raw: &Option<Vec<i64>>, size: usize) -> Amount {
    match raw {
        Some(v) => Amount::from_vec(v.clone()),
        None => Amount::zero(size),
    }
}

fn infer_amount_size(raw: &RawProblem) -> usize {
    raw.vehicles
        .iter()
        .filter_map(|v| v.capacity.as_ref().map(|c| c.len()))
        .chain(raw.jobs.iter().filter_map(|j| {
            j.delivery
                .as_ref()
                .map(|d| d.len())
                .or_else(|| j.pickup.as_ref().map(|p| p.len()))
        }))
        .chain(
            raw.shipments
                .iter()
                .filter_map(|s| s.amount.as_ref().map(|a| a.len())),
        )
        .next()
        .unwrap_or(0)
}

/// Parse the problem document and freeze it into an `Input`, fetching
/// travel matrices from the routing layer when none are supplied.
pub async fn load_problem(
    data: &str,
    router_base_url: &str,
    geometry: bool,
    sparse: bool,
) -> Result<LoadedProblem> {
    let raw: RawProblem =
        serde_json::from_str(data).map_err(|e| Error::Input(format!("invalid input: {e}")))?;

    if raw.vehicles.is_empty() {
        return Err(Error::Input("no vehicle defined".to_string()));
    }

    let amount_size = infer_amount_size(&raw);
    let custom_matrices = !raw.matrices.is_empty();
    let mut registry = LocationRegistry::new(custom_matrices);

    // Jobs and shipments, shipment halves at consecutive ranks.
    let mut jobs: Vec<Job> = Vec::with_capacity(raw.jobs.len() + 2 * raw.shipments.len());
    let mut job_rank_by_id: HashMap<Id, usize> = HashMap::new();
    let mut pickup_rank_by_id: HashMap<Id, usize> = HashMap::new();

    for raw_job in &raw.jobs {
        let location = registry.resolve(
            &format!("job {}", raw_job.id),
            raw_job.location,
            raw_job.location_index,
        )?;
        if job_rank_by_id.insert(raw_job.id, jobs.len()).is_some() {
            return Err(Error::Input(format!("duplicate job id {}", raw_job.id)));
        }
        check_priority(raw_job.priority, &format!("job {}", raw_job.id))?;
        jobs.push(Job::new(
            raw_job.id,
            JobType::Single,
            location,
            raw_job.setup,
            raw_job.service,
            amount_or_zero(&raw_job.delivery, amount_size),
            amount_or_zero(&raw_job.pickup, amount_size),
            raw_job.skills.iter().copied().collect::<Skills>(),
            raw_job.priority,
            parse_time_windows(&raw_job.time_windows, &format!("job {}", raw_job.id))?,
            raw_job.description.clone().unwrap_or_default(),
            raw_job.setup_per_type.clone(),
            raw_job.service_per_type.clone(),
            None,
        ));
    }

    for shipment in &raw.shipments {
        let amount = amount_or_zero(&shipment.amount, amount_size);
        let skills: Skills = shipment.skills.iter().copied().collect();
        check_priority(
            shipment.priority,
            &format!("shipment {}", shipment.pickup.id),
        )?;

        let p = &shipment.pickup;
        let p_location =
            registry.resolve(&format!("pickup {}", p.id), p.location, p.location_index)?;
        if pickup_rank_by_id.insert(p.id, jobs.len()).is_some() {
            return Err(Error::Input(format!("duplicate shipment id {}", p.id)));
        }
        jobs.push(Job::new(
            p.id,
            JobType::Pickup,
            p_location,
            p.setup,
            p.service,
            Amount::zero(amount_size),
            amount.clone(),
            skills.clone(),
            shipment.priority,
            parse_time_windows(&p.time_windows, &format!("pickup {}", p.id))?,
            p.description.clone().unwrap_or_default(),
            p.setup_per_type.clone(),
            p.service_per_type.clone(),
            shipment.max_lifetime,
        ));

        let d = &shipment.delivery;
        let d_location =
            registry.resolve(&format!("delivery {}", d.id), d.location, d.location_index)?;
        jobs.push(Job::new(
            d.id,
            JobType::Delivery,
            d_location,
            d.setup,
            d.service,
            amount,
            Amount::zero(amount_size),
            skills,
            shipment.priority,
            parse_time_windows(&d.time_windows, &format!("delivery {}", d.id))?,
            d.description.clone().unwrap_or_default(),
            d.setup_per_type.clone(),
            d.service_per_type.clone(),
            shipment.max_lifetime,
        ));
    }

    // Vehicles, with placeholder wrappers until matrices are known.
    let placeholder = Arc::new(SquareMatrix::new(0, 0u32));
    let mut vehicles: Vec<Vehicle> = Vec::with_capacity(raw.vehicles.len());
    for raw_vehicle in &raw.vehicles {
        let profile = raw_vehicle
            .profile
            .clone()
            .unwrap_or_else(|| config::DEFAULT_PROFILE.to_string());

        let start = match (raw_vehicle.start, raw_vehicle.start_index) {
            (None, None) => None,
            (coords, index) => Some(registry.resolve(
                &format!("vehicle {} start", raw_vehicle.id),
                coords,
                index,
            )?),
        };
        let end = match (raw_vehicle.end, raw_vehicle.end_index) {
            (None, None) => None,
            (coords, index) => Some(registry.resolve(
                &format!("vehicle {} end", raw_vehicle.id),
                coords,
                index,
            )?),
        };
        if start.is_none() && end.is_none() {
            return Err(Error::Input(format!(
                "vehicle {} has neither start nor end",
                raw_vehicle.id
            )));
        }

        let tw = match raw_vehicle.time_window {
            Some(w) if w[1] < w[0] => {
                return Err(Error::Input(format!(
                    "invalid time window for vehicle {}",
                    raw_vehicle.id
                )))
            }
            Some(w) => TimeWindow::new(w[0], w[1]),
            None => TimeWindow::default(),
        };

        let breaks = raw_vehicle
            .breaks
            .iter()
            .map(|b| {
                Ok(Break::new(
                    b.id,
                    parse_time_windows(&b.time_windows, &format!("break {}", b.id))?,
                    crate::models::scale_from_user_duration(b.service),
                    b.description.clone().unwrap_or_default(),
                    b.max_load.as_ref().map(|m| Amount::from_vec(m.clone())),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let costs = match &raw_vehicle.costs {
            Some(c) => VehicleCosts::new(
                c.fixed,
                c.per_hour.unwrap_or(crate::models::DEFAULT_COST_PER_HOUR),
                c.per_km.unwrap_or(crate::models::DEFAULT_COST_PER_KM),
                c.per_task_hour
                    .unwrap_or(crate::models::DEFAULT_COST_PER_TASK_HOUR),
            ),
            None => VehicleCosts::default(),
        };

        let speed_factor = raw_vehicle.speed_factor.unwrap_or(1.0);
        let wrapper = CostWrapper::new(
            speed_factor,
            crate::models::DEFAULT_COST_PER_HOUR,
            crate::models::DEFAULT_COST_PER_KM,
            placeholder.clone(),
            placeholder.clone(),
        )?;

        let steps = raw_vehicle
            .steps
            .iter()
            .map(|s| resolve_step(s, &job_rank_by_id, &pickup_rank_by_id))
            .collect::<Result<Vec<_>>>()?;

        vehicles.push(Vehicle::new(
            raw_vehicle.id,
            start,
            end,
            profile,
            match &raw_vehicle.capacity {
                Some(c) => Amount::from_vec(c.clone()),
                None => Amount::zero(amount_size),
            },
            raw_vehicle.skills.iter().copied().collect::<Skills>(),
            tw,
            breaks,
            raw_vehicle.description.clone().unwrap_or_default(),
            costs,
            wrapper,
            raw_vehicle.max_tasks,
            raw_vehicle.max_travel_time,
            raw_vehicle.max_distance,
            steps,
            raw_vehicle
                .vehicle_type
                .clone()
                .unwrap_or_else(|| NO_TYPE.to_string()),
        ));
    }

    // Break step ranks depend on the owning vehicle.
    for vehicle in &mut vehicles {
        for step in &mut vehicle.steps {
            if step.step_type == StepType::Break {
                step.rank = *vehicle.break_id_to_rank.get(&step.id).ok_or_else(|| {
                    Error::Input(format!(
                        "unknown break id {} in steps for vehicle {}",
                        step.id, vehicle.id
                    ))
                })?;
            }
        }
    }

    // Per-profile matrices: user-supplied or fetched from the router.
    let profiles: Vec<String> = vehicles.iter().map(|v| v.profile.clone()).unique().collect();

    let mut profile_matrices: HashMap<String, ProfileMatrices> = HashMap::new();
    let mut routers: HashMap<String, Router> = HashMap::new();
    let mut vehicles_geometry = vec![String::new(); vehicles.len()];
    let mut report_distances = true;

    if custom_matrices {
        let n = registry.locations.len();
        for profile in &profiles {
            let raw_matrix = raw.matrices.get(profile).ok_or_else(|| {
                Error::Input(format!("unknown profile: {profile}"))
            })?;

            let durations = raw_matrix
                .durations
                .as_ref()
                .ok_or_else(|| {
                    Error::Input(format!("missing durations matrix for profile {profile}"))
                })
                .and_then(|rows| SquareMatrix::from_rows(rows.clone()))?;
            if durations.size() < n {
                return Err(Error::Input(format!(
                    "location index out of range for profile {profile} matrix"
                )));
            }

            let distances = match &raw_matrix.distances {
                Some(rows) => SquareMatrix::from_rows(rows.clone())?,
                None => {
                    report_distances = false;
                    SquareMatrix::new(durations.size(), 0)
                }
            };

            let costs = match &raw_matrix.costs {
                Some(rows) => Some(Arc::new(SquareMatrix::from_rows(rows.clone())?)),
                None => None,
            };

            profile_matrices.insert(
                profile.clone(),
                ProfileMatrices {
                    durations: Arc::new(durations),
                    distances: Arc::new(distances),
                    costs,
                },
            );
        }
    } else {
        info!(
            profiles = profiles.len(),
            locations = registry.locations.len(),
            sparse,
            "fetching matrices from routing layer"
        );
        for profile in &profiles {
            routers.insert(
                profile.clone(),
                Router::osrm(router_base_url.to_string(), profile.clone()),
            );
        }

        if sparse {
            for profile in &profiles {
                let router = &routers[profile];
                let (matrices, geometries) = router
                    .get_sparse_matrices(&registry.locations, &vehicles, &jobs)
                    .await?;
                for (v_rank, g) in geometries.into_iter().enumerate() {
                    if !g.is_empty() {
                        vehicles_geometry[v_rank] = g;
                    }
                }
                profile_matrices.insert(
                    profile.clone(),
                    ProfileMatrices {
                        durations: Arc::new(matrices.durations),
                        distances: Arc::new(matrices.distances),
                        costs: None,
                    },
                );
            }
        } else {
            let fetches = profiles.iter().map(|profile| {
                let router = &routers[profile];
                let locations = &registry.locations;
                async move { (profile.clone(), router.get_matrices(locations).await) }
            });
            for (profile, fetched) in join_all(fetches).await {
                let matrices = fetched?;
                profile_matrices.insert(
                    profile,
                    ProfileMatrices {
                        durations: Arc::new(matrices.durations),
                        distances: Arc::new(matrices.distances),
                        costs: None,
                    },
                );
            }
        }
    }

    // Wire the real wrappers now that matrices exist.
    for (raw_vehicle, vehicle) in raw.vehicles.iter().zip(vehicles.iter_mut()) {
        let matrices = &profile_matrices[&vehicle.profile];
        let costs = &vehicle.costs;
        let mut wrapper = CostWrapper::new(
            raw_vehicle.speed_factor.unwrap_or(1.0),
            costs.per_hour as UserCost,
            costs.per_km as UserCost,
            matrices.durations.clone(),
            matrices.distances.clone(),
        )?;
        if let Some(costs_matrix) = &matrices.costs {
            wrapper.set_costs_matrix(costs_matrix.clone());
        }
        vehicle.cost_wrapper = wrapper;
    }

    debug!(
        jobs = jobs.len(),
        vehicles = vehicles.len(),
        amount_size,
        "input parsed"
    );

    let input = Input::new(jobs, vehicles, amount_size, geometry, report_distances)?;

    Ok(LoadedProblem {
        input,
        routers,
        vehicles_geometry,
    })
}

fn resolve_step(
    raw: &RawVehicleStep,
    job_rank_by_id: &HashMap<Id, usize>,
    pickup_rank_by_id: &HashMap<Id, usize>,
) -> Result<VehicleStep> {
    let missing_id = || Error::Input(format!("missing id for {} step", raw.step_type));

    match raw.step_type.as_str() {
        "start" => Ok(VehicleStep::new(StepType::Start, 0)),
        "end" => Ok(VehicleStep::new(StepType::End, 0)),
        "break" => {
            let id = raw.id.ok_or_else(missing_id)?;
            Ok(VehicleStep::new(StepType::Break, id))
        }
        "job" | "single" => {
            let id = raw.id.ok_or_else(missing_id)?;
            let rank = *job_rank_by_id
                .get(&id)
                .ok_or_else(|| Error::Input(format!("unknown job id {id} in steps")))?;
            let mut step = VehicleStep::new(StepType::Job, id);
            step.rank = rank;
            step.job_type = Some(JobType::Single);
            Ok(step)
        }
        "pickup" => {
            let id = raw.id.ok_or_else(missing_id)?;
            let rank = *pickup_rank_by_id
                .get(&id)
                .ok_or_else(|| Error::Input(format!("unknown pickup id {id} in steps")))?;
            let mut step = VehicleStep::new(StepType::Job, id);
            step.rank = rank;
            step.job_type = Some(JobType::Pickup);
            Ok(step)
        }
        "delivery" => {
            let id = raw.id.ok_or_else(missing_id)?;
            let rank = *pickup_rank_by_id
                .get(&id)
                .ok_or_else(|| Error::Input(format!("unknown delivery id {id} in steps")))?;
            let mut step = VehicleStep::new(StepType::Job, id);
            step.rank = rank + 1;
            step.job_type = Some(JobType::Delivery);
            Ok(step)
        }
        other => Err(Error::Input(format!("invalid step type: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn parses_a_matrix_based_problem() {
        let data = r#"{
            "vehicles": [
                {"id": 1, "start_index": 0, "end_index": 0, "capacity": [10]}
            ],
            "jobs": [
                {"id": 1, "location_index": 1, "delivery": [5]},
                {"id": 2, "location_index": 2, "delivery": [5]}
            ],
            "matrices": {
                "car": {
                    "durations": [[0, 10, 20], [10, 0, 15], [20, 15, 0]]
                }
            }
        }"#;

        let loaded = load_problem(data, "http://localhost:5000", false, false)
            .await
            .unwrap();
        assert_eq!(loaded.input.jobs.len(), 2);
        assert_eq!(loaded.input.vehicles.len(), 1);
        assert!(!loaded.input.report_distances());
    }

    #[tokio::test]
    async fn rejects_unknown_profile() {
        let data = r#"{
            "vehicles": [
                {"id": 1, "start_index": 0, "profile": "bike", "capacity": [1]}
            ],
            "jobs": [{"id": 1, "location_index": 0, "delivery": [1]}],
            "matrices": {"car": {"durations": [[0]]}}
        }"#;

        let err = load_problem(data, "http://localhost:5000", false, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown profile"));
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn rejects_reversed_time_window() {
        let data = r#"{
            "vehicles": [{"id": 1, "start_index": 0, "capacity": [1]}],
            "jobs": [
                {"id": 1, "location_index": 0, "delivery": [1], "time_windows": [[10, 5]]}
            ],
            "matrices": {"car": {"durations": [[0]]}}
        }"#;

        let err = load_problem(data, "http://localhost:5000", false, false)
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
