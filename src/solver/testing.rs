//! Hand-built inputs shared by solver unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{
    Amount, Break, CostWrapper, Input, Job, JobType, Location, Skills, SquareMatrix, TimeWindow,
    UserDuration, Vehicle, VehicleCosts,
};

pub fn symmetric_matrix(rows: Vec<Vec<u32>>) -> Arc<SquareMatrix<u32>> {
    Arc::new(SquareMatrix::from_rows(rows).unwrap())
}

pub fn depot_matrix_3() -> Arc<SquareMatrix<u32>> {
    symmetric_matrix(vec![
        vec![0, 10, 20],
        vec![10, 0, 15],
        vec![20, 15, 0],
    ])
}

pub struct JobSpec {
    pub id: u64,
    pub job_type: JobType,
    pub location: usize,
    pub delivery: Vec<i64>,
    pub pickup: Vec<i64>,
    pub skills: Vec<u32>,
    pub priority: u32,
    pub tws: Vec<(UserDuration, UserDuration)>,
    pub service: UserDuration,
}

impl JobSpec {
    pub fn single(id: u64, location: usize) -> Self {
        JobSpec {
            id,
            job_type: JobType::Single,
            location,
            delivery: vec![],
            pickup: vec![],
            skills: vec![],
            priority: 0,
            tws: vec![],
            service: 0,
        }
    }

    pub fn build(self, amount_size: usize) -> Job {
        let fill = |v: Vec<i64>| {
            if v.is_empty() {
                Amount::zero(amount_size)
            } else {
                Amount::from_vec(v)
            }
        };
        Job::new(
            self.id,
            self.job_type,
            Location::new(self.location, None),
            0,
            self.service,
            fill(self.delivery),
            fill(self.pickup),
            self.skills.into_iter().collect::<Skills>(),
            self.priority,
            self.tws
                .into_iter()
                .map(|(s, e)| TimeWindow::new(s, e))
                .collect(),
            String::new(),
            HashMap::new(),
            HashMap::new(),
            None,
        )
    }
}

pub struct VehicleSpec {
    pub id: u64,
    pub capacity: Vec<i64>,
    pub skills: Vec<u32>,
    pub tw: Option<(UserDuration, UserDuration)>,
    pub breaks: Vec<Break>,
    pub fixed_cost: u32,
}

impl VehicleSpec {
    pub fn depot(id: u64, capacity: Vec<i64>) -> Self {
        VehicleSpec {
            id,
            capacity,
            skills: vec![],
            tw: None,
            breaks: vec![],
            fixed_cost: 0,
        }
    }

    pub fn build(self, matrix: Arc<SquareMatrix<u32>>) -> Vehicle {
        let wrapper =
            CostWrapper::new(1.0, 3600, 0, matrix.clone(), matrix.clone()).unwrap();
        Vehicle::new(
            self.id,
            Some(Location::new(0, None)),
            Some(Location::new(0, None)),
            "car".to_string(),
            Amount::from_vec(self.capacity),
            self.skills.into_iter().collect::<Skills>(),
            self.tw
                .map(|(s, e)| TimeWindow::new(s, e))
                .unwrap_or_default(),
            self.breaks,
            String::new(),
            VehicleCosts::new(self.fixed_cost, 3600, 0, 0),
            wrapper,
            None,
            None,
            None,
            Vec::new(),
            String::new(),
        )
    }
}

pub fn build_input(jobs: Vec<Job>, vehicles: Vec<Vehicle>, amount_size: usize) -> Input {
    Input::new(jobs, vehicles, amount_size, false, false).unwrap()
}

/// One vehicle (capacity [2], start/end at 0) with a single job carrying a
/// one-unit delivery plus a one-unit shipment.
pub fn small_pd_input() -> Input {
    let matrix = depot_matrix_3();

    let single = JobSpec {
        delivery: vec![1],
        ..JobSpec::single(1, 1)
    }
    .build(1);
    let pickup = JobSpec {
        id: 2,
        job_type: JobType::Pickup,
        pickup: vec![1],
        ..JobSpec::single(2, 1)
    }
    .build(1);
    let delivery = JobSpec {
        id: 2,
        job_type: JobType::Delivery,
        location: 2,
        delivery: vec![1],
        ..JobSpec::single(2, 2)
    }
    .build(1);

    build_input(
        vec![single, pickup, delivery],
        vec![VehicleSpec::depot(1, vec![2]).build(matrix)],
        1,
    )
}

/// Two single jobs at indices 1 and 2, one vehicle based
/// at index 0, metric matrix.
pub fn two_singles_input() -> Input {
    let matrix = depot_matrix_3();

    let j1 = JobSpec {
        delivery: vec![5],
        ..JobSpec::single(1, 1)
    }
    .build(1);
    let j2 = JobSpec {
        delivery: vec![5],
        ..JobSpec::single(2, 2)
    }
    .build(1);

    build_input(
        vec![j1, j2],
        vec![VehicleSpec::depot(1, vec![10]).build(matrix)],
        1,
    )
}

/// Two vehicles with disjoint skills, two jobs each
/// requiring one of them.
pub fn skills_input() -> Input {
    let matrix = depot_matrix_3();

    let j1 = JobSpec {
        skills: vec![1],
        ..JobSpec::single(1, 1)
    }
    .build(1);
    let j2 = JobSpec {
        skills: vec![2],
        ..JobSpec::single(2, 2)
    }
    .build(1);

    let v1 = VehicleSpec {
        skills: vec![1],
        ..VehicleSpec::depot(1, vec![10])
    }
    .build(matrix.clone());
    let v2 = VehicleSpec {
        skills: vec![2],
        ..VehicleSpec::depot(2, vec![10])
    }
    .build(matrix);

    build_input(vec![j1, j2], vec![v1, v2], 1)
}

/// The job window closes before the vehicle shift starts.
pub fn tw_infeasible_input() -> Input {
    let matrix = symmetric_matrix(vec![vec![0, 50], vec![50, 0]]);

    let job = JobSpec {
        tws: vec![(0, 100)],
        ..JobSpec::single(1, 1)
    }
    .build(1);

    let vehicle = VehicleSpec {
        tw: Some((200, 300)),
        ..VehicleSpec::depot(1, vec![10])
    }
    .build(matrix);

    build_input(vec![job], vec![vehicle], 1)
}

/// A break capped at 2 units on a vehicle that starts loaded with 2 units
/// of single-job deliveries and runs a 3-unit shipment: the break can only
/// sit before the pickup or after the matching delivery.
pub fn break_max_load_input() -> Input {
    let matrix = depot_matrix_3();

    let single = JobSpec {
        delivery: vec![2],
        ..JobSpec::single(1, 1)
    }
    .build(1);
    let pickup = JobSpec {
        id: 2,
        job_type: JobType::Pickup,
        location: 1,
        pickup: vec![3],
        ..JobSpec::single(2, 1)
    }
    .build(1);
    let delivery = JobSpec {
        id: 2,
        job_type: JobType::Delivery,
        location: 2,
        delivery: vec![3],
        ..JobSpec::single(2, 2)
    }
    .build(1);

    let b = Break::new(
        1,
        vec![TimeWindow::new(0, 1000)],
        0,
        String::new(),
        Some(Amount::from_vec(vec![2])),
    );
    let vehicle = VehicleSpec {
        breaks: vec![b],
        tw: Some((0, 10_000)),
        ..VehicleSpec::depot(1, vec![5])
    }
    .build(matrix);

    build_input(vec![single, pickup, delivery], vec![vehicle], 1)
}
