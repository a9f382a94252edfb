use std::collections::HashMap;

use super::{
    scale_from_user_duration, Amount, Duration, Id, Location, Priority, Skills, TimeWindow,
    UserDuration,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobType {
    Single,
    Pickup,
    Delivery,
}

/// Immutable task. Pickup/delivery pairs occupy consecutive ranks in the
/// job table, delivery right after its pickup.
#[derive(Clone, Debug)]
pub struct Job {
    pub id: Id,
    pub location: Location,
    pub job_type: JobType,
    pub default_setup: Duration,
    pub default_service: Duration,
    pub delivery: Amount,
    pub pickup: Amount,
    pub skills: Skills,
    pub priority: Priority,
    pub tws: Vec<TimeWindow>,
    pub description: String,
    pub setup_per_type: HashMap<String, UserDuration>,
    pub service_per_type: HashMap<String, UserDuration>,
    // Durations resolved per vehicle type rank once the fleet is known.
    pub setups: Vec<Duration>,
    pub services: Vec<Duration>,
    /// Optional shipment constraint: delivery must start within this delay
    /// after the pickup's service start.
    pub max_lifetime: Option<Duration>,
}

impl Job {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Id,
        job_type: JobType,
        location: Location,
        default_setup: UserDuration,
        default_service: UserDuration,
        delivery: Amount,
        pickup: Amount,
        skills: Skills,
        priority: Priority,
        tws: Vec<TimeWindow>,
        description: String,
        setup_per_type: HashMap<String, UserDuration>,
        service_per_type: HashMap<String, UserDuration>,
        max_lifetime: Option<UserDuration>,
    ) -> Self {
        let tws = if tws.is_empty() {
            vec![TimeWindow::default()]
        } else {
            tws
        };
        Job {
            id,
            location,
            job_type,
            default_setup: scale_from_user_duration(default_setup),
            default_service: scale_from_user_duration(default_service),
            delivery,
            pickup,
            skills,
            priority,
            tws,
            description,
            setup_per_type,
            service_per_type,
            setups: Vec::new(),
            services: Vec::new(),
            max_lifetime: max_lifetime.map(scale_from_user_duration),
        }
    }

    pub fn index(&self) -> usize {
        self.location.index()
    }

    pub fn is_valid_start(&self, time: Duration) -> bool {
        self.tws.iter().any(|tw| tw.contains(time))
    }

    /// Resolve per-vehicle-type setup and service durations against the
    /// fleet's ordered type names.
    pub fn resolve_type_durations(&mut self, type_names: &[String]) {
        self.setups = type_names
            .iter()
            .map(|t| {
                self.setup_per_type
                    .get(t)
                    .map(|&d| scale_from_user_duration(d))
                    .unwrap_or(self.default_setup)
            })
            .collect();
        self.services = type_names
            .iter()
            .map(|t| {
                self.service_per_type
                    .get(t)
                    .map(|&d| scale_from_user_duration(d))
                    .unwrap_or(self.default_service)
            })
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_type_durations_fall_back_to_defaults() {
        let mut job = Job::new(
            1,
            JobType::Single,
            Location::new(0, None),
            10,
            60,
            Amount::zero(1),
            Amount::zero(1),
            Skills::new(),
            0,
            vec![],
            String::new(),
            HashMap::from([("trailer".to_string(), 90)]),
            HashMap::new(),
            None,
        );
        job.resolve_type_durations(&["".to_string(), "trailer".to_string()]);

        assert_eq!(job.setups[0], scale_from_user_duration(10));
        assert_eq!(job.setups[1], scale_from_user_duration(90));
        assert_eq!(job.services[0], scale_from_user_duration(60));
        assert_eq!(job.services[1], scale_from_user_duration(60));
    }
}
