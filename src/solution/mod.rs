use serde::Serialize;

use crate::models::{Capacity, Id, Priority, UserCost, UserDistance, UserDuration};

/// Violation tags attached to steps, routes and the summary by check mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ViolationCause {
    LeadTime,
    Delay,
    Load,
    MaxTasks,
    Skills,
    Precedence,
    MissingBreak,
    MaxTravelTime,
    MaxLoad,
    MaxDistance,
}

impl ViolationCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCause::LeadTime => "lead_time",
            ViolationCause::Delay => "delay",
            ViolationCause::Load => "load",
            ViolationCause::MaxTasks => "max_tasks",
            ViolationCause::Skills => "skills",
            ViolationCause::Precedence => "precedence",
            ViolationCause::MissingBreak => "missing_break",
            ViolationCause::MaxTravelTime => "max_travel_time",
            ViolationCause::MaxLoad => "max_load",
            ViolationCause::MaxDistance => "max_distance",
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Violation {
    pub cause: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<UserDuration>,
}

impl Violation {
    pub fn new(cause: ViolationCause) -> Self {
        Violation {
            cause: cause.as_str(),
            duration: None,
        }
    }

    pub fn timed(cause: ViolationCause, duration: UserDuration) -> Self {
        Violation {
            cause: cause.as_str(),
            duration: Some(duration),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ComputingTimes {
    /// Milliseconds.
    pub loading: u64,
    pub solving: u64,
    pub routing: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Step {
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Id>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_index: Option<usize>,
    pub arrival: UserDuration,
    pub duration: UserDuration,
    pub setup: UserDuration,
    pub service: UserDuration,
    pub waiting_time: UserDuration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<UserDistance>,
    pub load: Vec<Capacity>,
    pub violations: Vec<Violation>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Route {
    pub vehicle: Id,
    pub steps: Vec<Step>,
    pub cost: UserCost,
    pub setup: UserDuration,
    pub service: UserDuration,
    pub duration: UserDuration,
    pub waiting_time: UserDuration,
    pub priority: Priority,
    pub delivery: Vec<Capacity>,
    pub pickup: Vec<Capacity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<UserDistance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub violations: Vec<Violation>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UnassignedJob {
    pub id: Id,
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    pub cost: UserCost,
    pub routes: usize,
    pub unassigned: usize,
    pub delivery: Vec<Capacity>,
    pub pickup: Vec<Capacity>,
    pub setup: UserDuration,
    pub service: UserDuration,
    pub duration: UserDuration,
    pub waiting_time: UserDuration,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<UserDistance>,
    pub violations: Vec<Violation>,
    pub computing_times: ComputingTimes,
}

#[derive(Clone, Debug, Serialize)]
pub struct Solution {
    pub code: u32,
    pub summary: Summary,
    pub routes: Vec<Route>,
    pub unassigned: Vec<UnassignedJob>,
}
