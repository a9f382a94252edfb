pub mod amount;
pub mod breaks;
pub mod costs;
pub mod eval;
pub mod input;
pub mod job;
pub mod location;
pub mod matrix;
pub mod step;
pub mod time_window;
pub mod vehicle;

pub use amount::Amount;
pub use breaks::Break;
pub use costs::{CostWrapper, VehicleCosts};
pub use eval::{Eval, NO_EVAL, NO_GAIN};
pub use input::Input;
pub use job::{Job, JobType};
pub use location::Location;
pub use matrix::{ProfileMatrices, SquareMatrix};
pub use step::{StepType, VehicleStep};
pub use time_window::TimeWindow;
pub use vehicle::Vehicle;

use std::collections::HashSet;

pub type Id = u64;
pub type UserDuration = u32;
pub type UserDistance = u32;
pub type UserCost = u32;
pub type Duration = i64;
pub type Distance = i64;
pub type Cost = i64;
pub type Capacity = i64;
pub type Priority = u32;
pub type Skill = u32;
pub type Skills = HashSet<Skill>;

pub const MAX_PRIORITY: Priority = 100;
pub const MAX_SPEED_FACTOR: f64 = 5.0;

// Internal fixed-point scaling. Durations hold user seconds times
// DURATION_FACTOR (adjusted per vehicle speed factor). Costs hold user cost
// units times COST_FACTOR so that per-hour and per-km contributions stay
// integral: COST_FACTOR = DURATION_FACTOR * 3600 and
// DISTANCE_FACTOR = COST_FACTOR / 1000.
pub const DURATION_FACTOR: i64 = 100;
pub const DISTANCE_FACTOR: i64 = 360;
pub const COST_FACTOR: i64 = 360_000;

pub const DEFAULT_COST_PER_HOUR: UserCost = 3600;
pub const DEFAULT_COST_PER_KM: UserCost = 0;
pub const DEFAULT_COST_PER_TASK_HOUR: UserCost = 0;

pub const NO_TYPE: &str = "";

pub fn scale_from_user_duration(d: UserDuration) -> Duration {
    DURATION_FACTOR * Duration::from(d)
}

pub fn scale_to_user_duration(d: Duration) -> UserDuration {
    ((d + DURATION_FACTOR / 2) / DURATION_FACTOR) as UserDuration
}

pub fn scale_from_user_cost(c: UserCost) -> Cost {
    COST_FACTOR * Cost::from(c)
}

pub fn scale_to_user_cost(c: Cost) -> UserCost {
    ((c + COST_FACTOR / 2) / COST_FACTOR) as UserCost
}
