use std::cmp::Ordering;
use std::collections::HashMap;

use super::{
    scale_from_user_duration, Amount, Break, Cost, CostWrapper, Distance, Duration, Eval, Id,
    Location, Skills, TimeWindow, UserDistance, UserDuration, VehicleCosts, VehicleStep,
};

#[derive(Clone, Debug)]
pub struct Vehicle {
    pub id: Id,
    pub start: Option<Location>,
    pub end: Option<Location>,
    pub profile: String,
    pub capacity: Amount,
    pub skills: Skills,
    pub tw: TimeWindow,
    pub breaks: Vec<Break>,
    pub description: String,
    pub costs: VehicleCosts,
    pub cost_wrapper: CostWrapper,
    pub max_tasks: usize,
    pub max_travel_time: Duration,
    pub max_distance: Distance,
    pub has_break_max_load: bool,
    pub steps: Vec<VehicleStep>,
    /// Rank of this vehicle's type in the fleet's ordered type names.
    pub vtype: usize,
    pub type_str: String,
    pub break_id_to_rank: HashMap<Id, usize>,
}

impl Vehicle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: Id,
        start: Option<Location>,
        end: Option<Location>,
        profile: String,
        capacity: Amount,
        skills: Skills,
        tw: TimeWindow,
        breaks: Vec<Break>,
        description: String,
        costs: VehicleCosts,
        cost_wrapper: CostWrapper,
        max_tasks: Option<usize>,
        max_travel_time: Option<UserDuration>,
        max_distance: Option<UserDistance>,
        steps: Vec<VehicleStep>,
        type_str: String,
    ) -> Self {
        let has_break_max_load = breaks.iter().any(|b| b.max_load.is_some());
        let break_id_to_rank = breaks
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id, i))
            .collect();
        Vehicle {
            id,
            start,
            end,
            profile,
            capacity,
            skills,
            tw,
            breaks,
            description,
            costs,
            cost_wrapper,
            max_tasks: max_tasks.unwrap_or(usize::MAX),
            max_travel_time: max_travel_time
                .map(scale_from_user_duration)
                .unwrap_or(Duration::MAX),
            max_distance: max_distance.map(Distance::from).unwrap_or(Distance::MAX),
            has_break_max_load,
            steps,
            vtype: 0,
            type_str,
            break_id_to_rank,
        }
    }

    pub fn has_start(&self) -> bool {
        self.start.is_some()
    }

    pub fn has_end(&self) -> bool {
        self.end.is_some()
    }

    pub fn has_same_locations(&self, other: &Vehicle) -> bool {
        self.start.map(|l| l.index()) == other.start.map(|l| l.index())
            && self.end.map(|l| l.index()) == other.end.map(|l| l.index())
    }

    pub fn has_same_profile(&self, other: &Vehicle) -> bool {
        self.profile == other.profile
    }

    pub fn cost_based_on_metrics(&self) -> bool {
        self.cost_wrapper.cost_based_on_metrics()
    }

    pub fn available_duration(&self) -> Duration {
        self.tw.length()
    }

    pub fn fixed_cost(&self) -> Cost {
        self.costs.fixed
    }

    pub fn task_cost(&self, task_duration: Duration) -> Cost {
        self.costs.per_task_hour * task_duration
    }

    pub fn task_eval(&self, task_duration: Duration) -> Eval {
        Eval {
            cost: self.task_cost(task_duration),
            duration: 0,
            distance: 0,
            task_duration,
        }
    }

    pub fn duration(&self, i: usize, j: usize) -> Duration {
        self.cost_wrapper.duration(i, j)
    }

    pub fn cost(&self, i: usize, j: usize) -> Cost {
        self.cost_wrapper.cost(i, j)
    }

    pub fn eval(&self, i: usize, j: usize) -> Eval {
        Eval::new(
            self.cost_wrapper.cost(i, j),
            self.cost_wrapper.duration(i, j),
            self.cost_wrapper.distance(i, j),
        )
    }

    pub fn ok_for_travel_time(&self, d: Duration) -> bool {
        debug_assert!(0 <= d);
        d <= self.max_travel_time
    }

    pub fn ok_for_distance(&self, d: Distance) -> bool {
        debug_assert!(0 <= d);
        d <= self.max_distance
    }

    pub fn ok_for_range_bounds(&self, e: &Eval) -> bool {
        self.ok_for_travel_time(e.duration) && self.ok_for_distance(e.distance)
    }

    pub fn has_range_bounds(&self) -> bool {
        self.max_travel_time != Duration::MAX || self.max_distance != Distance::MAX
    }

    pub fn break_rank(&self, break_id: Id) -> usize {
        self.break_id_to_rank[&break_id]
    }

    /// "Availability" ordering used by heuristic vehicle sorts: decreasing
    /// max_tasks, capacity, TW length, then range.
    pub fn cmp_availability(&self, other: &Vehicle) -> Ordering {
        other
            .max_tasks
            .cmp(&self.max_tasks)
            .then_with(|| other.capacity.lex_cmp(&self.capacity))
            .then_with(|| other.tw.length().cmp(&self.tw.length()))
            .then_with(|| other.max_travel_time.cmp(&self.max_travel_time))
            .then_with(|| other.max_distance.cmp(&self.max_distance))
    }

    /// Cost-first ordering: increasing cost schedule, availability as
    /// tie-break.
    pub fn cmp_cost(&self, other: &Vehicle) -> Ordering {
        self.costs
            .cmp(&other.costs)
            .then_with(|| self.cmp_availability(other))
    }
}
