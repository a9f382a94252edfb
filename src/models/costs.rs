use std::sync::Arc;

use crate::error::Error;

use super::matrix::SquareMatrix;
use super::{
    scale_from_user_cost, Cost, Distance, Duration, UserCost, UserDistance, UserDuration,
    COST_FACTOR, DISTANCE_FACTOR, DURATION_FACTOR, MAX_SPEED_FACTOR,
};

/// Per-vehicle cost schedule, scaled to internal units on construction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct VehicleCosts {
    pub fixed: Cost,
    pub per_hour: Cost,
    pub per_km: Cost,
    pub per_task_hour: Cost,
}

impl VehicleCosts {
    pub fn new(
        fixed: UserCost,
        per_hour: UserCost,
        per_km: UserCost,
        per_task_hour: UserCost,
    ) -> Self {
        VehicleCosts {
            fixed: scale_from_user_cost(fixed),
            per_hour: Cost::from(per_hour),
            per_km: Cost::from(per_km),
            per_task_hour: Cost::from(per_task_hour),
        }
    }
}

impl Default for VehicleCosts {
    fn default() -> Self {
        VehicleCosts::new(
            0,
            super::DEFAULT_COST_PER_HOUR,
            super::DEFAULT_COST_PER_KM,
            super::DEFAULT_COST_PER_TASK_HOUR,
        )
    }
}

/// Scales user matrix entries into internal fixed-point durations and
/// combines duration/distance (or a user cost matrix) into the scalar edge
/// cost every optimisation comparison relies on.
#[derive(Clone, Debug)]
pub struct CostWrapper {
    per_hour: Cost,
    per_km: Cost,
    discrete_duration_factor: Duration,
    duration_cost_factor: Cost,
    distance_cost_factor: Cost,
    durations: Arc<SquareMatrix<UserDuration>>,
    distances: Arc<SquareMatrix<UserDistance>>,
    // In metric mode this aliases the durations matrix; with user-supplied
    // costs it holds them directly.
    cost_source: Arc<SquareMatrix<u32>>,
    cost_based_on_metrics: bool,
}

impl CostWrapper {
    pub fn new(
        speed_factor: f64,
        per_hour: UserCost,
        per_km: UserCost,
        durations: Arc<SquareMatrix<UserDuration>>,
        distances: Arc<SquareMatrix<UserDistance>>,
    ) -> Result<Self, Error> {
        if speed_factor <= 0.0 || speed_factor > MAX_SPEED_FACTOR {
            return Err(Error::Input(format!("invalid speed factor: {}", speed_factor)));
        }

        let discrete_duration_factor =
            (DURATION_FACTOR as f64 / speed_factor).round() as Duration;

        let cost_source = durations.clone();
        Ok(CostWrapper {
            per_hour: Cost::from(per_hour),
            per_km: Cost::from(per_km),
            discrete_duration_factor,
            duration_cost_factor: discrete_duration_factor * Cost::from(per_hour),
            distance_cost_factor: DISTANCE_FACTOR * Cost::from(per_km),
            durations,
            distances,
            cost_source,
            cost_based_on_metrics: true,
        })
    }

    /// Switch to a user-supplied cost matrix: per-hour/per-km factors are
    /// disabled and edge costs are plain rescaled matrix entries.
    pub fn set_costs_matrix(&mut self, costs: Arc<SquareMatrix<UserCost>>) {
        self.cost_source = costs;
        self.duration_cost_factor = COST_FACTOR;
        self.distance_cost_factor = 0;
        self.cost_based_on_metrics = false;
    }

    pub fn cost_based_on_metrics(&self) -> bool {
        self.cost_based_on_metrics
    }

    /// Two wrappers are interchangeable for edge comparisons iff their
    /// effective variable-cost factors match.
    pub fn has_same_variable_costs(&self, other: &CostWrapper) -> bool {
        self.duration_cost_factor == other.duration_cost_factor
            && self.distance_cost_factor == other.distance_cost_factor
    }

    pub fn matrix_size(&self) -> usize {
        self.durations.size()
    }

    pub fn duration(&self, i: usize, j: usize) -> Duration {
        self.discrete_duration_factor * Duration::from(self.durations.get(i, j))
    }

    pub fn distance(&self, i: usize, j: usize) -> Distance {
        Distance::from(self.distances.get(i, j))
    }

    pub fn cost(&self, i: usize, j: usize) -> Cost {
        self.duration_cost_factor * Cost::from(self.cost_source.get(i, j))
            + self.distance_cost_factor * Cost::from(self.distances.get(i, j))
    }

    /// User-facing cost for reported metrics, metric mode only.
    pub fn user_cost_from_user_metrics(&self, d: UserDuration, m: UserDistance) -> UserCost {
        debug_assert!(self.cost_based_on_metrics);
        const SECONDS_PER_HOUR: f64 = 3600.0;
        const M_PER_KM: f64 = 1000.0;
        ((f64::from(d) * self.per_hour as f64) / SECONDS_PER_HOUR
            + (f64::from(m) * self.per_km as f64) / M_PER_KM)
            .round() as UserCost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scale_to_user_cost;

    fn matrices() -> (Arc<SquareMatrix<u32>>, Arc<SquareMatrix<u32>>) {
        let durations =
            SquareMatrix::from_rows(vec![vec![0, 1800], vec![1800, 0]]).unwrap();
        let distances =
            SquareMatrix::from_rows(vec![vec![0, 10_000], vec![10_000, 0]]).unwrap();
        (Arc::new(durations), Arc::new(distances))
    }

    #[test]
    fn metric_cost_matches_user_rescaling() {
        let (d, m) = matrices();
        let wrapper = CostWrapper::new(1.0, 3600, 500, d, m).unwrap();

        // Half an hour at 3600/h plus 10 km at 500/km.
        let user = wrapper.user_cost_from_user_metrics(1800, 10_000);
        assert_eq!(user, 1800 + 5000);
        assert_eq!(scale_to_user_cost(wrapper.cost(0, 1)), user);
    }

    #[test]
    fn speed_factor_scales_durations() {
        let (d, m) = matrices();
        let slow = CostWrapper::new(0.5, 3600, 0, d.clone(), m.clone()).unwrap();
        let fast = CostWrapper::new(2.0, 3600, 0, d, m).unwrap();
        assert_eq!(slow.duration(0, 1), 4 * fast.duration(0, 1));
        assert!(!slow.has_same_variable_costs(&fast));
    }

    #[test]
    fn user_costs_disable_metric_factors() {
        let (d, m) = matrices();
        let mut wrapper = CostWrapper::new(1.0, 3600, 500, d, m).unwrap();
        let costs = SquareMatrix::from_rows(vec![vec![0, 7], vec![7, 0]]).unwrap();
        wrapper.set_costs_matrix(Arc::new(costs));

        assert!(!wrapper.cost_based_on_metrics());
        assert_eq!(scale_to_user_cost(wrapper.cost(0, 1)), 7);
    }

    #[test]
    fn invalid_speed_factor_is_an_input_error() {
        let (d, m) = matrices();
        assert!(CostWrapper::new(0.0, 1, 1, d.clone(), m.clone()).is_err());
        assert!(CostWrapper::new(6.0, 1, 1, d, m).is_err());
    }
}
