use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::{Cost, Distance, Duration};

/// Scalar evaluation of a route fragment or a move. Comparison is
/// lexicographic on (cost, duration, distance, task_duration).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Eval {
    pub cost: Cost,
    pub duration: Duration,
    pub distance: Distance,
    pub task_duration: Duration,
}

pub const NO_EVAL: Eval = Eval {
    cost: Cost::MAX,
    duration: 0,
    distance: 0,
    task_duration: 0,
};

pub const NO_GAIN: Eval = Eval {
    cost: Cost::MIN,
    duration: 0,
    distance: 0,
    task_duration: 0,
};

impl Eval {
    pub const fn new(cost: Cost, duration: Duration, distance: Distance) -> Self {
        Eval {
            cost,
            duration,
            distance,
            task_duration: 0,
        }
    }
}

impl AddAssign for Eval {
    fn add_assign(&mut self, rhs: Eval) {
        self.cost += rhs.cost;
        self.duration += rhs.duration;
        self.distance += rhs.distance;
        self.task_duration += rhs.task_duration;
    }
}

impl SubAssign for Eval {
    fn sub_assign(&mut self, rhs: Eval) {
        self.cost -= rhs.cost;
        self.duration -= rhs.duration;
        self.distance -= rhs.distance;
        self.task_duration -= rhs.task_duration;
    }
}

impl Add for Eval {
    type Output = Eval;

    fn add(mut self, rhs: Eval) -> Eval {
        self += rhs;
        self
    }
}

impl Sub for Eval {
    type Output = Eval;

    fn sub(mut self, rhs: Eval) -> Eval {
        self -= rhs;
        self
    }
}

impl Neg for Eval {
    type Output = Eval;

    fn neg(self) -> Eval {
        Eval {
            cost: -self.cost,
            duration: -self.duration,
            distance: -self.distance,
            task_duration: -self.task_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexicographic_comparison() {
        let cheap_slow = Eval::new(10, 500, 0);
        let cheap_fast = Eval::new(10, 100, 0);
        let pricey = Eval::new(20, 1, 0);

        assert!(cheap_fast < cheap_slow);
        assert!(cheap_slow < pricey);
        assert!(NO_GAIN < cheap_fast);
        assert!(pricey < NO_EVAL);
    }

    #[test]
    fn pointwise_arithmetic() {
        let a = Eval::new(5, 2, 1);
        let b = Eval::new(3, 1, 1);
        assert_eq!(a + b, Eval::new(8, 3, 2));
        assert_eq!(a - b, Eval::new(2, 1, 0));
        assert_eq!(a + (-a), Eval::default());
    }
}
