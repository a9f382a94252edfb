use super::{scale_from_user_duration, Duration, UserDuration};

/// Scaled service time window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeWindow {
    pub start: Duration,
    pub end: Duration,
}

impl TimeWindow {
    pub fn new(start: UserDuration, end: UserDuration) -> Self {
        TimeWindow {
            start: scale_from_user_duration(start),
            end: scale_from_user_duration(end),
        }
    }

    pub fn contains(&self, time: Duration) -> bool {
        self.start <= time && time <= self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_default(&self) -> bool {
        self.length() == Self::default().length()
    }
}

impl Default for TimeWindow {
    /// "No constraint" window spanning the whole representable horizon.
    fn default() -> Self {
        TimeWindow::new(0, UserDuration::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DURATION_FACTOR;

    #[test]
    fn scaling_and_membership() {
        let tw = TimeWindow::new(10, 20);
        assert_eq!(tw.start, 10 * DURATION_FACTOR);
        assert!(tw.contains(15 * DURATION_FACTOR));
        assert!(!tw.contains(21 * DURATION_FACTOR));
        assert!(!tw.is_default());
        assert!(TimeWindow::default().is_default());
    }

    #[test]
    fn ordering_is_start_then_end() {
        let a = TimeWindow::new(0, 10);
        let b = TimeWindow::new(0, 20);
        let c = TimeWindow::new(5, 6);
        assert!(a < b);
        assert!(b < c);
    }
}
