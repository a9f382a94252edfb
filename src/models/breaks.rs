use super::{Amount, Duration, Id, TimeWindow};

/// Driver break: scheduled between tasks, within one of its time windows,
/// optionally capped by a maximum on-board load.
#[derive(Clone, Debug)]
pub struct Break {
    pub id: Id,
    pub tws: Vec<TimeWindow>,
    pub service: Duration,
    pub description: String,
    pub max_load: Option<Amount>,
}

impl Break {
    pub fn new(
        id: Id,
        tws: Vec<TimeWindow>,
        service: Duration,
        description: String,
        max_load: Option<Amount>,
    ) -> Self {
        let tws = if tws.is_empty() {
            vec![TimeWindow::default()]
        } else {
            tws
        };
        Break {
            id,
            tws,
            service,
            description,
            max_load,
        }
    }

    pub fn is_valid_start(&self, time: Duration) -> bool {
        self.tws.iter().any(|tw| tw.contains(time))
    }

    pub fn is_valid_for_load(&self, load: &Amount) -> bool {
        self.max_load.as_ref().map_or(true, |max| load <= max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_validity_spans_all_windows() {
        let b = Break::new(
            1,
            vec![TimeWindow::new(10, 20), TimeWindow::new(40, 50)],
            0,
            String::new(),
            None,
        );
        assert!(b.is_valid_start(TimeWindow::new(15, 15).start));
        assert!(b.is_valid_start(TimeWindow::new(45, 45).start));
        assert!(!b.is_valid_start(TimeWindow::new(30, 30).start));
    }

    #[test]
    fn max_load_check() {
        let b = Break::new(
            1,
            vec![],
            0,
            String::new(),
            Some(Amount::from_vec(vec![3])),
        );
        assert!(b.is_valid_for_load(&Amount::from_vec(vec![3])));
        assert!(!b.is_valid_for_load(&Amount::from_vec(vec![4])));
    }
}
