use crate::models::{Amount, Input};

use super::raw_route::RawRoute;
use super::sequence::JobSequence;

/// Capability bundle shared by capacity-only and time-window-aware routes.
/// Operators and heuristics are generic over this; the capacity-only
/// implementation answers every timing question with "feasible".
pub trait Route: Clone {
    fn new(input: &Input, v_rank: usize) -> Self;

    fn raw(&self) -> &RawRoute;

    fn set_route(&mut self, input: &Input, jobs: Vec<usize>);

    fn add(&mut self, input: &Input, job_rank: usize, rank: usize);

    fn remove(&mut self, input: &Input, rank: usize, count: usize);

    /// Splice seq (with `delivery` the single-job deliveries it carries) in
    /// place of the sub-route [first_rank; last_rank).
    fn replace<S: JobSequence + ?Sized>(
        &mut self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
    );

    fn is_valid_addition_for_tw(&self, input: &Input, job_rank: usize, rank: usize) -> bool;

    fn is_valid_addition_for_tw_without_max_load(
        &self,
        input: &Input,
        job_rank: usize,
        rank: usize,
    ) -> bool;

    fn is_valid_seq_addition_for_tw<S: JobSequence + ?Sized>(
        &self,
        input: &Input,
        delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
        check_max_load: bool,
    ) -> bool;

    fn is_valid_removal(&self, input: &Input, rank: usize, count: usize) -> bool;

    fn empty(&self) -> bool {
        self.raw().empty()
    }

    fn size(&self) -> usize {
        self.raw().size()
    }

    fn jobs(&self) -> &[usize] {
        &self.raw().jobs
    }

    fn v_rank(&self) -> usize {
        self.raw().v_rank
    }
}

impl Route for RawRoute {
    fn new(input: &Input, v_rank: usize) -> Self {
        RawRoute::new(input, v_rank)
    }

    fn raw(&self) -> &RawRoute {
        self
    }

    fn set_route(&mut self, input: &Input, jobs: Vec<usize>) {
        RawRoute::set_route(self, input, jobs);
    }

    fn add(&mut self, input: &Input, job_rank: usize, rank: usize) {
        RawRoute::add(self, input, job_rank, rank);
    }

    fn remove(&mut self, input: &Input, rank: usize, count: usize) {
        RawRoute::remove(self, input, rank, count);
    }

    fn replace<S: JobSequence + ?Sized>(
        &mut self,
        input: &Input,
        _delivery: &Amount,
        seq: &S,
        first_rank: usize,
        last_rank: usize,
    ) {
        RawRoute::replace(self, input, seq, first_rank, last_rank);
    }

    fn is_valid_addition_for_tw(&self, _input: &Input, _job_rank: usize, _rank: usize) -> bool {
        true
    }

    fn is_valid_addition_for_tw_without_max_load(
        &self,
        _input: &Input,
        _job_rank: usize,
        _rank: usize,
    ) -> bool {
        true
    }

    fn is_valid_seq_addition_for_tw<S: JobSequence + ?Sized>(
        &self,
        _input: &Input,
        _delivery: &Amount,
        _seq: &S,
        _first_rank: usize,
        _last_rank: usize,
        _check_max_load: bool,
    ) -> bool {
        true
    }

    fn is_valid_removal(&self, _input: &Input, _rank: usize, _count: usize) -> bool {
        true
    }
}
