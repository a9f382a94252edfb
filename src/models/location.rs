/// Longitude/latitude pair, in that order to match the wire format.
pub type Coordinates = [f64; 2];

/// A resolved location: an index into the per-profile matrices, plus the
/// original coordinates when the input supplied any.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    index: usize,
    coords: Option<Coordinates>,
}

impl Location {
    pub fn new(index: usize, coords: Option<Coordinates>) -> Self {
        Location { index, coords }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn coords(&self) -> Option<Coordinates> {
        self.coords
    }

    pub fn has_coords(&self) -> bool {
        self.coords.is_some()
    }

    pub fn lon(&self) -> f64 {
        self.coords.map(|c| c[0]).unwrap_or(0.0)
    }

    pub fn lat(&self) -> f64 {
        self.coords.map(|c| c[1]).unwrap_or(0.0)
    }
}
