use std::sync::Arc;

use crate::error::Error;

use super::{UserCost, UserDistance, UserDuration};

/// Row-major square matrix over location indices.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SquareMatrix<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Copy + Default> SquareMatrix<T> {
    pub fn new(size: usize, fill: T) -> Self {
        SquareMatrix {
            size,
            data: vec![fill; size * size],
        }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, Error> {
        let size = rows.len();
        let mut data = Vec::with_capacity(size * size);
        for row in &rows {
            if row.len() != size {
                return Err(Error::Input(format!(
                    "unexpected matrix row size: {} instead of {}",
                    row.len(),
                    size
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(SquareMatrix { size, data })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, i: usize, j: usize) -> T {
        self.data[i * self.size + j]
    }

    pub fn set(&mut self, i: usize, j: usize, value: T) {
        self.data[i * self.size + j] = value;
    }
}

/// Duration/distance/cost matrices for one routing profile. Matrices are
/// shared with each vehicle's cost wrapper.
#[derive(Clone)]
pub struct ProfileMatrices {
    pub durations: Arc<SquareMatrix<UserDuration>>,
    pub distances: Arc<SquareMatrix<UserDistance>>,
    pub costs: Option<Arc<SquareMatrix<UserCost>>>,
}

impl ProfileMatrices {
    pub fn size(&self) -> usize {
        self.durations.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let m = SquareMatrix::from_rows(vec![vec![0u32, 1, 2], vec![3, 4, 5], vec![6, 7, 8]])
            .unwrap();
        assert_eq!(m.size(), 3);
        assert_eq!(m.get(0, 2), 2);
        assert_eq!(m.get(2, 1), 7);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = SquareMatrix::from_rows(vec![vec![0u32, 1], vec![2]]);
        assert!(err.is_err());
    }
}
