use ndarray::Array2;

use crate::error::{DeblurError, Result};

/// A 2-D grid of real-valued samples: either the observed degraded image `y`
/// or a sharp-image estimate `x`.
///
/// Shape is validated at construction; all downstream code can assume a
/// non-empty grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
    data: Array2<f64>,
}

impl Image {
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(DeblurError::InvalidDimensions { rows, cols });
        }
        Ok(Self { data })
    }

    pub fn from_elem(rows: usize, cols: usize, value: f64) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(DeblurError::InvalidDimensions { rows, cols });
        }
        Ok(Self {
            data: Array2::from_elem((rows, cols), value),
        })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<f64> {
        self.data
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Frobenius norm of the elementwise difference, used by the drivers'
    /// convergence test.
    pub fn distance(&self, other: &Image) -> Result<f64> {
        if self.dim() != other.dim() {
            let (lhs_rows, lhs_cols) = self.dim();
            let (rhs_rows, rhs_cols) = other.dim();
            return Err(DeblurError::ShapeMismatch {
                context: "image difference",
                lhs_rows,
                lhs_cols,
                rhs_rows,
                rhs_cols,
            });
        }
        let sum_sq: f64 = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum();
        Ok(sum_sq.sqrt())
    }
}

/// A blur kernel (point-spread function): a small 2-D grid, non-negative and
/// ideally summing to 1.
///
/// Normalization is not enforced here: the alternating-minimization loop
/// does not renormalize, so drift is possible and visible to callers.
/// `normalized` is available for setup code that wants a physical PSF.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    data: Array2<f64>,
}

impl Kernel {
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(DeblurError::InvalidDimensions { rows, cols });
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Copy of this kernel rescaled to sum 1. A kernel with non-positive
    /// total mass is returned unchanged.
    pub fn normalized(&self) -> Kernel {
        let sum = self.sum();
        if sum > 0.0 {
            Kernel {
                data: self.data.mapv(|v| v / sum),
            }
        } else {
            self.clone()
        }
    }
}

/// Per-pixel regularization weights, same shape as the image they were
/// derived from. Recomputed from scratch each outer iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct WeightMap {
    data: Array2<f64>,
}

impl WeightMap {
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (rows, cols) = data.dim();
        if rows == 0 || cols == 0 {
            return Err(DeblurError::InvalidDimensions { rows, cols });
        }
        Ok(Self { data })
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}
