use ndarray::Array2;

use crate::error::{DeblurError, Result};
use crate::image::{Image, WeightMap};

/// Default epsilon guarding the division in near-flat regions.
pub const DEFAULT_EPSILON: f64 = 1e-3;

/// Forward finite-difference gradient magnitude, `sqrt(gx^2 + gy^2)`.
///
/// The difference past the last column/row is taken as zero, so the output
/// has the input's shape.
pub fn gradient_magnitude(data: &Array2<f64>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut result = Array2::<f64>::zeros((h, w));

    for row in 0..h {
        for col in 0..w {
            let gx = if col + 1 < w {
                data[[row, col + 1]] - data[[row, col]]
            } else {
                0.0
            };
            let gy = if row + 1 < h {
                data[[row + 1, col]] - data[[row, col]]
            } else {
                0.0
            };
            result[[row, col]] = (gx * gx + gy * gy).sqrt();
        }
    }

    result
}

/// Per-pixel regularization weights `1 / (|grad| + epsilon)`.
///
/// Large gradients (edges) get small weights so the smoothness penalty
/// relaxes there; flat regions get large weights. A constant image yields
/// `1/epsilon` everywhere.
pub fn weight_map(image: &Image, epsilon: f64) -> Result<WeightMap> {
    if epsilon <= 0.0 {
        return Err(DeblurError::InvalidParameter(format!(
            "weight epsilon must be positive, got {epsilon}"
        )));
    }

    let magnitude = gradient_magnitude(image.data());
    WeightMap::new(magnitude.mapv(|m| 1.0 / (m + epsilon)))
}
