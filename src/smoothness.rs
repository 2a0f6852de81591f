use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Which smoothness operator regularizes the image solve.
///
/// `Identity` reproduces the prototype's simplified penalty (ridge-style
/// shrinkage toward zero); `Laplacian` is the true discrete second-derivative
/// roughness penalty. They are separate, selectable modes rather than a
/// silent substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmoothnessKind {
    Identity,
    Laplacian,
}

/// Build the smoothness operator for an `h`x`w` image grid, over the
/// flattened (row-major) domain.
pub fn build(kind: SmoothnessKind, h: usize, w: usize) -> DMatrix<f64> {
    match kind {
        SmoothnessKind::Identity => DMatrix::identity(h * w, h * w),
        SmoothnessKind::Laplacian => laplacian_2d(h, w),
    }
}

/// 1-D second-difference operator: -4 on the diagonal, +1 on the first
/// off-diagonals, zero elsewhere.
pub fn second_difference_1d(n: usize) -> DMatrix<f64> {
    let mut l = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        l[(i, i)] = -4.0;
        if i + 1 < n {
            l[(i, i + 1)] = 1.0;
            l[(i + 1, i)] = 1.0;
        }
    }
    l
}

/// 2-D five-point Laplacian with periodic boundary: -4 on the diagonal,
/// +1 at the four circular neighbors.
///
/// The periodic wrap matches the forward model's circular convolution, so
/// constant images lie in the null space on any grid size.
pub fn laplacian_2d(h: usize, w: usize) -> DMatrix<f64> {
    let n = h * w;
    let mut l = DMatrix::<f64>::zeros(n, n);
    for r in 0..h {
        for c in 0..w {
            let i = r * w + c;
            l[(i, i)] += -4.0;
            let up = ((r + h - 1) % h) * w + c;
            let down = ((r + 1) % h) * w + c;
            let left = r * w + (c + w - 1) % w;
            let right = r * w + (c + 1) % w;
            l[(i, up)] += 1.0;
            l[(i, down)] += 1.0;
            l[(i, left)] += 1.0;
            l[(i, right)] += 1.0;
        }
    }
    l
}
