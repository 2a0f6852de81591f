use nalgebra::{DMatrix, DVector};
use ndarray::Array2;
use tracing::warn;

use crate::error::{DeblurError, Result};
use crate::image::{Image, WeightMap};
use crate::operator::ForwardOperator;

/// Relative residual above which a direct solve is treated as unreliable and
/// the pseudoinverse fallback takes over.
const RESIDUAL_TOL: f64 = 1e-8;

/// Relative singular-value cutoff for the pseudoinverse fallback.
const SVD_CUTOFF: f64 = 1e-12;

/// Which path of the solve chain produced the solution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveMethod {
    Cholesky,
    Lu,
    /// Least-squares fallback for singular or ill-conditioned systems.
    PseudoInverse,
}

/// Solve the regularized normal equations `(A'A + lambda L) x = A'y`, or the
/// reweighted form `(A'WA + lambda L) x = A'Wy` when a weight map is given.
///
/// The solve chain is Cholesky (symmetric positive-definite systems), then
/// LU (indefinite but invertible, e.g. Laplacian-mode regularization), then
/// an SVD pseudoinverse as the least-squares fallback. Direct solutions are
/// accepted only when their relative residual is small; otherwise the
/// fallback runs and is reported through the returned `SolveMethod`.
/// `SingularSystem` is raised only when even the pseudoinverse fails.
pub fn solve_regularized(
    operator: &ForwardOperator,
    observation: &Image,
    reg_param: f64,
    smoothness: &DMatrix<f64>,
    weights: Option<&WeightMap>,
) -> Result<(Image, SolveMethod)> {
    let (h, w) = observation.dim();
    let n = h * w;

    if operator.shape() != (h, w) {
        let (op_h, op_w) = operator.shape();
        return Err(DeblurError::ShapeMismatch {
            context: "solver operator vs observation",
            lhs_rows: op_h,
            lhs_cols: op_w,
            rhs_rows: h,
            rhs_cols: w,
        });
    }
    if smoothness.nrows() != n || smoothness.ncols() != n {
        return Err(DeblurError::ShapeMismatch {
            context: "solver smoothness operator",
            lhs_rows: smoothness.nrows(),
            lhs_cols: smoothness.ncols(),
            rhs_rows: n,
            rhs_cols: n,
        });
    }
    if let Some(map) = weights {
        if map.dim() != (h, w) {
            let (map_h, map_w) = map.dim();
            return Err(DeblurError::ShapeMismatch {
                context: "solver weight map vs observation",
                lhs_rows: map_h,
                lhs_cols: map_w,
                rhs_rows: h,
                rhs_cols: w,
            });
        }
    }

    let a = operator.matrix();
    let y = DVector::from_iterator(n, observation.data().iter().cloned());

    // Normal equations, optionally reweighted: W scales the rows of A and
    // the entries of y.
    let (mut system, rhs) = match weights {
        Some(map) => {
            let mut wa = a.clone();
            for (i, &wi) in map.data().iter().enumerate() {
                wa.row_mut(i).scale_mut(wi);
            }
            let wy = DVector::from_iterator(
                n,
                map.data().iter().zip(observation.data().iter()).map(|(&wi, &yi)| wi * yi),
            );
            (a.transpose() * &wa, a.transpose() * wy)
        }
        None => (a.transpose() * &a, a.transpose() * y),
    };
    system += smoothness * reg_param;

    let (solution, method) = solve_chain(system, rhs, n)?;

    let data = Array2::from_shape_vec((h, w), solution.iter().cloned().collect())
        .expect("solution length matches observation shape");
    Ok((Image::new(data)?, method))
}

fn solve_chain(
    system: DMatrix<f64>,
    rhs: DVector<f64>,
    n: usize,
) -> Result<(DVector<f64>, SolveMethod)> {
    let rhs_scale = rhs.norm().max(1.0);

    if let Some(chol) = system.clone().cholesky() {
        let x = chol.solve(&rhs);
        if (&system * &x - &rhs).norm() <= RESIDUAL_TOL * rhs_scale {
            return Ok((x, SolveMethod::Cholesky));
        }
        warn!("Cholesky solution residual too large, retrying");
    }

    if let Some(x) = system.clone().lu().solve(&rhs) {
        if (&system * &x - &rhs).norm() <= RESIDUAL_TOL * rhs_scale {
            return Ok((x, SolveMethod::Lu));
        }
        warn!("LU solution residual too large, falling back to pseudoinverse");
    } else {
        warn!("normal equations singular, falling back to pseudoinverse");
    }

    let svd = system.svd(true, true);
    let max_sv = svd.singular_values.iter().cloned().fold(0.0f64, f64::max);
    let cutoff = max_sv * SVD_CUTOFF;
    match svd.solve(&rhs, cutoff) {
        Ok(x) => Ok((x, SolveMethod::PseudoInverse)),
        Err(_) => Err(DeblurError::SingularSystem { n }),
    }
}
