use ndarray::Array2;
use tracing::debug;

use crate::config::RefinerConfig;
use crate::error::{DeblurError, Result};
use crate::image::{Image, Kernel};
use crate::operator::ForwardOperator;

/// Armijo sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;

/// Maximum step halvings per line search.
const MAX_BACKTRACKS: usize = 30;

/// Result of one kernel-refinement call.
///
/// Non-convergence is not an error: the best iterate found is returned and
/// `converged` tells the caller the inner optimizer ran out of budget.
#[derive(Clone, Debug)]
pub struct RefineOutcome {
    pub kernel: Kernel,
    pub converged: bool,
    pub iterations: usize,
    pub evaluations: usize,
    pub cost: f64,
}

/// Refine a kernel estimate against a fixed image estimate.
///
/// Minimizes `||y - h * x||^2 + gamma * sum((delta h)^2)` over `h >= 0` by
/// projected gradient descent with Armijo backtracking, starting from
/// `initial`. Iterations and objective evaluations are both hard-bounded so
/// the outer alternating loop always makes progress.
pub fn refine_kernel(
    image: &Image,
    observation: &Image,
    initial: &Kernel,
    config: &RefinerConfig,
) -> Result<RefineOutcome> {
    if image.dim() != observation.dim() {
        let (lhs_rows, lhs_cols) = image.dim();
        let (rhs_rows, rhs_cols) = observation.dim();
        return Err(DeblurError::ShapeMismatch {
            context: "kernel refinement image vs observation",
            lhs_rows,
            lhs_cols,
            rhs_rows,
            rhs_cols,
        });
    }
    if config.gamma < 0.0 {
        return Err(DeblurError::InvalidParameter(format!(
            "kernel smoothness weight must be non-negative, got {}",
            config.gamma
        )));
    }

    let shape = observation.dim();
    let mut h = initial.data().clone();
    let mut evaluations = 0usize;

    let (mut cost, mut residual) = objective(&h, image, observation, shape, config.gamma)?;
    evaluations += 1;

    let mut converged = false;
    let mut iterations = 0usize;
    let mut step = 1.0f64;

    for iter in 0..config.max_iters {
        let mut gradient = data_gradient(&residual, image.data(), h.dim());
        gradient += &(smoothness_gradient(&h) * config.gamma);

        let grad_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        if grad_norm <= config.grad_tol {
            converged = true;
            break;
        }

        // Backtracking line search with projection onto h >= 0.
        let mut accepted = false;
        let mut s = step;
        for _ in 0..MAX_BACKTRACKS {
            if evaluations >= config.max_evals {
                break;
            }
            let trial = ndarray::Zip::from(&h)
                .and(&gradient)
                .map_collect(|&hv, &gv| (hv - s * gv).max(0.0));
            let (trial_cost, trial_residual) =
                objective(&trial, image, observation, shape, config.gamma)?;
            evaluations += 1;

            // Sufficient decrease measured against the projected step.
            let decrease: f64 = ndarray::Zip::from(&h)
                .and(&trial)
                .and(&gradient)
                .fold(0.0, |acc, &hv, &tv, &gv| acc + gv * (hv - tv));
            if trial_cost <= cost - ARMIJO_C1 * decrease {
                h = trial;
                cost = trial_cost;
                residual = trial_residual;
                step = s * 2.0;
                accepted = true;
                break;
            }
            s *= 0.5;
        }

        iterations = iter + 1;
        if !accepted {
            // Budget exhausted or no descent direction left.
            break;
        }
        if evaluations >= config.max_evals {
            break;
        }
    }

    debug!(iterations, evaluations, cost, converged, "kernel refinement finished");

    Ok(RefineOutcome {
        kernel: Kernel::new(h)?,
        converged,
        iterations,
        evaluations,
        cost,
    })
}

/// Objective value and the data residual `h * x - y` it was computed from.
fn objective(
    h: &Array2<f64>,
    image: &Image,
    observation: &Image,
    shape: (usize, usize),
    gamma: f64,
) -> Result<(f64, Array2<f64>)> {
    let kernel = Kernel::new(h.clone())?;
    let op = ForwardOperator::new(&kernel, shape)?;
    let predicted = op.apply(image)?;

    let residual = predicted.data() - observation.data();
    let data_term: f64 = residual.iter().map(|r| r * r).sum();
    Ok((data_term + gamma * smoothness_penalty(h), residual))
}

/// Gradient of `||h * x - y||^2` with respect to the kernel taps:
/// correlation of the residual with the image at each tap offset.
fn data_gradient(
    residual: &Array2<f64>,
    image: &Array2<f64>,
    kernel_dim: (usize, usize),
) -> Array2<f64> {
    let (h, w) = residual.dim();
    let (kh, kw) = kernel_dim;
    let center_r = (kh / 2) as isize;
    let center_c = (kw / 2) as isize;

    let mut gradient = Array2::<f64>::zeros((kh, kw));
    for qr in 0..kh {
        for qc in 0..kw {
            let off_r = qr as isize - center_r;
            let off_c = qc as isize - center_c;
            let mut acc = 0.0;
            for pr in 0..h {
                for pc in 0..w {
                    let sr = (pr as isize - off_r).rem_euclid(h as isize) as usize;
                    let sc = (pc as isize - off_c).rem_euclid(w as isize) as usize;
                    acc += residual[[pr, pc]] * image[[sr, sc]];
                }
            }
            gradient[[qr, qc]] = 2.0 * acc;
        }
    }
    gradient
}

/// Sum of squared forward finite differences of the kernel.
fn smoothness_penalty(h: &Array2<f64>) -> f64 {
    let (kh, kw) = h.dim();
    let mut sum = 0.0;
    for r in 0..kh {
        for c in 0..kw {
            if c + 1 < kw {
                let d = h[[r, c + 1]] - h[[r, c]];
                sum += d * d;
            }
            if r + 1 < kh {
                let d = h[[r + 1, c]] - h[[r, c]];
                sum += d * d;
            }
        }
    }
    sum
}

fn smoothness_gradient(h: &Array2<f64>) -> Array2<f64> {
    let (kh, kw) = h.dim();
    let mut gradient = Array2::<f64>::zeros((kh, kw));
    for r in 0..kh {
        for c in 0..kw {
            let mut g = 0.0;
            if c + 1 < kw {
                g -= 2.0 * (h[[r, c + 1]] - h[[r, c]]);
            }
            if c > 0 {
                g += 2.0 * (h[[r, c]] - h[[r, c - 1]]);
            }
            if r + 1 < kh {
                g -= 2.0 * (h[[r + 1, c]] - h[[r, c]]);
            }
            if r > 0 {
                g += 2.0 * (h[[r, c]] - h[[r - 1, c]]);
            }
            gradient[[r, c]] = g;
        }
    }
    gradient
}
