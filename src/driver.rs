use tracing::{debug, info};

use crate::config::{KernelUpdate, Tv1Config, Tv2Config};
use crate::error::{DeblurError, Result};
use crate::image::{Image, Kernel};
use crate::operator::ForwardOperator;
use crate::refine::refine_kernel;
use crate::smoothness;
use crate::solver::{solve_regularized, SolveMethod};
use crate::weights::weight_map;

/// Why the outer loop stopped.
///
/// Reaching the iteration budget is an expected, reportable terminal
/// condition carrying the last computed estimate, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    Converged,
    MaxIterations,
}

/// Final state of one alternating-minimization run.
#[derive(Clone, Debug)]
pub struct DeblurOutcome {
    pub image: Image,
    pub kernel: Kernel,
    /// Outer iterations executed.
    pub iterations: usize,
    pub termination: Termination,
    /// Image solves that needed the pseudoinverse fallback.
    pub fallback_solves: usize,
    /// Kernel refinements that exhausted their budget without converging
    /// (always zero for TV1).
    pub refiner_stalls: usize,
}

/// Single-variable alternating minimization: reweighted image solves with a
/// fixed kernel.
///
/// Each iteration rebuilds the forward operator from the kernel snapshot,
/// solves the reweighted regularized system, recomputes the weight map from
/// the new estimate, and tests `||x - x_new|| < tol` against the pre-update
/// estimate. The kernel is returned unchanged (see `KernelUpdate`).
pub fn tv1(observation: &Image, initial_kernel: &Kernel, config: &Tv1Config) -> Result<DeblurOutcome> {
    validate_common(config.reg_param, config.tol)?;
    // The only policy today; keeps the placeholder explicit at the call site.
    match config.kernel_update {
        KernelUpdate::Hold => {}
    }

    let dim = observation.dim();
    let (rows, cols) = dim;
    let l = smoothness::build(config.smoothness, rows, cols);

    info!(
        max_iter = config.max_iter,
        reg_param = config.reg_param,
        smoothness = ?config.smoothness,
        "starting TV1 run"
    );

    let mut x = observation.clone();
    let mut weights = weight_map(&x, config.epsilon)?;
    let mut fallback_solves = 0usize;

    for iter in 0..config.max_iter {
        let op = ForwardOperator::new(initial_kernel, dim)?;
        let (x_new, method) =
            solve_regularized(&op, observation, config.reg_param, &l, Some(&weights))?;
        if method == SolveMethod::PseudoInverse {
            fallback_solves += 1;
        }

        weights = weight_map(&x_new, config.epsilon)?;

        let delta = x.distance(&x_new)?;
        debug!(iteration = iter, delta, "TV1 iteration");

        if delta < config.tol {
            info!(iterations = iter + 1, "TV1 converged");
            return Ok(DeblurOutcome {
                image: x_new,
                kernel: initial_kernel.clone(),
                iterations: iter + 1,
                termination: Termination::Converged,
                fallback_solves,
                refiner_stalls: 0,
            });
        }
        x = x_new;
    }

    info!(iterations = config.max_iter, "TV1 reached iteration budget");
    Ok(DeblurOutcome {
        image: x,
        kernel: initial_kernel.clone(),
        iterations: config.max_iter,
        termination: Termination::MaxIterations,
        fallback_solves,
        refiner_stalls: 0,
    })
}

/// Joint image+kernel alternating minimization.
///
/// The smoothness operator is built once from the image shape. Each
/// iteration solves the regularized system with the current kernel, refines
/// the kernel against the new image estimate, then tests convergence against
/// the pre-update estimate. Both state assignments happen only on
/// non-terminating iterations: on the terminating iteration the freshly
/// refined kernel is discarded, so first-iteration convergence returns the
/// initial kernel untouched.
pub fn tv2(observation: &Image, initial_kernel: &Kernel, config: &Tv2Config) -> Result<DeblurOutcome> {
    validate_common(config.reg_param, config.tol)?;

    let dim = observation.dim();
    let (rows, cols) = dim;
    let l = smoothness::build(config.smoothness, rows, cols);

    info!(
        max_iter = config.max_iter,
        reg_param = config.reg_param,
        gamma = config.refiner.gamma,
        smoothness = ?config.smoothness,
        "starting TV2 run"
    );

    let mut x = observation.clone();
    let mut kernel = initial_kernel.clone();
    let mut fallback_solves = 0usize;
    let mut refiner_stalls = 0usize;

    for iter in 0..config.max_iter {
        let op = ForwardOperator::new(&kernel, dim)?;
        let (x_new, method) = solve_regularized(&op, observation, config.reg_param, &l, None)?;
        if method == SolveMethod::PseudoInverse {
            fallback_solves += 1;
        }

        let refined = refine_kernel(&x_new, observation, &kernel, &config.refiner)?;
        if !refined.converged {
            refiner_stalls += 1;
        }

        let delta = x.distance(&x_new)?;
        debug!(
            iteration = iter,
            delta,
            refine_cost = refined.cost,
            refine_converged = refined.converged,
            "TV2 iteration"
        );

        if delta < config.tol {
            info!(iterations = iter + 1, "TV2 converged");
            return Ok(DeblurOutcome {
                image: x_new,
                kernel,
                iterations: iter + 1,
                termination: Termination::Converged,
                fallback_solves,
                refiner_stalls,
            });
        }
        x = x_new;
        kernel = refined.kernel;
    }

    info!(iterations = config.max_iter, "TV2 reached iteration budget");
    Ok(DeblurOutcome {
        image: x,
        kernel,
        iterations: config.max_iter,
        termination: Termination::MaxIterations,
        fallback_solves,
        refiner_stalls,
    })
}

fn validate_common(reg_param: f64, tol: f64) -> Result<()> {
    if reg_param < 0.0 {
        return Err(DeblurError::InvalidParameter(format!(
            "regularization strength must be non-negative, got {reg_param}"
        )));
    }
    if tol <= 0.0 {
        return Err(DeblurError::InvalidParameter(format!(
            "convergence threshold must be positive, got {tol}"
        )));
    }
    Ok(())
}
