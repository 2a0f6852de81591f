use serde::{Deserialize, Serialize};

use crate::smoothness::SmoothnessKind;
use crate::weights::DEFAULT_EPSILON;

/// Kernel-update policy for the TV1 driver.
///
/// The reference algorithm never re-estimates the kernel in its
/// single-variable variant; `Hold` preserves that and is the only policy
/// today. A future full kernel-estimation step plugs in here as a new
/// variant instead of changing the driver's contract.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelUpdate {
    #[default]
    Hold,
}

/// Inner-optimizer budget and weighting for kernel refinement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RefinerConfig {
    /// Kernel-smoothness weight (data fidelity vs. kernel roughness).
    pub gamma: f64,
    /// Maximum gradient-descent iterations.
    pub max_iters: usize,
    /// Maximum objective evaluations across all line searches.
    pub max_evals: usize,
    /// Gradient-norm threshold for declaring convergence.
    pub grad_tol: f64,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self {
            gamma: 1e-2,
            max_iters: 30,
            max_evals: 200,
            grad_tol: 1e-8,
        }
    }
}

/// Configuration for the single-variable (fixed kernel) TV1 driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Tv1Config {
    /// Outer-iteration budget.
    pub max_iter: usize,
    /// Regularization strength `lambda` (larger = smoother, less faithful).
    pub reg_param: f64,
    /// Convergence threshold on the Frobenius norm of the image change.
    pub tol: f64,
    /// Epsilon in the `1/(|grad| + epsilon)` reweighting.
    pub epsilon: f64,
    /// Smoothness operator mode. `Identity` matches the reference's
    /// simplified penalty; `Laplacian` is the true roughness operator.
    pub smoothness: SmoothnessKind,
    pub kernel_update: KernelUpdate,
}

impl Default for Tv1Config {
    fn default() -> Self {
        Self {
            max_iter: 50,
            reg_param: 1e-2,
            tol: 1e-3,
            epsilon: DEFAULT_EPSILON,
            smoothness: SmoothnessKind::Identity,
            kernel_update: KernelUpdate::Hold,
        }
    }
}

/// Configuration for the joint image+kernel TV2 driver.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Tv2Config {
    pub max_iter: usize,
    pub reg_param: f64,
    pub tol: f64,
    pub smoothness: SmoothnessKind,
    pub refiner: RefinerConfig,
}

impl Default for Tv2Config {
    fn default() -> Self {
        Self {
            max_iter: 50,
            reg_param: 1e-2,
            tol: 1e-3,
            smoothness: SmoothnessKind::Laplacian,
            refiner: RefinerConfig::default(),
        }
    }
}
