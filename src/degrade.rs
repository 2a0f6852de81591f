//! Synthetic degradation: apply a known PSF plus Gaussian noise to a clean
//! image. Test-data generator for the deconvolution drivers, deliberately
//! outside the algorithm itself.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{DeblurError, Result};
use crate::image::{Image, Kernel};
use crate::operator::ForwardOperator;

/// Uniform (box) PSF of `size`x`size`, normalized to sum 1.
pub fn uniform_kernel(size: usize) -> Result<Kernel> {
    if size == 0 {
        return Err(DeblurError::InvalidDimensions { rows: 0, cols: 0 });
    }
    let value = 1.0 / (size * size) as f64;
    Kernel::new(Array2::from_elem((size, size), value))
}

/// Blur `clean` with a uniform PSF of the given size and add zero-mean
/// Gaussian noise of the given variance.
///
/// The RNG seed is explicit so test observations are reproducible. Returns
/// the degraded image together with the PSF used.
pub fn degrade(
    clean: &Image,
    psf_size: usize,
    noise_variance: f64,
    seed: u64,
) -> Result<(Image, Kernel)> {
    if noise_variance < 0.0 {
        return Err(DeblurError::InvalidParameter(format!(
            "noise variance must be non-negative, got {noise_variance}"
        )));
    }

    let kernel = uniform_kernel(psf_size)?;
    let op = ForwardOperator::new(&kernel, clean.dim())?;
    let mut blurred = op.apply(clean)?.into_data();

    if noise_variance > 0.0 {
        let std_dev = noise_variance.sqrt();
        let mut rng = StdRng::seed_from_u64(seed);
        for v in blurred.iter_mut() {
            *v += std_dev * standard_normal(&mut rng);
        }
    }

    Ok((Image::new(blurred)?, kernel))
}

/// Standard normal sample via Box-Muller.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
