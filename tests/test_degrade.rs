use ndarray::Array2;

use deblur::degrade::{degrade, uniform_kernel};
use deblur::error::DeblurError;
use deblur::image::Image;
use deblur::operator::ForwardOperator;

fn step_image(size: usize, value: f64) -> Image {
    let mut data = Array2::<f64>::zeros((size, size));
    for r in size / 4..3 * size / 4 {
        for c in size / 4..3 * size / 4 {
            data[[r, c]] = value;
        }
    }
    Image::new(data).unwrap()
}

// ---------------------------------------------------------------------------
// Uniform PSF
// ---------------------------------------------------------------------------

#[test]
fn uniform_kernel_sums_to_one() {
    for size in [1, 3, 5] {
        let k = uniform_kernel(size).unwrap();
        assert_eq!(k.dim(), (size, size));
        assert!(
            (k.sum() - 1.0).abs() < 1e-12,
            "uniform PSF of size {size} should sum to 1, got {}",
            k.sum()
        );
    }
}

#[test]
fn zero_size_kernel_is_rejected() {
    let err = uniform_kernel(0).unwrap_err();
    assert!(matches!(err, DeblurError::InvalidDimensions { .. }));
}

#[test]
fn kernel_normalization_rescales_to_unit_mass() {
    let kernel = deblur::image::Kernel::new(Array2::from_elem((3, 3), 2.0)).unwrap();
    let normalized = kernel.normalized();
    assert!((normalized.sum() - 1.0).abs() < 1e-12);
    for &v in normalized.data().iter() {
        assert!((v - 1.0 / 9.0).abs() < 1e-12);
    }

    // Zero-mass kernels are left untouched.
    let zero = deblur::image::Kernel::new(Array2::from_elem((2, 2), 0.0)).unwrap();
    assert_eq!(zero.normalized(), zero);
}

// ---------------------------------------------------------------------------
// Zero-noise degradation is a pure blur
// ---------------------------------------------------------------------------

#[test]
fn zero_noise_degrade_of_constant_image_is_constant() {
    let clean = Image::from_elem(16, 16, 100.0).unwrap();
    let (degraded, psf) = degrade(&clean, 3, 0.0, 1).unwrap();

    assert_eq!(psf.dim(), (3, 3));
    for &v in degraded.data().iter() {
        assert!(
            (v - 100.0).abs() < 1e-9,
            "uniform blur of a constant image is the identity, got {v}"
        );
    }
}

#[test]
fn zero_noise_degrade_matches_operator_apply() {
    let clean = step_image(8, 5.0);
    let (degraded, psf) = degrade(&clean, 3, 0.0, 1).unwrap();

    let op = ForwardOperator::new(&psf, clean.dim()).unwrap();
    let expected = op.apply(&clean).unwrap();

    for (a, b) in degraded.data().iter().zip(expected.data().iter()) {
        assert!((a - b).abs() < 1e-12, "zero-noise degrade is a pure blur");
    }
}

// ---------------------------------------------------------------------------
// Noise reproducibility
// ---------------------------------------------------------------------------

#[test]
fn same_seed_reproduces_the_observation() {
    let clean = step_image(8, 5.0);
    let (first, _) = degrade(&clean, 3, 0.5, 99).unwrap();
    let (second, _) = degrade(&clean, 3, 0.5, 99).unwrap();
    assert_eq!(first, second, "same seed must give identical noise");
}

#[test]
fn different_seeds_differ() {
    let clean = step_image(8, 5.0);
    let (first, _) = degrade(&clean, 3, 0.5, 1).unwrap();
    let (second, _) = degrade(&clean, 3, 0.5, 2).unwrap();
    assert_ne!(first, second);
}

#[test]
fn noise_perturbs_the_blurred_image() {
    let clean = step_image(8, 5.0);
    let (noiseless, _) = degrade(&clean, 3, 0.0, 1).unwrap();
    let (noisy, _) = degrade(&clean, 3, 0.25, 1).unwrap();

    let moved = noisy.distance(&noiseless).unwrap();
    assert!(moved > 0.0, "nonzero variance should perturb the image");
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn negative_variance_is_rejected() {
    let clean = step_image(4, 1.0);
    let err = degrade(&clean, 3, -0.1, 1).unwrap_err();
    assert!(matches!(err, DeblurError::InvalidParameter(_)));
}

#[test]
fn oversized_psf_is_rejected() {
    let clean = step_image(4, 1.0);
    let err = degrade(&clean, 5, 0.0, 1).unwrap_err();
    assert!(matches!(err, DeblurError::ShapeMismatch { .. }));
}
