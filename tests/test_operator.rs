use ndarray::Array2;

use deblur::error::DeblurError;
use deblur::image::{Image, Kernel};
use deblur::operator::ForwardOperator;

fn ramp_image(h: usize, w: usize) -> Image {
    let data = Array2::from_shape_fn((h, w), |(r, c)| 1.0 + (r * w + c) as f64 * 0.1);
    Image::new(data).unwrap()
}

// ---------------------------------------------------------------------------
// Identity kernel round trip
// ---------------------------------------------------------------------------

#[test]
fn identity_kernel_returns_input_unchanged() {
    let mut k = Array2::<f64>::zeros((3, 3));
    k[[1, 1]] = 1.0;
    let kernel = Kernel::new(k).unwrap();

    let image = ramp_image(8, 8);
    let op = ForwardOperator::new(&kernel, image.dim()).unwrap();
    let result = op.apply(&image).unwrap();

    for r in 0..8 {
        for c in 0..8 {
            let diff = (result.data()[[r, c]] - image.data()[[r, c]]).abs();
            assert!(
                diff < 1e-10,
                "identity kernel changed pixel [{r},{c}]: diff = {diff}"
            );
        }
    }
}

#[test]
fn single_tap_kernel_is_identity() {
    let kernel = Kernel::new(Array2::from_elem((1, 1), 1.0)).unwrap();
    let image = ramp_image(5, 7);
    let op = ForwardOperator::new(&kernel, image.dim()).unwrap();
    let result = op.apply(&image).unwrap();

    let max_diff = result
        .data()
        .iter()
        .zip(image.data().iter())
        .map(|(&a, &b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    assert!(max_diff < 1e-10, "1x1 unit kernel should be identity, max diff = {max_diff}");
}

// ---------------------------------------------------------------------------
// Shape validation
// ---------------------------------------------------------------------------

#[test]
fn kernel_larger_than_image_is_rejected() {
    let kernel = Kernel::new(Array2::from_elem((5, 5), 1.0 / 25.0)).unwrap();
    let err = ForwardOperator::new(&kernel, (3, 3)).unwrap_err();
    assert!(
        matches!(err, DeblurError::ShapeMismatch { .. }),
        "expected ShapeMismatch, got {err:?}"
    );
}

#[test]
fn kernel_taller_than_image_is_rejected() {
    let kernel = Kernel::new(Array2::from_elem((4, 2), 0.125)).unwrap();
    let err = ForwardOperator::new(&kernel, (3, 8)).unwrap_err();
    assert!(matches!(err, DeblurError::ShapeMismatch { .. }));
}

#[test]
fn apply_rejects_wrong_image_shape() {
    let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0 / 9.0)).unwrap();
    let op = ForwardOperator::new(&kernel, (8, 8)).unwrap();
    let image = ramp_image(4, 4);
    let err = op.apply(&image).unwrap_err();
    assert!(matches!(err, DeblurError::ShapeMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Blur behavior
// ---------------------------------------------------------------------------

#[test]
fn uniform_blur_of_constant_image_is_constant() {
    let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0 / 9.0)).unwrap();
    let image = Image::from_elem(16, 16, 100.0).unwrap();
    let op = ForwardOperator::new(&kernel, image.dim()).unwrap();
    let result = op.apply(&image).unwrap();

    for &v in result.data().iter() {
        assert!(
            (v - 100.0).abs() < 1e-9,
            "uniform blur of a constant image should be constant, got {v}"
        );
    }
}

#[test]
fn blur_preserves_total_mass_for_normalized_kernel() {
    let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0 / 9.0)).unwrap();
    let image = ramp_image(6, 6);
    let op = ForwardOperator::new(&kernel, image.dim()).unwrap();
    let result = op.apply(&image).unwrap();

    let sum_in: f64 = image.data().iter().sum();
    let sum_out: f64 = result.data().iter().sum();
    assert!(
        (sum_in - sum_out).abs() < 1e-8,
        "circular blur with a sum-1 kernel preserves total mass: {sum_in} vs {sum_out}"
    );
}

// ---------------------------------------------------------------------------
// Matrix form agrees with FFT application
// ---------------------------------------------------------------------------

#[test]
fn matrix_form_matches_fft_apply() {
    let mut k = Array2::<f64>::zeros((3, 3));
    k[[0, 1]] = 0.1;
    k[[1, 0]] = 0.2;
    k[[1, 1]] = 0.4;
    k[[1, 2]] = 0.2;
    k[[2, 1]] = 0.1;
    let kernel = Kernel::new(k).unwrap();

    let image = ramp_image(4, 5);
    let op = ForwardOperator::new(&kernel, image.dim()).unwrap();

    let via_fft = op.apply(&image).unwrap();

    let a = op.matrix();
    let x = nalgebra::DVector::from_iterator(20, image.data().iter().cloned());
    let y = a * x;

    for (i, &fft_val) in via_fft.data().iter().enumerate() {
        assert!(
            (fft_val - y[i]).abs() < 1e-9,
            "matrix and FFT application disagree at {i}: {fft_val} vs {}",
            y[i]
        );
    }
}

#[test]
fn matrix_of_identity_kernel_is_identity() {
    let kernel = Kernel::new(Array2::from_elem((1, 1), 1.0)).unwrap();
    let op = ForwardOperator::new(&kernel, (3, 3)).unwrap();
    let a = op.matrix();

    for i in 0..9 {
        for j in 0..9 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!(
                (a[(i, j)] - expected).abs() < 1e-12,
                "identity operator matrix wrong at ({i},{j})"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Operator snapshot semantics
// ---------------------------------------------------------------------------

#[test]
fn operator_captures_kernel_and_shape() {
    let kernel = Kernel::new(Array2::from_elem((3, 3), 1.0 / 9.0)).unwrap();
    let op = ForwardOperator::new(&kernel, (10, 12)).unwrap();
    assert_eq!(op.shape(), (10, 12));
    assert_eq!(op.kernel().dim(), (3, 3));
}
