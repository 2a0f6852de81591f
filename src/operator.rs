use nalgebra::DMatrix;
use ndarray::Array2;
use num_complex::Complex;
use rayon::prelude::*;
use rustfft::FftPlanner;

use crate::error::{DeblurError, Result};
use crate::image::{Image, Kernel};

/// Linear forward model mapping a candidate sharp image to its blurred
/// prediction, parameterized by a kernel snapshot.
///
/// The kernel is padded to the target shape with its center circularly
/// shifted to the origin (FFT-ready wrap-around layout), so `apply` is a
/// "same"-size circular convolution. The operator is an immutable value
/// object: it captures the kernel it was built from and is rebuilt whenever
/// the kernel estimate changes.
#[derive(Clone, Debug)]
pub struct ForwardOperator {
    kernel: Kernel,
    shape: (usize, usize),
    /// Kernel in wrap-around spatial layout, shape = `shape`.
    padded: Array2<f64>,
    /// Precomputed spectrum of `padded`.
    kernel_fft: Array2<Complex<f64>>,
}

impl ForwardOperator {
    /// Build the forward operator for `kernel` acting on images of `shape`.
    ///
    /// Fails with `ShapeMismatch` when the kernel exceeds the target shape
    /// in either dimension.
    pub fn new(kernel: &Kernel, shape: (usize, usize)) -> Result<Self> {
        let (h, w) = shape;
        let (kh, kw) = kernel.dim();
        if kh > h || kw > w {
            return Err(DeblurError::ShapeMismatch {
                context: "forward operator construction",
                lhs_rows: kh,
                lhs_cols: kw,
                rhs_rows: h,
                rhs_cols: w,
            });
        }

        let padded = pad_and_wrap(kernel.data(), h, w);
        let kernel_fft = fft2d(&padded);

        Ok(Self {
            kernel: kernel.clone(),
            shape,
            padded,
            kernel_fft,
        })
    }

    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    /// Apply the operator: circular convolution of `image` with the kernel,
    /// output shape equal to the input shape.
    pub fn apply(&self, image: &Image) -> Result<Image> {
        let (h, w) = self.shape;
        if image.dim() != self.shape {
            let (rows, cols) = image.dim();
            return Err(DeblurError::ShapeMismatch {
                context: "forward operator application",
                lhs_rows: rows,
                lhs_cols: cols,
                rhs_rows: h,
                rhs_cols: w,
            });
        }

        let img_fft = fft2d(image.data());
        let mut product = Array2::<Complex<f64>>::zeros((h, w));
        for row in 0..h {
            for col in 0..w {
                product[[row, col]] = img_fft[[row, col]] * self.kernel_fft[[row, col]];
            }
        }
        let blurred = ifft2d(&product);

        Image::new(blurred)
    }

    /// Explicit matrix form over the flattened (row-major) image domain.
    ///
    /// The circular convolution matrix is doubly circulant:
    /// `A[i, j] = padded[(ri - rj) mod h, (ci - cj) mod w]`.
    pub fn matrix(&self) -> DMatrix<f64> {
        let (h, w) = self.shape;
        let n = h * w;
        let padded = &self.padded;

        let mut buf = vec![0.0f64; n * n];
        buf.par_chunks_mut(n).enumerate().for_each(|(i, row)| {
            let ri = (i / w) as isize;
            let ci = (i % w) as isize;
            for (j, slot) in row.iter_mut().enumerate() {
                let rj = (j / w) as isize;
                let cj = (j % w) as isize;
                let dr = (ri - rj).rem_euclid(h as isize) as usize;
                let dc = (ci - cj).rem_euclid(w as isize) as usize;
                *slot = padded[[dr, dc]];
            }
        });

        DMatrix::from_row_slice(n, n, &buf)
    }
}

/// Pad a kernel to `h`x`w` with its center `(kh/2, kw/2)` wrapped to the
/// origin.
fn pad_and_wrap(kernel: &Array2<f64>, h: usize, w: usize) -> Array2<f64> {
    let (kh, kw) = kernel.dim();
    let center_r = (kh / 2) as isize;
    let center_c = (kw / 2) as isize;

    let mut padded = Array2::<f64>::zeros((h, w));
    for r in 0..kh {
        for c in 0..kw {
            let dst_r = (r as isize - center_r).rem_euclid(h as isize) as usize;
            let dst_c = (c as isize - center_c).rem_euclid(w as isize) as usize;
            padded[[dst_r, dst_c]] += kernel[[r, c]];
        }
    }
    padded
}

// ---------------------------------------------------------------------------
// FFT utilities
// ---------------------------------------------------------------------------

fn fft2d(data: &Array2<f64>) -> Array2<Complex<f64>> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let fft_row = planner.plan_fft_forward(w);
    let fft_col = planner.plan_fft_forward(h);

    let mut result = Array2::<Complex<f64>>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = Complex::new(data[[row, col]], 0.0);
        }
    }

    // Row-wise FFT
    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| result[[row, c]]).collect();
        fft_row.process(&mut row_data);
        for col in 0..w {
            result[[row, col]] = row_data[col];
        }
    }

    // Column-wise FFT
    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| result[[r, col]]).collect();
        fft_col.process(&mut col_data);
        for row in 0..h {
            result[[row, col]] = col_data[row];
        }
    }

    result
}

fn ifft2d(data: &Array2<Complex<f64>>) -> Array2<f64> {
    let (h, w) = data.dim();
    let mut planner = FftPlanner::new();
    let ifft_row = planner.plan_fft_inverse(w);
    let ifft_col = planner.plan_fft_inverse(h);

    let mut work = data.clone();

    // Column-wise IFFT
    for col in 0..w {
        let mut col_data: Vec<Complex<f64>> = (0..h).map(|r| work[[r, col]]).collect();
        ifft_col.process(&mut col_data);
        for row in 0..h {
            work[[row, col]] = col_data[row];
        }
    }

    // Row-wise IFFT
    for row in 0..h {
        let mut row_data: Vec<Complex<f64>> = (0..w).map(|c| work[[row, c]]).collect();
        ifft_row.process(&mut row_data);
        for col in 0..w {
            work[[row, col]] = row_data[col];
        }
    }

    let scale = 1.0 / (h * w) as f64;
    let mut result = Array2::<f64>::zeros((h, w));
    for row in 0..h {
        for col in 0..w {
            result[[row, col]] = work[[row, col]].re * scale;
        }
    }

    result
}
