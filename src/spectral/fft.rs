//! Two-dimensional DFT and centering shifts.
//!
//! The forward transform is unnormalized and the inverse divides by the
//! number of cells, so `ifft2(fft2(x)) == x` up to rounding.

use rustfft::num_complex::Complex64;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;

use super::plane::Plane;

/// Forward 2-D DFT (rows, then columns)
pub fn fft2(input: &Plane<Complex64>) -> Plane<Complex64> {
    transform(input, FftDirection::Forward)
}

/// Inverse 2-D DFT, normalized by `1 / (height * width)`
pub fn ifft2(input: &Plane<Complex64>) -> Plane<Complex64> {
    let mut out = transform(input, FftDirection::Inverse);
    let cells = out.len();
    if cells > 0 {
        let scale = 1.0 / cells as f64;
        for value in out.as_mut_slice() {
            *value *= scale;
        }
    }
    out
}

/// Move the zero-frequency term to the centre of the plane
pub fn fftshift<T: Clone>(input: &Plane<T>) -> Plane<T> {
    let (h, w) = input.shape();
    roll(input, h / 2, w / 2)
}

/// Undo [`fftshift`], including for odd dimensions
pub fn ifftshift<T: Clone>(input: &Plane<T>) -> Plane<T> {
    let (h, w) = input.shape();
    roll(input, h - h / 2, w - w / 2)
}

/// Circularly shift so that `out[(y + dy) % h][(x + dx) % w] = in[y][x]`
fn roll<T: Clone>(input: &Plane<T>, dy: usize, dx: usize) -> Plane<T> {
    let (h, w) = input.shape();
    if h == 0 || w == 0 {
        return input.clone();
    }
    let src = input.as_slice();
    Plane::from_fn(h, w, |y, x| {
        let sy = (y + h - dy % h) % h;
        let sx = (x + w - dx % w) % w;
        src[sy * w + sx].clone()
    })
}

fn transform(input: &Plane<Complex64>, direction: FftDirection) -> Plane<Complex64> {
    let (h, w) = input.shape();
    let mut out = input.clone();
    if h == 0 || w == 0 {
        return out;
    }

    let mut planner = FftPlanner::<f64>::new();
    let row_fft: Arc<dyn Fft<f64>> = planner.plan_fft(w, direction);
    let col_fft: Arc<dyn Fft<f64>> = planner.plan_fft(h, direction);

    // Rows are contiguous, so the whole buffer goes through in one call
    row_fft.process(out.as_mut_slice());

    let data = out.as_mut_slice();
    let mut column = vec![Complex64::new(0.0, 0.0); h];
    for x in 0..w {
        for y in 0..h {
            column[y] = data[y * w + x];
        }
        col_fft.process(&mut column);
        for y in 0..h {
            data[y * w + x] = column[y];
        }
    }

    out
}
