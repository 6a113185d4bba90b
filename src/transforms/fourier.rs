//! Fourier tile transforms (8x8 and 16x16) with a packed real spectrum.
//!
//! A real NxN tile has exactly N^2 independent spectrum values: four purely
//! real coefficients (DC, row Nyquist, column Nyquist, both) and
//! (N+2)(N/2 - 1) unique complex coefficients whose conjugates fill the rest
//! of the grid. The packed layout stores the four reals first, then the
//! unique complex half-spectrum as interleaved (re, im) pairs in the fixed
//! enumeration of [`for_each_complex_slot`].
//!
//! With 8-float tuples this puts the reals plus two complex pairs in tuple 0
//! (multiplied by the mixed `s4c2` microkernel) and four complex pairs in
//! every later tuple (`c4` microkernel); `COMPLEX_TUPLE_INDEX` is that
//! boundary. Pointwise products conjugate the kernel operand, so the
//! inverse transform returns the circular cross-correlation whose first
//! `tile - kernel + 1` rows and columns are the valid convolution outputs.

use super::fft::{fft_2d, Complex};
use super::{SourceView, TileSink};

/// First tuple index whose coefficients are all complex, for both Fourier
/// tile sizes under this packing.
pub const COMPLEX_TUPLE_INDEX: usize = 1;

/// Enumerate the unique complex half-spectrum of a real NxN transform in
/// packed order. The four purely real slots (0,0), (0,N/2), (N/2,0),
/// (N/2,N/2) are not visited.
fn for_each_complex_slot(n: usize, mut visit: impl FnMut(usize, usize)) {
    let h = n / 2;
    for ky in 1..h {
        visit(ky, 0);
    }
    for ky in 1..h {
        visit(ky, h);
    }
    for kx in 1..h {
        visit(0, kx);
    }
    for kx in 1..h {
        visit(h, kx);
    }
    for kx in 1..h {
        for ky in 1..n {
            if ky != h {
                visit(ky, kx);
            }
        }
    }
}

/// Forward transform of a padded source window into the packed spectrum.
fn fft_forward_tile(src: &SourceView<'_>, out: &mut [f32], n: usize) {
    debug_assert_eq!(out.len(), n * n);
    let mut grid = [Complex::ZERO; 256];
    let grid = &mut grid[..n * n];
    for r in 0..n {
        for c in 0..n {
            grid[r * n + c] = Complex::new(src.get(r, c), 0.0);
        }
    }
    fft_2d(grid, n, false);

    let h = n / 2;
    out[0] = grid[0].re;
    out[1] = grid[h].re;
    out[2] = grid[h * n].re;
    out[3] = grid[h * n + h].re;
    let mut idx = 4;
    for_each_complex_slot(n, |ky, kx| {
        let v = grid[ky * n + kx];
        out[idx] = v.re;
        out[idx + 1] = v.im;
        idx += 2;
    });
    debug_assert_eq!(idx, n * n);
}

/// Inverse transform of the packed spectrum into a clipped spatial tile,
/// fusing bias and activation.
fn fft_inverse_tile<const RELU: bool>(
    transformed: &[f32],
    bias: f32,
    sink: &mut TileSink,
    n: usize,
) {
    debug_assert_eq!(transformed.len(), n * n);
    let mut grid = [Complex::ZERO; 256];
    let grid = &mut grid[..n * n];

    let h = n / 2;
    grid[0] = Complex::new(transformed[0], 0.0);
    grid[h] = Complex::new(transformed[1], 0.0);
    grid[h * n] = Complex::new(transformed[2], 0.0);
    grid[h * n + h] = Complex::new(transformed[3], 0.0);
    let mut idx = 4;
    for_each_complex_slot(n, |ky, kx| {
        let v = Complex::new(transformed[idx], transformed[idx + 1]);
        grid[ky * n + kx] = v;
        grid[((n - ky) % n) * n + (n - kx) % n] = v.conj();
        idx += 2;
    });
    debug_assert_eq!(idx, n * n);

    fft_2d(grid, n, true);
    let scale = 1.0 / (n * n) as f32;
    for r in 0..sink.rows() {
        for c in 0..sink.cols() {
            let mut value = grid[r * n + c].re * scale + bias;
            if RELU {
                value = value.max(0.0);
            }
            sink.set(r, c, value);
        }
    }
}

/// 8x8 forward transform (shared by the input and kernel stages).
pub fn fft8x8_with_offset(src: &SourceView<'_>, out: &mut [f32]) {
    fft_forward_tile(src, out, 8);
}

/// 16x16 forward transform (shared by the input and kernel stages).
pub fn fft16x16_with_offset(src: &SourceView<'_>, out: &mut [f32]) {
    fft_forward_tile(src, out, 16);
}

pub fn ifft8x8_with_bias<const RELU: bool>(transformed: &[f32], bias: f32, sink: &mut TileSink) {
    fft_inverse_tile::<RELU>(transformed, bias, sink, 8);
}

pub fn ifft16x16_with_bias<const RELU: bool>(transformed: &[f32], bias: f32, sink: &mut TileSink) {
    fft_inverse_tile::<RELU>(transformed, bias, sink, 16);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg(state: &mut u32) -> f32 {
        *state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (*state >> 8) as f32 / (1 << 24) as f32 - 0.5
    }

    #[test]
    fn test_packed_slot_counts() {
        for n in [8usize, 16] {
            let mut count = 0usize;
            for_each_complex_slot(n, |_, _| count += 1);
            assert_eq!(4 + 2 * count, n * n, "packing must fill exactly N^2 floats");
        }
    }

    #[test]
    fn test_forward_inverse_roundtrip() {
        let mut state = 7u32;
        for n in [8usize, 16] {
            let src: Vec<f32> = (0..n * n).map(|_| lcg(&mut state)).collect();
            let mut packed = vec![0.0f32; n * n];
            fft_forward_tile(
                &SourceView::new(&src, 0, n, n, n, 0, 0),
                &mut packed,
                n,
            );
            let mut out = vec![0.0f32; n * n];
            let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), n, n, n) };
            fft_inverse_tile::<false>(&packed, 0.0, &mut sink, n);
            for (got, want) in out.iter().zip(&src) {
                assert!((got - want).abs() < 1e-4, "{got} vs {want}");
            }
        }
    }

    /// Pointwise product with the conjugated kernel spectrum must yield the
    /// valid-region cross-correlation, the contract the tuple microkernels
    /// rely on.
    #[test]
    fn test_single_tile_correlation() {
        let mut state = 99u32;
        for (n, kw) in [(8usize, 3usize), (8, 5), (16, 10)] {
            let src: Vec<f32> = (0..n * n).map(|_| lcg(&mut state)).collect();
            let kernel: Vec<f32> = (0..kw * kw).map(|_| lcg(&mut state)).collect();

            let mut it = vec![0.0f32; n * n];
            fft_forward_tile(&SourceView::new(&src, 0, n, n, n, 0, 0), &mut it, n);
            let mut kt = vec![0.0f32; n * n];
            fft_forward_tile(
                &SourceView::new(&kernel, 0, kw, kw, kw, 0, 0),
                &mut kt,
                n,
            );

            // Lane-true packed product: 4 reals, then (re, im) pairs with
            // the kernel conjugated.
            let mut product = vec![0.0f32; n * n];
            for i in 0..4 {
                product[i] = it[i] * kt[i];
            }
            let mut i = 4;
            while i < n * n {
                let (ar, ai) = (it[i], it[i + 1]);
                let (br, bi) = (kt[i], kt[i + 1]);
                product[i] = ar * br + ai * bi;
                product[i + 1] = ai * br - ar * bi;
                i += 2;
            }

            let valid = n - kw + 1;
            let mut out = vec![0.0f32; valid * valid];
            let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), valid, valid, valid) };
            fft_inverse_tile::<false>(&product, 0.0, &mut sink, n);

            for y in 0..valid {
                for x in 0..valid {
                    let mut expected = 0.0f32;
                    for i in 0..kw {
                        for j in 0..kw {
                            expected += src[(y + i) * n + (x + j)] * kernel[i * kw + j];
                        }
                    }
                    let got = out[y * valid + x];
                    assert!(
                        (got - expected).abs() <= 1e-3 * expected.abs().max(1.0),
                        "n={n} k={kw} ({y},{x}): got {got}, expected {expected}"
                    );
                }
            }
        }
    }
}
