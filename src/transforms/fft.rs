//! Radix-2 complex FFT core for the Fourier tile transforms.
//!
//! Iterative Cooley-Tukey over power-of-two lengths (8 and 16 here).
//! Transforms are unnormalized in both directions; the inverse tile
//! transform applies the single 1/N^2 scale.

use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Complex {
    pub re: f32,
    pub im: f32,
}

impl Complex {
    pub const ZERO: Self = Self { re: 0.0, im: 0.0 };

    #[inline]
    pub fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    #[inline]
    pub fn add(self, other: Self) -> Self {
        Self::new(self.re + other.re, self.im + other.im)
    }

    #[inline]
    pub fn sub(self, other: Self) -> Self {
        Self::new(self.re - other.re, self.im - other.im)
    }

    #[inline]
    pub fn mul(self, other: Self) -> Self {
        Self::new(
            self.re * other.re - self.im * other.im,
            self.re * other.im + self.im * other.re,
        )
    }

    #[inline]
    pub fn conj(self) -> Self {
        Self::new(self.re, -self.im)
    }
}

/// Bit-reversal permutation for the in-place FFT.
fn bit_reverse(data: &mut [Complex]) {
    let n = data.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            data.swap(i, j);
        }
    }
}

/// In-place radix-2 FFT; `inverse` flips the twiddle sign, no scaling.
pub(crate) fn fft_1d(data: &mut [Complex], inverse: bool) {
    let n = data.len();
    debug_assert!(n.is_power_of_two());
    bit_reverse(data);

    let mut len = 2;
    while len <= n {
        let half = len / 2;
        let angle = if inverse { 2.0 } else { -2.0 } * PI / len as f32;
        let wn = Complex::new(angle.cos(), angle.sin());
        let mut i = 0;
        while i < n {
            let mut w = Complex::new(1.0, 0.0);
            for j in 0..half {
                let u = data[i + j];
                let v = w.mul(data[i + j + half]);
                data[i + j] = u.add(v);
                data[i + j + half] = u.sub(v);
                w = w.mul(wn);
            }
            i += len;
        }
        len <<= 1;
    }
}

/// In-place 2D FFT of an `n x n` row-major grid, rows then columns.
pub(crate) fn fft_2d(data: &mut [Complex], n: usize, inverse: bool) {
    debug_assert_eq!(data.len(), n * n);
    debug_assert!(n <= 16);
    for row in data.chunks_exact_mut(n) {
        fft_1d(row, inverse);
    }
    let mut column = [Complex::ZERO; 16];
    for c in 0..n {
        for r in 0..n {
            column[r] = data[r * n + c];
        }
        fft_1d(&mut column[..n], inverse);
        for r in 0..n {
            data[r * n + c] = column[r];
        }
    }
}
