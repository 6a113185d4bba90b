//! Portable 128-bit SIMD variant of the real tuple GEMM.
//!
//! One real tuple is exactly one `f32x4`, so the 3x4 register tile maps to
//! twelve vector accumulators. Loads are unaligned: tuple entries inside the
//! channel-blocked transform buffer are 16-byte sized but only 4-byte
//! aligned at boundary subblocks.

use super::{SX_MR, SX_NR, SX_TUPLE};
use wide::f32x4;

#[inline(always)]
unsafe fn load4(p: *const f32) -> f32x4 {
    f32x4::from(core::ptr::read_unaligned(p as *const [f32; 4]))
}

#[inline(always)]
unsafe fn store4(p: *mut f32, v: f32x4) {
    core::ptr::write_unaligned(p as *mut [f32; 4], v.to_array());
}

/// Real tuples, full 3x4 register tile.
pub unsafe fn s4gemm_only_3x4(
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    let mut acc = [f32x4::ZERO; SX_MR * SX_NR];
    for kk in 0..k {
        let a0 = load4(a.add((kk * SX_MR) * SX_TUPLE));
        let a1 = load4(a.add((kk * SX_MR + 1) * SX_TUPLE));
        let a2 = load4(a.add((kk * SX_MR + 2) * SX_TUPLE));
        for n in 0..SX_NR {
            let bn = load4(b.add((kk * SX_NR + n) * SX_TUPLE));
            acc[n] = a0.mul_add(bn, acc[n]);
            acc[SX_NR + n] = a1.mul_add(bn, acc[SX_NR + n]);
            acc[2 * SX_NR + n] = a2.mul_add(bn, acc[2 * SX_NR + n]);
        }
    }
    for m in 0..SX_MR {
        for n in 0..SX_NR {
            let dst = c.add(m * row_stride + n * SX_TUPLE);
            let value = if update {
                load4(dst) + acc[m * SX_NR + n]
            } else {
                acc[m * SX_NR + n]
            };
            store4(dst, value);
        }
    }
}

/// Real tuples, boundary shapes up to 3x4.
#[allow(clippy::too_many_arguments)]
pub unsafe fn s4gemm_upto_3x4(
    mr: usize,
    nr: usize,
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    debug_assert!(mr >= 1 && mr <= SX_MR && nr >= 1 && nr <= SX_NR);
    let mut acc = [f32x4::ZERO; SX_MR * SX_NR];
    for kk in 0..k {
        for m in 0..mr {
            let am = load4(a.add((kk * mr + m) * SX_TUPLE));
            for n in 0..nr {
                let bn = load4(b.add((kk * nr + n) * SX_TUPLE));
                acc[m * nr + n] = am.mul_add(bn, acc[m * nr + n]);
            }
        }
    }
    for m in 0..mr {
        for n in 0..nr {
            let dst = c.add(m * row_stride + n * SX_TUPLE);
            let value = if update {
                load4(dst) + acc[m * nr + n]
            } else {
                acc[m * nr + n]
            };
            store4(dst, value);
        }
    }
}
