//! Scalar tuple-GEMM microkernels (always-available fallback).

use super::{CX_MR, CX_NR, CX_TUPLE, SX_MR, SX_NR, SX_TUPLE};

#[inline(always)]
unsafe fn sx_block(
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
    let mut acc = [[0.0f32; SX_TUPLE]; SX_MR * SX_NR];
    for kk in 0..k {
        for m in 0..mr {
            let at = a.add((kk * mr + m) * SX_TUPLE);
            for n in 0..nr {
                let bt = b.add((kk * nr + n) * SX_TUPLE);
                let acc = &mut acc[m * nr + n];
                for l in 0..SX_TUPLE {
                    acc[l] += *at.add(l) * *bt.add(l);
                }
            }
        }
    }
    for m in 0..mr {
        for n in 0..nr {
            let dst = c.add(m * row_stride + n * SX_TUPLE);
            let acc = &acc[m * nr + n];
            for l in 0..SX_TUPLE {
                if update {
                    *dst.add(l) += acc[l];
                } else {
                    *dst.add(l) = acc[l];
                }
            }
        }
    }
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
    sx_block(SX_MR, SX_NR, k, update, a, b, c, row_stride);
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
    sx_block(mr, nr, k, update, a, b, c, row_stride);
}

#[inline(always)]
unsafe fn cx_block<const MIXED: bool>(
    mr: usize,
    nr: usize,
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    debug_assert!(mr >= 1 && mr <= CX_MR && nr >= 1 && nr <= CX_NR);
    let mut acc = [[0.0f32; CX_TUPLE]; CX_MR * CX_NR];
    // In the mixed head tuple of the packed real spectrum the first four
    // lanes are purely real coefficients; the rest are (re, im) pairs.
    let pair_start = if MIXED { 4 } else { 0 };
    for kk in 0..k {
        for m in 0..mr {
            let at = a.add((kk * mr + m) * CX_TUPLE);
            for n in 0..nr {
                let bt = b.add((kk * nr + n) * CX_TUPLE);
                let acc = &mut acc[m * nr + n];
                for l in 0..pair_start {
                    acc[l] += *at.add(l) * *bt.add(l);
                }
                let mut p = pair_start;
                while p < CX_TUPLE {
                    let (ar, ai) = (*at.add(p), *at.add(p + 1));
                    let (br, bi) = (*bt.add(p), *bt.add(p + 1));
                    // a * conj(b): correlation in the spatial domain.
                    acc[p] += ar * br + ai * bi;
                    acc[p + 1] += ai * br - ar * bi;
                    p += 2;
                }
            }
        }
    }
    for m in 0..mr {
        for n in 0..nr {
            let dst = c.add(m * row_stride + n * CX_TUPLE);
            let acc = &acc[m * nr + n];
            for l in 0..CX_TUPLE {
                if update {
                    *dst.add(l) += acc[l];
                } else {
                    *dst.add(l) = acc[l];
                }
            }
        }
    }
}

/// Complex tuples, full 2x2 register tile, kernel operand conjugated.
pub unsafe fn c4gemm_conjb_only_2x2(
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    cx_block::<false>(CX_MR, CX_NR, k, update, a, b, c, row_stride);
}

/// Complex tuples, boundary shapes up to 2x2.
#[allow(clippy::too_many_arguments)]
pub unsafe fn c4gemm_conjb_upto_2x2(
    mr: usize,
    nr: usize,
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    cx_block::<false>(mr, nr, k, update, a, b, c, row_stride);
}

/// Mixed head tuple (4 real lanes + 2 complex pairs), full register tile.
pub unsafe fn s4c2gemm_conjb_only_2x2(
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    cx_block::<true>(CX_MR, CX_NR, k, update, a, b, c, row_stride);
}

/// Mixed head tuple, boundary shapes up to 2x2.
#[allow(clippy::too_many_arguments)]
pub unsafe fn s4c2gemm_conjb_upto_2x2(
    mr: usize,
    nr: usize,
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
) {
    cx_block::<true>(mr, nr, k, update, a, b, c, row_stride);
}
