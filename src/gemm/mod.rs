//! Tuple-block GEMM microkernels.
//!
//! A microkernel multiplies `mr x k` transformed-input tuples against
//! `k x nr` transformed-kernel tuples into an `mr x nr` accumulator grid of
//! tuples, entirely in the transform domain. Operand layouts are the
//! channel-blocked transform-buffer layouts: `a` holds `k * mr` tuples as
//! `[kk][m]`, `b` holds `k * nr` tuples as `[kk][n]`, and `c` rows are
//! `row_stride` floats apart with tuple `n` at `n * tuple_elements`.
//!
//! `update == false` overwrites the accumulator (first input-channel block),
//! `update == true` accumulates. The `only` (fast) variants assume the full
//! register tile and carry no boundary handling; the `upto` (full) variants
//! take the actual `mr`/`nr` for trailing subblocks.
//!
//! Real (Winograd) tuples multiply per lane; complex (Fourier) tuples are
//! interleaved (re, im) pairs multiplied with the kernel operand conjugated.
//! The `s4c2` variant handles the mixed head tuple of the packed real
//! spectrum: four real lanes, then two complex pairs.

pub mod scalar;
pub mod simd128;

/// Register-tile shape of the real tuple GEMM (batch x output channels).
pub const SX_MR: usize = 3;
pub const SX_NR: usize = 4;
/// Real tuple width in f32 lanes.
pub const SX_TUPLE: usize = 4;

/// Register-tile shape of the complex tuple GEMM.
pub const CX_MR: usize = 2;
pub const CX_NR: usize = 2;
/// Complex tuple width in f32 lanes (4 interleaved complex values).
pub const CX_TUPLE: usize = 8;

/// Fast-path microkernel over the full register tile.
///
/// # Safety
/// `a`, `b`, and `c` must cover the operand extents described in the module
/// docs for the kernel's fixed `mr`/`nr`/tuple shape.
pub type FastGemmFn =
    unsafe fn(k: usize, update: bool, a: *const f32, b: *const f32, c: *mut f32, row_stride: usize);

/// Remainder microkernel with explicit boundary extents (`mr`/`nr` at most
/// the register tile).
///
/// # Safety
/// As [`FastGemmFn`], with extents bounded by the given `mr`/`nr`.
pub type FullGemmFn = unsafe fn(
    mr: usize,
    nr: usize,
    k: usize,
    update: bool,
    a: *const f32,
    b: *const f32,
    c: *mut f32,
    row_stride: usize,
);

/// One resolved tuple-GEMM capability: register-tile shape plus the
/// fast/full pair.
#[derive(Debug, Clone, Copy)]
pub struct TupleGemm {
    pub mr: usize,
    pub nr: usize,
    pub fast: FastGemmFn,
    pub full: FullGemmFn,
}

/// Complex-domain capabilities: the mixed head-tuple pair and the full
/// complex pair share one register-tile shape.
#[derive(Debug, Clone, Copy)]
pub struct ComplexGemm {
    pub mr: usize,
    pub nr: usize,
    pub s4c2_fast: FastGemmFn,
    pub s4c2_full: FullGemmFn,
    pub c4_fast: FastGemmFn,
    pub c4_full: FullGemmFn,
}
