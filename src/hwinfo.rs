//! Hardware capabilities and process-wide context.
//!
//! Cache sizes come from CPUID leaf 4 on x86_64, sysfs on Linux, or a
//! conservative static fallback. The transform functions and tuple-GEMM
//! microkernels for the detected ISA are resolved once by [`initialize`]
//! into an immutable [`HardwareConfig`]; convolution calls take the config
//! by reference and never re-query. [`deinitialize`] drops the context and
//! joins the worker pool.

use std::sync::{Arc, RwLock};

use crate::error::Error;
use crate::gemm::{self, ComplexGemm, TupleGemm};
use crate::threadpool::WorkerPool;
use crate::transforms::{fourier, winograd, ForwardTransformFn, InverseTransformFn};

/// Data cache capacities in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub l1: usize,
    pub l2: usize,
    pub l3: usize,
}

/// ISA tier for microkernel selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsaLevel {
    Scalar,
    /// 128-bit SIMD (SSE2 / NEON class) via portable vectors.
    Simd128,
}

/// Transform-function capability table.
#[derive(Debug, Clone, Copy)]
pub struct TransformTable {
    pub iwt_f6x6_3x3: ForwardTransformFn,
    pub kwt_f6x6_3x3: ForwardTransformFn,
    pub owt_f6x6_3x3_with_bias: InverseTransformFn,
    pub owt_f6x6_3x3_with_bias_relu: InverseTransformFn,
    pub fft8x8_with_offset: ForwardTransformFn,
    pub ifft8x8_with_bias: InverseTransformFn,
    pub ifft8x8_with_bias_relu: InverseTransformFn,
    pub fft16x16_with_offset: ForwardTransformFn,
    pub ifft16x16_with_bias: InverseTransformFn,
    pub ifft16x16_with_bias_relu: InverseTransformFn,
}

/// Immutable hardware configuration resolved at initialization.
#[derive(Debug, Clone, Copy)]
pub struct HardwareConfig {
    pub cache: CacheInfo,
    pub isa: IsaLevel,
    /// SIMD tuple width in f32 lanes (doubled for complex Fourier tuples).
    pub simd_width: usize,
    pub sxgemm: TupleGemm,
    pub cxgemm: ComplexGemm,
    pub transforms: TransformTable,
}

pub(crate) struct Context {
    pub config: HardwareConfig,
    pub pool: WorkerPool,
}

static CONTEXT: RwLock<Option<Arc<Context>>> = RwLock::new(None);

// ── Cache size detection ─────────────────────────────────────────────

fn detect_cache_sizes() -> CacheInfo {
    #[cfg(target_arch = "x86_64")]
    {
        if let Some(info) = detect_x86_cache() {
            return info;
        }
    }
    #[cfg(target_os = "linux")]
    {
        if let Some(info) = detect_sysfs_cache() {
            return info;
        }
    }
    // Conservative fallback: 32 KB L1D, 512 KB L2, 8 MB L3.
    CacheInfo {
        l1: 32 * 1024,
        l2: 512 * 1024,
        l3: 8 * 1024 * 1024,
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_x86_cache() -> Option<CacheInfo> {
    // CPUID leaf 4: deterministic cache parameters (Intel & AMD Zen+).
    let mut l1d: Option<usize> = None;
    let mut l2: Option<usize> = None;
    let mut l3: Option<usize> = None;

    for sub in 0..16u32 {
        let info = unsafe { std::arch::x86_64::__cpuid_count(4, sub) };
        let cache_type = info.eax & 0x1F;
        if cache_type == 0 {
            break;
        }
        let level = (info.eax >> 5) & 0x7;
        let line_size = (info.ebx & 0xFFF) + 1;
        let partitions = ((info.ebx >> 12) & 0x3FF) + 1;
        let ways = ((info.ebx >> 22) & 0x3FF) + 1;
        let sets = info.ecx + 1;
        let size = line_size as usize * partitions as usize * ways as usize * sets as usize;

        match (level, cache_type) {
            (1, 1) => l1d = Some(size),
            (2, 2) | (2, 3) => l2 = Some(size),
            (3, 2) | (3, 3) => l3 = Some(size),
            _ => {}
        }
    }

    match (l1d, l2) {
        (Some(l1), Some(l2)) => Some(CacheInfo {
            l1,
            l2,
            l3: l3.unwrap_or(8 * 1024 * 1024),
        }),
        _ => None,
    }
}

#[cfg(target_os = "linux")]
fn detect_sysfs_cache() -> Option<CacheInfo> {
    let mut l1d: Option<usize> = None;
    let mut l2: Option<usize> = None;
    let mut l3: Option<usize> = None;

    for idx in 0..8 {
        let base = format!("/sys/devices/system/cpu/cpu0/cache/index{idx}");
        let (Ok(level), Ok(ctype), Ok(size_str)) = (
            std::fs::read_to_string(format!("{base}/level")),
            std::fs::read_to_string(format!("{base}/type")),
            std::fs::read_to_string(format!("{base}/size")),
        ) else {
            continue;
        };
        let size_str = size_str.trim();
        let size = if let Some(kb) = size_str.strip_suffix('K') {
            kb.parse::<usize>().ok()? * 1024
        } else if let Some(mb) = size_str.strip_suffix('M') {
            mb.parse::<usize>().ok()? * 1024 * 1024
        } else {
            size_str.parse::<usize>().ok()?
        };
        let level: u32 = level.trim().parse().ok()?;
        match (level, ctype.trim()) {
            (1, "Data") => l1d = Some(size),
            (2, "Unified") => l2 = Some(size),
            (3, "Unified") => l3 = Some(size),
            _ => {}
        }
    }

    match (l1d, l2) {
        (Some(l1), Some(l2)) => Some(CacheInfo {
            l1,
            l2,
            l3: l3.unwrap_or(8 * 1024 * 1024),
        }),
        _ => None,
    }
}

// ── ISA detection and capability resolution ──────────────────────────

fn detect_isa_level() -> IsaLevel {
    #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
    {
        // SSE2 is baseline on x86_64, NEON on aarch64; the portable f32x4
        // path maps to native vectors on both.
        return IsaLevel::Simd128;
    }
    #[allow(unreachable_code)]
    IsaLevel::Scalar
}

fn resolve_capabilities(isa: IsaLevel) -> (TupleGemm, ComplexGemm) {
    let sxgemm = match isa {
        IsaLevel::Simd128 => TupleGemm {
            mr: gemm::SX_MR,
            nr: gemm::SX_NR,
            fast: gemm::simd128::s4gemm_only_3x4,
            full: gemm::simd128::s4gemm_upto_3x4,
        },
        IsaLevel::Scalar => TupleGemm {
            mr: gemm::SX_MR,
            nr: gemm::SX_NR,
            fast: gemm::scalar::s4gemm_only_3x4,
            full: gemm::scalar::s4gemm_upto_3x4,
        },
    };
    let cxgemm = ComplexGemm {
        mr: gemm::CX_MR,
        nr: gemm::CX_NR,
        s4c2_fast: gemm::scalar::s4c2gemm_conjb_only_2x2,
        s4c2_full: gemm::scalar::s4c2gemm_conjb_upto_2x2,
        c4_fast: gemm::scalar::c4gemm_conjb_only_2x2,
        c4_full: gemm::scalar::c4gemm_conjb_upto_2x2,
    };
    (sxgemm, cxgemm)
}

fn build_config() -> HardwareConfig {
    let cache = detect_cache_sizes();
    let isa = detect_isa_level();
    let (sxgemm, cxgemm) = resolve_capabilities(isa);
    HardwareConfig {
        cache,
        isa,
        simd_width: 4,
        sxgemm,
        cxgemm,
        transforms: TransformTable {
            iwt_f6x6_3x3: winograd::iwt_f6x6_3x3,
            kwt_f6x6_3x3: winograd::kwt_f6x6_3x3,
            owt_f6x6_3x3_with_bias: winograd::owt_f6x6_3x3::<false>,
            owt_f6x6_3x3_with_bias_relu: winograd::owt_f6x6_3x3::<true>,
            fft8x8_with_offset: fourier::fft8x8_with_offset,
            ifft8x8_with_bias: fourier::ifft8x8_with_bias::<false>,
            ifft8x8_with_bias_relu: fourier::ifft8x8_with_bias::<true>,
            fft16x16_with_offset: fourier::fft16x16_with_offset,
            ifft16x16_with_bias: fourier::ifft16x16_with_bias::<false>,
            ifft16x16_with_bias_relu: fourier::ifft16x16_with_bias::<true>,
        },
    }
}

/// One-time setup: detect hardware, resolve capability tables, start the
/// worker pool. Idempotent; a second call keeps the existing context.
pub fn initialize() -> Result<(), Error> {
    let mut slot = CONTEXT.write().unwrap_or_else(|e| e.into_inner());
    if slot.is_some() {
        return Ok(());
    }
    let config = build_config();
    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    log::debug!(
        "initialize: isa={:?} L1={} L2={} L3={} workers={}",
        config.isa,
        config.cache.l1,
        config.cache.l2,
        config.cache.l3,
        workers
    );
    *slot = Some(Arc::new(Context {
        config,
        pool: WorkerPool::new(workers),
    }));
    Ok(())
}

/// Tear down the process-wide context. In-flight calls keep their reference;
/// the pool joins when the last one finishes.
pub fn deinitialize() -> Result<(), Error> {
    let mut slot = CONTEXT.write().unwrap_or_else(|e| e.into_inner());
    *slot = None;
    Ok(())
}

pub(crate) fn context() -> Result<Arc<Context>, Error> {
    CONTEXT
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .as_ref()
        .cloned()
        .ok_or(Error::Uninitialized)
}
