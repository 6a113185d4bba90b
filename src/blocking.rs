//! Cache-aware blocking parameters for the transform pipeline.
//!
//! Derives the three block maxima from the cache hierarchy and the active
//! microkernel register-tile shape so that:
//!   - one input-channel block of both GEMM operands fits L1 alongside the
//!     `mr x nr` accumulators,
//!   - kernel-transform tiles reused across the batch stay within L2,
//!   - batch blocks amortize L3 reuse of the kernel transform.
//!
//! Rounding down to the subblock size guarantees every non-trailing block
//! takes the fast (no-remainder) microkernel path.

use crate::hwinfo::CacheInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingPlan {
    pub input_channels_block_max: usize,
    pub batch_block_max: usize,
    pub output_channels_block_max: usize,
}

#[inline]
pub(crate) fn round_down(value: usize, multiple: usize) -> usize {
    value / multiple * multiple
}

/// Compute the blocking plan for one call.
///
/// `tuple_elements` is the SIMD tuple width in f32 lanes (doubled for
/// complex Fourier data); `(mr, nr)` is the register-tile shape of the
/// active tuple-GEMM family.
pub fn compute_blocking(
    cache: &CacheInfo,
    tuple_elements: usize,
    mr: usize,
    nr: usize,
) -> BlockingPlan {
    let tuple_bytes = tuple_elements * std::mem::size_of::<f32>();
    let l1_elements = cache.l1 / tuple_bytes;
    let l2_elements = cache.l2 / tuple_bytes;
    let l3_elements = cache.l3 / tuple_bytes;

    let input_channels_block_max = round_down(l1_elements / (mr + nr), 2).max(2);
    let batch_block_max = round_down(l3_elements / input_channels_block_max, mr).max(mr);
    let output_channels_block_max = round_down(l2_elements / input_channels_block_max, nr).max(nr);

    BlockingPlan {
        input_channels_block_max,
        batch_block_max,
        output_channels_block_max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: CacheInfo = CacheInfo {
        l1: 32 * 1024,
        l2: 512 * 1024,
        l3: 8 * 1024 * 1024,
    };

    #[test]
    fn test_subblock_multiples() {
        for (tuple, mr, nr) in [(4usize, 3usize, 4usize), (8, 2, 2)] {
            let plan = compute_blocking(&CACHE, tuple, mr, nr);
            assert_eq!(plan.input_channels_block_max % 2, 0);
            assert_eq!(plan.batch_block_max % mr, 0);
            assert_eq!(plan.output_channels_block_max % nr, 0);
            assert!(plan.input_channels_block_max >= 2);
            assert!(plan.batch_block_max >= mr);
            assert!(plan.output_channels_block_max >= nr);
        }
    }

    #[test]
    fn test_l1_bound() {
        // One input-channel block of A and B tuples must fit L1.
        let (tuple, mr, nr) = (4usize, 3usize, 4usize);
        let plan = compute_blocking(&CACHE, tuple, mr, nr);
        let working_set = plan.input_channels_block_max * (mr + nr) * tuple * 4;
        assert!(working_set <= CACHE.l1, "L1 working set {working_set}");
    }

    #[test]
    fn test_tiny_cache_clamps() {
        let tiny = CacheInfo {
            l1: 64,
            l2: 64,
            l3: 64,
        };
        let plan = compute_blocking(&tiny, 8, 2, 2);
        assert_eq!(plan.input_channels_block_max, 2);
        assert_eq!(plan.batch_block_max, 2);
        assert_eq!(plan.output_channels_block_max, 2);
    }

    #[test]
    fn test_fourier_tuples_halve_element_budget() {
        let real = compute_blocking(&CACHE, 4, 3, 4);
        let complex = compute_blocking(&CACHE, 8, 3, 4);
        assert!(complex.input_channels_block_max <= real.input_channels_block_max);
    }
}
