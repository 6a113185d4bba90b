//! Runtime convolution-algorithm selection.
//!
//! `Auto` weighs 8x8 against 16x16 tiling by the number of super-tiles each
//! needs to cover the output extent, per dimension: small tiles waste less
//! boundary work but pay more per-pixel transform cost, so 8x8 wins only
//! while its tile count stays within 4x of the 16x16 count in both
//! dimensions. Kernels above 8 in either dimension force the 16x16 Fourier
//! transform (Winograd is fixed at 3x3 and the 8x8 Fourier tile cannot host
//! them).

use crate::error::Error;
use crate::transforms::fourier::COMPLEX_TUPLE_INDEX;
use crate::types::{Algorithm, Size};

/// Resolved strategy for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SelectedAlgorithm {
    pub algorithm: Algorithm,
    pub tile: Size,
    pub fourier: bool,
    /// First all-complex tuple of the packed spectrum (Fourier only).
    pub complex_tuple_index: usize,
}

/// Super-tiles needed to cover each output dimension for a given tile size.
fn tile_counts(output: Size, tile: usize, kernel: Size) -> (usize, usize) {
    let output_tile_w = tile - kernel.width + 1;
    let output_tile_h = tile - kernel.height + 1;
    (
        output.height.div_ceil(output_tile_h),
        output.width.div_ceil(output_tile_w),
    )
}

/// Choose the algorithm for the given shapes, or reject unsupported
/// requests. `kernel` and `output` must already be validated.
pub(crate) fn select(
    requested: Algorithm,
    kernel: Size,
    output: Size,
) -> Result<SelectedAlgorithm, Error> {
    let algorithm = if requested == Algorithm::Auto {
        if kernel.max_extent() > 8 {
            Algorithm::Ft16x16
        } else {
            let (count_8_h, count_8_w) = tile_counts(output, 8, kernel);
            let (count_16_h, count_16_w) = tile_counts(output, 16, kernel);
            if count_8_h <= 4 * count_16_h && count_8_w <= 4 * count_16_w {
                // 8x8 tiles are more efficient.
                if kernel.width == 3 && kernel.height == 3 {
                    Algorithm::Wt8x8
                } else {
                    Algorithm::Ft8x8
                }
            } else {
                Algorithm::Ft16x16
            }
        }
    } else {
        requested
    };

    let selected = match algorithm {
        Algorithm::Wt8x8 => {
            if kernel.width != 3 || kernel.height != 3 {
                return Err(Error::UnsupportedAlgorithm);
            }
            SelectedAlgorithm {
                algorithm,
                tile: Size::new(8, 8),
                fourier: false,
                complex_tuple_index: 0,
            }
        }
        Algorithm::Ft8x8 => {
            if kernel.max_extent() > 8 {
                return Err(Error::UnsupportedAlgorithm);
            }
            SelectedAlgorithm {
                algorithm,
                tile: Size::new(8, 8),
                fourier: true,
                complex_tuple_index: COMPLEX_TUPLE_INDEX,
            }
        }
        Algorithm::Ft16x16 => {
            if kernel.max_extent() > 16 {
                return Err(Error::UnsupportedAlgorithm);
            }
            SelectedAlgorithm {
                algorithm,
                tile: Size::new(16, 16),
                fourier: true,
                complex_tuple_index: COMPLEX_TUPLE_INDEX,
            }
        }
        // No transform-pipeline path exists for the direct strategies.
        Algorithm::ImplicitGemm | Algorithm::Direct => return Err(Error::UnsupportedAlgorithm),
        Algorithm::Auto => unreachable!("auto was resolved above"),
    };
    log::debug!(
        "selected {:?} (tile {}x{}) for kernel {}x{}, output {}x{}",
        selected.algorithm,
        selected.tile.width,
        selected.tile.height,
        kernel.width,
        kernel.height,
        output.width,
        output.height
    );
    Ok(selected)
}
