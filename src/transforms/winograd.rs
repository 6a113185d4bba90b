//! Winograd F(6x6, 3x3) tile transforms over 8x8 tiles.
//!
//! Standard Lavin-Gray construction with interpolation points
//! {0, +-1, +-2, +-1/2, inf}: forward kernel `G g Gt`, forward input
//! `Bt d B`, inverse `At M A`. Coefficients are real, so the transform
//! domain multiplies with the plain per-lane tuple GEMM. Output coordinates
//! cover a 6x6 super-tile per 8x8 input tile.

use super::{SourceView, TileSink};

const TILE: usize = 8;
const OUTPUT_TILE: usize = 6;

#[rustfmt::skip]
const BT: [[f32; 8]; 8] = [
    [1.0,  0.0,   -5.25,  0.0,    5.25,  0.0,   -1.0, 0.0],
    [0.0,  1.0,    1.0,  -4.25,  -4.25,  1.0,    1.0, 0.0],
    [0.0, -1.0,    1.0,   4.25,  -4.25, -1.0,    1.0, 0.0],
    [0.0,  0.5,    0.25, -2.5,   -1.25,  2.0,    1.0, 0.0],
    [0.0, -0.5,    0.25,  2.5,   -1.25, -2.0,    1.0, 0.0],
    [0.0,  2.0,    4.0,  -2.5,   -5.0,   0.5,    1.0, 0.0],
    [0.0, -2.0,    4.0,   2.5,   -5.0,  -0.5,    1.0, 0.0],
    [0.0, -1.0,    0.0,   5.25,   0.0,  -5.25,   0.0, 1.0],
];

#[rustfmt::skip]
const G: [[f32; 3]; 8] = [
    [ 1.0,            0.0,           0.0          ],
    [-2.0 / 9.0,     -2.0 / 9.0,    -2.0 / 9.0    ],
    [-2.0 / 9.0,      2.0 / 9.0,    -2.0 / 9.0    ],
    [ 1.0 / 90.0,     1.0 / 45.0,    2.0 / 45.0   ],
    [ 1.0 / 90.0,    -1.0 / 45.0,    2.0 / 45.0   ],
    [ 32.0 / 45.0,    16.0 / 45.0,   8.0 / 45.0   ],
    [ 32.0 / 45.0,   -16.0 / 45.0,   8.0 / 45.0   ],
    [ 0.0,            0.0,           1.0          ],
];

#[rustfmt::skip]
const AT: [[f32; 8]; 6] = [
    [1.0, 1.0,  1.0, 1.0,  1.0, 1.0,     1.0,      0.0],
    [0.0, 1.0, -1.0, 2.0, -2.0, 0.5,    -0.5,      0.0],
    [0.0, 1.0,  1.0, 4.0,  4.0, 0.25,    0.25,     0.0],
    [0.0, 1.0, -1.0, 8.0, -8.0, 0.125,  -0.125,    0.0],
    [0.0, 1.0,  1.0, 16.0, 16.0, 0.0625, 0.0625,   0.0],
    [0.0, 1.0, -1.0, 32.0, -32.0, 0.03125, -0.03125, 1.0],
];

/// Kernel transform: 3x3 -> 8x8 via `G g Gt`.
pub fn kwt_f6x6_3x3(src: &SourceView<'_>, out: &mut [f32]) {
    debug_assert_eq!(out.len(), TILE * TILE);
    let mut g = [[0.0f32; 3]; 3];
    for (r, row) in g.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = src.get(r, c);
        }
    }
    // t = G * g (8x3)
    let mut t = [[0.0f32; 3]; 8];
    for i in 0..TILE {
        for j in 0..3 {
            let mut acc = 0.0;
            for (k, row) in g.iter().enumerate() {
                acc += G[i][k] * row[j];
            }
            t[i][j] = acc;
        }
    }
    // out = t * Gt (8x8)
    for i in 0..TILE {
        for j in 0..TILE {
            let mut acc = 0.0;
            for k in 0..3 {
                acc += t[i][k] * G[j][k];
            }
            out[i * TILE + j] = acc;
        }
    }
}

/// Input transform: padded 8x8 window -> 8x8 via `Bt d B`.
pub fn iwt_f6x6_3x3(src: &SourceView<'_>, out: &mut [f32]) {
    debug_assert_eq!(out.len(), TILE * TILE);
    let mut d = [[0.0f32; 8]; 8];
    for (r, row) in d.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = src.get(r, c);
        }
    }
    // t = Bt * d
    let mut t = [[0.0f32; 8]; 8];
    for i in 0..TILE {
        for j in 0..TILE {
            let mut acc = 0.0;
            for (k, row) in d.iter().enumerate() {
                acc += BT[i][k] * row[j];
            }
            t[i][j] = acc;
        }
    }
    // out = t * B  (B = Bt transposed)
    for i in 0..TILE {
        for j in 0..TILE {
            let mut acc = 0.0;
            for k in 0..TILE {
                acc += t[i][k] * BT[j][k];
            }
            out[i * TILE + j] = acc;
        }
    }
}

/// Output transform: 8x8 accumulator -> clipped 6x6 spatial tile with bias
/// and activation fused into the write-back.
pub fn owt_f6x6_3x3<const RELU: bool>(transformed: &[f32], bias: f32, sink: &mut TileSink) {
    debug_assert_eq!(transformed.len(), TILE * TILE);
    // t = At * m (6x8)
    let mut t = [[0.0f32; 8]; 6];
    for i in 0..OUTPUT_TILE {
        for j in 0..TILE {
            let mut acc = 0.0;
            for k in 0..TILE {
                acc += AT[i][k] * transformed[k * TILE + j];
            }
            t[i][j] = acc;
        }
    }
    // s = t * A, written clipped
    for r in 0..sink.rows() {
        for c in 0..sink.cols() {
            let mut acc = 0.0;
            for k in 0..TILE {
                acc += t[r][k] * AT[c][k];
            }
            let mut value = acc + bias;
            if RELU {
                value = value.max(0.0);
            }
            sink.set(r, c, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single-tile Winograd pipeline against a direct 6x6 correlation.
    #[test]
    fn test_single_tile_matches_direct_correlation() {
        let mut state = 0x9e37_79b9u32;
        let mut rng = move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 8) as f32 / (1 << 24) as f32 - 0.5
        };
        let input: Vec<f32> = (0..64).map(|_| rng()).collect();
        let kernel: Vec<f32> = (0..9).map(|_| rng()).collect();

        let mut kt = vec![0.0f32; 64];
        kwt_f6x6_3x3(&SourceView::new(&kernel, 0, 3, 3, 3, 0, 0), &mut kt);
        let mut it = vec![0.0f32; 64];
        iwt_f6x6_3x3(&SourceView::new(&input, 0, 8, 8, 8, 0, 0), &mut it);

        // Per-lane product in the transform domain.
        let product: Vec<f32> = it.iter().zip(&kt).map(|(a, b)| a * b).collect();

        let mut out = vec![0.0f32; 36];
        let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), 6, 6, 6) };
        owt_f6x6_3x3::<false>(&product, 0.0, &mut sink);

        for y in 0..6 {
            for x in 0..6 {
                let mut expected = 0.0f32;
                for i in 0..3 {
                    for j in 0..3 {
                        expected += input[(y + i) * 8 + (x + j)] * kernel[i * 3 + j];
                    }
                }
                let got = out[y * 6 + x];
                assert!(
                    (got - expected).abs() <= 1e-3 * expected.abs().max(1.0),
                    "({y},{x}): got {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_bias_and_relu_fusion() {
        let input = vec![0.0f32; 64];
        let kernel = vec![0.0f32; 9];
        let mut kt = vec![0.0f32; 64];
        kwt_f6x6_3x3(&SourceView::new(&kernel, 0, 3, 3, 3, 0, 0), &mut kt);
        let mut it = vec![0.0f32; 64];
        iwt_f6x6_3x3(&SourceView::new(&input, 0, 8, 8, 8, 0, 0), &mut it);
        let product: Vec<f32> = it.iter().zip(&kt).map(|(a, b)| a * b).collect();

        let mut out = vec![1.0f32; 36];
        let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), 6, 6, 6) };
        owt_f6x6_3x3::<false>(&product, -2.5, &mut sink);
        assert!(out.iter().all(|&v| (v + 2.5).abs() < 1e-5));

        let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), 6, 6, 6) };
        owt_f6x6_3x3::<true>(&product, -2.5, &mut sink);
        assert!(out.iter().all(|&v| v == 0.0), "ReLU must clamp the negative bias");
    }

    #[test]
    fn test_clipped_write_back() {
        let input: Vec<f32> = (0..64).map(|i| i as f32).collect();
        let kernel = vec![1.0f32; 9];
        let mut kt = vec![0.0f32; 64];
        kwt_f6x6_3x3(&SourceView::new(&kernel, 0, 3, 3, 3, 0, 0), &mut kt);
        let mut it = vec![0.0f32; 64];
        iwt_f6x6_3x3(&SourceView::new(&input, 0, 8, 8, 8, 0, 0), &mut it);
        let product: Vec<f32> = it.iter().zip(&kt).map(|(a, b)| a * b).collect();

        let mut out = vec![f32::NAN; 6];
        // 2 rows x 3 cols clip: only those slots may be written.
        let mut sink = unsafe { TileSink::from_raw(out.as_mut_ptr(), 3, 2, 3) };
        owt_f6x6_3x3::<false>(&product, 0.0, &mut sink);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
