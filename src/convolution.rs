//! The transform-domain convolution pipeline.
//!
//! Per call: transform the kernel once into the channel-blocked layout, then
//! for every output super-tile run input transform, tuple-block
//! multiplication, and output transform, each driven by the tiled
//! dispatcher. All scratch addressing goes through the workspace arena;
//! every concurrently executing tile reads and writes a disjoint sub-region,
//! so the stages need no locks.
//!
//! Transform-buffer layouts (per coefficient-tuple plane, in tuples):
//!   kernel: `icb_start*oc + oc_sub_start*icb_size + ic_offset*oc_sub_size
//!            + oc_sub_offset`
//!   input:  same with the batch in place of output channels
//!   output: `bb_start*oc + oc_sub_start*bb_size + b_offset*oc_sub_size
//!            + oc_sub_offset`
//! The within-subblock factors make each GEMM operand contiguous in `k`.

use crate::algorithm::{self, SelectedAlgorithm};
use crate::blocking::{self, round_down};
use crate::error::Error;
use crate::gemm::{FastGemmFn, FullGemmFn};
use crate::hwinfo::{self, Context};
use crate::profile::{time_stage, Profile};
use crate::transforms::{ForwardTransformFn, InverseTransformFn, SourceView, TileSink};
use crate::types::{Activation, Algorithm, ConvolutionConfig, Size};
use crate::validation;
use crate::workspace::{ArenaSizes, Obtained, Region, TransformArena, Workspace};

/// Largest tile in elements (16x16 Fourier).
const MAX_TILE_ELEMENTS: usize = 256;

/// Output tensor shared across workers; the output transform writes disjoint
/// `(sample, channel, super-tile)` windows.
#[derive(Clone, Copy)]
struct SharedOutput {
    ptr: *mut f32,
    len: usize,
}

unsafe impl Send for SharedOutput {}
unsafe impl Sync for SharedOutput {}

struct KernelTransformPass<'a> {
    transform: ForwardTransformFn,
    kernel: &'a [f32],
    region: Region,
    tuple_elements: usize,
    tile_elements: usize,
    input_channels: usize,
    output_channels: usize,
    input_channels_block_max: usize,
    kernel_size: Size,
}

impl KernelTransformPass<'_> {
    fn run(&self, input_channel: usize, oc_subblock_start: usize, oc_subblock_size: usize) {
        let icb_start = round_down(input_channel, self.input_channels_block_max);
        let icb_size = (self.input_channels - icb_start).min(self.input_channels_block_max);
        let icb_offset = input_channel - icb_start;
        let plane_stride = self.output_channels * self.input_channels * self.tuple_elements;
        let mut local = [0.0f32; MAX_TILE_ELEMENTS];
        let local = &mut local[..self.tile_elements];
        for oc_subblock_offset in 0..oc_subblock_size {
            let output_channel = oc_subblock_start + oc_subblock_offset;
            let base = (input_channel + output_channel * self.input_channels)
                * self.kernel_size.elements();
            let src = SourceView::new(
                self.kernel,
                base,
                self.kernel_size.width,
                self.kernel_size.height,
                self.kernel_size.width,
                0,
                0,
            );
            (self.transform)(&src, local);
            let entry = (icb_start * self.output_channels
                + oc_subblock_start * icb_size
                + icb_offset * oc_subblock_size
                + oc_subblock_offset)
                * self.tuple_elements;
            self.region
                .write_tuples(entry, plane_stride, self.tuple_elements, local);
        }
    }
}

struct InputTransformPass<'a> {
    transform: ForwardTransformFn,
    input: &'a [f32],
    region: Region,
    tuple_elements: usize,
    tile_elements: usize,
    batch_size: usize,
    input_channels: usize,
    input_channels_block_max: usize,
    input_size: Size,
    /// Image offset of the super-tile window: `input_y * width + input_x`.
    input_base: usize,
    row_count: usize,
    column_count: usize,
    row_offset: usize,
    column_offset: usize,
}

impl InputTransformPass<'_> {
    fn run(&self, input_channel: usize, batch_subblock_start: usize, batch_subblock_size: usize) {
        let icb_start = round_down(input_channel, self.input_channels_block_max);
        let icb_size = (self.input_channels - icb_start).min(self.input_channels_block_max);
        let icb_offset = input_channel - icb_start;
        let plane_stride = self.batch_size * self.input_channels * self.tuple_elements;
        let mut local = [0.0f32; MAX_TILE_ELEMENTS];
        let local = &mut local[..self.tile_elements];
        for batch_subblock_offset in 0..batch_subblock_size {
            let sample = batch_subblock_start + batch_subblock_offset;
            let base = (sample * self.input_channels + input_channel)
                * self.input_size.elements()
                + self.input_base;
            let src = SourceView::new(
                self.input,
                base,
                self.input_size.width,
                self.row_count,
                self.column_count,
                self.row_offset,
                self.column_offset,
            );
            (self.transform)(&src, local);
            let entry = (icb_start * self.batch_size
                + batch_subblock_start * icb_size
                + icb_offset * batch_subblock_size
                + batch_subblock_offset)
                * self.tuple_elements;
            self.region
                .write_tuples(entry, plane_stride, self.tuple_elements, local);
        }
    }
}

struct MatmulPass {
    tuple_elements: usize,
    batch_block_size: usize,
    input_channels_block_start: usize,
    input_channels_block_size: usize,
    batch_subblock_max: usize,
    output_channels_subblock_max: usize,
    input_region: Region,
    kernel_region: Region,
    output_region: Region,
    /// Plane + block offsets precomputed by the pipeline loops.
    input_base: usize,
    kernel_base: usize,
    output_base: usize,
    fast: FastGemmFn,
    full: FullGemmFn,
}

impl MatmulPass {
    fn run(
        &self,
        output_channels_block_start: usize,
        batch_subblock_start: usize,
        output_channels_block_size: usize,
        batch_subblock_size: usize,
    ) {
        let tuple = self.tuple_elements;
        let icb_size = self.input_channels_block_size;
        // The first input-channel block initializes the accumulators.
        let update = self.input_channels_block_start != 0;
        let a = self
            .input_region
            .ptr_at(self.input_base + batch_subblock_start * icb_size * tuple);

        let mut oc_offset = 0usize;
        if batch_subblock_size == self.batch_subblock_max {
            // Fast path while whole register tiles remain.
            while output_channels_block_size - oc_offset >= self.output_channels_subblock_max {
                let oc_sub_start = output_channels_block_start + oc_offset;
                let b = self
                    .kernel_region
                    .ptr_at(self.kernel_base + oc_sub_start * icb_size * tuple);
                let c = self.output_region.ptr_at_mut(
                    self.output_base
                        + oc_sub_start * self.batch_block_size * tuple
                        + batch_subblock_start * self.output_channels_subblock_max * tuple,
                );
                unsafe {
                    (self.fast)(
                        icb_size,
                        update,
                        a,
                        b,
                        c,
                        self.output_channels_subblock_max * tuple,
                    )
                };
                oc_offset += self.output_channels_subblock_max;
            }
        }
        while oc_offset < output_channels_block_size {
            let oc_sub_size =
                (output_channels_block_size - oc_offset).min(self.output_channels_subblock_max);
            let oc_sub_start = output_channels_block_start + oc_offset;
            let b = self
                .kernel_region
                .ptr_at(self.kernel_base + oc_sub_start * icb_size * tuple);
            let c = self.output_region.ptr_at_mut(
                self.output_base
                    + oc_sub_start * self.batch_block_size * tuple
                    + batch_subblock_start * oc_sub_size * tuple,
            );
            unsafe {
                (self.full)(
                    batch_subblock_size,
                    oc_sub_size,
                    icb_size,
                    update,
                    a,
                    b,
                    c,
                    oc_sub_size * tuple,
                )
            };
            oc_offset += oc_sub_size;
        }
    }
}

struct OutputTransformPass<'a> {
    transform: InverseTransformFn,
    output: SharedOutput,
    region: Region,
    bias: &'a [f32],
    tuple_elements: usize,
    tile_elements: usize,
    batch_size: usize,
    output_channels: usize,
    batch_block_max: usize,
    output_size: Size,
    /// Tensor offset of the super-tile: `y * width + x`.
    output_base: usize,
    row_count: usize,
    column_count: usize,
}

impl OutputTransformPass<'_> {
    fn run(&self, sample: usize, oc_subblock_start: usize, oc_subblock_size: usize) {
        let bb_start = round_down(sample, self.batch_block_max);
        let bb_size = (self.batch_size - bb_start).min(self.batch_block_max);
        let bb_offset = sample - bb_start;
        let plane_stride = self.batch_size * self.output_channels * self.tuple_elements;
        let mut local = [0.0f32; MAX_TILE_ELEMENTS];
        let local = &mut local[..self.tile_elements];
        for oc_subblock_offset in 0..oc_subblock_size {
            let output_channel = oc_subblock_start + oc_subblock_offset;
            let entry = (bb_start * self.output_channels
                + oc_subblock_start * bb_size
                + bb_offset * oc_subblock_size
                + oc_subblock_offset)
                * self.tuple_elements;
            self.region
                .read_tuples(entry, plane_stride, self.tuple_elements, local);
            let offset = (sample * self.output_channels + output_channel)
                * self.output_size.elements()
                + self.output_base;
            debug_assert!(
                offset + (self.row_count - 1) * self.output_size.width + self.column_count
                    <= self.output.len
            );
            // Safety: disjoint window per (sample, channel, super-tile).
            let mut sink = unsafe {
                TileSink::from_raw(
                    self.output.ptr.add(offset),
                    self.output_size.width,
                    self.row_count,
                    self.column_count,
                )
            };
            (self.transform)(local, self.bias[output_channel], &mut sink);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn compute_fast_convolution_output(
    ctx: &Context,
    selected: &SelectedAlgorithm,
    config: &ConvolutionConfig,
    output_size: Size,
    input: &[f32],
    kernel: &[f32],
    bias: &[f32],
    output: &mut [f32],
    workspace: Workspace<'_>,
    input_transform_fn: ForwardTransformFn,
    kernel_transform_fn: ForwardTransformFn,
    output_transform_fn: InverseTransformFn,
    stages: &mut Profile,
    collect: bool,
) -> Result<(), Error> {
    let hw = &ctx.config;
    let pool = &ctx.pool;
    let tile = selected.tile;
    let fourier = selected.fourier;

    let tuple_elements = if fourier {
        hw.simd_width * 2
    } else {
        hw.simd_width
    };
    let tile_elements = tile.elements();
    let tuple_count = tile_elements / tuple_elements;
    let output_tile = Size::new(
        tile.width - config.kernel_size.width + 1,
        tile.height - config.kernel_size.height + 1,
    );

    let (mr, nr) = if fourier {
        (hw.cxgemm.mr, hw.cxgemm.nr)
    } else {
        (hw.sxgemm.mr, hw.sxgemm.nr)
    };
    let plan = blocking::compute_blocking(&hw.cache, tuple_elements, mr, nr);

    let sizes = ArenaSizes::new(
        config.batch_size,
        config.input_channels,
        config.output_channels,
        tile_elements,
    );
    let arena = match TransformArena::obtain(workspace, sizes)? {
        Obtained::SizeQueryDone => return Ok(()),
        Obtained::Ready(arena) => arena,
    };
    let input_region = arena.input_region();
    let output_region = arena.output_region();
    let kernel_region = arena.kernel_region();

    let input_plane = config.batch_size * config.input_channels * tuple_elements;
    let kernel_plane = config.output_channels * config.input_channels * tuple_elements;
    let output_plane = config.batch_size * config.output_channels * tuple_elements;

    // Stage 1: kernel transform, once per call.
    time_stage(collect, &mut stages.kernel_transform, || {
        let pass = KernelTransformPass {
            transform: kernel_transform_fn,
            kernel,
            region: kernel_region,
            tuple_elements,
            tile_elements,
            input_channels: config.input_channels,
            output_channels: config.output_channels,
            input_channels_block_max: plan.input_channels_block_max,
            kernel_size: config.kernel_size,
        };
        pool.compute_2d_tiled(
            config.input_channels,
            config.output_channels,
            1,
            nr,
            |input_channel, oc_start, _ic_extent, oc_extent| {
                pass.run(input_channel, oc_start, oc_extent)
            },
        );
    });

    let shared_output = SharedOutput {
        ptr: output.as_mut_ptr(),
        len: output.len(),
    };

    let mut y = 0;
    while y < output_size.height {
        let input_y = y
            .saturating_sub(config.input_padding.top)
            .min(config.input_size.height);
        let row_offset = config.input_padding.top.saturating_sub(y);
        let row_count = (config.input_size.height - input_y).min(tile.height - row_offset);

        let mut x = 0;
        while x < output_size.width {
            let input_x = x
                .saturating_sub(config.input_padding.left)
                .min(config.input_size.width);
            let column_offset = config.input_padding.left.saturating_sub(x);
            let column_count = (config.input_size.width - input_x).min(tile.width - column_offset);

            // Stage 2: input transform of the super-tile's receptive field.
            time_stage(collect, &mut stages.input_transform, || {
                let pass = InputTransformPass {
                    transform: input_transform_fn,
                    input,
                    region: input_region,
                    tuple_elements,
                    tile_elements,
                    batch_size: config.batch_size,
                    input_channels: config.input_channels,
                    input_channels_block_max: plan.input_channels_block_max,
                    input_size: config.input_size,
                    input_base: input_y * config.input_size.width + input_x,
                    row_count,
                    column_count,
                    row_offset,
                    column_offset,
                };
                pool.compute_2d_tiled(
                    config.input_channels,
                    config.batch_size,
                    1,
                    mr,
                    |input_channel, batch_start, _ic_extent, batch_extent| {
                        pass.run(input_channel, batch_start, batch_extent)
                    },
                );
            });

            // Stage 3: tuple-block multiplication.
            time_stage(collect, &mut stages.block_multiplication, || {
                for tuple_index in 0..tuple_count {
                    let (fast, full) = if fourier {
                        if tuple_index < selected.complex_tuple_index {
                            (hw.cxgemm.s4c2_fast, hw.cxgemm.s4c2_full)
                        } else {
                            (hw.cxgemm.c4_fast, hw.cxgemm.c4_full)
                        }
                    } else {
                        (hw.sxgemm.fast, hw.sxgemm.full)
                    };
                    let mut icb_start = 0;
                    while icb_start < config.input_channels {
                        let icb_size = (config.input_channels - icb_start)
                            .min(plan.input_channels_block_max);
                        let mut bb_start = 0;
                        while bb_start < config.batch_size {
                            let bb_size =
                                (config.batch_size - bb_start).min(plan.batch_block_max);
                            let pass = MatmulPass {
                                tuple_elements,
                                batch_block_size: bb_size,
                                input_channels_block_start: icb_start,
                                input_channels_block_size: icb_size,
                                batch_subblock_max: mr,
                                output_channels_subblock_max: nr,
                                input_region,
                                kernel_region,
                                output_region,
                                input_base: tuple_index * input_plane
                                    + icb_start * config.batch_size * tuple_elements
                                    + bb_start * icb_size * tuple_elements,
                                kernel_base: tuple_index * kernel_plane
                                    + icb_start * config.output_channels * tuple_elements,
                                output_base: tuple_index * output_plane
                                    + bb_start * config.output_channels * tuple_elements,
                                fast,
                                full,
                            };
                            pool.compute_2d_tiled(
                                config.output_channels,
                                bb_size,
                                plan.output_channels_block_max,
                                mr,
                                |oc_block, batch_sub, oc_extent, batch_extent| {
                                    pass.run(oc_block, batch_sub, oc_extent, batch_extent)
                                },
                            );
                            bb_start += plan.batch_block_max;
                        }
                        icb_start += plan.input_channels_block_max;
                    }
                }
            });

            // Stage 4: output transform, bias and activation fused.
            time_stage(collect, &mut stages.output_transform, || {
                let pass = OutputTransformPass {
                    transform: output_transform_fn,
                    output: shared_output,
                    region: output_region,
                    bias,
                    tuple_elements,
                    tile_elements,
                    batch_size: config.batch_size,
                    output_channels: config.output_channels,
                    batch_block_max: plan.batch_block_max,
                    output_size,
                    output_base: y * output_size.width + x,
                    row_count: output_tile.height.min(output_size.height - y),
                    column_count: output_tile.width.min(output_size.width - x),
                };
                pool.compute_2d_tiled(
                    config.batch_size,
                    config.output_channels,
                    1,
                    nr,
                    |sample, oc_start, _sample_extent, oc_extent| {
                        pass.run(sample, oc_start, oc_extent)
                    },
                );
            });

            x += output_tile.width;
        }
        y += output_tile.height;
    }

    Ok(())
}

/// Compute a convolutional layer's output tensor.
///
/// Tensors are NCHW f32: `input` is `batch x input_channels x input_size`,
/// `kernel` is `output_channels x input_channels x kernel_size`, `bias` has
/// one value per output channel, and `output` is
/// `batch x output_channels x (padding + input - kernel + 1)`.
///
/// `activation_parameters` must be `None`; only scalar bias plus
/// identity/ReLU fusion exists. When `profile` is `Some`, per-stage
/// wall-clock seconds are recorded for this invocation.
#[allow(clippy::too_many_arguments)]
pub fn convolution_output(
    algorithm: Algorithm,
    config: &ConvolutionConfig,
    input: &[f32],
    kernel: &[f32],
    bias: &[f32],
    output: &mut [f32],
    workspace: Workspace<'_>,
    activation_parameters: Option<&[f32]>,
    profile: Option<&mut Profile>,
) -> Result<(), Error> {
    let collect = profile.is_some();
    let start = collect.then(std::time::Instant::now);
    let mut stages = Profile::default();

    let status = (|| {
        let ctx = hwinfo::context()?;
        let output_size = validation::validate_convolution_arguments(config)?;
        if activation_parameters.is_some() {
            return Err(Error::UnsupportedActivationParameters);
        }
        validation::validate_buffer_lengths(
            config,
            output_size,
            input.len(),
            kernel.len(),
            bias.len(),
            output.len(),
        )?;
        let selected = algorithm::select(algorithm, config.kernel_size, output_size)?;

        let transforms = &ctx.config.transforms;
        let relu = config.activation == Activation::Relu;
        let (input_t, kernel_t, output_t) = match selected.algorithm {
            Algorithm::Wt8x8 => (
                transforms.iwt_f6x6_3x3,
                transforms.kwt_f6x6_3x3,
                if relu {
                    transforms.owt_f6x6_3x3_with_bias_relu
                } else {
                    transforms.owt_f6x6_3x3_with_bias
                },
            ),
            Algorithm::Ft8x8 => (
                transforms.fft8x8_with_offset,
                transforms.fft8x8_with_offset,
                if relu {
                    transforms.ifft8x8_with_bias_relu
                } else {
                    transforms.ifft8x8_with_bias
                },
            ),
            Algorithm::Ft16x16 => (
                transforms.fft16x16_with_offset,
                transforms.fft16x16_with_offset,
                if relu {
                    transforms.ifft16x16_with_bias_relu
                } else {
                    transforms.ifft16x16_with_bias
                },
            ),
            _ => unreachable!("selector only returns transform algorithms"),
        };

        compute_fast_convolution_output(
            &ctx,
            &selected,
            config,
            output_size,
            input,
            kernel,
            bias,
            output,
            workspace,
            input_t,
            kernel_t,
            output_t,
            &mut stages,
            collect,
        )
    })();

    if let (Some(profile_out), Some(start)) = (profile, start) {
        stages.total = start.elapsed().as_secs_f64();
        *profile_out = stages;
    }
    status
}
