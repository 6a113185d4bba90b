//! fastconv-kernels: transform-domain convolution for CNN inference.
//!
//! Convolutional layers are computed by moving into a domain where
//! convolution is cheap block matrix multiplication:
//! - **Winograd F(6x6, 3x3)** and **Fourier (8x8 / 16x16 tile)** transform
//!   pipelines with runtime algorithm selection,
//! - a generic **tiled fork-join dispatcher** partitioning 1-4D iteration
//!   spaces into bounded tiles across a fixed worker pool,
//! - **cache-aware blocking** derived from the detected L1/L2/L3 hierarchy,
//! - a three-array **workspace arena** with internal, size-query, and
//!   caller-supplied modes,
//! - per-stage **wall-time profiling**.
//!
//! # Quick start
//!
//! ```ignore
//! use fastconv_kernels::{
//!     convolution_output, initialize, Algorithm, ConvolutionConfig, Workspace,
//! };
//!
//! initialize()?;
//! convolution_output(
//!     Algorithm::Auto, &config,
//!     &input, &kernel, &bias, &mut output,
//!     Workspace::Compute, None, None,
//! )?;
//! ```

pub mod aligned;
pub mod algorithm;
pub mod blocking;
pub mod convolution;
pub mod dispatch;
pub mod error;
pub mod fxdiv;
pub mod gemm;
pub mod hwinfo;
pub mod profile;
pub mod threadpool;
pub mod transforms;
pub mod types;
pub mod validation;
pub mod workspace;

pub use aligned::AlignedBuffer;
pub use blocking::{compute_blocking, BlockingPlan};
pub use convolution::convolution_output;
pub use error::Error;
pub use fxdiv::FixedDivisor;
pub use hwinfo::{deinitialize, initialize, CacheInfo, HardwareConfig, IsaLevel};
pub use profile::Profile;
pub use threadpool::WorkerPool;
pub use types::{Activation, Algorithm, ConvolutionConfig, Padding, Size};
pub use workspace::Workspace;
