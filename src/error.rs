//! Crate error type: the status-code superset of spec.md §6 expressed as a
//! `thiserror`-derived enum, plus Rust-native slice-length mismatch variants.
//!
//! Two failure classes dominate: *invalid* arguments (caller passed values
//! that can never describe a valid convolution) and *unsupported* requests
//! (well-formed but outside this build's capability set), alongside the
//! memory/initialization classes (`Uninitialized`, `OutOfMemory`,
//! `InsufficientBuffer`, `MisalignedBuffer`).

use thiserror::Error;

/// All failure modes surfaced by the public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The library was used before [`crate::initialize`] established the
    /// process-wide hardware context.
    #[error("library not initialized; call initialize() first")]
    Uninitialized,

    /// A host allocation for an internally managed buffer failed.
    #[error("out of memory")]
    OutOfMemory,

    /// A caller-supplied workspace buffer did not meet the alignment
    /// requirement.
    #[error("supplied buffer is misaligned")]
    MisalignedBuffer,

    /// A caller-supplied workspace buffer was smaller than required.
    #[error("supplied buffer too small: required {required} bytes, provided {provided}")]
    InsufficientBuffer {
        /// Minimum buffer length, in bytes, required for the operation.
        required: usize,
        /// Length, in bytes, of the buffer the caller provided.
        provided: usize,
    },

    /// The batch size was zero.
    #[error("invalid batch size")]
    InvalidBatchSize,

    /// The input channel count was zero.
    #[error("invalid input channel count")]
    InvalidInputChannels,

    /// The output channel count was zero.
    #[error("invalid output channel count")]
    InvalidOutputChannels,

    /// The input spatial size had a zero extent.
    #[error("invalid input size")]
    InvalidInputSize,

    /// The kernel spatial size had a zero extent.
    #[error("invalid kernel size")]
    InvalidKernelSize,

    /// The requested input padding was incompatible with the kernel size.
    #[error("invalid input padding")]
    InvalidInputPadding,

    /// The kernel size is not supported by the selected transform pipeline.
    #[error("unsupported kernel size")]
    UnsupportedKernelSize,

    /// The requested algorithm is not available in this build.
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    /// The activation's parameters are outside the supported range.
    #[error("unsupported activation parameters")]
    UnsupportedActivationParameters,

    /// A slice argument did not have the length implied by the configuration.
    #[error("buffer length mismatch for {buffer}: expected {expected}, got {actual}")]
    BufferLengthMismatch {
        /// Which argument buffer mismatched (e.g. `"input"`, `"bias"`).
        buffer: &'static str,
        /// Length the configuration implies.
        expected: usize,
        /// Length actually provided.
        actual: usize,
    },
}
