//! Upfront argument validation.
//!
//! Runs before any memory is touched or dispatch started; every rejection
//! leaves the output buffer untouched. Distinguishes structurally malformed
//! parameters (`Invalid*`) from well-formed ones with no implementation path
//! (`Unsupported*`).

use crate::error::Error;
use crate::types::{ConvolutionConfig, Size};

/// Validate the shape parameters of a convolution call and return the
/// output extent.
pub(crate) fn validate_convolution_arguments(
    config: &ConvolutionConfig,
) -> Result<Size, Error> {
    if config.batch_size == 0 {
        return Err(Error::InvalidBatchSize);
    }
    if config.input_channels == 0 {
        return Err(Error::InvalidInputChannels);
    }
    if config.output_channels == 0 {
        return Err(Error::InvalidOutputChannels);
    }
    if config.input_size.width == 0 || config.input_size.height == 0 {
        return Err(Error::InvalidInputSize);
    }
    if config.kernel_size.width == 0 || config.kernel_size.height == 0 {
        return Err(Error::InvalidKernelSize);
    }
    let padding = config.input_padding;
    if padding.left >= config.kernel_size.width
        || padding.right >= config.kernel_size.width
        || padding.top >= config.kernel_size.height
        || padding.bottom >= config.kernel_size.height
    {
        return Err(Error::InvalidInputPadding);
    }
    let padded_width = padding.left + config.input_size.width + padding.right;
    let padded_height = padding.top + config.input_size.height + padding.bottom;
    if config.kernel_size.width > padded_width || config.kernel_size.height > padded_height {
        return Err(Error::UnsupportedKernelSize);
    }
    Ok(config.output_size())
}

/// Validate tensor slice lengths against the declared extents.
pub(crate) fn validate_buffer_lengths(
    config: &ConvolutionConfig,
    output_size: Size,
    input_len: usize,
    kernel_len: usize,
    bias_len: usize,
    output_len: usize,
) -> Result<(), Error> {
    let check = |buffer: &'static str, expected: usize, actual: usize| {
        if actual != expected {
            Err(Error::BufferLengthMismatch {
                buffer,
                expected,
                actual,
            })
        } else {
            Ok(())
        }
    };
    check(
        "input",
        config.batch_size * config.input_channels * config.input_size.elements(),
        input_len,
    )?;
    check(
        "kernel",
        config.output_channels * config.input_channels * config.kernel_size.elements(),
        kernel_len,
    )?;
    check("bias", config.output_channels, bias_len)?;
    check(
        "output",
        config.batch_size * config.output_channels * output_size.elements(),
        output_len,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Activation, Padding};

    fn config() -> ConvolutionConfig {
        ConvolutionConfig {
            batch_size: 2,
            input_channels: 3,
            output_channels: 5,
            input_size: Size::new(16, 16),
            input_padding: Padding::uniform(1),
            kernel_size: Size::new(3, 3),
            activation: Activation::Identity,
        }
    }

    #[test]
    fn test_valid_arguments() {
        let output = validate_convolution_arguments(&config()).unwrap();
        assert_eq!(output, Size::new(16, 16));
    }

    #[test]
    fn test_zero_extents_rejected() {
        let mut c = config();
        c.batch_size = 0;
        assert_eq!(validate_convolution_arguments(&c), Err(Error::InvalidBatchSize));

        let mut c = config();
        c.input_channels = 0;
        assert_eq!(validate_convolution_arguments(&c), Err(Error::InvalidInputChannels));

        let mut c = config();
        c.output_channels = 0;
        assert_eq!(validate_convolution_arguments(&c), Err(Error::InvalidOutputChannels));

        let mut c = config();
        c.input_size = Size::new(0, 16);
        assert_eq!(validate_convolution_arguments(&c), Err(Error::InvalidInputSize));

        let mut c = config();
        c.kernel_size = Size::new(3, 0);
        assert_eq!(validate_convolution_arguments(&c), Err(Error::InvalidKernelSize));
    }

    #[test]
    fn test_padding_must_be_below_kernel_extent() {
        let mut c = config();
        c.input_padding = Padding {
            top: 3,
            right: 0,
            bottom: 0,
            left: 0,
        };
        assert_eq!(
            validate_convolution_arguments(&c),
            Err(Error::InvalidInputPadding)
        );
        c.input_padding = Padding::uniform(2);
        assert!(validate_convolution_arguments(&c).is_ok());
    }

    #[test]
    fn test_kernel_larger_than_padded_input() {
        let mut c = config();
        c.input_size = Size::new(2, 2);
        c.kernel_size = Size::new(5, 5);
        c.input_padding = Padding::uniform(1);
        assert_eq!(
            validate_convolution_arguments(&c),
            Err(Error::UnsupportedKernelSize)
        );
    }

    #[test]
    fn test_buffer_length_mismatch() {
        let c = config();
        let output = validate_convolution_arguments(&c).unwrap();
        let input_len = 2 * 3 * 256;
        let kernel_len = 5 * 3 * 9;
        let output_len = 2 * 5 * 256;
        assert!(validate_buffer_lengths(&c, output, input_len, kernel_len, 5, output_len).is_ok());
        assert!(matches!(
            validate_buffer_lengths(&c, output, input_len - 1, kernel_len, 5, output_len),
            Err(Error::BufferLengthMismatch { buffer: "input", .. })
        ));
        assert!(matches!(
            validate_buffer_lengths(&c, output, input_len, kernel_len, 4, output_len),
            Err(Error::BufferLengthMismatch { buffer: "bias", .. })
        ));
    }
}
