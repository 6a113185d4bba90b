//! The uninitialized status, isolated in its own test binary so no other
//! test has initialized the process-wide context first.

use fastconv_kernels::{
    convolution_output, deinitialize, initialize, Activation, Algorithm, ConvolutionConfig,
    Error, Padding, Size, Workspace,
};

#[test]
fn test_uninitialized_then_lifecycle() {
    let config = ConvolutionConfig {
        batch_size: 1,
        input_channels: 1,
        output_channels: 1,
        input_size: Size::new(8, 8),
        input_padding: Padding::uniform(1),
        kernel_size: Size::new(3, 3),
        activation: Activation::Identity,
    };
    let input = vec![1.0f32; 64];
    let kernel = vec![1.0f32; 9];
    let bias = vec![0.0f32; 1];
    let mut output = vec![0.0f32; 64];

    let result = convolution_output(
        Algorithm::Auto,
        &config,
        &input,
        &kernel,
        &bias,
        &mut output,
        Workspace::Compute,
        None,
        None,
    );
    assert_eq!(result, Err(Error::Uninitialized));
    assert!(output.iter().all(|&v| v == 0.0));

    // After initialization the same call succeeds; center outputs see all
    // nine taps.
    initialize().unwrap();
    initialize().unwrap(); // idempotent
    convolution_output(
        Algorithm::Auto,
        &config,
        &input,
        &kernel,
        &bias,
        &mut output,
        Workspace::Compute,
        None,
        None,
    )
    .unwrap();
    assert!((output[9] - 9.0).abs() < 1e-3);

    // Teardown restores the uninitialized status.
    deinitialize().unwrap();
    let result = convolution_output(
        Algorithm::Auto,
        &config,
        &input,
        &kernel,
        &bias,
        &mut output,
        Workspace::Compute,
        None,
        None,
    );
    assert_eq!(result, Err(Error::Uninitialized));
}
