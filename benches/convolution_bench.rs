//! Convolution throughput across algorithms and a reuse-vs-allocate
//! workspace comparison.
//!
//! Run with: cargo bench --bench convolution_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use fastconv_kernels::{
    convolution_output, initialize, Activation, Algorithm, AlignedBuffer, ConvolutionConfig,
    Padding, Size, Workspace,
};

fn conv_flops(config: &ConvolutionConfig) -> u64 {
    let output = config.output_size();
    (2 * config.batch_size
        * config.input_channels
        * config.output_channels
        * output.elements()
        * config.kernel_size.elements()) as u64
}

fn vgg_like_config(kernel: usize, pad: usize) -> ConvolutionConfig {
    ConvolutionConfig {
        batch_size: 1,
        input_channels: 16,
        output_channels: 16,
        input_size: Size::new(56, 56),
        input_padding: Padding::uniform(pad),
        kernel_size: Size::new(kernel, kernel),
        activation: Activation::Relu,
    }
}

fn bench_algorithms(c: &mut Criterion) {
    initialize().unwrap();
    let mut group = c.benchmark_group("convolution_output");
    group.sample_size(10);

    for (name, algorithm, config) in [
        ("wt8x8_3x3", Algorithm::Wt8x8, vgg_like_config(3, 1)),
        ("ft8x8_5x5", Algorithm::Ft8x8, vgg_like_config(5, 2)),
        ("ft16x16_11x11", Algorithm::Ft16x16, vgg_like_config(11, 2)),
    ] {
        let input =
            vec![0.1f32; config.batch_size * config.input_channels * config.input_size.elements()];
        let kernel = vec![
            0.01f32;
            config.output_channels * config.input_channels * config.kernel_size.elements()
        ];
        let bias = vec![0.0f32; config.output_channels];
        let mut output =
            vec![0.0f32;
                config.batch_size * config.output_channels * config.output_size().elements()];

        let mut required = 0usize;
        convolution_output(
            algorithm,
            &config,
            &input,
            &kernel,
            &bias,
            &mut output,
            Workspace::Query(&mut required),
            None,
            None,
        )
        .unwrap();
        let mut workspace = AlignedBuffer::new(required).unwrap();

        group.throughput(Throughput::Elements(conv_flops(&config)));
        group.bench_function(name, |b| {
            b.iter(|| {
                convolution_output(
                    algorithm,
                    &config,
                    black_box(&input),
                    black_box(&kernel),
                    &bias,
                    &mut output,
                    Workspace::Supplied(workspace.as_mut_slice()),
                    None,
                    None,
                )
                .unwrap();
            })
        });
    }
    group.finish();
}

fn bench_workspace_modes(c: &mut Criterion) {
    initialize().unwrap();
    let config = vgg_like_config(3, 1);
    let algorithm = Algorithm::Wt8x8;
    let input =
        vec![0.1f32; config.batch_size * config.input_channels * config.input_size.elements()];
    let kernel = vec![
        0.01f32;
        config.output_channels * config.input_channels * config.kernel_size.elements()
    ];
    let bias = vec![0.0f32; config.output_channels];
    let mut output =
        vec![0.0f32; config.batch_size * config.output_channels * config.output_size().elements()];

    let mut group = c.benchmark_group("workspace");
    group.sample_size(10);
    group.bench_function("internal_allocation", |b| {
        b.iter(|| {
            convolution_output(
                algorithm,
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
        })
    });

    let mut required = 0usize;
    convolution_output(
        algorithm,
        &config,
        &input,
        &kernel,
        &bias,
        &mut output,
        Workspace::Query(&mut required),
        None,
        None,
    )
    .unwrap();
    let mut workspace = AlignedBuffer::new(required).unwrap();
    group.bench_function("reused_buffer", |b| {
        b.iter(|| {
            convolution_output(
                algorithm,
                &config,
                &input,
                &kernel,
                &bias,
                &mut output,
                Workspace::Supplied(workspace.as_mut_slice()),
                None,
                None,
            )
            .unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_algorithms, bench_workspace_modes);
criterion_main!(benches);
