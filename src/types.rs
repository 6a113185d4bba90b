//! Shape descriptors and per-operation configuration.

/// Width/height of an image, kernel, or tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: usize,
    pub height: usize,
}

impl Size {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Element count of a `width x height` plane.
    #[inline]
    pub const fn elements(&self) -> usize {
        self.width * self.height
    }

    #[inline]
    pub const fn max_extent(&self) -> usize {
        if self.width > self.height {
            self.width
        } else {
            self.height
        }
    }
}

/// Implicit zero padding around an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub left: usize,
}

impl Padding {
    pub const fn uniform(pad: usize) -> Self {
        Self {
            top: pad,
            right: pad,
            bottom: pad,
            left: pad,
        }
    }
}

/// Activation fused into the output transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activation {
    #[default]
    Identity,
    Relu,
}

/// Convolution strategy. `Auto` defers the choice to the runtime selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Auto,
    /// Fourier transform with 8x8 tiles; kernels up to 8x8.
    Ft8x8,
    /// Fourier transform with 16x16 tiles; kernels up to 16x16.
    Ft16x16,
    /// Winograd F(6x6, 3x3) with 8x8 tiles; 3x3 kernels only.
    Wt8x8,
    /// Direct convolution via implicit GEMM (no transform-pipeline path).
    ImplicitGemm,
    /// Direct convolution (no transform-pipeline path).
    Direct,
}

/// Shape parameters of one convolution call. Tensors are NCHW f32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvolutionConfig {
    pub batch_size: usize,
    pub input_channels: usize,
    pub output_channels: usize,
    pub input_size: Size,
    pub input_padding: Padding,
    pub kernel_size: Size,
    pub activation: Activation,
}

impl ConvolutionConfig {
    /// Output extent: `padding + input - kernel + 1` per dimension.
    /// Only meaningful after validation (padded input >= kernel).
    #[inline]
    pub fn output_size(&self) -> Size {
        Size {
            width: self.input_padding.left + self.input_size.width + self.input_padding.right
                - self.kernel_size.width
                + 1,
            height: self.input_padding.top + self.input_size.height + self.input_padding.bottom
                - self.kernel_size.height
                + 1,
        }
    }
}
