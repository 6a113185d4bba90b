//! Workspace sizing and the transform-buffer arena.
//!
//! One contiguous 64-byte-aligned scratch allocation holds the three
//! transform arrays, in the fixed order input-transform, output-transform,
//! kernel-transform. The arena either owns an internal allocation (released
//! at call exit) or borrows a caller-supplied buffer (never released), and
//! hands out [`Region`]s with strided tuple accessors validated against the
//! computed extents.

use std::marker::PhantomData;

use crate::aligned::AlignedBuffer;
use crate::error::Error;

/// Caller's choice of workspace handling for one call.
pub enum Workspace<'a> {
    /// Allocate internally and release at call exit.
    Compute,
    /// Write the required byte size and perform no computation.
    Query(&'a mut usize),
    /// Use the supplied buffer; it must be 64-byte aligned and large enough.
    Supplied(&'a mut [u8]),
}

/// Transform-array extents for one call, in f32 elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ArenaSizes {
    pub input_elements: usize,
    pub output_elements: usize,
    pub kernel_elements: usize,
}

impl ArenaSizes {
    pub fn new(
        batch_size: usize,
        input_channels: usize,
        output_channels: usize,
        tile_elements: usize,
    ) -> Self {
        Self {
            input_elements: batch_size * input_channels * tile_elements,
            output_elements: batch_size * output_channels * tile_elements,
            kernel_elements: output_channels * input_channels * tile_elements,
        }
    }

    /// Total scratch requirement in bytes.
    pub fn bytes(&self) -> usize {
        (self.input_elements + self.output_elements + self.kernel_elements)
            * std::mem::size_of::<f32>()
    }
}

/// A transform array inside the arena.
///
/// Copyable raw view shared by all workers of a dispatch; callers write
/// disjoint entry ranges by construction of the channel-blocked layout, so
/// no synchronization exists here.
#[derive(Clone, Copy)]
pub(crate) struct Region {
    ptr: *mut f32,
    len: usize,
}

unsafe impl Send for Region {}
unsafe impl Sync for Region {}

impl Region {
    /// Scatter `local` (tuple-contiguous) into the region: tuple `t` lands
    /// at `entry + t * plane_stride`.
    pub fn write_tuples(
        &self,
        entry: usize,
        plane_stride: usize,
        tuple_elements: usize,
        local: &[f32],
    ) {
        let tuples = local.len() / tuple_elements;
        debug_assert_eq!(local.len() % tuple_elements, 0);
        debug_assert!(tuples > 0);
        debug_assert!(entry + (tuples - 1) * plane_stride + tuple_elements <= self.len);
        for t in 0..tuples {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    local.as_ptr().add(t * tuple_elements),
                    self.ptr.add(entry + t * plane_stride),
                    tuple_elements,
                );
            }
        }
    }

    /// Gather strided tuples back into `local`.
    pub fn read_tuples(
        &self,
        entry: usize,
        plane_stride: usize,
        tuple_elements: usize,
        local: &mut [f32],
    ) {
        let tuples = local.len() / tuple_elements;
        debug_assert_eq!(local.len() % tuple_elements, 0);
        debug_assert!(tuples > 0);
        debug_assert!(entry + (tuples - 1) * plane_stride + tuple_elements <= self.len);
        for t in 0..tuples {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.ptr.add(entry + t * plane_stride),
                    local.as_mut_ptr().add(t * tuple_elements),
                    tuple_elements,
                );
            }
        }
    }

    /// Raw pointer at an element offset, for the GEMM operand views.
    #[inline]
    pub fn ptr_at(&self, offset: usize) -> *const f32 {
        debug_assert!(offset <= self.len);
        unsafe { self.ptr.add(offset) }
    }

    #[inline]
    pub fn ptr_at_mut(&self, offset: usize) -> *mut f32 {
        debug_assert!(offset <= self.len);
        unsafe { self.ptr.add(offset) }
    }
}

enum Backing<'a> {
    Owned(AlignedBuffer),
    Borrowed {
        ptr: *mut f32,
        _marker: PhantomData<&'a mut [u8]>,
    },
}

/// The three transform arrays carved from one scratch allocation.
pub(crate) struct TransformArena<'a> {
    backing: Backing<'a>,
    sizes: ArenaSizes,
}

/// Outcome of workspace resolution.
pub(crate) enum Obtained<'a> {
    /// Size-query mode: the requirement was reported, nothing to compute.
    SizeQueryDone,
    Ready(TransformArena<'a>),
}

impl<'a> TransformArena<'a> {
    /// Resolve the caller's workspace mode against the computed requirement.
    pub fn obtain(workspace: Workspace<'a>, sizes: ArenaSizes) -> Result<Obtained<'a>, Error> {
        let required = sizes.bytes();
        match workspace {
            Workspace::Query(out) => {
                *out = required;
                log::debug!("workspace query: {required} bytes");
                Ok(Obtained::SizeQueryDone)
            }
            Workspace::Compute => {
                let buffer = AlignedBuffer::new(required)?;
                Ok(Obtained::Ready(Self {
                    backing: Backing::Owned(buffer),
                    sizes,
                }))
            }
            Workspace::Supplied(buf) => {
                if buf.as_ptr() as usize % AlignedBuffer::ALIGN != 0 {
                    return Err(Error::MisalignedBuffer);
                }
                if buf.len() < required {
                    return Err(Error::InsufficientBuffer {
                        required,
                        provided: buf.len(),
                    });
                }
                Ok(Obtained::Ready(Self {
                    backing: Backing::Borrowed {
                        ptr: buf.as_mut_ptr() as *mut f32,
                        _marker: PhantomData,
                    },
                    sizes,
                }))
            }
        }
    }

    #[inline]
    fn base(&self) -> *mut f32 {
        match &self.backing {
            Backing::Owned(buffer) => buffer.as_ptr() as *mut f32,
            Backing::Borrowed { ptr, .. } => *ptr,
        }
    }

    pub fn input_region(&self) -> Region {
        Region {
            ptr: self.base(),
            len: self.sizes.input_elements,
        }
    }

    pub fn output_region(&self) -> Region {
        Region {
            ptr: unsafe { self.base().add(self.sizes.input_elements) },
            len: self.sizes.output_elements,
        }
    }

    pub fn kernel_region(&self) -> Region {
        Region {
            ptr: unsafe {
                self.base()
                    .add(self.sizes.input_elements + self.sizes.output_elements)
            },
            len: self.sizes.kernel_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizes() -> ArenaSizes {
        ArenaSizes::new(2, 3, 4, 64)
    }

    #[test]
    fn test_byte_requirement() {
        let s = sizes();
        assert_eq!(s.input_elements, 2 * 3 * 64);
        assert_eq!(s.output_elements, 2 * 4 * 64);
        assert_eq!(s.kernel_elements, 4 * 3 * 64);
        assert_eq!(s.bytes(), (384 + 512 + 768) * 4);
    }

    #[test]
    fn test_query_mode_reports_and_skips() {
        let mut reported = 0usize;
        match TransformArena::obtain(Workspace::Query(&mut reported), sizes()).unwrap() {
            Obtained::SizeQueryDone => {}
            Obtained::Ready(_) => panic!("query mode must not build an arena"),
        }
        assert_eq!(reported, sizes().bytes());
    }

    #[test]
    fn test_supplied_buffer_too_small() {
        let mut buffer = AlignedBuffer::new(sizes().bytes() - 1).unwrap();
        let result = TransformArena::obtain(Workspace::Supplied(buffer.as_mut_slice()), sizes());
        assert_eq!(
            result.err().map(|e| matches!(e, Error::InsufficientBuffer { .. })),
            Some(true)
        );
    }

    #[test]
    fn test_supplied_buffer_misaligned() {
        let mut buffer = AlignedBuffer::new(sizes().bytes() + 64).unwrap();
        let slice = &mut buffer.as_mut_slice()[4..];
        let result = TransformArena::obtain(Workspace::Supplied(slice), sizes());
        assert_eq!(result.err(), Some(Error::MisalignedBuffer));
    }

    #[test]
    fn test_supplied_exact_size_succeeds() {
        let mut buffer = AlignedBuffer::new(sizes().bytes()).unwrap();
        assert!(matches!(
            TransformArena::obtain(Workspace::Supplied(buffer.as_mut_slice()), sizes()),
            Ok(Obtained::Ready(_))
        ));
    }

    #[test]
    fn test_region_scatter_gather_roundtrip() {
        let arena = match TransformArena::obtain(Workspace::Compute, sizes()).unwrap() {
            Obtained::Ready(arena) => arena,
            Obtained::SizeQueryDone => unreachable!(),
        };
        let region = arena.kernel_region();
        let tuple_elements = 4;
        let plane_stride = 3 * 4 * tuple_elements;
        let local: Vec<f32> = (0..64).map(|i| i as f32).collect();
        region.write_tuples(8, plane_stride, tuple_elements, &local);
        let mut back = vec![0.0f32; 64];
        region.read_tuples(8, plane_stride, tuple_elements, &mut back);
        assert_eq!(local, back);
    }
}
