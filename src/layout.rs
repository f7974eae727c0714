//! Strided layout: the linear-offset mapping of a contiguous buffer.
//!
//! A [`Layout`] pairs a shape with strides (elements to skip per step along
//! each dimension) and backstrides (the offset a dimension unwinds when its
//! index wraps from the last position back to 0). Strides are derived from a
//! memory [`Order`] or given explicitly; bounds are validated once against a
//! buffer span, never per index.

use crate::dims::{Dims, DynDims};
use crate::{IndexError, ShapeError};

/// Memory order of a contiguous buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    /// Last dimension varies fastest (C order). The default.
    #[default]
    RowMajor,
    /// First dimension varies fastest (Fortran order).
    ColMajor,
}

/// Shape, strides and backstrides of a strided contiguous buffer.
///
/// Row-major invariants: `strides[last] == 1` and
/// `strides[i] == strides[i + 1] * shape[i + 1]`; column-major is the
/// mirror-image rule from the first dimension. For every layout,
/// `backstrides[i] == strides[i] * (shape[i] - 1)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout<D: Dims> {
    shape: D,
    strides: D,
    backstrides: D,
    order: Order,
}

impl<D: Dims> Layout<D> {
    /// Layout of a contiguous buffer in the given memory order.
    pub fn new(shape: D, order: Order) -> Self {
        let strides = compute_strides(&shape, order);
        let backstrides = compute_backstrides(&shape, &strides);
        Self {
            shape,
            strides,
            backstrides,
            order,
        }
    }

    /// Row-major layout (the default when unspecified).
    #[inline]
    pub fn row_major(shape: D) -> Self {
        Self::new(shape, Order::RowMajor)
    }

    /// Column-major layout.
    #[inline]
    pub fn col_major(shape: D) -> Self {
        Self::new(shape, Order::ColMajor)
    }

    /// Layout with explicit strides.
    ///
    /// Fails with [`ShapeError::StrideLengthMismatch`] when the strides
    /// sequence has a different length than the shape. The declared order of
    /// such a layout is row-major for the purpose of later reshapes.
    pub fn with_strides(shape: D, strides: D) -> Result<Self, ShapeError> {
        if shape.rank() != strides.as_ref().len() {
            return Err(ShapeError::StrideLengthMismatch {
                dims: shape.rank(),
                strides: strides.as_ref().len(),
            });
        }
        let backstrides = compute_backstrides(&shape, &strides);
        Ok(Self {
            shape,
            strides,
            backstrides,
            order: Order::RowMajor,
        })
    }

    /// Shape extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.shape.as_ref()
    }

    /// The shape in its rank representation.
    #[inline]
    pub fn dims(&self) -> &D {
        &self.shape
    }

    /// Per-dimension element strides.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        self.strides.as_ref()
    }

    /// Per-dimension wraparound offsets, `strides[i] * (shape[i] - 1)`.
    #[inline]
    pub fn backstrides(&self) -> &[usize] {
        self.backstrides.as_ref()
    }

    /// Declared memory order.
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    /// Total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// Re-express the same geometry with a runtime-sized rank.
    pub fn into_dyn(self) -> Layout<DynDims> {
        Layout {
            shape: self.shape.into_dyn(),
            strides: self.strides.into_dyn(),
            backstrides: self.backstrides.into_dyn(),
            order: self.order,
        }
    }

    /// One past the largest linear offset this layout can touch; 0 for empty
    /// shapes.
    pub fn required_span(&self) -> usize {
        if self.size() == 0 {
            return 0;
        }
        let mut span = 1;
        for (&dim, &stride) in self.shape().iter().zip(self.strides()) {
            span += stride * (dim - 1);
        }
        span
    }

    /// Check that every strided access stays inside a buffer of `len`
    /// elements.
    pub fn validate_span(&self, len: usize) -> Result<(), ShapeError> {
        let span = self.required_span();
        if span > len {
            return Err(ShapeError::OutOfBounds { span, len });
        }
        Ok(())
    }

    /// Linear offset of a full-rank multi-index.
    #[inline]
    pub fn offset_of(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.rank());
        index
            .iter()
            .zip(self.strides())
            .map(|(&i, &s)| i * s)
            .sum()
    }

    /// Linear offset with rank and range checks.
    pub fn offset_checked(&self, index: &[usize]) -> Result<usize, IndexError> {
        if index.len() != self.rank() {
            return Err(IndexError::RankMismatch {
                expected: self.rank(),
                got: index.len(),
            });
        }
        for (dim, (&i, &extent)) in index.iter().zip(self.shape()).enumerate() {
            if i >= extent {
                return Err(IndexError::OutOfRange {
                    dim,
                    index: i,
                    extent,
                });
            }
        }
        Ok(self.offset_of(index))
    }

    /// Linear offset of a broadcast multi-index.
    ///
    /// The index may be longer than this layout's rank (leading broadcast
    /// dimensions are ignored) and extent-1 dimensions are pinned to 0, so a
    /// stepped-past position on a repeated axis still reads the single
    /// backing element.
    #[inline]
    pub fn broadcast_offset(&self, index: &[usize]) -> usize {
        debug_assert!(index.len() >= self.rank());
        let skip = index.len() - self.rank();
        let mut offset = 0;
        for (d, (&extent, &stride)) in self.shape().iter().zip(self.strides()).enumerate() {
            let i = if extent == 1 { 0 } else { index[skip + d] };
            debug_assert!(i < extent);
            offset += i * stride;
        }
        offset
    }
}

fn compute_strides<D: Dims>(shape: &D, order: Order) -> D {
    let rank = shape.rank();
    let mut strides = D::zeros(rank);
    if rank == 0 {
        return strides;
    }
    let dims = shape.as_ref();
    let s = strides.as_mut();
    match order {
        Order::RowMajor => {
            s[rank - 1] = 1;
            for i in (0..rank - 1).rev() {
                s[i] = s[i + 1] * dims[i + 1];
            }
        }
        Order::ColMajor => {
            s[0] = 1;
            for i in 1..rank {
                s[i] = s[i - 1] * dims[i - 1];
            }
        }
    }
    strides
}

fn compute_backstrides<D: Dims>(shape: &D, strides: &D) -> D {
    let mut backstrides = D::zeros(shape.rank());
    for ((b, &dim), &stride) in backstrides
        .as_mut()
        .iter_mut()
        .zip(shape.as_ref())
        .zip(strides.as_ref())
    {
        *b = stride * dim.saturating_sub(1);
    }
    backstrides
}
