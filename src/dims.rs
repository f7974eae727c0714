//! Shape representations: fixed rank vs dynamic rank.
//!
//! A shape is an ordered sequence of non-negative extents. Rank can be known
//! when the expression type is formed (`[usize; N]`) or only at runtime
//! ([`DynDims`]). Both satisfy [`Dims`], and [`BroadcastDims`] encodes how
//! dynamic-ness propagates when two shapes are combined: the result is
//! fixed-rank only when both operands are fixed-rank of equal rank.

use smallvec::SmallVec;
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::ShapeError;

/// Inline capacity for dynamic-rank shapes; ranks up to this stay off the
/// heap.
pub(crate) const INLINE_RANK: usize = 4;

/// An ordered sequence of dimension extents.
///
/// Implemented by `[usize; N]` (fixed rank) and [`DynDims`] (dynamic rank).
/// Extent 0 is valid and marks an empty axis; rank 0 is a scalar shape.
pub trait Dims: Clone + fmt::Debug + PartialEq + AsRef<[usize]> + AsMut<[usize]> {
    /// Rank if known at compile time, `None` for dynamic rank.
    const RANK: Option<usize>;

    /// An all-zero shape of the given rank.
    ///
    /// # Panics
    /// Panics for fixed-rank shapes if `rank` differs from the const rank.
    fn zeros(rank: usize) -> Self;

    /// Build from a slice of extents.
    ///
    /// Fails with [`ShapeError::RankMismatch`] when the slice length differs
    /// from a fixed const rank.
    fn from_slice(dims: &[usize]) -> Result<Self, ShapeError>;

    /// Number of dimensions.
    #[inline]
    fn rank(&self) -> usize {
        self.as_ref().len()
    }

    /// Total number of elements (product of extents; 1 for rank 0).
    #[inline]
    fn size(&self) -> usize {
        self.as_ref().iter().product()
    }

    /// Forget compile-time rank information.
    #[inline]
    fn into_dyn(self) -> DynDims {
        DynDims::from(self.as_ref())
    }
}

impl<const N: usize> Dims for [usize; N] {
    const RANK: Option<usize> = Some(N);

    #[inline]
    fn zeros(rank: usize) -> Self {
        assert_eq!(rank, N, "fixed-rank shape built with wrong rank");
        [0; N]
    }

    #[inline]
    fn from_slice(dims: &[usize]) -> Result<Self, ShapeError> {
        <[usize; N]>::try_from(dims).map_err(|_| ShapeError::RankMismatch {
            expected: N,
            got: dims.len(),
        })
    }
}

/// A dynamic-rank shape.
///
/// Backed by a [`SmallVec`], so the common low ranks are stack-resident and
/// only unusually deep shapes spill to the heap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct DynDims(SmallVec<[usize; INLINE_RANK]>);

impl DynDims {
    /// The rank-0 (scalar) shape.
    #[inline]
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Total number of elements.
    #[inline]
    pub fn size(&self) -> usize {
        self.0.iter().product()
    }

    /// Extents as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }
}

impl Dims for DynDims {
    const RANK: Option<usize> = None;

    #[inline]
    fn zeros(rank: usize) -> Self {
        Self(smallvec::smallvec![0; rank])
    }

    #[inline]
    fn from_slice(dims: &[usize]) -> Result<Self, ShapeError> {
        Ok(Self(SmallVec::from_slice(dims)))
    }

    #[inline]
    fn into_dyn(self) -> DynDims {
        self
    }
}

impl AsRef<[usize]> for DynDims {
    #[inline]
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl AsMut<[usize]> for DynDims {
    #[inline]
    fn as_mut(&mut self) -> &mut [usize] {
        &mut self.0
    }
}

impl From<&[usize]> for DynDims {
    #[inline]
    fn from(dims: &[usize]) -> Self {
        Self(SmallVec::from_slice(dims))
    }
}

impl<const N: usize> From<[usize; N]> for DynDims {
    #[inline]
    fn from(dims: [usize; N]) -> Self {
        Self(SmallVec::from_slice(&dims))
    }
}

impl From<Vec<usize>> for DynDims {
    #[inline]
    fn from(dims: Vec<usize>) -> Self {
        Self(SmallVec::from_vec(dims))
    }
}

impl FromIterator<usize> for DynDims {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Index<usize> for DynDims {
    type Output = usize;

    #[inline]
    fn index(&self, dim: usize) -> &usize {
        &self.0[dim]
    }
}

impl IndexMut<usize> for DynDims {
    #[inline]
    fn index_mut(&mut self, dim: usize) -> &mut usize {
        &mut self.0[dim]
    }
}

// ============================================================================
// Rank propagation for broadcasting
// ============================================================================

/// Result rank representation when broadcasting `Self` against `Rhs`.
///
/// Dynamic-ness is contagious: any dynamic operand makes the output dynamic.
/// Two fixed-rank operands keep a fixed output only when their ranks are
/// equal; mixed fixed ranks have no impl and one side must go through
/// [`Dims::into_dyn`] first.
pub trait BroadcastDims<Rhs: Dims>: Dims {
    type Output: Dims;
}

impl<const N: usize> BroadcastDims<[usize; N]> for [usize; N] {
    type Output = [usize; N];
}

impl<const N: usize> BroadcastDims<DynDims> for [usize; N] {
    type Output = DynDims;
}

impl<D: Dims> BroadcastDims<D> for DynDims {
    type Output = DynDims;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_from_slice() {
        let d = <[usize; 3]>::from_slice(&[4, 2, 3]).unwrap();
        assert_eq!(d, [4, 2, 3]);
        assert_eq!(d.rank(), 3);
        assert_eq!(d.size(), 24);

        let err = <[usize; 2]>::from_slice(&[4, 2, 3]).unwrap_err();
        assert_eq!(err, ShapeError::RankMismatch { expected: 2, got: 3 });
    }

    #[test]
    fn test_dyn_roundtrip() {
        let d = DynDims::from([2, 3]);
        assert_eq!(d.as_ref(), &[2, 3]);
        assert_eq!(d.rank(), 2);
        assert_eq!(d.size(), 6);
        assert_eq!([2usize, 3].into_dyn(), d);
    }

    #[test]
    fn test_scalar_shape_size() {
        let d = DynDims::new();
        assert_eq!(d.rank(), 0);
        assert_eq!(d.size(), 1);
        assert_eq!(<[usize; 0]>::zeros(0).size(), 1);
    }

    #[test]
    fn test_zeros() {
        assert_eq!(DynDims::zeros(3).as_ref(), &[0, 0, 0]);
        assert_eq!(<[usize; 2]>::zeros(2), [0, 0]);
    }
}
