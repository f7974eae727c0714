//! Shape broadcasting: the common iteration shape of a set of operands.
//!
//! Operand shapes are right-aligned; shorter shapes are padded at the front
//! with implicit extent-1 dimensions (a rank-0 scalar pads entirely). Per
//! aligned dimension, extent 1 imposes no constraint and every other extent
//! must agree; the output extent is the agreed one. Rank propagation at the
//! type level lives in [`BroadcastDims`]: any dynamic-rank operand makes the
//! result dynamic-rank.

use crate::dims::{BroadcastDims, Dims, DynDims};
use crate::BroadcastError;

/// Compute the broadcast shape of a set of operand shapes.
///
/// The output rank is the maximum operand rank. Fails with
/// [`BroadcastError`] when two operands pin the same aligned dimension to
/// different extents (extent 0 counts as pinned: an empty axis only
/// broadcasts against extents 0 and 1).
///
/// # Example
/// ```
/// use ndexpr::broadcast_shapes;
///
/// let out = broadcast_shapes(&[&[2, 3], &[4, 2, 1]]).unwrap();
/// assert_eq!(out.as_ref(), &[4, 2, 3]);
/// assert!(broadcast_shapes(&[&[2, 3], &[4, 3, 2]]).is_err());
/// ```
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<DynDims, BroadcastError> {
    let rank = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = DynDims::zeros(rank);
    out.as_mut().fill(1);
    for shape in shapes {
        let pad = rank - shape.len();
        for (d, &extent) in shape.iter().enumerate() {
            if extent == 1 {
                continue;
            }
            let slot = &mut out.as_mut()[pad + d];
            if *slot == 1 {
                *slot = extent;
            } else if *slot != extent {
                return Err(BroadcastError {
                    dim: pad + d,
                    lhs: *slot,
                    rhs: extent,
                });
            }
        }
    }
    Ok(out)
}

/// Broadcast two shapes, keeping the cheapest rank representation the type
/// system allows.
///
/// The output is fixed-rank exactly when both inputs are fixed-rank of equal
/// rank; every other combination yields [`DynDims`].
pub fn co_broadcast<D1, D2>(
    lhs: &D1,
    rhs: &D2,
) -> Result<<D1 as BroadcastDims<D2>>::Output, BroadcastError>
where
    D1: BroadcastDims<D2>,
    D2: Dims,
{
    let out = broadcast_shapes(&[lhs.as_ref(), rhs.as_ref()])?;
    // The output rank equals the max input rank, which matches the fixed
    // output rank whenever one exists.
    Ok(<D1 as BroadcastDims<D2>>::Output::from_slice(out.as_ref())
        .expect("broadcast rank matches the output representation"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_extension() {
        let out = broadcast_shapes(&[&[2, 3], &[4, 2, 3]]).unwrap();
        assert_eq!(out.as_ref(), &[4, 2, 3]);
    }

    #[test]
    fn test_extent_one_stretches() {
        let out = broadcast_shapes(&[&[2, 3], &[4, 2, 1]]).unwrap();
        assert_eq!(out.as_ref(), &[4, 2, 3]);
    }

    #[test]
    fn test_incompatible() {
        let err = broadcast_shapes(&[&[2, 3], &[4, 3, 2]]).unwrap_err();
        assert_eq!(err, BroadcastError { dim: 1, lhs: 2, rhs: 3 });
    }

    #[test]
    fn test_scalar_contributes_nothing() {
        let out = broadcast_shapes(&[&[], &[5, 2]]).unwrap();
        assert_eq!(out.as_ref(), &[5, 2]);
        let out = broadcast_shapes(&[&[], &[]]).unwrap();
        assert_eq!(out.rank(), 0);
    }

    #[test]
    fn test_no_operands() {
        assert_eq!(broadcast_shapes(&[]).unwrap().rank(), 0);
    }

    #[test]
    fn test_empty_axis() {
        let out = broadcast_shapes(&[&[0, 3], &[1, 3]]).unwrap();
        assert_eq!(out.as_ref(), &[0, 3]);
        // An empty axis does not broadcast against a populated one.
        assert!(broadcast_shapes(&[&[0, 3], &[2, 3]]).is_err());
    }

    #[test]
    fn test_co_broadcast_fixed() {
        let out = co_broadcast(&[2usize, 1], &[1usize, 3]).unwrap();
        assert_eq!(out, [2, 3]);
    }

    #[test]
    fn test_co_broadcast_dynamic_contagion() {
        let out = co_broadcast(&[2usize, 3], &DynDims::from([4, 2, 3])).unwrap();
        assert_eq!(out.as_ref(), &[4, 2, 3]);
    }
}
