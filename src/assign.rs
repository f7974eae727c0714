//! The assignment engine: evaluate an expression into a destination
//! container, resizing it and staging through a temporary when the
//! destination also appears inside the expression.

use num_traits::Zero;

use crate::array::Array;
use crate::dims::{Dims, DynDims};
use crate::expr::{Expression, LeafId};
use crate::iter::ExprIter;
use crate::stepper::{BufferStepperMut, Stepper};
use crate::{Result, ShapeError};

/// A container the engine can write an expression into.
pub trait AssignTarget {
    type Elem: Copy;

    /// Current shape extents.
    fn target_shape(&self) -> &[usize];

    /// Buffer identity, matched against [`Expression::contains_leaf`].
    fn leaf_id(&self) -> LeafId;

    /// Adopt a new shape, reallocating as needed. Fails when the shape does
    /// not fit the container's rank representation.
    fn resize(&mut self, shape: &[usize]) -> std::result::Result<(), ShapeError>;

    /// Write cursor over the container's buffer.
    fn target_stepper(&mut self) -> BufferStepperMut<'_, Self::Elem>;
}

impl<T: Copy + Zero, D: Dims> AssignTarget for Array<T, D> {
    type Elem = T;

    #[inline]
    fn target_shape(&self) -> &[usize] {
        self.shape()
    }

    #[inline]
    fn leaf_id(&self) -> LeafId {
        Array::leaf_id(self)
    }

    fn resize(&mut self, shape: &[usize]) -> std::result::Result<(), ShapeError> {
        self.reshape_to(shape)
    }

    fn target_stepper(&mut self) -> BufferStepperMut<'_, T> {
        self.stepper_mut()
    }
}

/// Assign `src` into `dest`, resizing `dest` to the expression's shape.
///
/// All element reads happen before the corresponding write, so overlapping
/// source and destination positions see pre-assignment values. When the
/// destination's buffer appears in the expression *and* a resize is needed,
/// the expression is materialized into a temporary first; otherwise the
/// stepper-to-stepper path runs, which is already read-before-write at each
/// position.
///
/// The overlap check is by buffer identity, so it is conservative: any
/// occurrence of the destination's buffer in the expression counts, even at
/// positions that never collide.
pub fn assign<A, E>(dest: &mut A, src: &E) -> Result<()>
where
    A: AssignTarget,
    E: Expression<Elem = A::Elem>,
{
    let shape = DynDims::from(src.shape());
    let needs_resize = dest.target_shape() != shape.as_ref();
    if needs_resize && src.contains_leaf(dest.leaf_id()) {
        // Resizing may reallocate the aliased buffer, so drain the
        // expression before touching the destination.
        let values: Vec<A::Elem> = ExprIter::new(src).collect();
        let tmp = Array::<A::Elem, DynDims>::from_vec(shape.clone(), values)
            .expect("expression yields exactly its shape's element count");
        dest.resize(shape.as_ref())?;
        copy_expression(dest, &tmp, shape.as_ref());
        return Ok(());
    }
    if needs_resize {
        dest.resize(shape.as_ref())?;
    }
    copy_expression(dest, src, shape.as_ref());
    Ok(())
}

/// [`assign`] without the aliasing check.
///
/// The caller asserts that the destination's buffer does not appear in the
/// expression; the direct stepper-to-stepper path always runs.
pub fn assign_no_alias<A, E>(dest: &mut A, src: &E) -> Result<()>
where
    A: AssignTarget,
    E: Expression<Elem = A::Elem>,
{
    let shape = DynDims::from(src.shape());
    if dest.target_shape() != shape.as_ref() {
        dest.resize(shape.as_ref())?;
    }
    copy_expression(dest, src, shape.as_ref());
    Ok(())
}

/// Walk source and destination steppers in row-major lockstep, writing every
/// element once. The destination's shape must already equal `shape`.
fn copy_expression<A, E>(dest: &mut A, src: &E, shape: &[usize])
where
    A: AssignTarget,
    E: Expression<Elem = A::Elem>,
{
    debug_assert_eq!(dest.target_shape(), shape);
    let total: usize = shape.iter().product();
    if total == 0 {
        return;
    }
    let rank = shape.len();
    let mut src_st = src.stepper(rank);
    let mut dst_st = dest.target_stepper();
    let mut index = DynDims::zeros(rank);
    let mut written = 0;
    loop {
        dst_st.put(src_st.value());
        written += 1;
        if written == total {
            return;
        }
        // Row-major odometer over both cursors at once.
        for d in (0..rank).rev() {
            index[d] += 1;
            if index[d] != shape[d] {
                src_st.step(d, 1);
                dst_st.step(d, 1);
                break;
            }
            index[d] = 0;
            src_st.reset(d);
            dst_st.reset(d);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::zip_map;

    fn iota(shape: &[usize]) -> Array<f64, DynDims> {
        let mut n = 0.0;
        Array::from_shape_fn(DynDims::from(shape), |_| {
            n += 1.0;
            n
        })
    }

    #[test]
    fn test_assign_resizes_dest() {
        let a = iota(&[2, 3]);
        let mut out = Array::<f64, DynDims>::zeros([1]);
        assign(&mut out, &a.expr()).unwrap();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.as_slice(), a.as_slice());
    }

    #[test]
    fn test_assign_broadcast_expression() {
        let a = iota(&[2, 1]); // column [1, 2]
        let b = iota(&[3]); // row [1, 2, 3]
        let sum = zip_map(&a, &b, |x, y| x + y).unwrap();
        let mut out = Array::<f64, DynDims>::zeros([2, 3]);
        assign(&mut out, &sum).unwrap();
        assert_eq!(out.as_slice(), &[2.0, 3.0, 4.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_assign_rank_mismatch_fixed_dest() {
        let a = iota(&[2, 3]);
        let mut out = Array::<f64, [usize; 3]>::zeros([1, 1, 1]);
        assert!(assign(&mut out, &a.expr()).is_err());
    }

    #[test]
    fn test_assign_aliased_same_shape_in_place() {
        // b = b + b: shapes match, so no temporary is needed and the
        // read-before-write walk still sees consistent values.
        let mut b = iota(&[2, 2]);
        let view = unsafe { b.raw_view() };
        let doubled = zip_map(view.clone(), view, |x, y| x + y).unwrap();
        assign(&mut b, &doubled).unwrap();
        assert_eq!(b.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_assign_aliased_resize_stages_temporary() {
        // b starts (2, 4); a is (3, 2, 4); b = a + b grows b to (3, 2, 4).
        let a = iota(&[3, 2, 4]);
        let mut b = iota(&[2, 4]);
        let expected: Vec<f64> = {
            let b_snapshot = b.clone();
            zip_map(&a, &b_snapshot, |x, y| x + y)
                .unwrap()
                .values()
                .collect()
        };
        let view = unsafe { b.raw_view() };
        let sum = zip_map(&a, view, |x, y| x + y).unwrap();
        assign(&mut b, &sum).unwrap();
        assert_eq!(b.shape(), &[3, 2, 4]);
        assert_eq!(b.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_assign_no_alias_matches_assign() {
        let a = iota(&[4, 5]);
        let b = iota(&[5]);
        let sum = zip_map(&a, &b, |x, y| x + y).unwrap();
        let mut via_assign = Array::<f64, DynDims>::zeros([4, 5]);
        let mut via_no_alias = Array::<f64, DynDims>::zeros([4, 5]);
        assign(&mut via_assign, &sum).unwrap();
        assign_no_alias(&mut via_no_alias, &sum).unwrap();
        assert_eq!(via_assign, via_no_alias);
    }

    #[test]
    fn test_assign_empty_expression() {
        let a = Array::<f64, DynDims>::zeros([2, 0, 3]);
        let mut out = Array::<f64, DynDims>::zeros([4]);
        assign(&mut out, &a.expr()).unwrap();
        assert_eq!(out.shape(), &[2, 0, 3]);
        assert!(out.is_empty());
    }
}
