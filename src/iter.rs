//! Row-major traversal: the odometer that advances a [`Stepper`] and the
//! lazy iterator built on top of it.

use crate::dims::{Dims, DynDims};
use crate::expr::Expression;
use crate::stepper::Stepper;

/// Advance `stepper` and `index` to the next row-major position within
/// `shape`.
///
/// Dimensions are scanned innermost first. A component that stays below its
/// extent after incrementing produces one `step(dim, 1)` and the scan stops.
/// A component that reaches its extent is zeroed and the stepper `reset` on
/// that dimension, carrying into the next-outer dimension. When the
/// outermost dimension carries too, the traversal is exhausted and the
/// stepper is parked at its end sentinel.
///
/// Rank-0 shapes hold a single element, so any advance exhausts them, and a
/// shape with an extent-0 dimension holds none, so the stepper goes straight
/// to the sentinel.
pub fn increment_stepper<S: Stepper>(stepper: &mut S, index: &mut [usize], shape: &[usize]) {
    debug_assert_eq!(index.len(), shape.len());
    if shape.contains(&0) {
        stepper.to_end();
        return;
    }
    for d in (0..shape.len()).rev() {
        index[d] += 1;
        if index[d] != shape[d] {
            stepper.step(d, 1);
            return;
        }
        index[d] = 0;
        stepper.reset(d);
    }
    stepper.to_end();
}

/// Lazy row-major iterator over every broadcast position of an expression.
///
/// Elements are computed on demand; the expression is never materialized.
pub struct ExprIter<'a, E: Expression + 'a> {
    stepper: E::Stepper<'a>,
    index: DynDims,
    shape: DynDims,
    remaining: usize,
}

impl<'a, E: Expression + 'a> ExprIter<'a, E> {
    pub fn new(expr: &'a E) -> Self {
        let shape = DynDims::from(expr.shape());
        let remaining = shape.size();
        Self {
            stepper: expr.stepper(shape.rank()),
            index: DynDims::zeros(shape.rank()),
            shape,
            remaining,
        }
    }
}

impl<'a, E: Expression + 'a> Iterator for ExprIter<'a, E> {
    type Item = E::Elem;

    fn next(&mut self) -> Option<E::Elem> {
        if self.remaining == 0 {
            return None;
        }
        let value = self.stepper.value();
        self.remaining -= 1;
        if self.remaining == 0 {
            self.stepper.to_end();
        } else {
            increment_stepper(&mut self.stepper, self.index.as_mut(), self.shape.as_ref());
        }
        Some(value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, E: Expression + 'a> ExactSizeIterator for ExprIter<'a, E> {}

impl<'a, E: Expression + 'a> std::iter::FusedIterator for ExprIter<'a, E> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::dims::DynDims;
    use crate::layout::Layout;
    use crate::stepper::BufferStepper;

    #[test]
    fn test_odometer_visits_row_major() {
        let layout = Layout::<DynDims>::row_major([2, 3].into());
        let data = [10, 11, 12, 20, 21, 22];
        let mut stepper = BufferStepper::new(&data, &layout, 2);
        let mut index = [0usize, 0];
        let mut seen = vec![stepper.value()];
        for _ in 0..5 {
            increment_stepper(&mut stepper, &mut index, &[2, 3]);
            seen.push(stepper.value());
        }
        assert_eq!(seen, data);
        // Final carry parks at the end sentinel.
        increment_stepper(&mut stepper, &mut index, &[2, 3]);
        let mut end = BufferStepper::new(&data, &layout, 2);
        end.to_end();
        assert!(stepper.same_position(&end));
    }

    #[test]
    fn test_odometer_broadcast_dimension_repeats() {
        // Shape [3] iterated as [2, 3]: the leading dimension is virtual.
        let layout = Layout::<DynDims>::row_major([3].into());
        let data = [1, 2, 3];
        let mut stepper = BufferStepper::new(&data, &layout, 2);
        let mut index = [0usize, 0];
        let mut seen = vec![stepper.value()];
        for _ in 0..5 {
            increment_stepper(&mut stepper, &mut index, &[2, 3]);
            seen.push(stepper.value());
        }
        assert_eq!(seen, [1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn test_odometer_empty_extent_parks_at_end() {
        let layout = Layout::<DynDims>::row_major([2, 0].into());
        let data: [i32; 0] = [];
        let mut stepper = BufferStepper::new(&data, &layout, 2);
        let mut index = [0usize, 0];
        increment_stepper(&mut stepper, &mut index, &[2, 0]);
        let mut end = BufferStepper::new(&data, &layout, 2);
        end.to_end();
        assert!(stepper.same_position(&end));
    }

    #[test]
    fn test_expr_iter_matches_slice() {
        let a = Array::<i32, DynDims>::from_vec([2, 2], vec![1, 2, 3, 4]).unwrap();
        let values: Vec<i32> = ExprIter::new(&a).collect();
        assert_eq!(values, [1, 2, 3, 4]);
    }

    #[test]
    fn test_expr_iter_exact_size() {
        let a = Array::<i32, DynDims>::from_vec([2, 3], vec![0; 6]).unwrap();
        let mut it = ExprIter::new(&a);
        assert_eq!(it.len(), 6);
        it.next();
        assert_eq!(it.len(), 5);
    }

    #[test]
    fn test_expr_iter_empty_shape() {
        let a = Array::<i32, DynDims>::from_vec([2, 0, 3], vec![]).unwrap();
        assert_eq!(ExprIter::new(&a).count(), 0);
    }

    #[test]
    fn test_expr_iter_rank_zero() {
        let a = Array::<i32, DynDims>::from_vec(DynDims::from(Vec::new()), vec![7]).unwrap();
        let values: Vec<i32> = ExprIter::new(&a).collect();
        assert_eq!(values, [7]);
    }
}
