//! Elementwise arithmetic operators for [`Expr`].
//!
//! `a.expr() + b.expr()` builds a lazy [`ZipMap`] node; nothing is computed
//! until the expression is iterated, evaluated, or assigned. The operators
//! panic when operand shapes do not broadcast; use [`crate::zip_map`] for
//! the checked form. Mixed-type arithmetic is out of scope: both operands
//! share one element type, and scalars enter via [`crate::scalar`].

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::dims::BroadcastDims;
use crate::expr::{Expr, Expression, Map, ZipMap};

macro_rules! impl_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<L, R> $trait<Expr<R>> for Expr<L>
        where
            L: Expression,
            R: Expression<Elem = L::Elem>,
            L::Elem: $trait<Output = L::Elem>,
            L::Dims: BroadcastDims<R::Dims>,
        {
            type Output = Expr<ZipMap<L, R, fn(L::Elem, L::Elem) -> L::Elem>>;

            /// # Panics
            /// Panics when the operand shapes do not broadcast.
            fn $method(self, rhs: Expr<R>) -> Self::Output {
                let f: fn(L::Elem, L::Elem) -> L::Elem = |a, b| a $op b;
                match ZipMap::new(self.0, rhs.0, f) {
                    Ok(node) => Expr(node),
                    Err(err) => panic!("{err}"),
                }
            }
        }
    };
}

impl_binary_op!(Add, add, +);
impl_binary_op!(Sub, sub, -);
impl_binary_op!(Mul, mul, *);
impl_binary_op!(Div, div, /);

impl<E> Neg for Expr<E>
where
    E: Expression,
    E::Elem: Neg<Output = E::Elem>,
{
    type Output = Expr<Map<E, fn(E::Elem) -> E::Elem>>;

    fn neg(self) -> Self::Output {
        let f: fn(E::Elem) -> E::Elem = |v| -v;
        Expr(Map::new(self.0, f))
    }
}

#[cfg(test)]
mod tests {
    use crate::array::Array;
    use crate::dims::DynDims;
    use crate::expr::{scalar, Expression};

    fn iota(shape: &[usize]) -> Array<f64, DynDims> {
        let mut n = 0.0;
        Array::from_shape_fn(DynDims::from(shape), |_| {
            n += 1.0;
            n
        })
    }

    #[test]
    fn test_add_broadcasts() {
        let a = iota(&[2, 1]);
        let b = iota(&[3]);
        let out = (a.expr() + b.expr()).eval();
        assert_eq!(out.shape(), &[2, 3]);
        assert_eq!(out.as_slice(), &[2.0, 3.0, 4.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_compound_expression() {
        let a = iota(&[2, 2]);
        let b = iota(&[2, 2]);
        let out = ((a.expr() + b.expr()) * scalar(0.5) - a.expr()).eval();
        assert_eq!(out.as_slice(), &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_scalar_on_either_side() {
        let a = iota(&[3]);
        let lhs = (scalar(10.0) * a.expr()).eval();
        let rhs = (a.expr() * scalar(10.0)).eval();
        assert_eq!(lhs.as_slice(), &[10.0, 20.0, 30.0]);
        assert_eq!(lhs.as_slice(), rhs.as_slice());
    }

    #[test]
    fn test_neg() {
        let a = iota(&[2]);
        let out = (-a.expr()).eval();
        assert_eq!(out.as_slice(), &[-1.0, -2.0]);
    }

    #[test]
    #[should_panic]
    fn test_mismatched_shapes_panic() {
        let a = iota(&[2, 3]);
        let b = iota(&[4]);
        let _ = a.expr() + b.expr();
    }

    #[test]
    fn test_div_sub() {
        let a = iota(&[4]);
        let out = ((a.expr() - scalar(1.0)) / scalar(2.0)).eval();
        assert_eq!(out.as_slice(), &[0.0, 0.5, 1.0, 1.5]);
    }
}
