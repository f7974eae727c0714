//! Expression nodes: lazy combinators over element values.
//!
//! An expression is an immutable description of an elementwise computation.
//! Leaves reference containers ([`crate::Array`], [`crate::RawView`]) or are
//! rank-0 scalars ([`Scalar`]); [`Map`], [`ZipMap`] and [`ZipMap3`] apply a
//! pure function over one, two or three operands. Nodes own no buffers:
//! binary and ternary nodes compute their broadcast shape once at
//! construction and otherwise only know how to build a [`Stepper`] and how
//! to answer indexed element queries.

use crate::array::Array;
use crate::broadcast::co_broadcast;
use crate::dims::{BroadcastDims, Dims};
use crate::iter::ExprIter;
use crate::stepper::{MapStepper, ScalarStepper, Stepper, ZipStepper, ZipStepper3};
use crate::BroadcastError;

/// Identity of an expression leaf, used by the assignment engine's
/// conservative aliasing check.
pub type LeafId = *const ();

/// A lazy elementwise computation over array-like operands.
///
/// Implementors describe their own (pre-broadcast) shape, answer indexed
/// element queries, and build a [`Stepper`] against an iteration shape whose
/// rank may exceed their own (the difference becomes the stepper's dimension
/// offset). The blanket impl for `&E` lets nodes own or borrow operands.
pub trait Expression {
    type Elem: Copy;
    type Dims: Dims;
    type Stepper<'a>: Stepper<Item = Self::Elem>
    where
        Self: 'a;

    /// The node's own shape, in its rank representation.
    fn dims(&self) -> &Self::Dims;

    /// The node's own shape extents.
    #[inline]
    fn shape(&self) -> &[usize] {
        self.dims().as_ref()
    }

    /// Number of dimensions.
    #[inline]
    fn rank(&self) -> usize {
        self.shape().len()
    }

    /// Element at a multi-index.
    ///
    /// The index may carry more components than the node has dimensions
    /// (leading broadcast dimensions are ignored) and extent-1 dimensions
    /// tolerate any index component, reading their single element.
    fn element(&self, index: &[usize]) -> Self::Elem;

    /// Build a traversal cursor for an iteration shape of rank `iter_rank`
    /// (≥ the node's own rank).
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_>;

    /// Whether the container identified by `id` appears in this expression's
    /// leaf set.
    fn contains_leaf(&self, id: LeafId) -> bool;

    /// Lazy row-major iterator over every broadcast position.
    #[inline]
    fn values(&self) -> ExprIter<'_, Self>
    where
        Self: Sized,
    {
        ExprIter::new(self)
    }

    /// Materialize into a freshly allocated row-major array.
    fn eval(&self) -> Array<Self::Elem, Self::Dims>
    where
        Self: Sized,
    {
        let data: Vec<Self::Elem> = self.values().collect();
        Array::from_vec(self.dims().clone(), data)
            .expect("expression yields exactly its shape's element count")
    }
}

impl<'e, E: Expression> Expression for &'e E {
    type Elem = E::Elem;
    type Dims = E::Dims;
    type Stepper<'a>
        = E::Stepper<'a>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &E::Dims {
        (**self).dims()
    }

    #[inline]
    fn element(&self, index: &[usize]) -> E::Elem {
        (**self).element(index)
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_> {
        (**self).stepper(iter_rank)
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        (**self).contains_leaf(id)
    }
}

// ============================================================================
// Scalar: the rank-0 leaf
// ============================================================================

/// A rank-0 leaf: one value, repeated at every broadcast position.
///
/// Scalars are compatible with any shape and belong to no leaf set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scalar<T>(pub T);

impl<T: Copy> Expression for Scalar<T> {
    type Elem = T;
    type Dims = [usize; 0];
    type Stepper<'a>
        = ScalarStepper<T>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &[usize; 0] {
        &[]
    }

    #[inline]
    fn element(&self, _index: &[usize]) -> T {
        self.0
    }

    #[inline]
    fn stepper(&self, _iter_rank: usize) -> ScalarStepper<T> {
        ScalarStepper::new(self.0)
    }

    #[inline]
    fn contains_leaf(&self, _id: LeafId) -> bool {
        false
    }
}

/// Lift a value into a rank-0 expression leaf.
#[inline]
pub fn scalar<T: Copy>(value: T) -> Expr<Scalar<T>> {
    Expr(Scalar(value))
}

// ============================================================================
// Map: unary nodes
// ============================================================================

/// A pure function applied to every element of one operand.
#[derive(Debug, Clone)]
pub struct Map<E, F> {
    input: E,
    f: F,
}

impl<E, F> Map<E, F> {
    pub fn new(input: E, f: F) -> Self {
        Self { input, f }
    }
}

impl<T, E, F> Expression for Map<E, F>
where
    T: Copy,
    E: Expression,
    F: Fn(E::Elem) -> T,
{
    type Elem = T;
    type Dims = E::Dims;
    type Stepper<'a>
        = MapStepper<'a, E::Stepper<'a>, F>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &E::Dims {
        self.input.dims()
    }

    #[inline]
    fn element(&self, index: &[usize]) -> T {
        (self.f)(self.input.element(index))
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_> {
        MapStepper::new(self.input.stepper(iter_rank), &self.f)
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.input.contains_leaf(id)
    }
}

// ============================================================================
// ZipMap / ZipMap3: binary and ternary nodes
// ============================================================================

/// A pure function combining two broadcast operands elementwise.
///
/// The broadcast shape is computed once at construction and memoized; the
/// operands' own shapes never change afterwards.
pub struct ZipMap<A, B, F>
where
    A: Expression,
    B: Expression,
    A::Dims: BroadcastDims<B::Dims>,
{
    lhs: A,
    rhs: B,
    f: F,
    dims: <A::Dims as BroadcastDims<B::Dims>>::Output,
}

impl<A, B, F> ZipMap<A, B, F>
where
    A: Expression,
    B: Expression,
    A::Dims: BroadcastDims<B::Dims>,
{
    /// Combine two operands, failing when their shapes do not broadcast.
    pub fn new(lhs: A, rhs: B, f: F) -> Result<Self, BroadcastError> {
        let dims = co_broadcast(lhs.dims(), rhs.dims())?;
        Ok(Self { lhs, rhs, f, dims })
    }
}

impl<T, A, B, F> Expression for ZipMap<A, B, F>
where
    T: Copy,
    A: Expression,
    B: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    F: Fn(A::Elem, B::Elem) -> T,
{
    type Elem = T;
    type Dims = <A::Dims as BroadcastDims<B::Dims>>::Output;
    type Stepper<'a>
        = ZipStepper<'a, A::Stepper<'a>, B::Stepper<'a>, F>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &Self::Dims {
        &self.dims
    }

    #[inline]
    fn element(&self, index: &[usize]) -> T {
        (self.f)(self.lhs.element(index), self.rhs.element(index))
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_> {
        ZipStepper::new(
            self.lhs.stepper(iter_rank),
            self.rhs.stepper(iter_rank),
            &self.f,
        )
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.lhs.contains_leaf(id) || self.rhs.contains_leaf(id)
    }
}

/// A pure function combining three broadcast operands elementwise.
pub struct ZipMap3<A, B, C, F>
where
    A: Expression,
    B: Expression,
    C: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    <A::Dims as BroadcastDims<B::Dims>>::Output: BroadcastDims<C::Dims>,
{
    a: A,
    b: B,
    c: C,
    f: F,
    dims: <<A::Dims as BroadcastDims<B::Dims>>::Output as BroadcastDims<C::Dims>>::Output,
}

impl<A, B, C, F> ZipMap3<A, B, C, F>
where
    A: Expression,
    B: Expression,
    C: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    <A::Dims as BroadcastDims<B::Dims>>::Output: BroadcastDims<C::Dims>,
{
    /// Combine three operands, failing when their shapes do not broadcast.
    pub fn new(a: A, b: B, c: C, f: F) -> Result<Self, BroadcastError> {
        let ab = co_broadcast(a.dims(), b.dims())?;
        let dims = co_broadcast(&ab, c.dims())?;
        Ok(Self { a, b, c, f, dims })
    }
}

impl<T, A, B, C, F> Expression for ZipMap3<A, B, C, F>
where
    T: Copy,
    A: Expression,
    B: Expression,
    C: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    <A::Dims as BroadcastDims<B::Dims>>::Output: BroadcastDims<C::Dims>,
    F: Fn(A::Elem, B::Elem, C::Elem) -> T,
{
    type Elem = T;
    type Dims = <<A::Dims as BroadcastDims<B::Dims>>::Output as BroadcastDims<C::Dims>>::Output;
    type Stepper<'a>
        = ZipStepper3<'a, A::Stepper<'a>, B::Stepper<'a>, C::Stepper<'a>, F>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &Self::Dims {
        &self.dims
    }

    #[inline]
    fn element(&self, index: &[usize]) -> T {
        (self.f)(
            self.a.element(index),
            self.b.element(index),
            self.c.element(index),
        )
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_> {
        ZipStepper3::new(
            self.a.stepper(iter_rank),
            self.b.stepper(iter_rank),
            self.c.stepper(iter_rank),
            &self.f,
        )
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.a.contains_leaf(id) || self.b.contains_leaf(id) || self.c.contains_leaf(id)
    }
}

// ============================================================================
// Expr: the user-facing wrapper
// ============================================================================

/// Wrapper carrying elementwise operator overloads (`+ - * /`, unary `-`)
/// for any [`Expression`].
///
/// Operator sugar panics on a broadcast mismatch; the checked constructors
/// ([`zip_map`], [`zip_map3`], [`ZipMap::new`]) return the error instead.
#[derive(Debug, Clone)]
pub struct Expr<E>(pub E);

impl<E: Expression> Expr<E> {
    /// Unwrap the underlying node.
    #[inline]
    pub fn into_inner(self) -> E {
        self.0
    }

    /// Apply a pure function to every element.
    #[inline]
    pub fn map<T, F>(self, f: F) -> Expr<Map<E, F>>
    where
        T: Copy,
        F: Fn(E::Elem) -> T,
    {
        Expr(Map::new(self.0, f))
    }
}

impl<E: Expression> Expression for Expr<E> {
    type Elem = E::Elem;
    type Dims = E::Dims;
    type Stepper<'a>
        = E::Stepper<'a>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &E::Dims {
        self.0.dims()
    }

    #[inline]
    fn element(&self, index: &[usize]) -> E::Elem {
        self.0.element(index)
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> Self::Stepper<'_> {
        self.0.stepper(iter_rank)
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.0.contains_leaf(id)
    }
}

/// Checked binary combination of two expressions.
pub fn zip_map<A, B, F, T>(lhs: A, rhs: B, f: F) -> Result<Expr<ZipMap<A, B, F>>, BroadcastError>
where
    T: Copy,
    A: Expression,
    B: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    F: Fn(A::Elem, B::Elem) -> T,
{
    Ok(Expr(ZipMap::new(lhs, rhs, f)?))
}

/// Checked ternary combination of three expressions.
pub fn zip_map3<A, B, C, F, T>(
    a: A,
    b: B,
    c: C,
    f: F,
) -> Result<Expr<ZipMap3<A, B, C, F>>, BroadcastError>
where
    T: Copy,
    A: Expression,
    B: Expression,
    C: Expression,
    A::Dims: BroadcastDims<B::Dims>,
    <A::Dims as BroadcastDims<B::Dims>>::Output: BroadcastDims<C::Dims>,
    F: Fn(A::Elem, B::Elem, C::Elem) -> T,
{
    Ok(Expr(ZipMap3::new(a, b, c, f)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::Array;
    use crate::dims::DynDims;

    fn iota(shape: &[usize]) -> Array<f64, DynDims> {
        let mut n = 0.0;
        Array::from_shape_fn(DynDims::from(shape), |_| {
            n += 1.0;
            n
        })
    }

    #[test]
    fn test_zip_map_shape_memoized() {
        let a = iota(&[2, 3]);
        let b = iota(&[4, 2, 1]);
        let node = ZipMap::new(&a, &b, |x: f64, y: f64| x + y).unwrap();
        assert_eq!(node.shape(), &[4, 2, 3]);
    }

    #[test]
    fn test_zip_map_incompatible() {
        let a = iota(&[2, 3]);
        let b = iota(&[4, 3, 2]);
        assert!(ZipMap::new(&a, &b, |x: f64, y: f64| x + y).is_err());
    }

    #[test]
    fn test_element_recurses_through_nodes() {
        let a = iota(&[2, 2]); // 1 2 / 3 4
        let b = iota(&[2]); // 1 2
        let node = ZipMap::new(&a, &b, |x, y| x * y).unwrap();
        assert_eq!(node.element(&[0, 1]), 4.0);
        assert_eq!(node.element(&[1, 0]), 3.0);
        // Idempotent: same position, same value.
        assert_eq!(node.element(&[1, 0]), 3.0);
    }

    #[test]
    fn test_scalar_leaf() {
        let s = Scalar(2.5);
        assert_eq!(s.rank(), 0);
        assert_eq!(s.element(&[3, 1]), 2.5);
        assert!(!s.contains_leaf(std::ptr::null()));
    }

    #[test]
    fn test_map_keeps_shape() {
        let a = iota(&[2, 3]);
        let doubled = Map::new(&a, |x: f64| x * 2.0);
        assert_eq!(doubled.shape(), &[2, 3]);
        assert_eq!(doubled.element(&[1, 2]), 12.0);
    }

    #[test]
    fn test_contains_leaf() {
        let a = iota(&[2, 3]);
        let b = iota(&[3]);
        let node = ZipMap::new(&a, &b, |x: f64, y: f64| x + y).unwrap();
        assert!(node.contains_leaf(a.leaf_id()));
        assert!(node.contains_leaf(b.leaf_id()));
        assert!(!node.contains_leaf(std::ptr::null()));
    }

    #[test]
    fn test_eval_materializes() {
        let a = iota(&[2, 2]);
        let b = iota(&[2]);
        let out = zip_map(&a, &b, |x, y| x + y).unwrap().eval();
        assert_eq!(out.shape(), &[2, 2]);
        assert_eq!(out.as_slice(), &[2.0, 4.0, 4.0, 6.0]);
    }

    #[test]
    fn test_zip_map3() {
        let a = iota(&[2, 2]);
        let b = iota(&[2]);
        let out = zip_map3(&a, &b, Scalar(10.0), |x, y, s| (x + y) * s)
            .unwrap()
            .eval();
        assert_eq!(out.as_slice(), &[20.0, 40.0, 40.0, 60.0]);
    }
}
