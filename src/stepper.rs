//! Per-node traversal cursors.
//!
//! A [`Stepper`] is a cursor over one expression-tree node. The odometer in
//! [`crate::iter`] never touches node internals; it only calls `step`,
//! `reset` and `to_end` as the multi-index it maintains advances and wraps.
//! Two structurally different strategies satisfy the same contract:
//!
//! - [`BufferStepper`] walks a strided contiguous buffer by pointer
//!   arithmetic, O(1) per movement regardless of rank.
//! - [`IndexedStepper`] keeps an explicit multi-index and recomputes the
//!   element through [`Expression::element`] on every dereference; strictly
//!   more general, used by nodes without a flat buffer.
//!
//! Composite steppers ([`MapStepper`], [`ZipStepper`], [`ZipStepper3`]) hold
//! one child stepper per operand and forward every movement call, combining
//! child values through the node's function only at dereference time.
//!
//! Every stepper carries a dimension `offset`, the difference between the
//! iteration rank and the node's own rank: movement in a dimension below the
//! offset is a no-op, which is what repeats a low-rank operand across the
//! leading broadcast dimensions.

use std::marker::PhantomData;

use crate::dims::{Dims, DynDims};
use crate::expr::Expression;
use crate::layout::Layout;

/// Traversal cursor over one expression-tree node.
///
/// `value` must not be called after `to_end`; `same_position` is the
/// structural equality used to detect the end-of-range sentinel.
pub trait Stepper {
    type Item: Copy;

    /// Advance by `n` along dimension `dim` of the iteration shape.
    fn step(&mut self, dim: usize, n: usize);

    /// Exact inverse of [`Stepper::step`].
    fn step_back(&mut self, dim: usize, n: usize);

    /// Undo all accumulated advancement along `dim`, used when the odometer
    /// carries into the next-outer dimension.
    fn reset(&mut self, dim: usize);

    /// Move to the canonical one-past-last sentinel position.
    fn to_end(&mut self);

    /// The element at the current position.
    fn value(&self) -> Self::Item;

    /// Structural position equality.
    fn same_position(&self, other: &Self) -> bool;
}

// ============================================================================
// BufferStepper: strided pointer arithmetic
// ============================================================================

/// Cursor over a strided contiguous buffer.
///
/// `step` adds `n * strides[dim - offset]`; `reset` subtracts the
/// backstride. Extent-1 dimensions contribute stride 0, which is what makes
/// a size-1 axis repeat under a dominating iteration shape.
#[derive(Debug)]
pub struct BufferStepper<'a, T> {
    ptr: *const T,
    len: usize,
    pos: usize,
    shape: &'a [usize],
    strides: &'a [usize],
    backstrides: &'a [usize],
    offset: usize,
    _marker: PhantomData<&'a [T]>,
}

impl<'a, T> BufferStepper<'a, T> {
    /// Cursor at the start of `data`, traversed as `layout` inside an
    /// iteration shape of rank `iter_rank`.
    pub fn new<D: Dims>(data: &'a [T], layout: &'a Layout<D>, iter_rank: usize) -> Self {
        debug_assert!(iter_rank >= layout.rank());
        debug_assert!(layout.required_span() <= data.len());
        Self {
            ptr: data.as_ptr(),
            len: data.len(),
            pos: 0,
            shape: layout.shape(),
            strides: layout.strides(),
            backstrides: layout.backstrides(),
            offset: iter_rank - layout.rank(),
            _marker: PhantomData,
        }
    }

    /// Cursor over a raw buffer.
    ///
    /// # Safety
    /// `ptr` must be valid for `len` reads of `T` for the lifetime `'a`, and
    /// `layout` must stay within that span.
    pub(crate) unsafe fn from_raw_parts<D: Dims>(
        ptr: *const T,
        len: usize,
        layout: &'a Layout<D>,
        iter_rank: usize,
    ) -> Self {
        debug_assert!(iter_rank >= layout.rank());
        debug_assert!(layout.required_span() <= len);
        Self {
            ptr,
            len,
            pos: 0,
            shape: layout.shape(),
            strides: layout.strides(),
            backstrides: layout.backstrides(),
            offset: iter_rank - layout.rank(),
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> Stepper for BufferStepper<'_, T> {
    type Item = T;

    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        if dim < self.offset {
            return;
        }
        let d = dim - self.offset;
        if self.shape[d] != 1 {
            self.pos += n * self.strides[d];
        }
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        if dim < self.offset {
            return;
        }
        let d = dim - self.offset;
        if self.shape[d] != 1 {
            self.pos -= n * self.strides[d];
        }
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        if dim < self.offset {
            return;
        }
        // Backstrides of extent-1 dimensions are 0, so repeated axes unwind
        // to exactly where they stayed.
        self.pos -= self.backstrides[dim - self.offset];
    }

    #[inline]
    fn to_end(&mut self) {
        self.pos = self.len;
    }

    #[inline]
    fn value(&self) -> T {
        debug_assert!(self.pos < self.len, "dereference past the end");
        // Safety: pos stays within the validated span while not at the end
        // sentinel.
        unsafe { *self.ptr.add(self.pos) }
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.pos == other.pos && self.offset == other.offset
    }
}

// ============================================================================
// BufferStepperMut: the write-side cursor used by assignment
// ============================================================================

/// Mutable cursor over a strided contiguous buffer.
///
/// The destination counterpart of [`BufferStepper`]: same movement rules,
/// but dereferencing stores instead of loads. A destination always owns the
/// full iteration shape, so there is no dimension offset.
#[derive(Debug)]
pub struct BufferStepperMut<'a, T> {
    ptr: *mut T,
    len: usize,
    pos: usize,
    strides: &'a [usize],
    backstrides: &'a [usize],
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T> BufferStepperMut<'a, T> {
    pub fn new<D: Dims>(data: &'a mut [T], layout: &'a Layout<D>) -> Self {
        debug_assert!(layout.required_span() <= data.len());
        Self {
            ptr: data.as_mut_ptr(),
            len: data.len(),
            pos: 0,
            strides: layout.strides(),
            backstrides: layout.backstrides(),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub fn step(&mut self, dim: usize, n: usize) {
        self.pos += n * self.strides[dim];
    }

    #[inline]
    pub fn step_back(&mut self, dim: usize, n: usize) {
        self.pos -= n * self.strides[dim];
    }

    #[inline]
    pub fn reset(&mut self, dim: usize) {
        self.pos -= self.backstrides[dim];
    }

    /// Store a value at the current position.
    #[inline]
    pub fn put(&mut self, value: T) {
        debug_assert!(self.pos < self.len, "store past the end");
        // Safety: pos stays within the validated span.
        unsafe { *self.ptr.add(self.pos) = value }
    }
}

// ============================================================================
// IndexedStepper: recomputed indexed traversal
// ============================================================================

/// Cursor that maintains an explicit multi-index over any [`Expression`].
///
/// Movement only mutates the index; the element is recomputed through
/// [`Expression::element`] on every dereference. This is the fallback for
/// expression nodes and containers without a flat strided buffer.
#[derive(Debug)]
pub struct IndexedStepper<'a, E> {
    expr: &'a E,
    index: DynDims,
    offset: usize,
}

impl<'a, E: Expression> IndexedStepper<'a, E> {
    pub fn new(expr: &'a E, iter_rank: usize) -> Self {
        debug_assert!(iter_rank >= expr.rank());
        Self {
            expr,
            index: DynDims::zeros(expr.rank()),
            offset: iter_rank - expr.rank(),
        }
    }
}

impl<E: Expression> Stepper for IndexedStepper<'_, E> {
    type Item = E::Elem;

    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        if dim >= self.offset {
            self.index[dim - self.offset] += n;
        }
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        if dim >= self.offset {
            self.index[dim - self.offset] -= n;
        }
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        if dim >= self.offset {
            self.index[dim - self.offset] = 0;
        }
    }

    #[inline]
    fn to_end(&mut self) {
        self.index = DynDims::from(self.expr.shape());
    }

    #[inline]
    fn value(&self) -> E::Elem {
        self.expr.element(self.index.as_ref())
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.expr, other.expr)
            && self.index == other.index
            && self.offset == other.offset
    }
}

// ============================================================================
// ScalarStepper: the rank-0 leaf cursor
// ============================================================================

/// Cursor of a rank-0 leaf: every movement is a no-op and the value repeats
/// at every broadcast position.
#[derive(Debug, Clone)]
pub struct ScalarStepper<T> {
    value: T,
    at_end: bool,
}

impl<T> ScalarStepper<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            at_end: false,
        }
    }
}

impl<T: Copy> Stepper for ScalarStepper<T> {
    type Item = T;

    #[inline]
    fn step(&mut self, _dim: usize, _n: usize) {}

    #[inline]
    fn step_back(&mut self, _dim: usize, _n: usize) {}

    #[inline]
    fn reset(&mut self, _dim: usize) {}

    #[inline]
    fn to_end(&mut self) {
        self.at_end = true;
    }

    #[inline]
    fn value(&self) -> T {
        debug_assert!(!self.at_end, "dereference past the end");
        self.value
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        self.at_end == other.at_end
    }
}

// ============================================================================
// Composite steppers: one child per operand
// ============================================================================

/// Stepper of a unary node: forwards movement to the child and maps its
/// value on dereference.
#[derive(Debug)]
pub struct MapStepper<'a, S, F> {
    inner: S,
    f: &'a F,
}

impl<'a, S, F> MapStepper<'a, S, F> {
    pub fn new(inner: S, f: &'a F) -> Self {
        Self { inner, f }
    }
}

impl<T, S, F> Stepper for MapStepper<'_, S, F>
where
    T: Copy,
    S: Stepper,
    F: Fn(S::Item) -> T,
{
    type Item = T;

    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.inner.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.inner.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.inner.reset(dim);
    }

    #[inline]
    fn to_end(&mut self) {
        self.inner.to_end();
    }

    #[inline]
    fn value(&self) -> T {
        (self.f)(self.inner.value())
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.f, other.f) && self.inner.same_position(&other.inner)
    }
}

/// Stepper of a binary node: forwards every movement call to both children.
#[derive(Debug)]
pub struct ZipStepper<'a, A, B, F> {
    lhs: A,
    rhs: B,
    f: &'a F,
}

impl<'a, A, B, F> ZipStepper<'a, A, B, F> {
    pub fn new(lhs: A, rhs: B, f: &'a F) -> Self {
        Self { lhs, rhs, f }
    }
}

impl<T, A, B, F> Stepper for ZipStepper<'_, A, B, F>
where
    T: Copy,
    A: Stepper,
    B: Stepper,
    F: Fn(A::Item, B::Item) -> T,
{
    type Item = T;

    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.lhs.step(dim, n);
        self.rhs.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.lhs.step_back(dim, n);
        self.rhs.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.lhs.reset(dim);
        self.rhs.reset(dim);
    }

    #[inline]
    fn to_end(&mut self) {
        self.lhs.to_end();
        self.rhs.to_end();
    }

    #[inline]
    fn value(&self) -> T {
        (self.f)(self.lhs.value(), self.rhs.value())
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.f, other.f)
            && self.lhs.same_position(&other.lhs)
            && self.rhs.same_position(&other.rhs)
    }
}

/// Stepper of a ternary node.
#[derive(Debug)]
pub struct ZipStepper3<'a, A, B, C, F> {
    a: A,
    b: B,
    c: C,
    f: &'a F,
}

impl<'a, A, B, C, F> ZipStepper3<'a, A, B, C, F> {
    pub fn new(a: A, b: B, c: C, f: &'a F) -> Self {
        Self { a, b, c, f }
    }
}

impl<T, A, B, C, F> Stepper for ZipStepper3<'_, A, B, C, F>
where
    T: Copy,
    A: Stepper,
    B: Stepper,
    C: Stepper,
    F: Fn(A::Item, B::Item, C::Item) -> T,
{
    type Item = T;

    #[inline]
    fn step(&mut self, dim: usize, n: usize) {
        self.a.step(dim, n);
        self.b.step(dim, n);
        self.c.step(dim, n);
    }

    #[inline]
    fn step_back(&mut self, dim: usize, n: usize) {
        self.a.step_back(dim, n);
        self.b.step_back(dim, n);
        self.c.step_back(dim, n);
    }

    #[inline]
    fn reset(&mut self, dim: usize) {
        self.a.reset(dim);
        self.b.reset(dim);
        self.c.reset(dim);
    }

    #[inline]
    fn to_end(&mut self) {
        self.a.to_end();
        self.b.to_end();
        self.c.to_end();
    }

    #[inline]
    fn value(&self) -> T {
        (self.f)(self.a.value(), self.b.value(), self.c.value())
    }

    #[inline]
    fn same_position(&self, other: &Self) -> bool {
        std::ptr::eq(self.f, other.f)
            && self.a.same_position(&other.a)
            && self.b.same_position(&other.b)
            && self.c.same_position(&other.c)
    }
}
