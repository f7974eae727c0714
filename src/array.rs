//! Owning containers: the dense row-/column-major [`Array`] and the
//! lifetime-erased [`RawView`] used to alias a container inside an
//! expression that assigns back into it.

use num_traits::Zero;

use crate::dims::{Dims, DynDims};
use crate::expr::{Expr, Expression, LeafId};
use crate::layout::{Layout, Order};
use crate::stepper::{BufferStepper, BufferStepperMut};
use crate::{Result, ShapeError};

/// A dense N-dimensional array over a contiguous buffer.
///
/// The rank representation `D` is `[usize; N]` for compile-time rank or
/// [`DynDims`] (the default) for runtime rank. Arrays are expression leaves:
/// `&Array` implements [`Expression`], and [`Array::expr`] wraps one for
/// operator sugar.
#[derive(Debug, Clone, PartialEq)]
pub struct Array<T, D: Dims = DynDims> {
    data: Vec<T>,
    layout: Layout<D>,
}

impl<T: Copy, D: Dims> Array<T, D> {
    /// Row-major array filled with one value.
    pub fn from_elem<S: Into<D>>(shape: S, value: T) -> Self {
        let layout = Layout::row_major(shape.into());
        let data = vec![value; layout.size()];
        Self { data, layout }
    }

    /// Row-major array of zeros.
    pub fn zeros<S: Into<D>>(shape: S) -> Self
    where
        T: Zero,
    {
        Self::from_elem(shape, T::zero())
    }

    /// Take ownership of a row-major buffer.
    ///
    /// Fails with [`ShapeError::BufferLength`] when the buffer does not hold
    /// exactly the shape's element count.
    pub fn from_vec<S: Into<D>>(shape: S, data: Vec<T>) -> Result<Self> {
        let layout = Layout::row_major(shape.into());
        if data.len() != layout.size() {
            return Err(ShapeError::BufferLength {
                expected: layout.size(),
                got: data.len(),
            }
            .into());
        }
        Ok(Self { data, layout })
    }

    /// Row-major array built by calling `f` at every multi-index.
    pub fn from_shape_fn<S, F>(shape: S, f: F) -> Self
    where
        S: Into<D>,
        F: FnMut(&[usize]) -> T,
    {
        Self::fill_by_index(Layout::row_major(shape.into()), f)
    }

    /// Column-major array built by calling `f` at every multi-index, visited
    /// first-dimension-fastest so the buffer fills front to back.
    pub fn from_shape_fn_col_major<S, F>(shape: S, f: F) -> Self
    where
        S: Into<D>,
        F: FnMut(&[usize]) -> T,
    {
        Self::fill_by_index(Layout::col_major(shape.into()), f)
    }

    fn fill_by_index<F>(layout: Layout<D>, mut f: F) -> Self
    where
        F: FnMut(&[usize]) -> T,
    {
        let size = layout.size();
        let rank = layout.rank();
        let col_major = layout.order() == Order::ColMajor;
        let mut data = Vec::with_capacity(size);
        let mut index = DynDims::zeros(rank);
        let advance = |index: &mut DynDims, d: usize| {
            index[d] += 1;
            if index[d] < layout.shape()[d] {
                return true;
            }
            index[d] = 0;
            false
        };
        for _ in 0..size {
            data.push(f(index.as_ref()));
            // Advance in the layout's memory order so pushes are contiguous.
            if col_major {
                for d in 0..rank {
                    if advance(&mut index, d) {
                        break;
                    }
                }
            } else {
                for d in (0..rank).rev() {
                    if advance(&mut index, d) {
                        break;
                    }
                }
            }
        }
        Self { data, layout }
    }

    /// Assemble from a buffer, shape and explicit strides.
    ///
    /// The strides need not describe a packed layout, but every reachable
    /// offset must fall inside the buffer
    /// ([`ShapeError::OutOfBounds`] otherwise).
    pub fn from_parts<S: Into<D>, St: Into<D>>(data: Vec<T>, shape: S, strides: St) -> Result<Self> {
        let layout = Layout::with_strides(shape.into(), strides.into())?;
        layout.validate_span(data.len())?;
        Ok(Self { data, layout })
    }

    /// Element at a multi-index, `None` when out of range.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        let offset = self.layout.offset_checked(index).ok()?;
        Some(&self.data[offset])
    }

    /// Mutable element at a multi-index, `None` when out of range.
    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        let offset = self.layout.offset_checked(index).ok()?;
        Some(&mut self.data[offset])
    }

    /// Wrap a borrow of this array for operator sugar.
    #[inline]
    pub fn expr(&self) -> Expr<&Self> {
        Expr(self)
    }

    /// Forget compile-time rank information.
    pub fn into_dyn(self) -> Array<T, DynDims> {
        Array {
            data: self.data,
            layout: self.layout.into_dyn(),
        }
    }

    /// Alias this array's buffer without borrowing it.
    ///
    /// The view lets an expression read a container that is also the
    /// assignment destination; the engine detects the overlap through
    /// [`Expression::contains_leaf`] and stages through a temporary.
    ///
    /// # Safety
    /// The array must outlive the view and its buffer must not move or
    /// shrink while the view is alive. Reading through the view while the
    /// array is mutably borrowed is sound only inside the assignment engine,
    /// which sequences all reads before the first write.
    pub unsafe fn raw_view(&self) -> RawView<T, D> {
        RawView {
            ptr: self.data.as_ptr(),
            len: self.data.len(),
            layout: self.layout.clone(),
        }
    }
}

impl<T, D: Dims> Array<T, D> {
    /// Shape extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Shape in its rank representation.
    #[inline]
    pub fn dims(&self) -> &D {
        self.layout.dims()
    }

    /// Per-dimension strides, in elements.
    #[inline]
    pub fn strides(&self) -> &[usize] {
        self.layout.strides()
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying layout.
    #[inline]
    pub fn layout(&self) -> &Layout<D> {
        &self.layout
    }

    /// The backing buffer in memory order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Identity of this array's buffer for aliasing checks.
    #[inline]
    pub fn leaf_id(&self) -> LeafId {
        self.data.as_ptr() as LeafId
    }

    pub(crate) fn stepper_mut(&mut self) -> BufferStepperMut<'_, T> {
        let Self { data, layout } = self;
        BufferStepperMut::new(data, layout)
    }

    /// Reshape in place, zero-filling any newly exposed elements.
    pub(crate) fn reshape_to(&mut self, shape: &[usize]) -> std::result::Result<(), ShapeError>
    where
        T: Copy + Zero,
    {
        let dims = D::from_slice(shape)?;
        let new_len = dims.size();
        if new_len != self.data.len() {
            self.data.resize(new_len, T::zero());
        }
        self.layout = Layout::new(dims, self.layout.order());
        Ok(())
    }
}

impl<T: Copy, D: Dims> Expression for Array<T, D> {
    type Elem = T;
    type Dims = D;
    type Stepper<'a>
        = BufferStepper<'a, T>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &D {
        self.layout.dims()
    }

    #[inline]
    fn element(&self, index: &[usize]) -> T {
        self.data[self.layout.broadcast_offset(index)]
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> BufferStepper<'_, T> {
        BufferStepper::new(&self.data, &self.layout, iter_rank)
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.leaf_id() == id
    }
}

// ============================================================================
// RawView
// ============================================================================

/// A lifetime-erased strided view of an [`Array`]'s buffer.
///
/// Built by [`Array::raw_view`]; it keeps the source's layout and buffer
/// identity, so the aliasing check still recognizes the source through it.
#[derive(Debug, Clone)]
pub struct RawView<T, D: Dims> {
    ptr: *const T,
    len: usize,
    layout: Layout<D>,
}

impl<T, D: Dims> RawView<T, D> {
    /// Shape extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }
}

impl<T: Copy, D: Dims> Expression for RawView<T, D> {
    type Elem = T;
    type Dims = D;
    type Stepper<'a>
        = BufferStepper<'a, T>
    where
        Self: 'a;

    #[inline]
    fn dims(&self) -> &D {
        self.layout.dims()
    }

    #[inline]
    fn element(&self, index: &[usize]) -> T {
        let offset = self.layout.broadcast_offset(index);
        debug_assert!(offset < self.len);
        // Safety: raw_view's contract keeps ptr valid for len elements, and
        // the layout's reachable offsets were validated against the buffer.
        unsafe { *self.ptr.add(offset) }
    }

    #[inline]
    fn stepper(&self, iter_rank: usize) -> BufferStepper<'_, T> {
        // Safety: same contract as `element`.
        unsafe { BufferStepper::from_raw_parts(self.ptr, self.len, &self.layout, iter_rank) }
    }

    #[inline]
    fn contains_leaf(&self, id: LeafId) -> bool {
        self.ptr as LeafId == id
    }
}
