//! Lazy broadcasting expression engine for N-dimensional arrays.
//!
//! Arithmetic over array-like operands builds an unmaterialized expression
//! tree; elements are computed one at a time, on access or on assignment,
//! never eagerly. Operands of different shapes are reconciled by NumPy-style
//! broadcasting, and fixed-rank shapes (`[usize; N]`) mix freely with
//! dynamic-rank ones ([`DynDims`]), with dynamic-ness propagating through
//! every combination.
//!
//! # Core Types
//!
//! - [`Array`]: Owned dense container, the concrete expression leaf
//! - [`Expr`]: Expression wrapper carrying elementwise operator overloads
//! - [`Scalar`]: Rank-0 leaf repeated at every broadcast position
//! - [`Layout`]: Shape/strides/backstrides of a strided buffer
//!
//! # Traversal model
//!
//! Every expression node can produce a [`Stepper`], a cursor that advances
//! one dimension at a time. A row-major odometer ([`ExprIter`]) drives the
//! stepper through every position of the broadcast shape: the innermost
//! index increments in O(1), and wraparound resets the stepper by the
//! dimension's backstride. Composite nodes forward each movement to one
//! child stepper per operand, so arbitrarily deep trees iterate in a single
//! pass with no intermediate buffers.
//!
//! # Example
//!
//! ```
//! use ndexpr::{assign, scalar, Array, DynDims};
//!
//! let a = Array::<f64, DynDims>::from_shape_fn([2, 3], |idx| (idx[0] * 3 + idx[1]) as f64);
//! let b = Array::<f64, DynDims>::from_shape_fn([3], |idx| idx[0] as f64);
//!
//! // Lazy: nothing is computed here.
//! let sum = a.expr() + b.expr() * scalar(10.0);
//!
//! let mut out = Array::<f64, DynDims>::zeros([0]);
//! assign(&mut out, &sum).unwrap();
//! assert_eq!(out.shape(), &[2, 3]);
//! assert_eq!(*out.get(&[1, 2]).unwrap(), 5.0 + 20.0);
//! ```
//!
//! # Assignment and aliasing
//!
//! [`assign`] is the only place where results are committed to a mutable
//! container. When the destination appears among the source's leaves *and*
//! the assignment must reshape the destination, the engine evaluates into a
//! temporary first, so every output element reads the original operand
//! values. [`assign_no_alias`] is the explicit opt-in that skips the check.

mod array;
mod assign;
mod broadcast;
mod dims;
mod expr;
mod iter;
mod layout;
mod ops;
mod stepper;

// ============================================================================
// Shape model
// ============================================================================
pub use dims::{BroadcastDims, Dims, DynDims};
pub use layout::{Layout, Order};

// ============================================================================
// Broadcasting
// ============================================================================
pub use broadcast::{broadcast_shapes, co_broadcast};

// ============================================================================
// Steppers and iteration
// ============================================================================
pub use iter::{increment_stepper, ExprIter};
pub use stepper::{
    BufferStepper, BufferStepperMut, IndexedStepper, MapStepper, ScalarStepper, Stepper,
    ZipStepper, ZipStepper3,
};

// ============================================================================
// Expression algebra
// ============================================================================
pub use expr::{scalar, zip_map, zip_map3, Expr, Expression, LeafId, Map, Scalar, ZipMap, ZipMap3};

// ============================================================================
// Containers and assignment
// ============================================================================
pub use array::{Array, RawView};
pub use assign::{assign, assign_no_alias, AssignTarget};

// ============================================================================
// Error types
// ============================================================================

/// Malformed shape or strides construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    /// A shape of a different rank was required.
    #[error("rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Strides sequence length differs from the shape length.
    #[error("strides length {strides} does not match shape length {dims}")]
    StrideLengthMismatch { dims: usize, strides: usize },

    /// The declared shape/strides would read outside the buffer.
    #[error("strided span {span} exceeds buffer length {len}")]
    OutOfBounds { span: usize, len: usize },

    /// Buffer length differs from the shape's element count.
    #[error("buffer length {got} does not match shape size {expected}")]
    BufferLength { expected: usize, got: usize },
}

/// Two operands have incompatible extents at an aligned dimension.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot broadcast extent {rhs} against {lhs} in dimension {dim}")]
pub struct BroadcastError {
    /// Dimension of the (right-aligned) output shape where the clash occurs.
    pub dim: usize,
    /// Extent accumulated from earlier operands.
    pub lhs: usize,
    /// Clashing extent of the current operand.
    pub rhs: usize,
}

/// An explicit multi-index access with wrong rank or out-of-range component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Index has a different number of components than the array has
    /// dimensions.
    #[error("index rank {got} does not match array rank {expected}")]
    RankMismatch { expected: usize, got: usize },

    /// One index component is outside its dimension's extent.
    #[error("index {index} out of range for dimension {dim} of extent {extent}")]
    OutOfRange {
        dim: usize,
        index: usize,
        extent: usize,
    },
}

/// Any structural error reported by the engine.
///
/// All variants are detected at expression-construction or assignment-entry
/// time, before any element is computed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Result type for expression engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
