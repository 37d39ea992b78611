#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `warpfit-tensor` provides the small dense matrices used by the estimators of the
//! workspace. Storage is column-major `f32` with explicit strides, so sub-blocks and
//! transposes are views over the same buffer rather than copies.
//!
//! - **Matrix**: owning, densely packed matrix (`strides == [1, rows]`)
//! - **MatrixView** / **MatrixViewMut**: borrowing strided views, tied to the lifetime of their source
//! - **ops**: elementwise and matrix products writing into output parameters
//! - **inverse**: closed-form `1x1`, `2x2` and `3x3` inverses with a NaN result for singular input
//!
//! # Quick Start
//!
//! ```rust
//! use warpfit_tensor::{ops, Matrix};
//!
//! let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//!
//! // aᵗa without materializing the transpose
//! let mut ata = Matrix::zeros(3, 3);
//! ops::multiply_lt(&mut ata, &a, &a);
//! assert_eq!(ata.at(0, 0), 17.0);
//!
//! // write into the top-left block of a larger matrix
//! let mut big = Matrix::eye(4, 4);
//! big.block_mut(0, 2, 0, 2).copy_from(&ata);
//! assert_eq!(big.at(3, 3), 1.0);
//! ```

/// Error types for matrix construction.
pub mod error;

/// Closed-form small-matrix inverses.
pub mod inverse;

/// Owning matrix type.
pub mod matrix;

pub mod ops;

/// Borrowing views and the matrix access traits.
pub mod view;

/// Serialization of matrices.
#[cfg(feature = "serde")]
pub mod serde;

pub use crate::error::TensorError;
pub use crate::matrix::Matrix;
pub use crate::view::{AsMatrix, AsMatrixMut, MatrixView, MatrixViewMut};
