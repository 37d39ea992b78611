#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! ```
//! use warpfit::{geometry, tensor::Matrix};
//!
//! let src = Matrix::from_points(&[[0.0, 0.0], [4.0, 0.0], [4.0, 3.0], [0.0, 3.0], [2.0, 1.0]]);
//! let dest = Matrix::from_points(&[[1.0, 1.0], [9.0, 1.0], [9.0, 7.0], [1.0, 7.0], [5.0, 3.0]]);
//!
//! let mut affine = Matrix::zeros(2, 3);
//! geometry::affine_direct(&mut affine, &src, &dest).unwrap();
//! assert!((affine.at(0, 0) - 2.0).abs() < 1e-3);
//! assert!((affine.at(1, 2) - 1.0).abs() < 1e-3);
//! ```

#[doc(inline)]
pub use warpfit_tensor as tensor;

#[doc(inline)]
pub use warpfit_linalg as linalg;

#[doc(inline)]
pub use warpfit_geometry as geometry;
