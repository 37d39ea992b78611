#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! Points are stored as `2 x n` matrices, one `(x, y)` point per column.
//! Every estimator writes its model into a pre-shaped output matrix. A model
//! that cannot be determined from the data (collinear samples, rank-deficient
//! systems, too few inliers) is reported by filling the output with NaN, which
//! callers check with [`warpfit_tensor::Matrix::has_nan`]. Malformed arguments
//! are reported as a [`GeometryError`].

/// Affine transform estimators.
pub mod affine;

mod error;
pub use error::GeometryError;

/// Homography estimators.
pub mod homography;

/// Similarity normalization of point sets.
pub mod normalize;

/// Preemptive RANSAC.
pub mod ransac;

/// Applying transforms to point sets.
pub mod transform;

pub use affine::{affine_direct, affine_direct3, affine_dlt};
pub use homography::{homography_dlt, homography_dlt4, homography_ndlt, homography_ndlt4};
pub use ransac::{pransac_affine, pransac_homography, PransacParams, PransacReport};
pub use transform::{transform_affine, transform_linear, transform_perspective};

use warpfit_tensor::MatrixView;

/// Magnitude below which an area or a determinant is treated as zero.
pub(crate) const EPSILON: f64 = 1e-6;

/// Number of refinement rounds of every least-squares solve.
pub(crate) const OLS_REFINEMENTS: usize = 3;

/// Reads column `j` of a `2 x n` point matrix.
#[inline]
pub(crate) fn point(points: MatrixView<'_>, j: usize) -> [f64; 2] {
    [points.at(0, j) as f64, points.at(1, j) as f64]
}
