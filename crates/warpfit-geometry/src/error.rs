use warpfit_linalg::LinalgError;
use warpfit_tensor::MatrixView;

/// An error type for the geometry estimators.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GeometryError {
    /// A matrix argument has the wrong shape.
    #[error("Invalid shape for `{name}`: expected {expected:?}, got {actual:?}")]
    InvalidShape {
        /// Name of the offending argument.
        name: &'static str,
        /// Expected shape.
        expected: [usize; 2],
        /// Actual shape.
        actual: [usize; 2],
    },

    /// Source and destination do not hold the same number of points.
    #[error("Correspondence mismatch: {src_points} source points but {dest_points} destination points")]
    CorrespondenceMismatch {
        /// Number of source points.
        src_points: usize,
        /// Number of destination points.
        dest_points: usize,
    },

    /// Not enough correspondences to determine the model.
    #[error("Need at least {required} correspondences, got {actual}")]
    InsufficientCorrespondences {
        /// Minimal number of correspondences for the model.
        required: usize,
        /// Number of correspondences passed.
        actual: usize,
    },

    /// An estimator parameter is out of range.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Name of the parameter.
        name: &'static str,
        /// What the parameter must satisfy.
        reason: &'static str,
    },

    /// The least-squares solver rejected its input.
    #[error("Linear algebra error: {0}")]
    Linalg(#[from] LinalgError),
}

impl GeometryError {
    /// Returns an error if `actual` differs from `expected`.
    pub(crate) fn check_shape(
        name: &'static str,
        actual: [usize; 2],
        expected: [usize; 2],
    ) -> Result<(), Self> {
        if actual == expected {
            Ok(())
        } else {
            Err(Self::InvalidShape {
                name,
                expected,
                actual,
            })
        }
    }

    /// Validates a `2 x n` correspondence set and returns `n`.
    pub(crate) fn check_correspondences(
        src: MatrixView<'_>,
        dest: MatrixView<'_>,
        required: usize,
    ) -> Result<usize, Self> {
        let n = src.columns();
        Self::check_shape("src", src.shape(), [2, n])?;
        if dest.columns() != n {
            return Err(Self::CorrespondenceMismatch {
                src_points: n,
                dest_points: dest.columns(),
            });
        }
        Self::check_shape("dest", dest.shape(), [2, n])?;
        if n < required {
            return Err(Self::InsufficientCorrespondences {
                required,
                actual: n,
            });
        }
        Ok(n)
    }
}
