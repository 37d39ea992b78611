use thiserror::Error;

/// An error type for the QR solvers.
#[derive(Debug, Error, PartialEq)]
pub enum LinalgError {
    /// The matrix has fewer rows than columns.
    #[error("Underdetermined system: a {rows}x{columns} matrix needs at least as many rows as columns")]
    Underdetermined {
        /// Number of rows of the matrix.
        rows: usize,
        /// Number of columns of the matrix.
        columns: usize,
    },

    /// The matrix must be square.
    #[error("Expected a square matrix, got {rows}x{columns}")]
    NotSquare {
        /// Number of rows of the matrix.
        rows: usize,
        /// Number of columns of the matrix.
        columns: usize,
    },

    /// An operand does not have the shape implied by the others.
    #[error("Invalid shape for `{name}`: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Name of the offending operand.
        name: &'static str,
        /// Shape implied by the other operands.
        expected: [usize; 2],
        /// Shape that was passed.
        actual: [usize; 2],
    },
}

impl LinalgError {
    /// Returns an error if `actual` differs from `expected`.
    pub(crate) fn check_shape(
        name: &'static str,
        actual: [usize; 2],
        expected: [usize; 2],
    ) -> Result<(), Self> {
        if actual == expected {
            Ok(())
        } else {
            Err(Self::ShapeMismatch {
                name,
                expected,
                actual,
            })
        }
    }
}
