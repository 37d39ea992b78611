use thiserror::Error;

/// An error type for matrix construction.
#[derive(Debug, Error, PartialEq)]
pub enum TensorError {
    /// Both dimensions of a matrix must be positive.
    #[error("Invalid matrix shape {rows}x{columns}: both dimensions must be positive")]
    InvalidShape {
        /// Requested number of rows.
        rows: usize,
        /// Requested number of columns.
        columns: usize,
    },

    /// Strides must satisfy `step1 >= step0 > 0`.
    #[error("Invalid strides ({step0}, {step1}): expected step1 >= step0 > 0")]
    InvalidStrides {
        /// Step between entries of a column.
        step0: usize,
        /// Step between columns.
        step1: usize,
    },

    /// The buffer does not span exactly the requested layout.
    #[error("Buffer length mismatch: the layout spans {expected} elements but the buffer has {actual}")]
    InvalidBufferLength {
        /// Number of elements spanned by the layout.
        expected: usize,
        /// Number of elements in the buffer.
        actual: usize,
    },
}
