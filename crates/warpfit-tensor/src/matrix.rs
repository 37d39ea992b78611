use crate::{
    view::{validate_layout, AsMatrix, AsMatrixMut, MatrixView, MatrixViewMut},
    TensorError,
};

/// An owning, densely packed, column-major `f32` matrix.
///
/// Entry `(r, c)` is stored at `data[r + c * rows]`, i.e. the strides are
/// `[1, rows]`. Both dimensions are always positive.
///
/// # Examples
///
/// ```rust
/// use warpfit_tensor::Matrix;
///
/// let m = Matrix::from_shape_vec([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
///
/// // column-major: the second entry of the buffer is (1, 0)
/// assert_eq!(m.at(1, 0), 2.0);
/// assert_eq!(m.at(0, 1), 3.0);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    rows: usize,
    columns: usize,
}

impl Matrix {
    /// Creates a new matrix filled with `value`.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn from_elem(rows: usize, columns: usize, value: f32) -> Self {
        assert!(
            rows > 0 && columns > 0,
            "matrix dimensions must be positive, got {rows}x{columns}"
        );
        Self {
            data: vec![value; rows * columns],
            rows,
            columns,
        }
    }

    /// Creates a new matrix filled with zeros.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn zeros(rows: usize, columns: usize) -> Self {
        Self::from_elem(rows, columns, 0.0)
    }

    /// Creates a matrix with ones on the main diagonal and zeros elsewhere.
    ///
    /// Non-square shapes are allowed.
    pub fn eye(rows: usize, columns: usize) -> Self {
        let mut m = Self::zeros(rows, columns);
        for i in 0..rows.min(columns) {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Creates a matrix filled with NaN, to be overwritten by an operation.
    pub fn blank(rows: usize, columns: usize) -> Self {
        Self::from_elem(rows, columns, f32::NAN)
    }

    /// Creates a matrix from a column-major buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or if `data.len() != rows * columns`.
    pub fn from_shape_vec(shape: [usize; 2], data: Vec<f32>) -> Result<Self, TensorError> {
        let [rows, columns] = shape;
        validate_layout(data.len(), rows, columns, [1, rows.max(1)])?;
        Ok(Self {
            data,
            rows,
            columns,
        })
    }

    /// Creates a matrix from a row-major slice, which reads more naturally in code.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty or if `values.len() != rows * columns`.
    pub fn from_row_slice(
        rows: usize,
        columns: usize,
        values: &[f32],
    ) -> Result<Self, TensorError> {
        if rows == 0 || columns == 0 {
            return Err(TensorError::InvalidShape { rows, columns });
        }
        if values.len() != rows * columns {
            return Err(TensorError::InvalidBufferLength {
                expected: rows * columns,
                actual: values.len(),
            });
        }
        Ok(Self::from_shape_fn([rows, columns], |[r, c]| {
            values[r * columns + c]
        }))
    }

    /// Creates a matrix by evaluating `f` at every `[row, column]` index.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn from_shape_fn<F>(shape: [usize; 2], mut f: F) -> Self
    where
        F: FnMut([usize; 2]) -> f32,
    {
        let [rows, columns] = shape;
        let mut m = Self::zeros(rows, columns);
        for c in 0..columns {
            for r in 0..rows {
                m.set(r, c, f([r, c]));
            }
        }
        m
    }

    /// Packs a list of 2D points into a `2 x n` matrix, one point per column.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    pub fn from_points(points: &[[f32; 2]]) -> Self {
        assert!(!points.is_empty(), "cannot build a matrix from zero points");
        Self {
            data: points.iter().flatten().copied().collect(),
            rows: 2,
            columns: points.len(),
        }
    }

    /// Creates an owning copy of any matrix or view.
    pub fn clone_of(src: &impl AsMatrix) -> Self {
        let src = src.as_view();
        Self {
            data: src.iter().collect(),
            rows: src.rows(),
            columns: src.columns(),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    /// The shape as `[rows, columns]`.
    #[inline]
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.columns]
    }

    /// The strides, always `[1, rows]`.
    #[inline]
    pub fn strides(&self) -> [usize; 2] {
        [1, self.rows]
    }

    /// The column-major buffer.
    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// The mutable column-major buffer.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the matrix and returns its column-major buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Reads the entry at `(row, column)`.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        debug_assert!(row < self.rows && column < self.columns);
        self.data[row + column * self.rows]
    }

    /// Mutable reference to the entry at `(row, column)`.
    #[inline]
    pub fn at_mut(&mut self, row: usize, column: usize) -> &mut f32 {
        debug_assert!(row < self.rows && column < self.columns);
        &mut self.data[row + column * self.rows]
    }

    /// Writes `value` at `(row, column)`.
    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: f32) {
        *self.at_mut(row, column) = value;
    }

    /// A read-only view of the whole matrix.
    pub fn view(&self) -> MatrixView<'_> {
        MatrixView::from_raw_parts(&self.data, self.rows, self.columns, self.strides())
    }

    /// A mutable view of the whole matrix.
    pub fn view_mut(&mut self) -> MatrixViewMut<'_> {
        let strides = self.strides();
        MatrixViewMut::from_raw_parts(&mut self.data, self.rows, self.columns, strides)
    }

    /// A read-only view of an inclusive block.
    ///
    /// # Panics
    ///
    /// Panics if the block exceeds the bounds of the matrix.
    pub fn block(
        &self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixView<'_> {
        self.view().block(first_row, last_row, first_column, last_column)
    }

    /// A mutable view of an inclusive block.
    ///
    /// # Panics
    ///
    /// Panics if the block exceeds the bounds of the matrix.
    pub fn block_mut(
        &mut self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixViewMut<'_> {
        self.view_mut().into_block(first_row, last_row, first_column, last_column)
    }

    /// A read-only view of the `j`-th column.
    pub fn column(&self, j: usize) -> MatrixView<'_> {
        self.view().column(j)
    }

    /// A read-only view of the `i`-th row.
    pub fn row(&self, i: usize) -> MatrixView<'_> {
        self.view().row(i)
    }

    /// A transposed read-only view.
    pub fn transpose(&self) -> MatrixView<'_> {
        self.view().transpose()
    }

    /// Sets every entry to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Sets every entry to zero.
    pub fn clear(&mut self) {
        self.fill(0.0);
    }

    /// Copies the entries of `src` into this matrix.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, src: &impl AsMatrix) {
        self.view_mut().copy_from(src);
    }

    /// Returns true if any entry is NaN.
    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|v| v.is_nan())
    }

    /// Reads the columns of a `2 x n` matrix back as points.
    ///
    /// # Panics
    ///
    /// Panics if the matrix does not have exactly two rows.
    pub fn to_points(&self) -> Vec<[f32; 2]> {
        assert_eq!(self.rows, 2, "points are stored as a 2 x n matrix");
        self.data.chunks_exact(2).map(|p| [p[0], p[1]]).collect()
    }
}

impl AsMatrix for Matrix {
    fn as_view(&self) -> MatrixView<'_> {
        self.view()
    }
}

impl AsMatrixMut for Matrix {
    fn as_view_mut(&mut self) -> MatrixViewMut<'_> {
        self.view_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() -> Result<(), TensorError> {
        let z = Matrix::zeros(2, 3);
        assert_eq!(z.shape(), [2, 3]);
        assert_eq!(z.strides(), [1, 2]);
        assert!(z.as_slice().iter().all(|&v| v == 0.0));

        let e = Matrix::eye(3, 2);
        assert_eq!(e.as_slice(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);

        let b = Matrix::blank(2, 2);
        assert!(b.has_nan());

        let r = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])?;
        assert_eq!(r.as_slice(), &[1.0, 3.0, 2.0, 4.0]);

        let f = Matrix::from_shape_fn([2, 2], |[i, j]| (i * 10 + j) as f32);
        assert_eq!(f.at(1, 0), 10.0);
        assert_eq!(f.at(0, 1), 1.0);
        Ok(())
    }

    #[test]
    fn test_from_shape_vec_errors() {
        assert_eq!(
            Matrix::from_shape_vec([2, 2], vec![0.0; 3]).unwrap_err(),
            TensorError::InvalidBufferLength {
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(
            Matrix::from_shape_vec([0, 2], vec![]).unwrap_err(),
            TensorError::InvalidShape {
                rows: 0,
                columns: 2
            }
        );
    }

    #[test]
    fn test_points() {
        let pts = [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let m = Matrix::from_points(&pts);
        assert_eq!(m.shape(), [2, 3]);
        assert_eq!(m.at(1, 2), 6.0);
        assert_eq!(m.to_points(), pts.to_vec());
    }

    #[test]
    fn test_clone_of_strided_view() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])?;
        let c = Matrix::clone_of(&m.block(0, 1, 1, 2));
        assert_eq!(c, Matrix::from_row_slice(2, 2, &[2.0, 3.0, 5.0, 6.0])?);
        let t = m.transpose().to_matrix();
        assert_eq!(t.at(0, 2), 7.0);
        Ok(())
    }

    #[test]
    fn test_row_and_column() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let row = m.row(1);
        assert_eq!(row.shape(), [1, 3]);
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![4.0, 5.0, 6.0]);

        let column = m.column(2);
        assert_eq!(column.shape(), [2, 1]);
        assert_eq!(column.iter().collect::<Vec<_>>(), vec![3.0, 6.0]);
        Ok(())
    }
}
