use crate::{Matrix, TensorError};

/// Number of buffer elements spanned by a `rows x columns` layout with the given strides.
#[inline]
pub(crate) fn span_length(rows: usize, columns: usize, strides: [usize; 2]) -> usize {
    1 + strides[0] * (rows - 1) + strides[1] * (columns - 1)
}

/// Validates a strided layout over a buffer of `len` elements.
pub(crate) fn validate_layout(
    len: usize,
    rows: usize,
    columns: usize,
    strides: [usize; 2],
) -> Result<(), TensorError> {
    if rows == 0 || columns == 0 {
        return Err(TensorError::InvalidShape { rows, columns });
    }
    if strides[0] == 0 || strides[1] < strides[0] {
        return Err(TensorError::InvalidStrides {
            step0: strides[0],
            step1: strides[1],
        });
    }
    let expected = span_length(rows, columns, strides);
    if len != expected {
        return Err(TensorError::InvalidBufferLength {
            expected,
            actual: len,
        });
    }
    Ok(())
}

/// Computes the buffer range and shape of an inclusive sub-block.
///
/// # Panics
///
/// Panics if the block does not fit inside a matrix of the given shape.
fn block_layout(
    shape: [usize; 2],
    strides: [usize; 2],
    first_row: usize,
    last_row: usize,
    first_column: usize,
    last_column: usize,
) -> (usize, usize, [usize; 2]) {
    assert!(
        first_row <= last_row
            && first_column <= last_column
            && last_row < shape[0]
            && last_column < shape[1],
        "block [{first_row}..={last_row}, {first_column}..={last_column}] is out of bounds for a {}x{} matrix",
        shape[0],
        shape[1]
    );

    let begin = first_row * strides[0] + first_column * strides[1];
    let end = 1 + last_row * strides[0] + last_column * strides[1];
    (
        begin,
        end,
        [last_row - first_row + 1, last_column - first_column + 1],
    )
}

/// Read access to anything that can be seen as a strided matrix.
///
/// Implemented by the owning [`Matrix`] and by both view types, so that
/// arithmetic and estimators accept any of them as input.
pub trait AsMatrix {
    /// Borrows the entries as a read-only view.
    fn as_view(&self) -> MatrixView<'_>;
}

/// Write access to anything that can be seen as a strided matrix.
///
/// Output parameters of every operation in this workspace are taken as
/// `&mut impl AsMatrixMut`, so results can be written into an owned matrix
/// or into a block of a larger one.
pub trait AsMatrixMut: AsMatrix {
    /// Borrows the entries as a mutable view.
    fn as_view_mut(&mut self) -> MatrixViewMut<'_>;
}

/// A non-owning, read-only view into a column-major `f32` buffer.
///
/// Entry `(r, c)` lives at `data[r * strides[0] + c * strides[1]]`. A view
/// borrows the buffer of its source for `'a`, so it can never outlive it and
/// it never releases anything.
///
/// # Examples
///
/// ```rust
/// use warpfit_tensor::Matrix;
///
/// let m = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
/// let b = m.block(0, 1, 1, 2);
/// assert_eq!(b.shape(), [2, 2]);
/// assert_eq!(b.at(1, 0), 5.0);
///
/// let t = b.transpose();
/// assert_eq!(t.at(0, 1), 5.0);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct MatrixView<'a> {
    data: &'a [f32],
    rows: usize,
    columns: usize,
    strides: [usize; 2],
}

impl<'a> MatrixView<'a> {
    /// Creates a view over an existing buffer.
    ///
    /// # Arguments
    ///
    /// * `data` - Buffer holding the entries in column-major order.
    /// * `rows` - Number of rows.
    /// * `columns` - Number of columns.
    /// * `step0` - Step between two consecutive entries of a column, usually 1.
    /// * `step1` - Step between two consecutive columns, usually `rows`.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape is empty, if `step1 >= step0 > 0` does not hold,
    /// or if `data.len() != 1 + step0 * (rows - 1) + step1 * (columns - 1)`.
    pub fn from_slice(
        data: &'a [f32],
        rows: usize,
        columns: usize,
        step0: usize,
        step1: usize,
    ) -> Result<Self, TensorError> {
        validate_layout(data.len(), rows, columns, [step0, step1])?;
        Ok(Self {
            data,
            rows,
            columns,
            strides: [step0, step1],
        })
    }

    pub(crate) fn from_raw_parts(
        data: &'a [f32],
        rows: usize,
        columns: usize,
        strides: [usize; 2],
    ) -> Self {
        Self {
            data,
            rows,
            columns,
            strides,
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

    /// The strides as `[step0, step1]`.
    #[inline]
    pub fn strides(&self) -> [usize; 2] {
        self.strides
    }

    /// The underlying buffer, from the first to the last entry of the view.
    #[inline]
    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Reads the entry at `(row, column)`.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        debug_assert!(row < self.rows && column < self.columns);
        self.data[row * self.strides[0] + column * self.strides[1]]
    }

    /// Reads the entry at `(row, column)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, column: usize) -> Option<f32> {
        if row < self.rows && column < self.columns {
            Some(self.at(row, column))
        } else {
            None
        }
    }

    /// A view of the inclusive block `[first_row..=last_row, first_column..=last_column]`.
    ///
    /// # Panics
    ///
    /// Panics if the block exceeds the bounds of this view.
    pub fn block(
        &self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixView<'a> {
        let (begin, end, [rows, columns]) = block_layout(
            self.shape(),
            self.strides,
            first_row,
            last_row,
            first_column,
            last_column,
        );
        MatrixView::from_raw_parts(&self.data[begin..end], rows, columns, self.strides)
    }

    /// A view of the `j`-th column.
    pub fn column(&self, j: usize) -> MatrixView<'a> {
        self.block(0, self.rows - 1, j, j)
    }

    /// A view of the `i`-th row.
    pub fn row(&self, i: usize) -> MatrixView<'a> {
        self.block(i, i, 0, self.columns - 1)
    }

    /// A transposed view of the same buffer (no data is copied).
    pub fn transpose(&self) -> MatrixView<'a> {
        MatrixView::from_raw_parts(
            self.data,
            self.columns,
            self.rows,
            [self.strides[1], self.strides[0]],
        )
    }

    /// Iterates over the entries in column-major order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        (0..self.columns).flat_map(move |c| (0..self.rows).map(move |r| self.at(r, c)))
    }

    /// Returns true if any entry is NaN.
    pub fn has_nan(&self) -> bool {
        self.iter().any(f32::is_nan)
    }

    /// Copies the entries into a new owning matrix.
    pub fn to_matrix(&self) -> Matrix {
        Matrix::clone_of(self)
    }
}

impl AsMatrix for MatrixView<'_> {
    fn as_view(&self) -> MatrixView<'_> {
        *self
    }
}

/// A non-owning, mutable view into a column-major `f32` buffer.
///
/// This is the output-parameter type of the workspace: operations write their
/// results in place through it, whether it covers a whole [`Matrix`] or a block.
#[derive(Debug)]
pub struct MatrixViewMut<'a> {
    data: &'a mut [f32],
    rows: usize,
    columns: usize,
    strides: [usize; 2],
}

impl<'a> MatrixViewMut<'a> {
    /// Creates a mutable view over an existing buffer.
    ///
    /// # Errors
    ///
    /// Same layout rules as [`MatrixView::from_slice`].
    pub fn from_slice(
        data: &'a mut [f32],
        rows: usize,
        columns: usize,
        step0: usize,
        step1: usize,
    ) -> Result<Self, TensorError> {
        validate_layout(data.len(), rows, columns, [step0, step1])?;
        Ok(Self {
            data,
            rows,
            columns,
            strides: [step0, step1],
        })
    }

    pub(crate) fn from_raw_parts(
        data: &'a mut [f32],
        rows: usize,
        columns: usize,
        strides: [usize; 2],
    ) -> Self {
        Self {
            data,
            rows,
            columns,
            strides,
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

    /// The strides as `[step0, step1]`.
    #[inline]
    pub fn strides(&self) -> [usize; 2] {
        self.strides
    }

    /// Reads the entry at `(row, column)`.
    #[inline]
    pub fn at(&self, row: usize, column: usize) -> f32 {
        debug_assert!(row < self.rows && column < self.columns);
        self.data[row * self.strides[0] + column * self.strides[1]]
    }

    /// Mutable reference to the entry at `(row, column)`.
    #[inline]
    pub fn at_mut(&mut self, row: usize, column: usize) -> &mut f32 {
        debug_assert!(row < self.rows && column < self.columns);
        &mut self.data[row * self.strides[0] + column * self.strides[1]]
    }

    /// Writes `value` at `(row, column)`.
    #[inline]
    pub fn set(&mut self, row: usize, column: usize, value: f32) {
        *self.at_mut(row, column) = value;
    }

    /// A read-only view of the same entries.
    pub fn as_view(&self) -> MatrixView<'_> {
        MatrixView::from_raw_parts(&*self.data, self.rows, self.columns, self.strides)
    }

    /// Reborrows this view for a shorter lifetime.
    pub fn reborrow(&mut self) -> MatrixViewMut<'_> {
        MatrixViewMut::from_raw_parts(&mut *self.data, self.rows, self.columns, self.strides)
    }

    /// A read-only view of an inclusive block.
    pub fn block(
        &self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixView<'_> {
        self.as_view().block(first_row, last_row, first_column, last_column)
    }

    /// A mutable view of an inclusive block.
    ///
    /// # Panics
    ///
    /// Panics if the block exceeds the bounds of this view.
    pub fn block_mut(
        &mut self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixViewMut<'_> {
        self.reborrow().into_block(first_row, last_row, first_column, last_column)
    }

    /// Turns this view into a view of one of its inclusive blocks.
    pub fn into_block(
        self,
        first_row: usize,
        last_row: usize,
        first_column: usize,
        last_column: usize,
    ) -> MatrixViewMut<'a> {
        let (begin, end, [rows, columns]) = block_layout(
            self.shape(),
            self.strides,
            first_row,
            last_row,
            first_column,
            last_column,
        );
        let strides = self.strides;
        let data = self.data;
        MatrixViewMut::from_raw_parts(&mut data[begin..end], rows, columns, strides)
    }

    /// A mutable view of the `j`-th column.
    pub fn column_mut(&mut self, j: usize) -> MatrixViewMut<'_> {
        let last_row = self.rows - 1;
        self.block_mut(0, last_row, j, j)
    }

    /// Sets every entry to `value`.
    pub fn fill(&mut self, value: f32) {
        if self.is_contiguous() {
            self.data.fill(value);
            return;
        }
        for c in 0..self.columns {
            for r in 0..self.rows {
                self.set(r, c, value);
            }
        }
    }

    /// Sets every entry to zero.
    pub fn clear(&mut self) {
        self.fill(0.0);
    }

    /// Copies the entries of `src` into this view.
    ///
    /// # Panics
    ///
    /// Panics if the shapes differ.
    pub fn copy_from(&mut self, src: &impl AsMatrix) {
        let src = src.as_view();
        assert_eq!(self.shape(), src.shape(), "copy: shape mismatch");

        if self.is_contiguous()
            && src.strides() == self.strides
            && src.as_slice().len() == self.data.len()
        {
            self.data.copy_from_slice(src.as_slice());
            return;
        }
        for c in 0..self.columns {
            for r in 0..self.rows {
                self.set(r, c, src.at(r, c));
            }
        }
    }

    /// Returns true if any entry is NaN.
    pub fn has_nan(&self) -> bool {
        self.as_view().has_nan()
    }

    /// True when the view covers its buffer without gaps.
    fn is_contiguous(&self) -> bool {
        self.rows * self.columns == self.data.len()
    }
}

impl AsMatrix for MatrixViewMut<'_> {
    fn as_view(&self) -> MatrixView<'_> {
        MatrixView::from_raw_parts(&*self.data, self.rows, self.columns, self.strides)
    }
}

impl AsMatrixMut for MatrixViewMut<'_> {
    fn as_view_mut(&mut self) -> MatrixViewMut<'_> {
        self.reborrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_from_slice() -> Result<(), TensorError> {
        // 2x3 matrix with a padded column stride of 3
        let data = [1.0, 2.0, -1.0, 3.0, 4.0, -1.0, 5.0, 6.0];
        let view = MatrixView::from_slice(&data, 2, 3, 1, 3)?;
        assert_eq!(view.shape(), [2, 3]);
        assert_eq!(view.at(0, 0), 1.0);
        assert_eq!(view.at(1, 1), 4.0);
        assert_eq!(view.at(1, 2), 6.0);
        assert_eq!(view.get(2, 0), None);
        Ok(())
    }

    #[test]
    fn test_view_invalid_layout() {
        let data = [0.0f32; 6];
        assert_eq!(
            MatrixView::from_slice(&data, 0, 3, 1, 2).unwrap_err(),
            TensorError::InvalidShape {
                rows: 0,
                columns: 3
            }
        );
        assert_eq!(
            MatrixView::from_slice(&data, 2, 3, 2, 1).unwrap_err(),
            TensorError::InvalidStrides { step0: 2, step1: 1 }
        );
        assert_eq!(
            MatrixView::from_slice(&data, 2, 2, 1, 2).unwrap_err(),
            TensorError::InvalidBufferLength {
                expected: 4,
                actual: 6
            }
        );
    }

    #[test]
    fn test_block_and_transpose() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0])?;
        let b = m.block(1, 2, 0, 1);
        assert_eq!(b.shape(), [2, 2]);
        assert_eq!(b.iter().collect::<Vec<_>>(), vec![4.0, 7.0, 5.0, 8.0]);

        let t = b.transpose();
        assert_eq!(t.shape(), [2, 2]);
        assert_eq!(t.at(0, 1), 7.0);
        assert_eq!(t.at(1, 0), 5.0);

        let row = m.row(2);
        assert_eq!(row.shape(), [1, 3]);
        assert_eq!(row.iter().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0]);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_block_out_of_bounds() {
        let m = Matrix::zeros(2, 2);
        let _ = m.block(0, 2, 0, 0);
    }

    #[test]
    fn test_block_mut_writes_through() {
        let mut m = Matrix::zeros(3, 3);
        {
            let mut v = m.view_mut();
            let mut b = v.block_mut(1, 2, 1, 2);
            b.fill(2.0);
            b.set(0, 0, 7.0);
        }
        assert_eq!(m.at(1, 1), 7.0);
        assert_eq!(m.at(2, 2), 2.0);
        assert_eq!(m.at(0, 0), 0.0);
        assert_eq!(m.at(0, 2), 0.0);
    }

    #[test]
    fn test_copy_from_strided() -> Result<(), TensorError> {
        let src = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])?;
        let mut dst = Matrix::zeros(3, 3);
        dst.view_mut().block_mut(1, 2, 1, 2).copy_from(&src.view().transpose());
        assert_eq!(dst.at(1, 1), 1.0);
        assert_eq!(dst.at(1, 2), 3.0);
        assert_eq!(dst.at(2, 1), 2.0);
        assert_eq!(dst.at(2, 2), 4.0);
        Ok(())
    }
}
