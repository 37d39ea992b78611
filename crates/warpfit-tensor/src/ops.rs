//! Elementwise and matrix arithmetic on strided views.
//!
//! Every operation writes into a pre-shaped output parameter and never
//! allocates. Shapes are checked with `assert!`; a mismatch is a bug in the
//! caller.

use crate::{AsMatrix, AsMatrixMut, MatrixView, MatrixViewMut};

/// Applies `f` to each pair of entries of `a` and `b`, writing into `result`.
fn zip_map(
    result: &mut MatrixViewMut<'_>,
    a: MatrixView<'_>,
    b: MatrixView<'_>,
    f: impl Fn(f32, f32) -> f32,
) {
    for c in 0..result.columns() {
        for r in 0..result.rows() {
            result.set(r, c, f(a.at(r, c), b.at(r, c)));
        }
    }
}

/// Writes the transpose of `src` into `result`.
///
/// # Panics
///
/// Panics if `result` is not `src.columns() x src.rows()`.
pub fn transpose(result: &mut impl AsMatrixMut, src: &impl AsMatrix) {
    let src = src.as_view();
    let mut result = result.as_view_mut();
    result.copy_from(&src.transpose());
}

/// Computes `result = a + b`.
///
/// # Panics
///
/// Panics if the three shapes are not equal.
pub fn add(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    let (a, b) = (a.as_view(), b.as_view());
    let mut result = result.as_view_mut();
    assert!(
        a.shape() == b.shape() && a.shape() == result.shape(),
        "add: shape mismatch"
    );
    zip_map(&mut result, a, b, |x, y| x + y);
}

/// Computes `result = a - b`.
///
/// # Panics
///
/// Panics if the three shapes are not equal.
pub fn subtract(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    let (a, b) = (a.as_view(), b.as_view());
    let mut result = result.as_view_mut();
    assert!(
        a.shape() == b.shape() && a.shape() == result.shape(),
        "subtract: shape mismatch"
    );
    zip_map(&mut result, a, b, |x, y| x - y);
}

/// Computes the componentwise product `result = a .* b`.
///
/// # Panics
///
/// Panics if the three shapes are not equal.
pub fn compmult(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    let (a, b) = (a.as_view(), b.as_view());
    let mut result = result.as_view_mut();
    assert!(
        a.shape() == b.shape() && a.shape() == result.shape(),
        "compmult: shape mismatch"
    );
    zip_map(&mut result, a, b, |x, y| x * y);
}

/// Computes `result = scalar * src`.
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn scale(result: &mut impl AsMatrixMut, scalar: f32, src: &impl AsMatrix) {
    let src = src.as_view();
    let mut result = result.as_view_mut();
    assert_eq!(result.shape(), src.shape(), "scale: shape mismatch");
    for c in 0..src.columns() {
        for r in 0..src.rows() {
            result.set(r, c, scalar * src.at(r, c));
        }
    }
}

/// Multiplies every entry of `result` by `scalar`.
pub fn scale_in_place(result: &mut impl AsMatrixMut, scalar: f32) {
    let mut result = result.as_view_mut();
    for c in 0..result.columns() {
        for r in 0..result.rows() {
            *result.at_mut(r, c) *= scalar;
        }
    }
}

/// Computes `result += scalar * src`.
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn add_in_place(result: &mut impl AsMatrixMut, scalar: f32, src: &impl AsMatrix) {
    let src = src.as_view();
    let mut result = result.as_view_mut();
    assert_eq!(result.shape(), src.shape(), "add_in_place: shape mismatch");
    for c in 0..src.columns() {
        for r in 0..src.rows() {
            *result.at_mut(r, c) += scalar * src.at(r, c);
        }
    }
}

/// Shared kernel of the three matrix products, on already transposed views.
fn gemm(result: &mut MatrixViewMut<'_>, a: MatrixView<'_>, b: MatrixView<'_>) {
    assert!(
        a.columns() == b.rows() && result.shape() == [a.rows(), b.columns()],
        "multiply: cannot store a ({}x{}) * ({}x{}) product in a {}x{} matrix",
        a.rows(),
        a.columns(),
        b.rows(),
        b.columns(),
        result.rows(),
        result.columns()
    );

    result.clear();
    for j in 0..b.columns() {
        for k in 0..a.columns() {
            let bkj = b.at(k, j);
            for i in 0..a.rows() {
                *result.at_mut(i, j) += a.at(i, k) * bkj;
            }
        }
    }
}

/// Computes the matrix product `result = a * b`.
///
/// # Panics
///
/// Panics if `a.columns() != b.rows()` or `result` is not `a.rows() x b.columns()`.
///
/// # Example
///
/// ```rust
/// use warpfit_tensor::{ops, Matrix};
///
/// let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
/// let b = Matrix::eye(2, 2);
/// let mut c = Matrix::zeros(2, 2);
/// ops::multiply(&mut c, &a, &b);
/// assert_eq!(c, a);
/// ```
pub fn multiply(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    gemm(&mut result.as_view_mut(), a.as_view(), b.as_view());
}

/// Computes `result = aᵗ * b` without materializing the transpose.
///
/// # Panics
///
/// Panics if `a.rows() != b.rows()` or `result` is not `a.columns() x b.columns()`.
pub fn multiply_lt(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    gemm(&mut result.as_view_mut(), a.as_view().transpose(), b.as_view());
}

/// Computes `result = a * bᵗ` without materializing the transpose.
///
/// # Panics
///
/// Panics if `a.columns() != b.columns()` or `result` is not `a.rows() x b.rows()`.
pub fn multiply_rt(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    gemm(&mut result.as_view_mut(), a.as_view(), b.as_view().transpose());
}

/// Unrolled `3x3` product `result = a * b`.
///
/// # Panics
///
/// Panics if any operand is not `3x3`.
pub fn multiply3(result: &mut impl AsMatrixMut, a: &impl AsMatrix, b: &impl AsMatrix) {
    let (a, b) = (a.as_view(), b.as_view());
    let mut result = result.as_view_mut();
    assert!(
        a.shape() == [3, 3] && b.shape() == [3, 3] && result.shape() == [3, 3],
        "multiply3: operands must be 3x3"
    );

    let (a00, a01, a02) = (a.at(0, 0), a.at(0, 1), a.at(0, 2));
    let (a10, a11, a12) = (a.at(1, 0), a.at(1, 1), a.at(1, 2));
    let (a20, a21, a22) = (a.at(2, 0), a.at(2, 1), a.at(2, 2));
    for j in 0..3 {
        let (b0, b1, b2) = (b.at(0, j), b.at(1, j), b.at(2, j));
        result.set(0, j, a00 * b0 + a01 * b1 + a02 * b2);
        result.set(1, j, a10 * b0 + a11 * b1 + a12 * b2);
        result.set(2, j, a20 * b0 + a21 * b1 + a22 * b2);
    }
}

/// Computes the outer product `result = column * row`.
///
/// # Panics
///
/// Panics if `column` is not `m x 1`, `row` is not `1 x n` or `result` is not `m x n`.
pub fn outer(result: &mut impl AsMatrixMut, column: &impl AsMatrix, row: &impl AsMatrix) {
    let (column, row) = (column.as_view(), row.as_view());
    assert!(
        column.columns() == 1 && row.rows() == 1,
        "outer: expected a column and a row"
    );
    gemm(&mut result.as_view_mut(), column, row);
}

/// Computes the inner product `row * column` of a `1 x n` row and an `n x 1` column.
///
/// # Panics
///
/// Panics if the operands are not a row and a column of the same length.
pub fn inner(row: &impl AsMatrix, column: &impl AsMatrix) -> f32 {
    let (row, column) = (row.as_view(), column.as_view());
    assert!(
        row.rows() == 1 && column.columns() == 1 && row.columns() == column.rows(),
        "inner: expected a 1xn row and an nx1 column"
    );
    (0..row.columns()).map(|k| row.at(0, k) * column.at(k, 0)).sum()
}

/// Computes the dot product `aᵗ * b` of two columns of the same length.
///
/// # Panics
///
/// Panics if the operands are not columns of the same length.
pub fn dot(a: &impl AsMatrix, b: &impl AsMatrix) -> f32 {
    let (a, b) = (a.as_view(), b.as_view());
    assert!(
        a.columns() == 1 && b.columns() == 1 && a.rows() == b.rows(),
        "dot: expected two columns of the same length"
    );
    (0..a.rows()).map(|k| a.at(k, 0) * b.at(k, 0)).sum()
}

/// The Euclidean norm of all entries (the 2-norm of a vector).
pub fn norm2(src: &impl AsMatrix) -> f32 {
    src.as_view().iter().map(|v| v * v).sum::<f32>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Matrix, TensorError};
    use approx::assert_relative_eq;

    #[test]
    fn test_elementwise() -> Result<(), TensorError> {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0])?;
        let b = Matrix::from_row_slice(2, 2, &[4.0, 3.0, 2.0, 1.0])?;
        let mut c = Matrix::zeros(2, 2);

        add(&mut c, &a, &b);
        assert_eq!(c, Matrix::from_elem(2, 2, 5.0));

        subtract(&mut c, &a, &b);
        assert_eq!(c, Matrix::from_row_slice(2, 2, &[-3.0, -1.0, 1.0, 3.0])?);

        compmult(&mut c, &a, &b);
        assert_eq!(c, Matrix::from_row_slice(2, 2, &[4.0, 6.0, 6.0, 4.0])?);

        scale(&mut c, 0.5, &a);
        assert_eq!(c, Matrix::from_row_slice(2, 2, &[0.5, 1.0, 1.5, 2.0])?);

        add_in_place(&mut c, 2.0, &b);
        assert_eq!(c, Matrix::from_row_slice(2, 2, &[8.5, 7.0, 5.5, 4.0])?);

        scale_in_place(&mut c, 2.0);
        assert_eq!(c.at(0, 0), 17.0);
        Ok(())
    }

    #[test]
    fn test_products() -> Result<(), TensorError> {
        let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
        let b = Matrix::from_row_slice(3, 2, &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0])?;
        let expected = Matrix::from_row_slice(2, 2, &[58.0, 64.0, 139.0, 154.0])?;

        let mut c = Matrix::blank(2, 2);
        multiply(&mut c, &a, &b);
        assert_eq!(c, expected);

        // aᵗᵗ * b and a * bᵗᵗ give the same product
        let at = a.transpose().to_matrix();
        let bt = b.transpose().to_matrix();
        let mut d = Matrix::blank(2, 2);
        multiply_lt(&mut d, &at, &b);
        assert_eq!(d, expected);
        multiply_rt(&mut d, &a, &bt);
        assert_eq!(d, expected);

        let mut t = Matrix::zeros(3, 2);
        transpose(&mut t, &a);
        assert_eq!(t, at);
        Ok(())
    }

    #[test]
    fn test_multiply3_matches_multiply() -> Result<(), TensorError> {
        let a = Matrix::from_shape_fn([3, 3], |[i, j]| (i * 3 + j) as f32 - 2.5);
        let b = Matrix::from_shape_fn([3, 3], |[i, j]| 1.0 / (1.0 + i as f32 + j as f32));
        let mut c = Matrix::zeros(3, 3);
        let mut d = Matrix::zeros(3, 3);
        multiply(&mut c, &a, &b);
        multiply3(&mut d, &a, &b);
        for (x, y) in c.as_slice().iter().zip(d.as_slice()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-5, max_relative = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_vector_products() -> Result<(), TensorError> {
        let col = Matrix::from_shape_vec([3, 1], vec![1.0, 2.0, 2.0])?;
        let row = Matrix::from_row_slice(1, 3, &[3.0, 0.0, -1.0])?;

        assert_eq!(inner(&row, &col), 1.0);
        assert_eq!(dot(&col, &col), 9.0);
        assert_relative_eq!(norm2(&col), 3.0);

        let mut o = Matrix::zeros(3, 3);
        outer(&mut o, &col, &row);
        assert_eq!(o.at(1, 0), 6.0);
        assert_eq!(o.at(2, 2), -2.0);
        Ok(())
    }

    #[test]
    fn test_multiply_into_block() -> Result<(), TensorError> {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 1.0, 0.0, 1.0])?;
        let mut big = Matrix::eye(3, 3);
        multiply(&mut big.block_mut(0, 1, 0, 1), &a, &a);
        assert_eq!(big.at(0, 1), 2.0);
        assert_eq!(big.at(2, 2), 1.0);
        Ok(())
    }

    #[test]
    #[should_panic]
    fn test_multiply_shape_mismatch() {
        let a = Matrix::zeros(2, 3);
        let mut c = Matrix::zeros(2, 2);
        multiply(&mut c, &a, &a);
    }
}
