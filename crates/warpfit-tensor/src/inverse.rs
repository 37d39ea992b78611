//! Closed-form inverses of `1x1`, `2x2` and `3x3` matrices.
//!
//! A determinant whose magnitude is below [`SINGULAR_EPSILON`] marks the
//! matrix as singular and the result is filled with NaN.

use crate::{AsMatrix, AsMatrixMut};

/// Determinant magnitude below which a matrix is treated as singular.
pub const SINGULAR_EPSILON: f32 = 1e-6;

/// Reciprocal of `det`, or NaN when the matrix is singular.
#[inline]
fn inverse_determinant(det: f32) -> f32 {
    if det.abs() < SINGULAR_EPSILON {
        f32::NAN
    } else {
        1.0 / det
    }
}

/// Inverts a `1x1` matrix.
///
/// # Panics
///
/// Panics if either operand is not `1x1`.
pub fn inverse1(result: &mut impl AsMatrixMut, src: &impl AsMatrix) {
    let src = src.as_view();
    let mut result = result.as_view_mut();
    assert!(
        src.shape() == [1, 1] && result.shape() == [1, 1],
        "inverse1: operands must be 1x1"
    );
    result.set(0, 0, inverse_determinant(src.at(0, 0)));
}

/// Inverts a `2x2` matrix with the adjugate formula.
///
/// # Panics
///
/// Panics if either operand is not `2x2`.
pub fn inverse2(result: &mut impl AsMatrixMut, src: &impl AsMatrix) {
    let src = src.as_view();
    let mut result = result.as_view_mut();
    assert!(
        src.shape() == [2, 2] && result.shape() == [2, 2],
        "inverse2: operands must be 2x2"
    );

    let (a, b) = (src.at(0, 0), src.at(0, 1));
    let (c, d) = (src.at(1, 0), src.at(1, 1));
    let idet = inverse_determinant(a * d - b * c);

    result.set(0, 0, d * idet);
    result.set(0, 1, -b * idet);
    result.set(1, 0, -c * idet);
    result.set(1, 1, a * idet);
}

/// Inverts a `3x3` matrix by cofactor expansion along the first column.
///
/// # Panics
///
/// Panics if either operand is not `3x3`.
///
/// # Example
///
/// ```rust
/// use warpfit_tensor::{inverse::inverse3, Matrix};
///
/// let m = Matrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 1.0]).unwrap();
/// let mut inv = Matrix::zeros(3, 3);
/// inverse3(&mut inv, &m);
/// assert_eq!(inv.at(1, 1), 0.25);
/// ```
pub fn inverse3(result: &mut impl AsMatrixMut, src: &impl AsMatrix) {
    let m = src.as_view();
    let mut result = result.as_view_mut();
    assert!(
        m.shape() == [3, 3] && result.shape() == [3, 3],
        "inverse3: operands must be 3x3"
    );

    let (a00, a01, a02) = (m.at(0, 0), m.at(0, 1), m.at(0, 2));
    let (a10, a11, a12) = (m.at(1, 0), m.at(1, 1), m.at(1, 2));
    let (a20, a21, a22) = (m.at(2, 0), m.at(2, 1), m.at(2, 2));

    let b0 = a22 * a11 - a21 * a12;
    let b1 = a22 * a01 - a21 * a02;
    let b2 = a12 * a01 - a11 * a02;
    let d = inverse_determinant(a00 * b0 - a10 * b1 + a20 * b2);

    result.set(0, 0, b0 * d);
    result.set(1, 0, -(a22 * a10 - a20 * a12) * d);
    result.set(2, 0, (a21 * a10 - a20 * a11) * d);
    result.set(0, 1, -b1 * d);
    result.set(1, 1, (a22 * a00 - a20 * a02) * d);
    result.set(2, 1, -(a21 * a00 - a20 * a01) * d);
    result.set(0, 2, b2 * d);
    result.set(1, 2, -(a12 * a00 - a10 * a02) * d);
    result.set(2, 2, (a11 * a00 - a10 * a01) * d);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ops, Matrix, TensorError};
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse1() -> Result<(), TensorError> {
        let mut r = Matrix::zeros(1, 1);
        inverse1(&mut r, &Matrix::from_elem(1, 1, 4.0));
        assert_eq!(r.at(0, 0), 0.25);
        inverse1(&mut r, &Matrix::zeros(1, 1));
        assert!(r.has_nan());
        Ok(())
    }

    #[test]
    fn test_inverse2() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(2, 2, &[4.0, 7.0, 2.0, 6.0])?;
        let mut r = Matrix::zeros(2, 2);
        inverse2(&mut r, &m);
        let expected = Matrix::from_row_slice(2, 2, &[0.6, -0.7, -0.2, 0.4])?;
        for (x, y) in r.as_slice().iter().zip(expected.as_slice()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-6);
        }
        Ok(())
    }

    #[test]
    fn test_inverse3_product_is_identity() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 0.0, 1.0, 4.0, 5.0, 6.0, 0.0])?;
        let mut inv = Matrix::zeros(3, 3);
        inverse3(&mut inv, &m);
        let mut p = Matrix::zeros(3, 3);
        ops::multiply3(&mut p, &m, &inv);
        let eye = Matrix::eye(3, 3);
        for (x, y) in p.as_slice().iter().zip(eye.as_slice()) {
            assert_relative_eq!(*x, *y, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_inverse_singular() -> Result<(), TensorError> {
        let m = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0])?;
        let mut inv = Matrix::zeros(3, 3);
        inverse3(&mut inv, &m);
        assert!(inv.as_slice().iter().all(|v| v.is_nan()));

        let mut inv2 = Matrix::zeros(2, 2);
        inverse2(&mut inv2, &Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0])?);
        assert!(inv2.as_slice().iter().all(|v| v.is_nan()));
        Ok(())
    }
}
