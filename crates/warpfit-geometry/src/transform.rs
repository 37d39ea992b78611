use crate::GeometryError;
use warpfit_tensor::{AsMatrix, AsMatrixMut};

/// Determinant magnitude below which a homography is not invertible.
const SINGULAR_EPSILON: f64 = 1e-6;

/// Applies a homography to a set of points.
///
/// Each column `(u, v)` of `src` is mapped to
/// `((a u + b v + c) / w, (d u + e v + f) / w)` with `w = g u + h v + i`.
/// A singular (or NaN) homography fills `dest` with NaN.
///
/// # Arguments
///
/// * `dest` - The `2 x n` output points.
/// * `src` - The `2 x n` input points.
/// * `homography` - The `3x3` homography.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
pub fn transform_perspective(
    dest: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    homography: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, h) = (src.as_view(), homography.as_view());
    let n = src.columns();
    let mut dest = dest.as_view_mut();
    GeometryError::check_shape("src", src.shape(), [2, n])?;
    GeometryError::check_shape("dest", dest.shape(), [2, n])?;
    GeometryError::check_shape("homography", h.shape(), [3, 3])?;

    let e = |i, j| h.at(i, j) as f64;
    let (h00, h01, h02) = (e(0, 0), e(0, 1), e(0, 2));
    let (h10, h11, h12) = (e(1, 0), e(1, 1), e(1, 2));
    let (h20, h21, h22) = (e(2, 0), e(2, 1), e(2, 2));

    let det = h20 * (h01 * h12 - h02 * h11)
        + h21 * (h02 * h10 - h00 * h12)
        + h22 * (h00 * h11 - h01 * h10);
    if det.is_nan() || det.abs() < SINGULAR_EPSILON {
        dest.fill(f32::NAN);
        return Ok(());
    }

    for j in 0..n {
        let (u, v) = (src.at(0, j) as f64, src.at(1, j) as f64);
        let x = h00 * u + h01 * v + h02;
        let y = h10 * u + h11 * v + h12;
        let w = h20 * u + h21 * v + h22;
        dest.set(0, j, (x / w) as f32);
        dest.set(1, j, (y / w) as f32);
    }

    Ok(())
}

/// Applies a `2x3` affine transform to a set of points.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
pub fn transform_affine(
    dest: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    affine: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, m) = (src.as_view(), affine.as_view());
    let n = src.columns();
    let mut dest = dest.as_view_mut();
    GeometryError::check_shape("src", src.shape(), [2, n])?;
    GeometryError::check_shape("dest", dest.shape(), [2, n])?;
    GeometryError::check_shape("affine", m.shape(), [2, 3])?;

    let (a, b, c) = (m.at(0, 0), m.at(0, 1), m.at(0, 2));
    let (d, e, f) = (m.at(1, 0), m.at(1, 1), m.at(1, 2));
    for j in 0..n {
        let (u, v) = (src.at(0, j), src.at(1, j));
        dest.set(0, j, a * u + b * v + c);
        dest.set(1, j, d * u + e * v + f);
    }

    Ok(())
}

/// Applies a `2x2` linear map to a set of points.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
pub fn transform_linear(
    dest: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    linear: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, m) = (src.as_view(), linear.as_view());
    let n = src.columns();
    let mut dest = dest.as_view_mut();
    GeometryError::check_shape("src", src.shape(), [2, n])?;
    GeometryError::check_shape("dest", dest.shape(), [2, n])?;
    GeometryError::check_shape("linear", m.shape(), [2, 2])?;

    let (a, b) = (m.at(0, 0), m.at(0, 1));
    let (c, d) = (m.at(1, 0), m.at(1, 1));
    for j in 0..n {
        let (u, v) = (src.at(0, j), src.at(1, j));
        dest.set(0, j, a * u + b * v);
        dest.set(1, j, c * u + d * v);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use warpfit_tensor::Matrix;

    #[test]
    fn test_transform_perspective() -> Result<(), Box<dyn std::error::Error>> {
        let h = Matrix::from_row_slice(3, 3, &[2.0, 0.0, 1.0, 0.0, 2.0, -1.0, 0.0, 0.0, 2.0])?;
        let src = Matrix::from_points(&[[0.0, 0.0], [1.0, 2.0]]);
        let mut dest = Matrix::zeros(2, 2);
        transform_perspective(&mut dest, &src, &h)?;
        assert_eq!(dest.to_points(), vec![[0.5, -0.5], [1.5, 1.5]]);

        let h = Matrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.01, 0.0, 1.0])?;
        let src = Matrix::from_points(&[[100.0, 50.0]]);
        let mut dest = Matrix::zeros(2, 1);
        transform_perspective(&mut dest, &src, &h)?;
        assert_relative_eq!(dest.at(0, 0), 50.0, epsilon = 1e-4);
        assert_relative_eq!(dest.at(1, 0), 25.0, epsilon = 1e-4);
        Ok(())
    }

    #[test]
    fn test_transform_perspective_singular() -> Result<(), Box<dyn std::error::Error>> {
        let h = Matrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 0.0, 1.0])?;
        let src = Matrix::from_points(&[[1.0, 1.0], [2.0, 3.0]]);
        let mut dest = Matrix::zeros(2, 2);
        transform_perspective(&mut dest, &src, &h)?;
        assert!(dest.as_slice().iter().all(|v| v.is_nan()));

        transform_perspective(&mut dest, &src, &Matrix::blank(3, 3))?;
        assert!(dest.as_slice().iter().all(|v| v.is_nan()));
        Ok(())
    }

    #[test]
    fn test_transform_affine_and_linear() -> Result<(), Box<dyn std::error::Error>> {
        let src = Matrix::from_points(&[[1.0, 0.0], [0.0, 1.0], [2.0, 3.0]]);
        let mut dest = Matrix::zeros(2, 3);

        let affine = Matrix::from_row_slice(2, 3, &[0.0, -1.0, 5.0, 1.0, 0.0, -2.0])?;
        transform_affine(&mut dest, &src, &affine)?;
        assert_eq!(dest.to_points(), vec![[5.0, -1.0], [4.0, -2.0], [2.0, 0.0]]);

        let linear = Matrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 3.0])?;
        transform_linear(&mut dest, &src, &linear)?;
        assert_eq!(dest.to_points(), vec![[2.0, 0.0], [0.0, 3.0], [4.0, 9.0]]);
        Ok(())
    }

    #[test]
    fn test_transform_shape_error() {
        let src = Matrix::zeros(2, 3);
        let mut dest = Matrix::zeros(2, 4);
        assert_eq!(
            transform_affine(&mut dest, &src, &Matrix::zeros(2, 3)),
            Err(GeometryError::InvalidShape {
                name: "dest",
                expected: [2, 3],
                actual: [2, 4]
            })
        );
    }
}
