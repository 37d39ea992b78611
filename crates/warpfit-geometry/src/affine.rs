use crate::{
    normalize::normalize_points,
    point, GeometryError, EPSILON, OLS_REFINEMENTS,
};
use warpfit_linalg::qr::qr_ols;
use warpfit_tensor::{ops, AsMatrix, AsMatrixMut, Matrix};

/// A `2x3` affine transform `[a b c; d e f]` in double precision, row-major.
pub(crate) type Affine = [[f64; 3]; 2];

/// Closed-form affine transform mapping three source points onto three destination points.
///
/// Returns `None` if either triangle is degenerate or the linear part is singular.
pub(crate) fn affine3(src: &[[f64; 2]; 3], dest: &[[f64; 2]; 3]) -> Option<Affine> {
    let [[u0, v0], [u1, v1], [u2, v2]] = *src;
    let [[x0, y0], [x1, y1], [x2, y2]] = *dest;

    // twice the signed areas of both triangles
    let det = u0 * (v1 - v2) + u1 * (v2 - v0) + u2 * (v0 - v1);
    let ddet = x0 * (y1 - y2) + x1 * (y2 - y0) + x2 * (y0 - y1);
    if det.abs() < EPSILON || ddet.abs() < EPSILON {
        return None;
    }
    let idet = 1.0 / det;

    // adjugate of [u0 u1 u2; v0 v1 v2; 1 1 1]
    let (m00, m01, m02) = (v1 - v2, v2 - v0, v0 - v1);
    let (m10, m11, m12) = (u2 - u1, u0 - u2, u1 - u0);
    let (m20, m21, m22) = (u1 * v2 - u2 * v1, u2 * v0 - u0 * v2, u0 * v1 - u1 * v0);

    let a = (x0 * m00 + x1 * m01 + x2 * m02) * idet;
    let b = (x0 * m10 + x1 * m11 + x2 * m12) * idet;
    let c = (x0 * m20 + x1 * m21 + x2 * m22) * idet;
    let d = (y0 * m00 + y1 * m01 + y2 * m02) * idet;
    let e = (y0 * m10 + y1 * m11 + y2 * m12) * idet;
    let f = (y0 * m20 + y1 * m21 + y2 * m22) * idet;

    if (a * e - b * d).abs() < EPSILON {
        return None;
    }

    Some([[a, b, c], [d, e, f]])
}

/// Writes an affine transform, or NaN, into a `2x3` matrix.
fn write_affine(result: &mut impl AsMatrixMut, affine: Option<Affine>) {
    let mut result = result.as_view_mut();
    match affine {
        Some(m) => {
            for (i, row) in m.iter().enumerate() {
                for (j, &value) in row.iter().enumerate() {
                    result.set(i, j, value as f32);
                }
            }
        }
        None => result.fill(f32::NAN),
    }
}

/// Affine transform from exactly three correspondences, in closed form.
///
/// Collinear source or destination points, or a singular linear part, give a
/// NaN-filled result.
///
/// # Arguments
///
/// * `result` - The `2x3` output transform.
/// * `src` - The `2x3` source points.
/// * `dest` - The `2x3` destination points.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
///
/// # Example
///
/// ```
/// use warpfit_geometry::affine::affine_direct3;
/// use warpfit_tensor::Matrix;
///
/// let src = Matrix::from_points(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
/// let dest = Matrix::from_points(&[[2.0, 3.0], [4.0, 3.0], [2.0, 5.0]]);
/// let mut affine = Matrix::zeros(2, 3);
/// affine_direct3(&mut affine, &src, &dest).unwrap();
/// assert_eq!(affine.at(0, 0), 2.0);
/// assert_eq!(affine.at(1, 2), 3.0);
/// ```
pub fn affine_direct3(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    GeometryError::check_shape("src", src.shape(), [2, 3])?;
    GeometryError::check_shape("dest", dest.shape(), [2, 3])?;
    GeometryError::check_shape("result", result.as_view().shape(), [2, 3])?;

    let s = [point(src, 0), point(src, 1), point(src, 2)];
    let d = [point(dest, 0), point(dest, 1), point(dest, 2)];
    write_affine(result, affine3(&s, &d));
    Ok(())
}

/// Least-squares affine transform from `n >= 3` correspondences, without normalization.
///
/// Solves the `2n x 6` system
///
/// ```text
/// [ uj  vj  1   0   0   0 ] [a b c d e f]ᵗ = [ xj ]
/// [ 0   0   0   uj  vj  1 ]                  [ yj ]
/// ```
///
/// with QR and iterative refinement. A rank-deficient system or a singular
/// linear part gives a NaN-filled result.
///
/// # Errors
///
/// Returns an error if the shapes are wrong or there are fewer than 3 correspondences.
pub fn affine_dlt(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    let n = GeometryError::check_correspondences(src, dest, 3)?;
    GeometryError::check_shape("result", result.as_view().shape(), [2, 3])?;

    let mut a = Matrix::zeros(2 * n, 6);
    let mut b = Matrix::zeros(2 * n, 1);
    for j in 0..n {
        let (uj, vj) = (src.at(0, j), src.at(1, j));
        let i = 2 * j;

        a.set(i, 0, uj);
        a.set(i, 1, vj);
        a.set(i, 2, 1.0);
        a.set(i + 1, 3, uj);
        a.set(i + 1, 4, vj);
        a.set(i + 1, 5, 1.0);

        b.set(i, 0, dest.at(0, j));
        b.set(i + 1, 0, dest.at(1, j));
    }

    let mut x = Matrix::zeros(6, 1);
    qr_ols(&mut x, &a, &b, OLS_REFINEMENTS)?;

    let h = |k| x.at(k, 0) as f64;
    let affine = [[h(0), h(1), h(2)], [h(3), h(4), h(5)]];
    let singular = (affine[0][0] * affine[1][1] - affine[0][1] * affine[1][0]).abs() < EPSILON;
    if x.has_nan() || singular {
        write_affine(result, None);
    } else {
        write_affine(result, Some(affine));
    }

    Ok(())
}

/// Least-squares affine transform from `n >= 3` correspondences, in normalized coordinates.
///
/// Both point sets are normalized with [`normalize_points`], the transform is
/// estimated with [`affine_dlt`] and mapped back as `W · A · M`, where `M`
/// normalizes the source points and `W` denormalizes the destination points.
///
/// # Errors
///
/// Returns an error if the shapes are wrong or there are fewer than 3 correspondences.
pub fn affine_direct(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    let n = GeometryError::check_correspondences(src, dest, 3)?;
    GeometryError::check_shape("result", result.as_view().shape(), [2, 3])?;

    let mut normalized_src = Matrix::zeros(2, n);
    let mut normalized_dest = Matrix::zeros(2, n);
    let mut normalizer = Matrix::zeros(3, 3);
    let mut denormalizer = Matrix::zeros(3, 3);
    let mut unused = Matrix::zeros(3, 3);
    normalize_points(&mut normalized_src, &mut normalizer, &mut unused, &src)?;
    normalize_points(&mut normalized_dest, &mut unused, &mut denormalizer, &dest)?;

    let mut affine = Matrix::eye(3, 3);
    affine_dlt(
        &mut affine.block_mut(0, 1, 0, 2),
        &normalized_src,
        &normalized_dest,
    )?;
    if affine.has_nan() {
        write_affine(result, None);
        return Ok(());
    }

    let mut tmp = Matrix::zeros(3, 3);
    let mut full = Matrix::zeros(3, 3);
    ops::multiply3(&mut tmp, &affine, &normalizer);
    ops::multiply3(&mut full, &denormalizer, &tmp);
    result.as_view_mut().copy_from(&full.block(0, 1, 0, 2));

    Ok(())
}
