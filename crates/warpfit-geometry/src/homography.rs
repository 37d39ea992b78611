use crate::{
    normalize::{normalize_points, write_mat3, Similarity},
    point, GeometryError, EPSILON, OLS_REFINEMENTS,
};
use warpfit_linalg::qr::qr_ols;
use warpfit_tensor::{ops, AsMatrix, AsMatrixMut, Matrix, MatrixView};

/// A `3x3` homography in double precision, row-major.
pub(crate) type Mat3 = [[f64; 3]; 3];

fn mul3(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut c = [[0.0; 3]; 3];
    for (i, row) in c.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j];
        }
    }
    c
}

fn det3(m: &Mat3) -> f64 {
    let [[a, b, c], [d, e, f], [g, h, i]] = *m;
    a * e * i + b * f * g + c * d * h - b * d * i - a * f * h - c * e * g
}

/// Twice the signed area of the triangle `(p, q, r)`.
fn signed_area(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> f64 {
    p[0] * (q[1] - r[1]) + q[0] * (r[1] - p[1]) + r[0] * (p[1] - q[1])
}

/// Solves the `2x2` system `[m00 m01; m10 m11] [g h]ᵗ = [z0 z1]ᵗ`.
fn solve2(m00: f64, m01: f64, m10: f64, m11: f64, z0: f64, z1: f64) -> Option<(f64, f64)> {
    let det = m00 * m11 - m01 * m10;
    if det.abs() < EPSILON {
        return None;
    }
    Some(((m11 * z0 - m01 * z1) / det, (m00 * z1 - m10 * z0) / det))
}

/// Homography mapping the quadrilateral `p` onto the unit square, with
/// `p0 -> (0,0)`, `p1 -> (1,0)`, `p2 -> (1,1)` and `p3 -> (0,1)`.
fn quad_to_square(p: &[[f64; 2]; 4]) -> Option<Mat3> {
    let [[u0, v0], [u1, v1], [u2, v2], [u3, v3]] = *p;

    let alpha = (u3 - u0) * (v1 - v0) - (v3 - v0) * (u1 - u0);
    let beta = (u3 - u0) * (v2 - v0) - (v3 - v0) * (u2 - u0);
    let phi = (u1 - u0) * (v2 - v0) - (v1 - v0) * (u2 - u0);
    let chi = (u3 - u1) * (v2 - v1) - (v3 - v1) * (u2 - u1);
    let theta = -alpha;

    // three or more points collinear: not a quadrilateral
    if [alpha, beta, phi, chi].iter().any(|x| x.abs() < EPSILON) {
        return None;
    }

    let (g, h) = solve2(
        u2 * alpha - u1 * beta,
        v2 * alpha - v1 * beta,
        u3 * phi - u2 * theta,
        v3 * phi - v2 * theta,
        beta - alpha,
        theta - phi,
    )?;

    // two equivalent expressions; divide by the larger denominator
    let (a, b) = if alpha.abs() > beta.abs() {
        let w = 1.0 + g * u1 + h * v1;
        (w * (v3 - v0) / -alpha, w * (u3 - u0) / alpha)
    } else {
        let w = 1.0 + g * u2 + h * v2;
        (w * (v3 - v0) / -beta, w * (u3 - u0) / beta)
    };
    let (d, e) = if phi.abs() > theta.abs() {
        let w = 1.0 + g * u2 + h * v2;
        (w * (v1 - v0) / -phi, w * (u1 - u0) / phi)
    } else {
        let w = 1.0 + g * u3 + h * v3;
        (w * (v1 - v0) / -theta, w * (u1 - u0) / theta)
    };

    let c = -a * u0 - b * v0;
    let f = -d * u0 - e * v0;

    let m = [[a, b, c], [d, e, f], [g, h, 1.0]];
    (det3(&m).abs() >= EPSILON).then_some(m)
}

/// Homography mapping the unit square onto the quadrilateral `p`.
fn square_to_quad(p: &[[f64; 2]; 4]) -> Option<Mat3> {
    let [[x0, y0], [x1, y1], [x2, y2], [x3, y3]] = *p;

    let (g, h) = solve2(
        x1 - x2,
        x3 - x2,
        y1 - y2,
        y3 - y2,
        (x0 - x1) + (x2 - x3),
        (y0 - y1) + (y2 - y3),
    )?;

    let m = [
        [g * x1 + (x1 - x0), h * x3 + (x3 - x0), x0],
        [g * y1 + (y1 - y0), h * y3 + (y3 - y0), y0],
        [g, h, 1.0],
    ];
    (det3(&m).abs() >= EPSILON).then_some(m)
}

/// Closed-form homography from exactly four correspondences.
///
/// Returns `None` if the two quadrilaterals have inconsistent orientation, if
/// three or more points are collinear, or if any intermediate map is singular.
pub(crate) fn homography4(src: &[[f64; 2]; 4], dest: &[[f64; 2]; 4]) -> Option<Mat3> {
    // every triangle must keep its orientation, otherwise the map flips the plane
    for [i, j, k] in [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]] {
        let s = signed_area(src[i], src[j], src[k]);
        let z = signed_area(dest[i], dest[j], dest[k]);
        if s * z < 0.0 {
            return None;
        }
    }

    let to_square = quad_to_square(src)?;
    let from_square = square_to_quad(dest)?;
    Some(mul3(&from_square, &to_square))
}

/// Closed-form homography from four correspondences in normalized coordinates.
///
/// The normalizing similarities are folded back into the result without any
/// generic matrix product.
pub(crate) fn normalized_homography4(src: &[[f64; 2]; 4], dest: &[[f64; 2]; 4]) -> Option<Mat3> {
    let src_similarity = Similarity::from_coordinates(src.iter().copied());
    let dest_similarity = Similarity::from_coordinates(dest.iter().copied());
    let h = homography4(
        &src.map(|p| src_similarity.apply(p)),
        &dest.map(|p| dest_similarity.apply(p)),
    )?;

    let [[h00, h01, h02], [h10, h11, h12], [h20, h21, h22]] = h;
    let s = src_similarity.scale;
    let z = 1.0 / dest_similarity.scale;
    let [scx, scy] = src_similarity.center;
    let [dcx, dcy] = dest_similarity.center;
    let tmp = h22 - s * (scx * h20 + scy * h21);

    Some([
        [
            s * (z * h00 + dcx * h20),
            s * (z * h01 + dcx * h21),
            dcx * tmp + z * (h02 - s * (scx * h00 + scy * h01)),
        ],
        [
            s * (z * h10 + dcy * h20),
            s * (z * h11 + dcy * h21),
            dcy * tmp + z * (h12 - s * (scx * h10 + scy * h11)),
        ],
        [s * h20, s * h21, tmp],
    ])
}

/// Reads four points from a `2x4` matrix.
fn points4(m: MatrixView<'_>) -> [[f64; 2]; 4] {
    [point(m, 0), point(m, 1), point(m, 2), point(m, 3)]
}

fn write_homography(result: &mut impl AsMatrixMut, h: Option<Mat3>) {
    match h {
        Some(h) => write_mat3(result, &h),
        None => result.as_view_mut().fill(f32::NAN),
    }
}

fn check_four(
    result: &mut impl AsMatrixMut,
    src: MatrixView<'_>,
    dest: MatrixView<'_>,
) -> Result<(), GeometryError> {
    GeometryError::check_shape("src", src.shape(), [2, 4])?;
    GeometryError::check_shape("dest", dest.shape(), [2, 4])?;
    GeometryError::check_shape("result", result.as_view().shape(), [3, 3])
}

/// Homography from exactly four correspondences, in closed form.
///
/// The source quadrilateral is first mapped onto the unit square and the unit
/// square onto the destination quadrilateral; the result is the product of
/// both maps. Flipped, collinear or otherwise degenerate configurations give a
/// NaN-filled result.
///
/// # Arguments
///
/// * `result` - The `3x3` output homography.
/// * `src` - The `2x4` source points.
/// * `dest` - The `2x4` destination points.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
pub fn homography_dlt4(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    check_four(result, src, dest)?;
    write_homography(result, homography4(&points4(src), &points4(dest)));
    Ok(())
}

/// Homography from exactly four correspondences, normalizing both point sets first.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
pub fn homography_ndlt4(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    check_four(result, src, dest)?;
    write_homography(
        result,
        normalized_homography4(&points4(src), &points4(dest)),
    );
    Ok(())
}

/// Least-squares homography from `n >= 4` correspondences, without normalization.
///
/// The bottom-right entry is fixed to 1 and the remaining eight entries solve
///
/// ```text
/// [ uj  vj  1   0   0   0  -uj*xj  -vj*xj ] h = [ xj ]
/// [ 0   0   0   uj  vj  1  -uj*yj  -vj*yj ]     [ yj ]
/// ```
///
/// in the least-squares sense. A rank-deficient system or a singular result
/// gives a NaN-filled homography.
///
/// # Errors
///
/// Returns an error if the shapes are wrong or there are fewer than 4 correspondences.
pub fn homography_dlt(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    let n = GeometryError::check_correspondences(src, dest, 4)?;
    GeometryError::check_shape("result", result.as_view().shape(), [3, 3])?;

    let mut a = Matrix::zeros(2 * n, 8);
    let mut b = Matrix::zeros(2 * n, 1);
    for j in 0..n {
        let (uj, vj) = (src.at(0, j), src.at(1, j));
        let (xj, yj) = (dest.at(0, j), dest.at(1, j));
        let i = 2 * j;

        a.set(i, 0, uj);
        a.set(i, 1, vj);
        a.set(i, 2, 1.0);
        a.set(i, 6, -uj * xj);
        a.set(i, 7, -vj * xj);

        a.set(i + 1, 3, uj);
        a.set(i + 1, 4, vj);
        a.set(i + 1, 5, 1.0);
        a.set(i + 1, 6, -uj * yj);
        a.set(i + 1, 7, -vj * yj);

        b.set(i, 0, xj);
        b.set(i + 1, 0, yj);
    }

    let mut x = Matrix::zeros(8, 1);
    qr_ols(&mut x, &a, &b, OLS_REFINEMENTS)?;

    let h = |k| x.at(k, 0) as f64;
    let m = [[h(0), h(1), h(2)], [h(3), h(4), h(5)], [h(6), h(7), 1.0]];
    let det = det3(&m);
    if det.is_nan() || det.abs() < EPSILON {
        write_homography(result, None);
    } else {
        write_homography(result, Some(m));
    }

    Ok(())
}

/// Least-squares homography from `n >= 4` correspondences, in normalized coordinates.
///
/// Both point sets are normalized with [`normalize_points`], the homography is
/// estimated with [`homography_dlt`] and mapped back as `W · H · M`.
///
/// # Errors
///
/// Returns an error if the shapes are wrong or there are fewer than 4 correspondences.
///
/// # Example
///
/// ```
/// use warpfit_geometry::homography::homography_ndlt;
/// use warpfit_tensor::Matrix;
///
/// let src = Matrix::from_points(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.5, 0.5]]);
/// let dest = Matrix::from_points(&[[1.0, 1.0], [3.0, 1.0], [3.0, 3.0], [1.0, 3.0], [2.0, 2.0]]);
/// let mut h = Matrix::zeros(3, 3);
/// homography_ndlt(&mut h, &src, &dest).unwrap();
///
/// let scale = h.at(0, 0) / 2.0;
/// assert!((h.at(0, 2) / scale - 1.0).abs() < 1e-3);
/// ```
pub fn homography_ndlt(
    result: &mut impl AsMatrixMut,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    let n = GeometryError::check_correspondences(src, dest, 4)?;
    GeometryError::check_shape("result", result.as_view().shape(), [3, 3])?;

    let mut normalized_src = Matrix::zeros(2, n);
    let mut normalized_dest = Matrix::zeros(2, n);
    let mut normalizer = Matrix::zeros(3, 3);
    let mut denormalizer = Matrix::zeros(3, 3);
    let mut unused = Matrix::zeros(3, 3);
    normalize_points(&mut normalized_src, &mut normalizer, &mut unused, &src)?;
    normalize_points(&mut normalized_dest, &mut unused, &mut denormalizer, &dest)?;

    let mut h = Matrix::zeros(3, 3);
    homography_dlt(&mut h, &normalized_src, &normalized_dest)?;
    if h.has_nan() {
        write_homography(result, None);
        return Ok(());
    }

    let mut tmp = Matrix::zeros(3, 3);
    ops::multiply3(&mut tmp, &h, &normalizer);
    ops::multiply3(result, &denormalizer, &tmp);
    Ok(())
}
