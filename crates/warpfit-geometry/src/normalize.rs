use crate::{point, GeometryError};
use warpfit_tensor::{AsMatrix, AsMatrixMut, MatrixView};

/// RMS distance below which a point set is treated as coincident.
pub const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Isotropic similarity `p -> scale * (p - center)` used to condition point sets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Similarity {
    /// Isotropic scale factor.
    pub scale: f64,
    /// Center subtracted before scaling.
    pub center: [f64; 2],
}

impl Similarity {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        center: [0.0, 0.0],
    };

    /// Similarity that moves the centroid of `points` to the origin and makes
    /// the RMS distance to it equal to `√2`.
    ///
    /// Coincident points (RMS distance below [`NORMALIZATION_EPSILON`]) give the identity.
    ///
    /// # Arguments
    ///
    /// * `points` - A `2 x n` matrix, one point per column.
    pub fn from_points(points: MatrixView<'_>) -> Self {
        Self::from_coordinates((0..points.columns()).map(|j| point(points, j)))
    }

    /// Same as [`Similarity::from_points`], for points given as coordinates.
    pub fn from_coordinates<I>(points: I) -> Self
    where
        I: IntoIterator<Item = [f64; 2]>,
        I::IntoIter: Clone,
    {
        let points = points.into_iter();

        let (mut n, mut cx, mut cy) = (0usize, 0.0, 0.0);
        for [x, y] in points.clone() {
            n += 1;
            cx += x;
            cy += y;
        }
        if n == 0 {
            return Self::IDENTITY;
        }
        cx /= n as f64;
        cy /= n as f64;

        let sum_sq: f64 = points
            .map(|[x, y]| (x - cx) * (x - cx) + (y - cy) * (y - cy))
            .sum();

        let rms = (sum_sq / n as f64).sqrt();
        if rms < NORMALIZATION_EPSILON {
            return Self::IDENTITY;
        }

        Self {
            scale: std::f64::consts::SQRT_2 / rms,
            center: [cx, cy],
        }
    }

    /// Maps a point into normalized space.
    #[inline]
    pub fn apply(&self, p: [f64; 2]) -> [f64; 2] {
        [
            self.scale * (p[0] - self.center[0]),
            self.scale * (p[1] - self.center[1]),
        ]
    }

    /// The `3x3` matrix of `p -> scale * (p - center)`.
    pub fn matrix(&self) -> [[f64; 3]; 3] {
        let s = self.scale;
        let [cx, cy] = self.center;
        [[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]]
    }

    /// The `3x3` matrix of the inverse map `q -> q / scale + center`.
    pub fn inverse_matrix(&self) -> [[f64; 3]; 3] {
        let z = 1.0 / self.scale;
        let [cx, cy] = self.center;
        [[z, 0.0, cx], [0.0, z, cy], [0.0, 0.0, 1.0]]
    }
}

/// Writes a row-major `3x3` array into a `3x3` matrix.
pub(crate) fn write_mat3(result: &mut impl AsMatrixMut, m: &[[f64; 3]; 3]) {
    let mut result = result.as_view_mut();
    for (i, row) in m.iter().enumerate() {
        for (j, &value) in row.iter().enumerate() {
            result.set(i, j, value as f32);
        }
    }
}

/// Normalizes a point set for numerically stable model fitting.
///
/// The points are translated so that their centroid is at the origin and
/// scaled so that their RMS distance to it is `√2`. If every point coincides,
/// both matrices are the identity and the points are copied unchanged.
///
/// # Arguments
///
/// * `normalized` - The `2 x n` output points.
/// * `normalizer` - The `3x3` output similarity mapping `points` to `normalized`.
/// * `denormalizer` - The `3x3` output inverse of `normalizer`.
/// * `points` - The `2 x n` input points.
///
/// # Errors
///
/// Returns an error if any argument has the wrong shape.
///
/// # Example
///
/// ```
/// use warpfit_geometry::normalize::normalize_points;
/// use warpfit_tensor::Matrix;
///
/// let points = Matrix::from_points(&[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]]);
/// let mut normalized = Matrix::zeros(2, 4);
/// let mut normalizer = Matrix::zeros(3, 3);
/// let mut denormalizer = Matrix::zeros(3, 3);
/// normalize_points(&mut normalized, &mut normalizer, &mut denormalizer, &points).unwrap();
///
/// // the corners of the square land at distance √2 from the origin
/// assert!((normalized.at(0, 0) + 1.0).abs() < 1e-6);
/// assert!((normalized.at(1, 2) - 1.0).abs() < 1e-6);
/// ```
pub fn normalize_points(
    normalized: &mut impl AsMatrixMut,
    normalizer: &mut impl AsMatrixMut,
    denormalizer: &mut impl AsMatrixMut,
    points: &impl AsMatrix,
) -> Result<(), GeometryError> {
    let points = points.as_view();
    let n = points.columns();
    let mut normalized = normalized.as_view_mut();
    GeometryError::check_shape("points", points.shape(), [2, n])?;
    GeometryError::check_shape("normalized", normalized.shape(), [2, n])?;
    GeometryError::check_shape("normalizer", normalizer.as_view().shape(), [3, 3])?;
    GeometryError::check_shape("denormalizer", denormalizer.as_view().shape(), [3, 3])?;

    let similarity = Similarity::from_points(points);
    for j in 0..n {
        let [x, y] = similarity.apply(point(points, j));
        normalized.set(0, j, x as f32);
        normalized.set(1, j, y as f32);
    }

    write_mat3(normalizer, &similarity.matrix());
    write_mat3(denormalizer, &similarity.inverse_matrix());
    Ok(())
}
