//! Preemptive RANSAC for homographies and affine transforms.
//!
//! All hypotheses are generated up front from random minimal samples. The
//! correspondences are then visited in random order and every surviving
//! hypothesis is scored against each of them; after each bundle of
//! correspondences the worse half of the hypotheses is discarded. The
//! winner's inliers are finally refitted with the normalized DLT.

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use warpfit_tensor::{AsMatrix, AsMatrixMut, Matrix, MatrixView, MatrixViewMut};

use crate::{
    affine::{affine3, affine_direct},
    homography::{homography4, homography_ndlt},
    point, GeometryError,
};

/// Parameters of the preemptive RANSAC estimators.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PransacParams {
    /// Number of hypotheses generated up front.
    pub number_of_hypotheses: usize,
    /// Number of correspondences scored between two halvings of the hypothesis set.
    pub bundle_size: usize,
    /// Maximum reprojection error of an inlier, in pixels.
    pub reprojection_error: f32,
    /// Optional seed for reproducible sampling.
    pub random_seed: Option<u64>,
}

impl Default for PransacParams {
    fn default() -> Self {
        Self {
            number_of_hypotheses: 512,
            bundle_size: 128,
            reprojection_error: 3.0,
            random_seed: None,
        }
    }
}

impl PransacParams {
    fn validate(&self) -> Result<(), GeometryError> {
        if self.number_of_hypotheses == 0 {
            return Err(GeometryError::InvalidParameter {
                name: "number_of_hypotheses",
                reason: "must be positive",
            });
        }
        if self.bundle_size == 0 {
            return Err(GeometryError::InvalidParameter {
                name: "bundle_size",
                reason: "must be positive",
            });
        }
        if self.reprojection_error.is_nan() || self.reprojection_error < 0.0 {
            return Err(GeometryError::InvalidParameter {
                name: "reprojection_error",
                reason: "must be a non-negative number",
            });
        }
        Ok(())
    }

    fn rng(&self) -> StdRng {
        match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => {
                let mut tr = rand::rng();
                StdRng::from_rng(&mut tr)
            }
        }
    }
}

/// Summary of a preemptive RANSAC run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PransacReport {
    /// Number of hypotheses whose minimal sample was not degenerate.
    pub valid_hypotheses: usize,
    /// Number of correspondences consistent with the best hypothesis.
    pub inliers: usize,
}

/// A candidate model, stored in the hypothesis pool at `index`.
#[derive(Clone, Copy, Debug)]
struct Hypothesis {
    index: usize,
    score: i32,
}

/// A model family estimated by preemptive RANSAC.
trait RansacModel {
    /// Number of correspondences of a minimal sample.
    const SAMPLE_SIZE: usize;
    /// Number of entries of a model, stored row-major.
    const NUM_PARAMS: usize;
    /// Shape of the output matrix.
    const SHAPE: [usize; 2];

    /// Fits a model to a minimal sample; false if the sample is degenerate.
    fn fit_minimal(src: &[[f64; 2]], dest: &[[f64; 2]], model: &mut [f32]) -> bool;

    /// Squared distance between `q` and the projection of `p`.
    fn squared_error(model: &[f32], p: [f32; 2], q: [f32; 2]) -> f32;

    /// Refits the model to a set of inliers.
    fn refit(
        result: &mut MatrixViewMut<'_>,
        src: &Matrix,
        dest: &Matrix,
    ) -> Result<(), GeometryError>;
}

struct HomographyModel;

impl RansacModel for HomographyModel {
    const SAMPLE_SIZE: usize = 4;
    const NUM_PARAMS: usize = 9;
    const SHAPE: [usize; 2] = [3, 3];

    fn fit_minimal(src: &[[f64; 2]], dest: &[[f64; 2]], model: &mut [f32]) -> bool {
        let (Ok(src), Ok(dest)) = (
            <[[f64; 2]; 4]>::try_from(src),
            <[[f64; 2]; 4]>::try_from(dest),
        ) else {
            return false;
        };
        let Some(h) = homography4(&src, &dest) else {
            return false;
        };
        for (m, &value) in model.iter_mut().zip(h.iter().flatten()) {
            *m = value as f32;
        }
        true
    }

    #[inline]
    fn squared_error(h: &[f32], [u, v]: [f32; 2], [x, y]: [f32; 2]) -> f32 {
        let z = h[6] * u + h[7] * v + h[8];
        let dx = (h[0] * u + h[1] * v + h[2]) / z - x;
        let dy = (h[3] * u + h[4] * v + h[5]) / z - y;
        dx * dx + dy * dy
    }

    fn refit(
        result: &mut MatrixViewMut<'_>,
        src: &Matrix,
        dest: &Matrix,
    ) -> Result<(), GeometryError> {
        homography_ndlt(result, src, dest)
    }
}

struct AffineModel;

impl RansacModel for AffineModel {
    const SAMPLE_SIZE: usize = 3;
    const NUM_PARAMS: usize = 6;
    const SHAPE: [usize; 2] = [2, 3];

    fn fit_minimal(src: &[[f64; 2]], dest: &[[f64; 2]], model: &mut [f32]) -> bool {
        let (Ok(src), Ok(dest)) = (
            <[[f64; 2]; 3]>::try_from(src),
            <[[f64; 2]; 3]>::try_from(dest),
        ) else {
            return false;
        };
        let Some(a) = affine3(&src, &dest) else {
            return false;
        };
        for (m, &value) in model.iter_mut().zip(a.iter().flatten()) {
            *m = value as f32;
        }
        true
    }

    #[inline]
    fn squared_error(a: &[f32], [u, v]: [f32; 2], [x, y]: [f32; 2]) -> f32 {
        let dx = a[0] * u + a[1] * v + a[2] - x;
        let dy = a[3] * u + a[4] * v + a[5] - y;
        dx * dx + dy * dy
    }

    fn refit(
        result: &mut MatrixViewMut<'_>,
        src: &Matrix,
        dest: &Matrix,
    ) -> Result<(), GeometryError> {
        affine_direct(result, src, dest)
    }
}

/// Orders hypotheses by decreasing score, then by generation order.
fn rank(hypotheses: &mut [Hypothesis]) {
    hypotheses.sort_unstable_by(|a, b| b.score.cmp(&a.score).then(a.index.cmp(&b.index)));
}

#[inline]
fn point32(points: MatrixView<'_>, j: usize) -> [f32; 2] {
    [points.at(0, j), points.at(1, j)]
}

fn pransac<M: RansacModel, R: Rng + ?Sized>(
    result: &mut impl AsMatrixMut,
    mut mask: Option<MatrixViewMut<'_>>,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
    params: &PransacParams,
    rng: &mut R,
) -> Result<PransacReport, GeometryError> {
    let (src, dest) = (src.as_view(), dest.as_view());
    let mut result = result.as_view_mut();
    let n = GeometryError::check_correspondences(src, dest, M::SAMPLE_SIZE)?;
    GeometryError::check_shape("result", result.shape(), M::SHAPE)?;
    if let Some(mask) = &mask {
        GeometryError::check_shape("mask", mask.shape(), [1, n])?;
    }
    params.validate()?;

    let k = M::SAMPLE_SIZE;
    let num_hypotheses = params.number_of_hypotheses;
    let max_error_sq = params.reprojection_error * params.reprojection_error;

    if let Some(mask) = mask.as_mut() {
        mask.clear();
    }

    // order in which the correspondences are scored
    let mut permutation: Vec<usize> = (0..n).collect();
    permutation.shuffle(rng);

    // minimal samples, drawn from consecutive shuffled copies of 0..n
    let len = k * num_hypotheses + (n - (k * num_hypotheses) % n);
    let mut sample_indices = vec![0usize; len];
    for block in sample_indices.chunks_mut(n) {
        for (j, index) in block.iter_mut().enumerate() {
            *index = j;
        }
        block.shuffle(rng);
    }

    let mut pool = vec![0.0f32; num_hypotheses * M::NUM_PARAMS];
    let mut hypotheses = Vec::with_capacity(num_hypotheses);
    let mut src_sample = [[0.0; 2]; 4];
    let mut dest_sample = [[0.0; 2]; 4];
    for (index, model) in pool.chunks_exact_mut(M::NUM_PARAMS).enumerate() {
        let sample = &sample_indices[k * index..k * (index + 1)];
        for (i, &p) in sample.iter().enumerate() {
            src_sample[i] = point(src, p);
            dest_sample[i] = point(dest, p);
        }
        if M::fit_minimal(&src_sample[..k], &dest_sample[..k], model) {
            hypotheses.push(Hypothesis { index, score: 0 });
        }
    }

    let valid_hypotheses = hypotheses.len();
    log::debug!("pransac: {valid_hypotheses} of {num_hypotheses} hypotheses are valid");
    if valid_hypotheses == 0 {
        result.fill(f32::NAN);
        return Ok(PransacReport::default());
    }

    let model = |index: usize| &pool[index * M::NUM_PARAMS..(index + 1) * M::NUM_PARAMS];

    // preemptive scoring
    let mut active = valid_hypotheses;
    for (c, &p) in permutation.iter().enumerate() {
        if (c + 1) % params.bundle_size == 0 && active > 1 {
            rank(&mut hypotheses[..active]);
            active /= 2;
            log::debug!("pransac: {active} hypotheses left after {} correspondences", c + 1);
        }
        if active == 1 {
            break;
        }

        let (u, x) = (point32(src, p), point32(dest, p));
        for h in hypotheses[..active].iter_mut() {
            if M::squared_error(model(h.index), u, x) <= max_error_sq {
                h.score += 1;
            }
        }
    }

    // highest score wins; ties go to the hypothesis generated first
    let Some(best) = hypotheses[..active]
        .iter()
        .max_by(|a, b| a.score.cmp(&b.score).then(b.index.cmp(&a.index)))
    else {
        result.fill(f32::NAN);
        return Ok(PransacReport::default());
    };
    let best_model = model(best.index);
    log::debug!(
        "pransac: selected hypothesis {} with score {}",
        best.index,
        best.score
    );

    let mut inliers = Vec::with_capacity(n);
    for j in 0..n {
        if M::squared_error(best_model, point32(src, j), point32(dest, j)) <= max_error_sq {
            inliers.push(j);
            if let Some(mask) = mask.as_mut() {
                mask.set(0, j, 1.0);
            }
        }
    }
    log::debug!("pransac: {} of {n} correspondences are inliers", inliers.len());

    let report = PransacReport {
        valid_hypotheses,
        inliers: inliers.len(),
    };
    if inliers.len() < k {
        result.fill(f32::NAN);
        return Ok(report);
    }

    let inlier_src = Matrix::from_shape_fn([2, inliers.len()], |[i, j]| src.at(i, inliers[j]));
    let inlier_dest = Matrix::from_shape_fn([2, inliers.len()], |[i, j]| dest.at(i, inliers[j]));
    M::refit(&mut result, &inlier_src, &inlier_dest)?;

    Ok(report)
}

/// Robust homography estimation from `n >= 4` correspondences with outliers.
///
/// Hypotheses come from the closed-form four-point solver; the winner's
/// inliers are refitted with [`homography_ndlt`]. If no hypothesis is valid or
/// the winner has fewer than four inliers, `result` is filled with NaN.
///
/// # Arguments
///
/// * `result` - The `3x3` output homography.
/// * `mask` - Optional `1 x n` output, set to 1 for inliers and 0 for outliers.
/// * `src` - The `2 x n` source points.
/// * `dest` - The `2 x n` destination points.
/// * `params` - Estimation parameters; `random_seed` makes the run reproducible.
///
/// # Errors
///
/// Returns an error if the shapes are wrong, there are fewer than 4
/// correspondences or the parameters are out of range.
///
/// # Example
///
/// ```
/// use warpfit_geometry::ransac::{pransac_homography, PransacParams};
/// use warpfit_tensor::Matrix;
///
/// let src = Matrix::from_points(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [5.0, 5.0]]);
/// let dest = Matrix::from_points(&[[1.0, 2.0], [11.0, 2.0], [11.0, 12.0], [1.0, 12.0], [6.0, 7.0]]);
/// let mut h = Matrix::zeros(3, 3);
/// let mut mask = Matrix::zeros(1, 5);
/// let params = PransacParams {
///     random_seed: Some(0),
///     ..Default::default()
/// };
/// let report = pransac_homography(&mut h, Some(mask.view_mut()), &src, &dest, &params).unwrap();
/// assert_eq!(report.inliers, 5);
/// assert!(!h.has_nan());
/// ```
pub fn pransac_homography(
    result: &mut impl AsMatrixMut,
    mask: Option<MatrixViewMut<'_>>,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
    params: &PransacParams,
) -> Result<PransacReport, GeometryError> {
    let mut rng = params.rng();
    pransac::<HomographyModel, _>(result, mask, src, dest, params, &mut rng)
}

/// Same as [`pransac_homography`], drawing samples from `rng` instead of `params.random_seed`.
///
/// # Errors
///
/// Same as [`pransac_homography`].
pub fn pransac_homography_with_rng<R: Rng + ?Sized>(
    result: &mut impl AsMatrixMut,
    mask: Option<MatrixViewMut<'_>>,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
    params: &PransacParams,
    rng: &mut R,
) -> Result<PransacReport, GeometryError> {
    pransac::<HomographyModel, R>(result, mask, src, dest, params, rng)
}

/// Robust affine estimation from `n >= 3` correspondences with outliers.
///
/// Hypotheses come from the closed-form three-point solver; the winner's
/// inliers are refitted with [`affine_direct`]. If no hypothesis is valid or
/// the winner has fewer than three inliers, `result` is filled with NaN.
///
/// # Arguments
///
/// * `result` - The `2x3` output affine transform.
/// * `mask` - Optional `1 x n` output, set to 1 for inliers and 0 for outliers.
/// * `src` - The `2 x n` source points.
/// * `dest` - The `2 x n` destination points.
/// * `params` - Estimation parameters; `random_seed` makes the run reproducible.
///
/// # Errors
///
/// Returns an error if the shapes are wrong, there are fewer than 3
/// correspondences or the parameters are out of range.
pub fn pransac_affine(
    result: &mut impl AsMatrixMut,
    mask: Option<MatrixViewMut<'_>>,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
    params: &PransacParams,
) -> Result<PransacReport, GeometryError> {
    let mut rng = params.rng();
    pransac::<AffineModel, _>(result, mask, src, dest, params, &mut rng)
}

/// Same as [`pransac_affine`], drawing samples from `rng` instead of `params.random_seed`.
///
/// # Errors
///
/// Same as [`pransac_affine`].
pub fn pransac_affine_with_rng<R: Rng + ?Sized>(
    result: &mut impl AsMatrixMut,
    mask: Option<MatrixViewMut<'_>>,
    src: &impl AsMatrix,
    dest: &impl AsMatrix,
    params: &PransacParams,
    rng: &mut R,
) -> Result<PransacReport, GeometryError> {
    pransac::<AffineModel, R>(result, mask, src, dest, params, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn affine_data() -> (Matrix, Matrix, usize) {
        // 30 inliers of x' = 0.9x - 0.2y + 15, y' = 0.1x + 1.05y - 4 and 6 outliers
        let mut src = Vec::new();
        let mut dest = Vec::new();
        for i in 0..30 {
            let (u, v) = ((i % 6) as f32 * 17.0 + 3.0, (i / 6) as f32 * 23.0 + 1.0);
            src.push([u, v]);
            dest.push([0.9 * u - 0.2 * v + 15.0, 0.1 * u + 1.05 * v - 4.0]);
        }
        for i in 0..6 {
            let (u, v) = (i as f32 * 11.0 + 5.0, 50.0 - i as f32 * 7.0);
            src.push([u, v]);
            dest.push([u + 80.0, v - 90.0]);
        }
        (Matrix::from_points(&src), Matrix::from_points(&dest), 30)
    }

    #[test]
    fn test_pransac_affine() -> Result<(), Box<dyn std::error::Error>> {
        let (src, dest, num_inliers) = affine_data();
        let n = src.columns();
        let mut affine = Matrix::zeros(2, 3);
        let mut mask = Matrix::blank(1, n);
        let params = PransacParams {
            number_of_hypotheses: 128,
            bundle_size: 8,
            reprojection_error: 1.0,
            random_seed: Some(42),
        };
        let report = pransac_affine(&mut affine, Some(mask.view_mut()), &src, &dest, &params)?;

        assert_eq!(report.inliers, num_inliers);
        assert!(report.valid_hypotheses > 0);
        for (j, &m) in mask.as_slice().iter().enumerate() {
            assert_eq!(m, if j < num_inliers { 1.0 } else { 0.0 });
        }

        let expected = [0.9, -0.2, 15.0, 0.1, 1.05, -4.0];
        for (i, e) in expected.iter().enumerate() {
            assert_relative_eq!(affine.at(i / 3, i % 3), *e, epsilon = 1e-3);
        }
        Ok(())
    }

    #[test]
    fn test_pransac_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
        let (src, dest, _) = affine_data();
        let params = PransacParams {
            number_of_hypotheses: 32,
            bundle_size: 4,
            reprojection_error: 1.0,
            random_seed: Some(7),
        };

        let mut first = Matrix::zeros(2, 3);
        let mut second = Matrix::zeros(2, 3);
        let r1 = pransac_affine(&mut first, None, &src, &dest, &params)?;
        let r2 = pransac_affine(&mut second, None, &src, &dest, &params)?;
        assert_eq!(r1, r2);
        assert_eq!(first, second);

        let mut third = Matrix::zeros(2, 3);
        let mut rng = StdRng::seed_from_u64(7);
        let r3 = pransac_affine_with_rng(&mut third, None, &src, &dest, &params, &mut rng)?;
        assert_eq!(r1, r3);
        assert_eq!(first, third);
        Ok(())
    }

    #[test]
    fn test_pransac_no_valid_hypothesis() -> Result<(), Box<dyn std::error::Error>> {
        // every source point on one line: no affine sample is valid
        let src = Matrix::from_points(&[
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [4.0, 4.0],
        ]);
        let dest = Matrix::from_points(&[
            [0.0, 1.0],
            [1.0, 0.0],
            [5.0, 2.0],
            [3.0, 7.0],
            [4.0, 4.0],
        ]);
        let mut affine = Matrix::zeros(2, 3);
        let mut mask = Matrix::from_elem(1, 5, 7.0);
        let params = PransacParams {
            random_seed: Some(1),
            ..Default::default()
        };
        let report = pransac_affine(&mut affine, Some(mask.view_mut()), &src, &dest, &params)?;

        assert_eq!(report, PransacReport::default());
        assert!(affine.as_slice().iter().all(|v| v.is_nan()));
        assert!(mask.as_slice().iter().all(|&v| v == 0.0));
        Ok(())
    }

    #[test]
    fn test_pransac_invalid_arguments() {
        let src = Matrix::zeros(2, 6);
        let mut h = Matrix::zeros(3, 3);

        let params = PransacParams {
            bundle_size: 0,
            ..Default::default()
        };
        assert_eq!(
            pransac_homography(&mut h, None, &src, &src, &params),
            Err(GeometryError::InvalidParameter {
                name: "bundle_size",
                reason: "must be positive"
            })
        );

        let mut mask = Matrix::zeros(1, 5);
        assert_eq!(
            pransac_homography(
                &mut h,
                Some(mask.view_mut()),
                &src,
                &src,
                &PransacParams::default()
            ),
            Err(GeometryError::InvalidShape {
                name: "mask",
                expected: [1, 6],
                actual: [1, 5]
            })
        );

        let mut affine = Matrix::zeros(3, 3);
        assert_eq!(
            pransac_affine(&mut affine, None, &src, &src, &PransacParams::default()),
            Err(GeometryError::InvalidShape {
                name: "result",
                expected: [2, 3],
                actual: [3, 3]
            })
        );
    }

    #[test]
    fn test_rank_tie_break() {
        let mut hypotheses = vec![
            Hypothesis { index: 3, score: 5 },
            Hypothesis { index: 1, score: 7 },
            Hypothesis { index: 0, score: 5 },
            Hypothesis { index: 2, score: 7 },
        ];
        rank(&mut hypotheses);
        let order: Vec<usize> = hypotheses.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_params_serde() -> Result<(), Box<dyn std::error::Error>> {
        let params: PransacParams = serde_json::from_str(r#"{"reprojection_error": 2.5}"#)?;
        assert_eq!(params.number_of_hypotheses, 512);
        assert_eq!(params.bundle_size, 128);
        assert_eq!(params.reprojection_error, 2.5);
        assert_eq!(params.random_seed, None);
        Ok(())
    }
}
