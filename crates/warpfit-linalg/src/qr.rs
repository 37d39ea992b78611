//! Householder QR factorization and the solvers built on it.
//!
//! For an `m x n` matrix `A` with `m >= n`, [`HouseholderQr`] computes `n`
//! unit reflection vectors `v_i` such that
//!
//! ```text
//! H_{n-1} ... H_1 H_0 A = R,    H_i = I - 2 v_i v_iᵗ
//! ```
//!
//! with `R` upper triangular. The reflections are never materialized as
//! matrices: `Q` and `Qᵗb` are obtained by applying them to vectors.
//!
//! # Example
//!
//! ```
//! use warpfit_linalg::qr::qr_ols;
//! use warpfit_tensor::Matrix;
//!
//! // fit y = 2x + 1
//! let a = Matrix::from_row_slice(3, 2, &[0.0, 1.0, 1.0, 1.0, 2.0, 1.0]).unwrap();
//! let b = Matrix::from_shape_vec([3, 1], vec![1.0, 3.0, 5.0]).unwrap();
//! let mut x = Matrix::zeros(2, 1);
//! qr_ols(&mut x, &a, &b, 3).unwrap();
//! assert!((x.at(0, 0) - 2.0).abs() < 1e-5);
//! assert!((x.at(1, 0) - 1.0).abs() < 1e-5);
//! ```

use crate::LinalgError;
use warpfit_tensor::{ops, AsMatrix, AsMatrixMut, Matrix, MatrixView, MatrixViewMut};

/// Magnitude below which a reflection vector or a pivot is treated as zero.
pub const QR_EPSILON: f32 = 1e-6;

/// Householder factorization of an `m x n` matrix, `m >= n`.
///
/// Stores the reflection vectors (column `i` holds `v_i` in rows `i..m`) and
/// the full `m x n` upper triangular factor `R`.
#[derive(Clone, Debug)]
pub struct HouseholderQr {
    reflectors: Matrix,
    r: Matrix,
}

impl HouseholderQr {
    /// Factorizes `a`.
    ///
    /// A column whose active part is already aligned with the axis (reflection
    /// vector norm below [`QR_EPSILON`]) gets a zero reflector, which acts as
    /// the identity everywhere it is applied.
    ///
    /// # Errors
    ///
    /// Returns [`LinalgError::Underdetermined`] if `a` has fewer rows than columns.
    pub fn new(a: &impl AsMatrix) -> Result<Self, LinalgError> {
        let a = a.as_view();
        let [m, n] = a.shape();
        if m < n {
            return Err(LinalgError::Underdetermined {
                rows: m,
                columns: n,
            });
        }

        let mut r = Matrix::clone_of(&a);
        let mut reflectors = Matrix::zeros(m, n);

        // scratch for vᵗ·R and v·(vᵗ·R)
        let mut projection = Matrix::zeros(1, n);
        let mut update = Matrix::zeros(m, n);

        for i in 0..n {
            let mut v = reflectors.block_mut(i, m - 1, i, i);
            v.copy_from(&r.block(i, m - 1, i, i));

            let norm = ops::norm2(&v);
            let head = v.at(0, 0);
            *v.at_mut(0, 0) += if head >= 0.0 { norm } else { -norm };

            let length = ops::norm2(&v);
            if length < QR_EPSILON {
                v.clear();
            } else {
                ops::scale_in_place(&mut v, 1.0 / length);

                let v = reflectors.block(i, m - 1, i, i);
                let mut projection = projection.block_mut(0, 0, i, n - 1);
                ops::multiply_lt(&mut projection, &v, &r.block(i, m - 1, i, n - 1));

                let mut update = update.block_mut(i, m - 1, i, n - 1);
                ops::outer(&mut update, &v, &projection);
                ops::add_in_place(&mut r.block_mut(i, m - 1, i, n - 1), -2.0, &update);
            }

            if i + 1 < m {
                r.block_mut(i + 1, m - 1, i, i).clear();
            }
        }

        Ok(Self { reflectors, r })
    }

    /// Shape `[m, n]` of the factorized matrix.
    pub fn shape(&self) -> [usize; 2] {
        self.r.shape()
    }

    /// The full `m x n` triangular factor.
    pub fn r(&self) -> MatrixView<'_> {
        self.r.view()
    }

    /// The `i`-th reflection vector, of length `m - i`.
    pub fn reflector(&self, i: usize) -> MatrixView<'_> {
        let m = self.r.rows();
        self.reflectors.block(i, m - 1, i, i)
    }

    /// Writes the first `k` columns of `Q` into an `m x k` matrix, `k <= m`.
    ///
    /// # Panics
    ///
    /// Panics if `q` does not have `m` rows or has more than `m` columns.
    pub fn q(&self, q: &mut impl AsMatrixMut) {
        let [m, n] = self.shape();
        let mut q = q.as_view_mut();
        assert!(
            q.rows() == m && q.columns() <= m,
            "Q must have {m} rows and at most {m} columns"
        );

        q.clear();
        for j in 0..q.columns() {
            q.set(j, j, 1.0);
            // Q e_j = H_0 H_1 ... H_{n-1} e_j
            for i in (0..n).rev() {
                self.reflect(i, &mut q.block_mut(i, m - 1, j, j));
            }
        }
    }

    /// Overwrites every column of `b` with `Qᵗ b`.
    ///
    /// # Panics
    ///
    /// Panics if `b` does not have `m` rows.
    pub fn apply_qt(&self, b: &mut impl AsMatrixMut) {
        let [m, n] = self.shape();
        let mut b = b.as_view_mut();
        assert_eq!(b.rows(), m, "Qᵗb: b must have {m} rows");

        for j in 0..b.columns() {
            for i in 0..n {
                self.reflect(i, &mut b.block_mut(i, m - 1, j, j));
            }
        }
    }

    /// Solves `R x = y` using the top `n` entries of `y`.
    pub fn solve_r(&self, solution: &mut impl AsMatrixMut, y: &impl AsMatrix) {
        back_substitution(solution, &self.r, y);
    }

    /// Applies `H_i` to a sub-column of length `m - i`.
    fn reflect(&self, i: usize, x: &mut MatrixViewMut<'_>) {
        let v = self.reflector(i);
        let d = ops::dot(&v, &*x);
        ops::add_in_place(x, -2.0 * d, &v);
    }
}

/// Solves the upper triangular system `R x = y` from the last row up.
///
/// Only the top `n x n` block of `r` and the first `n` entries of `y` are read.
/// A pivot with magnitude below [`QR_EPSILON`] makes the system unsolvable and
/// the solution is filled with NaN.
///
/// # Panics
///
/// Panics if `solution` is not `n x 1`, if `r` has fewer than `n` rows or if
/// `y` is not a column with at least `n` entries.
pub fn back_substitution(
    solution: &mut impl AsMatrixMut,
    r: &impl AsMatrix,
    y: &impl AsMatrix,
) {
    let (r, y) = (r.as_view(), y.as_view());
    let mut x = solution.as_view_mut();
    let n = r.columns();
    assert!(
        r.rows() >= n && x.shape() == [n, 1] && y.columns() == 1 && y.rows() >= n,
        "back substitution: incompatible shapes"
    );

    for j in (0..n).rev() {
        let pivot = r.at(j, j);
        if pivot.abs() < QR_EPSILON {
            x.fill(f32::NAN);
            return;
        }

        let mut xj = y.at(j, 0);
        for i in j + 1..n {
            xj -= r.at(j, i) * x.at(i, 0);
        }
        x.set(j, 0, xj / pivot);
    }
}

/// Full QR decomposition: `Q` is `m x m` and `R` is `m x n`.
///
/// # Errors
///
/// Returns an error if `a` has fewer rows than columns or if `q` or `r` have the wrong shape.
pub fn qr_full(
    q: &mut impl AsMatrixMut,
    r: &mut impl AsMatrixMut,
    a: &impl AsMatrix,
) -> Result<(), LinalgError> {
    let [m, n] = a.as_view().shape();
    let (mut q, mut r) = (q.as_view_mut(), r.as_view_mut());
    LinalgError::check_shape("q", q.shape(), [m, m])?;
    LinalgError::check_shape("r", r.shape(), [m, n])?;

    let qr = HouseholderQr::new(a)?;
    qr.q(&mut q);
    r.copy_from(&qr.r());
    Ok(())
}

/// Reduced QR decomposition: `Q` is `m x n` and `R` is `n x n`.
///
/// # Errors
///
/// Returns an error if `a` has fewer rows than columns or if `q` or `r` have the wrong shape.
pub fn qr_reduced(
    q: &mut impl AsMatrixMut,
    r: &mut impl AsMatrixMut,
    a: &impl AsMatrix,
) -> Result<(), LinalgError> {
    let [m, n] = a.as_view().shape();
    let (mut q, mut r) = (q.as_view_mut(), r.as_view_mut());
    LinalgError::check_shape("q", q.shape(), [m, n])?;
    LinalgError::check_shape("r", r.shape(), [n, n])?;

    let qr = HouseholderQr::new(a)?;
    qr.q(&mut q);
    r.copy_from(&qr.r().block(0, n - 1, 0, n - 1));
    Ok(())
}

/// Least-squares solution of `min ‖A x - b‖` with iterative refinement.
///
/// After the first solve, each of the `max_refinements` rounds computes the
/// residual `b - A x`, solves `R y = Qᵗ (b - A x)` and corrects `x += y`.
/// If `A` is rank deficient the solution is filled with NaN.
///
/// # Arguments
///
/// * `solution` - The `n x 1` output.
/// * `a` - The `m x n` design matrix, `m >= n`.
/// * `b` - The `m x 1` right-hand side.
/// * `max_refinements` - Number of refinement rounds.
///
/// # Errors
///
/// Returns an error if `a` has fewer rows than columns or if the operands have incompatible shapes.
pub fn qr_ols(
    solution: &mut impl AsMatrixMut,
    a: &impl AsMatrix,
    b: &impl AsMatrix,
    max_refinements: usize,
) -> Result<(), LinalgError> {
    let (a, b) = (a.as_view(), b.as_view());
    let [m, n] = a.shape();
    let mut x = solution.as_view_mut();
    LinalgError::check_shape("b", b.shape(), [m, 1])?;
    LinalgError::check_shape("solution", x.shape(), [n, 1])?;

    let qr = HouseholderQr::new(&a)?;

    let mut qtb = Matrix::clone_of(&b);
    qr.apply_qt(&mut qtb);
    qr.solve_r(&mut x, &qtb);
    if x.has_nan() {
        return Ok(());
    }

    let mut ax = Matrix::zeros(m, 1);
    let mut residual = Matrix::zeros(m, 1);
    let mut correction = Matrix::zeros(n, 1);
    for _ in 0..max_refinements {
        ops::multiply(&mut ax, &a, &x);
        ops::subtract(&mut residual, &b, &ax);
        qr.apply_qt(&mut residual);
        qr.solve_r(&mut correction, &residual);
        ops::add_in_place(&mut x, 1.0, &correction);
    }

    Ok(())
}

/// Inverse of a square matrix, one column at a time from `R bᵢ = Qᵗ eᵢ`.
///
/// A singular operand yields a NaN-filled result.
///
/// # Errors
///
/// Returns an error if `operand` is not square or `result` has a different shape.
pub fn qr_inverse(
    result: &mut impl AsMatrixMut,
    operand: &impl AsMatrix,
) -> Result<(), LinalgError> {
    let operand = operand.as_view();
    let [rows, columns] = operand.shape();
    if rows != columns {
        return Err(LinalgError::NotSquare { rows, columns });
    }
    let mut result = result.as_view_mut();
    LinalgError::check_shape("result", result.shape(), [rows, rows])?;

    let qr = HouseholderQr::new(&operand)?;
    let mut e = Matrix::zeros(rows, 1);
    for i in 0..rows {
        e.clear();
        e.set(i, 0, 1.0);
        qr.apply_qt(&mut e);
        qr.solve_r(&mut result.column_mut(i), &e);
    }

    Ok(())
}
