use crate::errors::Error;
use ndarray::{Array1, Array2, ArrayViewMut1, Zip, s};

const MAX_SWEEPS: usize = 100;
// a[p, q] is negligible below RELATIVE_TOLERANCE * sqrt(|a[p, p] a[q, q]|) + ABSOLUTE_TOLERANCE * ||A||_F
const RELATIVE_TOLERANCE: f64 = 1e-12;
const ABSOLUTE_TOLERANCE: f64 = 1e-30;

/// Eigen-decomposition of a real symmetric matrix, `matrix = V diag(L) V^T`
pub struct SymmetricEigen {
    pub eigenvalues: Array1<f64>,  // L, not sorted
    pub eigenvectors: Array2<f64>, // V, one eigenvector per column
}

/// Cyclic Jacobi eigen-decomposition of a real symmetric matrix
///
/// # Arguments
/// * `matrix` - square, symmetric, shape = [n, n]. Only symmetric input gives meaningful results,
///   the caller is responsible for checking symmetry.
///
/// # Returns
/// * `SymmetricEigen` - eigenvalues and orthonormal eigenvectors
///
/// # Algorithm
/// Each sweep visits every off-diagonal pair `(p, q)` and applies the plane rotation `J` which
/// zeroes `a[p, q]` in `J^T A J`. Sweeps repeat until every `a[p, q]` is negligible compared to
/// `sqrt(|a[p, p] a[q, q]|)`. The test is relative to the diagonal, so channels measured in very
/// different units (tesla and volt) keep their correlations.
///
/// # Errors
/// * `NonPositiveSemiDefinite` - the matrix is not square, contains non-finite values, or
///   the iteration did not converge within `MAX_SWEEPS` sweeps
///
pub fn symmetric_eigen(matrix: &Array2<f64>) -> Result<SymmetricEigen, Error> {
    let n: usize = matrix.nrows();
    if matrix.ncols() != n {
        return Err(Error::NonPositiveSemiDefinite {
            reason: format!("matrix is not square, shape = [{}, {}]", n, matrix.ncols()),
        });
    }
    if matrix.iter().any(|x: &f64| !x.is_finite()) {
        return Err(Error::NonPositiveSemiDefinite {
            reason: "matrix contains non-finite values".to_string(),
        });
    }

    let mut a: Array2<f64> = matrix.to_owned();
    let mut v: Array2<f64> = Array2::eye(n);

    let frobenius_norm: f64 = a.iter().map(|x: &f64| x.powi(2)).sum::<f64>().sqrt();
    let floor: f64 = ABSOLUTE_TOLERANCE * frobenius_norm;

    let mut converged: bool = false;
    for _i_sweep in 0..MAX_SWEEPS {
        let mut n_rotations: usize = 0;
        for p in 0..n {
            for q in (p + 1)..n {
                let a_pq: f64 = a[[p, q]];
                if a_pq.abs() <= RELATIVE_TOLERANCE * (a[[p, p]] * a[[q, q]]).abs().sqrt() + floor {
                    continue;
                }
                n_rotations += 1;

                // Rotation angle which zeroes a[p, q]
                let theta: f64 = (a[[q, q]] - a[[p, p]]) / (2.0 * a_pq);
                let t: f64 = if theta.abs() > 1e150 {
                    0.5 / theta
                } else if theta >= 0.0 {
                    1.0 / (theta + (theta.powi(2) + 1.0).sqrt())
                } else {
                    -1.0 / (-theta + (theta.powi(2) + 1.0).sqrt())
                };
                let cos: f64 = 1.0 / (t.powi(2) + 1.0).sqrt();
                let sin: f64 = t * cos;

                // A <- A J, then A <- J^T A, then V <- V J
                {
                    let (column_p, column_q) = a.multi_slice_mut((s![.., p], s![.., q]));
                    rotate(column_p, column_q, cos, sin);
                }
                {
                    let (row_p, row_q) = a.multi_slice_mut((s![p, ..], s![q, ..]));
                    rotate(row_p, row_q, cos, sin);
                }
                {
                    let (column_p, column_q) = v.multi_slice_mut((s![.., p], s![.., q]));
                    rotate(column_p, column_q, cos, sin);
                }

                // Zero by construction, remove the round-off
                a[[p, q]] = 0.0;
                a[[q, p]] = 0.0;
            }
        }

        if n_rotations == 0 {
            converged = true;
            break;
        }
    }
    if !converged {
        return Err(Error::NonPositiveSemiDefinite {
            reason: format!("eigen-decomposition did not converge after {MAX_SWEEPS} sweeps"),
        });
    }

    let eigenvalues: Array1<f64> = a.diag().to_owned();
    return Ok(SymmetricEigen {
        eigenvalues,
        eigenvectors: v,
    });
}

/// `(x, y) <- (cos x - sin y, sin x + cos y)`
fn rotate(x: ArrayViewMut1<f64>, y: ArrayViewMut1<f64>, cos: f64, sin: f64) {
    Zip::from(x).and(y).for_each(|x_k: &mut f64, y_k: &mut f64| {
        let x_old: f64 = *x_k;
        let y_old: f64 = *y_k;
        *x_k = cos * x_old - sin * y_old;
        *y_k = sin * x_old + cos * y_old;
    });
}

#[test]
fn test_symmetric_eigen_two_by_two() {
    use approx::assert_abs_diff_eq;

    // Eigenvalues of [[2, 1], [1, 2]] are 1 and 3
    let matrix: Array2<f64> = Array2::from_shape_vec((2, 2), vec![2.0, 1.0, 1.0, 2.0]).expect("shape");
    let eigen: SymmetricEigen = symmetric_eigen(&matrix).expect("symmetric matrix");

    let mut eigenvalues: Vec<f64> = eigen.eigenvalues.to_vec();
    eigenvalues.sort_by(|a: &f64, b: &f64| a.total_cmp(b));
    assert_abs_diff_eq!(eigenvalues[0], 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(eigenvalues[1], 3.0, epsilon = 1e-12);
}

#[test]
fn test_symmetric_eigen_reconstructs_matrix() {
    use approx::assert_abs_diff_eq;

    let matrix: Array2<f64> = Array2::from_shape_vec(
        (4, 4),
        vec![
            4.0, 1.0, -2.0, 0.5, //
            1.0, 3.0, 0.0, 1.5, //
            -2.0, 0.0, 5.0, -1.0, //
            0.5, 1.5, -1.0, 2.0,
        ],
    )
    .expect("shape");
    let eigen: SymmetricEigen = symmetric_eigen(&matrix).expect("symmetric matrix");

    // V diag(L) V^T
    let reconstructed: Array2<f64> = eigen.eigenvectors.dot(&Array2::from_diag(&eigen.eigenvalues)).dot(&eigen.eigenvectors.t());
    for (reconstructed_value, original_value) in reconstructed.iter().zip(matrix.iter()) {
        assert_abs_diff_eq!(*reconstructed_value, *original_value, epsilon = 1e-10);
    }

    // V is orthonormal
    let identity: Array2<f64> = eigen.eigenvectors.t().dot(&eigen.eigenvectors);
    for ((i, j), value) in identity.indexed_iter() {
        let expected: f64 = if i == j { 1.0 } else { 0.0 };
        assert_abs_diff_eq!(*value, expected, epsilon = 1e-10);
    }

    // Trace is preserved
    assert_abs_diff_eq!(eigen.eigenvalues.sum(), 14.0, epsilon = 1e-10);
}

#[test]
fn test_symmetric_eigen_rejects_nan() {
    let matrix: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, f64::NAN, f64::NAN, 1.0]).expect("shape");
    assert!(matches!(symmetric_eigen(&matrix), Err(Error::NonPositiveSemiDefinite { .. })));
}
