use crate::errors::Error;
use crate::linalg::{SymmetricEigen, symmetric_eigen};
use log::warn;
use ndarray::{Array1, Array2, ArrayView1};
use ndarray_stats::QuantileExt;

// Eigenvalues more negative than this fraction of their diagonal weight are rejected
const NEGATIVE_EIGENVALUE_TOLERANCE: f64 = 1e-10;
// Absolute floor on the weight, relative to the largest |eigenvalue|, for all-zero directions
const WEIGHT_FLOOR: f64 = 1e-30;
// Relative asymmetry tolerated before a matrix is rejected
const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Symmetric square root of a covariance matrix, `S = V sqrt(L) V^T`, so that `S S^T = C`
///
/// # Arguments
/// * `covariance` - symmetric positive semi-definite matrix, shape = [n, n]
///
/// # Returns
/// * `Array2<f64>` - the colouring matrix `S`, shape = [n, n]. Multiplying independent
///   standard-normal columns by `S` gives columns with covariance `covariance`.
///
/// # Algorithm
/// Jacobi eigen-decomposition `C = V L V^T`. Each eigenvalue `l_i` is compared with the
/// diagonal weight of its eigenvector, `w_i = sum_k V[k, i]^2 C[k, k]`, so channels in
/// different units (T^2 and V^2) are judged on their own scale. Round-off negative
/// eigenvalues are clamped to zero, so rank-deficient covariances (e.g. after signal-space
/// projection) are accepted.
///
/// # Errors
/// * `NonPositiveSemiDefinite` - non-square, non-finite, asymmetric, or has an eigenvalue
///   below `-NEGATIVE_EIGENVALUE_TOLERANCE * w_i`
///
pub fn covariance_sqrt(covariance: &Array2<f64>) -> Result<Array2<f64>, Error> {
    let n: usize = covariance.nrows();
    if covariance.ncols() != n {
        return Err(Error::NonPositiveSemiDefinite {
            reason: format!("covariance is not square, shape = [{}, {}]", n, covariance.ncols()),
        });
    }
    if n == 0 {
        return Ok(Array2::zeros((0, 0)));
    }

    // Symmetry
    let scale: f64 = *covariance.mapv(|x: f64| x.abs()).max().map_err(|_| Error::NonPositiveSemiDefinite {
        reason: "covariance contains non-finite values".to_string(),
    })?;
    for i in 0..n {
        for j in (i + 1)..n {
            if (covariance[[i, j]] - covariance[[j, i]]).abs() > SYMMETRY_TOLERANCE * scale {
                return Err(Error::NonPositiveSemiDefinite {
                    reason: format!("covariance is not symmetric at [{i}, {j}]"),
                });
            }
        }
    }

    let eigen: SymmetricEigen = symmetric_eigen(covariance)?;
    let largest: f64 = *eigen.eigenvalues.mapv(|x: f64| x.abs()).max().map_err(|_| Error::NonPositiveSemiDefinite {
        reason: "eigenvalues are not finite".to_string(),
    })?;

    let diagonal: Array1<f64> = covariance.diag().mapv(f64::abs);
    for (i_eigen, &eigenvalue) in eigen.eigenvalues.iter().enumerate() {
        let eigenvector: ArrayView1<f64> = eigen.eigenvectors.column(i_eigen);
        let weight: f64 = eigenvector.mapv(|x: f64| x.powi(2)).dot(&diagonal);
        if eigenvalue < -NEGATIVE_EIGENVALUE_TOLERANCE * weight - WEIGHT_FLOOR * largest {
            return Err(Error::NonPositiveSemiDefinite {
                reason: format!("eigenvalue {eigenvalue:e} is negative (diagonal weight of its eigenvector {weight:e})"),
            });
        }
    }
    let n_clamped: usize = eigen.eigenvalues.iter().filter(|&&x| x < 0.0).count();
    if n_clamped > 0 {
        warn!("covariance_sqrt: clamping {n_clamped} round-off negative eigenvalue(s) to zero");
    }

    let sqrt_eigenvalues: Array1<f64> = eigen.eigenvalues.mapv(|x: f64| x.max(0.0).sqrt());
    let colouring: Array2<f64> = (&eigen.eigenvectors * &sqrt_eigenvalues).dot(&eigen.eigenvectors.t());

    return Ok(colouring);
}

#[test]
fn test_covariance_sqrt_squares_back() {
    use approx::assert_abs_diff_eq;

    let covariance: Array2<f64> = Array2::from_shape_vec((3, 3), vec![4.0, 1.2, -0.6, 1.2, 2.0, 0.3, -0.6, 0.3, 1.0]).expect("shape");
    let colouring: Array2<f64> = covariance_sqrt(&covariance).expect("positive definite");

    let squared: Array2<f64> = colouring.dot(&colouring.t());
    for (squared_value, original_value) in squared.iter().zip(covariance.iter()) {
        assert_abs_diff_eq!(*squared_value, *original_value, epsilon = 1e-10);
    }
}

#[test]
fn test_covariance_sqrt_accepts_rank_deficient() {
    use approx::assert_abs_diff_eq;

    // Rank one: u u^T
    let u: Array1<f64> = Array1::from_vec(vec![1.0, -2.0, 0.5]);
    let covariance: Array2<f64> = Array2::from_shape_fn((3, 3), |(i, j)| u[i] * u[j]);
    let colouring: Array2<f64> = covariance_sqrt(&covariance).expect("positive semi-definite");

    let squared: Array2<f64> = colouring.dot(&colouring.t());
    for (squared_value, original_value) in squared.iter().zip(covariance.iter()) {
        assert_abs_diff_eq!(*squared_value, *original_value, epsilon = 1e-10);
    }
}

#[test]
fn test_covariance_sqrt_rejects_indefinite() {
    // Eigenvalues 3 and -1
    let indefinite: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 1.0]).expect("shape");
    assert!(matches!(covariance_sqrt(&indefinite), Err(Error::NonPositiveSemiDefinite { .. })));

    let asymmetric: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, 0.5, 0.0, 1.0]).expect("shape");
    assert!(matches!(covariance_sqrt(&asymmetric), Err(Error::NonPositiveSemiDefinite { .. })));

    let not_finite: Array2<f64> = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, f64::INFINITY]).expect("shape");
    assert!(matches!(covariance_sqrt(&not_finite), Err(Error::NonPositiveSemiDefinite { .. })));
}

#[test]
fn test_covariance_sqrt_mixed_units() {
    use approx::assert_relative_eq;

    // Two channels in tesla^2 and one in volt^2
    let covariance: Array2<f64> = Array2::from_shape_vec(
        (3, 3),
        vec![
            4e-26, 1e-26, 1e-19, //
            1e-26, 9e-26, -1e-19, //
            1e-19, -1e-19, 1e-12,
        ],
    )
    .expect("shape");
    let colouring: Array2<f64> = covariance_sqrt(&covariance).expect("positive definite");

    let squared: Array2<f64> = colouring.dot(&colouring.t());
    for (squared_value, original_value) in squared.iter().zip(covariance.iter()) {
        assert_relative_eq!(*squared_value, *original_value, max_relative = 1e-6);
    }
}

#[test]
fn test_covariance_sqrt_rejects_indefinite_small_block() {
    // Tesla^2 block with eigenvalues 3e-26 and -1e-26, next to a volt^2 channel
    let covariance: Array2<f64> = Array2::from_shape_vec(
        (3, 3),
        vec![
            1e-26, 2e-26, 0.0, //
            2e-26, 1e-26, 0.0, //
            0.0, 0.0, 1e-12,
        ],
    )
    .expect("shape");
    assert!(matches!(covariance_sqrt(&covariance), Err(Error::NonPositiveSemiDefinite { .. })));

    // The same block made semi-definite is accepted
    let rank_deficient: Array2<f64> = Array2::from_shape_vec(
        (3, 3),
        vec![
            1e-26, 1e-26, 0.0, //
            1e-26, 1e-26, 0.0, //
            0.0, 0.0, 1e-12,
        ],
    )
    .expect("shape");
    assert!(covariance_sqrt(&rank_deficient).is_ok());
}
