use crate::errors::Error;
use ndarray::Array1;

/// Autoregressive model `x[t] = sum_k coefficients[k - 1] * x[t - k] + e[t]`
#[derive(Clone, Debug)]
pub struct AutoregressiveModel {
    pub coefficients: Array1<f64>, // a_1 ... a_p
    pub innovation_variance: f64,  // variance of e[t], in units of autocorrelation[0]
}

/// Solve the Yule-Walker equations with the Levinson-Durbin recursion
///
/// # Arguments
/// * `autocorrelation` - `r[0] ... r[p]`, the autocorrelation at lags `0..=p`
///
/// # Returns
/// * `AutoregressiveModel` - order `p` coefficients and the innovation variance
///
/// # Errors
/// * `NonPositiveSemiDefinite` - `r[0] <= 0`, or the Toeplitz matrix built from
///   `autocorrelation` is not positive definite (prediction error reaches zero)
///
pub fn levinson_durbin(autocorrelation: &Array1<f64>) -> Result<AutoregressiveModel, Error> {
    if autocorrelation.is_empty() || !(autocorrelation[0] > 0.0) {
        return Err(Error::NonPositiveSemiDefinite {
            reason: "autocorrelation at lag zero must be positive".to_string(),
        });
    }

    let order: usize = autocorrelation.len() - 1;
    let mut coefficients: Array1<f64> = Array1::zeros(order);
    let mut prediction_error: f64 = autocorrelation[0];

    for i_order in 0..order {
        // Reflection coefficient
        let mut accumulator: f64 = autocorrelation[i_order + 1];
        for k in 0..i_order {
            accumulator -= coefficients[k] * autocorrelation[i_order - k];
        }
        let reflection: f64 = accumulator / prediction_error;

        // Update the lower-order coefficients
        let previous: Array1<f64> = coefficients.clone();
        for k in 0..i_order {
            coefficients[k] = previous[k] - reflection * previous[i_order - 1 - k];
        }
        coefficients[i_order] = reflection;

        prediction_error *= 1.0 - reflection.powi(2);
        if !(prediction_error > 0.0) {
            return Err(Error::NonPositiveSemiDefinite {
                reason: format!("autocorrelation is not positive definite at order {}", i_order + 1),
            });
        }
    }

    return Ok(AutoregressiveModel {
        coefficients,
        innovation_variance: prediction_error,
    });
}

#[test]
fn test_levinson_durbin_ar1() {
    use approx::assert_abs_diff_eq;

    // AR(1) with coefficient phi has autocorrelation phi^k; higher orders are zero
    let phi: f64 = 0.7;
    let autocorrelation: Array1<f64> = Array1::from_shape_fn(4, |k: usize| phi.powi(k as i32));
    let model: AutoregressiveModel = levinson_durbin(&autocorrelation).expect("positive definite");

    assert_eq!(model.coefficients.len(), 3);
    assert_abs_diff_eq!(model.coefficients[0], phi, epsilon = 1e-12);
    assert_abs_diff_eq!(model.coefficients[1], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(model.coefficients[2], 0.0, epsilon = 1e-12);
    assert_abs_diff_eq!(model.innovation_variance, 1.0 - phi.powi(2), epsilon = 1e-12);
}

#[test]
fn test_levinson_durbin_ar2() {
    use approx::assert_abs_diff_eq;

    // x[t] = 0.5 x[t-1] - 0.3 x[t-2] + e[t]
    // Yule-Walker: rho1 = a1 / (1 - a2), rho2 = a1 rho1 + a2
    let a1: f64 = 0.5;
    let a2: f64 = -0.3;
    let rho1: f64 = a1 / (1.0 - a2);
    let rho2: f64 = a1 * rho1 + a2;
    let autocorrelation: Array1<f64> = Array1::from_vec(vec![1.0, rho1, rho2]);

    let model: AutoregressiveModel = levinson_durbin(&autocorrelation).expect("positive definite");
    assert_abs_diff_eq!(model.coefficients[0], a1, epsilon = 1e-12);
    assert_abs_diff_eq!(model.coefficients[1], a2, epsilon = 1e-12);
}

#[test]
fn test_levinson_durbin_order_zero_and_errors() {
    let model: AutoregressiveModel = levinson_durbin(&Array1::from_vec(vec![2.0])).expect("order zero");
    assert!(model.coefficients.is_empty());

    assert!(levinson_durbin(&Array1::from_vec(vec![0.0, 0.0])).is_err());

    // |r1| = r0 is a perfectly predictable sequence
    assert!(levinson_durbin(&Array1::from_vec(vec![1.0, 1.0])).is_err());
}
