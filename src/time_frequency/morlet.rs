use crate::errors::Error;
use ndarray::Array1;
use num::complex::Complex64;
use std::f64::consts::PI;

// Wavelet support is [-N_SIGMA * sigma_t, N_SIGMA * sigma_t]
const N_SIGMA: f64 = 5.0;

/// Complex Morlet wavelets
///
/// # Arguments
/// * `sfreq` - sampling frequency, (hertz)
/// * `freqs` - centre frequency of each wavelet, (hertz)
/// * `n_cycles` - number of cycles per wavelet; either one value shared by all wavelets,
///   or one value per frequency
/// * `sigma` - when given, the temporal width is `n_cycles / (2 pi sigma)` for every frequency,
///   so all wavelets have the same length
/// * `zero_mean` - subtract the Gaussian offset `exp(-2 (pi f sigma_t)^2)` so the wavelet has zero mean
///
/// # Returns
/// * `Vec<Array1<Complex64>>` - one wavelet per frequency, each with `||W||_2 = sqrt(2)`
///
/// # Algorithm
/// `W(t) = (exp(2 i pi f t) - offset) * exp(-t^2 / (2 sigma_t^2))`, sampled at `t = k / sfreq`
/// for `|t| < 5 sigma_t`, symmetric about `t = 0`, then scaled by `1 / (sqrt(0.5) ||W||)`.
///
/// # Errors
/// * `ShapeMismatch` - `n_cycles` is neither length 1 nor the length of `freqs`
/// * `InvalidSettings` - a non-positive sampling frequency, frequency, cycle count or sigma
///
pub fn morlet(sfreq: f64, freqs: &[f64], n_cycles: &[f64], sigma: Option<f64>, zero_mean: bool) -> Result<Vec<Array1<Complex64>>, Error> {
    if n_cycles.len() != 1 && n_cycles.len() != freqs.len() {
        return Err(Error::ShapeMismatch {
            context: "morlet n_cycles",
            expected: freqs.len(),
            found: n_cycles.len(),
        });
    }
    if !(sfreq > 0.0) {
        return Err(Error::InvalidSettings {
            field: "sfreq",
            reason: format!("sampling frequency must be positive, found {sfreq}"),
        });
    }
    if let Some(sigma) = sigma {
        if !(sigma > 0.0) {
            return Err(Error::InvalidSettings {
                field: "sigma",
                reason: format!("sigma must be positive, found {sigma}"),
            });
        }
    }

    let mut wavelets: Vec<Array1<Complex64>> = Vec::with_capacity(freqs.len());
    for (i_freq, &freq) in freqs.iter().enumerate() {
        let cycles: f64 = if n_cycles.len() == 1 { n_cycles[0] } else { n_cycles[i_freq] };
        if !(freq > 0.0) || !(cycles > 0.0) {
            return Err(Error::InvalidSettings {
                field: "freqs",
                reason: format!("frequency and n_cycles must be positive, found {freq} Hz with {cycles} cycles"),
            });
        }

        let sigma_t: f64 = match sigma {
            Some(sigma) => cycles / (2.0 * PI * sigma),
            None => cycles / (2.0 * PI * freq),
        };

        // Non-negative half of the support, then mirrored: t = [-t[n-1], ..., -t[1], 0, t[1], ..., t[n-1]]
        let n_half: usize = (N_SIGMA * sigma_t * sfreq).ceil() as usize;
        let n_half: usize = n_half.max(1);
        let n_total: usize = 2 * n_half - 1;
        let times: Array1<f64> = Array1::from_shape_fn(n_total, |i_sample: usize| (i_sample as f64 - (n_half - 1) as f64) / sfreq);

        let offset: f64 = if zero_mean { (-2.0 * (PI * freq * sigma_t).powi(2)).exp() } else { 0.0 };

        let mut wavelet: Array1<Complex64> = times.mapv(|t: f64| {
            let oscillation: Complex64 = Complex64::new(0.0, 2.0 * PI * freq * t).exp() - offset;
            let envelope: f64 = (-t.powi(2) / (2.0 * sigma_t.powi(2))).exp();
            return oscillation * envelope;
        });

        let norm: f64 = wavelet.iter().map(|w: &Complex64| w.norm_sqr()).sum::<f64>().sqrt();
        let scale: f64 = 1.0 / (0.5_f64.sqrt() * norm);
        wavelet.mapv_inplace(|w: Complex64| w * scale);

        wavelets.push(wavelet);
    }

    return Ok(wavelets);
}

#[test]
fn test_morlet_length_and_norm() {
    use approx::assert_abs_diff_eq;

    let wavelets: Vec<Array1<Complex64>> = morlet(1000.0, &[3.0, 10.0], &[1.0, 1.5], None, false).expect("valid wavelets");
    assert_eq!(wavelets.len(), 2);

    // 3 Hz, 1 cycle: sigma_t = 1 / (6 pi) = 0.05305 s, half support ceil(265.26) = 266 samples
    assert_eq!(wavelets[0].len(), 2 * 266 - 1);
    // 10 Hz, 1.5 cycles: sigma_t = 0.02387 s, half support ceil(119.37) = 120 samples
    assert_eq!(wavelets[1].len(), 2 * 120 - 1);

    for wavelet in &wavelets {
        let norm: f64 = wavelet.iter().map(|w: &Complex64| w.norm_sqr()).sum::<f64>().sqrt();
        assert_abs_diff_eq!(norm, 2.0_f64.sqrt(), epsilon = 1e-12);

        // Peak of the envelope in the centre, real and positive
        let centre: Complex64 = wavelet[(wavelet.len() - 1) / 2];
        assert_abs_diff_eq!(centre.im, 0.0, epsilon = 1e-12);
        assert!(centre.re > 0.0);

        // Real part is even, imaginary part is odd
        let n: usize = wavelet.len();
        assert_abs_diff_eq!(wavelet[1].re, wavelet[n - 2].re, epsilon = 1e-12);
        assert_abs_diff_eq!(wavelet[1].im, -wavelet[n - 2].im, epsilon = 1e-12);
    }
}

#[test]
fn test_morlet_zero_mean_and_errors() {
    use approx::assert_abs_diff_eq;

    // Few cycles: the Gaussian offset matters
    let wavelets: Vec<Array1<Complex64>> = morlet(1000.0, &[5.0], &[1.0], None, true).expect("valid wavelet");
    let mean: Complex64 = wavelets[0].sum() / wavelets[0].len() as f64;
    assert_abs_diff_eq!(mean.re, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(mean.im, 0.0, epsilon = 1e-12);

    // Fixed sigma gives wavelets of equal length
    let wavelets: Vec<Array1<Complex64>> = morlet(500.0, &[4.0, 8.0], &[2.0], Some(4.0), false).expect("valid wavelets");
    assert_eq!(wavelets[0].len(), wavelets[1].len());

    assert!(matches!(morlet(1000.0, &[3.0, 10.0], &[1.0, 1.0, 1.0], None, false), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(morlet(1000.0, &[0.0], &[1.0], None, false), Err(Error::InvalidSettings { .. })));
}
