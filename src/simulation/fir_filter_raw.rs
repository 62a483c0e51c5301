use crate::errors::Error;
use crate::linalg::{AutoregressiveModel, levinson_durbin};
use crate::noise::RawRecording;
use log::{debug, warn};
use ndarray::{Array1, Array2, ArrayView1, s};
use rayon::prelude::*;
use std::fmt;

// Extra samples, beyond the filter order, needed for a usable autocorrelation estimate
const MIN_EXTRA_SAMPLES: usize = 10;

/// Causal FIR filter, `y[t] = sum_k coefficients[k] * x[t - k]`, applied identically to every channel
#[derive(Clone, Debug, PartialEq)]
pub struct FirFilter {
    coefficients: Array1<f64>, // length = order + 1
}

impl FirFilter {
    pub fn new(coefficients: Array1<f64>) -> Result<Self, Error> {
        if coefficients.is_empty() {
            return Err(Error::ShapeMismatch {
                context: "fir filter coefficients",
                expected: 1,
                found: 0,
            });
        }
        if coefficients.iter().any(|x: &f64| !x.is_finite()) {
            return Err(Error::InvalidFilter {
                reason: format!("coefficients must be finite, found {coefficients}"),
            });
        }

        return Ok(Self { coefficients });
    }

    /// Order 0 filter which passes the signal through unchanged
    pub fn identity() -> Self {
        Self {
            coefficients: Array1::ones(1),
        }
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        return &self.coefficients;
    }

    pub fn order(&self) -> usize {
        return self.coefficients.len() - 1;
    }

    /// Filter every row of `data` along time, with zero history before the first sample
    ///
    /// Rows are filtered in parallel.
    pub fn apply(&self, data: &Array2<f64>) -> Array2<f64> {
        let n_channels: usize = data.nrows();

        let results: Vec<Array1<f64>> = (0..n_channels)
            .into_par_iter()
            .map(|i_channel: usize| {
                return causal_convolve(&self.coefficients, data.row(i_channel));
            })
            .collect();

        let mut filtered: Array2<f64> = Array2::zeros(data.raw_dim());
        for i_channel in 0..n_channels {
            filtered.row_mut(i_channel).assign(&results[i_channel]);
        }

        return filtered;
    }
}

impl fmt::Display for FirFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut string_output = String::from("╔═════════════════════════════════════════════════════════════════════════════╗\n");
        string_output += &format!("║ {:<75} ║\n", " <evoked_sim_rs.FirFilter>");
        string_output += &format!("║ {:<75} ║\n", format!(" order = {}", self.order()));
        let coefficients: Vec<String> = self.coefficients.iter().map(|x: &f64| format!("{x:.4}")).collect();
        string_output += &format!("║ {:<75} ║\n", format!(" coefficients = [{}]", coefficients.join(", ")));
        string_output.push_str("╚═════════════════════════════════════════════════════════════════════════════╝");

        return write!(f, "{string_output}");
    }
}

fn causal_convolve(coefficients: &Array1<f64>, signal: ArrayView1<f64>) -> Array1<f64> {
    let n_samples: usize = signal.len();
    let n_taps: usize = coefficients.len();

    let mut output: Array1<f64> = Array1::zeros(n_samples);
    for i_sample in 0..n_samples {
        let n_terms: usize = n_taps.min(i_sample + 1);
        let mut accumulator: f64 = 0.0;
        for k in 0..n_terms {
            accumulator += coefficients[k] * signal[i_sample - k];
        }
        output[i_sample] = accumulator;
    }

    return output;
}

/// Estimate a FIR filter reproducing the temporal correlation of a raw recording
///
/// # Arguments
/// * `raw` - background recording
/// * `order` - filter order, the filter has `order + 1` taps
/// * `picks` - channels used for the estimate
/// * `start`, `stop` - sample window `start..stop`
///
/// # Returns
/// * `FirFilter` - one filter shared by all channels, with unit energy so that filtering
///   white noise keeps its variance
///
/// # Algorithm
/// 1. Per channel, in parallel: remove the mean and compute the biased autocorrelation
///    at lags `0..=order`, normalised by lag 0. Flat channels are skipped.
/// 2. Average the normalised autocorrelations over channels.
/// 3. Solve the Yule-Walker equations (Levinson-Durbin) for the AR model
///    `x[t] = sum_k a_k x[t - k] + e[t]`.
/// 4. The filter is the impulse response of `1 / (1 - sum_k a_k z^-k)`, truncated to
///    `order + 1` taps and scaled to unit energy.
///
/// # Errors
/// * `InsufficientSamples` - the window has fewer than `order + 10` samples
/// * `ShapeMismatch` - no channel picked, or the window or picks lie outside the recording
/// * `NonPositiveSemiDefinite` - every channel is flat, or the averaged autocorrelation
///   is not positive definite
///
pub fn fir_filter_raw(raw: &RawRecording, order: usize, picks: &[usize], start: usize, stop: usize) -> Result<FirFilter, Error> {
    let n_samples: usize = stop.saturating_sub(start);
    let n_required: usize = order + MIN_EXTRA_SAMPLES;
    if n_samples < n_required {
        return Err(Error::InsufficientSamples {
            n_samples,
            order,
            n_required,
        });
    }
    if picks.is_empty() {
        return Err(Error::ShapeMismatch {
            context: "fir filter channel picks",
            expected: 1,
            found: 0,
        });
    }

    let segment: Array2<f64> = raw.segment(picks, start, stop)?; // shape = [n_picks, n_samples]
    if order == 0 {
        return Ok(FirFilter::identity());
    }

    let autocorrelations: Vec<Option<Array1<f64>>> = (0..picks.len())
        .into_par_iter()
        .map(|i_pick: usize| {
            return normalised_autocorrelation(segment.row(i_pick), order);
        })
        .collect();

    let n_flat: usize = autocorrelations.iter().filter(|autocorrelation| autocorrelation.is_none()).count();
    if n_flat > 0 {
        warn!("fir_filter_raw: skipping {n_flat} flat channel(s) out of {}", picks.len());
    }
    let n_used: usize = picks.len() - n_flat;
    if n_used == 0 {
        return Err(Error::NonPositiveSemiDefinite {
            reason: "every picked channel is flat over the estimation window".to_string(),
        });
    }

    let mut mean_autocorrelation: Array1<f64> = Array1::zeros(order + 1);
    for autocorrelation in autocorrelations.iter().flatten() {
        mean_autocorrelation += autocorrelation;
    }
    mean_autocorrelation /= n_used as f64;

    let model: AutoregressiveModel = levinson_durbin(&mean_autocorrelation)?;

    // Impulse response of the all-pole model
    let mut impulse_response: Array1<f64> = Array1::zeros(order + 1);
    impulse_response[0] = 1.0;
    for n in 1..=order {
        let mut accumulator: f64 = 0.0;
        for k in 1..=n.min(order) {
            accumulator += model.coefficients[k - 1] * impulse_response[n - k];
        }
        impulse_response[n] = accumulator;
    }
    let energy: f64 = impulse_response.mapv(|x: f64| x.powi(2)).sum();
    let coefficients: Array1<f64> = impulse_response / energy.sqrt();

    debug!(
        "fir_filter_raw: {} channels x {} samples, ar = {}, fir = {}",
        n_used, n_samples, model.coefficients, coefficients
    );

    return FirFilter::new(coefficients);
}

/// Biased autocorrelation at lags `0..=order`, divided by lag 0; `None` for a flat signal
fn normalised_autocorrelation(signal: ArrayView1<f64>, order: usize) -> Option<Array1<f64>> {
    let n_samples: usize = signal.len();
    let mean: f64 = signal.sum() / n_samples as f64;
    let centred: Array1<f64> = signal.mapv(|x: f64| x - mean);

    let mut autocorrelation: Array1<f64> = Array1::zeros(order + 1);
    for lag in 0..=order {
        let products: f64 = centred.slice(s![..n_samples - lag]).dot(&centred.slice(s![lag..]));
        autocorrelation[lag] = products / n_samples as f64;
    }

    let lag_zero: f64 = autocorrelation[0];
    if !(lag_zero > 0.0) || !lag_zero.is_finite() {
        return None;
    }

    return Some(autocorrelation / lag_zero);
}

#[test]
fn test_fir_filter_apply() {
    use approx::assert_abs_diff_eq;

    let filter: FirFilter = FirFilter::new(Array1::from_vec(vec![1.0, 0.5, -0.25])).expect("finite coefficients");
    assert_eq!(filter.order(), 2);

    let data: Array2<f64> = Array2::from_shape_vec((2, 4), vec![1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]).expect("shape");
    let filtered: Array2<f64> = filter.apply(&data);

    // Impulse in, coefficients out
    let expected_impulse: Vec<f64> = vec![1.0, 0.5, -0.25, 0.0];
    // Step in, running sum of coefficients out
    let expected_step: Vec<f64> = vec![1.0, 1.5, 1.25, 1.25];
    for i_sample in 0..4 {
        assert_abs_diff_eq!(filtered[[0, i_sample]], expected_impulse[i_sample], epsilon = 1e-12);
        assert_abs_diff_eq!(filtered[[1, i_sample]], expected_step[i_sample], epsilon = 1e-12);
    }

    assert_eq!(FirFilter::identity().apply(&data), data);
    assert!(matches!(FirFilter::new(Array1::zeros(0)), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(FirFilter::new(Array1::from_vec(vec![1.0, f64::NAN])), Err(Error::InvalidFilter { .. })));
    assert!(matches!(FirFilter::new(Array1::from_vec(vec![f64::INFINITY])), Err(Error::InvalidFilter { .. })));
}

#[test]
fn test_fir_filter_raw_recovers_ar1() {
    use crate::channels::{Channel, ChannelKind};
    use crate::timebase::Timebase;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::StandardNormal;

    // Two channels of x[t] = 0.8 x[t-1] + e[t], plus one flat channel
    let phi: f64 = 0.8;
    let n_samples: usize = 40_000;
    let mut rng: StdRng = StdRng::seed_from_u64(7);
    let mut data: Array2<f64> = Array2::zeros((3, n_samples));
    for i_channel in 0..2 {
        let mut previous: f64 = 0.0;
        for i_sample in 0..n_samples {
            let innovation: f64 = rng.sample(StandardNormal);
            previous = phi * previous + innovation;
            data[[i_channel, i_sample]] = previous;
        }
    }
    data.row_mut(2).fill(3.0);

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0112", ChannelKind::Gradiometer),
        Channel::new("MEG 0113", ChannelKind::Magnetometer),
    ];
    let raw: RawRecording = RawRecording::new(channels, data, Timebase::from_sfreq(0.0, 1000.0, n_samples)).expect("valid raw");

    let filter: FirFilter = fir_filter_raw(&raw, 3, &[0, 1, 2], 1000, n_samples).expect("enough samples");
    assert_eq!(filter.order(), 3);

    // Taps follow phi^k, with unit energy
    let coefficients: &Array1<f64> = filter.coefficients();
    assert_abs_diff_eq!(coefficients.mapv(|x: f64| x.powi(2)).sum(), 1.0, epsilon = 1e-12);
    for k in 1..=3 {
        assert_abs_diff_eq!(coefficients[k] / coefficients[0], phi.powi(k as i32), epsilon = 0.03);
    }
}

#[test]
fn test_fir_filter_raw_errors() {
    use crate::channels::{Channel, ChannelKind};
    use crate::timebase::Timebase;

    let channels: Vec<Channel> = vec![Channel::new("MEG 0111", ChannelKind::Gradiometer)];
    let mut data: Array2<f64> = Array2::zeros((1, 100));
    data.row_mut(0).assign(&Array1::from_shape_fn(100, |i_sample: usize| ((i_sample * 37) % 11) as f64));
    let raw: RawRecording = RawRecording::new(channels, data, Timebase::from_sfreq(0.0, 100.0, 100)).expect("valid raw");

    // 14 samples are not enough for order 5
    let result: Result<FirFilter, Error> = fir_filter_raw(&raw, 5, &[0], 10, 24);
    assert!(matches!(
        result,
        Err(Error::InsufficientSamples {
            n_samples: 14,
            order: 5,
            n_required: 15
        })
    ));

    // Inverted window
    assert!(matches!(fir_filter_raw(&raw, 5, &[0], 50, 10), Err(Error::InsufficientSamples { .. })));

    // Order zero is the identity
    let filter: FirFilter = fir_filter_raw(&raw, 0, &[0], 0, 100).expect("order zero");
    assert_eq!(filter, FirFilter::identity());

    // No channels
    assert!(matches!(fir_filter_raw(&raw, 2, &[], 0, 100), Err(Error::ShapeMismatch { .. })));
}
