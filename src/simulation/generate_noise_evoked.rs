use crate::errors::Error;
use crate::evoked::{EvokedSignal, SignalLayout};
use crate::linalg::covariance_sqrt;
use crate::noise::NoiseCovariance;
use crate::simulation::FirFilter;
use crate::timebase::Timebase;
use log::debug;
use ndarray::{Array2, s};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Synthesise coloured noise with the layout of an evoked signal
///
/// # Arguments
/// * `evoked` - clean signal, provides the channels, `tmin` and `tstep`
/// * `noise_cov` - noise covariance, must contain every channel of `evoked`
/// * `n_samples` - number of samples to generate
/// * `fir_filter` - temporal filter; `None` gives temporally white noise
/// * `random_state` - seed; `None` seeds from the operating system
///
/// # Returns
/// * `EvokedSignal` - shape = [evoked n_channels, n_samples], starting at `evoked`'s `tmin`
///
/// # Algorithm
/// 1. Draw `order` warm-up samples plus `n_samples` independent standard-normal samples per channel.
/// 2. Spatial colouring: multiply by the symmetric square root of the covariance.
/// 3. Temporal colouring: causal FIR filter along time with zero history.
/// 4. Drop the warm-up samples, so every returned sample has a full filter history.
///
/// # Errors
/// * `ChannelMismatch` - an evoked channel is missing from the covariance
/// * `NonPositiveSemiDefinite` - the covariance has no real square root
///
pub fn generate_noise_evoked(
    evoked: &EvokedSignal,
    noise_cov: &NoiseCovariance,
    n_samples: usize,
    fir_filter: Option<&FirFilter>,
    random_state: Option<u64>,
) -> Result<EvokedSignal, Error> {
    let channel_names: Vec<String> = evoked.layout().channel_names();
    let noise_cov: NoiseCovariance = noise_cov.pick_channels(&channel_names)?;
    let colouring: Array2<f64> = covariance_sqrt(noise_cov.data())?;

    let fir_filter: FirFilter = match fir_filter {
        Some(fir_filter) => fir_filter.clone(),
        None => FirFilter::identity(),
    };
    let n_warm_up: usize = fir_filter.order();

    // All draws happen here, in row-major order, before any parallel work
    let mut rng: StdRng = match random_state {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let white: Array2<f64> = Array2::from_shape_simple_fn((channel_names.len(), n_warm_up + n_samples), || rng.sample(StandardNormal));

    let coloured: Array2<f64> = colouring.dot(&white);
    let filtered: Array2<f64> = fir_filter.apply(&coloured);
    let noise: Array2<f64> = filtered.slice(s![.., n_warm_up..]).to_owned();
    debug!(
        "generate_noise_evoked: {} channels x {} samples, fir order {} ({} warm-up samples dropped)",
        channel_names.len(),
        n_samples,
        fir_filter.order(),
        n_warm_up
    );

    let clean_timebase: &Timebase = evoked.timebase();
    let layout: SignalLayout = SignalLayout::new(evoked.layout().channels.clone(), Timebase::new(clean_timebase.tmin, clean_timebase.tstep, n_samples));

    return Ok(EvokedSignal::new(layout, noise)?.with_comment("noise"));
}

#[cfg(test)]
fn three_channel_evoked(n_samples: usize) -> EvokedSignal {
    use crate::channels::{Channel, ChannelKind};

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0113", ChannelKind::Magnetometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
    ];
    let layout: SignalLayout = SignalLayout::new(channels, Timebase::from_sfreq(-0.1, 1000.0, n_samples));
    return EvokedSignal::new(layout, Array2::zeros((3, n_samples))).expect("valid evoked");
}

#[cfg(test)]
fn three_channel_covariance() -> NoiseCovariance {
    // Stored in a different channel order from the evoked signal, with an extra channel
    let names: Vec<String> = vec!["EEG 001".to_string(), "MEG 2443".to_string(), "MEG 0111".to_string(), "MEG 0113".to_string()];
    let data: Array2<f64> = Array2::from_shape_vec(
        (4, 4),
        vec![
            1.0, 0.0, -0.6, 0.3, //
            0.0, 9.0, 0.0, 0.0, //
            -0.6, 0.0, 4.0, 1.2, //
            0.3, 0.0, 1.2, 2.0,
        ],
    )
    .expect("shape");
    return NoiseCovariance::new(names, data).expect("square covariance");
}

#[test]
fn test_generate_noise_evoked_covariance_converges() {
    use approx::assert_abs_diff_eq;

    let n_samples: usize = 50_000;
    let evoked: EvokedSignal = three_channel_evoked(600);
    let noise_cov: NoiseCovariance = three_channel_covariance();

    // Order 0: no temporal filtering
    let noise: EvokedSignal = generate_noise_evoked(&evoked, &noise_cov, n_samples, Some(&FirFilter::identity()), Some(42)).expect("valid noise");
    assert_eq!(noise.data().shape(), &[3, n_samples]);

    let empirical: Array2<f64> = noise.data().dot(&noise.data().t()) / n_samples as f64;
    let expected: Array2<f64> = noise_cov.pick_channels(&evoked.layout().channel_names()).expect("channels exist").data().to_owned();
    for (empirical_value, expected_value) in empirical.iter().zip(expected.iter()) {
        assert_abs_diff_eq!(*empirical_value, *expected_value, epsilon = 0.15);
    }
}

#[test]
fn test_generate_noise_evoked_layout_and_reproducibility() {
    use approx::assert_abs_diff_eq;

    let evoked: EvokedSignal = three_channel_evoked(600);
    let noise_cov: NoiseCovariance = three_channel_covariance();
    let fir_filter: FirFilter = FirFilter::new(ndarray::Array1::from_vec(vec![0.8, 0.6])).expect("finite coefficients");

    // Shorter than the evoked signal: timebase starts with the evoked signal
    let noise_a: EvokedSignal = generate_noise_evoked(&evoked, &noise_cov, 250, Some(&fir_filter), Some(1)).expect("valid noise");
    let noise_b: EvokedSignal = generate_noise_evoked(&evoked, &noise_cov, 250, Some(&fir_filter), Some(1)).expect("valid noise");
    let noise_c: EvokedSignal = generate_noise_evoked(&evoked, &noise_cov, 250, Some(&fir_filter), Some(2)).expect("valid noise");

    assert_eq!(noise_a, noise_b);
    assert_ne!(noise_a.data(), noise_c.data());
    assert_eq!(noise_a.timebase().n_samples, 250);
    assert_abs_diff_eq!(noise_a.timebase().tmin, -0.1, epsilon = 1e-12);
    assert_eq!(noise_a.layout().channel_names(), evoked.layout().channel_names());
}

#[test]
fn test_generate_noise_evoked_temporal_colouring() {
    use approx::assert_abs_diff_eq;
    use ndarray::Array1;

    let n_samples: usize = 50_000;
    let seed: u64 = 11;
    let evoked: EvokedSignal = three_channel_evoked(600);
    let names: Vec<String> = evoked.layout().channel_names();
    let noise_cov: NoiseCovariance = NoiseCovariance::from_diagonal(names.clone(), &Array1::ones(3)).expect("square covariance");
    let fir_filter: FirFilter = FirFilter::new(Array1::from_vec(vec![0.8, 0.6])).expect("finite coefficients");

    let noise: EvokedSignal = generate_noise_evoked(&evoked, &noise_cov, n_samples, Some(&fir_filter), Some(seed)).expect("valid noise");
    let data: &Array2<f64> = noise.data();

    // Lag-1 autocorrelation of filtered white noise: sum h[k] h[k + 1] / sum h[k]^2 = 0.48
    for i_channel in 0..3 {
        let row: Array1<f64> = data.row(i_channel).to_owned();
        let lag_zero: f64 = row.dot(&row);
        let lag_one: f64 = row.slice(s![..n_samples - 1]).dot(&row.slice(s![1..]));
        assert_abs_diff_eq!(lag_one / lag_zero, 0.48, epsilon = 0.03);
    }

    // With identity covariance the colouring is the identity, so the output is the filter
    // run over the same draws, and the first returned sample already has one sample of history
    let mut rng: StdRng = StdRng::seed_from_u64(seed);
    let white: Array2<f64> = Array2::from_shape_simple_fn((3, 1 + n_samples), || rng.sample(StandardNormal));
    for i_channel in 0..3 {
        for i_sample in 0..5 {
            let expected: f64 = 0.8 * white[[i_channel, i_sample + 1]] + 0.6 * white[[i_channel, i_sample]];
            assert_abs_diff_eq!(data[[i_channel, i_sample]], expected, epsilon = 1e-12);
        }
    }
}

#[test]
fn test_generate_noise_evoked_errors() {
    use crate::channels::{Channel, ChannelKind};

    let evoked: EvokedSignal = three_channel_evoked(10);

    // Channel missing from the covariance
    let noise_cov: NoiseCovariance = NoiseCovariance::from_diagonal(vec!["MEG 0111".to_string(), "MEG 0113".to_string()], &ndarray::Array1::ones(2)).expect("square covariance");
    let result: Result<EvokedSignal, Error> = generate_noise_evoked(&evoked, &noise_cov, 10, None, Some(0));
    assert!(matches!(result, Err(Error::ChannelMismatch { .. })));

    // Indefinite covariance
    let layout: SignalLayout = SignalLayout::new(
        vec![Channel::new("MEG 0111", ChannelKind::Gradiometer), Channel::new("MEG 0112", ChannelKind::Gradiometer)],
        Timebase::from_sfreq(0.0, 1000.0, 10),
    );
    let evoked: EvokedSignal = EvokedSignal::new(layout, Array2::zeros((2, 10))).expect("valid evoked");
    let indefinite: NoiseCovariance = NoiseCovariance::new(
        vec!["MEG 0111".to_string(), "MEG 0112".to_string()],
        Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 2.0, 1.0]).expect("shape"),
    )
    .expect("square covariance");
    let result: Result<EvokedSignal, Error> = generate_noise_evoked(&evoked, &indefinite, 10, None, Some(0));
    assert!(matches!(result, Err(Error::NonPositiveSemiDefinite { .. })));
}
