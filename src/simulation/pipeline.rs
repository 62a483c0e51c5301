use crate::data_source::DataSource;
use crate::errors::Error;
use crate::evoked::{EvokedSignal, SignalLayout};
use crate::forward::{ForwardOperator, apply_forward};
use crate::noise::{NoiseCovariance, RawRecording};
use crate::settings::SimulationSettings;
use crate::simulation::{FirFilter, add_noise_evoked, fir_filter_raw, generate_noise_evoked, generate_stc};
use crate::source_space::{Label, SourceTimeCourse};
use crate::time_frequency::morlet;
use crate::timebase::Timebase;
use log::info;
use ndarray::{Array1, Array2};
use num::complex::Complex64;
use std::fmt;
use std::time::{Duration, Instant};

/// Everything produced by one simulation run
#[derive(Clone, Debug)]
pub struct SimulationOutput {
    pub stc: SourceTimeCourse,
    pub fir_filter: FirFilter,
    pub evoked_clean: EvokedSignal,
    pub noise: EvokedSignal,
    pub evoked_noisy: EvokedSignal,
}

/// Source time courses, one row per configured source
///
/// # Returns
/// * `Array2<f64>` - shape = [n_sources, n_samples]
///
/// # Algorithm
/// Row `i` holds the real part of a Morlet wavelet starting at the first sample (truncated
/// when longer than the signal, zero after it when shorter), circularly shifted by
/// `shift_samples` and scaled by `amplitude`.
///
/// # Errors
/// * `InvalidSettings` - `settings` fail `SimulationSettings::validate`, e.g. `n_samples = 0`
///
pub fn source_waveforms(settings: &SimulationSettings) -> Result<Array2<f64>, Error> {
    settings.validate()?;
    let n_samples: usize = settings.n_samples;
    let mut stc_data: Array2<f64> = Array2::zeros((settings.sources.len(), n_samples));

    for (i_source, source) in settings.sources.iter().enumerate() {
        let wavelets: Vec<Array1<Complex64>> = morlet(settings.sfreq, &[source.frequency], &[source.n_cycles], None, false)?;
        let wavelet: &Array1<Complex64> = &wavelets[0];

        let mut waveform: Array1<f64> = Array1::zeros(n_samples);
        let n_copy: usize = wavelet.len().min(n_samples);
        for i_sample in 0..n_copy {
            waveform[i_sample] = wavelet[i_sample].re;
        }

        // Circular shift: sample i moves to (i + shift) mod n
        let shift: usize = source.shift_samples.rem_euclid(n_samples as i64) as usize;
        for i_sample in 0..n_samples {
            stc_data[[i_source, (i_sample + shift) % n_samples]] = settings.amplitude * waveform[i_sample];
        }
    }

    return Ok(stc_data);
}

/// Simulate a noisy evoked response
///
/// # Arguments
/// * `data_source` - provides the forward operator, noise covariance, labels, the evoked
///   template and the background raw recording
/// * `settings` - simulation parameters
///
/// # Returns
/// * `SimulationOutput` - source activity, estimated filter, clean and noisy sensor signals
///
/// # Algorithm
/// 1. Restrict the forward operator and the template to MEG and EEG channels, without bads.
/// 2. One Morlet waveform per label, one random vertex per label (`random_state`).
/// 3. Project through the forward operator onto the template's channels, with the source timing.
/// 4. Estimate the FIR filter on MEG channels of the raw recording, `[fir_tmin, fir_tmax]`.
/// 5. Synthesise coloured noise (`noise_random_state`) and add it at `snr_db` over
///    `[snr_tmin, snr_tmax]`.
///
pub fn simulate_evoked<D: DataSource + ?Sized>(data_source: &D, settings: &SimulationSettings) -> Result<SimulationOutput, Error> {
    settings.validate()?;
    let timing_start: Instant = Instant::now();

    // Load and pick channels
    let forward: ForwardOperator = data_source.load_forward_operator()?.pick_types(true, true, &settings.bads);
    let noise_cov: NoiseCovariance = data_source.load_noise_covariance()?;
    let evoked_template: EvokedSignal = data_source
        .load_evoked_template(settings.evoked_index, settings.baseline)?
        .pick_types(true, true, &settings.bads);
    let mut labels: Vec<Label> = Vec::with_capacity(settings.sources.len());
    for label_name in settings.label_names() {
        labels.push(data_source.load_label(&label_name)?);
    }
    let mut raw: RawRecording = data_source.load_raw_recording()?;
    for bad in &settings.bads {
        if !raw.bads.contains(bad) {
            raw.bads.push(bad.to_owned());
        }
    }
    info!("simulate_evoked: loaded data in {:?}", timing_start.elapsed());

    // Source activity and clean sensor signal
    let timing_start: Instant = Instant::now();
    let timebase: Timebase = Timebase::from_sfreq(settings.tmin, settings.sfreq, settings.n_samples);
    let stc_data: Array2<f64> = source_waveforms(settings)?;
    let stc: SourceTimeCourse = generate_stc(&forward, &labels, &stc_data, &timebase, Some(settings.random_state))?;
    let layout: SignalLayout = evoked_template.layout().with_timebase(stc.timebase().clone());
    let evoked_clean: EvokedSignal = apply_forward(&forward, &stc, Some(&layout))?.with_comment("simulated");
    info!("simulate_evoked: projected {} sources onto {} channels in {:?}", stc.vertices().len(), evoked_clean.n_channels(), timing_start.elapsed());

    // Noise
    let timing_start: Instant = Instant::now();
    let picks: Vec<usize> = raw.pick_types(true, false);
    let start: usize = raw.time_as_index(settings.fir_tmin);
    let stop: usize = raw.time_as_index(settings.fir_tmax);
    let fir_filter: FirFilter = fir_filter_raw(&raw, settings.fir_order, &picks, start, stop)?;
    let noise: EvokedSignal = generate_noise_evoked(&evoked_clean, &noise_cov, settings.n_samples, Some(&fir_filter), settings.noise_random_state)?;
    let evoked_noisy: EvokedSignal = add_noise_evoked(&evoked_clean, &noise, settings.snr_db, settings.snr_tmin, settings.snr_tmax)?;
    let duration: Duration = timing_start.elapsed();
    info!("simulate_evoked: noise synthesised in {duration:?}");

    return Ok(SimulationOutput {
        stc,
        fir_filter,
        evoked_clean,
        noise,
        evoked_noisy,
    });
}

/// Print a short summary
impl fmt::Display for SimulationOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stc)?;
        writeln!(f, "{}", self.fir_filter)?;
        write!(f, "{}", self.evoked_noisy)
    }
}

#[test]
fn test_source_waveforms_follow_settings() {
    use crate::settings::SourceWaveformSettings;
    use approx::assert_abs_diff_eq;

    let settings: SimulationSettings = SimulationSettings::default();
    let stc_data: Array2<f64> = source_waveforms(&settings).expect("valid settings");
    assert_eq!(stc_data.shape(), &[2, 600]);

    // The 3 Hz wavelet (531 samples) peaks at its centre; the 10 Hz one (239 samples) is delayed by 80
    let centre_lh: usize = (2 * 266 - 1) / 2;
    let centre_rh: usize = (2 * 120 - 1) / 2 + 80;
    let peak_lh: f64 = stc_data.row(0).iter().fold(f64::NEG_INFINITY, |a: f64, &b: &f64| a.max(b));
    let peak_rh: f64 = stc_data.row(1).iter().fold(f64::NEG_INFINITY, |a: f64, &b: &f64| a.max(b));
    assert_abs_diff_eq!(stc_data[[0, centre_lh]], peak_lh, epsilon = 1e-20);
    assert_abs_diff_eq!(stc_data[[1, centre_rh]], peak_rh, epsilon = 1e-20);
    assert!(peak_lh < 1e-6);

    // Nothing before the delayed wavelet, nothing after the short one
    assert_eq!(stc_data[[1, 79]], 0.0);
    assert_eq!(stc_data[[1, 80 + 239]], 0.0);

    // Negative shifts wrap around to the end
    let mut shifted: SimulationSettings = settings.clone();
    shifted.sources = vec![SourceWaveformSettings {
        label: "Aud-lh".to_string(),
        frequency: 10.0,
        n_cycles: 1.5,
        shift_samples: -10,
    }];
    let stc_shifted: Array2<f64> = source_waveforms(&shifted).expect("valid settings");
    assert_abs_diff_eq!(stc_shifted[[0, 590]], stc_data[[1, 80]], epsilon = 1e-20);
    assert_abs_diff_eq!(stc_shifted[[0, 0]], stc_data[[1, 90]], epsilon = 1e-20);
}

#[test]
fn test_source_waveforms_rejects_empty_signal() {
    let mut settings: SimulationSettings = SimulationSettings::default();
    settings.n_samples = 0;

    let result: Result<Array2<f64>, Error> = source_waveforms(&settings);
    assert!(matches!(result, Err(Error::InvalidSettings { field: "n_samples", .. })));
}

#[test]
fn test_simulate_evoked_end_to_end() {
    use crate::simulation::snr_db;
    use crate::synthetic::SyntheticDataSource;
    use approx::assert_abs_diff_eq;

    let mut settings: SimulationSettings = SimulationSettings::default();
    settings.fir_tmin = 2.0;
    settings.fir_tmax = 18.0;
    settings.noise_random_state = Some(0);
    let data_source: SyntheticDataSource = SyntheticDataSource::new(20.0);

    let output: SimulationOutput = simulate_evoked(&data_source, &settings).expect("simulation runs");

    // 600 samples from -0.1 s, on every good MEG and EEG channel
    let timebase: &Timebase = output.evoked_noisy.timebase();
    assert_eq!(timebase.n_samples, 600);
    assert_abs_diff_eq!(timebase.tmin, -0.1, epsilon = 1e-12);
    assert_eq!(output.evoked_noisy.data().ncols(), 600);
    let names: Vec<String> = output.evoked_noisy.layout().channel_names();
    assert!(!names.contains(&"MEG 2443".to_string()));
    assert!(!names.contains(&"EEG 053".to_string()));
    assert_eq!(output.noise.layout(), output.evoked_clean.layout());

    // One vertex per label, filter of order 5
    assert_eq!(output.stc.vertices().len(), 2);
    assert_eq!(output.fir_filter.order(), 5);

    // Requested SNR over [0, 0.2] s
    let added: EvokedSignal = EvokedSignal::new(output.evoked_clean.layout().clone(), output.evoked_noisy.data() - output.evoked_clean.data()).expect("valid evoked");
    let measured: f64 = snr_db(&output.evoked_clean, &added, 0.0, 0.2).expect("valid window");
    assert_abs_diff_eq!(measured, 6.0, epsilon = 1e-6);

    // Fixed seeds give identical runs
    let again: SimulationOutput = simulate_evoked(&data_source, &settings).expect("simulation runs");
    assert_eq!(again.evoked_noisy, output.evoked_noisy);
}

#[test]
fn test_simulate_evoked_reports_missing_label() {
    use crate::synthetic::SyntheticDataSource;

    let mut settings: SimulationSettings = SimulationSettings::default();
    settings.fir_tmin = 2.0;
    settings.fir_tmax = 18.0;
    settings.sources[1].label = "Vis-rh".to_string();

    let result: Result<SimulationOutput, Error> = simulate_evoked(&SyntheticDataSource::new(20.0), &settings);
    assert!(matches!(result, Err(Error::MissingData { kind: "label", .. })));
}
