use crate::errors::Error;
use crate::evoked::EvokedSignal;
use crate::timebase::Timebase;
use log::{debug, warn};
use ndarray::{Array2, ArrayView2, s};
use std::ops::Range;

/// Add noise to a clean signal so that the power ratio over a window is `snr_db`
///
/// # Arguments
/// * `evoked` - clean signal
/// * `noise` - noise with the same channels, sample interval and sample count as `evoked`
/// * `snr_db` - target signal-to-noise ratio, (decibel)
/// * `tmin`, `tmax` - window over which the ratio is measured, both ends inclusive, (second)
///
/// # Returns
/// * `EvokedSignal` - `evoked + k * noise` over the full timebase, with
///   `k = sqrt(P_signal / (P_noise * 10^(snr_db / 10)))` and `P` the mean square in the window
///
/// # Errors
/// * `ChannelMismatch` / `ShapeMismatch` / `TimebaseMismatch` - the two signals are not aligned
/// * `DegenerateWindow` - no sample or no channel in the window, or the noise power is
///   zero or not finite
///
pub fn add_noise_evoked(evoked: &EvokedSignal, noise: &EvokedSignal, snr_db: f64, tmin: f64, tmax: f64) -> Result<EvokedSignal, Error> {
    check_aligned(evoked, noise)?;

    let signal_power: f64 = window_power(evoked, tmin, tmax)?;
    let noise_power: f64 = window_power(noise, tmin, tmax)?;
    if !(noise_power > 0.0) || !noise_power.is_finite() {
        return Err(Error::DegenerateWindow {
            tmin,
            tmax,
            reason: format!("noise power is {noise_power:e}"),
        });
    }

    let scale: f64 = (signal_power / (noise_power * 10.0_f64.powf(snr_db / 10.0))).sqrt();
    debug!("add_noise_evoked: signal power {signal_power:e}, noise power {noise_power:e}, noise scale {scale:e}");

    let data: Array2<f64> = evoked.data() + &(noise.data() * scale);
    let comment: String = if evoked.comment.is_empty() {
        format!("noisy (snr = {snr_db} dB)")
    } else {
        format!("{} + noise (snr = {snr_db} dB)", evoked.comment)
    };

    return Ok(EvokedSignal::new(evoked.layout().clone(), data)?.with_comment(&comment));
}

/// Mean squared amplitude over all channels and the samples in `[tmin, tmax]`
///
/// # Errors
/// * `DegenerateWindow` - the signal has no channel, or no sample lies in the window
///
pub fn window_power(evoked: &EvokedSignal, tmin: f64, tmax: f64) -> Result<f64, Error> {
    let window: Range<usize> = evoked.timebase().window(tmin, tmax);
    if window.is_empty() {
        return Err(Error::DegenerateWindow {
            tmin,
            tmax,
            reason: "window contains no sample".to_string(),
        });
    }
    if evoked.n_channels() == 0 {
        return Err(Error::DegenerateWindow {
            tmin,
            tmax,
            reason: "signal has no channel".to_string(),
        });
    }

    let in_window: ArrayView2<f64> = evoked.data().slice(s![.., window]);
    let power: f64 = in_window.mapv(|x: f64| x.powi(2)).mean().unwrap_or(f64::NAN);

    return Ok(power);
}

/// Measured signal-to-noise ratio, `10 log10(P_signal / P_noise)` over `[tmin, tmax]`, (decibel)
///
/// # Errors
/// * `DegenerateWindow` - as `window_power`, or zero noise power
///
pub fn snr_db(evoked: &EvokedSignal, noise: &EvokedSignal, tmin: f64, tmax: f64) -> Result<f64, Error> {
    check_aligned(evoked, noise)?;

    let signal_power: f64 = window_power(evoked, tmin, tmax)?;
    let noise_power: f64 = window_power(noise, tmin, tmax)?;
    if !(noise_power > 0.0) {
        return Err(Error::DegenerateWindow {
            tmin,
            tmax,
            reason: "noise power is zero".to_string(),
        });
    }

    return Ok(10.0 * (signal_power / noise_power).log10());
}

fn check_aligned(evoked: &EvokedSignal, noise: &EvokedSignal) -> Result<(), Error> {
    if noise.n_channels() != evoked.n_channels() {
        return Err(Error::ShapeMismatch {
            context: "noise channels",
            expected: evoked.n_channels(),
            found: noise.n_channels(),
        });
    }
    for (evoked_channel, noise_channel) in evoked.layout().channels.iter().zip(noise.layout().channels.iter()) {
        if evoked_channel.name != noise_channel.name {
            return Err(Error::ChannelMismatch {
                channel_name: noise_channel.name.to_owned(),
                context: "clean signal (same position)",
            });
        }
    }

    let evoked_timebase: &Timebase = evoked.timebase();
    let noise_timebase: &Timebase = noise.timebase();
    if noise_timebase.n_samples != evoked_timebase.n_samples {
        return Err(Error::ShapeMismatch {
            context: "noise samples",
            expected: evoked_timebase.n_samples,
            found: noise_timebase.n_samples,
        });
    }
    if !evoked_timebase.same_tstep(noise_timebase) {
        return Err(Error::TimebaseMismatch {
            expected_tstep: evoked_timebase.tstep,
            found_tstep: noise_timebase.tstep,
        });
    }
    if (noise_timebase.tmin - evoked_timebase.tmin).abs() > 0.5 * evoked_timebase.tstep {
        warn!(
            "noise starts at {} s, clean signal at {} s; combining sample by sample",
            noise_timebase.tmin, evoked_timebase.tmin
        );
    }

    return Ok(());
}

#[cfg(test)]
fn signal_and_noise() -> (EvokedSignal, EvokedSignal) {
    use crate::channels::{Channel, ChannelKind};
    use crate::evoked::SignalLayout;

    let channels: Vec<Channel> = vec![Channel::new("MEG 0111", ChannelKind::Gradiometer), Channel::new("EEG 001", ChannelKind::Eeg)];
    let layout: SignalLayout = SignalLayout::new(channels, Timebase::from_sfreq(-0.1, 1000.0, 600));

    let clean: Array2<f64> = Array2::from_shape_fn((2, 600), |(i_channel, i_sample)| {
        let t: f64 = -0.1 + i_sample as f64 * 1e-3;
        return (1.0 + i_channel as f64) * 1e-12 * (2.0 * std::f64::consts::PI * 10.0 * t).sin();
    });
    let noise: Array2<f64> = Array2::from_shape_fn((2, 600), |(i_channel, i_sample)| ((i_sample * 7 + i_channel * 3) % 13) as f64 - 6.0);

    return (
        EvokedSignal::new(layout.clone(), clean).expect("valid evoked"),
        EvokedSignal::new(layout, noise).expect("valid evoked").with_comment("noise"),
    );
}

#[test]
fn test_add_noise_evoked_reaches_requested_snr() {
    use approx::assert_abs_diff_eq;

    let (evoked, noise) = signal_and_noise();
    for requested_snr in [-20.0, -3.0, 0.0, 6.0, 40.0] {
        let noisy: EvokedSignal = add_noise_evoked(&evoked, &noise, requested_snr, 0.0, 0.2).expect("valid window");
        assert_eq!(noisy.data().shape(), &[2, 600]);
        assert_eq!(noisy.timebase(), evoked.timebase());

        // Recover the added noise and measure the ratio again
        let added: EvokedSignal = EvokedSignal::new(evoked.layout().clone(), noisy.data() - evoked.data()).expect("valid evoked");
        let measured: f64 = snr_db(&evoked, &added, 0.0, 0.2).expect("valid window");
        assert_abs_diff_eq!(measured, requested_snr, epsilon = 1e-6);
    }
}

#[test]
fn test_add_noise_evoked_degenerate_windows() {
    use crate::channels::{Channel, ChannelKind};
    use crate::evoked::SignalLayout;

    let (evoked, noise) = signal_and_noise();

    // Noise forced to zero
    let silent: EvokedSignal = EvokedSignal::new(noise.layout().clone(), Array2::zeros((2, 600))).expect("valid evoked");
    let result: Result<EvokedSignal, Error> = add_noise_evoked(&evoked, &silent, 6.0, 0.0, 0.2);
    assert!(matches!(result, Err(Error::DegenerateWindow { .. })));

    // Window outside the signal, or between two samples
    assert!(matches!(add_noise_evoked(&evoked, &noise, 6.0, 1.0, 2.0), Err(Error::DegenerateWindow { .. })));
    assert!(matches!(add_noise_evoked(&evoked, &noise, 6.0, 0.0101, 0.0109), Err(Error::DegenerateWindow { .. })));

    // Noise outside the window does not count
    let mut late_noise_data: Array2<f64> = Array2::zeros((2, 600));
    late_noise_data.slice_mut(s![.., 301..]).fill(1.0);
    let late_noise: EvokedSignal = EvokedSignal::new(noise.layout().clone(), late_noise_data).expect("valid evoked");
    assert!(matches!(add_noise_evoked(&evoked, &late_noise, 6.0, 0.0, 0.2), Err(Error::DegenerateWindow { .. })));

    // Misaligned noise
    let other_layout: SignalLayout = SignalLayout::new(
        vec![Channel::new("EEG 001", ChannelKind::Eeg), Channel::new("MEG 0111", ChannelKind::Gradiometer)],
        evoked.timebase().clone(),
    );
    let swapped: EvokedSignal = EvokedSignal::new(other_layout, noise.data().to_owned()).expect("valid evoked");
    assert!(matches!(add_noise_evoked(&evoked, &swapped, 6.0, 0.0, 0.2), Err(Error::ChannelMismatch { .. })));

    let short: EvokedSignal = EvokedSignal::new(noise.layout().with_timebase(Timebase::from_sfreq(-0.1, 1000.0, 500)), Array2::ones((2, 500))).expect("valid evoked");
    assert!(matches!(add_noise_evoked(&evoked, &short, 6.0, 0.0, 0.2), Err(Error::ShapeMismatch { .. })));
}
