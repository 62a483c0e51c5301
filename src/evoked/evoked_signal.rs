use crate::errors::Error;
use crate::evoked::SignalLayout;
use crate::timebase::Timebase;
use ndarray::{Array2, Axis, s};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Interval used for baseline correction, `None` means the start / end of the signal
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct Baseline {
    pub tmin: Option<f64>,
    pub tmax: Option<f64>,
}

/// Dense sensor-space signal, shape = [n_channels, n_samples]
#[derive(Clone, Debug, PartialEq)]
pub struct EvokedSignal {
    layout: SignalLayout,
    data: Array2<f64>,
    pub comment: String,
}

impl EvokedSignal {
    pub fn new(layout: SignalLayout, data: Array2<f64>) -> Result<Self, Error> {
        if data.nrows() != layout.n_channels() {
            return Err(Error::ShapeMismatch {
                context: "evoked channels",
                expected: layout.n_channels(),
                found: data.nrows(),
            });
        }
        if data.ncols() != layout.timebase.n_samples {
            return Err(Error::ShapeMismatch {
                context: "evoked samples",
                expected: layout.timebase.n_samples,
                found: data.ncols(),
            });
        }

        return Ok(Self {
            layout,
            data,
            comment: String::new(),
        });
    }

    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = comment.to_string();
        self
    }

    pub fn layout(&self) -> &SignalLayout {
        return &self.layout;
    }

    pub fn timebase(&self) -> &Timebase {
        return &self.layout.timebase;
    }

    pub fn data(&self) -> &Array2<f64> {
        return &self.data;
    }

    pub fn n_channels(&self) -> usize {
        return self.layout.n_channels();
    }

    /// Keep only MEG and/or EEG channels, dropping `exclude`
    pub fn pick_types(&self, meg: bool, eeg: bool, exclude: &[String]) -> Self {
        let picks: Vec<usize> = self.layout.pick_types(meg, eeg, exclude);
        Self {
            layout: self.layout.select(&picks),
            data: self.data.select(Axis(0), &picks),
            comment: self.comment.clone(),
        }
    }

    /// Subtract, per channel, the mean over the baseline interval
    ///
    /// An interval containing no samples leaves the data untouched.
    pub fn apply_baseline(&mut self, baseline: Baseline) {
        let timebase: &Timebase = &self.layout.timebase;
        let tmin: f64 = baseline.tmin.unwrap_or(timebase.tmin);
        let tmax: f64 = baseline.tmax.unwrap_or(timebase.tmax());
        let window: Range<usize> = timebase.window(tmin, tmax);
        if window.is_empty() {
            log::warn!("apply_baseline: interval [{tmin}, {tmax}] contains no samples, skipping");
            return;
        }

        let n_channels: usize = self.data.nrows();
        for i_channel in 0..n_channels {
            let mean: f64 = self.data.slice(s![i_channel, window.clone()]).sum() / window.len() as f64;
            self.data.row_mut(i_channel).mapv_inplace(|x: f64| x - mean);
        }
    }
}

/// Print a short summary
impl fmt::Display for EvokedSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timebase: &Timebase = &self.layout.timebase;
        let n_meg: usize = self.layout.channels.iter().filter(|channel| channel.kind.is_meg()).count();

        let mut string_output = String::from("╔═════════════════════════════════════════════════════════════════════════════╗\n");
        string_output += &format!("║ {:<75} ║\n", " <evoked_sim_rs.EvokedSignal>");
        if !self.comment.is_empty() {
            string_output += &format!("║ {:<75} ║\n", format!(" comment = {}", self.comment));
        }
        string_output += &format!("║ {:<75} ║\n", format!(" n_channels = {} (meg={})", self.n_channels(), n_meg));
        string_output += &format!("║ {:<75} ║\n", format!(" n_samples = {}", timebase.n_samples));
        string_output += &format!("║ {:<75} ║\n", format!(" tmin = {:.4} s;  tmax = {:.4} s;  sfreq = {:.1} Hz", timebase.tmin, timebase.tmax(), timebase.sfreq()));
        string_output.push_str("╚═════════════════════════════════════════════════════════════════════════════╝");

        return write!(f, "{string_output}");
    }
}

#[test]
fn test_evoked_baseline_and_pick_types() {
    use crate::channels::{Channel, ChannelKind};
    use approx::assert_abs_diff_eq;

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
        Channel::new("STI 014", ChannelKind::Stim),
    ];
    let timebase: Timebase = Timebase::from_sfreq(-0.2, 10.0, 5); // times = [-0.2, -0.1, 0.0, 0.1, 0.2]
    let data: Array2<f64> = Array2::from_shape_vec((3, 5), vec![1.0, 3.0, 5.0, 5.0, 5.0, 0.0, 0.0, 1.0, 2.0, 3.0, 0.0, 1.0, 0.0, 1.0, 0.0]).expect("shape");

    let mut evoked: EvokedSignal = EvokedSignal::new(SignalLayout::new(channels, timebase), data).expect("valid evoked");

    // Baseline on the pre-stimulus interval
    evoked.apply_baseline(Baseline { tmin: None, tmax: Some(-0.1) });
    assert_abs_diff_eq!(evoked.data()[[0, 0]], -1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(evoked.data()[[0, 4]], 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(evoked.data()[[1, 4]], 3.0, epsilon = 1e-12);

    // Stimulus channel is dropped
    let picked: EvokedSignal = evoked.pick_types(true, true, &[]);
    assert_eq!(picked.n_channels(), 2);
    assert_eq!(picked.data().shape(), &[2, 5]);
    assert_eq!(picked.layout().channel_names(), vec!["MEG 0111".to_string(), "EEG 001".to_string()]);

    // Data of the wrong shape is rejected
    let result: Result<EvokedSignal, Error> = EvokedSignal::new(picked.layout().clone(), Array2::zeros((2, 4)));
    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}
