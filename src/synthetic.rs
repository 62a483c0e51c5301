use crate::channels::{Channel, ChannelKind};
use crate::data_source::DataSource;
use crate::errors::Error;
use crate::evoked::{Baseline, EvokedSignal, SignalLayout};
use crate::forward::ForwardOperator;
use crate::noise::{NoiseCovariance, RawRecording};
use crate::source_space::{Hemisphere, Label, SourceVertex};
use crate::timebase::Timebase;
use log::debug;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

const SFREQ: f64 = 1000.0; // (hertz)
const N_VERTICES_PER_HEMISPHERE: usize = 60;
// Sensor positions, each holding two planar gradiometers and one magnetometer
const MEG_POSITIONS: [&str; 8] = ["011", "012", "013", "014", "022", "023", "024", "244"];
const EEG_NUMBERS: [usize; 10] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 53];
// Background AR(2) model of the raw recording
const RAW_AR_COEFFICIENTS: [f64; 2] = [1.2, -0.5];

/// In-memory `DataSource` with a small, deterministic MEG/EEG setup
///
/// 24 MEG channels (gradiometers and magnetometers), 10 EEG channels, one EOG and one
/// stimulus channel, "MEG 2443" and "EEG 053" included. The source space has 60 vertices
/// per hemisphere and two labels, "Aud-lh" and "Aud-rh". Everything is drawn from
/// generators seeded with `seed`, so repeated loads return identical values.
#[derive(Clone, Debug)]
pub struct SyntheticDataSource {
    channels: Vec<Channel>,
    source_vertices: Vec<SourceVertex>,
    labels: Vec<Label>,
    raw_duration: f64, // (second)
    seed: u64,
}

impl SyntheticDataSource {
    /// # Arguments
    /// * `raw_duration` - length of the background raw recording, (second)
    pub fn new(raw_duration: f64) -> Self {
        let mut channels: Vec<Channel> = Vec::new();
        for position in MEG_POSITIONS {
            channels.push(Channel::new(&format!("MEG {position}2"), ChannelKind::Gradiometer));
            channels.push(Channel::new(&format!("MEG {position}3"), ChannelKind::Gradiometer));
            channels.push(Channel::new(&format!("MEG {position}1"), ChannelKind::Magnetometer));
        }
        for number in EEG_NUMBERS {
            channels.push(Channel::new(&format!("EEG {number:03}"), ChannelKind::Eeg));
        }
        channels.push(Channel::new("EOG 061", ChannelKind::Eog));
        channels.push(Channel::new("STI 014", ChannelKind::Stim));

        let mut source_vertices: Vec<SourceVertex> = Vec::with_capacity(2 * N_VERTICES_PER_HEMISPHERE);
        for hemisphere in [Hemisphere::Left, Hemisphere::Right] {
            for i_vertex in 0..N_VERTICES_PER_HEMISPHERE {
                source_vertices.push(SourceVertex::new(hemisphere, 5 * i_vertex + 2));
            }
        }

        let labels: Vec<Label> = vec![
            Label::new("Aud-lh", Hemisphere::Left, (100..160).collect()),
            Label::new("Aud-rh", Hemisphere::Right, (40..90).collect()),
        ];

        Self {
            channels,
            source_vertices,
            labels,
            raw_duration,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn channels(&self) -> &[Channel] {
        return &self.channels;
    }

    /// MEG and EEG channels, the channels measured by the forward operator and the covariance
    fn data_channels(&self) -> Vec<Channel> {
        return self
            .channels
            .iter()
            .filter(|channel| channel.kind.is_meg() || channel.kind == ChannelKind::Eeg)
            .cloned()
            .collect();
    }
}

/// Typical gain magnitude, (unit / ampere metre)
fn gain_scale(kind: ChannelKind) -> f64 {
    match kind {
        ChannelKind::Gradiometer => 2e-5,
        ChannelKind::Magnetometer => 1e-6,
        ChannelKind::Eeg => 20.0,
        _ => 0.0,
    }
}

/// Typical background noise standard deviation, (unit)
fn noise_scale(kind: ChannelKind) -> f64 {
    match kind {
        ChannelKind::Gradiometer => 5e-12,
        ChannelKind::Magnetometer => 2e-13,
        ChannelKind::Eeg => 5e-6,
        ChannelKind::Eog => 5e-5,
        _ => 0.0,
    }
}

impl DataSource for SyntheticDataSource {
    fn load_forward_operator(&self) -> Result<ForwardOperator, Error> {
        let channels: Vec<Channel> = self.data_channels();
        let mut rng: StdRng = StdRng::seed_from_u64(self.seed);

        let n_sources: usize = self.source_vertices.len();
        let mut gain: Array2<f64> = Array2::zeros((channels.len(), n_sources));
        for (i_channel, channel) in channels.iter().enumerate() {
            let scale: f64 = gain_scale(channel.kind);
            for i_source in 0..n_sources {
                let draw: f64 = rng.sample(StandardNormal);
                gain[[i_channel, i_source]] = scale * draw;
            }
        }

        return ForwardOperator::new(channels, self.source_vertices.clone(), gain);
    }

    fn load_noise_covariance(&self) -> Result<NoiseCovariance, Error> {
        let channels: Vec<Channel> = self.data_channels();
        let n_channels: usize = channels.len();
        let mut rng: StdRng = StdRng::seed_from_u64(self.seed + 1);

        // Random correlation structure, well conditioned: A A^T / n + 0.5 I
        let mixing: Array2<f64> = Array2::from_shape_simple_fn((n_channels, n_channels), || rng.sample(StandardNormal));
        let structure: Array2<f64> = mixing.dot(&mixing.t()) / n_channels as f64 + Array2::<f64>::eye(n_channels) * 0.5;

        let scales: Array1<f64> = channels.iter().map(|channel| noise_scale(channel.kind)).collect();
        let data: Array2<f64> = Array2::from_shape_fn((n_channels, n_channels), |(i, j)| scales[i] * scales[j] * structure[[i, j]]);

        let channel_names: Vec<String> = channels.iter().map(|channel| channel.name.to_owned()).collect();
        return NoiseCovariance::new(channel_names, data);
    }

    fn load_label(&self, name: &str) -> Result<Label, Error> {
        return self.labels.iter().find(|label| label.name == name).cloned().ok_or(Error::MissingData {
            kind: "label",
            name: name.to_string(),
        });
    }

    fn load_evoked_template(&self, index: usize, baseline: Option<Baseline>) -> Result<EvokedSignal, Error> {
        if index != 0 {
            return Err(Error::MissingData {
                kind: "evoked",
                name: index.to_string(),
            });
        }

        // Averaged noise, 0.7 s at 1 kHz around the stimulus
        let timebase: Timebase = Timebase::from_sfreq(-0.2, SFREQ, 701);
        let mut rng: StdRng = StdRng::seed_from_u64(self.seed + 2);
        let mut data: Array2<f64> = Array2::zeros((self.channels.len(), timebase.n_samples));
        for (i_channel, channel) in self.channels.iter().enumerate() {
            let scale: f64 = 0.1 * noise_scale(channel.kind);
            data.row_mut(i_channel).mapv_inplace(|_| {
                let draw: f64 = rng.sample(StandardNormal);
                return scale * draw;
            });
        }

        let layout: SignalLayout = SignalLayout::new(self.channels.clone(), timebase);
        let mut evoked: EvokedSignal = EvokedSignal::new(layout, data)?.with_comment("Left Auditory");
        if let Some(baseline) = baseline {
            evoked.apply_baseline(baseline);
        }

        return Ok(evoked);
    }

    fn load_raw_recording(&self) -> Result<RawRecording, Error> {
        let n_samples: usize = (self.raw_duration * SFREQ).round().max(0.0) as usize;
        let timebase: Timebase = Timebase::from_sfreq(0.0, SFREQ, n_samples);
        let mut rng: StdRng = StdRng::seed_from_u64(self.seed + 3);

        let mut data: Array2<f64> = Array2::zeros((self.channels.len(), n_samples));
        for (i_channel, channel) in self.channels.iter().enumerate() {
            let scale: f64 = noise_scale(channel.kind);
            if scale == 0.0 {
                continue;
            }

            let mut history: [f64; 2] = [0.0, 0.0];
            for i_sample in 0..n_samples {
                let innovation: f64 = rng.sample(StandardNormal);
                let value: f64 = RAW_AR_COEFFICIENTS[0] * history[0] + RAW_AR_COEFFICIENTS[1] * history[1] + innovation;
                history = [value, history[0]];
                data[[i_channel, i_sample]] = scale * value;
            }
        }
        debug!("synthetic raw recording: {} channels x {} samples", self.channels.len(), n_samples);

        let mut raw: RawRecording = RawRecording::new(self.channels.clone(), data, timebase)?;
        raw.bads = vec!["MEG 2443".to_string(), "EEG 053".to_string()];
        return Ok(raw);
    }
}

#[test]
fn test_synthetic_data_source_is_consistent() {
    use crate::linalg::covariance_sqrt;

    let data_source: SyntheticDataSource = SyntheticDataSource::new(2.0);
    assert_eq!(data_source.channels().len(), 36);

    let forward: ForwardOperator = data_source.load_forward_operator().expect("valid forward");
    assert_eq!(forward.n_channels(), 34);
    assert_eq!(forward.n_sources(), 120);
    assert!(forward.channel_names().contains(&"MEG 2443".to_string()));

    // Repeated loads are identical
    let again: ForwardOperator = data_source.load_forward_operator().expect("valid forward");
    assert_eq!(forward.gain(), again.gain());

    let noise_cov: NoiseCovariance = data_source.load_noise_covariance().expect("valid covariance");
    assert_eq!(noise_cov.channel_names(), forward.channel_names().as_slice());
    covariance_sqrt(noise_cov.data()).expect("positive definite");

    let raw: RawRecording = data_source.load_raw_recording().expect("valid raw");
    assert_eq!(raw.timebase().n_samples, 2000);
    assert_eq!(raw.pick_types(true, false).len(), 23);

    let evoked: EvokedSignal = data_source
        .load_evoked_template(0, Some(Baseline { tmin: None, tmax: Some(0.0) }))
        .expect("valid template");
    assert_eq!(evoked.n_channels(), 36);
    assert_eq!(evoked.comment, "Left Auditory");
}

#[test]
fn test_synthetic_data_source_labels() {
    let data_source: SyntheticDataSource = SyntheticDataSource::new(1.0).with_seed(5);

    let label: Label = data_source.load_label("Aud-rh").expect("label exists");
    assert_eq!(label.hemisphere, Hemisphere::Right);

    assert!(matches!(data_source.load_label("Vis-lh"), Err(Error::MissingData { kind: "label", .. })));
    assert!(matches!(data_source.load_evoked_template(3, None), Err(Error::MissingData { kind: "evoked", .. })));
}
