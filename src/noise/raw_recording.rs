use crate::channels::{Channel, pick_types};
use crate::errors::Error;
use crate::timebase::Timebase;
use ndarray::{Array2, Axis, s};

/// Continuous multichannel recording, shape = [n_channels, n_samples]
#[derive(Clone, Debug)]
pub struct RawRecording {
    channels: Vec<Channel>,
    data: Array2<f64>,
    timebase: Timebase,
    pub bads: Vec<String>,
}

impl RawRecording {
    pub fn new(channels: Vec<Channel>, data: Array2<f64>, timebase: Timebase) -> Result<Self, Error> {
        if data.nrows() != channels.len() {
            return Err(Error::ShapeMismatch {
                context: "raw recording channels",
                expected: channels.len(),
                found: data.nrows(),
            });
        }
        if data.ncols() != timebase.n_samples {
            return Err(Error::ShapeMismatch {
                context: "raw recording samples",
                expected: timebase.n_samples,
                found: data.ncols(),
            });
        }

        return Ok(Self {
            channels,
            data,
            timebase,
            bads: Vec::new(),
        });
    }

    pub fn channels(&self) -> &[Channel] {
        return &self.channels;
    }

    pub fn timebase(&self) -> &Timebase {
        return &self.timebase;
    }

    pub fn n_channels(&self) -> usize {
        return self.channels.len();
    }

    /// Sample index of `time`, clipped to the recording
    pub fn time_as_index(&self, time: f64) -> usize {
        let index: isize = self.timebase.time_as_index(time);
        return index.clamp(0, self.timebase.n_samples as isize) as usize;
    }

    /// MEG and/or EEG channels that are not marked bad
    pub fn pick_types(&self, meg: bool, eeg: bool) -> Vec<usize> {
        return pick_types(&self.channels, meg, eeg, &self.bads);
    }

    /// Copy of the samples `start..stop` of the picked channels
    pub fn segment(&self, picks: &[usize], start: usize, stop: usize) -> Result<Array2<f64>, Error> {
        let n_channels: usize = self.channels.len();
        for &i_channel in picks {
            if i_channel >= n_channels {
                return Err(Error::ShapeMismatch {
                    context: "raw recording channel pick",
                    expected: n_channels,
                    found: i_channel,
                });
            }
        }
        if start > self.timebase.n_samples || stop > self.timebase.n_samples {
            return Err(Error::ShapeMismatch {
                context: "raw recording segment bounds",
                expected: self.timebase.n_samples,
                found: start.max(stop),
            });
        }

        let stop: usize = stop.max(start);
        let segment: Array2<f64> = self.data.slice(s![.., start..stop]).select(Axis(0), picks);
        return Ok(segment);
    }
}

#[test]
fn test_raw_segment() {
    use crate::channels::ChannelKind;

    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 2443", ChannelKind::Gradiometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
    ];
    let data: Array2<f64> = Array2::from_shape_fn((3, 10), |(i, j)| (100 * i + j) as f64);
    let mut raw: RawRecording = RawRecording::new(channels, data, Timebase::from_sfreq(0.0, 10.0, 10)).expect("valid raw");
    raw.bads = vec!["MEG 2443".to_string()];

    let picks: Vec<usize> = raw.pick_types(true, false);
    assert_eq!(picks, vec![0]);

    assert_eq!(raw.time_as_index(0.3), 3);
    assert_eq!(raw.time_as_index(5.0), 10);

    let segment: Array2<f64> = raw.segment(&[2, 0], 3, 6).expect("valid segment");
    assert_eq!(segment, Array2::from_shape_vec((2, 3), vec![203.0, 204.0, 205.0, 3.0, 4.0, 5.0]).expect("shape"));

    assert!(matches!(raw.segment(&[0], 3, 11), Err(Error::ShapeMismatch { .. })));
    assert!(matches!(raw.segment(&[3], 0, 1), Err(Error::ShapeMismatch { .. })));
}
