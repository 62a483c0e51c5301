use crate::channels::{Channel, channel_names, pick_types};
use crate::timebase::Timebase;

/// Channel layout and timebase of a sensor-space signal, without any data
///
/// Used in place of a "template" evoked: projecting or synthesising into a layout
/// always allocates fresh data, nothing is shared with the signal the layout came from.
#[derive(Clone, Debug, PartialEq)]
pub struct SignalLayout {
    pub channels: Vec<Channel>,
    pub timebase: Timebase,
}

impl SignalLayout {
    pub fn new(channels: Vec<Channel>, timebase: Timebase) -> Self {
        Self { channels, timebase }
    }

    pub fn n_channels(&self) -> usize {
        return self.channels.len();
    }

    pub fn channel_names(&self) -> Vec<String> {
        return channel_names(&self.channels);
    }

    /// Same channels, different timebase
    pub fn with_timebase(&self, timebase: Timebase) -> Self {
        Self {
            channels: self.channels.clone(),
            timebase,
        }
    }

    /// Layout restricted to `picks`, in the order given
    pub fn select(&self, picks: &[usize]) -> Self {
        let channels: Vec<Channel> = picks.iter().map(|&i_channel| self.channels[i_channel].clone()).collect();
        Self {
            channels,
            timebase: self.timebase.clone(),
        }
    }

    pub fn pick_types(&self, meg: bool, eeg: bool, exclude: &[String]) -> Vec<usize> {
        return pick_types(&self.channels, meg, eeg, exclude);
    }
}
