use crate::errors::Error;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelKind {
    Magnetometer,
    Gradiometer,
    Eeg,
    Eog,
    Stim,
    Misc,
}

impl ChannelKind {
    pub fn is_meg(&self) -> bool {
        return matches!(self, ChannelKind::Magnetometer | ChannelKind::Gradiometer);
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Channel {
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn new(name: &str, kind: ChannelKind) -> Self {
        Self { name: name.to_string(), kind }
    }
}

/// Indices of the MEG and/or EEG channels, skipping any channel named in `exclude`
///
/// # Arguments
/// * `channels` - channels to pick from
/// * `meg` - keep magnetometers and gradiometers
/// * `eeg` - keep EEG electrodes
/// * `exclude` - channel names to drop, typically the bad channels
///
/// # Returns
/// * `Vec<usize>` - indices into `channels`, in their original order
///
pub fn pick_types(channels: &[Channel], meg: bool, eeg: bool, exclude: &[String]) -> Vec<usize> {
    let mut picks: Vec<usize> = Vec::with_capacity(channels.len());
    for (i_channel, channel) in channels.iter().enumerate() {
        let wanted: bool = (meg && channel.kind.is_meg()) || (eeg && channel.kind == ChannelKind::Eeg);
        if wanted && !exclude.contains(&channel.name) {
            picks.push(i_channel);
        }
    }

    return picks;
}

/// Indices of `names` within `channels`, following the order of `names`
pub fn pick_channels(channels: &[Channel], names: &[String], context: &'static str) -> Result<Vec<usize>, Error> {
    return pick_names(&channel_names(channels), names, context);
}

/// Indices of `names` within `available`, following the order of `names`
///
/// # Errors
/// * `ChannelMismatch` - the first name in `names` missing from `available`
///
pub fn pick_names(available: &[String], names: &[String], context: &'static str) -> Result<Vec<usize>, Error> {
    let lookup: HashMap<&str, usize> = available
        .iter()
        .enumerate()
        .map(|(i_channel, name)| (name.as_str(), i_channel))
        .collect();

    let mut picks: Vec<usize> = Vec::with_capacity(names.len());
    for name in names {
        match lookup.get(name.as_str()) {
            Some(&i_channel) => picks.push(i_channel),
            None => {
                return Err(Error::ChannelMismatch {
                    channel_name: name.to_owned(),
                    context,
                });
            }
        }
    }

    return Ok(picks);
}

pub fn channel_names(channels: &[Channel]) -> Vec<String> {
    return channels.iter().map(|channel| channel.name.clone()).collect();
}

#[test]
fn test_pick_types_excludes_bads() {
    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0113", ChannelKind::Magnetometer),
        Channel::new("MEG 2443", ChannelKind::Gradiometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
        Channel::new("EEG 053", ChannelKind::Eeg),
        Channel::new("EOG 061", ChannelKind::Eog),
        Channel::new("STI 014", ChannelKind::Stim),
    ];
    let bads: Vec<String> = vec!["MEG 2443".to_string(), "EEG 053".to_string()];

    assert_eq!(pick_types(&channels, true, true, &bads), vec![0, 1, 3]);
    assert_eq!(pick_types(&channels, true, false, &bads), vec![0, 1]);
    assert_eq!(pick_types(&channels, false, true, &[]), vec![3, 4]);
}

#[test]
fn test_pick_channels_follows_requested_order() {
    let channels: Vec<Channel> = vec![
        Channel::new("MEG 0111", ChannelKind::Gradiometer),
        Channel::new("MEG 0113", ChannelKind::Magnetometer),
        Channel::new("EEG 001", ChannelKind::Eeg),
    ];

    let names: Vec<String> = vec!["EEG 001".to_string(), "MEG 0111".to_string()];
    let picks: Vec<usize> = pick_channels(&channels, &names, "test").expect("all channels exist");
    assert_eq!(picks, vec![2, 0]);

    let missing: Vec<String> = vec!["MEG 9999".to_string()];
    let result: Result<Vec<usize>, Error> = pick_channels(&channels, &missing, "test");
    assert!(matches!(result, Err(Error::ChannelMismatch { .. })));
}

#[test]
fn test_pick_names_reports_first_missing() {
    let available: Vec<String> = vec!["EEG 001".to_string(), "MEG 0111".to_string(), "MEG 0113".to_string()];

    let names: Vec<String> = vec!["MEG 0113".to_string(), "EEG 001".to_string(), "MEG 0113".to_string()];
    assert_eq!(pick_names(&available, &names, "test").expect("all names exist"), vec![2, 0, 2]);
    assert!(pick_names(&available, &[], "test").expect("nothing requested").is_empty());

    let missing: Vec<String> = vec!["MEG 0111".to_string(), "EOG 061".to_string(), "STI 014".to_string()];
    let result: Result<Vec<usize>, Error> = pick_names(&available, &missing, "noise covariance");
    assert!(matches!(
        result,
        Err(Error::ChannelMismatch { channel_name, context: "noise covariance" }) if channel_name == "EOG 061"
    ));
}
