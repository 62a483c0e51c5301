use crate::source_space::Hemisphere;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("label `{label_name}` has no vertex in the forward operator's source space")]
    EmptyIntersection { label_name: String },

    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch { context: &'static str, expected: usize, found: usize },

    #[error("channel `{channel_name}` is not available in {context}")]
    ChannelMismatch { channel_name: String, context: &'static str },

    #[error("window has {n_samples} samples, a filter of order {order} needs at least {n_required}")]
    InsufficientSamples { n_samples: usize, order: usize, n_required: usize },

    #[error("matrix is not positive semi-definite: {reason}")]
    NonPositiveSemiDefinite { reason: String },

    #[error("invalid filter: {reason}")]
    InvalidFilter { reason: String },

    #[error("degenerate window [{tmin}, {tmax}]: {reason}")]
    DegenerateWindow { tmin: f64, tmax: f64, reason: String },

    #[error("vertex {vertex} ({hemisphere}) is not in the forward operator's source space")]
    UnknownVertex { hemisphere: Hemisphere, vertex: usize },

    #[error("sample interval {found_tstep} does not match {expected_tstep}")]
    TimebaseMismatch { expected_tstep: f64, found_tstep: f64 },

    #[error("invalid source space: {reason}")]
    InvalidSourceSpace { reason: String },

    #[error("no {kind} named `{name}` in data source")]
    MissingData { kind: &'static str, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not parse settings: {0}")]
    SettingsParse(#[from] toml::de::Error),

    #[error("invalid setting `{field}`: {reason}")]
    InvalidSettings { field: &'static str, reason: String },
}
