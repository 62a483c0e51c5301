mod errors;
pub use errors::Error;
mod timebase;
pub use timebase::Timebase;
mod channels;
pub use channels::{Channel, ChannelKind, channel_names, pick_channels, pick_names, pick_types};
mod settings;
pub use settings::{SimulationSettings, SourceWaveformSettings};
mod evoked;
pub use evoked::{Baseline, EvokedSignal, SignalLayout};
mod source_space;
pub use source_space::{Hemisphere, Label, SourceTimeCourse, SourceVertex};
mod forward;
pub use forward::{ForwardOperator, apply_forward};
mod noise;
pub use noise::{NoiseCovariance, RawRecording};
pub mod linalg;
pub mod time_frequency;
mod simulation;
pub use simulation::{FirFilter, SimulationOutput, add_noise_evoked, fir_filter_raw, generate_noise_evoked, generate_stc, simulate_evoked, snr_db, source_waveforms, window_power};
mod data_source;
pub use data_source::DataSource;
mod synthetic;
pub use synthetic::SyntheticDataSource;
