use crate::errors::Error;
use crate::evoked::{Baseline, EvokedSignal};
use crate::forward::ForwardOperator;
use crate::noise::{NoiseCovariance, RawRecording};
use crate::source_space::Label;

/// Read-only access to the recordings and models a simulation consumes
///
/// Each implementation decides where the data lives (files, a database, memory);
/// the simulation only sees the loaded values.
pub trait DataSource {
    /// Fixed-orientation forward operator, all channels
    fn load_forward_operator(&self) -> Result<ForwardOperator, Error>;

    fn load_noise_covariance(&self) -> Result<NoiseCovariance, Error>;

    /// # Errors
    /// * `MissingData` - no label called `name`
    fn load_label(&self, name: &str) -> Result<Label, Error>;

    /// Averaged recording number `index`, baseline corrected when `baseline` is given
    ///
    /// # Errors
    /// * `MissingData` - no evoked recording at `index`
    fn load_evoked_template(&self, index: usize, baseline: Option<Baseline>) -> Result<EvokedSignal, Error>;

    /// Continuous background recording used for the temporal filter
    fn load_raw_recording(&self) -> Result<RawRecording, Error>;
}
