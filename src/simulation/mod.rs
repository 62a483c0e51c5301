// Load modules
mod add_noise_evoked;
mod fir_filter_raw;
mod generate_noise_evoked;
mod generate_stc;
mod pipeline;

// Expose functions to public
pub use add_noise_evoked::{add_noise_evoked, snr_db, window_power};
pub use fir_filter_raw::{FirFilter, fir_filter_raw};
pub use generate_noise_evoked::generate_noise_evoked;
pub use generate_stc::generate_stc;
pub use pipeline::{SimulationOutput, simulate_evoked, source_waveforms};
