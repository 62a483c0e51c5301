// Load modules
mod evoked_signal;
mod signal_layout;

// Expose to public
pub use evoked_signal::{Baseline, EvokedSignal};
pub use signal_layout::SignalLayout;
