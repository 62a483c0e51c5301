// Load modules
mod noise_covariance;
mod raw_recording;

// Expose to public
pub use noise_covariance::NoiseCovariance;
pub use raw_recording::RawRecording;
