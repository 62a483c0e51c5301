// Load modules
mod morlet;

// Expose functions to public
pub use morlet::morlet;
