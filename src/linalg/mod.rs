// Load modules
mod covariance_sqrt;
mod levinson_durbin;
mod symmetric_eigen;

// Expose functions to public
pub use covariance_sqrt::covariance_sqrt;
pub use levinson_durbin::{AutoregressiveModel, levinson_durbin};
pub use symmetric_eigen::{SymmetricEigen, symmetric_eigen};
