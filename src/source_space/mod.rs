// Load modules
mod hemisphere;
mod label;
mod source_time_course;

// Expose to public
pub use hemisphere::{Hemisphere, SourceVertex};
pub use label::Label;
pub use source_time_course::SourceTimeCourse;
