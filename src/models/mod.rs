pub mod course;
pub mod duration;

pub use course::{CourseRecord, ProgressStats};
pub use duration::TimeSpan;
