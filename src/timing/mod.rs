pub mod clock;
pub mod estimator;
pub mod format;

pub use clock::SessionClock;
pub use estimator::{capture_point_sec, estimate_interval, ProcessingMode, VideoInterval};
pub use format::{format_interval, format_timestamp};
