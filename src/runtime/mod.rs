pub mod app;
pub mod topology;

pub use app::{run_watch, status_report};
pub use topology::RuntimeTopology;
