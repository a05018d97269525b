pub mod export;
pub mod models;
pub mod store;

pub use export::render_export;
pub use models::{InferenceResult, MediaUnit, TimestampedResult};
pub use store::ResultLedger;
