//! Utils Module
pub mod telemetry;
pub mod truncate;

pub use telemetry::init_tracing;
pub use truncate::{log_preview, truncate_text, TruncationPolicy};
