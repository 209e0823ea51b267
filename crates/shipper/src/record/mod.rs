//! Typed log records and raw-field normalization.

pub mod model;
pub mod normalize;

pub use model::{AccessLogRecord, ErrorLogRecord};
pub use normalize::NormalizeError;
