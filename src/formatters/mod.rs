//! Formatter implementations

pub mod json;
pub mod plain;

pub use json::JsonFormatter;
pub use plain::PlainFormatter;

// Re-export the trait for convenience
pub use crate::core::{DefaultFormatter, Formatter};
