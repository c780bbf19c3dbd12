//! # Rust Log Targets
//!
//! Asynchronous, per-target log delivery. Every target owns a bounded
//! queue drained by a supervised worker thread, so slow destinations never
//! stall each other and a panicking writer never takes the process down.
//!
//! ## Features
//!
//! - **Backpressure**: drop through an overflow handler, or block the caller
//!   for at most the enqueue timeout
//! - **Flush and shutdown**: wait for everything queued so far, with deadlines
//! - **Metrics**: per-target queue depth and logged/error/dropped/blocked
//!   counters through a pluggable collector
//!
//! ## Example
//!
//! ```
//! use rust_log_targets::prelude::*;
//! use rust_log_targets::targets::{Buffer, WriterTarget};
//! use std::sync::Arc;
//!
//! let logr = Logr::new();
//! let buf = Buffer::new();
//! logr.add_target(
//!     WriterTarget::new(buf.clone()),
//!     "memory",
//!     Some(Arc::new(StdFilter::new(Level::INFO, Level::ERROR))),
//!     Some(Arc::new(JsonFormatter::new())),
//!     logr.default_max_queued(),
//! )
//! .unwrap();
//!
//! logr.new_logger().with_field("port", 8080).info("listening");
//! logr.shutdown().unwrap();
//! assert!(buf.to_string().contains("listening"));
//! ```

pub mod core;
pub mod formatters;
pub mod macros;
pub mod targets;

pub mod prelude {
    pub use crate::core::{
        Counter, DeliveryEngine, FieldValue, Filter, Formatter, Gauge, Level, LogRecord, Logger,
        Logr, LogrBuilder, LogrConfig, LogrError, MemoryCollector, MetricsCollector,
        OverflowPolicy, RecordWriter, Result, StdFilter, Target, TargetParams, TimestampFormat,
    };
    pub use crate::formatters::{JsonFormatter, PlainFormatter};
    pub use crate::targets::{ConsoleTarget, FileTarget, WriterTarget};
}

pub use crate::core::{
    FieldValue, Filter, Formatter, Level, LogRecord, Logger, Logr, LogrBuilder, LogrConfig,
    LogrError, MetricsCollector, Result, StdFilter, Target,
};
pub use crate::targets::{ConsoleTarget, FileTarget, WriterTarget};
