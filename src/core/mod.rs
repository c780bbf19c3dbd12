//! Core delivery types and traits

pub mod engine;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod hooks;
pub mod level;
pub mod logr;
pub mod metrics;
pub mod record;
pub mod target;
pub mod timestamp;

pub use engine::{DeliveryEngine, EngineState};
pub use error::{LogrError, Result};
pub use filter::{CustomFilter, Filter, StdFilter};
pub use formatter::{DefaultFormatter, Formatter, RecordFormat};
pub use hooks::{DeliveryHooks, ErrorHandler, OverflowHandler, OverflowPolicy, DEFAULT_ENQUEUE_TIMEOUT};
pub use level::{Color, Level};
pub use logr::{Logger, Logr, LogrBuilder, LogrConfig, LOGR_METRICS_NAME};
pub use metrics::{
    Counter, Gauge, MemoryCollector, MetricsCollector, MetricsSnapshot, TargetMetrics,
    DEFAULT_METRICS_UPDATE_FREQ_MILLIS, MIN_METRICS_UPDATE_FREQ_MILLIS,
};
pub use record::{FieldValue, LogRecord, QueueItem};
pub use target::{RecordWriter, Target, TargetParams, DEFAULT_MAX_QUEUE_SIZE};
pub use timestamp::TimestampFormat;
