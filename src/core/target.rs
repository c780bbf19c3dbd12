//! Target and record writer contracts

use super::{
    error::Result, filter::Filter, formatter::Formatter, hooks::DeliveryHooks, level::Level,
    metrics::MetricsCollector, record::LogRecord,
};
use std::sync::Arc;
use std::time::Duration;

/// Default queue capacity of a target.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;

/// Destination-specific output for one record at a time.
///
/// Called only from the target's worker thread, in queue order. An error
/// is counted and reported; it never stops the target.
pub trait RecordWriter: Send {
    fn write(&mut self, record: &LogRecord) -> Result<()>;

    /// Push buffered output to the destination. Runs after a flush request
    /// has drained the queue.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Release the destination once the queue has been drained at shutdown.
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

/// Everything a target needs from its owner to start delivering.
#[derive(Clone)]
pub struct TargetParams {
    /// `None` falls back to a filter passing only the most severe level
    pub filter: Option<Arc<dyn Filter>>,
    /// `None` falls back to [`DefaultFormatter`](super::formatter::DefaultFormatter)
    pub formatter: Option<Arc<dyn Formatter>>,
    pub max_queued: usize,
    pub hooks: DeliveryHooks,
}

impl TargetParams {
    pub fn new(max_queued: usize) -> Self {
        Self {
            filter: None,
            formatter: None,
            max_queued,
            hooks: DeliveryHooks::default(),
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    #[must_use]
    pub fn with_hooks(mut self, hooks: DeliveryHooks) -> Self {
        self.hooks = hooks;
        self
    }
}

impl Default for TargetParams {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

/// A named log destination.
///
/// Concrete targets own a [`DeliveryEngine`](super::engine::DeliveryEngine)
/// and a [`RecordWriter`], and delegate these operations to the engine.
pub trait Target: Send + Sync {
    /// Replace the display name. The last call wins.
    fn set_name(&self, name: &str);

    /// The name set with `set_name`, or one derived from the target type.
    fn name(&self) -> String;

    /// `(enabled, stacktrace required)` for `level`.
    fn is_level_enabled(&self, level: Level) -> (bool, bool);

    fn formatter(&self) -> Arc<dyn Formatter>;

    /// Allocate the queue and spawn the worker.
    fn start(&self, params: TargetParams) -> Result<()>;

    /// Queue a record, applying backpressure when the queue is full.
    fn log(&self, record: Arc<LogRecord>);

    /// Wait until every record queued before this call has been written.
    fn flush(&self, timeout: Duration) -> Result<()>;

    /// Stop accepting records and wait up to `deadline` for the backlog.
    fn shutdown(&self, deadline: Duration) -> Result<()>;

    /// Attach metric handles. Must happen before `start`; targets without
    /// metrics support ignore it.
    fn enable_metrics(
        &self,
        _collector: &dyn MetricsCollector,
        _update_freq_millis: u64,
    ) -> Result<()> {
        Ok(())
    }
}
