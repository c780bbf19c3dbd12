//! Owning logger: target registry, error reporting and delivery settings

use super::{
    error::{LogrError, Result},
    filter::Filter,
    formatter::Formatter,
    hooks::{stderr_error_handler, DeliveryHooks, ErrorHandler, OverflowHandler, OverflowPolicy},
    level::Level,
    metrics::{Counter, MetricsCollector, DEFAULT_METRICS_UPDATE_FREQ_MILLIS},
    record::{FieldValue, LogRecord},
    target::{Target, TargetParams, DEFAULT_MAX_QUEUE_SIZE},
};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::backtrace::Backtrace;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metric key under which the logger's own counters are registered.
pub const LOGR_METRICS_NAME: &str = "_logr";

/// Delivery settings shared by every target of a [`Logr`].
///
/// # Example
///
/// ```
/// use rust_log_targets::core::LogrConfig;
///
/// let config = LogrConfig::from_json(r#"{"max_queue_size": 64, "overflow_policy": "Drop"}"#)
///     .unwrap();
/// assert_eq!(config.max_queue_size, 64);
/// assert_eq!(config.enqueue_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogrConfig {
    /// Queue capacity offered by [`Logr::default_max_queued`]
    pub max_queue_size: usize,
    /// Longest a caller blocks on a full queue before the record is discarded
    pub enqueue_timeout_ms: u64,
    pub flush_timeout_ms: u64,
    pub shutdown_timeout_ms: u64,
    /// Queue-depth sampling period; raised to 250ms when lower
    pub metrics_update_freq_ms: u64,
    pub overflow_policy: OverflowPolicy,
}

impl LogrConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LogrConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_queue_size == 0 {
            return Err(LogrError::config(
                "max_queue_size",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for LogrConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            enqueue_timeout_ms: 30_000,
            flush_timeout_ms: 30_000,
            shutdown_timeout_ms: 30_000,
            metrics_update_freq_ms: DEFAULT_METRICS_UPDATE_FREQ_MILLIS,
            overflow_policy: OverflowPolicy::default(),
        }
    }
}

/// Error sink shared by the logger and the hooks of its targets.
struct ErrorReporter {
    handler: ErrorHandler,
    counter: RwLock<Option<Arc<dyn Counter>>>,
}

impl ErrorReporter {
    fn report(&self, err: &LogrError) {
        if let Some(ref counter) = *self.counter.read() {
            counter.inc();
        }
        (self.handler)(err);
    }
}

struct LogrMetrics {
    collector: Arc<dyn MetricsCollector>,
    logged: Arc<dyn Counter>,
}

struct LogrInner {
    targets: RwLock<Vec<Arc<dyn Target>>>,
    errors: Arc<ErrorReporter>,
    overflow: Option<OverflowHandler>,
    config: LogrConfig,
    metrics: RwLock<Option<LogrMetrics>>,
    /// Serializes collector installation against target registration.
    registry: Mutex<()>,
    shut_down: AtomicBool,
}

impl LogrInner {
    fn shutdown_targets(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let targets = self.targets.read().clone();
        let mut first_err = None;
        for target in targets {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(err) = target.shutdown(remaining) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for LogrInner {
    fn drop(&mut self) {
        if !self.shut_down.swap(true, Ordering::AcqRel) {
            if let Err(e) = self.shutdown_targets(self.config.shutdown_timeout()) {
                eprintln!("[LOGR WARNING] Shutdown on drop incomplete: {}", e);
            }
        }
    }
}

/// Routes records to a set of asynchronous targets.
///
/// Cheap to clone; every clone drives the same targets. Targets shut down
/// on [`Logr::shutdown`] or when the last handle is dropped.
#[derive(Clone)]
pub struct Logr {
    inner: Arc<LogrInner>,
}

impl Logr {
    #[must_use]
    pub fn new() -> Self {
        LogrBuilder::new().build()
    }

    #[must_use]
    pub fn builder() -> LogrBuilder {
        LogrBuilder::new()
    }

    pub fn config(&self) -> &LogrConfig {
        &self.inner.config
    }

    /// Queue capacity to pass to [`Logr::add_target`] when the caller has
    /// no preference.
    pub fn default_max_queued(&self) -> usize {
        self.inner.config.max_queue_size
    }

    /// Enable metrics for every target added afterwards.
    ///
    /// Fails when targets already exist or when `collector` is `None`.
    pub fn set_metrics_collector(
        &self,
        collector: Option<Arc<dyn MetricsCollector>>,
    ) -> Result<()> {
        let _guard = self.inner.registry.lock();
        if self.has_targets() {
            return Err(LogrError::config(
                "set_metrics_collector",
                "must be called before any targets are added",
            ));
        }
        let collector = collector
            .ok_or_else(|| LogrError::config("set_metrics_collector", "collector cannot be nil"))?;

        *self.inner.errors.counter.write() = Some(collector.error_counter(LOGR_METRICS_NAME));
        *self.inner.metrics.write() = Some(LogrMetrics {
            logged: collector.logged_counter(LOGR_METRICS_NAME),
            collector,
        });
        Ok(())
    }

    pub fn has_targets(&self) -> bool {
        !self.inner.targets.read().is_empty()
    }

    pub fn target_names(&self) -> Vec<String> {
        self.inner.targets.read().iter().map(|t| t.name()).collect()
    }

    /// Name `target`, attach metrics when a collector is set, start it and
    /// register it. A `None` filter passes only the most severe level.
    pub fn add_target<T: Target + 'static>(
        &self,
        target: T,
        name: &str,
        filter: Option<Arc<dyn Filter>>,
        formatter: Option<Arc<dyn Formatter>>,
        max_queued: usize,
    ) -> Result<()> {
        self.add_shared_target(Arc::new(target), name, filter, formatter, max_queued)
    }

    /// Like [`Logr::add_target`] for a target the caller keeps a handle to.
    pub fn add_shared_target(
        &self,
        target: Arc<dyn Target>,
        name: &str,
        filter: Option<Arc<dyn Filter>>,
        formatter: Option<Arc<dyn Formatter>>,
        max_queued: usize,
    ) -> Result<()> {
        let _guard = self.inner.registry.lock();
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(LogrError::config(name, "cannot add targets after shutdown"));
        }

        let previous_name = target.name();
        target.set_name(name);
        if let Err(err) = self.start_target(target.as_ref(), filter, formatter, max_queued) {
            target.set_name(&previous_name);
            return Err(err);
        }

        self.inner.targets.write().push(target);
        Ok(())
    }

    fn start_target(
        &self,
        target: &dyn Target,
        filter: Option<Arc<dyn Filter>>,
        formatter: Option<Arc<dyn Formatter>>,
        max_queued: usize,
    ) -> Result<()> {
        if let Some(ref m) = *self.inner.metrics.read() {
            target.enable_metrics(
                m.collector.as_ref(),
                self.inner.config.metrics_update_freq_ms,
            )?;
        }

        let mut params = TargetParams::new(max_queued).with_hooks(self.delivery_hooks());
        params.filter = filter;
        params.formatter = formatter;
        target.start(params)
    }

    /// Shut down and unregister the first target named `name`. Returns
    /// `false` when there is none.
    pub fn remove_target(&self, name: &str, deadline: Duration) -> Result<bool> {
        let removed = {
            let mut targets = self.inner.targets.write();
            targets
                .iter()
                .position(|t| t.name() == name)
                .map(|idx| targets.remove(idx))
        };
        match removed {
            Some(target) => target.shutdown(deadline).map(|()| true),
            None => Ok(false),
        }
    }

    fn delivery_hooks(&self) -> DeliveryHooks {
        let errors = Arc::clone(&self.inner.errors);
        let hooks = DeliveryHooks::new(self.inner.config.enqueue_timeout())
            .with_error_handler(Arc::new(move |err| errors.report(err)));
        match self.inner.overflow {
            Some(ref handler) => hooks.with_overflow(Arc::clone(handler)),
            None => hooks,
        }
    }

    /// `(enabled, stacktrace required)` across all targets.
    pub fn is_level_enabled(&self, level: Level) -> (bool, bool) {
        let mut result = (false, false);
        for target in self.inner.targets.read().iter() {
            let (enabled, stacktrace) = target.is_level_enabled(level);
            if enabled {
                result.0 = true;
                result.1 |= stacktrace;
            }
        }
        result
    }

    /// Hand `record` to every target enabled for its level, capturing a
    /// stacktrace first when one of them wants it.
    pub fn log(&self, record: LogRecord) {
        let (enabled, stacktrace) = self.is_level_enabled(record.level);
        if !enabled {
            return;
        }

        let record = if stacktrace && record.stacktrace.is_none() {
            record.with_stacktrace(Backtrace::force_capture().to_string())
        } else {
            record
        };
        let record = Arc::new(record);

        let targets = self.inner.targets.read().clone();
        for target in targets.iter() {
            if target.is_level_enabled(record.level).0 {
                target.log(Arc::clone(&record));
            }
        }
        if self.inner.shut_down.load(Ordering::Acquire) {
            return;
        }
        if let Some(ref m) = *self.inner.metrics.read() {
            m.logged.inc();
        }
    }

    /// Send `err` to the configured error handler.
    pub fn report_error(&self, err: &LogrError) {
        self.inner.errors.report(err);
    }

    pub fn new_logger(&self) -> Logger {
        Logger {
            logr: self.clone(),
            name: None,
            fields: Vec::new(),
        }
    }

    /// Flush every target using the configured flush timeout.
    pub fn flush(&self) -> Result<()> {
        self.flush_with_timeout(self.inner.config.flush_timeout())
    }

    /// Wait until everything logged before this call has been written by
    /// every target. The timeout covers all targets together.
    pub fn flush_with_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let targets = self.inner.targets.read().clone();
        let mut first_err = None;
        for target in targets {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if let Err(err) = target.flush(remaining) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Shut down every target using the configured shutdown timeout.
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_with_timeout(self.inner.config.shutdown_timeout())
    }

    /// Stop every target, draining queued records until `timeout`.
    /// Records still queued at the deadline are abandoned.
    pub fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        self.inner.shut_down.store(true, Ordering::Release);
        self.inner.shutdown_targets(timeout)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shut_down.load(Ordering::Acquire)
    }
}

impl Default for Logr {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Logr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logr")
            .field("targets", &self.target_names())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Builder for [`Logr`].
///
/// # Example
/// ```
/// use rust_log_targets::prelude::*;
/// use rust_log_targets::core::hooks::drop_below;
/// use std::time::Duration;
///
/// let logr = Logr::builder()
///     .enqueue_timeout(Duration::from_millis(200))
///     .on_target_queue_full(drop_below(Level::WARN))
///     .on_error(std::sync::Arc::new(|err| eprintln!("log delivery failed: {}", err)))
///     .build();
/// assert!(!logr.has_targets());
/// ```
pub struct LogrBuilder {
    config: LogrConfig,
    overflow: Option<OverflowHandler>,
    on_error: Option<ErrorHandler>,
    collector: Option<Arc<dyn MetricsCollector>>,
}

impl LogrBuilder {
    pub fn new() -> Self {
        Self {
            config: LogrConfig::default(),
            overflow: None,
            on_error: None,
            collector: None,
        }
    }

    /// Replace all settings at once.
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LogrConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.config.max_queue_size = size;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn enqueue_timeout(mut self, timeout: Duration) -> Self {
        self.config.enqueue_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.config.flush_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn metrics_update_freq(mut self, millis: u64) -> Self {
        self.config.metrics_update_freq_ms = millis;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.config.overflow_policy = policy;
        self
    }

    /// Decide per record whether a full queue drops it (`true`) or blocks
    /// the caller (`false`). Takes precedence over the overflow policy.
    #[must_use = "builder methods return a new value"]
    pub fn on_target_queue_full(mut self, handler: OverflowHandler) -> Self {
        self.overflow = Some(handler);
        self
    }

    /// Receive delivery errors instead of having them printed to stderr.
    #[must_use = "builder methods return a new value"]
    pub fn on_error(mut self, handler: ErrorHandler) -> Self {
        self.on_error = Some(handler);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn metrics_collector(mut self, collector: Arc<dyn MetricsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn build(self) -> Logr {
        let overflow = self
            .overflow
            .or_else(|| self.config.overflow_policy.handler());
        let logr = Logr {
            inner: Arc::new(LogrInner {
                targets: RwLock::new(Vec::new()),
                errors: Arc::new(ErrorReporter {
                    handler: self.on_error.unwrap_or_else(stderr_error_handler),
                    counter: RwLock::new(None),
                }),
                overflow,
                config: self.config,
                metrics: RwLock::new(None),
                registry: Mutex::new(()),
                shut_down: AtomicBool::new(false),
            }),
        };
        if let Some(collector) = self.collector {
            // No targets exist yet, so this cannot fail.
            let _ = logr.set_metrics_collector(Some(collector));
        }
        logr
    }
}

impl Default for LogrBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Call-site handle carrying a logger name and fields added to every
/// record it emits.
#[derive(Clone)]
pub struct Logger {
    logr: Logr,
    name: Option<String>,
    fields: Vec<(String, FieldValue)>,
}

impl Logger {
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn logr(&self) -> &Logr {
        &self.logr
    }

    pub fn is_level_enabled(&self, level: Level) -> bool {
        self.logr.is_level_enabled(level).0
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.is_level_enabled(level) {
            return;
        }
        let mut record = LogRecord::new(level, message).with_fields(self.fields.iter().cloned());
        if let Some(ref name) = self.name {
            record = record.with_logger(name.clone());
        }
        self.logr.log(record);
    }

    #[inline]
    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::TRACE, message);
    }

    #[inline]
    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::DEBUG, message);
    }

    #[inline]
    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::INFO, message);
    }

    #[inline]
    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::WARN, message);
    }

    #[inline]
    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::ERROR, message);
    }

    #[inline]
    pub fn fatal(&self, message: impl Into<String>) {
        self.log(Level::FATAL, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish()
    }
}
