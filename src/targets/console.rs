//! Console target implementation

use crate::core::{
    DeliveryEngine, Formatter, Level, LogRecord, MetricsCollector, RecordFormat, RecordWriter,
    Result, Target, TargetParams,
};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

/// Writes records at `stderr_level` or more severe to stderr, the rest to
/// stdout.
pub struct ConsoleTarget {
    engine: DeliveryEngine,
    stderr_level: Option<Level>,
}

impl ConsoleTarget {
    pub fn new() -> Self {
        Self {
            engine: DeliveryEngine::for_target::<Self>(),
            stderr_level: Some(Level::ERROR),
        }
    }

    /// Route everything to stdout.
    #[must_use]
    pub fn stdout_only(mut self) -> Self {
        self.stderr_level = None;
        self
    }

    #[must_use]
    pub fn with_stderr_level(mut self, level: Level) -> Self {
        self.stderr_level = Some(level);
        self
    }

    pub fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }
}

impl Default for ConsoleTarget {
    fn default() -> Self {
        Self::new()
    }
}

struct ConsoleWriter {
    format: RecordFormat,
    stderr_level: Option<Level>,
    buf: Vec<u8>,
}

impl RecordWriter for ConsoleWriter {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        self.buf.clear();
        self.format.render(record, &mut self.buf)?;
        if self.stderr_level.is_some_and(|level| record.level.is_at_least(level)) {
            io::stderr().lock().write_all(&self.buf)?;
        } else {
            io::stdout().lock().write_all(&self.buf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        io::stdout().flush()?;
        io::stderr().flush()?;
        Ok(())
    }
}

impl Target for ConsoleTarget {
    fn set_name(&self, name: &str) {
        self.engine.set_name(name);
    }

    fn name(&self) -> String {
        self.engine.name()
    }

    fn is_level_enabled(&self, level: Level) -> (bool, bool) {
        self.engine.is_level_enabled(level)
    }

    fn formatter(&self) -> Arc<dyn Formatter> {
        self.engine.formatter()
    }

    fn start(&self, params: TargetParams) -> Result<()> {
        let stderr_level = self.stderr_level;
        self.engine.start(params, |format| {
            Ok(ConsoleWriter {
                format,
                stderr_level,
                buf: Vec::with_capacity(256),
            })
        })
    }

    fn log(&self, record: Arc<LogRecord>) {
        self.engine.log(record);
    }

    fn flush(&self, timeout: Duration) -> Result<()> {
        self.engine.flush(timeout)
    }

    fn shutdown(&self, deadline: Duration) -> Result<()> {
        self.engine.shutdown(deadline)
    }

    fn enable_metrics(&self, collector: &dyn MetricsCollector, update_freq_millis: u64) -> Result<()> {
        self.engine.enable_metrics(collector, update_freq_millis)
    }
}
