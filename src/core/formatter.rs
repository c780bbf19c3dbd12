//! Formatter trait and the minimal fallback formatter

use super::{error::Result, filter::Filter, record::LogRecord};
use std::io::Write;
use std::sync::Arc;

/// Turns a record into bytes. Targets only hold a formatter; record writers
/// call it.
pub trait Formatter: Send + Sync {
    /// Append the rendering of `record` to `buf`. `stacktrace` tells whether
    /// the target requires the captured stack trace to be emitted.
    fn format(&self, record: &LogRecord, stacktrace: bool, buf: &mut Vec<u8>) -> Result<()>;
}

/// Minimal line format used when a target is started without a formatter:
/// `<rfc3339> <LVL> <message> key=value ...`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn format(&self, record: &LogRecord, stacktrace: bool, buf: &mut Vec<u8>) -> Result<()> {
        write!(
            buf,
            "{} {} {}",
            record.timestamp.to_rfc3339(),
            record.level.display_name,
            record.message
        )?;
        for (key, value) in &record.fields {
            write!(buf, " {}={}", key, value)?;
        }
        buf.push(b'\n');
        if stacktrace {
            if let Some(ref trace) = record.stacktrace {
                writeln!(buf, "{}", trace)?;
            }
        }
        Ok(())
    }
}

/// The filter and formatter a target was started with, handed to its
/// record writer so records render with the target's stacktrace policy.
#[derive(Clone)]
pub struct RecordFormat {
    filter: Arc<dyn Filter>,
    formatter: Arc<dyn Formatter>,
}

impl RecordFormat {
    pub fn new(filter: Arc<dyn Filter>, formatter: Arc<dyn Formatter>) -> Self {
        Self { filter, formatter }
    }

    pub fn render(&self, record: &LogRecord, buf: &mut Vec<u8>) -> Result<()> {
        let stacktrace = self.filter.is_stacktrace_enabled(record.level);
        self.formatter.format(record, stacktrace, buf)
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }
}
