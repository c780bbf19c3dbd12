//! Human-readable line formatter

use crate::core::{Formatter, LogRecord, Result, TimestampFormat};
use std::io::Write;

/// Renders `timestamp<delim>LVL<delim>message<delim>key=value, ...` lines.
///
/// # Example
///
/// ```
/// use rust_log_targets::formatters::PlainFormatter;
///
/// let formatter = PlainFormatter::new()
///     .with_delim(" | ")
///     .without_timestamp();
/// ```
#[derive(Debug, Clone)]
pub struct PlainFormatter {
    delim: String,
    timestamp_format: TimestampFormat,
    disable_timestamp: bool,
    disable_level: bool,
    disable_fields: bool,
    disable_stacktrace: bool,
    use_colors: bool,
}

impl PlainFormatter {
    pub fn new() -> Self {
        Self {
            delim: " ".to_string(),
            timestamp_format: TimestampFormat::default(),
            disable_timestamp: false,
            disable_level: false,
            disable_fields: false,
            disable_stacktrace: false,
            use_colors: false,
        }
    }

    #[must_use]
    pub fn with_delim(mut self, delim: impl Into<String>) -> Self {
        self.delim = delim.into();
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn without_timestamp(mut self) -> Self {
        self.disable_timestamp = true;
        self
    }

    #[must_use]
    pub fn without_level(mut self) -> Self {
        self.disable_level = true;
        self
    }

    #[must_use]
    pub fn without_fields(mut self) -> Self {
        self.disable_fields = true;
        self
    }

    #[must_use]
    pub fn without_stacktrace(mut self) -> Self {
        self.disable_stacktrace = true;
        self
    }

    /// Color the level label with the level's color hint.
    /// Has no effect without the `console` feature.
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn level_label(&self, record: &LogRecord) -> String {
        #[cfg(feature = "console")]
        {
            use colored::Colorize;
            if let Some(color) = record.level.color.to_colored().filter(|_| self.use_colors) {
                return record.level.display_name.color(color).to_string();
            }
        }
        record.level.display_name.to_string()
    }
}

impl Default for PlainFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for PlainFormatter {
    fn format(&self, record: &LogRecord, stacktrace: bool, buf: &mut Vec<u8>) -> Result<()> {
        let mut parts: Vec<String> = Vec::with_capacity(4);

        if !self.disable_timestamp {
            parts.push(self.timestamp_format.format(&record.timestamp));
        }
        if !self.disable_level {
            parts.push(self.level_label(record));
        }
        parts.push(record.message.clone());
        if !self.disable_fields && !record.fields.is_empty() {
            let fields: Vec<String> = record
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            parts.push(fields.join(", "));
        }

        buf.write_all(parts.join(&self.delim).as_bytes())?;
        buf.push(b'\n');

        if stacktrace && !self.disable_stacktrace {
            if let Some(ref trace) = record.stacktrace {
                writeln!(buf, "{}", trace)?;
            }
        }
        Ok(())
    }
}
