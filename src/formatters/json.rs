//! JSON formatter for structured logging
//!
//! Emits one JSON object per line (JSONL), compatible with log aggregation
//! tools like ELK or Loki.

use crate::core::{Formatter, LogRecord, Result, TimestampFormat};
use std::io::Write;

#[derive(Debug, Clone)]
pub struct JsonFormatter {
    pretty: bool,
    timestamp_format: TimestampFormat,
    include_thread: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            pretty: false,
            timestamp_format: TimestampFormat::default(),
            include_thread: true,
        }
    }

    /// Indented multi-line objects instead of JSONL.
    #[must_use]
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn without_thread(mut self) -> Self {
        self.include_thread = false;
        self
    }

    fn to_value(&self, record: &LogRecord, stacktrace: bool) -> serde_json::Value {
        let mut obj = serde_json::Map::new();

        obj.insert(
            "timestamp".to_string(),
            self.timestamp_format.to_json(&record.timestamp),
        );
        obj.insert(
            "level".to_string(),
            serde_json::Value::String(record.level.name.to_string()),
        );
        obj.insert(
            "msg".to_string(),
            serde_json::Value::String(record.message.clone()),
        );
        if let Some(ref logger) = record.logger {
            obj.insert(
                "logger".to_string(),
                serde_json::Value::String(logger.clone()),
            );
        }
        if self.include_thread {
            obj.insert(
                "thread_id".to_string(),
                serde_json::Value::String(record.thread_id.clone()),
            );
            if let Some(ref name) = record.thread_name {
                obj.insert(
                    "thread_name".to_string(),
                    serde_json::Value::String(name.clone()),
                );
            }
        }

        if !record.fields.is_empty() {
            let fields: serde_json::Map<String, serde_json::Value> = record
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json_value()))
                .collect();
            obj.insert("fields".to_string(), serde_json::Value::Object(fields));
        }

        if stacktrace {
            if let Some(ref trace) = record.stacktrace {
                obj.insert(
                    "stacktrace".to_string(),
                    serde_json::Value::String(trace.clone()),
                );
            }
        }

        serde_json::Value::Object(obj)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &LogRecord, stacktrace: bool, buf: &mut Vec<u8>) -> Result<()> {
        let value = self.to_value(record, stacktrace);
        if self.pretty {
            serde_json::to_writer_pretty(&mut *buf, &value)?;
        } else {
            serde_json::to_writer(&mut *buf, &value)?;
        }
        buf.write_all(b"\n")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Level;

    #[test]
    fn test_jsonl_object() {
        let record = LogRecord::new(Level::WARN, "strange data")
            .with_field("name", "wiggin")
            .with_field("ok", false)
            .with_logger("api");
        let mut buf = Vec::new();
        JsonFormatter::new()
            .without_thread()
            .format(&record, false, &mut buf)
            .unwrap();

        let line = String::from_utf8(buf).unwrap();
        assert_eq!(line.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["level"], "warn");
        assert_eq!(value["msg"], "strange data");
        assert_eq!(value["logger"], "api");
        assert_eq!(value["fields"]["name"], "wiggin");
        assert_eq!(value["fields"]["ok"], false);
        assert!(value.get("thread_id").is_none());
    }

    #[test]
    fn test_stacktrace_and_numeric_timestamp() {
        let record = LogRecord::new(Level::ERROR, "boom").with_stacktrace("frame 0");
        let formatter = JsonFormatter::new().with_timestamp_format(TimestampFormat::UnixMillis);

        let mut buf = Vec::new();
        formatter.format(&record, true, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["stacktrace"], "frame 0");
        assert!(value["timestamp"].is_i64());

        let mut buf = Vec::new();
        formatter.format(&record, false, &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert!(value.get("stacktrace").is_none());
    }

    #[test]
    fn test_pretty_output_parses() {
        let record = LogRecord::new(Level::INFO, "hi");
        let mut buf = Vec::new();
        JsonFormatter::new()
            .pretty()
            .format(&record, false, &mut buf)
            .unwrap();
        assert!(String::from_utf8_lossy(&buf).lines().count() > 1);
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["msg"], "hi");
    }
}
