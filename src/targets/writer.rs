//! Target writing rendered records to any `io::Write`

#[cfg(feature = "network")]
use super::tcp::TcpStreamWriter;
use crate::core::{
    DeliveryEngine, Formatter, Level, LogRecord, LogrError, MetricsCollector, RecordFormat,
    RecordWriter, Result, Target, TargetParams,
};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Target rendering each record with its formatter and writing the bytes to
/// `W` from the worker thread.
///
/// # Example
///
/// ```
/// use rust_log_targets::prelude::*;
/// use rust_log_targets::targets::{Buffer, WriterTarget};
/// use std::sync::Arc;
///
/// let logr = Logr::new();
/// let buf = Buffer::new();
/// let filter = StdFilter::new(Level::WARN, Level::ERROR);
/// logr.add_target(
///     WriterTarget::new(buf.clone()),
///     "example",
///     Some(Arc::new(filter)),
///     Some(Arc::new(PlainFormatter::new().with_delim(" | "))),
///     1000,
/// )
/// .unwrap();
///
/// let logger = logr.new_logger().with_field("name", "wiggin");
/// logger.error("the erroneous data");
/// logger.debug("XXX");
/// logr.shutdown().unwrap();
///
/// assert!(buf.to_string().contains("the erroneous data"));
/// assert!(!buf.to_string().contains("XXX"));
/// ```
pub struct WriterTarget<W> {
    engine: DeliveryEngine,
    out: Mutex<Option<W>>,
}

/// Appends to a file through a buffered writer.
pub type FileTarget = WriterTarget<BufWriter<File>>;

/// Streams to a TCP peer, reconnecting on write errors.
#[cfg(feature = "network")]
pub type TcpTarget = WriterTarget<TcpStreamWriter>;

impl<W: Write + Send + 'static> WriterTarget<W> {
    pub fn new(out: W) -> Self {
        Self::named(out, "WriterTarget")
    }

    fn named(out: W, default_name: &str) -> Self {
        Self {
            engine: DeliveryEngine::new(default_name),
            out: Mutex::new(Some(out)),
        }
    }

    pub fn engine(&self) -> &DeliveryEngine {
        &self.engine
    }
}

impl FileTarget {
    /// Open `path` for appending, creating it when missing.
    pub fn file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                LogrError::io_operation("opening log file", path.display().to_string(), e)
            })?;
        Ok(Self::named(BufWriter::new(file), "FileTarget"))
    }
}

#[cfg(feature = "network")]
impl TcpTarget {
    /// Connect to `addr` (e.g. `"127.0.0.1:5140"`).
    pub fn tcp(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        let stream = TcpStreamWriter::connect(addr.clone())
            .map_err(|e| LogrError::io_operation("connecting to log server", addr, e))?;
        Ok(Self::named(stream, "TcpTarget"))
    }
}

struct StreamWriter<W> {
    out: W,
    format: RecordFormat,
    buf: Vec<u8>,
}

impl<W: Write + Send> RecordWriter for StreamWriter<W> {
    fn write(&mut self, record: &LogRecord) -> Result<()> {
        self.buf.clear();
        self.format.render(record, &mut self.buf)?;
        self.out.write_all(&self.buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send + 'static> Target for WriterTarget<W> {
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
        let mut slot = self.out.lock();
        self.engine.start(params, |format| {
            let out = slot.take().ok_or_else(|| LogrError::AlreadyStarted {
                target: self.engine.name(),
            })?;
            Ok(StreamWriter {
                out,
                format,
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{EngineState, StdFilter};
    use crate::formatters::PlainFormatter;
    use crate::targets::Buffer;
    use tempfile::TempDir;

    const WAIT: Duration = Duration::from_secs(5);

    fn params() -> TargetParams {
        TargetParams::new(100)
            .with_filter(Arc::new(StdFilter::new(Level::INFO, Level::PANIC)))
            .with_formatter(Arc::new(PlainFormatter::new().without_timestamp()))
    }

    #[test]
    fn test_buffer_target_renders_records() {
        let buf = Buffer::new();
        let target = WriterTarget::new(buf.clone());
        assert_eq!(target.name(), "WriterTarget");

        target.start(params()).unwrap();
        target.log(Arc::new(LogRecord::new(Level::INFO, "first")));
        target.log(Arc::new(LogRecord::new(Level::WARN, "second")));
        target.flush(WAIT).unwrap();

        assert_eq!(buf.to_string(), "INF first\nWRN second\n");
        assert_eq!(target.is_level_enabled(Level::DEBUG), (false, false));
        target.shutdown(WAIT).unwrap();
        assert_eq!(target.engine().state(), EngineState::Closed);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let target = WriterTarget::new(Buffer::new());
        target.start(params()).unwrap();
        assert!(matches!(
            target.start(params()),
            Err(LogrError::AlreadyStarted { .. })
        ));
        target.shutdown(WAIT).unwrap();
    }

    #[test]
    fn test_file_target_appends() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let log_file = temp_dir.path().join("target.log");

        let target = FileTarget::file(&log_file).expect("Failed to open file target");
        assert_eq!(target.name(), "FileTarget");
        target.start(params()).unwrap();
        for i in 0..10 {
            target.log(Arc::new(LogRecord::new(Level::INFO, format!("Message {}", i))));
        }
        target.shutdown(WAIT).unwrap();

        let content = std::fs::read_to_string(&log_file).expect("Failed to read log file");
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 10);
        assert_eq!(lines[9], "INF Message 9");
    }

    #[cfg(feature = "network")]
    #[test]
    fn test_tcp_target_streams_lines() {
        use std::io::{BufRead, BufReader};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            BufReader::new(socket)
                .lines()
                .map_while(|line| line.ok())
                .collect::<Vec<_>>()
        });

        let target = TcpTarget::tcp(addr).expect("Failed to connect");
        assert_eq!(target.name(), "TcpTarget");
        target.start(params()).unwrap();
        target.log(Arc::new(LogRecord::new(Level::ERROR, "over the wire")));
        target.shutdown(WAIT).unwrap();
        drop(target);

        assert_eq!(server.join().unwrap(), vec!["ERR over the wire"]);
    }

    #[test]
    fn test_file_target_reports_bad_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let missing = temp_dir.path().join("missing").join("target.log");
        let err = FileTarget::file(&missing).err().expect("open should fail");
        assert!(err.to_string().contains("opening log file"));
    }
}
