//! Error types for log delivery

pub type Result<T> = std::result::Result<T, LogrError>;

#[derive(Debug, thiserror::Error)]
pub enum LogrError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Record discarded because the target queue stayed full
    #[error("target enqueue timeout for log rec [{record}] on target '{target}'")]
    EnqueueTimeout { target: String, record: String },

    /// Record handed to a target that is not accepting records
    #[error("Target '{target}' is not accepting records")]
    TargetClosed { target: String },

    /// Target started twice
    #[error("Target '{target}' already started")]
    AlreadyStarted { target: String },

    /// Flush marker not acknowledged in time
    #[error("Flush of target '{target}' timed out")]
    FlushTimeout { target: String },

    /// Shutdown deadline elapsed before the worker drained the queue
    #[error("Shutdown of target '{target}' timed out with {pending} records pending")]
    ShutdownTimeout { target: String, pending: usize },

    /// Worker panicked while processing an item
    #[error("Worker for target '{target}' panicked: {message}")]
    WorkerPanic { target: String, message: String },

    /// Writer error (generic)
    #[error("Writer error: {0}")]
    WriterError(String),

    /// Formatter error with format type
    #[error("Formatter error ({format_type}): {message}")]
    FormatterError {
        format_type: String,
        message: String,
    },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LogrError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LogrError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LogrError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    pub fn enqueue_timeout(target: impl Into<String>, record: impl Into<String>) -> Self {
        LogrError::EnqueueTimeout {
            target: target.into(),
            record: record.into(),
        }
    }

    pub fn target_closed(target: impl Into<String>) -> Self {
        LogrError::TargetClosed {
            target: target.into(),
        }
    }

    pub fn shutdown_timeout(target: impl Into<String>, pending: usize) -> Self {
        LogrError::ShutdownTimeout {
            target: target.into(),
            pending,
        }
    }

    /// Create a formatter error
    pub fn formatter(format_type: impl Into<String>, message: impl Into<String>) -> Self {
        LogrError::FormatterError {
            format_type: format_type.into(),
            message: message.into(),
        }
    }

    /// Create a writer error (generic)
    pub fn writer<S: Into<String>>(msg: S) -> Self {
        LogrError::WriterError(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LogrError::Other(msg.into())
    }

    /// True for errors that only a caller's configuration can cause
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LogrError::InvalidConfiguration { .. } | LogrError::AlreadyStarted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = LogrError::config("Logr", "collector cannot be nil");
        assert!(matches!(err, LogrError::InvalidConfiguration { .. }));
        assert!(err.is_configuration());

        let err = LogrError::enqueue_timeout("file", "level=error msg=boom");
        assert!(matches!(err, LogrError::EnqueueTimeout { .. }));
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_error_display() {
        let err = LogrError::enqueue_timeout("writerTest", "ERR hello");
        assert_eq!(
            err.to_string(),
            "target enqueue timeout for log rec [ERR hello] on target 'writerTest'"
        );

        let err = LogrError::shutdown_timeout("tcp", 12);
        assert_eq!(
            err.to_string(),
            "Shutdown of target 'tcp' timed out with 12 records pending"
        );

        let err = LogrError::formatter("JSON", "Invalid field type");
        assert_eq!(
            err.to_string(),
            "Formatter error (JSON): Invalid field type"
        );
    }

    #[test]
    fn test_io_operation_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = LogrError::io_operation("spawning worker", "cannot spawn thread", io_err);

        assert!(matches!(err, LogrError::IoOperation { .. }));
        assert!(err.to_string().contains("spawning worker"));
        assert!(err.to_string().contains("cannot spawn thread"));
    }
}
