//! Callbacks a target receives from its owning logger
//!
//! When a target queue is full, the overflow handler decides between
//! dropping the record and blocking the caller for at most the enqueue
//! timeout. Errors raised while delivering are routed to the error handler.

use super::{error::LogrError, level::Level, record::LogRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on how long `log` may block on a full queue.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// Called with `(target name, record, queue capacity)` when a queue is full.
/// Returning `true` drops the record; `false` blocks up to the enqueue
/// timeout.
pub type OverflowHandler = Arc<dyn Fn(&str, &LogRecord, usize) -> bool + Send + Sync>;

/// Receives every error raised while delivering records.
pub type ErrorHandler = Arc<dyn Fn(&LogrError) + Send + Sync>;

/// Error handler writing to stderr, used when none is configured.
pub fn stderr_error_handler() -> ErrorHandler {
    Arc::new(|err| eprintln!("[LOGR ERROR] {}", err))
}

/// Overflow handler that sheds every record hitting a full queue.
pub fn drop_all() -> OverflowHandler {
    Arc::new(|_, _, _| true)
}

/// Overflow handler that sheds records less severe than `level` and blocks
/// for the rest.
pub fn drop_below(level: Level) -> OverflowHandler {
    Arc::new(move |_, record, _| !record.level.is_at_least(level))
}

/// Serializable choice of overflow behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OverflowPolicy {
    /// Block the caller up to the enqueue timeout, then report and discard
    #[default]
    Block,

    /// Drop records hitting a full queue, counting them
    Drop,

    /// Drop records less severe than the given level, block for the rest
    DropBelow(Level),
}

impl OverflowPolicy {
    pub fn handler(self) -> Option<OverflowHandler> {
        match self {
            OverflowPolicy::Block => None,
            OverflowPolicy::Drop => Some(drop_all()),
            OverflowPolicy::DropBelow(level) => Some(drop_below(level)),
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::Drop => write!(f, "Drop"),
            OverflowPolicy::DropBelow(level) => write!(f, "DropBelow({})", level),
        }
    }
}

/// Owning-logger dependencies injected into every target it starts.
#[derive(Clone)]
pub struct DeliveryHooks {
    pub overflow: Option<OverflowHandler>,
    pub on_error: ErrorHandler,
    pub enqueue_timeout: Duration,
}

impl DeliveryHooks {
    pub fn new(enqueue_timeout: Duration) -> Self {
        Self {
            overflow: None,
            on_error: stderr_error_handler(),
            enqueue_timeout,
        }
    }

    #[must_use]
    pub fn with_overflow(mut self, handler: OverflowHandler) -> Self {
        self.overflow = Some(handler);
        self
    }

    #[must_use]
    pub fn with_error_handler(mut self, handler: ErrorHandler) -> Self {
        self.on_error = handler;
        self
    }

    #[inline]
    pub fn report(&self, err: &LogrError) {
        (self.on_error)(err);
    }
}

impl Default for DeliveryHooks {
    fn default() -> Self {
        Self::new(DEFAULT_ENQUEUE_TIMEOUT)
    }
}

impl fmt::Debug for DeliveryHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryHooks")
            .field("overflow", &self.overflow.is_some())
            .field("enqueue_timeout", &self.enqueue_timeout)
            .finish()
    }
}
