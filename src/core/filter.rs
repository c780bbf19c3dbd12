//! Level filters deciding which records a target emits

use super::level::Level;
use std::collections::HashSet;

/// Policy answering "is this level enabled" and "does it need a stack trace"
/// for one target.
pub trait Filter: Send + Sync {
    fn is_enabled(&self, level: Level) -> bool;
    fn is_stacktrace_enabled(&self, level: Level) -> bool;
}

/// Classic threshold filter: every level at least as severe as `level` is
/// enabled, and every level at least as severe as `stacktrace` requires a
/// stack trace. The two thresholds are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StdFilter {
    pub level: Level,
    pub stacktrace: Level,
}

impl StdFilter {
    pub fn new(level: Level, stacktrace: Level) -> Self {
        Self { level, stacktrace }
    }

    /// Fallback used by targets started without a filter: only the most
    /// severe level passes.
    pub fn most_severe_only() -> Self {
        Self::new(Level::PANIC, Level::PANIC)
    }

    /// The canonical level for `level` and whether it requires a stack
    /// trace, or `None` when the level is filtered out.
    pub fn enabled_level(&self, level: Level) -> Option<(Level, bool)> {
        if self.is_enabled(level) {
            Some((level.canonical(), self.is_stacktrace_enabled(level)))
        } else {
            None
        }
    }
}

impl Default for StdFilter {
    fn default() -> Self {
        Self::new(Level::INFO, Level::ERROR)
    }
}

impl Filter for StdFilter {
    #[inline]
    fn is_enabled(&self, level: Level) -> bool {
        level.id <= self.level.id
    }

    #[inline]
    fn is_stacktrace_enabled(&self, level: Level) -> bool {
        level.id <= self.stacktrace.id
    }
}

/// Filter over an explicit set of levels, for applications whose levels
/// do not form a severity ladder.
#[derive(Debug, Clone, Default)]
pub struct CustomFilter {
    enabled: HashSet<Level>,
    stacktrace: HashSet<Level>,
}

impl CustomFilter {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.enabled.extend(levels);
        self
    }

    #[must_use]
    pub fn with_stacktrace_levels(mut self, levels: impl IntoIterator<Item = Level>) -> Self {
        self.stacktrace.extend(levels);
        self
    }
}

impl Filter for CustomFilter {
    fn is_enabled(&self, level: Level) -> bool {
        self.enabled.contains(&level)
    }

    fn is_stacktrace_enabled(&self, level: Level) -> bool {
        self.stacktrace.contains(&level)
    }
}
