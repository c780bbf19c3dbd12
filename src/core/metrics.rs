//! Metrics sinks for target observability
//!
//! Targets push queue depth into a [`Gauge`] and delivery events into
//! [`Counter`]s obtained from a [`MetricsCollector`]. The collector is
//! external (Prometheus, statsd, ...); [`MemoryCollector`] is an in-process
//! implementation backed by atomics that can be polled directly.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default sampling period of the queue-depth gauge, in milliseconds.
pub const DEFAULT_METRICS_UPDATE_FREQ_MILLIS: u64 = 15_000;

/// Lower bound on the sampling period, in milliseconds.
pub const MIN_METRICS_UPDATE_FREQ_MILLIS: u64 = 250;

/// Monotonic metric.
pub trait Counter: Send + Sync {
    /// Increment by one.
    fn inc(&self);

    /// Increment by an arbitrary non-negative amount.
    ///
    /// # Panics
    ///
    /// Implementations may panic when `value` is negative.
    fn add(&self, value: f64);
}

/// Metric that can move in both directions.
pub trait Gauge: Send + Sync {
    fn set(&self, value: f64);
    fn add(&self, value: f64);
    fn sub(&self, value: f64);
}

/// Factory of per-target metric handles, keyed by target name.
pub trait MetricsCollector: Send + Sync {
    fn queue_size_gauge(&self, target: &str) -> Arc<dyn Gauge>;
    fn logged_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn error_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn dropped_counter(&self, target: &str) -> Arc<dyn Counter>;
    fn blocked_counter(&self, target: &str) -> Arc<dyn Counter>;

    /// Counter of records lost because the worker panicked while handling
    /// them. Collectors that do not track it keep the no-op default.
    fn panic_counter(&self, _target: &str) -> Arc<dyn Counter> {
        Arc::new(NoopCounter)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCounter;

impl Counter for NoopCounter {
    fn inc(&self) {}
    fn add(&self, _value: f64) {}
}

/// The handles one target holds for its whole lifetime.
#[derive(Clone)]
pub struct TargetMetrics {
    pub queue_size: Arc<dyn Gauge>,
    pub logged: Arc<dyn Counter>,
    pub errors: Arc<dyn Counter>,
    pub dropped: Arc<dyn Counter>,
    pub blocked: Arc<dyn Counter>,
    pub panics: Arc<dyn Counter>,
}

impl TargetMetrics {
    pub fn from_collector(collector: &dyn MetricsCollector, name: &str) -> Self {
        Self {
            queue_size: collector.queue_size_gauge(name),
            logged: collector.logged_counter(name),
            errors: collector.error_counter(name),
            dropped: collector.dropped_counter(name),
            blocked: collector.blocked_counter(name),
            panics: collector.panic_counter(name),
        }
    }
}

/// Sampling period for a configured update frequency: zero selects the
/// default, anything below the floor is raised to it.
pub fn sample_interval_millis(update_freq_millis: u64) -> u64 {
    let freq = if update_freq_millis == 0 {
        DEFAULT_METRICS_UPDATE_FREQ_MILLIS
    } else {
        update_freq_millis
    };
    freq.max(MIN_METRICS_UPDATE_FREQ_MILLIS)
}

/// Float counter stored as `f64` bits in an `AtomicU64`.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    bits: AtomicU64,
}

impl AtomicCounter {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn update(&self, f: impl Fn(f64) -> f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(f(f64::from_bits(bits)).to_bits())
            });
    }
}

impl Counter for AtomicCounter {
    #[inline]
    fn inc(&self) {
        self.update(|v| v + 1.0);
    }

    fn add(&self, value: f64) {
        assert!(value >= 0.0, "counter cannot decrease in value");
        self.update(|v| v + value);
    }
}

#[derive(Debug, Default)]
pub struct AtomicGauge {
    bits: AtomicU64,
}

impl AtomicGauge {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn get(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Relaxed))
    }

    fn update(&self, f: impl Fn(f64) -> f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some(f(f64::from_bits(bits)).to_bits())
            });
    }
}

impl Gauge for AtomicGauge {
    #[inline]
    fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }

    fn add(&self, value: f64) {
        self.update(|v| v + value);
    }

    fn sub(&self, value: f64) {
        self.update(|v| v - value);
    }
}

#[derive(Debug, Default)]
struct TargetSlots {
    queue_size: Arc<AtomicGauge>,
    logged: Arc<AtomicCounter>,
    errors: Arc<AtomicCounter>,
    dropped: Arc<AtomicCounter>,
    blocked: Arc<AtomicCounter>,
    panics: Arc<AtomicCounter>,
}

/// Point-in-time copy of one target's metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub queue_size: f64,
    pub logged: f64,
    pub errors: f64,
    pub dropped: f64,
    pub blocked: f64,
    pub panics: f64,
}

impl MetricsSnapshot {
    /// Dropped records as a percentage (0.0 - 100.0) of everything that
    /// was either written or dropped.
    pub fn drop_rate(&self) -> f64 {
        let total = self.logged + self.dropped;
        if total == 0.0 {
            0.0
        } else {
            (self.dropped / total) * 100.0
        }
    }
}

/// In-process collector keeping one slot set per target name.
///
/// # Example
///
/// ```
/// use rust_log_targets::core::metrics::{Counter, MemoryCollector, MetricsCollector};
///
/// let collector = MemoryCollector::new();
/// collector.dropped_counter("file").inc();
/// collector.logged_counter("file").add(3.0);
///
/// let snapshot = collector.snapshot("file").unwrap();
/// assert_eq!(snapshot.dropped, 1.0);
/// assert_eq!(snapshot.drop_rate(), 25.0);
/// ```
#[derive(Debug, Default)]
pub struct MemoryCollector {
    targets: RwLock<HashMap<String, Arc<TargetSlots>>>,
}

impl MemoryCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self, target: &str) -> Arc<TargetSlots> {
        if let Some(slots) = self.targets.read().get(target) {
            return Arc::clone(slots);
        }
        Arc::clone(self.targets.write().entry(target.to_string()).or_default())
    }

    pub fn snapshot(&self, target: &str) -> Option<MetricsSnapshot> {
        self.targets.read().get(target).map(|s| MetricsSnapshot {
            queue_size: s.queue_size.get(),
            logged: s.logged.get(),
            errors: s.errors.get(),
            dropped: s.dropped.get(),
            blocked: s.blocked.get(),
            panics: s.panics.get(),
        })
    }

    pub fn target_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.targets.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl MetricsCollector for MemoryCollector {
    fn queue_size_gauge(&self, target: &str) -> Arc<dyn Gauge> {
        self.slots(target).queue_size.clone()
    }

    fn logged_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.slots(target).logged.clone()
    }

    fn error_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.slots(target).errors.clone()
    }

    fn dropped_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.slots(target).dropped.clone()
    }

    fn blocked_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.slots(target).blocked.clone()
    }

    fn panic_counter(&self, target: &str) -> Arc<dyn Counter> {
        self.slots(target).panics.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_interval() {
        assert_eq!(sample_interval_millis(0), 15_000);
        assert_eq!(sample_interval_millis(10), 250);
        assert_eq!(sample_interval_millis(250), 250);
        assert_eq!(sample_interval_millis(1_000), 1_000);
    }

    #[test]
    fn test_counter_and_gauge() {
        let counter = AtomicCounter::new();
        counter.inc();
        counter.add(2.5);
        assert_eq!(counter.get(), 3.5);

        let gauge = AtomicGauge::new();
        gauge.set(10.0);
        gauge.add(-3.0);
        gauge.sub(2.0);
        assert_eq!(gauge.get(), 5.0);
    }

    #[test]
    #[should_panic(expected = "counter cannot decrease")]
    fn test_counter_rejects_negative() {
        AtomicCounter::new().add(-1.0);
    }

    #[test]
    fn test_collector_handles_are_per_target() {
        let collector = MemoryCollector::new();
        let a = TargetMetrics::from_collector(&collector, "a");
        let b = TargetMetrics::from_collector(&collector, "b");

        a.logged.inc();
        a.logged.inc();
        b.dropped.inc();
        a.queue_size.set(7.0);

        let snap_a = collector.snapshot("a").unwrap();
        let snap_b = collector.snapshot("b").unwrap();
        assert_eq!(snap_a.logged, 2.0);
        assert_eq!(snap_a.queue_size, 7.0);
        assert_eq!(snap_b.logged, 0.0);
        assert_eq!(snap_b.dropped, 1.0);
        assert_eq!(collector.target_names(), vec!["a", "b"]);
        assert!(collector.snapshot("c").is_none());
    }

    #[test]
    fn test_drop_rate() {
        let snapshot = MetricsSnapshot::default();
        assert_eq!(snapshot.drop_rate(), 0.0);

        let snapshot = MetricsSnapshot {
            logged: 90.0,
            dropped: 10.0,
            ..Default::default()
        };
        let rate = snapshot.drop_rate();
        assert!((9.9..=10.1).contains(&rate), "Drop rate was {}", rate);
    }

    #[test]
    fn test_noop_panic_counter_by_default() {
        struct Minimal;
        impl MetricsCollector for Minimal {
            fn queue_size_gauge(&self, _: &str) -> Arc<dyn Gauge> {
                Arc::new(AtomicGauge::new())
            }
            fn logged_counter(&self, _: &str) -> Arc<dyn Counter> {
                Arc::new(AtomicCounter::new())
            }
            fn error_counter(&self, _: &str) -> Arc<dyn Counter> {
                Arc::new(AtomicCounter::new())
            }
            fn dropped_counter(&self, _: &str) -> Arc<dyn Counter> {
                Arc::new(AtomicCounter::new())
            }
            fn blocked_counter(&self, _: &str) -> Arc<dyn Counter> {
                Arc::new(AtomicCounter::new())
            }
        }

        let metrics = TargetMetrics::from_collector(&Minimal, "x");
        metrics.panics.inc();
    }
}
