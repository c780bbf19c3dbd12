//! Per-target asynchronous delivery engine
//!
//! Every concrete target composes one [`DeliveryEngine`]. The engine owns a
//! bounded queue, a supervised worker thread draining it into the target's
//! [`RecordWriter`], and optionally a sampler thread publishing the queue
//! depth.
//!
//! Lifecycle: `Idle` -> `Running` (after [`DeliveryEngine::start`]) ->
//! `Draining` (after [`DeliveryEngine::shutdown`] closed the queue) ->
//! `Closed` (worker drained the queue and exited). A worker that panics is
//! restarted on the same queue without leaving `Running`.
//!
//! # Backpressure
//!
//! `log` first tries a non-blocking enqueue. When the queue is full the
//! owner's overflow handler may drop the record (counted as dropped);
//! otherwise the caller blocks for at most the enqueue timeout (counted as
//! blocked) and the record is discarded with an `EnqueueTimeout` error if
//! no space frees up in time.

use super::{
    error::{LogrError, Result},
    filter::{Filter, StdFilter},
    formatter::{DefaultFormatter, Formatter, RecordFormat},
    hooks::DeliveryHooks,
    level::Level,
    metrics::{sample_interval_millis, Gauge, MetricsCollector, TargetMetrics},
    record::{LogRecord, QueueItem},
    target::{RecordWriter, TargetParams},
};
use crossbeam_channel::{
    after, bounded, select, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TrySendError,
};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EngineState {
    Idle = 0,
    Running = 1,
    Draining = 2,
    Closed = 3,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => EngineState::Idle,
            1 => EngineState::Running,
            2 => EngineState::Draining,
            _ => EngineState::Closed,
        }
    }
}

/// Last path segment of a type name without generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// State created by `start`.
struct Running {
    receiver: Receiver<QueueItem>,
    capacity: usize,
    hooks: DeliveryHooks,
    metrics: Option<TargetMetrics>,
    /// Disconnects exactly once, when the worker exits.
    done: Receiver<()>,
}

pub struct DeliveryEngine {
    name: Arc<RwLock<String>>,
    state: Arc<AtomicU8>,
    lifecycle: Mutex<()>,
    format: OnceLock<RecordFormat>,
    sender: RwLock<Option<Sender<QueueItem>>>,
    running: OnceLock<Running>,
    metrics: RwLock<Option<TargetMetrics>>,
    metrics_update_freq_millis: AtomicU64,
}

impl DeliveryEngine {
    /// Create an idle engine whose default name is `default_name`.
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            name: Arc::new(RwLock::new(default_name.into())),
            state: Arc::new(AtomicU8::new(EngineState::Idle as u8)),
            lifecycle: Mutex::new(()),
            format: OnceLock::new(),
            sender: RwLock::new(None),
            running: OnceLock::new(),
            metrics: RwLock::new(None),
            metrics_update_freq_millis: AtomicU64::new(0),
        }
    }

    /// Create an idle engine named after the target type `T`.
    pub fn for_target<T: ?Sized>() -> Self {
        Self::new(short_type_name::<T>())
    }

    pub fn set_name(&self, name: &str) {
        *self.name.write() = name.to_string();
    }

    pub fn name(&self) -> String {
        self.name.read().clone()
    }

    pub fn state(&self) -> EngineState {
        EngineState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Records currently queued.
    pub fn queue_len(&self) -> usize {
        self.running.get().map_or(0, |r| r.receiver.len())
    }

    pub fn capacity(&self) -> Option<usize> {
        self.running.get().map(|r| r.capacity)
    }

    /// `(enabled, stacktrace required)` under the target's filter, or the
    /// fallback filter before `start`.
    pub fn is_level_enabled(&self, level: Level) -> (bool, bool) {
        match self.format.get() {
            Some(format) => {
                let filter = format.filter();
                (filter.is_enabled(level), filter.is_stacktrace_enabled(level))
            }
            None => {
                let filter = StdFilter::most_severe_only();
                (filter.is_enabled(level), filter.is_stacktrace_enabled(level))
            }
        }
    }

    pub fn formatter(&self) -> Arc<dyn Formatter> {
        match self.format.get() {
            Some(format) => Arc::clone(format.formatter()),
            None => Arc::new(DefaultFormatter),
        }
    }

    /// Attach metric handles from `collector`, keyed by the current name.
    /// The queue-depth sampler starts with the engine.
    pub fn enable_metrics(
        &self,
        collector: &dyn MetricsCollector,
        update_freq_millis: u64,
    ) -> Result<()> {
        let _guard = self.lifecycle.lock();
        if self.state() != EngineState::Idle {
            return Err(LogrError::config(
                self.name(),
                "metrics must be enabled before the target is started",
            ));
        }
        self.metrics_update_freq_millis
            .store(update_freq_millis, Ordering::Relaxed);
        *self.metrics.write() = Some(TargetMetrics::from_collector(collector, &self.name()));
        Ok(())
    }

    /// Allocate the queue and spawn the worker, building the record writer
    /// from the resolved filter and formatter.
    pub fn start<W, F>(&self, params: TargetParams, make_writer: F) -> Result<()>
    where
        W: RecordWriter + 'static,
        F: FnOnce(RecordFormat) -> Result<W>,
    {
        let _guard = self.lifecycle.lock();
        if self.state() != EngineState::Idle {
            return Err(LogrError::AlreadyStarted {
                target: self.name(),
            });
        }
        if params.max_queued == 0 {
            return Err(LogrError::config(
                self.name(),
                "max_queued must be greater than zero",
            ));
        }

        let filter: Arc<dyn Filter> = params
            .filter
            .unwrap_or_else(|| Arc::new(StdFilter::most_severe_only()));
        let formatter: Arc<dyn Formatter> = params
            .formatter
            .unwrap_or_else(|| Arc::new(DefaultFormatter));
        let format = RecordFormat::new(filter, formatter);

        let (sender, receiver) = bounded(params.max_queued);
        let (done_tx, done_rx) = bounded::<()>(0);
        let metrics = self.metrics.read().clone();
        let writer: Box<dyn RecordWriter> = Box::new(make_writer(format.clone())?);

        let worker = Worker {
            name: Arc::clone(&self.name),
            receiver: receiver.clone(),
            hooks: params.hooks.clone(),
            metrics: metrics.clone(),
            state: Arc::clone(&self.state),
        };
        thread::Builder::new()
            .name(format!("logr-{}", self.name()))
            .spawn(move || worker.supervise(writer, done_tx))
            .map_err(|e| LogrError::io_operation("spawning worker", self.name(), e))?;

        if let Some(ref m) = metrics {
            let interval = Duration::from_millis(sample_interval_millis(
                self.metrics_update_freq_millis.load(Ordering::Relaxed),
            ));
            let sampler = Sampler {
                gauge: Arc::clone(&m.queue_size),
                receiver: receiver.clone(),
                done: done_rx.clone(),
                state: Arc::clone(&self.state),
                interval,
            };
            if let Err(e) = thread::Builder::new()
                .name(format!("logr-metrics-{}", self.name()))
                .spawn(move || sampler.run())
            {
                params.hooks.report(&LogrError::io_operation(
                    "spawning metrics sampler",
                    self.name(),
                    e,
                ));
            }
        }

        let _ = self.format.set(format);
        *self.sender.write() = Some(sender);
        let _ = self.running.set(Running {
            receiver,
            capacity: params.max_queued,
            hooks: params.hooks,
            metrics,
            done: done_rx,
        });
        self.state
            .store(EngineState::Running as u8, Ordering::Release);
        Ok(())
    }

    /// Queue `record`, applying the backpressure policy when full.
    pub fn log(&self, record: Arc<LogRecord>) {
        let Some(running) = self.running.get() else {
            eprintln!(
                "[LOGR ERROR] {}",
                LogrError::target_closed(self.name())
            );
            return;
        };
        let Some(sender) = self.sender.read().clone() else {
            running.hooks.report(&LogrError::target_closed(self.name()));
            return;
        };

        match sender.try_send(QueueItem::Record(Arc::clone(&record))) {
            Ok(()) => return,
            Err(TrySendError::Disconnected(_)) => {
                running.hooks.report(&LogrError::target_closed(self.name()));
                return;
            }
            Err(TrySendError::Full(_)) => {}
        }

        let name = self.name();
        if let Some(ref handler) = running.hooks.overflow {
            if handler(&name, &record, running.capacity) {
                if let Some(ref m) = running.metrics {
                    m.dropped.inc();
                }
                return;
            }
        }
        if let Some(ref m) = running.metrics {
            m.blocked.inc();
        }

        match sender.send_timeout(
            QueueItem::Record(Arc::clone(&record)),
            running.hooks.enqueue_timeout,
        ) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                running
                    .hooks
                    .report(&LogrError::enqueue_timeout(name, record.to_string()));
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                running.hooks.report(&LogrError::target_closed(name));
            }
        }
    }

    /// Block until every record queued before this call has been handed to
    /// the writer and the writer has been flushed, or `timeout` elapses.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let sender = self
            .sender
            .read()
            .clone()
            .ok_or_else(|| LogrError::target_closed(self.name()))?;

        let (ack_tx, ack_rx) = bounded(1);
        match sender.send_deadline(QueueItem::Flush(ack_tx), deadline) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                return Err(LogrError::FlushTimeout {
                    target: self.name(),
                })
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(LogrError::target_closed(self.name()))
            }
        }
        drop(sender);

        match ack_rx.recv_deadline(deadline) {
            Ok(()) => Ok(()),
            // The worker unwound while holding the marker.
            Err(RecvTimeoutError::Disconnected) => Err(LogrError::WorkerPanic {
                target: self.name(),
                message: "flush was not acknowledged".to_string(),
            }),
            Err(RecvTimeoutError::Timeout) => Err(LogrError::FlushTimeout {
                target: self.name(),
            }),
        }
    }

    /// Close the queue and wait up to `deadline` for the worker to drain it.
    /// On timeout the remaining records are abandoned.
    pub fn shutdown(&self, deadline: Duration) -> Result<()> {
        let guard = self.lifecycle.lock();
        let Some(running) = self.running.get() else {
            self.state.store(EngineState::Closed as u8, Ordering::Release);
            return Ok(());
        };
        if self.sender.write().take().is_some() {
            let _ = self.state.compare_exchange(
                EngineState::Running as u8,
                EngineState::Draining as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
        }
        drop(guard);

        match running.done.recv_timeout(deadline) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                let pending = running.receiver.len();
                eprintln!(
                    "[LOGR WARNING] Target '{}' did not drain within {:?}; {} records abandoned.",
                    self.name(),
                    deadline,
                    pending
                );
                Err(LogrError::shutdown_timeout(self.name(), pending))
            }
        }
    }
}

impl std::fmt::Display for DeliveryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name.read())
    }
}

/// Consumer side of the queue, restarted after a panic.
struct Worker {
    name: Arc<RwLock<String>>,
    receiver: Receiver<QueueItem>,
    hooks: DeliveryHooks,
    metrics: Option<TargetMetrics>,
    state: Arc<AtomicU8>,
}

impl Worker {
    fn supervise(self, mut writer: Box<dyn RecordWriter>, done: Sender<()>) {
        loop {
            let result = panic::catch_unwind(AssertUnwindSafe(|| self.consume(writer.as_mut())));
            match result {
                Ok(()) => break,
                Err(payload) => {
                    let err = LogrError::WorkerPanic {
                        target: self.name.read().clone(),
                        message: panic_message(payload.as_ref()),
                    };
                    eprintln!("[LOGR CRITICAL] {}. Restarting worker.", err);
                    if let Some(ref m) = self.metrics {
                        m.panics.inc();
                    }
                }
            }
        }

        match panic::catch_unwind(AssertUnwindSafe(|| writer.close())) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.hooks.report(&err),
            Err(payload) => eprintln!(
                "[LOGR CRITICAL] Writer for target '{}' panicked while closing: {}",
                self.name.read(),
                panic_message(payload.as_ref())
            ),
        }

        self.state
            .store(EngineState::Closed as u8, Ordering::Release);
        drop(done);
    }

    /// Consume the queue until it is closed and empty.
    fn consume(&self, writer: &mut dyn RecordWriter) {
        while let Ok(item) = self.receiver.recv() {
            match item {
                QueueItem::Record(record) => self.write(writer, &record),
                QueueItem::Flush(ack) => self.flush(writer, ack),
            }
        }
    }

    fn write(&self, writer: &mut dyn RecordWriter, record: &LogRecord) {
        match writer.write(record) {
            Ok(()) => {
                if let Some(ref m) = self.metrics {
                    m.logged.inc();
                }
            }
            Err(err) => {
                if let Some(ref m) = self.metrics {
                    m.errors.inc();
                }
                self.hooks.report(&err);
            }
        }
    }

    /// Everything queued ahead of the marker is already written. Drain what
    /// is queued right now without waiting for new records, absorbing
    /// redundant markers, then flush the writer and acknowledge every
    /// marker seen. Acks are dropped unsent if the writer panics.
    fn flush(&self, writer: &mut dyn RecordWriter, ack: Sender<()>) {
        let mut acks = vec![ack];
        let pending = self.receiver.len();
        for _ in 0..pending {
            match self.receiver.try_recv() {
                Ok(QueueItem::Record(record)) => self.write(writer, &record),
                Ok(QueueItem::Flush(absorbed)) => acks.push(absorbed),
                Err(_) => break,
            }
        }
        if let Err(err) = writer.flush() {
            if let Some(ref m) = self.metrics {
                m.errors.inc();
            }
            self.hooks.report(&err);
        }
        for ack in acks {
            let _ = ack.try_send(());
        }
    }
}

/// Publishes the queue depth until the worker exits.
struct Sampler {
    gauge: Arc<dyn Gauge>,
    receiver: Receiver<QueueItem>,
    done: Receiver<()>,
    state: Arc<AtomicU8>,
    interval: Duration,
}

impl Sampler {
    fn run(self) {
        loop {
            select! {
                recv(self.done) -> _ => return,
                recv(after(self.interval)) -> _ => {
                    if self.state.load(Ordering::Acquire) == EngineState::Running as u8 {
                        self.gauge.set(self.receiver.len() as f64);
                    }
                }
            }
        }
    }
}
