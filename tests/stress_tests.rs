//! Stress tests for concurrent delivery
//!
//! These tests verify:
//! - No record is lost or reordered per producer when the queue never overflows
//! - Blocking backpressure delivers everything when the writer keeps up
//! - Drop accounting stays exact under heavy overflow
//! - Flush and log can race without deadlocking

use rust_log_targets::core::hooks::drop_all;
use rust_log_targets::core::MemoryCollector;
use rust_log_targets::formatters::PlainFormatter;
use rust_log_targets::prelude::*;
use rust_log_targets::targets::{Buffer, FileTarget};
use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn plain_target(logr: &Logr, buf: &Buffer, name: &str, max_queued: usize) {
    logr.add_target(
        WriterTarget::new(buf.clone()),
        name,
        Some(Arc::new(StdFilter::new(Level::INFO, Level::PANIC))),
        Some(Arc::new(
            PlainFormatter::new()
                .without_timestamp()
                .without_level()
                .without_fields(),
        )),
        max_queued,
    )
    .unwrap();
}

fn spawn_producers(logr: &Logr) {
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let logger = logr.new_logger();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    logger.info(format!("{}:{}", t, i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("producer panicked");
    }
}

/// Every producer's records arrive complete and in the order it sent them.
fn assert_per_producer_order(output: &str) {
    let mut next: HashMap<usize, usize> = HashMap::new();
    for line in output.lines() {
        let (t, i) = line.split_once(':').expect("malformed line");
        let t: usize = t.parse().unwrap();
        let i: usize = i.parse().unwrap();
        let expected = next.entry(t).or_insert(0);
        assert_eq!(i, *expected, "producer {} out of order", t);
        *expected += 1;
    }
    assert_eq!(next.len(), THREADS);
    assert!(next.values().all(|&n| n == PER_THREAD));
}

#[test]
fn test_large_queue_keeps_everything_in_order() {
    let logr = Logr::new();
    let buf = Buffer::new();
    plain_target(&logr, &buf, "large", THREADS * PER_THREAD);

    spawn_producers(&logr);
    logr.shutdown().expect("shutdown failed");

    assert_per_producer_order(&buf.to_string());
}

#[test]
fn test_small_queue_blocks_without_loss() {
    let collector = Arc::new(MemoryCollector::new());
    let logr = Logr::builder()
        .enqueue_timeout(Duration::from_secs(30))
        .metrics_collector(collector.clone())
        .build();
    let buf = Buffer::new();
    plain_target(&logr, &buf, "small", 4);

    spawn_producers(&logr);
    logr.shutdown().expect("shutdown failed");

    assert_per_producer_order(&buf.to_string());
    let snapshot = collector.snapshot("small").unwrap();
    assert_eq!(snapshot.logged, (THREADS * PER_THREAD) as f64);
    assert_eq!(snapshot.dropped, 0.0);
}

#[test]
fn test_drop_accounting_is_exact() {
    let collector = Arc::new(MemoryCollector::new());
    let logr = Logr::builder()
        .on_target_queue_full(drop_all())
        .metrics_collector(collector.clone())
        .build();
    let buf = Buffer::new();
    plain_target(&logr, &buf, "lossy", 2);

    spawn_producers(&logr);
    logr.shutdown().expect("shutdown failed");

    let snapshot = collector.snapshot("lossy").unwrap();
    let written = buf.to_string().lines().count() as f64;
    assert_eq!(snapshot.logged, written);
    assert_eq!(snapshot.logged + snapshot.dropped, (THREADS * PER_THREAD) as f64);
    assert_eq!(snapshot.blocked, 0.0);
}

#[test]
fn test_flush_races_with_producers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("race.log");

    let logr = Logr::new();
    logr.add_target(
        FileTarget::file(&log_file).expect("Failed to create target"),
        "race",
        Some(Arc::new(StdFilter::new(Level::INFO, Level::PANIC))),
        Some(Arc::new(PlainFormatter::new())),
        64,
    )
    .unwrap();

    let flushes = Arc::new(AtomicUsize::new(0));
    let flusher = {
        let logr = logr.clone();
        let flushes = Arc::clone(&flushes);
        thread::spawn(move || {
            for _ in 0..50 {
                logr.flush_with_timeout(Duration::from_secs(10))
                    .expect("flush failed");
                flushes.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    spawn_producers(&logr);
    flusher.join().expect("flusher panicked");
    assert_eq!(flushes.load(Ordering::Relaxed), 50);

    logr.flush().expect("final flush failed");
    let content = fs::read_to_string(&log_file).expect("Failed to read log file");
    assert_eq!(content.lines().count(), THREADS * PER_THREAD);
    logr.shutdown().unwrap();
}
