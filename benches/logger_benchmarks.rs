//! Criterion benchmarks for rust_log_targets

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_log_targets::core::hooks::drop_all;
use rust_log_targets::formatters::{JsonFormatter, PlainFormatter};
use rust_log_targets::prelude::*;
use std::io;
use std::sync::Arc;

fn logr_with_sink(builder: LogrBuilder, max_queued: usize, formatter: Arc<dyn Formatter>) -> Logr {
    let logr = builder.build();
    logr.add_target(
        WriterTarget::new(io::sink()),
        "sink",
        Some(Arc::new(StdFilter::new(Level::INFO, Level::PANIC))),
        Some(formatter),
        max_queued,
    )
    .expect("failed to add target");
    logr
}

// ============================================================================
// Formatting Benchmarks
// ============================================================================

fn bench_formatters(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");
    group.throughput(Throughput::Elements(1));

    let record = LogRecord::new(Level::INFO, "User logged in")
        .with_field("user_id", 12345)
        .with_field("ip", "192.168.1.1")
        .with_field("success", true);

    let plain = PlainFormatter::new();
    group.bench_function("plain", |b| {
        let mut buf = Vec::with_capacity(256);
        b.iter(|| {
            buf.clear();
            plain.format(black_box(&record), false, &mut buf).unwrap();
        });
    });

    let json = JsonFormatter::new();
    group.bench_function("json", |b| {
        let mut buf = Vec::with_capacity(256);
        b.iter(|| {
            buf.clear();
            json.format(black_box(&record), false, &mut buf).unwrap();
        });
    });

    group.finish();
}

// ============================================================================
// Enqueue Benchmarks
// ============================================================================

fn bench_enqueue(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue");
    group.throughput(Throughput::Elements(1));

    let logr = logr_with_sink(Logr::builder(), 10_000, Arc::new(PlainFormatter::new()));
    let logger = logr.new_logger();
    group.bench_function("blocking_policy", |b| {
        b.iter(|| logger.info(black_box("Benchmark message")));
    });

    let dropping = logr_with_sink(
        Logr::builder().on_target_queue_full(drop_all()),
        16,
        Arc::new(PlainFormatter::new()),
    );
    let logger = dropping.new_logger();
    group.bench_function("drop_policy_small_queue", |b| {
        b.iter(|| logger.info(black_box("Benchmark message")));
    });

    let logger = logr.new_logger().with_field("request_id", "abc-123");
    group.bench_function("with_fields", |b| {
        b.iter(|| logger.info(black_box("Benchmark message")));
    });

    group.bench_function("filtered_out", |b| {
        b.iter(|| logger.debug(black_box("Not delivered")));
    });

    group.finish();
    let _ = logr.shutdown();
    let _ = dropping.shutdown();
}

// ============================================================================
// Flush Benchmarks
// ============================================================================

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("flush");

    let logr = logr_with_sink(Logr::builder(), 1000, Arc::new(JsonFormatter::new()));
    let logger = logr.new_logger();
    group.bench_function("log_100_then_flush", |b| {
        b.iter(|| {
            for i in 0..100 {
                logger.info(format!("message {}", i));
            }
            logr.flush().unwrap();
        });
    });

    group.finish();
    let _ = logr.shutdown();
}

criterion_group!(benches, bench_formatters, bench_enqueue, bench_flush);
criterion_main!(benches);
