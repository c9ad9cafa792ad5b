//! Record formatting throughput.
//!
//! Run with: cargo bench --bench format_bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use kubelog::record::{format_record, now_iso, RecordFormatter};
use kubelog::sink::MemorySink;
use kubelog::{Logger, OutputStream, StreamKind};
use log::LevelFilter;
use serde_json::json;

fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");
    group.throughput(Throughput::Elements(1));
    let time = now_iso();
    let message = json!({"method": "GET", "path": "/healthz", "status": 200, "ms": 1.25});

    group.bench_function("format_record", |b| {
        b.iter(|| black_box(format_record(&time, "api", &message)))
    });

    let formatter = RecordFormatter::new("api");
    group.bench_function("pre_encoded_tag", |b| {
        b.iter(|| black_box(formatter.format(&time, &message)))
    });

    group.bench_function("text_message", |b| {
        b.iter(|| black_box(formatter.format(&time, "GET /healthz 200")))
    });
    group.finish();
}

fn bench_logger(c: &mut Criterion) {
    let mut group = c.benchmark_group("logger");
    group.throughput(Throughput::Elements(1));

    group.bench_function("info_with_filter", |b| {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LevelFilter::Info, "api", sink.clone());
        logger.add_filter(|mut msg, _| {
            msg["pod"] = json!("api-7d9f");
            Some(msg)
        });
        b.iter(|| {
            logger.info(&json!({"status": 200}));
            sink.take();
        })
    });

    group.bench_function("captured_write", |b| {
        let sink = Arc::new(MemorySink::new());
        let logger = Logger::with_sink(LevelFilter::Info, "STDOUT", sink.clone());
        let (stream, _buffer) = OutputStream::buffered("out", StreamKind::Output);
        logger.capture_writes(&stream);
        b.iter(|| {
            stream.write(black_box("request served\n"), None).ok();
            sink.take();
        })
    });
    group.finish();
}

criterion_group!(benches, bench_format, bench_logger);
criterion_main!(benches);
