//! Benchmarks for the shape engine.
//!
//! Run with: cargo bench -p shapeforge-engine
//!
//! Key metrics:
//! - flat_events: per-record cost on flat, stable records
//! - nested_events: realistic nested records with arrays
//! - truncate_large: truncation cost on oversized values

use criterion::{
    BenchmarkId, Criterion, Throughput, black_box, criterion_group,
    criterion_main,
};
use serde_json::json;
use shapeforge_engine::{ShapeEngine, TruncationPolicy, truncate};

/// Flat record with stable keys.
fn make_flat_event(i: u64) -> serde_json::Value {
    json!({
        "id": i,
        "user_id": i % 100,
        "action": "click",
        "timestamp": 1_700_000_000 + i,
        "score": (i as f64) * 0.125,
    })
}

/// Nested record with arrays and mixed scalar types.
fn make_nested_event(i: u64) -> serde_json::Value {
    json!({
        "id": i,
        "kind": ["page", "click", "scroll"][(i % 3) as usize],
        "session": {
            "user": format!("user_{}", i % 100),
            "started_at": 1_700_000_000 + i,
            "tags": [format!("t{}", i % 7), "fixed", "common"],
        },
        "metrics": {
            "latency_ms": (i % 450) as f64 * 0.5,
            "retries": i % 4,
        },
    })
}

fn bench_observe(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe");
    let cases: [(&str, fn(u64) -> serde_json::Value); 2] =
        [("flat", make_flat_event), ("nested", make_nested_event)];
    for (name, make) in cases {
        let events: Vec<_> = (0..1_000u64).map(make).collect();
        group.throughput(Throughput::Elements(events.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(name),
            &events,
            |b, events| {
                b.iter(|| {
                    let mut engine = ShapeEngine::with_defaults();
                    for event in events {
                        black_box(engine.observe(event));
                    }
                    engine.finalize().unwrap()
                });
            },
        );
    }
    group.finish();
}

fn bench_truncate(c: &mut Criterion) {
    let policy = TruncationPolicy::default();
    let value = json!({
        "blob": "x".repeat(10_000),
        "xs": (0..1_000).collect::<Vec<i64>>(),
        "deep": {"a": {"b": {"c": {"d": 1}}}},
    });

    c.bench_function("truncate_large", |b| {
        b.iter(|| black_box(truncate(&value, &policy)));
    });
}

criterion_group!(benches, bench_observe, bench_truncate);
criterion_main!(benches);
