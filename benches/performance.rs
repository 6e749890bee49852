//! Benchmarks for the hot per-tick path: indicator snapshots and a full
//! tracker analysis over realistic candle counts.

use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bos_trader::indicators::{IndicatorConfig, IndicatorSnapshot};
use bos_trader::strategies::{BosConfig, StructureTracker};
use bos_trader::types::Candle;

fn synthetic_candles(count: usize) -> Vec<Candle> {
    let start = Utc::now() - Duration::hours(count as i64);
    (0..count)
        .map(|i| {
            let wave = ((i % 20) as f64 - 10.0).abs();
            let drift = i as f64 * 0.05;
            let price = 100.0 + wave + drift;
            Candle {
                datetime: start + Duration::hours(i as i64),
                open: price - 0.2,
                high: price + 0.6,
                low: price - 0.6,
                close: price,
                volume: 1000.0 + (i % 7) as f64 * 100.0,
            }
        })
        .collect()
}

fn bench_indicator_snapshot(c: &mut Criterion) {
    let candles = synthetic_candles(400);
    let config = IndicatorConfig::default();

    c.bench_function("indicator_snapshot_400", |b| {
        b.iter(|| IndicatorSnapshot::compute(black_box(&candles), black_box(&config)))
    });
}

fn bench_tracker_analyze(c: &mut Criterion) {
    let higher = synthetic_candles(400);
    let lower = synthetic_candles(400);
    let config = BosConfig::default();

    c.bench_function("tracker_analyze_400", |b| {
        b.iter(|| {
            let mut tracker = StructureTracker::new(config.clone());
            tracker.analyze(black_box(&higher), black_box(&lower))
        })
    });
}

criterion_group!(benches, bench_indicator_snapshot, bench_tracker_analyze);
criterion_main!(benches);
