//! Criterion benchmarks for the Indicator Kernel hot paths.
//!
//! 1. Full kernel pass (PLdot + envelope + market state + patterns) at
//!    increasing bar counts.
//! 2. Timeframe Bundle as-of lookups against a large series.

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::config::KernelConfig;
use trendlab_core::domain::{Bar, Interval};
use trendlab_core::indicators;

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 5.0;
            Bar {
                symbol: "BENCH".to_string(),
                interval: Interval::M5,
                timestamp: base + chrono::Duration::minutes(5 * i as i64),
                open: close - 0.3,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000.0,
                is_provisional: false,
            }
        })
        .collect()
}

fn bench_kernel_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_pass");
    let cfg = KernelConfig::default();

    for &bar_count in &[500usize, 2_000, 10_000] {
        let bars = make_bars(bar_count);
        group.bench_with_input(BenchmarkId::new("full_pipeline", bar_count), &bar_count, |b, _| {
            b.iter(|| indicators::run(black_box(&bars), black_box(&cfg)));
        });
    }

    group.finish();
}

fn bench_bundle_as_of(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_as_of_lookup");
    let cfg = KernelConfig::default();
    let bars = make_bars(10_000);
    let as_of = bars[5_000].timestamp;
    let bundle = TimeframeBundle::build(bars, &cfg);

    group.bench_function("state_at_midpoint", |b| {
        b.iter(|| black_box(bundle.state_at(black_box(as_of))));
    });

    group.finish();
}

criterion_group!(benches, bench_kernel_pass, bench_bundle_as_of);
criterion_main!(benches);
