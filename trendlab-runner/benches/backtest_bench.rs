//! Criterion benchmarks for the event-loop Backtester.
//!
//! 1. Full walk-forward run over a single symbol at increasing bar counts.
//! 2. Coordinator analysis latency in isolation (the per-tick hot path the
//!    Scheduler fans out across symbols).

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use trendlab_core::bundle::TimeframeBundle;
use trendlab_core::config::KernelConfig;
use trendlab_core::domain::{Bar, Interval, RunId};
use trendlab_runner::backtest::{Backtester, SymbolSeries};
use trendlab_runner::config::{BacktestConfig, CoordinatorConfig, SignalConfig};
use trendlab_runner::coordinator::Coordinator;

fn make_bars(n: usize, interval: Interval) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 9, 30, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.03).sin() * 6.0 + i as f64 * 0.01;
            Bar {
                symbol: "BENCH".to_string(),
                interval,
                timestamp: base + interval.duration() * i as i32,
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

fn bench_backtest_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest_run");

    for &bar_count in &[500usize, 2_000] {
        let series = vec![SymbolSeries {
            symbol: "BENCH".to_string(),
            htf_interval: Interval::H1,
            htf_bars: make_bars(bar_count / 12 + 30, Interval::H1),
            ttf_interval: Interval::M5,
            ttf_bars: make_bars(bar_count, Interval::M5),
        }];
        let backtester = Backtester::new(BacktestConfig::default(), CoordinatorConfig::default(), SignalConfig::default(), KernelConfig::default());

        group.bench_with_input(BenchmarkId::new("single_symbol", bar_count), &bar_count, |b, _| {
            b.iter(|| backtester.run(RunId(0), trendlab_core::domain::BacktestId(0), "bench", black_box(&series)));
        });
    }

    group.finish();
}

fn bench_coordinator_analyze(c: &mut Criterion) {
    let cfg = KernelConfig::default();
    let htf_bundle = TimeframeBundle::build(make_bars(200, Interval::H1), &cfg);
    let ttf_bundle = TimeframeBundle::build(make_bars(2_000, Interval::M5), &cfg);
    let coordinator = Coordinator::new(CoordinatorConfig::default());
    let t = ttf_bundle.bars().last().unwrap().timestamp;

    c.bench_function("coordinator_analyze_single_tick", |b| {
        b.iter(|| coordinator.analyze("BENCH", Interval::H1, black_box(&htf_bundle), Interval::M5, black_box(&ttf_bundle), t, false));
    });
}

criterion_group!(benches, bench_backtest_run, bench_coordinator_analyze);
criterion_main!(benches);
