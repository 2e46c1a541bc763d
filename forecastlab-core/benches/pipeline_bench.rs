//! Criterion benchmarks for pipeline hot paths.
//!
//! Benchmarks:
//! 1. Exponentially weighted statistics over long series
//! 2. Robust volatility (EW std plus rolling-quantile floor)
//! 3. A cold full pipeline run: portfolio P&L across several instruments

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use forecastlab_core::rules::CarryParams;
use forecastlab_core::series::calendar::business_days_from;
use forecastlab_core::volatility::{robust_vol_calc, VolConfig};
use forecastlab_core::{standard_stages, ConfigBuilder, InMemoryData, System, TimeSeries, TradingRule};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_series(n: usize, phase: f64) -> TimeSeries {
    let start = chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let index = business_days_from(start).take(n).collect();
    let values = (0..n)
        .map(|i| {
            let t = i as f64 + phase;
            100.0 + 0.01 * t + 5.0 * (t * 0.013).sin() + (t * 0.31).cos()
        })
        .collect();
    TimeSeries::new(index, values).unwrap()
}

fn make_system(instruments: &[String], n: usize) -> System {
    let config = ConfigBuilder::new()
        .instruments(instruments.iter().cloned())
        .rule("ewmac8", TradingRule::ewmac(8, Some(32)))
        .rule("ewmac32", TradingRule::ewmac(32, Some(128)))
        .rule("carry", TradingRule::carry(CarryParams::default()))
        .forecast_scalar("ewmac8", 5.3)
        .forecast_scalar("ewmac32", 2.65)
        .forecast_scalar("carry", 30.0)
        .build()
        .unwrap();
    let data = instruments
        .iter()
        .enumerate()
        .fold(InMemoryData::new(), |data, (i, code)| {
            let carry = make_series(n, i as f64).map(|p| (p - 100.0) * 0.001);
            data.with_prices(code.as_str(), make_series(n, i as f64 * 97.0))
                .with_carry(code.as_str(), carry)
        });
    System::new(standard_stages(), Arc::new(data), config).unwrap()
}

// ── 1. EW statistics ─────────────────────────────────────────────────

fn bench_ewm(c: &mut Criterion) {
    let mut group = c.benchmark_group("ewm");
    for n in [1_000, 10_000] {
        let s = make_series(n, 0.0);
        group.bench_with_input(BenchmarkId::new("ewma_span_64", n), &s, |b, s| {
            b.iter(|| black_box(s.ewma(64)))
        });
        group.bench_with_input(BenchmarkId::new("ewm_std_span_35", n), &s, |b, s| {
            b.iter(|| black_box(s.ewm_std(35, 10)))
        });
    }
    group.finish();
}

// ── 2. Robust volatility ─────────────────────────────────────────────

fn bench_robust_vol(c: &mut Criterion) {
    let returns = make_series(5_000, 0.0).diff();
    let config = VolConfig::default();
    c.bench_function("robust_vol_5000", |b| {
        b.iter(|| black_box(robust_vol_calc(&returns, &config)))
    });
}

// ── 3. Full pipeline ─────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    group.sample_size(20);
    for count in [1usize, 4] {
        let instruments: Vec<String> = (0..count).map(|i| format!("I{i}")).collect();
        group.bench_with_input(
            BenchmarkId::new("portfolio_pandl_2500d", count),
            &instruments,
            |b, instruments| {
                b.iter(|| {
                    let system = make_system(instruments, 2_500);
                    black_box(system.portfolio_pandl().unwrap())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_ewm, bench_robust_vol, bench_pipeline);
criterion_main!(benches);
