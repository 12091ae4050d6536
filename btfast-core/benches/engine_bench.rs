//! Criterion benchmark for the replay loop's hot path: one full single-
//! symbol backtest over a synthetic multi-year daily bar series.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use btfast_core::datafeed::InMemoryDataFeed;
use btfast_core::event::Event;
use btfast_core::instrument::Instrument;
use btfast_core::signal_handler::{PositionSizing, SignalHandler};
use btfast_core::strategy::examples::Breakout;
use btfast_core::strategy::Strategy;
use btfast_core::time::{DateTime, Time};
use btfast_core::{BTfast, EngineConfig};
use btfast_core::execution::ExecutionHandler;
use chrono::NaiveDate;

fn make_bars(n: usize, symbol: &Instrument) -> Vec<Event> {
    let base_date = NaiveDate::from_ymd_opt(2015, 1, 2).unwrap();
    (0..n as i64)
        .map(|i| {
            let close = 1800.0 + (i as f64 * 0.05).sin() * 40.0 + i as f64 * 0.02;
            Event::Bar {
                symbol: symbol.clone(),
                timestamp: DateTime::new(
                    base_date + chrono::Duration::days(i),
                    Time::from_hms_opt(17, 0, 0).unwrap(),
                ),
                timeframe: "D".to_string(),
                open: close - 1.0,
                high: close + 4.0,
                low: close - 4.0,
                close,
                volume: 1_000,
            }
        })
        .collect()
}

fn run_backtest(n: usize) {
    let symbol = Instrument::lookup("GC").unwrap();
    let mut strategy = Breakout::new("bench", symbol.clone(), "D", 500);
    let mut params: BTreeMap<String, i64> = BTreeMap::new();
    params.insert("fractN".to_string(), 3);
    params.insert("stop_ticks".to_string(), 200);
    strategy.set_parameter_values(&params).unwrap();

    let bars = make_bars(n, &symbol);
    let mut feed = InMemoryDataFeed::new(symbol, "D", bars);

    let mut engine = BTfast::new(
        EngineConfig::default(),
        &mut strategy,
        &mut feed,
        SignalHandler::new(PositionSizing::FixedSize { contracts: 1 }),
        ExecutionHandler::new(1, true),
        25_000.0,
    );
    engine.run().unwrap();
    black_box(engine.account().balance());
}

fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay_loop");
    for n in [500usize, 2_000, 8_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| run_backtest(n));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_replay);
criterion_main!(benches);
