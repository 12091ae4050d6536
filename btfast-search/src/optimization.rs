//! Exhaustive parameter sweeps (spec §4.7): enumerate the Cartesian
//! product of a parameter grid and run one independent `BTfast` engine per
//! assignment — parallel (rayon data-parallel) or serial with an
//! elapsed-time estimate from the first five iterations.

use std::time::Instant;

use btfast_core::datafeed::DataFeed;
use btfast_core::engine::{BTfast, EngineConfig};
use btfast_core::execution::ExecutionHandler;
use btfast_core::params::{cartesian_product, ParamRanges, Parameters};
use btfast_core::performance::compute_report;
use btfast_core::signal_handler::SignalHandler;
use btfast_core::strategy::Strategy;
use btfast_core::transaction::Transaction;
use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::result::StrategyResult;

/// Builds a fresh, independently-owned strategy instance for one worker —
/// the engine never shares a `Strategy`'s indicator state across runs.
pub type StrategyFactory<'a> = dyn Fn() -> Box<dyn Strategy> + Sync + 'a;

/// Builds a fresh sizing policy for one worker.
pub type SignalHandlerFactory<'a> = dyn Fn() -> SignalHandler + Sync + 'a;

/// Everything one backtest replay needs besides the datafeed and parameter
/// assignment. The datafeed is passed separately to each run function since
/// validation gates swap it out (a second in-sample/out-of-sample file, a
/// noise-perturbed wrapper) while everything else stays fixed.
#[derive(Clone, Copy)]
pub struct RunContext<'a> {
    pub strategy_factory: &'a StrategyFactory<'a>,
    pub signal_handler_factory: &'a SignalHandlerFactory<'a>,
    pub execution: ExecutionHandler,
    pub engine_config: EngineConfig,
    pub initial_balance: f64,
    /// Calendar days the datafeed spans, for `ndays`-scaled metrics and
    /// gates (spec §4.8, §4.10).
    pub ndays: i64,
}

/// One backtest's full output: the seven-column summary plus the closed
/// trade list, the latter needed by validation gates that look past the
/// summary (OOS consistency, year-by-year profitability).
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: StrategyResult,
    pub transactions: Vec<Transaction>,
}

/// Run one full replay of `parameters` against `datafeed`, with no state
/// shared with any other call: fresh strategy, fresh datafeed clone, fresh
/// account.
pub fn run_one(ctx: &RunContext, datafeed: &dyn DataFeed, parameters: &Parameters) -> Result<RunOutcome> {
    let mut strategy = (ctx.strategy_factory)();
    strategy.set_parameter_values(parameters)?;

    let mut feed = datafeed.clone_boxed();
    let signal_handler = (ctx.signal_handler_factory)();

    let mut engine = BTfast::new(
        ctx.engine_config,
        strategy.as_mut(),
        feed.as_mut(),
        signal_handler,
        ctx.execution,
        ctx.initial_balance,
    );
    engine.run()?;

    let transactions = engine.account().transactions().to_vec();
    let report = compute_report(ctx.initial_balance, ctx.ndays, &transactions);
    let result = StrategyResult::new(report.all, parameters.clone(), ctx.ndays);

    Ok(RunOutcome { result, transactions })
}

/// Enumerate `ranges`' Cartesian product and run every assignment in
/// parallel via rayon's data-parallel iterator. Each worker holds its own
/// `DataFeed` clone/`Account`/`PositionHandler`/`Strategy` instance — no
/// shared mutable state (spec §4.7). `datafeed` must be `Sync` since it's
/// read (via `clone_boxed`) from every worker thread concurrently.
pub fn run_exhaustive_parallel(
    ranges: &ParamRanges,
    ctx: &RunContext,
    datafeed: &(dyn DataFeed + Sync),
) -> Result<Vec<RunOutcome>> {
    let grid = cartesian_product(ranges);
    info!(total = grid.len(), "starting parallel exhaustive optimization");
    grid.par_iter().map(|params| run_one(ctx, datafeed, params)).collect()
}

/// Same semantics as [`run_exhaustive_parallel`], single-threaded, with an
/// elapsed-time estimate logged after the first five iterations.
pub fn run_exhaustive_serial(ranges: &ParamRanges, ctx: &RunContext, datafeed: &dyn DataFeed) -> Result<Vec<RunOutcome>> {
    let grid = cartesian_product(ranges);
    let total = grid.len();
    info!(total, "starting serial exhaustive optimization");

    let mut results = Vec::with_capacity(total);
    let start = Instant::now();

    for (i, params) in grid.iter().enumerate() {
        results.push(run_one(ctx, datafeed, params)?);

        let completed = i + 1;
        if completed == 5.min(total) {
            let elapsed = start.elapsed();
            let per_iteration = elapsed / completed as u32;
            let remaining = per_iteration * (total - completed) as u32;
            info!(
                completed,
                total,
                elapsed_secs = elapsed.as_secs_f64(),
                estimated_remaining_secs = remaining.as_secs_f64(),
                "serial optimization progress"
            );
        } else if completed % 100 == 0 || completed == total {
            info!(completed, total, "serial optimization progress");
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use btfast_core::datafeed::InMemoryDataFeed;
    use btfast_core::event::Event;
    use btfast_core::instrument::Instrument;
    use btfast_core::signal_handler::PositionSizing;
    use btfast_core::strategy::examples::Breakout;
    use btfast_core::time::{DateTime, Time};
    use chrono::NaiveDate;

    fn gc() -> Instrument {
        Instrument::lookup("GC").unwrap()
    }

    fn make_bars(n: usize) -> Vec<Event> {
        let base = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        (0..n as i64)
            .map(|i| {
                let close = 1800.0 + (i as f64 * 0.1).sin() * 30.0 + i as f64 * 0.05;
                Event::Bar {
                    symbol: gc(),
                    timestamp: DateTime::new(base + chrono::Duration::days(i), Time::from_hms_opt(17, 0, 0).unwrap()),
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

    fn ctx<'a>(strategy_factory: &'a StrategyFactory<'a>, handler_factory: &'a SignalHandlerFactory<'a>) -> RunContext<'a> {
        RunContext {
            strategy_factory,
            signal_handler_factory: handler_factory,
            execution: ExecutionHandler::new(1, true),
            engine_config: EngineConfig::default(),
            initial_balance: 25_000.0,
            ndays: 400,
        }
    }

    #[test]
    fn run_one_produces_a_result_with_matching_parameters() {
        let feed = InMemoryDataFeed::new(gc(), "D", make_bars(200));
        let strategy_factory: &StrategyFactory = &|| Box::new(Breakout::new("bt", gc(), "D", 500));
        let handler_factory: &SignalHandlerFactory =
            &|| SignalHandler::new(PositionSizing::FixedSize { contracts: 1 });
        let run_ctx = ctx(strategy_factory, handler_factory);

        let mut params = Parameters::new();
        params.insert("fractN".to_string(), 3);
        params.insert("stop_ticks".to_string(), 200);

        let outcome = run_one(&run_ctx, &feed, &params).unwrap();
        assert_eq!(outcome.result.parameters, params);
    }

    #[test]
    fn exhaustive_parallel_and_serial_agree_on_result_count() {
        let feed = InMemoryDataFeed::new(gc(), "D", make_bars(120));
        let strategy_factory: &StrategyFactory = &|| Box::new(Breakout::new("bt", gc(), "D", 500));
        let handler_factory: &SignalHandlerFactory =
            &|| SignalHandler::new(PositionSizing::FixedSize { contracts: 1 });
        let run_ctx = ctx(strategy_factory, handler_factory);

        let ranges: ParamRanges = vec![
            ("fractN".to_string(), vec![1, 2, 3]),
            ("stop_ticks".to_string(), vec![100, 200]),
        ];

        let parallel = run_exhaustive_parallel(&ranges, &run_ctx, &feed).unwrap();
        let serial = run_exhaustive_serial(&ranges, &run_ctx, &feed).unwrap();
        assert_eq!(parallel.len(), 6);
        assert_eq!(serial.len(), 6);
    }
}
