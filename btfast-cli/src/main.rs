//! btfast — a thin binary demonstrating a single backtest replay and its
//! performance report. Not the XML-driven front end of the original engine:
//! settings come from a TOML `BacktestConfig` document and the only data
//! format recognized is the minimal CSV layout `parse_csv_row` already
//! parses for test fixtures (spec §6).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use tracing::info;

use btfast_core::config::BacktestConfig;
use btfast_core::datafeed::{parse_csv_row, InMemoryDataFeed};
use btfast_core::engine::{BTfast, EngineConfig};
use btfast_core::event::Event;
use btfast_core::execution::ExecutionHandler;
use btfast_core::instrument::Instrument;
use btfast_core::performance::{compute_report, Metrics, PerformanceReport};
use btfast_core::signal_handler::SignalHandler;
use btfast_core::strategy::examples::Breakout;
use btfast_core::strategy::Strategy;

#[derive(Parser)]
#[command(name = "btfast")]
#[command(author, version, about = "Run a single backtest and print its performance report", long_about = None)]
struct Cli {
    /// Path to a BacktestConfig TOML settings document (spec §6).
    #[arg(short, long)]
    config: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = BacktestConfig::load(&cli.config).with_context(|| format!("loading {}", cli.config.display()))?;

    let symbol = Instrument::lookup(&cfg.symbol_name)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("unknown symbol: {}", cfg.symbol_name))?;

    let bars = load_bars(&cfg, &symbol)?;
    info!(nbars = bars.len(), symbol = %symbol.name, "loaded bars");

    let mut feed = InMemoryDataFeed::new(symbol.clone(), cfg.timeframe.clone(), bars);
    let mut strategy = Breakout::new(
        cfg.strategy_name.clone(),
        symbol,
        cfg.timeframe.clone(),
        cfg.max_bars_back as usize,
    );

    let signal_handler = SignalHandler::new(cfg.position_sizing());
    let execution = ExecutionHandler::new(cfg.slippage, cfg.include_commissions);
    let engine_config = EngineConfig {
        max_bars_back: cfg.max_bars_back as usize,
        make_new_entry: true,
    };

    let mut engine = BTfast::new(
        engine_config,
        &mut strategy,
        &mut feed,
        signal_handler,
        execution,
        cfg.initial_balance,
    );
    engine.run().map_err(|e| anyhow::anyhow!("{e}"))?;

    let ndays = ndays_between(&cfg.start_date, &cfg.end_date)?;
    let report = compute_report(cfg.initial_balance, ndays, engine.account().transactions());

    if cfg.print_trade_list {
        for t in engine.account().transactions() {
            println!(
                "{} {} {:?} qty={} entry={:.2}@{} exit={:.2}@{} net_pl={:.2}",
                t.ticket, t.strategy_name, t.side, t.quantity, t.entry_price, t.entry_time, t.exit_price, t.exit_time, t.net_pl
            );
        }
    }

    if cfg.print_performance_report {
        print_report(&report);
    }

    Ok(())
}

/// Load the configured CSV data file into a plain bar vector, skipping the
/// header line (spec §6: "header line skipped"). A concrete streaming
/// reader is out of scope; this is the thin CLI's own glue over the
/// row-level parser the library already exposes for test fixtures.
fn load_bars(cfg: &BacktestConfig, symbol: &Instrument) -> Result<Vec<Event>> {
    let path = std::path::Path::new(&cfg.data_dir).join(&cfg.data_file);
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;

    text.lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .map(|line| {
            parse_csv_row(line, cfg.csv_format.0, symbol, &cfg.timeframe).map_err(|e| anyhow::anyhow!("{e}"))
        })
        .collect()
}

fn ndays_between(start: &str, end: &str) -> Result<i64> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").with_context(|| format!("invalid start_date: {start}"))?;
    let end = NaiveDate::parse_from_str(end, "%Y-%m-%d").with_context(|| format!("invalid end_date: {end}"))?;
    Ok((end - start).num_days().max(1))
}

fn print_report(report: &PerformanceReport) {
    println!("{:<12} {:>10} {:>10} {:>10}", "metric", "all", "long", "short");
    print_row("ntrades", report.all.ntrades as f64, report.long.ntrades as f64, report.short.ntrades as f64);
    print_metric_row("net_pl", report);
    print_metric_row("avg_ticks", report);
    print_metric_row("win_perc", report);
    print_metric_row("profit_factor", report);
    print_metric_row("expectancy", report);
    print_metric_row("max_dd", report);
    print_metric_row("netpl_maxdd", report);
    print_metric_row("mar", report);
    print_metric_row("cagr", report);
    print_metric_row("zscore", report);
}

fn print_row(name: &str, all: f64, long: f64, short: f64) {
    println!("{name:<12} {all:>10.2} {long:>10.2} {short:>10.2}");
}

fn print_metric_row(name: &str, report: &PerformanceReport) {
    let (all, long, short) = (field(&report.all, name), field(&report.long, name), field(&report.short, name));
    print_row(name, all, long, short);
}

fn field(m: &Metrics, name: &str) -> f64 {
    match name {
        "net_pl" => m.net_pl,
        "avg_ticks" => m.avg_ticks,
        "win_perc" => m.win_perc,
        "profit_factor" => m.profit_factor,
        "expectancy" => m.expectancy,
        "max_dd" => m.max_dd,
        "netpl_maxdd" => m.netpl_maxdd,
        "mar" => m.mar,
        "cagr" => m.cagr,
        "zscore" => m.zscore,
        _ => 0.0,
    }
}
