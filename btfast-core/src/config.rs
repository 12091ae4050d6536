//! The single settings document (spec §6): one flat table of recognized
//! keys, loaded from TOML (the teacher's `toml` dependency) rather than the
//! original engine's XML-ish settings file. A concrete settings *parser*
//! beyond this struct (and the XML `ParamDoc` form) is out of scope; this
//! exists so `btfast-cli` has something real to read instead of hardcoding
//! every knob as a CLI flag.

use serde::{Deserialize, Serialize};

use crate::datafeed::CsvFormat;
use crate::error::{Error, Result};
use crate::signal_handler::PositionSizing;

/// Run mode, numbered exactly as the original engine's settings file
/// (spec §6): 0 no-trade, 1 backtest, 2 parallel-exhaustive, 22 genetic,
/// 222 serial-exhaustive, 3 single-strategy validation, 4/44/444/4444
/// factory variants (sequential/parallel/genetic/import), 6 market overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RunMode {
    NoTrade,
    Backtest,
    ParallelExhaustive,
    Genetic,
    SerialExhaustive,
    Validation,
    FactorySequential,
    FactoryParallel,
    FactoryGenetic,
    FactoryImport,
    MarketOverview,
}

impl TryFrom<i32> for RunMode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Ok(match value {
            0 => RunMode::NoTrade,
            1 => RunMode::Backtest,
            2 => RunMode::ParallelExhaustive,
            22 => RunMode::Genetic,
            222 => RunMode::SerialExhaustive,
            3 => RunMode::Validation,
            4 => RunMode::FactorySequential,
            44 => RunMode::FactoryParallel,
            444 => RunMode::FactoryGenetic,
            4444 => RunMode::FactoryImport,
            6 => RunMode::MarketOverview,
            other => return Err(Error::Configuration(format!("unrecognized run_mode: {other}"))),
        })
    }
}

impl From<RunMode> for i32 {
    fn from(mode: RunMode) -> i32 {
        match mode {
            RunMode::NoTrade => 0,
            RunMode::Backtest => 1,
            RunMode::ParallelExhaustive => 2,
            RunMode::Genetic => 22,
            RunMode::SerialExhaustive => 222,
            RunMode::Validation => 3,
            RunMode::FactorySequential => 4,
            RunMode::FactoryParallel => 44,
            RunMode::FactoryGenetic => 444,
            RunMode::FactoryImport => 4444,
            RunMode::MarketOverview => 6,
        }
    }
}

/// Which of the three historical CSV layouts `data_file` is in, numbered as
/// spec §6 describes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct CsvFormatSetting(pub CsvFormat);

impl TryFrom<i32> for CsvFormatSetting {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        Ok(CsvFormatSetting(match value {
            1 => CsvFormat::TradeStationIntraday,
            2 => CsvFormat::TradeStationDaily,
            3 => CsvFormat::MatLab,
            other => return Err(Error::Configuration(format!("unrecognized csv_format: {other}"))),
        }))
    }
}

impl From<CsvFormatSetting> for i32 {
    fn from(setting: CsvFormatSetting) -> i32 {
        match setting.0 {
            CsvFormat::TradeStationIntraday => 1,
            CsvFormat::TradeStationDaily => 2,
            CsvFormat::MatLab => 3,
        }
    }
}

fn default_fitness_metric() -> String {
    "AvgTicks".to_string()
}

fn default_population_size() -> i64 {
    20
}

fn default_generations() -> i64 {
    50
}

fn default_max_bars_back() -> i64 {
    500
}

fn default_num_contracts() -> i64 {
    1
}

fn default_max_variation_pct() -> f64 {
    30.0
}

fn default_num_noise_tests() -> i64 {
    20
}

/// The flat settings table of spec §6, minus the fields a concrete reader
/// would need (`main_dir`/`data_dir`/`data_file` are kept as plain strings;
/// resolving them to an actual filesystem datafeed is `btfast-cli`'s job,
/// not this struct's).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub main_dir: String,
    pub run_mode: RunMode,
    pub strategy_name: String,
    pub symbol_name: String,
    pub timeframe: String,
    pub start_date: String,
    pub end_date: String,
    pub data_dir: String,
    pub data_file: String,
    pub csv_format: CsvFormatSetting,
    pub datafeed_type: String,

    #[serde(default = "default_true")]
    pub print_progress: bool,
    #[serde(default = "default_true")]
    pub print_performance_report: bool,
    #[serde(default)]
    pub print_trade_list: bool,
    #[serde(default)]
    pub write_trades_to_file: bool,

    #[serde(default = "default_fitness_metric")]
    pub fitness_metric: String,
    #[serde(default = "default_population_size")]
    pub population_size: i64,
    #[serde(default = "default_generations")]
    pub generations: i64,
    #[serde(default = "default_max_bars_back")]
    pub max_bars_back: i64,

    pub initial_balance: f64,
    pub position_size_type: PositionSizeType,
    #[serde(default = "default_num_contracts")]
    pub num_contracts: i64,
    #[serde(default)]
    pub risk_fraction: f64,

    #[serde(default)]
    pub include_commissions: bool,
    #[serde(default)]
    pub slippage: i64,

    #[serde(default)]
    pub data_file_oos: String,
    #[serde(default = "default_max_variation_pct")]
    pub max_variation_pct: f64,
    #[serde(default = "default_num_noise_tests")]
    pub num_noise_tests: i64,
}

fn default_true() -> bool {
    true
}

/// Spec §6's `position_size_type` key, translated to [`PositionSizing`] via
/// [`BacktestConfig::position_sizing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSizeType {
    FixedSize,
    FixedFractional,
    FixedNotional,
}

impl BacktestConfig {
    /// Parse a settings document from its TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Configuration(format!("invalid config: {e}")))
    }

    /// Load and parse a settings document from disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Configuration(format!("cannot read {}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&text)
    }

    /// Resolve `position_size_type`/`num_contracts`/`risk_fraction` into the
    /// engine's [`PositionSizing`] policy.
    pub fn position_sizing(&self) -> PositionSizing {
        match self.position_size_type {
            PositionSizeType::FixedSize => PositionSizing::FixedSize { contracts: self.num_contracts },
            PositionSizeType::FixedFractional => PositionSizing::FixedFractional { risk_fraction: self.risk_fraction },
            PositionSizeType::FixedNotional => PositionSizing::FixedNotional { risk_fraction: self.risk_fraction },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
main_dir = "/data/btfast"
run_mode = 1
strategy_name = "breakout"
symbol_name = "GC"
timeframe = "D"
start_date = "2018-01-01"
end_date = "2023-12-31"
data_dir = "/data/btfast/gc"
data_file = "GC_daily.csv"
csv_format = 2
datafeed_type = "csv"
initial_balance = 50000.0
position_size_type = "fixed_fractional"
risk_fraction = 0.02
"#
    }

    #[test]
    fn parses_minimal_document_with_defaults() {
        let cfg = BacktestConfig::from_toml_str(sample_toml()).unwrap();
        assert_eq!(cfg.run_mode, RunMode::Backtest);
        assert_eq!(cfg.csv_format.0, CsvFormat::TradeStationDaily);
        assert_eq!(cfg.max_bars_back, 500);
        assert_eq!(cfg.fitness_metric, "AvgTicks");
        assert!(cfg.print_performance_report);
        assert_eq!(cfg.position_sizing(), PositionSizing::FixedFractional { risk_fraction: 0.02 });
    }

    #[test]
    fn rejects_unrecognized_run_mode() {
        let bad = sample_toml().replace("run_mode = 1", "run_mode = 99");
        assert!(BacktestConfig::from_toml_str(&bad).is_err());
    }

    #[test]
    fn run_mode_numbering_matches_spec() {
        assert_eq!(i32::from(RunMode::Genetic), 22);
        assert_eq!(i32::from(RunMode::SerialExhaustive), 222);
        assert_eq!(i32::from(RunMode::FactoryImport), 4444);
    }
}
