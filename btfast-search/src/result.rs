//! `StrategyResult`: one row of the `strategy` list from spec §3 — the
//! seven named performance metrics a result file's header enumerates, in
//! their fixed order, followed by the parameter assignment that produced
//! them.

use btfast_core::params::Parameters;
use btfast_core::performance::Metrics;
use serde::{Deserialize, Serialize};

/// The fixed column order every result file, GA fitness ranking, and
/// validation gate agrees on.
pub const METRIC_COLUMNS: [&str; 7] = [
    "Ntrades",
    "AvgTicks",
    "WinPerc",
    "PftFactor",
    "NP/MDD",
    "Expectancy",
    "Z-score",
];

/// One candidate's performance metrics (the full ALL-subset `Metrics`, so
/// downstream validation gates can reach fields beyond the seven-column
/// header) plus the parameter assignment that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    pub metrics: Metrics,
    pub parameters: Parameters,
    /// Number of calendar days the backtest spans, needed by the
    /// selection/OOS gates' `ndays`-scaled thresholds.
    pub ndays: i64,
}

/// Which column of `StrategyResult` the genetic search ranks on and the
/// validation gates read by name. Default is `AvgTicks`, per spec §4.9.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitnessMetric {
    Ntrades,
    #[default]
    AvgTicks,
    WinPerc,
    PftFactor,
    NpOverMdd,
    Expectancy,
    ZScore,
}

impl FitnessMetric {
    pub fn column_name(&self) -> &'static str {
        match self {
            FitnessMetric::Ntrades => "Ntrades",
            FitnessMetric::AvgTicks => "AvgTicks",
            FitnessMetric::WinPerc => "WinPerc",
            FitnessMetric::PftFactor => "PftFactor",
            FitnessMetric::NpOverMdd => "NP/MDD",
            FitnessMetric::Expectancy => "Expectancy",
            FitnessMetric::ZScore => "Z-score",
        }
    }

    pub fn extract(&self, result: &StrategyResult) -> f64 {
        result.metric(self.column_name()).unwrap_or(0.0)
    }
}

impl StrategyResult {
    pub fn new(metrics: Metrics, parameters: Parameters, ndays: i64) -> Self {
        StrategyResult { metrics, parameters, ndays }
    }

    /// The seven header columns, in `METRIC_COLUMNS` order.
    pub fn header_row(&self) -> [f64; 7] {
        [
            self.metrics.ntrades as f64,
            self.metrics.avg_ticks,
            self.metrics.win_perc,
            self.metrics.profit_factor,
            self.metrics.netpl_maxdd,
            self.metrics.expectancy,
            self.metrics.zscore,
        ]
    }

    /// Look up a named metric by its `FitnessMetric`-style key, the GA's
    /// fitness function and the profitability/stability gates' common
    /// entry point.
    pub fn metric(&self, name: &str) -> Option<f64> {
        Some(match name {
            "Ntrades" => self.metrics.ntrades as f64,
            "AvgTicks" => self.metrics.avg_ticks,
            "WinPerc" => self.metrics.win_perc,
            "PftFactor" => self.metrics.profit_factor,
            "NP/MDD" => self.metrics.netpl_maxdd,
            "Expectancy" => self.metrics.expectancy,
            "Z-score" => self.metrics.zscore,
            "NetPL" => self.metrics.net_pl,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_row_matches_fixed_column_order() {
        let mut m = Metrics::default();
        m.ntrades = 10;
        m.avg_ticks = 5.0;
        m.win_perc = 60.0;
        m.profit_factor = 1.5;
        m.netpl_maxdd = 2.0;
        m.expectancy = 0.3;
        m.zscore = 1.1;
        let r = StrategyResult::new(m, Parameters::new(), 252);
        assert_eq!(r.header_row(), [10.0, 5.0, 60.0, 1.5, 2.0, 0.3, 1.1]);
    }

    #[test]
    fn metric_lookup_by_column_name() {
        let mut m = Metrics::default();
        m.avg_ticks = 7.0;
        let r = StrategyResult::new(m, Parameters::new(), 252);
        assert_eq!(r.metric("AvgTicks"), Some(7.0));
        assert_eq!(r.metric("bogus"), None);
    }

    #[test]
    fn fitness_metric_default_is_avg_ticks() {
        assert_eq!(FitnessMetric::default(), FitnessMetric::AvgTicks);
    }

    #[test]
    fn fitness_metric_extracts_matching_column() {
        let mut m = Metrics::default();
        m.profit_factor = 1.8;
        let r = StrategyResult::new(m, Parameters::new(), 252);
        assert_eq!(FitnessMetric::PftFactor.extract(&r), 1.8);
    }
}
