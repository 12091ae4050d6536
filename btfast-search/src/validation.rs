//! The six-stage validation pipeline (spec §4.10): a purely compositional
//! chain, each step a `list<Candidate> -> list<Candidate>` filter. The
//! caller wires the stages in order; each one's survivors feed the next.

use rand::rngs::StdRng;
use rand::Rng;

use btfast_core::datafeed::DataFeed;
use btfast_core::error::Result as CoreResult;
use btfast_core::event::Event;
use btfast_core::instrument::Instrument;
use btfast_core::performance::year_avg_ticks;
use btfast_core::rng::RngHierarchy;
use btfast_core::transaction::Transaction;

use crate::error::{Result, SearchError};
use crate::optimization::{run_one, RunContext, RunOutcome};
use crate::result::{FitnessMetric, StrategyResult};
use crate::stats::{mann_whitney_u, mean, stdev};

/// A surviving strategy as it moves through the pipeline: its in-sample
/// outcome, plus an out-of-sample outcome once the OOS gate has run.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub is_outcome: RunOutcome,
    pub oos_outcome: Option<RunOutcome>,
}

impl Candidate {
    pub fn new(is_outcome: RunOutcome) -> Self {
        Candidate { is_outcome, oos_outcome: None }
    }

    pub fn result(&self) -> &StrategyResult {
        &self.is_outcome.result
    }
}

/// Step 1: require all six thresholds of spec §4.10.1.
pub fn selection_gate(candidates: &[Candidate]) -> Vec<Candidate> {
    candidates.iter().filter(|c| passes_selection(c.result())).cloned().collect()
}

fn passes_selection(result: &StrategyResult) -> bool {
    let m = &result.metrics;
    let min_trades = 20.0 * (result.ndays as f64 / 252.0);
    m.ntrades as f64 > min_trades
        && m.avg_ticks > 12.0
        && m.netpl_maxdd > 4.0
        && m.profit_factor > 1.2
        && m.expectancy > 0.1
        && m.zscore > 2.0
}

/// Step 2: re-run each survivor's parameters against an out-of-sample
/// datafeed and require trade-frequency/profitability/consistency ratios
/// plus a 75% profitable-years bar across the combined IS+OOS span.
pub fn oos_metrics_gate(candidates: &[Candidate], ctx: &RunContext, oos_datafeed: &dyn DataFeed) -> Result<Vec<Candidate>> {
    let mut survivors = Vec::with_capacity(candidates.len());
    for c in candidates {
        let oos_outcome = run_one(ctx, oos_datafeed, &c.is_outcome.result.parameters)?;
        if passes_oos_metrics(&c.is_outcome, &oos_outcome) {
            survivors.push(Candidate { is_outcome: c.is_outcome.clone(), oos_outcome: Some(oos_outcome) });
        }
    }
    Ok(survivors)
}

fn trades_per_day(outcome: &RunOutcome) -> f64 {
    outcome.result.metrics.ntrades as f64 / (outcome.result.ndays.max(1) as f64)
}

fn passes_oos_metrics(is: &RunOutcome, oos: &RunOutcome) -> bool {
    let is_tpd = trades_per_day(is);
    let oos_tpd = trades_per_day(oos);
    let tpd_ratio_ok = is_tpd > 0.0 && oos_tpd >= 0.3 * is_tpd && oos_tpd <= 3.0 * is_tpd;

    let is_m = &is.result.metrics;
    let oos_m = &oos.result.metrics;
    let net_pl_ok = oos_m.net_pl > 0.0;
    let avg_ticks_ok = oos_m.avg_ticks >= 0.5 * is_m.avg_ticks;
    let maxdd_ok = oos_m.netpl_maxdd >= 0.5 * is_m.netpl_maxdd;

    let combined: Vec<Transaction> = is.transactions.iter().chain(oos.transactions.iter()).cloned().collect();
    let year_ticks = year_avg_ticks(&combined);
    let profitable_years = year_ticks.values().filter(|&&t| t >= 6.0).count();
    let years_ok = !year_ticks.is_empty() && (profitable_years as f64 / year_ticks.len() as f64) >= 0.75;

    tpd_ratio_ok && net_pl_ok && avg_ticks_ok && maxdd_ok && years_ok
}

/// Step 3: Mann-Whitney U two-sided p-value on per-trade ticks between IS
/// and OOS must be >= 0.05 (distributions not significantly different).
pub fn oos_consistency_gate(candidates: &[Candidate]) -> Vec<Candidate> {
    candidates
        .iter()
        .filter(|c| {
            let Some(oos) = &c.oos_outcome else { return false };
            let is_ticks: Vec<f64> = c.is_outcome.transactions.iter().map(|t| t.ticks()).collect();
            let oos_ticks: Vec<f64> = oos.transactions.iter().map(|t| t.ticks()).collect();
            matches!(mann_whitney_u(&is_ticks, &oos_ticks), Some(r) if r.p_value >= 0.05)
        })
        .cloned()
        .collect()
}

/// Step 4: vary `fraction_param` across `fraction_range` and require at
/// least 80% of the runs to clear `transaction_cost_ticks` avg_ticks.
pub fn profitability_sweep_gate(
    candidates: &[Candidate],
    ctx: &RunContext,
    datafeed: &dyn DataFeed,
    fraction_param: &str,
    fraction_range: &[i64],
    transaction_cost_ticks: f64,
) -> Result<Vec<Candidate>> {
    if fraction_range.is_empty() {
        return Err(SearchError::Configuration("profitability sweep range is empty".to_string()));
    }

    let mut survivors = Vec::with_capacity(candidates.len());
    for c in candidates {
        let mut passed = 0usize;
        for &value in fraction_range {
            let mut params = c.is_outcome.result.parameters.clone();
            params.insert(fraction_param.to_string(), value);
            let outcome = run_one(ctx, datafeed, &params)?;
            if outcome.result.metrics.avg_ticks > transaction_cost_ticks {
                passed += 1;
            }
        }
        if (passed as f64 / fraction_range.len() as f64) >= 0.8 {
            survivors.push(c.clone());
        }
    }
    Ok(survivors)
}

/// `epsilon` in {-2,-1,0,1,2} denotes {-10%,-5%,0%,+5%,+10%} perturbations
/// on a fraction parameter (spec §4.10.5).
pub fn epsilon_multiplier(epsilon: i32) -> f64 {
    1.0 + epsilon as f64 * 0.05
}

/// `min(values) >= (1 - max_variation) * max(values)`, per the worked
/// example in spec §8 scenario 6.
pub fn passes_stability(metric_values: &[f64], max_variation: f64) -> bool {
    if metric_values.is_empty() {
        return false;
    }
    let min = metric_values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = metric_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == 0.0 {
        return false;
    }
    min >= (1.0 - max_variation) * max
}

/// Step 5: sweep `fraction_param` over the five `epsilon_multiplier`
/// perturbations and require the fitness metric to stay within
/// `max_variation` of its own range (default 0.3, per spec).
pub fn stability_gate(
    candidates: &[Candidate],
    ctx: &RunContext,
    datafeed: &dyn DataFeed,
    fraction_param: &str,
    fitness_metric: FitnessMetric,
    max_variation: f64,
) -> Result<Vec<Candidate>> {
    const EPSILONS: [i32; 5] = [-2, -1, 0, 1, 2];

    let mut survivors = Vec::with_capacity(candidates.len());
    for c in candidates {
        let base_value = *c
            .is_outcome
            .result
            .parameters
            .get(fraction_param)
            .ok_or_else(|| SearchError::Configuration(format!("unknown parameter: {fraction_param}")))?;

        let mut metric_values = Vec::with_capacity(EPSILONS.len());
        for eps in EPSILONS {
            let perturbed = ((base_value as f64 * epsilon_multiplier(eps)).round() as i64).max(1);
            let mut params = c.is_outcome.result.parameters.clone();
            params.insert(fraction_param.to_string(), perturbed);
            let outcome = run_one(ctx, datafeed, &params)?;
            metric_values.push(fitness_metric.extract(&outcome.result));
        }

        if passes_stability(&metric_values, max_variation) {
            survivors.push(c.clone());
        }
    }
    Ok(survivors)
}

/// Step 6: run `num_noise_tests` independent gaussian-OHLC-perturbed
/// replays and require the unperturbed metric to lie within the noised
/// distribution's `mean +/- 2*stdev`.
pub fn noise_gate(
    candidates: &[Candidate],
    ctx: &RunContext,
    datafeed: &dyn DataFeed,
    rng_hierarchy: &RngHierarchy,
    num_noise_tests: usize,
    noise_std_fraction: f64,
    fitness_metric: FitnessMetric,
) -> Result<Vec<Candidate>> {
    let mut survivors = Vec::with_capacity(candidates.len());
    for c in candidates {
        let unperturbed = fitness_metric.extract(c.result());

        let mut noised = Vec::with_capacity(num_noise_tests);
        for i in 0..num_noise_tests {
            let rng = rng_hierarchy.rng_for("noise", i as u64);
            let noisy_feed = NoiseDataFeed::new(datafeed.clone_boxed(), noise_std_fraction, rng);
            let outcome = run_one(ctx, &noisy_feed, &c.is_outcome.result.parameters)?;
            noised.push(fitness_metric.extract(&outcome.result));
        }

        let m = mean(&noised);
        let sd = stdev(&noised);
        if unperturbed >= m - 2.0 * sd && unperturbed <= m + 2.0 * sd {
            survivors.push(c.clone());
        }
    }
    Ok(survivors)
}

/// Wraps a datafeed, adding independent gaussian noise to each bar's OHLC
/// before delivery and re-establishing `low <= {open,close} <= high`
/// (spec §4.7's "random noise mode").
pub struct NoiseDataFeed {
    inner: Box<dyn DataFeed>,
    std_fraction: f64,
    rng: StdRng,
}

impl NoiseDataFeed {
    pub fn new(inner: Box<dyn DataFeed>, std_fraction: f64, rng: StdRng) -> Self {
        NoiseDataFeed { inner, std_fraction, rng }
    }
}

impl Clone for NoiseDataFeed {
    fn clone(&self) -> Self {
        NoiseDataFeed {
            inner: self.inner.clone_boxed(),
            std_fraction: self.std_fraction,
            rng: self.rng.clone(),
        }
    }
}

/// Box-Muller transform, the same construction the corpus' other
/// Monte-Carlo cost sampler uses for its normal distribution.
fn sample_gaussian(mean: f64, std_dev: f64, rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}

impl DataFeed for NoiseDataFeed {
    fn symbol(&self) -> &Instrument {
        self.inner.symbol()
    }

    fn timeframe(&self) -> &str {
        self.inner.timeframe()
    }

    fn continue_parsing(&self) -> bool {
        self.inner.continue_parsing()
    }

    fn reset_cursor(&mut self) {
        self.inner.reset_cursor();
    }

    fn stream_next_bar(&mut self) -> CoreResult<Option<Event>> {
        let Some(mut bar) = self.inner.stream_next_bar()? else {
            return Ok(None);
        };
        if let Event::Bar { open, high, low, close, .. } = &bar {
            let sigma = self.std_fraction * close.abs().max(1e-9);
            let new_open = open + sample_gaussian(0.0, sigma, &mut self.rng);
            let new_high = high + sample_gaussian(0.0, sigma, &mut self.rng);
            let new_low = low + sample_gaussian(0.0, sigma, &mut self.rng);
            let new_close = close + sample_gaussian(0.0, sigma, &mut self.rng);
            bar.reorder_ohlc(new_open, new_high, new_low, new_close);
        }
        Ok(Some(bar))
    }

    fn clone_boxed(&self) -> Box<dyn DataFeed> {
        Box::new(self.clone())
    }
}
