//! Derives the full performance metric set from a transaction list, split
//! into ALL/LONG/SHORT subsets, exactly as the original engine's report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::position::Side;
use crate::time::Date;
use crate::transaction::Transaction;

/// One subset's (ALL, LONG, or SHORT) computed metrics. Every field is zero
/// on an empty transaction list, per spec: "Performance metrics over an
/// empty transaction list yield all zeros."
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub ntrades: i64,
    pub nwins: i64,
    pub net_pl: f64,
    pub net_pl_pct: f64,
    pub avg_trade: f64,
    pub std_trade: f64,
    pub avg_ticks: f64,
    pub std_ticks: f64,
    pub avg_profit: f64,
    pub avg_loss: f64,
    pub max_profit: f64,
    pub max_loss: f64,
    pub win_perc: f64,
    pub bars_in_win: f64,
    pub bars_in_loss: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub cagr: f64,
    pub mar: f64,
    pub max_dd: f64,
    pub max_dd_pct: f64,
    pub avg_dd: f64,
    pub avg_dd_pct: f64,
    pub avg_dd_duration: f64,
    pub netpl_maxdd: f64,
    pub tsindex: f64,
    pub max_consec_win: i64,
    pub max_consec_loss: i64,
    pub rsquared: f64,
    pub zscore: f64,
    pub min_capital: f64,
    pub nyears: i64,
}

/// The ALL/LONG/SHORT triple produced by one backtest run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub all: Metrics,
    pub long: Metrics,
    pub short: Metrics,
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        0.0
    } else {
        xs.iter().sum::<f64>() / xs.len() as f64
    }
}

fn stdev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let sum_sq: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
    (sum_sq / (xs.len() as f64 - 1.0)).sqrt()
}

/// Compute the full metric set for `initial_balance`/`ndays` over one
/// transaction subset (already filtered to ALL, LONG, or SHORT).
pub fn compute_metrics(initial_balance: f64, ndays: i64, transactions: &[Transaction]) -> Metrics {
    let mut m = Metrics::default();

    let trades: Vec<&Transaction> = transactions.iter().filter(|t| t.quantity > 0).collect();
    m.ntrades = trades.len() as i64;
    if m.ntrades == 0 {
        return m;
    }

    let margin = trades[0].symbol.margin;
    let tick_value = trades[0].symbol.tick_value;

    let profits: Vec<f64> = trades.iter().map(|t| t.net_pl).collect();
    let dates: Vec<Date> = trades.iter().map(|t| t.exit_time.date()).collect();

    for t in &trades {
        if t.net_pl > 0.0 {
            m.bars_in_win += t.bars_in_trade as f64;
        } else if t.net_pl < 0.0 {
            m.bars_in_loss += t.bars_in_trade as f64;
        }
    }

    m.net_pl = profits.iter().sum();
    m.net_pl_pct = m.net_pl / initial_balance * 100.0;
    m.avg_trade = mean(&profits);
    m.std_trade = stdev(&profits);

    drawdown(&profits, &dates, initial_balance, &mut m);

    if m.nwins > 0 {
        m.bars_in_win /= m.nwins as f64;
        m.avg_profit = m.gross_profit / m.nwins as f64;
    }
    if m.ntrades > m.nwins {
        let nlosses = (m.ntrades - m.nwins) as f64;
        m.bars_in_loss /= nlosses;
        m.avg_loss = m.gross_loss / nlosses;
    }

    avgticks(&profits, &trades, tick_value, &mut m);

    m.win_perc = m.nwins as f64 / m.ntrades as f64 * 100.0;

    if m.std_trade > 0.0 && m.ntrades >= 30 {
        m.zscore = (m.ntrades as f64).sqrt() * m.avg_trade / m.std_trade;
    }

    if m.gross_loss != 0.0 {
        m.profit_factor = m.gross_profit / m.gross_loss.abs();
    }
    if m.avg_loss < 0.0 {
        m.expectancy = (m.avg_profit * m.win_perc / 100.0 - m.avg_loss.abs() * (1.0 - m.win_perc / 100.0))
            / m.avg_loss.abs();
    }
    if m.max_dd != 0.0 {
        m.netpl_maxdd = m.net_pl / m.max_dd.abs();
    }
    m.tsindex = m.netpl_maxdd * m.nwins as f64;

    max_consec_win_loss(&profits, &mut m);

    m.nyears = (ndays as f64 / 252.0).round() as i64;
    let final_balance = initial_balance + m.net_pl;
    if m.nyears > 0 && final_balance > 0.0 {
        m.cagr = ((final_balance / initial_balance).powf(1.0 / m.nyears as f64) - 1.0) * 100.0;
    }
    if m.max_dd_pct != 0.0 {
        m.mar = m.cagr / m.max_dd_pct.abs();
    }

    rsquared(&profits, &mut m);

    m.min_capital = margin + 1.5 * m.max_dd.abs();

    m
}

fn drawdown(profits: &[f64], dates: &[Date], initial_balance: f64, m: &mut Metrics) {
    let mut cumul_pl = 0.0;
    let mut max_cumul_pl = 0.0;
    let mut days_delay = 0i64;
    let mut peak_date = dates[0];
    let mut days_delay_vec: Vec<f64> = Vec::new();
    let mut drawdown_sum = 0.0;
    let mut drawdown_sum_pct = 0.0;

    for (i, &pl) in profits.iter().enumerate() {
        cumul_pl += pl;
        if pl > 0.0 {
            m.nwins += 1;
            m.gross_profit += pl;
        } else {
            m.gross_loss += pl;
        }
        if pl > m.max_profit {
            m.max_profit = pl;
        }
        if pl < m.max_loss {
            m.max_loss = pl;
        }

        if cumul_pl > max_cumul_pl {
            max_cumul_pl = cumul_pl;
            peak_date = dates[i];
            if days_delay != 0 {
                days_delay_vec.push(days_delay as f64);
            }
            days_delay = 0;
        } else {
            days_delay = crate::time::days_diff(dates[i], peak_date);
        }

        let dd = cumul_pl - max_cumul_pl;
        let dd_pct = ((initial_balance + cumul_pl) / (initial_balance + max_cumul_pl) - 1.0) * 100.0;
        drawdown_sum += dd;
        drawdown_sum_pct += dd_pct;

        if dd < m.max_dd {
            m.max_dd = dd;
        }
        if dd_pct < m.max_dd_pct {
            m.max_dd_pct = dd_pct;
        }
    }

    m.avg_dd = drawdown_sum / m.ntrades as f64;
    m.avg_dd_pct = drawdown_sum_pct / m.ntrades as f64;
    m.avg_dd_duration = mean(&days_delay_vec);
}

fn avgticks(profits: &[f64], trades: &[&Transaction], tick_value: f64, m: &mut Metrics) {
    let ticks: Vec<f64> = profits
        .iter()
        .zip(trades.iter())
        .map(|(pl, t)| pl / (t.quantity as f64) / tick_value)
        .collect();
    m.avg_ticks = mean(&ticks);
    m.std_ticks = stdev(&ticks);
}

fn max_consec_win_loss(profits: &[f64], m: &mut Metrics) {
    if profits.is_empty() {
        return;
    }
    let mut consec_win = 1i64;
    let mut consec_loss = 1i64;
    for i in 1..profits.len() {
        if profits[i] > 0.0 {
            if profits[i - 1] > 0.0 {
                consec_win += 1;
            } else {
                m.max_consec_win = m.max_consec_win.max(consec_win);
                consec_win = 1;
            }
        } else if profits[i] < 0.0 {
            if profits[i - 1] < 0.0 {
                consec_loss += 1;
            } else {
                m.max_consec_loss = m.max_consec_loss.max(consec_loss);
                consec_loss = 1;
            }
        }
    }
    m.max_consec_win = m.max_consec_win.max(consec_win);
    m.max_consec_loss = m.max_consec_loss.max(consec_loss);
}

fn rsquared(profits: &[f64], m: &mut Metrics) {
    let n = profits.len() as f64;
    let (mut sumx, mut sumy, mut sumx2, mut sumy2, mut sumxy, mut balance) =
        (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

    for (j, pl) in profits.iter().enumerate() {
        let j = j as f64;
        balance += pl;
        sumx += j;
        sumx2 += j.powi(2);
        sumxy += j * balance;
        sumy += balance;
        sumy2 += balance.powi(2);
    }

    let num = n * sumxy - sumx * sumy;
    let denx = n * sumx2 - sumx.powi(2);
    let deny = n * sumy2 - sumy.powi(2);
    if num > 0.0 && denx > 0.0 && deny > 0.0 {
        m.rsquared = num.powi(2) / (denx * deny);
    }
}

/// Split `transactions` into ALL/LONG/SHORT subsets and compute the full
/// metric set for each.
pub fn compute_report(initial_balance: f64, ndays: i64, transactions: &[Transaction]) -> PerformanceReport {
    let long: Vec<Transaction> = transactions.iter().filter(|t| t.side == Side::Long).cloned().collect();
    let short: Vec<Transaction> = transactions.iter().filter(|t| t.side == Side::Short).cloned().collect();

    PerformanceReport {
        all: compute_metrics(initial_balance, ndays, transactions),
        long: compute_metrics(initial_balance, ndays, &long),
        short: compute_metrics(initial_balance, ndays, &short),
    }
}

/// Per-calendar-year average ticks, keyed by exit year. Used by the
/// out-of-sample validation gate's "75% of IS+OOS years profitable"
/// requirement (a year counts as profitable when its average ticks per
/// trade is >= 6).
pub fn year_avg_ticks(transactions: &[Transaction]) -> BTreeMap<i32, f64> {
    use chrono::Datelike;

    let mut by_year: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for t in transactions {
        if t.quantity == 0 {
            continue;
        }
        let ticks = t.net_pl / (t.quantity as f64 * t.symbol.tick_value);
        by_year.entry(t.exit_time.year()).or_default().push(ticks);
    }
    by_year.into_iter().map(|(y, ticks)| (y, mean(&ticks))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::time::{DateTime, Time};
    use chrono::NaiveDate;

    fn gc() -> Instrument {
        Instrument::lookup("GC").unwrap()
    }

    fn txn(net_pl: f64, exit_day: u32, bars_in_trade: i64) -> Transaction {
        Transaction {
            ticket: 1,
            strategy_name: "s1".into(),
            symbol: gc(),
            side: Side::Long,
            quantity: 1,
            entry_time: DateTime::new(NaiveDate::from_ymd_opt(2024, 1, exit_day).unwrap(), Time::from_hms_opt(9, 0, 0).unwrap()),
            entry_price: 1800.0,
            exit_time: DateTime::new(NaiveDate::from_ymd_opt(2024, 1, exit_day).unwrap(), Time::from_hms_opt(17, 0, 0).unwrap()),
            exit_price: 1800.0 + net_pl / gc().big_point_value,
            mae: 0.0,
            mfe: 0.0,
            bars_in_trade,
            net_pl,
            cumul_pl: 0.0,
        }
    }

    #[test]
    fn empty_transactions_yield_all_zeros() {
        let m = compute_metrics(10_000.0, 252, &[]);
        assert_eq!(m, Metrics::default());
    }

    #[test]
    fn drawdown_arithmetic_matches_worked_example() {
        // net_pl = [+10, +20, -40, +5] -> cumul = [10,30,-10,-5]
        // max_dd = -40 at index 2, avg_dd = (0+0-40-35)/4 = -18.75
        let txns = vec![txn(10.0, 2, 1), txn(20.0, 3, 1), txn(-40.0, 4, 1), txn(5.0, 5, 1)];
        let m = compute_metrics(10_000.0, 252, &txns);
        assert_eq!(m.max_dd, -40.0);
        assert!((m.avg_dd - (-18.75)).abs() < 1e-9);
    }

    #[test]
    fn zscore_requires_at_least_30_trades() {
        let txns: Vec<Transaction> = (0..29).map(|i| txn(10.0, (i % 27) + 1, 1)).collect();
        let m29 = compute_metrics(10_000.0, 252, &txns);
        assert_eq!(m29.zscore, 0.0);

        let txns30: Vec<Transaction> = (0..30).map(|i| txn(if i % 2 == 0 { 10.0 } else { -5.0 }, (i % 27) + 1, 1)).collect();
        let m30 = compute_metrics(10_000.0, 252, &txns30);
        assert_ne!(m30.zscore, 0.0);
    }

    #[test]
    fn win_perc_and_profit_factor() {
        let txns = vec![txn(100.0, 2, 5), txn(-50.0, 3, 5), txn(100.0, 4, 5)];
        let m = compute_metrics(10_000.0, 252, &txns);
        assert!((m.win_perc - 200.0 / 3.0).abs() < 1e-6);
        assert!((m.profit_factor - 4.0).abs() < 1e-9);
    }
}
