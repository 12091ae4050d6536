//! Futures contract metadata, looked up by symbol from a fixed table.
//!
//! The table (contract unit, margin, commission, tick size/value, session
//! times) is not something a backtest should guess at, so it is hardcoded
//! here rather than left to strategy-side configuration. Add a symbol by
//! extending [`Instrument::lookup`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::Time;

/// A tradable futures contract and its cost/session structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub contract_unit: f64,
    pub margin: f64,
    pub commission: f64,
    pub tick_size: f64,
    pub tick_value: f64,
    pub session_open_time: Time,
    pub session_close_time: Time,
    pub settlement_time: Time,

    pub two_days_session: bool,
    pub transaction_cost: f64,
    pub transaction_cost_ticks: f64,
    pub big_point_value: f64,
    pub digits: u32,
}

impl Instrument {
    /// Build an instrument from its looked-up raw fields, deriving the
    /// session/cost/digit fields the same way the raw constructor does.
    fn from_raw(
        name: &str,
        contract_unit: f64,
        margin: f64,
        commission: f64,
        tick_size: f64,
        tick_value: f64,
        session_open_time: Time,
        session_close_time: Time,
        settlement_time: Time,
    ) -> Self {
        let two_days_session = session_open_time > session_close_time;
        let transaction_cost = commission + 2.0 * tick_value;
        let transaction_cost_ticks = round_to(commission / tick_value + 2.0, 2);
        let big_point_value = tick_value / tick_size;
        let digits = count_digits(tick_size);

        Instrument {
            name: name.to_string(),
            contract_unit,
            margin,
            commission,
            tick_size,
            tick_value,
            session_open_time,
            session_close_time,
            settlement_time,
            two_days_session,
            transaction_cost,
            transaction_cost_ticks,
            big_point_value,
            digits,
        }
    }

    /// Look up an instrument by symbol in the fixed table. Unknown symbols
    /// are a configuration error, not a panic.
    pub fn lookup(symbol: &str) -> Result<Self> {
        let t = |h, m| Time::from_hms_opt(h, m, 0).expect("valid hh:mm");

        let inst = match symbol {
            // Soybean Oil - CBOT
            "BO" => Self::from_raw(
                "BO", 60_000.0, 848.0, 3.0, 0.01, 6.0,
                t(19, 0), t(13, 20), t(13, 15),
            ),
            // Corn - CBOT
            "C" => Self::from_raw(
                "C", 5_000.0, 990.0, 3.0, 0.25, 12.5,
                t(19, 0), t(13, 20), t(13, 15),
            ),
            // E-mini EUR/USD - CME
            "E7" => Self::from_raw(
                "E7", 62_500.0, 1252.0, 3.0, 0.0001, 6.25,
                t(17, 0), t(16, 0), t(14, 0),
            ),
            // Gold - COMEX
            "GC" => Self::from_raw(
                "GC", 100.0, 6600.0, 3.0, 0.1, 10.0,
                t(18, 0), t(17, 0), t(13, 30),
            ),
            // Natural Gas (Henry Hub) - NYMEX
            "NG" => Self::from_raw(
                "NG", 10_000.0, 2200.0, 3.0, 0.001, 10.0,
                t(18, 0), t(17, 0), t(14, 30),
            ),
            // E-mini Russell 2000 - CME
            "RTY" => Self::from_raw(
                "RTY", 50.0, 6380.0, 3.0, 0.1, 5.0,
                t(17, 0), t(16, 0), t(14, 30),
            ),
            // Wheat (SRW) - CBOT
            "W" => Self::from_raw(
                "W", 5_000.0, 1375.0, 3.0, 0.25, 12.5,
                t(19, 0), t(13, 20), t(13, 15),
            ),
            other => {
                return Err(Error::Configuration(format!(
                    "invalid instrument symbol: {other}"
                )))
            }
        };
        Ok(inst)
    }

    /// Round a price to this instrument's tick precision (`digits` decimal
    /// places), as the shared entry decision block does before emitting a
    /// breakout/mean-reversion level.
    pub fn round_to(&self, price: f64) -> f64 {
        round_to(price, self.digits as i32)
    }
}

fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

/// Count decimal digits of `tick_size` by repeated ×10 fractional peeling,
/// matching the original's float-for-float behaviour rather than `log10`
/// (which disagrees with it at exact powers of ten).
fn count_digits(tick_size: f64) -> u32 {
    let mut count = 0u32;
    let mut num = tick_size.abs();
    num -= num.trunc();
    while num.abs() >= 0.000_000_1 {
        num *= 10.0;
        count += 1;
        num -= num.trunc();
    }
    count
}
