//! A closed trade, as recorded into [`Account`](crate::account::Account) history.

use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;
use crate::position::Side;
use crate::time::DateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub ticket: u64,
    pub strategy_name: String,
    pub symbol: Instrument,
    pub side: Side,
    pub quantity: i64,
    pub entry_time: DateTime,
    pub entry_price: f64,
    pub exit_time: DateTime,
    pub exit_price: f64,
    pub mae: f64,
    pub mfe: f64,
    pub bars_in_trade: i64,
    pub net_pl: f64,
    pub cumul_pl: f64,
}

impl Transaction {
    /// Net P/L expressed in ticks, used throughout the performance metrics
    /// (`avg_ticks`, the profitability gate, etc) as a contract-agnostic unit.
    pub fn ticks(&self) -> f64 {
        self.net_pl / (self.quantity as f64 * self.symbol.tick_value)
    }
}
