//! An open (running) trade and its mark-to-market bookkeeping.

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::instrument::Instrument;
use crate::time::DateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

/// A currently open trade, tracked by the position handler until a matching
/// exit FILL closes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub strategy_name: String,
    pub symbol: Instrument,
    pub side: Side,
    pub quantity: i64,
    pub entry_time: DateTime,
    pub entry_price: f64,
    pub stoploss: f64,
    pub takeprofit: f64,
    pub ticket: u64,

    pub mae: f64,
    pub mfe: f64,
    pub bars_in_trade: i64,
    pub days_in_trade: i64,
    pub pl: f64,
    pub keep_open: bool,
}

impl Position {
    pub fn open(
        strategy_name: impl Into<String>,
        symbol: Instrument,
        side: Side,
        quantity: i64,
        entry_time: DateTime,
        entry_price: f64,
        stoploss: f64,
        takeprofit: f64,
        ticket: u64,
    ) -> Self {
        Position {
            strategy_name: strategy_name.into(),
            symbol,
            side,
            quantity,
            entry_time,
            entry_price,
            stoploss,
            takeprofit,
            ticket,
            mae: 0.0,
            mfe: 0.0,
            bars_in_trade: 1,
            days_in_trade: 0,
            pl: 0.0,
            keep_open: true,
        }
    }

    /// Mark the position to the incoming bar, updating MAE/MFE and deciding
    /// whether the stop loss / take profit has been hit.
    pub fn update(&mut self, bar: &Event) {
        let Event::Bar { high, low, timestamp, symbol, .. } = bar else {
            return;
        };
        let (high, low) = (*high, *low);
        let is_sl = self.stoploss != 0.0;
        let is_tp = self.takeprofit != 0.0;
        let bpv = symbol.big_point_value;

        match self.side {
            Side::Long => {
                self.mae = self
                    .mae
                    .max((self.entry_price - low) * self.quantity as f64 * bpv);
                self.mfe = self
                    .mfe
                    .max((high - self.entry_price) * self.quantity as f64 * bpv);
            }
            Side::Short => {
                self.mae = self
                    .mae
                    .max((high - self.entry_price) * self.quantity as f64 * bpv);
                self.mfe = self
                    .mfe
                    .max((self.entry_price - low) * self.quantity as f64 * bpv);
            }
        }

        if is_sl || is_tp {
            let hit_sl = is_sl && self.mae >= self.stoploss;
            let hit_tp = is_tp && self.mfe >= self.takeprofit;
            self.keep_open = !(hit_sl || hit_tp);
        }

        self.bars_in_trade += 1;
        if timestamp.time() == symbol.session_close_time {
            self.days_in_trade += 1;
        }
    }
}
