//! Turns SIGNAL events into sized ORDER events.
//!
//! Three position-sizing policies, selected per backtest: a fixed number of
//! contracts, a fixed fraction of equity divided by the stop-loss distance
//! per contract ("fixed-fractional"), or a fixed notional amount divided by
//! big point value ("fixed-notional"). All three floor to a whole number of
//! contracts and never size below one.

use serde::{Deserialize, Serialize};

use crate::account::Account;
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PositionSizing {
    FixedSize { contracts: i64 },
    FixedFractional { risk_fraction: f64 },
    FixedNotional { risk_fraction: f64 },
}

#[derive(Debug, Clone, Copy)]
pub struct SignalHandler {
    pub sizing: PositionSizing,
}

impl SignalHandler {
    pub fn new(sizing: PositionSizing) -> Self {
        SignalHandler { sizing }
    }

    /// `stop_per_contract` is the signal's stoploss (account currency per
    /// contract); fixed-fractional sizing falls back to the instrument's
    /// margin when a strategy emits a signal with no stop distance, since
    /// a zero divisor would otherwise make every such signal unsizeable.
    fn quantity(
        &self,
        account: &Account,
        bar_close: f64,
        stop_per_contract: f64,
        symbol: &crate::instrument::Instrument,
    ) -> i64 {
        let qty = match self.sizing {
            PositionSizing::FixedSize { contracts } => contracts as f64,
            PositionSizing::FixedFractional { risk_fraction } => {
                let stop = if stop_per_contract > 0.0 { stop_per_contract } else { symbol.margin };
                (account.balance() * risk_fraction / stop).floor()
            }
            PositionSizing::FixedNotional { risk_fraction } => {
                (account.balance() * risk_fraction / (bar_close * symbol.big_point_value)).floor()
            }
        };
        qty.max(1.0) as i64
    }

    /// Turn a SIGNAL into an ORDER, sizing the quantity per the active
    /// policy. `quantity_to_close` on an exit signal overrides sizing
    /// (closing exactly that many contracts rather than re-deriving size).
    pub fn on_signal(&self, signal: &Event, account: &Account, last_close: f64) -> Option<Event> {
        let Event::Signal {
            symbol,
            timestamp,
            action,
            order_type,
            suggested_price,
            quantity_to_close,
            strategy_name,
            stoploss,
            takeprofit,
            ..
        } = signal
        else {
            return None;
        };

        let quantity = if *quantity_to_close > 0 {
            *quantity_to_close
        } else {
            self.quantity(account, last_close, *stoploss, symbol)
        };

        Some(Event::Order {
            symbol: symbol.clone(),
            timestamp: *timestamp,
            action: *action,
            order_type: *order_type,
            suggested_price: *suggested_price,
            quantity,
            strategy_name: strategy_name.clone(),
            stoploss: *stoploss,
            takeprofit: *takeprofit,
            ticket: 0,
        })
    }
}
