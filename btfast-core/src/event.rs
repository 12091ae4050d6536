//! The event types dispatched by the engine loop: BAR, SIGNAL, ORDER, FILL.

use serde::{Deserialize, Serialize};

use crate::instrument::Instrument;
use crate::time::DateTime;

/// Trade direction/intent carried by SIGNAL/ORDER/FILL events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    SellShort,
    BuyToCover,
}

/// How an ORDER should be matched against the next bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Stop,
    Limit,
    Market,
}

/// A single occurrence in the engine's event stream.
///
/// Represented as an enum rather than the original's single struct with
/// unused fields per variant: each variant carries exactly the fields the
/// original documents for that event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Bar {
        symbol: Instrument,
        timestamp: DateTime,
        timeframe: String,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    },
    Signal {
        symbol: Instrument,
        timestamp: DateTime,
        action: Action,
        order_type: OrderType,
        suggested_price: f64,
        position_size_factor: f64,
        quantity_to_close: i64,
        strategy_name: String,
        stoploss: f64,
        takeprofit: f64,
    },
    Order {
        symbol: Instrument,
        timestamp: DateTime,
        action: Action,
        order_type: OrderType,
        suggested_price: f64,
        quantity: i64,
        strategy_name: String,
        stoploss: f64,
        takeprofit: f64,
        ticket: u64,
    },
    Fill {
        symbol: Instrument,
        timestamp: DateTime,
        action: Action,
        order_type: OrderType,
        fill_price: f64,
        quantity: i64,
        strategy_name: String,
        stoploss: f64,
        takeprofit: f64,
        ticket: u64,
        commission: f64,
    },
}

impl Event {
    pub fn symbol(&self) -> &Instrument {
        match self {
            Event::Bar { symbol, .. }
            | Event::Signal { symbol, .. }
            | Event::Order { symbol, .. }
            | Event::Fill { symbol, .. } => symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime {
        match self {
            Event::Bar { timestamp, .. }
            | Event::Signal { timestamp, .. }
            | Event::Order { timestamp, .. }
            | Event::Fill { timestamp, .. } => *timestamp,
        }
    }

    /// Re-establish max/min ordering of a bar's OHLC after noise has been
    /// applied to it, so that `low <= {open,close} <= high` always holds.
    pub fn reorder_ohlc(&mut self, new_open: f64, new_high: f64, new_low: f64, new_close: f64) {
        if let Event::Bar {
            open, high, low, close, ..
        } = self
        {
            let hi = new_high.max(new_open).max(new_low).max(new_close);
            let lo = new_low.min(new_open).min(new_high).min(new_close);
            *open = new_open;
            *high = hi;
            *low = lo;
            *close = new_close;
        }
    }
}
