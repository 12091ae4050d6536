//! Matches ORDER events against the next bar's OHLC to produce FILL events.
//!
//! STOP/LIMIT orders are matched against the bar immediately following the
//! order (no same-bar fills); MARKET orders (closing positions whose SL/TP
//! was hit, or an explicit market entry/exit) always fill. Gaps are honored:
//! a STOP that gaps through its trigger fills at the open, not at the
//! stale suggested price.

use crate::event::{Action, Event, OrderType};
use crate::instrument::Instrument;

/// Per-tick slippage applied against the filling side.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionHandler {
    pub slippage_ticks: i64,
    pub include_commissions: bool,
}

impl ExecutionHandler {
    pub fn new(slippage_ticks: i64, include_commissions: bool) -> Self {
        ExecutionHandler {
            slippage_ticks,
            include_commissions,
        }
    }

    /// Try to match `order` against `bar`. Returns `None` if the order's
    /// trigger/limit condition was not met on this bar (stays pending).
    pub fn try_fill(&self, order: &Event, bar: &Event) -> Option<Event> {
        let Event::Order {
            symbol,
            action,
            order_type,
            suggested_price,
            quantity,
            strategy_name,
            stoploss,
            takeprofit,
            ticket,
            ..
        } = order
        else {
            return None;
        };
        let Event::Bar { timestamp, open, high, low, .. } = bar else {
            return None;
        };

        let raw_fill = match (action, order_type) {
            (Action::Buy, OrderType::Stop) => {
                (*high >= *suggested_price).then(|| open.max(*suggested_price))
            }
            (Action::SellShort, OrderType::Stop) => {
                (*low <= *suggested_price).then(|| open.min(*suggested_price))
            }
            (Action::Buy, OrderType::Limit) => {
                (*low <= *suggested_price).then(|| open.min(*suggested_price))
            }
            (Action::SellShort, OrderType::Limit) => {
                (*high >= *suggested_price).then(|| open.max(*suggested_price))
            }
            (Action::Sell, OrderType::Stop) => {
                (*low <= *suggested_price).then(|| open.min(*suggested_price))
            }
            (Action::BuyToCover, OrderType::Stop) => {
                (*high >= *suggested_price).then(|| open.max(*suggested_price))
            }
            (Action::Sell, OrderType::Limit) => {
                (*high >= *suggested_price).then(|| open.max(*suggested_price))
            }
            (Action::BuyToCover, OrderType::Limit) => {
                (*low <= *suggested_price).then(|| open.min(*suggested_price))
            }
            (_, OrderType::Market) => Some(*open),
        };

        let raw_fill = raw_fill?;
        let fill_price = self.apply_slippage(raw_fill, *action, symbol);
        let commission = if self.include_commissions {
            symbol.commission
        } else {
            0.0
        };

        Some(Event::Fill {
            symbol: symbol.clone(),
            timestamp: *timestamp,
            action: *action,
            order_type: *order_type,
            fill_price,
            quantity: *quantity,
            strategy_name: strategy_name.clone(),
            stoploss: *stoploss,
            takeprofit: *takeprofit,
            ticket: *ticket,
            commission,
        })
    }

    /// Slippage always works against the filling side: buys pay more,
    /// sells receive less.
    fn apply_slippage(&self, price: f64, action: Action, symbol: &Instrument) -> f64 {
        let adj = self.slippage_ticks as f64 * symbol.tick_size;
        match action {
            Action::Buy | Action::BuyToCover => price + adj,
            Action::Sell | Action::SellShort => price - adj,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::time::Time;
    use chrono::NaiveDate;

    fn ts() -> crate::time::DateTime {
        crate::time::DateTime::new(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            Time::from_hms_opt(9, 30, 0).unwrap(),
        )
    }

    fn order(action: Action, order_type: OrderType, suggested_price: f64) -> Event {
        Event::Order {
            symbol: Instrument::lookup("GC").unwrap(),
            timestamp: ts(),
            action,
            order_type,
            suggested_price,
            quantity: 1,
            strategy_name: "s1".into(),
            stoploss: 0.0,
            takeprofit: 0.0,
            ticket: 1,
        }
    }

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Event {
        Event::Bar {
            symbol: Instrument::lookup("GC").unwrap(),
            timestamp: ts(),
            timeframe: "D".into(),
            open,
            high,
            low,
            close,
            volume: 0,
        }
    }

    #[test]
    fn buy_stop_fills_when_high_crosses_trigger() {
        let handler = ExecutionHandler::new(0, false);
        let ord = order(Action::Buy, OrderType::Stop, 1800.0);
        let fill = handler.try_fill(&ord, &bar(1795.0, 1805.0, 1790.0, 1802.0));
        assert!(fill.is_some());
    }

    #[test]
    fn buy_stop_stays_pending_when_high_does_not_reach_trigger() {
        let handler = ExecutionHandler::new(0, false);
        let ord = order(Action::Buy, OrderType::Stop, 1800.0);
        let fill = handler.try_fill(&ord, &bar(1790.0, 1795.0, 1785.0, 1792.0));
        assert!(fill.is_none());
    }

    #[test]
    fn buy_stop_gap_fills_at_open_not_stale_trigger() {
        let handler = ExecutionHandler::new(0, false);
        let ord = order(Action::Buy, OrderType::Stop, 1800.0);
        let fill = handler.try_fill(&ord, &bar(1820.0, 1825.0, 1818.0, 1822.0)).unwrap();
        if let Event::Fill { fill_price, .. } = fill {
            assert_eq!(fill_price, 1820.0);
        } else {
            panic!("expected fill");
        }
    }

    #[test]
    fn slippage_works_against_the_buyer() {
        let handler = ExecutionHandler::new(2, false);
        let ord = order(Action::Buy, OrderType::Stop, 1800.0);
        let fill = handler.try_fill(&ord, &bar(1795.0, 1805.0, 1790.0, 1802.0)).unwrap();
        if let Event::Fill { fill_price, .. } = fill {
            assert_eq!(fill_price, 1800.0 + 2.0 * 0.1);
        } else {
            panic!("expected fill");
        }
    }

    #[test]
    fn market_order_always_fills_at_open() {
        let handler = ExecutionHandler::new(0, false);
        let ord = order(Action::Sell, OrderType::Market, 0.0);
        let fill = handler.try_fill(&ord, &bar(1800.0, 1805.0, 1795.0, 1802.0)).unwrap();
        if let Event::Fill { fill_price, .. } = fill {
            assert_eq!(fill_price, 1800.0);
        } else {
            panic!("expected fill");
        }
    }
}
