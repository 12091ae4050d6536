//! Tracks open positions, closing them against incoming BAR/FILL events and
//! recording closed trades into the [`Account`].

use std::collections::VecDeque;

use crate::account::Account;
use crate::error::{Error, Result};
use crate::event::{Action, Event, OrderType};
use crate::position::{Position, Side};

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Owns the list of currently-open trades for one backtest run.
pub struct PositionHandler {
    open_positions: Vec<Position>,
}

impl PositionHandler {
    pub fn new() -> Self {
        PositionHandler {
            open_positions: Vec::new(),
        }
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.open_positions
    }

    /// Mark every open position to the new bar; any position whose stop
    /// loss/take profit is hit gets a closing MARKET order pushed onto the
    /// queue for the next pass of the event loop.
    pub fn on_bar(&mut self, bar: &Event, events_queue: &mut VecDeque<Event>) {
        let Event::Bar { symbol, timestamp, close, .. } = bar else {
            return;
        };

        for pos in &mut self.open_positions {
            pos.update(bar);

            if !pos.keep_open {
                let action = match pos.side {
                    Side::Long => Action::Sell,
                    Side::Short => Action::BuyToCover,
                };
                events_queue.push_back(Event::Order {
                    symbol: symbol.clone(),
                    timestamp: *timestamp,
                    action,
                    order_type: OrderType::Market,
                    suggested_price: *close,
                    quantity: pos.quantity,
                    strategy_name: pos.strategy_name.clone(),
                    stoploss: 0.0,
                    takeprofit: 0.0,
                    ticket: pos.ticket,
                });
            }
        }
    }

    /// Apply a FILL: open a new position (BUY/SELLSHORT) or close the
    /// matching one (SELL/BUYTOCOVER) and record the transaction.
    pub fn on_fill(&mut self, fill: &Event, account: &mut Account) -> Result<()> {
        let Event::Fill {
            symbol,
            timestamp,
            action,
            fill_price,
            quantity,
            strategy_name,
            stoploss,
            takeprofit,
            ticket,
            commission,
        } = fill
        else {
            return Ok(());
        };

        match action {
            Action::Buy | Action::SellShort => {
                let side = if *action == Action::Buy { Side::Long } else { Side::Short };
                self.open_positions.push(Position::open(
                    strategy_name.clone(),
                    symbol.clone(),
                    side,
                    *quantity,
                    *timestamp,
                    *fill_price,
                    *stoploss,
                    *takeprofit,
                    *ticket,
                ));
            }
            Action::Sell | Action::BuyToCover => {
                let idx = self
                    .open_positions
                    .iter()
                    .position(|p| p.strategy_name == *strategy_name);

                let Some(idx) = idx else {
                    return Err(Error::ContractViolation(format!(
                        "position to close for strategy {strategy_name} not found"
                    )));
                };
                let pos = self.open_positions.remove(idx);

                let pl = match action {
                    Action::Sell => {
                        (*fill_price - pos.entry_price) * *quantity as f64 * symbol.big_point_value
                    }
                    Action::BuyToCover => {
                        (pos.entry_price - *fill_price) * *quantity as f64 * symbol.big_point_value
                    }
                    _ => unreachable!(),
                } - *commission;

                account.update_balance(pl);
                account.add_transaction_to_history(crate::transaction::Transaction {
                    ticket: pos.ticket,
                    strategy_name: pos.strategy_name.clone(),
                    symbol: pos.symbol.clone(),
                    side: pos.side,
                    quantity: *quantity,
                    entry_time: pos.entry_time,
                    entry_price: pos.entry_price,
                    exit_time: *timestamp,
                    exit_price: *fill_price,
                    mae: round1(pos.mae),
                    mfe: round1(pos.mfe),
                    bars_in_trade: pos.bars_in_trade,
                    net_pl: pl,
                    cumul_pl: account.balance() - account.initial_balance(),
                });
            }
        }
        Ok(())
    }

    /// Force-close every open position at `close` (end-of-data liquidation),
    /// charging the same round-turn commission a normal closing FILL would
    /// when `include_commissions` is set.
    pub fn close_all_positions(&mut self, bar: &Event, account: &mut Account, include_commissions: bool) {
        let Event::Bar { close, timestamp, .. } = bar else {
            return;
        };

        for pos in self.open_positions.drain(..) {
            let commission = if include_commissions { pos.symbol.commission } else { 0.0 };
            let pl = match pos.side {
                Side::Long => (*close - pos.entry_price) * pos.quantity as f64 * pos.symbol.big_point_value,
                Side::Short => (pos.entry_price - *close) * pos.quantity as f64 * pos.symbol.big_point_value,
            } - commission;
            account.update_balance(pl);
            account.add_transaction_to_history(crate::transaction::Transaction {
                ticket: pos.ticket,
                strategy_name: pos.strategy_name.clone(),
                symbol: pos.symbol.clone(),
                side: pos.side,
                quantity: pos.quantity,
                entry_time: pos.entry_time,
                entry_price: pos.entry_price,
                exit_time: *timestamp,
                exit_price: *close,
                mae: round1(pos.mae),
                mfe: round1(pos.mfe),
                bars_in_trade: pos.bars_in_trade,
                net_pl: pl,
                cumul_pl: account.balance() - account.initial_balance(),
            });
        }
    }
}

impl Default for PositionHandler {
    fn default() -> Self {
        Self::new()
    }
}
