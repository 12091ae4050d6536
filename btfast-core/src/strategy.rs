//! The pluggable strategy contract: parameter binding plus per-bar signal
//! generation, and the shared preliminaries/exit-switch machinery every
//! concrete strategy is built from.

pub mod examples;

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::event::{Action, Event, OrderType};
use crate::instrument::Instrument;
use crate::params::Parameters;
use crate::position_handler::PositionHandler;
use crate::price_collection::PriceCollection;
use crate::time::{Date, Time};

/// +1 long / 0 flat / -1 short, derived from a strategy's open positions.
pub fn market_position(position_handler: &PositionHandler, strategy_name: &str) -> i32 {
    for pos in position_handler.open_positions() {
        if pos.strategy_name == strategy_name {
            return match pos.side {
                crate::position::Side::Long => 1,
                crate::position::Side::Short => -1,
            };
        }
    }
    0
}

/// Canonical exit conditions a strategy's exit switch dispatches to.
/// Cases 3/4 count from `Position::bars_in_trade`/`days_in_trade` rather
/// than the session-boundary deque lookback cases 1/2 need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSwitch {
    /// One bar before session close, or at next session open if the
    /// session ended earlier than usual.
    EndOfDay,
    /// Same as `EndOfDay`, but only on Fridays.
    EndOfWeek,
    /// After N bars in trade.
    BarsInTrade(i64),
    /// After N sessions in trade.
    SessionsInTrade(i64),
}

/// Shared context an exit switch needs: the timestamp of the current and
/// previous reference bars, the instrument's close-to-open gap, and the
/// host timeframe's bar length, all in minutes.
pub struct ExitContext {
    pub current_time: Time,
    pub current_weekday: u32,
    pub one_bar_before_close: Time,
    pub prev_to_current_minutes: i64,
    pub close_to_open_minutes: i64,
    pub timeframe_minutes: i64,
}

/// Evaluate whether `switch` fires given the current bar's context and the
/// position being considered for exit.
pub fn exit_condition(
    switch: ExitSwitch,
    ctx: &ExitContext,
    bars_in_trade: i64,
    days_in_trade: i64,
) -> bool {
    let gapped_session = ctx.prev_to_current_minutes > ctx.close_to_open_minutes + ctx.timeframe_minutes;
    match switch {
        ExitSwitch::EndOfDay => ctx.current_time == ctx.one_bar_before_close || gapped_session,
        ExitSwitch::EndOfWeek => {
            ctx.current_weekday == 5
                && (ctx.current_time == ctx.one_bar_before_close || gapped_session)
        }
        ExitSwitch::BarsInTrade(n) => bars_in_trade >= n,
        ExitSwitch::SessionsInTrade(n) => days_in_trade >= n,
    }
}

/// Preliminary per-bar state every strategy computes before deciding
/// entries/exits: current time attributes, market position, the last six
/// session OHLCV snapshots, and the new-session/trading-enabled toggles.
///
/// `update` returns `false` ("not ready") when there isn't enough session
/// history yet; the engine then skips signal generation for this bar.
#[derive(Debug, Clone)]
pub struct Preliminaries {
    pub current_time: Time,
    pub current_date: Date,
    pub current_weekday: u32,
    pub market_position: i32,
    pub open_d: [f64; 6],
    pub high_d: [f64; 6],
    pub low_d: [f64; 6],
    pub close_d: [f64; 6],
    pub volume_d: [i64; 6],
    pub session_open_price: f64,
    pub new_session: bool,
    pub trading_enabled: bool,
}

impl Default for Preliminaries {
    fn default() -> Self {
        Preliminaries {
            current_time: Time::from_hms_opt(0, 0, 0).unwrap(),
            current_date: Date::from_ymd_opt(1970, 1, 1).unwrap(),
            current_weekday: 1,
            market_position: 0,
            open_d: [0.0; 6],
            high_d: [0.0; 6],
            low_d: [0.0; 6],
            close_d: [0.0; 6],
            volume_d: [0; 6],
            session_open_price: 0.0,
            new_session: false,
            trading_enabled: true,
        }
    }
}

impl Preliminaries {
    /// Refresh from the current intraday bar deque `data1` and the daily
    /// deque `data1D`. Returns `false` when there isn't at least six
    /// sessions of history yet.
    pub fn update(
        &mut self,
        data1: &crate::price_collection::BarHistory,
        data1d: &crate::price_collection::BarHistory,
        position_handler: &PositionHandler,
        strategy_name: &str,
    ) -> bool {
        if data1.is_empty() || data1d.is_empty() || data1d.len() < self.open_d.len() {
            return false;
        }

        let Some(Event::Bar { timestamp, .. }) = data1.bars().front() else {
            return false;
        };
        self.current_time = timestamp.time();
        self.current_date = timestamp.date();
        self.current_weekday = crate::time::weekday_number(timestamp.date());

        self.market_position = market_position(position_handler, strategy_name);

        for (j, bar) in data1d.bars().iter().take(self.open_d.len()).enumerate() {
            if let Event::Bar { open, high, low, close, volume, .. } = bar {
                self.open_d[j] = *open;
                self.high_d[j] = *high;
                self.low_d[j] = *low;
                self.close_d[j] = *close;
                self.volume_d[j] = *volume;
            }
        }

        if self.session_open_price != self.open_d[0] {
            self.trading_enabled = true;
            self.new_session = true;
            self.session_open_price = self.open_d[0];
        } else {
            self.new_session = false;
        }

        if self.market_position != 0 {
            self.trading_enabled = false;
        }

        true
    }
}

/// A pluggable signal generator: parameter binding plus per-bar signal
/// computation. Implementations hold their own indicator state; the engine
/// clones a fresh `Strategy` instance per worker so parallel runs share no
/// mutable state.
pub trait Strategy: Send {
    fn name(&self) -> &str;

    /// Bind named integer parameters (stop distance in currency, rule
    /// switches, fraction exponents, indicator periods, ...). An unknown
    /// name is a fatal contract violation.
    fn set_parameter_values(&mut self, parameters: &Parameters) -> Result<()>;

    /// Run once per bar after preliminaries; returns at most one SIGNAL per
    /// side (`(long_signal, short_signal)`).
    fn compute_signals(
        &mut self,
        prices: &PriceCollection,
        position_handler: &PositionHandler,
    ) -> Result<(Option<Event>, Option<Event>)>;

    fn symbol(&self) -> &Instrument;

    fn timeframe(&self) -> &str;

    fn max_bars_back(&self) -> usize;
}

/// Look up a named parameter, returning a contract violation for an
/// unrecognized name. Shared by every concrete strategy's
/// `set_parameter_values`.
pub fn require_param(parameters: &BTreeMap<String, i64>, name: &str) -> Result<i64> {
    parameters
        .get(name)
        .copied()
        .ok_or_else(|| Error::ContractViolation(format!("unknown parameter: {name}")))
}

/// Build the canonical entry SIGNAL pair emitted by the shared decision
/// block: a BUY STOP at `level_long` and a SELLSHORT STOP at `level_short`,
/// both carrying `stoploss` and no take-profit, per §4.3's "shared decision
/// block" contract.
#[allow(clippy::too_many_arguments)]
pub fn entry_signals(
    symbol: &Instrument,
    timestamp: crate::time::DateTime,
    strategy_name: &str,
    enter_long: bool,
    enter_short: bool,
    level_long: f64,
    level_short: f64,
    stoploss: f64,
) -> (Option<Event>, Option<Event>) {
    let long = enter_long.then(|| Event::Signal {
        symbol: symbol.clone(),
        timestamp,
        action: Action::Buy,
        order_type: OrderType::Stop,
        suggested_price: symbol.round_to(level_long),
        position_size_factor: 1.0,
        quantity_to_close: 0,
        strategy_name: strategy_name.to_string(),
        stoploss,
        takeprofit: 0.0,
    });
    let short = enter_short.then(|| Event::Signal {
        symbol: symbol.clone(),
        timestamp,
        action: Action::SellShort,
        order_type: OrderType::Stop,
        suggested_price: symbol.round_to(level_short),
        position_size_factor: 1.0,
        quantity_to_close: 0,
        strategy_name: strategy_name.to_string(),
        stoploss,
        takeprofit: 0.0,
    });
    (long, short)
}

/// Build the canonical exit SIGNAL pair: a SELL/BUYTOCOVER MARKET closing
/// whatever quantity is open for `strategy_name` on that side.
pub fn exit_signals(
    symbol: &Instrument,
    timestamp: crate::time::DateTime,
    strategy_name: &str,
    exit_long: bool,
    exit_short: bool,
    position_handler: &PositionHandler,
    last_close: f64,
) -> (Option<Event>, Option<Event>) {
    let find = |side: crate::position::Side| {
        position_handler
            .open_positions()
            .iter()
            .find(|p| p.strategy_name == strategy_name && p.side == side)
            .map(|p| p.quantity)
    };

    let long = exit_long
        .then(|| find(crate::position::Side::Long))
        .flatten()
        .map(|qty| Event::Signal {
            symbol: symbol.clone(),
            timestamp,
            action: Action::Sell,
            order_type: OrderType::Market,
            suggested_price: last_close,
            position_size_factor: 1.0,
            quantity_to_close: qty,
            strategy_name: strategy_name.to_string(),
            stoploss: 0.0,
            takeprofit: 0.0,
        });

    let short = exit_short
        .then(|| find(crate::position::Side::Short))
        .flatten()
        .map(|qty| Event::Signal {
            symbol: symbol.clone(),
            timestamp,
            action: Action::BuyToCover,
            order_type: OrderType::Market,
            suggested_price: last_close,
            position_size_factor: 1.0,
            quantity_to_close: qty,
            strategy_name: strategy_name.to_string(),
            stoploss: 0.0,
            takeprofit: 0.0,
        });

    (long, short)
}
