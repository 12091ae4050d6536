//! A session-range breakout strategy: enters on a STOP placed a fraction of
//! the prior session's range away from today's open, exits one bar before
//! session close. Grounded on the shared decision block every concrete
//! strategy in the corpus builds its entry/exit rules around.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::instrument::Instrument;
use crate::params::Parameters;
use crate::position_handler::PositionHandler;
use crate::price_collection::PriceCollection;
use crate::strategy::{
    entry_signals, exit_condition, exit_signals, ExitContext, ExitSwitch, Preliminaries, Strategy,
};
use crate::time::minutes_between;

/// Breakout entry, end-of-day exit. Parameters: `fractN` (breakout distance
/// as tenths of prior session range) and `stop_ticks` (stop-loss distance in
/// ticks, converted to account currency at binding time).
pub struct Breakout {
    name: String,
    symbol: Instrument,
    timeframe: String,
    max_bars_back: usize,

    fract_n: i64,
    stop_ticks: i64,

    prelim: Preliminaries,
    one_bar_before_close: Option<crate::time::Time>,
    timeframe_minutes: i64,
    close_to_open_minutes: i64,
}

impl Breakout {
    pub fn new(name: impl Into<String>, symbol: Instrument, timeframe: impl Into<String>, max_bars_back: usize) -> Self {
        let timeframe = timeframe.into();
        let close_to_open_minutes =
            minutes_between(symbol.session_close_time, symbol.session_open_time).rem_euclid(24 * 60);

        Breakout {
            name: name.into(),
            symbol,
            timeframe,
            max_bars_back,
            fract_n: 1,
            stop_ticks: 0,
            prelim: Preliminaries::default(),
            one_bar_before_close: None,
            timeframe_minutes: 0,
            close_to_open_minutes,
        }
    }

    fn stoploss_currency(&self) -> f64 {
        self.stop_ticks as f64 * self.symbol.tick_size * self.symbol.big_point_value
    }
}

impl Strategy for Breakout {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_parameter_values(&mut self, parameters: &Parameters) -> Result<()> {
        self.fract_n = *parameters
            .get("fractN")
            .ok_or_else(|| Error::ContractViolation("unknown parameter: fractN".to_string()))?;
        self.stop_ticks = *parameters
            .get("stop_ticks")
            .ok_or_else(|| Error::ContractViolation("unknown parameter: stop_ticks".to_string()))?;

        if self.timeframe != "D" {
            let mins: i64 = self.timeframe[1..]
                .parse()
                .map_err(|_| Error::Configuration(format!("bad timeframe label: {}", self.timeframe)))?;
            self.timeframe_minutes = mins;
            let delta = chrono::Duration::minutes(mins);
            self.one_bar_before_close =
                Some(self.symbol.session_close_time - delta);
        }
        Ok(())
    }

    fn compute_signals(
        &mut self,
        prices: &PriceCollection,
        position_handler: &PositionHandler,
    ) -> Result<(Option<Event>, Option<Event>)> {
        let Some(data1d) = prices.history("D") else {
            return Ok((None, None));
        };
        let data1 = if self.timeframe == "D" {
            data1d
        } else {
            match prices.history(&self.timeframe) {
                Some(h) => h,
                None => return Ok((None, None)),
            }
        };

        if !self.prelim.update(data1, data1d, position_handler, &self.name) {
            return Ok((None, None));
        }

        let mp = self.prelim.market_position;

        if mp == 0 {
            Ok(self.compute_entry(data1))
        } else {
            Ok(self.compute_exit(data1, position_handler, mp))
        }
    }

    fn symbol(&self) -> &Instrument {
        &self.symbol
    }

    fn timeframe(&self) -> &str {
        &self.timeframe
    }

    fn max_bars_back(&self) -> usize {
        self.max_bars_back
    }
}

impl Breakout {
    fn compute_entry(&self, data1: &crate::price_collection::BarHistory) -> (Option<Event>, Option<Event>) {
        if data1.len() < 3 {
            return (None, None);
        }
        let bars = data1.bars();
        let close = |i: usize| if let Event::Bar { close, .. } = &bars[i] { *close } else { 0.0 };
        let open = |i: usize| if let Event::Bar { open, .. } = &bars[i] { *open } else { 0.0 };

        let (c0, c1, c2) = (close(0), close(1), close(2));
        let filter1_long = c0 > c1 && c1 > open(1) && c2 > open(2);
        let filter1_short = c0 < c1 && c1 < open(1) && c2 < open(2);

        if !filter1_long && !filter1_short {
            return (None, None);
        }

        let fract = self.fract_n as f64 * 0.1;
        let today_open = self.prelim.open_d[0];
        let prior_range = self.prelim.high_d[1] - self.prelim.low_d[1];
        let level_long = today_open + fract * prior_range;
        let level_short = today_open - fract * prior_range;

        let enter_long = self.prelim.trading_enabled && filter1_long;
        let enter_short = self.prelim.trading_enabled && filter1_short;

        let Event::Bar { timestamp, .. } = &bars[0] else {
            return (None, None);
        };
        let timestamp = *timestamp;

        entry_signals(
            &self.symbol,
            timestamp,
            &self.name,
            enter_long,
            enter_short,
            level_long,
            level_short,
            self.stoploss_currency(),
        )
    }

    fn compute_exit(
        &self,
        data1: &crate::price_collection::BarHistory,
        position_handler: &PositionHandler,
        market_position: i32,
    ) -> (Option<Event>, Option<Event>) {
        let bars = data1.bars();
        if bars.len() < 2 {
            return (None, None);
        }
        let Event::Bar { timestamp, close, .. } = &bars[0] else {
            return (None, None);
        };
        let (timestamp, close) = (*timestamp, *close);
        let prev_timestamp = bars[1].timestamp();

        let one_bar_before_close = self
            .one_bar_before_close
            .unwrap_or(self.symbol.session_close_time);

        let ctx = ExitContext {
            current_time: self.prelim.current_time,
            current_weekday: self.prelim.current_weekday,
            one_bar_before_close,
            prev_to_current_minutes: minutes_between(prev_timestamp.time(), timestamp.time()),
            close_to_open_minutes: self.close_to_open_minutes,
            timeframe_minutes: self.timeframe_minutes,
        };

        let pos = position_handler
            .open_positions()
            .iter()
            .find(|p| p.strategy_name == self.name);
        let (bars_in_trade, days_in_trade) = pos.map(|p| (p.bars_in_trade, p.days_in_trade)).unwrap_or((0, 0));

        let should_exit = exit_condition(ExitSwitch::EndOfDay, &ctx, bars_in_trade, days_in_trade);

        let exit_long = market_position > 0 && should_exit;
        let exit_short = market_position < 0 && should_exit;

        exit_signals(
            &self.symbol,
            timestamp,
            &self.name,
            exit_long,
            exit_short,
            position_handler,
            close,
        )
    }
}
