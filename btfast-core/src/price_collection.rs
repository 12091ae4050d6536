//! Bounded, newest-first bar history per timeframe, plus synthesis of a "D"
//! (daily/session) bar from an intraday stream.
//!
//! Indicators and strategies read history through here rather than from the
//! datafeed directly: the collection caps how far back a timeframe's deque
//! grows (`max_bars_back`) and owns the make-new-entry/overwrite bookkeeping
//! so every consumer sees the same bar count.

use std::collections::{HashMap, VecDeque};

use crate::event::Event;
use crate::instrument::Instrument;
use crate::time::DateTime;

/// One timeframe's bounded bar history (index 0 = most recent bar).
#[derive(Debug, Clone, Default)]
pub struct BarHistory {
    bars: VecDeque<Event>,
}

impl BarHistory {
    pub fn bars(&self) -> &VecDeque<Event> {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    fn push(&mut self, bar: Event, make_new_entry: bool, max_bars_back: usize) {
        if make_new_entry {
            if self.bars.len() >= max_bars_back {
                self.bars.pop_back();
            }
            self.bars.push_front(bar);
        } else if let Some(front) = self.bars.front_mut() {
            *front = bar;
        } else {
            self.bars.push_front(bar);
        }
    }
}

/// Running accumulator for the "D" bar being synthesized from an intraday
/// stream, reset at the start of every session.
#[derive(Debug, Clone)]
struct SessionAccumulator {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
    session_start: DateTime,
}

/// Per-symbol set of timeframe histories, keyed by timeframe label
/// ("M1", "M5", "D", ...).
#[derive(Debug, Clone, Default)]
pub struct PriceCollection {
    timeframes: HashMap<String, BarHistory>,
    session: Option<SessionAccumulator>,
}

impl PriceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self, timeframe: &str) -> Option<&BarHistory> {
        self.timeframes.get(timeframe)
    }

    /// Record an incoming bar verbatim under its own timeframe. "D" is
    /// synthesized from an intraday stream only when the incoming stream is
    /// itself intraday (spec §4.1); a feed whose own timeframe is already
    /// "D" is recorded as-is and never re-accumulated into its own history.
    pub fn on_bar(&mut self, bar: Event, make_new_entry: bool, max_bars_back: usize) {
        let Event::Bar { symbol, timestamp, timeframe, open, high, low, close, volume } = bar.clone()
        else {
            return;
        };

        let is_intraday = timeframe != "D";

        self.timeframes
            .entry(timeframe)
            .or_default()
            .push(bar, make_new_entry, max_bars_back);

        if !is_intraday {
            return;
        }

        self.accumulate_session(&symbol, timestamp, open, high, low, close, volume, make_new_entry);

        if timestamp.time() == symbol.session_close_time {
            self.flush_session(&symbol, timestamp, max_bars_back);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn accumulate_session(
        &mut self,
        symbol: &Instrument,
        timestamp: DateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
        make_new_entry: bool,
    ) {
        let is_new_session = !make_new_entry
            || self
                .session
                .as_ref()
                .map(|s| timestamp.date() != s.session_start.date() && !symbol.two_days_session)
                .unwrap_or(true);

        match &mut self.session {
            Some(acc) if !is_new_session => {
                acc.high = acc.high.max(high);
                acc.low = acc.low.min(low);
                acc.close = close;
                acc.volume += volume;
            }
            _ => {
                self.session = Some(SessionAccumulator {
                    open,
                    high,
                    low,
                    close,
                    volume,
                    session_start: timestamp,
                });
            }
        }
    }

    fn flush_session(&mut self, symbol: &Instrument, timestamp: DateTime, max_bars_back: usize) {
        if let Some(acc) = self.session.take() {
            let daily = Event::Bar {
                symbol: symbol.clone(),
                timestamp,
                timeframe: "D".to_string(),
                open: acc.open,
                high: acc.high,
                low: acc.low,
                close: acc.close,
                volume: acc.volume,
            };
            self.timeframes
                .entry("D".to_string())
                .or_default()
                .push(daily, true, max_bars_back);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Time;
    use chrono::NaiveDate;

    fn bar(symbol: &Instrument, h: u32, m: u32, close: f64) -> Event {
        Event::Bar {
            symbol: symbol.clone(),
            timestamp: DateTime::new(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                Time::from_hms_opt(h, m, 0).unwrap(),
            ),
            timeframe: "M30".to_string(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10,
        }
    }

    #[test]
    fn intraday_bars_accumulate_under_their_timeframe() {
        let gc = Instrument::lookup("GC").unwrap();
        let mut pc = PriceCollection::new();
        pc.on_bar(bar(&gc, 9, 0, 100.0), true, 50);
        pc.on_bar(bar(&gc, 9, 30, 101.0), true, 50);
        assert_eq!(pc.history("M30").unwrap().len(), 2);
    }

    #[test]
    fn session_close_time_flushes_a_daily_bar() {
        let gc = Instrument::lookup("GC").unwrap();
        let mut pc = PriceCollection::new();
        pc.on_bar(bar(&gc, 9, 0, 100.0), true, 50);
        let close_time = gc.session_close_time;
        let closing_bar = Event::Bar {
            symbol: gc.clone(),
            timestamp: DateTime::new(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), close_time),
            timeframe: "M30".to_string(),
            open: 102.0,
            high: 103.0,
            low: 101.0,
            close: 102.0,
            volume: 10,
        };
        pc.on_bar(closing_bar, true, 50);
        assert_eq!(pc.history("D").unwrap().len(), 1);
    }

    #[test]
    fn max_bars_back_bounds_history_length() {
        let gc = Instrument::lookup("GC").unwrap();
        let mut pc = PriceCollection::new();
        for i in 0..10 {
            pc.on_bar(bar(&gc, 9, i, 100.0 + i as f64), true, 3);
        }
        assert_eq!(pc.history("M30").unwrap().len(), 3);
    }
}
