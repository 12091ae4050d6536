//! The data source abstraction: a stream of BAR events for one instrument
//! and timeframe, plus minimal CSV/in-memory implementations for tests.

use crate::error::{Error, Result};
use crate::event::Event;
use crate::instrument::Instrument;
use crate::time::{Date, DateTime, Time};

/// The three historical CSV layouts the original engine accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvFormat {
    /// `MM/DD/YYYY,HH:MM,O,H,L,C,Vup,Vdn` (TradeStation intraday).
    TradeStationIntraday,
    /// `MM/DD/YYYY,HH:MM,O,H,L,C,V,OI` (TradeStation daily).
    TradeStationDaily,
    /// `YYYY-MM-DD,HH:MM,O,H,L,C,Vol` (MatLab/DXT export).
    MatLab,
}

/// A source of BAR events for one instrument/timeframe, replayed in order.
///
/// Implementors own their own cursor; `clone_boxed` lets the engine hand an
/// independent copy to each optimization/GA worker (spec: workers never
/// share datafeed state).
pub trait DataFeed: Send {
    fn symbol(&self) -> &Instrument;
    fn timeframe(&self) -> &str;
    fn continue_parsing(&self) -> bool;
    fn reset_cursor(&mut self);
    fn stream_next_bar(&mut self) -> Result<Option<Event>>;
    fn clone_boxed(&self) -> Box<dyn DataFeed>;
}

/// An in-memory datafeed backed by a pre-loaded bar list, useful for tests
/// and for the noise-perturbed datafeed used by the Monte-Carlo validation
/// gate.
#[derive(Debug, Clone)]
pub struct InMemoryDataFeed {
    symbol: Instrument,
    timeframe: String,
    bars: Vec<Event>,
    cursor: usize,
}

impl InMemoryDataFeed {
    pub fn new(symbol: Instrument, timeframe: impl Into<String>, bars: Vec<Event>) -> Self {
        InMemoryDataFeed {
            symbol,
            timeframe: timeframe.into(),
            bars,
            cursor: 0,
        }
    }
}

impl DataFeed for InMemoryDataFeed {
    fn symbol(&self) -> &Instrument {
        &self.symbol
    }

    fn timeframe(&self) -> &str {
        &self.timeframe
    }

    fn continue_parsing(&self) -> bool {
        self.cursor < self.bars.len()
    }

    fn reset_cursor(&mut self) {
        self.cursor = 0;
    }

    fn stream_next_bar(&mut self) -> Result<Option<Event>> {
        if self.cursor >= self.bars.len() {
            return Ok(None);
        }
        let bar = self.bars[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(bar))
    }

    fn clone_boxed(&self) -> Box<dyn DataFeed> {
        Box::new(self.clone())
    }
}

/// A minimal reader for the three historical CSV layouts. Parses rows
/// already split by the caller (no file I/O here — a concrete reader is out
/// of scope; this exists for test fixtures built from literal CSV text).
pub fn parse_csv_row(
    row: &str,
    format: CsvFormat,
    symbol: &Instrument,
    timeframe: &str,
) -> Result<Event> {
    let cols: Vec<&str> = row.trim().split(',').collect();

    let parse_date = |s: &str| -> Result<Date> {
        match format {
            CsvFormat::MatLab => {
                let (y, m, d) = split3(s, '-')?;
                Date::from_ymd_opt(y, m, d)
                    .ok_or_else(|| Error::Data(format!("invalid date: {s}")))
            }
            _ => {
                let (m, d, y) = split3(s, '/')?;
                Date::from_ymd_opt(y, m, d)
                    .ok_or_else(|| Error::Data(format!("invalid date: {s}")))
            }
        }
    };

    let min_cols = match format {
        CsvFormat::TradeStationIntraday => 8,
        CsvFormat::TradeStationDaily => 7,
        CsvFormat::MatLab => 7,
    };
    if cols.len() < min_cols {
        return Err(Error::Data(format!("malformed CSV row: {row}")));
    }

    let (date_col, time_col, o, h, l, c, vol_cols) = match format {
        CsvFormat::TradeStationIntraday => (0, 1, 2, 3, 4, 5, &cols[6..8]),
        CsvFormat::TradeStationDaily => (0, 1, 2, 3, 4, 5, &cols[6..7]),
        CsvFormat::MatLab => (0, 1, 2, 3, 4, 5, &cols[6..7]),
    };

    let date = parse_date(cols[date_col])?;
    let (hh, mm) = {
        let (h, m) = cols[time_col]
            .split_once(':')
            .ok_or_else(|| Error::Data(format!("invalid time: {}", cols[time_col])))?;
        (parse_int(h)?, parse_int(m)?)
    };
    let time = Time::from_hms_opt(hh as u32, mm as u32, 0)
        .ok_or_else(|| Error::Data("invalid hour/minute".to_string()))?;

    let volume: i64 = match format {
        CsvFormat::TradeStationIntraday => {
            vol_cols.iter().map(|v| parse_int(v).unwrap_or(0)).sum()
        }
        _ => parse_int(vol_cols[0]).unwrap_or(0),
    };

    Ok(Event::Bar {
        symbol: symbol.clone(),
        timestamp: DateTime::new(date, time),
        timeframe: timeframe.to_string(),
        open: parse_f64(cols[o])?,
        high: parse_f64(cols[h])?,
        low: parse_f64(cols[l])?,
        close: parse_f64(cols[c])?,
        volume,
    })
}

fn split3(s: &str, sep: char) -> Result<(i32, u32, u32)> {
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() != 3 {
        return Err(Error::Data(format!("invalid date: {s}")));
    }
    match sep {
        '-' => Ok((parse_int(parts[0])? as i32, parse_int(parts[1])? as u32, parse_int(parts[2])? as u32)),
        _ => Ok((parse_int(parts[2])? as i32, parse_int(parts[0])? as u32, parse_int(parts[1])? as u32)),
    }
}

fn parse_int(s: &str) -> Result<i64> {
    s.trim()
        .parse()
        .map_err(|_| Error::Data(format!("invalid integer: {s}")))
}

fn parse_f64(s: &str) -> Result<f64> {
    s.trim()
        .parse()
        .map_err(|_| Error::Data(format!("invalid number: {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tradestation_intraday_row_parses() {
        let gc = Instrument::lookup("GC").unwrap();
        let ev = parse_csv_row(
            "01/02/2024,09:30,1800.0,1805.0,1795.0,1802.0,120,80",
            CsvFormat::TradeStationIntraday,
            &gc,
            "M30",
        )
        .unwrap();
        if let Event::Bar { open, high, low, close, volume, .. } = ev {
            assert_eq!(open, 1800.0);
            assert_eq!(high, 1805.0);
            assert_eq!(low, 1795.0);
            assert_eq!(close, 1802.0);
            assert_eq!(volume, 200);
        } else {
            panic!("expected bar");
        }
    }

    #[test]
    fn short_row_is_a_data_error_not_a_panic() {
        let gc = Instrument::lookup("GC").unwrap();
        let result = parse_csv_row("01/02/2024,09:30,1800.0,1805.0,1795.0,1802.0", CsvFormat::TradeStationIntraday, &gc, "M30");
        assert!(matches!(result, Err(Error::Data(_))));

        let result = parse_csv_row("01/02/2024,09:30,1800.0,1805.0,1795.0,1802.0", CsvFormat::TradeStationDaily, &gc, "D");
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn matlab_row_parses_iso_date() {
        let gc = Instrument::lookup("GC").unwrap();
        let ev = parse_csv_row(
            "2024-01-02,09:30,1800.0,1805.0,1795.0,1802.0,200",
            CsvFormat::MatLab,
            &gc,
            "M30",
        )
        .unwrap();
        assert_eq!(ev.symbol().name, "GC");
    }

    #[test]
    fn in_memory_feed_streams_bars_in_order() {
        let gc = Instrument::lookup("GC").unwrap();
        let bars = vec![
            parse_csv_row(
                "01/02/2024,09:30,1800.0,1805.0,1795.0,1802.0,120,80",
                CsvFormat::TradeStationIntraday,
                &gc,
                "M30",
            )
            .unwrap(),
            parse_csv_row(
                "01/02/2024,10:00,1802.0,1808.0,1800.0,1806.0,100,60",
                CsvFormat::TradeStationIntraday,
                &gc,
                "M30",
            )
            .unwrap(),
        ];
        let mut feed = InMemoryDataFeed::new(gc, "M30", bars);
        assert!(feed.continue_parsing());
        let first = feed.stream_next_bar().unwrap().unwrap();
        assert_eq!(first.timestamp().time(), Time::from_hms_opt(9, 30, 0).unwrap());
        feed.stream_next_bar().unwrap();
        assert!(!feed.continue_parsing());
        feed.reset_cursor();
        assert!(feed.continue_parsing());
    }
}
