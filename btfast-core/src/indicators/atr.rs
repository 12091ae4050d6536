//! Average True Range, Wilder-smoothed: `ATR[t] = alpha*TR[t] + (1-alpha)*ATR[t-1]`,
//! `alpha = 1/length`, seeded by the simple average of the first `length`
//! true ranges.

use std::collections::VecDeque;

use super::push_or_update;
use crate::error::Result;
use crate::event::Event;

fn true_range_at(bars: &VecDeque<Event>, k: usize) -> Option<f64> {
    let Event::Bar { high, low, .. } = &bars[k] else { return None };
    let Event::Bar { close: prev_close, .. } = &bars[k + 1] else { return None };
    Some(high.max(*prev_close) - low.min(*prev_close))
}

#[derive(Debug, Clone)]
pub struct Atr {
    length: usize,
    values: VecDeque<f64>,
}

impl Atr {
    pub fn new(length: usize) -> Self {
        Atr {
            length,
            values: VecDeque::new(),
        }
    }

    pub fn values(&self) -> &VecDeque<f64> {
        &self.values
    }

    pub fn update(
        &mut self,
        bars: &VecDeque<Event>,
        make_new_entry: bool,
        max_bars_back: usize,
    ) -> Result<()> {
        super::check_args(max_bars_back, self.length, "ATR")?;

        if bars.len() <= self.length {
            return Ok(());
        }

        let alpha = 1.0 / self.length as f64;

        let prev_value = if self.values.is_empty() {
            let Event::Bar { high, low, .. } = &bars[self.length] else { return Ok(()) };
            let mut seed = alpha * (high - low);
            for k in (1..self.length).rev() {
                let Some(tr) = true_range_at(bars, k) else { return Ok(()) };
                seed += alpha * tr;
            }
            seed
        } else {
            self.values[0]
        };

        let Some(tr_now) = true_range_at(bars, 0) else { return Ok(()) };
        let new_value = (1.0 - alpha) * prev_value + alpha * tr_now;

        push_or_update(&mut self.values, new_value, make_new_entry, max_bars_back);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::time::Time;
    use chrono::NaiveDate;

    fn bar(high: f64, low: f64, close: f64) -> Event {
        Event::Bar {
            symbol: Instrument::lookup("GC").unwrap(),
            timestamp: chrono::NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                Time::from_hms_opt(9, 0, 0).unwrap(),
            ),
            timeframe: "D".into(),
            open: (high + low) / 2.0,
            high,
            low,
            close,
            volume: 0,
        }
    }

    #[test]
    fn atr_needs_more_than_length_bars() {
        let mut history = VecDeque::new();
        history.push_front(bar(105.0, 95.0, 100.0));
        let mut atr = Atr::new(3);
        atr.update(&history, true, 20).unwrap();
        assert!(atr.values().is_empty());
    }

    #[test]
    fn atr_seeds_then_recurses() {
        let mut history: VecDeque<Event> = VecDeque::new();
        // oldest to newest: pushed front each time so index 0 is newest
        for (h, l, c) in [
            (105.0, 95.0, 100.0),
            (108.0, 100.0, 106.0),
            (107.0, 98.0, 99.0),
            (103.0, 97.0, 101.0),
        ] {
            history.push_front(bar(h, l, c));
        }
        let mut atr = Atr::new(2);
        atr.update(&history, true, 20).unwrap();
        assert_eq!(atr.values().len(), 1);
        assert!(atr.values()[0] > 0.0);
    }
}
