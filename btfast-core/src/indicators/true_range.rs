//! True Range: `max(high, prev_close) - min(low, prev_close)`.

use std::collections::VecDeque;

use super::push_or_update;
use crate::error::Result;
use crate::event::Event;

#[derive(Debug, Clone, Default)]
pub struct TrueRange {
    values: VecDeque<f64>,
}

impl TrueRange {
    pub fn new() -> Self {
        Self::default()
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
        super::check_args(max_bars_back, 1, "TrueRange")?;

        let new_value = match bars.len() {
            0 => return Ok(()),
            1 => {
                let Event::Bar { high, low, .. } = &bars[0] else { return Ok(()) };
                high - low
            }
            _ => {
                let Event::Bar { high, low, .. } = &bars[0] else { return Ok(()) };
                let Event::Bar { close: prev_close, .. } = &bars[1] else { return Ok(()) };
                high.max(*prev_close) - low.min(*prev_close)
            }
        };

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
    fn single_bar_is_high_minus_low() {
        let mut history = VecDeque::new();
        history.push_front(bar(110.0, 100.0, 105.0));
        let mut tr = TrueRange::new();
        tr.update(&history, true, 10).unwrap();
        assert_eq!(tr.values()[0], 10.0);
    }

    #[test]
    fn gap_widens_true_range() {
        let mut history = VecDeque::new();
        history.push_front(bar(98.0, 92.0, 95.0)); // prev bar, index 1 after next push
        history.push_front(bar(115.0, 108.0, 112.0)); // current bar, index 0
        let mut tr = TrueRange::new();
        tr.update(&history, true, 10).unwrap();
        // max(115, 95) - min(108, 95) = 115 - 95 = 20
        assert_eq!(tr.values()[0], 20.0);
    }

    #[test]
    fn make_new_entry_false_overwrites_front() {
        let mut history = VecDeque::new();
        history.push_front(bar(110.0, 100.0, 105.0));
        let mut tr = TrueRange::new();
        tr.update(&history, true, 10).unwrap();
        history[0] = bar(120.0, 100.0, 110.0);
        tr.update(&history, false, 10).unwrap();
        assert_eq!(tr.values().len(), 1);
        assert_eq!(tr.values()[0], 20.0);
    }
}
