//! Rate Of Change: `(price[0] / price[length] - 1) * 100`.

use std::collections::VecDeque;

use super::push_or_update;
use crate::error::Result;
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppliedPrice {
    Open,
    High,
    Low,
    Close,
}

impl AppliedPrice {
    fn extract(self, bar: &Event) -> Option<f64> {
        if let Event::Bar { open, high, low, close, .. } = bar {
            Some(match self {
                AppliedPrice::Open => *open,
                AppliedPrice::High => *high,
                AppliedPrice::Low => *low,
                AppliedPrice::Close => *close,
            })
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct Roc {
    length: usize,
    applied_price: AppliedPrice,
    values: VecDeque<f64>,
}

impl Roc {
    pub fn new(length: usize, applied_price: AppliedPrice) -> Self {
        Roc {
            length,
            applied_price,
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
        super::check_args(max_bars_back, self.length, "ROC")?;

        if bars.len() <= self.length {
            return Ok(());
        }

        let (Some(now), Some(then)) = (
            self.applied_price.extract(&bars[0]),
            self.applied_price.extract(&bars[self.length]),
        ) else {
            return Ok(());
        };

        let new_value = (now / then - 1.0) * 100.0;
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

    fn bar(close: f64) -> Event {
        Event::Bar {
            symbol: Instrument::lookup("GC").unwrap(),
            timestamp: chrono::NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
                Time::from_hms_opt(9, 0, 0).unwrap(),
            ),
            timeframe: "D".into(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }

    #[test]
    fn roc_needs_more_than_length_bars() {
        let mut history = VecDeque::new();
        history.push_front(bar(100.0));
        let mut roc = Roc::new(5, AppliedPrice::Close);
        roc.update(&history, true, 20).unwrap();
        assert!(roc.values().is_empty());
    }

    #[test]
    fn roc_basic_percent_change() {
        let mut history: VecDeque<Event> = VecDeque::new();
        for close in [100.0, 102.0, 104.0] {
            history.push_front(bar(close));
        }
        // history[0] = 104 (newest), history[2] = 100 (oldest)
        let mut roc = Roc::new(2, AppliedPrice::Close);
        roc.update(&history, true, 20).unwrap();
        assert!((roc.values()[0] - 4.0).abs() < 1e-9);
    }
}
