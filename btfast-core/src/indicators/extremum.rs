//! Highest-high / lowest-low of the last `length` bars, current bar excluded.

use std::collections::VecDeque;

use super::push_or_update;
use crate::error::Result;
use crate::event::Event;

macro_rules! extremum_indicator {
    ($name:ident, $field:ident, $fold:ident, $label:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            length: usize,
            values: VecDeque<f64>,
        }

        impl $name {
            pub fn new(length: usize) -> Self {
                $name {
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
                super::check_args(max_bars_back, self.length, $label)?;

                if bars.len() <= self.length {
                    return Ok(());
                }

                let mut new_value = match &bars[self.length] {
                    Event::Bar { $field, .. } => *$field,
                    _ => return Ok(()),
                };
                for k in (1..=self.length).rev() {
                    if let Event::Bar { $field, .. } = &bars[k] {
                        new_value = new_value.$fold(*$field);
                    }
                }

                push_or_update(&mut self.values, new_value, make_new_entry, max_bars_back);
                Ok(())
            }
        }
    };
}

extremum_indicator!(HighestHigh, high, max, "HighestHigh");
extremum_indicator!(LowestLow, low, min, "LowestLow");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::Instrument;
    use crate::time::Time;
    use chrono::NaiveDate;

    fn bar(high: f64, low: f64) -> Event {
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
            close: (high + low) / 2.0,
            volume: 0,
        }
    }

    #[test]
    fn highest_high_excludes_current_bar() {
        let mut history: VecDeque<Event> = VecDeque::new();
        for h in [110.0, 108.0, 120.0] {
            history.push_front(bar(h, h - 10.0));
        }
        // history[0] = 120 (current, excluded), history[1]=108, history[2]=110
        let mut hh = HighestHigh::new(2);
        hh.update(&history, true, 20).unwrap();
        assert_eq!(hh.values()[0], 110.0);
    }

    #[test]
    fn lowest_low_excludes_current_bar() {
        let mut history: VecDeque<Event> = VecDeque::new();
        for h in [110.0, 108.0, 120.0] {
            history.push_front(bar(h, h - 10.0));
        }
        let mut ll = LowestLow::new(2);
        ll.update(&history, true, 20).unwrap();
        assert_eq!(ll.values()[0], 98.0);
    }
}
