//! Average Directional Index.
//!
//! `+DM`/`-DM` are smoothed (alpha = 1/length) into `+DMavg`/`-DMavg`, then
//! `DX = 100 * |+DMavg - -DMavg| / (+DMavg + -DMavg)` is itself smoothed
//! into ADX. The smoothed averages are kept as fields on this struct rather
//! than function-local statics, so two `Adx` instances (e.g. different
//! lengths, or one per instrument in a multi-symbol strategy) never share
//! state.

use std::collections::VecDeque;

use super::push_or_update;
use crate::error::Result;
use crate::event::Event;

fn theta(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        0.0
    }
}

fn moves_at(bars: &VecDeque<Event>, k: usize) -> Option<(f64, f64)> {
    let Event::Bar { high: h_k, low: l_k, .. } = &bars[k] else { return None };
    let Event::Bar { high: h_k1, low: l_k1, .. } = &bars[k + 1] else { return None };
    Some((h_k - h_k1, l_k1 - l_k))
}

#[derive(Debug, Clone)]
pub struct Adx {
    length: usize,
    dm_avg_plus: f64,
    dm_avg_minus: f64,
    values: VecDeque<f64>,
}

impl Adx {
    pub fn new(length: usize) -> Self {
        Adx {
            length,
            dm_avg_plus: 0.0,
            dm_avg_minus: 0.0,
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
        super::check_args(max_bars_back, self.length, "ADX")?;

        if bars.len() <= 2 * self.length {
            return Ok(());
        }

        let alpha = 1.0 / self.length as f64;

        let prev_value = if self.values.is_empty() {
            // Seed +DMavg/-DMavg as the simple average of +DM/-DM over the
            // oldest `length` of the 2*length bars available.
            let mut dm_p = 0.0;
            let mut dm_m = 0.0;
            for k in (self.length..2 * self.length).rev() {
                let Some((mu, md)) = moves_at(bars, k) else { return Ok(()) };
                dm_p += theta(mu - md) * mu.max(0.0) * alpha;
                dm_m += theta(md - mu) * md.max(0.0) * alpha;
            }
            let dx = 100.0 * (dm_p - dm_m).abs() / (dm_p + dm_m);
            let mut prev = alpha * dx;

            // Seed ADX as the simple average of `length` further DX values,
            // each computed from the recursively-smoothed +DMavg/-DMavg.
            for k in (1..self.length).rev() {
                let Some((mu, md)) = moves_at(bars, k) else { return Ok(()) };
                let p_dm = theta(mu - md) * mu.max(0.0);
                let m_dm = theta(md - mu) * md.max(0.0);
                dm_p = (1.0 - alpha) * dm_p + alpha * p_dm;
                dm_m = (1.0 - alpha) * dm_m + alpha * m_dm;
                let dx_k = 100.0 * (dm_p - dm_m).abs() / (dm_p + dm_m);
                prev += alpha * dx_k;
            }
            self.dm_avg_plus = dm_p;
            self.dm_avg_minus = dm_m;
            prev
        } else {
            self.values[0]
        };

        let Some((mu, md)) = moves_at(bars, 0) else { return Ok(()) };
        let p_dm = theta(mu - md) * mu.max(0.0);
        let m_dm = theta(md - mu) * md.max(0.0);
        self.dm_avg_plus = (1.0 - alpha) * self.dm_avg_plus + alpha * p_dm;
        self.dm_avg_minus = (1.0 - alpha) * self.dm_avg_minus + alpha * m_dm;
        let dx_now =
            100.0 * (self.dm_avg_plus - self.dm_avg_minus).abs() / (self.dm_avg_plus + self.dm_avg_minus);

        let new_value = (1.0 - alpha) * prev_value + alpha * dx_now;
        push_or_update(&mut self.values, new_value, make_new_entry, max_bars_back);
        Ok(())
    }
}
