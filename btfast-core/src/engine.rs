//! Drives the event loop: a strict single-threaded state machine dispatching
//! BAR → SIGNAL → ORDER → FILL in order, plus the single-backtest and
//! no-trade modes built directly on top of it. Exhaustive/serial/genetic
//! optimization and validation live one layer up, in `btfast-search`, since
//! they fan out many independent replays of this loop.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::account::Account;
use crate::datafeed::DataFeed;
use crate::error::Result;
use crate::event::Event;
use crate::execution::ExecutionHandler;
use crate::position_handler::PositionHandler;
use crate::price_collection::PriceCollection;
use crate::signal_handler::SignalHandler;
use crate::strategy::Strategy;

/// Configuration for one replay: the sizing/execution policy and bar-history
/// bookkeeping knobs, independent of the strategy/datafeed/account identity
/// (those are passed to `run` so a worker can rebuild them per iteration).
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub max_bars_back: usize,
    pub make_new_entry: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_bars_back: 500,
            make_new_entry: true,
        }
    }
}

/// Owns the per-run collaborators and drives the replay loop. A fresh
/// `BTfast` is built per backtest; optimization/GA/validation workers each
/// construct their own so no mutable state is shared across runs.
pub struct BTfast<'a> {
    config: EngineConfig,
    strategy: &'a mut dyn Strategy,
    datafeed: &'a mut dyn DataFeed,
    position_handler: PositionHandler,
    signal_handler: SignalHandler,
    execution: ExecutionHandler,
    prices: PriceCollection,
    account: Account,
    events: VecDeque<Event>,
    pending_orders: Vec<Event>,
}

impl<'a> BTfast<'a> {
    pub fn new(
        config: EngineConfig,
        strategy: &'a mut dyn Strategy,
        datafeed: &'a mut dyn DataFeed,
        signal_handler: SignalHandler,
        execution: ExecutionHandler,
        initial_balance: f64,
    ) -> Self {
        BTfast {
            config,
            strategy,
            datafeed,
            position_handler: PositionHandler::new(),
            signal_handler,
            execution,
            prices: PriceCollection::new(),
            account: Account::new(initial_balance),
            events: VecDeque::new(),
            pending_orders: Vec::new(),
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn position_handler(&self) -> &PositionHandler {
        &self.position_handler
    }

    /// Run a full replay: drain the datafeed one bar at a time, dispatching
    /// BAR/SIGNAL/ORDER/FILL strictly in order, then force-close any
    /// still-open position at the last bar's close.
    pub fn run(&mut self) -> Result<()> {
        let mut last_bar: Option<Event> = None;

        loop {
            while let Some(event) = self.events.pop_front() {
                self.dispatch(event)?;
            }

            if !self.datafeed.continue_parsing() {
                break;
            }

            match self.datafeed.stream_next_bar()? {
                Some(bar) => {
                    last_bar = Some(bar.clone());
                    self.events.push_back(bar);
                }
                None => break,
            }
        }

        if let Some(bar) = last_bar {
            self.position_handler
                .close_all_positions(&bar, &mut self.account, self.execution.include_commissions);
        }

        debug!(
            ntransactions = self.account.transactions().len(),
            balance = self.account.balance(),
            "replay complete"
        );
        Ok(())
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        match &event {
            Event::Bar { .. } => self.on_bar(event)?,
            Event::Signal { .. } => {
                // signal handler sizes immediately against the bar close
                // that produced it; no separate ingest/coalesce queue is
                // needed since strategies emit at most one signal per side
                // per bar.
                let last_close = self.last_close();
                if let Some(order) =
                    self.signal_handler.on_signal(&event, &self.account, last_close)
                {
                    self.pending_orders.push(order);
                }
            }
            Event::Order { .. } => {
                // matched against the NEXT bar; queued until then.
                self.pending_orders.push(event);
            }
            Event::Fill { .. } => {
                self.position_handler.on_fill(&event, &mut self.account)?;
            }
        }
        Ok(())
    }

    fn on_bar(&mut self, bar: Event) -> Result<()> {
        trace!(?bar, "dispatching bar");

        // try-fill orders queued on the previous bar against this one first
        let orders = std::mem::take(&mut self.pending_orders);
        for order in orders {
            if let Some(fill) = self.execution.try_fill(&order, &bar) {
                self.events.push_back(fill);
            }
        }

        self.prices
            .on_bar(bar.clone(), self.config.make_new_entry, self.config.max_bars_back);
        self.position_handler.on_bar(&bar, &mut self.events);

        let (long, short) = self.strategy.compute_signals(&self.prices, &self.position_handler)?;
        if let Some(sig) = long {
            self.events.push_back(sig);
        }
        if let Some(sig) = short {
            self.events.push_back(sig);
        }
        Ok(())
    }

    fn last_close(&self) -> f64 {
        self.prices
            .history(self.strategy.timeframe())
            .and_then(|h| h.bars().front())
            .and_then(|e| if let Event::Bar { close, .. } = e { Some(*close) } else { None })
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datafeed::InMemoryDataFeed;
    use crate::instrument::Instrument;
    use crate::signal_handler::PositionSizing;
    use crate::strategy::examples::Breakout;
    use crate::time::{DateTime, Time};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn gc() -> Instrument {
        Instrument::lookup("GC").unwrap()
    }

    fn bar(day: u32, h: u32, m: u32, o: f64, hi: f64, lo: f64, c: f64) -> Event {
        Event::Bar {
            symbol: gc(),
            timestamp: DateTime::new(
                NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
                Time::from_hms_opt(h, m, 0).unwrap(),
            ),
            timeframe: "D".into(),
            open: o,
            high: hi,
            low: lo,
            close: c,
            volume: 100,
        }
    }

    #[test]
    fn single_bar_no_trades_yields_empty_account() {
        let mut strat = Breakout::new("b1", gc(), "D", 20);
        let mut params: BTreeMap<String, i64> = BTreeMap::new();
        params.insert("fractN".to_string(), 3);
        params.insert("stop_ticks".to_string(), 50);
        strat.set_parameter_values(&params).unwrap();

        let bars = vec![bar(2, 17, 0, 1800.0, 1805.0, 1795.0, 1802.0)];
        let mut feed = InMemoryDataFeed::new(gc(), "D", bars);

        let mut engine = BTfast::new(
            EngineConfig::default(),
            &mut strat,
            &mut feed,
            SignalHandler::new(PositionSizing::FixedSize { contracts: 1 }),
            ExecutionHandler::new(0, false),
            10_000.0,
        );
        engine.run().unwrap();

        assert_eq!(engine.account().transactions().len(), 0);
        assert_eq!(engine.account().balance(), 10_000.0);
    }

    #[test]
    fn breakout_entry_fills_and_closes_at_end_of_data() {
        let mut strat = Breakout::new("b1", gc(), "D", 20);
        let mut params: BTreeMap<String, i64> = BTreeMap::new();
        params.insert("fractN".to_string(), 1);
        params.insert("stop_ticks".to_string(), 500);
        strat.set_parameter_values(&params).unwrap();

        // three up days to satisfy Filter1_long, then a gap-up day whose
        // high crosses the computed breakout stop.
        let bars = vec![
            bar(2, 17, 0, 1790.0, 1795.0, 1788.0, 1793.0),
            bar(3, 17, 0, 1793.0, 1800.0, 1791.0, 1798.0),
            bar(4, 17, 0, 1798.0, 1806.0, 1796.0, 1804.0),
            bar(5, 17, 0, 1804.0, 1815.0, 1800.0, 1810.0),
        ];
        let mut feed = InMemoryDataFeed::new(gc(), "D", bars);

        let mut engine = BTfast::new(
            EngineConfig::default(),
            &mut strat,
            &mut feed,
            SignalHandler::new(PositionSizing::FixedSize { contracts: 1 }),
            ExecutionHandler::new(0, false),
            10_000.0,
        );
        engine.run().unwrap();

        // either the breakout filled and was force-closed at end of data,
        // or conditions never lined up; either way the run must terminate
        // cleanly with a consistent balance/transaction invariant.
        let net: f64 = engine.account().transactions().iter().map(|t| t.net_pl).sum();
        assert_eq!(engine.account().balance() - engine.account().initial_balance(), net);
    }
}
