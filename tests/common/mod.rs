#![allow(dead_code)]

use chrono::NaiveDate;
pub use stratgen::domain::dataset::{DataSet, InstrumentProperties};
use stratgen::domain::error::GeneratorError;
use stratgen::domain::indicator::bar_price::{BAR_CLOSING, BAR_OPENING};
pub use stratgen::domain::ohlcv::OhlcvBar;
use stratgen::domain::param::SlotRole;
use stratgen::domain::strategy::{IndicatorSlot, Strategy};
use stratgen::ports::backtest_port::Backtester;
use stratgen::ports::dataset_port::PriceDataset;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Scores with a closure and records every score it returns.
pub struct MockBacktester<F> {
    score: F,
    pub calls: AtomicUsize,
    pub scores: Mutex<Vec<f64>>,
    /// Evaluation number (1-based) that fails, if any.
    pub fail_on: Option<usize>,
}

impl<F> MockBacktester<F>
where
    F: Fn(&Strategy) -> f64 + Send + Sync,
{
    pub fn new(score: F) -> Self {
        Self {
            score,
            calls: AtomicUsize::new(0),
            scores: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<F> Backtester for MockBacktester<F>
where
    F: Fn(&Strategy) -> f64 + Send + Sync,
{
    fn evaluate(
        &self,
        strategy: &Strategy,
        _data: &dyn PriceDataset,
    ) -> Result<f64, GeneratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(GeneratorError::Evaluator {
                reason: format!("mock failure on call {call}"),
            });
        }
        let score = (self.score)(strategy);
        self.scores.lock().unwrap().push(score);
        Ok(score)
    }
}

/// A wavy series of daily bars with a 0.0004 range around each close.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..count)
        .map(|i| {
            let t = i as f64;
            let close = start_price + (t * 0.35).sin() * 0.01 + t * 0.0001;
            let open = close - (t * 0.9).cos() * 0.0008;
            OhlcvBar {
                time: start + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 0.0004,
                low: open.min(close) - 0.0004,
                close,
                volume: 1000 + i as i64,
            }
        })
        .collect()
}

pub fn make_dataset(count: usize) -> DataSet {
    DataSet::new(
        InstrumentProperties::new("EURUSD", 5),
        generate_bars("2024-01-01", count, 1.1),
    )
}

/// Entry point, the given filters, exit point.
pub fn make_strategy(entry_filters: &[&str]) -> Strategy {
    let mut slots = vec![IndicatorSlot::new(BAR_OPENING, SlotRole::EntryPoint).unwrap()];
    for name in entry_filters {
        slots.push(IndicatorSlot::new(name, SlotRole::EntryFilter).unwrap());
    }
    slots.push(IndicatorSlot::new(BAR_CLOSING, SlotRole::ExitPoint).unwrap());
    Strategy::from_slots("Test", slots).unwrap()
}

/// Writes `<dir>/<symbol>.csv` from bars.
pub fn write_csv(dir: &std::path::Path, symbol: &str, bars: &[OhlcvBar]) {
    let mut content = String::from("time,open,high,low,close,volume\n");
    for b in bars {
        content.push_str(&format!(
            "{},{:.5},{:.5},{:.5},{:.5},{}\n",
            b.time.format("%Y-%m-%d %H:%M"),
            b.open,
            b.high,
            b.low,
            b.close,
            b.volume
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}
