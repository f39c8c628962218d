//! In-memory price dataset and instrument properties.

use crate::domain::error::GeneratorError;
use crate::domain::ohlcv::{BasePrice, OhlcvBar};
use crate::ports::dataset_port::PriceDataset;

#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentProperties {
    pub symbol: String,
    /// Number of decimal digits in a quote.
    pub digits: u32,
}

impl InstrumentProperties {
    pub fn new(symbol: impl Into<String>, digits: u32) -> Self {
        Self {
            symbol: symbol.into(),
            digits,
        }
    }

    /// Smallest price increment, 10^-digits.
    pub fn point(&self) -> f64 {
        10f64.powi(-(self.digits as i32))
    }

    /// Fractional-pip quotes (3 or 5 digits).
    pub fn is_five_digits(&self) -> bool {
        self.digits == 3 || self.digits == 5
    }
}

#[derive(Debug, Clone)]
pub struct DataSet {
    instrument: InstrumentProperties,
    bars: Vec<OhlcvBar>,
}

impl DataSet {
    pub fn new(instrument: InstrumentProperties, bars: Vec<OhlcvBar>) -> Self {
        Self { instrument, bars }
    }

    /// Like [`DataSet::new`] but refuses histories shorter than `minimum` bars.
    pub fn with_minimum(
        instrument: InstrumentProperties,
        bars: Vec<OhlcvBar>,
        minimum: usize,
    ) -> Result<Self, GeneratorError> {
        if bars.len() < minimum {
            return Err(GeneratorError::InsufficientData {
                symbol: instrument.symbol.clone(),
                bars: bars.len(),
                minimum,
            });
        }
        Ok(Self::new(instrument, bars))
    }

    pub fn bar(&self, index: usize) -> &OhlcvBar {
        &self.bars[index]
    }

    pub fn all_bars(&self) -> &[OhlcvBar] {
        &self.bars
    }
}

impl PriceDataset for DataSet {
    fn bars(&self) -> usize {
        self.bars.len()
    }

    fn open(&self, bar: usize) -> f64 {
        self.bars[bar].open
    }

    fn high(&self, bar: usize) -> f64 {
        self.bars[bar].high
    }

    fn low(&self, bar: usize) -> f64 {
        self.bars[bar].low
    }

    fn close(&self, bar: usize) -> f64 {
        self.bars[bar].close
    }

    fn volume(&self, bar: usize) -> f64 {
        self.bars[bar].volume as f64
    }

    fn instrument(&self) -> &InstrumentProperties {
        &self.instrument
    }
}

/// Extracts the chosen base price for every bar.
pub fn price_series(data: &dyn PriceDataset, base: BasePrice) -> Vec<f64> {
    (0..data.bars())
        .map(|i| {
            let (open, high, low, close) = (data.open(i), data.high(i), data.low(i), data.close(i));
            match base {
                BasePrice::Open => open,
                BasePrice::High => high,
                BasePrice::Low => low,
                BasePrice::Close => close,
                BasePrice::Median => (high + low) / 2.0,
                BasePrice::Typical => (high + low + close) / 3.0,
                BasePrice::Weighted => (high + low + 2.0 * close) / 4.0,
            }
        })
        .collect()
}

/// Builds a dataset from OHLC tuples, one bar per day. Shared by unit tests.
#[cfg(test)]
pub(crate) fn sample_dataset(bars: &[(f64, f64, f64, f64)]) -> DataSet {
    use chrono::{Duration, NaiveDate};

    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let bars = bars
        .iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| OhlcvBar {
            time: start + Duration::days(i as i64),
            open,
            high,
            low,
            close,
            volume: 1000,
        })
        .collect();
    DataSet::new(InstrumentProperties::new("TEST", 5), bars)
}

/// Dataset whose open, high, low and close all equal the given closes.
#[cfg(test)]
pub(crate) fn closes_dataset(closes: &[f64]) -> DataSet {
    let bars: Vec<_> = closes.iter().map(|&c| (c, c, c, c)).collect();
    sample_dataset(&bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            time: NaiveDate::from_ymd_opt(2024, 3, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 100,
        }
    }

    #[test]
    fn point_and_digits() {
        let eurusd = InstrumentProperties::new("EURUSD", 5);
        assert!((eurusd.point() - 0.00001).abs() < 1e-12);
        assert!(eurusd.is_five_digits());

        let usdjpy = InstrumentProperties::new("USDJPY", 2);
        assert!((usdjpy.point() - 0.01).abs() < 1e-12);
        assert!(!usdjpy.is_five_digits());

        assert!(InstrumentProperties::new("USDJPY", 3).is_five_digits());
    }

    #[test]
    fn dataset_accessors() {
        let data = DataSet::new(
            InstrumentProperties::new("TEST", 4),
            vec![
                make_bar(1, 1.0, 2.0, 0.5, 1.5),
                make_bar(2, 1.5, 3.0, 1.0, 2.5),
            ],
        );
        assert_eq!(data.bars(), 2);
        assert_eq!(data.open(1), 1.5);
        assert_eq!(data.high(1), 3.0);
        assert_eq!(data.low(0), 0.5);
        assert_eq!(data.close(0), 1.5);
        assert_eq!(data.volume(0), 100.0);
        assert_eq!(data.instrument().symbol, "TEST");
    }

    #[test]
    fn with_minimum_rejects_short_history() {
        let result = DataSet::with_minimum(
            InstrumentProperties::new("TEST", 4),
            vec![make_bar(1, 1.0, 1.0, 1.0, 1.0)],
            10,
        );
        assert!(matches!(
            result,
            Err(GeneratorError::InsufficientData {
                bars: 1,
                minimum: 10,
                ..
            })
        ));
    }

    #[test]
    fn price_series_by_base() {
        let data = DataSet::new(
            InstrumentProperties::new("TEST", 4),
            vec![make_bar(1, 1.0, 4.0, 2.0, 3.0)],
        );
        assert_eq!(price_series(&data, BasePrice::Open), vec![1.0]);
        assert_eq!(price_series(&data, BasePrice::Median), vec![3.0]);
        assert_eq!(price_series(&data, BasePrice::Typical), vec![3.0]);
        assert_eq!(price_series(&data, BasePrice::Weighted), vec![3.0]);
    }
}
