//! OHLCV bar representation and base-price selection.

use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// The price an indicator is computed from. Declaration order is the order
/// of the "Base price" choice list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasePrice {
    Open,
    High,
    Low,
    Close,
    Median,
    Typical,
    Weighted,
}

impl BasePrice {
    pub const ALL: [BasePrice; 7] = [
        BasePrice::Open,
        BasePrice::High,
        BasePrice::Low,
        BasePrice::Close,
        BasePrice::Median,
        BasePrice::Typical,
        BasePrice::Weighted,
    ];

    pub fn from_index(index: usize) -> BasePrice {
        Self::ALL.get(index).copied().unwrap_or(BasePrice::Close)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            BasePrice::Open => "Open",
            BasePrice::High => "High",
            BasePrice::Low => "Low",
            BasePrice::Close => "Close",
            BasePrice::Median => "Median",
            BasePrice::Typical => "Typical",
            BasePrice::Weighted => "Weighted",
        }
    }

    pub fn labels() -> Vec<String> {
        Self::ALL.iter().map(|p| p.label().to_string()).collect()
    }
}
