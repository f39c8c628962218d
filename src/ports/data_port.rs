//! Price history access port trait.

use crate::domain::error::GeneratorError;
use crate::domain::ohlcv::OhlcvBar;

pub trait DataPort {
    /// Bars for `symbol`, oldest first.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, GeneratorError>;

    fn list_symbols(&self) -> Result<Vec<String>, GeneratorError>;
}
