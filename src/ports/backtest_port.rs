//! Backtest evaluator port.

use crate::domain::error::GeneratorError;
use crate::domain::strategy::Strategy;
use crate::ports::dataset_port::PriceDataset;

/// Scores a fully calculated strategy. Higher is better; the optimizer only
/// relies on scores being comparable and on `evaluate` being deterministic
/// for a fixed strategy and dataset.
pub trait Backtester: Send + Sync {
    fn evaluate(&self, strategy: &Strategy, data: &dyn PriceDataset)
    -> Result<f64, GeneratorError>;
}
