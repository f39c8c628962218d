//! Read-only price dataset consumed by indicators and backtesters.

use crate::domain::dataset::InstrumentProperties;

/// Per-bar price access indexed from 0. Implementations must stay immutable
/// for the duration of an evaluation.
pub trait PriceDataset: Send + Sync {
    fn bars(&self) -> usize;
    fn open(&self, bar: usize) -> f64;
    fn high(&self, bar: usize) -> f64;
    fn low(&self, bar: usize) -> f64;
    fn close(&self, bar: usize) -> f64;
    fn volume(&self, bar: usize) -> f64;
    fn instrument(&self) -> &InstrumentProperties;
}
