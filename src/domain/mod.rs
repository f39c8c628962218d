//! Core domain types and logic.

pub mod cancel;
pub mod config_validation;
pub mod correlation;
pub mod dataset;
pub mod error;
pub mod indicator;
pub mod ohlcv;
pub mod optimizer;
pub mod param;
pub mod strategy;
pub mod strategy_config;
