//! Port traits between the domain and its collaborators.

pub mod backtest_port;
pub mod config_port;
pub mod data_port;
pub mod dataset_port;
