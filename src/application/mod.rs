//! Application Layer
//!
//! Backtest engine, performance statistics and the `analyze` pipeline.

pub mod backtest;
pub mod performance;
pub mod pipeline;

pub use backtest::{run as run_backtest, BacktestOutput};
pub use performance::PerformanceSummary;
pub use pipeline::{analyze, AnalysisReport};
