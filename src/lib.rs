//! Butters Pairs - Statistical Arbitrage Library
//!
//! Pairs trading analysis for two aligned price series.
//!
//! # Modules
//!
//! - `domain`: Core types (PriceSeries, Position, Transition, TradeLog, PairsError)
//! - `strategy`: Hedge ratio estimation, spread, z-score and the signal state machine
//! - `application`: Backtest engine, performance summary and the `analyze` pipeline
//! - `adapters`: CSV price files, report export and the CLI
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod strategy;

pub use application::{analyze, AnalysisReport};
pub use domain::PairsError;
pub use strategy::params::AnalysisConfig;
