//! Strategy Layer - Statistical Arbitrage on a Price Pair
//!
//! Turns two aligned price series into trading signals:
//! - Hedge ratio estimation (OLS, Kalman filter, Johansen cointegration)
//! - Spread and rolling z-score over a configurable window
//! - Position state machine with stop-loss, take-profit and reversion exits
//! - Diagnostics: rolling correlation and spread half-life

pub mod diagnostics;
pub mod hedge;
pub mod params;
pub mod spread;
pub mod state_machine;
pub mod zscore_gate;

pub use diagnostics::{half_life, rolling_correlation};
pub use hedge::{estimate, FitDiagnostics, HedgeRatioEstimate};
pub use params::{AnalysisConfig, HedgeMethod, JohansenParams, KalmanParams, RiskConfig, SignalConfig};
pub use spread::{spread, zscore};
pub use state_machine::{generate_signals, SignalBar, SignalOutput, SignalStateMachine};
pub use zscore_gate::{ZScoreGate, ZScoreResult};
