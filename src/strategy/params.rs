//! Strategy Parameters
//!
//! Immutable configuration passed into `analyze`. Defaults match the
//! dashboard defaults (entry 1.0, exit 0.5, 30-bar window, 0.1% stops and costs).
//! Percent fields are in percent units: 0.1 means 0.1%.

use serde::{Deserialize, Serialize};

use crate::domain::PairsError;

/// Johansen confidence levels with tabulated critical values
pub const SUPPORTED_CONFIDENCE_LEVELS: [f64; 3] = [0.90, 0.95, 0.99];

/// Kalman filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanParams {
    /// Process-noise scale; state covariance grows by delta/(1-delta) per bar
    pub delta: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self { delta: 1e-5 }
    }
}

impl KalmanParams {
    /// Random-walk covariance added to each state component per step
    pub fn transition_variance(&self) -> f64 {
        self.delta / (1.0 - self.delta)
    }

    fn violations(&self, out: &mut Vec<String>) {
        if !self.delta.is_finite() || self.delta <= 0.0 || self.delta >= 1.0 {
            out.push(format!("kalman delta must be in (0, 1), got {}", self.delta));
        }
    }
}

/// Johansen test parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JohansenParams {
    /// Deterministic trend order: -1 none, 0 constant, 1 linear trend
    pub det_order: i32,
    /// Number of lagged differences in the VECM
    pub k_ar_diff: usize,
    /// Confidence level of the trace test (0.90, 0.95 or 0.99)
    pub confidence: f64,
}

impl Default for JohansenParams {
    fn default() -> Self {
        Self {
            det_order: 0,
            k_ar_diff: 1,
            confidence: 0.95,
        }
    }
}

impl JohansenParams {
    fn violations(&self, out: &mut Vec<String>) {
        if !(-1..=1).contains(&self.det_order) {
            out.push(format!(
                "johansen det_order must be -1, 0 or 1, got {}",
                self.det_order
            ));
        }
        if !SUPPORTED_CONFIDENCE_LEVELS
            .iter()
            .any(|level| (level - self.confidence).abs() < 1e-9)
        {
            out.push(format!(
                "johansen confidence must be one of 0.90, 0.95, 0.99, got {}",
                self.confidence
            ));
        }
    }
}

/// Hedge ratio estimation method with its own parameters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum HedgeMethod {
    #[default]
    Ols,
    Kalman(KalmanParams),
    Johansen(JohansenParams),
}

impl HedgeMethod {
    pub fn name(&self) -> &'static str {
        match self {
            HedgeMethod::Ols => "OLS",
            HedgeMethod::Kalman(_) => "Kalman",
            HedgeMethod::Johansen(_) => "Johansen",
        }
    }

    /// Parse a method name with default parameters ("ols", "kalman", "johansen")
    pub fn from_name(name: &str) -> Result<Self, PairsError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ols" => Ok(HedgeMethod::Ols),
            "kalman" => Ok(HedgeMethod::Kalman(KalmanParams::default())),
            "johansen" => Ok(HedgeMethod::Johansen(JohansenParams::default())),
            other => Err(PairsError::invalid_config(format!(
                "unknown hedge ratio method '{}' (expected ols, kalman or johansen)",
                other
            ))),
        }
    }

    fn violations(&self, out: &mut Vec<String>) {
        match self {
            HedgeMethod::Ols => {}
            HedgeMethod::Kalman(params) => params.violations(out),
            HedgeMethod::Johansen(params) => params.violations(out),
        }
    }
}

/// Z-score entry/exit thresholds and rolling window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    /// |z| at or beyond which a position is opened
    pub entry_z: f64,
    /// |z| at or inside which an open position reverts to flat
    pub exit_z: f64,
    /// Rolling window for mean and standard deviation of the spread
    pub window: usize,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            entry_z: 1.0,
            exit_z: 0.5,
            window: 30,
        }
    }
}

impl SignalConfig {
    fn violations(&self, out: &mut Vec<String>) {
        if !self.entry_z.is_finite() || self.entry_z <= 0.0 {
            out.push(format!("entry_z must be > 0, got {}", self.entry_z));
        }
        if !self.exit_z.is_finite() || self.exit_z < 0.0 {
            out.push(format!("exit_z must be >= 0, got {}", self.exit_z));
        }
        if self.entry_z <= self.exit_z {
            out.push(format!(
                "entry_z ({}) must be greater than exit_z ({})",
                self.entry_z, self.exit_z
            ));
        }
        if self.window < 2 {
            out.push(format!("window must be >= 2, got {}", self.window));
        }
    }

    pub fn validate(&self) -> Result<(), PairsError> {
        let mut violations = Vec::new();
        self.violations(&mut violations);
        into_result(violations)
    }
}

/// Risk exits and transaction costs, all in percent units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Unrealized loss (percent of entry notional) that forces an exit
    pub stop_loss_pct: f64,
    /// Unrealized gain (percent of entry notional) that locks in profit
    pub take_profit_pct: f64,
    /// Cost per leg fill as percent of notional, charged on entry and exit
    pub transaction_cost_pct: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.1,
            take_profit_pct: 0.1,
            transaction_cost_pct: 0.1,
        }
    }
}

impl RiskConfig {
    fn violations(&self, out: &mut Vec<String>) {
        if !self.stop_loss_pct.is_finite() || self.stop_loss_pct <= 0.0 {
            out.push(format!("stop_loss_pct must be > 0, got {}", self.stop_loss_pct));
        }
        if !self.take_profit_pct.is_finite() || self.take_profit_pct <= 0.0 {
            out.push(format!(
                "take_profit_pct must be > 0, got {}",
                self.take_profit_pct
            ));
        }
        if !self.transaction_cost_pct.is_finite() || self.transaction_cost_pct < 0.0 {
            out.push(format!(
                "transaction_cost_pct must be >= 0, got {}",
                self.transaction_cost_pct
            ));
        }
    }
}

/// Full analysis configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub method: HedgeMethod,
    pub signal: SignalConfig,
    pub risk: RiskConfig,
}

impl AnalysisConfig {
    pub fn with_method(mut self, method: HedgeMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_thresholds(mut self, entry_z: f64, exit_z: f64) -> Self {
        self.signal.entry_z = entry_z;
        self.signal.exit_z = exit_z;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.signal.window = window;
        self
    }

    pub fn with_risk(mut self, risk: RiskConfig) -> Self {
        self.risk = risk;
        self
    }

    /// Check every constraint and report all violations at once
    pub fn validate(&self) -> Result<(), PairsError> {
        let mut violations = Vec::new();
        self.method.violations(&mut violations);
        self.signal.violations(&mut violations);
        self.risk.violations(&mut violations);
        into_result(violations)
    }
}

fn into_result(violations: Vec<String>) -> Result<(), PairsError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(PairsError::InvalidConfiguration(violations))
    }
}
