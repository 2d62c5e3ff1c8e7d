//! Configuration Loader
//!
//! Loads and validates analysis configuration from TOML files. Every section
//! is optional and falls back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::strategy::params::{
    AnalysisConfig, HedgeMethod, JohansenParams, KalmanParams, RiskConfig, SignalConfig,
};

/// Environment variable that overrides the default config path
pub const CONFIG_PATH_ENV: &str = "PAIRS_CONFIG";

/// Config file used when neither a path nor `PAIRS_CONFIG` is given
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub data: DataSection,
    pub hedge: HedgeSection,
    pub signal: SignalSection,
    pub risk: RiskSection,
    pub logging: LoggingSection,
}

/// Price data configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataSection {
    /// Symbol of the first leg (column `price_a`)
    pub symbol_a: String,
    /// Symbol of the second leg (column `price_b`)
    pub symbol_b: String,
    /// Aligned price CSV, `~` is expanded
    pub prices_csv: Option<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            symbol_a: "EURUSD".to_string(),
            symbol_b: "GBPUSD".to_string(),
            prices_csv: None,
        }
    }
}

impl DataSection {
    pub fn prices_path(&self) -> Option<PathBuf> {
        self.prices_csv.as_deref().map(expand_path)
    }
}

/// Hedge ratio method names accepted in `[hedge] method`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodName {
    #[default]
    Ols,
    Kalman,
    Johansen,
}

/// Hedge ratio configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HedgeSection {
    pub method: MethodName,
    /// Kalman process-noise scale
    pub kalman_delta: f64,
    /// Johansen deterministic term: -1 none, 0 constant, 1 trend
    pub johansen_det_order: i32,
    /// Johansen lagged differences
    pub johansen_k_ar_diff: usize,
    /// Johansen trace test confidence (0.90, 0.95, 0.99)
    pub johansen_confidence: f64,
}

impl Default for HedgeSection {
    fn default() -> Self {
        let kalman = KalmanParams::default();
        let johansen = JohansenParams::default();
        Self {
            method: MethodName::Ols,
            kalman_delta: kalman.delta,
            johansen_det_order: johansen.det_order,
            johansen_k_ar_diff: johansen.k_ar_diff,
            johansen_confidence: johansen.confidence,
        }
    }
}

impl HedgeSection {
    pub fn to_method(&self) -> HedgeMethod {
        match self.method {
            MethodName::Ols => HedgeMethod::Ols,
            MethodName::Kalman => HedgeMethod::Kalman(KalmanParams {
                delta: self.kalman_delta,
            }),
            MethodName::Johansen => HedgeMethod::Johansen(JohansenParams {
                det_order: self.johansen_det_order,
                k_ar_diff: self.johansen_k_ar_diff,
                confidence: self.johansen_confidence,
            }),
        }
    }
}

/// Signal configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalSection {
    /// |z| at which a position opens
    pub entry_z: f64,
    /// |z| at which an open position reverts to flat
    pub exit_z: f64,
    /// Rolling window for the z-score (in bars)
    pub window: usize,
}

impl Default for SignalSection {
    fn default() -> Self {
        let signal = SignalConfig::default();
        Self {
            entry_z: signal.entry_z,
            exit_z: signal.exit_z,
            window: signal.window,
        }
    }
}

/// Risk configuration section, all values in percent
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskSection {
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub transaction_cost_pct: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        let risk = RiskConfig::default();
        Self {
            stop_loss_pct: risk.stop_loss_pct,
            take_profit_pct: risk.take_profit_pct,
            transaction_cost_pct: risk.transaction_cost_pct,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Pick the config file: explicit path, then `PAIRS_CONFIG`, then the default
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    match explicit {
        Some(path) => expand_path(path),
        None => std::env::var(CONFIG_PATH_ENV)
            .map(|p| expand_path(&p))
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

        let mut problems = Vec::new();
        if let Err(crate::domain::PairsError::InvalidConfiguration(violations)) =
            self.analysis_config().validate()
        {
            problems.extend(violations);
        }
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            problems.push(format!("unknown log level '{}'", self.logging.level));
        }
        if self.data.symbol_a.trim().is_empty() || self.data.symbol_b.trim().is_empty() {
            problems.push("symbols cannot be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(problems.join("; ")))
        }
    }

    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::from(self)
    }
}

// Conversion from Config to AnalysisConfig
impl From<&Config> for AnalysisConfig {
    fn from(config: &Config) -> Self {
        AnalysisConfig {
            method: config.hedge.to_method(),
            signal: SignalConfig {
                entry_z: config.signal.entry_z,
                exit_z: config.signal.exit_z,
                window: config.signal.window,
            },
            risk: RiskConfig {
                stop_loss_pct: config.risk.stop_loss_pct,
                take_profit_pct: config.risk.take_profit_pct,
                transaction_cost_pct: config.risk.transaction_cost_pct,
            },
        }
    }
}
