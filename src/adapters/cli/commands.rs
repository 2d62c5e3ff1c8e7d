//! CLI Command Handlers
//!
//! Implementation of all CLI commands for the pairs analysis tool.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::adapters::market_data::{load_price_pair, save_report_json, save_trades};
use crate::application::analyze;
use crate::config::loader::MethodName;
use crate::config::{load_config, resolve_config_path, Config, CONFIG_PATH_ENV};
use crate::domain::PriceSeries;
use crate::strategy::diagnostics;
use crate::strategy::hedge::{self, FitDiagnostics};
use crate::strategy::params::HedgeMethod;
use crate::strategy::spread;

/// Butters Pairs - Statistical Arbitrage Analysis for Two-Asset Spreads
#[derive(Parser, Debug)]
#[command(
    name = "butters-pairs",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Pairs trading analysis: hedge ratio, z-score signals and backtest",
    long_about = "Estimates the hedge ratio between two aligned price series (OLS, Kalman \
                  or Johansen), derives the spread z-score and backtests a mean reversion \
                  strategy with stop-loss, take-profit and transaction costs."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full analysis and backtest
    Analyze(AnalyzeCmd),

    /// Estimate the hedge ratio only
    Hedge(HedgeCmd),

    /// Load and validate a configuration file
    CheckConfig(CheckConfigCmd),
}

/// Full analysis
#[derive(Parser, Debug)]
pub struct AnalyzeCmd {
    /// Path to configuration file (falls back to PAIRS_CONFIG, then config/default.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Aligned price CSV (timestamp,price_a,price_b); overrides [data] prices_csv
    #[arg(short, long, value_name = "CSV")]
    pub prices: Option<PathBuf>,

    /// Override hedge ratio method (ols, kalman, johansen)
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<String>,

    /// Override entry z-score threshold
    #[arg(long, value_name = "Z")]
    pub entry_z: Option<f64>,

    /// Override exit z-score threshold
    #[arg(long, value_name = "Z")]
    pub exit_z: Option<f64>,

    /// Override rolling window
    #[arg(short, long, value_name = "BARS")]
    pub window: Option<usize>,

    /// Export the full report to JSON
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,

    /// Export the trade log to CSV
    #[arg(long, value_name = "FILE")]
    pub export_csv: Option<PathBuf>,
}

/// Hedge ratio estimation
#[derive(Parser, Debug)]
pub struct HedgeCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Aligned price CSV (timestamp,price_a,price_b)
    #[arg(short, long, value_name = "CSV")]
    pub prices: Option<PathBuf>,

    /// Override hedge ratio method (ols, kalman, johansen)
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<String>,
}

/// Configuration check
#[derive(Parser, Debug)]
pub struct CheckConfigCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Execute the CLI command
pub fn execute(app: CliApp) -> Result<()> {
    let config_arg = match &app.command {
        Command::Analyze(cmd) => cmd.config.as_deref(),
        Command::Hedge(cmd) => cmd.config.as_deref(),
        Command::CheckConfig(cmd) => cmd.config.as_deref(),
    };
    let strict = matches!(app.command, Command::CheckConfig(_));
    let config = load_or_default(config_arg, strict)?;

    // Initialize logging based on flags, then the config level
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Analyze(cmd) => analyze_command(&cmd, config),
        Command::Hedge(cmd) => hedge_command(&cmd, config),
        Command::CheckConfig(_) => check_config_command(&config),
    }
}

/// Initialize logging system
pub fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Load the config file, or the defaults when no file is configured.
///
/// An explicit `--config` or `PAIRS_CONFIG` must exist; the default path is
/// optional unless `strict` is set.
pub fn load_or_default(explicit: Option<&Path>, strict: bool) -> Result<Config> {
    let explicit_str = explicit.map(|p| p.to_string_lossy().into_owned());
    let path = resolve_config_path(explicit_str.as_deref());
    let required = strict || explicit.is_some() || std::env::var(CONFIG_PATH_ENV).is_ok();

    if !required && !path.exists() {
        return Ok(Config::default());
    }

    load_config(&path).with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// Apply command-line overrides and re-validate
pub fn apply_overrides(
    config: &mut Config,
    method: Option<&str>,
    entry_z: Option<f64>,
    exit_z: Option<f64>,
    window: Option<usize>,
) -> Result<()> {
    if let Some(name) = method {
        config.hedge.method = match HedgeMethod::from_name(name)? {
            HedgeMethod::Ols => MethodName::Ols,
            HedgeMethod::Kalman(_) => MethodName::Kalman,
            HedgeMethod::Johansen(_) => MethodName::Johansen,
        };
    }
    if let Some(z) = entry_z {
        config.signal.entry_z = z;
    }
    if let Some(z) = exit_z {
        config.signal.exit_z = z;
    }
    if let Some(w) = window {
        config.signal.window = w;
    }
    config.validate().context("Invalid parameters")?;
    Ok(())
}

fn load_prices(config: &Config, prices: Option<&Path>) -> Result<(PriceSeries, PriceSeries)> {
    let path = prices
        .map(Path::to_path_buf)
        .or_else(|| config.data.prices_path())
        .context("No price file: pass --prices or set [data] prices_csv")?;

    load_price_pair(&path, &config.data.symbol_a, &config.data.symbol_b)
        .with_context(|| format!("Failed to load prices from {}", path.display()))
}

/// Handle analyze command
pub fn analyze_command(cmd: &AnalyzeCmd, mut config: Config) -> Result<()> {
    apply_overrides(
        &mut config,
        cmd.method.as_deref(),
        cmd.entry_z,
        cmd.exit_z,
        cmd.window,
    )?;
    let (price_a, price_b) = load_prices(&config, cmd.prices.as_deref())?;

    let report = analyze(&price_a, &price_b, &config.analysis_config())
        .context("Pairs analysis failed")?;

    println!(
        "Pair: {}/{} ({} bars, {})",
        report.symbol_a,
        report.symbol_b,
        report.len(),
        report.hedge.method().name()
    );
    if let Some((beta, alpha)) = report.hedge.last() {
        println!("Hedge ratio: beta={:.6} alpha={:.6}", beta, alpha);
    }
    match report.half_life {
        Some(hl) => println!("Half-life: {:.1} bars", hl),
        None => println!("Half-life: n/a"),
    }
    println!();
    for trade in report.trade_log.trades() {
        println!("  {}", trade);
    }
    if let Some(open) = report.trade_log.open_trade() {
        println!(
            "  open {} since bar {} (unrealized {:.4})",
            open.position.side, open.position.entry_index, open.unrealized_pnl
        );
    }
    println!();
    println!("{}", report.performance);

    if let Some(path) = &cmd.export_json {
        save_report_json(&report, path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report exported");
    }
    if let Some(path) = &cmd.export_csv {
        let rows = save_trades(&report.trade_log, path)
            .with_context(|| format!("Failed to export trades to {}", path.display()))?;
        tracing::info!(path = %path.display(), rows, "Trade log exported");
    }

    Ok(())
}

/// Handle hedge command
pub fn hedge_command(cmd: &HedgeCmd, mut config: Config) -> Result<()> {
    apply_overrides(&mut config, cmd.method.as_deref(), None, None, None)?;
    let (price_a, price_b) = load_prices(&config, cmd.prices.as_deref())?;
    let method = config.hedge.to_method();

    let estimate = hedge::estimate(&method, &price_a, &price_b)
        .with_context(|| format!("{} estimation failed", method.name()))?;
    let spread = spread::spread(&price_a, &price_b, &estimate)?;

    println!("Method: {}", method.name());
    if let Some((beta, alpha)) = estimate.last() {
        println!("Hedge ratio: beta={:.6} alpha={:.6}", beta, alpha);
    }
    match estimate.diagnostics() {
        FitDiagnostics::Ols { r_squared } => println!("R-squared: {:.4}", r_squared),
        FitDiagnostics::Kalman { final_covariance } => println!(
            "Final covariance: [[{:.3e}, {:.3e}], [{:.3e}, {:.3e}]]",
            final_covariance[0][0],
            final_covariance[0][1],
            final_covariance[1][0],
            final_covariance[1][1]
        ),
        FitDiagnostics::Johansen(stats) => {
            println!("Eigenvalues: {:?}", stats.eigenvalues);
            for (r, (stat, cv)) in stats
                .trace_statistics
                .iter()
                .zip(&stats.trace_critical_values)
                .enumerate()
            {
                println!("  trace r<={}: {:.3} (critical {:.3})", r, stat, cv);
            }
            println!("Rank: {} at {:.0}%", stats.rank, stats.confidence * 100.0);
        }
    }
    match diagnostics::half_life(&spread) {
        Some(hl) => println!("Half-life: {:.1} bars", hl),
        None => println!("Half-life: n/a"),
    }

    Ok(())
}

/// Handle check-config command
pub fn check_config_command(config: &Config) -> Result<()> {
    let analysis = config.analysis_config();
    println!("Configuration OK");
    println!("  Pair: {}/{}", config.data.symbol_a, config.data.symbol_b);
    println!("  Method: {}", analysis.method.name());
    println!(
        "  Signal: entry_z={} exit_z={} window={}",
        analysis.signal.entry_z, analysis.signal.exit_z, analysis.signal.window
    );
    println!(
        "  Risk: stop_loss={}% take_profit={}% cost={}%",
        analysis.risk.stop_loss_pct, analysis.risk.take_profit_pct, analysis.risk.transaction_cost_pct
    );
    if let Some(path) = config.data.prices_path() {
        println!("  Prices: {}", path.display());
    }
    Ok(())
}
