//! Pairs Pipeline Integration Tests
//!
//! End-to-end checks through the public API:
//! 1. `analyze` output shape, determinism and configuration handling
//! 2. Kalman hedge ratios only depend on past bars
//! 3. Signal state machine -> backtest flow for risk exits
//! 4. Johansen estimation and CSV/config wiring through the CLI handlers
//!
//! All tests are deterministic (seeded random data, no network).

use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

use butters_pairs::adapters::cli::{analyze_command, load_or_default, AnalyzeCmd};
use butters_pairs::adapters::market_data::save_price_pair;
use butters_pairs::application::{analyze, run_backtest};
use butters_pairs::domain::{ExitReason, PairsError, Position, PriceSeries};
use butters_pairs::strategy::{
    estimate, generate_signals, AnalysisConfig, FitDiagnostics, HedgeMethod, HedgeRatioEstimate,
    JohansenParams, KalmanParams, RiskConfig,
};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Deterministic pair with a slow common factor and a fast mean-reverting spread
fn oscillating_pair(n: usize) -> (PriceSeries, PriceSeries) {
    let b: Vec<f64> = (0..n)
        .map(|i| 50.0 + 5.0 * (i as f64 * 0.03).sin())
        .collect();
    let a: Vec<f64> = b
        .iter()
        .enumerate()
        .map(|(i, x)| 2.0 * x + 3.0 + 0.9 * (i as f64 * 0.6).sin())
        .collect();
    (
        PriceSeries::from_daily_closes("EURUSD", &a).unwrap(),
        PriceSeries::from_daily_closes("GBPUSD", &b).unwrap(),
    )
}

/// B is a random walk, A = beta * B + intercept + bounded noise
fn cointegrated_pair(seed: u64, n: usize, beta: f64, intercept: f64) -> (PriceSeries, PriceSeries) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut level = 100.0;
    let b: Vec<f64> = (0..n)
        .map(|_| {
            level += rng.gen_range(-1.0..1.0);
            level
        })
        .collect();
    let a: Vec<f64> = b
        .iter()
        .map(|x| beta * x + intercept + rng.gen_range(-0.5..0.5))
        .collect();
    (
        PriceSeries::from_daily_closes("A", &a).unwrap(),
        PriceSeries::from_daily_closes("B", &b).unwrap(),
    )
}

fn kalman_config() -> AnalysisConfig {
    AnalysisConfig::default()
        .with_method(HedgeMethod::Kalman(KalmanParams { delta: 1e-4 }))
        .with_window(20)
}

// ============================================================================
// Analyze Pipeline
// ============================================================================

#[test]
fn test_analyze_output_lengths_match_input() {
    let (a, b) = oscillating_pair(300);
    let report = analyze(&a, &b, &AnalysisConfig::default()).unwrap();

    assert_eq!(report.len(), 300);
    assert_eq!(report.zscore.len(), 300);
    assert_eq!(report.positions.len(), 300);
    assert_eq!(report.equity_curve.len(), 300);
    assert_eq!(report.drawdown.len(), 300);
    assert_eq!(report.correlation.len(), 300);

    // Warm-up bars carry no z-score and no position
    let window = report.config.signal.window;
    assert!(report.zscore[..window - 1].iter().all(Option::is_none));
    assert!(report.positions[..window - 1].iter().all(|p| *p == Position::Flat));
    assert!(!report.trade_log.is_empty());
}

#[test]
fn test_analyze_is_deterministic() {
    let (a, b) = oscillating_pair(250);
    let config = kalman_config();

    let first = analyze(&a, &b, &config).unwrap();
    let second = analyze(&a, &b, &config).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_ols_hedge_ratio_on_small_sample() {
    let a = PriceSeries::from_daily_closes("A", &[100.0, 101.0, 99.0, 102.0, 98.0]).unwrap();
    let b = PriceSeries::from_daily_closes("B", &[50.0, 50.4, 49.6, 50.8, 49.2]).unwrap();

    let estimate = estimate(&HedgeMethod::Ols, &a, &b).unwrap();
    let (beta, alpha) = estimate.last().unwrap();

    assert_relative_eq!(beta, 2.5, epsilon = 1e-9);
    assert_relative_eq!(alpha, -25.0, epsilon = 1e-7);
    assert!(estimate.is_constant());
    match estimate.diagnostics() {
        FitDiagnostics::Ols { r_squared } => assert_relative_eq!(*r_squared, 1.0, epsilon = 1e-9),
        other => panic!("expected OLS diagnostics, got {:?}", other),
    }
}

#[test]
fn test_invalid_configuration_reports_every_violation() {
    let (a, b) = oscillating_pair(50);
    // Misaligned input too, configuration must be reported first
    let short_b = b.truncated(40);
    let config = AnalysisConfig::default()
        .with_thresholds(0.2, 0.5)
        .with_window(1)
        .with_risk(RiskConfig {
            stop_loss_pct: -1.0,
            ..RiskConfig::default()
        });

    match analyze(&a, &short_b, &config).unwrap_err() {
        PairsError::InvalidConfiguration(violations) => {
            assert_eq!(violations.len(), 3, "{:?}", violations);
        }
        other => panic!("expected InvalidConfiguration, got {:?}", other),
    }
}

#[test]
fn test_misaligned_series_rejected() {
    let (a, b) = oscillating_pair(50);
    let result = analyze(&a, &b.truncated(49), &AnalysisConfig::default());
    assert!(matches!(result, Err(PairsError::MisalignedInput(_))));
}

#[test]
fn test_no_trades_reports_na_ratio() {
    let (a, b) = oscillating_pair(120);
    // |z| over a 30-bar window can never reach 50
    let config = AnalysisConfig::default().with_thresholds(50.0, 0.5);
    let report = analyze(&a, &b, &config).unwrap();

    assert!(report.trade_log.is_empty());
    assert!(report.transitions.is_empty());
    assert_eq!(report.performance.trade_count, 0);
    assert!(report.performance.risk_adjusted_ratio.is_none());
    assert_eq!(report.performance.risk_adjusted_display(), "n/a");
    assert!(report.equity_curve.iter().all(|v| *v == 0.0));
}

// ============================================================================
// Kalman Causality
// ============================================================================

#[test]
fn test_kalman_prefix_unchanged_by_truncation() {
    let (a, b) = oscillating_pair(200);
    let config = kalman_config();

    let full = analyze(&a, &b, &config).unwrap();
    let prefix = analyze(&a.truncated(150), &b.truncated(150), &config).unwrap();

    assert_eq!(&full.hedge.betas()[..150], prefix.hedge.betas());
    assert_eq!(&full.hedge.alphas()[..150], prefix.hedge.alphas());
    assert_eq!(&full.zscore[..150], &prefix.zscore[..]);
    assert_eq!(&full.positions[..150], &prefix.positions[..]);
}

#[test]
fn test_kalman_ignores_future_rewrites() {
    let (a, b) = oscillating_pair(200);
    let mut rewritten: Vec<f64> = a.prices().to_vec();
    for price in rewritten.iter_mut().skip(170) {
        *price *= 1.5;
    }
    let a_rewritten = PriceSeries::from_daily_closes("EURUSD", &rewritten).unwrap();
    let config = kalman_config();

    let original = analyze(&a, &b, &config).unwrap();
    let changed = analyze(&a_rewritten, &b, &config).unwrap();

    assert_eq!(&original.hedge.betas()[..170], &changed.hedge.betas()[..170]);
    assert_eq!(&original.spread[..170], &changed.spread[..170]);
    assert_ne!(original.hedge.betas()[199], changed.hedge.betas()[199]);
}

// ============================================================================
// Signals -> Backtest
// ============================================================================

#[test]
fn test_stop_loss_takes_priority_through_backtest() {
    let a = PriceSeries::from_daily_closes("A", &[100.0, 100.0, 99.7, 99.7]).unwrap();
    let b = PriceSeries::from_daily_closes("B", &[50.0, 50.0, 50.0, 50.0]).unwrap();
    let hedge = HedgeRatioEstimate::constant(
        HedgeMethod::Ols,
        4,
        1.0,
        0.0,
        FitDiagnostics::Ols { r_squared: 1.0 },
    );
    // Bar 2 is inside the exit band, but the -0.2% loss fires first
    let z = vec![Some(0.0), Some(-1.5), Some(0.1), Some(0.0)];
    let config = AnalysisConfig::default();

    let signals = generate_signals(&a, &b, &hedge, &z, &config).unwrap();
    assert_eq!(
        signals.positions,
        vec![Position::Flat, Position::Long, Position::Flat, Position::Flat]
    );
    assert_eq!(signals.transitions.len(), 2);

    let output = run_backtest(&a, &b, &signals.transitions, config.risk.transaction_cost_pct).unwrap();
    let trades = output.trade_log.trades();
    assert_eq!(trades.len(), 1);
    assert_eq!(trades[0].exit_reason, ExitReason::StopLoss);
    assert_eq!(trades[0].side, Position::Long);
    assert_relative_eq!(trades[0].gross_pnl, -0.3, epsilon = 1e-9);
    assert_relative_eq!(trades[0].costs, 0.001 * (150.0 + 149.7), epsilon = 1e-9);
    assert!(trades[0].net_pnl < trades[0].gross_pnl);
    assert!(output.trade_log.open_trade().is_none());
}

#[test]
fn test_open_position_at_end_is_not_a_trade() {
    let a = PriceSeries::from_daily_closes("A", &[100.0, 100.0, 100.05]).unwrap();
    let b = PriceSeries::from_daily_closes("B", &[50.0, 50.0, 50.0]).unwrap();
    let hedge = HedgeRatioEstimate::constant(
        HedgeMethod::Ols,
        3,
        1.0,
        0.0,
        FitDiagnostics::Ols { r_squared: 1.0 },
    );
    let z = vec![None, Some(1.2), Some(1.1)];
    let config = AnalysisConfig::default();

    let signals = generate_signals(&a, &b, &hedge, &z, &config).unwrap();
    let output = run_backtest(&a, &b, &signals.transitions, 0.1).unwrap();

    assert!(output.trade_log.is_empty());
    let open = output.trade_log.open_trade().unwrap();
    assert_eq!(open.position.side, Position::Short);
    assert_eq!(open.position.entry_index, 1);
    assert_eq!(output.performance.trade_count, 0);
}

// ============================================================================
// Johansen and CLI Wiring
// ============================================================================

#[test]
fn test_johansen_through_analyze() {
    let (a, b) = cointegrated_pair(11, 400, 1.5, 2.0);
    let config = AnalysisConfig::default().with_method(HedgeMethod::Johansen(JohansenParams::default()));

    let report = analyze(&a, &b, &config).unwrap();
    let (beta, alpha) = report.hedge.last().unwrap();

    assert!((beta - 1.5).abs() < 0.1, "beta {}", beta);
    assert_eq!(alpha, 0.0);
    assert!(report.hedge.is_constant());
    match report.hedge.diagnostics() {
        FitDiagnostics::Johansen(stats) => assert!(stats.rank >= 1),
        other => panic!("expected Johansen diagnostics, got {:?}", other),
    }
}

#[test]
fn test_johansen_insufficient_data() {
    let (a, b) = cointegrated_pair(3, 5, 1.5, 2.0);
    let config = AnalysisConfig::default()
        .with_method(HedgeMethod::Johansen(JohansenParams::default()))
        .with_window(2);

    assert!(matches!(
        analyze(&a, &b, &config),
        Err(PairsError::InsufficientData { .. })
    ));
}

#[test]
fn test_cli_analyze_with_config_file() {
    let dir = tempdir().unwrap();
    let (a, b) = oscillating_pair(150);
    let prices = dir.path().join("prices.csv");
    save_price_pair(&a, &b, &prices).unwrap();

    let mut config_file = NamedTempFile::new().unwrap();
    write!(
        config_file,
        "[data]\nprices_csv = \"{}\"\n\n[hedge]\nmethod = \"kalman\"\n\n[signal]\nwindow = 25\n",
        prices.display()
    )
    .unwrap();

    let config = load_or_default(Some(config_file.path()), false).unwrap();
    assert_eq!(config.signal.window, 25);

    let trades_csv = dir.path().join("trades.csv");
    let cmd = AnalyzeCmd {
        config: Some(config_file.path().to_path_buf()),
        prices: None,
        method: None,
        entry_z: Some(1.5),
        exit_z: None,
        window: None,
        export_json: None,
        export_csv: Some(trades_csv.clone()),
    };
    analyze_command(&cmd, config).unwrap();
    assert!(trades_csv.exists());
}
