//! Signal State Machine
//!
//! Converts the z-score stream into Flat / Long / Short positions.
//!
//! Evaluation order on every bar with a defined z-score:
//! 1. Open and unrealized loss >= stop_loss_pct -> Flat (StopLoss)
//! 2. Open and unrealized gain >= take_profit_pct -> Flat (TakeProfit)
//! 3. Open and |z| <= exit_z -> Flat (ZScoreReversion)
//! 4. Flat and z <= -entry_z -> Long (buy A, sell beta * B)
//! 5. Flat and z >= entry_z -> Short (sell A, buy beta * B)
//!
//! At most one transition per bar. Bars without a z-score hold the
//! current position and skip every check, including the stops.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ExitReason, OpenPosition, PairsError, Position, PriceSeries, Transition};
use crate::strategy::hedge::HedgeRatioEstimate;
use crate::strategy::params::{AnalysisConfig, RiskConfig, SignalConfig};

/// Everything the state machine sees for one bar
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalBar {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub price_a: f64,
    pub price_b: f64,
    /// Hedge ratio estimated for this bar
    pub hedge_ratio: f64,
    pub z_score: Option<f64>,
}

/// Per-bar positions and the transitions between them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalOutput {
    /// Position held after each bar
    pub positions: Vec<Position>,
    pub transitions: Vec<Transition>,
}

#[derive(Debug, Clone)]
pub struct SignalStateMachine {
    signal: SignalConfig,
    risk: RiskConfig,
    open: Option<OpenPosition>,
}

impl SignalStateMachine {
    pub fn new(signal: SignalConfig, risk: RiskConfig) -> Self {
        Self {
            signal,
            risk,
            open: None,
        }
    }

    /// Current position
    pub fn position(&self) -> Position {
        self.open.map(|p| p.side).unwrap_or(Position::Flat)
    }

    pub fn open_position(&self) -> Option<&OpenPosition> {
        self.open.as_ref()
    }

    /// Evaluate one bar and return the transition it triggers, if any
    pub fn step(&mut self, bar: &SignalBar) -> Option<Transition> {
        let z = bar.z_score?;

        match self.open {
            Some(open) => {
                let reason = self.exit_reason(&open, bar, z)?;
                self.open = None;
                Some(Transition {
                    index: bar.index,
                    timestamp: bar.timestamp,
                    from: open.side,
                    to: Position::Flat,
                    z_score: z,
                    hedge_ratio: bar.hedge_ratio,
                    exit_reason: Some(reason),
                })
            }
            None => {
                let side = if z <= -self.signal.entry_z {
                    Position::Long
                } else if z >= self.signal.entry_z {
                    Position::Short
                } else {
                    return None;
                };

                self.open = Some(OpenPosition {
                    side,
                    entry_index: bar.index,
                    entry_price_a: bar.price_a,
                    entry_price_b: bar.price_b,
                    hedge_ratio: bar.hedge_ratio,
                });
                Some(Transition {
                    index: bar.index,
                    timestamp: bar.timestamp,
                    from: Position::Flat,
                    to: side,
                    z_score: z,
                    hedge_ratio: bar.hedge_ratio,
                    exit_reason: None,
                })
            }
        }
    }

    fn exit_reason(&self, open: &OpenPosition, bar: &SignalBar, z: f64) -> Option<ExitReason> {
        let pnl_pct = open.unrealized_pnl_pct(bar.price_a, bar.price_b);

        if pnl_pct <= -self.risk.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else if pnl_pct >= self.risk.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else if z.abs() <= self.signal.exit_z {
            Some(ExitReason::ZScoreReversion)
        } else {
            None
        }
    }
}

/// Run the state machine over the whole aligned sample
pub fn generate_signals(
    price_a: &PriceSeries,
    price_b: &PriceSeries,
    estimate: &HedgeRatioEstimate,
    zscore: &[Option<f64>],
    config: &AnalysisConfig,
) -> Result<SignalOutput, PairsError> {
    config.validate()?;
    price_a.check_aligned(price_b)?;
    let len = price_a.len();
    if estimate.len() != len || zscore.len() != len {
        return Err(PairsError::MisalignedInput(format!(
            "signal inputs differ in length: prices={}, estimate={}, zscore={}",
            len,
            estimate.len(),
            zscore.len()
        )));
    }

    let mut machine = SignalStateMachine::new(config.signal, config.risk);
    let mut output = SignalOutput {
        positions: Vec::with_capacity(len),
        transitions: Vec::new(),
    };

    for (index, z_score) in zscore.iter().enumerate() {
        let bar = SignalBar {
            index,
            timestamp: price_a.timestamps()[index],
            price_a: price_a.prices()[index],
            price_b: price_b.prices()[index],
            hedge_ratio: estimate.betas()[index],
            z_score: *z_score,
        };
        if let Some(transition) = machine.step(&bar) {
            tracing::debug!(%transition, "Signal transition");
            output.transitions.push(transition);
        }
        output.positions.push(machine.position());
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::hedge::FitDiagnostics;
    use crate::strategy::params::HedgeMethod;
    use chrono::TimeZone;

    fn bar(index: usize, a: f64, b: f64, z: Option<f64>) -> SignalBar {
        SignalBar {
            index,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::days(index as i64),
            price_a: a,
            price_b: b,
            hedge_ratio: 1.0,
            z_score: z,
        }
    }

    fn machine() -> SignalStateMachine {
        SignalStateMachine::new(SignalConfig::default(), RiskConfig::default())
    }

    fn run_flat_prices(zs: &[f64]) -> SignalOutput {
        let a = PriceSeries::from_daily_closes("A", &vec![100.0; zs.len()]).unwrap();
        let b = PriceSeries::from_daily_closes("B", &vec![50.0; zs.len()]).unwrap();
        let est = HedgeRatioEstimate::constant(
            HedgeMethod::Ols,
            zs.len(),
            2.0,
            0.0,
            FitDiagnostics::Ols { r_squared: 1.0 },
        );
        let z: Vec<Option<f64>> = zs.iter().copied().map(Some).collect();
        generate_signals(&a, &b, &est, &z, &AnalysisConfig::default()).unwrap()
    }

    #[test]
    fn test_high_z_opens_short_then_reverts() {
        let out = run_flat_prices(&[0.2, 1.2, 0.9, 0.4]);
        assert_eq!(
            out.positions,
            vec![Position::Flat, Position::Short, Position::Short, Position::Flat]
        );
        assert_eq!(out.transitions.len(), 2);
        assert_eq!(out.transitions[0].index, 1);
        assert!(out.transitions[0].is_entry());
        assert_eq!(out.transitions[1].index, 3);
        assert_eq!(out.transitions[1].exit_reason, Some(ExitReason::ZScoreReversion));
    }

    #[test]
    fn test_low_z_opens_long() {
        let out = run_flat_prices(&[-0.2, -1.2, -0.9, -0.4]);
        assert_eq!(
            out.positions,
            vec![Position::Flat, Position::Long, Position::Long, Position::Flat]
        );
        assert_eq!(out.transitions[0].to, Position::Long);
    }

    #[test]
    fn test_entry_threshold_is_inclusive() {
        let out = run_flat_prices(&[1.0, 0.5]);
        assert_eq!(out.positions, vec![Position::Short, Position::Flat]);
    }

    #[test]
    fn test_no_flip_without_passing_through_flat() {
        // Short at 1.5; a swing to -1.5 must exit first, never reverse in place
        let out = run_flat_prices(&[1.5, -1.5, -1.5]);
        assert_eq!(out.positions, vec![Position::Short, Position::Short, Position::Short]);
        assert_eq!(out.transitions.len(), 1);
    }

    #[test]
    fn test_stop_loss_beats_reversion() {
        let mut sm = machine();
        let entry = sm.step(&bar(0, 100.0, 50.0, Some(-1.5))).unwrap();
        assert_eq!(entry.to, Position::Long);

        // Notional 150, loss 0.3 -> -0.2%, while |z| is inside exit band
        let exit = sm.step(&bar(1, 99.7, 50.0, Some(0.1))).unwrap();
        assert_eq!(exit.exit_reason, Some(ExitReason::StopLoss));
        assert_eq!(sm.position(), Position::Flat);
    }

    #[test]
    fn test_take_profit_before_reversion() {
        let mut sm = machine();
        sm.step(&bar(0, 100.0, 50.0, Some(1.5))).unwrap();
        // Short profits when A falls relative to B: +0.3 on 150
        let exit = sm.step(&bar(1, 99.7, 50.0, Some(0.2))).unwrap();
        assert_eq!(exit.exit_reason, Some(ExitReason::TakeProfit));
    }

    #[test]
    fn test_stop_loss_without_reversion() {
        let mut sm = machine();
        sm.step(&bar(0, 100.0, 50.0, Some(1.5))).unwrap();
        let exit = sm.step(&bar(1, 100.3, 50.0, Some(2.5))).unwrap();
        assert_eq!(exit.from, Position::Short);
        assert_eq!(exit.exit_reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn test_undefined_z_holds_position() {
        let mut sm = machine();
        sm.step(&bar(0, 100.0, 50.0, Some(-1.5))).unwrap();
        // A large loss is ignored while the z-score is undefined
        assert!(sm.step(&bar(1, 90.0, 50.0, None)).is_none());
        assert_eq!(sm.position(), Position::Long);
        assert!(sm.step(&bar(2, 90.0, 50.0, Some(-1.4))).is_some());
    }

    #[test]
    fn test_stop_loss_uses_entry_hedge_ratio() {
        let mut sm = machine();
        sm.step(&bar(0, 100.0, 50.0, Some(-1.5))).unwrap();
        let open = *sm.open_position().unwrap();

        // Later bars carry a different ratio; the open leg keeps its own
        let mut later = bar(1, 100.0, 50.3, Some(-1.4));
        later.hedge_ratio = 0.0;
        let exit = sm.step(&later).unwrap();
        assert_eq!(open.hedge_ratio, 1.0);
        assert_eq!(exit.exit_reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn test_misaligned_inputs() {
        let a = PriceSeries::from_daily_closes("A", &[1.0, 2.0, 3.0]).unwrap();
        let b = PriceSeries::from_daily_closes("B", &[1.0, 2.0, 3.0]).unwrap();
        let est = HedgeRatioEstimate::constant(
            HedgeMethod::Ols,
            3,
            1.0,
            0.0,
            FitDiagnostics::Ols { r_squared: 1.0 },
        );
        let result = generate_signals(&a, &b, &est, &[None, None], &AnalysisConfig::default());
        assert!(matches!(result, Err(PairsError::MisalignedInput(_))));
    }
}
