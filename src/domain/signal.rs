use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::position::Position;

/// Why an open position was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExitReason {
    ZScoreReversion,
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::ZScoreReversion => write!(f, "ZScoreReversion"),
            ExitReason::StopLoss => write!(f, "StopLoss"),
            ExitReason::TakeProfit => write!(f, "TakeProfit"),
        }
    }
}

/// A position change emitted by the signal state machine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Bar index in the aligned series
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub from: Position,
    pub to: Position,
    /// Z-score observed on the bar
    pub z_score: f64,
    /// Hedge ratio in force on the bar
    pub hedge_ratio: f64,
    /// Set on exits only
    pub exit_reason: Option<ExitReason>,
}

impl Transition {
    pub fn is_entry(&self) -> bool {
        self.from.is_flat() && self.to.is_open()
    }

    pub fn is_exit(&self) -> bool {
        self.from.is_open() && self.to.is_flat()
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} -> {} (z={:.3}, beta={:.4})",
            self.index, self.from, self.to, self.z_score, self.hedge_ratio
        )?;
        if let Some(reason) = self.exit_reason {
            write!(f, " {}", reason)?;
        }
        Ok(())
    }
}
