use serde::{Deserialize, Serialize};
use std::fmt;

/// Position held in the spread.
///
/// `Long` is long asset A and short `beta` units of asset B; `Short` is the
/// mirror image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Position {
    #[default]
    Flat,
    Long,
    Short,
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_open(&self) -> bool {
        !self.is_flat()
    }

    /// +1 for long spread, -1 for short spread, 0 when flat
    pub fn direction(&self) -> f64 {
        match self {
            Position::Flat => 0.0,
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Flat => write!(f, "FLAT"),
            Position::Long => write!(f, "LONG"),
            Position::Short => write!(f, "SHORT"),
        }
    }
}

/// Entry snapshot of an open spread position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: Position,
    pub entry_index: usize,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub hedge_ratio: f64,
}

impl OpenPosition {
    /// Gross exposure of one unit of A against `hedge_ratio` units of B
    pub fn entry_notional(&self) -> f64 {
        notional(self.entry_price_a, self.entry_price_b, self.hedge_ratio)
    }

    /// Direction-adjusted change in spread value since entry, before costs
    pub fn unrealized_pnl(&self, price_a: f64, price_b: f64) -> f64 {
        let spread_change =
            (price_a - self.entry_price_a) - self.hedge_ratio * (price_b - self.entry_price_b);
        self.side.direction() * spread_change
    }

    /// Unrealized P&L as a percentage of entry notional
    pub fn unrealized_pnl_pct(&self, price_a: f64, price_b: f64) -> f64 {
        let notional = self.entry_notional();
        if notional <= 0.0 {
            return 0.0;
        }
        self.unrealized_pnl(price_a, price_b) / notional * 100.0
    }
}

/// Gross notional of a spread leg pair
pub fn notional(price_a: f64, price_b: f64, hedge_ratio: f64) -> f64 {
    price_a.abs() + hedge_ratio.abs() * price_b.abs()
}
