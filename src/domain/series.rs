//! Price series for one leg of a pair.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::PairsError;

/// A single observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Ordered price history of a single asset.
///
/// Timestamps are strictly increasing and prices finite. Alignment with the
/// other leg is a caller precondition; see [`PriceSeries::check_aligned`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    timestamps: Vec<DateTime<Utc>>,
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, PairsError> {
        let symbol = symbol.into();
        let mut timestamps = Vec::with_capacity(points.len());
        let mut prices = Vec::with_capacity(points.len());

        for (i, point) in points.into_iter().enumerate() {
            if !point.price.is_finite() {
                return Err(PairsError::MisalignedInput(format!(
                    "{}: non-finite price {} at index {}",
                    symbol, point.price, i
                )));
            }
            if let Some(prev) = timestamps.last() {
                if point.timestamp <= *prev {
                    return Err(PairsError::MisalignedInput(format!(
                        "{}: timestamps not strictly increasing at index {} ({} after {})",
                        symbol, i, point.timestamp, prev
                    )));
                }
            }
            timestamps.push(point.timestamp);
            prices.push(point.price);
        }

        Ok(Self {
            symbol,
            timestamps,
            prices,
        })
    }

    /// Daily closes starting at 2024-01-01 UTC. Deterministic, used by tests and demos.
    pub fn from_daily_closes(symbol: impl Into<String>, closes: &[f64]) -> Result<Self, PairsError> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().ok_or_else(|| {
            PairsError::MisalignedInput("invalid series start date".to_string())
        })?;
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &price)| PricePoint {
                timestamp: start + Duration::days(i as i64),
                price,
            })
            .collect();
        Self::new(symbol, points)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn price_at(&self, index: usize) -> Option<f64> {
        self.prices.get(index).copied()
    }

    pub fn timestamp_at(&self, index: usize) -> Option<DateTime<Utc>> {
        self.timestamps.get(index).copied()
    }

    /// Keep only the first `len` observations
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.len());
        Self {
            symbol: self.symbol.clone(),
            timestamps: self.timestamps[..len].to_vec(),
            prices: self.prices[..len].to_vec(),
        }
    }

    /// Verify that `other` covers exactly the same timestamps
    pub fn check_aligned(&self, other: &PriceSeries) -> Result<(), PairsError> {
        if self.len() != other.len() {
            return Err(PairsError::MisalignedInput(format!(
                "{} has {} observations but {} has {}",
                self.symbol,
                self.len(),
                other.symbol,
                other.len()
            )));
        }
        if let Some(i) = self
            .timestamps
            .iter()
            .zip(other.timestamps.iter())
            .position(|(a, b)| a != b)
        {
            return Err(PairsError::MisalignedInput(format!(
                "timestamp mismatch at index {}: {} vs {}",
                i, self.timestamps[i], other.timestamps[i]
            )));
        }
        Ok(())
    }
}
