//! Z-Score Gate
//!
//! Streaming rolling standardization of the spread.
//!
//! Z-Score Formula: z = (current_spread - rolling_mean) / rolling_std
//!
//! The standard deviation is the sample (n - 1) estimate over the trailing
//! window, so the first `window - 1` observations produce no score.

use std::collections::VecDeque;

use statrs::statistics::Statistics;

use crate::domain::PairsError;

/// Rolling std below this is treated as zero
pub const MIN_STD_DEV: f64 = 1e-10;

/// Result of z-score calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZScoreResult {
    /// Current z-score value
    pub z_score: f64,
    /// Rolling mean used in calculation
    pub mean: f64,
    /// Rolling sample standard deviation
    pub std_dev: f64,
    /// Latest spread value
    pub current_value: f64,
}

impl ZScoreResult {
    /// Spread is cheap relative to its recent history
    pub fn is_below(&self, threshold: f64) -> bool {
        self.z_score <= -threshold
    }

    /// Spread is rich relative to its recent history
    pub fn is_above(&self, threshold: f64) -> bool {
        self.z_score >= threshold
    }

    /// Within the neutral band
    pub fn is_neutral(&self, threshold: f64) -> bool {
        self.z_score.abs() <= threshold
    }
}

/// Fixed-capacity rolling window over the spread
#[derive(Debug, Clone)]
pub struct ZScoreGate {
    window: usize,
    buffer: VecDeque<f64>,
}

impl ZScoreGate {
    pub fn new(window: usize) -> Result<Self, PairsError> {
        if window < 2 {
            return Err(PairsError::invalid_config(format!(
                "window must be >= 2, got {}",
                window
            )));
        }
        Ok(Self {
            window,
            buffer: VecDeque::with_capacity(window),
        })
    }

    /// Push a new spread value and score it against the trailing window
    pub fn update(&mut self, value: f64) -> Option<ZScoreResult> {
        self.buffer.push_back(value);

        // Keep buffer at window size
        if self.buffer.len() > self.window {
            self.buffer.pop_front();
        }

        self.calculate()
    }

    /// Calculate z-score from current buffer
    pub fn calculate(&self) -> Option<ZScoreResult> {
        if !self.is_ready() {
            return None;
        }

        let mean = self.buffer.iter().copied().mean();
        let std_dev = self.buffer.iter().copied().std_dev();

        // Avoid division by zero
        if !std_dev.is_finite() || std_dev < MIN_STD_DEV {
            return None;
        }

        let current_value = *self.buffer.back()?;
        let z_score = (current_value - mean) / std_dev;

        Some(ZScoreResult {
            z_score,
            mean,
            std_dev,
            current_value,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Reset the buffer
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if buffer is full
    pub fn is_ready(&self) -> bool {
        self.buffer.len() >= self.window
    }
}
