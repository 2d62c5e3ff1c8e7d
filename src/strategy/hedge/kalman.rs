//! Kalman Filter for dynamic hedge ratio estimation.
//!
//! Tracks a two-dimensional state `(beta, alpha)` between two assets.
//!
//! # Mathematical Model
//!
//! **State equation** (random walk):
//! ```text
//! x[t] = x[t-1] + w,  where w ~ N(0, delta/(1-delta) * I)
//! ```
//!
//! **Observation equation**:
//! ```text
//! A[t] = beta[t] * B[t] + alpha[t] + v,  where v ~ N(0, 1)
//! ```
//!
//! The prior is `x = (0, 0)` with an all-ones covariance. The first
//! observation updates the prior directly; every later observation runs a
//! predict step first. Only filtered states are produced, so the estimate at
//! bar `t` never sees data after `t`.
//!
//! # References
//!
//! - Chan, E. (2013). "Algorithmic Trading: Winning Strategies and Their Rationale"

use nalgebra::{Matrix2, RowVector2, Vector2};
use serde::{Deserialize, Serialize};

use crate::domain::PairsError;
use crate::strategy::params::KalmanParams;

/// Observation noise variance
const OBSERVATION_VARIANCE: f64 = 1.0;

pub const MIN_OBSERVATIONS: usize = 2;

/// Filtered state after one observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KalmanStep {
    pub beta: f64,
    pub alpha: f64,
    /// Posterior state covariance, row-major
    pub covariance: [[f64; 2]; 2],
    /// Observation minus one-step prediction
    pub innovation: f64,
    /// Predicted variance of the observation
    pub innovation_variance: f64,
}

/// Forward-only Kalman filter over `(beta, alpha)`.
///
/// Holds transient per-run state; build a fresh filter for every series.
#[derive(Debug, Clone)]
pub struct KalmanHedgeFilter {
    state: Vector2<f64>,
    covariance: Matrix2<f64>,
    transition_covariance: Matrix2<f64>,
    update_count: u64,
}

impl KalmanHedgeFilter {
    pub fn new(params: &KalmanParams) -> Self {
        Self {
            state: Vector2::zeros(),
            covariance: Matrix2::from_element(1.0),
            transition_covariance: Matrix2::identity() * params.transition_variance(),
            update_count: 0,
        }
    }

    /// Fold in one aligned observation and return the filtered state.
    ///
    /// Covariance is updated in Joseph form and re-symmetrized so it stays
    /// symmetric positive semi-definite.
    pub fn update(&mut self, price_a: f64, price_b: f64) -> Result<KalmanStep, PairsError> {
        if !price_a.is_finite() || !price_b.is_finite() {
            return Err(PairsError::DegenerateInput(format!(
                "non-finite observation at step {}: A={}, B={}",
                self.update_count, price_a, price_b
            )));
        }

        // === PREDICT ===
        // Identity transition: state carries over, uncertainty grows
        if self.update_count > 0 {
            self.covariance += self.transition_covariance;
        }

        // === UPDATE ===
        let h = RowVector2::new(price_b, 1.0);
        let innovation = price_a - (h * self.state)[(0, 0)];
        let innovation_variance =
            (h * self.covariance * h.transpose())[(0, 0)] + OBSERVATION_VARIANCE;

        if !innovation_variance.is_finite() || innovation_variance <= 0.0 {
            return Err(PairsError::DegenerateInput(format!(
                "innovation variance {} at step {}",
                innovation_variance, self.update_count
            )));
        }

        let gain: Vector2<f64> = self.covariance * h.transpose() / innovation_variance;
        self.state += gain * innovation;

        let i_kh = Matrix2::identity() - gain * h;
        let joseph = i_kh * self.covariance * i_kh.transpose()
            + gain * gain.transpose() * OBSERVATION_VARIANCE;
        self.covariance = (joseph + joseph.transpose()) * 0.5;

        if !self.state.iter().all(|v| v.is_finite()) {
            return Err(PairsError::DegenerateInput(format!(
                "filter diverged at step {}",
                self.update_count
            )));
        }

        self.update_count += 1;

        Ok(KalmanStep {
            beta: self.state[0],
            alpha: self.state[1],
            covariance: [
                [self.covariance[(0, 0)], self.covariance[(0, 1)]],
                [self.covariance[(1, 0)], self.covariance[(1, 1)]],
            ],
            innovation,
            innovation_variance,
        })
    }

    pub fn beta(&self) -> f64 {
        self.state[0]
    }

    pub fn alpha(&self) -> f64 {
        self.state[1]
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }
}

/// Run the filter over the full aligned sample
pub fn filter(a: &[f64], b: &[f64], params: &KalmanParams) -> Result<Vec<KalmanStep>, PairsError> {
    if a.len() != b.len() {
        return Err(PairsError::MisalignedInput(format!(
            "Kalman inputs differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.len() < MIN_OBSERVATIONS {
        return Err(PairsError::insufficient_data("Kalman", MIN_OBSERVATIONS, a.len()));
    }
    if a.iter().all(|&p| p == 0.0) || b.iter().all(|&p| p == 0.0) {
        return Err(PairsError::DegenerateInput(
            "all-zero price series".to_string(),
        ));
    }

    let mut kf = KalmanHedgeFilter::new(params);
    a.iter()
        .zip(b.iter())
        .map(|(&pa, &pb)| kf.update(pa, pb))
        .collect()
}
