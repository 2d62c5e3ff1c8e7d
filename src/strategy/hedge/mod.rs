//! Hedge Ratio Estimation
//!
//! Produces `(beta_t, alpha_t)` for every aligned bar from one of three
//! interchangeable methods:
//! - `ols`: single least-squares fit, constant across the sample
//! - `kalman`: forward-filtered random-walk state, varies per bar and only
//!   uses observations up to that bar
//! - `johansen`: cointegrating vector from the VECM rank test, constant,
//!   no intercept
//!
//! All estimators are pure functions of their inputs.

pub mod johansen;
pub mod kalman;
pub mod ols;

use serde::{Deserialize, Serialize};

use crate::domain::{PairsError, PriceSeries};
use crate::strategy::params::HedgeMethod;

pub use johansen::{JohansenFit, JohansenStats};
pub use kalman::{KalmanHedgeFilter, KalmanStep};
pub use ols::OlsFit;

/// Method-specific fit diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FitDiagnostics {
    Ols {
        r_squared: f64,
    },
    Kalman {
        /// State covariance after the last update
        final_covariance: [[f64; 2]; 2],
    },
    Johansen(JohansenStats),
}

/// Hedge ratio and intercept per aligned bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeRatioEstimate {
    method: HedgeMethod,
    betas: Vec<f64>,
    alphas: Vec<f64>,
    diagnostics: FitDiagnostics,
}

impl HedgeRatioEstimate {
    /// Same `(beta, alpha)` applied to all `len` bars
    pub fn constant(
        method: HedgeMethod,
        len: usize,
        beta: f64,
        alpha: f64,
        diagnostics: FitDiagnostics,
    ) -> Self {
        Self {
            method,
            betas: vec![beta; len],
            alphas: vec![alpha; len],
            diagnostics,
        }
    }

    pub fn time_varying(
        method: HedgeMethod,
        betas: Vec<f64>,
        alphas: Vec<f64>,
        diagnostics: FitDiagnostics,
    ) -> Result<Self, PairsError> {
        if betas.len() != alphas.len() {
            return Err(PairsError::MisalignedInput(format!(
                "{} betas but {} alphas",
                betas.len(),
                alphas.len()
            )));
        }
        Ok(Self {
            method,
            betas,
            alphas,
            diagnostics,
        })
    }

    pub fn method(&self) -> &HedgeMethod {
        &self.method
    }

    pub fn betas(&self) -> &[f64] {
        &self.betas
    }

    pub fn alphas(&self) -> &[f64] {
        &self.alphas
    }

    pub fn beta_at(&self, index: usize) -> Option<f64> {
        self.betas.get(index).copied()
    }

    pub fn alpha_at(&self, index: usize) -> Option<f64> {
        self.alphas.get(index).copied()
    }

    pub fn diagnostics(&self) -> &FitDiagnostics {
        &self.diagnostics
    }

    pub fn len(&self) -> usize {
        self.betas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.betas.is_empty()
    }

    /// Latest `(beta, alpha)`
    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.betas.last()?, *self.alphas.last()?))
    }

    pub fn is_constant(&self) -> bool {
        self.betas.windows(2).all(|w| w[0] == w[1]) && self.alphas.windows(2).all(|w| w[0] == w[1])
    }
}

/// Estimate the hedge ratio of `price_a` against `price_b` with `method`
pub fn estimate(
    method: &HedgeMethod,
    price_a: &PriceSeries,
    price_b: &PriceSeries,
) -> Result<HedgeRatioEstimate, PairsError> {
    price_a.check_aligned(price_b)?;
    let a = price_a.prices();
    let b = price_b.prices();

    let estimate = match method {
        HedgeMethod::Ols => {
            let fit = ols::fit(a, b)?;
            HedgeRatioEstimate::constant(
                *method,
                a.len(),
                fit.beta,
                fit.alpha,
                FitDiagnostics::Ols {
                    r_squared: fit.r_squared,
                },
            )
        }
        HedgeMethod::Kalman(params) => {
            let steps = kalman::filter(a, b, params)?;
            let final_covariance = steps
                .last()
                .map(|s| s.covariance)
                .unwrap_or([[0.0; 2]; 2]);
            HedgeRatioEstimate::time_varying(
                *method,
                steps.iter().map(|s| s.beta).collect(),
                steps.iter().map(|s| s.alpha).collect(),
                FitDiagnostics::Kalman { final_covariance },
            )?
        }
        HedgeMethod::Johansen(params) => {
            let fit = johansen::fit(a, b, params)?;
            HedgeRatioEstimate::constant(
                *method,
                a.len(),
                fit.beta,
                0.0,
                FitDiagnostics::Johansen(fit.stats),
            )
        }
    };

    tracing::debug!(
        method = method.name(),
        bars = estimate.len(),
        last = ?estimate.last(),
        "Hedge ratio estimated"
    );

    Ok(estimate)
}
