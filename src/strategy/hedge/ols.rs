//! Ordinary least squares hedge ratio: `A = beta * B + alpha + e`

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::domain::PairsError;

/// Minimum observations for a two-parameter fit
pub const MIN_OBSERVATIONS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub beta: f64,
    pub alpha: f64,
    pub r_squared: f64,
}

/// Regress `a` on `b` with an intercept over the full sample
pub fn fit(a: &[f64], b: &[f64]) -> Result<OlsFit, PairsError> {
    if a.len() != b.len() {
        return Err(PairsError::MisalignedInput(format!(
            "OLS inputs differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.len() < MIN_OBSERVATIONS {
        return Err(PairsError::insufficient_data("OLS", MIN_OBSERVATIONS, a.len()));
    }

    let mean_a = a.iter().copied().mean();
    let mean_b = b.iter().copied().mean();

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&ya, &xb) in a.iter().zip(b.iter()) {
        let dx = xb - mean_b;
        let dy = ya - mean_a;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let scale: f64 = b.iter().map(|x| x * x).sum();
    if sxx <= f64::EPSILON * scale {
        return Err(PairsError::DegenerateInput(
            "asset B has zero variance, hedge ratio undefined".to_string(),
        ));
    }

    let beta = sxy / sxx;
    let alpha = mean_a - beta * mean_b;

    let ss_res: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(&ya, &xb)| {
            let e = ya - beta * xb - alpha;
            e * e
        })
        .sum();
    let r_squared = if syy > 0.0 { 1.0 - ss_res / syy } else { 1.0 };

    Ok(OlsFit {
        beta,
        alpha,
        r_squared,
    })
}
