//! Spread and rolling z-score series

use crate::domain::{PairsError, PriceSeries};
use crate::strategy::hedge::HedgeRatioEstimate;
use crate::strategy::zscore_gate::ZScoreGate;

/// `spread[t] = A[t] - beta[t] * B[t] - alpha[t]`
pub fn spread(
    price_a: &PriceSeries,
    price_b: &PriceSeries,
    estimate: &HedgeRatioEstimate,
) -> Result<Vec<f64>, PairsError> {
    let a = price_a.prices();
    let b = price_b.prices();
    if a.len() != b.len() || a.len() != estimate.len() {
        return Err(PairsError::MisalignedInput(format!(
            "spread inputs differ in length: A={}, B={}, estimate={}",
            a.len(),
            b.len(),
            estimate.len()
        )));
    }

    Ok(a.iter()
        .zip(b)
        .zip(estimate.betas().iter().zip(estimate.alphas()))
        .map(|((pa, pb), (beta, alpha))| pa - beta * pb - alpha)
        .collect())
}

/// Rolling z-score of `spread`, `None` during warm-up and on flat windows
pub fn zscore(spread: &[f64], window: usize) -> Result<Vec<Option<f64>>, PairsError> {
    let mut gate = ZScoreGate::new(window)?;
    Ok(spread
        .iter()
        .map(|&value| gate.update(value).map(|r| r.z_score))
        .collect())
}
