//! Pair diagnostics: rolling correlation and spread half-life

use statrs::statistics::Statistics;

use crate::strategy::hedge::ols;

/// Half-lives beyond this many bars are reported as not mean reverting
pub const MAX_HALF_LIFE: f64 = 1000.0;

/// Minimum spread length for a half-life estimate
pub const MIN_HALF_LIFE_OBSERVATIONS: usize = 10;

/// Trailing Pearson correlation of `a` and `b`.
///
/// `None` while fewer than `window` points are available and wherever
/// either leg is flat inside the window.
pub fn rolling_correlation(a: &[f64], b: &[f64], window: usize) -> Vec<Option<f64>> {
    let len = a.len().min(b.len());
    (0..len)
        .map(|t| {
            if window < 2 || t + 1 < window {
                return None;
            }
            let start = t + 1 - window;
            correlation(&a[start..=t], &b[start..=t])
        })
        .collect()
}

fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let std_a = a.std_dev();
    let std_b = b.std_dev();
    if !(std_a > 1e-12 && std_b > 1e-12) {
        return None;
    }
    let rho = a.covariance(b) / (std_a * std_b);
    rho.is_finite().then(|| rho.clamp(-1.0, 1.0))
}

/// Mean-reversion half-life of the spread in bars.
///
/// Fits the AR(1) regression `dS[t] = phi * (S[t-1] - mean) + c` and
/// returns `-ln 2 / ln(1 + phi)`. `None` when the spread is too short or
/// the fitted `phi` is not in `(-1, 0)`.
pub fn half_life(spread: &[f64]) -> Option<f64> {
    let n = spread.len();
    if n < MIN_HALF_LIFE_OBSERVATIONS {
        return None;
    }

    let mean = spread.iter().copied().mean();
    let deltas: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let lagged: Vec<f64> = spread[..n - 1].iter().map(|s| s - mean).collect();

    let phi = ols::fit(&deltas, &lagged).ok()?.beta;
    if phi >= 0.0 || phi <= -1.0 {
        return None;
    }

    let half_life = -(2.0_f64.ln()) / (1.0 + phi).ln();
    (half_life > 0.0 && half_life < MAX_HALF_LIFE).then_some(half_life)
}
