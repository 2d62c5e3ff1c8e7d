//! Johansen cointegration test for a two-asset system.
//!
//! Estimates the VECM
//! ```text
//! dY[t] = Pi * Y[t-1] + sum_{i=1..k} Gamma_i * dY[t-i] + e[t]
//! ```
//! by reduced-rank regression. Differences and lagged levels are both
//! regressed on the lagged differences; the residual product-moment
//! matrices give the generalized eigenproblem
//! ```text
//! S_k0 * S00^-1 * S_0k * v = lambda * S_kk * v
//! ```
//! whose leading eigenvector is the cointegrating vector. The trace
//! statistic for rank zero is compared against the Osterwald-Lenum /
//! MacKinnon-Haug-Michelis critical values.

use nalgebra::{DMatrix, SymmetricEigen};
use serde::{Deserialize, Serialize};

use crate::domain::PairsError;
use crate::strategy::params::JohansenParams;

const NUM_SERIES: usize = 2;

/// Trace critical values `[90%, 95%, 99%]`, indexed by det_order + 1 then
/// by (number of series - rank - 1)
const TRACE_CRITICAL_VALUES: [[[f64; 3]; 2]; 3] = [
    // no deterministic terms
    [[2.9762, 4.1296, 6.9406], [10.4741, 12.3212, 16.3640]],
    // constant
    [[2.7055, 3.8415, 6.6349], [13.4294, 15.4943, 19.9349]],
    // linear trend
    [[2.7055, 3.8415, 6.6349], [16.1619, 18.3985, 23.1485]],
];

/// Maximum-eigenvalue critical values, same layout as the trace table
const MAX_EIGEN_CRITICAL_VALUES: [[[f64; 3]; 2]; 3] = [
    [[2.9762, 4.1296, 6.9406], [9.4748, 11.2246, 15.0923]],
    [[2.7055, 3.8415, 6.6349], [12.2971, 14.2639, 18.5200]],
    [[2.7055, 3.8415, 6.6349], [15.0006, 17.1481, 21.7465]],
];

/// Test statistics reported alongside the hedge ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JohansenStats {
    /// Eigenvalues in descending order
    pub eigenvalues: Vec<f64>,
    /// Trace statistics for H0: rank <= r, r = 0, 1
    pub trace_statistics: Vec<f64>,
    pub trace_critical_values: Vec<f64>,
    /// Max-eigenvalue statistics for H0: rank = r, r = 0, 1
    pub max_eigen_statistics: Vec<f64>,
    pub max_eigen_critical_values: Vec<f64>,
    /// Cointegrating vector normalized to 1 on asset A
    pub cointegrating_vector: Vec<f64>,
    /// Cointegration rank accepted by the sequential trace test
    pub rank: usize,
    pub confidence: f64,
    /// Rows used in the regressions
    pub effective_observations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JohansenFit {
    pub beta: f64,
    pub stats: JohansenStats,
}

/// Observations needed for `k_ar_diff` lagged differences
pub fn min_observations(k_ar_diff: usize) -> usize {
    3 * k_ar_diff + 6
}

/// Run the trace test and extract the hedge ratio.
///
/// Fails with `NonCointegrated` when the rank-zero trace statistic does not
/// exceed its critical value at `params.confidence`.
pub fn fit(a: &[f64], b: &[f64], params: &JohansenParams) -> Result<JohansenFit, PairsError> {
    if a.len() != b.len() {
        return Err(PairsError::MisalignedInput(format!(
            "Johansen inputs differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    let n = a.len();
    let k = params.k_ar_diff;
    let required = min_observations(k);
    if n < required {
        return Err(PairsError::insufficient_data("Johansen", required, n));
    }
    let conf_idx = confidence_index(params.confidence)?;
    let det_idx = det_order_index(params.det_order)?;

    let levels = DMatrix::from_fn(n, NUM_SERIES, |i, j| if j == 0 { a[i] } else { b[i] });
    let y = detrend(&levels, params.det_order)?;

    // Differences: dx[t] = y[t+1] - y[t]
    let dx = DMatrix::from_fn(n - 1, NUM_SERIES, |i, j| y[(i + 1, j)] - y[(i, j)]);

    let rows = n - 1 - k;
    let inner_order = if params.det_order > -1 { 0 } else { -1 };

    // Lagged differences dx[t-1] .. dx[t-k] for t = k .. n-2
    let lagged = DMatrix::from_fn(rows, NUM_SERIES * k, |i, c| {
        let lag = c / NUM_SERIES + 1;
        dx[(k + i - lag, c % NUM_SERIES)]
    });
    let lagged = detrend(&lagged, inner_order)?;

    let dx_t = detrend(&dx.rows(k, rows).into_owned(), inner_order)?;
    let level_lag = detrend(&y.rows(k, rows).into_owned(), inner_order)?;

    let r0 = residuals(&dx_t, &lagged)?;
    let rk = residuals(&level_lag, &lagged)?;

    let t = rows as f64;
    let s00 = r0.transpose() * &r0 / t;
    let s0k = r0.transpose() * &rk / t;
    let skk = rk.transpose() * &rk / t;

    let s00_inv = s00.clone().try_inverse().ok_or_else(|| {
        PairsError::DegenerateInput("singular residual covariance of differences".to_string())
    })?;
    let sig = s0k.transpose() * s00_inv * &s0k;

    // Reduce to a symmetric problem with the Cholesky factor of S_kk
    let chol = skk.clone().cholesky().ok_or_else(|| {
        PairsError::DegenerateInput(
            "lagged levels are collinear, cointegrating space undefined".to_string(),
        )
    })?;
    let l_inv = chol.l().try_inverse().ok_or_else(|| {
        PairsError::DegenerateInput("singular Cholesky factor".to_string())
    })?;
    let c = &l_inv * sig * l_inv.transpose();
    let c = (&c + c.transpose()) * 0.5;
    let eigen = SymmetricEigen::new(c);

    let mut order: Vec<usize> = (0..NUM_SERIES).collect();
    order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

    let eigenvalues: Vec<f64> = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
    if eigenvalues.iter().any(|&l| !l.is_finite() || l >= 1.0) {
        return Err(PairsError::DegenerateInput(format!(
            "eigenvalues out of range: {:?}",
            eigenvalues
        )));
    }
    let log_terms: Vec<f64> = eigenvalues.iter().map(|&l| (1.0 - l.max(0.0)).ln()).collect();

    let trace_statistics: Vec<f64> = (0..NUM_SERIES)
        .map(|r| -t * log_terms[r..].iter().sum::<f64>())
        .collect();
    let max_eigen_statistics: Vec<f64> = log_terms.iter().map(|&lt| -t * lt).collect();
    let trace_critical_values: Vec<f64> = (0..NUM_SERIES)
        .map(|r| TRACE_CRITICAL_VALUES[det_idx][NUM_SERIES - r - 1][conf_idx])
        .collect();
    let max_eigen_critical_values: Vec<f64> = (0..NUM_SERIES)
        .map(|r| MAX_EIGEN_CRITICAL_VALUES[det_idx][NUM_SERIES - r - 1][conf_idx])
        .collect();

    let rank = trace_statistics
        .iter()
        .zip(trace_critical_values.iter())
        .take_while(|(stat, cv)| stat > cv)
        .count();

    if rank == 0 {
        return Err(PairsError::NonCointegrated {
            statistic: trace_statistics[0],
            critical_value: trace_critical_values[0],
            confidence: params.confidence,
        });
    }

    // Back-transform the leading eigenvector: v = L^-T w
    let w = eigen.eigenvectors.column(order[0]).into_owned();
    let v = l_inv.transpose() * w;
    if v[0].abs() < 1e-12 {
        return Err(PairsError::DegenerateInput(
            "cointegrating vector has no weight on asset A".to_string(),
        ));
    }
    let cointegrating_vector = vec![1.0, v[1] / v[0]];
    let beta = -cointegrating_vector[1];

    tracing::debug!(
        beta,
        trace0 = trace_statistics[0],
        critical = trace_critical_values[0],
        rank,
        "Johansen fit"
    );

    Ok(JohansenFit {
        beta,
        stats: JohansenStats {
            eigenvalues,
            trace_statistics,
            trace_critical_values,
            max_eigen_statistics,
            max_eigen_critical_values,
            cointegrating_vector,
            rank,
            confidence: params.confidence,
            effective_observations: rows,
        },
    })
}

fn confidence_index(confidence: f64) -> Result<usize, PairsError> {
    crate::strategy::params::SUPPORTED_CONFIDENCE_LEVELS
        .iter()
        .position(|level| (level - confidence).abs() < 1e-9)
        .ok_or_else(|| {
            PairsError::invalid_config(format!(
                "johansen confidence must be one of 0.90, 0.95, 0.99, got {}",
                confidence
            ))
        })
}

fn det_order_index(det_order: i32) -> Result<usize, PairsError> {
    match det_order {
        -1 => Ok(0),
        0 => Ok(1),
        1 => Ok(2),
        other => Err(PairsError::invalid_config(format!(
            "johansen det_order must be -1, 0 or 1, got {}",
            other
        ))),
    }
}

/// Remove a polynomial time trend of the given order from every column.
/// Order -1 leaves the data untouched, 0 demeans.
fn detrend(data: &DMatrix<f64>, order: i32) -> Result<DMatrix<f64>, PairsError> {
    if order < 0 || data.ncols() == 0 {
        return Ok(data.clone());
    }
    let rows = data.nrows();
    let scale = rows.max(1) as f64;
    let trend = DMatrix::from_fn(rows, order as usize + 1, |i, p| {
        (i as f64 / scale).powi(p as i32)
    });
    residuals(data, &trend)
}

/// `y - x * pinv(x) * y`
fn residuals(y: &DMatrix<f64>, x: &DMatrix<f64>) -> Result<DMatrix<f64>, PairsError> {
    if x.ncols() == 0 {
        return Ok(y.clone());
    }
    let pinv = x
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| PairsError::DegenerateInput(format!("pseudo-inverse failed: {}", e)))?;
    Ok(y - x * (pinv * y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_walk(rng: &mut StdRng, n: usize, start: f64) -> Vec<f64> {
        let mut level = start;
        (0..n)
            .map(|_| {
                level += rng.gen_range(-1.0..1.0);
                level
            })
            .collect()
    }

    fn cointegrated_pair(seed: u64, n: usize, beta: f64, intercept: f64) -> (Vec<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let b = random_walk(&mut rng, n, 100.0);
        let a = b
            .iter()
            .map(|x| beta * x + intercept + rng.gen_range(-0.5..0.5))
            .collect();
        (a, b)
    }

    #[test]
    fn test_recovers_hedge_ratio_of_cointegrated_pair() {
        let (a, b) = cointegrated_pair(42, 500, 1.5, 2.0);
        let fit = fit(&a, &b, &JohansenParams::default()).unwrap();

        assert!((fit.beta - 1.5).abs() < 0.05, "beta {}", fit.beta);
        assert!(fit.stats.rank >= 1);
        assert!(fit.stats.trace_statistics[0] > fit.stats.trace_critical_values[0]);
        assert_eq!(fit.stats.cointegrating_vector[0], 1.0);
        assert!(fit.stats.eigenvalues[0] >= fit.stats.eigenvalues[1]);
        assert_eq!(fit.stats.effective_observations, 498);
    }

    #[test]
    fn test_trace_critical_values_follow_confidence() {
        let (a, b) = cointegrated_pair(7, 400, 0.7, 5.0);
        let at_90 = fit(&a, &b, &JohansenParams { confidence: 0.90, ..Default::default() }).unwrap();
        let at_99 = fit(&a, &b, &JohansenParams { confidence: 0.99, ..Default::default() }).unwrap();
        assert_eq!(at_90.stats.trace_critical_values[0], 13.4294);
        assert_eq!(at_99.stats.trace_critical_values[0], 19.9349);
        assert_eq!(at_90.beta, at_99.beta);
    }

    #[test]
    fn test_independent_random_walks_rejected() {
        let params = JohansenParams {
            confidence: 0.99,
            ..Default::default()
        };
        let mut rejected = 0;
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(1000 + seed);
            let a = random_walk(&mut rng, 500, 100.0);
            let b = random_walk(&mut rng, 500, 50.0);
            match fit(&a, &b, &params) {
                Err(PairsError::NonCointegrated {
                    statistic,
                    critical_value,
                    ..
                }) => {
                    assert!(statistic <= critical_value);
                    rejected += 1;
                }
                Ok(_) => {}
                Err(other) => panic!("unexpected error {:?}", other),
            }
        }
        assert!(rejected >= 7, "only {} of 10 independent pairs rejected", rejected);
    }

    #[test]
    fn test_supports_every_trend_order_and_lag() {
        let (a, b) = cointegrated_pair(11, 300, 2.0, 0.0);
        for det_order in [-1, 0, 1] {
            for k_ar_diff in [0, 1, 3] {
                let params = JohansenParams {
                    det_order,
                    k_ar_diff,
                    confidence: 0.95,
                };
                let fit = fit(&a, &b, &params).unwrap();
                assert!(
                    (fit.beta - 2.0).abs() < 0.1,
                    "det_order {} k {} beta {}",
                    det_order,
                    k_ar_diff,
                    fit.beta
                );
            }
        }
    }

    #[test]
    fn test_insufficient_data() {
        let result = fit(&[1.0; 5], &[2.0; 5], &JohansenParams::default());
        assert!(matches!(
            result,
            Err(PairsError::InsufficientData { required: 9, actual: 5, .. })
        ));
    }

    #[test]
    fn test_unsupported_parameters_rejected() {
        let (a, b) = cointegrated_pair(5, 100, 1.0, 0.0);
        let bad_order = JohansenParams {
            det_order: 2,
            ..Default::default()
        };
        let bad_confidence = JohansenParams {
            confidence: 0.8,
            ..Default::default()
        };
        assert!(matches!(
            fit(&a, &b, &bad_order),
            Err(PairsError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            fit(&a, &b, &bad_confidence),
            Err(PairsError::InvalidConfiguration(_))
        ));
    }
}
