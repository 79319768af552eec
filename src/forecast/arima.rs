//! ARIMA(p, d, 0) estimated by exact Gaussian maximum likelihood
//!
//! The series is differenced `d` times and an AR(p) without constant is fitted
//! to the result (a mean is estimated only when `d = 0`). The likelihood is the
//! exact one: the first `p` observations enter through their stationary
//! covariance, the rest through one-step prediction errors. The innovation
//! variance is concentrated out.
//!
//! Coefficients are searched over partial autocorrelations `tanh(u)`, which
//! the Durbin–Levinson recursion maps onto the stationary region, so every
//! point the optimiser visits is a stationary model.

use super::simplex::NelderMead;
use super::transforms::Differencer;
use crate::error::{AnalyticsError, Result, Stage};
use crate::linalg;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Largest partial autocorrelation used for starting values
const MAX_START_PACF: f64 = 0.95;

/// Model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl Default for ArimaOrder {
    fn default() -> Self {
        Self::new(5, 1, 0)
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Estimated parameters and fit statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar_coefficients: Vec<f64>,
    /// Mean of the series, non-zero only when `d = 0`
    pub mean: f64,
    pub sigma2: f64,
    pub log_likelihood: f64,
    pub aic: f64,
    pub bic: f64,
    /// Observations after differencing
    pub n_obs: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
struct FittedState {
    fit: ArimaFit,
    differencer: Differencer,
    /// Differenced, demeaned series
    working: Vec<f64>,
}

/// ARIMA model without moving-average terms
#[derive(Debug, Clone)]
pub struct Arima {
    order: ArimaOrder,
    optimizer: NelderMead,
    state: Option<FittedState>,
}

impl Arima {
    pub fn new(order: ArimaOrder) -> Result<Self> {
        if order.q != 0 {
            return Err(AnalyticsError::ConfigError(format!(
                "{} requested but moving-average terms are not supported",
                order
            )));
        }
        if order.d > 2 {
            return Err(AnalyticsError::ConfigError(format!(
                "differencing order must be ≤ 2, got {}",
                order.d
            )));
        }
        Ok(Self {
            order,
            optimizer: NelderMead::default(),
            state: None,
        })
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.optimizer = self.optimizer.with_max_iter(max_iter);
        self
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// Minimum series length this order can be estimated from
    pub fn min_observations(&self) -> usize {
        2 * self.order.p + 1 + self.order.d
    }

    pub fn fitted(&self) -> Option<&ArimaFit> {
        self.state.as_ref().map(|s| &s.fit)
    }

    /// Estimate the model
    pub fn fit(&mut self, series: &[f64]) -> Result<&ArimaFit> {
        let p = self.order.p;
        if series.len() < self.min_observations() {
            return Err(AnalyticsError::data_quality(
                Stage::Forecaster,
                format!(
                    "{} needs at least {} observations, got {}",
                    self.order,
                    self.min_observations(),
                    series.len()
                ),
            ));
        }
        if series.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::data_quality(Stage::Forecaster, "series contains non-finite values"));
        }

        let mut differencer = Differencer::new(self.order.d);
        let differenced = differencer.transform(&Array1::from(series.to_vec()))?;
        let m = differenced.len();

        let mean = if self.order.d == 0 {
            differenced.sum() / m as f64
        } else {
            0.0
        };
        let working: Vec<f64> = differenced.iter().map(|v| v - mean).collect();
        if working.iter().all(|v| v.abs() < f64::EPSILON) {
            return Err(AnalyticsError::data_quality(
                Stage::Forecaster,
                "series has no variation after differencing",
            ));
        }

        let start = conditional_least_squares(&working, p)
            .and_then(|phi| stationary_to_pacf(&phi))
            .unwrap_or_else(|| vec![0.0; p]);
        let u0: Vec<f64> = start
            .iter()
            .map(|r| r.clamp(-MAX_START_PACF, MAX_START_PACF).atanh())
            .collect();
        debug!(order = %self.order, start = ?start, "Starting values from conditional least squares");

        let objective = |u: &[f64]| {
            let phi = pacf_to_stationary(&transform_pacf(u));
            match exact_log_likelihood(&phi, &working) {
                Some((ll, _)) => -ll,
                None => f64::INFINITY,
            }
        };
        let result = self.optimizer.minimize(objective, &u0);

        if !result.converged {
            return Err(AnalyticsError::model_fit(
                Stage::Forecaster,
                format!(
                    "{} likelihood optimisation did not converge in {} iterations",
                    self.order, result.iterations
                ),
            ));
        }

        let phi = pacf_to_stationary(&transform_pacf(&result.x));
        let (log_likelihood, sigma2) = exact_log_likelihood(&phi, &working)
            .filter(|(ll, s2)| ll.is_finite() && s2.is_finite())
            .ok_or_else(|| {
                AnalyticsError::model_fit(Stage::Forecaster, "log-likelihood is not finite at the optimum")
            })?;

        // AR terms, innovation variance and the mean when it is estimated
        let k = (p + 1 + usize::from(self.order.d == 0)) as f64;
        let fit = ArimaFit {
            order: self.order,
            ar_coefficients: phi,
            mean,
            sigma2,
            log_likelihood,
            aic: -2.0 * log_likelihood + 2.0 * k,
            bic: -2.0 * log_likelihood + k * (m as f64).ln(),
            n_obs: m,
            iterations: result.iterations,
        };
        debug!(
            coefficients = ?fit.ar_coefficients,
            log_likelihood = fit.log_likelihood,
            iterations = fit.iterations,
            "ARIMA fit complete"
        );

        let state = self.state.insert(FittedState {
            fit,
            differencer,
            working,
        });
        Ok(&state.fit)
    }

    /// Point forecasts for the next `horizon` periods on the original scale
    pub fn forecast(&self, horizon: usize) -> Result<Vec<f64>> {
        let state = self.state.as_ref().ok_or_else(|| {
            AnalyticsError::model_fit(Stage::Forecaster, "forecast requested before fit")
        })?;
        let phi = &state.fit.ar_coefficients;

        let mut history = state.working.clone();
        let mut ahead = Array1::zeros(horizon);
        for h in 0..horizon {
            let t = history.len();
            let next: f64 = phi
                .iter()
                .enumerate()
                .map(|(j, c)| c * history[t - 1 - j])
                .sum();
            history.push(next);
            ahead[h] = next + state.fit.mean;
        }

        Ok(state.differencer.integrate(&ahead)?.to_vec())
    }
}

/// Regress `x_t` on its `p` lags (no intercept)
fn conditional_least_squares(x: &[f64], p: usize) -> Option<Vec<f64>> {
    if p == 0 {
        return Some(Vec::new());
    }
    let rows = x.len().checked_sub(p)?;
    let mut design = Array2::zeros((rows, p));
    let mut target = Array1::zeros(rows);
    for (r, t) in (p..x.len()).enumerate() {
        target[r] = x[t];
        for j in 0..p {
            design[[r, j]] = x[t - 1 - j];
        }
    }
    linalg::solve_least_squares(&design, &target).map(|w| w.to_vec())
}

fn transform_pacf(u: &[f64]) -> Vec<f64> {
    u.iter().map(|v| v.tanh()).collect()
}

/// Durbin–Levinson: partial autocorrelations in (-1, 1) to AR coefficients
pub(crate) fn pacf_to_stationary(pacf: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(pacf.len());
    for (k, &r) in pacf.iter().enumerate() {
        let mut next = vec![0.0; k + 1];
        for j in 0..k {
            next[j] = phi[j] - r * phi[k - 1 - j];
        }
        next[k] = r;
        phi = next;
    }
    phi
}

/// Step-down recursion, the inverse of [`pacf_to_stationary`].
/// Returns `None` when `phi` is not stationary.
pub(crate) fn stationary_to_pacf(phi: &[f64]) -> Option<Vec<f64>> {
    let p = phi.len();
    let mut current = phi.to_vec();
    let mut pacf = vec![0.0; p];
    for k in (0..p).rev() {
        let r = current[k];
        if !r.is_finite() || r.abs() >= 1.0 {
            return None;
        }
        pacf[k] = r;
        let denom = 1.0 - r * r;
        current = (0..k)
            .map(|j| (current[j] + r * current[k - 1 - j]) / denom)
            .collect();
    }
    Some(pacf)
}

/// Autocovariances `γ_0..γ_p` of a stationary AR(p) with unit innovation variance
fn unit_autocovariances(phi: &[f64]) -> Option<Vec<f64>> {
    let p = phi.len();
    let mut a = Array2::<f64>::eye(p + 1);
    for k in 0..=p {
        for (j, c) in phi.iter().enumerate() {
            let lag = (k as isize - (j as isize + 1)).unsigned_abs();
            a[[k, lag]] -= c;
        }
    }
    let inv = linalg::matrix_inverse(&a)?;
    let gamma: Vec<f64> = inv.column(0).to_vec();
    (gamma[0] > 0.0 && gamma.iter().all(|g| g.is_finite())).then_some(gamma)
}

/// Exact log-likelihood with σ² concentrated out; returns `(loglik, σ²)`
pub(crate) fn exact_log_likelihood(phi: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    let p = phi.len();
    let m = x.len();
    if m <= p {
        return None;
    }

    let (quad_initial, log_det) = if p == 0 {
        (0.0, 0.0)
    } else {
        let gamma = unit_autocovariances(phi)?;
        let cov = Array2::from_shape_fn((p, p), |(i, j)| gamma[i.abs_diff(j)]);
        let l = linalg::cholesky(&cov)?;
        let head = Array1::from(x[..p].to_vec());
        let solved = linalg::cholesky_substitute(&l, &head);
        let log_det = 2.0 * l.diag().iter().map(|d| d.ln()).sum::<f64>();
        (head.dot(&solved), log_det)
    };

    let sum_sq: f64 = (p..m)
        .map(|t| {
            let pred: f64 = phi.iter().enumerate().map(|(j, c)| c * x[t - 1 - j]).sum();
            (x[t] - pred).powi(2)
        })
        .sum();

    let sigma2 = (quad_initial + sum_sq) / m as f64;
    if !(sigma2 > 0.0 && sigma2.is_finite()) {
        return None;
    }
    let n = m as f64;
    let ll = -0.5 * n * ((2.0 * PI).ln() + sigma2.ln() + 1.0) - 0.5 * log_det;
    Some((ll, sigma2))
}
