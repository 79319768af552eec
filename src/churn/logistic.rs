//! L2-regularized logistic regression fitted by Newton–Raphson (IRLS)

use crate::error::{AnalyticsError, Result, Stage};
use crate::linalg;
use crate::preprocessing::StandardScaler;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Logistic regression for binary classification
///
/// Minimises `Σ logloss + ‖w‖² / (2C)` on internally standardized features;
/// the intercept is not penalized. Coefficients are reported on the scale of
/// the input features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength
    pub c: f64,
    pub max_iter: usize,
    /// Convergence tolerance on the largest Newton step
    pub tol: f64,
    /// Fitted coefficients (input scale)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (input scale)
    pub intercept: Option<f64>,
    pub n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
            coefficients: None,
            intercept: None,
            n_iter: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Numerically stable sigmoid
    fn sigmoid(v: f64) -> f64 {
        if v >= 0.0 {
            1.0 / (1.0 + (-v).exp())
        } else {
            let e = v.exp();
            e / (1.0 + e)
        }
    }

    /// Fit on `x` with 0/1 targets `y`
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(AnalyticsError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(AnalyticsError::ConfigError(format!("C must be positive, got {}", self.c)));
        }
        let positives = y.iter().filter(|&&v| v > 0.5).count();
        if positives == 0 || positives == n_samples {
            return Err(AnalyticsError::data_quality(
                Stage::ChurnClassifier,
                format!("training data holds a single class ({} of {} positive)", positives, n_samples),
            ));
        }

        let mut scaler = StandardScaler::new().with_ddof(0);
        let z = scaler.fit_transform(x)?;

        // design with a leading intercept column
        let mut design = Array2::ones((n_samples, n_features + 1));
        design.slice_mut(ndarray::s![.., 1..]).assign(&z);

        let lambda = 1.0 / self.c;
        let mut beta = Array1::<f64>::zeros(n_features + 1);
        let mut converged = false;
        let mut n_iter = 0;

        while n_iter < self.max_iter {
            n_iter += 1;
            let mu = design.dot(&beta).mapv(Self::sigmoid);
            let weights = mu.mapv(|p| p * (1.0 - p));

            let mut penalty = beta.clone();
            penalty[0] = 0.0;
            let gradient = design.t().dot(&(y - &mu)) - lambda * &penalty;

            let weighted = &design * &weights.view().insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted);
            for j in 1..=n_features {
                hessian[[j, j]] += lambda;
            }

            let step = linalg::solve_spd(&hessian, &gradient).ok_or_else(|| {
                AnalyticsError::model_fit(Stage::ChurnClassifier, "singular Hessian in Newton step")
            })?;
            beta += &step;

            if beta.iter().any(|b| !b.is_finite()) {
                return Err(AnalyticsError::model_fit(
                    Stage::ChurnClassifier,
                    "coefficients diverged",
                ));
            }
            let max_step = step.iter().fold(0.0f64, |m, s| m.max(s.abs()));
            debug!(iteration = n_iter, max_step, "Newton step");
            if max_step < self.tol {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(AnalyticsError::model_fit(
                Stage::ChurnClassifier,
                format!("logistic regression did not converge in {} iterations", self.max_iter),
            ));
        }

        let scales = scaler.scales();
        let means = scaler.means();
        let coefficients: Array1<f64> = beta.slice(ndarray::s![1..]).to_owned() / &scales;
        let intercept = beta[0] - coefficients.dot(&means);

        self.coefficients = Some(coefficients);
        self.intercept = Some(intercept);
        self.n_iter = n_iter;
        Ok(self)
    }

    /// Probability of class 1
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (Some(coefficients), Some(intercept)) = (self.coefficients.as_ref(), self.intercept) else {
            return Err(AnalyticsError::model_fit(
                Stage::ChurnClassifier,
                "prediction requested before fit",
            ));
        };
        if x.ncols() != coefficients.len() {
            return Err(AnalyticsError::ShapeError {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok((x.dot(coefficients) + intercept).mapv(Self::sigmoid))
    }

    /// Class labels (1 when the probability exceeds 0.5)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.mapv(|p| if p > 0.5 { 1.0 } else { 0.0 }))
    }
}
