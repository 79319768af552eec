//! Column standardization for feature matrices

use crate::error::{AnalyticsError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Fitted parameters for one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub mean: f64,
    /// Standard deviation with the scaler's `ddof`
    pub std: f64,
    /// Divisor used by `transform` (1.0 for a zero-variance column)
    pub scale: f64,
}

/// Z-score scaler: (x - mean) / std
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    ddof: usize,
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Sample standard deviation (ddof = 1)
    pub fn new() -> Self {
        Self {
            ddof: 1,
            params: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_ddof(mut self, ddof: usize) -> Self {
        self.ddof = ddof;
        self
    }

    /// Fit column means and standard deviations
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        let n = x.nrows();
        if n <= self.ddof {
            return Err(AnalyticsError::ShapeError {
                expected: format!("more than {} rows", self.ddof),
                actual: n.to_string(),
            });
        }

        self.params = x
            .axis_iter(Axis(1))
            .map(|col| {
                let mean = col.sum() / n as f64;
                let ss: f64 = col.iter().map(|v| (v - mean).powi(2)).sum();
                let std = (ss / (n - self.ddof) as f64).sqrt();
                ScalerParams {
                    mean,
                    std,
                    scale: if std > 0.0 { std } else { 1.0 },
                }
            })
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(AnalyticsError::ConfigError("scaler used before fit".to_string()));
        }
        if x.ncols() != self.params.len() {
            return Err(AnalyticsError::ShapeError {
                expected: format!("{} columns", self.params.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut col, p) in out.axis_iter_mut(Axis(1)).zip(&self.params) {
            col.mapv_inplace(|v| (v - p.mean) / p.scale);
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Indices of columns whose standard deviation is zero
    pub fn zero_variance_columns(&self) -> Vec<usize> {
        self.params
            .iter()
            .enumerate()
            .filter(|(_, p)| p.std == 0.0)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn params(&self) -> &[ScalerParams] {
        &self.params
    }

    pub fn means(&self) -> Array1<f64> {
        self.params.iter().map(|p| p.mean).collect()
    }

    pub fn scales(&self) -> Array1<f64> {
        self.params.iter().map(|p| p.scale).collect()
    }
}
