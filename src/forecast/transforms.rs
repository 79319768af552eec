//! Differencing and its inverse

use crate::error::{AnalyticsError, Result, Stage};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Differencing transformer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Differencer {
    /// Order of differencing
    order: usize,
    /// First value of each intermediate series (reconstructs history)
    initial_values: Option<Vec<f64>>,
    /// Last value of each intermediate series (anchors forecasts)
    last_values: Option<Vec<f64>>,
}

impl Differencer {
    /// Create new differencer; order 0 is the identity
    pub fn new(order: usize) -> Self {
        Self {
            order,
            initial_values: None,
            last_values: None,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Apply differencing `order` times
    pub fn transform(&mut self, series: &Array1<f64>) -> Result<Array1<f64>> {
        if series.len() <= self.order {
            return Err(AnalyticsError::data_quality(
                Stage::Forecaster,
                format!(
                    "cannot difference {} observations {} time(s)",
                    series.len(),
                    self.order
                ),
            ));
        }

        let mut result = series.clone();
        let mut initial = Vec::with_capacity(self.order);
        let mut last = Vec::with_capacity(self.order);

        for _ in 0..self.order {
            initial.push(result[0]);
            last.push(result[result.len() - 1]);
            result = Self::diff_once(&result);
        }

        self.initial_values = Some(initial);
        self.last_values = Some(last);
        Ok(result)
    }

    /// Rebuild the original series from its differences
    pub fn inverse_transform(&self, series: &Array1<f64>) -> Result<Array1<f64>> {
        let initial = self.initial_values.as_ref().ok_or_else(|| {
            AnalyticsError::model_fit(Stage::Forecaster, "differencer not fitted")
        })?;

        let mut result = series.clone();
        for init_val in initial.iter().rev() {
            result = Self::cumsum_from(&result, *init_val, true);
        }
        Ok(result)
    }

    /// Turn forecasts of the differenced series into forecasts of the
    /// original series, continuing from the last observed values
    pub fn integrate(&self, forecasts: &Array1<f64>) -> Result<Array1<f64>> {
        let last = self.last_values.as_ref().ok_or_else(|| {
            AnalyticsError::model_fit(Stage::Forecaster, "differencer not fitted")
        })?;

        let mut result = forecasts.clone();
        for anchor in last.iter().rev() {
            result = Self::cumsum_from(&result, *anchor, false);
        }
        Ok(result)
    }

    fn diff_once(series: &Array1<f64>) -> Array1<f64> {
        let n = series.len();
        if n <= 1 {
            return Array1::zeros(0);
        }

        let mut result = Array1::zeros(n - 1);
        for i in 1..n {
            result[i - 1] = series[i] - series[i - 1];
        }
        result
    }

    /// Running sum starting at `init`; `keep_init` prepends `init` itself
    fn cumsum_from(series: &Array1<f64>, init: f64, keep_init: bool) -> Array1<f64> {
        let offset = usize::from(keep_init);
        let mut result = Array1::zeros(series.len() + offset);
        if keep_init {
            result[0] = init;
        }

        let mut acc = init;
        for (i, v) in series.iter().enumerate() {
            acc += v;
            result[i + offset] = acc;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_differencing_round_trip() {
        let series = array![3.0, 5.0, 4.0, 8.0, 13.0];
        let mut diff = Differencer::new(1);
        let d = diff.transform(&series).unwrap();
        assert_eq!(d, array![2.0, -1.0, 4.0, 5.0]);
        assert_eq!(diff.inverse_transform(&d).unwrap(), series);
    }

    #[test]
    fn test_second_order_round_trip() {
        let series = array![1.0, 4.0, 9.0, 16.0, 25.0];
        let mut diff = Differencer::new(2);
        let d = diff.transform(&series).unwrap();
        assert_eq!(d, array![2.0, 2.0, 2.0]);
        assert_eq!(diff.inverse_transform(&d).unwrap(), series);
    }

    #[test]
    fn test_integrate_continues_trend() {
        let series = array![10.0, 12.0, 14.0];
        let mut diff = Differencer::new(1);
        diff.transform(&series).unwrap();
        let levels = diff.integrate(&array![2.0, 2.0, 1.0]).unwrap();
        assert_eq!(levels, array![16.0, 18.0, 19.0]);

        let mut diff2 = Differencer::new(2);
        diff2.transform(&array![1.0, 4.0, 9.0, 16.0]).unwrap();
        // constant second difference of 2 continues the squares
        assert_eq!(diff2.integrate(&array![2.0, 2.0]).unwrap(), array![25.0, 36.0]);
    }

    #[test]
    fn test_too_short() {
        assert!(Differencer::new(1).transform(&array![1.0]).is_err());
    }
}
