//! Monthly revenue forecasting
//!
//! Provides:
//! - [`MonthlySales`] - revenue per calendar month
//! - [`Differencer`] - differencing and integration
//! - [`Arima`] - ARIMA(p, d, 0) by exact maximum likelihood
//! - [`Forecaster`] - aggregation, fit and a horizon of labelled future months

mod arima;
mod monthly;
mod simplex;
mod transforms;

pub use arima::{Arima, ArimaFit, ArimaOrder};
pub use monthly::{MonthlySales, YearMonth};
pub use simplex::{NelderMead, SimplexResult};
pub use transforms::Differencer;

use crate::data::TransactionTable;
use crate::error::{AnalyticsError, Result, Stage};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Forecaster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub order: ArimaOrder,
    /// Months to forecast
    pub horizon: usize,
    /// Simplex iteration bound for the likelihood search
    pub max_iter: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            order: ArimaOrder::default(),
            horizon: 12,
            max_iter: 5000,
        }
    }
}

impl ForecastConfig {
    pub fn with_order(mut self, order: ArimaOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(AnalyticsError::ConfigError("forecast.horizon must be ≥ 1".to_string()));
        }
        if self.max_iter == 0 {
            return Err(AnalyticsError::ConfigError("forecast.max_iter must be ≥ 1".to_string()));
        }
        if self.order.q != 0 {
            return Err(AnalyticsError::ConfigError(
                "forecast.order.q must be 0: moving-average terms are not supported".to_string(),
            ));
        }
        Ok(())
    }
}

/// Whether a point is observed or predicted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointKind {
    Historical,
    Forecast,
}

impl PointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointKind::Historical => "historical",
            PointKind::Forecast => "forecast",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: YearMonth,
    pub revenue: f64,
    pub kind: PointKind,
}

/// Historical series followed by the forecast horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub points: Vec<ForecastPoint>,
    pub model: ArimaFit,
}

impl ForecastReport {
    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Historical)
    }

    pub fn forecast(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.kind == PointKind::Forecast)
    }
}

/// Aggregates monthly revenue and extends it with an ARIMA forecast
#[derive(Debug, Clone, Default)]
pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn forecast(&self, table: &TransactionTable) -> Result<ForecastReport> {
        self.forecast_series(&MonthlySales::from_transactions(table))
    }

    /// Fit and forecast an already aggregated series
    pub fn forecast_series(&self, monthly: &MonthlySales) -> Result<ForecastReport> {
        self.config.validate()?;
        let last = monthly.last_month().ok_or_else(|| {
            AnalyticsError::data_quality(Stage::Forecaster, "no transactions to aggregate")
        })?;

        let gaps = monthly.gaps();
        if !gaps.is_empty() {
            warn!(missing = gaps.len(), "Monthly series has months without sales; they are skipped");
        }

        let mut model = Arima::new(self.config.order)?.with_max_iter(self.config.max_iter);
        let fit = model.fit(&monthly.values())?.clone();
        let predicted = model.forecast(self.config.horizon)?;

        info!(
            order = %self.config.order,
            months = monthly.len(),
            log_likelihood = fit.log_likelihood,
            aic = fit.aic,
            "Fitted revenue forecast model"
        );

        let history = monthly.points().iter().map(|&(month, revenue)| ForecastPoint {
            month,
            revenue,
            kind: PointKind::Historical,
        });
        let ahead = last
            .following(self.config.horizon)
            .into_iter()
            .zip(predicted)
            .map(|(month, revenue)| ForecastPoint {
                month,
                revenue,
                kind: PointKind::Forecast,
            });

        Ok(ForecastReport {
            points: history.chain(ahead).collect(),
            model: fit,
        })
    }
}
