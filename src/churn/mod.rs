//! Churn labelling and classification
//!
//! A customer has churned when their last purchase lies more than
//! `cutoff_days` before the latest transaction in the data. A logistic
//! regression on (Recency, Frequency, Monetary) is trained on a seeded
//! hold-out split and evaluated on the held-out customers.

mod logistic;
mod metrics;
mod split;

pub use logistic::LogisticRegression;
pub use metrics::{ClassMetrics, ClassificationReport};
pub use split::{HoldoutSplit, TrainTestSplitter};

use crate::data::CustomerId;
use crate::error::{AnalyticsError, Result};
use crate::rfm::{FeatureTable, RfmColumn};
use chrono::{Duration, NaiveDateTime};
use ndarray::{Array1, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Churn classifier configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    /// Days without purchase before a customer counts as churned
    pub cutoff_days: i64,
    pub test_size: f64,
    pub random_state: u64,
    /// Inverse L2 regularization strength
    pub c: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            cutoff_days: 90,
            test_size: 0.3,
            random_state: 42,
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
        }
    }
}

impl ChurnConfig {
    pub fn with_cutoff_days(mut self, days: i64) -> Self {
        self.cutoff_days = days;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.cutoff_days < 0 {
            return Err(AnalyticsError::ConfigError("churn.cutoff_days must be ≥ 0".to_string()));
        }
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(AnalyticsError::ConfigError(format!(
                "churn.test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(AnalyticsError::ConfigError("churn.c must be positive".to_string()));
        }
        if self.max_iter == 0 {
            return Err(AnalyticsError::ConfigError("churn.max_iter must be ≥ 1".to_string()));
        }
        Ok(())
    }
}

/// Churn flag per customer, in feature-table order
pub fn churn_labels(features: &FeatureTable, cutoff_days: i64) -> (NaiveDateTime, Vec<bool>) {
    let cutoff = features.max_timestamp() - Duration::days(cutoff_days);
    let labels = features
        .rows()
        .iter()
        .map(|row| row.last_purchase < cutoff)
        .collect();
    (cutoff, labels)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnReport {
    /// Purchases before this instant mark a customer as churned
    pub cutoff: NaiveDateTime,
    pub labels: Vec<(CustomerId, bool)>,
    pub n_train: usize,
    pub n_test: usize,
    /// Raw-scale coefficients per feature, then `intercept`
    pub coefficients: Vec<(String, f64)>,
    pub classification: ClassificationReport,
}

impl ChurnReport {
    pub fn churn_rate(&self) -> f64 {
        if self.labels.is_empty() {
            return 0.0;
        }
        self.labels.iter().filter(|(_, churned)| *churned).count() as f64 / self.labels.len() as f64
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChurnClassifier {
    config: ChurnConfig,
}

impl ChurnClassifier {
    pub fn new(config: ChurnConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, features: &FeatureTable) -> Result<ChurnReport> {
        self.config.validate()?;
        let (cutoff, labels) = churn_labels(features, self.config.cutoff_days);

        let split = TrainTestSplitter::new(self.config.test_size, self.config.random_state)
            .split(features.len())?;

        let x = features.to_matrix();
        let y: Array1<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();

        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_test = x.select(Axis(0), &split.test_indices);

        let mut model = LogisticRegression::new()
            .with_c(self.config.c)
            .with_max_iter(self.config.max_iter)
            .with_tol(self.config.tol);
        model.fit(&x_train, &y_train)?;

        let y_pred: Vec<u8> = model.predict(&x_test)?.iter().map(|&p| p as u8).collect();
        let y_true: Vec<u8> = split.test_indices.iter().map(|&i| u8::from(labels[i])).collect();
        let classification = ClassificationReport::compute(&y_true, &y_pred);

        let mut coefficients: Vec<(String, f64)> = RfmColumn::ALL
            .iter()
            .zip(model.coefficients.iter().flatten())
            .map(|(col, &w)| (col.name().to_string(), w))
            .collect();
        coefficients.push(("intercept".to_string(), model.intercept.unwrap_or(0.0)));

        info!(
            churned = labels.iter().filter(|&&l| l).count(),
            customers = labels.len(),
            n_iter = model.n_iter,
            accuracy = classification.accuracy,
            "Trained churn classifier"
        );

        Ok(ChurnReport {
            cutoff,
            labels: features
                .rows()
                .iter()
                .zip(labels)
                .map(|(row, l)| (row.customer_id.clone(), l))
                .collect(),
            n_train: split.train_indices.len(),
            n_test: split.test_indices.len(),
            coefficients,
            classification,
        })
    }
}
