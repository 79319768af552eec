//! Behavioural clustering of customers on standardized RFM features

mod kmeans;

pub use kmeans::{KMeans, KMeansFit};

use crate::data::CustomerId;
use crate::error::{AnalyticsError, Result, Stage};
use crate::preprocessing::StandardScaler;
use crate::rfm::{FeatureTable, RfmColumn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Clusterer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringConfig {
    pub n_clusters: usize,
    pub random_state: u64,
    pub max_iter: usize,
    pub n_init: usize,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            n_clusters: 4,
            random_state: 42,
            max_iter: 300,
            n_init: 1,
        }
    }
}

impl ClusteringConfig {
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_clusters == 0 {
            return Err(AnalyticsError::ConfigError("clustering.n_clusters must be ≥ 1".to_string()));
        }
        if self.max_iter == 0 || self.n_init == 0 {
            return Err(AnalyticsError::ConfigError(
                "clustering.max_iter and clustering.n_init must be ≥ 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Mean raw RFM values of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    pub mean_recency: f64,
    pub mean_frequency: f64,
    pub mean_monetary: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterReport {
    /// Same order as the feature table
    pub assignments: Vec<(CustomerId, usize)>,
    /// Centroids in standardized space
    pub centroids: Array2<f64>,
    pub inertia: f64,
    pub n_iter: usize,
    pub profiles: Vec<ClusterProfile>,
}

impl ClusterReport {
    pub fn sizes(&self) -> Vec<usize> {
        self.profiles.iter().map(|p| p.size).collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    config: ClusteringConfig,
}

impl Clusterer {
    pub fn new(config: ClusteringConfig) -> Self {
        Self { config }
    }

    pub fn cluster(&self, features: &FeatureTable) -> Result<ClusterReport> {
        self.config.validate()?;
        if features.len() < 2 {
            return Err(AnalyticsError::data_quality(
                Stage::Clusterer,
                format!("need at least 2 customers to standardize, got {}", features.len()),
            ));
        }

        let raw = features.to_matrix();
        let mut scaler = StandardScaler::new();
        scaler.fit(&raw)?;
        if let Some(&col) = scaler.zero_variance_columns().first() {
            return Err(AnalyticsError::data_quality(
                Stage::Clusterer,
                format!("{} has zero variance", RfmColumn::ALL[col].name()),
            ));
        }
        let standardized = scaler.transform(&raw)?;

        let fit = KMeans::new(self.config.n_clusters)
            .with_max_iter(self.config.max_iter)
            .with_n_init(self.config.n_init)
            .with_random_state(self.config.random_state)
            .fit(&standardized)?;

        info!(
            k = self.config.n_clusters,
            inertia = fit.inertia,
            n_iter = fit.n_iter,
            converged = fit.converged,
            "Clustered customers"
        );

        let profiles = Self::profiles(&raw, &fit.labels, self.config.n_clusters);
        let assignments = features
            .rows()
            .iter()
            .zip(&fit.labels)
            .map(|(row, &label)| (row.customer_id.clone(), label))
            .collect();

        Ok(ClusterReport {
            assignments,
            centroids: fit.centroids,
            inertia: fit.inertia,
            n_iter: fit.n_iter,
            profiles,
        })
    }

    fn profiles(raw: &Array2<f64>, labels: &[usize], k: usize) -> Vec<ClusterProfile> {
        let mut sums = Array2::<f64>::zeros((k, raw.ncols()));
        let mut sizes = vec![0usize; k];
        for (i, &c) in labels.iter().enumerate() {
            sizes[c] += 1;
            let mut row = sums.row_mut(c);
            row += &raw.row(i);
        }

        (0..k)
            .map(|c| {
                let mean = |j: usize| {
                    if sizes[c] == 0 {
                        0.0
                    } else {
                        sums[[c, j]] / sizes[c] as f64
                    }
                };
                ClusterProfile {
                    cluster: c,
                    size: sizes[c],
                    mean_recency: mean(0),
                    mean_frequency: mean(1),
                    mean_monetary: mean(2),
                }
            })
            .collect()
    }
}
