//! Pipeline configuration

use crate::basket::BasketConfig;
use crate::churn::ChurnConfig;
use crate::clustering::ClusteringConfig;
use crate::error::Result;
use crate::explore::ExploreConfig;
use crate::forecast::ForecastConfig;
use crate::rfm::FeatureConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration of every stage; absent sections take their defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub basket: BasketConfig,
    pub forecast: ForecastConfig,
    pub clustering: ClusteringConfig,
    pub churn: ChurnConfig,
    pub explore: ExploreConfig,
}

impl PipelineConfig {
    pub fn with_features(mut self, features: FeatureConfig) -> Self {
        self.features = features;
        self
    }

    pub fn with_basket(mut self, basket: BasketConfig) -> Self {
        self.basket = basket;
        self
    }

    pub fn with_forecast(mut self, forecast: ForecastConfig) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn with_clustering(mut self, clustering: ClusteringConfig) -> Self {
        self.clustering = clustering;
        self
    }

    pub fn with_churn(mut self, churn: ChurnConfig) -> Self {
        self.churn = churn;
        self
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.basket.validate()?;
        self.forecast.validate()?;
        self.clustering.validate()?;
        self.churn.validate()?;
        self.explore.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyticsError;
    use crate::rfm::GuestPolicy;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "basket": { "min_support": 0.02 }, "features": { "guest_policy": "exclude" } }"#,
        )
        .unwrap();
        assert_eq!(config.basket.min_support, 0.02);
        assert_eq!(config.basket.min_threshold, 1.0);
        assert_eq!(config.features.guest_policy, GuestPolicy::Exclude);
        assert_eq!(config.clustering.n_clusters, 4);
        assert_eq!(config.churn.cutoff_days, 90);
        assert_eq!(config.forecast.horizon, 12);
    }

    #[test]
    fn test_round_trip_through_json() {
        let json = PipelineConfig::default().to_json().unwrap();
        let back = PipelineConfig::from_json_str(&json).unwrap();
        assert_eq!(back.clustering.random_state, 42);
        assert_eq!(back.forecast.order.p, 5);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let err = PipelineConfig::from_json_str(r#"{ "churn": { "test_size": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, AnalyticsError::ConfigError(_)));

        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, AnalyticsError::SerializationError(_)));
    }
}
