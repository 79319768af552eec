//! Error types for the retail analytics engine

use std::fmt;
use thiserror::Error;

/// Result type alias for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Pipeline stage that raised an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    FeatureBuilder,
    Segmenter,
    BasketMiner,
    Forecaster,
    Clusterer,
    ChurnClassifier,
    Explorer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::FeatureBuilder => "feature builder",
            Stage::Segmenter => "segmenter",
            Stage::BasketMiner => "basket miner",
            Stage::Forecaster => "forecaster",
            Stage::Clusterer => "clusterer",
            Stage::ChurnClassifier => "churn classifier",
            Stage::Explorer => "explorer",
        };
        f.write_str(name)
    }
}

/// Main error type for the analytics engine
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// Input cannot support the computation (empty table, too few distinct
    /// values, zero variance, ...)
    #[error("Data quality error in {stage}: {detail}")]
    DataQuality { stage: Stage, detail: String },

    /// A model failed to fit (non-convergence, singular system, non-finite likelihood)
    #[error("Model fit error in {stage}: {detail}")]
    ModelFit { stage: Stage, detail: String },

    /// A valid computation produced nothing to report
    #[error("Empty result in {stage}: {detail}")]
    EmptyResult { stage: Stage, detail: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Table error: {0}")]
    TableError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },
}

impl AnalyticsError {
    pub fn data_quality(stage: Stage, detail: impl Into<String>) -> Self {
        AnalyticsError::DataQuality { stage, detail: detail.into() }
    }

    pub fn model_fit(stage: Stage, detail: impl Into<String>) -> Self {
        AnalyticsError::ModelFit { stage, detail: detail.into() }
    }

    pub fn empty_result(stage: Stage, detail: impl Into<String>) -> Self {
        AnalyticsError::EmptyResult { stage, detail: detail.into() }
    }

    /// Whether the pipeline may continue past this error with an empty artifact
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AnalyticsError::EmptyResult { .. })
    }

    /// Stage that raised the error, if it is a stage error
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalyticsError::DataQuality { stage, .. }
            | AnalyticsError::ModelFit { stage, .. }
            | AnalyticsError::EmptyResult { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

impl From<polars::error::PolarsError> for AnalyticsError {
    fn from(err: polars::error::PolarsError) -> Self {
        AnalyticsError::TableError(err.to_string())
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(err: serde_json::Error) -> Self {
        AnalyticsError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for AnalyticsError {
    fn from(err: ndarray::ShapeError) -> Self {
        AnalyticsError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalyticsError::data_quality(Stage::Segmenter, "fewer than 5 customers");
        assert_eq!(
            err.to_string(),
            "Data quality error in segmenter: fewer than 5 customers"
        );
    }

    #[test]
    fn test_only_empty_result_is_recoverable() {
        assert!(AnalyticsError::empty_result(Stage::BasketMiner, "none").is_recoverable());
        assert!(!AnalyticsError::model_fit(Stage::Forecaster, "diverged").is_recoverable());
        assert!(!AnalyticsError::data_quality(Stage::Clusterer, "zero variance").is_recoverable());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: AnalyticsError = io_err.into();
        assert!(matches!(err, AnalyticsError::IoError(_)));
        assert_eq!(err.stage(), None);
    }
}
