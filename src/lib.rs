//! Retail Analytics - Batch analytics for retail transaction logs
//!
//! Loads a line-item transaction CSV and derives customer, basket and
//! revenue insights from it:
//! - RFM features, quintile scores and named customer segments
//! - Frequent itemsets (Apriori) and association rules
//! - Monthly revenue with an ARIMA(5,1,0) twelve-month forecast
//! - K-means customer clusters and a logistic churn classifier
//! - Descriptive statistics of the raw log
//!
//! # Modules
//!
//! ## Data
//! - [`data`] - Transaction records, CSV ingestion and validation
//! - [`explore`] - Descriptive statistics and top-N tables
//!
//! ## Customer analytics
//! - [`rfm`] - Recency / frequency / monetary features and segments
//! - [`clustering`] - K-means over scaled RFM features
//! - [`churn`] - Churn labelling, hold-out split and logistic regression
//!
//! ## Basket and revenue
//! - [`basket`] - Basket matrix, Apriori and rule generation
//! - [`forecast`] - Monthly aggregation and ARIMA forecasting
//!
//! ## Orchestration
//! - [`pipeline`] - Concurrent run of every stage
//! - [`report`] - Result tables and CSV output
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod linalg;

// Data
pub mod data;
pub mod explore;

// Customer analytics
pub mod preprocessing;
pub mod rfm;
pub mod clustering;
pub mod churn;

// Basket and revenue
pub mod basket;
pub mod forecast;

// Orchestration
pub mod pipeline;
pub mod report;
pub mod cli;

pub use error::{AnalyticsError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{AnalyticsError, Result, Stage};

    // Data
    pub use crate::data::{CustomerId, Transaction, TransactionLoader, TransactionTable};

    // Customer analytics
    pub use crate::rfm::{FeatureBuilder, FeatureConfig, FeatureTable, GuestPolicy, Segment, SegmentTable, Segmenter};
    pub use crate::clustering::{ClusterReport, Clusterer, ClusteringConfig};
    pub use crate::churn::{ChurnClassifier, ChurnConfig, ChurnReport};

    // Basket and revenue
    pub use crate::basket::{BasketConfig, BasketMiner, BasketReport, RuleMetric};
    pub use crate::forecast::{ForecastConfig, ForecastReport, Forecaster};

    // Exploration
    pub use crate::explore::{ExplorationReport, ExploreConfig, Explorer};

    // Orchestration
    pub use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
    pub use crate::report::ReportWriter;
}
