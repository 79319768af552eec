//! Batch orchestration of every analysis stage
//!
//! Three independent branches run concurrently over one shared, immutable
//! transaction table:
//!
//! - customers: features → segments, clusters, churn
//! - baskets: presence matrix → itemsets → rules
//! - time: monthly forecast and exploratory summaries
//!
//! Data-quality and model-fit errors abort the run. A basket run that finds
//! no frequent itemset produces empty basket tables instead.

mod config;

pub use config::PipelineConfig;

use crate::basket::{BasketMiner, BasketReport};
use crate::churn::{ChurnClassifier, ChurnReport};
use crate::clustering::{ClusterReport, Clusterer};
use crate::data::TransactionTable;
use crate::error::Result;
use crate::explore::{ExplorationReport, Explorer};
use crate::forecast::{ForecastReport, Forecaster};
use crate::rfm::{FeatureBuilder, FeatureTable, RfmScore, SegmentTable, Segmenter};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// One row of the combined customer table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub score: RfmScore,
    pub cluster: usize,
    pub churn: bool,
}

/// Customer-level artifacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerAnalysis {
    pub features: FeatureTable,
    pub segments: SegmentTable,
    pub clusters: ClusterReport,
    pub churn: ChurnReport,
}

impl CustomerAnalysis {
    pub fn run(config: &PipelineConfig, table: &TransactionTable) -> Result<Self> {
        let features = FeatureBuilder::new(config.features.clone()).build(table)?;
        let segments = Segmenter::new().score(&features)?;

        let (clusters, churn) = rayon::join(
            || Clusterer::new(config.clustering.clone()).cluster(&features),
            || ChurnClassifier::new(config.churn.clone()).classify(&features),
        );

        Ok(Self {
            segments,
            clusters: clusters?,
            churn: churn?,
            features,
        })
    }

    /// RFM scores with cluster id and churn flag, ordered by customer id
    pub fn customers(&self) -> Vec<CustomerRecord> {
        self.segments
            .rows
            .iter()
            .zip(&self.clusters.assignments)
            .zip(&self.churn.labels)
            .map(|((score, (_, cluster)), (_, churn))| CustomerRecord {
                score: score.clone(),
                cluster: *cluster,
                churn: *churn,
            })
            .collect()
    }
}

/// Every artifact of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub customers: CustomerAnalysis,
    pub basket: BasketReport,
    pub forecast: ForecastReport,
    pub exploration: ExplorationReport,
    pub elapsed_secs: f64,
}

/// Runs all stages over one transaction table
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn run(&self, table: &TransactionTable) -> Result<PipelineReport> {
        self.config.validate()?;
        let start = Instant::now();
        info!(transactions = table.len(), "Starting analytics pipeline");

        let (customers, (basket, (forecast, exploration))) = rayon::join(
            || CustomerAnalysis::run(&self.config, table),
            || {
                rayon::join(
                    || BasketMiner::new(self.config.basket.clone()).mine(table),
                    || {
                        rayon::join(
                            || Forecaster::new(self.config.forecast.clone()).forecast(table),
                            || Explorer::new(self.config.explore.clone()).explore(table),
                        )
                    },
                )
            },
        );

        let report = PipelineReport {
            customers: customers?,
            basket: basket?,
            forecast: forecast?,
            exploration: exploration?,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            customers = report.customers.features.len(),
            rules = report.basket.rules.len(),
            elapsed_secs = report.elapsed_secs,
            "Pipeline finished"
        );
        Ok(report)
    }
}
