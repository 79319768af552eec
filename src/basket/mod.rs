//! Market basket analysis
//!
//! Provides:
//! - [`BasketMatrix`] - invoice × item presence matrix
//! - [`Apriori`] - frequent itemset mining with subset pruning
//! - [`RuleGenerator`] - association rules (support, confidence, lift, leverage, conviction)
//! - [`BasketMiner`] - the three steps above with item names resolved

mod apriori;
mod matrix;
mod rules;

pub use apriori::{Apriori, FrequentItemset, FrequentItemsets};
pub use matrix::{BasketMatrix, InvoiceSet};
pub use rules::{AssociationRule, RuleGenerator, RuleMetric};

use crate::data::TransactionTable;
use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Basket mining configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    /// Minimum fraction of invoices an itemset must appear in
    pub min_support: f64,
    /// Metric used to keep rules
    pub metric: RuleMetric,
    /// Minimum value of `metric`
    pub min_threshold: f64,
    /// Largest itemset size to mine (unbounded when `None`)
    pub max_len: Option<usize>,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            min_support: 0.01,
            metric: RuleMetric::Lift,
            min_threshold: 1.0,
            max_len: None,
        }
    }
}

impl BasketConfig {
    pub fn with_min_support(mut self, min_support: f64) -> Self {
        self.min_support = min_support;
        self
    }

    pub fn with_metric(mut self, metric: RuleMetric, min_threshold: f64) -> Self {
        self.metric = metric;
        self.min_threshold = min_threshold;
        self
    }

    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(AnalyticsError::ConfigError(format!(
                "basket.min_support must be in (0, 1], got {}",
                self.min_support
            )));
        }
        if self.max_len == Some(0) {
            return Err(AnalyticsError::ConfigError("basket.max_len must be ≥ 1".to_string()));
        }
        if !self.min_threshold.is_finite() {
            return Err(AnalyticsError::ConfigError("basket.min_threshold must be finite".to_string()));
        }
        Ok(())
    }
}

/// Frequent itemset with item descriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itemset {
    pub items: Vec<String>,
    pub support: f64,
}

/// Association rule with item descriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub antecedents: Vec<String>,
    pub consequents: Vec<String>,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    pub conviction: f64,
}

/// Output of a basket mining run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BasketReport {
    pub n_invoices: usize,
    pub n_items: usize,
    pub itemsets: Vec<Itemset>,
    /// Sorted by lift, then confidence, both descending
    pub rules: Vec<Rule>,
}

impl BasketReport {
    /// True when no itemset reached the support threshold
    pub fn is_empty(&self) -> bool {
        self.itemsets.is_empty()
    }
}

/// Presence matrix → Apriori → rules
#[derive(Debug, Clone, Default)]
pub struct BasketMiner {
    config: BasketConfig,
}

impl BasketMiner {
    pub fn new(config: BasketConfig) -> Self {
        Self { config }
    }

    /// Mine itemsets and rules. Finding no frequent itemset is a valid
    /// outcome and yields an empty report.
    pub fn mine(&self, table: &TransactionTable) -> Result<BasketReport> {
        self.config.validate()?;
        let matrix = BasketMatrix::from_transactions(table);
        info!(
            invoices = matrix.n_invoices(),
            items = matrix.n_items(),
            "Built basket presence matrix"
        );

        let apriori = Apriori::new(self.config.min_support).with_max_len(self.config.max_len);
        let itemsets = match apriori.fit(&matrix) {
            Ok(sets) => sets,
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, "No frequent itemsets; basket tables will be empty");
                return Ok(BasketReport {
                    n_invoices: matrix.n_invoices(),
                    n_items: matrix.n_items(),
                    ..Default::default()
                });
            }
            Err(e) => return Err(e),
        };

        let rules = RuleGenerator::new(self.config.metric, self.config.min_threshold).generate(&itemsets);
        info!(
            itemsets = itemsets.len(),
            max_len = itemsets.max_len(),
            rules = rules.len(),
            "Mined association rules"
        );

        let names = |cols: &[usize]| -> Vec<String> {
            cols.iter().map(|&c| matrix.item_name(c).to_string()).collect()
        };

        Ok(BasketReport {
            n_invoices: matrix.n_invoices(),
            n_items: matrix.n_items(),
            itemsets: itemsets
                .iter()
                .map(|s| Itemset {
                    items: names(&s.items),
                    support: s.support,
                })
                .collect(),
            rules: rules
                .into_iter()
                .map(|r| Rule {
                    antecedents: names(&r.antecedent),
                    consequents: names(&r.consequent),
                    antecedent_support: r.antecedent_support,
                    consequent_support: r.consequent_support,
                    support: r.support,
                    confidence: r.confidence,
                    lift: r.lift,
                    leverage: r.leverage,
                    conviction: r.conviction,
                })
                .collect(),
        })
    }
}
