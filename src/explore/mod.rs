//! Exploratory summaries of the transaction table

use crate::data::TransactionTable;
use crate::error::{AnalyticsError, Result, Stage};
use crate::rfm::quantile_edges;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExploreConfig {
    /// Length of the top-countries and top-products lists
    pub top_n: usize,
}

impl Default for ExploreConfig {
    fn default() -> Self {
        Self { top_n: 10 }
    }
}

impl ExploreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(AnalyticsError::ConfigError("explore.top_n must be ≥ 1".to_string()));
        }
        Ok(())
    }
}

/// count / mean / std / min / quartiles / max of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (NaN for a single value)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl NumericSummary {
    pub fn from_values(column: &str, values: &[f64]) -> Self {
        let count = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q = quantile_edges(&sorted, 4);

        let mean = values.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64).sqrt()
        } else {
            f64::NAN
        };

        Self {
            column: column.to_string(),
            count,
            mean,
            std,
            min: q[0],
            q25: q[1],
            median: q[2],
            q75: q[3],
            max: q[4],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorationReport {
    pub n_transactions: usize,
    pub n_invoices: usize,
    pub n_customers: usize,
    pub n_items: usize,
    pub first_timestamp: NaiveDateTime,
    pub last_timestamp: NaiveDateTime,
    pub total_revenue: f64,
    /// Quantity, UnitPrice, Revenue
    pub numeric: Vec<NumericSummary>,
    /// Countries by transaction-line count, descending
    pub top_countries: Vec<(String, usize)>,
    /// Descriptions by total quantity sold, descending
    pub top_products: Vec<(String, i64)>,
    pub daily_revenue: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, Default)]
pub struct Explorer {
    config: ExploreConfig,
}

impl Explorer {
    pub fn new(config: ExploreConfig) -> Self {
        Self { config }
    }

    pub fn explore(&self, table: &TransactionTable) -> Result<ExplorationReport> {
        self.config.validate()?;
        let (Some(first), Some(last)) = (table.min_timestamp(), table.max_timestamp()) else {
            return Err(AnalyticsError::data_quality(Stage::Explorer, "transaction table is empty"));
        };

        let quantities: Vec<f64> = table.iter().map(|t| t.quantity as f64).collect();
        let prices: Vec<f64> = table.iter().map(|t| t.unit_price).collect();
        let revenues: Vec<f64> = table.iter().map(|t| t.revenue()).collect();

        let mut countries: HashMap<&str, usize> = HashMap::new();
        let mut products: HashMap<&str, i64> = HashMap::new();
        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut invoices = HashSet::new();
        let mut customers = HashSet::new();

        for t in table {
            *countries.entry(t.country.as_str()).or_insert(0) += 1;
            if !t.description.trim().is_empty() {
                *products.entry(t.description.as_str()).or_insert(0) += t.quantity;
            }
            *daily.entry(t.invoice_date.date()).or_insert(0.0) += t.revenue();
            invoices.insert(t.invoice_no.as_str());
            customers.insert(&t.customer_id);
        }

        let report = ExplorationReport {
            n_transactions: table.len(),
            n_invoices: invoices.len(),
            n_customers: customers.len(),
            n_items: products.len(),
            first_timestamp: first,
            last_timestamp: last,
            total_revenue: revenues.iter().sum(),
            numeric: vec![
                NumericSummary::from_values("Quantity", &quantities),
                NumericSummary::from_values("UnitPrice", &prices),
                NumericSummary::from_values("Revenue", &revenues),
            ],
            top_countries: top_n(countries, self.config.top_n),
            top_products: top_n(products, self.config.top_n),
            daily_revenue: daily.into_iter().collect(),
        };

        info!(
            transactions = report.n_transactions,
            invoices = report.n_invoices,
            customers = report.n_customers,
            days = report.daily_revenue.len(),
            "Explored transaction table"
        );
        Ok(report)
    }
}

/// Largest counts first; equal counts by name
fn top_n<V: Ord + Copy>(counts: HashMap<&str, V>, n: usize) -> Vec<(String, V)> {
    let mut entries: Vec<(&str, V)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries
        .into_iter()
        .take(n)
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
