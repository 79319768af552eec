//! Per-customer Recency / Frequency / Monetary features

use crate::data::{CustomerId, TransactionTable};
use crate::error::{AnalyticsError, Result, Stage};
use chrono::{Duration, NaiveDateTime};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

/// How the guest sentinel is treated during feature construction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuestPolicy {
    /// Guests are one ordinary customer
    #[default]
    Include,
    /// Guest transactions are left out of customer features
    Exclude,
}

/// Feature builder configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub guest_policy: GuestPolicy,
}

impl FeatureConfig {
    pub fn with_guest_policy(mut self, policy: GuestPolicy) -> Self {
        self.guest_policy = policy;
        self
    }
}

/// One of the three RFM columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RfmColumn {
    Recency,
    Frequency,
    Monetary,
}

impl RfmColumn {
    pub const ALL: [RfmColumn; 3] = [RfmColumn::Recency, RfmColumn::Frequency, RfmColumn::Monetary];

    pub fn name(&self) -> &'static str {
        match self {
            RfmColumn::Recency => "Recency",
            RfmColumn::Frequency => "Frequency",
            RfmColumn::Monetary => "Monetary",
        }
    }
}

/// RFM values for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerFeature {
    pub customer_id: CustomerId,
    /// Whole days between the snapshot date and the last purchase
    pub recency: i64,
    /// Distinct invoices
    pub frequency: usize,
    /// Sum of line revenue
    pub monetary: f64,
    /// Timestamp of the most recent purchase
    pub last_purchase: NaiveDateTime,
}

impl CustomerFeature {
    pub fn value(&self, column: RfmColumn) -> f64 {
        match column {
            RfmColumn::Recency => self.recency as f64,
            RfmColumn::Frequency => self.frequency as f64,
            RfmColumn::Monetary => self.monetary,
        }
    }
}

/// Customer features ordered by customer identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureTable {
    rows: Vec<CustomerFeature>,
    snapshot_date: NaiveDateTime,
    max_timestamp: NaiveDateTime,
}

impl FeatureTable {
    pub fn rows(&self) -> &[CustomerFeature] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest transaction timestamp + 1 day
    pub fn snapshot_date(&self) -> NaiveDateTime {
        self.snapshot_date
    }

    /// Latest transaction timestamp in the source table
    pub fn max_timestamp(&self) -> NaiveDateTime {
        self.max_timestamp
    }

    /// Values of one column in row order
    pub fn column(&self, column: RfmColumn) -> Vec<f64> {
        self.rows.iter().map(|r| r.value(column)).collect()
    }

    /// n_customers × 3 matrix with columns (Recency, Frequency, Monetary)
    pub fn to_matrix(&self) -> Array2<f64> {
        let mut x = Array2::zeros((self.rows.len(), RfmColumn::ALL.len()));
        for (i, row) in self.rows.iter().enumerate() {
            for (j, column) in RfmColumn::ALL.iter().enumerate() {
                x[[i, j]] = row.value(*column);
            }
        }
        x
    }
}

#[derive(Default)]
struct Accumulator<'a> {
    last_purchase: Option<NaiveDateTime>,
    invoices: HashSet<&'a str>,
    monetary: f64,
}

/// Builds one `CustomerFeature` per customer identifier
#[derive(Debug, Clone, Default)]
pub struct FeatureBuilder {
    config: FeatureConfig,
}

impl FeatureBuilder {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn build(&self, table: &TransactionTable) -> Result<FeatureTable> {
        let max_timestamp = table.max_timestamp().ok_or_else(|| {
            AnalyticsError::data_quality(
                Stage::FeatureBuilder,
                "transaction table is empty; no snapshot date can be computed",
            )
        })?;
        let snapshot_date = max_timestamp + Duration::days(1);

        let mut per_customer: BTreeMap<&CustomerId, Accumulator> = BTreeMap::new();
        for t in table {
            if self.config.guest_policy == GuestPolicy::Exclude && t.customer_id.is_guest() {
                continue;
            }
            let acc = per_customer.entry(&t.customer_id).or_default();
            acc.last_purchase = Some(match acc.last_purchase {
                Some(prev) => prev.max(t.invoice_date),
                None => t.invoice_date,
            });
            acc.invoices.insert(t.invoice_no.as_str());
            acc.monetary += t.revenue();
        }

        if per_customer.is_empty() {
            return Err(AnalyticsError::data_quality(
                Stage::FeatureBuilder,
                "no customers left after applying the guest policy",
            ));
        }

        let rows: Vec<CustomerFeature> = per_customer
            .into_iter()
            .filter_map(|(customer_id, acc)| {
                let last_purchase = acc.last_purchase?;
                Some(CustomerFeature {
                    customer_id: customer_id.clone(),
                    recency: (snapshot_date - last_purchase).num_days(),
                    frequency: acc.invoices.len(),
                    monetary: acc.monetary,
                    last_purchase,
                })
            })
            .collect();

        debug!(snapshot = %snapshot_date, "Computed snapshot date");
        info!(customers = rows.len(), transactions = table.len(), "Built RFM features");

        Ok(FeatureTable {
            rows,
            snapshot_date,
            max_timestamp,
        })
    }
}
