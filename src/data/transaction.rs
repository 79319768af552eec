//! Transaction records and the validated, immutable transaction table

use crate::error::{AnalyticsError, Result, Stage};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Identifier used for transactions without a known customer
pub const GUEST_CUSTOMER_ID: &str = "-1";

/// Customer identifier; the guest sentinel is an ordinary value.
///
/// Numeric identifiers order by value (`"9999"` before `"12346"`) and come
/// before non-numeric ones, which order as strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The guest sentinel
    pub fn guest() -> Self {
        Self(GUEST_CUSTOMER_ID.to_string())
    }

    pub fn is_guest(&self) -> bool {
        self.0 == GUEST_CUSTOMER_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for CustomerId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.parse::<i64>(), other.0.parse::<i64>()) {
            (Ok(a), Ok(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Ok(_), Err(_)) => Ordering::Less,
            (Err(_), Ok(_)) => Ordering::Greater,
            (Err(_), Err(_)) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for CustomerId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One invoice line of the cleaned transaction log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub invoice_date: NaiveDateTime,
    pub customer_id: CustomerId,
    pub country: String,
}

impl Transaction {
    /// Line revenue (quantity × unit price)
    pub fn revenue(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    /// Check the positivity contract, returning the violated rule
    pub(crate) fn contract_violation(&self) -> Option<String> {
        if self.quantity <= 0 {
            return Some(format!("Quantity must be > 0, got {}", self.quantity));
        }
        if !self.unit_price.is_finite() || self.unit_price <= 0.0 {
            return Some(format!("UnitPrice must be > 0, got {}", self.unit_price));
        }
        None
    }
}

/// Immutable, validated collection of transactions shared by every component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionTable {
    rows: Vec<Transaction>,
}

impl TransactionTable {
    /// Build a table, re-validating the positivity invariants of every row
    pub fn new(rows: Vec<Transaction>) -> Result<Self> {
        for (idx, row) in rows.iter().enumerate() {
            if let Some(reason) = row.contract_violation() {
                return Err(AnalyticsError::data_quality(
                    Stage::Ingestion,
                    format!("row {} (invoice {}): {}", idx, row.invoice_no, reason),
                ));
            }
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.rows.iter()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Latest invoice timestamp
    pub fn max_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|t| t.invoice_date).max()
    }

    /// Earliest invoice timestamp
    pub fn min_timestamp(&self) -> Option<NaiveDateTime> {
        self.rows.iter().map(|t| t.invoice_date).min()
    }

    /// Total revenue over all lines
    pub fn total_revenue(&self) -> f64 {
        self.rows.iter().map(Transaction::revenue).sum()
    }
}

impl<'a> IntoIterator for &'a TransactionTable {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
