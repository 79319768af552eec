//! Invoice × item presence matrix
//!
//! Stored column-wise: every item owns a bitset over invoice rows. Support
//! counting for an itemset is then an AND of its columns plus a popcount.

use crate::data::TransactionTable;
use ndarray::Array2;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Fixed-size bitset over invoice rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceSet {
    words: Vec<u64>,
}

impl InvoiceSet {
    pub fn with_capacity(n_rows: usize) -> Self {
        Self {
            words: vec![0; n_rows.div_ceil(64)],
        }
    }

    pub fn insert(&mut self, row: usize) {
        self.words[row / 64] |= 1u64 << (row % 64);
    }

    pub fn contains(&self, row: usize) -> bool {
        self.words
            .get(row / 64)
            .is_some_and(|w| w & (1u64 << (row % 64)) != 0)
    }

    /// Number of rows in the set
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn intersection(&self, other: &InvoiceSet) -> InvoiceSet {
        InvoiceSet {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
        }
    }
}

/// Boolean presence matrix: rows = invoices, columns = item descriptions
#[derive(Debug, Clone)]
pub struct BasketMatrix {
    invoices: Vec<String>,
    items: Vec<String>,
    columns: Vec<InvoiceSet>,
}

impl BasketMatrix {
    /// Build from transactions; blank descriptions are skipped and a cell is
    /// set when the item's summed quantity on the invoice is positive
    pub fn from_transactions(table: &TransactionTable) -> Self {
        let mut quantities: BTreeMap<(&str, &str), i64> = BTreeMap::new();
        for t in table {
            let description = t.description.as_str();
            if description.trim().is_empty() {
                continue;
            }
            *quantities
                .entry((t.invoice_no.as_str(), description))
                .or_insert(0) += t.quantity;
        }

        let invoices: BTreeSet<&str> = quantities.keys().map(|(inv, _)| *inv).collect();
        let items: BTreeSet<&str> = quantities.keys().map(|(_, item)| *item).collect();

        let invoice_idx: HashMap<&str, usize> =
            invoices.iter().enumerate().map(|(i, inv)| (*inv, i)).collect();
        let item_idx: HashMap<&str, usize> =
            items.iter().enumerate().map(|(i, item)| (*item, i)).collect();

        let mut columns = vec![InvoiceSet::with_capacity(invoices.len()); items.len()];
        for ((invoice, item), quantity) in &quantities {
            if *quantity > 0 {
                columns[item_idx[item]].insert(invoice_idx[invoice]);
            }
        }

        Self {
            invoices: invoices.into_iter().map(str::to_string).collect(),
            items: items.into_iter().map(str::to_string).collect(),
            columns,
        }
    }

    pub fn n_invoices(&self) -> usize {
        self.invoices.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }

    /// Item descriptions in column order (ascending)
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Invoice identifiers in row order (ascending)
    pub fn invoices(&self) -> &[String] {
        &self.invoices
    }

    pub fn item_name(&self, col: usize) -> &str {
        &self.items[col]
    }

    pub fn column(&self, col: usize) -> &InvoiceSet {
        &self.columns[col]
    }

    /// Fraction of invoices containing every item of `cols`
    pub fn support(&self, cols: &[usize]) -> f64 {
        if self.invoices.is_empty() || cols.is_empty() {
            return 0.0;
        }
        let mut acc = self.columns[cols[0]].clone();
        for &c in &cols[1..] {
            acc = acc.intersection(&self.columns[c]);
        }
        acc.count() as f64 / self.invoices.len() as f64
    }

    /// Dense 0/1 view; only sensible for small baskets
    pub fn to_dense(&self) -> Array2<u8> {
        let mut dense = Array2::zeros((self.invoices.len(), self.items.len()));
        for (col, set) in self.columns.iter().enumerate() {
            for row in 0..self.invoices.len() {
                if set.contains(row) {
                    dense[[row, col]] = 1;
                }
            }
        }
        dense
    }
}
