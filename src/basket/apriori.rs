//! Breadth-first Apriori frequent itemset mining
//!
//! Level k+1 candidates are joins of two frequent k-itemsets sharing their
//! first k-1 items. A candidate survives only if every k-subset is frequent
//! (anti-monotonicity); survivors are counted by intersecting invoice bitsets.

use super::matrix::{BasketMatrix, InvoiceSet};
use crate::error::{AnalyticsError, Result, Stage};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A frequent itemset as sorted column indices of the basket matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequentItemset {
    pub items: Vec<usize>,
    pub support: f64,
}

/// All frequent itemsets, by size then lexicographic item order
#[derive(Debug, Clone, Default)]
pub struct FrequentItemsets {
    itemsets: Vec<FrequentItemset>,
    lookup: HashMap<Vec<usize>, f64>,
}

impl FrequentItemsets {
    fn push(&mut self, items: Vec<usize>, support: f64) {
        self.lookup.insert(items.clone(), support);
        self.itemsets.push(FrequentItemset { items, support });
    }

    pub fn len(&self) -> usize {
        self.itemsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.itemsets.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrequentItemset> {
        self.itemsets.iter()
    }

    /// Support of a sorted itemset, if it is frequent
    pub fn support_of(&self, items: &[usize]) -> Option<f64> {
        self.lookup.get(items).copied()
    }

    /// Size of the largest frequent itemset
    pub fn max_len(&self) -> usize {
        self.itemsets.iter().map(|s| s.items.len()).max().unwrap_or(0)
    }
}

/// Apriori miner
#[derive(Debug, Clone)]
pub struct Apriori {
    min_support: f64,
    max_len: Option<usize>,
}

impl Default for Apriori {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl Apriori {
    pub fn new(min_support: f64) -> Self {
        Self {
            min_support,
            max_len: None,
        }
    }

    /// Stop after itemsets of this size
    pub fn with_max_len(mut self, max_len: Option<usize>) -> Self {
        self.max_len = max_len;
        self
    }

    pub fn min_support(&self) -> f64 {
        self.min_support
    }

    /// Mine all itemsets with support ≥ `min_support`.
    ///
    /// Returns `EmptyResult` when not even a single item is frequent.
    pub fn fit(&self, matrix: &BasketMatrix) -> Result<FrequentItemsets> {
        if !(self.min_support > 0.0 && self.min_support <= 1.0) {
            return Err(AnalyticsError::ConfigError(format!(
                "min_support must be in (0, 1], got {}",
                self.min_support
            )));
        }
        let n = matrix.n_invoices();
        if n == 0 {
            return Err(AnalyticsError::data_quality(
                Stage::BasketMiner,
                "no invoices with item descriptions",
            ));
        }
        let is_frequent = |count: usize| count as f64 / n as f64 >= self.min_support;

        let mut result = FrequentItemsets::default();

        // Level 1
        let mut level: Vec<(Vec<usize>, InvoiceSet)> = (0..matrix.n_items())
            .filter(|&c| is_frequent(matrix.column(c).count()))
            .map(|c| (vec![c], matrix.column(c).clone()))
            .collect();

        let mut k = 1;
        while !level.is_empty() {
            for (items, rows) in &level {
                result.push(items.clone(), rows.count() as f64 / n as f64);
            }
            debug!(size = k, frequent = level.len(), "Apriori level complete");

            if self.max_len.is_some_and(|max| k >= max) {
                break;
            }

            let candidates = Self::generate_candidates(&level);
            debug!(size = k + 1, candidates = candidates.len(), "Generated candidates");

            level = candidates
                .into_par_iter()
                .filter_map(|(a, b, items)| {
                    let rows = level[a].1.intersection(&level[b].1);
                    is_frequent(rows.count()).then_some((items, rows))
                })
                .collect();
            k += 1;
        }

        if result.is_empty() {
            return Err(AnalyticsError::empty_result(
                Stage::BasketMiner,
                format!("no itemset reaches min_support {}", self.min_support),
            ));
        }
        Ok(result)
    }

    /// Join step plus subset pruning; returns (left, right, candidate) triples
    /// in lexicographic candidate order
    fn generate_candidates(level: &[(Vec<usize>, InvoiceSet)]) -> Vec<(usize, usize, Vec<usize>)> {
        let frequent: HashSet<&[usize]> = level.iter().map(|(items, _)| items.as_slice()).collect();
        let mut candidates = Vec::new();

        for a in 0..level.len() {
            let left = &level[a].0;
            let prefix = &left[..left.len() - 1];
            for b in (a + 1)..level.len() {
                let right = &level[b].0;
                // levels are sorted, so a differing prefix ends the run
                if &right[..right.len() - 1] != prefix {
                    break;
                }
                let mut items = left.clone();
                items.push(right[right.len() - 1]);

                if Self::all_subsets_frequent(&items, &frequent) {
                    candidates.push((a, b, items));
                }
            }
        }
        candidates
    }

    fn all_subsets_frequent(items: &[usize], frequent: &HashSet<&[usize]>) -> bool {
        // dropping either of the last two items yields the joined parents
        (0..items.len().saturating_sub(2)).all(|skip| {
            let subset: Vec<usize> = items
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != skip)
                .map(|(_, &v)| v)
                .collect();
            frequent.contains(subset.as_slice())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomerId, Transaction, TransactionTable};
    use chrono::NaiveDate;

    fn basket(invoices: &[&[&str]]) -> BasketMatrix {
        let mut rows = Vec::new();
        for (i, items) in invoices.iter().enumerate() {
            for item in items.iter() {
                rows.push(Transaction {
                    invoice_no: format!("{:03}", i),
                    stock_code: String::new(),
                    description: item.to_string(),
                    quantity: 1,
                    unit_price: 1.0,
                    invoice_date: NaiveDate::from_ymd_opt(2011, 6, 1)
                        .unwrap()
                        .and_hms_opt(10, 0, 0)
                        .unwrap(),
                    customer_id: CustomerId::new("1"),
                    country: "Spain".to_string(),
                });
            }
        }
        BasketMatrix::from_transactions(&TransactionTable::new(rows).unwrap())
    }

    #[test]
    fn test_frequent_itemsets() {
        let m = basket(&[
            &["a", "b", "c"],
            &["a", "b"],
            &["a", "c"],
            &["b", "c"],
            &["a", "b", "c"],
        ]);
        let sets = Apriori::new(0.4).fit(&m).unwrap();

        // 3 singletons, 3 pairs, the triple appears 2/5 = 0.4
        assert_eq!(sets.len(), 7);
        assert_eq!(sets.max_len(), 3);
        assert!((sets.support_of(&[0, 1, 2]).unwrap() - 0.4).abs() < 1e-12);
        assert!((sets.support_of(&[0]).unwrap() - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_anti_monotonicity() {
        let m = basket(&[
            &["a", "b", "c", "d"],
            &["a", "b", "c"],
            &["a", "b"],
            &["c", "d"],
            &["a", "d"],
            &["b", "c", "d"],
        ]);
        let sets = Apriori::new(0.3).fit(&m).unwrap();
        for set in sets.iter() {
            for skip in 0..set.items.len() {
                if set.items.len() == 1 {
                    continue;
                }
                let subset: Vec<usize> = set
                    .items
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != skip)
                    .map(|(_, &v)| v)
                    .collect();
                let sub_support = sets.support_of(&subset).expect("subset must be frequent");
                assert!(sub_support >= set.support);
            }
        }
    }

    #[test]
    fn test_max_len() {
        let m = basket(&[&["a", "b", "c"], &["a", "b", "c"]]);
        let sets = Apriori::new(0.5).with_max_len(Some(2)).fit(&m).unwrap();
        assert_eq!(sets.max_len(), 2);
        assert_eq!(sets.len(), 6);
    }

    #[test]
    fn test_nothing_frequent_is_empty_result() {
        let m = basket(&[&["a"], &["b"], &["c"], &["d"]]);
        let err = Apriori::new(0.5).fit(&m).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_invalid_support_rejected() {
        let m = basket(&[&["a"]]);
        assert!(matches!(Apriori::new(0.0).fit(&m), Err(AnalyticsError::ConfigError(_))));
        assert!(matches!(Apriori::new(1.5).fit(&m), Err(AnalyticsError::ConfigError(_))));
    }
}
