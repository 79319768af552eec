//! Quantile binning with an explicit tie policy
//!
//! Edges are the 0, 1/q, ..., 1 quantiles of the values (linear interpolation
//! between order statistics). Bins are right-closed, with the lowest edge
//! included in the first bin. Coinciding edges are an error, never a silent merge.

use crate::error::{AnalyticsError, Result, Stage};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How equal values are handled before binning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TiePolicy {
    /// Equal values always share a bin
    KeepTogether,
    /// Values are replaced by their ordinal rank; ties are ordered by
    /// position in the input (first seen ranks first)
    FirstSeen,
}

/// Equal-frequency binner producing bin indices in `0..n_bins`
#[derive(Debug, Clone)]
pub struct QuantileBinner {
    n_bins: usize,
    tie_policy: TiePolicy,
}

impl QuantileBinner {
    pub fn new(n_bins: usize, tie_policy: TiePolicy) -> Self {
        Self {
            n_bins: n_bins.max(1),
            tie_policy,
        }
    }

    /// Assign every value to a bin; `column` names the data in error messages
    pub fn bin(&self, values: &[f64], column: &str) -> Result<Vec<usize>> {
        if values.len() < self.n_bins {
            return Err(AnalyticsError::data_quality(
                Stage::Segmenter,
                format!(
                    "fewer than {} customers for {} binning (got {})",
                    self.n_bins,
                    column,
                    values.len()
                ),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(AnalyticsError::data_quality(
                Stage::Segmenter,
                format!("{} contains non-finite values", column),
            ));
        }

        let keys = match self.tie_policy {
            TiePolicy::KeepTogether => values.to_vec(),
            TiePolicy::FirstSeen => ordinal_ranks(values),
        };

        let mut sorted = keys.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let edges = quantile_edges(&sorted, self.n_bins);

        if edges.windows(2).any(|w| w[1] <= w[0]) {
            let distinct = count_distinct(&sorted);
            return Err(AnalyticsError::data_quality(
                Stage::Segmenter,
                format!(
                    "fewer than {} distinct {} quantiles ({} distinct values); bin edges are not unique",
                    self.n_bins, column, distinct
                ),
            ));
        }

        let last = self.n_bins - 1;
        Ok(keys
            .iter()
            .map(|&v| edges[1..].partition_point(|&e| e < v).min(last))
            .collect())
    }
}

/// 1-based ordinal ranks; a stable sort keeps ties in input order
pub fn ordinal_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = (rank + 1) as f64;
    }
    ranks
}

/// `n_bins + 1` quantile edges of an ascending slice
pub fn quantile_edges(sorted: &[f64], n_bins: usize) -> Vec<f64> {
    (0..=n_bins)
        .map(|i| quantile(sorted, i as f64 / n_bins as f64))
        .collect()
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] + frac * (sorted[upper] - sorted[lower])
    }
}

fn count_distinct(sorted: &[f64]) -> usize {
    let mut distinct = 0;
    let mut prev: Option<f64> = None;
    for &v in sorted {
        if prev != Some(v) {
            distinct += 1;
            prev = Some(v);
        }
    }
    distinct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_count_bins() {
        let values: Vec<f64> = (1..=10).map(|v| v as f64).collect();
        let bins = QuantileBinner::new(5, TiePolicy::KeepTogether)
            .bin(&values, "Monetary")
            .unwrap();
        assert_eq!(bins, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[test]
    fn test_ties_stay_together() {
        let values = [1.0, 2.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let bins = QuantileBinner::new(5, TiePolicy::KeepTogether)
            .bin(&values, "Recency")
            .unwrap();
        assert_eq!(bins[1], bins[2]);
    }

    #[test]
    fn test_first_seen_splits_ties_deterministically() {
        // Heavily tied frequencies cannot form value quintiles, but ranks can
        let values = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 9.0];
        assert!(QuantileBinner::new(5, TiePolicy::KeepTogether)
            .bin(&values, "Frequency")
            .is_err());

        let bins = QuantileBinner::new(5, TiePolicy::FirstSeen)
            .bin(&values, "Frequency")
            .unwrap();
        assert_eq!(bins, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4]);
        // first-seen: earlier of two equal values never gets the higher bin
        assert!(bins[1] <= bins[2]);
    }

    #[test]
    fn test_too_few_values() {
        let err = QuantileBinner::new(5, TiePolicy::FirstSeen)
            .bin(&[1.0, 2.0, 3.0, 4.0], "Frequency")
            .unwrap_err();
        assert!(err.to_string().contains("fewer than 5"));
    }

    #[test]
    fn test_duplicate_edges_reported() {
        let values = [3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0, 4.0];
        let err = QuantileBinner::new(5, TiePolicy::KeepTogether)
            .bin(&values, "Recency")
            .unwrap_err();
        assert!(err.to_string().contains("distinct Recency"));
    }

    #[test]
    fn test_ordinal_ranks_stable() {
        assert_eq!(ordinal_ranks(&[5.0, 1.0, 5.0, 2.0]), vec![3.0, 1.0, 4.0, 2.0]);
    }
}
