//! RFM quintile scoring and segment labelling

use super::binning::{QuantileBinner, TiePolicy};
use super::features::{FeatureTable, RfmColumn};
use crate::data::CustomerId;
use crate::error::{AnalyticsError, Result, Stage};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Number of score buckets per column
pub const N_SCORES: usize = 5;

const HIGH_VALUE_CODES: [&str; 7] = ["555", "554", "545", "544", "455", "454", "445"];
const NEW_CODES: [&str; 5] = ["511", "521", "531", "541", "551"];
const AT_RISK_CODES: [&str; 5] = ["115", "125", "135", "145", "155"];
const LOST_CODES: [&str; 8] = ["111", "112", "113", "114", "121", "122", "123", "124"];

/// Named customer segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Segment {
    HighValue,
    New,
    AtRisk,
    Lost,
    Regular,
}

impl Segment {
    /// Map a 3-digit RFM code to its segment; unknown codes are `Regular`
    pub fn from_code(code: &str) -> Self {
        if HIGH_VALUE_CODES.contains(&code) {
            Segment::HighValue
        } else if NEW_CODES.contains(&code) {
            Segment::New
        } else if AT_RISK_CODES.contains(&code) {
            Segment::AtRisk
        } else if LOST_CODES.contains(&code) {
            Segment::Lost
        } else {
            Segment::Regular
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Segment::HighValue => "High-Value",
            Segment::New => "New",
            Segment::AtRisk => "At-Risk",
            Segment::Lost => "Lost",
            Segment::Regular => "Regular",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scores and segment for one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RfmScore {
    pub customer_id: CustomerId,
    pub recency: i64,
    pub frequency: usize,
    pub monetary: f64,
    pub r_score: u8,
    pub f_score: u8,
    pub m_score: u8,
    /// R, F and M digits concatenated, e.g. "545"
    pub code: String,
    pub segment: Segment,
}

/// Scored customers in feature-table order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentTable {
    pub rows: Vec<RfmScore>,
}

impl SegmentTable {
    /// Customers per segment, largest first
    pub fn segment_counts(&self) -> Vec<(Segment, usize)> {
        let mut counts: HashMap<Segment, usize> = HashMap::new();
        for row in &self.rows {
            *counts.entry(row.segment).or_insert(0) += 1;
        }
        let mut counts: Vec<(Segment, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

/// Assigns quintile scores and segment labels
#[derive(Debug, Clone, Default)]
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, features: &FeatureTable) -> Result<SegmentTable> {
        if features.len() < N_SCORES {
            return Err(AnalyticsError::data_quality(
                Stage::Segmenter,
                format!(
                    "fewer than {} distinct customers (got {}); cannot form quintiles",
                    N_SCORES,
                    features.len()
                ),
            ));
        }

        let together = QuantileBinner::new(N_SCORES, TiePolicy::KeepTogether);
        let first_seen = QuantileBinner::new(N_SCORES, TiePolicy::FirstSeen);

        let r_bins = together.bin(&features.column(RfmColumn::Recency), RfmColumn::Recency.name())?;
        let f_bins = first_seen.bin(&features.column(RfmColumn::Frequency), RfmColumn::Frequency.name())?;
        let m_bins = together.bin(&features.column(RfmColumn::Monetary), RfmColumn::Monetary.name())?;

        let rows: Vec<RfmScore> = features
            .rows()
            .iter()
            .enumerate()
            .map(|(i, f)| {
                // lowest recency bin is the most recent customer
                let r_score = (N_SCORES - r_bins[i]) as u8;
                let f_score = (f_bins[i] + 1) as u8;
                let m_score = (m_bins[i] + 1) as u8;
                let code = format!("{}{}{}", r_score, f_score, m_score);
                let segment = Segment::from_code(&code);
                RfmScore {
                    customer_id: f.customer_id.clone(),
                    recency: f.recency,
                    frequency: f.frequency,
                    monetary: f.monetary,
                    r_score,
                    f_score,
                    m_score,
                    code,
                    segment,
                }
            })
            .collect();

        let table = SegmentTable { rows };
        info!(
            customers = table.rows.len(),
            segments = ?table.segment_counts(),
            "Scored RFM segments"
        );
        Ok(table)
    }
}
