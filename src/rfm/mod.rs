//! Customer RFM analysis
//!
//! - [`FeatureBuilder`] computes Recency / Frequency / Monetary per customer
//! - [`Segmenter`] turns them into quintile scores and named segments

mod binning;
mod features;
mod segment;

pub use binning::{ordinal_ranks, quantile_edges, QuantileBinner, TiePolicy};
pub use features::{CustomerFeature, FeatureBuilder, FeatureConfig, FeatureTable, GuestPolicy, RfmColumn};
pub use segment::{RfmScore, Segment, SegmentTable, Segmenter, N_SCORES};
