//! Integration tests for the customer branch: RFM features, segments,
//! clusters and churn labels

use chrono::{Duration, NaiveDate, NaiveDateTime};
use retail_analytics::churn::{churn_labels, ChurnClassifier, ChurnConfig};
use retail_analytics::clustering::{Clusterer, ClusteringConfig};
use retail_analytics::data::{CustomerId, Transaction, TransactionTable};
use retail_analytics::error::{AnalyticsError, Stage};
use retail_analytics::rfm::{FeatureBuilder, FeatureConfig, GuestPolicy, Segment, Segmenter};

fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2011, 5, day).unwrap().and_hms_opt(9, 30, 0).unwrap()
}

fn line(invoice: &str, customer: CustomerId, ts: NaiveDateTime, quantity: i64, price: f64) -> Transaction {
    Transaction {
        invoice_no: invoice.to_string(),
        stock_code: "84029G".to_string(),
        description: "KNITTED UNION FLAG HOT WATER BOTTLE".to_string(),
        quantity,
        unit_price: price,
        invoice_date: ts,
        customer_id: customer,
        country: "United Kingdom".to_string(),
    }
}

/// `n` customers; customer `i` has `i % 4 + 1` invoices, the last one `i * 3` days ago
fn create_customer_table(n: usize) -> TransactionTable {
    let end = at(31);
    let mut rows = Vec::new();
    for i in 0..n {
        let customer = CustomerId::new(format!("{}", 12000 + i));
        let invoices = i % 4 + 1;
        for k in 0..invoices {
            let ts = end - Duration::days((i * 3 + k * 7) as i64);
            rows.push(line(
                &format!("{}-{}", i, k),
                customer.clone(),
                ts,
                (i % 9 + 1) as i64,
                1.0 + i as f64 * 0.35,
            ));
        }
    }
    TransactionTable::new(rows).unwrap()
}

// ============================================================================
// Features
// ============================================================================

#[test]
fn test_two_customer_feature_scenario() {
    let a = CustomerId::new("A");
    let b = CustomerId::new("B");
    let table = TransactionTable::new(vec![
        line("1", a.clone(), at(1), 1, 10.0),
        line("2", b.clone(), at(5), 2, 5.0),
        line("3", a.clone(), at(10), 3, 1.0),
    ])
    .unwrap();

    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    assert_eq!(features.snapshot_date(), at(11));

    let find = |id: &CustomerId| features.rows().iter().find(|r| &r.customer_id == id).unwrap();
    let fa = find(&a);
    let fb = find(&b);
    assert_eq!((fa.frequency, fa.recency), (2, 1));
    assert_eq!((fb.frequency, fb.recency), (1, 6));
    assert!((fa.monetary - 13.0).abs() < 1e-12);
    assert!((fb.monetary - 10.0).abs() < 1e-12);
}

#[test]
fn test_numeric_customer_ids_order_by_value() {
    let table = TransactionTable::new(vec![
        line("1", CustomerId::new("12346"), at(3), 1, 2.0),
        line("2", CustomerId::new("9999"), at(4), 1, 2.0),
        line("3", CustomerId::guest(), at(5), 1, 2.0),
    ])
    .unwrap();

    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    let order: Vec<&str> = features.rows().iter().map(|r| r.customer_id.as_str()).collect();
    assert_eq!(order, ["-1", "9999", "12346"]);
}

#[test]
fn test_feature_invariants_hold() {
    let table = create_customer_table(40);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    assert_eq!(features.len(), 40);
    for row in features.rows() {
        assert!(row.recency >= 0);
        assert!(row.frequency >= 1);
        assert!(row.monetary > 0.0);
    }
}

#[test]
fn test_guest_policy() {
    let mut rows: Vec<Transaction> = create_customer_table(6).rows().to_vec();
    rows.push(line("G1", CustomerId::guest(), at(20), 1, 2.0));
    rows.push(line("G2", CustomerId::guest(), at(21), 1, 2.0));
    let table = TransactionTable::new(rows).unwrap();

    let included = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    assert_eq!(included.len(), 7);
    assert!(included.rows().iter().any(|r| r.customer_id.is_guest()));

    let excluded = FeatureBuilder::new(FeatureConfig::default().with_guest_policy(GuestPolicy::Exclude))
        .build(&table)
        .unwrap();
    assert_eq!(excluded.len(), 6);
    assert!(excluded.rows().iter().all(|r| !r.customer_id.is_guest()));
}

// ============================================================================
// Segments
// ============================================================================

#[test]
fn test_segments_are_deterministic() {
    let table = create_customer_table(40);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();

    let first = Segmenter::new().score(&features).unwrap();
    let second = Segmenter::new().score(&features).unwrap();
    assert_eq!(first.rows, second.rows);

    for score in &first.rows {
        assert!((1..=5).contains(&score.r_score));
        assert!((1..=5).contains(&score.f_score));
        assert!((1..=5).contains(&score.m_score));
        assert_eq!(score.code.len(), 3);
        assert_eq!(score.segment, Segment::from_code(&score.code));
    }

    let total: usize = first.segment_counts().iter().map(|(_, n)| n).sum();
    assert_eq!(total, 40);
}

#[test]
fn test_most_recent_customer_scores_highest_recency() {
    let table = create_customer_table(40);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    let segments = Segmenter::new().score(&features).unwrap();

    let freshest = segments.rows.iter().min_by_key(|r| r.recency).unwrap();
    let stalest = segments.rows.iter().max_by_key(|r| r.recency).unwrap();
    assert_eq!(freshest.r_score, 5);
    assert_eq!(stalest.r_score, 1);
}

#[test]
fn test_too_few_customers_for_quintiles() {
    let table = create_customer_table(4);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();
    let err = Segmenter::new().score(&features).unwrap_err();
    assert!(matches!(err, AnalyticsError::DataQuality { stage: Stage::Segmenter, .. }));
}

// ============================================================================
// Clusters
// ============================================================================

#[test]
fn test_cluster_ids_in_range_and_deterministic() {
    let table = create_customer_table(40);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();

    let clusterer = Clusterer::new(ClusteringConfig::default());
    let first = clusterer.cluster(&features).unwrap();
    let second = clusterer.cluster(&features).unwrap();

    assert_eq!(first.assignments.len(), 40);
    assert!(first.assignments.iter().all(|(_, c)| *c < 4));
    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.sizes().iter().sum::<usize>(), 40);
    assert_eq!(first.profiles.len(), 4);
}

#[test]
fn test_zero_variance_feature_rejected() {
    // every customer buys once, so Frequency has no spread
    let rows = (0..8)
        .map(|i| line(&format!("{}", i), CustomerId::new(format!("{}", i)), at(i + 1), 1, 1.0 + i as f64))
        .collect();
    let table = TransactionTable::new(rows).unwrap();
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();

    let err = Clusterer::new(ClusteringConfig::default()).cluster(&features).unwrap_err();
    assert!(matches!(err, AnalyticsError::DataQuality { .. }));
    assert!(err.to_string().contains("Frequency"));
}

// ============================================================================
// Churn
// ============================================================================

#[test]
fn test_churn_label_boundary() {
    let end = at(31);
    let table = TransactionTable::new(vec![
        line("1", CustomerId::new("91"), end - Duration::days(91), 1, 1.0),
        line("2", CustomerId::new("90"), end - Duration::days(90), 1, 1.0),
        line("3", CustomerId::new("89"), end - Duration::days(89), 1, 1.0),
        line("4", CustomerId::new("0"), end, 1, 1.0),
    ])
    .unwrap();
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();

    let (cutoff, labels) = churn_labels(&features, 90);
    assert_eq!(cutoff, end - Duration::days(90));

    let label_of = |id: &str| {
        let idx = features.rows().iter().position(|r| r.customer_id.as_str() == id).unwrap();
        labels[idx]
    };
    assert!(label_of("91"));
    assert!(!label_of("90"));
    assert!(!label_of("89"));
    assert!(!label_of("0"));
}

#[test]
fn test_churn_classifier_report() {
    // last purchases span 117 days, so both classes are present
    let table = create_customer_table(40);
    let features = FeatureBuilder::new(FeatureConfig::default()).build(&table).unwrap();

    let report = ChurnClassifier::new(ChurnConfig::default()).classify(&features).unwrap();
    assert_eq!(report.labels.len(), 40);
    assert_eq!(report.n_test, 12);
    assert_eq!(report.n_train, 28);
    assert_eq!(report.coefficients.len(), 4);
    assert_eq!(report.coefficients[3].0, "intercept");

    let c = &report.classification;
    assert_eq!(c.classes.len(), 2);
    assert_eq!(c.classes.iter().map(|m| m.support).sum::<usize>(), 12);
    for m in &c.classes {
        assert!((0.0..=1.0).contains(&m.precision));
        assert!((0.0..=1.0).contains(&m.recall));
        assert!((0.0..=1.0).contains(&m.f1_score));
    }
    assert!((0.0..=1.0).contains(&c.accuracy));
}
