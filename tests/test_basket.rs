//! Integration tests for market basket mining

use chrono::NaiveDate;
use retail_analytics::basket::{BasketConfig, BasketMiner, RuleMetric};
use retail_analytics::data::{CustomerId, Transaction, TransactionTable};
use std::collections::BTreeSet;

fn item(invoice: usize, description: &str) -> Transaction {
    Transaction {
        invoice_no: format!("5400{:02}", invoice),
        stock_code: description.to_uppercase(),
        description: description.to_string(),
        quantity: 1,
        unit_price: 0.85,
        invoice_date: NaiveDate::from_ymd_opt(2011, 2, 1 + (invoice % 28) as u32)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap(),
        customer_id: CustomerId::new(format!("{}", 15000 + invoice % 3)),
        country: "Germany".to_string(),
    }
}

fn create_basket_table(baskets: &[&[&str]]) -> TransactionTable {
    let rows = baskets
        .iter()
        .enumerate()
        .flat_map(|(i, items)| items.iter().map(move |d| item(i, d)))
        .collect();
    TransactionTable::new(rows).unwrap()
}

/// milk and bread together in 4 of 10 invoices, milk in 6
fn milk_bread_baskets() -> Vec<&'static [&'static str]> {
    vec![
        &["milk", "bread"],
        &["milk", "bread"],
        &["milk", "bread"],
        &["milk", "bread"],
        &["milk"],
        &["milk"],
        &["eggs"],
        &["eggs"],
        &["eggs"],
        &["eggs"],
    ]
}

fn create_grocery_table() -> TransactionTable {
    create_basket_table(&[
        &["milk", "bread", "butter"],
        &["milk", "bread"],
        &["milk", "butter", "jam"],
        &["bread", "butter", "jam"],
        &["milk", "bread", "butter", "jam"],
        &["eggs", "milk"],
        &["eggs", "bread", "butter"],
        &["milk", "bread", "butter"],
        &["jam"],
        &["eggs", "milk", "bread"],
        &["butter", "jam"],
        &["milk", "bread", "jam"],
    ])
}

#[test]
fn test_milk_bread_scenario() {
    let table = create_basket_table(&milk_bread_baskets());
    let report = BasketMiner::new(BasketConfig::default()).mine(&table).unwrap();
    assert_eq!(report.n_invoices, 10);
    assert_eq!(report.n_items, 3);

    let pair = report
        .itemsets
        .iter()
        .find(|s| s.items.len() == 2)
        .unwrap();
    let names: BTreeSet<&str> = pair.items.iter().map(String::as_str).collect();
    assert_eq!(names, BTreeSet::from(["bread", "milk"]));
    assert!((pair.support - 0.4).abs() < 1e-12);

    let rule = report
        .rules
        .iter()
        .find(|r| r.antecedents == ["milk"] && r.consequents == ["bread"])
        .unwrap();
    assert!((rule.support - 0.4).abs() < 1e-12);
    assert!((rule.confidence - 0.4 / 0.6).abs() < 1e-12);
    assert!((rule.lift - (0.4 / 0.6) / 0.4).abs() < 1e-12);
}

#[test]
fn test_rule_properties() {
    let table = create_grocery_table();
    let report = BasketMiner::new(BasketConfig::default().with_min_support(0.15))
        .mine(&table)
        .unwrap();
    assert!(!report.rules.is_empty());

    for rule in &report.rules {
        assert!(rule.support <= rule.antecedent_support + 1e-12);
        assert!((0.0..=1.0).contains(&rule.confidence));
        assert!(rule.lift > 0.0);
        assert!(rule.lift >= 1.0);
    }
    for pair in report.rules.windows(2) {
        assert!(pair[0].lift >= pair[1].lift);
    }
}

#[test]
fn test_itemsets_are_downward_closed() {
    let table = create_grocery_table();
    let report = BasketMiner::new(BasketConfig::default().with_min_support(0.15))
        .mine(&table)
        .unwrap();

    let frequent: BTreeSet<BTreeSet<&str>> = report
        .itemsets
        .iter()
        .map(|s| s.items.iter().map(String::as_str).collect())
        .collect();

    for set in &frequent {
        for drop in set.iter() {
            if set.len() == 1 {
                continue;
            }
            let subset: BTreeSet<&str> = set.iter().copied().filter(|i| i != drop).collect();
            assert!(frequent.contains(&subset), "{:?} is frequent but {:?} is not", set, subset);
        }
    }
    for s in &report.itemsets {
        assert!(s.support >= 0.15);
    }
}

#[test]
fn test_max_len_bounds_itemsets() {
    let table = create_grocery_table();
    let report = BasketMiner::new(BasketConfig::default().with_min_support(0.1).with_max_len(Some(2)))
        .mine(&table)
        .unwrap();
    assert!(report.itemsets.iter().all(|s| s.items.len() <= 2));
    assert!(report.itemsets.iter().any(|s| s.items.len() == 2));
}

#[test]
fn test_confidence_metric_filters_rules() {
    let table = create_basket_table(&milk_bread_baskets());
    let report = BasketMiner::new(BasketConfig::default().with_metric(RuleMetric::Confidence, 0.9))
        .mine(&table)
        .unwrap();
    assert_eq!(report.rules.len(), 1);
    assert_eq!(report.rules[0].antecedents, ["bread"]);
    assert_eq!(report.rules[0].consequents, ["milk"]);
    assert!((report.rules[0].confidence - 1.0).abs() < 1e-12);
}

#[test]
fn test_no_frequent_itemsets_is_empty_report() {
    let table = create_basket_table(&[&["a"], &["b"], &["c"], &["d"]]);
    let report = BasketMiner::new(BasketConfig::default().with_min_support(0.5))
        .mine(&table)
        .unwrap();
    assert!(report.is_empty());
    assert!(report.itemsets.is_empty());
    assert!(report.rules.is_empty());
    assert_eq!(report.n_invoices, 4);
}

#[test]
fn test_invalid_support_rejected() {
    let table = create_basket_table(&milk_bread_baskets());
    assert!(BasketMiner::new(BasketConfig::default().with_min_support(0.0)).mine(&table).is_err());
    assert!(BasketMiner::new(BasketConfig::default().with_min_support(1.5)).mine(&table).is_err());
}
