//! Association rule generation from frequent itemsets

use super::apriori::FrequentItemsets;
use crate::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Metric used to filter rules
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMetric {
    Support,
    Confidence,
    #[default]
    Lift,
    Leverage,
    Conviction,
}

impl FromStr for RuleMetric {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "support" => Ok(RuleMetric::Support),
            "confidence" => Ok(RuleMetric::Confidence),
            "lift" => Ok(RuleMetric::Lift),
            "leverage" => Ok(RuleMetric::Leverage),
            "conviction" => Ok(RuleMetric::Conviction),
            other => Err(AnalyticsError::ConfigError(format!("unknown rule metric '{}'", other))),
        }
    }
}

/// Rule `antecedent → consequent` over basket-matrix column indices
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationRule {
    pub antecedent: Vec<usize>,
    pub consequent: Vec<usize>,
    pub antecedent_support: f64,
    pub consequent_support: f64,
    /// Support of antecedent ∪ consequent
    pub support: f64,
    pub confidence: f64,
    pub lift: f64,
    pub leverage: f64,
    /// `inf` when confidence is 1
    pub conviction: f64,
}

impl AssociationRule {
    pub fn metric(&self, metric: RuleMetric) -> f64 {
        match metric {
            RuleMetric::Support => self.support,
            RuleMetric::Confidence => self.confidence,
            RuleMetric::Lift => self.lift,
            RuleMetric::Leverage => self.leverage,
            RuleMetric::Conviction => self.conviction,
        }
    }
}

/// Enumerates antecedent/consequent splits and filters them on one metric
#[derive(Debug, Clone)]
pub struct RuleGenerator {
    metric: RuleMetric,
    min_threshold: f64,
}

impl Default for RuleGenerator {
    fn default() -> Self {
        Self::new(RuleMetric::Lift, 1.0)
    }
}

impl RuleGenerator {
    pub fn new(metric: RuleMetric, min_threshold: f64) -> Self {
        Self { metric, min_threshold }
    }

    /// Rules sorted by lift, then confidence, both descending
    pub fn generate(&self, itemsets: &FrequentItemsets) -> Vec<AssociationRule> {
        let mut rules = Vec::new();

        for set in itemsets.iter().filter(|s| s.items.len() >= 2) {
            let k = set.items.len();
            // every non-empty proper subset as antecedent
            for mask in 1..((1u64 << k) - 1) {
                let (antecedent, consequent): (Vec<usize>, Vec<usize>) = {
                    let mut a = Vec::new();
                    let mut c = Vec::new();
                    for (bit, &item) in set.items.iter().enumerate() {
                        if mask & (1 << bit) != 0 {
                            a.push(item);
                        } else {
                            c.push(item);
                        }
                    }
                    (a, c)
                };

                // subsets of a frequent itemset are frequent
                let (Some(sa), Some(sc)) = (
                    itemsets.support_of(&antecedent),
                    itemsets.support_of(&consequent),
                ) else {
                    continue;
                };

                let rule = Self::score(antecedent, consequent, sa, sc, set.support);
                if rule.metric(self.metric) >= self.min_threshold {
                    rules.push(rule);
                }
            }
        }

        rules.sort_by(compare_rules);
        rules
    }

    fn score(
        antecedent: Vec<usize>,
        consequent: Vec<usize>,
        antecedent_support: f64,
        consequent_support: f64,
        support: f64,
    ) -> AssociationRule {
        let confidence = support / antecedent_support;
        let lift = confidence / consequent_support;
        let leverage = support - antecedent_support * consequent_support;
        let conviction = if confidence >= 1.0 {
            f64::INFINITY
        } else {
            (1.0 - consequent_support) / (1.0 - confidence)
        };
        AssociationRule {
            antecedent,
            consequent,
            antecedent_support,
            consequent_support,
            support,
            confidence,
            lift,
            leverage,
            conviction,
        }
    }
}

/// Lift desc, confidence desc, then item indices for a total order
fn compare_rules(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.lift
        .partial_cmp(&a.lift)
        .unwrap_or(Ordering::Equal)
        .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal))
        .then_with(|| a.antecedent.cmp(&b.antecedent))
        .then_with(|| a.consequent.cmp(&b.consequent))
}

#[cfg(test)]
mod tests {
    use super::super::apriori::Apriori;
    use super::super::matrix::BasketMatrix;
    use super::*;
    use crate::data::{CustomerId, Transaction, TransactionTable};
    use chrono::NaiveDate;

    fn matrix(invoices: &[&[&str]]) -> BasketMatrix {
        let rows = invoices
            .iter()
            .enumerate()
            .flat_map(|(i, items)| {
                items.iter().map(move |item| Transaction {
                    invoice_no: format!("INV{:02}", i),
                    stock_code: String::new(),
                    description: item.to_string(),
                    quantity: 2,
                    unit_price: 0.85,
                    invoice_date: NaiveDate::from_ymd_opt(2011, 7, 1)
                        .unwrap()
                        .and_hms_opt(11, 0, 0)
                        .unwrap(),
                    customer_id: CustomerId::new("7"),
                    country: "Norway".to_string(),
                })
            })
            .collect();
        BasketMatrix::from_transactions(&TransactionTable::new(rows).unwrap())
    }

    fn milk_bread() -> BasketMatrix {
        // milk+bread in 4/10, milk alone 2/10, bread alone 1/10, other 3/10
        let mut invoices: Vec<&[&str]> = Vec::new();
        invoices.extend(std::iter::repeat(&["milk", "bread"][..]).take(4));
        invoices.extend(std::iter::repeat(&["milk"][..]).take(2));
        invoices.extend(std::iter::repeat(&["bread"][..]).take(1));
        invoices.extend(std::iter::repeat(&["eggs"][..]).take(3));
        matrix(&invoices)
    }

    #[test]
    fn test_milk_bread_confidence() {
        let m = milk_bread();
        let sets = Apriori::new(0.1).fit(&m).unwrap();
        let rules = RuleGenerator::new(RuleMetric::Confidence, 0.0).generate(&sets);

        let bread = m.items().iter().position(|i| i == "bread").unwrap();
        let milk = m.items().iter().position(|i| i == "milk").unwrap();
        let rule = rules
            .iter()
            .find(|r| r.antecedent == vec![milk] && r.consequent == vec![bread])
            .unwrap();

        assert!((rule.support - 0.4).abs() < 1e-12);
        assert!((rule.antecedent_support - 0.6).abs() < 1e-12);
        assert!((rule.confidence - 0.4 / 0.6).abs() < 1e-12);
        assert!((rule.lift - (0.4 / 0.6) / 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rule_invariants_and_order() {
        let m = matrix(&[
            &["a", "b", "c"],
            &["a", "b"],
            &["a", "c"],
            &["b", "c", "d"],
            &["a", "b", "c", "d"],
            &["d"],
        ]);
        let sets = Apriori::new(0.2).fit(&m).unwrap();
        let rules = RuleGenerator::new(RuleMetric::Lift, 0.0).generate(&sets);
        assert!(!rules.is_empty());

        for r in &rules {
            assert!(r.support <= r.antecedent_support + 1e-12);
            assert!(r.antecedent_support <= 1.0);
            assert!((0.0..=1.0).contains(&r.confidence));
            assert!(r.lift > 0.0);
            assert!(r.antecedent.iter().all(|i| !r.consequent.contains(i)));
        }
        for pair in rules.windows(2) {
            assert!(pair[0].lift >= pair[1].lift);
            if pair[0].lift == pair[1].lift {
                assert!(pair[0].confidence >= pair[1].confidence);
            }
        }
    }

    #[test]
    fn test_lift_threshold_filters() {
        let m = milk_bread();
        let sets = Apriori::new(0.1).fit(&m).unwrap();
        // milk/bread lift = 0.667 / 0.5 = 1.33 in both directions
        let rules = RuleGenerator::default().generate(&sets);
        assert_eq!(rules.len(), 2);
        let strict = RuleGenerator::new(RuleMetric::Lift, 2.0).generate(&sets);
        assert!(strict.is_empty());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("LIFT".parse::<RuleMetric>().unwrap(), RuleMetric::Lift);
        assert!("entropy".parse::<RuleMetric>().is_err());
    }
}
