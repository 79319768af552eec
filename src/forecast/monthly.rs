//! Calendar-month revenue aggregation

use crate::data::TransactionTable;
use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    /// 1..=12
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        debug_assert!((1..=12).contains(&month));
        Self { year, month }
    }

    pub fn of(ts: &NaiveDateTime) -> Self {
        Self::new(ts.year(), ts.month())
    }

    /// The following calendar month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// The `n` months following this one
    pub fn following(&self, n: usize) -> Vec<YearMonth> {
        let mut months = Vec::with_capacity(n);
        let mut current = *self;
        for _ in 0..n {
            current = current.succ();
            months.push(current);
        }
        months
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Revenue per calendar month, ascending, months without sales absent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySales {
    points: Vec<(YearMonth, f64)>,
}

impl MonthlySales {
    pub fn from_transactions(table: &TransactionTable) -> Self {
        let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
        for t in table {
            *totals.entry(YearMonth::of(&t.invoice_date)).or_insert(0.0) += t.revenue();
        }
        Self {
            points: totals.into_iter().collect(),
        }
    }

    pub fn points(&self) -> &[(YearMonth, f64)] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    pub fn last_month(&self) -> Option<YearMonth> {
        self.points.last().map(|(m, _)| *m)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Months missing between the first and last observation
    pub fn gaps(&self) -> Vec<YearMonth> {
        let mut missing = Vec::new();
        for pair in self.points.windows(2) {
            let mut m = pair[0].0.succ();
            while m < pair[1].0 {
                missing.push(m);
                m = m.succ();
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CustomerId, Transaction};
    use chrono::NaiveDate;

    fn sale(year: i32, month: u32, day: u32, quantity: i64, price: f64) -> Transaction {
        Transaction {
            invoice_no: format!("{}{}{}", year, month, day),
            stock_code: "84879".to_string(),
            description: "ASSORTED COLOUR BIRD ORNAMENT".to_string(),
            quantity,
            unit_price: price,
            invoice_date: NaiveDate::from_ymd_opt(year, month, day)
                .unwrap()
                .and_hms_opt(15, 30, 0)
                .unwrap(),
            customer_id: CustomerId::new("13047"),
            country: "United Kingdom".to_string(),
        }
    }

    #[test]
    fn test_monthly_aggregation_is_sparse_and_ordered() {
        let table = TransactionTable::new(vec![
            sale(2011, 3, 2, 2, 10.0),
            sale(2010, 12, 5, 1, 5.0),
            sale(2011, 3, 28, 1, 1.5),
            sale(2011, 1, 9, 4, 2.0),
        ])
        .unwrap();
        let monthly = MonthlySales::from_transactions(&table);

        assert_eq!(
            monthly.points(),
            &[
                (YearMonth::new(2010, 12), 5.0),
                (YearMonth::new(2011, 1), 8.0),
                (YearMonth::new(2011, 3), 21.5),
            ]
        );
        assert_eq!(monthly.gaps(), vec![YearMonth::new(2011, 2)]);
    }

    #[test]
    fn test_month_succession() {
        assert_eq!(YearMonth::new(2011, 12).succ(), YearMonth::new(2012, 1));
        let next = YearMonth::new(2011, 11).following(3);
        assert_eq!(next.len(), 3);
        assert_eq!(next[2], YearMonth::new(2012, 2));
        assert_eq!(YearMonth::new(2011, 2).to_string(), "2011-02");
    }
}
