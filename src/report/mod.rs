//! Tabular rendering of analysis artifacts
//!
//! Every artifact becomes a polars `DataFrame` with the published column
//! names; [`ReportWriter`] persists them as CSV files.

use crate::basket::BasketReport;
use crate::churn::ChurnReport;
use crate::clustering::ClusterReport;
use crate::error::Result;
use crate::explore::ExplorationReport;
use crate::forecast::ForecastReport;
use crate::pipeline::{CustomerAnalysis, PipelineReport};
use crate::rfm::SegmentTable;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Separator between item descriptions inside one cell
pub const ITEM_SEPARATOR: &str = ", ";

fn join_items(items: &[String]) -> String {
    items.join(ITEM_SEPARATOR)
}

/// `CustomerID, Recency, Frequency, Monetary, R_Score, F_Score, M_Score, RFM_Score, Segment`
pub fn segments_frame(segments: &SegmentTable) -> Result<DataFrame> {
    let rows = &segments.rows;
    let df = DataFrame::new(vec![
        Column::new("CustomerID".into(), rows.iter().map(|r| r.customer_id.to_string()).collect::<Vec<_>>()),
        Column::new("Recency".into(), rows.iter().map(|r| r.recency).collect::<Vec<i64>>()),
        Column::new("Frequency".into(), rows.iter().map(|r| r.frequency as u64).collect::<Vec<u64>>()),
        Column::new("Monetary".into(), rows.iter().map(|r| r.monetary).collect::<Vec<f64>>()),
        Column::new("R_Score".into(), rows.iter().map(|r| r.r_score as u32).collect::<Vec<u32>>()),
        Column::new("F_Score".into(), rows.iter().map(|r| r.f_score as u32).collect::<Vec<u32>>()),
        Column::new("M_Score".into(), rows.iter().map(|r| r.m_score as u32).collect::<Vec<u32>>()),
        Column::new("RFM_Score".into(), rows.iter().map(|r| r.code.clone()).collect::<Vec<_>>()),
        Column::new("Segment".into(), rows.iter().map(|r| r.segment.label()).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

/// Segment table plus `Cluster` and `Churn`
pub fn customers_frame(customers: &CustomerAnalysis) -> Result<DataFrame> {
    let mut df = segments_frame(&customers.segments)?;
    let records = customers.customers();
    df.with_column(Column::new(
        "Cluster".into(),
        records.iter().map(|r| r.cluster as u32).collect::<Vec<u32>>(),
    ))?;
    df.with_column(Column::new(
        "Churn".into(),
        records.iter().map(|r| u32::from(r.churn)).collect::<Vec<u32>>(),
    ))?;
    Ok(df)
}

/// `Segment, Count`, largest first
pub fn segment_counts_frame(segments: &SegmentTable) -> Result<DataFrame> {
    let counts = segments.segment_counts();
    let df = DataFrame::new(vec![
        Column::new("Segment".into(), counts.iter().map(|(s, _)| s.label()).collect::<Vec<_>>()),
        Column::new("Count".into(), counts.iter().map(|(_, c)| *c as u64).collect::<Vec<u64>>()),
    ])?;
    Ok(df)
}

/// `itemsets, support, length`
pub fn itemsets_frame(basket: &BasketReport) -> Result<DataFrame> {
    let sets = &basket.itemsets;
    let df = DataFrame::new(vec![
        Column::new("itemsets".into(), sets.iter().map(|s| join_items(&s.items)).collect::<Vec<_>>()),
        Column::new("support".into(), sets.iter().map(|s| s.support).collect::<Vec<f64>>()),
        Column::new("length".into(), sets.iter().map(|s| s.items.len() as u32).collect::<Vec<u32>>()),
    ])?;
    Ok(df)
}

/// Association rules with the full metric set
pub fn rules_frame(basket: &BasketReport) -> Result<DataFrame> {
    let rules = &basket.rules;
    let metric = |f: fn(&crate::basket::Rule) -> f64| rules.iter().map(f).collect::<Vec<f64>>();
    let df = DataFrame::new(vec![
        Column::new("antecedents".into(), rules.iter().map(|r| join_items(&r.antecedents)).collect::<Vec<_>>()),
        Column::new("consequents".into(), rules.iter().map(|r| join_items(&r.consequents)).collect::<Vec<_>>()),
        Column::new("antecedent_support".into(), metric(|r| r.antecedent_support)),
        Column::new("consequent_support".into(), metric(|r| r.consequent_support)),
        Column::new("support".into(), metric(|r| r.support)),
        Column::new("confidence".into(), metric(|r| r.confidence)),
        Column::new("lift".into(), metric(|r| r.lift)),
        Column::new("leverage".into(), metric(|r| r.leverage)),
        Column::new("conviction".into(), metric(|r| r.conviction)),
    ])?;
    Ok(df)
}

/// `month, revenue, kind`
pub fn forecast_frame(forecast: &ForecastReport) -> Result<DataFrame> {
    let points = &forecast.points;
    let df = DataFrame::new(vec![
        Column::new("month".into(), points.iter().map(|p| p.month.to_string()).collect::<Vec<_>>()),
        Column::new("revenue".into(), points.iter().map(|p| p.revenue).collect::<Vec<f64>>()),
        Column::new("kind".into(), points.iter().map(|p| p.kind.as_str()).collect::<Vec<_>>()),
    ])?;
    Ok(df)
}

/// Fitted AR coefficients and information criteria as `term, value`
pub fn forecast_model_frame(forecast: &ForecastReport) -> Result<DataFrame> {
    let model = &forecast.model;
    let mut terms: Vec<String> = (1..=model.ar_coefficients.len()).map(|i| format!("ar.L{}", i)).collect();
    let mut values = model.ar_coefficients.clone();
    for (name, value) in [
        ("sigma2", model.sigma2),
        ("log_likelihood", model.log_likelihood),
        ("aic", model.aic),
        ("bic", model.bic),
    ] {
        terms.push(name.to_string());
        values.push(value);
    }
    let df = DataFrame::new(vec![
        Column::new("term".into(), terms),
        Column::new("value".into(), values),
    ])?;
    Ok(df)
}

/// `CustomerID, Cluster`
pub fn clusters_frame(clusters: &ClusterReport) -> Result<DataFrame> {
    let a = &clusters.assignments;
    let df = DataFrame::new(vec![
        Column::new("CustomerID".into(), a.iter().map(|(id, _)| id.to_string()).collect::<Vec<_>>()),
        Column::new("Cluster".into(), a.iter().map(|(_, c)| *c as u32).collect::<Vec<u32>>()),
    ])?;
    Ok(df)
}

/// Size and mean raw RFM values per cluster
pub fn cluster_profiles_frame(clusters: &ClusterReport) -> Result<DataFrame> {
    let p = &clusters.profiles;
    let df = DataFrame::new(vec![
        Column::new("Cluster".into(), p.iter().map(|c| c.cluster as u32).collect::<Vec<u32>>()),
        Column::new("Size".into(), p.iter().map(|c| c.size as u64).collect::<Vec<u64>>()),
        Column::new("Recency".into(), p.iter().map(|c| c.mean_recency).collect::<Vec<f64>>()),
        Column::new("Frequency".into(), p.iter().map(|c| c.mean_frequency).collect::<Vec<f64>>()),
        Column::new("Monetary".into(), p.iter().map(|c| c.mean_monetary).collect::<Vec<f64>>()),
    ])?;
    Ok(df)
}

/// `class, precision, recall, f1_score, support` with an accuracy row
pub fn churn_report_frame(churn: &ChurnReport) -> Result<DataFrame> {
    let report = &churn.classification;
    let mut class = Vec::new();
    let mut precision = Vec::new();
    let mut recall = Vec::new();
    let mut f1 = Vec::new();
    let mut support = Vec::new();

    for row in report.rows() {
        class.push(row.class.clone());
        precision.push(Some(row.precision));
        recall.push(Some(row.recall));
        f1.push(Some(row.f1_score));
        support.push(row.support as u64);
    }
    class.push("accuracy".to_string());
    precision.push(None);
    recall.push(None);
    f1.push(Some(report.accuracy));
    support.push(report.macro_avg.support as u64);

    let df = DataFrame::new(vec![
        Column::new("class".into(), class),
        Column::new("precision".into(), precision),
        Column::new("recall".into(), recall),
        Column::new("f1_score".into(), f1),
        Column::new("support".into(), support),
    ])?;
    Ok(df)
}

/// `feature, coefficient` including the intercept
pub fn churn_coefficients_frame(churn: &ChurnReport) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Column::new(
            "feature".into(),
            churn.coefficients.iter().map(|(f, _)| f.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "coefficient".into(),
            churn.coefficients.iter().map(|(_, c)| *c).collect::<Vec<f64>>(),
        ),
    ])?;
    Ok(df)
}

/// `column, count, mean, std, min, 25%, 50%, 75%, max`
pub fn numeric_summary_frame(exploration: &ExplorationReport) -> Result<DataFrame> {
    let s = &exploration.numeric;
    let stat = |f: fn(&crate::explore::NumericSummary) -> f64| s.iter().map(f).collect::<Vec<f64>>();
    let df = DataFrame::new(vec![
        Column::new("column".into(), s.iter().map(|c| c.column.clone()).collect::<Vec<_>>()),
        Column::new("count".into(), s.iter().map(|c| c.count as u64).collect::<Vec<u64>>()),
        Column::new("mean".into(), stat(|c| c.mean)),
        Column::new("std".into(), stat(|c| c.std)),
        Column::new("min".into(), stat(|c| c.min)),
        Column::new("25%".into(), stat(|c| c.q25)),
        Column::new("50%".into(), stat(|c| c.median)),
        Column::new("75%".into(), stat(|c| c.q75)),
        Column::new("max".into(), stat(|c| c.max)),
    ])?;
    Ok(df)
}

pub fn top_countries_frame(exploration: &ExplorationReport) -> Result<DataFrame> {
    let top = &exploration.top_countries;
    let df = DataFrame::new(vec![
        Column::new("Country".into(), top.iter().map(|(c, _)| c.clone()).collect::<Vec<_>>()),
        Column::new("Transactions".into(), top.iter().map(|(_, n)| *n as u64).collect::<Vec<u64>>()),
    ])?;
    Ok(df)
}

pub fn top_products_frame(exploration: &ExplorationReport) -> Result<DataFrame> {
    let top = &exploration.top_products;
    let df = DataFrame::new(vec![
        Column::new("Description".into(), top.iter().map(|(d, _)| d.clone()).collect::<Vec<_>>()),
        Column::new("Quantity".into(), top.iter().map(|(_, q)| *q).collect::<Vec<i64>>()),
    ])?;
    Ok(df)
}

pub fn daily_revenue_frame(exploration: &ExplorationReport) -> Result<DataFrame> {
    let daily = &exploration.daily_revenue;
    let df = DataFrame::new(vec![
        Column::new("date".into(), daily.iter().map(|(d, _)| d.to_string()).collect::<Vec<_>>()),
        Column::new("revenue".into(), daily.iter().map(|(_, r)| *r).collect::<Vec<f64>>()),
    ])?;
    Ok(df)
}

/// Writes artifacts as CSV files into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Creates the directory if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one frame as `<name>.csv`
    pub fn write(&self, name: &str, mut df: DataFrame) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.csv", name));
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
        debug!(path = %path.display(), rows = df.height(), "Wrote table");
        Ok(path)
    }

    /// Write the customer-level tables
    pub fn write_customers(&self, customers: &CustomerAnalysis) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.write("rfm_segments", segments_frame(&customers.segments)?)?,
            self.write("segment_counts", segment_counts_frame(&customers.segments)?)?,
            self.write("customers", customers_frame(customers)?)?,
            self.write("customer_clusters", clusters_frame(&customers.clusters)?)?,
            self.write("cluster_profiles", cluster_profiles_frame(&customers.clusters)?)?,
            self.write("churn_report", churn_report_frame(&customers.churn)?)?,
            self.write("churn_coefficients", churn_coefficients_frame(&customers.churn)?)?,
        ])
    }

    pub fn write_basket(&self, basket: &BasketReport) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.write("frequent_itemsets", itemsets_frame(basket)?)?,
            self.write("association_rules", rules_frame(basket)?)?,
        ])
    }

    pub fn write_forecast(&self, forecast: &ForecastReport) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.write("sales_forecast", forecast_frame(forecast)?)?,
            self.write("forecast_model", forecast_model_frame(forecast)?)?,
        ])
    }

    pub fn write_exploration(&self, exploration: &ExplorationReport) -> Result<Vec<PathBuf>> {
        Ok(vec![
            self.write("descriptive_statistics", numeric_summary_frame(exploration)?)?,
            self.write("top_countries", top_countries_frame(exploration)?)?,
            self.write("top_products", top_products_frame(exploration)?)?,
            self.write("daily_sales", daily_revenue_frame(exploration)?)?,
        ])
    }

    /// Write every artifact of a pipeline run
    pub fn write_all(&self, report: &PipelineReport) -> Result<Vec<PathBuf>> {
        let mut paths = self.write_customers(&report.customers)?;
        paths.extend(self.write_basket(&report.basket)?);
        paths.extend(self.write_forecast(&report.forecast)?);
        paths.extend(self.write_exploration(&report.exploration)?);
        info!(dir = %self.dir.display(), files = paths.len(), "Wrote report tables");
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::{Itemset, Rule};

    fn basket() -> BasketReport {
        BasketReport {
            n_invoices: 10,
            n_items: 3,
            itemsets: vec![
                Itemset { items: vec!["bread".into()], support: 0.4 },
                Itemset { items: vec!["bread".into(), "milk".into()], support: 0.4 },
            ],
            rules: vec![Rule {
                antecedents: vec!["milk".into()],
                consequents: vec!["bread".into()],
                antecedent_support: 0.6,
                consequent_support: 0.4,
                support: 0.4,
                confidence: 0.4 / 0.6,
                lift: (0.4 / 0.6) / 0.4,
                leverage: 0.4 - 0.6 * 0.4,
                conviction: (1.0 - 0.4) / (1.0 - 0.4 / 0.6),
            }],
        }
    }

    #[test]
    fn test_itemsets_frame_joins_items() {
        let df = itemsets_frame(&basket()).unwrap();
        assert_eq!(df.height(), 2);
        let names = df.column("itemsets").unwrap().as_materialized_series().str().unwrap().get(1).unwrap().to_string();
        assert_eq!(names, "bread, milk");
        let len = df.column("length").unwrap().as_materialized_series().u32().unwrap().get(1).unwrap();
        assert_eq!(len, 2);
    }

    #[test]
    fn test_rules_frame_columns() {
        let df = rules_frame(&basket()).unwrap();
        let cols: Vec<String> = df.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            cols,
            [
                "antecedents", "consequents", "antecedent_support", "consequent_support",
                "support", "confidence", "lift", "leverage", "conviction"
            ]
        );
        let lift = df.column("lift").unwrap().as_materialized_series().f64().unwrap().get(0).unwrap();
        assert!((lift - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_basket_gives_empty_frames() {
        let empty = BasketReport::default();
        assert_eq!(itemsets_frame(&empty).unwrap().height(), 0);
        assert_eq!(rules_frame(&empty).unwrap().width(), 9);
    }

    #[test]
    fn test_writer_creates_csv() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested")).unwrap();
        let paths = writer.write_basket(&basket()).unwrap();

        assert_eq!(paths.len(), 2);
        let csv = fs::read_to_string(&paths[0]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("itemsets,support,length"));
        assert_eq!(lines.next(), Some("bread,0.4,1"));
        assert_eq!(lines.next(), Some("\"bread, milk\",0.4,2"));
    }
}
