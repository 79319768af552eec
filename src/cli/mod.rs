//! Retail Analytics CLI Module
//!
//! Command-line front end: load a transaction CSV, run one or all analyses,
//! print a summary and optionally write the result tables as CSV.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::basket::{BasketConfig, BasketMiner, BasketReport, RuleMetric};
use crate::data::{TransactionLoader, TransactionTable};
use crate::explore::{ExplorationReport, Explorer};
use crate::forecast::{ForecastReport, Forecaster};
use crate::pipeline::{Pipeline, PipelineConfig, PipelineReport};
use crate::report::{self, ReportWriter};
use crate::rfm::{FeatureBuilder, FeatureConfig, GuestPolicy, SegmentTable, Segmenter};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "retail-analytics")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Customer segmentation, basket rules, revenue forecasts and churn from retail transactions")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every analysis and write all result tables
    Run {
        /// Transaction CSV file
        #[arg(short, long)]
        data: PathBuf,

        /// Directory for the result CSV files
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// RFM scores and customer segments
    Rfm {
        #[arg(short, long)]
        data: PathBuf,

        /// Directory for the result CSV files
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Leave the guest customer out of the RFM table
        #[arg(long)]
        exclude_guests: bool,
    },

    /// Frequent itemsets and association rules
    Basket {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Minimum itemset support
        #[arg(long, default_value = "0.01")]
        min_support: f64,

        /// Minimum rule lift
        #[arg(long, default_value = "1.0")]
        min_lift: f64,

        /// Largest itemset size
        #[arg(long)]
        max_len: Option<usize>,

        /// Rules to print
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Monthly revenue and a 12-month ARIMA forecast
    Forecast {
        #[arg(short, long)]
        data: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Descriptive statistics of a transaction file
    Info {
        #[arg(short, long)]
        data: PathBuf,
    },
}

// ─── Shared steps ──────────────────────────────────────────────────────────────

fn load_transactions(path: &Path) -> anyhow::Result<TransactionTable> {
    step_run("Loading transactions");
    let start = Instant::now();
    let (table, summary) = TransactionLoader::new().load_csv(path)?;
    step_done(&format!(
        "{} rows kept, {} duplicates, {} dropped in {:?}",
        summary.rows_kept,
        summary.rows_duplicated,
        summary.rows_dropped,
        start.elapsed()
    ));
    Ok(table)
}

fn writer(output: Option<&Path>) -> anyhow::Result<Option<ReportWriter>> {
    Ok(match output {
        Some(dir) => Some(ReportWriter::new(dir)?),
        None => None,
    })
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        step_ok(&format!("wrote {}", path.display()));
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_run(data: &Path, output: &Path, config: Option<&Path>) -> anyhow::Result<()> {
    section("Pipeline");

    let config = match config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let table = load_transactions(data)?;

    step_run("Running analyses");
    let report = Pipeline::new(config).run(&table)?;
    step_done(&format!("{:.2}s", report.elapsed_secs));

    print_summary(&report);

    section("Output");
    let paths = ReportWriter::new(output)?.write_all(&report)?;
    print_written(&paths);
    println!();
    Ok(())
}

pub fn cmd_rfm(data: &Path, output: Option<&Path>, exclude_guests: bool) -> anyhow::Result<()> {
    section("RFM Segmentation");
    let table = load_transactions(data)?;

    let policy = if exclude_guests { GuestPolicy::Exclude } else { GuestPolicy::Include };
    step_run("Scoring customers");
    let features = FeatureBuilder::new(FeatureConfig::default().with_guest_policy(policy))
        .build(&table)?;
    let segments = Segmenter::new().score(&features)?;
    step_done(&format!("{} customers", features.len()));

    print_segments(&segments);

    if let Some(w) = writer(output)? {
        print_written(&[
            w.write("rfm_segments", report::segments_frame(&segments)?)?,
            w.write("segment_counts", report::segment_counts_frame(&segments)?)?,
        ]);
    }
    println!();
    Ok(())
}

pub fn cmd_basket(
    data: &Path,
    output: Option<&Path>,
    min_support: f64,
    min_lift: f64,
    max_len: Option<usize>,
    top: usize,
) -> anyhow::Result<()> {
    section("Market Basket");
    let table = load_transactions(data)?;

    let config = BasketConfig::default()
        .with_min_support(min_support)
        .with_metric(RuleMetric::Lift, min_lift)
        .with_max_len(max_len);

    step_run(&format!("Mining itemsets at support {}", min_support.to_string().cyan()));
    let start = Instant::now();
    let basket = BasketMiner::new(config).mine(&table)?;
    step_done(&format!("{:?}", start.elapsed()));

    print_basket(&basket, top);

    if let Some(w) = writer(output)? {
        print_written(&w.write_basket(&basket)?);
    }
    println!();
    Ok(())
}

pub fn cmd_forecast(data: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Revenue Forecast");
    let table = load_transactions(data)?;

    step_run("Fitting ARIMA(5,1,0)");
    let forecast = Forecaster::default().forecast(&table)?;
    step_done(&format!("{} iterations", forecast.model.iterations));

    print_forecast(&forecast);

    if let Some(w) = writer(output)? {
        print_written(&w.write_forecast(&forecast)?);
    }
    println!();
    Ok(())
}

pub fn cmd_info(data: &Path) -> anyhow::Result<()> {
    section("Data Info");
    let table = load_transactions(data)?;
    let exploration = Explorer::default().explore(&table)?;

    println!();
    println!("  {:<12} {}", muted("File"), data.display());
    print_exploration(&exploration);
    println!();
    Ok(())
}

pub fn show_help() {
    println!();
    line_box_top();
    line_box_empty();
    line_box_center(&format!("{}", "Retail Analytics".white().bold()));
    line_box_center(&format!("{}", dim(&format!("v{}", env!("CARGO_PKG_VERSION")))));
    line_box_empty();
    line_box_sep();
    line_box_empty();
    line_box(&kv("run     ", "all analyses → CSV tables"));
    line_box(&kv("rfm     ", "RFM scores and segments"));
    line_box(&kv("basket  ", "itemsets and association rules"));
    line_box(&kv("forecast", "12-month revenue forecast"));
    line_box(&kv("info    ", "descriptive statistics"));
    line_box_empty();
    line_box_bottom();

    section("Examples");
    let cmds: &[(&str, &str)] = &[
        ("retail-analytics run -d sales.csv -o out", "Full pipeline"),
        ("retail-analytics run -d sales.csv -c cfg.json", "Pipeline with config"),
        ("retail-analytics basket -d sales.csv --min-support 0.02", "Basket rules"),
        ("retail-analytics info -d sales.csv", "Inspect a dataset"),
    ];
    for (cmd, desc) in cmds {
        println!("  {:<56} {}", cmd.white(), muted(desc));
    }
    println!();
}

// ─── Printers ──────────────────────────────────────────────────────────────────

fn print_summary(report: &PipelineReport) {
    print_segments(&report.customers.segments);

    section("Clusters");
    println!(
        "  {:<8} {:>7} {:>10} {:>10} {:>12}",
        muted("Cluster"), muted("Size"), muted("Recency"), muted("Frequency"), muted("Monetary")
    );
    for p in &report.customers.clusters.profiles {
        println!(
            "  {:<8} {:>7} {:>10.1} {:>10.1} {:>12.2}",
            p.cluster, p.size, p.mean_recency, p.mean_frequency, p.mean_monetary
        );
    }
    println!("  {:<12} {:.3}", muted("Inertia"), report.customers.clusters.inertia);

    let churn = &report.customers.churn;
    section("Churn");
    println!("  {:<12} {:.1}%", muted("Churn rate"), churn.churn_rate() * 100.0);
    println!(
        "  {:<14} {:>9} {:>9} {:>9} {:>8}",
        muted("Class"), muted("Precision"), muted("Recall"), muted("F1"), muted("Support")
    );
    for row in churn.classification.rows() {
        println!(
            "  {:<14} {:>9.3} {:>9.3} {:>9.3} {:>8}",
            row.class, row.precision, row.recall, row.f1_score, row.support
        );
    }
    println!("  {:<14} {:>9.3}", muted("Accuracy"), churn.classification.accuracy);

    print_basket(&report.basket, 10);
    print_forecast(&report.forecast);
    print_exploration(&report.exploration);
}

fn print_segments(segments: &SegmentTable) {
    section("Segments");
    for (segment, count) in segments.segment_counts() {
        println!("  {:<14} {:>7}", segment.label().white(), count);
    }
}

fn print_basket(basket: &BasketReport, top: usize) {
    section("Association Rules");
    println!("  {:<12} {}", muted("Invoices"), basket.n_invoices);
    println!("  {:<12} {}", muted("Itemsets"), basket.itemsets.len());
    println!("  {:<12} {}", muted("Rules"), basket.rules.len());
    if basket.is_empty() {
        println!("  {}", "No itemset reached the support threshold".yellow());
        return;
    }
    println!();
    for rule in basket.rules.iter().take(top) {
        println!(
            "  {} {} {}  {}",
            truncate(&rule.antecedents.join(", "), 24).white(),
            dim("→"),
            truncate(&rule.consequents.join(", "), 24).white(),
            muted(&format!("lift {:.2} conf {:.2}", rule.lift, rule.confidence))
        );
    }
}

fn print_forecast(forecast: &ForecastReport) {
    section("Forecast");
    let model = &forecast.model;
    println!("  {:<12} {}", muted("Model"), model.order);
    println!("  {:<12} {:.2}", muted("Log-lik"), model.log_likelihood);
    println!("  {:<12} {:.2}", muted("AIC"), model.aic);
    println!();
    for point in forecast.forecast() {
        println!("  {:<10} {:>14.2}", point.month.to_string().white(), point.revenue);
    }
}

fn print_exploration(exploration: &ExplorationReport) {
    section("Dataset");
    println!("  {:<12} {}", muted("Lines"), exploration.n_transactions);
    println!("  {:<12} {}", muted("Invoices"), exploration.n_invoices);
    println!("  {:<12} {}", muted("Customers"), exploration.n_customers);
    println!("  {:<12} {}", muted("Items"), exploration.n_items);
    println!(
        "  {:<12} {} → {}",
        muted("Period"),
        exploration.first_timestamp.date(),
        exploration.last_timestamp.date()
    );
    println!("  {:<12} {:.2}", muted("Revenue"), exploration.total_revenue);

    println!();
    println!(
        "  {:<10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        muted("Column"), muted("Mean"), muted("Std"), muted("Min"), muted("Median"), muted("Max")
    );
    for s in &exploration.numeric {
        println!(
            "  {:<10} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            s.column, s.mean, s.std, s.min, s.median, s.max
        );
    }

    section("Top Countries");
    for (country, n) in &exploration.top_countries {
        println!("  {:<28} {:>8}", country.white(), n);
    }
    section("Top Products");
    for (product, q) in &exploration.top_products {
        println!("  {:<40} {:>8}", truncate(product, 38).white(), q);
    }
}
