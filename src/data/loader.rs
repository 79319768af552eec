//! Ingestion boundary: CSV / DataFrame → validated `TransactionTable`
//!
//! All columns are read as strings and parsed here, so the schema is enforced
//! once and the core components can trust the table they receive.

use super::transaction::{CustomerId, Transaction, TransactionTable};
use crate::error::{AnalyticsError, Result, Stage};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

pub const COL_INVOICE_NO: &str = "InvoiceNo";
pub const COL_STOCK_CODE: &str = "StockCode";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_QUANTITY: &str = "Quantity";
pub const COL_INVOICE_DATE: &str = "InvoiceDate";
pub const COL_UNIT_PRICE: &str = "UnitPrice";
pub const COL_CUSTOMER_ID: &str = "CustomerID";
pub const COL_COUNTRY: &str = "Country";

/// Timestamp formats tried in order for `InvoiceDate`
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Drop rows violating `Quantity > 0` / `UnitPrice > 0` instead of failing
    pub drop_invalid_rows: bool,
    /// CSV field separator
    pub separator: u8,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            drop_invalid_rows: true,
            separator: b',',
        }
    }
}

/// Summary of a load
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSummary {
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Rows violating the positivity contract
    pub rows_dropped: usize,
    /// Exact repeats of an earlier row
    pub rows_duplicated: usize,
}

/// Reads transaction tables from CSV files or polars DataFrames
#[derive(Debug, Clone, Default)]
pub struct TransactionLoader {
    config: LoaderConfig,
}

impl TransactionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Drop or reject rows that violate the positivity contract
    pub fn with_drop_invalid_rows(mut self, drop: bool) -> Self {
        self.config.drop_invalid_rows = drop;
        self
    }

    pub fn with_separator(mut self, separator: u8) -> Self {
        self.config.separator = separator;
        self
    }

    /// Load a CSV file with every column read as a string
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<(TransactionTable, LoadSummary)> {
        let path = path.as_ref();
        let start = Instant::now();

        let parse_opts = CsvParseOptions::default().with_separator(self.config.separator);
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Read transaction CSV"
        );

        self.from_dataframe(&df)
    }

    /// Convert a DataFrame carrying the input schema into a validated table
    pub fn from_dataframe(&self, df: &DataFrame) -> Result<(TransactionTable, LoadSummary)> {
        let invoice_no = string_column(df, COL_INVOICE_NO)?;
        let stock_code = string_column(df, COL_STOCK_CODE)?;
        let description = string_column(df, COL_DESCRIPTION)?;
        let quantity = string_column(df, COL_QUANTITY)?;
        let invoice_date = string_column(df, COL_INVOICE_DATE)?;
        let unit_price = string_column(df, COL_UNIT_PRICE)?;
        let customer_id = string_column(df, COL_CUSTOMER_ID)?;
        let country = string_column(df, COL_COUNTRY)?;

        let n_rows = df.height();
        let mut rows = Vec::with_capacity(n_rows);
        let mut dropped = 0usize;
        let mut duplicated = 0usize;
        let mut seen: HashSet<[Option<&str>; 8]> = HashSet::with_capacity(n_rows);

        for i in 0..n_rows {
            let raw = [
                invoice_no[i].as_deref(),
                stock_code[i].as_deref(),
                description[i].as_deref(),
                quantity[i].as_deref(),
                invoice_date[i].as_deref(),
                unit_price[i].as_deref(),
                customer_id[i].as_deref(),
                country[i].as_deref(),
            ];
            if !seen.insert(raw) {
                duplicated += 1;
                continue;
            }

            let transaction = Transaction {
                invoice_no: required(&invoice_no[i], COL_INVOICE_NO, i)?.to_string(),
                stock_code: stock_code[i].clone().unwrap_or_default(),
                description: description[i].clone().unwrap_or_default(),
                quantity: parse_quantity(required(&quantity[i], COL_QUANTITY, i)?, i)?,
                unit_price: parse_price(required(&unit_price[i], COL_UNIT_PRICE, i)?, i)?,
                invoice_date: parse_timestamp(required(&invoice_date[i], COL_INVOICE_DATE, i)?, i)?,
                customer_id: normalize_customer_id(customer_id[i].as_deref()),
                country: country[i].clone().unwrap_or_default(),
            };

            if let Some(reason) = transaction.contract_violation() {
                if self.config.drop_invalid_rows {
                    dropped += 1;
                    continue;
                }
                return Err(AnalyticsError::data_quality(
                    Stage::Ingestion,
                    format!("row {}: {}", i, reason),
                ));
            }
            rows.push(transaction);
        }

        if duplicated > 0 {
            warn!(duplicated, "Dropped duplicate rows");
        }
        if dropped > 0 {
            warn!(dropped, "Dropped rows violating the Quantity/UnitPrice contract");
        }

        let summary = LoadSummary {
            rows_read: n_rows,
            rows_kept: rows.len(),
            rows_dropped: dropped,
            rows_duplicated: duplicated,
        };
        Ok((TransactionTable::new(rows)?, summary))
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name).map_err(|_| {
        AnalyticsError::data_quality(Stage::Ingestion, format!("missing required column '{}'", name))
    })?;
    let series = column.as_materialized_series().cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
        .collect();
    Ok(values)
}

fn required<'a>(value: &'a Option<String>, column: &str, row: usize) -> Result<&'a str> {
    value.as_deref().ok_or_else(|| {
        AnalyticsError::data_quality(Stage::Ingestion, format!("row {}: missing {}", row, column))
    })
}

fn parse_quantity(raw: &str, row: usize) -> Result<i64> {
    if let Ok(q) = raw.parse::<i64>() {
        return Ok(q);
    }
    match raw.parse::<f64>() {
        Ok(q) if q.fract() == 0.0 && q.is_finite() => Ok(q as i64),
        _ => Err(AnalyticsError::data_quality(
            Stage::Ingestion,
            format!("row {}: {} '{}' is not an integer", row, COL_QUANTITY, raw),
        )),
    }
}

fn parse_price(raw: &str, row: usize) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| {
        AnalyticsError::data_quality(
            Stage::Ingestion,
            format!("row {}: {} '{}' is not a number", row, COL_UNIT_PRICE, raw),
        )
    })
}

/// Parse an invoice timestamp; a bare date is taken as midnight
pub fn parse_timestamp(raw: &str, row: usize) -> Result<NaiveDateTime> {
    for format in DATE_TIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(ts);
        }
    }
    if let Some(ts) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(ts);
    }
    Err(AnalyticsError::data_quality(
        Stage::Ingestion,
        format!("row {}: {} '{}' is not a recognised timestamp", row, COL_INVOICE_DATE, raw),
    ))
}

/// Blank → guest sentinel; `17850.0` → `17850`
fn normalize_customer_id(raw: Option<&str>) -> CustomerId {
    match raw {
        None => CustomerId::guest(),
        Some(id) => match id.strip_suffix(".0") {
            Some(stem) if !stem.is_empty() && stem.trim_start_matches('-').chars().all(|c| c.is_ascii_digit()) => {
                CustomerId::new(stem)
            }
            _ => CustomerId::new(id),
        },
    }
}
