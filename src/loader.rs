//! Sales CSV discovery and loading
//!
//! The service reads a single CSV per request. The first file in the data
//! directory whose name contains "sales" and ends in `.csv` wins. Loading never
//! fails outward: any problem is logged and an empty frame is returned.

use crate::error::{InsightsError, Result};
use chrono::{Duration, Local, NaiveDate};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

pub const DATE_COLUMN: &str = "date";

/// Cell values read as missing, on top of empty fields.
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Locate the sales CSV in `dir`, considering entries in file-name order.
pub fn find_sales_csv(dir: &Path) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Cannot list data directory {}: {}", dir.display(), e);
            return None;
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_sales_csv(path))
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

fn is_sales_csv(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| {
            let lower = name.to_lowercase();
            lower.contains("sales") && lower.ends_with(".csv")
        })
        .unwrap_or(false)
}

/// Load the sales data for a request. Returns an empty frame when the file is
/// missing or unreadable.
pub fn load_sales_data(dir: &Path) -> DataFrame {
    let Some(path) = find_sales_csv(dir) else {
        warn!("No sales CSV file found in {}", dir.display());
        return DataFrame::empty();
    };

    match load_sales_file(&path, Local::now().date_naive()) {
        Ok(df) => {
            info!("Loaded {} rows, {} columns from {}", df.height(), df.width(), path.display());
            df
        }
        Err(e) => {
            error!("Error loading CSV {}: {}", path.display(), e);
            DataFrame::empty()
        }
    }
}

/// Read `path`, normalize its column labels, and add a `date` column starting
/// at `start_date` if the file has none.
pub fn load_sales_file(path: &Path, start_date: NaiveDate) -> Result<DataFrame> {
    // Infer over every row so a late float or id string does not fail the parse
    let mut df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(None)
        .with_null_values(Some(NullValues::AllColumns(
            NA_TOKENS.iter().map(|t| t.to_string()).collect(),
        )))
        .finish()?
        .collect()?;

    normalize_column_names(&mut df)?;

    if !df.get_column_names().contains(&DATE_COLUMN) {
        let dates = synthesized_dates(start_date, df.height())?;
        df.with_column(Series::new(DATE_COLUMN, dates))?;
    }

    Ok(df)
}

fn normalize_column_names(df: &mut DataFrame) -> Result<()> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.trim().to_lowercase())
        .collect();
    df.set_column_names(names.as_slice())?;
    Ok(())
}

/// One ISO date per row, consecutive days from `start`.
fn synthesized_dates(start: NaiveDate, rows: usize) -> Result<Vec<String>> {
    (0..rows)
        .map(|offset| {
            start
                .checked_add_signed(Duration::days(offset as i64))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .ok_or_else(|| InsightsError::Computation("date out of range".to_string()))
        })
        .collect()
}
