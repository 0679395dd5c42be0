//! Monthly and quarterly performance trends
//!
//! Rows are bucketed by the calendar period their date falls in. Every period
//! between the first and last populated one is emitted, so gaps show up as
//! empty buckets instead of disappearing.

use crate::error::{InsightsError, Result};
use crate::frame::{count_sum, mean, numeric_column, string_column, sum};
use crate::loader::DATE_COLUMN;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrendPeriod {
    #[default]
    Monthly,
    Quarterly,
}

impl TrendPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Monthly => "monthly",
            TrendPeriod::Quarterly => "quarterly",
        }
    }

    fn months(&self) -> u32 {
        match self {
            TrendPeriod::Monthly => 1,
            TrendPeriod::Quarterly => 3,
        }
    }

    /// Last day of the period containing `date`; `None` past chrono's range.
    pub fn period_end(&self, date: NaiveDate) -> Option<NaiveDate> {
        let span = self.months();
        let end_month = ((date.month() - 1) / span + 1) * span;
        month_end(date.year(), end_month)
    }

    /// Last day of the period following the one ending on `end`.
    fn next_period_end(&self, end: NaiveDate) -> Option<NaiveDate> {
        let months = end.year() * 12 + end.month() as i32 - 1 + self.months() as i32;
        month_end(months.div_euclid(12), months.rem_euclid(12) as u32 + 1)
    }
}

impl FromStr for TrendPeriod {
    type Err = InsightsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "monthly" => Ok(TrendPeriod::Monthly),
            "quarterly" => Ok(TrendPeriod::Quarterly),
            _ => Err(InsightsError::Validation(
                "Invalid time period. Use 'monthly' or 'quarterly'".to_string(),
            )),
        }
    }
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn out_of_range(date: NaiveDate) -> InsightsError {
    InsightsError::Computation(format!("date {} is out of the supported range", date))
}

/// Parse a date cell in any of the layouts sales exports commonly use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendBucket {
    /// Period end, `YYYY-MM-DD`
    pub date: String,
    pub revenue_confirmed: f64,
    pub tours_booked: i64,
    pub applications: i64,
    pub avg_close_rate_30_days: f64,
}

#[derive(Default)]
struct BucketRows {
    revenue: Vec<Option<f64>>,
    tours: Vec<Option<f64>>,
    applications: Vec<Option<f64>>,
    close_rate: Vec<Option<f64>>,
}

pub fn compute_trends(df: &DataFrame, period: TrendPeriod) -> Result<Vec<TrendBucket>> {
    let dates = string_column(df, DATE_COLUMN)?;
    let revenue = numeric_column(df, "revenue_confirmed")?;
    let tours = numeric_column(df, "tours_booked")?;
    let applications = numeric_column(df, "applications")?;
    let close_rate = numeric_column(df, "avg_close_rate_30_days")?;

    let mut buckets: BTreeMap<NaiveDate, BucketRows> = BTreeMap::new();
    for (row, raw) in dates.iter().enumerate() {
        let Some(raw) = raw else {
            continue;
        };
        let date = parse_date(raw).ok_or_else(|| {
            InsightsError::Computation(format!("unparseable date '{}' in row {}", raw, row + 1))
        })?;
        let end = period.period_end(date).ok_or_else(|| out_of_range(date))?;
        let bucket = buckets.entry(end).or_default();
        bucket.revenue.push(revenue[row]);
        bucket.tours.push(tours[row]);
        bucket.applications.push(applications[row]);
        bucket.close_rate.push(close_rate[row]);
    }

    let (Some(&first), Some(&last)) = (buckets.keys().next(), buckets.keys().next_back()) else {
        return Ok(Vec::new());
    };

    let empty = BucketRows::default();
    let mut trends = Vec::new();
    let mut end = first;
    loop {
        let rows = buckets.get(&end).unwrap_or(&empty);
        trends.push(TrendBucket {
            date: end.format("%Y-%m-%d").to_string(),
            revenue_confirmed: sum(&rows.revenue),
            tours_booked: count_sum(&rows.tours),
            applications: count_sum(&rows.applications),
            avg_close_rate_30_days: mean(&rows.close_rate),
        });
        if end >= last {
            break;
        }
        end = period.next_period_end(end).ok_or_else(|| out_of_range(end))?;
    }

    Ok(trends)
}

/// Headline numbers across all buckets, used to brief the narrative.
#[derive(Debug, Clone)]
pub struct TrendSummary {
    pub periods: usize,
    pub min_revenue: f64,
    pub max_revenue: f64,
    pub average_tours_booked: f64,
    pub average_applications: f64,
}

impl TrendSummary {
    pub fn from_buckets(buckets: &[TrendBucket]) -> Self {
        let revenue: Vec<f64> = buckets.iter().map(|b| b.revenue_confirmed).collect();
        let tours: Vec<Option<f64>> = buckets.iter().map(|b| Some(b.tours_booked as f64)).collect();
        let apps: Vec<Option<f64>> = buckets.iter().map(|b| Some(b.applications as f64)).collect();

        Self {
            periods: buckets.len(),
            min_revenue: revenue.iter().copied().reduce(f64::min).unwrap_or(f64::NAN),
            max_revenue: revenue.iter().copied().reduce(f64::max).unwrap_or(f64::NAN),
            average_tours_booked: mean(&tours),
            average_applications: mean(&apps),
        }
    }
}
