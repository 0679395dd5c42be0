//! Typed column access over the loaded sales `DataFrame`.
//!
//! Polars keeps whatever types the CSV reader inferred. Aggregation code only
//! ever needs three views of a column: numbers, strings, or the raw cell
//! values for echoing back to the client.

use crate::error::{InsightsError, Result};
use polars::prelude::*;
use serde::Serialize;

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().contains(&name)
}

fn require<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name).map_err(|_| InsightsError::missing_column(name))
}

/// Column coerced to `f64`; cells that cannot be coerced become `None`.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = require(df, name)?;
    let values = series.cast(&DataType::Float64)?;
    let values = values.f64()?;
    Ok(values.into_iter().collect())
}

/// Like [`numeric_column`] but a missing column reads as all zeros.
pub fn numeric_column_or_zero(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    if has_column(df, name) {
        numeric_column(df, name)
    } else {
        Ok(vec![Some(0.0); df.height()])
    }
}

/// Column coerced to strings (numeric ids become their textual form).
pub fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = require(df, name)?;
    let values = series.cast(&DataType::String)?;
    let values = values.str()?;
    Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Raw cell values in row order, keeping their CSV type.
pub fn json_column(df: &DataFrame, name: &str) -> Result<Vec<serde_json::Value>> {
    let series = require(df, name)?;
    (0..series.len())
        .map(|i| Ok(any_value_to_json(series.get(i)?)))
        .collect()
}

pub fn any_value_to_json(value: AnyValue<'_>) -> serde_json::Value {
    use serde_json::Value;

    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::from(b),
        AnyValue::Int32(v) => Value::from(v),
        AnyValue::Int64(v) => Value::from(v),
        AnyValue::UInt32(v) => Value::from(v),
        AnyValue::UInt64(v) => Value::from(v),
        AnyValue::Float32(v) => float_to_json(v as f64),
        AnyValue::Float64(v) => float_to_json(v),
        AnyValue::String(s) => Value::from(s),
        AnyValue::StringOwned(s) => Value::from(s.as_str()),
        other => Value::String(other.to_string()),
    }
}

fn float_to_json(v: f64) -> serde_json::Value {
    serde_json::Number::from_f64(v)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Sum of present values.
pub fn sum(values: &[Option<f64>]) -> f64 {
    values.iter().flatten().sum()
}

/// Sum reported as a whole-number count.
pub fn count_sum(values: &[Option<f64>]) -> i64 {
    sum(values) as i64
}

/// Mean of present values; NaN when nothing is present.
pub fn mean(values: &[Option<f64>]) -> f64 {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        f64::NAN
    } else {
        present.iter().sum::<f64>() / present.len() as f64
    }
}

/// Seven values keyed Monday..Sunday, serialized in that order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Weekdays<T> {
    #[serde(rename = "Monday")]
    pub monday: T,
    #[serde(rename = "Tuesday")]
    pub tuesday: T,
    #[serde(rename = "Wednesday")]
    pub wednesday: T,
    #[serde(rename = "Thursday")]
    pub thursday: T,
    #[serde(rename = "Friday")]
    pub friday: T,
    #[serde(rename = "Saturday")]
    pub saturday: T,
    #[serde(rename = "Sunday")]
    pub sunday: T,
}

pub const CALL_COLUMNS: [&str; 7] = [
    "mon_call", "tue_call", "wed_call", "thur_call", "fri_call", "sat_call", "sun_call",
];

pub const TEXT_COLUMNS: [&str; 7] = [
    "mon_text", "tue_text", "wed_text", "thur_text", "fri_text", "sat_text", "sun_text",
];

impl<T> Weekdays<T> {
    /// Build from the seven weekday columns, Monday first.
    pub fn try_from_columns<F>(columns: &[&str; 7], mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> Result<T>,
    {
        Ok(Self {
            monday: f(columns[0])?,
            tuesday: f(columns[1])?,
            wednesday: f(columns[2])?,
            thursday: f(columns[3])?,
            friday: f(columns[4])?,
            saturday: f(columns[5])?,
            sunday: f(columns[6])?,
        })
    }
}

impl<T: std::fmt::Display> Weekdays<T> {
    pub fn describe(&self) -> String {
        format!(
            "Monday: {}, Tuesday: {}, Wednesday: {}, Thursday: {}, Friday: {}, Saturday: {}, Sunday: {}",
            self.monday, self.tuesday, self.wednesday, self.thursday, self.friday, self.saturday, self.sunday
        )
    }
}

/// Weekday call totals; missing call columns count as zero.
pub fn weekday_call_totals(df: &DataFrame) -> Result<Weekdays<i64>> {
    Weekdays::try_from_columns(&CALL_COLUMNS, |name| {
        Ok(count_sum(&numeric_column_or_zero(df, name)?))
    })
}

/// Weekday text-interaction values, one list per day in row order.
pub fn weekday_text_values(df: &DataFrame) -> Result<Weekdays<Vec<serde_json::Value>>> {
    Weekdays::try_from_columns(&TEXT_COLUMNS, |name| {
        if has_column(df, name) {
            json_column(df, name)
        } else {
            Ok(Vec::new())
        }
    })
}
