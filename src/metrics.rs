//! Team-wide and per-representative sales metrics.

use crate::error::{InsightsError, Result};
use crate::frame::{
    self, count_sum, mean, numeric_column, numeric_column_or_zero, string_column, sum, Weekdays,
};
use polars::prelude::*;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

pub const TOP_PERFORMER_LIMIT: usize = 3;

/// Aggregates shared by the team and representative views.
#[derive(Debug, Clone)]
pub struct SalesTotals {
    pub confirmed_revenue: f64,
    pub pending_revenue: f64,
    pub estimated_revenue: f64,
    pub average_deal_value: f64,
    pub average_close_rate: f64,
    pub tours_booked: i64,
    pub applications: i64,
    pub average_tours_per_lead: f64,
    pub average_apps_per_tour: f64,
    pub tours_in_pipeline: i64,
    pub tours_scheduled: i64,
    pub tours_pending: i64,
    pub tours_cancelled: i64,
}

impl SalesTotals {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        Ok(Self {
            confirmed_revenue: sum(&numeric_column(df, "revenue_confirmed")?),
            pending_revenue: sum(&numeric_column(df, "revenue_pending")?),
            estimated_revenue: sum(&numeric_column_or_zero(df, "estimated_revenue")?),
            average_deal_value: mean(&numeric_column(df, "avg_deal_value_30_days")?),
            average_close_rate: mean(&numeric_column(df, "avg_close_rate_30_days")?),
            tours_booked: count_sum(&numeric_column(df, "tours_booked")?),
            applications: count_sum(&numeric_column(df, "applications")?),
            average_tours_per_lead: mean(&numeric_column(df, "tours_per_lead")?),
            average_apps_per_tour: mean(&numeric_column(df, "apps_per_tour")?),
            tours_in_pipeline: count_sum(&numeric_column(df, "tours_in_pipeline")?),
            tours_scheduled: count_sum(&numeric_column(df, "tours_scheduled")?),
            tours_pending: count_sum(&numeric_column(df, "tours_pending")?),
            tours_cancelled: count_sum(&numeric_column(df, "tours_cancelled")?),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMetrics {
    pub total_confirmed_revenue: f64,
    pub total_pending_revenue: f64,
    pub total_estimated_revenue: f64,
    pub average_deal_value: f64,
    pub average_close_rate: f64,
    pub total_tours_booked: i64,
    pub total_applications: i64,
    pub average_tours_per_lead: f64,
    pub average_apps_per_tour: f64,
    pub tours_in_pipeline: i64,
    pub total_employees: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopPerformer {
    pub employee_id: String,
    pub employee_name: String,
    pub revenue_confirmed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityMetrics {
    pub tours_scheduled: i64,
    pub tours_pending: i64,
    pub tours_cancelled: i64,
    pub daily_calls: Weekdays<i64>,
}

#[derive(Debug, Clone)]
pub struct TeamPerformance {
    pub metrics: TeamMetrics,
    pub top_performers: Vec<TopPerformer>,
    pub activity_metrics: ActivityMetrics,
}

pub fn team_performance(df: &DataFrame) -> Result<TeamPerformance> {
    let totals = SalesTotals::from_frame(df)?;
    let total_employees = distinct_employees(df)?;

    let metrics = TeamMetrics {
        total_confirmed_revenue: totals.confirmed_revenue,
        total_pending_revenue: totals.pending_revenue,
        total_estimated_revenue: totals.estimated_revenue,
        average_deal_value: totals.average_deal_value,
        average_close_rate: totals.average_close_rate,
        total_tours_booked: totals.tours_booked,
        total_applications: totals.applications,
        average_tours_per_lead: totals.average_tours_per_lead,
        average_apps_per_tour: totals.average_apps_per_tour,
        tours_in_pipeline: totals.tours_in_pipeline,
        total_employees,
    };

    let activity_metrics = ActivityMetrics {
        tours_scheduled: totals.tours_scheduled,
        tours_pending: totals.tours_pending,
        tours_cancelled: totals.tours_cancelled,
        daily_calls: frame::weekday_call_totals(df)?,
    };

    Ok(TeamPerformance {
        metrics,
        top_performers: top_performers(df, TOP_PERFORMER_LIMIT)?,
        activity_metrics,
    })
}

fn distinct_employees(df: &DataFrame) -> Result<usize> {
    let ids = string_column(df, "employee_id")?;
    Ok(ids.into_iter().flatten().collect::<HashSet<_>>().len())
}

/// Employees ranked by summed confirmed revenue, highest first. Groups are
/// formed in first-appearance order and the sort is stable, so ties keep
/// input order.
pub fn top_performers(df: &DataFrame, limit: usize) -> Result<Vec<TopPerformer>> {
    let ids = string_column(df, "employee_id")?;
    let names = string_column(df, "employee_name")?;
    let revenue = numeric_column(df, "revenue_confirmed")?;

    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut groups: Vec<TopPerformer> = Vec::new();

    for ((id, name), amount) in ids.into_iter().zip(names).zip(revenue) {
        let (Some(id), Some(name)) = (id, name) else {
            continue;
        };
        let slot = *index.entry((id.clone(), name.clone())).or_insert_with(|| {
            groups.push(TopPerformer {
                employee_id: id,
                employee_name: name,
                revenue_confirmed: 0.0,
            });
            groups.len() - 1
        });
        groups[slot].revenue_confirmed += amount.unwrap_or(0.0);
    }

    groups.sort_by(|a, b| b.revenue_confirmed.total_cmp(&a.revenue_confirmed));
    groups.truncate(limit);
    Ok(groups)
}

#[derive(Debug, Clone, Serialize)]
pub struct RepMetrics {
    pub employee_id: String,
    pub employee_name: String,
    pub total_confirmed_revenue: f64,
    pub total_pending_revenue: f64,
    pub total_estimated_revenue: f64,
    pub average_deal_value: f64,
    pub close_rate: f64,
    pub total_tours_booked: i64,
    pub total_applications: i64,
    pub tours_per_lead: f64,
    pub apps_per_tour: f64,
    pub tours_in_pipeline: i64,
    pub tours_scheduled: i64,
    pub tours_pending: i64,
    pub tours_cancelled: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyActivity {
    #[serde(rename = "Calls")]
    pub calls: Weekdays<i64>,
    #[serde(rename = "Daily Text Interactions")]
    pub text_interactions: Weekdays<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct RepPerformance {
    pub metrics: RepMetrics,
    pub daily_activity: DailyActivity,
}

/// Rows whose `employee_id`, read as text, equals `rep_id`.
pub fn rows_for_rep(df: &DataFrame, rep_id: &str) -> Result<DataFrame> {
    let ids = string_column(df, "employee_id")?;
    let keep: Vec<bool> = ids.iter().map(|id| id.as_deref() == Some(rep_id)).collect();
    let mask = Series::new("rep_mask", keep);
    Ok(df.filter(mask.bool()?)?)
}

pub fn rep_performance(df: &DataFrame, rep_id: &str) -> Result<RepPerformance> {
    let rep_rows = rows_for_rep(df, rep_id)?;
    if rep_rows.height() == 0 {
        return Err(InsightsError::NotFound(
            "No data found for this representative".to_string(),
        ));
    }

    let totals = SalesTotals::from_frame(&rep_rows)?;
    let employee_name = string_column(&rep_rows, "employee_name")?
        .into_iter()
        .next()
        .flatten()
        .unwrap_or_default();

    let metrics = RepMetrics {
        employee_id: rep_id.to_string(),
        employee_name,
        total_confirmed_revenue: totals.confirmed_revenue,
        total_pending_revenue: totals.pending_revenue,
        total_estimated_revenue: totals.estimated_revenue,
        average_deal_value: totals.average_deal_value,
        close_rate: totals.average_close_rate,
        total_tours_booked: totals.tours_booked,
        total_applications: totals.applications,
        tours_per_lead: totals.average_tours_per_lead,
        apps_per_tour: totals.average_apps_per_tour,
        tours_in_pipeline: totals.tours_in_pipeline,
        tours_scheduled: totals.tours_scheduled,
        tours_pending: totals.tours_pending,
        tours_cancelled: totals.tours_cancelled,
    };

    let daily_activity = DailyActivity {
        calls: frame::weekday_call_totals(&rep_rows)?,
        text_interactions: frame::weekday_text_values(&rep_rows)?,
    };

    Ok(RepPerformance {
        metrics,
        daily_activity,
    })
}
