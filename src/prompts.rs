//! Narrative prompts
//!
//! Each endpoint briefs the LLM with the numbers it just computed and asks for
//! a fixed list of analyses.

use crate::metrics::{RepPerformance, TeamPerformance};
use crate::trends::{TrendPeriod, TrendSummary};

/// `$1,234.56`; negative amounts render as `$-1,234.56`.
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("${}", value);
    }
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("${}{}.{}", sign, grouped, cents)
}

/// Ratio rendered as a percentage with one decimal, `0.153` -> `15.3%`.
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn team_prompt(team: &TeamPerformance) -> String {
    let m = &team.metrics;
    let a = &team.activity_metrics;

    let performers = if team.top_performers.is_empty() {
        "- none".to_string()
    } else {
        team.top_performers
            .iter()
            .map(|p| {
                format!(
                    "- {} ({}): {}",
                    p.employee_name,
                    p.employee_id,
                    format_currency(p.revenue_confirmed)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Analyze the following team performance metrics:

Revenue Metrics:
- Total Confirmed Revenue: {confirmed}
- Total Pending Revenue: {pending}
- Average Deal Value (30 days): {deal}
- Average Close Rate (30 days): {close}

Tour and Application Metrics:
- Total Tours Booked: {tours}
- Total Applications: {apps}
- Average Tours per Lead: {tpl:.2}
- Average Applications per Tour: {apt:.2}
- Tours in Pipeline: {pipeline}

Team Size: {employees} employees

Top Performers:
{performers}

Daily Activity:
- Tours Scheduled: {scheduled}
- Tours Pending: {pending_tours}
- Tours Cancelled: {cancelled}

Please provide:
1. Overall team performance assessment
2. Analysis of conversion metrics (tours to applications)
3. Activity level analysis and recommendations
4. Strategic recommendations for improvement"#,
        confirmed = format_currency(m.total_confirmed_revenue),
        pending = format_currency(m.total_pending_revenue),
        deal = format_currency(m.average_deal_value),
        close = format_percent(m.average_close_rate),
        tours = m.total_tours_booked,
        apps = m.total_applications,
        tpl = m.average_tours_per_lead,
        apt = m.average_apps_per_tour,
        pipeline = m.tours_in_pipeline,
        employees = m.total_employees,
        performers = performers,
        scheduled = a.tours_scheduled,
        pending_tours = a.tours_pending,
        cancelled = a.tours_cancelled,
    )
}

pub fn trends_prompt(period: TrendPeriod, summary: &TrendSummary) -> String {
    format!(
        r#"Analyze sales performance trends:

Trends Overview:
- Time Period: {period}
- Total Periods Analyzed: {periods}
- Revenue Range: {min} - {max}
- Average Tours Booked: {tours:.2}
- Average Applications: {apps:.2}

Please provide:
1. Performance trend analysis
2. Predictive insights
3. Recommendations for maintaining/improving trajectory"#,
        period = period.as_str(),
        periods = summary.periods,
        min = format_currency(summary.min_revenue),
        max = format_currency(summary.max_revenue),
        tours = summary.average_tours_booked,
        apps = summary.average_applications,
    )
}

pub fn rep_prompt(rep: &RepPerformance) -> String {
    let m = &rep.metrics;

    format!(
        r#"Analyze the performance of sales representative {id}:

Performance Metrics:
- Total Confirmed Revenue: {confirmed}
- Total Pending Revenue: {pending}
- Estimated Revenue: {estimated}
- Average Deal Value: {deal}
- Close Rate: {close}
- Total Tours Booked: {tours}
- Total Applications: {apps}
- Tours per Lead: {tpl:.2}
- Applications per Tour: {apt:.2}
- Tours in Pipeline: {pipeline}

Activity Overview:
- Tours Scheduled: {scheduled}
- Tours Pending: {pending_tours}
- Tours Cancelled: {cancelled}

Daily Calls Breakdown:
{calls}

Please provide:
1. Detailed performance assessment
2. Strengths and areas for improvement
3. Personalized coaching recommendations
4. Insights from daily activity patterns"#,
        id = m.employee_id,
        confirmed = format_currency(m.total_confirmed_revenue),
        pending = format_currency(m.total_pending_revenue),
        estimated = format_currency(m.total_estimated_revenue),
        deal = format_currency(m.average_deal_value),
        close = format_percent(m.close_rate),
        tours = m.total_tours_booked,
        apps = m.total_applications,
        tpl = m.tours_per_lead,
        apt = m.apps_per_tour,
        pipeline = m.tours_in_pipeline,
        scheduled = m.tours_scheduled,
        pending_tours = m.tours_pending,
        cancelled = m.tours_cancelled,
        calls = rep.daily_activity.calls.describe(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_grouping() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(999.5), "$999.50");
        assert_eq!(format_currency(1234.567), "$1,234.57");
        assert_eq!(format_currency(1234567.0), "$1,234,567.00");
        assert_eq!(format_currency(-4500.0), "$-4,500.00");
        assert_eq!(format_currency(f64::NAN), "$NaN");
    }

    #[test]
    fn test_percent() {
        assert_eq!(format_percent(0.153), "15.3%");
        assert_eq!(format_percent(1.0), "100.0%");
    }

    #[test]
    fn test_trends_prompt_mentions_period() {
        let summary = TrendSummary {
            periods: 3,
            min_revenue: 1000.0,
            max_revenue: 25000.0,
            average_tours_booked: 4.0,
            average_applications: 1.25,
        };
        let prompt = trends_prompt(TrendPeriod::Quarterly, &summary);
        assert!(prompt.contains("- Time Period: quarterly"));
        assert!(prompt.contains("- Total Periods Analyzed: 3"));
        assert!(prompt.contains("$1,000.00 - $25,000.00"));
        assert!(prompt.contains("- Average Applications: 1.25"));
    }
}
