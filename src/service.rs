//! The three sales-insight operations behind the HTTP routes.
//!
//! Every call reloads the CSV, so responses always reflect the file on disk.

use crate::config::AppConfig;
use crate::error::{InsightsError, Result};
use crate::llm::{generate_analysis, AnalysisProvider};
use crate::loader;
use crate::metrics::{
    self, ActivityMetrics, DailyActivity, RepMetrics, TeamMetrics, TopPerformer,
};
use crate::prompts;
use crate::trends::{self, TrendBucket, TrendPeriod, TrendSummary};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct TeamPerformanceResponse {
    pub metrics: TeamMetrics,
    pub top_performers: Vec<TopPerformer>,
    pub activity_metrics: ActivityMetrics,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendsResponse {
    pub trends: Vec<TrendBucket>,
    pub analysis: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepPerformanceResponse {
    pub metrics: RepMetrics,
    pub daily_activity: DailyActivity,
    pub analysis: String,
}

pub struct SalesInsights {
    data_dir: PathBuf,
    narrator: Arc<dyn AnalysisProvider>,
}

impl SalesInsights {
    pub fn new(data_dir: impl Into<PathBuf>, narrator: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            data_dir: data_dir.into(),
            narrator,
        }
    }

    pub fn from_config(config: &AppConfig, narrator: Arc<dyn AnalysisProvider>) -> Self {
        Self::new(config.data_dir.clone(), narrator)
    }

    fn load(&self) -> Result<DataFrame> {
        let df = loader::load_sales_data(&self.data_dir);
        if df.height() == 0 {
            return Err(InsightsError::DataUnavailable(
                "Failed to load sales data".to_string(),
            ));
        }
        Ok(df)
    }

    async fn narrate(&self, prompt: &str) -> String {
        generate_analysis(self.narrator.as_ref(), prompt).await
    }

    pub async fn team_performance(&self) -> Result<TeamPerformanceResponse> {
        let df = self.load()?;
        let team = metrics::team_performance(&df)?;
        info!(
            "Team performance over {} rows, {} employees",
            df.height(),
            team.metrics.total_employees
        );

        let analysis = self.narrate(&prompts::team_prompt(&team)).await;
        Ok(TeamPerformanceResponse {
            metrics: team.metrics,
            top_performers: team.top_performers,
            activity_metrics: team.activity_metrics,
            analysis,
        })
    }

    /// `time_period` defaults to monthly when absent.
    pub async fn performance_trends(&self, time_period: Option<&str>) -> Result<TrendsResponse> {
        let df = self.load()?;
        let period = match time_period {
            Some(raw) => raw.parse::<TrendPeriod>()?,
            None => TrendPeriod::default(),
        };

        let buckets = trends::compute_trends(&df, period)?;
        info!("Computed {} {} trend buckets", buckets.len(), period.as_str());

        let summary = TrendSummary::from_buckets(&buckets);
        let analysis = self.narrate(&prompts::trends_prompt(period, &summary)).await;
        Ok(TrendsResponse {
            trends: buckets,
            analysis,
        })
    }

    pub async fn rep_performance(&self, rep_id: Option<&str>) -> Result<RepPerformanceResponse> {
        let rep_id = rep_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| InsightsError::Validation("Rep ID is required".to_string()))?;

        let df = self.load()?;
        let rep = metrics::rep_performance(&df, rep_id)?;
        info!("Rep {} performance computed for {}", rep_id, rep.metrics.employee_name);

        let analysis = self.narrate(&prompts::rep_prompt(&rep)).await;
        Ok(RepPerformanceResponse {
            metrics: rep.metrics,
            daily_activity: rep.daily_activity,
            analysis,
        })
    }
}
