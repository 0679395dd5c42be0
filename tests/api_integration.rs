//! End-to-end tests for the sales insights HTTP API
//!
//! Routes are exercised against CSV fixtures in a temp directory with a
//! stubbed narrator, plus one round trip over a real TCP socket.

use async_trait::async_trait;
use sales_insights::error::{InsightsError, Result};
use sales_insights::llm::{AnalysisProvider, FALLBACK_ANALYSIS};
use sales_insights::server::{self, handle_request, route};
use sales_insights::service::SalesInsights;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const HEADER: &str = "employee_id,employee_name,revenue_confirmed,revenue_pending,estimated_revenue,\
avg_deal_value_30_days,avg_close_rate_30_days,tours_booked,applications,tours_per_lead,apps_per_tour,\
tours_in_pipeline,tours_scheduled,tours_pending,tours_cancelled,mon_call,tue_call,wed_call,thur_call,\
fri_call,sat_call,sun_call,mon_text,tue_text,wed_text,thur_text,fri_text,sat_text,sun_text,date";

struct CannedNarrator {
    calls: AtomicUsize,
}

#[async_trait]
impl AnalysisProvider for CannedNarrator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("Canned analysis".to_string())
    }
}

struct FailingNarrator;

#[async_trait]
impl AnalysisProvider for FailingNarrator {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(InsightsError::Llm("LLM API error (503): unavailable".to_string()))
    }
}

fn write_sales_csv(dir: &Path, rows: &[&str]) {
    let mut content = String::from(HEADER);
    for row in rows {
        content.push('\n');
        content.push_str(row);
    }
    content.push('\n');
    fs::write(dir.join("sales_data.csv"), content).unwrap();
}

/// Three rows, two reps, all in March 2024.
fn team_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_sales_csv(
        dir.path(),
        &[
            "emp1,Ana,100,10,110,1000,0.1,5,2,0.5,0.4,4,3,1,0,4,1,2,0,1,0,0,1,0,2,0,0,0,0,2024-03-01",
            "emp2,Ben,160,20,170,2000,0.2,2,0,0.25,0.3,2,2,1,1,6,0,0,1,0,0,0,2,0,0,0,0,0,0,2024-03-05",
            "emp1,Ana,40,30,80,3000,0.3,1,0,0.75,0.5,1,1,0,0,1,0,0,0,0,0,0,3,0,1,0,0,0,0,2024-03-20",
        ],
    );
    dir
}

fn service_with(dir: &Path, narrator: Arc<dyn AnalysisProvider>) -> SalesInsights {
    SalesInsights::new(dir, narrator)
}

fn canned_service(dir: &Path) -> (SalesInsights, Arc<CannedNarrator>) {
    let narrator = Arc::new(CannedNarrator {
        calls: AtomicUsize::new(0),
    });
    (service_with(dir, narrator.clone()), narrator)
}

fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn get(service: &SalesInsights, path: &str, params: &[(&str, &str)]) -> (u16, Value) {
    let response = route(service, "GET", path, &query(params)).await;
    let body = serde_json::from_str(&response.body).unwrap();
    (response.status, body)
}

#[tokio::test]
async fn test_team_performance_totals() {
    let dir = team_fixture();
    let (service, narrator) = canned_service(dir.path());

    let (status, body) = get(&service, "/api/team_performance", &[]).await;
    assert_eq!(status, 200);

    let metrics = &body["metrics"];
    assert_eq!(metrics["total_confirmed_revenue"].as_f64(), Some(300.0));
    assert_eq!(metrics["total_tours_booked"].as_i64(), Some(8));
    assert_eq!(metrics["total_employees"].as_i64(), Some(2));
    assert_eq!(metrics["average_deal_value"].as_f64(), Some(2000.0));

    let top = body["top_performers"].as_array().unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0]["employee_id"], "emp2");
    assert_eq!(top[0]["revenue_confirmed"].as_f64(), Some(160.0));
    assert_eq!(top[1]["employee_id"], "emp1");

    let activity = &body["activity_metrics"];
    assert_eq!(activity["tours_scheduled"].as_i64(), Some(6));
    assert_eq!(activity["daily_calls"]["Monday"].as_i64(), Some(11));
    assert_eq!(activity["daily_calls"]["Thursday"].as_i64(), Some(1));

    assert_eq!(body["analysis"], "Canned analysis");
    assert_eq!(narrator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rep_performance_for_known_rep() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let (status, body) = get(&service, "/api/rep_performance", &[("rep_id", "emp1")]).await;
    assert_eq!(status, 200);

    let metrics = &body["metrics"];
    assert_eq!(metrics["employee_id"], "emp1");
    assert_eq!(metrics["employee_name"], "Ana");
    assert_eq!(metrics["total_confirmed_revenue"].as_f64(), Some(140.0));
    assert_eq!(metrics["total_tours_booked"].as_i64(), Some(6));

    let calls = &body["daily_activity"]["Calls"];
    assert_eq!(calls["Monday"].as_i64(), Some(5));
    assert_eq!(calls["Tuesday"].as_i64(), Some(1));

    let texts = body["daily_activity"]["Daily Text Interactions"]["Monday"]
        .as_array()
        .unwrap();
    assert_eq!(texts.len(), 2);
}

#[tokio::test]
async fn test_rep_id_validation_and_not_found() {
    let dir = team_fixture();
    let (service, narrator) = canned_service(dir.path());

    let (status, body) = get(&service, "/api/rep_performance", &[]).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Rep ID is required");

    let (status, _) = get(&service, "/api/rep_performance", &[("rep_id", "")]).await;
    assert_eq!(status, 400);

    let (status, body) = get(&service, "/api/rep_performance", &[("rep_id", "emp9")]).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"], "No data found for this representative");

    assert_eq!(narrator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_single_month_trend_matches_team_total() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let (status, body) = get(&service, "/api/performance_trends", &[]).await;
    assert_eq!(status, 200);

    let trends = body["trends"].as_array().unwrap();
    assert_eq!(trends.len(), 1);
    assert_eq!(trends[0]["date"], "2024-03-31");
    assert_eq!(trends[0]["revenue_confirmed"].as_f64(), Some(300.0));
    assert_eq!(trends[0]["tours_booked"].as_i64(), Some(8));
    assert_eq!(trends[0]["applications"].as_i64(), Some(2));
}

#[tokio::test]
async fn test_quarterly_trends_fill_gaps() {
    let dir = TempDir::new().unwrap();
    write_sales_csv(
        dir.path(),
        &[
            "emp1,Ana,100,0,0,1000,0.1,1,1,0.5,0.5,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2024-01-15",
            "emp2,Ben,40,0,0,1000,0.3,2,0,0.5,0.5,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,2024-07-02",
        ],
    );
    let (service, _) = canned_service(dir.path());

    let (status, body) =
        get(&service, "/api/performance_trends", &[("time_period", "quarterly")]).await;
    assert_eq!(status, 200);

    let trends = body["trends"].as_array().unwrap();
    let dates: Vec<&str> = trends.iter().map(|t| t["date"].as_str().unwrap()).collect();
    assert_eq!(dates, vec!["2024-03-31", "2024-06-30", "2024-09-30"]);
    assert_eq!(trends[1]["revenue_confirmed"].as_f64(), Some(0.0));
    assert!(trends[1]["avg_close_rate_30_days"].is_null());
    assert_eq!(trends[2]["revenue_confirmed"].as_f64(), Some(40.0));
}

#[tokio::test]
async fn test_invalid_time_period() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let (status, body) =
        get(&service, "/api/performance_trends", &[("time_period", "weekly")]).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "Invalid time period. Use 'monthly' or 'quarterly'");
}

#[tokio::test]
async fn test_missing_data_fails_every_endpoint() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), "no data here").unwrap();
    let (service, _) = canned_service(dir.path());

    for (path, params) in [
        ("/api/team_performance", vec![]),
        ("/api/performance_trends", vec![]),
        ("/api/rep_performance", vec![("rep_id", "emp1")]),
    ] {
        let (status, body) = get(&service, path, &params).await;
        assert_eq!(status, 500, "{}", path);
        assert_eq!(body["error"], "Failed to load sales data");
    }
}

#[tokio::test]
async fn test_narrator_failure_uses_fallback() {
    let dir = team_fixture();
    let service = service_with(dir.path(), Arc::new(FailingNarrator));

    let (status, body) = get(&service, "/api/team_performance", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(body["analysis"], FALLBACK_ANALYSIS);
    assert_eq!(body["metrics"]["total_confirmed_revenue"].as_f64(), Some(300.0));
}

#[tokio::test]
async fn test_routing_edges() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let response = route(&service, "OPTIONS", "/api/team_performance", &HashMap::new()).await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let response = route(&service, "GET", "/api/unknown", &HashMap::new()).await;
    assert_eq!(response.status, 404);

    let response = route(&service, "POST", "/api/team_performance", &HashMap::new()).await;
    assert_eq!(response.status, 405);

    let (status, body) = get(&service, "/api/health", &[]).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_raw_request_parsing() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let response = handle_request(
        &service,
        "GET /api/rep_performance?rep_id=emp2 HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await;
    assert_eq!(response.status, 200);
    let body: Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["metrics"]["employee_name"], "Ben");

    let response = handle_request(&service, "garbage").await;
    assert_eq!(response.status, 400);
}

#[tokio::test]
async fn test_serves_over_tcp() {
    let dir = team_fixture();
    let (service, _) = canned_service(dir.path());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(server::serve(listener, Arc::new(service)));

    let response = reqwest::get(format!("http://{}/api/team_performance", addr))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["metrics"]["total_employees"].as_i64(), Some(2));

    server.abort();
}
