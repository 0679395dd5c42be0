use crate::config::LlmConfig;
use crate::error::{InsightsError, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Returned in place of the narrative whenever the completion call fails.
pub const FALLBACK_ANALYSIS: &str = "Unable to generate AI analysis at this time.";

/// Anything that can turn a prompt into free text.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Best-effort narrative: provider errors are logged and replaced by
/// [`FALLBACK_ANALYSIS`], never returned to the caller.
pub async fn generate_analysis(provider: &dyn AnalysisProvider, prompt: &str) -> String {
    match provider.complete(prompt).await {
        Ok(text) => text,
        Err(e) => {
            warn!("LLM Analysis Error: {}", e);
            FALLBACK_ANALYSIS.to_string()
        }
    }
}

/// OpenAI-compatible chat-completion client.
#[derive(Clone)]
pub struct LlmClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(api_key: Option<String>, model: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self::new(
            config.api_key.clone(),
            config.model.clone(),
            config.base_url.clone(),
        )
    }

    pub async fn call_llm(&self, prompt: &str) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| InsightsError::Llm("OPENAI_API_KEY is not set".to_string()))?;

        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
        });

        debug!("Requesting completion from {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InsightsError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(InsightsError::Llm(format!(
                "LLM API error ({}): {}",
                status, error_text
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| InsightsError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

#[async_trait]
impl AnalysisProvider for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.call_llm(prompt).await
    }
}

/// Pull `choices[0].message.content` out of a chat-completion body.
fn extract_content(response_json: &serde_json::Value) -> Result<String> {
    if let Some(error) = response_json.get("error") {
        return Err(InsightsError::Llm(format!("LLM API error: {}", error)));
    }

    let first = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .ok_or_else(|| InsightsError::Llm("No choices in LLM response".to_string()))?;

    if first.get("finish_reason").and_then(|r| r.as_str()) == Some("length") {
        warn!("LLM response was truncated due to length limit");
    }

    let content = first["message"]["content"]
        .as_str()
        .ok_or_else(|| InsightsError::Llm("No content in LLM response".to_string()))?;

    if content.is_empty() {
        return Err(InsightsError::Llm("Empty content in LLM response".to_string()));
    }

    Ok(content.to_string())
}
