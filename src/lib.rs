pub mod config;
pub mod error;
pub mod frame;
pub mod llm;
pub mod loader;
pub mod metrics;
pub mod prompts;
pub mod server;
pub mod service;
pub mod trends;

pub use config::AppConfig;
pub use error::{InsightsError, Result};
pub use llm::{AnalysisProvider, LlmClient};
pub use service::SalesInsights;
