//! Sales insights API server

use anyhow::{Context, Result};
use clap::Parser;
use sales_insights::config::AppConfig;
use sales_insights::llm::LlmClient;
use sales_insights::server;
use sales_insights::service::SalesInsights;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sales-insights")]
#[command(about = "Sales performance metrics and AI analysis over a sales CSV")]
struct Args {
    /// Directory containing the *sales*.csv file (or set SALES_DATA_DIR)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Bind host (or set SALES_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (or set SALES_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Chat-completion model (or set OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env();
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model) = args.model {
        config.llm.model = model;
    }

    if config.llm.api_key.is_some() {
        info!("OpenAI API key found, analysis uses model {}", config.llm.model);
    } else {
        warn!("OPENAI_API_KEY not set, analysis will use the fallback text");
    }

    let narrator = Arc::new(LlmClient::from_config(&config.llm));
    let service = Arc::new(SalesInsights::from_config(&config, narrator));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(
        "Sales insights server listening on http://{} (data dir: {})",
        addr,
        config.data_dir.display()
    );

    server::serve(listener, service).await?;
    Ok(())
}
