//! CRM server — customer segmentation, simulated campaign delivery and AI
//! copy helpers behind one REST API.

mod server;

use clap::Parser;
use crm_ai::GeminiClient;
use crm_core::config::AppConfig;
use crm_delivery::VendorSimulator;
use crm_management::{CrmState, CrmStore};
use server::CrmServer;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "crm-server")]
#[command(about = "CRM backend with audience segmentation and simulated campaign delivery")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "CRM__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CRM__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Prometheus exporter port (overrides config)
    #[arg(long, env = "CRM__METRICS__PORT")]
    metrics_port: Option<u16>,

    /// Simulated vendor success probability in [0, 1]
    #[arg(long, env = "CRM__DELIVERY__SUCCESS_RATE")]
    success_rate: Option<f64>,

    /// Gemini API key for the AI helpers
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Load a handful of demo customers at startup
    #[arg(long, default_value_t = false)]
    seed_demo_data: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_server=info,crm_delivery=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("CRM server starting up");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(port) = cli.metrics_port {
        config.metrics.port = port;
    }
    if let Some(rate) = cli.success_rate {
        config.delivery.success_rate = rate;
    }
    if cli.gemini_api_key.is_some() {
        config.ai.api_key = cli.gemini_api_key;
    }
    if cli.seed_demo_data {
        config.seed_demo_data = true;
    }
    config.validate()?;

    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        metrics_port = config.metrics.port,
        success_rate = config.delivery.success_rate,
        ai_enabled = config.ai.api_key.is_some(),
        "Configuration loaded"
    );

    let store = Arc::new(CrmStore::new());
    if config.seed_demo_data {
        store.seed_demo_data();
    }
    let vendor = Arc::new(VendorSimulator::from_config(&config.delivery));
    let generator = Arc::new(GeminiClient::new(config.ai.clone())?);
    let state = CrmState::new(store, vendor, generator).with_node_id(config.node_id.clone());

    let server = CrmServer::new(config, state);
    if let Err(e) = server.start_metrics() {
        error!(error = %e, "Failed to start metrics exporter");
    }

    info!("CRM server is ready to serve traffic");

    server.start_http(shutdown_signal()).await?;

    // Let launched campaigns finish recording their outcomes.
    server.orchestrator().shutdown().await;
    info!("CRM server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining");
}
