//! HTTP and metrics listeners for the CRM service.

use crm_core::config::AppConfig;
use crm_delivery::DeliveryOrchestrator;
use crm_management::{crm_router, CrmState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub struct CrmServer {
    config: AppConfig,
    state: CrmState,
}

impl CrmServer {
    pub fn new(config: AppConfig, state: CrmState) -> Self {
        Self { config, state }
    }

    pub fn orchestrator(&self) -> Arc<DeliveryOrchestrator> {
        self.state.orchestrator.clone()
    }

    /// Serve the REST API until `shutdown` resolves.
    pub async fn start_http(
        &self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> anyhow::Result<()> {
        let app = crm_router(self.state.clone());
        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    /// Start the Prometheus exporter on its own port.
    pub fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
