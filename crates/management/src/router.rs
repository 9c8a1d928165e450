//! CRM API router — mounts every endpoint under /api plus /health.

use crate::handlers::{self, CrmState};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the CRM router over `state`.
pub fn crm_router(state: CrmState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Customers
        .route(
            "/api/customers",
            get(handlers::list_customers).post(handlers::create_customer),
        )
        .route(
            "/api/customers/:id",
            put(handlers::update_customer).delete(handlers::delete_customer),
        )
        // Orders
        .route(
            "/api/orders",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/api/orders/:id", delete(handlers::delete_order))
        // Campaigns
        .route(
            "/api/campaigns",
            get(handlers::list_campaigns).post(handlers::create_campaign),
        )
        .route("/api/campaigns/:id", delete(handlers::delete_campaign))
        .route(
            "/api/campaigns/:id/performance",
            get(handlers::campaign_performance),
        )
        .route("/api/segments/preview", post(handlers::preview_segment))
        // Delivery logs
        .route(
            "/api/logs",
            get(handlers::list_logs).post(handlers::create_log),
        )
        .route("/api/logs/update-status", post(handlers::update_log_status))
        .route("/api/vendor/send-message", post(handlers::send_message))
        // AI helpers
        .route("/api/ai/suggest-message", post(handlers::suggest_message))
        .route(
            "/api/ai/summarize-performance",
            post(handlers::summarize_performance),
        )
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
