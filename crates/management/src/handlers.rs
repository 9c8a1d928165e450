//! Axum REST handlers for the CRM API.

use crate::models::*;
use crate::store::CrmStore;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crm_ai::{CampaignAssistant, MessageSuggestions, TextGenerator};
use crm_core::types::{Campaign, CampaignLog, Customer, Order};
use crm_core::CrmError;
use crm_delivery::{
    CampaignPerformance, DeliveryOrchestrator, DeliveryReceipt, DeliveryReporter, VendorSimulator,
};
use crm_segmentation::Segment;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Shared handler state.
#[derive(Clone)]
pub struct CrmState {
    pub store: Arc<CrmStore>,
    /// Reports through the store, so deleted campaigns stop accepting logs.
    pub orchestrator: Arc<DeliveryOrchestrator>,
    pub vendor: Arc<VendorSimulator>,
    /// Where single vendor sends land: the raw log table, like the status
    /// callback.
    pub reporter: Arc<dyn DeliveryReporter>,
    pub assistant: Arc<CampaignAssistant>,
    pub node_id: String,
}

impl CrmState {
    pub fn new(
        store: Arc<CrmStore>,
        vendor: Arc<VendorSimulator>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        let campaign_reporter: Arc<dyn DeliveryReporter> = store.clone();
        let orchestrator = Arc::new(DeliveryOrchestrator::new(vendor.clone(), campaign_reporter));
        let reporter: Arc<dyn DeliveryReporter> = store.log_store();
        Self {
            store,
            orchestrator,
            vendor,
            reporter,
            assistant: Arc::new(CampaignAssistant::new(generator)),
            node_id: "crm-01".to_string(),
        }
    }

    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = node_id.into();
        self
    }
}

// ─── Errors ────────────────────────────────────────────────────────────────

/// [`CrmError`] rendered as `{"error", "message"}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub CrmError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CrmError::Validation(_) | CrmError::Serialization(_) => StatusCode::BAD_REQUEST,
            CrmError::NotFound { .. } => StatusCode::NOT_FOUND,
            CrmError::Conflict(_) => StatusCode::CONFLICT,
            CrmError::TextGeneration(_) => StatusCode::BAD_GATEWAY,
            CrmError::DeliveryReporting { .. }
            | CrmError::Config(_)
            | CrmError::Io(_)
            | CrmError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CrmError> for ApiError {
    fn from(err: CrmError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(CrmError::Validation(rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(CrmError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(CrmError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            error: self.0.code().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ─── Health ────────────────────────────────────────────────────────────────

pub async fn health(State(state): State<CrmState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        node_id: state.node_id.clone(),
        customers: state.store.customer_count(),
        campaigns: state.store.campaign_count(),
        deliveries_in_flight: state.orchestrator.in_flight(),
    })
}

// ─── Customers ─────────────────────────────────────────────────────────────

pub async fn list_customers(State(state): State<CrmState>) -> Json<Vec<Customer>> {
    Json(state.store.list_customers())
}

pub async fn create_customer(
    State(state): State<CrmState>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(req) = payload?;
    let customer = state.store.create_customer(req)?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn update_customer(
    State(state): State<CrmState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    let Json(req) = payload?;
    Ok(Json(state.store.update_customer(id, req)?))
}

pub async fn delete_customer(
    State(state): State<CrmState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.store.delete_customer(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Orders ────────────────────────────────────────────────────────────────

pub async fn list_orders(State(state): State<CrmState>) -> Json<Vec<Order>> {
    Json(state.store.list_orders())
}

pub async fn create_order(
    State(state): State<CrmState>,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let Json(req) = payload?;
    let order = state.store.place_order(req)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn delete_order(
    State(state): State<CrmState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.store.delete_order(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

pub async fn list_campaigns(State(state): State<CrmState>) -> Json<Vec<Campaign>> {
    Json(state.store.list_campaigns())
}

/// Create the campaign, evaluate its audience and launch delivery. Responds
/// once every attempt is issued, without waiting for outcomes.
pub async fn create_campaign(
    State(state): State<CrmState>,
    payload: Result<Json<CreateCampaignRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CampaignCreatedResponse>)> {
    let Json(req) = payload?;
    let campaign = state.store.create_campaign(req)?;
    let audience = state.store.campaign_audience(&campaign);
    let handle = state.orchestrator.launch_campaign(&campaign, &audience);
    let campaign = state.store.mark_campaign_sent(campaign.id)?;

    Ok((
        StatusCode::CREATED,
        Json(CampaignCreatedResponse {
            campaign,
            matched_customers: handle.attempts(),
        }),
    ))
}

pub async fn delete_campaign(
    State(state): State<CrmState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    state.store.delete_campaign(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn campaign_performance(
    State(state): State<CrmState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<CampaignPerformance>> {
    let Path(id) = path?;
    Ok(Json(state.store.campaign_performance(id)?))
}

pub async fn preview_segment(
    State(state): State<CrmState>,
    payload: Result<Json<SegmentPreviewRequest>, JsonRejection>,
) -> ApiResult<Json<SegmentPreviewResponse>> {
    let Json(req) = payload?;
    let segment = Segment::new(req.filters.into_rules(), req.logic);
    let audience_size = state.store.preview_audience(&segment)?;
    Ok(Json(SegmentPreviewResponse { audience_size }))
}

// ─── Logs ──────────────────────────────────────────────────────────────────

pub async fn list_logs(
    State(state): State<CrmState>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<CampaignLog>>> {
    let Query(query) = query?;
    Ok(Json(state.store.list_logs(query.campaign)))
}

pub async fn create_log(
    State(state): State<CrmState>,
    payload: Result<Json<CreateLogRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CampaignLog>)> {
    let Json(req) = payload?;
    let log = state.store.create_log(req)?;
    Ok((StatusCode::CREATED, Json(log)))
}

/// Delivery receipt callback. 201 when the row is new, 200 when it replaced
/// an earlier outcome.
pub async fn update_log_status(
    State(state): State<CrmState>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CampaignLog>)> {
    let Json(req) = payload?;
    let upserted = state.store.update_log_status(req)?;
    let status = if upserted.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upserted.log)))
}

// ─── Vendor simulation ─────────────────────────────────────────────────────

/// Simulated vendor send for a single recipient: draw an outcome, then report
/// it through the receipt path.
pub async fn send_message(
    State(state): State<CrmState>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<Json<SendMessageResponse>> {
    let Json(req) = payload?;
    let (Some(campaign_id), Some(customer_id)) = (req.campaign_id, req.customer_id) else {
        return Err(CrmError::validation("campaignId and customerId are required").into());
    };
    required_text(req.message, "message").map_err(CrmError::Validation)?;

    let outcome = state.vendor.attempt();
    metrics::counter!("delivery.attempts", "status" => outcome.status.as_str()).increment(1);
    let receipt = DeliveryReceipt {
        campaign_id,
        customer_id,
        status: outcome.status,
        vendor_response: Some(outcome.vendor_response),
    };
    state.reporter.report(receipt).await.map_err(|e| {
        metrics::counter!("delivery.reporting_errors").increment(1);
        CrmError::DeliveryReporting {
            campaign_id,
            customer_id,
            reason: e.to_string(),
        }
    })?;

    Ok(Json(SendMessageResponse {
        status: "processed",
        delivery_status: outcome.status,
    }))
}

// ─── AI helpers ────────────────────────────────────────────────────────────

pub async fn suggest_message(
    State(state): State<CrmState>,
    payload: Result<Json<SuggestMessageRequest>, JsonRejection>,
) -> ApiResult<Json<MessageSuggestions>> {
    let Json(req) = payload?;
    let objective = req.objective.unwrap_or_default();
    Ok(Json(state.assistant.suggest_messages(&objective).await?))
}

pub async fn summarize_performance(
    State(state): State<CrmState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> ApiResult<Json<SummaryResponse>> {
    let Json(req) = payload?;
    let summary = state.assistant.summarize_performance(&req.stats).await?;
    Ok(Json(SummaryResponse { summary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (CrmError::validation("bad"), StatusCode::BAD_REQUEST),
            (CrmError::not_found("campaign", "x"), StatusCode::NOT_FOUND),
            (CrmError::Conflict("dup".into()), StatusCode::CONFLICT),
            (CrmError::TextGeneration("down".into()), StatusCode::BAD_GATEWAY),
            (
                CrmError::DeliveryReporting {
                    campaign_id: Uuid::new_v4(),
                    customer_id: Uuid::new_v4(),
                    reason: "store offline".into(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }

    #[test]
    fn test_error_response_status() {
        let response = ApiError(CrmError::Conflict("dup".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
