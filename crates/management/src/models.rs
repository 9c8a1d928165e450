//! API request/response types for the CRM endpoints. Domain records live in
//! `crm_core::types`; these are only the shapes that cross the HTTP boundary.

use chrono::{DateTime, Utc};
use crm_core::types::{Campaign, DeliveryStatus, FilterInput, Logic, OrderStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Customers ─────────────────────────────────────────────────────────────

/// Required fields are optional here so a missing one is reported as a
/// validation error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub total_spend: Option<f64>,
    #[serde(default)]
    pub visits: Option<u64>,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub total_spend: Option<f64>,
    pub visits: Option<u64>,
    pub last_active: Option<DateTime<Utc>>,
}

// ─── Orders ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: OrderStatus,
}

// ─── Campaigns ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Rule list or the legacy `{"minSpend": ..}` object.
    #[serde(default)]
    pub filters: Option<FilterInput>,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignCreatedResponse {
    pub campaign: Campaign,
    pub matched_customers: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct SegmentPreviewRequest {
    #[serde(default)]
    pub filters: FilterInput,
    #[serde(default)]
    pub logic: Logic,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentPreviewResponse {
    pub audience_size: usize,
}

// ─── Logs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub campaign: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLogRequest {
    #[serde(default)]
    pub campaign: Option<Uuid>,
    #[serde(default)]
    pub customer: Option<Uuid>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
    #[serde(default)]
    pub vendor_response: Option<String>,
}

/// Delivery receipt callback body.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    #[serde(default)]
    pub campaign_id: Option<Uuid>,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<DeliveryStatus>,
    #[serde(default)]
    pub vendor_response: Option<String>,
}

// ─── Vendor ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub campaign_id: Option<Uuid>,
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub status: &'static str,
    pub delivery_status: DeliveryStatus,
}

// ─── AI ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SuggestMessageRequest {
    #[serde(default)]
    pub objective: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummarizeRequest {
    #[serde(default)]
    pub stats: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

// ─── Misc ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub node_id: String,
    pub customers: usize,
    pub campaigns: usize,
    pub deliveries_in_flight: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Trimmed value of a required text field, or a validation message naming it.
pub fn required_text(value: Option<String>, field: &str) -> Result<String, String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("{} is required", field)),
    }
}
