//! Delivery receipts — the asynchronous hop between deciding an outcome and
//! recording it.

use async_trait::async_trait;
use crm_core::types::{CampaignLog, DeliveryStatus};
use crm_core::CrmResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::log_store::{CampaignLogStore, UpsertedLog};

/// Status callback payload, as a vendor webhook would post it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    pub campaign_id: Uuid,
    pub customer_id: Uuid,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub vendor_response: Option<String>,
}

/// Records a delivery receipt. Implementations must be idempotent per
/// (campaign, customer): reporting the same pair twice leaves one row.
#[async_trait]
pub trait DeliveryReporter: Send + Sync {
    async fn report(&self, receipt: DeliveryReceipt) -> CrmResult<CampaignLog>;
}

#[async_trait]
impl DeliveryReporter for CampaignLogStore {
    async fn report(&self, receipt: DeliveryReceipt) -> CrmResult<CampaignLog> {
        let upserted = report_delivery_outcome(
            self,
            receipt.campaign_id,
            receipt.customer_id,
            receipt.status,
            receipt.vendor_response,
        );
        Ok(upserted.log)
    }
}

/// Idempotent upsert entry point for status callbacks.
pub fn report_delivery_outcome(
    store: &CampaignLogStore,
    campaign_id: Uuid,
    customer_id: Uuid,
    status: DeliveryStatus,
    vendor_response: Option<String>,
) -> UpsertedLog {
    let upserted =
        store.upsert_log_by_campaign_customer(campaign_id, customer_id, status, vendor_response);
    tracing::debug!(
        campaign_id = %campaign_id,
        customer_id = %customer_id,
        status = status.as_str(),
        created = upserted.created,
        "Delivery outcome recorded"
    );
    upserted
}
