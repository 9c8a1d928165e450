//! Campaign performance derived from delivery logs. Nothing here is stored;
//! it is recomputed on every read.

use crm_core::types::{Campaign, CampaignLog, Customer, DeliveryStatus};
use crm_segmentation::{Segment, SegmentEvaluator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Spend above which a customer counts as high value in summaries.
pub const HIGH_VALUE_SPEND: f64 = 10_000.0;

const MAX_RESPONSE_EXAMPLES: usize = 3;

/// Where `audience_size` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudienceSource {
    /// Delivery has produced logs; the size is the log count.
    Logs,
    /// No logs yet; the size is the campaign filters re-run over customers.
    FilterEstimate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignPerformance {
    pub campaign_id: Uuid,
    pub campaign_name: String,
    pub audience_size: usize,
    pub audience_source: AudienceSource,
    pub sent: usize,
    pub failed: usize,
    pub delivery_rate: f64,
    pub high_value_group_count: usize,
    /// `None` when no high-value customer was targeted.
    pub high_value_delivery_rate: Option<f64>,
    pub vendor_response_examples: Vec<String>,
}

impl CampaignPerformance {
    /// Aggregate `logs` (all belonging to `campaign`) against the current
    /// customer base.
    pub fn compute(campaign: &Campaign, logs: &[CampaignLog], customers: &[Customer]) -> Self {
        let sent = logs.iter().filter(|l| l.status == DeliveryStatus::Sent).count();
        let failed = logs.iter().filter(|l| l.status == DeliveryStatus::Failed).count();

        let (audience_size, audience_source) = if logs.is_empty() {
            let segment = Segment::new(campaign.filters.clone(), campaign.logic);
            (
                SegmentEvaluator::new().audience_size(customers, &segment),
                AudienceSource::FilterEstimate,
            )
        } else {
            (logs.len(), AudienceSource::Logs)
        };

        let spend_by_customer: HashMap<Uuid, f64> =
            customers.iter().map(|c| (c.id, c.total_spend)).collect();
        let high_value: Vec<&CampaignLog> = logs
            .iter()
            .filter(|l| {
                spend_by_customer
                    .get(&l.customer)
                    .is_some_and(|spend| *spend > HIGH_VALUE_SPEND)
            })
            .collect();
        let high_value_sent = high_value
            .iter()
            .filter(|l| l.status == DeliveryStatus::Sent)
            .count();

        let vendor_response_examples = logs
            .iter()
            .filter_map(|l| l.vendor_response.clone())
            .filter(|r| !r.is_empty())
            .take(MAX_RESPONSE_EXAMPLES)
            .collect();

        Self {
            campaign_id: campaign.id,
            campaign_name: campaign.name.clone(),
            audience_size,
            audience_source,
            sent,
            failed,
            delivery_rate: ratio(sent, audience_size),
            high_value_group_count: high_value.len(),
            high_value_delivery_rate: (!high_value.is_empty())
                .then(|| ratio(high_value_sent, high_value.len())),
            vendor_response_examples,
        }
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crm_core::types::{CampaignStatus, FilterRule, Logic};

    fn campaign() -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            name: "Diwali Offers".to_string(),
            created_by: "admin".to_string(),
            filters: vec![FilterRule::new("minSpend", 1000)],
            logic: Logic::And,
            message: "Flat 20% off".to_string(),
            objective: None,
            status: CampaignStatus::Sent,
            created_at: now,
            updated_at: now,
        }
    }

    fn customer(spend: f64) -> Customer {
        let mut c = Customer::new("Kiran", format!("kiran{}@example.com", spend));
        c.total_spend = spend;
        c
    }

    fn log(campaign: Uuid, customer: Uuid, status: DeliveryStatus) -> CampaignLog {
        let now = Utc::now();
        CampaignLog {
            id: Uuid::new_v4(),
            campaign,
            customer,
            status,
            vendor_response: Some(format!("{:?}", status)),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_audience_falls_back_to_filter_estimate() {
        let campaign = campaign();
        let customers = vec![customer(500.0), customer(1500.0), customer(20_000.0)];

        let perf = CampaignPerformance::compute(&campaign, &[], &customers);
        assert_eq!(perf.audience_source, AudienceSource::FilterEstimate);
        assert_eq!(perf.audience_size, 2);
        assert_eq!(perf.sent, 0);
        assert_eq!(perf.delivery_rate, 0.0);
        assert!(perf.high_value_delivery_rate.is_none());
    }

    #[test]
    fn test_counts_from_logs() {
        let campaign = campaign();
        let customers = vec![customer(1500.0), customer(20_000.0), customer(30_000.0)];
        let logs = vec![
            log(campaign.id, customers[0].id, DeliveryStatus::Sent),
            log(campaign.id, customers[1].id, DeliveryStatus::Sent),
            log(campaign.id, customers[2].id, DeliveryStatus::Failed),
        ];

        let perf = CampaignPerformance::compute(&campaign, &logs, &customers);
        assert_eq!(perf.audience_source, AudienceSource::Logs);
        assert_eq!(perf.audience_size, 3);
        assert_eq!(perf.sent, 2);
        assert_eq!(perf.failed, 1);
        assert_eq!(perf.sent + perf.failed, perf.audience_size);
        assert_eq!(perf.high_value_group_count, 2);
        assert_eq!(perf.high_value_delivery_rate, Some(0.5));
        assert_eq!(perf.vendor_response_examples.len(), 3);
    }

    #[test]
    fn test_logs_win_over_filters_even_when_filters_changed() {
        let campaign = campaign();
        let customers = vec![customer(10.0)];
        let logs = vec![log(campaign.id, customers[0].id, DeliveryStatus::Sent)];

        let perf = CampaignPerformance::compute(&campaign, &logs, &customers);
        assert_eq!(perf.audience_size, 1);
        assert_eq!(perf.delivery_rate, 1.0);
    }
}
