//! Delivery orchestrator — one independent task per audience member.
//!
//! `launch_campaign` returns as soon as every attempt is spawned. A supervisor
//! task joins the attempts and publishes a [`DeliverySummary`]; the
//! orchestrator counts supervisors in flight so `shutdown` can drain them.

use crm_core::types::{Campaign, Customer, DeliveryStatus};
use crm_core::{CrmError, CrmResult};
use crm_segmentation::{Segment, SegmentEvaluator};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::reporter::{DeliveryReceipt, DeliveryReporter};
use crate::vendor::VendorSimulator;

/// Final tally for one campaign launch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySummary {
    pub campaign_id: Uuid,
    pub attempted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Attempts whose outcome was decided but never recorded.
    pub reporting_errors: usize,
}

enum AttemptResult {
    Recorded(DeliveryStatus),
    ReportingFailed,
}

/// Handle to an in-flight launch. Dropping it does not cancel delivery.
pub struct DeliveryHandle {
    campaign_id: Uuid,
    attempts: usize,
    done: oneshot::Receiver<DeliverySummary>,
}

impl DeliveryHandle {
    pub fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }

    /// Number of attempts issued.
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Wait until every attempt has finished reporting.
    pub async fn wait(self) -> CrmResult<DeliverySummary> {
        self.done.await.map_err(|_| {
            CrmError::Internal(anyhow::anyhow!(
                "delivery supervisor for campaign {} exited without a summary",
                self.campaign_id
            ))
        })
    }
}

/// Decrements the in-flight counter when the supervisor finishes, even by panic.
struct InFlightGuard(Arc<watch::Sender<usize>>);

impl InFlightGuard {
    fn acquire(tx: &Arc<watch::Sender<usize>>) -> Self {
        tx.send_modify(|n| *n += 1);
        Self(tx.clone())
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub struct DeliveryOrchestrator {
    vendor: Arc<VendorSimulator>,
    reporter: Arc<dyn DeliveryReporter>,
    in_flight: Arc<watch::Sender<usize>>,
}

impl DeliveryOrchestrator {
    pub fn new(vendor: Arc<VendorSimulator>, reporter: Arc<dyn DeliveryReporter>) -> Self {
        let (in_flight, _) = watch::channel(0);
        Self {
            vendor,
            reporter,
            in_flight: Arc::new(in_flight),
        }
    }

    /// Evaluate the campaign's filters over `candidates`, then launch to the
    /// matching audience.
    pub fn launch_for_customers(
        &self,
        campaign: &Campaign,
        candidates: &[Customer],
    ) -> DeliveryHandle {
        let segment = Segment::new(campaign.filters.clone(), campaign.logic);
        let audience: Vec<Customer> = SegmentEvaluator::new()
            .evaluate(candidates, &segment)
            .into_iter()
            .cloned()
            .collect();
        self.launch_campaign(campaign, &audience)
    }

    /// Issue one send attempt per audience member. Must be called from within
    /// a tokio runtime.
    pub fn launch_campaign(&self, campaign: &Campaign, audience: &[Customer]) -> DeliveryHandle {
        let campaign_id = campaign.id;
        let mut attempts = JoinSet::new();

        for customer in audience {
            let vendor = self.vendor.clone();
            let reporter = self.reporter.clone();
            let customer_id = customer.id;
            attempts.spawn(async move {
                let outcome = vendor.attempt();
                metrics::counter!("delivery.attempts", "status" => outcome.status.as_str())
                    .increment(1);
                debug!(
                    campaign_id = %campaign_id,
                    customer_id = %customer_id,
                    status = outcome.status.as_str(),
                    "Vendor outcome drawn"
                );

                let receipt = DeliveryReceipt {
                    campaign_id,
                    customer_id,
                    status: outcome.status,
                    vendor_response: Some(outcome.vendor_response),
                };
                match reporter.report(receipt).await {
                    Ok(_) => AttemptResult::Recorded(outcome.status),
                    Err(e) => {
                        let err = CrmError::DeliveryReporting {
                            campaign_id,
                            customer_id,
                            reason: e.to_string(),
                        };
                        warn!(error = %err, "Delivery outcome lost");
                        metrics::counter!("delivery.reporting_errors").increment(1);
                        AttemptResult::ReportingFailed
                    }
                }
            });
        }

        let issued = audience.len();
        info!(
            campaign_id = %campaign_id,
            campaign = %campaign.name,
            attempts = issued,
            "Campaign delivery launched"
        );
        metrics::counter!("delivery.launches").increment(1);

        let (done_tx, done_rx) = oneshot::channel();
        let guard = InFlightGuard::acquire(&self.in_flight);
        tokio::spawn(async move {
            let _guard = guard;
            let summary = drain(campaign_id, issued, attempts).await;
            info!(
                campaign_id = %campaign_id,
                sent = summary.sent,
                failed = summary.failed,
                reporting_errors = summary.reporting_errors,
                "Campaign delivery finished"
            );
            let _ = done_tx.send(summary);
        });

        DeliveryHandle {
            campaign_id,
            attempts: issued,
            done: done_rx,
        }
    }

    /// Launches whose attempts are still running.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    /// Wait for every launched campaign to finish reporting.
    pub async fn shutdown(&self) {
        let mut rx = self.in_flight.subscribe();
        let pending = *rx.borrow();
        if pending > 0 {
            info!(pending, "Waiting for in-flight deliveries");
        }
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

async fn drain(
    campaign_id: Uuid,
    attempted: usize,
    mut attempts: JoinSet<AttemptResult>,
) -> DeliverySummary {
    let mut summary = DeliverySummary {
        campaign_id,
        attempted,
        ..Default::default()
    };
    while let Some(joined) = attempts.join_next().await {
        match joined {
            Ok(AttemptResult::Recorded(DeliveryStatus::Sent)) => summary.sent += 1,
            Ok(AttemptResult::Recorded(DeliveryStatus::Failed)) => summary.failed += 1,
            Ok(AttemptResult::ReportingFailed) => summary.reporting_errors += 1,
            Err(e) => {
                warn!(campaign_id = %campaign_id, error = %e, "Delivery attempt aborted");
                metrics::counter!("delivery.reporting_errors").increment(1);
                summary.reporting_errors += 1;
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::CampaignLogStore;
    use crate::vendor::FixedDecider;
    use async_trait::async_trait;
    use chrono::Utc;
    use crm_core::types::{CampaignLog, CampaignStatus, FilterRule, Logic};

    fn campaign(filters: Vec<FilterRule>) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: Uuid::new_v4(),
            name: "Win-back High Spenders".to_string(),
            created_by: "admin".to_string(),
            filters,
            logic: Logic::And,
            message: "We miss you!".to_string(),
            objective: None,
            status: CampaignStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    fn spender(spend: f64) -> Customer {
        let mut c = Customer::new("Meera", format!("meera{}@example.com", spend));
        c.total_spend = spend;
        c
    }

    fn orchestrator(
        decider: FixedDecider,
        reporter: Arc<dyn DeliveryReporter>,
    ) -> DeliveryOrchestrator {
        DeliveryOrchestrator::new(Arc::new(VendorSimulator::new(Arc::new(decider))), reporter)
    }

    /// Fails every report for one customer, forwards the rest.
    struct FlakyReporter {
        inner: Arc<CampaignLogStore>,
        broken_customer: Uuid,
    }

    #[async_trait]
    impl DeliveryReporter for FlakyReporter {
        async fn report(&self, receipt: DeliveryReceipt) -> CrmResult<CampaignLog> {
            if receipt.customer_id == self.broken_customer {
                return Err(CrmError::Internal(anyhow::anyhow!("callback endpoint down")));
            }
            self.inner.report(receipt).await
        }
    }

    /// Panics on every report.
    struct PanickingReporter;

    #[async_trait]
    impl DeliveryReporter for PanickingReporter {
        async fn report(&self, _receipt: DeliveryReceipt) -> CrmResult<CampaignLog> {
            panic!("reporter bug");
        }
    }

    #[tokio::test]
    async fn test_launch_issues_one_attempt_per_audience_member() {
        let store = Arc::new(CampaignLogStore::new());
        let orch = orchestrator(FixedDecider(DeliveryStatus::Sent), store.clone());
        let campaign = campaign(vec![FilterRule::new("minSpend", 1000)]);
        let audience = vec![spender(1000.0), spender(2500.0), spender(9000.0)];

        let handle = orch.launch_campaign(&campaign, &audience);
        assert_eq!(handle.attempts(), 3);
        let summary = handle.wait().await.unwrap();

        assert_eq!(summary.attempted, 3);
        assert_eq!(summary.sent + summary.failed, 3);
        assert_eq!(store.count_for_campaign(campaign.id), 3);
        for customer in &audience {
            assert!(store.find(campaign.id, customer.id).is_some());
        }
    }

    #[tokio::test]
    async fn test_launch_for_customers_filters_first() {
        let store = Arc::new(CampaignLogStore::new());
        let orch = orchestrator(FixedDecider(DeliveryStatus::Failed), store.clone());
        let campaign = campaign(vec![FilterRule::new("minSpend", 1000)]);
        let candidates = vec![spender(10.0), spender(1000.0), spender(5000.0), spender(999.0)];

        let summary = orch
            .launch_for_customers(&campaign, &candidates)
            .wait()
            .await
            .unwrap();

        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.failed, 2);
        let logs = store.list(Some(campaign.id));
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.status == DeliveryStatus::Failed));
        assert!(logs
            .iter()
            .all(|l| l.vendor_response.as_deref() == Some("Simulated delivery failure.")));
    }

    #[tokio::test]
    async fn test_reporting_failure_is_isolated() {
        let store = Arc::new(CampaignLogStore::new());
        let audience = vec![spender(1.0), spender(2.0), spender(3.0)];
        let reporter = Arc::new(FlakyReporter {
            inner: store.clone(),
            broken_customer: audience[1].id,
        });
        let orch = orchestrator(FixedDecider(DeliveryStatus::Sent), reporter);
        let campaign = campaign(Vec::new());

        let summary = orch.launch_campaign(&campaign, &audience).wait().await.unwrap();

        assert_eq!(summary.sent, 2);
        assert_eq!(summary.reporting_errors, 1);
        assert_eq!(store.count_for_campaign(campaign.id), 2);
        assert!(store.find(campaign.id, audience[1].id).is_none());
    }

    #[tokio::test]
    async fn test_panicking_attempt_does_not_poison_launch() {
        let orch = orchestrator(FixedDecider(DeliveryStatus::Sent), Arc::new(PanickingReporter));
        let campaign = campaign(Vec::new());
        let audience = vec![spender(1.0), spender(2.0)];

        let summary = orch.launch_campaign(&campaign, &audience).wait().await.unwrap();
        assert_eq!(summary.attempted, 2);
        assert_eq!(summary.reporting_errors, 2);
    }

    #[tokio::test]
    async fn test_empty_audience_completes_immediately() {
        let store = Arc::new(CampaignLogStore::new());
        let orch = orchestrator(FixedDecider(DeliveryStatus::Sent), store.clone());
        let campaign = campaign(Vec::new());

        let summary = orch.launch_campaign(&campaign, &[]).wait().await.unwrap();
        assert_eq!(summary, DeliverySummary {
            campaign_id: campaign.id,
            ..Default::default()
        });
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_drains_dropped_handles() {
        let store = Arc::new(CampaignLogStore::new());
        let orch = orchestrator(FixedDecider(DeliveryStatus::Sent), store.clone());
        let campaign = campaign(Vec::new());
        let audience: Vec<Customer> = (0..50).map(|i| spender(i as f64)).collect();

        drop(orch.launch_campaign(&campaign, &audience));
        orch.shutdown().await;

        assert_eq!(orch.in_flight(), 0);
        assert_eq!(store.count_for_campaign(campaign.id), 50);
    }
}
