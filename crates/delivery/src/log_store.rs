//! Campaign log store backed by DashMap.
//!
//! Rows are keyed by log id; a secondary index on (campaign, customer) is the
//! natural key the delivery protocol reconciles against. Lock order is always
//! index first, then rows.

use chrono::Utc;
use crm_core::types::{CampaignLog, DeliveryStatus};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

/// Result of an upsert: the stored row and whether it was newly created.
#[derive(Debug, Clone)]
pub struct UpsertedLog {
    pub log: CampaignLog,
    pub created: bool,
}

/// Thread-safe store for campaign delivery logs.
pub struct CampaignLogStore {
    logs: DashMap<Uuid, CampaignLog>,
    by_pair: DashMap<(Uuid, Uuid), Uuid>,
}

impl CampaignLogStore {
    pub fn new() -> Self {
        Self {
            logs: DashMap::new(),
            by_pair: DashMap::new(),
        }
    }

    /// Append a log row. The natural-key index keeps pointing at the first row
    /// recorded for the pair.
    pub fn create_log(
        &self,
        campaign: Uuid,
        customer: Uuid,
        status: DeliveryStatus,
        vendor_response: Option<String>,
    ) -> CampaignLog {
        let now = Utc::now();
        let log = CampaignLog {
            id: Uuid::new_v4(),
            campaign,
            customer,
            status,
            vendor_response,
            created_at: now,
            updated_at: now,
        };
        self.logs.insert(log.id, log.clone());
        self.by_pair.entry((campaign, customer)).or_insert(log.id);
        log
    }

    /// Insert or update the single logical row for (campaign, customer).
    /// Atomic per pair; concurrent reports for the same pair resolve
    /// last-write-wins.
    pub fn upsert_log_by_campaign_customer(
        &self,
        campaign: Uuid,
        customer: Uuid,
        status: DeliveryStatus,
        vendor_response: Option<String>,
    ) -> UpsertedLog {
        let now = Utc::now();
        match self.by_pair.entry((campaign, customer)) {
            Entry::Occupied(entry) => {
                let id = *entry.get();
                let mut row = self.logs.entry(id).or_insert_with(|| CampaignLog {
                    id,
                    campaign,
                    customer,
                    status,
                    vendor_response: None,
                    created_at: now,
                    updated_at: now,
                });
                row.status = status;
                row.vendor_response = vendor_response;
                row.updated_at = now;
                metrics::counter!("logs.upserts", "result" => "updated").increment(1);
                UpsertedLog {
                    log: row.clone(),
                    created: false,
                }
            }
            Entry::Vacant(entry) => {
                let log = CampaignLog {
                    id: Uuid::new_v4(),
                    campaign,
                    customer,
                    status,
                    vendor_response,
                    created_at: now,
                    updated_at: now,
                };
                self.logs.insert(log.id, log.clone());
                entry.insert(log.id);
                metrics::counter!("logs.upserts", "result" => "created").increment(1);
                UpsertedLog { log, created: true }
            }
        }
    }

    pub fn get(&self, id: Uuid) -> Option<CampaignLog> {
        self.logs.get(&id).map(|r| r.value().clone())
    }

    pub fn find(&self, campaign: Uuid, customer: Uuid) -> Option<CampaignLog> {
        let id = *self.by_pair.get(&(campaign, customer))?;
        self.get(id)
    }

    /// All logs, newest first, optionally restricted to one campaign.
    pub fn list(&self, campaign: Option<Uuid>) -> Vec<CampaignLog> {
        let mut logs: Vec<CampaignLog> = self
            .logs
            .iter()
            .filter(|r| campaign.map_or(true, |c| r.value().campaign == c))
            .map(|r| r.value().clone())
            .collect();
        logs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        logs
    }

    pub fn count_for_campaign(&self, campaign: Uuid) -> usize {
        self.logs
            .iter()
            .filter(|r| r.value().campaign == campaign)
            .count()
    }

    /// Hard-delete every log of a campaign. Returns how many rows went away.
    pub fn delete_logs_by_campaign(&self, campaign: Uuid) -> usize {
        let doomed: Vec<(Uuid, Uuid)> = self
            .logs
            .iter()
            .filter(|r| r.value().campaign == campaign)
            .map(|r| (*r.key(), r.value().customer))
            .collect();

        let mut removed = 0;
        for (id, customer) in doomed {
            self.by_pair
                .remove_if(&(campaign, customer), |_, indexed| *indexed == id);
            if self.logs.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}

impl Default for CampaignLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_creates_then_updates_in_place() {
        let store = CampaignLogStore::new();
        let (campaign, customer) = (Uuid::new_v4(), Uuid::new_v4());

        let first = store.upsert_log_by_campaign_customer(
            campaign,
            customer,
            DeliveryStatus::Sent,
            Some("ok".to_string()),
        );
        assert!(first.created);

        let second = store.upsert_log_by_campaign_customer(
            campaign,
            customer,
            DeliveryStatus::Failed,
            Some("bounced".to_string()),
        );
        assert!(!second.created);
        assert_eq!(second.log.id, first.log.id);
        assert_eq!(second.log.created_at, first.log.created_at);

        let rows = store.list(Some(campaign));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, DeliveryStatus::Failed);
        assert_eq!(rows[0].vendor_response.as_deref(), Some("bounced"));
    }

    #[test]
    fn test_upsert_reconciles_with_created_log() {
        let store = CampaignLogStore::new();
        let (campaign, customer) = (Uuid::new_v4(), Uuid::new_v4());

        let created = store.create_log(campaign, customer, DeliveryStatus::Sent, None);
        let upserted = store.upsert_log_by_campaign_customer(
            campaign,
            customer,
            DeliveryStatus::Failed,
            None,
        );
        assert!(!upserted.created);
        assert_eq!(upserted.log.id, created.id);
        assert_eq!(store.count_for_campaign(campaign), 1);
    }

    #[test]
    fn test_pairs_are_independent() {
        let store = CampaignLogStore::new();
        let campaign = Uuid::new_v4();
        for _ in 0..3 {
            store.upsert_log_by_campaign_customer(
                campaign,
                Uuid::new_v4(),
                DeliveryStatus::Sent,
                None,
            );
        }
        store.upsert_log_by_campaign_customer(
            Uuid::new_v4(),
            Uuid::new_v4(),
            DeliveryStatus::Sent,
            None,
        );
        assert_eq!(store.count_for_campaign(campaign), 3);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_delete_logs_by_campaign() {
        let store = CampaignLogStore::new();
        let (doomed, kept) = (Uuid::new_v4(), Uuid::new_v4());
        let customer = Uuid::new_v4();
        store.upsert_log_by_campaign_customer(doomed, customer, DeliveryStatus::Sent, None);
        store.create_log(doomed, Uuid::new_v4(), DeliveryStatus::Failed, None);
        store.upsert_log_by_campaign_customer(kept, customer, DeliveryStatus::Sent, None);

        assert_eq!(store.delete_logs_by_campaign(doomed), 2);
        assert_eq!(store.count_for_campaign(doomed), 0);
        assert!(store.find(doomed, customer).is_none());
        assert!(store.find(kept, customer).is_some());

        // Deleting again is a no-op.
        assert_eq!(store.delete_logs_by_campaign(doomed), 0);

        // A late report after deletion starts a fresh row.
        let late =
            store.upsert_log_by_campaign_customer(doomed, customer, DeliveryStatus::Sent, None);
        assert!(late.created);
    }

    #[test]
    fn test_concurrent_upserts_keep_one_row_per_pair() {
        let store = std::sync::Arc::new(CampaignLogStore::new());
        let (campaign, customer) = (Uuid::new_v4(), Uuid::new_v4());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    let status = if i % 2 == 0 {
                        DeliveryStatus::Sent
                    } else {
                        DeliveryStatus::Failed
                    };
                    store.upsert_log_by_campaign_customer(campaign, customer, status, None)
                })
            })
            .collect();
        let created = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|u| u.created)
            .count();

        assert_eq!(created, 1);
        assert_eq!(store.count_for_campaign(campaign), 1);
    }
}
