//! In-memory CRM store backed by DashMap.
//!
//! Customers, orders and campaigns live here; campaign logs are delegated to
//! the delivery crate's [`CampaignLogStore`] so the orchestrator and the HTTP
//! callbacks write through the same natural-key index.

use crate::models::*;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use crm_core::types::{Campaign, CampaignLog, CampaignStatus, Customer, DeliveryStatus, Order};
use crm_core::{CrmError, CrmResult};
use crm_delivery::{
    report_delivery_outcome, CampaignLogStore, CampaignPerformance, DeliveryReceipt,
    DeliveryReporter, UpsertedLog,
};
use crm_segmentation::{validate_rules, Segment, SegmentEvaluator};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const DEFAULT_LOG_RESPONSE: &str = "Simulated vendor API response";

/// Thread-safe in-memory store for customers, orders, campaigns and logs.
pub struct CrmStore {
    customers: DashMap<Uuid, Customer>,
    /// Lowercased email → customer id. Never locked together with `customers`.
    emails: DashMap<String, Uuid>,
    orders: DashMap<Uuid, Order>,
    campaigns: DashMap<Uuid, Campaign>,
    logs: Arc<CampaignLogStore>,
}

impl CrmStore {
    pub fn new() -> Self {
        Self::with_log_store(Arc::new(CampaignLogStore::new()))
    }

    pub fn with_log_store(logs: Arc<CampaignLogStore>) -> Self {
        info!("CRM store initialized (in-memory)");
        Self {
            customers: DashMap::new(),
            emails: DashMap::new(),
            orders: DashMap::new(),
            campaigns: DashMap::new(),
            logs,
        }
    }

    /// The shared log store, for wiring the delivery orchestrator.
    pub fn log_store(&self) -> Arc<CampaignLogStore> {
        self.logs.clone()
    }

    // ─── Customers ─────────────────────────────────────────────────────────

    pub fn list_customers(&self) -> Vec<Customer> {
        let mut customers: Vec<Customer> =
            self.customers.iter().map(|r| r.value().clone()).collect();
        customers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        customers
    }

    pub fn get_customer(&self, id: Uuid) -> Option<Customer> {
        self.customers.get(&id).map(|r| r.value().clone())
    }

    /// Snapshot of every customer satisfying `predicate`.
    pub fn find_customers(&self, predicate: impl Fn(&Customer) -> bool) -> Vec<Customer> {
        self.customers
            .iter()
            .filter(|r| predicate(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn create_customer(&self, req: CreateCustomerRequest) -> CrmResult<Customer> {
        let name = required_text(req.name, "name").map_err(CrmError::Validation)?;
        let email = required_text(req.email, "email").map_err(CrmError::Validation)?;
        if let Some(spend) = req.total_spend {
            check_spend(spend)?;
        }

        let mut customer = Customer::new(name, email);
        customer.phone = req.phone;
        customer.total_spend = req.total_spend.unwrap_or(0.0);
        customer.visits = req.visits.unwrap_or(0);
        if req.last_active.is_some() {
            customer.last_active = req.last_active;
        }

        self.reserve_email(&customer.email, customer.id)?;
        self.customers.insert(customer.id, customer.clone());
        info!(customer_id = %customer.id, "Customer created");
        metrics::counter!("crm.customers.created").increment(1);
        Ok(customer)
    }

    pub fn update_customer(&self, id: Uuid, req: UpdateCustomerRequest) -> CrmResult<Customer> {
        let current = self
            .get_customer(id)
            .ok_or_else(|| CrmError::not_found("customer", id))?;

        if let Some(spend) = req.total_spend {
            check_spend(spend)?;
        }
        let name = match req.name {
            Some(name) => Some(required_text(Some(name), "name").map_err(CrmError::Validation)?),
            None => None,
        };
        let new_email = match req.email {
            Some(email) => {
                let email = required_text(Some(email), "email").map_err(CrmError::Validation)?;
                (email_key(&email) != email_key(&current.email)).then_some(email)
            }
            None => None,
        };
        if let Some(email) = &new_email {
            self.reserve_email(email, id)?;
        }

        let updated = {
            let Some(mut entry) = self.customers.get_mut(&id) else {
                if let Some(email) = &new_email {
                    self.emails.remove_if(&email_key(email), |_, owner| *owner == id);
                }
                return Err(CrmError::not_found("customer", id));
            };
            let customer = entry.value_mut();
            if let Some(name) = name {
                customer.name = name;
            }
            if let Some(email) = &new_email {
                customer.email = email.clone();
            }
            if req.phone.is_some() {
                customer.phone = req.phone;
            }
            if let Some(spend) = req.total_spend {
                customer.total_spend = spend;
            }
            if let Some(visits) = req.visits {
                customer.visits = visits;
            }
            if req.last_active.is_some() {
                customer.last_active = req.last_active;
            }
            customer.updated_at = Utc::now();
            customer.clone()
        };

        if new_email.is_some() {
            self.emails
                .remove_if(&email_key(&current.email), |_, owner| *owner == id);
        }
        Ok(updated)
    }

    /// Removes the customer only; their orders and logs are left in place.
    pub fn delete_customer(&self, id: Uuid) -> CrmResult<Customer> {
        let (_, customer) = self
            .customers
            .remove(&id)
            .ok_or_else(|| CrmError::not_found("customer", id))?;
        self.emails
            .remove_if(&email_key(&customer.email), |_, owner| *owner == id);
        info!(customer_id = %id, "Customer deleted");
        Ok(customer)
    }

    fn reserve_email(&self, email: &str, id: Uuid) -> CrmResult<()> {
        match self.emails.entry(email_key(email)) {
            Entry::Occupied(existing) if *existing.get() != id => Err(CrmError::Conflict(format!(
                "a customer with email {} already exists",
                email
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }

    // ─── Orders ────────────────────────────────────────────────────────────

    pub fn list_orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.iter().map(|r| r.value().clone()).collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Record an order and roll it into the customer's counters under the
    /// customer's entry lock.
    pub fn place_order(&self, req: CreateOrderRequest) -> CrmResult<Order> {
        let customer_id = req
            .customer_id
            .ok_or_else(|| CrmError::validation("customerId is required"))?;
        let amount = match req.amount {
            Some(a) if a.is_finite() && a > 0.0 => a,
            Some(_) => return Err(CrmError::validation("amount must be a positive number")),
            None => return Err(CrmError::validation("amount is required")),
        };

        let now = Utc::now();
        {
            let mut customer = self
                .customers
                .get_mut(&customer_id)
                .ok_or_else(|| CrmError::not_found("customer", customer_id))?;
            customer.total_spend += amount;
            customer.visits += 1;
            customer.last_active = Some(now);
            customer.updated_at = now;
        }

        let order = Order {
            id: Uuid::new_v4(),
            customer: customer_id,
            amount,
            status: req.status,
            created_at: now,
            updated_at: now,
        };
        self.orders.insert(order.id, order.clone());
        info!(order_id = %order.id, customer_id = %customer_id, amount, "Order placed");
        metrics::counter!("crm.orders.placed").increment(1);
        Ok(order)
    }

    /// Customer counters are not rolled back.
    pub fn delete_order(&self, id: Uuid) -> CrmResult<Order> {
        self.orders
            .remove(&id)
            .map(|(_, order)| order)
            .ok_or_else(|| CrmError::not_found("order", id))
    }

    // ─── Campaigns ─────────────────────────────────────────────────────────

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        let mut campaigns: Vec<Campaign> =
            self.campaigns.iter().map(|r| r.value().clone()).collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        campaigns
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|r| r.value().clone())
    }

    pub fn campaign_count(&self) -> usize {
        self.campaigns.len()
    }

    /// Validate and persist a campaign in `PENDING` status.
    pub fn create_campaign(&self, req: CreateCampaignRequest) -> CrmResult<Campaign> {
        let name = required_text(req.name, "name").map_err(CrmError::Validation)?;
        let created_by = required_text(req.created_by, "createdBy").map_err(CrmError::Validation)?;
        let message = required_text(req.message, "message").map_err(CrmError::Validation)?;
        let filters = req
            .filters
            .ok_or_else(|| CrmError::validation("filters is required"))?
            .into_rules();
        validate_rules(&filters)?;

        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            name,
            created_by,
            filters,
            logic: req.logic,
            message,
            objective: req.objective.filter(|o| !o.trim().is_empty()),
            status: CampaignStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.campaigns.insert(campaign.id, campaign.clone());
        info!(campaign_id = %campaign.id, name = %campaign.name, "Campaign created");
        metrics::counter!("crm.campaigns.created").increment(1);
        Ok(campaign)
    }

    pub fn mark_campaign_sent(&self, id: Uuid) -> CrmResult<Campaign> {
        let mut campaign = self
            .campaigns
            .get_mut(&id)
            .ok_or_else(|| CrmError::not_found("campaign", id))?;
        campaign.status = CampaignStatus::Sent;
        campaign.updated_at = Utc::now();
        Ok(campaign.clone())
    }

    /// Delete a campaign and every log recorded for it. Returns the number of
    /// logs removed. Outcomes reported through [`CrmStore::record_delivery`]
    /// after this returns are refused, so the campaign stays log-free.
    pub fn delete_campaign(&self, id: Uuid) -> CrmResult<usize> {
        self.campaigns
            .remove(&id)
            .ok_or_else(|| CrmError::not_found("campaign", id))?;
        let removed = self.logs.delete_logs_by_campaign(id);
        info!(campaign_id = %id, logs_removed = removed, "Campaign deleted");
        metrics::counter!("crm.campaigns.deleted").increment(1);
        Ok(removed)
    }

    /// Customers currently matching the campaign's filters.
    pub fn campaign_audience(&self, campaign: &Campaign) -> Vec<Customer> {
        let evaluator = SegmentEvaluator::new();
        self.find_customers(|c| evaluator.matches(c, &campaign.filters, campaign.logic))
    }

    pub fn preview_audience(&self, segment: &Segment) -> CrmResult<usize> {
        validate_rules(&segment.filters)?;
        let evaluator = SegmentEvaluator::new();
        Ok(self
            .customers
            .iter()
            .filter(|r| evaluator.matches(r.value(), &segment.filters, segment.logic))
            .count())
    }

    pub fn campaign_performance(&self, id: Uuid) -> CrmResult<CampaignPerformance> {
        let campaign = self
            .get_campaign(id)
            .ok_or_else(|| CrmError::not_found("campaign", id))?;
        let logs = self.logs.list(Some(id));
        let customers = self.list_customers();
        Ok(CampaignPerformance::compute(&campaign, &logs, &customers))
    }

    // ─── Logs ──────────────────────────────────────────────────────────────

    pub fn list_logs(&self, campaign: Option<Uuid>) -> Vec<CampaignLog> {
        self.logs.list(campaign)
    }

    /// Append a log row directly, outside the delivery protocol.
    pub fn create_log(&self, req: CreateLogRequest) -> CrmResult<CampaignLog> {
        let campaign = req
            .campaign
            .ok_or_else(|| CrmError::validation("campaign is required"))?;
        let customer = req
            .customer
            .ok_or_else(|| CrmError::validation("customer is required"))?;
        Ok(self.logs.create_log(
            campaign,
            customer,
            req.status.unwrap_or(DeliveryStatus::Sent),
            Some(req.vendor_response.unwrap_or_else(|| DEFAULT_LOG_RESPONSE.to_string())),
        ))
    }

    /// Delivery receipt callback: upsert on (campaign, customer).
    pub fn update_log_status(&self, req: UpdateStatusRequest) -> CrmResult<UpsertedLog> {
        let (Some(campaign_id), Some(customer_id), Some(status)) =
            (req.campaign_id, req.customer_id, req.status)
        else {
            return Err(CrmError::validation(
                "campaignId, customerId and status are required",
            ));
        };
        Ok(report_delivery_outcome(
            &self.logs,
            campaign_id,
            customer_id,
            status,
            req.vendor_response,
        ))
    }

    /// Record a delivery outcome for a campaign that still exists.
    ///
    /// The campaign entry stays read-locked across the upsert. A concurrent
    /// `delete_campaign` blocks on its removal until the row is written, and
    /// its cascade then sweeps that row.
    pub fn record_delivery(&self, receipt: DeliveryReceipt) -> CrmResult<CampaignLog> {
        let _campaign = self
            .campaigns
            .get(&receipt.campaign_id)
            .ok_or_else(|| CrmError::not_found("campaign", receipt.campaign_id))?;
        let upserted = report_delivery_outcome(
            &self.logs,
            receipt.campaign_id,
            receipt.customer_id,
            receipt.status,
            receipt.vendor_response,
        );
        Ok(upserted.log)
    }

    // ─── Demo data ─────────────────────────────────────────────────────────

    /// A handful of customers spread across the spend/visit/recency ranges
    /// the filters distinguish.
    pub fn seed_demo_data(&self) {
        let now = Utc::now();
        let demo = [
            ("Asha Verma", "asha@example.com", 25_000.0, 14, 2),
            ("Rohan Mehta", "rohan@example.com", 12_500.0, 9, 45),
            ("Meera Iyer", "meera@example.com", 4_200.0, 6, 10),
            ("Kabir Singh", "kabir@example.com", 1_100.0, 3, 95),
            ("Nisha Rao", "nisha@example.com", 650.0, 1, 200),
            ("Dev Patel", "dev@example.com", 0.0, 0, 0),
        ];

        for (name, email, spend, visits, idle_days) in demo {
            let mut customer = Customer::new(name, email);
            customer.total_spend = spend;
            customer.visits = visits;
            customer.last_active = Some(now - Duration::days(idle_days));
            if self.reserve_email(email, customer.id).is_ok() {
                self.customers.insert(customer.id, customer);
            }
        }
        info!(customers = self.customers.len(), "Seeded demo customers");
    }
}

/// Reporter for the delivery orchestrator: refuses outcomes for campaigns
/// deleted while their delivery was still running.
#[async_trait]
impl DeliveryReporter for CrmStore {
    async fn report(&self, receipt: DeliveryReceipt) -> CrmResult<CampaignLog> {
        self.record_delivery(receipt)
    }
}

impl Default for CrmStore {
    fn default() -> Self {
        Self::new()
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_spend(spend: f64) -> CrmResult<()> {
    if spend.is_finite() && spend >= 0.0 {
        Ok(())
    } else {
        Err(CrmError::validation("totalSpend must be a non-negative number"))
    }
}
