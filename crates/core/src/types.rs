//! CRM domain records shared by the store, the segment evaluator and the
//! delivery pipeline. Field names serialize in camelCase to stay compatible
//! with the dashboard that consumes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Customer ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// Lifetime spend; only ever increased by order placement.
    #[serde(default)]
    pub total_spend: f64,
    #[serde(default)]
    pub visits: u64,
    #[serde(default)]
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into(),
            phone: None,
            total_spend: 0.0,
            visits: 0,
            last_active: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

// ─── Order ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub customer: Uuid,
    pub amount: f64,
    #[serde(default)]
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Filter rules ───────────────────────────────────────────────────────────

/// Attribute a filter rule constrains. Keys outside the known set are kept
/// verbatim so they round-trip and can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FilterKey {
    MinSpend,
    MinVisits,
    InactiveDays,
    Other(String),
}

impl FilterKey {
    pub fn as_str(&self) -> &str {
        match self {
            FilterKey::MinSpend => "minSpend",
            FilterKey::MinVisits => "minVisits",
            FilterKey::InactiveDays => "inactiveDays",
            FilterKey::Other(key) => key,
        }
    }
}

impl From<String> for FilterKey {
    fn from(key: String) -> Self {
        match key.as_str() {
            "minSpend" => FilterKey::MinSpend,
            "minVisits" => FilterKey::MinVisits,
            "inactiveDays" => FilterKey::InactiveDays,
            _ => FilterKey::Other(key),
        }
    }
}

impl From<&str> for FilterKey {
    fn from(key: &str) -> Self {
        FilterKey::from(key.to_string())
    }
}

impl From<FilterKey> for String {
    fn from(key: FilterKey) -> Self {
        match key {
            FilterKey::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for FilterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single audience constraint. `value` is kept as raw JSON because the
/// dashboard sends numbers, numeric strings, or nothing at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    pub key: FilterKey,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl FilterRule {
    pub fn new(key: impl Into<FilterKey>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Combinator shared by every rule of a campaign.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// Filters as accepted on the wire: either a rule list, or the older object
/// form `{"minSpend": 1000, "inactiveDays": 30}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterInput {
    Rules(Vec<FilterRule>),
    Legacy(serde_json::Map<String, serde_json::Value>),
}

impl FilterInput {
    pub fn into_rules(self) -> Vec<FilterRule> {
        match self {
            FilterInput::Rules(rules) => rules,
            FilterInput::Legacy(map) => map
                .into_iter()
                .map(|(key, value)| FilterRule {
                    key: FilterKey::from(key),
                    value,
                })
                .collect(),
        }
    }
}

impl Default for FilterInput {
    fn default() -> Self {
        FilterInput::Rules(Vec::new())
    }
}

// ─── Campaign ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CampaignStatus {
    #[default]
    Pending,
    Sent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub created_by: String,
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub logic: Logic,
    pub message: String,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ─── Campaign log ───────────────────────────────────────────────────────────

/// Terminal outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    #[serde(rename = "SENT", alias = "sent")]
    Sent,
    #[serde(rename = "FAILED", alias = "failed")]
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "SENT",
            DeliveryStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignLog {
    pub id: Uuid,
    pub campaign: Uuid,
    pub customer: Uuid,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub vendor_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
