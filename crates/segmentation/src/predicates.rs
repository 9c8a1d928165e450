//! Per-rule evaluation and value coercion for audience filters.

use chrono::{DateTime, Utc};
use crm_core::types::{Customer, FilterKey, FilterRule};
use crm_core::{CrmError, CrmResult};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Coerce a rule value into a number. Numbers pass through, strings are
/// parsed after trimming, and anything else (missing, null, booleans,
/// unparsable text, non-finite results) becomes 0.
pub fn coerce_number(value: &serde_json::Value) -> f64 {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite()).unwrap_or(0.0)
}

/// Decide whether a single rule holds for a customer at instant `now`.
pub fn evaluate_rule(rule: &FilterRule, customer: &Customer, now: DateTime<Utc>) -> bool {
    let threshold = coerce_number(&rule.value);
    match &rule.key {
        FilterKey::MinSpend => customer.total_spend >= threshold,
        FilterKey::MinVisits => customer.visits as f64 >= threshold,
        FilterKey::InactiveDays => {
            if threshold == 0.0 {
                return true;
            }
            match customer.last_active {
                Some(last_active) => inactive_days(last_active, now) >= threshold,
                None => false,
            }
        }
        // Unrecognized keys never exclude anyone.
        FilterKey::Other(key) => {
            tracing::debug!(key = %key, "Unknown filter key treated as always true");
            true
        }
    }
}

/// Fractional days elapsed between `last_active` and `now`.
pub fn inactive_days(last_active: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - last_active).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Structural checks applied when a campaign is created. Evaluation itself
/// never fails; this only rejects rules that cannot have come from the
/// campaign form.
pub fn validate_rules(rules: &[FilterRule]) -> CrmResult<()> {
    for (idx, rule) in rules.iter().enumerate() {
        if rule.key.as_str().trim().is_empty() {
            return Err(CrmError::validation(format!(
                "filter rule #{} has an empty key",
                idx + 1
            )));
        }
        if rule.value.is_array() || rule.value.is_object() {
            return Err(CrmError::validation(format!(
                "filter rule '{}' must have a scalar value",
                rule.key
            )));
        }
    }
    Ok(())
}
