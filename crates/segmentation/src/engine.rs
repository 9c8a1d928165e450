//! Segment evaluator — combines per-rule results into audience membership.

use chrono::{DateTime, Utc};
use crm_core::types::{Customer, FilterRule, Logic};
use serde::{Deserialize, Serialize};

use crate::predicates::evaluate_rule;

/// A rule set together with the combinator joining it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub logic: Logic,
}

impl Segment {
    pub fn new(filters: Vec<FilterRule>, logic: Logic) -> Self {
        Self { filters, logic }
    }
}

/// Evaluates customers against rule sets at a fixed instant, so every member
/// of one audience is judged against the same clock.
#[derive(Debug, Clone, Copy)]
pub struct SegmentEvaluator {
    now: DateTime<Utc>,
}

impl SegmentEvaluator {
    pub fn new() -> Self {
        Self { now: Utc::now() }
    }

    /// Evaluator pinned to a specific instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn matches(&self, customer: &Customer, filters: &[FilterRule], logic: Logic) -> bool {
        if filters.is_empty() {
            return true;
        }
        match logic {
            Logic::And => filters.iter().all(|r| evaluate_rule(r, customer, self.now)),
            Logic::Or => filters.iter().any(|r| evaluate_rule(r, customer, self.now)),
        }
    }

    /// Compile a rule set into a reusable predicate.
    pub fn compile<'a>(
        &self,
        filters: &'a [FilterRule],
        logic: Logic,
    ) -> impl Fn(&Customer) -> bool + 'a {
        let evaluator = *self;
        move |customer| evaluator.matches(customer, filters, logic)
    }

    /// Customers matching the segment, in input order.
    pub fn evaluate<'c>(
        &self,
        customers: impl IntoIterator<Item = &'c Customer>,
        segment: &Segment,
    ) -> Vec<&'c Customer> {
        let predicate = self.compile(&segment.filters, segment.logic);
        customers.into_iter().filter(|c| predicate(*c)).collect()
    }

    pub fn audience_size<'c>(
        &self,
        customers: impl IntoIterator<Item = &'c Customer>,
        segment: &Segment,
    ) -> usize {
        let predicate = self.compile(&segment.filters, segment.logic);
        customers.into_iter().filter(|c| predicate(*c)).count()
    }
}

impl Default for SegmentEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the audience for `filters`/`logic` from `customers`.
pub fn evaluate_segment(
    customers: &[Customer],
    filters: &[FilterRule],
    logic: Logic,
) -> Vec<Customer> {
    let evaluator = SegmentEvaluator::new();
    let predicate = evaluator.compile(filters, logic);
    let audience: Vec<Customer> = customers.iter().filter(|c| predicate(*c)).cloned().collect();
    tracing::debug!(
        rules = filters.len(),
        logic = ?logic,
        candidates = customers.len(),
        matched = audience.len(),
        "Segment evaluated"
    );
    audience
}
