//! Segment builder — fluent API for constructing campaign filter rules.

use crm_core::types::{FilterKey, FilterRule, Logic};

use crate::engine::Segment;

#[derive(Debug, Default)]
pub struct SegmentBuilder {
    filters: Vec<FilterRule>,
    logic: Logic,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_or(mut self) -> Self {
        self.logic = Logic::Or;
        self
    }

    pub fn logic(mut self, logic: Logic) -> Self {
        self.logic = logic;
        self
    }

    pub fn min_spend(self, value: impl Into<serde_json::Value>) -> Self {
        self.rule(FilterKey::MinSpend, value)
    }

    pub fn min_visits(self, value: impl Into<serde_json::Value>) -> Self {
        self.rule(FilterKey::MinVisits, value)
    }

    pub fn inactive_days(self, value: impl Into<serde_json::Value>) -> Self {
        self.rule(FilterKey::InactiveDays, value)
    }

    /// Append an arbitrary rule, including keys the evaluator does not know.
    pub fn rule(mut self, key: impl Into<FilterKey>, value: impl Into<serde_json::Value>) -> Self {
        self.filters.push(FilterRule::new(key, value));
        self
    }

    pub fn build(self) -> Segment {
        Segment {
            filters: self.filters,
            logic: self.logic,
        }
    }
}
