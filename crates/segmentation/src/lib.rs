//! Audience segmentation — turns a campaign's filter rules and AND/OR logic
//! into a predicate over customer records.

pub mod builder;
pub mod engine;
pub mod predicates;

pub use builder::SegmentBuilder;
pub use engine::{evaluate_segment, Segment, SegmentEvaluator};
pub use predicates::{coerce_number, validate_rules};
