//! Simulated campaign delivery.
//!
//! Fans out one send attempt per audience member, draws a vendor outcome for
//! each, and reconciles the outcome into the campaign log store through an
//! idempotent upsert keyed on (campaign, customer).

pub mod log_store;
pub mod orchestrator;
pub mod reporter;
pub mod stats;
pub mod vendor;

pub use log_store::{CampaignLogStore, UpsertedLog};
pub use orchestrator::{DeliveryHandle, DeliveryOrchestrator, DeliverySummary};
pub use reporter::{report_delivery_outcome, DeliveryReceipt, DeliveryReporter};
pub use stats::{AudienceSource, CampaignPerformance};
pub use vendor::{BernoulliDecider, FixedDecider, OutcomeDecider, VendorOutcome, VendorSimulator};
