//! Simulated messaging vendor. The success/failure draw is behind
//! [`OutcomeDecider`] so callers can substitute a deterministic source.

use crm_core::config::DeliveryConfig;
use crm_core::types::DeliveryStatus;
use rand::Rng;
use std::sync::Arc;

/// Produces the vendor's verdict for one send attempt.
pub trait OutcomeDecider: Send + Sync {
    fn decide(&self) -> DeliveryStatus;
}

impl<F> OutcomeDecider for F
where
    F: Fn() -> DeliveryStatus + Send + Sync,
{
    fn decide(&self) -> DeliveryStatus {
        self()
    }
}

const DEFAULT_SUCCESS_RATE: f64 = 0.9;

/// Independent Bernoulli trial per attempt.
#[derive(Debug, Clone, Copy)]
pub struct BernoulliDecider {
    success_rate: f64,
}

impl BernoulliDecider {
    /// Rates outside [0, 1] are clamped; a non-finite rate falls back to 0.9.
    pub fn new(success_rate: f64) -> Self {
        let success_rate = if success_rate.is_finite() {
            success_rate.clamp(0.0, 1.0)
        } else {
            DEFAULT_SUCCESS_RATE
        };
        Self { success_rate }
    }

    pub fn success_rate(&self) -> f64 {
        self.success_rate
    }
}

impl Default for BernoulliDecider {
    fn default() -> Self {
        Self::new(DEFAULT_SUCCESS_RATE)
    }
}

impl OutcomeDecider for BernoulliDecider {
    fn decide(&self) -> DeliveryStatus {
        if rand::thread_rng().gen_bool(self.success_rate) {
            DeliveryStatus::Sent
        } else {
            DeliveryStatus::Failed
        }
    }
}

/// Always returns the same verdict.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub DeliveryStatus);

impl OutcomeDecider for FixedDecider {
    fn decide(&self) -> DeliveryStatus {
        self.0
    }
}

/// Verdict plus the free-text response the vendor would have returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorOutcome {
    pub status: DeliveryStatus,
    pub vendor_response: String,
}

/// Vendor stand-in used by the orchestrator and the send-message endpoint.
pub struct VendorSimulator {
    decider: Arc<dyn OutcomeDecider>,
    success_response: String,
    failure_response: String,
}

impl VendorSimulator {
    pub fn new(decider: Arc<dyn OutcomeDecider>) -> Self {
        let defaults = DeliveryConfig::default();
        Self {
            decider,
            success_response: defaults.success_response,
            failure_response: defaults.failure_response,
        }
    }

    pub fn from_config(config: &DeliveryConfig) -> Self {
        tracing::info!(
            success_rate = config.success_rate,
            "Vendor simulator initialized"
        );
        Self {
            decider: Arc::new(BernoulliDecider::new(config.success_rate)),
            success_response: config.success_response.clone(),
            failure_response: config.failure_response.clone(),
        }
    }

    /// Draw one outcome. Never retried: a failure is final for the attempt.
    pub fn attempt(&self) -> VendorOutcome {
        let status = self.decider.decide();
        let vendor_response = match status {
            DeliveryStatus::Sent => self.success_response.clone(),
            DeliveryStatus::Failed => self.failure_response.clone(),
        };
        VendorOutcome {
            status,
            vendor_response,
        }
    }
}
