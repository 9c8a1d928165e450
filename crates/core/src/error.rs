use thiserror::Error;
use uuid::Uuid;

pub type CrmResult<T> = Result<T, CrmError>;

#[derive(Error, Debug)]
pub enum CrmError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Delivery reporting failed for {campaign_id}/{customer_id}: {reason}")]
    DeliveryReporting {
        campaign_id: Uuid,
        customer_id: Uuid,
        reason: String,
    },

    #[error("Text generation error: {0}")]
    TextGeneration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CrmError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        CrmError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CrmError::Validation(msg.into())
    }

    /// Short machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            CrmError::Config(_) => "config_error",
            CrmError::Validation(_) => "validation_error",
            CrmError::NotFound { .. } => "not_found",
            CrmError::Conflict(_) => "conflict",
            CrmError::DeliveryReporting { .. } => "delivery_reporting_error",
            CrmError::TextGeneration(_) => "text_generation_error",
            CrmError::Serialization(_) => "serialization_error",
            CrmError::Io(_) | CrmError::Internal(_) => "internal_error",
        }
    }
}
