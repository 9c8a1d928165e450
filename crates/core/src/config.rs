use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CRM__` and an optional `config/crm.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub seed_demo_data: bool,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

// Default functions
fn default_node_id() -> String {
    "crm-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    3000
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            seed_demo_data: false,
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            delivery: DeliveryConfig::default(),
            ai: AiConfig::default(),
        }
    }
}

// ─── Delivery Config ────────────────────────────────────────────────────────

/// Simulated vendor behaviour for campaign delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Probability that a single send attempt is reported as SENT.
    #[serde(default = "default_success_rate")]
    pub success_rate: f64,
    #[serde(default = "default_success_response")]
    pub success_response: String,
    #[serde(default = "default_failure_response")]
    pub failure_response: String,
}

fn default_success_rate() -> f64 {
    0.9
}
fn default_success_response() -> String {
    "Simulated delivery success.".to_string()
}
fn default_failure_response() -> String {
    "Simulated delivery failure.".to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            success_rate: default_success_rate(),
            success_response: default_success_response(),
            failure_response: default_failure_response(),
        }
    }
}

// ─── AI Config ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Gemini API key. Text helpers answer with an error when unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default = "default_ai_base_url")]
    pub base_url: String,
    #[serde(default = "default_ai_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_ai_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_ai_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_ai_model() -> String {
    "gemini-1.5-flash".to_string()
}
fn default_ai_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_ai_max_retries() -> u32 {
    3
}
fn default_ai_retry_backoff_ms() -> u64 {
    1000
}
fn default_ai_timeout_ms() -> u64 {
    30_000
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            base_url: default_ai_base_url(),
            max_retries: default_ai_max_retries(),
            retry_backoff_ms: default_ai_retry_backoff_ms(),
            timeout_ms: default_ai_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and optional config file.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/crm").required(false))
            .add_source(
                config::Environment::with_prefix("CRM")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Reject values that would make the service misbehave at runtime.
    pub fn validate(&self) -> Result<(), crate::CrmError> {
        if !(0.0..=1.0).contains(&self.delivery.success_rate) {
            return Err(crate::CrmError::Config(format!(
                "delivery.success_rate must be within [0, 1], got {}",
                self.delivery.success_rate
            )));
        }
        if self.ai.max_retries == 0 {
            return Err(crate::CrmError::Config(
                "ai.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 3000);
        assert_eq!(config.delivery.success_rate, 0.9);
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.ai.max_retries, 3);
        assert!(config.ai.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"delivery": {"success_rate": 0.5}}"#).unwrap();
        assert_eq!(config.delivery.success_rate, 0.5);
        assert_eq!(config.delivery.success_response, "Simulated delivery success.");
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_validate_rejects_bad_success_rate() {
        let mut config = AppConfig::default();
        config.delivery.success_rate = 1.5;
        assert!(config.validate().is_err());
    }
}
