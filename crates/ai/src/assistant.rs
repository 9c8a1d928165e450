//! Campaign copy assistant built on a [`TextGenerator`].

use crm_core::{CrmError, CrmResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::gemini::TextGenerator;
use crate::prompts;

#[derive(Debug, Clone, Serialize)]
pub struct MessageSuggestions {
    /// Raw completion text, as the dashboard renders it.
    pub suggestions: String,
    /// The same text split into individual messages.
    pub options: Vec<String>,
}

pub struct CampaignAssistant {
    generator: Arc<dyn TextGenerator>,
}

impl CampaignAssistant {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn suggest_messages(&self, objective: &str) -> CrmResult<MessageSuggestions> {
        let objective = objective.trim();
        if objective.is_empty() {
            return Err(CrmError::validation("objective is required"));
        }
        let text = self
            .generator
            .generate(&prompts::suggest_message_prompt(objective))
            .await?;
        let options = prompts::parse_numbered_list(&text);
        info!(options = options.len(), "Message suggestions generated");
        metrics::counter!("ai.suggestions").increment(1);
        Ok(MessageSuggestions {
            suggestions: text,
            options,
        })
    }

    pub async fn summarize_performance(&self, stats: &serde_json::Value) -> CrmResult<String> {
        if stats.is_null() {
            return Err(CrmError::validation("stats are required"));
        }
        let summary = self
            .generator
            .generate(&prompts::summarize_performance_prompt(stats))
            .await?;
        metrics::counter!("ai.summaries").increment(1);
        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Echoes a canned reply and remembers the prompts it saw.
    struct CannedGenerator {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedGenerator {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CannedGenerator {
        async fn generate(&self, prompt: &str) -> CrmResult<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn test_suggest_messages_parses_options() {
        let generator = Arc::new(CannedGenerator::new("1. Hurry!\n2. We miss you.\n3. Save 15%."));
        let assistant = CampaignAssistant::new(generator.clone());

        let result = assistant.suggest_messages("  re-engage lapsed buyers ").await.unwrap();
        assert_eq!(result.options.len(), 3);
        assert!(result.suggestions.starts_with("1. Hurry!"));

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"re-engage lapsed buyers\""));
    }

    #[tokio::test]
    async fn test_empty_objective_is_rejected_without_calling_service() {
        let generator = Arc::new(CannedGenerator::new("unused"));
        let assistant = CampaignAssistant::new(generator.clone());

        let err = assistant.suggest_messages("   ").await.unwrap_err();
        assert!(matches!(err, CrmError::Validation(_)));
        assert!(generator.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_summarize_trims_output() {
        let assistant =
            CampaignAssistant::new(Arc::new(CannedGenerator::new("  Reached 3 users.\n")));
        let summary = assistant
            .summarize_performance(&serde_json::json!({"sent": 3}))
            .await
            .unwrap();
        assert_eq!(summary, "Reached 3 users.");
    }
}
