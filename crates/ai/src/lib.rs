//! AI copy helpers — campaign message suggestions and performance summaries
//! produced by an opaque text-completion service.

pub mod assistant;
pub mod gemini;
pub mod prompts;

pub use assistant::{CampaignAssistant, MessageSuggestions};
pub use gemini::{GeminiClient, TextGenerator};
