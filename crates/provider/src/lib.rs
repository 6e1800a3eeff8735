//! Hosted language model access
//!
//! The reasoning loop only needs plain text completion: a list of messages
//! in, generated text out, with optional stop sequences.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use thiserror::Error;
use tracing::trace;

pub mod gemini;

pub use gemini::GeminiProvider;

/// Model provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model API error: {0}")]
    Api(String),

    #[error("no API key configured")]
    NoApiKey,

    #[error("invalid response from model")]
    InvalidResponse,

    #[error("rate limited by model API")]
    RateLimited,

    #[error("response blocked: {0}")]
    Blocked(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// Generated completion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: Option<String>,
    #[serde(default)]
    pub finish_reason: String,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: "STOP".to_string(),
            usage: Usage::default(),
        }
    }

    /// Generated text, or empty when the model returned nothing
    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Token accounting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Conversation message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Completion request parameters
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Generation halts before any of these strings
    pub stop: Vec<String>,
}

impl Default for ChatParams {
    fn default() -> Self {
        Self {
            model: String::new(),
            messages: Vec::new(),
            max_tokens: 2048,
            temperature: 0.2,
            stop: Vec::new(),
        }
    }
}

impl ChatParams {
    /// Single user-message request, the shape the reasoning loop sends
    pub fn prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: vec![Message::user(prompt)],
            ..Default::default()
        }
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// A hosted model endpoint
#[async_trait]
pub trait Provider: Send + Sync {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse>;
    fn default_model(&self) -> String;
    fn is_configured(&self) -> bool;
}

/// Cut generated text at the earliest stop sequence.
///
/// Endpoints are asked to stop there already; this covers the ones that
/// return the marker anyway.
pub fn truncate_at_stop(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min();

    match cut {
        Some(idx) => {
            trace!("Truncating completion at byte {}", idx);
            text[..idx].to_string()
        }
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        assert_eq!(ProviderError::NoApiKey.to_string(), "no API key configured");
        assert_eq!(
            ProviderError::Api("quota exceeded".to_string()).to_string(),
            "model API error: quota exceeded"
        );
        assert_eq!(
            ProviderError::InvalidResponse.to_string(),
            "invalid response from model"
        );
        assert_eq!(
            ProviderError::Blocked("SAFETY".to_string()).to_string(),
            "response blocked: SAFETY"
        );
    }

    #[test]
    fn test_chat_response_text_builder() {
        let response = ChatResponse::text("Final Answer: Plan B");
        assert_eq!(response.content.as_deref(), Some("Final Answer: Plan B"));
        assert_eq!(response.finish_reason, "STOP");
        assert_eq!(response.usage.total_tokens, 0);
    }

    #[test]
    fn test_text_or_empty() {
        let response = ChatResponse {
            content: None,
            finish_reason: "MAX_TOKENS".to_string(),
            usage: Usage::default(),
        };
        assert_eq!(response.text_or_empty(), "");
    }

    #[test]
    fn test_message_roles() {
        assert_eq!(Message::system("s").role, "system");
        assert_eq!(Message::user("u").role, "user");
        assert_eq!(Message::assistant("a").role, "assistant");
    }

    #[test]
    fn test_chat_params_default() {
        let params = ChatParams::default();
        assert_eq!(params.model, "");
        assert!(params.messages.is_empty());
        assert!(params.stop.is_empty());
        assert_eq!(params.max_tokens, 2048);
        assert_eq!(params.temperature, 0.2);
    }

    #[test]
    fn test_chat_params_prompt_builder() {
        let params = ChatParams::prompt("gemini-2.0-flash", "Question: hi").with_stop("\nObservation");
        assert_eq!(params.model, "gemini-2.0-flash");
        assert_eq!(params.messages, vec![Message::user("Question: hi")]);
        assert_eq!(params.stop, vec!["\nObservation".to_string()]);
    }

    #[test]
    fn test_truncate_at_stop() {
        let stop = vec!["\nObservation".to_string()];
        let text = "Thought: look\nAction: sql_db_list_tables\nAction Input: \nObservation: plans";
        assert_eq!(
            truncate_at_stop(text, &stop),
            "Thought: look\nAction: sql_db_list_tables\nAction Input: "
        );
    }

    #[test]
    fn test_truncate_at_stop_picks_earliest() {
        let stop = vec!["C".to_string(), "B".to_string(), String::new()];
        assert_eq!(truncate_at_stop("aaBbbCcc", &stop), "aa");
        assert_eq!(truncate_at_stop("no markers", &stop), "no markers");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("Hello");
        let json_str = serde_json::to_string(&msg).unwrap();
        assert_eq!(json_str, r#"{"role":"user","content":"Hello"}"#);
    }
}
