//! Google Gemini node
//!
//! Talks to the `generateContent` REST endpoint.

use crate::*;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, trace};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini provider
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    api_base: String,
    default_model: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: impl Into<String>,
        api_base: Option<String>,
        default_model: Option<String>,
    ) -> Self {
        let api_base = api_base
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_base,
            default_model: default_model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        let model = if model.is_empty() {
            self.default_model.as_str()
        } else {
            model
        };
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:generateContent", self.api_base, model)
    }

    fn build_request(&self, params: &ChatParams) -> serde_json::Value {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for m in &params.messages {
            match m.role.as_str() {
                "system" => system_parts.push(json!({ "text": &m.content })),
                role => contents.push(json!({
                    "role": if role == "assistant" { "model" } else { "user" },
                    "parts": [{ "text": &m.content }]
                })),
            }
        }

        let mut generation_config = json!({
            "temperature": params.temperature,
            "maxOutputTokens": params.max_tokens,
        });
        if !params.stop.is_empty() {
            generation_config["stopSequences"] = json!(params.stop);
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if !system_parts.is_empty() {
            body["systemInstruction"] = json!({ "parts": system_parts });
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ChatResponse> {
        let candidate = match json["candidates"].get(0) {
            Some(candidate) => candidate,
            None => {
                if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
                    return Err(ProviderError::Blocked(reason.to_string()));
                }
                return Err(ProviderError::InvalidResponse);
            }
        };

        let finish_reason = candidate["finishReason"]
            .as_str()
            .unwrap_or("STOP")
            .to_string();

        let content = candidate["content"]["parts"].as_array().map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<String>()
        });

        if content.is_none() && finish_reason == "SAFETY" {
            return Err(ProviderError::Blocked(finish_reason));
        }

        let usage = match json["usageMetadata"].as_object() {
            Some(meta) => Usage {
                prompt_tokens: meta
                    .get("promptTokenCount")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                completion_tokens: meta
                    .get("candidatesTokenCount")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
                total_tokens: meta
                    .get("totalTokenCount")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as u32,
            },
            None => Usage::default(),
        };

        Ok(ChatResponse {
            content,
            finish_reason,
            usage,
        })
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    async fn chat(&self, params: ChatParams) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(ProviderError::NoApiKey);
        }

        let url = self.endpoint(&params.model);
        trace!("Sending generateContent request to {}", url);

        let body = self.build_request(&params);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let json: serde_json::Value = response.json().await?;

        if !status.is_success() {
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }
            let error = json["error"]["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string();
            return Err(ProviderError::Api(format!("{} ({})", error, status)));
        }

        let response = self.parse_response(json)?;
        debug!(
            "Gemini response: finish_reason={}, {} tokens",
            response.finish_reason, response.usage.total_tokens
        );

        Ok(ChatResponse {
            content: response
                .content
                .map(|text| truncate_at_stop(&text, &params.stop)),
            ..response
        })
    }

    fn default_model(&self) -> String {
        self.default_model.clone()
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}
