//! Chat completion providers (`OpenAI`, Gemini)

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::{LlmConfig, LlmProvider};
use crate::{Error, Result};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Upper bound on a single completion request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const TEMPERATURE: f32 = 0.7;
const OPENAI_MAX_TOKENS: u32 = 60;
const GEMINI_MAX_TOKENS: u32 = 100;

/// One user/assistant exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub user: String,
    pub assistant: String,
}

/// A chat completion backend
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Complete `input` given the system prompt and prior turns
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is malformed
    async fn complete(&self, system: &str, history: &[Turn], input: &str) -> Result<String>;

    /// Provider name for logging and status output
    fn name(&self) -> &'static str;
}

/// Build the provider selected in config
///
/// # Errors
///
/// Returns error if the HTTP client cannot be built
pub fn provider_for(config: &LlmConfig) -> Result<Box<dyn ChatProvider>> {
    let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
    let provider: Box<dyn ChatProvider> = match config.provider {
        LlmProvider::OpenAi => Box::new(OpenAiChat {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }),
        LlmProvider::Gemini => Box::new(GeminiChat {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }),
    };
    tracing::info!(provider = provider.name(), model = %config.model, "chat provider ready");
    Ok(provider)
}

/// `OpenAI` chat completions
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl ChatProvider for OpenAiChat {
    async fn complete(&self, system: &str, history: &[Turn], input: &str) -> Result<String> {
        let payload = openai_payload(&self.model, system, history, input);

        let response = self
            .client
            .post(OPENAI_URL)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "OpenAI returned {status}: {}",
                error_message(&body)
            )));
        }

        parse_openai(&body)
    }

    fn name(&self) -> &'static str {
        LlmProvider::OpenAi.as_str()
    }
}

/// Google Gemini `generateContent`
pub struct GeminiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

#[async_trait]
impl ChatProvider for GeminiChat {
    async fn complete(&self, system: &str, history: &[Turn], input: &str) -> Result<String> {
        let payload = gemini_payload(system, history, input);
        let url = format!("{GEMINI_BASE_URL}/{}:generateContent", self.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "Gemini returned {status}: {}",
                error_message(&body)
            )));
        }

        parse_gemini(&body)
    }

    fn name(&self) -> &'static str {
        LlmProvider::Gemini.as_str()
    }
}

fn openai_payload(model: &str, system: &str, history: &[Turn], input: &str) -> Value {
    let mut messages = vec![json!({ "role": "system", "content": system })];
    for turn in history {
        messages.push(json!({ "role": "user", "content": turn.user }));
        messages.push(json!({ "role": "assistant", "content": turn.assistant }));
    }
    messages.push(json!({ "role": "user", "content": input }));

    json!({
        "model": model,
        "messages": messages,
        "max_tokens": OPENAI_MAX_TOKENS,
        "temperature": TEMPERATURE,
    })
}

fn gemini_payload(system: &str, history: &[Turn], input: &str) -> Value {
    let mut contents = Vec::with_capacity(history.len() * 2 + 1);
    for turn in history {
        contents.push(json!({ "role": "user", "parts": [{ "text": turn.user }] }));
        contents.push(json!({ "role": "model", "parts": [{ "text": turn.assistant }] }));
    }
    contents.push(json!({ "role": "user", "parts": [{ "text": input }] }));

    json!({
        "systemInstruction": { "parts": [{ "text": system }] },
        "contents": contents,
        "generationConfig": {
            "temperature": TEMPERATURE,
            "topP": 0.9,
            "topK": 40,
            "maxOutputTokens": GEMINI_MAX_TOKENS,
        },
    })
}

fn parse_openai(body: &Value) -> Result<String> {
    body.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Llm("missing content in OpenAI response".to_string()))
}

fn parse_gemini(body: &Value) -> Result<String> {
    let parts = body
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Llm("missing candidates in Gemini response".to_string()))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    let text = text.trim();

    if text.is_empty() {
        return Err(Error::Llm("empty Gemini response".to_string()));
    }
    Ok(text.to_string())
}

fn error_message(body: &Value) -> String {
    body.pointer("/error/message")
        .and_then(Value::as_str)
        .map_or_else(|| body.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> Vec<Turn> {
        vec![Turn {
            user: "hello there".to_string(),
            assistant: "Hi!".to_string(),
        }]
    }

    #[test]
    fn test_openai_payload_shape() {
        let payload = openai_payload("gpt-3.5-turbo", "be nice", &history(), "tell me a story");
        let messages = payload["messages"].as_array().unwrap();

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["content"], "tell me a story");
        assert_eq!(payload["max_tokens"], 60);
    }

    #[test]
    fn test_gemini_payload_shape() {
        let payload = gemini_payload("be nice", &history(), "tell me a story");
        let contents = payload["contents"].as_array().unwrap();

        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(payload["generationConfig"]["topK"], 40);
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(payload["systemInstruction"]["parts"][0]["text"], "be nice");
    }

    #[test]
    fn test_parse_openai() {
        let body = json!({ "choices": [{ "message": { "content": " Sure thing! " } }] });
        assert_eq!(parse_openai(&body).unwrap(), "Sure thing!");
        assert!(parse_openai(&json!({ "choices": [] })).is_err());
    }

    #[test]
    fn test_parse_gemini_joins_parts() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hello " }, { "text": "friend" }] } }]
        });
        assert_eq!(parse_gemini(&body).unwrap(), "Hello friend");
        assert!(parse_gemini(&json!({})).is_err());
    }

    #[test]
    fn test_error_message_prefers_api_message() {
        let body = json!({ "error": { "message": "invalid key" } });
        assert_eq!(error_message(&body), "invalid key");
    }
}
