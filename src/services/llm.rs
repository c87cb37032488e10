use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::core::config::Config;
use crate::core::error::GenerationError;

/// One call to the text model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextRequest {
    pub model: String,
    pub prompt: String,
    /// When set, the model is asked for JSON matching this schema.
    pub response_schema: Option<serde_json::Value>,
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
}

impl TextRequest {
    pub fn new(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            prompt,
            ..Default::default()
        }
    }
}

/// "Given a prompt and model id, returns text."
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn generate(&self, request: &TextRequest) -> Result<String>;
}

pub fn create_llm(config: &Config) -> Result<Box<dyn LlmClient>, GenerationError> {
    let api_key = config.require_api_key()?;
    Ok(Box::new(GeminiClient::new(api_key)))
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Shown for a 429 from the text model. The image quota wording belongs to
/// the image client only.
pub const TEXT_RATE_LIMITED: &str = "The text model is rate limited right now. Please try again later.";

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

fn build_request(request: &TextRequest) -> GeminiRequest {
    let generation_config = if request.response_schema.is_some()
        || request.temperature.is_some()
        || request.top_k.is_some()
    {
        Some(GeminiGenerationConfig {
            response_mime_type: request
                .response_schema
                .as_ref()
                .map(|_| "application/json".to_string()),
            response_schema: request.response_schema.clone(),
            temperature: request.temperature,
            top_k: request.top_k,
        })
    } else {
        None
    };

    GeminiRequest {
        contents: vec![GeminiContent {
            role: "user".to_string(),
            parts: vec![GeminiPart {
                text: request.prompt.clone(),
            }],
        }],
        generation_config,
    }
}

fn extract_text(response_text: &str) -> Result<String> {
    let result: GeminiResponse = serde_json::from_str(response_text).map_err(|e| {
        GenerationError::Transport(format!(
            "Failed to parse Gemini response: {}. Body: {}",
            e, response_text
        ))
    })?;

    if let Some(err) = result.error {
        return Err(GenerationError::Transport(format!("Gemini API returned error: {}", err.message)).into());
    }

    if let Some(first) = result.candidates.as_ref().and_then(|c| c.first()) {
        if let Some(content) = &first.content {
            if !content.parts.is_empty() {
                return Ok(content.parts.iter().map(|p| p.text.as_str()).collect());
            }
        }
        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        log::error!(target: "gemini", "Gemini response empty. Finish reason: {}", reason);
        return Err(GenerationError::EmptyResponse.into());
    }

    Err(GenerationError::EmptyResponse.into())
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: &TextRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, request.model, self.api_key
        );
        let body = build_request(request);
        log::debug!(target: "gemini", "Request to {}: {}", request.model, request.prompt);

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status();
        let response_text = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        log::debug!(target: "gemini", "Response ({}): {}", status, response_text);

        if status.as_u16() == 429 {
            log::warn!(target: "gemini", "Rate limited: {}", response_text);
            return Err(GenerationError::Transport(TEXT_RATE_LIMITED.to_string()).into());
        }
        if !status.is_success() {
            return Err(GenerationError::Transport(format!("Gemini API error: {}", response_text)).into());
        }

        extract_text(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_response_parsing_success() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [ { "text": "Hello " }, { "text": "world" } ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;
        assert_eq!(extract_text(json).unwrap(), "Hello world");
    }

    #[test]
    fn test_gemini_response_safety_block_is_empty_response() {
        let json = r#"{ "candidates": [ { "finishReason": "SAFETY", "index": 0 } ] }"#;
        let err = extract_text(json).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GenerationError>(),
            Some(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn test_gemini_error_body_is_transport_error() {
        let json = r#"{ "error": { "message": "API key not valid" } }"#;
        let err = extract_text(json).unwrap_err();
        match err.downcast_ref::<GenerationError>() {
            Some(GenerationError::Transport(message)) => assert!(message.contains("API key not valid")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_request_carries_json_schema_and_sampling() {
        let request = TextRequest {
            model: "m".to_string(),
            prompt: "p".to_string(),
            response_schema: Some(serde_json::json!({ "type": "OBJECT" })),
            temperature: Some(0.1),
            top_k: Some(1),
        };
        let body = serde_json::to_value(build_request(&request)).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["topK"], 1);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");

        let plain = serde_json::to_value(build_request(&TextRequest::new("m", "p".to_string()))).unwrap();
        assert!(plain.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_an_image_quota_error() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/gemini:generateContent")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":{"message":"Quota exceeded for requests per minute"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::with_base_url("key", &server.url());
        let err = client
            .generate(&TextRequest::new("gemini", "write lyrics".to_string()))
            .await
            .unwrap_err();
        let err = GenerationError::classify(err);
        assert!(!err.is_quota_exceeded());
        assert_eq!(err.user_message(), TEXT_RATE_LIMITED);
        assert!(!err.user_message().contains("cover image"));
        Ok(())
    }

    #[test]
    fn test_create_llm_requires_key() {
        let config = Config::default();
        assert!(matches!(create_llm(&config), Err(GenerationError::MissingApiKey)));
    }
}
