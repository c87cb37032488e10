use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::core::config::Config;
use crate::core::error::GenerationError;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait3x4,
    #[serde(rename = "4:3")]
    Landscape4x3,
    #[serde(rename = "9:16")]
    Portrait9x16,
    #[serde(rename = "16:9")]
    Landscape16x9,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait3x4 => "3:4",
            AspectRatio::Landscape4x3 => "4:3",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "Given a prompt and model id, returns an image" as a `data:` URI.
#[async_trait]
pub trait ImageClient: Send + Sync + Debug {
    async fn generate_image(&self, model: &str, prompt: &str, aspect: AspectRatio) -> Result<String>;
}

pub fn create_image_client(config: &Config) -> Result<Box<dyn ImageClient>, GenerationError> {
    let api_key = config.require_api_key()?;
    Ok(Box::new(ImagenClient::new(api_key)))
}

const IMAGEN_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug)]
pub struct ImagenClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl ImagenClient {
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, IMAGEN_BASE_URL)
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
struct PredictRequest<'a> {
    instances: Vec<PredictInstance<'a>>,
    parameters: PredictParameters,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: AspectRatio,
    output_mime_type: String,
}

#[derive(Deserialize)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

fn extract_image(response_text: &str) -> Result<String> {
    let result: PredictResponse = serde_json::from_str(response_text).map_err(|e| {
        GenerationError::Transport(format!("Failed to parse Imagen response: {}", e))
    })?;
    let prediction = result
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
        .ok_or_else(|| GenerationError::Transport("No image was generated.".to_string()))?;
    let mime = prediction.mime_type.unwrap_or_else(|| "image/png".to_string());
    let bytes = prediction.bytes_base64_encoded.unwrap_or_default();
    Ok(format!("data:{};base64,{}", mime, bytes))
}

fn is_quota_status(status: u16, body: &str) -> bool {
    status == 429 || body.contains("RESOURCE_EXHAUSTED")
}

#[async_trait]
impl ImageClient for ImagenClient {
    async fn generate_image(&self, model: &str, prompt: &str, aspect: AspectRatio) -> Result<String> {
        let url = format!("{}/models/{}:predict?key={}", self.base_url, model, self.api_key);
        let body = PredictRequest {
            instances: vec![PredictInstance { prompt }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: aspect,
                output_mime_type: "image/png".to_string(),
            },
        };
        log::debug!(target: "imagen", "Request to {} ({}): {}", model, aspect, prompt);

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
        log::debug!(target: "imagen", "Response status {} ({} bytes)", status, response_text.len());

        if is_quota_status(status.as_u16(), &response_text) {
            return Err(GenerationError::QuotaExceeded(format!(
                "Imagen API error: quota exceeded. {}",
                response_text
            ))
            .into());
        }
        if !status.is_success() {
            return Err(GenerationError::classify(anyhow!("Imagen API error: {}", response_text)).into());
        }

        extract_image(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aspect_ratio_serde_names() {
        let yaml = serde_yaml_ng::to_string(&AspectRatio::Landscape16x9).unwrap();
        assert!(yaml.contains("16:9"));
        let parsed: AspectRatio = serde_json::from_str("\"3:4\"").unwrap();
        assert_eq!(parsed, AspectRatio::Portrait3x4);
        assert!(serde_json::from_str::<AspectRatio>("\"2:1\"").is_err());
    }

    #[test]
    fn test_extract_image_builds_data_uri() {
        let json = r#"{ "predictions": [ { "bytesBase64Encoded": "iVBORw0K", "mimeType": "image/png" } ] }"#;
        assert_eq!(extract_image(json).unwrap(), "data:image/png;base64,iVBORw0K");
    }

    #[test]
    fn test_extract_image_without_predictions_fails() {
        let err = extract_image(r#"{}"#).unwrap_err();
        assert!(err.to_string().contains("No image was generated"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = PredictRequest {
            instances: vec![PredictInstance { prompt: "a cat" }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: AspectRatio::Portrait9x16,
                output_mime_type: "image/png".to_string(),
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["parameters"]["aspectRatio"], "9:16");
        assert_eq!(value["parameters"]["sampleCount"], 1);
        assert_eq!(value["instances"][0]["prompt"], "a cat");
    }

    #[test]
    fn test_quota_status_detection() {
        assert!(is_quota_status(429, ""));
        assert!(is_quota_status(400, r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#));
        assert!(!is_quota_status(500, "internal"));
    }

    #[tokio::test]
    async fn test_quota_response_is_classified() -> Result<()> {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("POST", "/models/imagen:predict")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body(r#"{"error":{"message":"Quota exceeded"}}"#)
            .create_async()
            .await;

        let client = ImagenClient::with_base_url("key", &server.url());
        let err = client
            .generate_image("imagen", "prompt", AspectRatio::Square)
            .await
            .unwrap_err();
        assert!(GenerationError::classify(err).is_quota_exceeded());
        Ok(())
    }
}
